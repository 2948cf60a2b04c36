use groovy_ls_ast::{DeclarationKind, Modifiers};
use groovy_ls_position::ByteSpan;

/// The kind of a declared or referenced name (`SPEC_FULL.md` §3 `Symbol`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Class,
    Method,
    Field,
    Parameter,
    Local,
    Import,
}

impl From<DeclarationKind> for SymbolKind {
    fn from(kind: DeclarationKind) -> Self {
        match kind {
            DeclarationKind::Type => SymbolKind::Class,
            DeclarationKind::Method => SymbolKind::Method,
            DeclarationKind::Field => SymbolKind::Field,
            DeclarationKind::Parameter => SymbolKind::Parameter,
            DeclarationKind::Local => SymbolKind::Local,
        }
    }
}

/// An index into a [`crate::FileSymbolIndex`]'s symbol table.
///
/// Like [`groovy_ls_ast::NodeId`], only meaningful relative to the index that produced
/// it. Symbols are reference-equal within one `ParseUnit` by design (`SPEC_FULL.md` §3:
/// "must not be compared by name for same-file disambiguation") — a `SymbolId` is that
/// identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub(crate) u32);

/// Declaration of a named entity.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub name: String,
    pub qualified_name: Option<String>,
    pub declaring_uri: String,
    /// The whole declaring construct, e.g. the full `def greeter = new Greeter()`.
    pub declaration_range: ByteSpan,
    /// Just the identifier token, e.g. `greeter` within the statement above. The
    /// rename/click-target range.
    pub selection_range: ByteSpan,
    pub type_reference: Option<String>,
    pub modifiers: Modifiers,
    pub owner: Option<SymbolId>,
}

/// A position that refers to a symbol, resolved by identity.
#[derive(Debug, Clone, Copy)]
pub struct Usage {
    pub span: ByteSpan,
    /// `None` when the owning `ParseUnit` never reached `SemanticAnalysis`; usages are
    /// left unresolved rather than guessed by name in that case.
    pub symbol: Option<SymbolId>,
}
