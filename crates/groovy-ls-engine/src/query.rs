//! Result types for the §6 query surface.
//!
//! `Either`/nullable LSP shapes are replaced with tagged data here (`SPEC_FULL.md` §9):
//! an absent result is an empty `Vec` or `None`, never a sentinel location or object.

use groovy_ls_position::{WireLocation, WireRange};
use groovy_ls_symbols::SymbolKind;
use std::collections::HashMap;

/// Hover content for a position; `None` when nothing resolves there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hover {
    pub markup: String,
}

/// One completion candidate, ranked by the caller's match order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    pub label: String,
    pub kind: SymbolKind,
    pub detail: Option<String>,
}

/// One node of a file's symbol outline (`document_symbol`).
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSymbolNode {
    pub name: String,
    pub kind: SymbolKind,
    pub range: WireRange,
    pub selection_range: WireRange,
    pub children: Vec<DocumentSymbolNode>,
}

/// One workspace symbol search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSymbolResult {
    pub name: String,
    pub kind: SymbolKind,
    pub location: WireLocation,
}

/// A single textual edit within one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: WireRange,
    pub new_text: String,
}

/// A set of edits across one or more documents, as produced by `rename`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkspaceEdit {
    pub changes: HashMap<String, Vec<TextEdit>>,
}

/// A client-offered fix or refactor. Shaping concrete actions (quick fixes, refactor
/// kinds) is an editor-facing feature provider's job and out of scope here; the engine
/// exposes the hook but does not populate it without a wired-in provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAction {
    pub title: String,
    pub edit: Option<WorkspaceEdit>,
}

/// The LSP semantic-token-types table this engine's classification indexes into.
pub const SEMANTIC_TOKEN_TYPES: &[&str] = &["class", "method", "property", "parameter", "namespace"];
