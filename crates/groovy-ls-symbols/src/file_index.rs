//! Per-file symbol index (`SPEC_FULL.md` §4.5), rebuilt from scratch on each
//! successful compile.

use crate::symbol::{Symbol, SymbolId, SymbolKind, Usage};
use groovy_ls_ast::{Ast, ExpressionKind, NodeId, NodeKind};
use groovy_ls_parser::ParseUnit;
use rustc_hash::FxHashMap;

/// Symbols and usages declared in one file, plus a local name index.
#[derive(Debug, Clone)]
pub struct FileSymbolIndex {
    uri: String,
    symbols: Vec<Symbol>,
    by_name: FxHashMap<String, Vec<SymbolId>>,
    usages: Vec<Usage>,
}

impl FileSymbolIndex {
    /// Builds an index from a [`ParseUnit`], applying the three build rules in
    /// `SPEC_FULL.md` §4.5: one symbol per declaration, usages resolved by identity
    /// only when the unit reached semantic analysis, and synthetic symbols for
    /// imports.
    pub fn build(parse_unit: &ParseUnit) -> Self {
        let mut index = Self {
            uri: parse_unit.uri.clone(),
            symbols: Vec::new(),
            by_name: FxHashMap::default(),
            usages: Vec::new(),
        };

        let mut node_to_symbol: FxHashMap<NodeId, SymbolId> = FxHashMap::default();

        for decl in &parse_unit.declarations {
            let node = parse_unit.ast.node(decl.node);
            let id = index.push_symbol(Symbol {
                kind: decl.kind.into(),
                name: decl.name.clone(),
                qualified_name: None,
                declaring_uri: parse_unit.uri.clone(),
                declaration_range: node.span,
                selection_range: node.selection_span(),
                type_reference: type_reference_of(&node.kind),
                modifiers: modifiers_of(&node.kind),
                owner: None,
            });
            node_to_symbol.insert(decl.node, id);
        }

        // Second pass: now that every declaration has a SymbolId, resolve owners by
        // walking each node's ancestor chain to the nearest declaration.
        for decl in &parse_unit.declarations {
            let Some(&id) = node_to_symbol.get(&decl.node) else { continue };
            let owner = enclosing_declaration(&parse_unit.ast, decl.node, &node_to_symbol);
            index.symbols[id.0 as usize].owner = owner;
        }
        for symbol in &mut index.symbols {
            symbol.qualified_name = Some(qualify(symbol, &index.symbols));
        }

        for import in &parse_unit.imports {
            let node = parse_unit.ast.node(import.node);
            index.push_symbol(Symbol {
                kind: SymbolKind::Import,
                name: import.alias.clone().unwrap_or_else(|| last_segment(&import.path)),
                qualified_name: Some(import.path.clone()),
                declaring_uri: parse_unit.uri.clone(),
                declaration_range: node.span,
                selection_range: node.selection_span(),
                type_reference: Some(import.path.clone()),
                modifiers: Default::default(),
                owner: None,
            });
        }

        parse_unit.ast.visit_pre_order(parse_unit.ast.root(), |_, node| {
            let NodeKind::Expression(
                ExpressionKind::Identifier { name }
                | ExpressionKind::MethodCall { name }
                | ExpressionKind::PropertyAccess { name },
            ) = &node.kind
            else {
                return;
            };
            let symbol = if parse_unit.has_bindings() { index.resolve_nearest(name, node.span.start) } else { None };
            index.usages.push(Usage { span: node.span, symbol });
        });

        index
    }

    fn push_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.by_name.entry(symbol.name.clone()).or_default().push(id);
        self.symbols.push(symbol);
        id
    }

    /// Best-effort name resolution: the textually nearest preceding declaration with a
    /// matching name. This is not full lexical scoping (the concrete Groovy semantic
    /// analyser, via `SPEC_FULL.md` §4.3, is the authority when it is wired in); it is
    /// a reasonable approximation for a `ParseUnit` that only carries declaration
    /// positions.
    fn resolve_nearest(&self, name: &str, usage_start: usize) -> Option<SymbolId> {
        self.by_name
            .get(name)?
            .iter()
            .filter(|id| self.symbol(**id).declaration_range.start <= usage_start)
            .max_by_key(|id| self.symbol(**id).declaration_range.start)
            .copied()
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols.iter().enumerate().map(|(i, s)| (SymbolId(i as u32), s))
    }

    pub fn usages(&self) -> &[Usage] {
        &self.usages
    }

    pub fn by_name(&self, name: &str) -> &[SymbolId] {
        self.by_name.get(name).map_or(&[], |ids| ids.as_slice())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

fn enclosing_declaration(ast: &Ast, node: NodeId, node_to_symbol: &FxHashMap<NodeId, SymbolId>) -> Option<SymbolId> {
    let mut current = ast.node(node).parent;
    while let Some(id) = current {
        if let Some(&symbol) = node_to_symbol.get(&id) {
            return Some(symbol);
        }
        current = ast.node(id).parent;
    }
    None
}

fn qualify(symbol: &Symbol, all: &[Symbol]) -> String {
    let mut parts = vec![symbol.name.clone()];
    let mut owner = symbol.owner;
    while let Some(id) = owner {
        let parent = &all[id.0 as usize];
        parts.push(parent.name.clone());
        owner = parent.owner;
    }
    parts.reverse();
    parts.join(".")
}

fn last_segment(path: &str) -> String {
    path.rsplit('.').next().unwrap_or(path).to_string()
}

fn type_reference_of(kind: &NodeKind) -> Option<String> {
    match kind {
        NodeKind::Method { return_type, .. } => return_type.clone(),
        NodeKind::Field { declared_type, .. } => declared_type.clone(),
        NodeKind::Parameter { declared_type, .. } => declared_type.clone(),
        _ => None,
    }
}

fn modifiers_of(kind: &NodeKind) -> groovy_ls_ast::Modifiers {
    match kind {
        NodeKind::Class { modifiers, .. }
        | NodeKind::Interface { modifiers, .. }
        | NodeKind::Enum { modifiers, .. }
        | NodeKind::Trait { modifiers, .. }
        | NodeKind::Method { modifiers, .. }
        | NodeKind::Constructor { modifiers }
        | NodeKind::Field { modifiers, .. } => *modifiers,
        _ => Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groovy_ls_ast::{AstBuilder, DeclarationKind, Modifiers};
    use groovy_ls_fingerprint::Fingerprint;
    use groovy_ls_parser::{CompilePhase, DeclarationRef};
    use groovy_ls_position::ByteSpan;

    fn sample_unit(has_bindings: bool) -> ParseUnit {
        // class Greeter { String m; void g(){ m } }
        let mut b = AstBuilder::new(40);
        let class = b.push(
            NodeKind::Class { name: "Greeter".to_string(), modifiers: Modifiers::default() },
            ByteSpan::new(0, 40),
        );
        let field = b.leaf(
            NodeKind::Field { name: "m".to_string(), modifiers: Modifiers::default(), declared_type: None },
            ByteSpan::new(16, 24),
        );
        let method = b.push(
            NodeKind::Method { name: "g".to_string(), modifiers: Modifiers::default(), return_type: None },
            ByteSpan::new(25, 38),
        );
        b.leaf(NodeKind::Expression(ExpressionKind::Identifier { name: "m".to_string() }), ByteSpan::new(35, 36));
        b.pop(); // method
        b.pop(); // class
        let ast = b.finish();

        ParseUnit {
            uri: "file:///a.groovy".to_string(),
            fingerprint: Fingerprint::of("x"),
            declarations: vec![
                DeclarationRef { node: class, name: "Greeter".to_string(), kind: DeclarationKind::Type },
                DeclarationRef { node: field, name: "m".to_string(), kind: DeclarationKind::Field },
                DeclarationRef { node: method, name: "g".to_string(), kind: DeclarationKind::Method },
            ],
            imports: Vec::new(),
            diagnostics: Vec::new(),
            is_successful: true,
            reached_phase: if has_bindings { CompilePhase::SemanticAnalysis } else { CompilePhase::AstConversion },
            ast,
        }
    }

    #[test]
    fn builds_one_symbol_per_declaration() {
        let unit = sample_unit(true);
        let index = FileSymbolIndex::build(&unit);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn field_and_method_are_owned_by_the_class() {
        let unit = sample_unit(true);
        let index = FileSymbolIndex::build(&unit);
        let class_id = index.by_name("Greeter")[0];
        let field_id = index.by_name("m")[0];
        assert_eq!(index.symbol(field_id).owner, Some(class_id));
        assert_eq!(index.symbol(field_id).qualified_name.as_deref(), Some("Greeter.m"));
    }

    #[test]
    fn usages_resolve_when_bindings_are_present() {
        let unit = sample_unit(true);
        let index = FileSymbolIndex::build(&unit);
        let field_id = index.by_name("m").iter().find(|id| index.symbol(**id).kind == SymbolKind::Field).copied();
        let usage = index.usages().iter().find(|u| u.span == ByteSpan::new(35, 36)).unwrap();
        assert_eq!(usage.symbol, field_id);
    }

    #[test]
    fn usages_are_unresolved_without_bindings() {
        let unit = sample_unit(false);
        let index = FileSymbolIndex::build(&unit);
        let usage = index.usages().iter().find(|u| u.span == ByteSpan::new(35, 36)).unwrap();
        assert_eq!(usage.symbol, None);
    }
}
