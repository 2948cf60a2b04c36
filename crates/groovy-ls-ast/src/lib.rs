//! Arena-allocated AST node model (`SPEC_FULL.md` §3 `AstNode`, §4.4).
//!
//! Parent links in a tree built from owned/boxed nodes force either unsafe aliasing or
//! reference counting with interior mutability just to let a child point back at its
//! parent. The design notes in `SPEC_FULL.md` §9 call this out directly ("cyclic parent
//! links... use arena-allocated nodes with index-based parent and child references");
//! this crate follows that redesign rather than the teacher's recursive `Box<Node>`
//! shape. Every node lives in one flat [`Ast::nodes`] vector and is addressed by
//! [`NodeId`]; parent and child links are plain indices, so the whole tree (and the
//! [`crate::Ast`] that owns it) drops in one move with no cycle to break.

use groovy_ls_position::ByteSpan;
use serde::{Deserialize, Serialize};

/// An index into an [`Ast`]'s node arena.
///
/// `NodeId`s are only meaningful relative to the [`Ast`] that produced them; comparing
/// or indexing with an id from a different `Ast` is a logic error the caller must avoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Declaration-bearing and structural modifiers carried by class/method/field nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Modifiers {
    /// `public` (Groovy's default visibility when unspecified).
    pub public: bool,
    /// `private`.
    pub private: bool,
    /// `protected`.
    pub protected: bool,
    /// `static`.
    pub is_static: bool,
    /// `final`.
    pub is_final: bool,
    /// `abstract`.
    pub is_abstract: bool,
}

/// The kind of an AST node, with kind-specific payload.
///
/// Variants mirror the declaration and statement/expression families named in
/// `SPEC_FULL.md` §3: `{module, class, interface, enum, trait, method, constructor,
/// field, parameter, block, statement variants, expression variants, import,
/// annotation}`. Statement and expression variants are grouped under
/// [`StatementKind`]/[`ExpressionKind`] so matching on "is this a declaration" stays a
/// short, explicit list rather than spreading across dozens of top-level variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// The root of a compilation unit.
    Module,
    /// A `class` declaration.
    Class { name: String, modifiers: Modifiers },
    /// An `interface` declaration.
    Interface { name: String, modifiers: Modifiers },
    /// An `enum` declaration.
    Enum { name: String, modifiers: Modifiers },
    /// A `trait` declaration.
    Trait { name: String, modifiers: Modifiers },
    /// A method declaration, including Groovy's implicit-script "methods".
    Method { name: String, modifiers: Modifiers, return_type: Option<String> },
    /// A constructor declaration.
    Constructor { modifiers: Modifiers },
    /// A field declaration.
    Field { name: String, modifiers: Modifiers, declared_type: Option<String> },
    /// A formal parameter.
    Parameter { name: String, declared_type: Option<String> },
    /// A brace-delimited block of statements.
    Block,
    /// A statement that is not itself a declaration.
    Statement(StatementKind),
    /// An expression.
    Expression(ExpressionKind),
    /// An `import` declaration.
    Import { path: String, alias: Option<String>, is_static: bool },
    /// An annotation usage, e.g. `@Override`.
    Annotation { name: String },
    /// A syntactically unrecoverable region, produced only by a partial parse.
    Error,
}

/// Non-declaration statement shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatementKind {
    /// A local-variable declaration (`def x = 1` or `String x = "a"`).
    LocalVariable { name: String, declared_type: Option<String> },
    /// An expression used as a statement.
    ExpressionStatement,
    /// An `if`/`else` statement.
    If,
    /// A `for` or `for-in` loop.
    For,
    /// A `while` loop.
    While,
    /// A `return` statement.
    Return,
    /// A `throw` statement.
    Throw,
    /// A `try`/`catch`/`finally` statement.
    Try,
}

/// Expression shapes that can carry or resolve to a name binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExpressionKind {
    /// A bare identifier reference, e.g. `m` in `println m`.
    Identifier { name: String },
    /// A method call, e.g. `g()` or `greeter.greet()`.
    MethodCall { name: String },
    /// A property/field access, e.g. `greeter.name`.
    PropertyAccess { name: String },
    /// A literal (string, number, boolean, null, list, map).
    Literal,
    /// A binary operator expression.
    Binary,
    /// A closure literal.
    Closure,
    /// A `new` expression.
    New { type_name: String },
}

/// One node in the arena: its kind, source span, and structural links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstNode {
    /// The kind and kind-specific payload.
    pub kind: NodeKind,
    /// The byte-offset span this node covers in the originating source text, e.g. the
    /// whole `def greeter = new Greeter()` statement for a local-variable declaration.
    pub span: ByteSpan,
    /// The narrower span of just the declared/referenced identifier token, e.g. the
    /// `greeter` in the statement above (`SPEC_FULL.md` §3: "declaration range = full
    /// node, selection range = identifier token"). `None` for nodes that carry no name
    /// (`Module`, `Block`, most statement/expression kinds) or whose producer could not
    /// pin down the token position.
    pub name_span: Option<ByteSpan>,
    /// The parent node, or `None` for the module root.
    pub parent: Option<NodeId>,
    /// Children, ordered by source position (`SPEC_FULL.md` §3 invariant).
    pub children: Vec<NodeId>,
}

impl AstNode {
    /// The span to use as a rename/click-target for this node's name: its
    /// `name_span` if the producer recorded one, else the whole node's span.
    pub fn selection_span(&self) -> ByteSpan {
        self.name_span.unwrap_or(self.span)
    }
}

/// Whether a [`NodeKind`] is one of the five declaration kinds the symbol index builds
/// a [`groovy_ls_symbols::Symbol`](../groovy_ls_symbols/struct.Symbol.html) from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    /// `class`/`interface`/`enum`/`trait`.
    Type,
    /// `method`/`constructor`.
    Method,
    /// `field`.
    Field,
    /// `parameter`.
    Parameter,
    /// `local` variable.
    Local,
}

impl NodeKind {
    /// The declaration kind this node introduces, or `None` if it is not a declaration.
    pub fn declaration_kind(&self) -> Option<DeclarationKind> {
        match self {
            NodeKind::Class { .. }
            | NodeKind::Interface { .. }
            | NodeKind::Enum { .. }
            | NodeKind::Trait { .. } => Some(DeclarationKind::Type),
            NodeKind::Method { .. } | NodeKind::Constructor { .. } => Some(DeclarationKind::Method),
            NodeKind::Field { .. } => Some(DeclarationKind::Field),
            NodeKind::Parameter { .. } => Some(DeclarationKind::Parameter),
            NodeKind::Statement(StatementKind::LocalVariable { .. }) => Some(DeclarationKind::Local),
            _ => None,
        }
    }

    /// The declared name, if this node carries one (declarations, imports, name-bearing
    /// expressions, annotations).
    pub fn name(&self) -> Option<&str> {
        match self {
            NodeKind::Class { name, .. }
            | NodeKind::Interface { name, .. }
            | NodeKind::Enum { name, .. }
            | NodeKind::Trait { name, .. }
            | NodeKind::Method { name, .. }
            | NodeKind::Field { name, .. }
            | NodeKind::Parameter { name, .. }
            | NodeKind::Annotation { name } => Some(name),
            NodeKind::Statement(StatementKind::LocalVariable { name, .. }) => Some(name),
            NodeKind::Expression(
                ExpressionKind::Identifier { name }
                | ExpressionKind::MethodCall { name }
                | ExpressionKind::PropertyAccess { name },
            ) => Some(name),
            NodeKind::Import { alias: Some(alias), .. } => Some(alias),
            NodeKind::Import { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// An immutable AST: an arena of [`AstNode`]s plus the id of the module root.
///
/// Built once per parse (`SPEC_FULL.md` §4.3) and owned thereafter by the `ParseUnit`
/// that produced it; released as a single unit when that `ParseUnit` is evicted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ast {
    nodes: Vec<AstNode>,
    root: NodeId,
}

impl Ast {
    /// The id of the module root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Looks up a node by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this `Ast`.
    pub fn node(&self, id: NodeId) -> &AstNode {
        &self.nodes[id.index()]
    }

    /// The total number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds no nodes (never true for a built `Ast`; the module root
    /// always exists).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-first, parent-before-children (pre-order) traversal starting at `start`.
    pub fn visit_pre_order(&self, start: NodeId, mut visit: impl FnMut(NodeId, &AstNode)) {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            visit(id, node);
            stack.extend(node.children.iter().rev().copied());
        }
    }

    /// Depth-first, children-before-parent (post-order) traversal starting at `start`.
    pub fn visit_post_order(&self, start: NodeId, mut visit: impl FnMut(NodeId, &AstNode)) {
        fn go(ast: &Ast, id: NodeId, visit: &mut impl FnMut(NodeId, &AstNode)) {
            for &child in &ast.node(id).children {
                go(ast, child, visit);
            }
            visit(id, ast.node(id));
        }
        go(self, start, &mut visit);
    }

    /// The innermost node whose span contains `offset`, or the root if none does more
    /// precisely (the root's span always covers the whole document).
    ///
    /// Ranges are half-open (`SPEC_FULL.md` §4.4: "half-open end"), so a position
    /// exactly at a node's `span.end` belongs to whatever follows, not to that node.
    pub fn node_at(&self, offset: usize) -> NodeId {
        let mut current = self.root;
        loop {
            let node = self.node(current);
            let deeper = node
                .children
                .iter()
                .copied()
                .find(|&child| self.node(child).span.contains(offset) || self.node(child).span.start == offset);
            match deeper {
                Some(child) => current = child,
                None => return current,
            }
        }
    }

    /// All descendants of `start` (inclusive) in pre-order, as a `Vec` for callers that
    /// want random access rather than a callback.
    pub fn subtree(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.visit_pre_order(start, |id, _| out.push(id));
        out
    }
}

/// Incrementally builds an [`Ast`] arena, handed to the parser facade's AST-conversion
/// phase.
///
/// A builder session always starts with [`AstBuilder::new`], which pre-allocates the
/// module root, then calls [`AstBuilder::push`]/[`AstBuilder::pop`] in a stack
/// discipline matching the parser's recursive descent.
#[derive(Debug)]
pub struct AstBuilder {
    nodes: Vec<AstNode>,
    stack: Vec<NodeId>,
}

impl AstBuilder {
    /// Starts a new builder with an empty module root spanning all of `source_len`
    /// bytes.
    pub fn new(source_len: usize) -> Self {
        let root = AstNode {
            kind: NodeKind::Module,
            span: ByteSpan::new(0, source_len),
            name_span: None,
            parent: None,
            children: Vec::new(),
        };
        Self { nodes: vec![root], stack: vec![NodeId(0)] }
    }

    /// The id of the node currently open on the stack (the implicit parent of the next
    /// [`AstBuilder::push`]).
    pub fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(NodeId(0))
    }

    /// Appends a new child of the currently open node and pushes it onto the stack,
    /// returning its id. The node carries no `name_span`; use [`AstBuilder::push_named`]
    /// for declarations whose identifier token span is known.
    pub fn push(&mut self, kind: NodeKind, span: ByteSpan) -> NodeId {
        self.push_named(kind, span, None)
    }

    /// Like [`AstBuilder::push`], additionally recording the span of the node's name
    /// token (`SPEC_FULL.md` §3's selection range) separately from the full node span.
    pub fn push_named(&mut self, kind: NodeKind, span: ByteSpan, name_span: Option<ByteSpan>) -> NodeId {
        let parent = self.current();
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(AstNode { kind, span, name_span, parent: Some(parent), children: Vec::new() });
        self.nodes[parent.index()].children.push(id);
        self.stack.push(id);
        id
    }

    /// Appends a leaf child of the currently open node without pushing it onto the
    /// stack (for terminals like identifiers that never have children). Carries no
    /// `name_span`; use [`AstBuilder::leaf_named`] when the identifier token span is
    /// known.
    pub fn leaf(&mut self, kind: NodeKind, span: ByteSpan) -> NodeId {
        self.leaf_named(kind, span, None)
    }

    /// Like [`AstBuilder::leaf`], additionally recording the span of the node's name
    /// token separately from the full node span.
    pub fn leaf_named(&mut self, kind: NodeKind, span: ByteSpan, name_span: Option<ByteSpan>) -> NodeId {
        let parent = self.current();
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(AstNode { kind, span, name_span, parent: Some(parent), children: Vec::new() });
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Closes the most recently pushed node.
    ///
    /// # Panics
    ///
    /// Panics if called more times than [`AstBuilder::push`] (the module root is never
    /// popped).
    pub fn pop(&mut self) {
        assert!(self.stack.len() > 1, "cannot pop the module root");
        self.stack.pop();
    }

    /// Finishes the build, returning the completed [`Ast`].
    ///
    /// Any still-open non-root nodes are implicitly closed in LIFO order; a partial
    /// parse (`SPEC_FULL.md` §4.3's `is_successful = false` path) may finish this way.
    pub fn finish(self) -> Ast {
        Ast { nodes: self.nodes, root: NodeId(0) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ast() -> Ast {
        // class Greeter { String m = "h"; void g(){ println m } }
        let mut b = AstBuilder::new(54);
        let class = b.push(
            NodeKind::Class { name: "Greeter".to_string(), modifiers: Modifiers::default() },
            ByteSpan::new(0, 54),
        );
        b.leaf(
            NodeKind::Field {
                name: "m".to_string(),
                modifiers: Modifiers::default(),
                declared_type: Some("String".to_string()),
            },
            ByteSpan::new(16, 32),
        );
        let method = b.push(
            NodeKind::Method { name: "g".to_string(), modifiers: Modifiers::default(), return_type: None },
            ByteSpan::new(34, 52),
        );
        let block = b.push(NodeKind::Block, ByteSpan::new(40, 52));
        b.leaf(NodeKind::Expression(ExpressionKind::Identifier { name: "m".to_string() }), ByteSpan::new(49, 50));
        b.pop(); // block
        assert_eq!(b.current(), method);
        b.pop(); // method
        assert_eq!(b.current(), class);
        b.pop(); // class
        b.finish()
    }

    #[test]
    fn root_spans_whole_source() {
        let ast = sample_ast();
        assert_eq!(ast.node(ast.root()).span, ByteSpan::new(0, 54));
    }

    #[test]
    fn children_are_ordered_by_source_position() {
        let ast = sample_ast();
        let class = ast.node(ast.root()).children[0];
        let children = &ast.node(class).children;
        assert_eq!(children.len(), 2);
        assert!(ast.node(children[0]).span.start < ast.node(children[1]).span.start);
    }

    #[test]
    fn child_spans_are_contained_in_parent() {
        let ast = sample_ast();
        ast.visit_pre_order(ast.root(), |id, node| {
            if let Some(parent) = node.parent {
                assert!(ast.node(parent).span.contains_span(node.span), "node {id:?} escapes parent span");
            }
        });
    }

    #[test]
    fn node_at_finds_innermost_node() {
        let ast = sample_ast();
        let found = ast.node_at(49);
        assert_eq!(ast.node(found).kind.name(), Some("m"));
        assert!(matches!(ast.node(found).kind, NodeKind::Expression(ExpressionKind::Identifier { .. })));
    }

    #[test]
    fn node_at_out_of_any_child_falls_back_to_enclosing_parent() {
        let ast = sample_ast();
        // Byte 33 is whitespace between the field and the method - not covered by any
        // child span, so the search should settle on the class.
        let found = ast.node_at(33);
        assert!(matches!(ast.node(found).kind, NodeKind::Class { .. }));
    }

    #[test]
    fn pre_order_visits_parent_before_children() {
        let ast = sample_ast();
        let mut kinds = Vec::new();
        ast.visit_pre_order(ast.root(), |_, node| kinds.push(format!("{:?}", node.kind)));
        assert!(kinds[0].contains("Module"));
        assert!(kinds[1].contains("Class"));
    }

    #[test]
    fn post_order_visits_children_before_parent() {
        let ast = sample_ast();
        let mut kinds = Vec::new();
        ast.visit_post_order(ast.root(), |_, node| kinds.push(format!("{:?}", node.kind)));
        assert!(kinds.last().unwrap().contains("Module"));
    }

    #[test]
    fn declaration_kind_classifies_field_and_method() {
        let field = NodeKind::Field {
            name: "m".to_string(),
            modifiers: Modifiers::default(),
            declared_type: None,
        };
        assert_eq!(field.declaration_kind(), Some(DeclarationKind::Field));
        let expr = NodeKind::Expression(ExpressionKind::Literal);
        assert_eq!(expr.declaration_kind(), None);
    }

    #[test]
    fn empty_module_ast_has_only_the_root() {
        let ast = AstBuilder::new(0).finish();
        assert_eq!(ast.len(), 1);
        assert!(ast.node(ast.root()).children.is_empty());
    }
}
