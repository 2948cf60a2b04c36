use groovy_ls_ast::Modifiers;
use groovy_ls_fingerprint::Fingerprint;
use groovy_ls_parser::{ParseDiagnostic, Severity};
use groovy_ls_position::ByteSpan;
use groovy_ls_source_store::Document;
use groovy_ls_symbols::{Symbol, SymbolKind};
use std::sync::Arc;

/// Builds a [`Document`] with `text`'s fingerprint already computed, without going
/// through a [`groovy_ls_source_store::SourceStore`].
pub fn document(uri: &str, version: i32, text: &str) -> Document {
    Document { uri: groovy_ls_uri::uri_key(uri), version, text: Arc::from(text), fingerprint: Fingerprint::of(text) }
}

/// Builds a standalone, unowned [`Symbol`] at `span` for ad hoc symbol-index tests that
/// don't need a full [`groovy_ls_parser::ParseUnit`] to derive one from.
pub fn symbol(kind: SymbolKind, name: &str, declaring_uri: &str, span: ByteSpan) -> Symbol {
    Symbol {
        kind,
        name: name.to_string(),
        qualified_name: None,
        declaring_uri: declaring_uri.to_string(),
        declaration_range: span,
        selection_range: span,
        type_reference: None,
        modifiers: Modifiers::default(),
        owner: None,
    }
}

/// Builds a [`ParseDiagnostic`] with the parser's `source` tag, for tests that assert on
/// diagnostics shape without driving a real parse.
pub fn diagnostic(severity: Severity, message: &str, span: ByteSpan) -> ParseDiagnostic {
    ParseDiagnostic { span, severity, message: message.to_string(), source: "parser", code: None }
}
