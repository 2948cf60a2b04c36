//! Conversions between the engine's wire-neutral shapes and `tower_lsp_server`'s
//! `lsp-types`. This is the only place either vocabulary should appear together; every
//! other module in this crate speaks one side or the other.

use groovy_ls_diagnostics::Diagnostic as EngineDiagnostic;
use groovy_ls_parser::Severity as EngineSeverity;
use groovy_ls_position::{LineIndex, WireLocation, WirePosition, WireRange};
use groovy_ls_symbols::SymbolKind as EngineSymbolKind;
use groovy_ls_workspace_index::WatchChangeKind;
use tower_lsp_server::ls_types as lsp;

pub fn position_to_lsp(pos: WirePosition) -> lsp::Position {
    lsp::Position::new(pos.line, pos.character)
}

pub fn position_from_lsp(pos: lsp::Position) -> WirePosition {
    WirePosition::new(pos.line, pos.character)
}

pub fn range_to_lsp(range: WireRange) -> lsp::Range {
    lsp::Range::new(position_to_lsp(range.start), position_to_lsp(range.end))
}

pub fn range_from_lsp(range: lsp::Range) -> WireRange {
    WireRange::new(position_from_lsp(range.start), position_from_lsp(range.end))
}

pub fn uri_to_lsp(uri: &str) -> Option<lsp::Uri> {
    uri.parse().ok()
}

pub fn uri_from_lsp(uri: &lsp::Uri) -> String {
    uri.as_str().to_string()
}

pub fn location_to_lsp(location: &WireLocation) -> Option<lsp::Location> {
    Some(lsp::Location { uri: uri_to_lsp(&location.uri)?, range: range_to_lsp(location.range) })
}

pub fn symbol_kind_to_lsp(kind: EngineSymbolKind) -> lsp::SymbolKind {
    match kind {
        EngineSymbolKind::Class => lsp::SymbolKind::CLASS,
        EngineSymbolKind::Method => lsp::SymbolKind::METHOD,
        EngineSymbolKind::Field => lsp::SymbolKind::FIELD,
        EngineSymbolKind::Parameter => lsp::SymbolKind::VARIABLE,
        EngineSymbolKind::Local => lsp::SymbolKind::VARIABLE,
        EngineSymbolKind::Import => lsp::SymbolKind::MODULE,
    }
}

pub fn symbol_kind_to_completion_kind(kind: EngineSymbolKind) -> lsp::CompletionItemKind {
    match kind {
        EngineSymbolKind::Class => lsp::CompletionItemKind::CLASS,
        EngineSymbolKind::Method => lsp::CompletionItemKind::METHOD,
        EngineSymbolKind::Field => lsp::CompletionItemKind::FIELD,
        EngineSymbolKind::Parameter => lsp::CompletionItemKind::VARIABLE,
        EngineSymbolKind::Local => lsp::CompletionItemKind::VARIABLE,
        EngineSymbolKind::Import => lsp::CompletionItemKind::MODULE,
    }
}

pub fn severity_to_lsp(severity: EngineSeverity) -> lsp::DiagnosticSeverity {
    match severity {
        EngineSeverity::Error => lsp::DiagnosticSeverity::ERROR,
        EngineSeverity::Warning => lsp::DiagnosticSeverity::WARNING,
        EngineSeverity::Info => lsp::DiagnosticSeverity::INFORMATION,
        EngineSeverity::Hint => lsp::DiagnosticSeverity::HINT,
    }
}

/// Converts one engine diagnostic to its LSP shape. `text` must be the same document text
/// the diagnostic's byte span was computed against.
pub fn diagnostic_to_lsp(diagnostic: &EngineDiagnostic, index: &LineIndex, text: &str) -> lsp::Diagnostic {
    let range = groovy_ls_position::span_to_wire_range(index, text, diagnostic.range);
    lsp::Diagnostic {
        range: range_to_lsp(range),
        severity: Some(severity_to_lsp(diagnostic.severity)),
        code: diagnostic.code.clone().map(lsp::NumberOrString::String),
        code_description: None,
        source: Some(diagnostic.source.clone()),
        message: diagnostic.message.clone(),
        related_information: None,
        tags: None,
        data: None,
    }
}

pub fn watch_change_kind_from_lsp(kind: lsp::FileChangeType) -> WatchChangeKind {
    match kind {
        lsp::FileChangeType::CREATED => WatchChangeKind::Created,
        lsp::FileChangeType::DELETED => WatchChangeKind::Deleted,
        _ => WatchChangeKind::Changed,
    }
}
