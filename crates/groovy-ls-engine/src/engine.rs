//! [`GroovyEngine`]: the top-level facade wiring every component behind the lifecycle
//! and query surface described in `SPEC_FULL.md` §6.
//!
//! Everything reachable from the wire protocol (a future `groovy-ls` binary, or a test
//! harness) goes through here; no other crate is meant to be driven directly by an
//! external boundary.

use crate::query::{
    CodeAction, CompletionItem, DocumentSymbolNode, Hover, TextEdit, WorkspaceEdit, WorkspaceSymbolResult,
};
use groovy_ls_ast::NodeKind;
use groovy_ls_classpath::{ClasspathHandle, ClasspathResolver};
use groovy_ls_compilation::CompilationService;
use groovy_ls_config::ConfigHandle;
use groovy_ls_coordinator::RequestCoordinator;
use groovy_ls_diagnostics::{DiagnosticsPipeline, DiagnosticsPolicy, DiagnosticsSink};
use groovy_ls_error::EngineResult;
use groovy_ls_parser::{GroovyParser, ParserFacade};
use groovy_ls_position::{span_to_wire_range, LineIndex, WireLocation, WirePosition};
use groovy_ls_source_store::SourceStore;
use groovy_ls_status::{StatusMachine, StructuredError};
use groovy_ls_symbols::{FileSymbolIndex, SymbolId, WorkspaceSymbolIndex};
use groovy_ls_workspace_index::{WatchEvent, WorkspaceIndexer};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Wires C1 (Source Store) through C12 (Server Status) behind the single entry point
/// an external boundary drives.
#[derive(Clone)]
pub struct GroovyEngine {
    source_store: SourceStore,
    coordinator: RequestCoordinator,
    compilation: CompilationService,
    workspace_symbols: WorkspaceSymbolIndex,
    indexer: Arc<WorkspaceIndexer>,
    diagnostics: Arc<DiagnosticsPipeline>,
    classpath: ClasspathHandle,
    config: ConfigHandle,
    status: Arc<StatusMachine>,
}

impl GroovyEngine {
    /// Assembles the engine from its external collaborators: the grammar/semantic
    /// analyser (`parser`), the lint providers to register, and the sink the boundary
    /// uses to forward publications to the client.
    pub fn new(
        parser: Arc<dyn GroovyParser>,
        providers: Vec<Arc<dyn groovy_ls_diagnostics::DiagnosticProvider>>,
        diagnostics_sink: Arc<dyn DiagnosticsSink>,
        index_concurrency: usize,
    ) -> Self {
        let source_store = SourceStore::new();
        let classpath = ClasspathHandle::default();
        let compilation = CompilationService::new(source_store.clone(), ParserFacade::new(parser), classpath.clone());
        let coordinator = RequestCoordinator::new(source_store.clone(), compilation.clone());
        let workspace_symbols = WorkspaceSymbolIndex::new();
        let indexer = Arc::new(WorkspaceIndexer::new(compilation.clone(), workspace_symbols.clone(), index_concurrency));
        let config = ConfigHandle::new();
        let policy = policy_from_config(&config.snapshot());
        let diagnostics = Arc::new(DiagnosticsPipeline::new(providers, policy));

        let engine = Self {
            source_store,
            coordinator,
            compilation,
            workspace_symbols,
            indexer,
            diagnostics,
            classpath,
            config,
            status: Arc::new(StatusMachine::new()),
        };
        engine.spawn_diagnostics_bridge(diagnostics_sink);
        engine
    }

    /// Forwards every compile completion to this engine's other subscribers
    /// (`SPEC_FULL.md` §4.6 step 7: "notify subscribers" — used by both the
    /// diagnostics pipeline and the workspace index updater): the workspace symbol
    /// index is kept current for every URI, open or not, and an open document's
    /// compile also triggers a diagnostics run. Files compiled only as part of
    /// workspace indexing (never opened) are not diagnosed here; they have no client
    /// buffer to attach diagnostics to.
    fn spawn_diagnostics_bridge(&self, sink: Arc<dyn DiagnosticsSink>) {
        let mut completions = self.compilation.subscribe();
        let diagnostics = self.diagnostics.clone();
        let source_store = self.source_store.clone();
        let workspace_symbols = self.workspace_symbols.clone();
        tokio::spawn(async move {
            while let Ok((uri, entry)) = completions.recv().await {
                workspace_symbols.update(&uri, (*entry.symbols).clone());
                if let Some(text) = source_store.get_text(&uri) {
                    diagnostics.run(&uri, text, &entry, sink.clone());
                }
            }
        });
    }

    /// Current server status, for a boundary that polls rather than subscribes.
    pub fn status(&self) -> groovy_ls_status::ServerStatus {
        self.status.current()
    }

    /// Subscribes to status transitions (`SPEC_FULL.md` §4.12).
    pub fn subscribe_status(&self) -> tokio::sync::watch::Receiver<groovy_ls_status::ServerStatus> {
        self.status.subscribe()
    }

    /// Resolves the classpath and indexes the workspace (`SPEC_FULL.md` §4.7, §4.8).
    /// Drives the server status machine through `resolving` → `indexing` →
    /// `(ready | degraded)`.
    pub async fn initialize_workspace(&self, workspace_root: &Path, resolver: &dyn ClasspathResolver) -> EngineResult<()> {
        self.status.resolving();
        if let Err(err) = self.classpath.reresolve(resolver, workspace_root) {
            self.status.resolution_failed(
                format!("dependency resolution failed: {err}"),
                StructuredError { code: "dependency_error".to_string(), details: err.to_string() },
            );
            return Err(err);
        }

        let source_roots = self.classpath.snapshot().source_roots.clone();
        let cancelled = AtomicBool::new(false);
        let status = self.status.clone();
        self.indexer
            .index_workspace(&source_roots, &cancelled, move |progress| {
                if progress.indexed == 0 {
                    status.indexing_started(progress.total);
                } else {
                    status.indexing_progress(progress.indexed, progress.total);
                }
            })
            .await?;
        self.status.indexing_complete();
        Ok(())
    }

    // ---- Lifecycle -------------------------------------------------------------

    pub fn did_open(&self, uri: &str, version: i32, text: String) {
        self.coordinator.did_open(uri, version, text);
    }

    pub fn did_change(&self, uri: &str, version: i32, text: String) {
        self.coordinator.did_change(uri, version, text);
    }

    pub fn did_close(&self, uri: &str) {
        self.coordinator.did_close(uri);
    }

    /// Informational only: the coordinator already compiles from the Source Store's
    /// buffer on every change, so a save carries no extra obligation.
    pub fn did_save(&self, _uri: &str) {}

    pub async fn did_change_watched_files(&self, events: &[WatchEvent]) -> EngineResult<()> {
        for event in events {
            self.indexer.handle_watch_event(event).await?;
        }
        Ok(())
    }

    /// Folds `settings` into the live configuration and applies the parts that affect
    /// already-constructed components: the diagnostics provider registry
    /// (`SPEC_FULL.md` §6: "provider registry is read at service construction and
    /// after configuration changes").
    pub fn did_change_configuration(&self, settings: &serde_json::Value) -> Arc<groovy_ls_config::EngineConfig> {
        let next = self.config.update(settings);
        self.diagnostics.update_policy(policy_from_config(&next));
        next
    }

    pub fn shutdown(&self) {
        self.coordinator.shutdown();
        self.status.fatal("server shut down");
    }

    // ---- Queries -----------------------------------------------------------------

    pub async fn definition(&self, uri: &str, pos: WirePosition) -> Vec<WireLocation> {
        let Some((id, symbols)) = self.symbol_at(uri, pos).await else {
            return Vec::new();
        };
        let symbol = symbols.symbol(id);
        self.location_for(&symbol.declaring_uri, symbol.declaration_range).into_iter().collect()
    }

    /// Same-file only: a [`SymbolId`] is meaningful only within the [`FileSymbolIndex`]
    /// that produced it, so usages can only be matched by identity within one file.
    pub async fn references(&self, uri: &str, pos: WirePosition, include_declaration: bool) -> Vec<WireLocation> {
        let Some((id, symbols)) = self.symbol_at(uri, pos).await else {
            return Vec::new();
        };
        let mut locations = Vec::new();
        if include_declaration {
            let symbol = symbols.symbol(id);
            locations.extend(self.location_for(&symbol.declaring_uri, symbol.declaration_range));
        }
        for usage in symbols.usages() {
            if usage.symbol == Some(id) {
                locations.extend(self.location_for(uri, usage.span));
            }
        }
        locations
    }

    pub async fn type_definition(&self, uri: &str, pos: WirePosition) -> Vec<WireLocation> {
        let Some((id, symbols)) = self.symbol_at(uri, pos).await else {
            return Vec::new();
        };
        let Some(type_name) = symbols.symbol(id).type_reference.clone() else {
            return Vec::new();
        };
        let simple_name = type_name.rsplit('.').next().unwrap_or(&type_name);
        self.workspace_symbols
            .find(simple_name, 1)
            .into_iter()
            .filter_map(|m| {
                let symbol = self.workspace_symbols.resolve(&m)?;
                (symbol.kind == groovy_ls_symbols::SymbolKind::Class)
                    .then(|| self.location_for(&m.uri, symbol.declaration_range))
                    .flatten()
            })
            .collect()
    }

    /// Always empty: no interface/implementor hierarchy is modelled by the symbol
    /// index, so there is nothing to resolve here rather than a guess to make.
    pub async fn implementation(&self, _uri: &str, _pos: WirePosition) -> Vec<WireLocation> {
        Vec::new()
    }

    pub async fn hover(&self, uri: &str, pos: WirePosition) -> Option<Hover> {
        let (id, symbols) = self.symbol_at(uri, pos).await?;
        let symbol = symbols.symbol(id);
        let mut markup = format!("**{}** _{:?}_", symbol.qualified_name.as_deref().unwrap_or(&symbol.name), symbol.kind);
        if let Some(type_ref) = &symbol.type_reference {
            markup.push_str(&format!("\n\ntype: `{type_ref}`"));
        }
        Some(Hover { markup })
    }

    pub async fn completion(&self, uri: &str, pos: WirePosition) -> Vec<CompletionItem> {
        let Ok(entry) = self.coordinator.ensure_compiled(uri).await else {
            return Vec::new();
        };
        let Some(text) = self.text_for(uri) else {
            return Vec::new();
        };
        let index = LineIndex::new(&text);
        let offset = index.position_to_offset(&text, pos.line, pos.character);
        let prefix = identifier_prefix(&text, offset);
        if prefix.is_empty() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for (_, symbol) in entry.symbols.symbols() {
            if symbol.name.starts_with(&prefix) && seen.insert(symbol.name.clone()) {
                items.push(CompletionItem { label: symbol.name.clone(), kind: symbol.kind, detail: symbol.type_reference.clone() });
            }
        }
        for m in self.workspace_symbols.find(&prefix, 50) {
            if let Some(symbol) = self.workspace_symbols.resolve(&m) {
                if seen.insert(symbol.name.clone()) {
                    items.push(CompletionItem { label: symbol.name.clone(), kind: symbol.kind, detail: symbol.type_reference.clone() });
                }
            }
        }
        items
    }

    pub async fn document_symbol(&self, uri: &str) -> Vec<DocumentSymbolNode> {
        let Ok(entry) = self.coordinator.ensure_compiled(uri).await else {
            return Vec::new();
        };
        let Some(text) = self.text_for(uri) else {
            return Vec::new();
        };
        let index = LineIndex::new(&text);
        document_symbol_children(&entry.symbols, None, &index, &text)
    }

    pub fn workspace_symbol(&self, query: &str, limit: usize) -> Vec<WorkspaceSymbolResult> {
        self.workspace_symbols
            .find(query, limit)
            .into_iter()
            .filter_map(|m| {
                let symbol = self.workspace_symbols.resolve(&m)?;
                let location = self.location_for(&m.uri, symbol.declaration_range)?;
                Some(WorkspaceSymbolResult { name: symbol.name, kind: symbol.kind, location })
            })
            .collect()
    }

    /// Same-file only, for the reasons [`GroovyEngine::references`] documents.
    pub async fn rename(&self, uri: &str, pos: WirePosition, new_name: &str) -> Option<WorkspaceEdit> {
        let (id, symbols) = self.symbol_at(uri, pos).await?;
        let symbol = symbols.symbol(id);
        let declaring_uri = symbol.declaring_uri.clone();
        let mut edits = Vec::new();
        if let Some(loc) = self.location_for(&declaring_uri, symbol.selection_range) {
            edits.push(TextEdit { range: loc.range, new_text: new_name.to_string() });
        }
        for usage in symbols.usages() {
            if usage.symbol == Some(id) {
                if let Some(loc) = self.location_for(&declaring_uri, usage.span) {
                    edits.push(TextEdit { range: loc.range, new_text: new_name.to_string() });
                }
            }
        }
        if edits.is_empty() {
            return None;
        }
        let mut changes = HashMap::new();
        changes.insert(declaring_uri, edits);
        Some(WorkspaceEdit { changes })
    }

    /// Always empty: shaping concrete quick fixes/refactors is an editor-facing
    /// feature provider's job, not this engine's.
    pub fn code_action(&self, _uri: &str, _range: groovy_ls_position::WireRange, _diagnostics: &[groovy_ls_diagnostics::Diagnostic]) -> Vec<CodeAction> {
        Vec::new()
    }

    pub async fn semantic_tokens_full(&self, uri: &str) -> Vec<u32> {
        let Ok(entry) = self.coordinator.ensure_compiled(uri).await else {
            return Vec::new();
        };
        let Some(text) = self.text_for(uri) else {
            return Vec::new();
        };
        let index = LineIndex::new(&text);

        let mut tokens = Vec::new();
        entry.parse_unit.ast.visit_pre_order(entry.parse_unit.ast.root(), |_, node| {
            if let Some(token_type) = semantic_token_type(&node.kind) {
                tokens.push((node.span, token_type));
            }
        });
        tokens.sort_by_key(|(span, _)| span.start);

        let mut encoded = Vec::with_capacity(tokens.len() * 5);
        let mut prev_line = 0u32;
        let mut prev_col = 0u32;
        for (span, token_type) in tokens {
            let (start, _) = index.span_to_positions(&text, span);
            let delta_line = start.0 - prev_line;
            let delta_col = if delta_line == 0 { start.1 - prev_col } else { start.1 };
            let length = span.try_slice(&text).map(|s| s.chars().map(char::len_utf16).sum::<usize>()).unwrap_or(0).max(1) as u32;
            encoded.extend_from_slice(&[delta_line, delta_col, length, token_type, 0]);
            prev_line = start.0;
            prev_col = start.1;
        }
        encoded
    }

    // ---- Shared helpers ------------------------------------------------------------

    /// Resolves the symbol at `pos` in `uri`, by usage first and falling back to a
    /// declaration's own selection range (`SPEC_FULL.md` §9: best-effort, not full
    /// lexical scoping).
    async fn symbol_at(&self, uri: &str, pos: WirePosition) -> Option<(SymbolId, Arc<FileSymbolIndex>)> {
        let entry = self.coordinator.ensure_compiled(uri).await.ok()?;
        let text = self.text_for(uri)?;
        let index = LineIndex::new(&text);
        let offset = index.position_to_offset(&text, pos.line, pos.character);
        let symbols = entry.symbols.clone();

        if let Some(id) = symbols.usages().iter().find(|u| u.span.contains(offset)).and_then(|u| u.symbol) {
            return Some((id, symbols));
        }
        let decl = symbols.symbols().find(|(_, s)| s.selection_range.contains(offset)).map(|(id, _)| id)?;
        Some((decl, symbols))
    }

    /// Open-document text if any, else a best-effort disk read for a file that has
    /// only ever been compiled as part of workspace indexing.
    fn text_for(&self, uri: &str) -> Option<Arc<str>> {
        if let Some(text) = self.source_store.get_text(uri) {
            return Some(text);
        }
        let path = groovy_ls_uri::uri_to_fs_path(uri)?;
        std::fs::read_to_string(path).ok().map(Arc::from)
    }

    fn location_for(&self, uri: &str, span: groovy_ls_position::ByteSpan) -> Option<WireLocation> {
        let text = self.text_for(uri)?;
        let index = LineIndex::new(&text);
        Some(WireLocation::new(uri, span_to_wire_range(&index, &text, span)))
    }
}

fn policy_from_config(config: &groovy_ls_config::EngineConfig) -> DiagnosticsPolicy {
    let mut enabled_providers = HashSet::new();
    if config.code_narc_enabled {
        enabled_providers.insert("codenarc".to_string());
    }
    DiagnosticsPolicy { enabled_providers, skip_providers_on_compiler_error: config.skip_providers_on_compiler_error }
}

fn identifier_prefix(text: &str, offset: usize) -> String {
    let bytes = text.as_bytes();
    let mut start = offset.min(bytes.len());
    while start > 0 && (bytes[start - 1].is_ascii_alphanumeric() || bytes[start - 1] == b'_') {
        start -= 1;
    }
    text[start..offset.min(bytes.len())].to_string()
}

fn semantic_token_type(kind: &NodeKind) -> Option<u32> {
    match kind {
        NodeKind::Class { .. } | NodeKind::Interface { .. } | NodeKind::Enum { .. } | NodeKind::Trait { .. } => Some(0),
        NodeKind::Method { .. } | NodeKind::Constructor { .. } => Some(1),
        NodeKind::Field { .. } => Some(2),
        NodeKind::Parameter { .. } => Some(3),
        NodeKind::Import { .. } => Some(4),
        _ => None,
    }
}

fn document_symbol_children(
    symbols: &FileSymbolIndex,
    parent: Option<SymbolId>,
    index: &LineIndex,
    text: &str,
) -> Vec<DocumentSymbolNode> {
    symbols
        .symbols()
        .filter(|(_, s)| s.owner == parent)
        .map(|(id, s)| DocumentSymbolNode {
            name: s.name.clone(),
            kind: s.kind,
            range: span_to_wire_range(index, text, s.declaration_range),
            selection_range: span_to_wire_range(index, text, s.selection_range),
            children: document_symbol_children(symbols, Some(id), index, text),
        })
        .collect()
}
