//! Translation layer between `tower_lsp_server::LanguageServer` and [`GroovyEngine`].
//!
//! This owns no compilation or analysis logic: every handler converts wire shapes with
//! [`crate::convert`] and calls straight through to the engine. The one piece of local
//! state is a text cache used only so [`crate::diagnostics_sink::LspDiagnosticsSink`] can
//! turn byte-offset diagnostics back into line/column ranges.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use groovy_ls_classpath::ConventionalResolver;
use groovy_ls_engine::GroovyEngine;
use groovy_ls_uri::uri_key;
use tower_lsp_server::jsonrpc::Result as RpcResult;
use tower_lsp_server::ls_types as lsp;
use tower_lsp_server::{Client, LanguageServer};

use crate::convert;
use crate::diagnostics_sink::LspDiagnosticsSink;
use crate::status_bridge;

pub struct Backend {
    client: Client,
    engine: Arc<GroovyEngine>,
    documents: Arc<DashMap<String, Arc<str>>>,
    workspace_root: tokio::sync::Mutex<Option<PathBuf>>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        let documents = Arc::new(DashMap::new());
        let sink = Arc::new(LspDiagnosticsSink::new(client.clone(), documents.clone()));
        let parser = Arc::new(crate::heuristic_parser::HeuristicGroovyParser);
        let engine = Arc::new(GroovyEngine::new(parser, Vec::new(), sink, 4));
        status_bridge::spawn(client.clone(), engine.subscribe_status());
        Self { client, engine, documents, workspace_root: tokio::sync::Mutex::new(None) }
    }

    fn remember(&self, uri: &str, text: &str) {
        self.documents.insert(uri_key(uri), Arc::from(text));
    }

    fn forget(&self, uri: &str) {
        self.documents.remove(&uri_key(uri));
    }
}

impl LanguageServer for Backend {
    async fn initialize(&self, params: lsp::InitializeParams) -> RpcResult<lsp::InitializeResult> {
        let root = params
            .root_uri
            .as_ref()
            .and_then(|u| groovy_ls_uri::uri_to_fs_path(&convert::uri_from_lsp(u)))
            .or_else(|| {
                params
                    .workspace_folders
                    .as_ref()
                    .and_then(|folders| folders.first())
                    .and_then(|f| groovy_ls_uri::uri_to_fs_path(&convert::uri_from_lsp(&f.uri)))
            });
        *self.workspace_root.lock().await = root;

        let legend = lsp::SemanticTokensLegend {
            token_types: groovy_ls_engine::SEMANTIC_TOKEN_TYPES
                .iter()
                .map(|name| lsp::SemanticTokenType::new(*name))
                .collect(),
            token_modifiers: Vec::new(),
        };

        Ok(lsp::InitializeResult {
            capabilities: lsp::ServerCapabilities {
                text_document_sync: Some(lsp::TextDocumentSyncCapability::Kind(lsp::TextDocumentSyncKind::FULL)),
                hover_provider: Some(lsp::HoverProviderCapability::Simple(true)),
                completion_provider: Some(lsp::CompletionOptions::default()),
                definition_provider: Some(lsp::OneOf::Left(true)),
                references_provider: Some(lsp::OneOf::Left(true)),
                type_definition_provider: Some(lsp::TypeDefinitionProviderCapability::Simple(true)),
                implementation_provider: Some(lsp::ImplementationProviderCapability::Simple(true)),
                document_symbol_provider: Some(lsp::OneOf::Left(true)),
                workspace_symbol_provider: Some(lsp::OneOf::Left(true)),
                rename_provider: Some(lsp::OneOf::Left(true)),
                code_action_provider: Some(lsp::CodeActionProviderCapability::Simple(true)),
                semantic_tokens_provider: Some(
                    lsp::SemanticTokensServerCapabilities::SemanticTokensOptions(lsp::SemanticTokensOptions {
                        legend,
                        full: Some(lsp::SemanticTokensFullOptions::Bool(true)),
                        ..Default::default()
                    }),
                ),
                ..Default::default()
            },
            server_info: Some(lsp::ServerInfo { name: "groovy-ls".to_string(), version: Some(env!("CARGO_PKG_VERSION").to_string()) }),
        })
    }

    async fn initialized(&self, _params: lsp::InitializedParams) {
        let root = self.workspace_root.lock().await.clone();
        let Some(root) = root else {
            tracing::warn!("initialized with no workspace root; skipping indexing");
            return;
        };
        let engine = self.engine.clone();
        tokio::spawn(async move {
            let resolver = ConventionalResolver;
            if let Err(err) = engine.initialize_workspace(&root, &resolver).await {
                tracing::error!(error = %err, "workspace initialization failed");
            }
        });

        let registration = lsp::Registration {
            id: "groovy-ls-watched-files".to_string(),
            method: "workspace/didChangeWatchedFiles".to_string(),
            register_options: serde_json::to_value(lsp::DidChangeWatchedFilesRegistrationOptions {
                watchers: vec![lsp::FileSystemWatcher {
                    glob_pattern: lsp::GlobPattern::String("**/*.{groovy,gvy,gy,gsh,java}".to_string()),
                    kind: None,
                }],
            })
            .ok(),
        };
        if let Err(err) = self.client.register_capability(vec![registration]).await {
            tracing::warn!(error = %format!("{err:?}"), "failed to register file watcher");
        }
    }

    async fn shutdown(&self) -> RpcResult<()> {
        self.engine.shutdown();
        Ok(())
    }

    async fn did_open(&self, params: lsp::DidOpenTextDocumentParams) {
        let uri = convert::uri_from_lsp(&params.text_document.uri);
        self.remember(&uri, &params.text_document.text);
        self.engine.did_open(&uri, params.text_document.version, params.text_document.text);
    }

    async fn did_change(&self, params: lsp::DidChangeTextDocumentParams) {
        let uri = convert::uri_from_lsp(&params.text_document.uri);
        // FULL sync: take the first (and only) content change.
        let Some(change) = params.content_changes.into_iter().next() else { return };
        self.remember(&uri, &change.text);
        self.engine.did_change(&uri, params.text_document.version, change.text);
    }

    async fn did_close(&self, params: lsp::DidCloseTextDocumentParams) {
        let uri = convert::uri_from_lsp(&params.text_document.uri);
        self.forget(&uri);
        self.engine.did_close(&uri);
    }

    async fn did_save(&self, params: lsp::DidSaveTextDocumentParams) {
        self.engine.did_save(&convert::uri_from_lsp(&params.text_document.uri));
    }

    async fn did_change_watched_files(&self, params: lsp::DidChangeWatchedFilesParams) {
        let events: Vec<groovy_ls_workspace_index::WatchEvent> = params
            .changes
            .into_iter()
            .map(|change| groovy_ls_workspace_index::WatchEvent {
                uri: convert::uri_from_lsp(&change.uri),
                kind: convert::watch_change_kind_from_lsp(change.typ),
            })
            .collect();
        if let Err(err) = self.engine.did_change_watched_files(&events).await {
            tracing::warn!(error = %err, "failed to apply watched file changes");
        }
    }

    async fn did_change_configuration(&self, params: lsp::DidChangeConfigurationParams) {
        self.engine.did_change_configuration(&params.settings);
    }

    async fn hover(&self, params: lsp::HoverParams) -> RpcResult<Option<lsp::Hover>> {
        let doc = params.text_document_position_params;
        let uri = convert::uri_from_lsp(&doc.text_document.uri);
        let pos = convert::position_from_lsp(doc.position);
        let hover = self.engine.hover(&uri, pos).await;
        Ok(hover.map(|h| lsp::Hover {
            contents: lsp::HoverContents::Markup(lsp::MarkupContent { kind: lsp::MarkupKind::Markdown, value: h.markup }),
            range: None,
        }))
    }

    async fn completion(&self, params: lsp::CompletionParams) -> RpcResult<Option<lsp::CompletionResponse>> {
        let doc = params.text_document_position;
        let uri = convert::uri_from_lsp(&doc.text_document.uri);
        let pos = convert::position_from_lsp(doc.position);
        let items = self.engine.completion(&uri, pos).await;
        let lsp_items = items
            .into_iter()
            .map(|item| lsp::CompletionItem {
                label: item.label,
                kind: Some(convert::symbol_kind_to_completion_kind(item.kind)),
                detail: item.detail,
                ..Default::default()
            })
            .collect();
        Ok(Some(lsp::CompletionResponse::Array(lsp_items)))
    }

    async fn goto_definition(&self, params: lsp::GotoDefinitionParams) -> RpcResult<Option<lsp::GotoDefinitionResponse>> {
        let doc = params.text_document_position_params;
        let uri = convert::uri_from_lsp(&doc.text_document.uri);
        let pos = convert::position_from_lsp(doc.position);
        let locations = self.engine.definition(&uri, pos).await;
        Ok(to_goto_response(&locations))
    }

    async fn references(&self, params: lsp::ReferenceParams) -> RpcResult<Option<Vec<lsp::Location>>> {
        let doc = params.text_document_position;
        let uri = convert::uri_from_lsp(&doc.text_document.uri);
        let pos = convert::position_from_lsp(doc.position);
        let include_declaration = params.context.include_declaration;
        let locations = self.engine.references(&uri, pos, include_declaration).await;
        Ok(Some(locations.iter().filter_map(convert::location_to_lsp).collect()))
    }

    async fn goto_type_definition(
        &self,
        params: lsp::request::GotoTypeDefinitionParams,
    ) -> RpcResult<Option<lsp::request::GotoTypeDefinitionResponse>> {
        let doc = params.text_document_position_params;
        let uri = convert::uri_from_lsp(&doc.text_document.uri);
        let pos = convert::position_from_lsp(doc.position);
        let locations = self.engine.type_definition(&uri, pos).await;
        Ok(to_goto_response(&locations))
    }

    async fn goto_implementation(
        &self,
        params: lsp::request::GotoImplementationParams,
    ) -> RpcResult<Option<lsp::request::GotoImplementationResponse>> {
        let doc = params.text_document_position_params;
        let uri = convert::uri_from_lsp(&doc.text_document.uri);
        let pos = convert::position_from_lsp(doc.position);
        let locations = self.engine.implementation(&uri, pos).await;
        Ok(to_goto_response(&locations))
    }

    async fn document_symbol(&self, params: lsp::DocumentSymbolParams) -> RpcResult<Option<lsp::DocumentSymbolResponse>> {
        let uri = convert::uri_from_lsp(&params.text_document.uri);
        let nodes = self.engine.document_symbol(&uri).await;
        #[allow(deprecated)]
        let symbols = nodes.iter().map(document_symbol_to_lsp).collect();
        Ok(Some(lsp::DocumentSymbolResponse::Nested(symbols)))
    }

    async fn symbol(&self, params: lsp::WorkspaceSymbolParams) -> RpcResult<Option<Vec<lsp::SymbolInformation>>> {
        let results = self.engine.workspace_symbol(&params.query, 200);
        #[allow(deprecated)]
        let symbols = results
            .iter()
            .filter_map(|r| {
                Some(lsp::SymbolInformation {
                    name: r.name.clone(),
                    kind: convert::symbol_kind_to_lsp(r.kind),
                    tags: None,
                    deprecated: None,
                    location: convert::location_to_lsp(&r.location)?,
                    container_name: None,
                })
            })
            .collect();
        Ok(Some(symbols))
    }

    async fn rename(&self, params: lsp::RenameParams) -> RpcResult<Option<lsp::WorkspaceEdit>> {
        let doc = params.text_document_position;
        let uri = convert::uri_from_lsp(&doc.text_document.uri);
        let pos = convert::position_from_lsp(doc.position);
        let edit = self.engine.rename(&uri, pos, &params.new_name).await;
        Ok(edit.map(workspace_edit_to_lsp))
    }

    async fn code_action(&self, params: lsp::CodeActionParams) -> RpcResult<Option<lsp::CodeActionResponse>> {
        let uri = convert::uri_from_lsp(&params.text_document.uri);
        let range = convert::range_from_lsp(params.range);
        let diagnostics = Vec::new();
        let actions = self.engine.code_action(&uri, range, &diagnostics);
        let response = actions
            .into_iter()
            .map(|action| {
                lsp::CodeActionOrCommand::CodeAction(lsp::CodeAction {
                    title: action.title,
                    edit: action.edit.map(workspace_edit_to_lsp),
                    ..Default::default()
                })
            })
            .collect();
        Ok(Some(response))
    }

    async fn semantic_tokens_full(
        &self,
        params: lsp::SemanticTokensParams,
    ) -> RpcResult<Option<lsp::SemanticTokensResult>> {
        let uri = convert::uri_from_lsp(&params.text_document.uri);
        let raw = self.engine.semantic_tokens_full(&uri).await;
        let data = raw
            .chunks_exact(5)
            .map(|chunk| lsp::SemanticToken {
                delta_line: chunk[0],
                delta_start: chunk[1],
                length: chunk[2],
                token_type: chunk[3],
                token_modifiers_bitset: chunk[4],
            })
            .collect();
        Ok(Some(lsp::SemanticTokensResult::Tokens(lsp::SemanticTokens { result_id: None, data })))
    }
}

fn to_goto_response(locations: &[groovy_ls_position::WireLocation]) -> Option<lsp::GotoDefinitionResponse> {
    let converted: Vec<lsp::Location> = locations.iter().filter_map(convert::location_to_lsp).collect();
    match converted.len() {
        0 => None,
        1 => Some(lsp::GotoDefinitionResponse::Scalar(converted.into_iter().next()?)),
        _ => Some(lsp::GotoDefinitionResponse::Array(converted)),
    }
}

#[allow(deprecated)]
fn document_symbol_to_lsp(node: &groovy_ls_engine::DocumentSymbolNode) -> lsp::DocumentSymbol {
    lsp::DocumentSymbol {
        name: node.name.clone(),
        detail: None,
        kind: convert::symbol_kind_to_lsp(node.kind),
        tags: None,
        deprecated: None,
        range: convert::range_to_lsp(node.range),
        selection_range: convert::range_to_lsp(node.selection_range),
        children: if node.children.is_empty() {
            None
        } else {
            Some(node.children.iter().map(document_symbol_to_lsp).collect())
        },
    }
}

fn workspace_edit_to_lsp(edit: groovy_ls_engine::WorkspaceEdit) -> lsp::WorkspaceEdit {
    let mut changes = std::collections::HashMap::new();
    for (uri, edits) in edit.changes {
        let Some(lsp_uri) = convert::uri_to_lsp(&uri) else { continue };
        let text_edits = edits
            .into_iter()
            .map(|e| lsp::TextEdit { range: convert::range_to_lsp(e.range), new_text: e.new_text })
            .collect();
        changes.insert(lsp_uri, text_edits);
    }
    lsp::WorkspaceEdit { changes: Some(changes), document_changes: None, change_annotations: None }
}
