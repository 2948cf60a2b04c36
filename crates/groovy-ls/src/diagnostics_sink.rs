//! Bridges the engine's synchronous [`DiagnosticsSink`] to `tower_lsp_server`'s async
//! `Client::publish_diagnostics`.
//!
//! `DiagnosticsSink::publish` is deliberately sync (the pipeline that calls it runs
//! inside already-spawned tasks, not necessarily on a context that can `.await`), so this
//! sink hands converted diagnostics to an unbounded channel and a background task does
//! the actual client call.

use std::sync::Arc;

use dashmap::DashMap;
use groovy_ls_diagnostics::{Diagnostic, DiagnosticsSink};
use groovy_ls_position::LineIndex;
use tokio::sync::mpsc;
use tower_lsp_server::ls_types as lsp;
use tower_lsp_server::Client;

use crate::convert;

pub struct LspDiagnosticsSink {
    documents: Arc<DashMap<String, Arc<str>>>,
    tx: mpsc::UnboundedSender<(String, Vec<lsp::Diagnostic>)>,
}

impl LspDiagnosticsSink {
    /// Spawns the forwarding task on the current runtime and returns the sink that feeds
    /// it. `documents` is shared with the backend so conversions have access to document
    /// text without this sink owning a copy of the source store.
    pub fn new(client: Client, documents: Arc<DashMap<String, Arc<str>>>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<(String, Vec<lsp::Diagnostic>)>();
        tokio::spawn(async move {
            while let Some((uri, diagnostics)) = rx.recv().await {
                let Some(lsp_uri) = convert::uri_to_lsp(&uri) else {
                    tracing::warn!(uri = %uri, "dropping diagnostics for unparseable uri");
                    continue;
                };
                client.publish_diagnostics(lsp_uri, diagnostics, None).await;
            }
        });
        Self { documents, tx }
    }
}

impl DiagnosticsSink for LspDiagnosticsSink {
    fn publish(&self, uri: &str, diagnostics: Vec<Diagnostic>) {
        let text = self.documents.get(uri).map(|entry| entry.clone()).unwrap_or_else(|| Arc::from(""));
        let index = LineIndex::new(&text);
        let converted = diagnostics.iter().map(|d| convert::diagnostic_to_lsp(d, &index, &text)).collect();
        if self.tx.send((uri.to_string(), converted)).is_err() {
            tracing::warn!(uri = %uri, "diagnostics forwarding task is gone");
        }
    }
}
