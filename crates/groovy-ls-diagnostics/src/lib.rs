//! Diagnostics pipeline (`SPEC_FULL.md` §4.9): compiler diagnostics are published
//! immediately, then zero or more lint providers run concurrently and a second,
//! unioned publication replaces the first.

use dashmap::DashMap;
use groovy_ls_compilation::CacheEntry;
use groovy_ls_error::EngineResult;
use groovy_ls_parser::ParseDiagnostic;
pub use groovy_ls_parser::Severity;
use groovy_ls_position::ByteSpan;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A diagnostic ready for publication to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub range: ByteSpan,
    pub severity: Severity,
    pub message: String,
    pub source: String,
    pub code: Option<String>,
}

impl From<&ParseDiagnostic> for Diagnostic {
    fn from(d: &ParseDiagnostic) -> Self {
        Self { range: d.span, severity: d.severity, message: d.message.clone(), source: d.source.to_string(), code: d.code.clone() }
    }
}

/// A diagnostic provider, analogous to CodeNarc: given a URI's text, streams
/// diagnostics. Enabled or disabled per-id by configuration; a failing provider is
/// logged and suppressed without affecting its peers (`SPEC_FULL.md` §4.9).
#[async_trait::async_trait]
pub trait DiagnosticProvider: Send + Sync {
    fn id(&self) -> &str;

    async fn provide(&self, uri: &str, text: &str) -> EngineResult<Vec<Diagnostic>>;

    /// Per-provider timeout; exceeding it yields no diagnostics for this provider and
    /// an internal warning, not a pipeline failure.
    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }
}

/// Where publications land. The external boundary implements this to forward to the
/// client's `publish_diagnostics`.
pub trait DiagnosticsSink: Send + Sync {
    fn publish(&self, uri: &str, diagnostics: Vec<Diagnostic>);
}

/// Runtime policy for the pipeline (`SPEC_FULL.md` §4.9, resolved default in
/// `SPEC_FULL.md` §4.9/DESIGN.md: providers still run even if compiler diagnostics
/// already contain an error).
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsPolicy {
    pub enabled_providers: HashSet<String>,
    pub skip_providers_on_compiler_error: bool,
}

/// Orchestrates compiler-diagnostic publication and concurrent provider execution, one
/// job per URI at a time.
pub struct DiagnosticsPipeline {
    providers: Vec<Arc<dyn DiagnosticProvider>>,
    /// Read-heavy and occasionally swapped on `did_change_configuration`
    /// (`SPEC_FULL.md` §6: "provider registry is read... after configuration changes").
    policy: parking_lot::RwLock<DiagnosticsPolicy>,
    /// Bumped per URI on every new job; a job whose generation goes stale before its
    /// second publication is dropped rather than published (`SPEC_FULL.md` §4.9: "if a
    /// new build completes while a previous diagnostics job is still running for the
    /// same URI, the previous job is cancelled").
    generations: Arc<DashMap<String, Arc<AtomicU64>>>,
}

impl DiagnosticsPipeline {
    pub fn new(providers: Vec<Arc<dyn DiagnosticProvider>>, policy: DiagnosticsPolicy) -> Self {
        Self { providers, policy: parking_lot::RwLock::new(policy), generations: Arc::new(DashMap::new()) }
    }

    fn generation_for(&self, uri: &str) -> Arc<AtomicU64> {
        self.generations.entry(uri.to_string()).or_insert_with(|| Arc::new(AtomicU64::new(0))).clone()
    }

    /// Replaces the runtime policy wholesale, e.g. after `did_change_configuration`.
    pub fn update_policy(&self, policy: DiagnosticsPolicy) {
        *self.policy.write() = policy;
    }

    pub fn policy(&self) -> DiagnosticsPolicy {
        self.policy.read().clone()
    }

    /// Runs one diagnostics job for `uri`, given its freshly compiled `entry`.
    /// Publishes compiler diagnostics immediately, then spawns provider execution and
    /// publishes the union once it settles (or is superseded).
    pub fn run(&self, uri: &str, text: Arc<str>, entry: &CacheEntry, sink: Arc<dyn DiagnosticsSink>) {
        let compiler_diagnostics: Vec<Diagnostic> = entry.parse_unit.diagnostics.iter().map(Diagnostic::from).collect();
        sink.publish(uri, compiler_diagnostics.clone());

        let policy = self.policy.read().clone();
        let has_compiler_error = compiler_diagnostics.iter().any(|d| d.severity == Severity::Error);
        if has_compiler_error && policy.skip_providers_on_compiler_error {
            return;
        }

        let generation = self.generation_for(uri);
        let my_generation = generation.fetch_add(1, Ordering::SeqCst) + 1;

        let providers: Vec<Arc<dyn DiagnosticProvider>> =
            self.providers.iter().filter(|p| policy.enabled_providers.contains(p.id())).cloned().collect();
        if providers.is_empty() {
            return;
        }

        let uri = uri.to_string();
        tokio::spawn(async move {
            let mut joined = compiler_diagnostics;
            let mut tasks = tokio::task::JoinSet::new();
            for provider in providers {
                let text = text.clone();
                let uri_for_provider = uri.clone();
                tasks.spawn(async move {
                    let result = tokio::time::timeout(provider.timeout(), provider.provide(&uri_for_provider, &text)).await;
                    (provider.id().to_string(), result)
                });
            }
            while let Some(outcome) = tasks.join_next().await {
                let Ok((provider_id, result)) = outcome else { continue };
                match result {
                    Ok(Ok(diagnostics)) => joined.extend(diagnostics),
                    Ok(Err(err)) => tracing::warn!(uri, provider_id, error = %err, "diagnostic provider failed"),
                    Err(_) => tracing::warn!(uri, provider_id, "diagnostic provider timed out"),
                }
            }

            if generation.load(Ordering::SeqCst) == my_generation {
                sink.publish(&uri, joined);
            } else {
                tracing::debug!(uri, "diagnostics job superseded, dropping stale publication");
            }
        });
    }
}
