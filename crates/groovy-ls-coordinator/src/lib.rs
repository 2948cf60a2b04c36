//! Request coordinator (`SPEC_FULL.md` §4.10): the external boundary's single entry
//! point for document lifecycle events. Orders writes before reads per URI — a write
//! (open/change) registers text in the Source Store synchronously, then schedules a
//! background compile that a later write cancels and replaces. A read that arrives
//! before any compile has published for the current text triggers an on-demand
//! compile-and-await rather than returning stale or absent data.

use dashmap::DashMap;
use groovy_ls_compilation::{CacheEntry, CompilationService};
use groovy_ls_error::EngineResult;
use groovy_ls_source_store::SourceStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Orders per-URI writes and reads over [`SourceStore`] and [`CompilationService`].
#[derive(Clone)]
pub struct RequestCoordinator {
    source_store: SourceStore,
    compilation: CompilationService,
    /// The background compile task currently in flight for a URI, if any. A new write
    /// replaces the entry and aborts the old handle (`SPEC_FULL.md` §4.10: "the current
    /// compile job is cancelled and replaced").
    jobs: Arc<DashMap<String, JoinHandle<()>>>,
    shutting_down: Arc<AtomicBool>,
}

impl RequestCoordinator {
    pub fn new(source_store: SourceStore, compilation: CompilationService) -> Self {
        Self { source_store, compilation, jobs: Arc::new(DashMap::new()), shutting_down: Arc::new(AtomicBool::new(false)) }
    }

    /// A document was opened in the editor. Registers its text and schedules a compile.
    pub fn did_open(&self, uri: &str, version: i32, text: String) {
        self.source_store.put(uri, version, text);
        self.schedule_compile(uri);
    }

    /// A document's full text changed. Same ordering as [`Self::did_open`]: the write
    /// lands before the next compile is scheduled.
    pub fn did_change(&self, uri: &str, version: i32, text: String) {
        self.source_store.put(uri, version, text);
        self.schedule_compile(uri);
    }

    /// A document was closed. Cancels any in-flight compile, drops the cached entry, and
    /// removes it from the Source Store.
    pub fn did_close(&self, uri: &str) {
        self.cancel_job(uri);
        self.compilation.invalidate(uri);
        self.source_store.remove(uri);
    }

    /// Returns the current entry for `uri`, compiling on demand if no fresh one exists
    /// yet. Every read operation (definition, hover, completion, diagnostics, ...) goes
    /// through this rather than reading the cache directly, so a read never races ahead
    /// of the write that produced the text it should see.
    pub async fn ensure_compiled(&self, uri: &str) -> EngineResult<CacheEntry> {
        if let Some(entry) = self.compilation.ensure_compiled(uri) {
            return Ok(entry);
        }
        self.compilation.compile(uri).await
    }

    fn schedule_compile(&self, uri: &str) {
        self.compilation.supersede(uri);
        self.cancel_job(uri);
        if self.shutting_down.load(Ordering::SeqCst) {
            return;
        }

        let compilation = self.compilation.clone();
        let key = uri.to_string();
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            match compilation.compile(&key).await {
                Ok(_) => {}
                Err(err) if err.is_cancellation() => {
                    tracing::debug!(uri = key, "background compile superseded before completion");
                }
                Err(err) => tracing::warn!(uri = key, error = %err, "background compile failed"),
            }
        });
        self.jobs.insert(task_key, handle);
    }

    fn cancel_job(&self, uri: &str) {
        if let Some((_, handle)) = self.jobs.remove(uri) {
            handle.abort();
        }
    }

    /// Aborts every in-flight background compile and stops scheduling new ones. Reads
    /// already in progress via [`Self::ensure_compiled`] run to completion; new calls
    /// into this coordinator after shutdown still register writes but never schedule
    /// background work.
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        for job in self.jobs.iter() {
            job.value().abort();
        }
        self.jobs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groovy_ls_ast::AstBuilder;
    use groovy_ls_classpath::{ClasspathHandle, ClasspathSnapshot};
    use groovy_ls_parser::{CompilePhase, GroovyParser, ParserFacade, RawParse};
    use std::sync::Mutex;
    use std::time::Duration;

    struct RecordingParser {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl GroovyParser for RecordingParser {
        fn parse(&self, source: &str, _classpath: &[std::path::PathBuf], phase: CompilePhase) -> RawParse {
            self.seen.lock().unwrap().push(source.to_string());
            RawParse {
                ast: AstBuilder::new(source.len()).finish(),
                diagnostics: Vec::new(),
                declarations: Vec::new(),
                imports: Vec::new(),
                reached_phase: phase,
                aborted: false,
            }
        }
    }

    fn coordinator(seen: Arc<Mutex<Vec<String>>>) -> RequestCoordinator {
        let source_store = SourceStore::new();
        let parser = ParserFacade::new(Arc::new(RecordingParser { seen }));
        let classpath = ClasspathHandle::new(ClasspathSnapshot::default());
        let compilation = CompilationService::new(source_store.clone(), parser, classpath);
        RequestCoordinator::new(source_store, compilation)
    }

    #[tokio::test]
    async fn ensure_compiled_awaits_a_just_opened_document() {
        let coordinator = coordinator(Arc::new(Mutex::new(Vec::new())));
        coordinator.did_open("file:///a.groovy", 1, "class A {}".to_string());
        let entry = coordinator.ensure_compiled("file:///a.groovy").await.unwrap();
        assert!(entry.parse_unit.is_successful);
    }

    #[tokio::test]
    async fn did_change_replaces_the_background_job_for_the_same_uri() {
        let coordinator = coordinator(Arc::new(Mutex::new(Vec::new())));
        coordinator.did_open("file:///a.groovy", 1, "class A {}".to_string());
        coordinator.did_change("file:///a.groovy", 2, "class B {}".to_string());
        assert_eq!(coordinator.jobs.len(), 1, "the open's job must be cancelled and replaced, not accumulated");
    }

    #[tokio::test]
    async fn reads_observe_the_latest_write_not_an_intermediate_one() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let coordinator = coordinator(seen.clone());
        coordinator.did_open("file:///a.groovy", 1, "class A {}".to_string());
        coordinator.did_change("file:///a.groovy", 2, "class B {}".to_string());
        let entry = coordinator.ensure_compiled("file:///a.groovy").await.unwrap();
        assert_eq!(entry.fingerprint, groovy_ls_fingerprint::Fingerprint::of("class B {}"));
    }

    #[tokio::test]
    async fn did_close_invalidates_the_cache_and_removes_the_document() {
        let coordinator = coordinator(Arc::new(Mutex::new(Vec::new())));
        coordinator.did_open("file:///a.groovy", 1, "class A {}".to_string());
        coordinator.ensure_compiled("file:///a.groovy").await.unwrap();
        coordinator.did_close("file:///a.groovy");

        let err = coordinator.ensure_compiled("file:///a.groovy").await.unwrap_err();
        assert_eq!(err.kind(), groovy_ls_error::ErrorKind::Fatal, "a closed document is no longer open");
    }

    #[tokio::test]
    async fn shutdown_stops_scheduling_new_background_compiles() {
        let coordinator = coordinator(Arc::new(Mutex::new(Vec::new())));
        coordinator.shutdown();
        coordinator.did_open("file:///a.groovy", 1, "class A {}".to_string());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(coordinator.jobs.is_empty());
        assert!(coordinator.compilation.ensure_compiled("file:///a.groovy").is_none());
    }

    #[tokio::test]
    async fn shutdown_aborts_jobs_already_in_flight() {
        let coordinator = coordinator(Arc::new(Mutex::new(Vec::new())));
        coordinator.did_open("file:///a.groovy", 1, "class A {}".to_string());
        coordinator.shutdown();
        assert!(coordinator.jobs.is_empty());
    }
}
