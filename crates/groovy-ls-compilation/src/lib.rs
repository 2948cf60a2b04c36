//! Compilation service (`SPEC_FULL.md` §4.6): orchestrates the parser facade and
//! symbol index, caches per-URI results, and single-flights concurrent builds for the
//! same `(URI, fingerprint)`.
//!
//! Single-flight is implemented with a per-URI async mutex rather than a shared future
//! every waiter polls: the first caller to acquire the lock performs the build, and any
//! caller that queued behind it finds the cache already fresh once it acquires the lock
//! and returns without rebuilding. The externally observable behavior — at most one
//! build runs per fingerprint, every caller sees that build's result — is the same;
//! this is simpler to reason about than a shared `Shared<BoxFuture>`.

use dashmap::DashMap;
use groovy_ls_ast::AstBuilder;
use groovy_ls_classpath::ClasspathHandle;
use groovy_ls_error::{EngineError, EngineResult};
use groovy_ls_fingerprint::Fingerprint;
use groovy_ls_parser::{CompilePhase, ParseDiagnostic, ParseUnit, ParserFacade, Severity};
use groovy_ls_source_store::SourceStore;
use groovy_ls_symbols::FileSymbolIndex;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the compile-completion broadcast channel; subscribers that lag behind
/// only miss intermediate completions, never the ability to re-query the current state
/// via [`CompilationService::ensure_compiled`].
const COMPLETION_CHANNEL_CAPACITY: usize = 256;

/// One URI's current compiled state (`SPEC_FULL.md` §3 `CacheEntry(URI)`).
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub parse_unit: Arc<ParseUnit>,
    pub symbols: Arc<FileSymbolIndex>,
}

struct UriSlot {
    /// Bumped on every write that should supersede an in-flight build
    /// (`SPEC_FULL.md` §5: "a new write bumps the epoch and cancels prior tokens").
    epoch: AtomicU64,
    build_lock: tokio::sync::Mutex<()>,
    entry: RwLock<Option<CacheEntry>>,
}

impl UriSlot {
    fn new() -> Self {
        Self { epoch: AtomicU64::new(0), build_lock: tokio::sync::Mutex::new(()), entry: RwLock::new(None) }
    }
}

/// Orchestrates C1 (Source Store) → C3 (Parser Facade) → C4 (AST) → C5 (Symbol Index)
/// per URI, with caching and single-flight deduplication.
#[derive(Clone)]
pub struct CompilationService {
    source_store: SourceStore,
    parser: ParserFacade,
    classpath: ClasspathHandle,
    slots: Arc<DashMap<String, Arc<UriSlot>>>,
    completions: broadcast::Sender<(String, CacheEntry)>,
}

impl CompilationService {
    pub fn new(source_store: SourceStore, parser: ParserFacade, classpath: ClasspathHandle) -> Self {
        let (completions, _) = broadcast::channel(COMPLETION_CHANNEL_CAPACITY);
        Self { source_store, parser, classpath, slots: Arc::new(DashMap::new()), completions }
    }

    /// Subscribes to every future compile completion (`uri`, new [`CacheEntry`]). Used
    /// by the diagnostics pipeline trigger and the workspace index updater
    /// (`SPEC_FULL.md` §4.6 step 7: "notify subscribers").
    pub fn subscribe(&self) -> broadcast::Receiver<(String, CacheEntry)> {
        self.completions.subscribe()
    }

    fn slot(&self, key: &str) -> Arc<UriSlot> {
        self.slots.entry(key.to_string()).or_insert_with(|| Arc::new(UriSlot::new())).clone()
    }

    /// Returns the current entry for `uri` if it matches the Source Store's current
    /// fingerprint; never schedules work.
    pub fn ensure_compiled(&self, uri: &str) -> Option<CacheEntry> {
        let key = groovy_ls_uri::uri_key(uri);
        let doc = self.source_store.get(&key)?;
        let slot = self.slots.get(&key)?;
        let entry = slot.entry.read().clone()?;
        (entry.fingerprint == doc.fingerprint).then_some(entry)
    }

    /// Drops the cache entry for `uri` without cancelling in-flight readers
    /// (`SPEC_FULL.md` §4.6).
    pub fn invalidate(&self, uri: &str) {
        let key = groovy_ls_uri::uri_key(uri);
        if let Some(slot) = self.slots.get(&key) {
            *slot.entry.write() = None;
        }
    }

    /// Bumps the URI's write epoch, superseding any build currently in flight for it.
    /// Called by the coordinator synchronously when a write (open/change) lands, before
    /// scheduling the new compile.
    pub fn supersede(&self, uri: &str) {
        let key = groovy_ls_uri::uri_key(uri);
        self.slot(&key).epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// The current per-file symbol index, if `uri` has been compiled at least once.
    pub fn symbol_storage(&self, uri: &str) -> Option<Arc<FileSymbolIndex>> {
        let key = groovy_ls_uri::uri_key(uri);
        self.slots.get(&key).and_then(|slot| slot.entry.read().clone()).map(|entry| entry.symbols)
    }

    /// Idempotent single-flight build for `uri`'s current open-document text.
    ///
    /// Returns [`EngineError::Cancelled`] if a newer write superseded this build before
    /// it could publish a result; callers must treat that as expected control flow, not
    /// a failure to log at error level.
    pub async fn compile(&self, uri: &str) -> EngineResult<CacheEntry> {
        let key = groovy_ls_uri::uri_key(uri);
        let doc = self
            .source_store
            .get(&key)
            .ok_or_else(|| EngineError::Fatal { message: format!("no open document for {key}") })?;
        self.compile_text(&key, doc.text).await
    }

    /// Single-flight build for a file that is not open in the editor, reading its text
    /// from disk (`SPEC_FULL.md` §3 `Document` invariant: "on-disk content is only
    /// consulted for unopened files referenced transitively"). Used by the workspace
    /// indexer; shares the same per-URI cache slot as [`CompilationService::compile`],
    /// so a later `did_open` for the same URI sees a warm cache if the text matches.
    pub async fn compile_from_disk(&self, uri: &str, text: Arc<str>) -> EngineResult<CacheEntry> {
        let key = groovy_ls_uri::uri_key(uri);
        self.compile_text(&key, text).await
    }

    async fn compile_text(&self, key: &str, text: Arc<str>) -> EngineResult<CacheEntry> {
        let fingerprint = Fingerprint::of(&text);
        let slot = self.slot(key);
        let observed_epoch = slot.epoch.load(Ordering::SeqCst);

        let _guard = slot.build_lock.lock().await;

        if let Some(entry) = slot.entry.read().clone() {
            if entry.fingerprint == fingerprint {
                return Ok(entry);
            }
        }
        if slot.epoch.load(Ordering::SeqCst) != observed_epoch {
            return Err(EngineError::Cancelled);
        }

        let classpath = self.classpath.snapshot();
        let parse_unit =
            parse_catching_panics(&self.parser, key, &text, &classpath.source_roots, CompilePhase::default());

        if slot.epoch.load(Ordering::SeqCst) != observed_epoch {
            return Err(EngineError::Cancelled);
        }

        let symbols = FileSymbolIndex::build(&parse_unit);
        let entry = CacheEntry { fingerprint: parse_unit.fingerprint, parse_unit: Arc::new(parse_unit), symbols: Arc::new(symbols) };
        *slot.entry.write() = Some(entry.clone());
        tracing::debug!(uri = key, "published new cache entry");
        let _ = self.completions.send((key.to_string(), entry.clone()));
        Ok(entry)
    }
}

/// Drives the parser facade with a panic guard, turning a parser panic into a
/// synthetic error diagnostic rather than propagating it (`SPEC_FULL.md` §4.6).
fn parse_catching_panics(
    parser: &ParserFacade,
    uri: &str,
    text: &str,
    classpath: &[std::path::PathBuf],
    phase: CompilePhase,
) -> ParseUnit {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| parser.parse(uri, text, classpath, phase))) {
        Ok(unit) => unit,
        Err(_) => {
            tracing::error!(uri, "parser panicked, publishing empty cache entry");
            ParseUnit {
                uri: uri.to_string(),
                fingerprint: Fingerprint::of(text),
                ast: AstBuilder::new(text.len()).finish(),
                diagnostics: vec![ParseDiagnostic {
                    span: groovy_ls_position::ByteSpan::empty(0),
                    severity: Severity::Error,
                    message: "internal parser error".to_string(),
                    source: "compilation",
                    code: None,
                }],
                declarations: Vec::new(),
                imports: Vec::new(),
                is_successful: false,
                reached_phase: CompilePhase::Tokenization,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groovy_ls_classpath::ClasspathSnapshot;
    use groovy_ls_parser::{GroovyParser, RawParse};
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    struct CountingParser {
        calls: Arc<AtomicUsize>,
        panics: bool,
    }

    impl GroovyParser for CountingParser {
        fn parse(&self, _source: &str, _classpath: &[std::path::PathBuf], phase: CompilePhase) -> RawParse {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            if self.panics {
                panic!("boom");
            }
            RawParse {
                ast: AstBuilder::new(0).finish(),
                diagnostics: Vec::new(),
                declarations: Vec::new(),
                imports: Vec::new(),
                reached_phase: phase,
                aborted: false,
            }
        }
    }

    fn service(calls: Arc<AtomicUsize>, panics: bool) -> CompilationService {
        let source_store = SourceStore::new();
        let parser = ParserFacade::new(Arc::new(CountingParser { calls, panics }));
        let classpath = ClasspathHandle::new(ClasspathSnapshot::default());
        CompilationService::new(source_store, parser, classpath)
    }

    #[tokio::test]
    async fn compile_with_no_open_document_is_fatal() {
        let service = service(Arc::new(AtomicUsize::new(0)), false);
        let err = service.compile("file:///missing.groovy").await.unwrap_err();
        assert_eq!(err.kind(), groovy_ls_error::ErrorKind::Fatal);
    }

    #[tokio::test]
    async fn repeated_compile_with_unchanged_text_does_not_reparse() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source_store = SourceStore::new();
        source_store.put("file:///a.groovy", 1, "class A {}".to_string());
        let parser = ParserFacade::new(Arc::new(CountingParser { calls: calls.clone(), panics: false }));
        let classpath = ClasspathHandle::new(ClasspathSnapshot::default());
        let service = CompilationService::new(source_store, parser, classpath);

        let first = service.compile("file:///a.groovy").await.unwrap();
        let second = service.compile("file:///a.groovy").await.unwrap();
        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ensure_compiled_is_null_before_first_compile() {
        let source_store = SourceStore::new();
        source_store.put("file:///a.groovy", 1, "class A {}".to_string());
        let parser = ParserFacade::new(Arc::new(CountingParser { calls: Arc::new(AtomicUsize::new(0)), panics: false }));
        let classpath = ClasspathHandle::new(ClasspathSnapshot::default());
        let service = CompilationService::new(source_store, parser, classpath);
        assert!(service.ensure_compiled("file:///a.groovy").is_none());
    }

    #[tokio::test]
    async fn supersede_with_no_build_in_flight_does_not_block_the_next_compile() {
        let source_store = SourceStore::new();
        source_store.put("file:///a.groovy", 1, "class A {}".to_string());
        let parser = ParserFacade::new(Arc::new(CountingParser { calls: Arc::new(AtomicUsize::new(0)), panics: false }));
        let classpath = ClasspathHandle::new(ClasspathSnapshot::default());
        let service = CompilationService::new(source_store, parser, classpath);

        service.supersede("file:///a.groovy");
        service.supersede("file:///a.groovy");
        let result = service.compile("file:///a.groovy").await;
        assert!(result.is_ok(), "a supersede with no build in flight must not poison the next compile");
    }

    #[tokio::test]
    async fn parser_panic_yields_an_unsuccessful_entry_not_a_propagated_panic() {
        let source_store = SourceStore::new();
        source_store.put("file:///a.groovy", 1, "class A {}".to_string());
        let parser = ParserFacade::new(Arc::new(CountingParser { calls: Arc::new(AtomicUsize::new(0)), panics: true }));
        let classpath = ClasspathHandle::new(ClasspathSnapshot::default());
        let service = CompilationService::new(source_store, parser, classpath);
        let entry = service.compile("file:///a.groovy").await.unwrap();
        assert!(!entry.parse_unit.is_successful);
    }

    #[tokio::test]
    async fn compile_from_disk_works_without_an_open_document() {
        let source_store = SourceStore::new();
        let parser = ParserFacade::new(Arc::new(CountingParser { calls: Arc::new(AtomicUsize::new(0)), panics: false }));
        let classpath = ClasspathHandle::new(ClasspathSnapshot::default());
        let service = CompilationService::new(source_store, parser, classpath);
        let entry = service.compile_from_disk("file:///a.groovy", Arc::from("class A {}")).await.unwrap();
        assert!(entry.parse_unit.is_successful);
        assert!(service.ensure_compiled("file:///a.groovy").is_none(), "disk compiles never count as open");
    }

    #[tokio::test]
    async fn subscribers_observe_every_completed_build() {
        let source_store = SourceStore::new();
        source_store.put("file:///a.groovy", 1, "class A {}".to_string());
        let parser = ParserFacade::new(Arc::new(CountingParser { calls: Arc::new(AtomicUsize::new(0)), panics: false }));
        let classpath = ClasspathHandle::new(ClasspathSnapshot::default());
        let service = CompilationService::new(source_store, parser, classpath);
        let mut rx = service.subscribe();
        service.compile("file:///a.groovy").await.unwrap();
        let (uri, entry) = rx.try_recv().unwrap();
        assert_eq!(uri, "file:///a.groovy");
        assert!(entry.parse_unit.is_successful);
    }
}
