//! Classpath resolver interface (`SPEC_FULL.md` §4.7).
//!
//! The engine never interprets build files itself. It depends on a resolver only
//! through the [`ClasspathResolver`] trait and reacts to [`ClasspathSnapshot`] changes
//! delivered on a broadcast stream, the same "process-wide singleton with explicit
//! lifecycle, owned snapshot swapped atomically" shape §9 and §5 prescribe for
//! classpath and framework metadata.

use groovy_ls_error::EngineResult;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;

/// The resolved dependency JARs and source roots for a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClasspathSnapshot {
    pub dependencies: Vec<PathBuf>,
    pub source_roots: Vec<PathBuf>,
}

/// The external build-tool collaborator.
///
/// Implementations translate a build system's own model (Gradle, Maven, a bare
/// directory tree) into a [`ClasspathSnapshot`]; the engine only ever sees this trait.
pub trait ClasspathResolver: Send + Sync {
    fn resolve(&self, workspace_root: &Path) -> EngineResult<ClasspathSnapshot>;
}

/// A resolver for workspaces with no build-tool integration: every directory matching
/// a conventional Groovy/Java source layout under `workspace_root` is a source root,
/// and there are no resolved dependency JARs.
///
/// This is the engine's fallback, not a Gradle/Maven implementation — build-tool
/// integration is out of scope (`SPEC_FULL.md` §1 Non-goals); a real resolver is wired
/// in by the external boundary when one is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConventionalResolver;

const CONVENTIONAL_ROOTS: &[&str] = &["src/main/groovy", "src/main/java", "src/test/groovy", "src/test/java"];

impl ClasspathResolver for ConventionalResolver {
    fn resolve(&self, workspace_root: &Path) -> EngineResult<ClasspathSnapshot> {
        let mut source_roots: Vec<PathBuf> = CONVENTIONAL_ROOTS
            .iter()
            .map(|rel| workspace_root.join(rel))
            .filter(|path| path.is_dir())
            .collect();
        if source_roots.is_empty() {
            source_roots.push(workspace_root.to_path_buf());
        }
        Ok(ClasspathSnapshot { dependencies: Vec::new(), source_roots })
    }
}

/// The change-stream capacity; a lagging subscriber only misses intermediate
/// snapshots, never the current one, since [`ClasspathHandle::snapshot`] always
/// returns the latest value regardless of stream lag.
const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Holds the current [`ClasspathSnapshot`] and publishes changes to subscribers.
///
/// Readers call [`ClasspathHandle::snapshot`] for a cheap `Arc` clone; the workspace
/// indexer and compilation service subscribe via [`ClasspathHandle::subscribe`] to
/// react to re-resolution (a `build.gradle` edit, a watched-file event) by
/// invalidating open documents and reindexing.
#[derive(Clone)]
pub struct ClasspathHandle {
    current: Arc<RwLock<Arc<ClasspathSnapshot>>>,
    changes: broadcast::Sender<Arc<ClasspathSnapshot>>,
}

impl ClasspathHandle {
    pub fn new(initial: ClasspathSnapshot) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { current: Arc::new(RwLock::new(Arc::new(initial))), changes }
    }

    pub fn snapshot(&self) -> Arc<ClasspathSnapshot> {
        self.current.read().clone()
    }

    /// Resolves `workspace_root` with `resolver` and publishes the result if it
    /// differs from the current snapshot.
    ///
    /// Returns `true` when the snapshot changed meaningfully, signalling the caller to
    /// invalidate all open documents and trigger reindexing (`SPEC_FULL.md` §4.7).
    pub fn reresolve(&self, resolver: &dyn ClasspathResolver, workspace_root: &Path) -> EngineResult<bool> {
        let next = Arc::new(resolver.resolve(workspace_root)?);
        let changed = {
            let mut guard = self.current.write();
            let changed = *guard != next;
            if changed {
                *guard = next.clone();
            }
            changed
        };
        if changed {
            tracing::info!(dependencies = next.dependencies.len(), source_roots = next.source_roots.len(), "classpath changed");
            // No subscribers is a normal boot-time state, not a failure.
            let _ = self.changes.send(next);
        }
        Ok(changed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ClasspathSnapshot>> {
        self.changes.subscribe()
    }
}

impl Default for ClasspathHandle {
    fn default() -> Self {
        Self::new(ClasspathSnapshot::default())
    }
}
