//! Symbol index (`SPEC_FULL.md` §4.5): per-file symbols built from a `ParseUnit`, and
//! the workspace-wide union used by rename, find-references, and workspace-symbol
//! queries.

mod file_index;
mod symbol;
mod workspace_index;

pub use file_index::FileSymbolIndex;
pub use symbol::{Symbol, SymbolId, SymbolKind, Usage};
pub use workspace_index::{Match, WorkspaceSymbolIndex};
