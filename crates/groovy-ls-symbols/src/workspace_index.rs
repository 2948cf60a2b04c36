//! Workspace-wide symbol index (`SPEC_FULL.md` §3 `WorkspaceSymbolIndex`): a union of
//! per-file indices keyed by URI.

use crate::file_index::FileSymbolIndex;
use crate::symbol::{Symbol, SymbolId};
use dashmap::DashMap;
use std::sync::Arc;

/// A ranked workspace symbol match.
#[derive(Debug, Clone)]
pub struct Match {
    pub uri: String,
    pub symbol_id: SymbolId,
    rank: MatchRank,
    range_start: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchRank {
    Exact,
    Prefix,
    Substring,
    Fuzzy,
}

/// A union of per-file symbol indices, kept current with each file's most recent
/// successful compile (`SPEC_FULL.md` §3 invariant: "after file F is (re)compiled, the
/// workspace index for F is exactly the file index of the most recent successful
/// ParseUnit for F").
#[derive(Debug, Clone, Default)]
pub struct WorkspaceSymbolIndex {
    files: Arc<DashMap<String, FileSymbolIndex>>,
}

impl WorkspaceSymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the index for `uri` wholesale. Called once per successful compile.
    pub fn update(&self, uri: &str, index: FileSymbolIndex) {
        self.files.insert(uri.to_string(), index);
    }

    /// Drops the index for `uri` (file deletion, per §4.8).
    pub fn remove(&self, uri: &str) {
        self.files.remove(uri);
    }

    /// The current index for `uri`, if any file has been compiled for it.
    pub fn file(&self, uri: &str) -> Option<FileSymbolIndex> {
        self.files.get(uri).map(|entry| entry.clone())
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Ranked workspace symbol search: exact > prefix > substring > fuzzy (subsequence)
    /// matches, then by source range, deterministically independent of map iteration
    /// order (`SPEC_FULL.md` §4.5).
    pub fn find(&self, query: &str, limit: usize) -> Vec<Match> {
        if query.is_empty() {
            return Vec::new();
        }
        let query_lower = query.to_lowercase();
        let mut matches = Vec::new();
        for entry in self.files.iter() {
            let uri = entry.key().clone();
            for (symbol_id, symbol) in entry.value().symbols() {
                if let Some(rank) = rank_of(&query_lower, &symbol.name) {
                    matches.push(Match {
                        uri: uri.clone(),
                        symbol_id,
                        rank,
                        range_start: symbol.declaration_range.start,
                    });
                }
            }
        }
        matches.sort_by(|a, b| {
            a.rank.cmp(&b.rank).then_with(|| a.uri.cmp(&b.uri)).then_with(|| a.range_start.cmp(&b.range_start))
        });
        matches.truncate(limit);
        matches
    }

    /// Resolves a [`Match`] back to its [`Symbol`].
    pub fn resolve(&self, m: &Match) -> Option<Symbol> {
        self.files.get(&m.uri).map(|entry| entry.symbol(m.symbol_id).clone())
    }
}

fn rank_of(query_lower: &str, name: &str) -> Option<MatchRank> {
    let name_lower = name.to_lowercase();
    if name_lower == query_lower {
        Some(MatchRank::Exact)
    } else if name_lower.starts_with(query_lower) {
        Some(MatchRank::Prefix)
    } else if name_lower.contains(query_lower) {
        Some(MatchRank::Substring)
    } else if is_subsequence(query_lower.chars(), &name_lower) {
        Some(MatchRank::Fuzzy)
    } else {
        None
    }
}

fn is_subsequence(mut needle: impl Iterator<Item = char>, haystack: &str) -> bool {
    let Some(mut want) = needle.next() else { return true };
    for c in haystack.chars() {
        if c == want {
            match needle.next() {
                Some(next) => want = next,
                None => return true,
            }
        }
    }
    false
}
