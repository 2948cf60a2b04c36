//! Authoritative open-document text store (`SPEC_FULL.md` §3 `Document`, §4.1).
//!
//! While a document is open, the store's text for that URI is the ground truth — the
//! compilation service and workspace indexer never fall back to the filesystem for an
//! open URI. Full-text sync only: callers resolve partial edits into whole-document
//! text before calling [`SourceStore::put`].
//!
//! Each URI is an independent key in a [`dashmap::DashMap`], giving the store
//! fine-grained per-key locking rather than one `RwLock` guarding the whole map — many
//! documents can be written concurrently without contending on an unrelated URI's
//! entry, which is what §5's "fine-grained synchronisation that permits concurrent
//! readers and single writers per key" calls for.

use dashmap::DashMap;
use groovy_ls_fingerprint::Fingerprint;
use std::sync::Arc;

/// A single open document: its text, the client's monotonic version, and the
/// fingerprint of that text.
#[derive(Debug, Clone)]
pub struct Document {
    /// The document's normalised URI key.
    pub uri: String,
    /// The client-supplied monotonic version number.
    pub version: i32,
    /// The full document text.
    pub text: Arc<str>,
    /// The stable content fingerprint of `text`.
    pub fingerprint: Fingerprint,
}

impl Document {
    fn new(uri: String, version: i32, text: String) -> Self {
        let fingerprint = Fingerprint::of(&text);
        Self { uri, version, text: Arc::from(text), fingerprint }
    }
}

/// Thread-safe store of authoritative open-document text, keyed by URI.
#[derive(Debug, Clone, Default)]
pub struct SourceStore {
    documents: Arc<DashMap<String, Document>>,
}

impl SourceStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self { documents: Arc::new(DashMap::new()) }
    }

    /// Opens or fully replaces a document's text (`did_open`/`did_change`).
    ///
    /// This is the "write" half of the per-URI ordering guarantee in §5: the new text
    /// is visible to any subsequent [`SourceStore::get`] as soon as this call returns.
    pub fn put(&self, uri: &str, version: i32, text: String) -> Document {
        let key = groovy_ls_uri::uri_key(uri);
        let doc = Document::new(key.clone(), version, text);
        tracing::debug!(uri = %key, version, "document text updated");
        self.documents.insert(key, doc.clone());
        doc
    }

    /// Removes a document from the store (`did_close`).
    ///
    /// Returns `true` if the URI was present.
    pub fn remove(&self, uri: &str) -> bool {
        let key = groovy_ls_uri::uri_key(uri);
        let removed = self.documents.remove(&key).is_some();
        tracing::debug!(uri = %key, removed, "document closed");
        removed
    }

    /// Returns the current document for `uri`, if open.
    pub fn get(&self, uri: &str) -> Option<Document> {
        let key = groovy_ls_uri::uri_key(uri);
        self.documents.get(&key).map(|entry| entry.clone())
    }

    /// Returns the current text for `uri`, if open.
    pub fn get_text(&self, uri: &str) -> Option<Arc<str>> {
        self.get(uri).map(|doc| doc.text)
    }

    /// Whether `uri` is currently open.
    pub fn is_open(&self, uri: &str) -> bool {
        self.documents.contains_key(&groovy_ls_uri::uri_key(uri))
    }

    /// A snapshot of every open URI and its current text.
    pub fn snapshot(&self) -> std::collections::HashMap<String, Arc<str>> {
        self.documents.iter().map(|entry| (entry.key().clone(), entry.value().text.clone())).collect()
    }

    /// Every currently open URI.
    pub fn all_uris(&self) -> Vec<String> {
        self.documents.iter().map(|entry| entry.key().clone()).collect()
    }

    /// The number of currently open documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the store has no open documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
