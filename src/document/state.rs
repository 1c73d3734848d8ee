//! Editor-side storage for open documents.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::bridge::ProjectHost;

use super::text::Snapshot;

/// One document as the editor last sent it.
#[derive(Debug, Clone)]
pub struct OpenDocument {
    pub snapshot: Snapshot,
    /// Document version from the client.
    pub version: i32,
    pub language_id: Option<String>,
}

/// Thread-safe storage for open documents, keyed by URI string.
///
/// Every open, change or close bumps a store-wide counter, which the bridge
/// uses to skip syncing when nothing changed.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: DashMap<String, Arc<OpenDocument>>,
    revision: AtomicU64,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open or replace a document.
    pub fn open(
        &self,
        uri: impl Into<String>,
        text: impl Into<Arc<str>>,
        version: i32,
        language_id: Option<String>,
    ) -> Arc<OpenDocument> {
        let document = Arc::new(OpenDocument {
            snapshot: Snapshot::new(text),
            version,
            language_id,
        });
        self.documents.insert(uri.into(), Arc::clone(&document));
        self.revision.fetch_add(1, Ordering::SeqCst);
        document
    }

    /// Replace a document's text, keeping its language id.
    pub fn change(&self, uri: &str, text: impl Into<Arc<str>>, version: i32) -> Arc<OpenDocument> {
        let language_id = self.get(uri).and_then(|d| d.language_id.clone());
        self.open(uri, text, version, language_id)
    }

    pub fn close(&self, uri: &str) {
        if self.documents.remove(uri).is_some() {
            self.revision.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn get(&self, uri: &str) -> Option<Arc<OpenDocument>> {
        self.documents.get(uri).map(|r| Arc::clone(&r))
    }

    pub fn uris(&self) -> Vec<String> {
        let mut uris: Vec<String> = self.documents.iter().map(|r| r.key().clone()).collect();
        uris.sort();
        uris
    }
}

impl ProjectHost for DocumentStore {
    fn project_version(&self) -> Option<String> {
        Some(self.revision.load(Ordering::SeqCst).to_string())
    }

    fn script_file_names(&self) -> Vec<String> {
        self.uris()
    }

    fn script_version(&self, name: &str) -> Option<String> {
        self.get(name).map(|d| d.version.to_string())
    }

    fn script_snapshot(&self, name: &str) -> Option<Snapshot> {
        self.get(name).map(|d| d.snapshot.clone())
    }

    fn language_id(&self, name: &str) -> Option<String> {
        self.get(name).and_then(|d| d.language_id.clone())
    }

    fn file_exists(&self, name: &str) -> bool {
        self.documents.contains_key(name)
    }

    fn directory_exists(&self, directory: &str) -> bool {
        let prefix = format!("{}/", directory.trim_end_matches('/'));
        self.documents.iter().any(|r| r.key().starts_with(&prefix))
    }

    fn read_directory(&self, directory: &str, extensions: &[&str]) -> Vec<String> {
        let prefix = format!("{}/", directory.trim_end_matches('/'));
        self.uris()
            .into_iter()
            .filter(|uri| uri.starts_with(&prefix))
            .filter(|uri| extensions.is_empty() || extensions.iter().any(|e| uri.ends_with(e)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_tracks_edits() {
        let store = DocumentStore::new();
        let v0 = store.project_version();
        store.open("file:///a.doc", "x", 1, Some("doc".into()));
        let v1 = store.project_version();
        assert_ne!(v0, v1);

        store.change("file:///a.doc", "y", 2);
        let doc = store.get("file:///a.doc").unwrap();
        assert_eq!(doc.snapshot.text(), "y");
        assert_eq!(doc.language_id.as_deref(), Some("doc"));

        store.close("file:///missing.doc");
        assert_eq!(store.project_version(), Some("2".to_string()));
        store.close("file:///a.doc");
        assert!(store.script_file_names().is_empty());
    }

    #[test]
    fn reads_directories() {
        let store = DocumentStore::new();
        store.open("file:///p/a.ts", "", 1, None);
        store.open("file:///p/b.doc", "", 1, None);
        store.open("file:///q/c.ts", "", 1, None);
        assert!(store.directory_exists("file:///p"));
        assert_eq!(store.read_directory("file:///p", &[".ts"]), vec!["file:///p/a.ts"]);
    }
}
