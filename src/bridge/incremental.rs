//! Keeps the registry and the host-facing file list in step with the editor.
//!
//! `IncrementalHost::sync` runs once per batch of host queries. Composite
//! documents are regenerated only when their own version changes, and the
//! project version exposed to the host is raised only when the text of a
//! diagnostic-capable embedded file (or an ordinary file) actually changed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::document::{EmbeddedFileId, GeneratedRoot, Registry, Snapshot, SourceScript};
use crate::error::LanguageError;
use crate::language::LanguageModule;

use super::host::{ProjectHost, ScriptHost};

/// SHA-256 of `text`, hex encoded.
pub fn content_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// `(name, text)` of every diagnostic-capable file in walk order.
fn diagnostic_texts(root: &GeneratedRoot) -> Vec<(String, Arc<str>)> {
    root.walk()
        .filter(|(_, file)| file.capabilities().diagnostic)
        .map(|(_, file)| (file.name().to_owned(), file.shared_text()))
        .collect()
}

/// `ScriptHost` over a `ProjectHost` delegate that swaps composite documents
/// for their embedded files and versions them incrementally.
pub struct IncrementalHost<H> {
    delegate: H,
    registry: Registry,
    languages: Vec<Box<dyn LanguageModule>>,
    salt_versions: bool,
    upstream_version: Option<String>,
    project_version: u64,
    /// Last version token seen per composite document. `None` forces a
    /// regeneration on the next sync.
    composite_versions: HashMap<String, Option<String>>,
    /// Last version token (or content hash) per ordinary file.
    ordinary_versions: HashMap<String, String>,
    /// Ordinary files whose language module failed; offered again next sync.
    retry: HashSet<String>,
    content_hashes: HashMap<EmbeddedFileId, String>,
}

impl<H: ProjectHost> IncrementalHost<H> {
    pub fn new(delegate: H, languages: Vec<Box<dyn LanguageModule>>) -> Self {
        Self {
            delegate,
            registry: Registry::new(),
            languages,
            salt_versions: false,
            upstream_version: None,
            project_version: 0,
            composite_versions: HashMap::new(),
            ordinary_versions: HashMap::new(),
            retry: HashSet::new(),
            content_hashes: HashMap::new(),
        }
    }

    /// Prefix embedded-file versions with the owning document's version, for
    /// hosts that cache output under a combined hash.
    pub fn with_salted_versions(mut self, salt: bool) -> Self {
        self.salt_versions = salt;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn delegate(&self) -> &H {
        &self.delegate
    }

    /// Bring the registry up to date with the delegate.
    ///
    /// Returns `true` if the project version was raised.
    pub fn sync(&mut self) -> bool {
        let upstream = self.delegate.project_version();
        if upstream.is_some() && upstream == self.upstream_version {
            return false;
        }

        let names = self.delegate.script_file_names();
        let present: HashSet<&str> = names.iter().map(String::as_str).collect();
        let mut changed = false;

        let removed: Vec<String> = self
            .registry
            .source_ids()
            .filter(|id| !present.contains(id))
            .map(str::to_owned)
            .collect();
        for name in removed {
            changed |= self.remove_composite(&name);
        }

        let known = self.ordinary_versions.len();
        self.ordinary_versions
            .retain(|name, _| present.contains(name.as_str()));
        self.retry.retain(|name| present.contains(name.as_str()));
        changed |= self.ordinary_versions.len() != known;

        for name in &names {
            changed |= self.sync_file(name);
        }

        if changed {
            self.project_version += 1;
            info!(
                project_version = self.project_version,
                "host-visible files changed"
            );
        }
        self.upstream_version = upstream;
        changed
    }

    fn sync_file(&mut self, name: &str) -> bool {
        let Some(snapshot) = self.delegate.script_snapshot(name) else {
            debug!(name, "no snapshot; treating file as deleted");
            let was_ordinary = self.ordinary_versions.remove(name).is_some();
            return self.remove_composite(name) || was_ordinary;
        };
        let version = self.delegate.script_version(name);

        if self.registry.has(name) {
            self.update_composite(name, snapshot, version)
        } else {
            self.sync_ordinary(name, snapshot, version)
        }
    }

    fn sync_ordinary(&mut self, name: &str, snapshot: Snapshot, version: Option<String>) -> bool {
        let token = version
            .clone()
            .unwrap_or_else(|| content_hash(snapshot.text()));
        let unchanged = self.ordinary_versions.get(name) == Some(&token);
        if unchanged && !self.retry.contains(name) {
            return false;
        }
        self.retry.remove(name);

        let language_id = self.language_id(name);
        match self.claim(name, &language_id, &snapshot) {
            Ok(Some(root)) => {
                debug!(name, language = root.language(), "claimed composite document");
                self.ordinary_versions.remove(name);
                self.register(name, language_id, snapshot, version, root);
                true
            }
            Ok(None) => {
                self.ordinary_versions.insert(name.to_owned(), token);
                !unchanged
            }
            Err(err) => {
                warn!(name, %err, "language module failed; treating as an ordinary file");
                self.ordinary_versions.insert(name.to_owned(), token);
                self.retry.insert(name.to_owned());
                !unchanged
            }
        }
    }

    fn update_composite(&mut self, name: &str, snapshot: Snapshot, version: Option<String>) -> bool {
        if version.is_some() && self.composite_versions.get(name) == Some(&version) {
            return false;
        }
        let Some(script) = self.registry.get(name) else {
            return false;
        };

        let language_id = script.language_id().to_owned();
        let before = diagnostic_texts(script.generated());
        let result = self
            .module(script.generated().language(), name)
            .and_then(|module| {
                module.update_embedded_files(name, &language_id, script.generated(), &snapshot)
            });

        match result {
            Ok(Some(root)) => {
                let changed = before != diagnostic_texts(&root);
                debug!(name, changed, "regenerated embedded files");
                self.register(name, language_id, snapshot, version, root);
                changed
            }
            Ok(None) => {
                debug!(name, "language module released document");
                let removed = self.remove_composite(name);
                self.sync_ordinary(name, snapshot, version) || removed
            }
            Err(err) => {
                warn!(name, %err, "keeping previous embedded files");
                self.composite_versions.insert(name.to_owned(), None);
                false
            }
        }
    }

    fn module(&self, id: &str, source_id: &str) -> Result<&dyn LanguageModule, LanguageError> {
        self.languages
            .iter()
            .find(|module| module.id() == id)
            .map(|module| module.as_ref())
            .ok_or_else(|| LanguageError::Unclaimed {
                language: id.to_owned(),
                source_id: source_id.to_owned(),
            })
    }

    /// Offer a document to each module in turn; the first to accept wins.
    fn claim(
        &self,
        name: &str,
        language_id: &str,
        snapshot: &Snapshot,
    ) -> Result<Option<GeneratedRoot>, LanguageError> {
        for module in &self.languages {
            if let Some(root) = module.create_embedded_files(name, language_id, snapshot)? {
                return Ok(Some(root));
            }
        }
        Ok(None)
    }

    fn language_id(&self, name: &str) -> String {
        self.delegate.language_id(name).unwrap_or_else(|| {
            name.rsplit_once('.')
                .map(|(_, ext)| ext.to_ascii_lowercase())
                .unwrap_or_default()
        })
    }

    fn register(
        &mut self,
        name: &str,
        language_id: String,
        snapshot: Snapshot,
        version: Option<String>,
        root: GeneratedRoot,
    ) {
        let script = SourceScript::new(name, language_id, snapshot, version.clone(), root);
        if let Some(old) = self.registry.set(script) {
            self.forget(&old);
        }
        if let Some(script) = self.registry.get(name) {
            for (_, file) in script.generated().walk() {
                if let Some(id) = file.id() {
                    self.content_hashes.insert(id, content_hash(file.text()));
                }
            }
        }
        self.composite_versions.insert(name.to_owned(), version);
    }

    /// Returns `true` if the removed tree had diagnostic-capable files.
    fn remove_composite(&mut self, name: &str) -> bool {
        self.composite_versions.remove(name);
        let Some(old) = self.registry.delete(name) else {
            return false;
        };
        debug!(name, "removed composite document");
        self.forget(&old);
        !diagnostic_texts(old.generated()).is_empty()
    }

    fn forget(&mut self, script: &SourceScript) {
        for (_, file) in script.generated().walk() {
            if let Some(id) = file.id() {
                self.content_hashes.remove(&id);
            }
        }
    }
}

impl<H: ProjectHost> ScriptHost for IncrementalHost<H> {
    /// Ordinary files followed by diagnostic-capable embedded files. Composite
    /// sources themselves are not listed.
    fn script_file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.ordinary_versions.keys().cloned().collect();
        names.sort();
        names.extend(
            self.registry
                .scripts()
                .flat_map(|script| script.generated().walk())
                .filter(|(_, file)| file.capabilities().diagnostic)
                .map(|(_, file)| file.name().to_owned()),
        );
        names
    }

    fn script_version(&self, name: &str) -> Option<String> {
        let Some((script, file)) = self.registry.owner(name) else {
            return self.delegate.script_version(name);
        };
        let hash = file
            .id()
            .and_then(|id| self.content_hashes.get(&id).cloned())
            .unwrap_or_else(|| content_hash(file.text()));
        if self.salt_versions {
            Some(format!("{}:{}", script.version().unwrap_or_default(), hash))
        } else {
            Some(hash)
        }
    }

    fn script_snapshot(&self, name: &str) -> Option<Snapshot> {
        match self.registry.embedded(name) {
            Some(file) => Some(Snapshot::new(file.shared_text())),
            None => self.delegate.script_snapshot(name),
        }
    }

    fn project_version(&self) -> String {
        self.project_version.to_string()
    }

    fn file_exists(&self, name: &str) -> bool {
        self.registry.owner(name).is_some() || self.delegate.file_exists(name)
    }

    fn directory_exists(&self, directory: &str) -> bool {
        let directory = directory.trim_end_matches('/');
        let nested = format!("{directory}/");
        self.registry
            .directories()
            .iter()
            .any(|d| d == directory || d.starts_with(&nested))
            || self.delegate.directory_exists(directory)
    }

    fn read_directory(&self, directory: &str, extensions: &[&str]) -> Vec<String> {
        let prefix = format!("{}/", directory.trim_end_matches('/'));
        let mut names = self.delegate.read_directory(directory, extensions);
        names.extend(
            self.registry
                .file_names()
                .iter()
                .filter(|name| name.starts_with(&prefix))
                .filter(|name| extensions.is_empty() || extensions.iter().any(|e| name.ends_with(e)))
                .cloned(),
        );
        names.sort();
        names.dedup();
        names
    }
}
