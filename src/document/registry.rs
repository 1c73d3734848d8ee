//! Registry of composite source documents and their generated trees.

use std::collections::{BTreeSet, HashMap};
use std::ops::Range;
use std::sync::OnceLock;

use indexmap::IndexMap;

use super::embedded::{Capabilities, EmbeddedFile, EmbeddedFileId, GeneratedRoot, Teleport};
use super::text::Snapshot;

/// A composite document as last seen by the registry.
#[derive(Debug, Clone)]
pub struct SourceScript {
    id: String,
    language_id: String,
    snapshot: Snapshot,
    version: Option<String>,
    generated: GeneratedRoot,
}

impl SourceScript {
    pub fn new(
        id: impl Into<String>,
        language_id: impl Into<String>,
        snapshot: Snapshot,
        version: Option<String>,
        generated: GeneratedRoot,
    ) -> Self {
        Self {
            id: id.into(),
            language_id: language_id.into(),
            snapshot,
            version,
            generated,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn language_id(&self) -> &str {
        &self.language_id
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Host-supplied version token; `None` if the host did not report one.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn generated(&self) -> &GeneratedRoot {
        &self.generated
    }
}

/// Where an embedded file lives: its owning source and arena index.
#[derive(Debug, Clone)]
struct Owner {
    source_id: String,
    index: usize,
}

/// Lookup tables derived from the backing map, rebuilt after any mutation.
#[derive(Debug, Default)]
struct Views {
    file_names: Vec<String>,
    directories: Vec<String>,
    owners: HashMap<String, Owner>,
    teleports: HashMap<String, Owner>,
}

impl Views {
    fn build(scripts: &IndexMap<String, SourceScript>) -> Self {
        let mut views = Views::default();
        let mut directories = BTreeSet::new();

        for script in scripts.values() {
            for (index, file) in script.generated.walk() {
                let owner = Owner {
                    source_id: script.id.clone(),
                    index,
                };
                let key = lookup_key(file.name());
                // Later registrations shadow earlier ones for the same name.
                if file.teleport().is_some() {
                    views.teleports.insert(key.clone(), owner.clone());
                } else {
                    views.teleports.remove(&key);
                }
                views.owners.insert(key, owner);
                views.file_names.push(file.name().to_owned());
                if let Some((dir, _)) = file.name().rsplit_once('/') {
                    directories.insert(dir.to_owned());
                }
            }
        }

        views.directories = directories.into_iter().collect();
        views
    }
}

/// Names are matched case-insensitively since the host may run on a
/// case-insensitive file system.
fn lookup_key(name: &str) -> String {
    name.to_lowercase()
}

/// A source-side answer to a generated-location query.
#[derive(Debug, Clone)]
pub struct SourceLocation<'a> {
    pub file_name: &'a str,
    pub range: Range<usize>,
    /// `None` for the identity pass-through of a non-embedded file.
    pub owner: Option<&'a SourceScript>,
    pub data: Option<&'a Capabilities>,
}

/// Owns every registered `SourceScript` and its generated tree.
///
/// Sources are kept in registration order; replacing a source keeps its
/// original position. One instance exists per server; components receive it
/// by reference.
#[derive(Debug, Default)]
pub struct Registry {
    scripts: IndexMap<String, SourceScript>,
    next_file_id: u64,
    views: OnceLock<Views>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a source and its generated tree, returning the
    /// previous entry. Embedded files receive fresh ids.
    pub fn set(&mut self, mut script: SourceScript) -> Option<SourceScript> {
        let next = &mut self.next_file_id;
        script.generated.assign_ids(|| {
            *next += 1;
            EmbeddedFileId(*next)
        });
        self.views = OnceLock::new();
        self.scripts.insert(script.id.clone(), script)
    }

    pub fn delete(&mut self, source_id: &str) -> Option<SourceScript> {
        let removed = self.scripts.shift_remove(source_id);
        if removed.is_some() {
            self.views = OnceLock::new();
        }
        removed
    }

    pub fn has(&self, source_id: &str) -> bool {
        self.scripts.contains_key(source_id)
    }

    pub fn get(&self, source_id: &str) -> Option<&SourceScript> {
        self.scripts.get(source_id)
    }

    pub fn scripts(&self) -> impl Iterator<Item = &SourceScript> {
        self.scripts.values()
    }

    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.scripts.keys().map(String::as_str)
    }

    fn views(&self) -> &Views {
        self.views.get_or_init(|| Views::build(&self.scripts))
    }

    /// Every embedded file name, in registry walk order.
    pub fn file_names(&self) -> &[String] {
        &self.views().file_names
    }

    /// Distinct directories containing embedded files.
    pub fn directories(&self) -> &[String] {
        &self.views().directories
    }

    fn resolve(&self, owner: &Owner) -> Option<(&SourceScript, &EmbeddedFile)> {
        let script = self.scripts.get(&owner.source_id)?;
        let file = script.generated.get(owner.index)?;
        Some((script, file))
    }

    /// The source and embedded file behind a generated name.
    pub fn owner(&self, generated_name: &str) -> Option<(&SourceScript, &EmbeddedFile)> {
        let owner = self.views().owners.get(&lookup_key(generated_name))?;
        self.resolve(owner)
    }

    pub fn embedded(&self, generated_name: &str) -> Option<&EmbeddedFile> {
        self.owner(generated_name).map(|(_, file)| file)
    }

    pub fn teleport(&self, generated_name: &str) -> Option<&Teleport> {
        let owner = self.views().teleports.get(&lookup_key(generated_name))?;
        self.resolve(owner)?.1.teleport()
    }

    /// Translate a generated range into source locations.
    ///
    /// `filter` is applied to each mapping's data; `index_filter` can reject
    /// the whole file before any range math. A name that is not an embedded
    /// file yields itself unchanged, so plain files pass straight through.
    pub fn from_generated_location<'a, F, I>(
        &'a self,
        generated_name: &'a str,
        range: Range<usize>,
        filter: F,
        index_filter: I,
    ) -> impl Iterator<Item = SourceLocation<'a>> + 'a
    where
        F: Fn(&Capabilities) -> bool + 'a,
        I: FnOnce(&EmbeddedFile) -> bool,
    {
        let owner = self.owner(generated_name);

        let mapped = owner
            .filter(|(_, file)| index_filter(file))
            .map(|(script, file)| {
                file.mappings()
                    .to_source(range.clone(), filter)
                    .map(move |(range, mapping)| SourceLocation {
                        file_name: script.id(),
                        range,
                        owner: Some(script),
                        data: Some(&mapping.data),
                    })
            });
        let identity = owner.is_none().then(|| SourceLocation {
            file_name: generated_name,
            range,
            owner: None,
            data: None,
        });

        mapped.into_iter().flatten().chain(identity)
    }
}
