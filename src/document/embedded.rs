//! Generated artifacts produced for one composite source document.
//!
//! A `GeneratedRoot` is an arena of `EmbeddedFile` nodes. Nodes refer to their
//! children by index, and the whole arena is replaced when the owning source
//! changes; nothing inside it is ever patched in place.

use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::mapping::{Mapping, MappingIndex, Side};

/// Registry-assigned identity of an embedded file, unique for the lifetime of
/// the registry. A regenerated file always receives a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EmbeddedFileId(pub(crate) u64);

/// Result kinds a host-service answer can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultKind {
    Diagnostic,
    Rename,
    Formatting,
    FoldingRange,
    DocumentSymbol,
    CodeAction,
    Completion,
    SemanticTokens,
    InlayHint,
}

/// Which result kinds may flow through a file or a mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub diagnostic: bool,
    pub rename: bool,
    pub formatting: bool,
    pub folding_range: bool,
    pub document_symbol: bool,
    pub code_action: bool,
    pub completion: bool,
    pub semantic_tokens: bool,
    pub inlay_hint: bool,
}

impl Capabilities {
    pub const fn all() -> Self {
        Self {
            diagnostic: true,
            rename: true,
            formatting: true,
            folding_range: true,
            document_symbol: true,
            code_action: true,
            completion: true,
            semantic_tokens: true,
            inlay_hint: true,
        }
    }

    pub const fn none() -> Self {
        Self {
            diagnostic: false,
            rename: false,
            formatting: false,
            folding_range: false,
            document_symbol: false,
            code_action: false,
            completion: false,
            semantic_tokens: false,
            inlay_hint: false,
        }
    }

    /// Everything except diagnostics.
    pub const fn silent() -> Self {
        let mut caps = Self::all();
        caps.diagnostic = false;
        caps
    }

    pub fn allows(&self, kind: ResultKind) -> bool {
        match kind {
            ResultKind::Diagnostic => self.diagnostic,
            ResultKind::Rename => self.rename,
            ResultKind::Formatting => self.formatting,
            ResultKind::FoldingRange => self.folding_range,
            ResultKind::DocumentSymbol => self.document_symbol,
            ResultKind::CodeAction => self.code_action,
            ResultKind::Completion => self.completion,
            ResultKind::SemanticTokens => self.semantic_tokens,
            ResultKind::InlayHint => self.inlay_hint,
        }
    }
}

/// What a teleport link may be followed for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TeleportInfo {
    pub definition: bool,
    pub references: bool,
    pub rename: bool,
}

/// Generated-to-generated links inside one embedded file.
///
/// Both sides of each mapping are offsets in the same generated text, so a
/// lookup is attempted in both directions.
#[derive(Debug, Clone, Default)]
pub struct Teleport {
    links: MappingIndex<TeleportInfo>,
}

impl Teleport {
    pub fn new(links: Vec<Mapping<TeleportInfo>>) -> Self {
        Self {
            links: MappingIndex::new(links),
        }
    }

    pub fn links(&self) -> &MappingIndex<TeleportInfo> {
        &self.links
    }

    /// Every generated range linked to `range`, in either direction.
    pub fn other_sides<'a, F>(
        &'a self,
        range: Range<usize>,
        filter: F,
    ) -> impl Iterator<Item = Range<usize>> + 'a
    where
        F: Fn(&TeleportInfo) -> bool + Copy + 'a,
    {
        let forward = self.links.translate(Side::Source, range.clone(), filter);
        let backward = self.links.translate(Side::Generated, range, filter);
        forward.chain(backward).map(|(range, _)| range)
    }
}

/// One generated artifact.
#[derive(Debug, Clone)]
pub struct EmbeddedFile {
    id: Option<EmbeddedFileId>,
    name: String,
    kind: String,
    text: Arc<str>,
    mappings: MappingIndex<Capabilities>,
    capabilities: Capabilities,
    teleport: Option<Teleport>,
    children: Vec<usize>,
}

impl EmbeddedFile {
    pub fn new(
        name: impl Into<String>,
        text: impl Into<Arc<str>>,
        mappings: Vec<Mapping<Capabilities>>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            kind: String::new(),
            text: text.into(),
            mappings: MappingIndex::new(mappings),
            capabilities: Capabilities::all(),
            teleport: None,
            children: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_teleport(mut self, teleport: Teleport) -> Self {
        self.teleport = Some(teleport);
        self
    }

    /// Assigned when the owning root is registered.
    pub fn id(&self) -> Option<EmbeddedFileId> {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block kind the file was generated from (e.g. `script`).
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn shared_text(&self) -> Arc<str> {
        Arc::clone(&self.text)
    }

    pub fn mappings(&self) -> &MappingIndex<Capabilities> {
        &self.mappings
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn teleport(&self) -> Option<&Teleport> {
        self.teleport.as_ref()
    }

    /// Arena indices of the direct children.
    pub fn children(&self) -> &[usize] {
        &self.children
    }
}

/// The tree of embedded files one language module produced for a source.
#[derive(Debug, Clone)]
pub struct GeneratedRoot {
    language: String,
    nodes: Vec<EmbeddedFile>,
    roots: Vec<usize>,
}

impl GeneratedRoot {
    /// Create an empty tree owned by the language module `language`.
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            nodes: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Add a file under `parent` (or at the top level) and return its index.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is not an index previously returned by `push`.
    pub fn push(&mut self, file: EmbeddedFile, parent: Option<usize>) -> usize {
        let index = self.nodes.len();
        match parent {
            Some(parent) => self.nodes[parent].children.push(index),
            None => self.roots.push(index),
        }
        self.nodes.push(file);
        index
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn get(&self, index: usize) -> Option<&EmbeddedFile> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pre-order traversal: a node, then its children in order.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            root: self,
            stack: self.roots.iter().rev().copied().collect(),
        }
    }

    pub(crate) fn assign_ids(&mut self, mut next: impl FnMut() -> EmbeddedFileId) {
        for node in &mut self.nodes {
            node.id = Some(next());
        }
    }
}

/// Iterative pre-order walk over a `GeneratedRoot`, yielding arena indices
/// alongside the nodes.
#[derive(Debug, Clone)]
pub struct Walk<'a> {
    root: &'a GeneratedRoot,
    stack: Vec<usize>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a EmbeddedFile);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        let node = self.root.nodes.get(index)?;
        self.stack.extend(node.children.iter().rev());
        Some((index, node))
    }
}

/// Build the generated name `<source>.<kind>_<ordinal>.<ext>`.
pub fn generated_name(source: &str, kind: &str, ordinal: usize, extension: &str) -> String {
    format!("{source}.{kind}_{ordinal}.{extension}")
}

/// Recover the owning source name from a generated name by stripping the
/// `.<kind>_<ordinal>.<ext>` suffix. Returns `None` if the name does not
/// have that shape.
pub fn source_name_of(generated: &str) -> Option<&str> {
    let (rest, extension) = generated.rsplit_once('.')?;
    let (source, block) = rest.rsplit_once('.')?;
    let (kind, ordinal) = block.rsplit_once('_')?;
    let valid = !extension.is_empty()
        && !source.is_empty()
        && !kind.is_empty()
        && !ordinal.is_empty()
        && ordinal.bytes().all(|b| b.is_ascii_digit());
    valid.then_some(source)
}
