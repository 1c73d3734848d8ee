//! Section-splitting language module for composite documents.
//!
//! Recognizes top-level `<template>`, `<script>` and `<style>` sections and
//! turns each into one embedded file holding the section body verbatim. The
//! body maps to the generated text with an `Offset` mapping; the opening tag
//! maps to the whole generated file with an `Expand` mapping so block-level
//! results (folding, symbols) land on the tag.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::document::{generated_name, Capabilities, EmbeddedFile, GeneratedRoot, Snapshot};
use crate::error::LanguageError;
use crate::mapping::{Mapping, MappingKind};

use super::LanguageModule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Template,
    Script,
    Style,
}

impl BlockKind {
    pub fn tag(self) -> &'static str {
        match self {
            BlockKind::Template => "template",
            BlockKind::Script => "script",
            BlockKind::Style => "style",
        }
    }

    pub fn default_extension(self) -> &'static str {
        match self {
            BlockKind::Template => "html",
            BlockKind::Script => "js",
            BlockKind::Style => "css",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "template" => Some(BlockKind::Template),
            "script" => Some(BlockKind::Script),
            "style" => Some(BlockKind::Style),
            _ => None,
        }
    }
}

/// Opening tag of a top-level section.
static OPEN_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(template|script|style)\b([^>]*)>").unwrap());

/// `lang="ts"` or `lang='scss'` inside an opening tag.
static LANG_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\blang\s*=\s*["']([\w.-]+)["']"#).unwrap());

/// Opening or closing `template` tag, used to track nesting inside a
/// template section.
static TEMPLATE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?)template\b[^>]*>").unwrap());

/// One section found in a composite document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedBlock {
    pub kind: BlockKind,
    /// Value of the `lang` attribute, if any.
    pub lang: Option<String>,
    /// Span of the opening tag.
    pub tag: Range<usize>,
    /// Span of the body between the opening and closing tags.
    pub content: Range<usize>,
}

impl ExtractedBlock {
    pub fn extension(&self) -> &str {
        self.lang
            .as_deref()
            .unwrap_or_else(|| self.kind.default_extension())
    }
}

/// Extract all top-level sections. Tags inside `<!-- -->` comments are
/// ignored. An opening tag without a matching close is an error.
pub fn extract_blocks(source: &str) -> Result<Vec<ExtractedBlock>, String> {
    let comments = find_comment_ranges(source);
    let mut blocks = Vec::new();
    let mut cursor = 0;

    while let Some(captures) = OPEN_TAG.captures_at(source, cursor) {
        let (Some(open), Some(tag_name)) = (captures.get(0), captures.get(1)) else {
            break;
        };
        if is_in_comment(open.start(), &comments) {
            cursor = open.end();
            continue;
        }
        let Some(kind) = BlockKind::from_tag(tag_name.as_str()) else {
            cursor = open.end();
            continue;
        };

        let Some(close) = find_close(source, kind, open.end(), &comments) else {
            return Err(format!(
                "unclosed <{}> block starting at offset {}",
                kind.tag(),
                open.start()
            ));
        };

        let lang = captures
            .get(2)
            .and_then(|attrs| LANG_ATTR.captures(attrs.as_str()))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());

        blocks.push(ExtractedBlock {
            kind,
            lang,
            tag: open.start()..open.end(),
            content: open.end()..close.start,
        });
        cursor = close.end;
    }

    Ok(blocks)
}

/// Span of the tag closing the section whose body starts at `from`.
///
/// Templates nest, so same-kind tags outside comments are counted until the
/// depth returns to zero. Script and style bodies end at the first close.
fn find_close(
    source: &str,
    kind: BlockKind,
    from: usize,
    comments: &[Range<usize>],
) -> Option<Range<usize>> {
    if kind != BlockKind::Template {
        let close_tag = format!("</{}>", kind.tag());
        let start = from + source[from..].find(&close_tag)?;
        return Some(start..start + close_tag.len());
    }

    let mut depth = 1usize;
    for captures in TEMPLATE_TAG.captures_iter(&source[from..]) {
        let tag = captures.get(0)?;
        let start = from + tag.start();
        if is_in_comment(start, comments) {
            continue;
        }
        let closing = captures.get(1).is_some_and(|m| !m.as_str().is_empty());
        if closing {
            depth -= 1;
            if depth == 0 {
                return Some(start..from + tag.end());
            }
        } else if !tag.as_str().ends_with("/>") {
            depth += 1;
        }
    }
    None
}

/// Byte ranges covered by `<!-- ... -->` comments. An unterminated comment
/// runs to the end of the source.
fn find_comment_ranges(source: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut cursor = 0;
    while let Some(start) = source[cursor..].find("<!--") {
        let start = cursor + start;
        let end = source[start + 4..]
            .find("-->")
            .map(|e| start + 4 + e + 3)
            .unwrap_or(source.len());
        ranges.push(start..end);
        cursor = end;
    }
    ranges
}

fn is_in_comment(offset: usize, comments: &[Range<usize>]) -> bool {
    comments.iter().any(|r| r.contains(&offset))
}

/// Language module splitting documents with configured extensions into
/// per-section embedded files.
#[derive(Debug, Clone)]
pub struct BlockLanguage {
    extensions: Vec<String>,
    diagnostic_kinds: Vec<BlockKind>,
}

impl Default for BlockLanguage {
    fn default() -> Self {
        Self::new(vec!["doc".to_string()], vec![BlockKind::Script])
    }
}

impl BlockLanguage {
    pub const ID: &'static str = "blocks";

    /// `extensions` are matched without the leading dot. Only sections whose
    /// kind is in `diagnostic_kinds` are diagnostic-capable.
    pub fn new(extensions: Vec<String>, diagnostic_kinds: Vec<BlockKind>) -> Self {
        let extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        Self {
            extensions,
            diagnostic_kinds,
        }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn diagnostic_kinds(&self) -> &[BlockKind] {
        &self.diagnostic_kinds
    }

    fn accepts(&self, source_id: &str, language_id: &str) -> bool {
        let extension = source_id
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        self.extensions
            .iter()
            .any(|e| extension.as_deref() == Some(e.as_str()) || e == language_id)
    }

    fn capabilities(&self, kind: BlockKind) -> Capabilities {
        if self.diagnostic_kinds.contains(&kind) {
            Capabilities::all()
        } else {
            Capabilities::silent()
        }
    }

    fn build(&self, source_id: &str, source: &str) -> Result<GeneratedRoot, LanguageError> {
        let blocks = extract_blocks(source).map_err(|message| LanguageError::Generate {
            source_id: source_id.to_string(),
            message,
        })?;

        let mut root = GeneratedRoot::new(Self::ID);
        let mut ordinals = [0usize; 3];

        for block in blocks {
            let ordinal = &mut ordinals[block.kind as usize];
            let name = generated_name(source_id, block.kind.tag(), *ordinal, block.extension());
            *ordinal += 1;

            let text = &source[block.content.clone()];
            let capabilities = self.capabilities(block.kind);
            let body = Mapping::offset(block.content.start, 0, text.len(), capabilities);
            let tag = Mapping::new(
                MappingKind::Expand,
                block.tag.clone(),
                0..text.len(),
                Capabilities {
                    folding_range: true,
                    document_symbol: true,
                    ..Capabilities::none()
                },
            );

            let file = EmbeddedFile::new(name, text, vec![body, tag])
                .with_kind(block.kind.tag())
                .with_capabilities(capabilities);
            root.push(file, None);
        }

        Ok(root)
    }
}

impl LanguageModule for BlockLanguage {
    fn id(&self) -> &str {
        Self::ID
    }

    fn create_embedded_files(
        &self,
        source_id: &str,
        language_id: &str,
        snapshot: &Snapshot,
    ) -> Result<Option<GeneratedRoot>, LanguageError> {
        if !self.accepts(source_id, language_id) {
            return Ok(None);
        }
        self.build(source_id, snapshot.text()).map(Some)
    }
}
