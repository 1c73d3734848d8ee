//! Translation of host-service results from generated to source coordinates.
//!
//! Each result is first looked up with its full range. If nothing maps the
//! combined range, the start and end offsets are resolved on their own and,
//! when both land in the same file, stitched back together. Results that
//! still cannot be placed are dropped: a location inside generated code means
//! nothing to the author of the composite document.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;

use tracing::debug;

use crate::document::{Registry, ResultKind, SourceScript, TeleportInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

/// A diagnostic as reported by the host service.
#[derive(Debug, Clone, PartialEq)]
pub struct HostDiagnostic {
    pub file_name: String,
    pub start: usize,
    pub length: usize,
    pub message: String,
    pub severity: Severity,
    pub code: Option<String>,
    pub source: Option<String>,
    /// "See also" entries attached to the diagnostic.
    pub related: Vec<HostDiagnostic>,
    /// Full text of `file_name`, when the consumer needs it for context.
    pub file_text: Option<Arc<str>>,
}

impl HostDiagnostic {
    pub fn new(
        file_name: impl Into<String>,
        start: usize,
        length: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            start,
            length,
            message: message.into(),
            severity: Severity::Error,
            code: None,
            source: None,
            related: Vec::new(),
            file_text: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_related(mut self, related: HostDiagnostic) -> Self {
        self.related.push(related);
        self
    }

    pub fn span(&self) -> Range<usize> {
        self.start..self.start.saturating_add(self.length)
    }
}

/// A text edit (rename, formatting) as reported by the host service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTextEdit {
    pub file_name: String,
    pub start: usize,
    pub length: usize,
    pub new_text: String,
}

/// A plain location (definition, reference, symbol, folding range).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostLocation {
    pub file_name: String,
    pub start: usize,
    pub length: usize,
}

impl HostLocation {
    pub fn new(file_name: impl Into<String>, start: usize, length: usize) -> Self {
        Self {
            file_name: file_name.into(),
            start,
            length,
        }
    }

    pub fn span(&self) -> Range<usize> {
        self.start..self.start.saturating_add(self.length)
    }
}

/// Where a generated range ended up in source coordinates.
#[derive(Debug, Clone)]
pub struct Resolved<'a> {
    pub file_name: &'a str,
    pub range: Range<usize>,
    pub owner: Option<&'a SourceScript>,
}

/// Converts host-service results into source coordinates.
///
/// `file_exists` decides which target files the editor considers real;
/// results landing anywhere else are dropped.
pub struct ResultTranslator<'a, E> {
    registry: &'a Registry,
    file_exists: E,
}

impl<'a, E> ResultTranslator<'a, E>
where
    E: Fn(&str) -> bool,
{
    pub fn new(registry: &'a Registry, file_exists: E) -> Self {
        Self {
            registry,
            file_exists,
        }
    }

    /// Resolve a generated range for results of `kind`.
    pub fn resolve<'b>(
        &self,
        file_name: &'b str,
        range: Range<usize>,
        kind: ResultKind,
    ) -> Option<Resolved<'b>>
    where
        'a: 'b,
    {
        let resolved = self
            .first(file_name, range.clone(), kind)
            .or_else(|| self.split(file_name, range.clone(), kind));

        match resolved {
            Some(resolved) if (self.file_exists)(resolved.file_name) => Some(resolved),
            Some(resolved) => {
                debug!(
                    file_name = resolved.file_name,
                    "dropping result for a file the editor does not know"
                );
                None
            }
            None => {
                debug!(
                    file_name,
                    start = range.start,
                    end = range.end,
                    ?kind,
                    "dropping result without a source mapping"
                );
                None
            }
        }
    }

    fn first<'b>(
        &self,
        file_name: &'b str,
        range: Range<usize>,
        kind: ResultKind,
    ) -> Option<Resolved<'b>>
    where
        'a: 'b,
    {
        let registry: &'b Registry = self.registry;
        registry
            .from_generated_location(
                file_name,
                range,
                move |data| data.allows(kind),
                |file| file.capabilities().allows(kind),
            )
            .next()
            .map(|location| Resolved {
                file_name: location.file_name,
                range: location.range,
                owner: location.owner,
            })
    }

    /// Resolve both endpoints separately and join them if they agree on the
    /// target file. The joined range is not capped.
    fn split<'b>(
        &self,
        file_name: &'b str,
        range: Range<usize>,
        kind: ResultKind,
    ) -> Option<Resolved<'b>>
    where
        'a: 'b,
    {
        let start = self.first(file_name, range.start..range.start, kind)?;
        let end = self.first(file_name, range.end..range.end, kind)?;
        if start.file_name != end.file_name {
            return None;
        }
        Some(Resolved {
            file_name: start.file_name,
            range: start.range.start..end.range.end.max(start.range.start),
            owner: start.owner,
        })
    }

    /// Translate one diagnostic and, recursively, its related entries. A
    /// related entry that cannot be translated is left out.
    pub fn diagnostic(&self, diagnostic: &HostDiagnostic) -> Option<HostDiagnostic> {
        let resolved = self.resolve(
            &diagnostic.file_name,
            diagnostic.span(),
            ResultKind::Diagnostic,
        )?;
        let related = diagnostic
            .related
            .iter()
            .filter_map(|related| self.diagnostic(related))
            .collect();

        Some(HostDiagnostic {
            file_name: resolved.file_name.to_owned(),
            start: resolved.range.start,
            length: resolved.range.len(),
            message: diagnostic.message.clone(),
            severity: diagnostic.severity,
            code: diagnostic.code.clone(),
            source: diagnostic.source.clone(),
            related,
            file_text: resolved
                .owner
                .map(|owner| owner.snapshot().shared_text())
                .or_else(|| diagnostic.file_text.clone()),
        })
    }

    pub fn diagnostics<'d>(
        &self,
        diagnostics: impl IntoIterator<Item = &'d HostDiagnostic>,
    ) -> Vec<HostDiagnostic> {
        diagnostics
            .into_iter()
            .filter_map(|diagnostic| self.diagnostic(diagnostic))
            .collect()
    }

    /// Translate rename or formatting edits.
    pub fn text_edits(&self, edits: &[HostTextEdit], kind: ResultKind) -> Vec<HostTextEdit> {
        edits
            .iter()
            .filter_map(|edit| {
                let span = edit.start..edit.start.saturating_add(edit.length);
                let resolved = self.resolve(&edit.file_name, span, kind)?;
                Some(HostTextEdit {
                    file_name: resolved.file_name.to_owned(),
                    start: resolved.range.start,
                    length: resolved.range.len(),
                    new_text: edit.new_text.clone(),
                })
            })
            .collect()
    }

    pub fn locations(&self, locations: &[HostLocation], kind: ResultKind) -> Vec<HostLocation> {
        locations
            .iter()
            .filter_map(|location| {
                let resolved = self.resolve(&location.file_name, location.span(), kind)?;
                Some(HostLocation::new(
                    resolved.file_name,
                    resolved.range.start,
                    resolved.range.len(),
                ))
            })
            .collect()
    }

    /// `location` plus every generated location reachable from it through
    /// teleport links accepted by `filter`.
    pub fn teleported<F>(&self, location: &HostLocation, filter: F) -> Vec<HostLocation>
    where
        F: Fn(&TeleportInfo) -> bool + Copy,
    {
        let mut seen = HashSet::new();
        let mut pending = vec![location.clone()];
        let mut reached = Vec::new();

        while let Some(current) = pending.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(teleport) = self.registry.teleport(&current.file_name) {
                for range in teleport.other_sides(current.span(), filter) {
                    pending.push(HostLocation::new(
                        current.file_name.clone(),
                        range.start,
                        range.len(),
                    ));
                }
            }
            reached.push(current);
        }

        reached
    }
}
