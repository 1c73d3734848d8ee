//! Conversion of translated host diagnostics into LSP diagnostics.

use std::collections::BTreeMap;

use tower_lsp::lsp_types::{
    Diagnostic, DiagnosticRelatedInformation, DiagnosticSeverity, Location, NumberOrString, Url,
};

use crate::document::LineIndex;

use super::translate::{HostDiagnostic, Severity};

fn severity(severity: Severity) -> DiagnosticSeverity {
    match severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Information => DiagnosticSeverity::INFORMATION,
        Severity::Hint => DiagnosticSeverity::HINT,
    }
}

/// Related entries need their own file text to compute a range; entries
/// without text or with a name that is not a URI are skipped.
fn related_information(related: &[HostDiagnostic]) -> Option<Vec<DiagnosticRelatedInformation>> {
    let info: Vec<_> = related
        .iter()
        .filter_map(|entry| {
            let uri = Url::parse(&entry.file_name).ok()?;
            let text = entry.file_text.as_ref()?;
            let range = LineIndex::new(text.clone()).span_to_range(&entry.span());
            Some(DiagnosticRelatedInformation {
                location: Location { uri, range },
                message: entry.message.clone(),
            })
        })
        .collect();
    (!info.is_empty()).then_some(info)
}

/// Convert a diagnostic already expressed in source coordinates.
pub fn to_lsp_diagnostic(diagnostic: &HostDiagnostic, line_index: &LineIndex) -> Diagnostic {
    Diagnostic {
        range: line_index.span_to_range(&diagnostic.span()),
        severity: Some(severity(diagnostic.severity)),
        code: diagnostic.code.clone().map(NumberOrString::String),
        code_description: None,
        source: diagnostic.source.clone(),
        message: diagnostic.message.clone(),
        related_information: related_information(&diagnostic.related),
        tags: None,
        data: None,
    }
}

/// Group translated diagnostics by the source file they now point at.
pub fn group_by_file(diagnostics: Vec<HostDiagnostic>) -> BTreeMap<String, Vec<HostDiagnostic>> {
    let mut grouped: BTreeMap<String, Vec<HostDiagnostic>> = BTreeMap::new();
    for diagnostic in diagnostics {
        grouped
            .entry(diagnostic.file_name.clone())
            .or_default()
            .push(diagnostic);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tower_lsp::lsp_types::Position;

    #[test]
    fn converts_range_severity_and_code() {
        let line_index = LineIndex::new("<script>\nlet a = b;\n</script>");
        let diag = HostDiagnostic::new("file:///a.doc", 17, 1, "cannot find name 'b'")
            .with_severity(Severity::Warning)
            .with_code("2304");
        let lsp = to_lsp_diagnostic(&diag, &line_index);

        assert_eq!(lsp.range.start, Position::new(1, 8));
        assert_eq!(lsp.range.end, Position::new(1, 9));
        assert_eq!(lsp.severity, Some(DiagnosticSeverity::WARNING));
        assert_eq!(lsp.code, Some(NumberOrString::String("2304".into())));
        assert!(lsp.related_information.is_none());
    }

    #[test]
    fn related_entries_need_text_and_uri() {
        let mut with_text = HostDiagnostic::new("file:///lib.ts", 4, 3, "declared here");
        with_text.file_text = Some(Arc::from("let foo;"));
        let without_text = HostDiagnostic::new("file:///other.ts", 0, 1, "skipped");
        let diag = HostDiagnostic::new("file:///a.doc", 0, 1, "dup")
            .with_related(with_text)
            .with_related(without_text);

        let lsp = to_lsp_diagnostic(&diag, &LineIndex::new("x"));
        let related = lsp.related_information.unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].location.uri.as_str(), "file:///lib.ts");
        assert_eq!(related[0].location.range.start, Position::new(0, 4));
    }

    #[test]
    fn groups_by_target_file() {
        let grouped = group_by_file(vec![
            HostDiagnostic::new("b", 0, 1, "1"),
            HostDiagnostic::new("a", 0, 1, "2"),
            HostDiagnostic::new("b", 2, 1, "3"),
        ]);
        let counts: Vec<_> = grouped.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        assert_eq!(counts, vec![("a", 1), ("b", 2)]);
    }
}
