use std::sync::Arc;

use embedsp::lsp::{group_by_file, to_lsp_diagnostic};
use embedsp::{
    BlockLanguage, Capabilities, DocumentStore, EmbeddedFile, GeneratedRoot, HostDiagnostic,
    HostLocation, HostService, IncrementalHost, LanguageError, LanguageModule, LineIndex, Mapping,
    ProjectHost, ResultKind, ResultTranslator, ScriptHost, Snapshot,
};
use expect_test::expect;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Format translated diagnostics into a deterministic, human-readable string.
///
/// Each diagnostic becomes one line:
///   <file>@<start>..<end>: <message>
fn format_diagnostics(diagnostics: &[HostDiagnostic]) -> String {
    if diagnostics.is_empty() {
        return "OK (no diagnostics)".to_string();
    }

    let mut lines: Vec<String> = diagnostics
        .iter()
        .map(|d| format!("{}@{}..{}: {}", d.file_name, d.start, d.start + d.length, d.message))
        .collect();
    lines.sort();
    lines.join("\n")
}

fn format_locations(locations: &[HostLocation]) -> String {
    let lines: Vec<String> = locations
        .iter()
        .map(|l| format!("{}@{}..{}", l.file_name, l.start, l.start + l.length))
        .collect();
    lines.join("\n")
}

/// Reports every occurrence of the word `bad` in each file the host lists.
struct BadWordChecker;

impl HostService for BadWordChecker {
    fn diagnostics(&self, host: &dyn ScriptHost, file_name: &str) -> Vec<HostDiagnostic> {
        let Some(snapshot) = host.script_snapshot(file_name) else {
            return Vec::new();
        };
        snapshot
            .text()
            .match_indices("bad")
            .map(|(start, word)| HostDiagnostic::new(file_name, start, word.len(), "bad word"))
            .collect()
    }
}

fn check(host: &IncrementalHost<Arc<DocumentStore>>, store: &DocumentStore) -> Vec<HostDiagnostic> {
    let raw: Vec<HostDiagnostic> = host
        .script_file_names()
        .iter()
        .flat_map(|name| BadWordChecker.diagnostics(host, name))
        .collect();
    ResultTranslator::new(host.registry(), |name: &str| store.file_exists(name)).diagnostics(&raw)
}

/// Claims `.scn` files and emits one script whose `x` comes from the source
/// and whose `y` exists only in generated code.
struct SceneLanguage;

const SCENE_SOURCE: &str = "script:\n    value = x + 1\n";
const SCENE_SCRIPT: &str = "const x = 1; const y = x + 1;";

impl LanguageModule for SceneLanguage {
    fn id(&self) -> &str {
        "scene"
    }

    fn create_embedded_files(
        &self,
        source_id: &str,
        _language_id: &str,
        _snapshot: &Snapshot,
    ) -> Result<Option<GeneratedRoot>, LanguageError> {
        if !source_id.ends_with(".scn") {
            return Ok(None);
        }
        let mut root = GeneratedRoot::new(self.id());
        root.push(
            EmbeddedFile::new(
                format!("{source_id}.script_0.ts"),
                SCENE_SCRIPT,
                vec![
                    Mapping::offset(20, 6, 1, Capabilities::all()),
                    Mapping::offset(24, 10, 1, Capabilities::silent()),
                ],
            ),
            None,
        );
        Ok(Some(root))
    }
}

fn scene_host(store: &Arc<DocumentStore>) -> IncrementalHost<Arc<DocumentStore>> {
    let mut host = IncrementalHost::new(Arc::clone(store), vec![Box::new(SceneLanguage)]);
    host.sync();
    host
}

fn blocks_host(store: &Arc<DocumentStore>) -> IncrementalHost<Arc<DocumentStore>> {
    IncrementalHost::new(Arc::clone(store), vec![Box::new(BlockLanguage::default())])
}

const DOC: &str = "<script>let a = bad;</script>\n<style>p { color: bad; }</style>\n";

// ---------------------------------------------------------------------------
// Result translation
// ---------------------------------------------------------------------------

#[test]
fn mapped_identifier_translates_and_internal_one_is_dropped() {
    assert_eq!(&SCENE_SOURCE[20..21], "x");
    let store = Arc::new(DocumentStore::new());
    store.open("file:///A.scn", SCENE_SOURCE, 1, None);
    let host = scene_host(&store);

    let generated = "file:///A.scn.script_0.ts";
    let translated = ResultTranslator::new(host.registry(), |name: &str| store.file_exists(name))
        .diagnostics(&[
            HostDiagnostic::new(generated, 6, 1, "x is unused"),
            HostDiagnostic::new(generated, 16, 1, "y is unused"),
        ]);

    expect![[r#"file:///A.scn@20..21: x is unused"#]].assert_eq(&format_diagnostics(&translated));
}

#[test]
fn capability_filter_applies_per_result_kind() {
    let store = Arc::new(DocumentStore::new());
    store.open("file:///A.scn", SCENE_SOURCE, 1, None);
    let host = scene_host(&store);
    let translator = ResultTranslator::new(host.registry(), |name: &str| store.file_exists(name));

    let generated = "file:///A.scn.script_0.ts";
    let diagnostics = translator.diagnostics(&[HostDiagnostic::new(generated, 10, 1, "literal")]);
    expect![[r#"OK (no diagnostics)"#]].assert_eq(&format_diagnostics(&diagnostics));

    let locations = translator.locations(
        &[HostLocation::new(generated, 10, 1)],
        ResultKind::Rename,
    );
    expect![[r#"file:///A.scn@24..25"#]].assert_eq(&format_locations(&locations));
}

#[test]
fn silent_blocks_report_nothing() {
    let store = Arc::new(DocumentStore::new());
    store.open("file:///p/a.doc", DOC, 1, Some("doc".into()));
    let mut host = blocks_host(&store);
    host.sync();

    // the style block is not diagnostic-capable, so only the script is checked
    expect![[r#"file:///p/a.doc@16..19: bad word"#]].assert_eq(&format_diagnostics(&check(&host, &store)));

    let stray = HostDiagnostic::new("file:///p/a.doc.style_0.css", 10, 3, "bad word");
    let translated = ResultTranslator::new(host.registry(), |name: &str| store.file_exists(name))
        .diagnostics(&[stray]);
    assert!(translated.is_empty());
}

#[test]
fn results_for_unknown_files_are_dropped() {
    let store = Arc::new(DocumentStore::new());
    store.open("file:///p/main.ts", "let bad = 1;", 1, None);
    let mut host = blocks_host(&store);
    host.sync();

    let translator = ResultTranslator::new(host.registry(), |name: &str| store.file_exists(name));
    let translated = translator.diagnostics(&[
        HostDiagnostic::new("file:///p/main.ts", 4, 3, "kept"),
        HostDiagnostic::new("file:///lib/dom.d.ts", 0, 1, "library"),
    ]);
    expect![[r#"file:///p/main.ts@4..7: kept"#]].assert_eq(&format_diagnostics(&translated));
}

#[test]
fn published_diagnostics_use_source_positions() {
    let store = Arc::new(DocumentStore::new());
    store.open("file:///p/a.doc", DOC, 3, Some("doc".into()));
    let mut host = blocks_host(&store);
    host.sync();

    let grouped = group_by_file(check(&host, &store));
    let document = store.get("file:///p/a.doc").unwrap();
    let line_index = LineIndex::new(document.snapshot.shared_text());
    let lsp: Vec<String> = grouped["file:///p/a.doc"]
        .iter()
        .map(|d| to_lsp_diagnostic(d, &line_index))
        .map(|d| {
            format!(
                "{}:{}-{}:{} {}",
                d.range.start.line,
                d.range.start.character,
                d.range.end.line,
                d.range.end.character,
                d.message
            )
        })
        .collect();
    expect![[r#"0:16-0:19 bad word"#]].assert_eq(&lsp.join("\n"));
}

// ---------------------------------------------------------------------------
// Host-visible files
// ---------------------------------------------------------------------------

#[test]
fn host_sees_generated_leaves_not_sources() {
    let store = Arc::new(DocumentStore::new());
    store.open("foo.doc", "<script>let a;</script>", 1, None);
    let mut host = blocks_host(&store);
    host.sync();

    let names = host.script_file_names();
    assert!(names.contains(&"foo.doc.script_0.js".to_string()));
    assert!(!names.contains(&"foo.doc".to_string()));
    assert!(host.file_exists("foo.doc.script_0.js"));

    store.close("foo.doc");
    host.sync();
    assert!(host.script_file_names().is_empty());

    let identity: Vec<_> = host
        .registry()
        .from_generated_location("foo.doc.script_0.js", 0..5, |_| true, |_| true)
        .map(|location| (location.file_name.to_string(), location.range, location.owner.is_none()))
        .collect();
    assert_eq!(
        identity,
        vec![("foo.doc.script_0.js".to_string(), 0..5, true)]
    );
}

// ---------------------------------------------------------------------------
// Versioning
// ---------------------------------------------------------------------------

#[test]
fn only_diagnostic_relevant_edits_bump_project_version() {
    let store = Arc::new(DocumentStore::new());
    store.open("file:///p/a.doc", DOC, 1, Some("doc".into()));
    let mut host = blocks_host(&store);
    assert!(host.sync());
    let initial = host.project_version();
    let script_version = host.script_version("file:///p/a.doc.script_0.js");

    // edit 1: style block only
    store.change(
        "file:///p/a.doc",
        DOC.replace("color: bad", "color: red"),
        2,
    );
    assert!(!host.sync());
    assert_eq!(host.project_version(), initial);
    assert_eq!(host.script_version("file:///p/a.doc.script_0.js"), script_version);

    // edit 2: script block
    store.change(
        "file:///p/a.doc",
        DOC.replace("color: bad", "color: red").replace("a = bad", "a = 1"),
        3,
    );
    assert!(host.sync());
    let bumped: u64 = host.project_version().parse().unwrap();
    assert_eq!(bumped, initial.parse::<u64>().unwrap() + 1);
    assert_ne!(host.script_version("file:///p/a.doc.script_0.js"), script_version);
}

#[test]
fn unchanged_documents_are_not_regenerated() {
    let store = Arc::new(DocumentStore::new());
    store.open("file:///p/a.doc", DOC, 1, Some("doc".into()));
    let mut host = blocks_host(&store);
    host.sync();
    assert!(!host.sync());

    // a new ordinary file raises the version; the composite keeps its tree
    let before = host.registry().get("file:///p/a.doc").unwrap().snapshot().clone();
    store.open("file:///p/main.ts", "", 1, None);
    assert!(host.sync());
    let after = host.registry().get("file:///p/a.doc").unwrap().snapshot();
    assert!(Arc::ptr_eq(&before.shared_text(), &after.shared_text()));
}

#[test]
fn salted_versions_carry_the_source_version() {
    let store = Arc::new(DocumentStore::new());
    store.open("file:///p/a.doc", DOC, 7, Some("doc".into()));
    let mut host = blocks_host(&store).with_salted_versions(true);
    host.sync();

    let version = host.script_version("file:///p/a.doc.script_0.js").unwrap();
    let (source, hash) = version.split_once(':').unwrap();
    assert_eq!(source, "7");
    assert_eq!(hash, embedsp::content_hash("let a = bad;"));
}
