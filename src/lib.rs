//! Embedded-language server core.
//!
//! Composite documents are split into generated files by language modules,
//! presented to a single-language host service, and the host's results are
//! mapped back onto the composite documents.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tokio::sync::Mutex;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService};
use tracing::{debug, info};

pub mod bridge;
pub mod document;
pub mod error;
pub mod language;
pub mod lsp;
pub mod mapping;
pub mod settings;

pub use bridge::{content_hash, HostService, IncrementalHost, ProjectHost, ScriptHost};
pub use document::{
    Capabilities, DocumentStore, EmbeddedFile, GeneratedRoot, LineIndex, Registry, ResultKind,
    Snapshot, SourceScript,
};
pub use error::{LanguageError, SettingsError};
pub use language::{BlockKind, BlockLanguage, LanguageModule};
pub use lsp::{HostDiagnostic, HostLocation, HostTextEdit, ResultTranslator, Severity};
pub use mapping::{Mapping, MappingIndex, MappingKind, Side};
pub use settings::{discover_settings, load_settings, try_load_settings, Settings};

type Bridge = IncrementalHost<Arc<DocumentStore>>;

pub struct Backend {
    client: Client,
    documents: Arc<DocumentStore>,
    workspace_root: OnceLock<PathBuf>,
    bridge: OnceLock<Mutex<Bridge>>,
    host_service: Option<Arc<dyn HostService>>,
}

impl Backend {
    pub(crate) fn new(client: Client, host_service: Option<Arc<dyn HostService>>) -> Self {
        Self {
            client,
            documents: Arc::new(DocumentStore::new()),
            workspace_root: OnceLock::new(),
            bridge: OnceLock::new(),
            host_service,
        }
    }

    fn build_bridge(&self, settings: &Settings) -> Mutex<Bridge> {
        let bridge = IncrementalHost::new(Arc::clone(&self.documents), settings.languages())
            .with_salted_versions(settings.salt_versions());
        Mutex::new(bridge)
    }

    /// The bridge, built from default settings if `initialize` never set one.
    fn bridge(&self) -> &Mutex<Bridge> {
        self.bridge
            .get_or_init(|| self.build_bridge(&Settings::default()))
    }

    /// Sync the bridge and publish diagnostics for every open document.
    async fn refresh_diagnostics(&self) {
        let Some(service) = self.host_service.clone() else {
            return;
        };
        let published = {
            let mut bridge = self.bridge().lock().await;
            bridge.sync();
            self.collect_diagnostics(&bridge, service.as_ref())
        };
        for (uri, diagnostics, version) in published {
            self.client
                .publish_diagnostics(uri, diagnostics, Some(version))
                .await;
        }
    }

    fn collect_diagnostics(
        &self,
        bridge: &Bridge,
        service: &dyn HostService,
    ) -> Vec<(Url, Vec<Diagnostic>, i32)> {
        let host: &dyn ScriptHost = bridge;
        let raw: Vec<HostDiagnostic> = host
            .script_file_names()
            .iter()
            .flat_map(|name| service.diagnostics(host, name))
            .collect();

        let documents = &self.documents;
        let translator = ResultTranslator::new(bridge.registry(), |name: &str| {
            documents.file_exists(name)
        });
        let translated = translator.diagnostics(&raw);
        debug!(
            raw = raw.len(),
            translated = translated.len(),
            "translated host diagnostics"
        );
        let mut grouped = lsp::group_by_file(translated);

        self.documents
            .uris()
            .into_iter()
            .filter_map(|uri| {
                let document = self.documents.get(&uri)?;
                let url = Url::parse(&uri).ok()?;
                let line_index = LineIndex::new(document.snapshot.shared_text());
                let diagnostics = grouped
                    .remove(&uri)
                    .unwrap_or_default()
                    .iter()
                    .map(|d| lsp::to_lsp_diagnostic(d, &line_index))
                    .collect();
                Some((url, diagnostics, document.version))
            })
            .collect()
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let workspace_root = params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
            .and_then(|f| f.uri.to_file_path().ok())
            .or_else(|| {
                #[allow(deprecated)]
                params.root_uri.as_ref()?.to_file_path().ok()
            });

        if let Some(root) = workspace_root {
            let _ = self.workspace_root.set(root.clone());

            let (settings, settings_dir) = settings::discover_settings(&root);
            info!(settings_dir = %settings_dir.display(), "loaded settings");
            let _ = self.bridge.set(self.build_bridge(&settings));
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: lsp::inspect::COMMANDS
                        .iter()
                        .map(|c| c.to_string())
                        .collect(),
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                }),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "embedsp language server initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = params.text_document;
        self.documents.open(
            document.uri.as_str(),
            document.text,
            document.version,
            Some(document.language_id),
        );
        self.refresh_diagnostics().await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // FULL sync: exactly one change carrying the whole text
        if let Some(change) = params.content_changes.into_iter().next() {
            self.documents.change(
                params.text_document.uri.as_str(),
                change.text,
                params.text_document.version,
            );
            self.refresh_diagnostics().await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.documents.close(params.text_document.uri.as_str());
        self.client
            .publish_diagnostics(params.text_document.uri, vec![], None)
            .await;
        self.refresh_diagnostics().await;
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<Value>> {
        let mut bridge = self.bridge().lock().await;
        bridge.sync();
        Ok(lsp::inspect::execute(
            bridge.registry(),
            &params.command,
            &params.arguments,
        ))
    }
}

/// A server without a host service: documents are tracked and can be
/// inspected, but no diagnostics are produced.
pub fn create_service() -> (LspService<Backend>, tower_lsp::ClientSocket) {
    LspService::new(|client| Backend::new(client, None))
}

pub fn create_service_with(
    host_service: Arc<dyn HostService>,
) -> (LspService<Backend>, tower_lsp::ClientSocket) {
    LspService::new(move |client| Backend::new(client, Some(host_service)))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    impl HostService for Silent {
        fn diagnostics(&self, _: &dyn ScriptHost, _: &str) -> Vec<HostDiagnostic> {
            Vec::new()
        }
    }

    #[test]
    fn service_can_be_created() {
        let (_service, _socket) = create_service();
    }

    #[test]
    fn service_with_host_can_be_created() {
        let (_service, _socket) = create_service_with(Arc::new(Silent));
    }
}
