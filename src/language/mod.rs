//! Pluggable language modules.
//!
//! A language module decides whether it owns a source document and, if so,
//! turns the document text into a tree of embedded files. The core treats the
//! code generation itself as a black box.

mod blocks;

pub use blocks::{BlockKind, BlockLanguage};

use crate::document::{GeneratedRoot, Snapshot};
use crate::error::LanguageError;

pub trait LanguageModule: Send + Sync {
    /// Stable identifier, recorded on every `GeneratedRoot` the module builds.
    fn id(&self) -> &str;

    /// Generate embedded files for a document.
    ///
    /// `Ok(None)` means "not my file type"; the document is then offered to the
    /// next module, or treated as an ordinary file.
    fn create_embedded_files(
        &self,
        source_id: &str,
        language_id: &str,
        snapshot: &Snapshot,
    ) -> Result<Option<GeneratedRoot>, LanguageError>;

    /// Regenerate a document this module already owns.
    ///
    /// Must return a brand-new tree. `Ok(None)` releases ownership.
    fn update_embedded_files(
        &self,
        source_id: &str,
        language_id: &str,
        existing: &GeneratedRoot,
        snapshot: &Snapshot,
    ) -> Result<Option<GeneratedRoot>, LanguageError> {
        let _ = existing;
        self.create_embedded_files(source_id, language_id, snapshot)
    }
}
