//! Editor-facing result handling.
//!
//! This module provides:
//! - `ResultTranslator` for mapping host results back to source documents
//! - LSP diagnostic conversion for translated results
//! - Virtual-file inspection commands

mod diagnostics;
pub mod inspect;
mod translate;

pub use diagnostics::{group_by_file, to_lsp_diagnostic};
pub use inspect::{VirtualFile, VIRTUAL_FILES_COMMAND, VIRTUAL_FILE_COMMAND};
pub use translate::{
    HostDiagnostic, HostLocation, HostTextEdit, Resolved, ResultTranslator, Severity,
};
