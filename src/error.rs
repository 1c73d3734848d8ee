//! Error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a language module while generating embedded files.
#[derive(Debug, Error)]
pub enum LanguageError {
    /// The module recognized the document but could not generate code for it.
    #[error("failed to generate embedded files for '{source_id}': {message}")]
    Generate { source_id: String, message: String },

    /// An update was requested for a document the module never claimed.
    #[error("language module '{language}' does not own '{source_id}'")]
    Unclaimed { language: String, source_id: String },
}

/// Errors raised while loading `settings.toml`.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
