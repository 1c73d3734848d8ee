//! Settings infrastructure for embedsp.
//!
//! This module loads `settings.toml` files that configure the bridge's
//! versioning mode, which documents the block language claims, and the
//! default log filter.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::SettingsError;
use crate::language::{BlockKind, BlockLanguage, LanguageModule};

/// Root settings structure loaded from settings.toml.
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    pub bridge: Option<BridgeSettings>,
    pub blocks: Option<BlockSettings>,
    pub log: Option<LogSettings>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BridgeSettings {
    /// Report embedded file versions as `<source version>:<content hash>`.
    pub salt_versions: Option<bool>,
}

/// Settings for the built-in block language.
#[derive(Debug, Default, Deserialize)]
pub struct BlockSettings {
    /// Composite document extensions, without the leading dot.
    pub extensions: Option<Vec<String>>,

    /// Section tags whose embedded files report diagnostics:
    /// "script", "style", "template".
    pub diagnostic_blocks: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogSettings {
    /// A `tracing_subscriber::EnvFilter` directive, used when RUST_LOG is unset.
    pub filter: Option<String>,
}

impl Settings {
    pub fn salt_versions(&self) -> bool {
        self.bridge
            .as_ref()
            .and_then(|b| b.salt_versions)
            .unwrap_or(false)
    }

    pub fn log_filter(&self) -> Option<&str> {
        self.log.as_ref()?.filter.as_deref()
    }

    /// Build the block language described by `[blocks]`, falling back to the
    /// defaults for anything unset. Unknown tags are skipped with a warning.
    pub fn block_language(&self) -> BlockLanguage {
        let Some(blocks) = &self.blocks else {
            return BlockLanguage::default();
        };
        let defaults = BlockLanguage::default();
        let extensions = blocks
            .extensions
            .clone()
            .unwrap_or_else(|| defaults.extensions().to_vec());
        let diagnostic_kinds = match &blocks.diagnostic_blocks {
            Some(tags) => tags
                .iter()
                .filter_map(|tag| {
                    let kind = BlockKind::from_tag(tag);
                    if kind.is_none() {
                        tracing::warn!(tag = %tag, "unknown block kind in settings");
                    }
                    kind
                })
                .collect(),
            None => defaults.diagnostic_kinds().to_vec(),
        };
        BlockLanguage::new(extensions, diagnostic_kinds)
    }

    /// Language modules enabled by these settings.
    pub fn languages(&self) -> Vec<Box<dyn LanguageModule>> {
        vec![Box::new(self.block_language())]
    }
}

/// Load settings from a settings.toml file, failing on read or parse errors.
pub fn try_load_settings(path: &Path) -> Result<Settings, SettingsError> {
    let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load settings from a settings.toml file.
///
/// Returns default settings if the file doesn't exist or can't be parsed.
pub fn load_settings(path: &Path) -> Settings {
    match try_load_settings(path) {
        Ok(settings) => settings,
        Err(e @ SettingsError::Parse { .. }) => {
            tracing::warn!(error = %e, "using default settings");
            Settings::default()
        }
        Err(e) => {
            tracing::debug!(error = %e, "using default settings");
            Settings::default()
        }
    }
}

/// Discover settings.toml by searching up the directory tree, then direct children.
///
/// Search order:
/// 1. Walk up from `start_dir` to filesystem root
/// 2. If not found, check immediate child directories of `start_dir`
///
/// Returns `(settings, settings_dir)`. If not found, returns
/// `(Settings::default(), start_dir)`.
pub fn discover_settings(start_dir: &Path) -> (Settings, PathBuf) {
    let mut current = Some(start_dir);
    while let Some(dir) = current {
        let candidate = dir.join("settings.toml");
        if candidate.is_file() {
            return (load_settings(&candidate), dir.to_path_buf());
        }
        current = dir.parent();
    }

    if let Ok(entries) = std::fs::read_dir(start_dir) {
        for entry in entries.flatten() {
            if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
                let candidate = entry.path().join("settings.toml");
                if candidate.is_file() {
                    return (load_settings(&candidate), entry.path());
                }
            }
        }
    }

    (Settings::default(), start_dir.to_path_buf())
}
