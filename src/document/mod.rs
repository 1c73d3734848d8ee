//! Documents, generated artifacts and the registry that ties them together.
//!
//! This module provides:
//! - `Snapshot` and `LineIndex` for text and position conversion
//! - `EmbeddedFile` and `GeneratedRoot` for generated artifacts
//! - `Registry` for composite sources and their generated trees
//! - `DocumentStore` for documents the editor has open

mod embedded;
mod registry;
mod state;
mod text;

pub use embedded::{
    generated_name, source_name_of, Capabilities, EmbeddedFile, EmbeddedFileId, GeneratedRoot,
    ResultKind, Teleport, TeleportInfo, Walk,
};
pub use registry::{Registry, SourceLocation, SourceScript};
pub use state::{DocumentStore, OpenDocument};
pub use text::{LineIndex, Snapshot, TextChangeRange};
