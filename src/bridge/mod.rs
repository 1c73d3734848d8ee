//! Bridge between editor documents and the host service's flat file view.
//!
//! This module provides:
//! - `ProjectHost`, the editor-side delegate
//! - `ScriptHost`, the interface the host service reads files through
//! - `IncrementalHost`, which implements `ScriptHost` on top of a delegate
//!   and the embedded-file registry

mod host;
mod incremental;

pub use host::{HostService, ProjectHost, ScriptHost};
pub use incremental::{content_hash, IncrementalHost};
