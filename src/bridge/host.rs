//! File-system-like interfaces on either side of the bridge.

use std::sync::Arc;

use crate::document::Snapshot;
use crate::lsp::HostDiagnostic;

/// What the editor side knows about files: open documents and anything else
/// it can read. This is the delegate the bridge calls through to for
/// ordinary files.
pub trait ProjectHost {
    /// Coarse version of everything the editor can observe. When it has not
    /// changed since the last sync, the sync is skipped. `None` disables the
    /// short-circuit.
    fn project_version(&self) -> Option<String> {
        None
    }

    fn script_file_names(&self) -> Vec<String>;

    fn script_version(&self, name: &str) -> Option<String>;

    fn script_snapshot(&self, name: &str) -> Option<Snapshot>;

    /// Declared language of a file, if the editor knows it.
    fn language_id(&self, name: &str) -> Option<String> {
        let _ = name;
        None
    }

    fn file_exists(&self, name: &str) -> bool;

    fn directory_exists(&self, directory: &str) -> bool {
        let _ = directory;
        false
    }

    fn read_directory(&self, directory: &str, extensions: &[&str]) -> Vec<String> {
        let _ = (directory, extensions);
        Vec::new()
    }
}

impl<T: ProjectHost + ?Sized> ProjectHost for Arc<T> {
    fn project_version(&self) -> Option<String> {
        (**self).project_version()
    }

    fn script_file_names(&self) -> Vec<String> {
        (**self).script_file_names()
    }

    fn script_version(&self, name: &str) -> Option<String> {
        (**self).script_version(name)
    }

    fn script_snapshot(&self, name: &str) -> Option<Snapshot> {
        (**self).script_snapshot(name)
    }

    fn language_id(&self, name: &str) -> Option<String> {
        (**self).language_id(name)
    }

    fn file_exists(&self, name: &str) -> bool {
        (**self).file_exists(name)
    }

    fn directory_exists(&self, directory: &str) -> bool {
        (**self).directory_exists(directory)
    }

    fn read_directory(&self, directory: &str, extensions: &[&str]) -> Vec<String> {
        (**self).read_directory(directory, extensions)
    }
}

/// The flat view the host service consumes. Embedded files and ordinary
/// files are indistinguishable through this interface.
pub trait ScriptHost {
    fn script_file_names(&self) -> Vec<String>;

    fn script_version(&self, name: &str) -> Option<String>;

    fn script_snapshot(&self, name: &str) -> Option<Snapshot>;

    fn project_version(&self) -> String;

    fn file_exists(&self, name: &str) -> bool;

    fn directory_exists(&self, directory: &str) -> bool;

    fn read_directory(&self, directory: &str, extensions: &[&str]) -> Vec<String>;
}

/// The single-language analysis service. Results are addressed in the
/// coordinates of the files `host` lists.
pub trait HostService: Send + Sync {
    fn diagnostics(&self, host: &dyn ScriptHost, file_name: &str) -> Vec<HostDiagnostic>;
}
