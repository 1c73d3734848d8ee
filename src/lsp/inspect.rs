//! Virtual-file inspection for debugging source <-> generated correspondence.

use serde::Serialize;
use serde_json::Value;

use crate::document::{source_name_of, Capabilities, Registry};
use crate::mapping::Mapping;

/// Lists the generated file names of a source document.
pub const VIRTUAL_FILES_COMMAND: &str = "embedsp.virtualFiles";
/// Returns the text and mappings of one generated file.
pub const VIRTUAL_FILE_COMMAND: &str = "embedsp.virtualFile";

pub const COMMANDS: [&str; 2] = [VIRTUAL_FILES_COMMAND, VIRTUAL_FILE_COMMAND];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualFile<'a> {
    pub name: &'a str,
    pub source: &'a str,
    pub kind: &'a str,
    pub text: &'a str,
    pub capabilities: Capabilities,
    pub mappings: &'a [Mapping<Capabilities>],
}

/// Generated file names of `source_id`, in walk order. A generated name is
/// accepted too and lists its siblings. Empty if neither names a composite
/// document.
pub fn virtual_file_names(registry: &Registry, source_id: &str) -> Vec<String> {
    registry
        .get(source_id)
        .or_else(|| registry.get(source_name_of(source_id)?))
        .map(|script| {
            script
                .generated()
                .walk()
                .map(|(_, file)| file.name().to_owned())
                .collect()
        })
        .unwrap_or_default()
}

pub fn virtual_file<'a>(registry: &'a Registry, name: &str) -> Option<VirtualFile<'a>> {
    let (script, file) = registry.owner(name)?;
    Some(VirtualFile {
        name: file.name(),
        source: script.id(),
        kind: file.kind(),
        text: file.text(),
        capabilities: file.capabilities(),
        mappings: file.mappings().mappings(),
    })
}

/// Run an inspection command. Returns `None` for unknown commands or a
/// missing string argument; unknown files produce JSON `null`.
pub fn execute(registry: &Registry, command: &str, arguments: &[Value]) -> Option<Value> {
    let argument = arguments.first()?.as_str()?;
    match command {
        VIRTUAL_FILES_COMMAND => Some(Value::from(virtual_file_names(registry, argument))),
        VIRTUAL_FILE_COMMAND => Some(
            virtual_file(registry, argument)
                .and_then(|file| serde_json::to_value(file).ok())
                .unwrap_or(Value::Null),
        ),
        _ => None,
    }
}
