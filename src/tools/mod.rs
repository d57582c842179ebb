mod list_directory;
mod read_file;
mod run_command;
mod write_file;

pub use list_directory::ListDirectoryTool;
pub use read_file::ReadFileTool;
pub use run_command::RunCommandTool;
pub use write_file::WriteFileTool;

use crate::catalog::ToolCatalog;
use crate::core::error::{CatalogError, ToolError};
use crate::core::tool::Tool;
use std::path::Path;
use std::sync::Arc;


pub fn builtin_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ReadFileTool),
        Arc::new(ListDirectoryTool),
        Arc::new(WriteFileTool),
        Arc::new(RunCommandTool),
    ]
}

pub fn register_builtin_tools(catalog: &mut ToolCatalog) -> Result<(), CatalogError> {
    for tool in builtin_tools() {
        catalog.register(tool)?;
    }
    Ok(())
}

/// Name the path in the error so the gateway can categorize it.
fn fs_error(path: &Path, e: std::io::Error) -> ToolError {
    match e.kind() {
        std::io::ErrorKind::NotFound => ToolError::NotFound(path.display().to_string()),
        std::io::ErrorKind::PermissionDenied => ToolError::AccessDenied(path.display().to_string()),
        _ => ToolError::Io(e),
    }
}
