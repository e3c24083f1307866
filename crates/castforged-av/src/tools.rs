//! External tool detection.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Name of the encoder executable.
pub const FFMPEG: &str = "ffmpeg";

/// Name of the stream probe executable.
pub const FFPROBE: &str = "ffprobe";

/// Information about an external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// First line of its version banner, if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// Check whether `program` runs with `-version` and collect its banner.
///
/// # Example
///
/// ```no_run
/// use castforged_av::tools::check_tool;
///
/// let info = check_tool("ffmpeg");
/// if info.available {
///     println!("ffmpeg version: {:?}", info.version);
/// }
/// ```
pub fn check_tool(program: impl AsRef<Path>) -> ToolInfo {
    let program = program.as_ref();
    let name = program.display().to_string();

    match Command::new(program).arg("-version").output() {
        Ok(output) if output.status.success() => ToolInfo {
            version: String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.to_string()),
            path: which::which(program).ok(),
            available: true,
            name,
        },
        _ => ToolInfo {
            name,
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Check the encoder and probe tools, honouring configured paths.
pub fn check_tools(ffmpeg: Option<&Path>, ffprobe: Option<&Path>) -> Vec<ToolInfo> {
    vec![
        check_tool(ffmpeg.unwrap_or(Path::new(FFMPEG))),
        check_tool(ffprobe.unwrap_or(Path::new(FFPROBE))),
    ]
}

/// Require that a tool is on `PATH`, returning its path.
///
/// # Errors
///
/// Returns [`Error::ToolNotFound`] if the tool is not found.
pub fn require_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::tool_not_found(name))
}

/// Get the path to a tool, preferring a configured path over `PATH` lookup.
pub fn get_tool_path(name: &str, config_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = config_path {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        tracing::warn!(
            "Configured {} path {} does not exist, falling back to PATH",
            name,
            path.display()
        );
    }

    require_tool(name)
}
