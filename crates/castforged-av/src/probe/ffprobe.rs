//! FFprobe-based stream probing.

use super::types::StreamDescriptor;
use super::StreamProber;
use crate::ProbeError;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<StreamDescriptor>,
}

/// Probes streams by running `ffprobe -show_streams` and parsing its JSON.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    program: PathBuf,
}

impl FfprobeProber {
    /// Create a prober that runs the given ffprobe executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[async_trait]
impl StreamProber for FfprobeProber {
    async fn probe_streams(&self, path: &Path) -> Result<Vec<StreamDescriptor>, ProbeError> {
        let tool = self.program.display().to_string();
        tracing::debug!("Probing streams of {:?} with {}", path, tool);

        let output = Command::new(&self.program)
            .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ProbeError::ToolNotFound { tool: tool.clone() }
                } else {
                    ProbeError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(ProbeError::ToolFailed {
                tool,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_ffprobe_streams(&String::from_utf8(output.stdout)?)
    }
}

/// Parse the JSON document printed by `ffprobe -print_format json -show_streams`.
pub fn parse_ffprobe_streams(json: &str) -> Result<Vec<StreamDescriptor>, ProbeError> {
    let output: FfprobeOutput = serde_json::from_str(json)?;
    Ok(output.streams)
}
