use castforged_av::profile::DEFAULT_MIN_LENGTH;
use castforged_av::tools::FFMPEG;
use castforged_av::{FfprobeProber, PlannerPolicy, TokenizerOptions, TranscodeSettings};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub transcode: TranscodeConfig,

    #[serde(default)]
    pub tokenizer: TokenizerConfig,

    #[serde(default)]
    pub dlna: DlnaConfig,
}

impl Config {
    /// Encoder settings derived from this configuration.
    ///
    /// Tool paths are not resolved here; an unset ffmpeg path is looked up on
    /// `PATH` when the encoder is launched.
    pub fn transcode_settings(&self) -> TranscodeSettings {
        let defaults = TranscodeSettings::default();
        TranscodeSettings {
            ffmpeg: self
                .tools
                .ffmpeg_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(FFMPEG)),
            threads: self.transcode.threads.unwrap_or(defaults.threads),
            min_length: Duration::from_millis(self.transcode.min_length_ms),
            policy: self.transcode.policy,
            tokenizer: TokenizerOptions {
                escape_first_char: self.tokenizer.escape_first_char,
            },
        }
    }

    /// Stream prober honouring the configured ffprobe path.
    pub fn prober(&self) -> FfprobeProber {
        match &self.tools.ffprobe_path {
            Some(path) => FfprobeProber::new(path),
            None => FfprobeProber::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscodeConfig {
    /// Planner policy variant for streams outside the conversion tables
    #[serde(default = "default_policy")]
    pub policy: PlannerPolicy,

    /// Encoder threads (default: number of CPUs)
    #[serde(default)]
    pub threads: Option<usize>,

    /// Floor applied to short lengths by profiles that need one
    #[serde(default = "default_min_length_ms")]
    pub min_length_ms: u64,

    /// Command line for the custom profile
    #[serde(default)]
    pub custom_command: Option<String>,
}

fn default_policy() -> PlannerPolicy {
    PlannerPolicy::Permissive
}

fn default_min_length_ms() -> u64 {
    DEFAULT_MIN_LENGTH.as_millis() as u64
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            policy: default_policy(),
            threads: None,
            min_length_ms: default_min_length_ms(),
            custom_command: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TokenizerConfig {
    /// Treat the first character of custom commands as escaped
    #[serde(default)]
    pub escape_first_char: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DlnaConfig {
    /// Override for DLNA.ORG_FLAGS
    #[serde(default)]
    pub flags: Option<String>,
}
