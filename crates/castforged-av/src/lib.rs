//! # castforged-av
//!
//! Encoder-side engine for on-the-fly transcoding.
//!
//! This crate provides:
//! - Stream probing through a pluggable [`StreamProber`] (ffprobe by default)
//! - Per-stream codec planning for the DLNA MPEG-PS profile ([`plan_streams`])
//! - Full encoder argument vectors per delivery profile ([`build_args`])
//! - Tokenizing of operator-supplied custom command lines
//! - Launching and supervising the encoder process ([`start`]), with graceful
//!   interrupt on cancellation
//!
//! ## Example
//!
//! ```no_run
//! use castforged_av::{
//!     transcode, FfprobeProber, TracingSink, TranscodeProfile, TranscodeRequest,
//!     TranscodeSettings,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> castforged_av::Result<()> {
//! let request = TranscodeRequest::new("/path/to/video.mkv", TranscodeProfile::DlnaMpegPs)
//!     .with_start(Duration::from_secs(600));
//! let cancel = CancellationToken::new();
//! let process = transcode(
//!     &request,
//!     &FfprobeProber::default(),
//!     &TranscodeSettings::default(),
//!     Arc::new(TracingSink),
//!     &cancel,
//! )
//! .await?;
//!
//! // Forward `process.into_stream()` as a response body; cancel on disconnect.
//! # drop(process);
//! # Ok(())
//! # }
//! ```

pub mod cmdline;
mod error;
pub mod planner;
pub mod probe;
pub mod process;
pub mod profile;
mod sexagesimal;
pub mod template;
pub mod tools;

// Re-exports
pub use cmdline::{parse_command_line, parse_command_line_with, TokenizerOptions};
pub use error::{Error, ProbeError, ProcessError, Result};
pub use planner::{plan_streams, PlannerPolicy, StreamMapping, StreamPlan, Treatment};
pub use probe::{CodecType, FfprobeProber, ProbeNumber, StreamDescriptor, StreamProber};
pub use process::{start, DiagnosticsSink, EncoderProcess, ExitOutcome, Termination, TracingSink};
pub use profile::{
    build_args, build_command, transcode, TranscodeProfile, TranscodeRequest, TranscodeSettings,
};
pub use sexagesimal::format_duration_sexagesimal;
pub use template::TemplateContext;
pub use tools::{check_tool, check_tools, get_tool_path, require_tool, ToolInfo};
