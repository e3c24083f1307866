//! Delivery profiles and encoder argument templates.
//!
//! Each [`TranscodeProfile`] selects a full encoder argument vector. Only the
//! DLNA MPEG-PS profile consults the stream planner and therefore the prober;
//! the custom profile runs an operator-configured command and cannot seek.

use crate::cmdline::{parse_command_line_with, TokenizerOptions};
use crate::planner::{plan_streams, PlannerPolicy};
use crate::probe::{StreamDescriptor, StreamProber};
use crate::process::{start, DiagnosticsSink, EncoderProcess};
use crate::sexagesimal::format_duration_sexagesimal;
use crate::template::{path_str, TemplateContext};
use crate::tools::FFMPEG;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default floor for profiles that raise too-short lengths.
pub const DEFAULT_MIN_LENGTH: Duration = Duration::from_millis(100);

/// DLNA profile name advertised for the MPEG-PS profile.
pub const MPEG_PS_PAL: &str = "MPEG_PS_PAL";

/// Target container and codec combination for a client class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranscodeProfile {
    /// MPEG transport stream with MPEG-2 video for DLNA renderers.
    DlnaMpegPs,
    /// WebM for VP8-capable receivers.
    Vp8Webm,
    /// Fragmented H.264 MP4 for Chromecast.
    ChromecastMp4,
    /// Fragmented H.264/MP3 MP4 for browsers.
    WebMp4,
    /// Operator-supplied command line.
    Custom,
}

impl TranscodeProfile {
    /// All profiles, in declaration order.
    pub const ALL: [TranscodeProfile; 5] = [
        TranscodeProfile::DlnaMpegPs,
        TranscodeProfile::Vp8Webm,
        TranscodeProfile::ChromecastMp4,
        TranscodeProfile::WebMp4,
        TranscodeProfile::Custom,
    ];

    /// Name used in configuration and on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            TranscodeProfile::DlnaMpegPs => "dlna-mpeg-ps",
            TranscodeProfile::Vp8Webm => "vp8-webm",
            TranscodeProfile::ChromecastMp4 => "chromecast-mp4",
            TranscodeProfile::WebMp4 => "web-mp4",
            TranscodeProfile::Custom => "custom",
        }
    }

    /// `DLNA.ORG_PN` value, empty when the profile has none.
    pub fn dlna_profile_name(&self) -> &'static str {
        match self {
            TranscodeProfile::DlnaMpegPs => MPEG_PS_PAL,
            _ => "",
        }
    }

    /// MIME type of the produced stream.
    pub fn mime_type(&self) -> &'static str {
        match self {
            TranscodeProfile::DlnaMpegPs => "video/mpeg",
            TranscodeProfile::Vp8Webm => "video/webm",
            TranscodeProfile::ChromecastMp4 | TranscodeProfile::WebMp4 => "video/mp4",
            TranscodeProfile::Custom => "application/octet-stream",
        }
    }

    /// Whether the encoder honours a start offset and length.
    pub fn supports_seek(&self) -> bool {
        !matches!(self, TranscodeProfile::Custom)
    }

    /// Whether argument building needs probed stream descriptors.
    pub fn needs_probe(&self) -> bool {
        matches!(self, TranscodeProfile::DlnaMpegPs)
    }
}

impl FromStr for TranscodeProfile {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.to_lowercase().replace('_', "-");
        TranscodeProfile::ALL
            .into_iter()
            .find(|p| p.name() == normalized)
            .ok_or_else(|| format!("Unknown transcode profile: {}", s))
    }
}

impl fmt::Display for TranscodeProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One transcode request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeRequest {
    /// Source media file.
    pub source_path: PathBuf,
    /// Delivery profile.
    pub profile: TranscodeProfile,
    /// Playback position to seek to before encoding.
    pub start_offset: Duration,
    /// Amount of media to encode; `None` encodes to the end.
    pub length: Option<Duration>,
    /// Command line for [`TranscodeProfile::Custom`].
    pub custom_command: Option<String>,
}

impl TranscodeRequest {
    /// Request the whole of `source_path` in `profile`.
    pub fn new(source_path: impl Into<PathBuf>, profile: TranscodeProfile) -> Self {
        Self {
            source_path: source_path.into(),
            profile,
            start_offset: Duration::ZERO,
            length: None,
            custom_command: None,
        }
    }

    /// Builder: set the start offset.
    pub fn with_start(mut self, start: Duration) -> Self {
        self.start_offset = start;
        self
    }

    /// Builder: set the length.
    pub fn with_length(mut self, length: Duration) -> Self {
        self.length = Some(length);
        self
    }

    /// Builder: set the custom command line.
    pub fn with_custom_command(mut self, command: impl Into<String>) -> Self {
        self.custom_command = Some(command.into());
        self
    }
}

/// Environment-dependent inputs to argument building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeSettings {
    /// Encoder executable for every non-custom profile.
    pub ffmpeg: PathBuf,
    /// Encoder thread count.
    pub threads: usize,
    /// Floor applied to short lengths by profiles that need one.
    pub min_length: Duration,
    /// Stream planner policy variant.
    pub policy: PlannerPolicy,
    /// Tokenizer options for custom command lines.
    pub tokenizer: TokenizerOptions,
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from(FFMPEG),
            threads: num_cpus::get(),
            min_length: DEFAULT_MIN_LENGTH,
            policy: PlannerPolicy::Permissive,
            tokenizer: TokenizerOptions::default(),
        }
    }
}

/// Build the full encoder argument vector, probing only when the profile
/// needs stream descriptors.
///
/// # Errors
///
/// Returns [`Error::Probe`] when probing fails, and the errors of
/// [`build_args`].
pub async fn build_command(
    request: &TranscodeRequest,
    prober: &dyn StreamProber,
    settings: &TranscodeSettings,
) -> Result<Vec<String>> {
    path_str(&request.source_path)?;

    let streams = if request.profile.needs_probe() {
        prober.probe_streams(&request.source_path).await?
    } else {
        Vec::new()
    };

    build_args(request, &streams, settings)
}

/// Build the full encoder argument vector from already-probed streams.
///
/// `streams` is ignored by profiles that do not plan per stream.
///
/// # Errors
///
/// [`Error::InvalidInput`] when the source path is not valid UTF-8. For
/// [`TranscodeProfile::Custom`]: [`Error::InvalidInput`] when no command is
/// configured or it is blank, and [`Error::Syntax`] when it cannot be
/// tokenized.
pub fn build_args(
    request: &TranscodeRequest,
    streams: &[StreamDescriptor],
    settings: &TranscodeSettings,
) -> Result<Vec<String>> {
    let source = path_str(&request.source_path)?;
    let args = match request.profile {
        TranscodeProfile::DlnaMpegPs => dlna_mpeg_ps_args(request, source, streams, settings),
        TranscodeProfile::Vp8Webm => vp8_webm_args(request, source, settings),
        TranscodeProfile::ChromecastMp4 => chromecast_mp4_args(request, source, settings),
        TranscodeProfile::WebMp4 => web_mp4_args(request, source, settings),
        TranscodeProfile::Custom => return custom_args(request, settings),
    };
    Ok(args)
}

/// Build the command for `request` and start the encoder.
///
/// # Errors
///
/// Everything detectable before streaming starts: probe, syntax, launch and
/// pipe failures. Later failures only reach `sink`.
pub async fn transcode(
    request: &TranscodeRequest,
    prober: &dyn StreamProber,
    settings: &TranscodeSettings,
    sink: Arc<dyn DiagnosticsSink>,
    cancel: &CancellationToken,
) -> Result<EncoderProcess> {
    let argv = build_command(request, prober, settings).await?;
    start(&argv, sink, cancel)
}

struct ArgBuilder {
    args: Vec<String>,
}

impl ArgBuilder {
    fn new(program: &std::path::Path) -> Self {
        Self {
            args: vec![program.display().to_string()],
        }
    }

    fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    fn args<I, S>(&mut self, iter: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    fn threads(&mut self, threads: usize) -> &mut Self {
        self.arg("-threads").arg(threads.to_string())
    }

    fn seek(&mut self, start: Duration) -> &mut Self {
        self.arg("-ss").arg(format_duration_sexagesimal(start))
    }

    fn length(&mut self, length: Option<Duration>) -> &mut Self {
        if let Some(length) = length {
            self.arg("-t").arg(format_duration_sexagesimal(length));
        }
        self
    }

    fn input(&mut self, source: &str) -> &mut Self {
        self.arg("-i").arg(source)
    }

    fn output(&mut self, format: &str) -> Vec<String> {
        self.arg("-f").arg(format).arg("pipe:");
        std::mem::take(&mut self.args)
    }
}

/// A present length raised to `floor`.
fn floored(length: Option<Duration>, floor: Duration) -> Option<Duration> {
    length.map(|l| l.max(floor))
}

/// A non-zero length, optionally raised to `floor`.
fn positive(length: Option<Duration>, floor: Option<Duration>) -> Option<Duration> {
    let length = length.filter(|l| !l.is_zero())?;
    Some(floor.map_or(length, |f| length.max(f)))
}

fn dlna_mpeg_ps_args(
    request: &TranscodeRequest,
    source: &str,
    streams: &[StreamDescriptor],
    settings: &TranscodeSettings,
) -> Vec<String> {
    let plan = plan_streams(streams, settings.policy);

    ArgBuilder::new(&settings.ffmpeg)
        .threads(settings.threads)
        .seek(request.start_offset)
        .length(floored(request.length, settings.min_length))
        .input(source)
        .args(plan.args())
        .args([
            "-mpegts_flags",
            "+resend_headers+initial_discontinuity",
            "-mpegts_service_type",
            "digital_tv",
            "-fflags",
            "+genpts+flush_packets",
            "-avoid_negative_ts",
            "make_zero",
            "-reset_timestamps",
            "1",
            "-frag_duration",
            "1000000",
            "-final_delay",
            "0.7",
            "-muxdelay",
            "0.7",
            "-muxpreload",
            "0",
            "-flush_packets",
            "1",
        ])
        .output("mpegts")
}

fn vp8_webm_args(
    request: &TranscodeRequest,
    source: &str,
    settings: &TranscodeSettings,
) -> Vec<String> {
    ArgBuilder::new(&settings.ffmpeg)
        .threads(settings.threads)
        .args(["-async", "1"])
        .seek(request.start_offset)
        .length(positive(request.length, None))
        .input(source)
        .output("webm")
}

fn chromecast_mp4_args(
    request: &TranscodeRequest,
    source: &str,
    settings: &TranscodeSettings,
) -> Vec<String> {
    ArgBuilder::new(&settings.ffmpeg)
        .seek(request.start_offset)
        .input(source)
        .args([
            "-c:v",
            "libx264",
            "-preset",
            "fast",
            "-profile:v",
            "high",
            "-level",
            "5.0",
            "-g",
            "48",
            "-keyint_min",
            "48",
            "-sc_threshold",
            "0",
            "-movflags",
            "+faststart+frag_keyframe+default_base_moof",
            "-frag_duration",
            "1000000",
            "-min_frag_duration",
            "1000000",
            "-force_key_frames",
            "expr:gte(n,n_forced*48)",
        ])
        .length(positive(request.length, Some(settings.min_length)))
        .output("mp4")
}

fn web_mp4_args(
    request: &TranscodeRequest,
    source: &str,
    settings: &TranscodeSettings,
) -> Vec<String> {
    ArgBuilder::new(&settings.ffmpeg)
        .seek(request.start_offset)
        .input(source)
        .args([
            "-pix_fmt",
            "yuv420p",
            "-c:v",
            "libx264",
            "-crf",
            "25",
            "-c:a",
            "mp3",
            "-ab",
            "128k",
            "-ar",
            "44100",
            "-preset",
            "ultrafast",
            "-movflags",
            "+faststart+frag_keyframe+empty_moov+default_base_moof",
        ])
        .length(positive(request.length, None))
        .output("mp4")
}

fn custom_args(request: &TranscodeRequest, settings: &TranscodeSettings) -> Result<Vec<String>> {
    let command = request
        .custom_command
        .as_deref()
        .ok_or_else(|| Error::InvalidInput("custom profile requires a command".into()))?;

    let argv = parse_command_line_with(command, settings.tokenizer)?;
    if argv.is_empty() {
        return Err(Error::InvalidInput("custom command is empty".into()));
    }

    let ctx = TemplateContext::new()
        .with_source(&request.source_path)?
        .with_seek(request.start_offset, request.length);
    Ok(ctx.substitute_all(&argv))
}
