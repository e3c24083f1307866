//! Per-stream codec planning for the DLNA MPEG profile.
//!
//! Maps probed [`StreamDescriptor`]s onto explicit encoder output mappings:
//! one `-map` plus its codec options for every input stream the active
//! [`PlannerPolicy`] keeps. Each output stream type has its own slot counter,
//! so options are scoped as `-c:a:0`, `-c:a:1`, ... regardless of how the
//! types interleave in the input.
//!
//! Planning is a pure function of the descriptors and the policy.

use crate::probe::{CodecType, StreamDescriptor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Video codecs that are still images per frame; these are copied.
pub const IMAGE_VIDEO_CODECS: &[&str] = &["mjpeg", "png", "bmp", "webp", "tiff", "jpeg2000"];

/// Audio codecs re-encoded to AC-3 at 224 kbit/s.
pub const AUDIO_TIER_ONE: &[&str] = &[
    "aac", "dca", "ac3", "mp2", "mp3", "opus", "flac", "pcm_s16le",
];

/// Audio codecs re-encoded to AC-3 at 448 kbit/s.
pub const AUDIO_TIER_TWO: &[&str] = &["eac3", "dts"];

/// Text and DVD bitmap subtitle codecs converted to DVB subtitles.
pub const CONVERTIBLE_SUBTITLES: &[&str] = &[
    "srt", "subrip", "ass", "ssa", "webvtt", "mov_text", "text", "dvdsub", "dvd_subtitle",
];

/// Frame size of the MPEG-2 target, also used as the DVB subtitle canvas.
pub const TARGET_FRAME_SIZE: &str = "720x576";

const TRUEHD_MAX_STRICT_CHANNELS: u32 = 6;

/// Policy variant for streams outside the conversion tables.
///
/// Both variants are in production use; neither is a default of the planner
/// itself. Configuration selects one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlannerPolicy {
    /// Unrecognized audio, subtitle and other streams are copied. TrueHD is
    /// re-encoded through an explicit 5.1 channel layout. Audio drift is
    /// corrected with `aresample=async=10000`.
    Permissive,
    /// Unrecognized audio, subtitle and other streams are dropped. TrueHD is
    /// downmixed to stereo, and dropped entirely above 6 channels. Audio drift
    /// is corrected with `aresample=async=1000000:first_pts=0`.
    Strict,
}

impl PlannerPolicy {
    /// Resample filter appended to every re-encoded audio stream.
    pub fn resample_filter(&self) -> &'static str {
        match self {
            PlannerPolicy::Permissive => "aresample=async=10000",
            PlannerPolicy::Strict => "aresample=async=1000000:first_pts=0",
        }
    }
}

impl FromStr for PlannerPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "permissive" => Ok(PlannerPolicy::Permissive),
            "strict" => Ok(PlannerPolicy::Strict),
            _ => Err(format!("Unknown planner policy: {}", s)),
        }
    }
}

impl fmt::Display for PlannerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlannerPolicy::Permissive => write!(f, "permissive"),
            PlannerPolicy::Strict => write!(f, "strict"),
        }
    }
}

/// Channel handling for a re-encoded audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioLayout {
    /// Downmix to two channels.
    Stereo,
    /// Remap through a 5.1 channel-layout filter.
    Surround51,
}

/// What happens to one kept stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Treatment {
    /// Forwarded without re-encoding.
    Copy,
    /// Re-encoded to the fixed MPEG-2 PAL target.
    Mpeg2Video,
    /// Re-encoded to AC-3.
    Ac3 {
        bitrate: &'static str,
        layout: AudioLayout,
    },
    /// Converted to DVB bitmap subtitles.
    DvbSubtitle,
}

/// One explicit output mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMapping {
    /// Absolute input stream index.
    pub input_index: u32,
    /// Output stream type.
    pub codec_type: CodecType,
    /// Position among output streams of the same type.
    pub output_slot: u32,
    /// Chosen treatment.
    pub treatment: Treatment,
    /// Encoder arguments for this mapping.
    pub args: Vec<String>,
}

/// Ordered output mappings for one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamPlan {
    pub mappings: Vec<StreamMapping>,
}

impl StreamPlan {
    /// Flatten into encoder arguments, in input order.
    pub fn args(&self) -> Vec<String> {
        self.mappings
            .iter()
            .flat_map(|m| m.args.iter().cloned())
            .collect()
    }

    /// Mapping for an input stream, if it was kept.
    pub fn mapping_for(&self, input_index: u32) -> Option<&StreamMapping> {
        self.mappings.iter().find(|m| m.input_index == input_index)
    }
}

#[derive(Debug, Default)]
struct SlotCounters {
    video: u32,
    audio: u32,
    subtitle: u32,
    other: u32,
}

impl SlotCounters {
    fn next(&mut self, codec_type: CodecType) -> u32 {
        let counter = match codec_type {
            CodecType::Video => &mut self.video,
            CodecType::Audio => &mut self.audio,
            CodecType::Subtitle => &mut self.subtitle,
            CodecType::Other => &mut self.other,
        };
        let slot = *counter;
        *counter += 1;
        slot
    }
}

/// Plan output mappings for `streams` under `policy`.
///
/// Streams the policy drops get no mapping and consume no output slot.
pub fn plan_streams(streams: &[StreamDescriptor], policy: PlannerPolicy) -> StreamPlan {
    let mut slots = SlotCounters::default();
    let mut plan = StreamPlan::default();

    for stream in streams {
        let treatment = match stream.codec_type {
            CodecType::Video => Some(video_treatment(stream)),
            CodecType::Audio => audio_treatment(stream, policy),
            CodecType::Subtitle => subtitle_treatment(stream, policy),
            CodecType::Other => match policy {
                PlannerPolicy::Permissive => Some(Treatment::Copy),
                PlannerPolicy::Strict => None,
            },
        };

        let Some(treatment) = treatment else {
            tracing::debug!(
                "Dropping {} stream {} ({}) under {} policy",
                stream.codec_type,
                stream.index,
                stream.codec_name,
                policy
            );
            continue;
        };

        let slot = slots.next(stream.codec_type);
        tracing::debug!(
            "Stream {} ({} {}) -> output {} slot {}: {:?}",
            stream.index,
            stream.codec_type,
            stream.codec_name,
            stream.codec_type,
            slot,
            treatment
        );

        plan.mappings.push(StreamMapping {
            input_index: stream.index,
            codec_type: stream.codec_type,
            output_slot: slot,
            treatment,
            args: mapping_args(stream, slot, treatment, policy),
        });
    }

    plan
}

fn video_treatment(stream: &StreamDescriptor) -> Treatment {
    if IMAGE_VIDEO_CODECS.contains(&stream.codec_name.as_str()) {
        Treatment::Copy
    } else {
        Treatment::Mpeg2Video
    }
}

fn audio_treatment(stream: &StreamDescriptor, policy: PlannerPolicy) -> Option<Treatment> {
    let codec = stream.codec_name.as_str();
    if AUDIO_TIER_ONE.contains(&codec) {
        return Some(Treatment::Ac3 {
            bitrate: "224k",
            layout: AudioLayout::Stereo,
        });
    }
    if AUDIO_TIER_TWO.contains(&codec) {
        return Some(Treatment::Ac3 {
            bitrate: "448k",
            layout: AudioLayout::Stereo,
        });
    }
    if codec == "truehd" {
        return match policy {
            PlannerPolicy::Permissive => Some(Treatment::Ac3 {
                bitrate: "640k",
                layout: AudioLayout::Surround51,
            }),
            PlannerPolicy::Strict => match stream.channels {
                Some(channels) if channels > TRUEHD_MAX_STRICT_CHANNELS => None,
                _ => Some(Treatment::Ac3 {
                    bitrate: "640k",
                    layout: AudioLayout::Stereo,
                }),
            },
        };
    }
    match policy {
        PlannerPolicy::Permissive => Some(Treatment::Copy),
        PlannerPolicy::Strict => None,
    }
}

fn subtitle_treatment(stream: &StreamDescriptor, policy: PlannerPolicy) -> Option<Treatment> {
    if CONVERTIBLE_SUBTITLES.contains(&stream.codec_name.as_str()) {
        return Some(Treatment::DvbSubtitle);
    }
    match policy {
        PlannerPolicy::Permissive => Some(Treatment::Copy),
        PlannerPolicy::Strict => None,
    }
}

fn type_specifier(codec_type: CodecType) -> &'static str {
    match codec_type {
        CodecType::Video => "v",
        CodecType::Audio => "a",
        CodecType::Subtitle => "s",
        CodecType::Other => "d",
    }
}

fn mapping_args(
    stream: &StreamDescriptor,
    slot: u32,
    treatment: Treatment,
    policy: PlannerPolicy,
) -> Vec<String> {
    let spec = format!("{}:{}", type_specifier(stream.codec_type), slot);
    let scoped = |option: &str| format!("-{option}:{spec}");

    let mut args = vec!["-map".to_string(), format!("0:{}", stream.index)];

    match treatment {
        Treatment::Copy => {
            args.extend([scoped("c"), "copy".to_string()]);
        }
        Treatment::Mpeg2Video => {
            let options: [(&str, &str); 13] = [
                ("c", "mpeg2video"),
                ("b", "6000k"),
                ("minrate", "3000k"),
                ("maxrate", "8000k"),
                ("bufsize", "1835k"),
                ("g", "15"),
                ("bf", "2"),
                ("flags", "+ilme+ildct"),
                ("filter", "fieldorder=tff"),
                ("aspect", "16:9"),
                ("s", TARGET_FRAME_SIZE),
                ("r", "25"),
                ("fps_mode", "cfr"),
            ];
            for (option, value) in options {
                args.extend([scoped(option), value.to_string()]);
            }
        }
        Treatment::Ac3 { bitrate, layout } => {
            args.extend([
                scoped("c"),
                "ac3".to_string(),
                scoped("b"),
                bitrate.to_string(),
            ]);
            let filter = match layout {
                AudioLayout::Stereo => {
                    args.extend([scoped("ac"), "2".to_string()]);
                    policy.resample_filter().to_string()
                }
                AudioLayout::Surround51 => {
                    format!("aformat=channel_layouts=5.1,{}", policy.resample_filter())
                }
            };
            args.extend([scoped("filter"), filter]);
        }
        Treatment::DvbSubtitle => {
            args.extend([
                scoped("c"),
                "dvbsub".to_string(),
                "-fix_sub_duration".to_string(),
                "-canvas_size".to_string(),
                TARGET_FRAME_SIZE.to_string(),
            ]);
        }
    }

    args
}
