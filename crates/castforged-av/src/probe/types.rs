//! Stream descriptor types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of an elementary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecType {
    Video,
    Audio,
    Subtitle,
    /// Data, attachment and anything else the prober reports.
    Other,
}

impl CodecType {
    /// Classify an ffprobe `codec_type` value.
    pub fn from_probe(codec_type: &str) -> Self {
        match codec_type {
            "video" => CodecType::Video,
            "audio" => CodecType::Audio,
            "subtitle" => CodecType::Subtitle,
            _ => CodecType::Other,
        }
    }
}

impl fmt::Display for CodecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecType::Video => write!(f, "video"),
            CodecType::Audio => write!(f, "audio"),
            CodecType::Subtitle => write!(f, "subtitle"),
            CodecType::Other => write!(f, "other"),
        }
    }
}

/// One elementary stream of a probed source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStream")]
pub struct StreamDescriptor {
    /// Absolute index of the stream in the input.
    pub index: u32,
    /// Kind of stream.
    pub codec_type: CodecType,
    /// Codec name as reported by the prober (e.g. `h264`, `truehd`).
    pub codec_name: String,
    /// Audio channel count, when known.
    pub channels: Option<u32>,
}

impl StreamDescriptor {
    /// Build a descriptor without channel information.
    pub fn new(index: u32, codec_type: CodecType, codec_name: impl Into<String>) -> Self {
        Self {
            index,
            codec_type,
            codec_name: codec_name.into(),
            channels: None,
        }
    }

    /// Builder: set the channel count.
    pub fn with_channels(mut self, channels: u32) -> Self {
        self.channels = Some(channels);
        self
    }
}

/// A numeric field as it arrives from a prober: an integer, a float, or
/// arbitrary-precision decimal text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ProbeNumber {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ProbeNumber {
    /// Normalize to an integer, truncating any fractional part.
    ///
    /// Returns `None` for non-numeric text and non-finite values.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            ProbeNumber::Integer(n) => Some(*n),
            ProbeNumber::Float(f) => float_to_i64(*f),
            ProbeNumber::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(float_to_i64))
            }
        }
    }

    /// Normalize to a non-negative 32-bit integer.
    pub fn to_u32(&self) -> Option<u32> {
        self.to_i64().and_then(|n| u32::try_from(n).ok())
    }
}

fn float_to_i64(f: f64) -> Option<i64> {
    if f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f.trunc() as i64)
    } else {
        None
    }
}

/// Wire form of a stream entry, before normalization.
#[derive(Debug, Deserialize)]
struct RawStream {
    index: ProbeNumber,
    #[serde(default)]
    codec_type: Option<String>,
    #[serde(default)]
    codec_name: Option<String>,
    #[serde(default)]
    channels: Option<ProbeNumber>,
}

impl TryFrom<RawStream> for StreamDescriptor {
    type Error = String;

    fn try_from(raw: RawStream) -> std::result::Result<Self, Self::Error> {
        let index = raw
            .index
            .to_u32()
            .ok_or_else(|| format!("invalid stream index: {:?}", raw.index))?;
        let channels = match raw.channels {
            Some(channels) => Some(
                channels
                    .to_u32()
                    .ok_or_else(|| format!("invalid channel count: {channels:?}"))?,
            ),
            None => None,
        };

        Ok(StreamDescriptor {
            index,
            codec_type: CodecType::from_probe(raw.codec_type.as_deref().unwrap_or_default()),
            codec_name: raw.codec_name.unwrap_or_default(),
            channels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_number_normalization() {
        assert_eq!(ProbeNumber::Integer(3).to_i64(), Some(3));
        assert_eq!(ProbeNumber::Float(2.0).to_i64(), Some(2));
        assert_eq!(ProbeNumber::Float(6.9).to_i64(), Some(6));
        assert_eq!(ProbeNumber::Text("8".into()).to_i64(), Some(8));
        assert_eq!(ProbeNumber::Text("1.000000000000000000001".into()).to_i64(), Some(1));
        assert_eq!(ProbeNumber::Text("abc".into()).to_i64(), None);
        assert_eq!(ProbeNumber::Float(f64::NAN).to_i64(), None);
        assert_eq!(ProbeNumber::Integer(-1).to_u32(), None);
    }

    #[test]
    fn test_descriptor_accepts_every_numeric_form() {
        let streams: Vec<StreamDescriptor> = serde_json::from_str(
            r#"[
                {"index": 0, "codec_type": "video", "codec_name": "h264"},
                {"index": 1.0, "codec_type": "audio", "codec_name": "truehd", "channels": "8"},
                {"index": "2", "codec_type": "subtitle", "codec_name": "subrip"},
                {"index": 3, "codec_type": "attachment", "codec_name": "ttf", "channels": 0.0}
            ]"#,
        )
        .unwrap();

        assert_eq!(streams[0], StreamDescriptor::new(0, CodecType::Video, "h264"));
        assert_eq!(
            streams[1],
            StreamDescriptor::new(1, CodecType::Audio, "truehd").with_channels(8)
        );
        assert_eq!(streams[2].index, 2);
        assert_eq!(streams[2].codec_type, CodecType::Subtitle);
        assert_eq!(streams[3].codec_type, CodecType::Other);
        assert_eq!(streams[3].channels, Some(0));
    }

    #[test]
    fn test_descriptor_rejects_bad_index() {
        let result: Result<StreamDescriptor, _> =
            serde_json::from_str(r#"{"index": "first", "codec_type": "video"}"#);
        assert!(result.is_err());

        let result: Result<StreamDescriptor, _> =
            serde_json::from_str(r#"{"index": -2, "codec_type": "video"}"#);
        assert!(result.is_err());
    }
}
