//! # castforged-dlna
//!
//! Protocol-side helpers for serving transcoded streams to DLNA/UPnP renderers.
//!
//! This crate provides:
//! - Normal play time (NPT) parsing and formatting ([`parse_npt`], [`format_npt`])
//! - Conversion of an HTTP byte range into a playback-time range
//!   ([`http_range_to_npt_range`]) for streams that have no fixed length
//! - The `contentFeatures.dlna.org` header value ([`ContentFeatures`])
//!
//! Everything here is pure and stateless.
//!
//! ## Example
//!
//! ```
//! use castforged_dlna::{http_range_to_npt_range, ContentFeatures};
//! use std::time::Duration;
//!
//! let range = http_range_to_npt_range("bytes=0-", 1_000, Duration::from_secs(60))?;
//! assert_eq!(range.end, Some(Duration::from_secs(60)));
//!
//! let features = ContentFeatures {
//!     profile_name: "MPEG_PS_PAL".to_string(),
//!     support_time_seek: true,
//!     support_range: true,
//!     transcoded: true,
//!     flags: None,
//! };
//! assert!(features.to_string().starts_with("DLNA.ORG_PN=MPEG_PS_PAL;DLNA.ORG_OP=11;DLNA.ORG_CI=1"));
//! # Ok::<(), castforged_dlna::Error>(())
//! ```

mod error;
pub mod features;
pub mod npt;
pub mod range;

pub use error::{Error, Result};
pub use features::{ContentFeatures, DEFAULT_FLAGS};
pub use npt::{format_npt, format_npt_range, parse_npt, parse_npt_range, NptRange};
pub use range::{http_range_to_npt_range, time_seek_range_header};

/// Header carrying the time-seek range of a response.
pub const TIME_SEEK_RANGE_DOMAIN: &str = "TimeSeekRange.dlna.org";

/// Header carrying the content features of a response.
pub const CONTENT_FEATURES_DOMAIN: &str = "contentFeatures.dlna.org";

/// Header carrying the transfer mode of a response.
pub const TRANSFER_MODE_DOMAIN: &str = "transferMode.dlna.org";

/// Transfer mode value for live, real-time streams.
pub const TRANSFER_MODE_STREAMING: &str = "Streaming";
