//! Stream probing.
//!
//! The planner only needs a list of [`StreamDescriptor`]s per request. Where
//! they come from is a collaborator behind the [`StreamProber`] trait; the
//! default backend shells out to ffprobe.

mod ffprobe;
mod types;

pub use ffprobe::{parse_ffprobe_streams, FfprobeProber};
pub use types::*;

use crate::ProbeError;
use async_trait::async_trait;
use std::path::Path;

/// Source of stream descriptors for a media file.
///
/// Invoked once per transcode request. Failures are propagated unchanged as
/// [`crate::Error::Probe`].
#[async_trait]
pub trait StreamProber: Send + Sync {
    /// List the elementary streams of `path` in input order.
    async fn probe_streams(&self, path: &Path) -> Result<Vec<StreamDescriptor>, ProbeError>;
}
