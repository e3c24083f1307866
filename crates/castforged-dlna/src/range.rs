//! HTTP byte range to NPT conversion.
//!
//! A transcoded stream has no fixed length, so a renderer seeking with an
//! HTTP `Range` header is really asking for a playback position. The byte
//! offset is mapped onto the source duration proportionally:
//!
//! ```text
//! time(offset) = round(offset / total_size * total_duration)
//! ```
//!
//! The fraction is evaluated exactly in integer arithmetic and rounded to the
//! nearest nanosecond once, at the very end, so repeated seeks into long files
//! never accumulate floating-point drift. The mapping is monotonic in the
//! offset and exact at both ends (`0 -> 0`, `total_size -> total_duration`).

use crate::npt::{format_npt, NptRange};
use crate::{Error, Result};
use std::time::Duration;

const BYTES_PREFIX: &str = "bytes=";

/// Convert a single-range `bytes=start-end` header into an [`NptRange`].
///
/// `bytes=0-` and `bytes=0-<total_size - 1>` cover the whole resource and map
/// directly to `0..total_duration` without any arithmetic. An empty end means
/// "to the last byte". The resulting end time is derived from `end + 1` and
/// never exceeds `total_duration`.
///
/// # Errors
///
/// Returns [`Error::Range`] for anything other than a single, in-bounds
/// `bytes=start-end` specifier: multi-range lists, suffix ranges
/// (`bytes=-500`), non-numeric offsets, `start > end`, `end >= total_size`,
/// or an empty resource.
///
/// # Example
///
/// ```
/// use castforged_dlna::http_range_to_npt_range;
/// use std::time::Duration;
///
/// let range = http_range_to_npt_range("bytes=500-999", 1_000, Duration::from_secs(100))?;
/// assert_eq!(range.start, Duration::from_secs(50));
/// assert_eq!(range.end, Some(Duration::from_secs(100)));
/// # Ok::<(), castforged_dlna::Error>(())
/// ```
pub fn http_range_to_npt_range(
    range_header: &str,
    total_size: u64,
    total_duration: Duration,
) -> Result<NptRange> {
    if total_size == 0 {
        return Err(Error::range("resource is empty"));
    }
    let last_byte = total_size - 1;

    if range_header == "bytes=0-" || range_header == format!("{BYTES_PREFIX}0-{last_byte}") {
        return Ok(NptRange {
            start: Duration::ZERO,
            end: Some(total_duration),
            start_byte: 0,
            end_byte: last_byte,
        });
    }

    let spec = range_header
        .strip_prefix(BYTES_PREFIX)
        .ok_or_else(|| Error::range(format!("unsupported range format: {range_header:?}")))?;
    if spec.contains(',') {
        return Err(Error::range(format!(
            "multiple ranges are not supported: {range_header:?}"
        )));
    }
    let (start, end) = spec
        .split_once('-')
        .ok_or_else(|| Error::range(format!("invalid range format: {range_header:?}")))?;

    let start_byte = parse_offset(start)
        .ok_or_else(|| Error::range(format!("invalid start byte value: {start:?}")))?;
    let end_byte = if end.is_empty() {
        last_byte
    } else {
        parse_offset(end).ok_or_else(|| Error::range(format!("invalid end byte value: {end:?}")))?
    };

    if start_byte > end_byte || end_byte >= total_size {
        return Err(Error::range(format!(
            "range {start_byte}-{end_byte} out of bounds for {total_size} bytes"
        )));
    }

    let start_time = byte_offset_to_time(start_byte, total_size, total_duration)?;
    let end_time = byte_offset_to_time(end_byte + 1, total_size, total_duration)?.min(total_duration);

    Ok(NptRange {
        start: start_time,
        end: Some(end_time),
        start_byte,
        end_byte,
    })
}

/// Render the `TimeSeekRange.dlna.org` response value for a resolved range:
/// `npt=<start>-<end>/<duration> bytes=<first>-<last>/<size>`.
pub fn time_seek_range_header(range: &NptRange, total_duration: Duration, total_size: u64) -> String {
    let end = range.end.map(format_npt).unwrap_or_default();
    format!(
        "npt={}-{}/{} bytes={}-{}/{}",
        format_npt(range.start),
        end,
        format_npt(total_duration),
        range.start_byte,
        range.end_byte,
        total_size
    )
}

/// Map `offset` (in `0..=total_size`) onto `0..=total_duration`.
///
/// Both operands fit in 64 bits, so their product fits in 128 bits and the
/// rational `offset * nanos / total_size` is evaluated exactly before the
/// single round-half-up step.
fn byte_offset_to_time(offset: u64, total_size: u64, total_duration: Duration) -> Result<Duration> {
    let nanos = u64::try_from(total_duration.as_nanos())
        .map_err(|_| Error::range(format!("duration {total_duration:?} is too long")))?;

    let numerator = u128::from(offset) * u128::from(nanos);
    let denominator = u128::from(total_size);
    let rounded = (numerator + denominator / 2) / denominator;

    // offset <= total_size, so rounded <= nanos.
    Ok(Duration::from_nanos(rounded as u64))
}

fn parse_offset(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
