//! Normal play time (NPT) text handling.
//!
//! NPT is the `H:MM:SS.mmm` notation DLNA renderers use to negotiate seeks.
//! Hours are unbounded; minutes and seconds are one or two digits below 60;
//! the fractional part is optional and kept to nanosecond precision.

use crate::{Error, Result};
use std::fmt;
use std::time::Duration;

/// A playback-time window together with the byte window it was derived from.
///
/// `end == None` means the range is open-ended. Byte offsets are inclusive and
/// are zero when the range was parsed from NPT text rather than derived from
/// an HTTP byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NptRange {
    /// NPT start time.
    pub start: Duration,
    /// NPT end time, if bounded.
    pub end: Option<Duration>,
    /// First byte of the originating byte range.
    pub start_byte: u64,
    /// Last byte of the originating byte range (inclusive).
    pub end_byte: u64,
}

impl NptRange {
    /// Playback length covered by the range, if it is bounded.
    pub fn length(&self) -> Option<Duration> {
        self.end.map(|end| end.saturating_sub(self.start))
    }
}

impl fmt::Display for NptRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_npt_range(self))
    }
}

/// Parse an NPT time of the form `H:MM:SS[.fraction]`.
///
/// # Errors
///
/// Returns [`Error::Format`] unless hour, minute and second fields are all
/// present and well formed.
///
/// # Example
///
/// ```
/// use castforged_dlna::parse_npt;
/// use std::time::Duration;
///
/// assert_eq!(parse_npt("1:02:03.500")?, Duration::from_millis(3_723_500));
/// assert!(parse_npt("02:03").is_err());
/// # Ok::<(), castforged_dlna::Error>(())
/// ```
pub fn parse_npt(text: &str) -> Result<Duration> {
    let invalid = || Error::format(format!("{text:?}"));

    let mut fields = text.split(':');
    let (Some(hours), Some(minutes), Some(seconds), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(invalid());
    };

    let hours = parse_digits(hours, usize::MAX).ok_or_else(invalid)?;
    let minutes = parse_digits(minutes, 2)
        .filter(|m| *m < 60)
        .ok_or_else(invalid)?;

    let (seconds, fraction) = match seconds.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (seconds, None),
    };
    let seconds = parse_digits(seconds, 2)
        .filter(|s| *s < 60)
        .ok_or_else(invalid)?;
    let nanos = match fraction {
        Some(fraction) => parse_fraction_nanos(fraction).ok_or_else(invalid)?,
        None => 0,
    };

    let total_secs = hours
        .checked_mul(3600)
        .and_then(|h| h.checked_add(minutes * 60 + seconds))
        .ok_or_else(invalid)?;

    Ok(Duration::new(total_secs, nanos))
}

/// Format a duration as fixed-width, zero-padded `HH:MM:SS.mmm`.
///
/// Sub-millisecond precision is truncated. Hours widen past two digits when
/// needed.
pub fn format_npt(npt: Duration) -> String {
    let millis = npt.as_millis();
    let ms = millis % 1000;
    let secs = millis / 1000;
    let s = secs % 60;
    let m = (secs / 60) % 60;
    let h = secs / 3600;
    format!("{h:02}:{m:02}:{s:02}.{ms:03}")
}

/// Parse a `start-end` NPT pair. Either side may be empty.
///
/// An empty start means zero; an empty end means the range is unbounded.
pub fn parse_npt_range(text: &str) -> Result<NptRange> {
    let (start, end) = text
        .split_once('-')
        .ok_or_else(|| Error::format(format!("{text:?} is not a range")))?;

    let mut range = NptRange::default();
    if !start.is_empty() {
        range.start = parse_npt(start)?;
    }
    if !end.is_empty() {
        let end = parse_npt(end)?;
        if end < range.start {
            return Err(Error::format(format!("{text:?} ends before it starts")));
        }
        range.end = Some(end);
    }
    Ok(range)
}

/// Format an NPT range as `start-end`, leaving the end empty when unbounded.
pub fn format_npt_range(range: &NptRange) -> String {
    match range.end {
        Some(end) => format!("{}-{}", format_npt(range.start), format_npt(end)),
        None => format!("{}-", format_npt(range.start)),
    }
}

fn parse_digits(s: &str, max_len: usize) -> Option<u64> {
    if s.is_empty() || s.len() > max_len || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_fraction_nanos(fraction: &str) -> Option<u32> {
    if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Digits past nanosecond precision are dropped.
    let kept = &fraction[..fraction.len().min(9)];
    let scale = 10u32.pow(9 - kept.len() as u32);
    kept.parse::<u32>().ok().map(|n| n * scale)
}
