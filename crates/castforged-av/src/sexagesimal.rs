//! Encoder-facing time formatting.

use std::time::Duration;

/// Format `d` as `H:MM:SS[.fraction]` for encoder seek and length options.
///
/// Hours are unpadded, the fraction keeps nanosecond precision with trailing
/// zeros removed, and a whole second carries no fraction at all.
///
/// # Example
///
/// ```
/// use castforged_av::format_duration_sexagesimal;
/// use std::time::Duration;
///
/// assert_eq!(format_duration_sexagesimal(Duration::from_millis(3_723_500)), "1:02:03.5");
/// assert_eq!(format_duration_sexagesimal(Duration::ZERO), "0:00:00");
/// ```
pub fn format_duration_sexagesimal(d: Duration) -> String {
    let total = d.as_secs();
    let (h, m, s) = (total / 3600, (total / 60) % 60, total % 60);
    let formatted = format!("{}:{:02}:{:02}.{:09}", h, m, s, d.subsec_nanos());
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_seconds_have_no_fraction() {
        assert_eq!(format_duration_sexagesimal(Duration::from_secs(10)), "0:00:10");
        assert_eq!(format_duration_sexagesimal(Duration::from_secs(3600)), "1:00:00");
        assert_eq!(format_duration_sexagesimal(Duration::from_secs(100 * 3600)), "100:00:00");
    }

    #[test]
    fn test_fraction_is_trimmed() {
        assert_eq!(format_duration_sexagesimal(Duration::from_millis(1250)), "0:00:01.25");
        assert_eq!(format_duration_sexagesimal(Duration::from_nanos(1)), "0:00:00.000000001");
        assert_eq!(
            format_duration_sexagesimal(Duration::new(59 * 60 + 59, 100_000_000)),
            "0:59:59.1"
        );
    }
}
