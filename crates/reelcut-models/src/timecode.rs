//! Timecode parsing, formatting, and segment window validation.
//!
//! The AI backend proposes segments as human timecodes (`HH:MM:SS` or
//! `MM:SS`). Everything downstream works in seconds, so malformed input is
//! rejected here instead of silently becoming `0`.

use thiserror::Error;

/// Default upper bound for a single segment (seconds).
pub const DEFAULT_MAX_SEGMENT_SECS: f64 = 180.0;

/// Timecode parsing/validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimecodeError {
    #[error("Timecode cannot be empty")]
    Empty,

    #[error("Invalid timecode format '{0}'. Use HH:MM:SS or MM:SS")]
    InvalidFormat(String),

    #[error("Invalid {component} value: '{value}'")]
    InvalidValue {
        component: &'static str,
        value: String,
    },

    #[error("{component} out of range: {value}")]
    OutOfRange { component: &'static str, value: f64 },

    #[error("Segment start ({start:.3}s) must be before end ({end:.3}s)")]
    StartNotBeforeEnd { start: f64, end: f64 },

    #[error("Segment start ({start:.3}s) is beyond the source duration ({source_duration:.3}s)")]
    StartBeyondSource { start: f64, source_duration: f64 },
}

/// Parse a timecode string to total seconds.
///
/// Accepted shapes:
/// - `H:MM:SS` / `HH:MM:SS`
/// - `MM:SS`
///
/// The leading component is unbounded; minutes and seconds that follow it
/// must be below 60. The seconds component may carry a fraction.
///
/// # Examples
/// ```
/// use reelcut_models::timecode::parse_timecode;
/// assert_eq!(parse_timecode("00:01:30").unwrap(), 90.0);
/// assert_eq!(parse_timecode("02:05").unwrap(), 125.0);
/// ```
pub fn parse_timecode(tc: &str) -> Result<f64, TimecodeError> {
    let tc = tc.trim();
    if tc.is_empty() {
        return Err(TimecodeError::Empty);
    }

    let parts: Vec<&str> = tc.split(':').collect();
    match parts.as_slice() {
        [minutes, seconds] => {
            let minutes = parse_whole(minutes, "minutes")?;
            let seconds = parse_seconds(seconds)?;
            Ok(minutes * 60.0 + seconds)
        }
        [hours, minutes, seconds] => {
            let hours = parse_whole(hours, "hours")?;
            let minutes = parse_whole(minutes, "minutes")?;
            if minutes >= 60.0 {
                return Err(TimecodeError::OutOfRange {
                    component: "minutes",
                    value: minutes,
                });
            }
            let seconds = parse_seconds(seconds)?;
            Ok(hours * 3600.0 + minutes * 60.0 + seconds)
        }
        _ => Err(TimecodeError::InvalidFormat(tc.to_string())),
    }
}

fn parse_whole(value: &str, component: &'static str) -> Result<f64, TimecodeError> {
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(TimecodeError::InvalidValue {
            component,
            value: value.to_string(),
        });
    }
    value.parse::<f64>().map_err(|_| TimecodeError::InvalidValue {
        component,
        value: value.to_string(),
    })
}

fn parse_seconds(value: &str) -> Result<f64, TimecodeError> {
    let invalid = || TimecodeError::InvalidValue {
        component: "seconds",
        value: value.to_string(),
    };

    let (whole, fraction) = match value.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (value, None),
    };
    let digits_only = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !digits_only(whole) || fraction.is_some_and(|f| !digits_only(f)) {
        return Err(invalid());
    }

    let seconds: f64 = value.parse().map_err(|_| invalid())?;
    if seconds >= 60.0 {
        return Err(TimecodeError::OutOfRange {
            component: "seconds",
            value: seconds,
        });
    }
    Ok(seconds)
}

/// Format seconds as `HH:MM:SS`, or `HH:MM:SS.mmm` when there is a fraction.
pub fn format_timecode(total_secs: f64) -> String {
    let total_ms = (total_secs.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let mins = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;

    if millis > 0 {
        format!("{:02}:{:02}:{:02}.{:03}", hours, mins, secs, millis)
    } else {
        format!("{:02}:{:02}:{:02}", hours, mins, secs)
    }
}

/// Seconds between two timecodes. Negative when `end` precedes `start`.
pub fn duration(start: &str, end: &str) -> Result<f64, TimecodeError> {
    Ok(parse_timecode(end)? - parse_timecode(start)?)
}

/// Bounds applied when turning a proposal into a cuttable window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentLimits {
    /// Windows longer than this are shortened to `start + max_segment_secs`.
    pub max_segment_secs: f64,
    /// Duration of the source video, when it could be probed.
    pub source_duration: Option<f64>,
}

impl Default for SegmentLimits {
    fn default() -> Self {
        Self {
            max_segment_secs: DEFAULT_MAX_SEGMENT_SECS,
            source_duration: None,
        }
    }
}

impl SegmentLimits {
    pub fn new(max_segment_secs: f64) -> Self {
        Self {
            max_segment_secs,
            source_duration: None,
        }
    }

    pub fn with_source_duration(mut self, source_duration: Option<f64>) -> Self {
        self.source_duration = source_duration.filter(|d| *d > 0.0);
        self
    }
}

/// A validated `[start, end)` window in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentWindow {
    pub start_secs: f64,
    pub end_secs: f64,
    /// Whether the end was pulled in by the limits.
    pub clamped: bool,
}

impl SegmentWindow {
    pub fn duration(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

/// Validate a proposed start/end pair against the limits.
///
/// Rejects malformed timecodes, non-positive durations, and a start at or
/// past the end of the source. Clamps the end to the source duration and to
/// the maximum segment length.
pub fn validate_window(
    start: &str,
    end: &str,
    limits: &SegmentLimits,
) -> Result<SegmentWindow, TimecodeError> {
    let start_secs = parse_timecode(start)?;
    let mut end_secs = parse_timecode(end)?;

    if end_secs <= start_secs {
        return Err(TimecodeError::StartNotBeforeEnd {
            start: start_secs,
            end: end_secs,
        });
    }

    let mut clamped = false;

    if let Some(source_duration) = limits.source_duration {
        if start_secs >= source_duration {
            return Err(TimecodeError::StartBeyondSource {
                start: start_secs,
                source_duration,
            });
        }
        if end_secs > source_duration {
            end_secs = source_duration;
            clamped = true;
        }
    }

    if limits.max_segment_secs > 0.0 && end_secs - start_secs > limits.max_segment_secs {
        end_secs = start_secs + limits.max_segment_secs;
        clamped = true;
    }

    Ok(SegmentWindow {
        start_secs,
        end_secs,
        clamped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timecode_hh_mm_ss() {
        assert_eq!(parse_timecode("00:00:00").unwrap(), 0.0);
        assert_eq!(parse_timecode("00:01:30").unwrap(), 90.0);
        assert_eq!(parse_timecode("1:00:00").unwrap(), 3600.0);
        assert_eq!(parse_timecode("01:30:45").unwrap(), 5445.0);
    }

    #[test]
    fn test_parse_timecode_mm_ss() {
        assert_eq!(parse_timecode("02:05").unwrap(), 125.0);
        assert_eq!(parse_timecode("90:00").unwrap(), 5400.0);
    }

    #[test]
    fn test_parse_timecode_fractional_seconds() {
        let secs = parse_timecode("00:00:30.500").unwrap();
        assert!((secs - 30.5).abs() < 0.001);
    }

    #[test]
    fn test_parse_timecode_rejects_malformed() {
        assert!(matches!(parse_timecode(""), Err(TimecodeError::Empty)));
        assert!(matches!(parse_timecode("   "), Err(TimecodeError::Empty)));
        assert!(matches!(parse_timecode("90"), Err(TimecodeError::InvalidFormat(_))));
        assert!(matches!(parse_timecode("1:2:3:4"), Err(TimecodeError::InvalidFormat(_))));
        assert!(matches!(parse_timecode("aa:10"), Err(TimecodeError::InvalidValue { .. })));
        assert!(matches!(parse_timecode("00:-1:10"), Err(TimecodeError::InvalidValue { .. })));
        assert!(matches!(parse_timecode("00:10:"), Err(TimecodeError::InvalidValue { .. })));
        assert!(matches!(parse_timecode("00:75:00"), Err(TimecodeError::OutOfRange { .. })));
        assert!(matches!(parse_timecode("00:00:61"), Err(TimecodeError::OutOfRange { .. })));
    }

    #[test]
    fn test_format_timecode() {
        assert_eq!(format_timecode(0.0), "00:00:00");
        assert_eq!(format_timecode(90.0), "00:01:30");
        assert_eq!(format_timecode(3661.0), "01:01:01");
        assert_eq!(format_timecode(30.5), "00:00:30.500");
    }

    #[test]
    fn test_format_parse_round_trip() {
        for tc in ["00:01:30", "02:05", "1:02:03", "10:00:00.250"] {
            let secs = parse_timecode(tc).unwrap();
            let again = parse_timecode(&format_timecode(secs)).unwrap();
            assert!((secs - again).abs() < 0.001, "{tc}");
        }
    }

    #[test]
    fn test_duration() {
        assert_eq!(duration("00:01:00", "00:02:30").unwrap(), 90.0);
        assert_eq!(duration("00:02:00", "00:01:00").unwrap(), -60.0);
        assert!(duration("00:01:00", "soon").is_err());
    }

    #[test]
    fn test_validate_window_accepts_valid_range() {
        let window = validate_window("00:01:00", "00:01:45", &SegmentLimits::default()).unwrap();
        assert_eq!(window.start_secs, 60.0);
        assert_eq!(window.end_secs, 105.0);
        assert_eq!(window.duration(), 45.0);
        assert!(!window.clamped);
    }

    #[test]
    fn test_validate_window_rejects_non_positive_duration() {
        let limits = SegmentLimits::default();
        assert!(matches!(
            validate_window("00:02:00", "00:01:00", &limits),
            Err(TimecodeError::StartNotBeforeEnd { .. })
        ));
        assert!(matches!(
            validate_window("00:01:00", "00:01:00", &limits),
            Err(TimecodeError::StartNotBeforeEnd { .. })
        ));
    }

    #[test]
    fn test_validate_window_clamps_to_source_and_max_length() {
        let limits = SegmentLimits::new(60.0).with_source_duration(Some(100.0));

        let window = validate_window("00:01:00", "00:02:00", &limits).unwrap();
        assert_eq!(window.end_secs, 100.0);
        assert!(window.clamped);

        let window = validate_window("00:00:00", "00:01:30", &limits).unwrap();
        assert_eq!(window.end_secs, 60.0);
        assert!(window.clamped);

        assert!(matches!(
            validate_window("00:01:40", "00:01:50", &limits),
            Err(TimecodeError::StartBeyondSource { .. })
        ));
    }

    #[test]
    fn test_segment_limits_ignore_unknown_source_duration() {
        let limits = SegmentLimits::default().with_source_duration(Some(0.0));
        assert_eq!(limits.source_duration, None);
    }
}
