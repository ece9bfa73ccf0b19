//! Small formatting helpers shared by front ends.

/// Format a duration in seconds as `mm:ss`, rounded to the nearest second.
///
/// Minutes are not wrapped into hours, so a 75 minute track reads `75:00`.
/// Negative or non-finite input formats as `00:00`.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}
