/// Clamp a requested seek position against a media duration.
///
/// Negative and NaN requests land on zero. When the duration is not a finite
/// positive number the (non-negative) request is used as-is.
pub fn clamp_seek_time(time: f64, duration: f64) -> f64 {
    let time = if time.is_nan() { 0.0 } else { time.max(0.0) };
    if duration.is_finite() && duration > 0.0 {
        time.min(duration)
    } else if time.is_finite() {
        time
    } else {
        0.0
    }
}

/// Normalize a marker time: finite and non-negative.
pub fn sanitize_marker_time(time: f64) -> f64 {
    if time.is_finite() {
        time.max(0.0)
    } else {
        0.0
    }
}

/// Format seconds as `MM:SS.mmm`, or `H:MM:SS.mmm` past the hour.
pub fn format_timecode(seconds: f64) -> String {
    let total_ms = (sanitize_marker_time(seconds) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = total_secs / 3600;
    if hours > 0 {
        format!("{}:{:02}:{:02}.{:03}", hours, mins, secs, ms)
    } else {
        format!("{:02}:{:02}.{:03}", mins, secs, ms)
    }
}

pub fn normalize_label(label: Option<String>) -> Option<String> {
    label
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
