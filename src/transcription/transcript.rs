use anyhow::{anyhow, Result};

use super::Segment;

/// Format seconds as a subtitle timestamp (HH:MM:SS,mmm)
///
/// Hours widen past two digits only when the duration requires it. The
/// millisecond part is truncated, not rounded.
pub fn format_timestamp(seconds: f64) -> String {
    let millis = ((seconds - seconds.floor()) * 1000.0) as u64;
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Render segments into newline-joined `[start --> end] text` lines
pub fn render_transcript(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| {
            format!(
                "[{} --> {}] {}",
                format_timestamp(segment.start),
                format_timestamp(segment.end),
                segment.text.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a subtitle timestamp (HH:MM:SS,mmm) into seconds
///
/// whisper.cpp JSON output carries segment times in this form.
pub fn parse_timestamp(timestamp: &str) -> Result<f64> {
    let parts: Vec<&str> = timestamp.split(',').collect();
    if parts.len() != 2 {
        return Err(anyhow!("Invalid timestamp format: {}", timestamp));
    }

    let millis: f64 = parts[1].parse::<f64>()? / 1000.0;

    let time_components: Vec<&str> = parts[0].split(':').collect();
    if time_components.len() != 3 {
        return Err(anyhow!("Invalid time format: {}", parts[0]));
    }

    let hours: f64 = time_components[0].parse()?;
    let minutes: f64 = time_components[1].parse()?;
    let seconds: f64 = time_components[2].parse()?;

    Ok(hours * 3600.0 + minutes * 60.0 + seconds + millis)
}
