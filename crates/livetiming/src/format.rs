//! Display rendering for timing fields.

/// Placeholder for a lap with no recorded time.
pub const NO_LAP_TIME: &str = "--:--.---";
/// Placeholder for a missing sector time.
pub const NO_SECTOR_TIME: &str = "---.---";
/// Placeholder for missing gap/interval data.
pub const NO_GAP: &str = "--";

/// Render a lap duration as `m:ss.mmm`.
///
/// Rounded to whole milliseconds before the minute split, so a value
/// just under a minute boundary carries into the next minute instead
/// of rendering a sixtieth second.
pub fn format_lap_time(seconds: Option<f64>) -> String {
    match seconds {
        Some(s) if s > 0.0 => {
            let millis = (s * 1000.0).round() as u64;
            format!(
                "{}:{:02}.{:03}",
                millis / 60_000,
                (millis % 60_000) / 1000,
                millis % 1000
            )
        }
        _ => NO_LAP_TIME.to_string(),
    }
}

/// Render a sector duration to three decimal places.
pub fn format_sector_time(seconds: Option<f64>) -> String {
    match seconds {
        Some(s) if s > 0.0 => format!("{:.3}", s),
        _ => NO_SECTOR_TIME.to_string(),
    }
}

/// Render a gap or interval: `+s.mmm` under a minute, `+m:ss.mmm`
/// from a minute up. Zero means the upstream sent no usable gap (the
/// leader convention is the caller's concern).
pub fn format_gap(gap: Option<f64>) -> String {
    match gap {
        Some(g) if g > 0.0 => {
            // Millisecond rounding first, then branch, so 59.9995
            // renders as +1:00.000 rather than +60.000.
            let millis = (g * 1000.0).round() as u64;
            if millis < 60_000 {
                format!("+{}.{:03}", millis / 1000, millis % 1000)
            } else {
                format!(
                    "+{}:{:02}.{:03}",
                    millis / 60_000,
                    (millis % 60_000) / 1000,
                    millis % 1000
                )
            }
        }
        _ => NO_GAP.to_string(),
    }
}

/// Tyre age in laps, clamped so a lap number before the stint start
/// never goes negative.
pub fn tyre_age(current_lap: u32, stint_start: u32, age_at_start: u32) -> u32 {
    (current_lap as i64 - stint_start as i64 + age_at_start as i64).max(0) as u32
}
