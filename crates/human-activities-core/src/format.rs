use crate::config::Unit;

const BYTE_UNITS: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];

pub const PENDING_TEXT: &str = "…";
pub const UNKNOWN_TEXT: &str = "n/a";

/// Human readable size in 1024 steps, one decimal above plain bytes.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, BYTE_UNITS[unit])
}

pub fn format_count(count: u64) -> String {
    if count == 1 {
        "1 file".to_string()
    } else {
        format!("{} files", count)
    }
}

pub fn format_value(value: u64, unit: Unit) -> String {
    match unit {
        Unit::SizeBytes => format_bytes(value),
        Unit::NumFiles => format_count(value),
    }
}

pub fn format_percent(fraction: f64) -> String {
    format!("{:.0}%", fraction * 100.0)
}
