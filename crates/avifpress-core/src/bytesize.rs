//! Human-readable byte formatting for API responses.

const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Format a byte count the way the batch summary reports sizes
/// (e.g. `345.2 KB`, `1.5 MB`). Two decimals, trailing zeros trimmed.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let exponent = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exponent as i32);

    let mut formatted = format!("{:.2}", value);
    if formatted.contains('.') {
        formatted = formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string();
    }

    format!("{} {}", formatted, UNITS[exponent])
}
