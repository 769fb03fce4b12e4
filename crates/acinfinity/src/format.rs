/// Shown in place of any value that cannot be displayed.
pub const PLACEHOLDER: &str = "--";

const SENTINELS: &[&str] = &["", "N/A", "unavailable", "unknown"];

/// Parse the longest numeric prefix of `text`, the way a browser's
/// `parseFloat` does (`"72.4 °F"` reads as `72.4`).
#[must_use]
pub fn parse_numeric(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;
    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }

    text[..end].parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Format a raw entity state for display.
///
/// Sentinels and non-numeric input become [`PLACEHOLDER`]. Numbers are
/// rounded half-up to an integer when `decimals` is 0. Otherwise they are
/// fixed to `decimals` places, with ties rounded away from zero.
#[must_use]
pub fn format_value(raw: Option<&str>, decimals: usize) -> String {
    let Some(raw) = raw.filter(|raw| !SENTINELS.contains(&raw.trim())) else {
        return PLACEHOLDER.to_string();
    };
    let Some(value) = parse_numeric(raw) else {
        return PLACEHOLDER.to_string();
    };

    if decimals == 0 {
        let rounded = (value + 0.5).floor();
        // avoid printing "-0"
        let rounded = if rounded == 0.0 { 0.0 } else { rounded };
        format!("{rounded:.0}")
    } else {
        // `{:.N}` rounds the binary value, which turns 1.25 into "1.2"
        let factor = 10f64.powi(i32::try_from(decimals).unwrap_or(i32::MAX));
        let scaled = value * factor;
        let rounded = if scaled.is_finite() {
            scaled.round() / factor
        } else {
            value
        };
        format!("{rounded:.decimals$}")
    }
}
