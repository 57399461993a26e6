//! Utility functions and helpers

const COMPACT_UNITS: [(f64, &str); 5] = [(1.0, ""), (1e3, "K"), (1e6, "M"), (1e9, "B"), (1e12, "T")];

/// Short compact notation: 950, 1.2K, 3.4M, 5B, 1.1T
///
/// The unit is picked after rounding, so 999_950 reads "1M", not "1000K".
pub fn format_compact(value: f64, max_fraction_digits: usize) -> String {
    let magnitude = round_to(value.abs(), max_fraction_digits);
    let mut unit = COMPACT_UNITS
        .iter()
        .rposition(|(scale, _)| magnitude >= *scale)
        .unwrap_or(0);
    let mut scaled = round_to(magnitude / COMPACT_UNITS[unit].0, max_fraction_digits);
    if scaled >= 1000.0 && unit + 1 < COMPACT_UNITS.len() {
        unit += 1;
        scaled = round_to(magnitude / COMPACT_UNITS[unit].0, max_fraction_digits);
    }

    let signed = if value < 0.0 { -scaled } else { scaled };
    format!(
        "{}{}",
        trim_fraction(signed, max_fraction_digits),
        COMPACT_UNITS[unit].1
    )
}

fn round_to(value: f64, digits: usize) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

fn trim_fraction(value: f64, max_fraction_digits: usize) -> String {
    let s = format!("{:.*}", max_fraction_digits, value);
    let s = if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    };
    if s == "-0" {
        "0".to_string()
    } else {
        s
    }
}
