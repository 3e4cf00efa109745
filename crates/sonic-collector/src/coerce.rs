//! Conversion of raw hash fields into sample values.
//!
//! Coercion is lossy: a field that is absent or malformed yields
//! `None` and the caller drops that one sample instead of failing the scrape.

/// Parses a numeric field. Surrounding whitespace is ignored; anything else
/// that is not a valid float (including `N/A`) is rejected.
pub fn coerce_f64(raw: Option<&str>) -> Option<f64> {
    raw?.trim().parse::<f64>().ok()
}

/// Boolean flags are `1.0` only for a case-insensitive `"true"`, with no
/// surrounding whitespace.
pub fn coerce_flag(raw: Option<&str>) -> f64 {
    match raw {
        Some(value) if value.eq_ignore_ascii_case("true") => 1.0,
        _ => 0.0,
    }
}

/// Port status fields are `1.0` only for a case-insensitive `"up"`.
pub fn coerce_oper_status(raw: Option<&str>) -> f64 {
    match raw {
        Some(value) if value.eq_ignore_ascii_case("up") => 1.0,
        _ => 0.0,
    }
}
