use std::collections::BTreeSet;

/// Survey answers that mean "nothing here". Compared case-insensitively after trimming.
const NULL_LIKE: &[&str] = &["", "n", "no", "np", "noo", "nm", "none", "null"];
const AFFIRMATIVE: &[&str] = &["yes", "y", "true", "1"];
const NEGATIVE_EXTRA: &[&str] = &["false", "0"];

pub fn is_null_like(value: &str) -> bool {
    let value = value.trim();
    NULL_LIKE.iter().any(|n| value.eq_ignore_ascii_case(n))
}

pub fn is_affirmative(value: &str) -> bool {
    let value = value.trim();
    AFFIRMATIVE.iter().any(|a| value.eq_ignore_ascii_case(a))
}

/// Interprets a Yes/No style cell. `None` means the value is neither.
pub fn parse_flag(value: &str) -> Option<bool> {
    if is_affirmative(value) {
        Some(true)
    } else if is_null_like(value)
        || NEGATIVE_EXTRA
            .iter()
            .any(|n| value.trim().eq_ignore_ascii_case(n))
    {
        Some(false)
    } else {
        None
    }
}

/// Splits a multi-value cell into a tag set, dropping blank and null-like pieces.
pub fn split_tags(value: &str, delimiter: char) -> BTreeSet<String> {
    value
        .split(delimiter)
        .map(str::trim)
        .filter(|piece| !is_null_like(piece))
        .map(str::to_string)
        .collect()
}

/// Header cleanup: BOM, non-breaking spaces, outer whitespace.
pub fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .replace('\u{a0}', " ")
        .trim()
        .to_string()
}
