/// Normalize a locally formatted phone number to E.164.
///
/// Separators (spaces, hyphens, dots, parentheses) are removed first. A
/// number already starting with `+` is kept; a leading trunk `0` is
/// replaced by `country_code`. Anything else is returned as-is after a
/// warning so the dispatch can still be attempted.
pub fn normalize_phone_number(raw: &str, country_code: &str) -> String {
    let compact: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();

    if compact.starts_with('+') {
        return compact;
    }
    if let Some(rest) = compact.strip_prefix('0') {
        if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
            return format!("{country_code}{rest}");
        }
    }

    tracing::warn!(phone = %raw, "unrecognized phone number format, sending unchanged");
    compact
}
