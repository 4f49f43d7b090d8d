//! Locale-aware number parsing for Brazilian budget documents.
//!
//! Handles formats like:
//! - `"12"` → 12
//! - `"23.580,00"` / `"R$ 23.580,00"` → 23580.0 (pt-BR)
//! - `"1,234.56"` → 1234.56 (en-US)
//! - `"1,5"` → 1.5
//! - `"1.234"` → 1234 (a single dot followed by exactly three digits is a
//!   thousands separator in pt-BR)
//!
//! When both `.` and `,` are present the right-most one is the decimal
//! separator.

/// Parse a region-formatted numeric or currency token.
///
/// Returns `None` for anything that does not reduce to a finite number.
pub fn parse_locale_number(input: &str) -> Option<f64> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    // Strip currency markers and inner spaces: "R$ 1 234,00" → "1234,00".
    let mut cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{00A0}')
        .collect();
    for prefix in ["R$", "r$", "BRL", "brl", "$"] {
        if let Some(rest) = cleaned.strip_prefix(prefix) {
            cleaned = rest.to_string();
        }
    }

    let negative = cleaned.starts_with('-');
    let body = cleaned.trim_start_matches(['-', '+']);
    if body.is_empty() || !body.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return None;
    }
    if !body.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return None;
    }

    let canonical = canonicalise(body)?;
    let value: f64 = canonical.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// Rewrite `body` (digits plus `.`/`,`) into a `str::parse`-able form.
fn canonicalise(body: &str) -> Option<String> {
    let last_dot = body.rfind('.');
    let last_comma = body.rfind(',');

    match (last_dot, last_comma) {
        (None, None) => Some(body.to_string()),
        (Some(d), Some(c)) => {
            let (decimal, thousands) = if c > d { (',', '.') } else { ('.', ',') };
            let (int_part, frac_part) = body.split_at(d.max(c));
            let frac = &frac_part[1..];
            if frac.contains(decimal) || frac.contains(thousands) {
                return None;
            }
            let int: String = int_part.chars().filter(|ch| *ch != thousands).collect();
            if int.contains(decimal) || int.is_empty() {
                return None;
            }
            Some(format!("{int}.{frac}"))
        }
        (Some(_), None) => single_separator(body, '.'),
        (None, Some(_)) => single_separator(body, ','),
    }
}

/// Only one kind of separator present.
///
/// Repeated separators are thousands groups; a single `.` followed by
/// exactly three digits is a pt-BR thousands group; a single `,` is always
/// decimal (pt-BR).
fn single_separator(body: &str, sep: char) -> Option<String> {
    let count = body.matches(sep).count();
    if count > 1 {
        let groups: Vec<&str> = body.split(sep).collect();
        if groups[1..].iter().all(|g| g.len() == 3) && !groups[0].is_empty() {
            return Some(groups.concat());
        }
        return None;
    }
    let (int, frac) = body.split_once(sep)?;
    if int.is_empty() {
        return None;
    }
    if sep == '.' && frac.len() == 3 {
        return Some(format!("{int}{frac}"));
    }
    if frac.is_empty() {
        return Some(int.to_string());
    }
    Some(format!("{int}.{frac}"))
}
