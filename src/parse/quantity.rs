//! Quantity/unit token recognition.
//!
//! All the regex heuristics that decide whether a piece of text is a
//! quantity live here, behind one tagged result type, so they can be
//! tested without the row-assembly state machine in [`super::grid`].

use super::fold;
use super::number::parse_locale_number;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

/// Outcome of scanning a token for a quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuantityToken {
    /// A quantity, rounded to the nearest integer, with its normalized unit.
    Quantity { quantity: i64, unit: Option<String> },
    /// The text is not a quantity.
    None,
}

impl QuantityToken {
    pub fn is_some(&self) -> bool {
        matches!(self, QuantityToken::Quantity { .. })
    }
}

const LABEL: &str = r"(?:quantidade|quant|qtde|qtd|qde|qnt|qt)";

/// `label? number unit?` over a whole (folded) column.
static RE_QUANTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(?:{LABEL}\.?\s*[:=\-]?\s*)?(\d+(?:[.,]\d+)*)\s*([a-z]{{1,12}}\.?)?$"
    ))
    .unwrap()
});

/// A labelled quantity anywhere in a line; last-resort fallback. Runs on
/// the original text (labels carry no accents) so the span is usable.
static RE_LABELED_ANYWHERE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)(?:^|[^\p{{L}}])({LABEL}\.?\s*[:=\-]?\s*(\d+(?:[.,]\d+)*)(?:\s*(\p{{L}}{{1,12}})\b)?)"
    ))
    .unwrap()
});

/// Suffixes that denote a rating or a duration rather than a counting
/// unit: `550W`, `6mm`, `220V`, `10 anos`.
const RATING_SUFFIXES: &[&str] = &[
    "w", "kw", "mw", "wp", "v", "kv", "a", "ah", "mah", "mm", "cm", "hz", "x", "kg", "g",
    "h", "hs", "horas", "dia", "dias", "mes", "meses", "ano", "anos",
];

/// Map a unit alias to its fixed short code.
pub fn unit_alias(raw: &str) -> Option<&'static str> {
    let key = fold(raw);
    let key = key.trim().trim_end_matches('.');
    let code = match key {
        "un" | "und" | "unid" | "unidade" | "unidades" | "pc" | "pcs" | "peca" | "pecas" => "UN",
        "kit" | "kits" => "KIT",
        "mod" | "modulo" | "modulos" => "MOD",
        "kva" => "kVA",
        "kwp" => "kWp",
        "m" | "mt" | "mts" | "metro" | "metros" => "M",
        "cx" | "caixa" | "caixas" => "CX",
        "pr" | "par" | "pares" => "PR",
        "jg" | "jogo" | "jogos" => "JG",
        "rl" | "rolo" | "rolos" => "RL",
        "cj" | "conj" | "conjunto" | "conjuntos" => "CJ",
        _ => return None,
    };
    Some(code)
}

/// Normalize a unit: known aliases map to their short code, anything else is
/// upper-cased and cut to five characters.
pub fn normalize_unit(raw: &str) -> String {
    if let Some(code) = unit_alias(raw) {
        return code.to_string();
    }
    raw.trim()
        .trim_end_matches('.')
        .to_uppercase()
        .chars()
        .take(5)
        .collect()
}

fn is_rating_suffix(unit: &str) -> bool {
    RATING_SUFFIXES.contains(&unit.trim_end_matches('.'))
}

fn to_quantity(number: &str) -> Option<i64> {
    let value = parse_locale_number(number)?;
    if !value.is_finite() || value.abs() > i64::MAX as f64 {
        return None;
    }
    Some(value.round() as i64)
}

/// Parse a whole column as `label? number unit?`.
///
/// ```rust
/// use budget_digitizer::parse::{parse_quantity_token, QuantityToken};
///
/// assert_eq!(
///     parse_quantity_token("Qtd: 12 un"),
///     QuantityToken::Quantity { quantity: 12, unit: Some("UN".into()) }
/// );
/// assert_eq!(parse_quantity_token("Observações"), QuantityToken::None);
/// ```
pub fn parse_quantity_token(text: &str) -> QuantityToken {
    let folded = fold(text);
    let Some(caps) = RE_QUANTITY.captures(folded.trim()) else {
        return QuantityToken::None;
    };
    let unit = caps.get(2).map(|m| m.as_str());
    if unit.is_some_and(is_rating_suffix) {
        return QuantityToken::None;
    }
    match to_quantity(&caps[1]) {
        Some(quantity) => QuantityToken::Quantity {
            quantity,
            unit: unit.map(normalize_unit),
        },
        None => QuantityToken::None,
    }
}

/// Word-level variant used when a line could not be split into columns.
///
/// Stricter than [`parse_quantity_token`]: an embedded unit must be a known
/// alias, so `550W` or `5kW` inside a product name are never quantities.
pub fn parse_word_quantity(word: &str) -> QuantityToken {
    match parse_quantity_token(word) {
        QuantityToken::Quantity { quantity, unit } => {
            let folded = fold(word);
            let has_alpha_suffix = folded.trim_end_matches('.').ends_with(|c: char| c.is_alphabetic());
            if has_alpha_suffix && !unit.as_deref().is_some_and(is_unit_code) {
                return QuantityToken::None;
            }
            QuantityToken::Quantity { quantity, unit }
        }
        QuantityToken::None => QuantityToken::None,
    }
}

/// Whether `code` is one of the fixed short codes produced by [`unit_alias`].
fn is_unit_code(code: &str) -> bool {
    const CODES: &[&str] = &["UN", "KIT", "MOD", "kVA", "kWp", "M", "CX", "PR", "JG", "RL", "CJ"];
    CODES.contains(&code)
}

/// A labelled quantity found inside a longer line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledQuantity {
    pub token: QuantityToken,
    /// Byte range of the label, number and unit within the line.
    pub span: Range<usize>,
}

/// Search a whole line for a labelled quantity (`... Qtd: 4 un ...`).
///
/// Only known unit aliases are attached; other words after the number stay
/// outside the span.
pub fn find_labeled_quantity(line: &str) -> Option<LabeledQuantity> {
    let caps = RE_LABELED_ANYWHERE.captures(line)?;
    let whole = caps.get(1)?;
    let quantity = to_quantity(&caps[2])?;
    let number_end = caps.get(2)?.end();

    let (unit, end) = match caps.get(3) {
        Some(u) if !is_rating_suffix(&fold(u.as_str())) => match unit_alias(u.as_str()) {
            Some(code) => (Some(code.to_string()), whole.end()),
            None => (None, number_end),
        },
        _ => (None, number_end),
    };

    Some(LabeledQuantity {
        token: QuantityToken::Quantity { quantity, unit },
        span: whole.start()..end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qty(quantity: i64, unit: Option<&str>) -> QuantityToken {
        QuantityToken::Quantity {
            quantity,
            unit: unit.map(str::to_string),
        }
    }

    #[test]
    fn labelled_with_unit() {
        assert_eq!(parse_quantity_token("Qtd: 12 un"), qty(12, Some("UN")));
        assert_eq!(parse_quantity_token("Quantidade: 8"), qty(8, None));
        assert_eq!(parse_quantity_token("QTDE 3 peças"), qty(3, Some("UN")));
    }

    #[test]
    fn bare_numbers_and_units() {
        assert_eq!(parse_quantity_token("4"), qty(4, None));
        assert_eq!(parse_quantity_token("2 kits"), qty(2, Some("KIT")));
        assert_eq!(parse_quantity_token("10 Módulos"), qty(10, Some("MOD")));
        assert_eq!(parse_quantity_token("1 kWp"), qty(1, Some("kWp")));
        assert_eq!(parse_quantity_token("5 rolinhos"), qty(5, Some("ROLIN")));
    }

    #[test]
    fn rounds_to_nearest_integer() {
        assert_eq!(parse_quantity_token("2,6"), qty(3, None));
        assert_eq!(parse_quantity_token("1.000"), qty(1000, None));
    }

    #[test]
    fn text_is_not_a_quantity() {
        assert_eq!(parse_quantity_token("Observações"), QuantityToken::None);
        assert_eq!(parse_quantity_token("Módulo Solar 550W"), QuantityToken::None);
        assert_eq!(parse_quantity_token(""), QuantityToken::None);
    }

    #[test]
    fn ratings_are_not_quantities() {
        assert_eq!(parse_quantity_token("550W"), QuantityToken::None);
        assert_eq!(parse_quantity_token("6 mm"), QuantityToken::None);
        assert_eq!(parse_quantity_token("220V"), QuantityToken::None);
    }

    #[test]
    fn word_mode_requires_known_units() {
        assert_eq!(parse_word_quantity("5kW"), QuantityToken::None);
        assert_eq!(parse_word_quantity("3pcs"), qty(3, Some("UN")));
        assert_eq!(parse_word_quantity("7"), qty(7, None));
        assert_eq!(parse_word_quantity("8rolinhos"), QuantityToken::None);
    }

    #[test]
    fn labelled_anywhere_in_line() {
        let line = "Estrutura de fixação telhado Qtd: 4 un garantia";
        let found = find_labeled_quantity(line).unwrap();
        assert_eq!(found.token, qty(4, Some("UN")));
        assert_eq!(&line[found.span], "Qtd: 4 un");

        let line = "Cabo preto QUANTIDADE 20 rolinhos";
        let found = find_labeled_quantity(line).unwrap();
        assert_eq!(found.token, qty(20, None));
        assert_eq!(&line[found.span], "QUANTIDADE 20");

        assert_eq!(find_labeled_quantity("Inversor 5kW 220V"), None);
    }

    #[test]
    fn unit_normalization() {
        assert_eq!(normalize_unit("Unidade"), "UN");
        assert_eq!(normalize_unit("peças"), "UN");
        assert_eq!(normalize_unit("KITS"), "KIT");
        assert_eq!(normalize_unit("kva"), "kVA");
        assert_eq!(normalize_unit("galoes"), "GALOE");
    }
}
