//! Canonical grid parser: turns the loose lines of a budget into item rows.
//!
//! The parser is a single forward pass over the item section:
//!
//! 1. The section starts after the first header-like line (product and
//!    quantity keywords, no parseable quantity) and stops at the first
//!    total trigger.
//! 2. Blank lines are skipped; noise lines (contacts, addresses, payment
//!    terms, repeated headers) are counted and skipped.
//! 3. Each remaining line is split into columns, money columns become
//!    prices, and a quantity is searched from the right-most column.
//! 4. A line without a quantity is held as *pending*: it may become the
//!    product of the next quantity-only line, or else a continuation of the
//!    open row's description.
//!
//! The result depends only on the input lines, so parsing the same text
//! twice yields an identical grid.

use super::fold;
use super::number::parse_locale_number;
use super::quantity::{
    find_labeled_quantity, parse_quantity_token, parse_word_quantity, unit_alias, QuantityToken,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

/// Descriptions are cut to this many characters.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Minimum number of letters/digits in a product name.
const MIN_PRODUCT_CHARS: usize = 5;

/// Bare-number quantities inside a single free-text column are only trusted
/// up to this value; bigger trailing numbers are model names (`MIN 5000`).
const MAX_WORD_QUANTITY: i64 = 999;

/// One accepted item row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRow {
    pub product: String,
    pub description: Option<String>,
    /// Always positive for rows produced by [`parse_canonical_grid`].
    pub quantity: Option<i64>,
    pub unit: Option<String>,
    pub code: Option<String>,
    pub unit_price: Option<f64>,
    pub total_price: Option<f64>,
    /// Source lines merged into this row, in order.
    pub source_lines: Vec<String>,
}

/// Output of [`parse_canonical_grid`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalGrid {
    pub rows: Vec<CanonicalRow>,
    /// Lines dropped because they matched a noise pattern.
    pub ignored_by_noise: usize,
    /// Quantity lines rejected because the product or quantity was invalid.
    pub ignored_by_validation: usize,
}

static RE_HEADER_PRODUCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:produtos?|itens|item|descricao)\b").unwrap());

static RE_HEADER_QUANTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:quantidade|quant|qtde?|qde|qnt)\b").unwrap());

/// Total triggers, matched against the folded line with leading
/// punctuation removed.
static RE_TOTAL_TRIGGER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:valor\s+total|total\s+geral|total\s+(?:do|da)\s+(?:orcamento|proposta|pedido)|total\s+a\s+pagar|total\s*(?::|r\$|-?\d|$))",
    )
    .unwrap()
});

static RE_NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)\b(?:
            telefone|tel|fone|fax|celular|whats\s?app|e-?mail|site
          | cnpj|cpf|inscricao\s+estadual
          | endereco|rua|avenida|rodovia|cep|bairro|cidade
          | assinatura|assinado|atenciosamente|vendedor|consultor
          | pagamento|boleto|pix|parcelas?|parcelamento|financiamento
          | agencia|conta\s+corrente|dados\s+bancarios
          | condicoes\s+gerais|observacoes\s+gerais|clausula
          | pagina\s+\d+
        )\b",
    )
    .unwrap()
});

/// Noise words that are also common in product names (`Banco de baterias`,
/// `2 entradas MPPT`); they only count when followed by a field separator.
static RE_NOISE_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:banco|entrada|ie|av)\s*[:.]|\bentrada\s+de\s+(?:r\$|\d)").unwrap()
});

/// Terms that disqualify a product name.
const FORBIDDEN_PRODUCT_TERMS: &[&str] = &[
    "resumo",
    "servicos",
    "pagamento",
    "cliente",
    "comercial",
    "condicao",
    "condicoes",
];

/// Column texts that are header labels, never products.
const HEADER_KEYWORDS: &[&str] = &[
    "produto",
    "produtos",
    "item",
    "itens",
    "descricao",
    "quantidade",
    "qtd",
    "qtde",
    "unidade",
    "valor",
    "valor unitario",
    "valor total",
    "preco",
    "total",
];

static RE_MONEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:r\$\s*-?[\d.,]*\d|-?\d{1,3}(?:\.\d{3})*,\d{2}|-?\d+,\d{2}|-?\d{1,3}(?:,\d{3})*\.\d{2}|-?\d+\.\d{2})$",
    )
    .unwrap()
});

static RE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9\-./]{3,}$").unwrap());

static RE_COLUMN_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Whether a line looks like a table header (`Produto  Quantidade`).
///
/// Digits are allowed (`Potência 550W`) as long as no column or label
/// actually reads as a quantity.
pub fn is_header_line(line: &str) -> bool {
    let folded = fold(line);
    RE_HEADER_PRODUCT.is_match(&folded)
        && RE_HEADER_QUANTITY.is_match(&folded)
        && !carries_quantity(line)
}

fn carries_quantity(line: &str) -> bool {
    split_columns(line)
        .iter()
        .any(|c| parse_quantity_token(c).is_some())
        || find_labeled_quantity(line).is_some()
}

/// Whether a line starts with a total trigger (`Valor total: ...`).
pub fn is_total_trigger(line: &str) -> bool {
    let folded = fold(line);
    let head = folded.trim_start_matches(|c: char| !c.is_alphanumeric());
    RE_TOTAL_TRIGGER.is_match(head)
}

/// Whether a line is contact, address, payment or signature boilerplate.
pub fn is_noise_line(line: &str) -> bool {
    let folded = fold(line);
    folded.contains('@')
        || folded.contains("www.")
        || folded.contains("http")
        || RE_NOISE.is_match(&folded)
        || RE_NOISE_LABEL.is_match(&folded)
}

/// Split a line into columns.
///
/// Separators in priority order: `|`, tab, `;`, runs of two or more
/// whitespace characters. Empty cells are dropped.
pub fn split_columns(line: &str) -> Vec<String> {
    fn cells<'a>(parts: impl Iterator<Item = &'a str>) -> Vec<String> {
        parts
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }

    if line.contains('|') {
        return cells(line.split('|'));
    }
    if line.contains('\t') {
        return cells(line.split('\t'));
    }
    if line.contains(';') {
        let parts = cells(line.split(';'));
        if parts.len() > 1 {
            return parts;
        }
    }
    let parts = cells(RE_COLUMN_GAP.split(line));
    if parts.len() > 1 {
        return parts;
    }
    cells(std::iter::once(line))
}

/// Parse the lines of a budget into a [`CanonicalGrid`].
pub fn parse_canonical_grid<S: AsRef<str>>(lines: &[S]) -> CanonicalGrid {
    let start = lines
        .iter()
        .position(|l| is_header_line(l.as_ref()))
        .map(|i| i + 1)
        .unwrap_or(0);
    let end = lines[start..]
        .iter()
        .position(|l| is_total_trigger(l.as_ref()))
        .map(|i| start + i)
        .unwrap_or(lines.len());

    debug!(start, end, total = lines.len(), "Grid section bounds");

    let mut builder = GridBuilder::default();
    for line in &lines[start..end] {
        builder.push_line(line.as_ref());
    }
    builder.finish()
}

/// Prices pulled out of a line's money columns.
#[derive(Debug, Default, Clone, Copy)]
struct Prices {
    unit: Option<f64>,
    total: Option<f64>,
}

/// Remove money columns; one money column is the total, two or more are
/// read as `... unit total`.
///
/// A bare decimal cell (`10,00`) stays a quantity candidate when a unit
/// column follows it, or when it is the first of three or more money-like
/// cells (`qty | unit price | total`).
fn take_prices(columns: Vec<String>) -> (Vec<String>, Prices) {
    let mut parsed: Vec<Option<f64>> = columns.iter().map(|c| money_value(c)).collect();

    for i in 0..columns.len() {
        if parsed[i].is_some()
            && !has_currency(&columns[i])
            && columns.get(i + 1).is_some_and(|c| unit_alias(c).is_some())
        {
            parsed[i] = None;
        }
    }
    let money_cells: Vec<usize> = (0..columns.len()).filter(|&i| parsed[i].is_some()).collect();
    if let [first, _, _, ..] = money_cells.as_slice() {
        if !has_currency(&columns[*first]) {
            parsed[*first] = None;
        }
    }

    let mut money = Vec::new();
    let mut rest = Vec::with_capacity(columns.len());
    for (col, value) in columns.into_iter().zip(parsed) {
        match value {
            Some(value) => money.push(value),
            None => rest.push(col),
        }
    }
    let prices = match money.as_slice() {
        [] => Prices::default(),
        [total] => Prices {
            unit: None,
            total: Some(*total),
        },
        [.., unit, total] => Prices {
            unit: Some(*unit),
            total: Some(*total),
        },
    };
    (rest, prices)
}

fn money_value(col: &str) -> Option<f64> {
    let folded = fold(col);
    if !RE_MONEY.is_match(folded.trim()) {
        return None;
    }
    parse_locale_number(col)
}

fn has_currency(col: &str) -> bool {
    fold(col).trim_start().starts_with("r$")
}

/// A quantity located in a line, with the columns left over for the
/// product and description.
struct Located {
    quantity: i64,
    unit: Option<String>,
    remaining: Vec<String>,
}

fn locate_quantity(columns: &[String], line: &str) -> Option<Located> {
    // Right-most column first: quantities sit after the product.
    for i in (0..columns.len()).rev() {
        if let QuantityToken::Quantity { quantity, mut unit } = parse_quantity_token(&columns[i]) {
            let mut consumed = vec![i];
            if unit.is_none() {
                if let Some(code) = columns.get(i + 1).and_then(|c| unit_alias(c)) {
                    unit = Some(code.to_string());
                    consumed.push(i + 1);
                }
            }
            let remaining = columns
                .iter()
                .enumerate()
                .filter(|(j, _)| !consumed.contains(j))
                .map(|(_, c)| c.clone())
                .collect();
            return Some(Located {
                quantity,
                unit,
                remaining,
            });
        }
    }

    if let [single] = columns {
        if let Some(found) = locate_in_words(single) {
            return Some(found);
        }
    }

    let found = find_labeled_quantity(line)?;
    let QuantityToken::Quantity { quantity, unit } = found.token else {
        return None;
    };
    let remaining = [&line[..found.span.start], &line[found.span.end..]]
        .into_iter()
        .map(|s| s.trim().trim_matches(|c: char| c == '-' || c == ':').trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    Some(Located {
        quantity,
        unit,
        remaining,
    })
}

/// Word-level fallback for an unsplittable line: the quantity must be the
/// last word (`Kit fixação 4un`) or a number followed by a unit alias
/// (`Cabo solar 100 m`).
fn locate_in_words(text: &str) -> Option<Located> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() < 2 {
        return None;
    }
    let n = words.len();

    let (quantity, unit, taken) = match parse_word_quantity(words[n - 1]) {
        QuantityToken::Quantity { quantity, unit } => (quantity, unit, 1),
        QuantityToken::None => {
            let code = unit_alias(words[n - 1])?;
            match parse_word_quantity(words[n - 2]) {
                QuantityToken::Quantity {
                    quantity,
                    unit: None,
                } if n > 2 => (quantity, Some(code.to_string()), 2),
                _ => return None,
            }
        }
    };
    if unit.is_none() && quantity > MAX_WORD_QUANTITY {
        return None;
    }

    Some(Located {
        quantity,
        unit,
        remaining: vec![words[..n - taken].join(" ")],
    })
}

fn alnum_count(s: &str) -> usize {
    s.chars().filter(|c| c.is_alphanumeric()).count()
}

/// Product name checks shared by column candidates and pending lines.
fn is_valid_product(name: &str) -> bool {
    let trimmed = name.trim();
    if alnum_count(trimmed) < MIN_PRODUCT_CHARS {
        return false;
    }
    let folded = fold(trimmed);
    let bare = folded.trim_end_matches([':', '.']).trim();
    if HEADER_KEYWORDS.contains(&bare) {
        return false;
    }
    if FORBIDDEN_PRODUCT_TERMS.iter().any(|t| folded.contains(t)) {
        return false;
    }
    !is_noise_line(trimmed)
}

fn is_code(col: &str) -> bool {
    RE_CODE.is_match(col) && col.chars().any(|c| c.is_ascii_digit())
}

/// Product, description parts and code chosen from the leftover columns.
struct Candidate {
    product: Option<String>,
    description: Vec<String>,
    code: Option<String>,
}

fn choose_product(columns: &[String]) -> Candidate {
    let mut product_idx: Option<usize> = None;
    for (i, col) in columns.iter().enumerate() {
        if !col.chars().any(char::is_alphabetic) {
            continue;
        }
        let longer = match product_idx {
            Some(p) => col.chars().count() > columns[p].chars().count(),
            None => true,
        };
        if longer {
            product_idx = Some(i);
        }
    }

    let mut code = None;
    let mut description = Vec::new();
    for (i, col) in columns.iter().enumerate() {
        if Some(i) == product_idx {
            continue;
        }
        if code.is_none() && is_code(col) {
            code = Some(col.clone());
        } else if col.chars().any(char::is_alphabetic) {
            description.push(col.clone());
        }
    }

    Candidate {
        product: product_idx.map(|i| columns[i].clone()),
        description,
        code,
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].trim_end().to_string(),
        None => s.to_string(),
    }
}

fn join_description(parts: &[String]) -> Option<String> {
    let joined = parts.join(" ");
    let joined = joined.trim();
    (!joined.is_empty()).then(|| truncate_chars(joined, MAX_DESCRIPTION_CHARS))
}

/// A quantity-less line waiting to be claimed.
struct Pending {
    text: String,
    raw: String,
}

#[derive(Default)]
struct GridBuilder {
    rows: Vec<CanonicalRow>,
    /// Row that continuation lines attach to.
    open: Option<usize>,
    pending: Option<Pending>,
    ignored_by_noise: usize,
    ignored_by_validation: usize,
}

impl GridBuilder {
    fn push_line(&mut self, raw: &str) {
        let line = raw.trim();
        if line.is_empty() {
            return;
        }
        if is_noise_line(line) || is_header_line(line) {
            self.ignored_by_noise += 1;
            return;
        }

        let (columns, prices) = take_prices(split_columns(line));
        let Some(located) = locate_quantity(&columns, line) else {
            let text = columns.join(" ");
            if !text.trim().is_empty() {
                self.flush_pending();
                self.pending = Some(Pending {
                    text,
                    raw: line.to_string(),
                });
            }
            return;
        };

        if located.quantity <= 0 {
            self.reject(line, "non-positive quantity");
            return;
        }

        let candidate = choose_product(&located.remaining);
        let own_product = candidate.product.as_deref().filter(|p| is_valid_product(p));

        let (product, mut description, mut source_lines) = match own_product {
            Some(product) => {
                self.flush_pending();
                (
                    product.to_string(),
                    candidate.description.clone(),
                    Vec::new(),
                )
            }
            None => match self.pending.take() {
                Some(pending) if is_valid_product(&pending.text) => {
                    // The line's own leftover text describes the pending product.
                    let mut description = Vec::new();
                    description.extend(candidate.product.clone());
                    description.extend(candidate.description.iter().cloned());
                    (pending.text, description, vec![pending.raw])
                }
                pending => {
                    self.pending = pending;
                    self.reject(line, "missing or invalid product");
                    return;
                }
            },
        };

        description.retain(|d| !d.trim().is_empty());
        source_lines.push(line.to_string());

        self.rows.push(CanonicalRow {
            product: truncate_chars(product.trim(), MAX_DESCRIPTION_CHARS),
            description: join_description(&description),
            quantity: Some(located.quantity),
            unit: located.unit,
            code: candidate.code,
            unit_price: prices.unit,
            total_price: prices.total,
            source_lines,
        });
        self.open = Some(self.rows.len() - 1);
    }

    fn reject(&mut self, line: &str, reason: &str) {
        debug!(line, reason, "Rejected grid line");
        self.flush_pending();
        self.ignored_by_validation += 1;
        self.open = None;
    }

    /// Attach the pending line to the open row, or drop it.
    fn flush_pending(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let Some(row) = self.open.and_then(|i| self.rows.get_mut(i)) else {
            return;
        };
        let merged = match row.description.take() {
            Some(existing) => format!("{existing} {}", pending.text),
            None => pending.text,
        };
        row.description = Some(truncate_chars(merged.trim(), MAX_DESCRIPTION_CHARS));
        row.source_lines.push(pending.raw);
    }

    fn finish(mut self) -> CanonicalGrid {
        self.flush_pending();
        CanonicalGrid {
            rows: self.rows,
            ignored_by_noise: self.ignored_by_noise,
            ignored_by_validation: self.ignored_by_validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn products(grid: &CanonicalGrid) -> Vec<&str> {
        grid.rows.iter().map(|r| r.product.as_str()).collect()
    }

    #[test]
    fn product_and_quantity_on_separate_lines() {
        let lines = [
            "Produto Quantidade",
            "Módulo Solar 550W",
            "Quantidade: 8",
            "Inversor Solar 5kW",
            "Quantidade: 1",
            "Valor total: R$ 23.580,00",
        ];
        let grid = parse_canonical_grid(&lines);
        assert_eq!(products(&grid), vec!["Módulo Solar 550W", "Inversor Solar 5kW"]);
        assert_eq!(grid.rows[0].quantity, Some(8));
        assert_eq!(grid.rows[1].quantity, Some(1));
        assert_eq!(grid.rows[0].source_lines.len(), 2);
        assert_eq!(grid.ignored_by_validation, 0);
    }

    #[test]
    fn pipe_table_with_prices() {
        let lines = [
            "Item | Produto | Código | Qtd | Un | Valor Unit. | Valor Total",
            "1 | Módulo Fotovoltaico 550W Monocristalino | CS3W-550MS | 10 | un | R$ 900,00 | R$ 9.000,00",
            "2 | Inversor Growatt 5kW | MIN5000TL | 1 | pç | 4.580,00 | 4.580,00",
            "Total geral: R$ 13.580,00",
        ];
        let grid = parse_canonical_grid(&lines);
        assert_eq!(grid.rows.len(), 2);

        let first = &grid.rows[0];
        assert_eq!(first.product, "Módulo Fotovoltaico 550W Monocristalino");
        assert_eq!(first.quantity, Some(10));
        assert_eq!(first.unit.as_deref(), Some("UN"));
        assert_eq!(first.code.as_deref(), Some("CS3W-550MS"));
        assert_eq!(first.unit_price, Some(900.0));
        assert_eq!(first.total_price, Some(9000.0));

        let second = &grid.rows[1];
        assert_eq!(second.product, "Inversor Growatt 5kW");
        assert_eq!(second.code.as_deref(), Some("MIN5000TL"));
        assert_eq!(second.total_price, Some(4580.0));
    }

    #[test]
    fn noise_lines_are_counted_and_never_rows() {
        let lines = [
            "Produto  Qtd",
            "Telefone: (11) 99999-0000",
            "contato@solar.com.br",
            "Módulo Solar 550W  8",
            "Rua das Flores, 123 - CEP 01000-000",
            "Forma de pagamento: boleto 3 parcelas",
        ];
        let grid = parse_canonical_grid(&lines);
        assert_eq!(grid.ignored_by_noise, 4);
        assert_eq!(products(&grid), vec!["Módulo Solar 550W"]);
        for row in &grid.rows {
            assert!(!is_noise_line(&row.product));
        }
    }

    #[test]
    fn repeated_header_is_noise() {
        let lines = [
            "Produto  Quantidade",
            "String Box 1000V  2",
            "Produto  Quantidade",
            "Cabo Solar 6mm  100 m",
        ];
        let grid = parse_canonical_grid(&lines);
        assert_eq!(grid.ignored_by_noise, 1);
        assert_eq!(products(&grid), vec!["String Box 1000V", "Cabo Solar 6mm"]);
        assert_eq!(grid.rows[1].quantity, Some(100));
        assert_eq!(grid.rows[1].unit.as_deref(), Some("M"));
    }

    #[test]
    fn invalid_product_closes_row() {
        let lines = [
            "Produto  Qtd",
            "Estrutura de fixação  4",
            "Resumo comercial  1",
            "para telhado cerâmico",
            "Conector MC4 par  6 pr",
        ];
        let grid = parse_canonical_grid(&lines);
        assert_eq!(grid.ignored_by_validation, 1);
        assert_eq!(products(&grid), vec!["Estrutura de fixação", "Conector MC4 par"]);
        // The continuation after the rejected line does not attach to row 0.
        assert_eq!(grid.rows[0].description, None);
        assert_eq!(grid.rows[1].unit.as_deref(), Some("PR"));
    }

    #[test]
    fn continuation_lines_extend_description() {
        let lines = [
            "Produto  Qtd",
            "Inversor Híbrido 6kW  1",
            "Monofásico 220V",
            "com Wi-Fi integrado",
            "Bateria Lítio 5kWh  2",
        ];
        let grid = parse_canonical_grid(&lines);
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(
            grid.rows[0].description.as_deref(),
            Some("Monofásico 220V com Wi-Fi integrado")
        );
        assert_eq!(grid.rows[1].description, None);
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let lines = ["Produto  Qtd", "Módulo Solar 550W  0"];
        let grid = parse_canonical_grid(&lines);
        assert!(grid.rows.is_empty());
        assert_eq!(grid.ignored_by_validation, 1);
    }

    #[test]
    fn short_product_is_rejected() {
        let lines = ["Produto  Qtd", "Kit  2"];
        let grid = parse_canonical_grid(&lines);
        assert!(grid.rows.is_empty());
        assert_eq!(grid.ignored_by_validation, 1);
    }

    #[test]
    fn word_fallback_and_labelled_fallback() {
        let lines = [
            "Inversor Growatt MIN 5000",
            "Kit fixação solo 4un",
            "Disjuntor bipolar 32A Qtd: 3 un garantia 1 ano",
        ];
        let grid = parse_canonical_grid(&lines);
        assert_eq!(products(&grid), vec!["Kit fixação solo", "Disjuntor bipolar 32A"]);
        assert_eq!(grid.rows[0].quantity, Some(4));
        assert_eq!(grid.rows[1].quantity, Some(3));
        assert_eq!(grid.rows[1].description.as_deref(), Some("garantia 1 ano"));
    }

    #[test]
    fn footer_stops_section() {
        let lines = ["Módulo Solar 550W  8", "Total: R$ 100,00", "Parafuso inox  50"];
        let grid = parse_canonical_grid(&lines);
        assert_eq!(products(&grid), vec!["Módulo Solar 550W"]);
    }

    #[test]
    fn description_is_bounded() {
        let long = "x".repeat(MAX_DESCRIPTION_CHARS * 2);
        let lines = vec!["Módulo Solar 550W  8".to_string(), long];
        let grid = parse_canonical_grid(&lines);
        let desc = grid.rows[0].description.as_deref().unwrap();
        assert_eq!(desc.chars().count(), MAX_DESCRIPTION_CHARS);
    }

    #[test]
    fn parsing_is_idempotent() {
        let lines = [
            "Produto | Qtd",
            "Módulo Solar 550W | 8",
            "detalhe adicional",
            "Inversor 5kW | 1",
        ];
        assert_eq!(parse_canonical_grid(&lines), parse_canonical_grid(&lines));
    }

    #[test]
    fn split_priority() {
        assert_eq!(split_columns("a | b|c"), vec!["a", "b", "c"]);
        assert_eq!(split_columns("a\tb"), vec!["a", "b"]);
        assert_eq!(split_columns("a;b"), vec!["a", "b"]);
        assert_eq!(split_columns("Módulo 550W  8"), vec!["Módulo 550W", "8"]);
        assert_eq!(split_columns("  single line "), vec!["single line"]);
    }

    #[test]
    fn trigger_and_header_detection() {
        assert!(is_total_trigger("Valor total: R$ 23.580,00"));
        assert!(is_total_trigger("| TOTAL GERAL | 100,00"));
        assert!(is_total_trigger("Total R$ 5,00"));
        assert!(!is_total_trigger("Subtotal 10,00"));
        assert!(!is_total_trigger("Totalizador de energia  1"));
        assert!(is_total_trigger("Total  23.580,00"));
        assert!(is_header_line("ITEM  DESCRIÇÃO  QTDE  VALOR"));
        assert!(is_header_line("Produto | Qtd | Potência 550W ref."));
        assert!(!is_header_line("Item 1 Qtd 3"));
    }

    #[test]
    fn bare_total_footer_closes_section() {
        let lines = ["Produto  Qtd", "Módulo Solar 550W  8", "Total  23.580,00"];
        let grid = parse_canonical_grid(&lines);
        assert_eq!(products(&grid), vec!["Módulo Solar 550W"]);
        assert_eq!(grid.rows[0].description, None);
        assert_eq!(grid.rows[0].source_lines, vec!["Módulo Solar 550W  8"]);
    }

    #[test]
    fn header_with_rating_digits_starts_section() {
        let lines = [
            "Proposta comercial  1",
            "Produto | Qtd | Potência 550W ref.",
            "Módulo Solar 550W | 8",
        ];
        let grid = parse_canonical_grid(&lines);
        assert_eq!(products(&grid), vec!["Módulo Solar 550W"]);
        assert_eq!(grid.ignored_by_validation, 0);
    }

    #[test]
    fn dot_decimal_prices_are_not_quantities() {
        let lines = ["Módulo Fotovoltaico 550W | 10 | 900.00 | 9000.00"];
        let grid = parse_canonical_grid(&lines);
        let row = &grid.rows[0];
        assert_eq!(row.quantity, Some(10));
        assert_eq!(row.unit_price, Some(900.0));
        assert_eq!(row.total_price, Some(9000.0));
    }

    #[test]
    fn decimal_quantity_cell_before_unit() {
        let lines = ["Módulo Fotovoltaico 550W | 10,00 | UN | 900,00 | 9.000,00"];
        let grid = parse_canonical_grid(&lines);
        assert_eq!(grid.rows.len(), 1);
        let row = &grid.rows[0];
        assert_eq!(row.product, "Módulo Fotovoltaico 550W");
        assert_eq!(row.quantity, Some(10));
        assert_eq!(row.unit.as_deref(), Some("UN"));
        assert_eq!(row.unit_price, Some(900.0));
        assert_eq!(row.total_price, Some(9000.0));

        // Without a unit column the first of three amounts is the quantity.
        let grid = parse_canonical_grid(&["Inversor Solar 5kW | 2,00 | 4.580,00 | 9.160,00"]);
        assert_eq!(grid.rows[0].quantity, Some(2));
        assert_eq!(grid.rows[0].unit_price, Some(4580.0));
    }

    #[test]
    fn product_names_with_banking_words_are_kept() {
        let lines = [
            "Produto  Qtd",
            "Banco de baterias lítio 10kWh  1",
            "String box 2 entradas  1",
            "Inversor Solar 5kW  1",
            "Banco: Itaú  Agência 1234",
            "Av. Paulista, 1000",
            "Entrada de R$ 5.000,00",
        ];
        let grid = parse_canonical_grid(&lines);
        assert_eq!(
            products(&grid),
            vec!["Banco de baterias lítio 10kWh", "String box 2 entradas", "Inversor Solar 5kW"]
        );
        assert_eq!(grid.ignored_by_noise, 3);
    }

    #[test]
    fn noise_after_open_row_is_not_a_continuation() {
        let lines = [
            "Produto  Qtd",
            "Inversor Híbrido 6kW  1",
            "Telefone: (11) 99999-0000",
            "Monofásico 220V",
            "Bateria Lítio 5kWh  2",
            "contato@solar.com.br",
        ];
        let grid = parse_canonical_grid(&lines);
        assert_eq!(grid.ignored_by_noise, 2);
        assert_eq!(products(&grid), vec!["Inversor Híbrido 6kW", "Bateria Lítio 5kWh"]);
        assert_eq!(grid.rows[0].description.as_deref(), Some("Monofásico 220V"));
        assert_eq!(
            grid.rows[0].source_lines,
            vec!["Inversor Híbrido 6kW  1", "Monofásico 220V"]
        );
        assert_eq!(grid.rows[1].description, None);
        assert_eq!(grid.rows[1].source_lines, vec!["Bateria Lítio 5kWh  2"]);
    }
}
