//! Structured budget assembly: header fields, summary total and warnings
//! around the canonical grid.

use super::grid::{is_total_trigger, CanonicalGrid, CanonicalRow};
use super::number::parse_locale_number;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Header fields are only searched in this many leading lines.
pub const HEADER_SCAN_LINES: usize = 150;

/// Warning emitted when the grid produced no rows.
pub const NO_ITEMS_WARNING: &str = "Nenhum item identificado no orçamento";

static RE_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:or[çc]amento|proposta|pedido|cota[çc][ãa]o)\s*(?:n[º°o]?\.?|#|:)\s*[:\-]?\s*([A-Za-z0-9\-/.]*\d[A-Za-z0-9\-/]*)",
    )
    .unwrap()
});

static RE_VALIDITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:validade(?:\s+da\s+proposta)?|v[áa]lid[ao]\s+(?:at[ée]|por))\s*[:\-]?\s*(\d{1,2}/\d{1,2}/\d{2,4}|\d+\s*dias)",
    )
    .unwrap()
});

static RE_FROM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:de|emitente|fornecedor|empresa)\s*:\s*(\S.*?)\s*$").unwrap()
});

static RE_TO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:para|cliente|destinat[áa]rio)\s*:\s*(\S.*?)\s*$").unwrap()
});

static RE_AMOUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d[\d.,]*\d|\d").unwrap());

/// Document header fields. Each is optional; the first match wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetHeader {
    pub number: Option<String>,
    pub validity: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// One budget line item, re-shaped from a [`CanonicalRow`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetItem {
    pub product: String,
    pub code: Option<String>,
    pub model: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i64>,
    pub unit: Option<String>,
    pub unit_price: Option<f64>,
    pub total_price: Option<f64>,
}

impl From<CanonicalRow> for BudgetItem {
    fn from(row: CanonicalRow) -> Self {
        Self {
            product: row.product,
            code: row.code,
            model: None,
            description: row.description,
            quantity: row.quantity,
            unit: row.unit,
            unit_price: row.unit_price,
            total_price: row.total_price,
        }
    }
}

/// Parsed budget: header, items, summary total and non-fatal warnings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredBudget {
    pub header: BudgetHeader,
    pub items: Vec<BudgetItem>,
    pub total: Option<f64>,
    pub warnings: Vec<String>,
    pub ignored_by_noise: usize,
    pub ignored_by_validation: usize,
}

impl StructuredBudget {
    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

fn first_capture<S: AsRef<str>>(lines: &[S], re: &Regex) -> Option<String> {
    lines.iter().take(HEADER_SCAN_LINES).find_map(|line| {
        re.captures(line.as_ref())
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Extract header fields from the leading lines.
pub fn extract_header<S: AsRef<str>>(lines: &[S]) -> BudgetHeader {
    BudgetHeader {
        number: first_capture(lines, &RE_NUMBER),
        validity: first_capture(lines, &RE_VALIDITY),
        from: first_capture(lines, &RE_FROM),
        to: first_capture(lines, &RE_TO),
    }
}

/// The summary total: the last total-trigger line carrying a parseable
/// amount.
pub fn extract_total<S: AsRef<str>>(lines: &[S]) -> Option<f64> {
    lines.iter().rev().find_map(|line| {
        let line = line.as_ref();
        if !is_total_trigger(line) {
            return None;
        }
        let amount = RE_AMOUNT.find_iter(line).last()?;
        parse_locale_number(amount.as_str())
    })
}

/// Assemble a [`StructuredBudget`] from the document lines and their grid.
pub fn build_structured_budget<S: AsRef<str>>(lines: &[S], grid: CanonicalGrid) -> StructuredBudget {
    let mut budget = StructuredBudget {
        header: extract_header(lines),
        total: extract_total(lines),
        ignored_by_noise: grid.ignored_by_noise,
        ignored_by_validation: grid.ignored_by_validation,
        items: grid.rows.into_iter().map(BudgetItem::from).collect(),
        warnings: Vec::new(),
    };

    if budget.items.is_empty() {
        budget.push_warning(NO_ITEMS_WARNING);
    }
    if budget.ignored_by_validation > 0 {
        budget.push_warning(format!(
            "{} linha(s) com quantidade descartada(s) por produto ou quantidade inválidos",
            budget.ignored_by_validation
        ));
    }
    budget
}
