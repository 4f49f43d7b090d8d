//! Output types for budget uploads.
//!
//! [`BudgetUploadResult`] is what [`crate::upload::BudgetUploader::process`]
//! returns. Its `json` field is the downstream wire shape ([`BudgetJson`],
//! Portuguese field names); `structured` keeps the parser's richer view
//! including counters and warnings.

use serde::Serialize;

pub use crate::parse::structured::{BudgetHeader, BudgetItem, StructuredBudget};

/// Currency of every amount in [`BudgetResumo`].
pub const CURRENCY: &str = "BRL";

/// Unit reported when a row has none.
pub const DEFAULT_UNIT: &str = "UN";

/// Complete result of one upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetUploadResult {
    pub json: BudgetJson,
    pub structured: StructuredBudget,
    /// Normalized text of all pages; pages separated by a blank line.
    pub plain_text: String,
    /// Normalized text per page, in document order.
    pub pages: Vec<String>,
    /// `true` when at least one page went through OCR.
    pub used_ocr: bool,
}

/// Downstream JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetJson {
    pub header: BudgetJsonHeader,
    pub itens: Vec<BudgetJsonItem>,
    pub resumo: BudgetResumo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetJsonHeader {
    pub numero_orcamento: Option<String>,
    pub validade: Option<String>,
    pub de: Option<String>,
    pub para: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetJsonItem {
    pub produto: String,
    pub codigo: Option<String>,
    pub modelo: Option<String>,
    /// Falls back to the product name when the row has no description.
    pub descricao: String,
    pub quantidade: Option<i64>,
    pub unidade: String,
    pub preco_unitario: Option<f64>,
    pub preco_total: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetResumo {
    pub valor_total: Option<f64>,
    pub moeda: String,
}

/// Round to 2 decimal places; non-finite values become `None`.
pub fn round_money(value: Option<f64>) -> Option<f64> {
    value
        .filter(|v| v.is_finite())
        .map(|v| (v * 100.0).round() / 100.0)
}

/// Trimmed, non-empty string or `None`.
fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl From<&BudgetItem> for BudgetJsonItem {
    fn from(item: &BudgetItem) -> Self {
        let produto = item.product.trim().to_string();
        let descricao = non_empty(item.description.as_deref()).unwrap_or_else(|| produto.clone());
        Self {
            codigo: non_empty(item.code.as_deref()),
            modelo: non_empty(item.model.as_deref()),
            descricao,
            quantidade: item.quantity.filter(|q| *q > 0),
            unidade: non_empty(item.unit.as_deref()).unwrap_or_else(|| DEFAULT_UNIT.to_string()),
            preco_unitario: round_money(item.unit_price),
            preco_total: round_money(item.total_price),
            produto,
        }
    }
}

impl From<&StructuredBudget> for BudgetJson {
    fn from(budget: &StructuredBudget) -> Self {
        let h = &budget.header;
        Self {
            header: BudgetJsonHeader {
                numero_orcamento: non_empty(h.number.as_deref()),
                validade: non_empty(h.validity.as_deref()),
                de: non_empty(h.from.as_deref()),
                para: non_empty(h.to.as_deref()),
            },
            itens: budget.items.iter().map(BudgetJsonItem::from).collect(),
            resumo: BudgetResumo {
                valor_total: round_money(budget.total),
                moeda: CURRENCY.to_string(),
            },
        }
    }
}
