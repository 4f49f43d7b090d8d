//! Text-to-structure parsing for budget documents.
//!
//! ```text
//! lines ──▶ grid ──▶ structured
//!            │  └─ quantity ──▶ number
//! ```
//!
//! 1. [`grid`]       — bound the item section, drop noise, split columns and
//!    assemble validated [`CanonicalRow`]s
//! 2. [`quantity`]   — tagged `label? number unit?` token recognition
//! 3. [`number`]     — pt-BR / en-US number parsing
//! 4. [`structured`] — header fields, summary total and warnings around the grid

pub mod grid;
pub mod number;
pub mod quantity;
pub mod structured;

pub use grid::{parse_canonical_grid, split_columns, CanonicalGrid, CanonicalRow};
pub use number::parse_locale_number;
pub use quantity::{normalize_unit, parse_quantity_token, QuantityToken};
pub use structured::{build_structured_budget, BudgetHeader, BudgetItem, StructuredBudget};

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lower-case `s` and strip diacritics, for keyword matching only.
///
/// `"Módulo QTDE Peças"` → `"modulo qtde pecas"`.
pub(crate) fn fold(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}
