use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::null_as_false;

/// One material within a purchase order or a split child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialLine {
    /// Unique within its order; used as the key for price edits and store requests.
    pub material_name: String,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub original_unit_price: Decimal,
    #[serde(default)]
    pub negotiated_price: Option<Decimal>,
    /// Effective price before negotiation as reported by the backend.
    #[serde(default)]
    pub unit_price: Decimal,
    /// Material was requested from store stock instead of a vendor.
    #[serde(default, deserialize_with = "null_as_false")]
    pub routed_to_store: bool,
    /// Material was split out to this POChild's vendor.
    #[serde(default)]
    pub po_child_id: Option<i64>,
}

impl MaterialLine {
    pub fn new(material_name: impl Into<String>, quantity: Decimal, original_unit_price: Decimal) -> Self {
        Self {
            material_name: material_name.into(),
            quantity,
            unit: None,
            original_unit_price,
            negotiated_price: None,
            unit_price: original_unit_price,
            routed_to_store: false,
            po_child_id: None,
        }
    }

    /// Sets or clears the override. A price equal to the original is not a negotiation.
    pub fn set_negotiated_price(&mut self, price: Option<Decimal>) {
        self.negotiated_price = price.filter(|p| *p != self.original_unit_price);
    }

    pub fn normalize(&mut self) {
        self.set_negotiated_price(self.negotiated_price);
    }

    pub fn has_negotiation(&self) -> bool {
        matches!(self.negotiated_price, Some(p) if p != self.original_unit_price)
    }

    /// Negotiated price when active, else the original unit price.
    pub fn effective_price(&self) -> Decimal {
        self.negotiated_price.unwrap_or(self.original_unit_price)
    }

    /// `None` when the product leaves the decimal range.
    pub fn original_total(&self) -> Option<Decimal> {
        self.original_unit_price.checked_mul(self.quantity)
    }

    pub fn line_total(&self) -> Option<Decimal> {
        self.effective_price().checked_mul(self.quantity)
    }

    /// Sums line totals, `None` on overflow of any line or of the sum.
    pub fn checked_sum<'a>(lines: impl IntoIterator<Item = &'a MaterialLine>) -> Option<Decimal> {
        lines
            .into_iter()
            .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line.line_total()?))
    }

    /// Store-routed and vendor-split lines are excluded from cost views and price edits.
    pub fn is_negotiable(&self) -> bool {
        !self.routed_to_store && self.po_child_id.is_none()
    }
}
