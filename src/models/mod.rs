//! Buyer-side procurement records as the backend serves them.
//!
//! Records are normalized once when they cross the fetch boundary; everything
//! downstream (classifier, aggregator, timeline, editors) works on these types.

pub mod material_line;
pub mod pagination;
pub mod po_child;
pub mod purchase_order;
pub mod record;
pub mod store;
pub mod timestamps;

pub use material_line::MaterialLine;
pub use pagination::{Page, PageRequest, Pagination};
pub use po_child::{PoChild, VendorSelectionStatus};
pub use purchase_order::{PurchaseOrder, RejectionType};
pub use record::{OrderRecord, OrderSummary, RecordKey};
pub use store::{StoreAvailability, StoreMaterial};

use serde::{Deserialize, Deserializer, Serialize};

/// Backend flags arrive as `true`, `false`, `null` or not at all.
pub(crate) fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// Empty strings mean "not set" for optional text fields.
pub(crate) fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Body returned by every mutation endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub message: String,
}

/// One `(material, price)` pair sent when negotiated prices are saved.
/// `None` clears the override on the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiatedPriceUpdate {
    pub material_name: String,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub negotiated_price: Option<rust_decimal::Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorSelection {
    pub vendor_id: i64,
}
