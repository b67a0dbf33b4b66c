use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use super::{timestamps, PoChild, PurchaseOrder};
use crate::errors::ServiceError;

/// Composite identity shared by parents and children.
///
/// Displays as `purchase-<cr_id>` or `poChild-<id>`, the keys the tab and
/// dashboard views deduplicate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKey {
    Purchase(i64),
    PoChild(i64),
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Purchase(id) => write!(f, "purchase-{}", id),
            RecordKey::PoChild(id) => write!(f, "poChild-{}", id),
        }
    }
}

impl Serialize for RecordKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Either kind of procurement record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderRecord {
    Purchase(PurchaseOrder),
    PoChild(PoChild),
}

impl OrderRecord {
    /// Decodes one backend item. A `parent_cr_id` field marks a POChild.
    pub fn from_wire(value: Value) -> Result<Self, ServiceError> {
        let is_child = value
            .as_object()
            .map(|obj| obj.contains_key("parent_cr_id"))
            .ok_or_else(|| {
                ServiceError::SerializationError("order record must be a JSON object".to_string())
            })?;

        let record = if is_child {
            let mut child: PoChild = serde_json::from_value(value)?;
            child.normalize();
            OrderRecord::PoChild(child)
        } else {
            let mut purchase: PurchaseOrder = serde_json::from_value(value)?;
            purchase.normalize();
            OrderRecord::Purchase(purchase)
        };
        Ok(record)
    }

    pub fn key(&self) -> RecordKey {
        match self {
            OrderRecord::Purchase(po) => RecordKey::Purchase(po.cr_id),
            OrderRecord::PoChild(child) => RecordKey::PoChild(child.id),
        }
    }

    pub fn created_at(&self) -> Option<&str> {
        match self {
            OrderRecord::Purchase(po) => po.created_at.as_deref(),
            OrderRecord::PoChild(child) => child.created_at.as_deref(),
        }
    }

    pub fn sort_timestamp(&self) -> i64 {
        timestamps::sort_key(self.created_at())
    }

    pub fn is_child(&self) -> bool {
        matches!(self, OrderRecord::PoChild(_))
    }
}

impl From<PurchaseOrder> for OrderRecord {
    fn from(po: PurchaseOrder) -> Self {
        OrderRecord::Purchase(po)
    }
}

impl From<PoChild> for OrderRecord {
    fn from(child: PoChild) -> Self {
        OrderRecord::PoChild(child)
    }
}

/// Purchase-shaped row built from either record kind.
///
/// This is the only place that decides which defaults a POChild gets when it
/// is shown alongside parent orders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSummary {
    pub key: RecordKey,
    pub reference: String,
    pub parent_cr_id: Option<i64>,
    pub project_name: String,
    pub item_name: String,
    pub vendor_name: Option<String>,
    pub material_count: usize,
    /// Absent when the backend amounts overflow.
    pub total: Option<Decimal>,
    pub created_at: Option<String>,
}

const UNKNOWN_PROJECT: &str = "Unassigned project";
const UNKNOWN_ITEM: &str = "Unnamed item";

impl From<&PurchaseOrder> for OrderSummary {
    fn from(po: &PurchaseOrder) -> Self {
        Self {
            key: RecordKey::Purchase(po.cr_id),
            reference: format!("PO-{}", po.cr_id),
            parent_cr_id: None,
            project_name: po.project_name.clone().unwrap_or_else(|| UNKNOWN_PROJECT.to_string()),
            item_name: po.item_name.clone().unwrap_or_else(|| UNKNOWN_ITEM.to_string()),
            vendor_name: po.vendor_name.clone(),
            material_count: po.materials.iter().filter(|m| m.is_negotiable()).count(),
            total: po.current_total(),
            created_at: po.created_at.clone(),
        }
    }
}

impl From<&PoChild> for OrderSummary {
    fn from(child: &PoChild) -> Self {
        Self {
            key: RecordKey::PoChild(child.id),
            reference: format!("PO-{}.{}", child.parent_cr_id, child.id),
            parent_cr_id: Some(child.parent_cr_id),
            project_name: child
                .project_name
                .clone()
                .unwrap_or_else(|| UNKNOWN_PROJECT.to_string()),
            item_name: child.item_name.clone().unwrap_or_else(|| UNKNOWN_ITEM.to_string()),
            vendor_name: child.vendor_name.clone(),
            material_count: child.materials.len(),
            total: child.total(),
            created_at: child.created_at.clone(),
        }
    }
}

impl From<&OrderRecord> for OrderSummary {
    fn from(record: &OrderRecord) -> Self {
        match record {
            OrderRecord::Purchase(po) => po.into(),
            OrderRecord::PoChild(child) => child.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MaterialLine, VendorSelectionStatus};
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn parent_cr_id_discriminates_children() {
        let child = OrderRecord::from_wire(json!({
            "id": 5,
            "parent_cr_id": 12,
            "vendor_selection_status": "approved"
        }))
        .unwrap();
        assert_eq!(child.key(), RecordKey::PoChild(5));

        let parent = OrderRecord::from_wire(json!({"cr_id": 12})).unwrap();
        assert_eq!(parent.key(), RecordKey::Purchase(12));
        assert!(!parent.is_child());
    }

    #[test]
    fn wire_decoding_normalizes_negotiated_prices() {
        let record = OrderRecord::from_wire(json!({
            "cr_id": 3,
            "materials": [{
                "material_name": "Cement",
                "quantity": 1,
                "original_unit_price": 100,
                "negotiated_price": 100
            }]
        }))
        .unwrap();

        match record {
            OrderRecord::Purchase(po) => assert_eq!(po.materials[0].negotiated_price, None),
            other => panic!("expected purchase, got {:?}", other),
        }
    }

    #[test]
    fn non_object_payload_is_rejected() {
        assert!(matches!(
            OrderRecord::from_wire(json!([1, 2])),
            Err(ServiceError::SerializationError(_))
        ));
    }

    #[test]
    fn composite_keys_render_for_dedup() {
        assert_eq!(RecordKey::Purchase(8).to_string(), "purchase-8");
        assert_eq!(RecordKey::PoChild(8).to_string(), "poChild-8");
    }

    #[test]
    fn summary_adapter_fills_child_defaults() {
        let mut child = PoChild::new(4, 11, VendorSelectionStatus::Approved);
        child.materials = vec![MaterialLine::new("Tiles", dec!(4), dec!(25))];

        let summary = OrderSummary::from(&OrderRecord::from(child));
        assert_eq!(summary.reference, "PO-11.4");
        assert_eq!(summary.parent_cr_id, Some(11));
        assert_eq!(summary.project_name, UNKNOWN_PROJECT);
        assert_eq!(summary.total, Some(dec!(100)));
    }
}
