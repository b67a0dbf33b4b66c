use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{timestamps, MaterialLine};

const PURCHASE_COMPLETED: &str = "purchase_completed";

/// Approval state of a child's own vendor selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VendorSelectionStatus {
    PendingTdApproval,
    Approved,
    Rejected,
    Unknown(String),
}

impl From<String> for VendorSelectionStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending_td_approval" => Self::PendingTdApproval,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<VendorSelectionStatus> for String {
    fn from(status: VendorSelectionStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for VendorSelectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PendingTdApproval => f.write_str("pending_td_approval"),
            Self::Approved => f.write_str("approved"),
            Self::Rejected => f.write_str("rejected"),
            Self::Unknown(raw) => f.write_str(raw),
        }
    }
}

/// A vendor-specific split of a parent order's materials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoChild {
    pub id: i64,
    pub parent_cr_id: i64,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub vendor_id: Option<i64>,
    #[serde(default)]
    pub vendor_name: Option<String>,
    #[serde(default)]
    pub vendor_email: Option<String>,
    #[serde(default)]
    pub vendor_phone: Option<String>,
    pub vendor_selection_status: VendorSelectionStatus,
    /// Lifecycle marker independent of vendor approval, e.g. `purchase_completed`.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub materials: Vec<MaterialLine>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl PoChild {
    pub fn new(id: i64, parent_cr_id: i64, vendor_selection_status: VendorSelectionStatus) -> Self {
        Self {
            id,
            parent_cr_id,
            project_name: None,
            item_name: None,
            vendor_id: None,
            vendor_name: None,
            vendor_email: None,
            vendor_phone: None,
            vendor_selection_status,
            status: None,
            materials: Vec::new(),
            rejection_reason: None,
            completed_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn normalize(&mut self) {
        self.materials.iter_mut().for_each(MaterialLine::normalize);
    }

    pub fn is_purchase_completed(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case(PURCHASE_COMPLETED))
    }

    pub fn total(&self) -> Option<Decimal> {
        MaterialLine::checked_sum(&self.materials)
    }

    pub fn created_at_parsed(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(timestamps::parse_timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_parsing_is_case_insensitive_and_keeps_unknowns() {
        let child: PoChild = serde_json::from_value(json!({
            "id": 9,
            "parent_cr_id": 3,
            "vendor_selection_status": "Approved",
            "status": "PURCHASE_COMPLETED"
        }))
        .unwrap();
        assert_eq!(child.vendor_selection_status, VendorSelectionStatus::Approved);
        assert!(child.is_purchase_completed());

        let odd: PoChild = serde_json::from_value(json!({
            "id": 10,
            "parent_cr_id": 3,
            "vendor_selection_status": "on_hold"
        }))
        .unwrap();
        assert_eq!(
            odd.vendor_selection_status,
            VendorSelectionStatus::Unknown("on_hold".into())
        );
        assert_eq!(
            serde_json::to_value(&odd).unwrap()["vendor_selection_status"],
            json!("on_hold")
        );
    }
}
