use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::{blank_as_none, null_as_false, timestamps, MaterialLine};

/// Why a purchase order was sent back to the buyer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RejectionType {
    VendorSelection,
    Other(String),
}

impl RejectionType {
    pub fn as_str(&self) -> &str {
        match self {
            RejectionType::VendorSelection => "vendor_selection",
            RejectionType::Other(kind) => kind,
        }
    }
}

impl From<String> for RejectionType {
    fn from(raw: String) -> Self {
        if raw.eq_ignore_ascii_case("vendor_selection") {
            RejectionType::VendorSelection
        } else {
            RejectionType::Other(raw)
        }
    }
}

impl fmt::Display for RejectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RejectionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

fn rejection_type<'de, D>(deserializer: D) -> Result<Option<RejectionType>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(blank_as_none(deserializer)?.map(RejectionType::from))
}

/// An approved request to buy a set of materials for a project item.
///
/// Workflow flags are owned by the backend; the client only reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub cr_id: i64,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub materials: Vec<MaterialLine>,

    #[serde(default)]
    pub vendor_id: Option<i64>,
    #[serde(default)]
    pub vendor_name: Option<String>,
    #[serde(default)]
    pub vendor_email: Option<String>,
    #[serde(default)]
    pub vendor_phone: Option<String>,

    #[serde(default, deserialize_with = "null_as_false")]
    pub vendor_selection_pending_td_approval: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub store_requests_pending: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub all_store_requests_approved: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub any_store_request_rejected: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub has_store_requests: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub vendor_email_sent: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub vendor_whatsapp_sent: bool,

    #[serde(default, deserialize_with = "rejection_type")]
    pub rejection_type: Option<RejectionType>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl PurchaseOrder {
    /// Bare order with no flags set; everything else defaulted.
    pub fn new(cr_id: i64) -> Self {
        Self {
            cr_id,
            project_name: None,
            client: None,
            location: None,
            item_name: None,
            materials: Vec::new(),
            vendor_id: None,
            vendor_name: None,
            vendor_email: None,
            vendor_phone: None,
            vendor_selection_pending_td_approval: false,
            store_requests_pending: false,
            all_store_requests_approved: false,
            any_store_request_rejected: false,
            has_store_requests: false,
            vendor_email_sent: false,
            vendor_whatsapp_sent: false,
            rejection_type: None,
            rejection_reason: None,
            created_at: None,
        }
    }

    pub fn normalize(&mut self) {
        self.materials.iter_mut().for_each(MaterialLine::normalize);
    }

    pub fn is_rejected(&self) -> bool {
        self.rejection_type.is_some()
    }

    pub fn has_vendor(&self) -> bool {
        self.vendor_id.is_some()
    }

    /// The vendor has been contacted over at least one channel.
    pub fn vendor_notified(&self) -> bool {
        self.vendor_email_sent || self.vendor_whatsapp_sent
    }

    pub fn material(&self, name: &str) -> Option<&MaterialLine> {
        self.materials.iter().find(|m| m.material_name == name)
    }

    /// Cost of the lines still bought through this order's vendor.
    /// `None` when the amounts overflow.
    pub fn current_total(&self) -> Option<Decimal> {
        MaterialLine::checked_sum(self.materials.iter().filter(|m| m.is_negotiable()))
    }

    pub fn created_at_parsed(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(timestamps::parse_timestamp)
    }
}
