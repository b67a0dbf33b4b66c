use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Stock position of one material in the internal store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreMaterial {
    pub material_name: String,
    #[serde(default)]
    pub required_quantity: Decimal,
    #[serde(default)]
    pub available_quantity: Decimal,
    #[serde(default)]
    pub unit: Option<String>,
}

/// Result of a store availability check for one purchase order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreAvailability {
    #[serde(default)]
    pub available_materials: Vec<StoreMaterial>,
    #[serde(default)]
    pub unavailable_materials: Vec<StoreMaterial>,
    #[serde(default)]
    pub already_requested_materials: Vec<StoreMaterial>,
    #[serde(default)]
    pub can_complete_from_store: bool,
}

impl StoreAvailability {
    pub fn available_names(&self) -> impl Iterator<Item = &str> {
        self.available_materials.iter().map(|m| m.material_name.as_str())
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.available_names().any(|n| n == name)
    }
}
