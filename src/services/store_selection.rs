use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{error, info, instrument};

use crate::client::ProcurementApi;
use crate::errors::ServiceError;
use crate::models::StoreAvailability;

/// Where a store selector currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreSelectionState {
    Idle { last_error: Option<String> },
    Checking,
    Available {
        availability: StoreAvailability,
        selected: BTreeSet<String>,
    },
}

/// What a confirmed store request means for the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StoreRequestOutcome {
    /// Every available material was requested; the order can move to Completed.
    FullyRouted { message: String },
    /// Some available materials still need a vendor.
    PartiallyRouted { message: String, remaining: Vec<String> },
}

impl StoreRequestOutcome {
    pub fn message(&self) -> &str {
        match self {
            Self::FullyRouted { message } | Self::PartiallyRouted { message, .. } => message,
        }
    }
}

/// Store-availability check and material selection for one order.
#[derive(Debug, Clone)]
pub struct StoreSelector {
    cr_id: i64,
    state: StoreSelectionState,
}

impl StoreSelector {
    pub fn new(cr_id: i64) -> Self {
        Self {
            cr_id,
            state: StoreSelectionState::Idle { last_error: None },
        }
    }

    pub fn cr_id(&self) -> i64 {
        self.cr_id
    }

    pub fn state(&self) -> &StoreSelectionState {
        &self.state
    }

    pub fn availability(&self) -> Option<&StoreAvailability> {
        match &self.state {
            StoreSelectionState::Available { availability, .. } => Some(availability),
            _ => None,
        }
    }

    pub fn selected(&self) -> Option<&BTreeSet<String>> {
        match &self.state {
            StoreSelectionState::Available { selected, .. } => Some(selected),
            _ => None,
        }
    }

    /// Queries stock and auto-selects every available material.
    #[instrument(skip(self, api), fields(cr_id = self.cr_id))]
    pub async fn check(&mut self, api: &dyn ProcurementApi) -> Result<(), ServiceError> {
        self.state = StoreSelectionState::Checking;

        match api.check_store_availability(self.cr_id).await {
            Ok(availability) => {
                let selected: BTreeSet<String> =
                    availability.available_names().map(str::to_string).collect();
                info!(
                    available = availability.available_materials.len(),
                    unavailable = availability.unavailable_materials.len(),
                    already_requested = availability.already_requested_materials.len(),
                    "Store availability checked"
                );
                self.state = StoreSelectionState::Available {
                    availability,
                    selected,
                };
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "Store availability check failed");
                self.state = StoreSelectionState::Idle {
                    last_error: Some(err.user_message()),
                };
                Err(err)
            }
        }
    }

    fn available_mut(&mut self) -> Result<(&StoreAvailability, &mut BTreeSet<String>), ServiceError> {
        match &mut self.state {
            StoreSelectionState::Available {
                availability,
                selected,
            } => Ok((availability, selected)),
            _ => Err(ServiceError::InvalidState(
                "Store availability has not been checked".to_string(),
            )),
        }
    }

    /// Flips membership of one available material. Returns whether it is now selected.
    fn selectable_mut(&mut self, material_name: &str) -> Result<&mut BTreeSet<String>, ServiceError> {
        let (availability, selected) = self.available_mut()?;
        if !availability.is_available(material_name) {
            return Err(ServiceError::ValidationError(format!(
                "'{}' is not available in store",
                material_name
            )));
        }
        Ok(selected)
    }

    /// Adds a material to the selection. Selecting it again is a no-op.
    pub fn select(&mut self, material_name: &str) -> Result<bool, ServiceError> {
        let selected = self.selectable_mut(material_name)?;
        Ok(selected.insert(material_name.to_string()))
    }

    pub fn toggle(&mut self, material_name: &str) -> Result<bool, ServiceError> {
        let selected = self.selectable_mut(material_name)?;
        if selected.remove(material_name) {
            Ok(false)
        } else {
            selected.insert(material_name.to_string());
            Ok(true)
        }
    }

    pub fn select_all(&mut self) -> Result<(), ServiceError> {
        let (availability, selected) = self.available_mut()?;
        selected.extend(availability.available_names().map(str::to_string));
        Ok(())
    }

    pub fn clear_selection(&mut self) -> Result<(), ServiceError> {
        let (_, selected) = self.available_mut()?;
        selected.clear();
        Ok(())
    }

    /// Submits the selected subset. Empty selections never reach the backend.
    #[instrument(skip(self, api), fields(cr_id = self.cr_id))]
    pub async fn confirm(&mut self, api: &dyn ProcurementApi) -> Result<StoreRequestOutcome, ServiceError> {
        let cr_id = self.cr_id;
        let (availability, selected) = self.available_mut()?;
        if selected.is_empty() {
            return Err(ServiceError::ValidationError(
                "Please select at least one material".to_string(),
            ));
        }

        let requested: Vec<String> = selected.iter().cloned().collect();
        let remaining: Vec<String> = availability
            .available_names()
            .filter(|name| !selected.contains(*name))
            .map(str::to_string)
            .collect();

        let response = api.request_from_store(cr_id, requested.clone()).await?;
        info!(
            requested = requested.len(),
            remaining = remaining.len(),
            "Materials requested from store"
        );

        let outcome = if remaining.is_empty() {
            StoreRequestOutcome::FullyRouted {
                message: response.message,
            }
        } else {
            StoreRequestOutcome::PartiallyRouted {
                message: response.message,
                remaining,
            }
        };
        Ok(outcome)
    }
}
