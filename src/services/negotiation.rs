use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;
use tracing::{info, instrument, warn};

use crate::client::ProcurementApi;
use crate::errors::ServiceError;
use crate::models::{ApiMessage, MaterialLine, NegotiatedPriceUpdate, PurchaseOrder};

/// Derived cost figures, recomputed on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NegotiationTotals {
    pub original_total: Decimal,
    pub current_total: Decimal,
    pub diff: Decimal,
    /// Zero when the original total is zero.
    pub diff_percentage: Decimal,
}

fn out_of_range() -> ServiceError {
    ServiceError::ValidationError("Order total exceeds the supported amount range".to_string())
}

impl NegotiationTotals {
    /// Fails with a validation error when any amount overflows.
    pub fn from_lines<'a>(
        lines: impl IntoIterator<Item = &'a MaterialLine>,
    ) -> Result<Self, ServiceError> {
        let (original_total, current_total) = lines.into_iter().try_fold(
            (Decimal::ZERO, Decimal::ZERO),
            |(orig, curr), line| {
                let orig = orig.checked_add(line.original_total()?)?;
                let curr = curr.checked_add(line.line_total()?)?;
                Some((orig, curr))
            },
        )
        .ok_or_else(out_of_range)?;

        let diff = current_total
            .checked_sub(original_total)
            .ok_or_else(out_of_range)?;
        let diff_percentage = if original_total.is_zero() {
            Decimal::ZERO
        } else {
            diff.checked_div(original_total)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .ok_or_else(out_of_range)?
        };

        Ok(Self {
            original_total,
            current_total,
            diff,
            diff_percentage,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct EditBuffer {
    material_name: String,
    input: String,
}

/// Per-order price negotiation session.
///
/// Holds only the lines a buyer may renegotiate: anything already routed to
/// store or split out to a child vendor is left out.
#[derive(Debug, Clone)]
pub struct NegotiationEditor {
    cr_id: i64,
    lines: Vec<MaterialLine>,
    editing: Option<EditBuffer>,
    dirty: bool,
    open: bool,
}

/// Parses a buyer-entered price. Accepts plain decimals and scientific notation.
pub fn parse_price(input: &str) -> Result<Decimal, ServiceError> {
    let trimmed = input.trim();
    let price = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| ServiceError::ValidationError(format!("'{}' is not a valid price", input)))?;

    if price.is_sign_negative() && !price.is_zero() {
        return Err(ServiceError::ValidationError(
            "Price cannot be negative".to_string(),
        ));
    }
    Ok(price.normalize())
}

impl NegotiationEditor {
    pub fn open(order: &PurchaseOrder) -> Self {
        let lines = order
            .materials
            .iter()
            .filter(|line| line.is_negotiable())
            .cloned()
            .map(|mut line| {
                line.normalize();
                line
            })
            .collect();

        Self {
            cr_id: order.cr_id,
            lines,
            editing: None,
            dirty: false,
            open: true,
        }
    }

    pub fn cr_id(&self) -> i64 {
        self.cr_id
    }

    pub fn lines(&self) -> &[MaterialLine] {
        &self.lines
    }

    pub fn line(&self, material_name: &str) -> Option<&MaterialLine> {
        self.lines.iter().find(|l| l.material_name == material_name)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Material currently being edited and its buffer contents.
    pub fn editing(&self) -> Option<(&str, &str)> {
        self.editing
            .as_ref()
            .map(|buf| (buf.material_name.as_str(), buf.input.as_str()))
    }

    fn line_mut(&mut self, material_name: &str) -> Result<&mut MaterialLine, ServiceError> {
        self.lines
            .iter_mut()
            .find(|l| l.material_name == material_name)
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Material '{}' is not negotiable on order {}",
                    material_name, self.cr_id
                ))
            })
    }

    /// Enters edit mode for one line, seeded with its effective price.
    pub fn start_edit(&mut self, material_name: &str) -> Result<(), ServiceError> {
        let seed = self.line_mut(material_name)?.effective_price();
        self.editing = Some(EditBuffer {
            material_name: material_name.to_string(),
            input: seed.to_string(),
        });
        Ok(())
    }

    pub fn update_buffer(&mut self, input: impl Into<String>) -> Result<(), ServiceError> {
        match self.editing.as_mut() {
            Some(buf) => {
                buf.input = input.into();
                Ok(())
            }
            None => Err(ServiceError::InvalidState(
                "No material is being edited".to_string(),
            )),
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Commits a price for one line. Invalid input leaves every field untouched,
    /// including prices whose totals would overflow.
    pub fn save_edit(&mut self, material_name: &str, input: &str) -> Result<(), ServiceError> {
        let price = parse_price(input)?;
        let mut candidate = self.line_mut(material_name)?.clone();
        candidate.set_negotiated_price(Some(price));
        NegotiationTotals::from_lines(self.lines.iter().map(|line| {
            if line.material_name == material_name {
                &candidate
            } else {
                line
            }
        }))?;
        *self.line_mut(material_name)? = candidate;

        if self
            .editing
            .as_ref()
            .is_some_and(|buf| buf.material_name == material_name)
        {
            self.editing = None;
        }
        self.dirty = true;
        Ok(())
    }

    /// Commits the edit buffer for the material being edited.
    pub fn commit_buffer(&mut self) -> Result<(), ServiceError> {
        let buf = self.editing.clone().ok_or_else(|| {
            ServiceError::InvalidState("No material is being edited".to_string())
        })?;
        self.save_edit(&buf.material_name, &buf.input)
    }

    pub fn reset(&mut self, material_name: &str) -> Result<(), ServiceError> {
        let line = self.line_mut(material_name)?;
        if line.negotiated_price.take().is_some() {
            self.dirty = true;
        }
        Ok(())
    }

    pub fn reset_all(&mut self) {
        let mut changed = false;
        for line in &mut self.lines {
            changed |= line.negotiated_price.take().is_some();
        }
        self.editing = None;
        if changed {
            self.dirty = true;
        }
    }

    pub fn totals(&self) -> Result<NegotiationTotals, ServiceError> {
        NegotiationTotals::from_lines(&self.lines)
    }

    /// Every eligible line with its override, `None` meaning "no override".
    pub fn pending_updates(&self) -> Vec<NegotiatedPriceUpdate> {
        self.lines
            .iter()
            .map(|line| NegotiatedPriceUpdate {
                material_name: line.material_name.clone(),
                negotiated_price: line.negotiated_price,
            })
            .collect()
    }

    /// Sends all prices in one call. On failure local edits are kept as-is.
    #[instrument(skip(self, api), fields(cr_id = self.cr_id))]
    pub async fn save_all(&mut self, api: &dyn ProcurementApi) -> Result<ApiMessage, ServiceError> {
        if !self.open {
            return Err(ServiceError::InvalidState(
                "Negotiation editor is closed".to_string(),
            ));
        }

        match api.update_negotiated_prices(self.cr_id, self.pending_updates()).await {
            Ok(message) => {
                info!(materials = self.lines.len(), "Negotiated prices saved");
                self.dirty = false;
                self.editing = None;
                self.open = false;
                Ok(message)
            }
            Err(err) => {
                warn!(error = %err, "Saving negotiated prices failed; keeping local edits");
                Err(err)
            }
        }
    }
}
