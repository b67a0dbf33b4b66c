//! Workflow bucket assignment for purchase orders and split children.
//!
//! Parent priority, first match wins:
//!
//! 1. `Rejected` when a rejection type is recorded
//! 2. `StoreRequestsPending` when store requests await approval
//! 3. `VendorPendingTd` when the vendor selection awaits TD approval
//! 4. `StoreApproved` when there is no vendor and every store request was approved
//! 5. `PendingPurchase` when there is no vendor
//! 6. `VendorApproved` otherwise
//!
//! Store rules sit above vendor rules: an order that is store-pending and also
//! carries a vendor is reported as store-pending. `Completed` is never inferred
//! from flags; it is assigned to records from the completed collection.

use serde::Serialize;
use strum::{Display, EnumIter};
use tracing::warn;

use crate::models::{PoChild, PurchaseOrder, VendorSelectionStatus};

/// Mutually exclusive workflow bucket.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Bucket {
    PendingPurchase,
    StoreApproved,
    VendorApproved,
    StoreRequestsPending,
    VendorPendingTd,
    Completed,
    Rejected,
}

/// Top-level tab a bucket is listed under.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Tab {
    Ongoing,
    PendingApproval,
    Completed,
    Rejected,
}

impl Bucket {
    pub fn tab(self) -> Tab {
        match self {
            Bucket::PendingPurchase | Bucket::StoreApproved | Bucket::VendorApproved => Tab::Ongoing,
            Bucket::StoreRequestsPending | Bucket::VendorPendingTd => Tab::PendingApproval,
            Bucket::Completed => Tab::Completed,
            Bucket::Rejected => Tab::Rejected,
        }
    }
}

impl Tab {
    pub fn buckets(self) -> &'static [Bucket] {
        match self {
            Tab::Ongoing => &[
                Bucket::PendingPurchase,
                Bucket::StoreApproved,
                Bucket::VendorApproved,
            ],
            Tab::PendingApproval => &[Bucket::StoreRequestsPending, Bucket::VendorPendingTd],
            Tab::Completed => &[Bucket::Completed],
            Tab::Rejected => &[Bucket::Rejected],
        }
    }
}

/// Classifies a parent from the pending collection.
pub fn classify_purchase(po: &PurchaseOrder) -> Bucket {
    if po.is_rejected() {
        return Bucket::Rejected;
    }
    if po.store_requests_pending {
        return Bucket::StoreRequestsPending;
    }
    if po.vendor_selection_pending_td_approval {
        return Bucket::VendorPendingTd;
    }
    match po.vendor_id {
        None if po.all_store_requests_approved => Bucket::StoreApproved,
        None => Bucket::PendingPurchase,
        Some(_) => Bucket::VendorApproved,
    }
}

/// Classifies a child by its own status; parent flags are never consulted.
pub fn classify_child(child: &PoChild) -> Bucket {
    if child.is_purchase_completed() {
        return Bucket::Completed;
    }
    match &child.vendor_selection_status {
        VendorSelectionStatus::PendingTdApproval => Bucket::VendorPendingTd,
        VendorSelectionStatus::Approved => Bucket::VendorApproved,
        VendorSelectionStatus::Rejected => Bucket::Rejected,
        VendorSelectionStatus::Unknown(raw) => {
            warn!(
                po_child_id = child.id,
                status = %raw,
                "Unrecognized vendor selection status; treating as pending TD approval"
            );
            Bucket::VendorPendingTd
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RejectionType;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    fn po() -> PurchaseOrder {
        PurchaseOrder::new(1)
    }

    #[test]
    fn order_without_flags_is_pending_purchase() {
        assert_eq!(classify_purchase(&po()), Bucket::PendingPurchase);
    }

    #[test]
    fn store_approved_without_vendor_is_not_pending_purchase() {
        let mut order = po();
        order.all_store_requests_approved = true;
        assert_eq!(classify_purchase(&order), Bucket::StoreApproved);
    }

    #[test]
    fn vendor_selection_rejection_overrides_every_flag() {
        let mut order = po();
        order.rejection_type = Some(RejectionType::VendorSelection);
        order.vendor_id = Some(4);
        order.store_requests_pending = true;
        order.vendor_selection_pending_td_approval = true;
        order.all_store_requests_approved = true;
        assert_eq!(classify_purchase(&order), Bucket::Rejected);
    }

    #[test]
    fn store_pending_takes_priority_over_vendor_paths() {
        let mut order = po();
        order.store_requests_pending = true;
        order.vendor_id = Some(9);
        assert_eq!(classify_purchase(&order), Bucket::StoreRequestsPending);

        order.vendor_selection_pending_td_approval = true;
        assert_eq!(classify_purchase(&order), Bucket::StoreRequestsPending);
    }

    #[rstest]
    #[case(Some(3), false, Bucket::VendorApproved)]
    #[case(Some(3), true, Bucket::VendorPendingTd)]
    #[case(None, true, Bucket::VendorPendingTd)]
    fn vendor_paths(#[case] vendor_id: Option<i64>, #[case] pending_td: bool, #[case] expected: Bucket) {
        let mut order = po();
        order.vendor_id = vendor_id;
        order.vendor_selection_pending_td_approval = pending_td;
        assert_eq!(classify_purchase(&order), expected);
    }

    #[test]
    fn vendor_with_all_store_approved_is_vendor_approved() {
        let mut order = po();
        order.vendor_id = Some(2);
        order.all_store_requests_approved = true;
        assert_eq!(classify_purchase(&order), Bucket::VendorApproved);
    }

    #[rstest]
    #[case(VendorSelectionStatus::PendingTdApproval, None, Bucket::VendorPendingTd)]
    #[case(VendorSelectionStatus::Approved, None, Bucket::VendorApproved)]
    #[case(VendorSelectionStatus::Rejected, None, Bucket::Rejected)]
    #[case(VendorSelectionStatus::Approved, Some("purchase_completed"), Bucket::Completed)]
    #[case(VendorSelectionStatus::Unknown("on_hold".into()), None, Bucket::VendorPendingTd)]
    fn child_classification(
        #[case] status: VendorSelectionStatus,
        #[case] marker: Option<&str>,
        #[case] expected: Bucket,
    ) {
        let mut child = PoChild::new(1, 1, status);
        child.status = marker.map(str::to_string);
        assert_eq!(classify_child(&child), expected);
    }

    #[test]
    fn every_bucket_belongs_to_exactly_one_tab() {
        for bucket in Bucket::iter() {
            let owners = Tab::iter().filter(|tab| tab.buckets().contains(&bucket)).count();
            assert_eq!(owners, 1, "{} listed under {} tabs", bucket, owners);
            assert!(bucket.tab().buckets().contains(&bucket));
        }
    }
}
