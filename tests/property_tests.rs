//! Property-based tests for the classification and negotiation pipeline.
//!
//! These tests use proptest to verify invariants across arbitrary workflow flag
//! combinations and price inputs.

use proptest::prelude::*;
use procurement_buyer::{
    models::{MaterialLine, OrderRecord, PoChild, PurchaseOrder, RejectionType, VendorSelectionStatus},
    services::{
        classify_child, classify_purchase, merge_records, Bucket, ClassifiedSnapshot,
        FetchedCollections, NegotiationTotals,
    },
};
use rust_decimal::Decimal;
use std::collections::HashSet;
use strum::IntoEnumIterator;

// Strategies for generating test data
fn purchase_strategy() -> impl Strategy<Value = PurchaseOrder> {
    (
        1i64..40,
        proptest::option::of(1i64..5),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        prop_oneof![Just(None), Just(Some("vendor_selection")), Just(Some("budget"))],
        proptest::option::of(0i64..2_000_000_000),
    )
        .prop_map(
            |(cr_id, vendor_id, pending_td, store_pending, store_approved, rejection, created)| {
                let mut po = PurchaseOrder::new(cr_id);
                po.vendor_id = vendor_id;
                po.vendor_selection_pending_td_approval = pending_td;
                po.store_requests_pending = store_pending;
                po.all_store_requests_approved = store_approved;
                po.rejection_type = rejection.map(|r| RejectionType::from(r.to_string()));
                po.created_at = created.and_then(|secs| {
                    chrono::DateTime::from_timestamp(secs, 0).map(|dt| dt.to_rfc3339())
                });
                po
            },
        )
}

fn child_strategy() -> impl Strategy<Value = PoChild> {
    (
        1i64..40,
        prop_oneof![
            Just("pending_td_approval"),
            Just("approved"),
            Just("rejected"),
            Just("on_hold"),
        ],
        prop_oneof![Just(None), Just(Some("purchase_completed")), Just(Some("open"))],
    )
        .prop_map(|(id, status, lifecycle)| {
            let mut child = PoChild::new(id, 1, VendorSelectionStatus::from(status.to_string()));
            child.status = lifecycle.map(str::to_string);
            child
        })
}

fn collections_strategy() -> impl Strategy<Value = FetchedCollections> {
    (
        prop::collection::vec(purchase_strategy(), 0..12),
        prop::collection::vec(purchase_strategy(), 0..6),
        prop::collection::vec(purchase_strategy(), 0..6),
        prop::collection::vec(child_strategy(), 0..8),
        prop::collection::vec(child_strategy(), 0..8),
    )
        .prop_map(
            |(pending, completed, rejected, pending_children, approved_children)| FetchedCollections {
                pending,
                completed,
                rejected,
                pending_children,
                approved_children,
            },
        )
}

fn line_strategy() -> impl Strategy<Value = MaterialLine> {
    (0i64..10_000, 0i64..1_000_000, proptest::option::of(0i64..1_000_000)).prop_map(
        |(quantity, original_cents, negotiated_cents)| {
            let mut line = MaterialLine::new(
                "Material",
                Decimal::new(quantity, 2),
                Decimal::new(original_cents, 2),
            );
            line.set_negotiated_price(negotiated_cents.map(|c| Decimal::new(c, 2)));
            line
        },
    )
}

// Reference rules for pending parents, listed in priority order.
fn rejected(po: &PurchaseOrder) -> bool {
    po.rejection_type.is_some()
}

fn store_requests_pending(po: &PurchaseOrder) -> bool {
    po.store_requests_pending
}

fn vendor_pending_td(po: &PurchaseOrder) -> bool {
    po.vendor_selection_pending_td_approval
}

fn store_approved(po: &PurchaseOrder) -> bool {
    po.vendor_id.is_none() && po.all_store_requests_approved
}

fn pending_purchase(po: &PurchaseOrder) -> bool {
    po.vendor_id.is_none() && !po.all_store_requests_approved
}

fn vendor_approved(po: &PurchaseOrder) -> bool {
    po.vendor_id.is_some()
}

const PARENT_RULES: [(fn(&PurchaseOrder) -> bool, Bucket); 6] = [
    (rejected, Bucket::Rejected),
    (store_requests_pending, Bucket::StoreRequestsPending),
    (vendor_pending_td, Bucket::VendorPendingTd),
    (store_approved, Bucket::StoreApproved),
    (pending_purchase, Bucket::PendingPurchase),
    (vendor_approved, Bucket::VendorApproved),
];

// Property: every record lands in exactly one bucket
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn purchase_classification_matches_first_rule(po in purchase_strategy()) {
        let expected = PARENT_RULES
            .iter()
            .find(|(applies, _)| applies(&po))
            .map(|(_, bucket)| *bucket);
        prop_assert_eq!(Some(classify_purchase(&po)), expected);
        prop_assert_ne!(classify_purchase(&po), Bucket::Completed);
    }

    #[test]
    fn ongoing_rules_are_disjoint(po in purchase_strategy()) {
        let matching = [store_approved(&po), pending_purchase(&po), vendor_approved(&po)]
            .into_iter()
            .filter(|applies| *applies)
            .count();
        prop_assert_eq!(matching, 1);
    }

    #[test]
    fn purchase_completed_children_are_completed(child in child_strategy()) {
        let bucket = classify_child(&child);
        if child.status.as_deref() == Some("purchase_completed") {
            prop_assert_eq!(bucket, Bucket::Completed);
        } else {
            prop_assert_ne!(bucket, Bucket::PendingPurchase);
            prop_assert_ne!(bucket, Bucket::StoreApproved);
        }
    }
}

// Property: statistics agree with the rendered tabs and count unique records
proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn stats_total_equals_unique_records(collections in collections_strategy()) {
        let snapshot = ClassifiedSnapshot::classify(&collections);
        let stats = snapshot.stats();

        let mut unique = HashSet::new();
        for po in collections.completed.iter().chain(&collections.rejected).chain(&collections.pending) {
            unique.insert(OrderRecord::Purchase(po.clone()).key());
        }
        for child in collections.approved_children.iter().chain(&collections.pending_children) {
            unique.insert(OrderRecord::PoChild(child.clone()).key());
        }

        prop_assert_eq!(stats.total(), unique.len());
        prop_assert_eq!(snapshot.len(), unique.len());
        prop_assert_eq!(snapshot.duplicates_dropped(), collections.raw_len() - unique.len());
    }

    #[test]
    fn each_key_is_in_exactly_one_bucket(collections in collections_strategy()) {
        let snapshot = ClassifiedSnapshot::classify(&collections);
        let mut seen = HashSet::new();
        for bucket in Bucket::iter() {
            for record in snapshot.bucket(bucket) {
                prop_assert!(seen.insert(record.key()), "{} listed twice", record.key());
            }
        }
    }

    #[test]
    fn merged_feed_is_newest_first(collections in collections_strategy()) {
        let records = collections
            .pending
            .into_iter()
            .map(OrderRecord::from)
            .chain(collections.pending_children.into_iter().map(OrderRecord::from));
        let merged = merge_records(records);
        for pair in merged.windows(2) {
            prop_assert!(pair[0].sort_timestamp() >= pair[1].sort_timestamp());
        }
    }
}

// Property: negotiation totals are well defined for any price set
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn diff_is_current_minus_original(lines in prop::collection::vec(line_strategy(), 0..10)) {
        let totals = NegotiationTotals::from_lines(&lines).unwrap();
        prop_assert_eq!(totals.diff, totals.current_total - totals.original_total);
        if totals.original_total.is_zero() {
            prop_assert!(totals.diff_percentage.is_zero());
        }
    }

    #[test]
    fn unchanged_prices_never_count_as_negotiated(price in 0i64..1_000_000) {
        let original = Decimal::new(price, 2);
        let mut line = MaterialLine::new("Cement", Decimal::ONE, original);
        line.set_negotiated_price(Some(original));
        prop_assert!(!line.has_negotiation());
        prop_assert_eq!(line.negotiated_price, None);
    }
}
