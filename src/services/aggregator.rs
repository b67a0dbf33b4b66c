use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use super::classifier::{classify_child, classify_purchase, Bucket, Tab};
use super::timeline::merge_records;
use crate::models::{OrderRecord, PoChild, PurchaseOrder, RecordKey};

/// Everything one refresh cycle fetched from the backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedCollections {
    pub pending: Vec<PurchaseOrder>,
    pub completed: Vec<PurchaseOrder>,
    pub rejected: Vec<PurchaseOrder>,
    pub pending_children: Vec<PoChild>,
    pub approved_children: Vec<PoChild>,
}

impl FetchedCollections {
    /// Raw item count across every source collection, duplicates included.
    pub fn raw_len(&self) -> usize {
        self.pending.len()
            + self.completed.len()
            + self.rejected.len()
            + self.pending_children.len()
            + self.approved_children.len()
    }
}

/// Records grouped by bucket, each record appearing exactly once.
///
/// Both the tab list and the dashboard read from this; neither fetches its
/// own summary, so their counts cannot drift apart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedSnapshot {
    buckets: BTreeMap<Bucket, Vec<OrderRecord>>,
    duplicates_dropped: usize,
}

impl ClassifiedSnapshot {
    /// Duplicates keep the first sighting in this order: completed parents,
    /// rejected parents, pending parents, approved children, pending children.
    pub fn classify(collections: &FetchedCollections) -> Self {
        let mut snapshot = Self::default();
        let mut seen: HashSet<RecordKey> = HashSet::new();

        let parents = collections
            .completed
            .iter()
            .map(|po| (Bucket::Completed, po))
            .chain(collections.rejected.iter().map(|po| (Bucket::Rejected, po)))
            .chain(collections.pending.iter().map(|po| (classify_purchase(po), po)));

        for (bucket, po) in parents {
            snapshot.insert(&mut seen, bucket, OrderRecord::Purchase(po.clone()));
        }

        let children = collections
            .approved_children
            .iter()
            .chain(collections.pending_children.iter());

        for child in children {
            snapshot.insert(&mut seen, classify_child(child), OrderRecord::PoChild(child.clone()));
        }

        snapshot
    }

    fn insert(&mut self, seen: &mut HashSet<RecordKey>, bucket: Bucket, record: OrderRecord) {
        let key = record.key();
        if !seen.insert(key) {
            debug!(%key, %bucket, "Skipping record already classified from another collection");
            self.duplicates_dropped += 1;
            return;
        }
        self.buckets.entry(bucket).or_default().push(record);
    }

    pub fn bucket(&self, bucket: Bucket) -> &[OrderRecord] {
        self.buckets.get(&bucket).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All records listed under a tab, in bucket order.
    pub fn tab(&self, tab: Tab) -> Vec<&OrderRecord> {
        tab.buckets()
            .iter()
            .flat_map(|bucket| self.bucket(*bucket))
            .collect()
    }

    pub fn bucket_of(&self, key: RecordKey) -> Option<Bucket> {
        self.buckets
            .iter()
            .find(|(_, records)| records.iter().any(|r| r.key() == key))
            .map(|(bucket, _)| *bucket)
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }

    /// Pending-TD parents and pending children in one list, newest first.
    pub fn pending_approval_items(&self) -> Vec<OrderRecord> {
        merge_records(self.tab(Tab::PendingApproval).into_iter().cloned())
    }

    /// Vendor-approved parents and approved children in one list, newest first.
    pub fn vendor_approved_feed(&self) -> Vec<OrderRecord> {
        merge_records(self.bucket(Bucket::VendorApproved).iter().cloned())
    }

    pub fn stats(&self) -> PurchaseStats {
        let mut stats = PurchaseStats::default();
        for (bucket, records) in &self.buckets {
            for record in records {
                stats.count(*bucket, record.is_child());
            }
        }
        stats
    }

    pub fn tab_counts(&self) -> TabCounts {
        TabCounts::from(&self.stats())
    }
}

/// Per-bucket counts split by parent and child.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurchaseStats {
    pub pending_purchase: usize,
    pub store_approved: usize,
    pub vendor_approved: usize,
    pub approved_children: usize,
    pub store_pending: usize,
    pub vendor_pending_td: usize,
    pub pending_children: usize,
    pub completed_parents: usize,
    pub completed_children: usize,
    pub rejected_parents: usize,
    pub rejected_children: usize,
}

impl PurchaseStats {
    fn count(&mut self, bucket: Bucket, is_child: bool) {
        let slot = match (bucket, is_child) {
            (Bucket::PendingPurchase, _) => &mut self.pending_purchase,
            (Bucket::StoreApproved, _) => &mut self.store_approved,
            (Bucket::VendorApproved, false) => &mut self.vendor_approved,
            (Bucket::VendorApproved, true) => &mut self.approved_children,
            (Bucket::StoreRequestsPending, _) => &mut self.store_pending,
            (Bucket::VendorPendingTd, false) => &mut self.vendor_pending_td,
            (Bucket::VendorPendingTd, true) => &mut self.pending_children,
            (Bucket::Completed, false) => &mut self.completed_parents,
            (Bucket::Completed, true) => &mut self.completed_children,
            (Bucket::Rejected, false) => &mut self.rejected_parents,
            (Bucket::Rejected, true) => &mut self.rejected_children,
        };
        *slot += 1;
    }

    pub fn ongoing(&self) -> usize {
        self.pending_purchase + self.store_approved + self.vendor_approved + self.approved_children
    }

    pub fn pending_approval(&self) -> usize {
        self.store_pending + self.vendor_pending_td + self.pending_children
    }

    pub fn completed(&self) -> usize {
        self.completed_parents + self.completed_children
    }

    pub fn rejected(&self) -> usize {
        self.rejected_parents + self.rejected_children
    }

    pub fn total(&self) -> usize {
        self.ongoing() + self.pending_approval() + self.completed() + self.rejected()
    }
}

/// Badge counts for the four tabs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TabCounts {
    pub ongoing: usize,
    pub pending_approval: usize,
    pub completed: usize,
    pub rejected: usize,
}

impl From<&PurchaseStats> for TabCounts {
    fn from(stats: &PurchaseStats) -> Self {
        Self {
            ongoing: stats.ongoing(),
            pending_approval: stats.pending_approval(),
            completed: stats.completed(),
            rejected: stats.rejected(),
        }
    }
}

impl TabCounts {
    pub fn get(&self, tab: Tab) -> usize {
        match tab {
            Tab::Ongoing => self.ongoing,
            Tab::PendingApproval => self.pending_approval,
            Tab::Completed => self.completed,
            Tab::Rejected => self.rejected,
        }
    }
}
