use std::cmp::Reverse;

use crate::models::{OrderRecord, PoChild, PurchaseOrder};

/// Merges parents and children into one feed, newest `created_at` first.
///
/// Missing or unparseable timestamps count as epoch 0 and sink to the end.
/// Ties have no guaranteed order.
pub fn merge_timeline(purchases: Vec<PurchaseOrder>, children: Vec<PoChild>) -> Vec<OrderRecord> {
    merge_records(
        purchases
            .into_iter()
            .map(OrderRecord::from)
            .chain(children.into_iter().map(OrderRecord::from)),
    )
}

pub fn merge_records(records: impl IntoIterator<Item = OrderRecord>) -> Vec<OrderRecord> {
    let mut merged: Vec<OrderRecord> = records.into_iter().collect();
    merged.sort_unstable_by_key(|record| Reverse(record.sort_timestamp()));
    merged
}
