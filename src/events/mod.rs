//! Change notifications pushed by the backend.
//!
//! The workspace does not care what changed, only that something did; payloads
//! are kept for logging and for consumers that want to react more precisely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::models::{OrderRecord, RecordKey};

/// Backend tables whose changes invalidate the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChangeTable {
    Purchases,
    PoChildren,
    StoreRequests,
}

/// Kind of row operation behind a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeNotification {
    pub table: ChangeTable,
    pub kind: ChangeKind,
    /// Row as the backend saw it after the change, when it sent one.
    #[serde(default)]
    pub record: Option<serde_json::Value>,
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

impl ChangeNotification {
    pub fn new(table: ChangeTable, kind: ChangeKind) -> Self {
        Self {
            table,
            kind,
            record: None,
            received_at: Utc::now(),
        }
    }

    pub fn with_record(mut self, record: serde_json::Value) -> Self {
        self.record = Some(record);
        self
    }

    /// Key of the changed row, if the payload decodes as a purchase or PO child.
    pub fn record_key(&self) -> Option<RecordKey> {
        let raw = self.record.clone()?;
        match OrderRecord::from_wire(raw) {
            Ok(record) => Some(record.key()),
            Err(e) => {
                debug!(table = %self.table, error = %e, "Change payload is not an order record");
                None
            }
        }
    }
}

/// Observer seam for realtime change feeds.
pub trait ChangeSource: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<ChangeNotification>;
}

/// In-process change feed backed by a broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastChangeSource {
    sender: broadcast::Sender<ChangeNotification>,
}

impl BroadcastChangeSource {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes a notification. Returns how many subscribers received it.
    pub fn publish(&self, notification: ChangeNotification) -> usize {
        match self.sender.send(notification) {
            Ok(receivers) => receivers,
            Err(_) => {
                warn!("Change notification dropped: no subscribers");
                0
            }
        }
    }
}

impl Default for BroadcastChangeSource {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ChangeSource for BroadcastChangeSource {
    fn subscribe(&self) -> broadcast::Receiver<ChangeNotification> {
        self.sender.subscribe()
    }
}
