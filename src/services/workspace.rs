use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strum::IntoEnumIterator;
use tokio::sync::{broadcast::error::RecvError, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use super::aggregator::{ClassifiedSnapshot, FetchedCollections, PurchaseStats, TabCounts};
use super::classifier::Bucket;
use super::negotiation::NegotiationEditor;
use super::store_selection::{StoreRequestOutcome, StoreSelector};
use crate::client::{collect_pages, ChildScope, ProcurementApi, PurchaseScope};
use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::events::ChangeSource;
use crate::models::{ApiMessage, OrderRecord, PurchaseOrder, RecordKey, VendorSelection};

/// Everything the tab list and dashboard render from one refresh.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardView {
    #[serde(skip)]
    pub snapshot: ClassifiedSnapshot,
    pub stats: PurchaseStats,
    pub tab_counts: TabCounts,
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Set when the latest refresh failed; the data is from the last good one.
    pub last_error: Option<String>,
}

impl DashboardView {
    fn from_snapshot(snapshot: ClassifiedSnapshot) -> Self {
        Self {
            stats: snapshot.stats(),
            tab_counts: snapshot.tab_counts(),
            snapshot,
            refreshed_at: Some(Utc::now()),
            last_error: None,
        }
    }

    pub fn record(&self, key: RecordKey) -> Option<&OrderRecord> {
        Bucket::iter()
            .flat_map(|bucket| self.snapshot.bucket(bucket))
            .find(|record| record.key() == key)
    }

    pub fn purchase(&self, cr_id: i64) -> Option<&PurchaseOrder> {
        match self.record(RecordKey::Purchase(cr_id)) {
            Some(OrderRecord::Purchase(po)) => Some(po),
            _ => None,
        }
    }
}

/// Removes its action key from the in-flight set when dropped.
struct InFlightGuard<'a> {
    actions: &'a Mutex<HashSet<String>>,
    key: String,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(actions: &'a Mutex<HashSet<String>>, key: String) -> Result<Self, ServiceError> {
        let mut set = actions
            .lock()
            .map_err(|_| ServiceError::InvalidState("action registry poisoned".to_string()))?;
        if !set.insert(key.clone()) {
            return Err(ServiceError::ActionInFlight(key));
        }
        Ok(Self { actions, key })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut set) = self.actions.lock() {
            set.remove(&self.key);
        }
    }
}

/// Owns the refresh cycle and every buyer mutation.
///
/// Each successful mutation waits `refresh_delay` for the backend to settle,
/// then re-runs fetch, classify and aggregate. Subscribers get the new view
/// through a watch channel.
pub struct BuyerWorkspace {
    api: Arc<dyn ProcurementApi>,
    page_size: u32,
    max_pages: u32,
    refresh_delay: Duration,
    view: watch::Sender<Arc<DashboardView>>,
    in_flight: Mutex<HashSet<String>>,
}

impl BuyerWorkspace {
    pub fn new(api: Arc<dyn ProcurementApi>, config: &AppConfig) -> Self {
        let (view, _) = watch::channel(Arc::new(DashboardView::default()));
        Self {
            api,
            page_size: config.page_size,
            max_pages: config.max_pages,
            refresh_delay: config.refresh_delay(),
            view,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn api(&self) -> &dyn ProcurementApi {
        self.api.as_ref()
    }

    /// Latest published view.
    pub fn view(&self) -> Arc<DashboardView> {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardView>> {
        self.view.subscribe()
    }

    async fn fetch_all(&self) -> Result<FetchedCollections, ServiceError> {
        let api = self.api.as_ref();
        let (per_page, max_pages) = (self.page_size, self.max_pages);

        let (pending, completed, rejected, pending_children, approved_children) = tokio::try_join!(
            collect_pages(per_page, max_pages, |page| api.list_purchases(PurchaseScope::Pending, page)),
            collect_pages(per_page, max_pages, |page| api.list_purchases(PurchaseScope::Completed, page)),
            collect_pages(per_page, max_pages, |page| api.list_purchases(PurchaseScope::Rejected, page)),
            collect_pages(per_page, max_pages, |page| api.list_po_children(ChildScope::Pending, page)),
            collect_pages(per_page, max_pages, |page| api.list_po_children(ChildScope::Approved, page)),
        )?;

        Ok(FetchedCollections {
            pending,
            completed,
            rejected,
            pending_children,
            approved_children,
        })
    }

    /// Re-runs the whole pipeline and publishes the result.
    ///
    /// On failure the previous data stays published with `last_error` set.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Arc<DashboardView>, ServiceError> {
        match self.fetch_all().await {
            Ok(collections) => {
                let snapshot = ClassifiedSnapshot::classify(&collections);
                let view = Arc::new(DashboardView::from_snapshot(snapshot));
                info!(
                    fetched = collections.raw_len(),
                    unique = view.stats.total(),
                    duplicates = view.snapshot.duplicates_dropped(),
                    "Dashboard refreshed"
                );
                self.view.send_replace(view.clone());
                Ok(view)
            }
            Err(err) => {
                error!(error = %err, "Dashboard refresh failed; keeping previous data");
                let previous = self.view();
                let view = Arc::new(DashboardView {
                    last_error: Some(err.user_message()),
                    ..(*previous).clone()
                });
                self.view.send_replace(view);
                Err(err)
            }
        }
    }

    /// Runs one mutation under the in-flight guard, then waits and refreshes.
    async fn run_action<T, Fut>(&self, key: String, action: Fut) -> Result<T, ServiceError>
    where
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let _guard = InFlightGuard::acquire(&self.in_flight, key.clone())?;
        let value = action.await?;
        info!(action = %key, "Action succeeded; refreshing");

        if !self.refresh_delay.is_zero() {
            tokio::time::sleep(self.refresh_delay).await;
        }
        if let Err(e) = self.refresh().await {
            warn!(action = %key, error = %e, "Refresh after action failed");
        }
        Ok(value)
    }

    #[instrument(skip(self, target), fields(target = %target))]
    pub async fn mark_complete(&self, target: RecordKey) -> Result<ApiMessage, ServiceError> {
        self.run_action(format!("complete:{}", target), self.api.mark_complete(target))
            .await
    }

    #[instrument(skip(self))]
    pub async fn resend_rejected(&self, cr_id: i64) -> Result<ApiMessage, ServiceError> {
        self.run_action(
            format!("resend:{}", RecordKey::Purchase(cr_id)),
            self.api.resend_rejected(cr_id),
        )
        .await
    }

    #[instrument(skip(self, target), fields(target = %target))]
    pub async fn select_vendor(&self, target: RecordKey, vendor_id: i64) -> Result<ApiMessage, ServiceError> {
        if vendor_id <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "Invalid vendor id {}",
                vendor_id
            )));
        }
        self.run_action(
            format!("vendor:{}", target),
            self.api.select_vendor(target, VendorSelection { vendor_id }),
        )
        .await
    }

    /// Opens a price editor on a purchase from the current view.
    pub fn open_negotiation(&self, cr_id: i64) -> Result<NegotiationEditor, ServiceError> {
        let view = self.view();
        let po = view
            .purchase(cr_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Purchase PO-{} is not loaded", cr_id)))?;
        Ok(NegotiationEditor::open(po))
    }

    pub async fn save_negotiation(&self, editor: &mut NegotiationEditor) -> Result<ApiMessage, ServiceError> {
        let key = format!("negotiate:{}", RecordKey::Purchase(editor.cr_id()));
        let api = self.api.as_ref();
        self.run_action(key, editor.save_all(api)).await
    }

    pub async fn request_from_store(
        &self,
        selector: &mut StoreSelector,
    ) -> Result<StoreRequestOutcome, ServiceError> {
        let key = format!("store:{}", RecordKey::Purchase(selector.cr_id()));
        let api = self.api.as_ref();
        self.run_action(key, selector.confirm(api)).await
    }

    /// Refreshes on every change notification until the source closes.
    pub fn watch_changes(self: Arc<Self>, source: &dyn ChangeSource) -> JoinHandle<()> {
        let mut changes = source.subscribe();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        debug!(
                            table = %change.table,
                            kind = %change.kind,
                            key = ?change.record_key(),
                            "Change notification received"
                        );
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Change feed lagged; refreshing once");
                    }
                    Err(RecvError::Closed) => {
                        info!("Change feed closed");
                        break;
                    }
                }
                if let Err(e) = self.refresh().await {
                    warn!(error = %e, "Refresh after change notification failed");
                }
            }
        })
    }
}
