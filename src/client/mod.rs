//! Fetch layer: the backend contract the core consumes.

pub mod http;
pub mod session;

pub use http::HttpProcurementApi;
pub use session::Session;

use async_trait::async_trait;
use std::future::Future;
use strum::{Display, EnumIter};
use tracing::{debug, warn};

use crate::errors::ServiceError;
use crate::models::{
    ApiMessage, NegotiatedPriceUpdate, Page, PageRequest, PoChild, PurchaseOrder, RecordKey,
    StoreAvailability, VendorSelection,
};

/// Which purchase-order collection to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum PurchaseScope {
    Pending,
    Completed,
    Rejected,
}

/// Which POChild collection to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ChildScope {
    Pending,
    Approved,
}

/// Backend operations used by the buyer workflows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcurementApi: Send + Sync {
    async fn list_purchases(
        &self,
        scope: PurchaseScope,
        page: PageRequest,
    ) -> Result<Page<PurchaseOrder>, ServiceError>;

    async fn list_po_children(
        &self,
        scope: ChildScope,
        page: PageRequest,
    ) -> Result<Page<PoChild>, ServiceError>;

    async fn update_negotiated_prices(
        &self,
        cr_id: i64,
        prices: Vec<NegotiatedPriceUpdate>,
    ) -> Result<ApiMessage, ServiceError>;

    async fn check_store_availability(&self, cr_id: i64) -> Result<StoreAvailability, ServiceError>;

    async fn request_from_store(
        &self,
        cr_id: i64,
        material_names: Vec<String>,
    ) -> Result<ApiMessage, ServiceError>;

    async fn mark_complete(&self, target: RecordKey) -> Result<ApiMessage, ServiceError>;

    async fn resend_rejected(&self, cr_id: i64) -> Result<ApiMessage, ServiceError>;

    async fn select_vendor(
        &self,
        target: RecordKey,
        selection: VendorSelection,
    ) -> Result<ApiMessage, ServiceError>;
}

/// Walks a paginated endpoint until `has_next` is false or `max_pages` is hit.
pub async fn collect_pages<T, F, Fut>(
    per_page: u32,
    max_pages: u32,
    mut fetch: F,
) -> Result<Vec<T>, ServiceError>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>, ServiceError>>,
{
    let mut request = PageRequest::first(per_page);
    let mut items = Vec::new();

    loop {
        let page = fetch(request).await?;
        let received = page.items.len();
        let has_next = page.pagination.has_next;
        items.extend(page.items);

        debug!(page = request.page, received, has_next, "Fetched page");

        if !has_next || received == 0 {
            break;
        }
        if request.page >= max_pages {
            warn!(
                max_pages,
                total = page.pagination.total,
                "Stopped paging at the configured limit; list is truncated"
            );
            break;
        }
        request = request.next();
    }

    Ok(items)
}
