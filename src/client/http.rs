use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, instrument};
use url::Url;

use super::{ChildScope, ProcurementApi, PurchaseScope, Session};
use crate::config::AppConfig;
use crate::errors::{ResultExt, ServiceError};
use crate::models::{
    ApiMessage, NegotiatedPriceUpdate, OrderRecord, Page, PageRequest, PoChild, PurchaseOrder,
    RecordKey, StoreAvailability, VendorSelection,
};

const PURCHASES_PATH: &str = "api/buyer/purchases";
const PO_CHILDREN_PATH: &str = "api/buyer/po-children";

/// reqwest-backed client for the procurement REST API.
#[derive(Clone, Debug)]
pub struct HttpProcurementApi {
    client: Client,
    base_url: Url,
    session: Session,
}

impl HttpProcurementApi {
    pub fn new(config: &AppConfig, session: Session) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ServiceError::ConfigError(format!("failed to build HTTP client: {}", e)))?;

        Self::with_client(client, &config.api_base_url, session)
    }

    pub fn with_client(client: Client, base_url: &str, session: Session) -> Result<Self, ServiceError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ServiceError::ConfigError(format!("invalid api_base_url '{}': {}", base_url, e)))?;
        // Url::join drops the last segment unless the base ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        self.base_url
            .join(path)
            .map_err(|e| ServiceError::ConfigError(format!("invalid endpoint '{}': {}", path, e)))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.session.access_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<String, ServiceError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            Ok(body)
        } else {
            let err = ServiceError::from_response(status, &body);
            error!(%status, error = %err, "Procurement API request failed");
            Err(err)
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ServiceError> {
        let body = self.send(self.request(Method::GET, url)).await?;
        serde_json::from_str(&body).map_err_to_service()
    }

    async fn mutate<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: &B,
    ) -> Result<ApiMessage, ServiceError> {
        let url = self.endpoint(path)?;
        let body = self.send(self.request(method, url).json(payload)).await?;
        if body.trim().is_empty() {
            return Ok(ApiMessage::default());
        }
        serde_json::from_str(&body).map_err_to_service()
    }

    async fn list_records(&self, path: &str, page: PageRequest) -> Result<Page<OrderRecord>, ServiceError> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut()
            .append_pair("page", &page.page.to_string())
            .append_pair("per_page", &page.per_page.to_string());

        let raw: Value = self.get_json(url).await?;
        let raw_page = match raw {
            Value::Array(items) => Page::complete(items),
            other => serde_json::from_value::<Page<Value>>(other)?,
        };

        let pagination = raw_page.pagination;
        let items = raw_page
            .items
            .into_iter()
            .map(OrderRecord::from_wire)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(path, page = page.page, items = items.len(), "Decoded list page");
        Ok(Page { items, pagination })
    }

    fn target_path(target: RecordKey, action: &str) -> String {
        match target {
            RecordKey::Purchase(cr_id) => format!("{}/{}/{}", PURCHASES_PATH, cr_id, action),
            RecordKey::PoChild(id) => format!("{}/{}/{}", PO_CHILDREN_PATH, id, action),
        }
    }
}

fn expect_purchase(record: OrderRecord) -> Result<PurchaseOrder, ServiceError> {
    match record {
        OrderRecord::Purchase(po) => Ok(po),
        other => Err(ServiceError::SerializationError(format!(
            "expected a purchase order, received {}",
            other.key()
        ))),
    }
}

fn expect_child(record: OrderRecord) -> Result<PoChild, ServiceError> {
    match record {
        OrderRecord::PoChild(child) => Ok(child),
        other => Err(ServiceError::SerializationError(format!(
            "expected a PO child, received {}",
            other.key()
        ))),
    }
}

fn collect_page<T>(
    page: Page<OrderRecord>,
    convert: fn(OrderRecord) -> Result<T, ServiceError>,
) -> Result<Page<T>, ServiceError> {
    let items = page
        .items
        .into_iter()
        .map(convert)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Page {
        items,
        pagination: page.pagination,
    })
}

#[async_trait]
impl ProcurementApi for HttpProcurementApi {
    #[instrument(skip(self))]
    async fn list_purchases(
        &self,
        scope: PurchaseScope,
        page: PageRequest,
    ) -> Result<Page<PurchaseOrder>, ServiceError> {
        let path = format!("{}/{}", PURCHASES_PATH, scope);
        collect_page(self.list_records(&path, page).await?, expect_purchase)
    }

    #[instrument(skip(self))]
    async fn list_po_children(
        &self,
        scope: ChildScope,
        page: PageRequest,
    ) -> Result<Page<PoChild>, ServiceError> {
        let path = format!("{}/{}", PO_CHILDREN_PATH, scope);
        collect_page(self.list_records(&path, page).await?, expect_child)
    }

    #[instrument(skip(self, prices), fields(materials = prices.len()))]
    async fn update_negotiated_prices(
        &self,
        cr_id: i64,
        prices: Vec<NegotiatedPriceUpdate>,
    ) -> Result<ApiMessage, ServiceError> {
        let path = format!("{}/{}/negotiated-prices", PURCHASES_PATH, cr_id);
        self.mutate(Method::PUT, &path, &json!({ "materials": prices }))
            .await
    }

    #[instrument(skip(self))]
    async fn check_store_availability(&self, cr_id: i64) -> Result<StoreAvailability, ServiceError> {
        let url = self.endpoint(&format!("{}/{}/store-availability", PURCHASES_PATH, cr_id))?;
        self.get_json(url).await
    }

    #[instrument(skip(self, material_names), fields(materials = material_names.len()))]
    async fn request_from_store(
        &self,
        cr_id: i64,
        material_names: Vec<String>,
    ) -> Result<ApiMessage, ServiceError> {
        let path = format!("{}/{}/store-requests", PURCHASES_PATH, cr_id);
        self.mutate(Method::POST, &path, &json!({ "material_names": material_names }))
            .await
    }

    #[instrument(skip(self, target), fields(target = %target))]
    async fn mark_complete(&self, target: RecordKey) -> Result<ApiMessage, ServiceError> {
        self.mutate(Method::POST, &Self::target_path(target, "complete"), &json!({}))
            .await
    }

    #[instrument(skip(self))]
    async fn resend_rejected(&self, cr_id: i64) -> Result<ApiMessage, ServiceError> {
        self.mutate(
            Method::POST,
            &Self::target_path(RecordKey::Purchase(cr_id), "resend"),
            &json!({}),
        )
        .await
    }

    #[instrument(skip(self, target), fields(target = %target))]
    async fn select_vendor(
        &self,
        target: RecordKey,
        selection: VendorSelection,
    ) -> Result<ApiMessage, ServiceError> {
        self.mutate(Method::POST, &Self::target_path(target, "vendor"), &selection)
            .await
    }
}
