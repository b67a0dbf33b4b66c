#![allow(dead_code)]

use std::sync::Arc;

use procurement_buyer::{
    client::{HttpProcurementApi, Session},
    config::AppConfig,
    services::BuyerWorkspace,
};
use serde_json::{json, Value};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const TOKEN: &str = "buyer-token";

/// Helper harness for driving the real HTTP client against a mock backend.
pub struct TestBackend {
    pub server: MockServer,
}

impl TestBackend {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn config(&self) -> AppConfig {
        let mut config = AppConfig::new(self.server.uri(), Some(TOKEN.to_string()));
        config.refresh_delay_ms = 0;
        config.page_size = 2;
        config
    }

    pub fn api(&self) -> HttpProcurementApi {
        let config = self.config();
        HttpProcurementApi::new(&config, Session::from_config(&config))
            .expect("client should build against mock server")
    }

    pub fn workspace(&self) -> BuyerWorkspace {
        BuyerWorkspace::new(Arc::new(self.api()), &self.config())
    }

    /// Serves `items` as one complete page on a list endpoint.
    pub async fn serve_list(&self, list_path: &str, items: Vec<Value>) {
        let total = items.len();
        Mock::given(method("GET"))
            .and(path(list_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": items,
                "pagination": {
                    "page": 1,
                    "per_page": total,
                    "total": total,
                    "pages": 1,
                    "has_next": false,
                    "has_prev": false
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// Mounts every list endpoint with no records.
    pub async fn serve_empty_lists(&self) {
        for list_path in LIST_PATHS {
            self.serve_list(list_path, vec![]).await;
        }
    }
}

pub const PENDING_PURCHASES: &str = "/api/buyer/purchases/pending";
pub const COMPLETED_PURCHASES: &str = "/api/buyer/purchases/completed";
pub const REJECTED_PURCHASES: &str = "/api/buyer/purchases/rejected";
pub const PENDING_CHILDREN: &str = "/api/buyer/po-children/pending";
pub const APPROVED_CHILDREN: &str = "/api/buyer/po-children/approved";

pub const LIST_PATHS: [&str; 5] = [
    PENDING_PURCHASES,
    COMPLETED_PURCHASES,
    REJECTED_PURCHASES,
    PENDING_CHILDREN,
    APPROVED_CHILDREN,
];

pub fn purchase_json(cr_id: i64, created_at: &str) -> Value {
    json!({
        "cr_id": cr_id,
        "project_name": "Riverside Tower",
        "item_name": "Foundation works",
        "created_at": created_at,
        "vendor_id": null,
        "store_requests_pending": null,
        "materials": [
            {
                "material_name": "Cement",
                "quantity": 10,
                "unit": "bags",
                "original_unit_price": 350.0,
                "negotiated_price": null
            },
            {
                "material_name": "Sand",
                "quantity": 4,
                "unit": "m3",
                "original_unit_price": 1200.0,
                "routed_to_store": true
            }
        ]
    })
}

pub fn child_json(id: i64, parent_cr_id: i64, status: &str, created_at: &str) -> Value {
    json!({
        "id": id,
        "parent_cr_id": parent_cr_id,
        "vendor_id": 7,
        "vendor_name": "Acme Supplies",
        "vendor_selection_status": status,
        "created_at": created_at,
        "materials": [
            {
                "material_name": "Steel rods",
                "quantity": 20,
                "original_unit_price": 85.5
            }
        ]
    })
}
