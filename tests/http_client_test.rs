mod common;

use assert_matches::assert_matches;
use common::*;
use procurement_buyer::{
    client::{ChildScope, ProcurementApi, PurchaseScope},
    errors::{ServiceError, GENERIC_FAILURE_MESSAGE},
    models::{NegotiatedPriceUpdate, PageRequest, RecordKey, VendorSelection},
};
use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::{
    matchers::{body_json, header, method, path, query_param},
    Mock, ResponseTemplate,
};

#[tokio::test]
async fn list_purchases_sends_paging_and_bearer_token() {
    let backend = TestBackend::start().await;
    Mock::given(method("GET"))
        .and(path(PENDING_PURCHASES))
        .and(query_param("page", "2"))
        .and(query_param("per_page", "25"))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [purchase_json(41, "2024-03-01T08:00:00Z")],
            "pagination": {"page": 2, "per_page": 25, "total": 26, "pages": 2, "has_next": false, "has_prev": true}
        })))
        .expect(1)
        .mount(&backend.server)
        .await;

    let page = backend
        .api()
        .list_purchases(PurchaseScope::Pending, PageRequest { page: 2, per_page: 25 })
        .await
        .unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].cr_id, 41);
    assert!(page.pagination.has_prev);
    assert!(!page.items[0].store_requests_pending);
}

#[tokio::test]
async fn bare_array_is_one_complete_page() {
    let backend = TestBackend::start().await;
    Mock::given(method("GET"))
        .and(path(APPROVED_CHILDREN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            child_json(5, 12, "approved", "2024-03-02T10:00:00Z"),
            child_json(6, 12, "approved", "2024-03-02T11:00:00Z"),
        ])))
        .mount(&backend.server)
        .await;

    let page = backend
        .api()
        .list_po_children(ChildScope::Approved, PageRequest::first(50))
        .await
        .unwrap();

    assert_eq!(page.items.len(), 2);
    assert!(!page.pagination.has_next);
    assert_eq!(page.items[1].parent_cr_id, 12);
}

#[tokio::test]
async fn child_served_on_purchase_endpoint_is_rejected() {
    let backend = TestBackend::start().await;
    backend
        .serve_list(
            REJECTED_PURCHASES,
            vec![child_json(5, 12, "rejected", "2024-03-02T10:00:00Z")],
        )
        .await;

    let result = backend
        .api()
        .list_purchases(PurchaseScope::Rejected, PageRequest::first(10))
        .await;
    assert_matches!(result, Err(ServiceError::SerializationError(_)));
}

#[tokio::test]
async fn negotiated_prices_are_sent_as_materials_array() {
    let backend = TestBackend::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/buyer/purchases/41/negotiated-prices"))
        .and(body_json(json!({
            "materials": [
                {"material_name": "Cement", "negotiated_price": 320.0},
                {"material_name": "Gravel", "negotiated_price": null}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Prices updated"})))
        .expect(1)
        .mount(&backend.server)
        .await;

    let message = backend
        .api()
        .update_negotiated_prices(
            41,
            vec![
                NegotiatedPriceUpdate {
                    material_name: "Cement".into(),
                    negotiated_price: Some(dec!(320)),
                },
                NegotiatedPriceUpdate {
                    material_name: "Gravel".into(),
                    negotiated_price: None,
                },
            ],
        )
        .await
        .unwrap();
    assert_eq!(message.message, "Prices updated");
}

#[tokio::test]
async fn store_request_posts_material_names() {
    let backend = TestBackend::start().await;
    Mock::given(method("POST"))
        .and(path("/api/buyer/purchases/41/store-requests"))
        .and(body_json(json!({"material_names": ["Cement"]})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"message": "Store request created"})))
        .expect(1)
        .mount(&backend.server)
        .await;

    let message = backend
        .api()
        .request_from_store(41, vec!["Cement".into()])
        .await
        .unwrap();
    assert_eq!(message.message, "Store request created");
}

#[tokio::test]
async fn store_availability_decodes_partial_body() {
    let backend = TestBackend::start().await;
    Mock::given(method("GET"))
        .and(path("/api/buyer/purchases/41/store-availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "available_materials": [
                {"material_name": "Cement", "required_quantity": 10, "available_quantity": 40, "unit": "bags"}
            ],
            "can_complete_from_store": false
        })))
        .mount(&backend.server)
        .await;

    let availability = backend.api().check_store_availability(41).await.unwrap();
    assert!(availability.is_available("Cement"));
    assert!(availability.unavailable_materials.is_empty());
}

#[tokio::test]
async fn mutations_route_by_record_kind() {
    let backend = TestBackend::start().await;
    Mock::given(method("POST"))
        .and(path("/api/buyer/po-children/9/complete"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&backend.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/buyer/purchases/41/vendor"))
        .and(body_json(json!({"vendor_id": 7})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Vendor selected"})))
        .expect(1)
        .mount(&backend.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/buyer/purchases/41/resend"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Resent"})))
        .expect(1)
        .mount(&backend.server)
        .await;

    let api = backend.api();
    let completed = api.mark_complete(RecordKey::PoChild(9)).await.unwrap();
    assert!(completed.message.is_empty());

    let vendor = api
        .select_vendor(RecordKey::Purchase(41), VendorSelection { vendor_id: 7 })
        .await
        .unwrap();
    assert_eq!(vendor.message, "Vendor selected");

    assert_eq!(api.resend_rejected(41).await.unwrap().message, "Resent");
}

#[tokio::test]
async fn backend_error_message_is_surfaced() {
    let backend = TestBackend::start().await;
    Mock::given(method("POST"))
        .and(path("/api/buyer/purchases/41/complete"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"error": "Order has unpriced materials"})),
        )
        .mount(&backend.server)
        .await;

    let err = backend
        .api()
        .mark_complete(RecordKey::Purchase(41))
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Order has unpriced materials");
    assert_eq!(err.status_code().map(|s| s.as_u16()), Some(422));
}

#[tokio::test]
async fn unreadable_error_body_falls_back_to_generic_message() {
    let backend = TestBackend::start().await;
    Mock::given(method("POST"))
        .and(path("/api/buyer/purchases/41/resend"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>Bad gateway</html>"))
        .mount(&backend.server)
        .await;

    let err = backend.api().resend_rejected(41).await.unwrap_err();
    assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
}

#[tokio::test]
async fn missing_record_maps_to_not_found() {
    let backend = TestBackend::start().await;
    Mock::given(method("GET"))
        .and(path("/api/buyer/purchases/999/store-availability"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Purchase not found"})))
        .mount(&backend.server)
        .await;

    let err = backend.api().check_store_availability(999).await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound(ref msg) if msg == "Purchase not found");
}
