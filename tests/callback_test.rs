mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use clinic_payments::application::committer::AppointmentCommitter;
use clinic_payments::application::payment_service::PaymentService;
use clinic_payments::config::GatewayConfig;
use clinic_payments::domain::commit::CommitState;
use clinic_payments::domain::order::OrderId;
use clinic_payments::infrastructure::in_memory::InMemoryIdempotencyStore;
use clinic_payments::interfaces::http::{CALLBACK_PATH, router};
use common::{FakeBooker, form_body, seal_for_merchant, sealed_notification};
use http_body_util::BodyExt;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

async fn post_callback(app: axum::Router, body: String) -> (StatusCode, String, String) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(CALLBACK_PATH)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
}

fn delivery(order_id: &str, action: &str) -> String {
    let envelope = sealed_notification(order_id, action);
    form_body(&[
        ("env_key", envelope.env_key.as_str()),
        ("data", envelope.data.as_str()),
    ])
}

#[tokio::test]
async fn test_confirmed_delivery_is_acknowledged() {
    let booker = FakeBooker::default();
    let service = common::service(booker.clone());

    let (status, content_type, body) =
        post_callback(router(service.clone()), delivery("cb1", "confirmed")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "text/xml; charset=utf-8");
    assert!(body.contains(r#"<crc error_type="0" error_code="0">confirmed</crc>"#));
    assert_eq!(booker.calls(), 1);
    assert_eq!(
        service.committer().state(&OrderId::new("cb1").unwrap()).await.unwrap(),
        CommitState::Committed
    );
}

#[tokio::test]
async fn test_redelivery_does_not_book_twice() {
    let booker = FakeBooker::default();
    let service = common::service(booker.clone());
    let body = delivery("cb2", "paid_pending");

    for _ in 0..3 {
        let (_, _, ack) = post_callback(router(service.clone()), body.clone()).await;
        assert!(ack.contains(r#"error_type="0""#));
    }
    assert_eq!(booker.calls(), 1);
}

#[tokio::test]
async fn test_concurrent_deliveries_book_once() {
    let booker = FakeBooker {
        delay: Duration::from_millis(50),
        ..Default::default()
    };
    let service = common::service(booker.clone());
    let body = delivery("cb3", "confirmed");

    let handles: Vec<_> = (0..2)
        .map(|_| tokio::spawn(post_callback(router(service.clone()), body.clone())))
        .collect();
    for handle in handles {
        let (status, _, ack) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert!(ack.contains(r#"error_type="0" error_code="0""#));
    }
    assert_eq!(booker.calls(), 1);
}

#[tokio::test]
async fn test_missing_data_is_rejected_without_decrypting() {
    let service = common::service(FakeBooker::default());
    let (status, _, ack) =
        post_callback(router(service), form_body(&[("env_key", "AAAA")])).await;

    assert_eq!(status, StatusCode::OK);
    assert!(ack.contains(r#"<crc error_type="1" error_code="1">Missing data</crc>"#));
}

#[tokio::test]
async fn test_non_form_body_is_treated_as_missing_fields() {
    let service = common::service(FakeBooker::default());
    let response = router(service)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(CALLBACK_PATH)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&bytes).contains(r#"error_type="1" error_code="1""#));
}

#[tokio::test]
async fn test_cancel_for_fresh_order() {
    let booker = FakeBooker::default();
    let service = common::service(booker.clone());

    let (_, _, ack) = post_callback(router(service.clone()), delivery("cb4", "canceled")).await;
    assert!(ack.contains(r#"<crc error_type="0" error_code="0">canceled</crc>"#));
    assert_eq!(booker.calls(), 0);
    assert_eq!(
        service.committer().state(&OrderId::new("cb4").unwrap()).await.unwrap(),
        CommitState::Cancelled
    );
}

#[tokio::test]
async fn test_unknown_action_is_accepted_without_effect() {
    let booker = FakeBooker::default();
    let service = common::service(booker.clone());

    let (_, _, ack) = post_callback(router(service.clone()), delivery("cb5", "review")).await;
    assert!(ack.contains(r#"<crc error_type="0" error_code="0">review</crc>"#));
    assert_eq!(booker.calls(), 0);
    assert_eq!(
        service.committer().state(&OrderId::new("cb5").unwrap()).await.unwrap(),
        CommitState::NotProcessed
    );
}

#[tokio::test]
async fn test_unknown_action_without_usable_order_id_is_accepted() {
    let booker = FakeBooker::default();
    let service = common::service(booker.clone());
    let documents = [
        r#"<order type="card"><mobilpay><action>review</action></mobilpay></order>"#,
        r#"<order type="card" id="ord.1/x"><mobilpay><action>review</action></mobilpay></order>"#,
    ];

    for xml in documents {
        let envelope = seal_for_merchant(xml);
        let body = form_body(&[
            ("env_key", envelope.env_key.as_str()),
            ("data", envelope.data.as_str()),
        ]);
        let (status, _, ack) = post_callback(router(service.clone()), body).await;
        assert_eq!(status, StatusCode::OK);
        assert!(ack.contains(r#"<crc error_type="0" error_code="0">review</crc>"#), "{ack}");
    }
    assert_eq!(booker.calls(), 0);
}

#[tokio::test]
async fn test_failed_commit_asks_for_redelivery() {
    let booker = FakeBooker {
        fail_first: 1,
        ..Default::default()
    };
    let service = common::service(booker.clone());
    let body = delivery("cb6", "confirmed");

    let (_, _, ack) = post_callback(router(service.clone()), body.clone()).await;
    assert!(ack.contains(r#"error_type="1" error_code="2""#));
    assert_eq!(
        service.committer().state(&OrderId::new("cb6").unwrap()).await.unwrap(),
        CommitState::NotProcessed
    );

    let (_, _, ack) = post_callback(router(service.clone()), body).await;
    assert!(ack.contains(r#"error_type="0" error_code="0""#));
    assert_eq!(booker.calls(), 2);
}

#[tokio::test]
async fn test_commit_timeout_asks_for_redelivery() {
    let booker = FakeBooker {
        delay: Duration::from_millis(300),
        ..Default::default()
    };
    let service = common::service_with(
        booker,
        Box::new(InMemoryIdempotencyStore::new()),
        Duration::from_millis(30),
    );

    let (_, _, ack) = post_callback(router(service), delivery("cb7", "confirmed")).await;
    assert!(ack.contains(r#"error_type="1" error_code="2""#));
}

#[tokio::test]
async fn test_wrong_key_gives_generic_error() {
    let booker = FakeBooker::default();
    let config = GatewayConfig::from_pem(
        "MERCH-TEST",
        &common::fixture(common::CERT_PATH),
        &common::fixture(common::OTHER_KEY_PATH),
        true,
        "https://clinic.test",
    )
    .unwrap();
    let committer = AppointmentCommitter::new(
        Box::new(InMemoryIdempotencyStore::new()),
        Box::new(booker.clone()),
        Duration::from_secs(5),
    );
    let service = Arc::new(PaymentService::new(Arc::new(config), committer));

    let (status, _, ack) = post_callback(router(service), delivery("cb8", "confirmed")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(ack.contains(r#"<crc error_type="1" error_code="2">Server error</crc>"#));
    assert_eq!(booker.calls(), 0);
}
