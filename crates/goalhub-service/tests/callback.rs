//! Provider callback reconciliation tests.

mod common;

use common::{failure_callback, success_callback, TestHarness};
use goalhub_core::{CheckoutRequestId, PaymentStatus};
use goalhub_store::Store;
use serde_json::json;

fn assert_acknowledged(body: &serde_json::Value) {
    assert_eq!(body["ResultCode"], 0);
    assert_eq!(body["ResultDesc"], "Callback Received");
}

#[tokio::test]
async fn success_callback_completes_payment() {
    let harness = TestHarness::new();
    let checkout = harness.initiate_payment(1500).await;

    let ack = harness
        .send_callback(&success_callback(&checkout, "NLJ7RT61SV"))
        .await;
    assert_acknowledged(&ack);

    let payment = harness
        .store
        .get_payment(&CheckoutRequestId::new(checkout).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert_eq!(payment.reference.as_deref(), Some("NLJ7RT61SV"));
    assert!(payment.completed_at.is_some());
    assert!(payment.raw_callback.is_some());
}

#[tokio::test]
async fn failure_callback_fails_payment() {
    let harness = TestHarness::new();
    let checkout = harness.initiate_payment(1500).await;

    let ack = harness
        .send_callback(&failure_callback(&checkout, 1032, "Request cancelled by user"))
        .await;
    assert_acknowledged(&ack);

    let payment = harness
        .store
        .get_payment(&CheckoutRequestId::new(checkout).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Failed);
    assert_eq!(
        payment.failure_reason.as_deref(),
        Some("Request cancelled by user")
    );
    assert!(payment.reference.is_none());
}

#[tokio::test]
async fn duplicate_callback_does_not_change_outcome() {
    let harness = TestHarness::new();
    let checkout = harness.initiate_payment(1500).await;

    harness
        .send_callback(&success_callback(&checkout, "FIRST00001"))
        .await;
    let ack = harness
        .send_callback(&failure_callback(&checkout, 1, "Insufficient balance"))
        .await;
    assert_acknowledged(&ack);

    let payment = harness
        .store
        .get_payment(&CheckoutRequestId::new(checkout.clone()).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert_eq!(payment.reference.as_deref(), Some("FIRST00001"));
    assert_eq!(harness.payment_status(&checkout).await, "completed");
}

#[tokio::test]
async fn unknown_checkout_is_acknowledged() {
    let harness = TestHarness::new();

    let ack = harness
        .send_callback(&success_callback("ws_CO_unknown", "NLJ7RT61SV"))
        .await;
    assert_acknowledged(&ack);
}

#[tokio::test]
async fn malformed_callback_is_acknowledged() {
    let harness = TestHarness::new();

    for body in ["not json at all", "{}", r#"{"Body":{"stkCallback":{}}}"#] {
        let response = harness
            .server
            .post("/api/callback")
            .content_type("application/json")
            .text(body)
            .await;

        response.assert_status_ok();
        assert_acknowledged(&response.json());
    }
}

#[tokio::test]
async fn callback_without_metadata_items_still_completes() {
    let harness = TestHarness::new();
    let checkout = harness.initiate_payment(1500).await;

    harness
        .send_callback(&json!({
            "Body": {
                "stkCallback": {
                    "MerchantRequestID": "29115-34620561-1",
                    "CheckoutRequestID": checkout,
                    "ResultCode": 0,
                    "ResultDesc": "The service request is processed successfully."
                }
            }
        }))
        .await;

    let payment = harness
        .store
        .get_payment(&CheckoutRequestId::new(checkout).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert!(payment.reference.is_none());
}

#[tokio::test]
async fn oversized_callback_is_acknowledged() {
    let harness = TestHarness::new();
    let checkout = harness.initiate_payment(1500).await;

    let mut payload = success_callback(&checkout, "NLJ7RT61SV");
    payload["Body"]["stkCallback"]["Padding"] = json!("x".repeat(1_100_000));

    let response = harness.server.post("/api/callback").json(&payload).await;

    response.assert_status_ok();
    assert_acknowledged(&response.json());

    // Too large to read, so nothing was applied
    assert_eq!(harness.payment_status(&checkout).await, "pending");
}
