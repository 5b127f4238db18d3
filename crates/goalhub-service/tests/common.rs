//! Common test utilities for goalhub integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use serde_json::{json, Value};

use goalhub_core::{NewTurf, NewUser, Role, TurfId};
use goalhub_service::{create_router, AppState, ServiceConfig};
use goalhub_store::{MemoryStore, Store};

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The backing store, for seeding and inspecting records.
    pub store: Arc<MemoryStore>,
}

/// Development config with no M-Pesa credentials, so pushes are simulated.
pub fn test_config() -> ServiceConfig {
    ServiceConfig {
        listen_addr: "127.0.0.1:0".into(),
        cors_origins: vec!["*".into()],
        trust_forwarded_for: true,
        ..ServiceConfig::default()
    }
}

impl TestHarness {
    /// Create a new test harness with a fresh store.
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Create a harness with a custom configuration.
    pub fn with_config(config: ServiceConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), config).expect("Failed to build app state");
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self { server, store }
    }

    /// Authorization header for a regular player.
    pub fn user_auth_header(&self) -> String {
        "Bearer mock-token-player".to_string()
    }

    /// Authorization header for a second, unrelated player.
    pub fn other_user_auth_header(&self) -> String {
        "Bearer mock-token-someone-else".to_string()
    }

    /// Seed a user with the given role and return its auth header.
    pub async fn auth_header_with_role(&self, uid: &str, role: Role) -> String {
        let user = NewUser {
            email: format!("{uid}@example.com"),
            name: Some(uid.to_string()),
            phone: None,
            role,
            avatar: None,
        }
        .into_user()
        .expect("valid user");
        self.store.insert_user(&user).await.expect("insert user");
        format!("Bearer mock-token-{uid}")
    }

    /// Authorization header for an admin.
    pub async fn admin_auth_header(&self) -> String {
        self.auth_header_with_role("admin", Role::Admin).await
    }

    /// Authorization header for a manager.
    pub async fn manager_auth_header(&self) -> String {
        self.auth_header_with_role("manager", Role::Manager).await
    }

    /// Seed a turf directly in the store.
    pub async fn seed_turf(&self) -> TurfId {
        let turf = NewTurf {
            name: "Kasarani Arena".into(),
            location: "Nairobi".into(),
            kind: "5-a-side".into(),
            price: 2500,
            image: None,
            description: Some("Floodlit artificial grass".into()),
        }
        .into_turf()
        .expect("valid turf");
        self.store.insert_turf(&turf).await.expect("insert turf");
        turf.id
    }

    /// Initiate a simulated push and return its checkout request id.
    pub async fn initiate_payment(&self, amount: i64) -> String {
        let response = self
            .server
            .post("/api/stkpush")
            .add_header("x-forwarded-for", "198.51.100.7")
            .json(&json!({ "phone": "0712345678", "amount": amount }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        body["CheckoutRequestID"]
            .as_str()
            .expect("checkout request id")
            .to_string()
    }

    /// Post a provider callback.
    pub async fn send_callback(&self, payload: &Value) -> Value {
        let response = self.server.post("/api/callback").json(payload).await;
        response.assert_status_ok();
        response.json()
    }

    /// Initiate a payment and complete it.
    pub async fn completed_payment(&self, amount: i64) -> String {
        let checkout = self.initiate_payment(amount).await;
        self.send_callback(&success_callback(&checkout, "NLJ7RT61SV"))
            .await;
        checkout
    }

    /// Initiate a payment and fail it.
    pub async fn failed_payment(&self, amount: i64) -> String {
        let checkout = self.initiate_payment(amount).await;
        self.send_callback(&failure_callback(&checkout, 1032, "Request cancelled by user"))
            .await;
        checkout
    }

    /// Current status of a payment via the polling endpoint.
    pub async fn payment_status(&self, checkout: &str) -> String {
        let response = self
            .server
            .get(&format!("/api/payment-status/{checkout}"))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        body["status"].as_str().expect("status").to_string()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// A successful STK callback with a receipt number.
pub fn success_callback(checkout: &str, receipt: &str) -> Value {
    json!({
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": checkout,
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": {
                    "Item": [
                        { "Name": "Amount", "Value": 1500 },
                        { "Name": "MpesaReceiptNumber", "Value": receipt },
                        { "Name": "TransactionDate", "Value": 20_260_314_181_500_i64 },
                        { "Name": "PhoneNumber", "Value": 254_712_345_678_i64 }
                    ]
                }
            }
        }
    })
}

/// A failed STK callback.
pub fn failure_callback(checkout: &str, code: i64, description: &str) -> Value {
    json!({
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": checkout,
                "ResultCode": code,
                "ResultDesc": description
            }
        }
    })
}

/// Booking details for the given turf.
pub fn booking_body(turf_id: TurfId) -> Value {
    json!({
        "turf_id": turf_id.to_string(),
        "date": "2026-03-14",
        "time_slot": "18:00",
        "amount": 2500,
        "customer_name": "Wanjiru",
        "customer_phone": "0712345678"
    })
}
