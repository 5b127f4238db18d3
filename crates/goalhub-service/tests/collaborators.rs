//! Turf, event, notification, user and dashboard endpoint tests.

mod common;

use axum::http::StatusCode;
use common::{booking_body, TestHarness};
use serde_json::{json, Value};

// ============================================================================
// Turfs
// ============================================================================

#[tokio::test]
async fn turfs_are_public_but_creation_needs_staff() {
    let harness = TestHarness::new();
    let turf = json!({
        "name": "Ngong Road Pitch",
        "location": "Nairobi",
        "type": "7-a-side",
        "price": 3000
    });

    harness
        .server
        .post("/api/turfs")
        .add_header("authorization", harness.user_auth_header())
        .json(&turf)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let admin = harness.admin_auth_header().await;
    harness
        .server
        .post("/api/turfs")
        .add_header("authorization", admin)
        .json(&turf)
        .await
        .assert_status_ok();

    let response = harness.server.get("/api/turfs").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body[0]["name"], "Ngong Road Pitch");
    assert_eq!(body[0]["type"], "7-a-side");
}

// ============================================================================
// Events
// ============================================================================

#[tokio::test]
async fn event_lifecycle() {
    let harness = TestHarness::new();
    let manager = harness.manager_auth_header().await;

    let response = harness
        .server
        .post("/api/events")
        .add_header("authorization", manager.clone())
        .json(&json!({
            "title": "Weekend 5-a-side Cup",
            "date": "Saturday 21 March",
            "time": "09:00"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let event: Value = response.json();
    let path = format!("/api/events/{}", event["id"].as_str().unwrap());

    let response = harness
        .server
        .put(&path)
        .add_header("authorization", manager.clone())
        .json(&json!({ "location": "Kasarani", "description": null }))
        .await;
    response.assert_status_ok();
    let updated: Value = response.json();
    assert_eq!(updated["location"], "Kasarani");
    assert_eq!(updated["title"], "Weekend 5-a-side Cup");

    harness.server.get(&path).await.assert_status_ok();

    harness
        .server
        .delete(&path)
        .add_header("authorization", manager)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    harness
        .server
        .get(&path)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn players_cannot_manage_events() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/api/events")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "title": "Cup", "date": "Sat", "time": "09:00" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

// ============================================================================
// Notifications
// ============================================================================

#[tokio::test]
async fn notifications_can_be_marked_read() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/api/notifications")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "type": "booking", "message": "Your slot is confirmed" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let notification: Value = response.json();
    assert_eq!(notification["read"], false);

    let response = harness
        .server
        .put(&format!(
            "/api/notifications/{}/read",
            notification["id"].as_str().unwrap()
        ))
        .add_header("authorization", harness.user_auth_header())
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["read"], true);

    let list: Value = harness
        .server
        .get("/api/notifications")
        .add_header("authorization", harness.user_auth_header())
        .await
        .json();
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn notifications_require_auth() {
    let harness = TestHarness::new();

    harness
        .server
        .get("/api/notifications")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn first_request_provisions_user() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/api/users/me")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["email"], "player@example.com");
    assert_eq!(body["role"], "user");

    // Same identity resolves to the same row
    let again: Value = harness
        .server
        .get("/api/users/me")
        .add_header("authorization", harness.user_auth_header())
        .await
        .json();
    assert_eq!(again["id"], body["id"]);
}

#[tokio::test]
async fn invalid_token_is_unauthorized() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/api/users/me")
        .add_header("authorization", "Bearer not-a-real-token")
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn admin_creates_users_with_unique_email() {
    let harness = TestHarness::new();
    let admin = harness.admin_auth_header().await;
    let request = json!({ "email": "Coach@Example.com", "role": "manager" });

    let response = harness
        .server
        .post("/api/users")
        .add_header("authorization", admin.clone())
        .json(&request)
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["email"], "coach@example.com");

    let response = harness
        .server
        .post("/api/users")
        .add_header("authorization", admin)
        .json(&request)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(
        body["error"]["message"],
        "User with this email already exists"
    );
}

#[tokio::test]
async fn players_cannot_read_other_users() {
    let harness = TestHarness::new();
    let admin = harness.admin_auth_header().await;

    let admin_user: Value = harness
        .server
        .get("/api/users/me")
        .add_header("authorization", admin)
        .await
        .json();

    harness
        .server
        .get(&format!("/api/users/{}", admin_user["id"].as_str().unwrap()))
        .add_header("authorization", harness.user_auth_header())
        .await
        .assert_status(StatusCode::FORBIDDEN);

    harness
        .server
        .get("/api/users")
        .add_header("authorization", harness.user_auth_header())
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deactivated_users_are_forbidden() {
    let harness = TestHarness::new();
    let admin = harness.admin_auth_header().await;

    let player: Value = harness
        .server
        .get("/api/users/me")
        .add_header("authorization", harness.user_auth_header())
        .await
        .json();

    harness
        .server
        .put(&format!("/api/users/{}", player["id"].as_str().unwrap()))
        .add_header("authorization", admin)
        .json(&json!({ "is_active": false }))
        .await
        .assert_status_ok();

    harness
        .server
        .get("/api/users/me")
        .add_header("authorization", harness.user_auth_header())
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_deletes_users() {
    let harness = TestHarness::new();
    let admin = harness.admin_auth_header().await;

    let player: Value = harness
        .server
        .get("/api/users/me")
        .add_header("authorization", harness.user_auth_header())
        .await
        .json();
    let path = format!("/api/users/{}", player["id"].as_str().unwrap());

    harness
        .server
        .delete(&path)
        .add_header("authorization", harness.other_user_auth_header())
        .await
        .assert_status(StatusCode::FORBIDDEN);

    harness
        .server
        .delete(&path)
        .add_header("authorization", admin.clone())
        .await
        .assert_status(StatusCode::NO_CONTENT);

    harness
        .server
        .get(&path)
        .add_header("authorization", admin.clone())
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let response = harness
        .server
        .delete(&path)
        .add_header("authorization", admin)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"]["message"], "User not found");
}

// ============================================================================
// Dashboard
// ============================================================================

#[tokio::test]
async fn dashboard_is_staff_only() {
    let harness = TestHarness::new();

    harness
        .server
        .get("/api/dashboard/stats")
        .add_header("authorization", harness.user_auth_header())
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn dashboard_counts_confirmed_revenue() {
    let harness = TestHarness::new();
    let turf_id = harness.seed_turf().await;
    let admin = harness.admin_auth_header().await;
    let checkout = harness.completed_payment(2500).await;

    harness
        .server
        .post(&format!("/api/bookings?checkout_request_id={checkout}"))
        .add_header("authorization", harness.user_auth_header())
        .json(&booking_body(turf_id))
        .await
        .assert_status_ok();
    harness
        .server
        .post("/api/bookings")
        .add_header("authorization", harness.user_auth_header())
        .json(&booking_body(turf_id))
        .await
        .assert_status_ok();

    let stats: Value = harness
        .server
        .get("/api/dashboard/stats")
        .add_header("authorization", admin.clone())
        .await
        .json();
    assert_eq!(stats["revenue"], 2500);
    assert_eq!(stats["bookings"], 1);
    assert_eq!(stats["users"], 2);
    assert_eq!(stats["recent_activity"].as_array().unwrap().len(), 2);

    let chart: Value = harness
        .server
        .get("/api/dashboard/chart-data")
        .add_header("authorization", admin)
        .await
        .json();
    let points = chart.as_array().unwrap();
    assert_eq!(points.len(), 7);
    assert_eq!(points[6]["revenue"], 2500);
    assert_eq!(points[6]["bookings"], 1);
}
