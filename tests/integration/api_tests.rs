//! API integration tests
//!
//! These run against a live server with a seeded database:
//!   - a student account with roll number TEST001
//!   - CAMPUSLIB_TEST_ADMIN_TOKEN set to a valid admin bearer token
//!
//! Run with: cargo test -- --ignored

use reqwest::Client;
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

const BASE_URL: &str = "http://localhost:8080/api";

fn admin_token() -> String {
    std::env::var("CAMPUSLIB_TEST_ADMIN_TOKEN")
        .expect("CAMPUSLIB_TEST_ADMIN_TOKEN must be set for integration tests")
}

/// Unique ISBN per run so repeated runs don't collide on book codes
fn unique_isbn() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .subsec_nanos();
    format!("978-{}", nanos)
}

async fn create_book(client: &Client, token: &str, copies: i32) -> Value {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "title": "Integration Test Book",
            "author": "Test Author",
            "isbn": unique_isbn(),
            "copies": copies
        }))
        .send()
        .await
        .expect("Failed to create book");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    body["data"].clone()
}

/// The seeded student's database id, overridable per environment
fn get_student_id() -> i64 {
    std::env::var("CAMPUSLIB_TEST_STUDENT_ID")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1)
}

async fn borrow_book(client: &Client, token: &str, student_id: i64, code: &str) -> reqwest::Response {
    client
        .post(format!("{}/borrow-records/borrow", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "student_id": student_id,
            "book_code": code,
            "due_date": "2030-01-01T00:00:00Z"
        }))
        .send()
        .await
        .expect("Failed to send borrow request")
}

#[tokio::test]
#[ignore]
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_seat_availability_snapshot() {
    let client = Client::new();
    let token = admin_token();

    let response = client
        .get(format!("{}/activity-logs/seats", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    for bucket in ["central", "reference", "reading", "elibrary"] {
        assert!(body["data"][bucket]["total"].is_number());
        assert!(body["data"][bucket]["occupied"].is_number());
    }
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return_restores_available() {
    let client = Client::new();
    let token = admin_token();
    let student_id = get_student_id();

    let book = create_book(&client, &token, 3).await;
    let code = book["code"].as_str().unwrap();
    assert_eq!(book["available"], 3);

    // Borrow decrements available
    let response = borrow_book(&client, &token, student_id, code).await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    let record_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["book"]["available"], 2);
    assert_eq!(body["data"]["status"], "Borrowed");

    // Return restores it
    let response = client
        .patch(format!("{}/borrow-records/{}/return", BASE_URL, record_id))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to send return request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["status"], "Returned");
    assert_eq!(body["data"]["book"]["available"], 3);

    // A second return is rejected without changing anything
    let response = client
        .patch(format!("{}/borrow-records/{}/return", BASE_URL, record_id))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to send return request");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_borrow_limit_is_enforced() {
    let client = Client::new();
    let token = admin_token();
    let student_id = get_student_id();

    let book = create_book(&client, &token, 10).await;
    let code = book["code"].as_str().unwrap();

    let mut record_ids = Vec::new();
    for _ in 0..4 {
        let response = borrow_book(&client, &token, student_id, code).await;
        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.unwrap();
        record_ids.push(body["data"]["id"].as_i64().unwrap());
    }

    // The fifth borrow must be rejected with the limit error
    let response = borrow_book(&client, &token, student_id, code).await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "BorrowLimitReached");

    // Cleanup: return everything
    for record_id in record_ids {
        let _ = client
            .patch(format!("{}/borrow-records/{}/return", BASE_URL, record_id))
            .bearer_auth(&token)
            .json(&json!({}))
            .send()
            .await;
    }
}

#[tokio::test]
#[ignore]
async fn test_check_in_twice_is_rejected() {
    let client = Client::new();
    let token = admin_token();

    let scan = json!({ "roll_number": "TEST001", "section": "central" });

    let response = client
        .post(format!("{}/activity-logs/check-in", BASE_URL))
        .bearer_auth(&token)
        .json(&scan)
        .send()
        .await
        .expect("Failed to send check-in");
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/activity-logs/check-in", BASE_URL))
        .bearer_auth(&token)
        .json(&scan)
        .send()
        .await
        .expect("Failed to send check-in");
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "AlreadyCheckedIn");

    // Cleanup and duration check
    let response = client
        .post(format!("{}/activity-logs/check-out", BASE_URL))
        .bearer_auth(&token)
        .json(&scan)
        .send()
        .await
        .expect("Failed to send check-out");
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["status"], "Checked Out");
    assert!(body["data"]["duration"].as_str().unwrap().contains('h'));
}

#[tokio::test]
#[ignore]
async fn test_transfer_preserves_check_in_time() {
    let client = Client::new();
    let token = admin_token();

    let response = client
        .post(format!("{}/activity-logs/check-in", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "roll_number": "TEST001", "section": "reading" }))
        .send()
        .await
        .expect("Failed to send check-in");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    let log_id = body["data"]["id"].as_i64().unwrap();
    let time_in = body["data"]["time_in"].clone();

    let response = client
        .post(format!("{}/activity-logs/transfer", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "roll_number": "TEST001",
            "from_section": "reading",
            "to_section": "central"
        }))
        .send()
        .await
        .expect("Failed to send transfer");
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();

    assert_eq!(body["data"]["id"].as_i64().unwrap(), log_id);
    assert_eq!(body["data"]["time_in"], time_in);
    assert_eq!(body["data"]["section"], "Central Library");

    // Cleanup
    let _ = client
        .post(format!("{}/activity-logs/check-out", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "roll_number": "TEST001", "section": "central" }))
        .send()
        .await;
}

#[tokio::test]
#[ignore]
async fn test_fine_settlement_is_idempotent() {
    let client = Client::new();
    let token = admin_token();
    let student_id = get_student_id();

    let book = create_book(&client, &token, 2).await;
    let code = book["code"].as_str().unwrap();

    let response = borrow_book(&client, &token, student_id, code).await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    let record_id = body["data"]["id"].as_i64().unwrap();

    // Give the record a fine through the admin correction path
    let response = client
        .patch(format!("{}/borrow-records/{}", BASE_URL, record_id))
        .bearer_auth(&token)
        .json(&json!({ "fine": "5", "status": "Overdue" }))
        .send()
        .await
        .expect("Failed to update record");
    assert!(response.status().is_success());

    // Paying the fine closes the still-open loan
    let response = client
        .patch(format!("{}/borrow-records/{}/fine/paid", BASE_URL, record_id))
        .bearer_auth(&token)
        .json(&json!({ "payment_method": "cash" }))
        .send()
        .await
        .expect("Failed to pay fine");
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["status"], "Returned");
    assert_eq!(body["data"]["payment_status"], "Paid");

    // Settling again must fail without further changes
    let response = client
        .patch(format!("{}/borrow-records/{}/fine/paid", BASE_URL, record_id))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to pay fine");
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "FineAlreadySettled");
}

#[tokio::test]
#[ignore]
async fn test_admin_analytics_shape() {
    let client = Client::new();
    let token = admin_token();

    let response = client
        .get(format!("{}/borrow-records/admin-analytics", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert!(body["data"]["active_loans"].is_number());
    assert!(body["data"]["overdue_loans"].is_number());
    assert_eq!(body["data"]["hourly_borrows"].as_array().unwrap().len(), 24);
    assert!(body["data"]["trends"]["borrows_pct"].is_number());
}
