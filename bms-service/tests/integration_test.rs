//! End-to-end flows against a real MongoDB (`TEST_MONGODB_URI`, default
//! localhost). Run with `cargo test -- --ignored`.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::TestApp;
use serde_json::{json, Value};

async fn create(app: &TestApp, cookie: &str, uri: &str, body: Value) -> Value {
    let (status, body) = app.json("POST", uri, Some(cookie), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "POST {} -> {}", uri, body);
    body
}

async fn create_building(app: &TestApp, cookie: &str) -> String {
    let building = create(
        app,
        cookie,
        "/api/buildings",
        json!({
            "name": "Bole Heights",
            "address": { "street": "Africa Ave 12", "city": "Addis Ababa", "country": "Ethiopia" },
            "buildingType": "residential",
            "floors": 8,
            "totalUnits": 32,
        }),
    )
    .await;
    building["id"].as_str().unwrap().to_string()
}

#[tokio::test]
#[ignore = "requires a running MongoDB instance"]
async fn lease_invoice_payment_and_refund_flow() {
    let app = TestApp::spawn().await;
    let cookie = app.register("Bole Estates", "admin@bole.example").await;

    let (status, me) = app.json("GET", "/api/auth/me", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["email"], "admin@bole.example");

    let building_id = create_building(&app, &cookie).await;
    let unit = create(
        &app,
        &cookie,
        "/api/units",
        json!({
            "buildingId": building_id,
            "unitNumber": "3B",
            "floor": 3,
            "unitType": "apartment",
            "area": 84.5,
            "rentAmount": 1000.0,
        }),
    )
    .await;
    let tenant = create(
        &app,
        &cookie,
        "/api/tenants",
        json!({
            "firstName": "Abebe",
            "lastName": "Kebede",
            "email": "abebe@example.com",
            "phone": "+251911000000",
        }),
    )
    .await;
    let lease = create(
        &app,
        &cookie,
        "/api/leases",
        json!({
            "tenantId": tenant["id"],
            "unitId": unit["id"],
            "startDate": "2026-01-01T00:00:00Z",
            "rentAmount": 1000.0,
            "billingCycle": "monthly",
            "paymentDueDay": 5,
            "status": "active",
        }),
    )
    .await;

    let invoice = create(
        &app,
        &cookie,
        &format!("/api/leases/{}/invoices", lease["id"].as_str().unwrap()),
        json!({}),
    )
    .await;
    let invoice_id = invoice["id"].as_str().unwrap().to_string();
    assert_eq!(invoice["status"], "draft");
    assert_eq!(invoice["subtotal"], 1000.0);

    // Drafts do not take money.
    let (status, _) = app
        .json(
            "POST",
            "/api/payments",
            Some(&cookie),
            Some(json!({ "invoiceId": invoice_id, "amount": 10.0, "method": "cash" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, sent) = app
        .json(
            "POST",
            &format!("/api/invoices/{}/send", invoice_id),
            Some(&cookie),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["status"], "sent");

    let total = sent["total"].as_f64().unwrap();
    let payment = create(
        &app,
        &cookie,
        "/api/payments",
        json!({ "invoiceId": invoice_id, "amount": total, "method": "bank_transfer" }),
    )
    .await;
    assert_eq!(payment["status"], "completed");

    let (_, paid) = app
        .json("GET", &format!("/api/invoices/{}", invoice_id), Some(&cookie), None)
        .await;
    assert_eq!(paid["status"], "paid");
    assert_eq!(paid["balanceDue"], 0.0);

    let (status, refunded) = app
        .json(
            "POST",
            &format!("/api/payments/{}/refund", payment["id"].as_str().unwrap()),
            Some(&cookie),
            Some(json!({ "reason": "Paid twice" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(refunded["status"], "refunded");

    let (_, reopened) = app
        .json("GET", &format!("/api/invoices/{}", invoice_id), Some(&cookie), None)
        .await;
    assert_ne!(reopened["status"], "paid");
    assert_eq!(reopened["amountPaid"], 0.0);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB instance"]
async fn records_are_invisible_across_organizations() {
    let app = TestApp::spawn().await;
    let owner = app.register("Owner Org", "owner@example.com").await;
    let other = app.register("Other Org", "other@example.com").await;

    let building_id = create_building(&app, &owner).await;
    let uri = format!("/api/buildings/{}", building_id);

    let (status, _) = app.json("GET", &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.json("GET", &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, _) = app.json("DELETE", &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = app.json("GET", "/api/buildings", Some(&other), None).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(0));

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB instance"]
async fn meter_readings_cannot_go_backwards_without_override() {
    let app = TestApp::spawn().await;
    let cookie = app.register("Meter Org", "meters@example.com").await;
    let building_id = create_building(&app, &cookie).await;

    let meter = create(
        &app,
        &cookie,
        "/api/meters",
        json!({ "buildingId": building_id, "meterNumber": "EL-001", "meterType": "electricity" }),
    )
    .await;
    let readings_uri = format!("/api/meters/{}/readings", meter["id"].as_str().unwrap());

    let yesterday = (Utc::now() - Duration::days(1)).to_rfc3339();
    create(
        &app,
        &cookie,
        &readings_uri,
        json!({ "value": 100.0, "readingAt": yesterday }),
    )
    .await;

    let (status, _) = app
        .json("POST", &readings_uri, Some(&cookie), Some(json!({ "value": 90.0 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let replaced = create(
        &app,
        &cookie,
        &readings_uri,
        json!({ "value": 5.0, "allowDecrease": true }),
    )
    .await;
    assert_eq!(replaced["consumption"], 0.0);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB instance"]
async fn logout_revokes_the_session() {
    let app = TestApp::spawn().await;
    let cookie = app.register("Logout Org", "logout@example.com").await;

    let (status, _) = app
        .json("POST", "/api/auth/logout", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.json("GET", "/api/auth/me", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB instance"]
async fn second_reading_at_the_same_instant_is_rejected() {
    let app = TestApp::spawn().await;
    let cookie = app.register("Same Day Org", "sameday@example.com").await;
    let building_id = create_building(&app, &cookie).await;

    let meter = create(
        &app,
        &cookie,
        "/api/meters",
        json!({ "buildingId": building_id, "meterNumber": "WA-007", "meterType": "water" }),
    )
    .await;
    let readings_uri = format!("/api/meters/{}/readings", meter["id"].as_str().unwrap());

    create(
        &app,
        &cookie,
        &readings_uri,
        json!({ "value": 100.0, "readingAt": "2024-05-01" }),
    )
    .await;

    for value in [50.0, 150.0] {
        let (status, body) = app
            .json(
                "POST",
                &readings_uri,
                Some(&cookie),
                Some(json!({ "value": value, "readingAt": "2024-05-01" })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT, "{}", body);
    }

    let (_, meter) = app
        .json(
            "GET",
            &format!("/api/meters/{}", meter["id"].as_str().unwrap()),
            Some(&cookie),
            None,
        )
        .await;
    assert_eq!(meter["lastReading"], 100.0);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires a running MongoDB instance"]
async fn utility_payment_unit_must_be_in_the_meter_building() {
    let app = TestApp::spawn().await;
    let cookie = app.register("Two Towers Org", "towers@example.com").await;
    let tower_a = create_building(&app, &cookie).await;
    let tower_b = create_building(&app, &cookie).await;

    let meter = create(
        &app,
        &cookie,
        "/api/meters",
        json!({ "buildingId": tower_a, "meterNumber": "EL-101", "meterType": "electricity" }),
    )
    .await;
    let stray_unit = create(
        &app,
        &cookie,
        "/api/units",
        json!({
            "buildingId": tower_b,
            "unitNumber": "7A",
            "floor": 7,
            "unitType": "apartment",
            "area": 60.0,
            "rentAmount": 800.0,
        }),
    )
    .await;

    let payment = json!({
        "meterId": meter["id"],
        "periodStart": "2024-04-01",
        "periodEnd": "2024-04-30",
        "amount": 42.5,
        "method": "cash",
    });
    let mut with_unit = payment.clone();
    with_unit["unitId"] = stray_unit["id"].clone();
    let (status, body) = app
        .json("POST", "/api/utility-payments", Some(&cookie), Some(with_unit))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let created = create(&app, &cookie, "/api/utility-payments", payment).await;
    let (status, body) = app
        .json(
            "PATCH",
            &format!("/api/utility-payments/{}", created["id"].as_str().unwrap()),
            Some(&cookie),
            Some(json!({ "unitId": stray_unit["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    app.cleanup().await;
}
