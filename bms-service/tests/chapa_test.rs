use bms_service::config::ChapaConfig;
use bms_service::services::chapa::{ChapaClient, InitializeRequest, VerifyOutcome};
use bms_service::services::ServiceError;
use secrecy::Secret;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ChapaClient {
    ChapaClient::new(ChapaConfig {
        base_url: server.uri(),
        secret_key: Secret::new("CHASECK_TEST-secret".to_string()),
        callback_url: None,
        return_url: None,
    })
}

fn initialize_request(tx_ref: &str) -> InitializeRequest {
    InitializeRequest {
        amount: "1150.00".to_string(),
        currency: "ETB".to_string(),
        email: "tenant@example.com".to_string(),
        first_name: "Abebe".to_string(),
        last_name: "Kebede".to_string(),
        tx_ref: tx_ref.to_string(),
        callback_url: None,
        return_url: None,
    }
}

#[tokio::test]
async fn initialize_returns_checkout_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .and(header("authorization", "Bearer CHASECK_TEST-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Hosted Link",
            "status": "success",
            "data": { "checkout_url": "https://checkout.chapa.co/checkout/payment/abc" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let url = client_for(&server)
        .initialize(&initialize_request("tx-1"))
        .await
        .unwrap();

    assert_eq!(url, "https://checkout.chapa.co/checkout/payment/abc");
}

#[tokio::test]
async fn initialize_surfaces_gateway_message_on_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": { "email": ["The email must be a valid email address."] },
            "status": "failed",
            "data": null
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .initialize(&initialize_request("tx-2"))
        .await
        .unwrap_err();

    match err {
        ServiceError::Gateway(message) => assert!(message.contains("valid email")),
        other => panic!("expected gateway error, got {:?}", other),
    }
}

#[tokio::test]
async fn verify_reports_success_with_reference() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transaction/verify/tx-3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Payment details",
            "status": "success",
            "data": { "status": "success", "tx_ref": "tx-3", "reference": "APfx2Kq" }
        })))
        .mount(&server)
        .await;

    let verification = client_for(&server).verify("tx-3").await.unwrap();

    assert_eq!(verification.outcome, VerifyOutcome::Success);
    assert_eq!(verification.reference.as_deref(), Some("APfx2Kq"));
}

#[tokio::test]
async fn verify_reports_pending() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transaction/verify/tx-4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Payment details",
            "status": "success",
            "data": { "status": "pending", "tx_ref": "tx-4" }
        })))
        .mount(&server)
        .await;

    let verification = client_for(&server).verify("tx-4").await.unwrap();

    assert_eq!(verification.outcome, VerifyOutcome::Pending);
    assert!(verification.reference.is_none());
}

#[tokio::test]
async fn verify_rejects_a_different_transaction() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transaction/verify/tx-5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Payment details",
            "status": "success",
            "data": { "status": "success", "tx_ref": "someone-else" }
        })))
        .mount(&server)
        .await;

    let result = client_for(&server).verify("tx-5").await;

    assert!(matches!(result, Err(ServiceError::Gateway(_))));
}

#[tokio::test]
async fn verify_treats_not_found_as_gateway_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transaction/verify/tx-6"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Invalid transaction or Transaction not found",
            "status": "failed",
            "data": null
        })))
        .mount(&server)
        .await;

    let result = client_for(&server).verify("tx-6").await;

    match result {
        Err(ServiceError::Gateway(message)) => assert!(message.contains("not found")),
        other => panic!("expected gateway error, got {:?}", other.map(|v| v.outcome)),
    }
}
