//! Integration tests for paygate-providers
//!
//! Callbacks are fed in as the raw bodies or query strings a web handler
//! would receive.

use paygate_providers::providers::long77::PayInCallback;
use paygate_providers::providers::ragapay::CheckoutCallback;
use paygate_providers::providers::xpay::FundInCallback;
use paygate_providers::providers::{
    Long77Client, Long77Config, RagaPayClient, RagaPayConfig, XPayClient, XPayConfig,
};
use paygate_providers::{GatewayError, GatewayResult};
use paygate_signing::xpay;

/// What a handler would answer: status code plus body
fn respond<T: ToString>(result: GatewayResult<T>) -> (u16, String) {
    match result {
        Ok(body) => (200, body.to_string()),
        Err(e) if e.is_rejection() => (400, String::new()),
        Err(e) => (500, e.to_string()),
    }
}

const LONG77_CALLBACK: &str = r#"{
    "partner_id": "P1",
    "system_order_code": "S-9",
    "partner_order_code": "O-1",
    "channel_code": "BNB",
    "amount": "500000",
    "request_time": 1700000000,
    "extra_data": "",
    "payment": {
        "payment_id": "PAY-1",
        "paid_amount": "500000",
        "fees": 0,
        "payment_time": 1700000100,
        "bank_code": "VCB",
        "bank_account_no": "0123",
        "bank_account_name": "NGUYEN",
        "callback_time": 1700000200,
        "status": 4
    },
    "sign": "81b4c318c79f1c7949eb535eca207463"
}"#;

#[test]
fn test_long77_callback_handler() {
    let client = Long77Client::new(Long77Config::new("https://api.example.com", "P1", "sec"))
        .unwrap();

    let callback = PayInCallback::from_json(LONG77_CALLBACK.as_bytes()).unwrap();
    assert!(callback.is_success());
    assert_eq!(respond(client.acknowledge(&callback)), (200, "success".into()));

    let tampered = LONG77_CALLBACK.replace("\"amount\": \"500000\"", "\"amount\": \"900000\"");
    let callback = PayInCallback::from_json(tampered.as_bytes()).unwrap();
    assert_eq!(respond(client.acknowledge(&callback)).0, 400);

    // same body, different merchant secret
    let other = Long77Client::new(Long77Config::new("https://api.example.com", "P1", "other"))
        .unwrap();
    let callback = PayInCallback::from_json(LONG77_CALLBACK.as_bytes()).unwrap();
    assert_eq!(respond(other.acknowledge(&callback)).0, 400);
}

#[test]
fn test_ragapay_callback_handler() {
    let client = RagaPayClient::new(RagaPayConfig::new("PUB", "pw")).unwrap();
    let query = "?id=T-1&order_number=O1&order_amount=10.00&order_currency=USD\
        &order_description=Test&status=success&hash=3c2f77b9add0a39ac8a841630cf331b749c859eb";

    let callback = CheckoutCallback::from_query(query).unwrap();
    assert_eq!(respond(client.acknowledge(&callback)), (200, "OK".into()));

    let callback = CheckoutCallback::from_query(&query.replace("O1", "O2")).unwrap();
    assert_eq!(respond(client.acknowledge(&callback)).0, 400);
}

#[test]
fn test_xpay_callback_handler() {
    let client = XPayClient::new(XPayConfig::new("https://pay.xpay.example", "M1", "k")).unwrap();
    let signature = "87315354962450e035d24996acc34c3d";
    let data = format!(
        "RefID=R1&Curr=THB&Amount=100.00&Status=000&TransID=T9&ValidationKey=V7&EncryptText={}",
        signature
    );
    let query = format!(
        "EncryptText={}&Data={}",
        signature.to_uppercase(),
        xpay::encode(data.as_bytes())
    );

    let callback = FundInCallback::from_query(&query).unwrap();
    assert_eq!(respond(client.acknowledge(&callback)), (200, "T9||V7".into()));

    // a corrupted Data parameter is a rejection, not a server error
    let corrupted = format!("{}x", query);
    let err = FundInCallback::from_query(&corrupted).unwrap_err();
    assert!(matches!(err, GatewayError::Signing(_)));
    assert!(err.is_rejection());
}

#[test]
fn test_configuration_errors_are_not_rejections() {
    let err = XPayClient::new(XPayConfig::new("not a url", "M1", "k")).unwrap_err();
    assert!(matches!(err, GatewayError::InvalidUrl(_)));
    assert!(!err.is_rejection());
}
