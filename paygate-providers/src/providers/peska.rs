//! Peska wallet pay-in adapter
//!
//! Requests are authenticated with `AX-AUTHORIZE`, `AX-TIMESTAMP` and
//! `AX-SIGNATURE` headers. The signature is an HMAC-SHA256 keyed by the
//! merchant secret over the timestamp, method, path and the order identity.

use crate::{
    GatewayError, GatewayResult,
    amount::{fits_scale, format_fixed, is_positive},
    client::ProviderClient,
    config::EnvLoader,
};
use chrono::Utc;
use paygate_signing::{DigestAlgorithm, DigestEncoding, FieldSet, KeyMaterial, SigningScheme, Template};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, info, warn};

const PAY_IN_PATH: &str = "/v1/merchant/transfer";
const QUERY_PATH: &str = "/v1/merchant/query";

const REQUEST_TEMPLATE: &str = "{ts}{method}{path}order_no={order_no}merchant_email={merchant_email}transfer_currency={transfer_currency}api_key={api_key}";
const CALLBACK_TEMPLATE: &str = "{method}merchant_email={merchant_email}api_key={api_key}";

pub const HEADER_AUTHORIZE: &str = "AX-AUTHORIZE";
pub const HEADER_TIMESTAMP: &str = "AX-TIMESTAMP";
pub const HEADER_SIGNATURE: &str = "AX-SIGNATURE";

/// Callback acknowledgment; any 200 response is accepted
pub const CALLBACK_ACK: &str = "";

/// Result codes returned in the `code` field
pub mod error_code {
    pub const SUCCESS: i64 = 200;
    pub const FORBIDDEN: i64 = 40301;
    pub const INVALID_CONTENT: i64 = 40001;
    pub const MISSING_HEADER: i64 = 40002;
    pub const INVALID_TIMESTAMP: i64 = 40004;
    pub const CURRENCY_NOT_SUPPORTED: i64 = 40005;
    pub const INVALID_TRANSFER_AMOUNT: i64 = 40006;
    pub const AUTH_FAILED: i64 = 40101;
    pub const SIGNATURE_FAILED: i64 = 40102;
    pub const MERCHANT_NOT_EXIST: i64 = 40210;
    pub const USER_NOT_EXIST: i64 = 40220;
    pub const MERCHANT_ORDER_REPEAT: i64 = 40910;
    pub const MERCHANT_ORDER_NOT_EXIST: i64 = 40920;
    pub const VALUE_INVALID: i64 = 422;
}

/// Description of a result code
pub fn describe_code(code: i64) -> &'static str {
    use error_code::*;
    match code {
        SUCCESS => "success",
        FORBIDDEN => "forbidden domain",
        INVALID_CONTENT => "invalid content type",
        MISSING_HEADER => "missing header parameters",
        INVALID_TIMESTAMP => "invalid timestamp",
        CURRENCY_NOT_SUPPORTED => "currency not support",
        INVALID_TRANSFER_AMOUNT => "invalid transfer amount",
        AUTH_FAILED => "authentication key failed",
        SIGNATURE_FAILED => "signature verification failed",
        MERCHANT_NOT_EXIST => "merchant account is not exist or not active",
        USER_NOT_EXIST => "user account is not exist or not active",
        MERCHANT_ORDER_REPEAT => "merchant order repeat",
        MERCHANT_ORDER_NOT_EXIST => "merchant order not exist",
        VALUE_INVALID => "value invalid",
        _ => "unknown error",
    }
}

/// Decimal places a pay-in currency accepts
pub fn currency_scale(currency: &str) -> Option<u32> {
    match currency {
        "USD" | "EUR" | "GBP" => Some(2),
        "JPY" => Some(0),
        _ => None,
    }
}

/// Pay-in status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayInStatus {
    Processing,
    Completed,
    Canceled,
}

impl PayInStatus {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "processing" => Some(Self::Processing),
            "process_complete" => Some(Self::Completed),
            "cancel" => Some(Self::Canceled),
            _ => None,
        }
    }
}

/// Peska configuration
#[derive(Debug)]
pub struct PeskaConfig {
    pub base_url: String,
    pub merchant_email: String,
    /// Sent in the clear as `AX-AUTHORIZE`
    pub api_key: String,
    /// HMAC key
    pub secret: SecretString,
    pub callback_url: String,
    pub success_url: String,
}

impl PeskaConfig {
    pub fn new(
        base_url: impl Into<String>,
        merchant_email: impl Into<String>,
        api_key: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            merchant_email: merchant_email.into(),
            api_key: api_key.into(),
            secret: SecretString::new(secret.into().into()),
            callback_url: String::new(),
            success_url: String::new(),
        }
    }

    pub fn callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = url.into();
        self
    }

    pub fn success_url(mut self, url: impl Into<String>) -> Self {
        self.success_url = url.into();
        self
    }

    pub fn from_env(loader: &EnvLoader) -> GatewayResult<Self> {
        Ok(Self::new(
            loader.load_var("base_url")?,
            loader.load_var("merchant_email")?,
            loader.load_var("api_key")?,
            loader.load_var("secret")?,
        )
        .callback_url(loader.load_var_or("callback_url", ""))
        .success_url(loader.load_var_or("success_url", "")))
    }
}

/// Pay-in request
#[derive(Debug, Clone)]
pub struct PayInRequest {
    pub merchant_order_id: String,
    /// Email of the Peska user paying
    pub registered_email: String,
    pub amount: Decimal,
    pub currency: String,
    pub client_ip: Option<String>,
    pub message: Option<String>,
}

impl PayInRequest {
    pub fn validate(&self) -> GatewayResult<()> {
        if self.merchant_order_id.is_empty() {
            return Err(GatewayError::Validation("order no is empty".to_string()));
        }
        if self.registered_email.is_empty() {
            return Err(GatewayError::Validation("registered email is empty".to_string()));
        }
        if !is_positive(self.amount) {
            return Err(GatewayError::Validation("invalid transfer amount".to_string()));
        }
        let scale = currency_scale(&self.currency).ok_or_else(|| {
            GatewayError::Validation(format!("currency {} is not supported", self.currency))
        })?;
        if !fits_scale(self.amount, scale) {
            return Err(GatewayError::Validation(format!(
                "{} amounts allow at most {} decimal places",
                self.currency, scale
            )));
        }
        Ok(())
    }

    fn payload<'a>(&'a self, config: &'a PeskaConfig) -> PayInPayload<'a> {
        let scale = currency_scale(&self.currency).unwrap_or(2);
        let optional = |s: &'a str| (!s.is_empty()).then_some(s);
        PayInPayload {
            merchant_email: &config.merchant_email,
            order_no: &self.merchant_order_id,
            registered_email: &self.registered_email,
            client_ip: self.client_ip.as_deref(),
            transfer_amount: format_fixed(self.amount, scale),
            transfer_currency: &self.currency,
            callback_url: optional(&config.callback_url),
            success_url: optional(&config.success_url),
            referrer_url: optional(&config.success_url),
            message: self.message.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PayInPayload<'a> {
    merchant_email: &'a str,
    order_no: &'a str,
    registered_email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_ip: Option<&'a str>,
    transfer_amount: String,
    transfer_currency: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    success_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    referrer_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct QueryPayload<'a> {
    merchant_email: &'a str,
    order_no: &'a str,
    transfer_currency: &'a str,
}

/// Common response envelope
#[derive(Debug, Deserialize)]
struct PeskaResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    code: i64,
    /// A string, or a field error map when `code` is 422
    #[serde(default)]
    message: serde_json::Value,
    #[serde(default)]
    data: serde_json::Value,
}

impl PeskaResponse {
    fn message_text(&self) -> String {
        match &self.message {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    fn into_data<T: DeserializeOwned>(self) -> GatewayResult<T> {
        if !self.success || self.code != error_code::SUCCESS {
            let message = self.message_text();
            warn!(code = self.code, message = %message, "Peska request failed");
            return Err(GatewayError::provider(
                self.code,
                format!("{}: {}", describe_code(self.code), message),
            ));
        }
        Ok(serde_json::from_value(self.data)?)
    }
}

/// Pay-in created by [`PeskaClient::pay_in`]
#[derive(Debug, Clone, Deserialize)]
pub struct PayInReply {
    pub order_no: String,
    pub merchant_email: String,
    pub registered_email: String,
    #[serde(default)]
    pub registered_account_number: i64,
    #[serde(default)]
    pub registered_name: String,
    pub transfer_currency: String,
    pub transfer_amount: Decimal,
    pub status: String,
    pub trade_url: String,
}

/// Pay-in record returned by [`PeskaClient::query_pay_in`]
#[derive(Debug, Clone, Deserialize)]
pub struct PayInRecord {
    pub order_no: String,
    pub merchant_email: String,
    pub registered_email: String,
    #[serde(default)]
    pub registered_account_number: i64,
    #[serde(default)]
    pub registered_name: String,
    pub transfer_currency: String,
    pub transfer_amount: Decimal,
    #[serde(default)]
    pub fee_side: String,
    #[serde(default)]
    pub fee: Decimal,
    #[serde(default)]
    pub total_amount: Decimal,
    pub status: String,
    /// `YYYY-MM-DD HH:MM:SS`
    #[serde(default)]
    pub expiration_date: String,
}

impl PayInRecord {
    pub fn status(&self) -> Option<PayInStatus> {
        PayInStatus::from_code(&self.status)
    }
}

/// Pay-in callback (JSON body)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayInCallback {
    pub order_no: String,
    pub merchant_email: String,
    #[serde(default)]
    pub registered_email: String,
    #[serde(default)]
    pub registered_account_number: i64,
    #[serde(default)]
    pub registered_name: String,
    pub transfer_currency: String,
    pub transfer_amount: Decimal,
    #[serde(default)]
    pub fee: Decimal,
    pub total_amount: Decimal,
    #[serde(default)]
    pub payin_id: i64,
    pub status: String,
    #[serde(default)]
    pub transfer_id: String,
    pub completed_at: Option<String>,
    pub cancel_reason: Option<String>,
    pub message: Option<String>,
    pub signature: String,
}

impl PayInCallback {
    pub fn from_json(body: &[u8]) -> GatewayResult<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Total credited, fee included
    pub fn amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn status(&self) -> Option<PayInStatus> {
        PayInStatus::from_code(&self.status)
    }

    pub fn is_success(&self) -> bool {
        self.status() == Some(PayInStatus::Completed)
    }

    pub fn is_canceled(&self) -> bool {
        self.status() == Some(PayInStatus::Canceled)
    }
}

/// Peska client
#[derive(Debug)]
pub struct PeskaClient {
    config: PeskaConfig,
    client: ProviderClient,
    request_scheme: SigningScheme,
    callback_scheme: SigningScheme,
}

impl PeskaClient {
    pub fn new(config: PeskaConfig) -> GatewayResult<Self> {
        if config.api_key.is_empty() || config.secret.expose_secret().is_empty() {
            return Err(GatewayError::Config("secret or key is empty".to_string()));
        }
        let scheme = |template: &str| -> GatewayResult<SigningScheme> {
            Ok(SigningScheme::new(
                Template::parse(template)?,
                DigestAlgorithm::HmacSha256,
                DigestEncoding::LowerHex,
                KeyMaterial::shared(config.secret.expose_secret()),
            )?)
        };
        let request_scheme = scheme(REQUEST_TEMPLATE)?;
        let callback_scheme = scheme(CALLBACK_TEMPLATE)?;
        let client = ProviderClient::new(&config.base_url)?;

        Ok(Self {
            config,
            client,
            request_scheme,
            callback_scheme,
        })
    }

    fn signature(&self, ts: i64, path: &str, order_no: &str, currency: &str) -> GatewayResult<String> {
        let fields = FieldSet::new()
            .with("ts", ts.to_string())
            .with("method", "POST")
            .with("path", path)
            .with("order_no", order_no)
            .with("merchant_email", &self.config.merchant_email)
            .with("transfer_currency", currency)
            .with("api_key", &self.config.api_key);
        Ok(self.request_scheme.sign(&fields)?)
    }

    async fn post<T: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
        order_no: &str,
        currency: &str,
    ) -> GatewayResult<R> {
        let ts = Utc::now().timestamp();
        let headers = [
            ("Accept", "application/json".to_string()),
            (HEADER_AUTHORIZE, self.config.api_key.clone()),
            (HEADER_TIMESTAMP, ts.to_string()),
            (HEADER_SIGNATURE, self.signature(ts, path, order_no, currency)?),
        ];
        let response = self.client.post_json(path, body, &headers).await?;
        let reply: PeskaResponse = ProviderClient::read_json(response).await?;
        reply.into_data()
    }

    /// Create a pay-in and return the trade page
    pub async fn pay_in(&self, request: &PayInRequest) -> GatewayResult<PayInReply> {
        request.validate()?;
        let payload = request.payload(&self.config);
        debug!(order = %request.merchant_order_id, "Sending Peska pay-in");
        self.post(PAY_IN_PATH, &payload, &request.merchant_order_id, &request.currency)
            .await
    }

    /// Look a pay-in up by order number
    pub async fn query_pay_in(&self, order_no: &str, currency: &str) -> GatewayResult<PayInRecord> {
        if order_no.is_empty() {
            return Err(GatewayError::Validation("order no is empty".to_string()));
        }
        let payload = QueryPayload {
            merchant_email: &self.config.merchant_email,
            order_no,
            transfer_currency: currency,
        };
        self.post(QUERY_PATH, &payload, order_no, currency).await
    }

    /// Check the merchant email, then the signature
    pub fn verify_callback(&self, callback: &PayInCallback) -> GatewayResult<()> {
        if callback.merchant_email != self.config.merchant_email {
            return Err(GatewayError::Callback("merchant email not match".to_string()));
        }
        let fields = FieldSet::new()
            .with("method", "POST")
            .with("merchant_email", &callback.merchant_email)
            .with("api_key", &self.config.api_key);
        self.callback_scheme.verify(&fields, &callback.signature)?;
        info!(order = %callback.order_no, status = %callback.status, "Peska callback verified");
        Ok(())
    }

    pub fn acknowledge(&self, callback: &PayInCallback) -> GatewayResult<&'static str> {
        self.verify_callback(callback)?;
        Ok(CALLBACK_ACK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base: &str) -> PeskaConfig {
        PeskaConfig::new(base, "m@x.com", "AK", "sec").success_url("https://shop.example.com/ok")
    }

    fn request() -> PayInRequest {
        PayInRequest {
            merchant_order_id: "O1".into(),
            registered_email: "user@example.com".into(),
            amount: Decimal::from_str("12.5").unwrap(),
            currency: "USD".into(),
            client_ip: None,
            message: None,
        }
    }

    fn callback(signature: &str) -> PayInCallback {
        let json = serde_json::json!({
            "order_no": "O1",
            "merchant_email": "m@x.com",
            "registered_email": "user@example.com",
            "registered_account_number": 1000123,
            "registered_name": "Ann",
            "transfer_currency": "USD",
            "transfer_amount": "12.50",
            "fee": "0.50",
            "total_amount": "13.00",
            "payin_id": 55,
            "status": "process_complete",
            "transfer_id": "TR-1",
            "completed_at": "2024-01-02 03:04:05",
            "cancel_reason": null,
            "message": null,
            "signature": signature
        });
        PayInCallback::from_json(&serde_json::to_vec(&json).unwrap()).unwrap()
    }

    #[test]
    fn test_request_signature_vector() {
        let client = PeskaClient::new(config("https://peska.example.com")).unwrap();
        assert_eq!(
            client.signature(1_700_000_000, PAY_IN_PATH, "O1", "USD").unwrap(),
            "db4c3f9af3a785c57fedc7930639ade2ca9ac285d0f4d44c29d934247a6a62be"
        );
    }

    #[test]
    fn test_validation() {
        let mut req = request();
        req.currency = "JPY".into();
        assert!(req.validate().is_err());
        req.amount = Decimal::from(1200);
        assert!(req.validate().is_ok());

        let mut req = request();
        req.currency = "CNY".into();
        assert!(matches!(req.validate(), Err(GatewayError::Validation(_))));
    }

    #[test]
    fn test_payload_omits_empty_urls() {
        let config = config("https://peska.example.com");
        let json = serde_json::to_value(request().payload(&config)).unwrap();
        assert_eq!(json["transfer_amount"], "12.50");
        assert_eq!(json["referrer_url"], "https://shop.example.com/ok");
        assert!(json.get("callback_url").is_none());
        assert!(json.get("client_ip").is_none());
    }

    #[test]
    fn test_empty_credentials_rejected() {
        let config = PeskaConfig::new("https://peska.example.com", "m@x.com", "", "sec");
        assert!(matches!(PeskaClient::new(config), Err(GatewayError::Config(_))));
    }

    #[test]
    fn test_callback_verification() {
        let client = PeskaClient::new(config("https://peska.example.com")).unwrap();
        let cb = callback("28ADA20FDE8C670E4A48B169B7FBB2B6829E8417205C71FA8FD7A6244D325F4B");
        assert!(cb.is_success());
        assert_eq!(cb.amount(), Decimal::from(13));
        assert_eq!(client.acknowledge(&cb).unwrap(), "");

        let mut other = cb.clone();
        other.merchant_email = "other@x.com".into();
        assert!(matches!(
            client.verify_callback(&other),
            Err(GatewayError::Callback(_))
        ));

        let forged = callback("00");
        assert!(client.verify_callback(&forged).unwrap_err().is_rejection());
    }

    #[tokio::test]
    async fn test_pay_in() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PAY_IN_PATH))
            .and(header(HEADER_AUTHORIZE, "AK"))
            .and(body_partial_json(serde_json::json!({
                "merchant_email": "m@x.com",
                "order_no": "O1",
                "transfer_currency": "USD"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "code": 200,
                "message": "ok",
                "data": {
                    "order_no": "O1",
                    "merchant_email": "m@x.com",
                    "registered_email": "user@example.com",
                    "registered_account_number": 1000123,
                    "registered_name": "Ann",
                    "transfer_currency": "USD",
                    "transfer_amount": "12.50",
                    "status": "processing",
                    "trade_url": "https://peska.example.com/trade/1"
                }
            })))
            .mount(&server)
            .await;

        let client = PeskaClient::new(config(&server.uri())).unwrap();
        let reply = client.pay_in(&request()).await.unwrap();
        assert_eq!(reply.trade_url, "https://peska.example.com/trade/1");
        assert_eq!(PayInStatus::from_code(&reply.status), Some(PayInStatus::Processing));
    }

    #[tokio::test]
    async fn test_query_validation_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(QUERY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "code": 422,
                "message": {"order_no": ["required"]},
                "data": null
            })))
            .mount(&server)
            .await;

        let client = PeskaClient::new(config(&server.uri())).unwrap();
        match client.query_pay_in("O1", "USD").await {
            Err(GatewayError::Provider { code, message }) => {
                assert_eq!(code, "422");
                assert!(message.starts_with("value invalid"));
                assert!(message.contains("required"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
