//! BFT (Exlink) checkout counter adapter
//!
//! Requests and callbacks are signed with MD5 over the sorted `name=value`
//! pairs followed by `key=<secret>`. Outbound requests use the merchant's
//! private key; callbacks are checked with the platform key.

use crate::{
    GatewayError, GatewayResult,
    amount::{format_fixed, is_integer, is_positive},
    client::ProviderClient,
    config::{EnvLoader, Environment},
};
use paygate_signing::{
    DigestAlgorithm, DigestEncoding, FieldSet, KeyMaterial, SecretSuffix, SigningScheme,
    SortedPolicy,
};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info, warn};

const SANDBOX_BASE_URL: &str = "https://api.maxpay666.com";
const PRODUCTION_BASE_URL: &str = "https://api.exlinked.com";
const CHECKOUT_PATH: &str = "/coin/pay/order/pay/checkout/counter";

/// Union Pay, the only pay type currently offered
pub const PAY_TYPE_UNION_PAY: &str = "1";

const RESPONSE_CODE_SUCCESS: i32 = 1;
const TRADE_STATUS_SUCCESS: &str = "1";

/// BFT configuration
#[derive(Debug)]
pub struct BftConfig {
    pub merchant_id: String,
    pub pay_type: String,
    /// Signs outbound requests
    pub private_key: SecretString,
    /// Verifies callbacks
    pub public_key: SecretString,
    pub environment: Environment,
    /// Overrides the environment's base URL
    pub base_url: Option<String>,
}

impl BftConfig {
    pub fn new(
        merchant_id: impl Into<String>,
        private_key: impl Into<String>,
        public_key: impl Into<String>,
    ) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            pay_type: PAY_TYPE_UNION_PAY.to_string(),
            private_key: SecretString::new(private_key.into().into()),
            public_key: SecretString::new(public_key.into().into()),
            environment: Environment::Sandbox,
            base_url: None,
        }
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn pay_type(mut self, pay_type: impl Into<String>) -> Self {
        self.pay_type = pay_type.into();
        self
    }

    pub fn from_env(loader: &EnvLoader) -> GatewayResult<Self> {
        let mut config = Self::new(
            loader.load_var("merchant_id")?,
            loader.load_var("private_key")?,
            loader.load_var("public_key")?,
        )
        .environment(loader.load_environment()?)
        .pay_type(loader.load_var_or("pay_type", PAY_TYPE_UNION_PAY));
        config.base_url = loader.load_optional("base_url");
        Ok(config)
    }

    fn resolved_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.select(SANDBOX_BASE_URL, PRODUCTION_BASE_URL))
    }
}

/// Checkout request
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Merchant-side unique customer identifier
    pub customer_id: String,
    /// Whole CNY amount
    pub amount: Decimal,
    pub merchant_order_id: String,
    pub customer_name: String,
}

impl CheckoutRequest {
    pub fn validate(&self) -> GatewayResult<()> {
        if self.customer_id.is_empty()
            || self.merchant_order_id.is_empty()
            || self.customer_name.is_empty()
        {
            return Err(GatewayError::Validation("invalid data".to_string()));
        }
        if !is_positive(self.amount) || !is_integer(self.amount) {
            return Err(GatewayError::Validation(
                "amount must be a positive whole number".to_string(),
            ));
        }
        Ok(())
    }

    fn fields(&self, config: &BftConfig) -> FieldSet {
        FieldSet::builder()
            .field("uid", &config.merchant_id)
            .field("uniqueCode", &self.customer_id)
            .field("money", format_fixed(self.amount, 0))
            .field("payType", &config.pay_type)
            .field("orderId", &self.merchant_order_id)
            .field("payerName", &self.customer_name)
            .build()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutPayload<'a> {
    uid: &'a str,
    unique_code: &'a str,
    money: &'a str,
    pay_type: &'a str,
    order_id: &'a str,
    payer_name: &'a str,
    signature: &'a str,
}

impl<'a> CheckoutPayload<'a> {
    fn from_fields(fields: &'a FieldSet) -> Self {
        let get = |name| fields.get(name).unwrap_or_default();
        Self {
            uid: get("uid"),
            unique_code: get("uniqueCode"),
            money: get("money"),
            pay_type: get("payType"),
            order_id: get("orderId"),
            payer_name: get("payerName"),
            signature: get("signature"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CheckoutResponse {
    code: i32,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    success: bool,
}

/// Successful checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutReply {
    pub redirect_url: String,
}

/// Checkout result callback (JSON body)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutCallback {
    pub api_order_no: String,
    pub money: String,
    /// `1` means success, anything else failure
    pub trade_status: String,
    pub trade_id: String,
    pub unique_code: String,
    pub signature: String,
}

impl CheckoutCallback {
    pub fn from_json(body: &[u8]) -> GatewayResult<Self> {
        let callback: Self = serde_json::from_slice(body)?;
        callback.amount()?;
        Ok(callback)
    }

    pub fn amount(&self) -> GatewayResult<Decimal> {
        Decimal::from_str(&self.money)
            .map_err(|e| GatewayError::Callback(format!("invalid money: {}", e)))
    }

    /// Callbacks are always settled in CNY
    pub fn currency(&self) -> &'static str {
        "CNY"
    }

    pub fn is_success(&self) -> bool {
        self.trade_status == TRADE_STATUS_SUCCESS
    }

    fn signed_fields(&self) -> FieldSet {
        FieldSet::new()
            .with("apiOrderNo", &self.api_order_no)
            .with("money", &self.money)
            .with("tradeStatus", &self.trade_status)
            .with("tradeId", &self.trade_id)
            .with("uniqueCode", &self.unique_code)
    }
}

/// Acknowledgment body expected after a verified callback
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CallbackReply {
    pub code: i32,
    pub message: String,
    pub data: Option<serde_json::Value>,
    pub success: bool,
}

impl Default for CallbackReply {
    fn default() -> Self {
        Self {
            code: RESPONSE_CODE_SUCCESS,
            message: "success".to_string(),
            data: None,
            success: true,
        }
    }
}

/// BFT client
#[derive(Debug)]
pub struct BftClient {
    config: BftConfig,
    client: ProviderClient,
    request_scheme: SigningScheme,
    callback_scheme: SigningScheme,
}

impl BftClient {
    pub fn new(config: BftConfig) -> GatewayResult<Self> {
        let scheme = |secret: &SecretString| {
            SigningScheme::new(
                SortedPolicy::new()
                    .suffix(SecretSuffix::KeyValue("key".to_string()))
                    .reserved("signature"),
                DigestAlgorithm::Md5,
                DigestEncoding::LowerHex,
                KeyMaterial::shared(secret.expose_secret()),
            )
        };
        let request_scheme = scheme(&config.private_key)?;
        let callback_scheme = scheme(&config.public_key)?;
        let client = ProviderClient::new(config.resolved_base_url())?;

        Ok(Self {
            config,
            client,
            request_scheme,
            callback_scheme,
        })
    }

    /// Create a checkout and return the page the customer is sent to
    pub async fn checkout(&self, request: &CheckoutRequest) -> GatewayResult<CheckoutReply> {
        request.validate()?;
        let fields = self.request_scheme.sign_into(request.fields(&self.config))?;
        let payload = CheckoutPayload::from_fields(&fields);

        debug!(order = %request.merchant_order_id, "Sending BFT checkout");
        let response = self.client.post_json(CHECKOUT_PATH, &payload, &[]).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::provider(
                status.as_u16(),
                format!("unexpected status code: {}", status),
            ));
        }

        let reply: CheckoutResponse = ProviderClient::read_json(response).await?;
        if reply.code != RESPONSE_CODE_SUCCESS || !reply.success {
            warn!(code = reply.code, message = %reply.message, "BFT checkout failed");
            return Err(GatewayError::provider(
                reply.code,
                format!("checkout failed {}", reply.message),
            ));
        }
        Ok(CheckoutReply {
            redirect_url: reply.data.unwrap_or_default(),
        })
    }

    pub fn verify_callback(&self, callback: &CheckoutCallback) -> GatewayResult<()> {
        self.callback_scheme
            .verify(&callback.signed_fields(), &callback.signature)?;
        info!(order = %callback.api_order_no, status = %callback.trade_status, "BFT callback verified");
        Ok(())
    }

    pub fn acknowledge(&self, callback: &CheckoutCallback) -> GatewayResult<CallbackReply> {
        self.verify_callback(callback)?;
        Ok(CallbackReply::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base: &str) -> BftConfig {
        BftConfig::new("M1", "priv", "pub").base_url(base)
    }

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            customer_id: "C1".into(),
            amount: Decimal::from(100),
            merchant_order_id: "O1".into(),
            customer_name: "Ann".into(),
        }
    }

    #[test]
    fn test_base_url_by_environment() {
        let config = BftConfig::new("M1", "a", "b");
        assert_eq!(config.resolved_base_url(), SANDBOX_BASE_URL);
        let config = config.environment(Environment::Production);
        assert_eq!(config.resolved_base_url(), PRODUCTION_BASE_URL);
    }

    #[test]
    fn test_request_signature_vector() {
        let client = BftClient::new(config("https://api.example.com")).unwrap();
        let fields = client
            .request_scheme
            .sign_into(request().fields(&client.config))
            .unwrap();
        assert_eq!(
            fields.get("signature"),
            Some("6045dbfb24cb11d5dc9ffe9058eeeaf1")
        );
    }

    #[test]
    fn test_fractional_amount_rejected() {
        let mut req = request();
        req.amount = Decimal::from_str("10.5").unwrap();
        assert!(matches!(req.validate(), Err(GatewayError::Validation(_))));
    }

    #[tokio::test]
    async fn test_checkout_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CHECKOUT_PATH))
            .and(body_partial_json(serde_json::json!({
                "uid": "M1",
                "money": "100",
                "payType": "1",
                "signature": "6045dbfb24cb11d5dc9ffe9058eeeaf1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 1,
                "message": "ok",
                "data": "https://pay.example.com/c/1",
                "success": true
            })))
            .mount(&server)
            .await;

        let client = BftClient::new(config(&server.uri())).unwrap();
        let reply = client.checkout(&request()).await.unwrap();
        assert_eq!(reply.redirect_url, "https://pay.example.com/c/1");
    }

    #[tokio::test]
    async fn test_checkout_provider_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "message": "duplicate order",
                "data": null,
                "success": false
            })))
            .mount(&server)
            .await;

        let client = BftClient::new(config(&server.uri())).unwrap();
        let err = client.checkout(&request()).await.unwrap_err();
        assert!(err.to_string().contains("duplicate order"));
    }

    #[test]
    fn test_callback_verification() {
        let client = BftClient::new(config("https://api.example.com")).unwrap();
        let body = br#"{
            "apiOrderNo": "O1",
            "money": "100",
            "tradeStatus": "1",
            "tradeId": "T9",
            "uniqueCode": "C1",
            "signature": "4535D858D5F36177872B60EEDCBE00D7"
        }"#;
        let callback = CheckoutCallback::from_json(body).unwrap();
        assert!(callback.is_success());
        assert_eq!(callback.amount().unwrap(), Decimal::from(100));
        assert_eq!(client.acknowledge(&callback).unwrap().code, 1);

        let mut forged = callback.clone();
        forged.money = "1000".into();
        assert!(client.verify_callback(&forged).unwrap_err().is_rejection());
    }
}
