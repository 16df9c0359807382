//! IFP buy-coin adapter
//!
//! Every request carries `access-key`, `timestamp` and `signature` headers.
//! The signature is an upper-case HMAC-SHA256 of `{access key}_{timestamp}`
//! keyed by the merchant's private key. Callbacks are signed the same way
//! over the timestamp they carry.

use crate::{
    GatewayError, GatewayResult, amount::is_positive, client::ProviderClient, config::EnvLoader,
};
use chrono::Utc;
use paygate_signing::{DigestAlgorithm, DigestEncoding, FieldSet, KeyMaterial, SigningScheme, Template};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const BUY_PATH: &str = "/api/buy-coin/transaction";
const QUERY_PATH: &str = "/api/get-order/";

const SIGNATURE_TEMPLATE: &str = "{AccessKey}_{Timestamp}";

pub const HEADER_ACCESS_KEY: &str = "access-key";
pub const HEADER_TIMESTAMP: &str = "timestamp";
pub const HEADER_SIGNATURE: &str = "signature";

/// Smallest USDD quantity a buy-by-quantity order accepts
pub const MIN_USDD_AMOUNT: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Status codes returned by the API and in callbacks
pub mod status_code {
    pub const SUCCESS: &str = "SUCCESS";
    pub const TIMESTAMP_ERROR: &str = "TIMESTAMP_ERROR";
    pub const SIGNATURE_ERROR: &str = "SIGNATURE_ERROR";
    pub const ACCESS_KEY_ERROR: &str = "ACCESS_KEY_ERROR";
    pub const PARAMETER_ERROR: &str = "PARAMETER_ERROR";
    pub const NO_ADVERTISEMENT: &str = "NO_ADVERTISEMENT";
    pub const ACCOUNT_STATUS_ERROR: &str = "ACCOUNT_STATUS_ERROR";
    pub const SYSTEM_ERROR: &str = "SYSTEM_ERROR";
    pub const TRADE_CANCELED: &str = "TRADE_CANCELED";
    pub const NO_ORDER: &str = "NO_ORDER";
}

/// How the order amount is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuyCoinMode {
    /// Total fiat price
    #[serde(rename = "PaymentPrice")]
    Fiat,
    /// Quantity of USDD
    #[serde(rename = "UsddAmount")]
    Usdd,
}

/// Order lifecycle as reported by the order query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Created,
    FiatTransferred,
    Confirmed,
    Canceled,
    ConfirmedByAdmin,
    DiscardedByAdmin,
    TimeoutCanceled,
}

impl OrderStatus {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Created),
            1 => Some(Self::FiatTransferred),
            2 => Some(Self::Confirmed),
            3 => Some(Self::Canceled),
            4 => Some(Self::ConfirmedByAdmin),
            5 => Some(Self::DiscardedByAdmin),
            6 => Some(Self::TimeoutCanceled),
            _ => None,
        }
    }
}

/// Map a language tag onto the cashier's supported languages
pub fn language_code(tag: &str) -> &'static str {
    let lower = tag.to_ascii_lowercase().replace('_', "-");
    let mut parts = lower.split('-');
    match parts.next().unwrap_or_default() {
        "zh" => match parts.next() {
            Some("hant" | "tw" | "hk" | "mo") => "zh_TW",
            _ => "zh_CN",
        },
        "vi" => "vi",
        "id" | "in" => "id",
        _ => "en",
    }
}

/// IFP configuration
#[derive(Debug)]
pub struct IfpConfig {
    pub base_url: String,
    pub access_key: String,
    pub private_key: SecretString,
    pub callback_url: String,
}

impl IfpConfig {
    pub fn new(
        base_url: impl Into<String>,
        access_key: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            access_key: access_key.into(),
            private_key: SecretString::new(private_key.into().into()),
            callback_url: String::new(),
        }
    }

    pub fn callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = url.into();
        self
    }

    pub fn from_env(loader: &EnvLoader) -> GatewayResult<Self> {
        Ok(Self::new(
            loader.load_var("base_url")?,
            loader.load_var("access_key")?,
            loader.load_var("private_key")?,
        )
        .callback_url(loader.load_var_or("callback_url", "")))
    }
}

/// Buy-coin request
#[derive(Debug, Clone)]
pub struct BuyRequest {
    pub merchant_order_id: String,
    /// Fiat total, or USDD quantity when buying USDT
    pub amount: Decimal,
    /// Payment currency such as `CNY` or `VND`; `USDT` selects quantity mode
    pub currency: String,
    pub customer_name: String,
    pub language: Option<String>,
}

impl BuyRequest {
    pub fn mode(&self) -> BuyCoinMode {
        if self.currency.eq_ignore_ascii_case("USDT") {
            BuyCoinMode::Usdd
        } else {
            BuyCoinMode::Fiat
        }
    }

    pub fn validate(&self) -> GatewayResult<()> {
        if self.merchant_order_id.is_empty() {
            return Err(GatewayError::Validation("merchant order id is empty".to_string()));
        }
        if self.customer_name.is_empty() {
            return Err(GatewayError::Validation("user name is empty".to_string()));
        }
        if !is_positive(self.amount) {
            return Err(GatewayError::Validation("amount is zero".to_string()));
        }
        if self.mode() == BuyCoinMode::Usdd && self.amount < MIN_USDD_AMOUNT {
            return Err(GatewayError::Validation(format!(
                "USDD amount must be at least {}",
                MIN_USDD_AMOUNT
            )));
        }
        Ok(())
    }

    fn payload<'a>(&'a self, config: &'a IfpConfig) -> BuyPayload<'a> {
        let amount = self.amount.normalize().to_string();
        let (usdd_amount, total_price) = match self.mode() {
            BuyCoinMode::Usdd => (Some(amount), None),
            BuyCoinMode::Fiat => (None, Some(amount)),
        };
        BuyPayload {
            buy_coin_mode: self.mode(),
            usdd_amount,
            total_price,
            external_order_number: &self.merchant_order_id,
            callback_url: &config.callback_url,
            support_language: language_code(self.language.as_deref().unwrap_or_default()),
            currency_code: &self.currency,
            payer_real_name: &self.customer_name,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BuyPayload<'a> {
    buy_coin_mode: BuyCoinMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    usdd_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_price: Option<String>,
    external_order_number: &'a str,
    callback_url: &'a str,
    support_language: &'static str,
    currency_code: &'a str,
    payer_real_name: &'a str,
}

/// Common response envelope
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IfpResponse<T> {
    data: Option<T>,
    #[serde(default)]
    status_code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    success: bool,
}

impl<T> IfpResponse<T> {
    fn into_data(self, action: &str) -> GatewayResult<T> {
        if !self.success || self.status_code != status_code::SUCCESS {
            warn!(code = %self.status_code, message = %self.message, "IFP {} failed", action);
            return Err(GatewayError::provider(self.status_code, self.message));
        }
        self.data
            .ok_or_else(|| GatewayError::Serialization(format!("{} response has no data", action)))
    }
}

/// Accepted buy order
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BuyReply {
    pub redirect_url: String,
    #[serde(default)]
    pub advertisement_code: String,
}

/// Order details returned by the order query
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderInfo {
    #[serde(rename = "code")]
    pub order_code: String,
    #[serde(default)]
    pub callback_url: String,
    pub currency_code: String,
    #[serde(default)]
    pub payer_real_name: String,
    pub status: i32,
    pub total_price: Decimal,
    pub unit_price: Decimal,
    pub usdd_amount: Decimal,
    /// UTC, `YYYY-MM-DD HH:MM:SS`
    pub transaction_create_time: String,
    #[serde(default)]
    pub payment_finished_time: String,
}

impl OrderInfo {
    pub fn status(&self) -> Option<OrderStatus> {
        OrderStatus::from_code(self.status)
    }
}

/// Payment data carried by a callback
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackData {
    pub external_order_number: String,
    pub transaction_code: String,
    #[serde(default)]
    pub transaction_amount: String,
    #[serde(default)]
    pub currency_code: String,
    #[serde(default)]
    pub payment_price: String,
    pub transaction_create_time: String,
    #[serde(default)]
    pub payment_finished_time: String,
}

/// Buy result callback (JSON body)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyCallback {
    pub success: bool,
    pub status_code: String,
    #[serde(default)]
    pub message: String,
    pub signature: String,
    /// Unix milliseconds; this is what the signature covers
    pub timestamp: i64,
    pub data: CallbackData,
}

impl BuyCallback {
    pub fn from_json(body: &[u8]) -> GatewayResult<Self> {
        let callback: Self = serde_json::from_slice(body)?;
        callback.validate()?;
        Ok(callback)
    }

    fn validate(&self) -> GatewayResult<()> {
        let missing = |what: &str| Err(GatewayError::Callback(format!("missing {}", what)));
        if self.status_code.is_empty() {
            return missing("statusCode");
        }
        if self.signature.is_empty() {
            return missing("signature");
        }
        if self.timestamp == 0 {
            return missing("timestamp");
        }
        if self.data.external_order_number.is_empty() {
            return missing("externalOrderNumber");
        }
        if self.data.transaction_code.is_empty() {
            return missing("transactionCode");
        }
        self.amount()?;
        self.payment_price()?;
        Ok(())
    }

    /// USDD quantity traded
    pub fn amount(&self) -> GatewayResult<Decimal> {
        parse_optional_decimal(&self.data.transaction_amount, "transactionAmount")
    }

    /// Fiat amount paid
    pub fn payment_price(&self) -> GatewayResult<Decimal> {
        parse_optional_decimal(&self.data.payment_price, "paymentPrice")
    }

    pub fn is_success(&self) -> bool {
        self.success && self.status_code == status_code::SUCCESS
    }
}

fn parse_optional_decimal(text: &str, name: &str) -> GatewayResult<Decimal> {
    if text.is_empty() {
        return Ok(Decimal::ZERO);
    }
    text.parse()
        .map_err(|e| GatewayError::Callback(format!("invalid {} {}: {}", name, text, e)))
}

/// Acknowledgment body expected after a verified callback
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CallbackReply {
    pub success: bool,
}

/// IFP client
#[derive(Debug)]
pub struct IfpClient {
    config: IfpConfig,
    client: ProviderClient,
    scheme: SigningScheme,
}

impl IfpClient {
    pub fn new(config: IfpConfig) -> GatewayResult<Self> {
        let scheme = SigningScheme::new(
            Template::parse(SIGNATURE_TEMPLATE)?,
            DigestAlgorithm::HmacSha256,
            DigestEncoding::UpperHex,
            KeyMaterial::shared(config.private_key.expose_secret()),
        )?;
        let client = ProviderClient::new(&config.base_url)?;

        Ok(Self {
            config,
            client,
            scheme,
        })
    }

    fn signature(&self, timestamp: i64) -> GatewayResult<String> {
        let fields = FieldSet::new()
            .with("AccessKey", &self.config.access_key)
            .with("Timestamp", timestamp.to_string());
        Ok(self.scheme.sign(&fields)?)
    }

    fn auth_headers(&self) -> GatewayResult<Vec<(&'static str, String)>> {
        let timestamp = Utc::now().timestamp_millis();
        Ok(vec![
            (HEADER_ACCESS_KEY, self.config.access_key.clone()),
            (HEADER_TIMESTAMP, timestamp.to_string()),
            (HEADER_SIGNATURE, self.signature(timestamp)?),
        ])
    }

    /// Place a buy order and return the cashier link
    pub async fn buy(&self, request: &BuyRequest) -> GatewayResult<BuyReply> {
        request.validate()?;
        let payload = request.payload(&self.config);
        let headers = self.auth_headers()?;

        debug!(order = %request.merchant_order_id, mode = ?payload.buy_coin_mode, "Sending IFP buy order");
        let response = self.client.post_json(BUY_PATH, &payload, &headers).await?;
        let reply: IfpResponse<BuyReply> = ProviderClient::read_json(response).await?;
        reply.into_data("buy")
    }

    /// Look an order up by the merchant order ID
    pub async fn query(&self, merchant_order_id: &str) -> GatewayResult<OrderInfo> {
        if merchant_order_id.is_empty() {
            return Err(GatewayError::Validation("merchant order id is empty".to_string()));
        }
        let path = format!("{}{}", QUERY_PATH, merchant_order_id);
        let headers = self.auth_headers()?;

        let response = self.client.get(&path, &[], &headers).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::provider(
                status.as_u16(),
                format!("unexpected status code: {}", status),
            ));
        }
        let reply: IfpResponse<OrderInfo> = ProviderClient::read_json(response).await?;
        reply.into_data("query")
    }

    pub fn verify_callback(&self, callback: &BuyCallback) -> GatewayResult<()> {
        let fields = FieldSet::new()
            .with("AccessKey", &self.config.access_key)
            .with("Timestamp", callback.timestamp.to_string());
        self.scheme.verify(&fields, &callback.signature)?;
        info!(order = %callback.data.external_order_number, status = %callback.status_code, "IFP callback verified");
        Ok(())
    }

    pub fn acknowledge(&self, callback: &BuyCallback) -> GatewayResult<CallbackReply> {
        self.verify_callback(callback)?;
        Ok(CallbackReply { success: true })
    }
}
