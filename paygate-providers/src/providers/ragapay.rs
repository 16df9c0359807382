//! RagaPay hosted checkout adapter
//!
//! Checkout sessions and callbacks are signed with `sha1(md5(UPPER(text)))`
//! where the text is the order identity followed by the merchant password.
//! Callbacks arrive as a query string on the notification URL.

use crate::{
    GatewayError, GatewayResult,
    amount::{fits_scale, format_fixed, is_positive},
    client::ProviderClient,
    config::EnvLoader,
    form::{parse_form, value},
};
use once_cell::sync::Lazy;
use paygate_signing::{DigestAlgorithm, DigestEncoding, FieldSet, KeyMaterial, SigningScheme, Template};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info, warn};

const DEFAULT_BASE_URL: &str = "https://checkout.ragapay.com";
const SESSION_PATH: &str = "/api/v1/session";

const CHECKOUT_TEMPLATE: &str =
    "{OrderNumber}{OrderAmount}{OrderCurrency}{OrderDescription}{MerchantPassword}";
const CALLBACK_TEMPLATE: &str =
    "{PublicID}{OrderNumber}{OrderAmount}{OrderCurrency}{OrderDescription}{MerchantPassword}";
const SECRET_PLACEHOLDER: &str = "MerchantPassword";

/// Minutes a checkout session stays open
const SESSION_EXPIRY_MINUTES: u32 = 30;

/// Acknowledgment body for a verified callback
pub const CALLBACK_ACK: &str = "OK";

pub const OPERATION_PURCHASE: &str = "purchase";

static CURRENCY_DECIMALS: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    let mut table = HashMap::new();
    for code in [
        "USD", "GBP", "EUR", "AED", "CNY", "INR", "AUD", "BGN", "CAD", "CHF", "CZK", "DKK", "HKD",
        "HRK", "HUF", "IDR", "ILS", "JPY", "KES", "MXN", "MYR", "NGN", "NOK", "NZD", "PHP", "PLN",
        "QAR", "RON", "RUB", "SAR", "SEK", "SGD", "THB", "TRY", "UGX", "ZAR",
    ] {
        table.insert(code, 2);
    }
    for code in ["BHD", "KWD", "OMR"] {
        table.insert(code, 3);
    }
    table.insert("VND", 0);
    table
});

/// Decimal places RagaPay expects for `currency`
pub fn currency_decimals(currency: &str) -> Option<u32> {
    CURRENCY_DECIMALS.get(currency).copied()
}

/// Transaction status in callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackStatus {
    Success,
    Fail,
    Waiting,
}

impl CallbackStatus {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "success" => Some(Self::Success),
            "fail" => Some(Self::Fail),
            "waiting" => Some(Self::Waiting),
            _ => None,
        }
    }
}

/// Order status in callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Prepare,
    Settled,
    Pending,
    Decline,
}

impl OrderStatus {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "prepare" => Some(Self::Prepare),
            "settled" => Some(Self::Settled),
            "pending" => Some(Self::Pending),
            "decline" => Some(Self::Decline),
            _ => None,
        }
    }
}

/// RagaPay configuration
#[derive(Debug)]
pub struct RagaPayConfig {
    /// Merchant key, also the public ID in callback hashes
    pub public_id: String,
    pub password: SecretString,
    pub success_url: String,
    pub base_url: String,
}

impl RagaPayConfig {
    pub fn new(public_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            public_id: public_id.into(),
            password: SecretString::new(password.into().into()),
            success_url: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn success_url(mut self, url: impl Into<String>) -> Self {
        self.success_url = url.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn from_env(loader: &EnvLoader) -> GatewayResult<Self> {
        Ok(
            Self::new(loader.load_var("public_id")?, loader.load_var("password")?)
                .success_url(loader.load_var_or("success_url", ""))
                .base_url(loader.load_var_or("base_url", DEFAULT_BASE_URL)),
        )
    }
}

/// Purchase checkout request
#[derive(Debug, Clone)]
pub struct PurchaseRequest {
    pub merchant_order_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
}

impl PurchaseRequest {
    pub fn validate(&self) -> GatewayResult<()> {
        if self.merchant_order_id.is_empty() {
            return Err(GatewayError::Validation("order ID is required".to_string()));
        }
        if !is_positive(self.amount) {
            return Err(GatewayError::Validation(
                "amount must be greater than zero".to_string(),
            ));
        }
        let decimals = currency_decimals(&self.currency).ok_or_else(|| {
            GatewayError::Validation(format!("unsupported currency: {}", self.currency))
        })?;
        if !fits_scale(self.amount, decimals) {
            return Err(GatewayError::Validation(format!(
                "unsupported currency precision: {}: {}",
                self.currency, decimals
            )));
        }
        Ok(())
    }

    fn order(&self) -> Order {
        let decimals = currency_decimals(&self.currency).unwrap_or(2);
        Order {
            number: self.merchant_order_id.clone(),
            amount: format_fixed(self.amount, decimals),
            currency: self.currency.clone(),
            description: self.description.clone(),
        }
    }

    fn customer(&self) -> Option<Customer> {
        if self.customer_name.is_none() && self.customer_email.is_none() {
            return None;
        }
        Some(Customer {
            name: self.customer_name.clone(),
            email: self.customer_email.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct Order {
    number: String,
    amount: String,
    currency: String,
    description: String,
}

impl Order {
    fn signed_fields(&self) -> FieldSet {
        FieldSet::new()
            .with("OrderNumber", &self.number)
            .with("OrderAmount", &self.amount)
            .with("OrderCurrency", &self.currency)
            .with("OrderDescription", &self.description)
    }
}

#[derive(Debug, Clone, Serialize)]
struct Customer {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

#[derive(Debug, Serialize)]
struct CheckoutPayload<'a> {
    merchant_key: &'a str,
    operation: &'static str,
    session_expiry: u32,
    success_url: &'a str,
    hash: String,
    order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    customer: Option<Customer>,
}

#[derive(Debug, Deserialize)]
struct CheckoutResponse {
    redirect_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    error_message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    error_message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

/// Opened checkout session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseReply {
    pub redirect_url: String,
}

/// Checkout result callback, delivered as a query string
#[derive(Debug, Clone)]
pub struct CheckoutCallback {
    pub transaction_id: String,
    pub order_number: String,
    /// Amount exactly as transmitted
    pub order_amount: String,
    pub order_currency: String,
    pub order_description: String,
    pub order_status: String,
    pub kind: String,
    pub status: String,
    pub reason: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_country: String,
    pub customer_ip: String,
    pub card: String,
    pub rrn: String,
    pub approval_code: String,
    pub date: String,
    pub custom_data: HashMap<String, String>,
    pub hash: String,
}

impl CheckoutCallback {
    pub fn from_fields(fields: &FieldSet) -> GatewayResult<Self> {
        let custom = value(fields, "custom_data");
        let custom_data = if custom.is_empty() {
            HashMap::new()
        } else {
            serde_json::from_str(&custom)
                .map_err(|e| GatewayError::Callback(format!("invalid custom_data: {}", e)))?
        };
        let callback = Self {
            transaction_id: value(fields, "id"),
            order_number: value(fields, "order_number"),
            order_amount: value(fields, "order_amount"),
            order_currency: value(fields, "order_currency"),
            order_description: value(fields, "order_description"),
            order_status: value(fields, "order_status"),
            kind: value(fields, "type"),
            status: value(fields, "status"),
            reason: value(fields, "reason"),
            customer_name: value(fields, "customer_name"),
            customer_email: value(fields, "customer_email"),
            customer_country: value(fields, "customer_country"),
            customer_ip: value(fields, "customer_ip"),
            card: value(fields, "card"),
            rrn: value(fields, "rrn"),
            approval_code: value(fields, "approval_code"),
            date: value(fields, "date"),
            custom_data,
            hash: value(fields, "hash"),
        };
        callback.amount()?;
        Ok(callback)
    }

    /// Parse the raw query string of the notification request
    pub fn from_query(query: &str) -> GatewayResult<Self> {
        Self::from_fields(&parse_form(query))
    }

    pub fn amount(&self) -> GatewayResult<Decimal> {
        Decimal::from_str(&self.order_amount)
            .map_err(|e| GatewayError::Callback(format!("invalid order_amount: {}", e)))
    }

    pub fn status(&self) -> Option<CallbackStatus> {
        CallbackStatus::from_code(&self.status)
    }

    pub fn order_status(&self) -> Option<OrderStatus> {
        OrderStatus::from_code(&self.order_status)
    }

    pub fn is_success(&self) -> bool {
        self.status() == Some(CallbackStatus::Success)
    }

    fn signed_fields(&self, public_id: &str) -> FieldSet {
        FieldSet::new()
            .with("PublicID", public_id)
            .with("OrderNumber", &self.order_number)
            .with("OrderAmount", &self.order_amount)
            .with("OrderCurrency", &self.order_currency)
            .with("OrderDescription", &self.order_description)
    }
}

/// RagaPay client
#[derive(Debug)]
pub struct RagaPayClient {
    config: RagaPayConfig,
    client: ProviderClient,
    checkout_scheme: SigningScheme,
    callback_scheme: SigningScheme,
}

impl RagaPayClient {
    pub fn new(config: RagaPayConfig) -> GatewayResult<Self> {
        let scheme = |template: &str| -> GatewayResult<SigningScheme> {
            Ok(SigningScheme::new(
                Template::parse(template)?
                    .with_secret(SECRET_PLACEHOLDER)
                    .uppercase(),
                DigestAlgorithm::Md5ThenSha1,
                DigestEncoding::LowerHex,
                KeyMaterial::shared(config.password.expose_secret()),
            )?)
        };
        let checkout_scheme = scheme(CHECKOUT_TEMPLATE)?;
        let callback_scheme = scheme(CALLBACK_TEMPLATE)?;
        let client = ProviderClient::new(&config.base_url)?;

        Ok(Self {
            config,
            client,
            checkout_scheme,
            callback_scheme,
        })
    }

    /// Open a purchase checkout session
    pub async fn checkout(&self, request: &PurchaseRequest) -> GatewayResult<PurchaseReply> {
        request.validate()?;
        let order = request.order();
        let payload = CheckoutPayload {
            merchant_key: &self.config.public_id,
            operation: OPERATION_PURCHASE,
            session_expiry: SESSION_EXPIRY_MINUTES,
            success_url: &self.config.success_url,
            hash: self.checkout_scheme.sign(&order.signed_fields())?,
            order,
            customer: request.customer(),
        };

        debug!(order = %request.merchant_order_id, "Opening RagaPay checkout session");
        let response = self.client.post_json(SESSION_PATH, &payload, &[]).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body).ok();
            let message = match detail {
                Some(err) => match err.errors.first() {
                    Some(first) => format!("{} ({})", first.error_message, first.error_code),
                    None => format!("{} ({})", err.error_message, err.error_code),
                },
                None => format!("unexpected status code: {}", status),
            };
            warn!(status = %status, message = %message, "RagaPay checkout failed");
            return Err(GatewayError::provider(status.as_u16(), message));
        }

        let reply: CheckoutResponse = ProviderClient::read_json(response).await?;
        Ok(PurchaseReply {
            redirect_url: reply.redirect_url,
        })
    }

    pub fn verify_callback(&self, callback: &CheckoutCallback) -> GatewayResult<()> {
        self.callback_scheme
            .verify(&callback.signed_fields(&self.config.public_id), &callback.hash)?;
        info!(order = %callback.order_number, status = %callback.status, "RagaPay callback verified");
        Ok(())
    }

    pub fn acknowledge(&self, callback: &CheckoutCallback) -> GatewayResult<&'static str> {
        self.verify_callback(callback)?;
        Ok(CALLBACK_ACK)
    }
}
