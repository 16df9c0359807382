//! Long77 virtual-account pay-in adapter
//!
//! Pay-in links are created with a GET request whose query carries an MD5
//! over colon-joined fields, a fresh timestamp and a random nonce.

use crate::{
    GatewayError, GatewayResult,
    amount::{format_fixed, is_integer, is_positive},
    client::ProviderClient,
    config::EnvLoader,
    wire::number_text,
};
use chrono::Utc;
use paygate_signing::{DigestAlgorithm, DigestEncoding, FieldSet, KeyMaterial, SigningScheme, Template};
use rand::RngCore;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info, warn};

const CREATE_VA_PATH: &str = "/gateway/bnb/createVA.do";

const REQUEST_TEMPLATE: &str = "{partner_id}:{timestamp}:{random}:{partner_order_code}:{amount}:{customer_name}:{payee_name}:{notify_url}:{return_url}:{extra_data}:{partner_secret}";
const CALLBACK_TEMPLATE: &str = "{partner_id}:{system_order_code}:{partner_order_code}:{channel_code}:{amount}:{request_time}:{extra_data}:{payment_id}:{paid_amount}:{fees}:{payment_time}:{bank_code}:{bank_account_no}:{bank_account_name}:{callback_time}:{status}:{partner_secret}";
const SECRET_PLACEHOLDER: &str = "partner_secret";

const RESPONSE_CODE_SUCCESS: i32 = 200;
const PAYMENT_STATUS_SUCCESS: &str = "4";

/// Acknowledgment body for a verified callback
pub const CALLBACK_ACK: &str = "success";

/// Long77 configuration
#[derive(Debug)]
pub struct Long77Config {
    pub base_url: String,
    pub partner_id: String,
    pub secret: SecretString,
    /// Callback URL
    pub notify_url: String,
    /// Where the customer returns after paying
    pub return_url: String,
}

impl Long77Config {
    pub fn new(
        base_url: impl Into<String>,
        partner_id: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            partner_id: partner_id.into(),
            secret: SecretString::new(secret.into().into()),
            notify_url: String::new(),
            return_url: String::new(),
        }
    }

    pub fn notify_url(mut self, url: impl Into<String>) -> Self {
        self.notify_url = url.into();
        self
    }

    pub fn return_url(mut self, url: impl Into<String>) -> Self {
        self.return_url = url.into();
        self
    }

    pub fn from_env(loader: &EnvLoader) -> GatewayResult<Self> {
        Ok(Self::new(
            loader.load_var("base_url")?,
            loader.load_var("partner_id")?,
            loader.load_var("secret")?,
        )
        .notify_url(loader.load_var_or("notify_url", ""))
        .return_url(loader.load_var_or("return_url", "")))
    }
}

/// Pay-in request; amounts are whole VND
#[derive(Debug, Clone, Default)]
pub struct PayInRequest {
    pub merchant_order_id: String,
    pub amount: Decimal,
    pub customer_name: String,
    pub payee_name: String,
    pub extra_data: String,
}

impl PayInRequest {
    pub fn new(merchant_order_id: impl Into<String>, amount: Decimal) -> Self {
        Self {
            merchant_order_id: merchant_order_id.into(),
            amount,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> GatewayResult<()> {
        if self.merchant_order_id.is_empty() {
            return Err(GatewayError::Validation("merchant order id is empty".to_string()));
        }
        if !is_positive(self.amount) || !is_integer(self.amount) {
            return Err(GatewayError::Validation("invalid amount".to_string()));
        }
        Ok(())
    }

    fn fields(&self, config: &Long77Config, timestamp: i64, random: &str) -> FieldSet {
        FieldSet::builder()
            .field("partner_id", &config.partner_id)
            .field("timestamp", timestamp.to_string())
            .field("random", random)
            .field("partner_order_code", &self.merchant_order_id)
            .field("amount", format_fixed(self.amount, 0))
            .field("customer_name", &self.customer_name)
            .field("payee_name", &self.payee_name)
            .field("notify_url", &config.notify_url)
            .field("return_url", &config.return_url)
            .field("extra_data", &self.extra_data)
            .build()
    }
}

/// 16 random bytes, hex encoded
fn nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Debug, Deserialize)]
struct PayInResponseData {
    #[serde(default)]
    system_order_code: String,
    #[serde(default)]
    payment_id: String,
    #[serde(default)]
    payment_url: String,
}

#[derive(Debug, Deserialize)]
struct PayInResponse {
    code: i32,
    #[serde(default)]
    msg: String,
    data: Option<PayInResponseData>,
}

/// Created pay-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayInReply {
    pub supplier_order_code: String,
    pub payment_id: String,
    pub payment_url: String,
}

/// Payment details inside a callback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackPayment {
    #[serde(default)]
    pub payment_id: String,
    #[serde(default)]
    pub paid_amount: String,
    #[serde(default, deserialize_with = "number_text")]
    pub fees: String,
    #[serde(default, deserialize_with = "number_text")]
    pub payment_time: String,
    #[serde(default)]
    pub bank_code: String,
    #[serde(default)]
    pub bank_account_no: String,
    #[serde(default)]
    pub bank_account_name: String,
    #[serde(default, deserialize_with = "number_text")]
    pub callback_time: String,
    #[serde(default, deserialize_with = "number_text")]
    pub status: String,
}

/// Pay-in result callback (JSON body)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayInCallback {
    pub partner_id: String,
    pub system_order_code: String,
    pub partner_order_code: String,
    #[serde(default)]
    pub channel_code: String,
    pub amount: String,
    #[serde(default, deserialize_with = "number_text")]
    pub request_time: String,
    #[serde(default)]
    pub extra_data: String,
    pub payment: CallbackPayment,
    pub sign: String,
}

impl PayInCallback {
    pub fn from_json(body: &[u8]) -> GatewayResult<Self> {
        let callback: Self = serde_json::from_slice(body)?;
        Decimal::from_str(&callback.amount)
            .map_err(|e| GatewayError::Callback(format!("failed to parse amount: {}", e)))?;
        Ok(callback)
    }

    /// Requested amount, or the paid amount when the request carried none
    pub fn amount(&self) -> GatewayResult<Decimal> {
        let parse = |text: &str| {
            Decimal::from_str(text)
                .map_err(|e| GatewayError::Callback(format!("failed to parse amount: {}", e)))
        };
        let amount = parse(&self.amount)?;
        if amount.is_zero() && !self.payment.paid_amount.is_empty() {
            return parse(&self.payment.paid_amount);
        }
        Ok(amount)
    }

    /// Pay-ins are always settled in VND
    pub fn currency(&self) -> &'static str {
        "VND"
    }

    pub fn is_success(&self) -> bool {
        self.payment.status == PAYMENT_STATUS_SUCCESS
    }

    fn signed_fields(&self) -> FieldSet {
        FieldSet::new()
            .with("partner_id", &self.partner_id)
            .with("system_order_code", &self.system_order_code)
            .with("partner_order_code", &self.partner_order_code)
            .with("channel_code", &self.channel_code)
            .with("amount", &self.amount)
            .with("request_time", &self.request_time)
            .with("extra_data", &self.extra_data)
            .with("payment_id", &self.payment.payment_id)
            .with("paid_amount", &self.payment.paid_amount)
            .with("fees", &self.payment.fees)
            .with("payment_time", &self.payment.payment_time)
            .with("bank_code", &self.payment.bank_code)
            .with("bank_account_no", &self.payment.bank_account_no)
            .with("bank_account_name", &self.payment.bank_account_name)
            .with("callback_time", &self.payment.callback_time)
            .with("status", &self.payment.status)
    }
}

/// Long77 client
#[derive(Debug)]
pub struct Long77Client {
    config: Long77Config,
    client: ProviderClient,
    request_scheme: SigningScheme,
    callback_scheme: SigningScheme,
}

impl Long77Client {
    pub fn new(config: Long77Config) -> GatewayResult<Self> {
        let scheme = |template: &str| -> GatewayResult<SigningScheme> {
            Ok(SigningScheme::new(
                Template::parse(template)?
                    .with_secret(SECRET_PLACEHOLDER)
                    .reserved("sign"),
                DigestAlgorithm::Md5,
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

    /// Create a virtual-account pay-in and return its payment page
    pub async fn create_va(&self, request: &PayInRequest) -> GatewayResult<PayInReply> {
        request.validate()?;
        let fields = request.fields(&self.config, Utc::now().timestamp(), &nonce());
        let mut query: Vec<(String, String)> = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        query.push(("sign".to_string(), self.request_scheme.sign(&fields)?));

        debug!(order = %request.merchant_order_id, "Creating Long77 pay-in");
        let response = self.client.get(CREATE_VA_PATH, &query, &[]).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::provider(
                status.as_u16(),
                format!("unexpected status code: {}", status),
            ));
        }

        let reply: PayInResponse = ProviderClient::read_json(response).await?;
        if reply.code != RESPONSE_CODE_SUCCESS {
            warn!(code = reply.code, message = %reply.msg, "Long77 pay-in failed");
            return Err(GatewayError::provider(reply.code, reply.msg));
        }
        let data = reply
            .data
            .ok_or_else(|| GatewayError::Serialization("response has no data".to_string()))?;
        Ok(PayInReply {
            supplier_order_code: data.system_order_code,
            payment_id: data.payment_id,
            payment_url: data.payment_url,
        })
    }

    /// Check the partner ID, then the signature
    pub fn verify_callback(&self, callback: &PayInCallback) -> GatewayResult<()> {
        if callback.partner_id != self.config.partner_id {
            return Err(GatewayError::Callback(format!(
                "invalid partner id, expected {}, got {}",
                self.config.partner_id, callback.partner_id
            )));
        }
        self.callback_scheme
            .verify(&callback.signed_fields(), &callback.sign)?;
        info!(order = %callback.partner_order_code, status = %callback.payment.status, "Long77 callback verified");
        Ok(())
    }

    pub fn acknowledge(&self, callback: &PayInCallback) -> GatewayResult<&'static str> {
        self.verify_callback(callback)?;
        Ok(CALLBACK_ACK)
    }
}
