//! ChipPay OTC buy-order adapter
//!
//! Orders and callbacks are signed with RSA-SHA256 (PKCS#1 v1.5) over the
//! sorted `name=value` pairs, base64 encoded. The merchant signs with its
//! private key; callbacks are checked against the platform's public key.

use crate::{
    GatewayError, GatewayResult,
    amount::{format_fixed, is_integer, is_positive},
    client::ProviderClient,
    config::{EnvLoader, Environment},
};
use chrono::Utc;
use paygate_signing::{
    DigestAlgorithm, DigestEncoding, FieldSet, KeyMaterial, SigningScheme, SortedPolicy,
};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info, warn};

const SANDBOX_BASE_URL: &str = "https://open-v2.chippaytest.com";
const PRODUCTION_BASE_URL: &str = "https://open-v2.chippay.com";
const ADD_ORDER_PATH: &str = "/cola/apiOpen/addOrder";

const STATUS_CODE_SUCCESS: i32 = 200;
const SUPPORTED_CURRENCIES: [&str; 2] = ["CNY", "VND"];

/// Order direction
pub const ORDER_TYPE_BUY: &str = "1";
pub const ORDER_TYPE_SELL: &str = "2";

/// Coin credited to the customer
pub const COIN_SIGN_USDT: &str = "USDT";

/// How the customer pays for the order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderPayChannel {
    Momo = 1,
    Alipay = 2,
    #[default]
    BankCard = 3,
}

/// Trade status reported in callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeStatus {
    Failed,
    Success,
    BatchFailed,
}

impl TradeStatus {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "0" => Some(Self::Failed),
            "1" => Some(Self::Success),
            "2" => Some(Self::BatchFailed),
            _ => None,
        }
    }
}

/// ChipPay configuration
#[derive(Debug)]
pub struct ChipPayConfig {
    pub merchant_id: String,
    /// Merchant private key, base64 PKCS#8 DER or PEM
    pub private_key: SecretString,
    /// Platform public key, base64 SubjectPublicKeyInfo DER or PEM
    pub public_key: String,
    pub callback_url: String,
    pub redirect_url: String,
    pub environment: Environment,
    pub base_url: Option<String>,
}

impl ChipPayConfig {
    pub fn new(
        merchant_id: impl Into<String>,
        private_key: impl Into<String>,
        public_key: impl Into<String>,
    ) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            private_key: SecretString::new(private_key.into().into()),
            public_key: public_key.into(),
            callback_url: String::new(),
            redirect_url: String::new(),
            environment: Environment::Sandbox,
            base_url: None,
        }
    }

    pub fn callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = url.into();
        self
    }

    pub fn redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = url.into();
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn from_env(loader: &EnvLoader) -> GatewayResult<Self> {
        let mut config = Self::new(
            loader.load_var("merchant_id")?,
            loader.load_var("private_key")?,
            loader.load_var("public_key")?,
        )
        .callback_url(loader.load_var_or("callback_url", ""))
        .redirect_url(loader.load_var_or("redirect_url", ""))
        .environment(loader.load_environment()?);
        config.base_url = loader.load_optional("base_url");
        Ok(config)
    }

    fn resolved_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.select(SANDBOX_BASE_URL, PRODUCTION_BASE_URL))
    }
}

/// Buy-coin order request
#[derive(Debug, Clone)]
pub struct BuyCoinRequest {
    pub merchant_order_id: String,
    /// Whole amount in `currency`
    pub amount: Decimal,
    /// `CNY` or `VND`
    pub currency: String,
    pub customer_phone: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub pay_channel: OrderPayChannel,
}

impl BuyCoinRequest {
    pub fn validate(&self) -> GatewayResult<()> {
        let invalid = |msg: &str| Err(GatewayError::Validation(msg.to_string()));
        if self.merchant_order_id.is_empty() {
            return invalid("merchant order ID is required");
        }
        if !is_positive(self.amount) {
            return invalid("amount must be greater than zero");
        }
        if !is_integer(self.amount) {
            return invalid("amount must be an integer");
        }
        if self.currency.is_empty() {
            return invalid("currency is required");
        }
        if !SUPPORTED_CURRENCIES
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&self.currency))
        {
            return Err(GatewayError::Validation(format!(
                "currency {} is not supported",
                self.currency
            )));
        }
        if self.customer_phone.is_empty() {
            return invalid("customer phone is required");
        }
        if self.customer_name.is_empty() {
            return invalid("customer name is required");
        }
        Ok(())
    }

    fn fields(&self, config: &ChipPayConfig, order_time_ms: i64) -> FieldSet {
        FieldSet::builder()
            .field("companyId", &config.merchant_id)
            .field("kyc", "2")
            .field("username", &self.customer_name)
            .field("phone", &self.customer_phone)
            .maybe("email", self.customer_email.as_deref())
            .field("orderType", ORDER_TYPE_BUY)
            .field("companyOrderNum", &self.merchant_order_id)
            .field("coinSign", COIN_SIGN_USDT)
            .field("payCoinSign", self.currency.to_lowercase())
            .field("coinAmount", "")
            .field("total", format_fixed(self.amount, 0))
            .field("orderPayChannel", (self.pay_channel as u8).to_string())
            .field("orderTime", order_time_ms.to_string())
            .field("syncUrl", &config.redirect_url)
            .field("asyncUrl", &config.callback_url)
            .build()
    }
}

#[derive(Debug, Deserialize)]
struct BuyResponseData {
    #[serde(default)]
    link: String,
    #[serde(default, rename = "orderNo")]
    order_no: String,
}

#[derive(Debug, Deserialize)]
struct BuyResponse {
    code: i32,
    #[serde(default)]
    msg: String,
    data: Option<BuyResponseData>,
}

/// Accepted order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyCoinReply {
    pub supplier_order_no: String,
    pub redirect_url: String,
}

/// Buy-coin result callback (JSON body)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyCoinCallback {
    pub coin_amount: String,
    pub coin_sign: String,
    pub company_order_num: String,
    pub otc_order_num: String,
    pub order_type: String,
    pub trade_status: String,
    #[serde(default)]
    pub cancel_reason: String,
    pub trade_order_time: String,
    pub unit_price: String,
    pub total: String,
    pub success_amount: String,
    pub sign: String,
}

impl BuyCoinCallback {
    pub fn from_json(body: &[u8]) -> GatewayResult<Self> {
        let callback: Self = serde_json::from_slice(body)?;
        callback.total()?;
        Ok(callback)
    }

    pub fn total(&self) -> GatewayResult<Decimal> {
        Decimal::from_str(&self.total)
            .map_err(|e| GatewayError::Callback(format!("failed to parse total amount: {}", e)))
    }

    pub fn status(&self) -> Option<TradeStatus> {
        TradeStatus::from_code(&self.trade_status)
    }

    pub fn is_success(&self) -> bool {
        self.status() == Some(TradeStatus::Success)
    }

    fn signed_fields(&self) -> FieldSet {
        FieldSet::new()
            .with("coinAmount", &self.coin_amount)
            .with("coinSign", &self.coin_sign)
            .with("companyOrderNum", &self.company_order_num)
            .with("otcOrderNum", &self.otc_order_num)
            .with("orderType", &self.order_type)
            .with("tradeStatus", &self.trade_status)
            .with("tradeOrderTime", &self.trade_order_time)
            .with("unitPrice", &self.unit_price)
            .with("total", &self.total)
            .with("successAmount", &self.success_amount)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CallbackReplyData {
    pub otc_order_num: String,
    pub company_order_num: String,
}

/// Acknowledgment body expected after a verified callback
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CallbackReply {
    pub code: i32,
    pub msg: String,
    pub data: CallbackReplyData,
    pub success: bool,
}

/// ChipPay client
#[derive(Debug)]
pub struct ChipPayClient {
    config: ChipPayConfig,
    client: ProviderClient,
    scheme: SigningScheme,
}

impl ChipPayClient {
    /// Create a client; malformed keys are rejected here
    pub fn new(config: ChipPayConfig) -> GatewayResult<Self> {
        let key = KeyMaterial::rsa(
            Some(config.private_key.expose_secret()),
            Some(&config.public_key),
        )?;
        let scheme = SigningScheme::new(
            SortedPolicy::new().reserved("sign"),
            DigestAlgorithm::RsaSha256,
            DigestEncoding::Base64,
            key,
        )?;
        let client = ProviderClient::new(config.resolved_base_url())?;

        Ok(Self {
            config,
            client,
            scheme,
        })
    }

    /// Place a buy order and return the cashier link
    pub async fn buy(&self, request: &BuyCoinRequest) -> GatewayResult<BuyCoinReply> {
        request.validate()?;
        let fields = request.fields(&self.config, Utc::now().timestamp_millis());
        let signed = self.scheme.sign_into(fields)?;
        let body: serde_json::Map<String, serde_json::Value> = signed
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::from(v)))
            .collect();

        debug!(order = %request.merchant_order_id, "Sending ChipPay buy order");
        let response = self.client.post_json(ADD_ORDER_PATH, &body, &[]).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::provider(
                status.as_u16(),
                format!("unexpected status code: {}", status),
            ));
        }

        let reply: BuyResponse = ProviderClient::read_json(response).await?;
        if reply.code != STATUS_CODE_SUCCESS {
            warn!(code = reply.code, message = %reply.msg, "ChipPay buy order failed");
            return Err(GatewayError::provider(
                reply.code,
                format!("failed to buy coin: {}", reply.msg),
            ));
        }
        let data = reply
            .data
            .ok_or_else(|| GatewayError::Serialization("response has no data".to_string()))?;
        Ok(BuyCoinReply {
            supplier_order_no: data.order_no,
            redirect_url: data.link,
        })
    }

    pub fn verify_callback(&self, callback: &BuyCoinCallback) -> GatewayResult<()> {
        self.scheme.verify(&callback.signed_fields(), &callback.sign)?;
        info!(order = %callback.company_order_num, status = %callback.trade_status, "ChipPay callback verified");
        Ok(())
    }

    pub fn acknowledge(&self, callback: &BuyCoinCallback) -> GatewayResult<CallbackReply> {
        self.verify_callback(callback)?;
        Ok(CallbackReply {
            code: STATUS_CODE_SUCCESS,
            msg: "success".to_string(),
            data: CallbackReplyData {
                otc_order_num: callback.otc_order_num.clone(),
                company_order_num: callback.company_order_num.clone(),
            },
            success: true,
        })
    }
}
