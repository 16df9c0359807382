//! XPay fund-in adapter
//!
//! XPay has no server-to-server API for deposits. The merchant redirects the
//! customer to a payment URL whose `Data` parameter is a query string wrapped
//! in the XPay hex codec, next to an MD5 `EncryptText`. Callbacks come back
//! in the same shape.

use crate::{
    GatewayError, GatewayResult,
    amount::{fits_scale, format_fixed, is_positive},
    config::EnvLoader,
    form::{parse_form, value},
};
use chrono::{Local, NaiveDateTime};
use paygate_signing::{
    DigestAlgorithm, DigestEncoding, FieldSet, KeyMaterial, SigningError, SigningScheme, Template,
    xpay,
};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use std::str::FromStr;
use tracing::{debug, info};
use url::Url;

const PAYMENT_PATH: &str = "/payment.php";

const REQUEST_TEMPLATE: &str = "[MerchantEncryptKey]:[MerchantID],[CustID],[CustIP],[Curr],[Amount],[RefID],[TransTime],[ReturnURL],[RequestURL],[BankCode],[CardNo],[CardName],[Remarks]";
const CALLBACK_TEMPLATE: &str =
    "[MerchantEncryptKey]:[RefID],[Curr],[Amount],[Status],[TransID],[ValidationKey]";
const SECRET_PLACEHOLDER: &str = "MerchantEncryptKey";

const TRANS_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Amounts always travel with two decimals, even for integer currencies
const WIRE_SCALE: u32 = 2;

/// Decimal places XPay accepts for `currency`
pub fn currency_decimals(currency: &str) -> Option<u32> {
    match currency {
        "THB" | "MYR" => Some(2),
        "VND" | "IDR" => Some(0),
        _ => None,
    }
}

/// Fund-in status reported in callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundInStatus {
    Success,
    Pending,
    BankPaymentSuccess,
    Failed,
}

impl FundInStatus {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "000" => Some(Self::Success),
            "001" => Some(Self::Pending),
            "002" => Some(Self::BankPaymentSuccess),
            "111" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// XPay configuration
#[derive(Debug)]
pub struct XPayConfig {
    pub base_url: String,
    pub merchant_id: String,
    pub key: SecretString,
    /// Server-to-server notification URL
    pub callback_url: String,
    /// Where the customer returns after paying
    pub success_url: String,
}

impl XPayConfig {
    pub fn new(
        base_url: impl Into<String>,
        merchant_id: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            merchant_id: merchant_id.into(),
            key: SecretString::new(key.into().into()),
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
            loader.load_var("merchant_id")?,
            loader.load_var("key")?,
        )
        .callback_url(loader.load_var_or("callback_url", ""))
        .success_url(loader.load_var_or("success_url", "")))
    }
}

/// Fund-in (deposit) request
#[derive(Debug, Clone, Default)]
pub struct FundInRequest {
    /// Customer ID in the merchant's system
    pub customer_id: String,
    pub customer_ip: Option<String>,
    pub currency: String,
    pub amount: Decimal,
    /// Must be unique per deposit
    pub merchant_order_id: String,
    /// Skips the bank selection page when set
    pub bank_code: Option<String>,
    pub card_no: Option<String>,
    pub card_name: Option<String>,
    /// At most 250 characters
    pub remarks: Option<String>,
}

impl FundInRequest {
    pub fn validate(&self) -> GatewayResult<()> {
        if self.customer_id.is_empty() {
            return Err(GatewayError::Validation("customer ID is required".to_string()));
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
                "{} amounts allow {} decimal places",
                self.currency, decimals
            )));
        }
        if self.merchant_order_id.is_empty() {
            return Err(GatewayError::Validation("order ID is required".to_string()));
        }
        if self.remarks.as_deref().is_some_and(|r| r.chars().count() > 250) {
            return Err(GatewayError::Validation(
                "remarks exceed 250 characters".to_string(),
            ));
        }
        Ok(())
    }

    /// Every signed slot, in template order; empty optionals stay as empty
    /// slots
    fn fields(&self, config: &XPayConfig, trans_time: &str) -> FieldSet {
        FieldSet::new()
            .with("MerchantID", &config.merchant_id)
            .with("CustID", &self.customer_id)
            .with("CustIP", self.customer_ip.as_deref().unwrap_or_default())
            .with("Curr", &self.currency)
            .with("Amount", format_fixed(self.amount, WIRE_SCALE))
            .with("RefID", &self.merchant_order_id)
            .with("TransTime", trans_time)
            .with("ReturnURL", &config.success_url)
            .with("RequestURL", &config.callback_url)
            .with("BankCode", self.bank_code.as_deref().unwrap_or_default())
            .with("CardNo", self.card_no.as_deref().unwrap_or_default())
            .with("CardName", self.card_name.as_deref().unwrap_or_default())
            .with("Remarks", self.remarks.as_deref().unwrap_or_default())
    }
}

/// The plain `Data` text before XPay encoding. Raw `&`-joined pairs without
/// URL escaping, optional pairs left out when empty.
fn data_text(fields: &FieldSet) -> String {
    const REQUIRED: [&str; 2] = ["MerchantID", "CustID"];
    const OPTIONAL_IP: &str = "CustIP";
    const MIDDLE: [&str; 5] = ["Curr", "Amount", "RefID", "TransTime", "ReturnURL"];
    const TRAILING: [&str; 3] = ["BankCode", "CardNo", "CardName"];

    let mut parts = Vec::new();
    let mut push = |name: &str| {
        parts.push(format!("{}={}", name, fields.get(name).unwrap_or_default()));
    };
    for name in REQUIRED {
        push(name);
    }
    if fields.get(OPTIONAL_IP).is_some_and(|v| !v.is_empty()) {
        push(OPTIONAL_IP);
    }
    for name in MIDDLE {
        push(name);
    }
    push("RequestURL");
    for name in TRAILING {
        if fields.get(name).is_some_and(|v| !v.is_empty()) {
            push(name);
        }
    }
    parts.join("&")
}

/// Fund-in result callback
#[derive(Debug, Clone)]
pub struct FundInCallback {
    /// Outer `EncryptText` parameter
    pub encrypt_text: String,
    pub reference_id: String,
    pub currency: String,
    /// Amount exactly as transmitted
    pub amount_text: String,
    pub status: String,
    pub transaction_id: String,
    pub validation_key: String,
    /// `EncryptText` carried inside `Data`
    pub data_encrypt_text: String,
}

impl FundInCallback {
    /// Parse the raw callback query string
    pub fn from_query(query: &str) -> GatewayResult<Self> {
        if query.is_empty() {
            return Err(GatewayError::Callback("empty callback payload".to_string()));
        }
        let outer = parse_form(query);
        let encrypt_text = value(&outer, "EncryptText");
        if encrypt_text.is_empty() {
            return Err(GatewayError::Callback("missing EncryptText".to_string()));
        }
        let data = value(&outer, "Data");
        if data.is_empty() {
            return Err(GatewayError::Callback("missing Data".to_string()));
        }

        let inner = parse_form(&xpay::decode_to_string(&data)?);
        let callback = Self {
            encrypt_text,
            reference_id: value(&inner, "RefID"),
            currency: value(&inner, "Curr"),
            amount_text: value(&inner, "Amount"),
            status: value(&inner, "Status"),
            transaction_id: value(&inner, "TransID"),
            validation_key: value(&inner, "ValidationKey"),
            data_encrypt_text: value(&inner, "EncryptText"),
        };
        let required = [
            ("RefID", &callback.reference_id),
            ("Curr", &callback.currency),
            ("Amount", &callback.amount_text),
            ("Status", &callback.status),
            ("TransID", &callback.transaction_id),
            ("ValidationKey", &callback.validation_key),
            ("EncryptText", &callback.data_encrypt_text),
        ];
        if let Some((name, _)) = required.iter().find(|(_, v)| v.is_empty()) {
            return Err(GatewayError::Callback(format!("Data is missing {}", name)));
        }
        callback.amount()?;
        Ok(callback)
    }

    pub fn amount(&self) -> GatewayResult<Decimal> {
        Decimal::from_str(&self.amount_text)
            .map_err(|e| GatewayError::Callback(format!("invalid Amount: {}", e)))
    }

    pub fn status(&self) -> Option<FundInStatus> {
        FundInStatus::from_code(&self.status)
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self.status(),
            Some(FundInStatus::Success | FundInStatus::BankPaymentSuccess)
        )
    }

    fn signed_fields(&self) -> FieldSet {
        FieldSet::new()
            .with("RefID", &self.reference_id)
            .with("Curr", &self.currency)
            .with("Amount", &self.amount_text)
            .with("Status", &self.status)
            .with("TransID", &self.transaction_id)
            .with("ValidationKey", &self.validation_key)
    }
}

/// XPay client
#[derive(Debug)]
pub struct XPayClient {
    config: XPayConfig,
    base_url: Url,
    request_scheme: SigningScheme,
    callback_scheme: SigningScheme,
}

impl XPayClient {
    pub fn new(config: XPayConfig) -> GatewayResult<Self> {
        let base_url = Url::parse(&config.base_url)?;
        let scheme = |template: &str| -> GatewayResult<SigningScheme> {
            Ok(SigningScheme::new(
                Template::parse(template)?.with_secret(SECRET_PLACEHOLDER),
                DigestAlgorithm::Md5,
                DigestEncoding::LowerHex,
                KeyMaterial::shared(config.key.expose_secret()),
            )?)
        };
        let request_scheme = scheme(REQUEST_TEMPLATE)?;
        let callback_scheme = scheme(CALLBACK_TEMPLATE)?;

        Ok(Self {
            config,
            base_url,
            request_scheme,
            callback_scheme,
        })
    }

    /// Build the payment page URL the customer is redirected to
    pub fn fund_in_url(&self, request: &FundInRequest) -> GatewayResult<Url> {
        self.fund_in_url_at(request, Local::now().naive_local())
    }

    /// Build the payment page URL with an explicit merchant transaction time
    pub fn fund_in_url_at(
        &self,
        request: &FundInRequest,
        trans_time: NaiveDateTime,
    ) -> GatewayResult<Url> {
        request.validate()?;
        let trans_time = trans_time.format(TRANS_TIME_FORMAT).to_string();
        let fields = request.fields(&self.config, &trans_time);
        let signature = self.request_scheme.sign(&fields)?;

        let mut url = self.base_url.join(PAYMENT_PATH)?;
        url.query_pairs_mut()
            .append_pair("Data", &xpay::encode(data_text(&fields).as_bytes()))
            .append_pair("Remarks", request.remarks.as_deref().unwrap_or_default())
            .append_pair("EncryptText", &signature);

        debug!(order = %request.merchant_order_id, "Built XPay fund-in URL");
        Ok(url)
    }

    pub fn verify_callback(&self, callback: &FundInCallback) -> GatewayResult<()> {
        if !callback
            .encrypt_text
            .eq_ignore_ascii_case(&callback.data_encrypt_text)
        {
            return Err(SigningError::SignatureMismatch {
                expected: callback.data_encrypt_text.clone(),
                presented: callback.encrypt_text.clone(),
            }
            .into());
        }
        self.callback_scheme
            .verify(&callback.signed_fields(), &callback.encrypt_text)?;
        info!(order = %callback.reference_id, status = %callback.status, "XPay callback verified");
        Ok(())
    }

    /// Acknowledgment body, `{TransID}||{ValidationKey}`
    pub fn acknowledge(&self, callback: &FundInCallback) -> GatewayResult<String> {
        self.verify_callback(callback)?;
        Ok(format!(
            "{}||{}",
            callback.transaction_id, callback.validation_key
        ))
    }
}
