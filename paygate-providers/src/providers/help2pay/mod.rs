//! Help2Pay deposit page adapter
//!
//! Deposits start with a browser form post. The form carries an MD5 key over
//! a fixed template; callbacks use a shorter template that adds the status.

mod banks;

pub use banks::{Bank, banks_for, find_bank, is_currency_bank, is_supported_currency};

use crate::{
    GatewayError, GatewayResult,
    amount::{format_fixed_bank, is_integer, is_positive},
    config::{EnvLoader, Environment},
    form::{PaymentForm, parse_form, value},
};
use chrono::{NaiveDateTime, TimeDelta, Utc};
use paygate_signing::{DigestAlgorithm, DigestEncoding, FieldSet, KeyMaterial, SigningScheme, Template};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use std::str::FromStr;
use tracing::{debug, info};

const SANDBOX_BASE_URL: &str = "https://api.testingzone88.com";
const PRODUCTION_BASE_URL: &str = "https://api.safepaymentapp.com";
const DEPOSIT_PATH: &str = "/MerchantTransfer";

const REQUEST_TEMPLATE: &str =
    "{Merchant}{Reference}{Customer}{Amount}{Currency}{Datetime}{SecurityCode}{ClientIP}";
const CALLBACK_TEMPLATE: &str =
    "{Merchant}{Reference}{Customer}{Amount}{Currency}{Status}{SecurityCode}";
const SECRET_PLACEHOLDER: &str = "SecurityCode";

/// The gateway keeps merchant time in UTC+8
const MERCHANT_UTC_OFFSET_HOURS: i64 = 8;

const FORM_TIME_FORMAT: &str = "%Y-%m-%d %I:%M:%S%p";
const SIGN_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Acknowledgment body for a verified callback
pub const CALLBACK_ACK: &str = "OK";

/// Deposit status reported in callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositStatus {
    Success,
    Failed,
    Approved,
    Rejected,
    Canceled,
    Pending,
}

impl DepositStatus {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "000" => Some(Self::Success),
            "001" => Some(Self::Failed),
            "006" => Some(Self::Approved),
            "007" => Some(Self::Rejected),
            "008" => Some(Self::Canceled),
            "009" => Some(Self::Pending),
            _ => None,
        }
    }

    /// Whether no further status change is expected
    pub fn is_final(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Map a language tag such as `en`, `zh-Hans` or `vi_VN` onto the codes the
/// deposit page accepts
pub fn language_code(tag: &str) -> &'static str {
    let primary = tag
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match primary.as_str() {
        "zh" => "zh-cn",
        "th" => "th",
        "ms" => "ms-my",
        "vi" => "vi-vn",
        "id" | "in" => "id-id",
        "my" => "bur",
        "fil" | "tl" => "fil-ph",
        "hi" => "hi-in",
        "km" => "km-kh",
        _ => "en-us",
    }
}

/// Help2Pay configuration
#[derive(Debug)]
pub struct Help2PayConfig {
    pub merchant_code: String,
    pub security_code: SecretString,
    /// Shown on the deposit page
    pub company_name: String,
    pub success_url: String,
    pub callback_url: String,
    pub environment: Environment,
    pub base_url: Option<String>,
}

impl Help2PayConfig {
    pub fn new(merchant_code: impl Into<String>, security_code: impl Into<String>) -> Self {
        Self {
            merchant_code: merchant_code.into(),
            security_code: SecretString::new(security_code.into().into()),
            company_name: String::new(),
            success_url: String::new(),
            callback_url: String::new(),
            environment: Environment::Sandbox,
            base_url: None,
        }
    }

    pub fn company_name(mut self, name: impl Into<String>) -> Self {
        self.company_name = name.into();
        self
    }

    pub fn success_url(mut self, url: impl Into<String>) -> Self {
        self.success_url = url.into();
        self
    }

    pub fn callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = url.into();
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
            loader.load_var("merchant_code")?,
            loader.load_var("security_code")?,
        )
        .company_name(loader.load_var_or("company_name", ""))
        .success_url(loader.load_var_or("success_url", ""))
        .callback_url(loader.load_var_or("callback_url", ""))
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

/// Fiat deposit request
#[derive(Debug, Clone)]
pub struct DepositRequest {
    pub merchant_order_id: String,
    /// Bank code, see [`banks_for`]
    pub bank: String,
    pub currency: String,
    pub amount: Decimal,
    pub customer_id: String,
    pub customer_ip: String,
    /// Language tag for the deposit page, English when absent
    pub language: Option<String>,
}

impl DepositRequest {
    pub fn validate(&self) -> GatewayResult<()> {
        if self.merchant_order_id.is_empty() {
            return Err(GatewayError::Validation("invalid merchant order ID".to_string()));
        }
        if !is_currency_bank(&self.currency, &self.bank) {
            return Err(GatewayError::Validation(format!(
                "bank {} is not available for {}",
                self.bank, self.currency
            )));
        }
        if !is_positive(self.amount) {
            return Err(GatewayError::Validation("invalid amount".to_string()));
        }
        // VND and IDR only accept whole amounts
        if matches!(self.currency.as_str(), "VND" | "IDR") && !is_integer(self.amount) {
            return Err(GatewayError::Validation(format!(
                "{} amounts must be whole numbers",
                self.currency
            )));
        }
        if self.customer_id.is_empty() {
            return Err(GatewayError::Validation("invalid customer id".to_string()));
        }
        if self.customer_ip.is_empty() {
            return Err(GatewayError::Validation("invalid customer ip".to_string()));
        }
        Ok(())
    }

    /// Fields covered by the key; Datetime uses the compact form here
    fn signed_fields(&self, config: &Help2PayConfig, amount: &str, now: NaiveDateTime) -> FieldSet {
        FieldSet::new()
            .with("Merchant", &config.merchant_code)
            .with("Reference", &self.merchant_order_id)
            .with("Customer", &self.customer_id)
            .with("Amount", amount)
            .with("Currency", &self.currency)
            .with("Datetime", now.format(SIGN_TIME_FORMAT).to_string())
            .with("ClientIP", &self.customer_ip)
    }

    fn form_fields(&self, config: &Help2PayConfig, amount: &str, key: String, now: NaiveDateTime) -> FieldSet {
        FieldSet::builder()
            .field("Merchant", &config.merchant_code)
            .field("Currency", &self.currency)
            .field("Customer", &self.customer_id)
            .field("Reference", &self.merchant_order_id)
            .field("Key", key)
            .field("Amount", amount)
            .field("Note", "")
            .field("Datetime", now.format(FORM_TIME_FORMAT).to_string())
            .field("FrontURI", &config.success_url)
            .field("BackURI", &config.callback_url)
            .field("Bank", &self.bank)
            .field("Language", language_code(self.language.as_deref().unwrap_or_default()))
            .field("ClientIP", &self.customer_ip)
            .field("CompanyName", &config.company_name)
            .build()
    }
}

/// Deposit result callback, posted as a form
#[derive(Debug, Clone)]
pub struct DepositCallback {
    pub merchant: String,
    pub reference: String,
    pub currency: String,
    /// Amount exactly as transmitted
    pub amount: String,
    pub language: String,
    pub customer: String,
    pub datetime: String,
    pub note: String,
    pub key: String,
    pub status: String,
    /// Gateway transaction ID
    pub id: String,
}

impl DepositCallback {
    pub fn from_fields(fields: &FieldSet) -> GatewayResult<Self> {
        let callback = Self {
            merchant: value(fields, "Merchant"),
            reference: value(fields, "Reference"),
            currency: value(fields, "Currency"),
            amount: value(fields, "Amount"),
            language: value(fields, "Language"),
            customer: value(fields, "Customer"),
            datetime: value(fields, "Datetime"),
            note: value(fields, "Note"),
            key: value(fields, "Key"),
            status: value(fields, "Status"),
            id: value(fields, "ID"),
        };
        callback.amount()?;
        Ok(callback)
    }

    pub fn from_form(body: &str) -> GatewayResult<Self> {
        Self::from_fields(&parse_form(body))
    }

    pub fn amount(&self) -> GatewayResult<Decimal> {
        Decimal::from_str(&self.amount)
            .map_err(|e| GatewayError::Callback(format!("failed to parse amount: {}", e)))
    }

    pub fn status(&self) -> Option<DepositStatus> {
        DepositStatus::from_code(&self.status)
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self.status(),
            Some(DepositStatus::Success | DepositStatus::Approved)
        )
    }

    fn signed_fields(&self) -> FieldSet {
        FieldSet::new()
            .with("Merchant", &self.merchant)
            .with("Reference", &self.reference)
            .with("Customer", &self.customer)
            .with("Amount", &self.amount)
            .with("Currency", &self.currency)
            .with("Status", &self.status)
    }
}

/// Help2Pay client
#[derive(Debug)]
pub struct Help2PayClient {
    config: Help2PayConfig,
    action: String,
    request_scheme: SigningScheme,
    callback_scheme: SigningScheme,
}

impl Help2PayClient {
    pub fn new(config: Help2PayConfig) -> GatewayResult<Self> {
        let key = || KeyMaterial::shared(config.security_code.expose_secret());
        let request_scheme = SigningScheme::new(
            Template::parse(REQUEST_TEMPLATE)?.with_secret(SECRET_PLACEHOLDER),
            DigestAlgorithm::Md5,
            DigestEncoding::UpperHex,
            key(),
        )?;
        let callback_scheme = SigningScheme::new(
            Template::parse(CALLBACK_TEMPLATE)?.with_secret(SECRET_PLACEHOLDER),
            DigestAlgorithm::Md5,
            DigestEncoding::LowerHex,
            key(),
        )?;
        let action = url::Url::parse(config.resolved_base_url())?
            .join(DEPOSIT_PATH)?
            .to_string();

        Ok(Self {
            config,
            action,
            request_scheme,
            callback_scheme,
        })
    }

    /// Build the signed deposit form for the customer's browser
    pub fn deposit_form(&self, request: &DepositRequest) -> GatewayResult<PaymentForm> {
        let now = Utc::now().naive_utc() + TimeDelta::hours(MERCHANT_UTC_OFFSET_HOURS);
        self.deposit_form_at(request, now)
    }

    fn deposit_form_at(&self, request: &DepositRequest, now: NaiveDateTime) -> GatewayResult<PaymentForm> {
        request.validate()?;
        let amount = format_fixed_bank(request.amount, 2);
        let key = self
            .request_scheme
            .sign(&request.signed_fields(&self.config, &amount, now))?;
        let fields = request.form_fields(&self.config, &amount, key, now);
        debug!(order = %request.merchant_order_id, bank = %request.bank, "Built Help2Pay deposit form");
        Ok(PaymentForm::post(self.action.clone(), fields))
    }

    pub fn verify_callback(&self, callback: &DepositCallback) -> GatewayResult<()> {
        self.callback_scheme
            .verify(&callback.signed_fields(), &callback.key)?;
        info!(order = %callback.reference, status = %callback.status, "Help2Pay callback verified");
        Ok(())
    }

    /// Verify a callback and return the plain-text acknowledgment
    pub fn acknowledge(&self, callback: &DepositCallback) -> GatewayResult<&'static str> {
        self.verify_callback(callback)?;
        Ok(CALLBACK_ACK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn client() -> Help2PayClient {
        Help2PayClient::new(
            Help2PayConfig::new("M001", "SEC")
                .company_name("Shop")
                .success_url("https://shop.example.com/ok")
                .callback_url("https://shop.example.com/cb"),
        )
        .unwrap()
    }

    fn request() -> DepositRequest {
        DepositRequest {
            merchant_order_id: "R1".into(),
            bank: "MBB".into(),
            currency: "MYR".into(),
            amount: Decimal::from_str("100").unwrap(),
            customer_id: "C9".into(),
            customer_ip: "1.2.3.4".into(),
            language: Some("zh-Hans".into()),
        }
    }

    fn evening() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(15, 4, 5)
            .unwrap()
    }

    #[test]
    fn test_language_code() {
        assert_eq!(language_code("en"), "en-us");
        assert_eq!(language_code("zh-Hans"), "zh-cn");
        assert_eq!(language_code("vi_VN"), "vi-vn");
        assert_eq!(language_code("my"), "bur");
        assert_eq!(language_code("fil"), "fil-ph");
        assert_eq!(language_code(""), "en-us");
        assert_eq!(language_code("de-DE"), "en-us");
    }

    #[test]
    fn test_deposit_form() {
        let form = client().deposit_form_at(&request(), evening()).unwrap();
        assert_eq!(form.action, "https://api.testingzone88.com/MerchantTransfer");
        assert_eq!(form.fields.get("Amount"), Some("100.00"));
        assert_eq!(form.fields.get("Datetime"), Some("2024-01-02 03:04:05PM"));
        assert_eq!(form.fields.get("Language"), Some("zh-cn"));
        assert_eq!(form.fields.get("CompanyName"), Some("Shop"));
        // M001 R1 C9 100.00 MYR 20240102150405 SEC 1.2.3.4
        assert_eq!(
            form.fields.get("Key"),
            Some("D970E9A9B97C55CCC6C66BEBDFD819B3")
        );
    }

    #[test]
    fn test_validation() {
        let mut req = request();
        req.bank = "VCB".into();
        assert!(matches!(req.validate(), Err(GatewayError::Validation(_))));

        let mut req = request();
        req.currency = "VND".into();
        req.bank = "VCB".into();
        req.amount = Decimal::from_str("10.5").unwrap();
        assert!(req.validate().is_err());
        req.amount = Decimal::from(10);
        assert!(req.validate().is_ok());

        let mut req = request();
        req.customer_ip.clear();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_callback() {
        let client = client();
        let fields = FieldSet::new()
            .with("Merchant", "M001")
            .with("Reference", "R1")
            .with("Customer", "C9")
            .with("Amount", "100.00")
            .with("Currency", "MYR")
            .with("Status", "000");
        let key = client.callback_scheme.sign(&fields).unwrap();
        let body = format!(
            "Merchant=M001&Reference=R1&Currency=MYR&Amount=100.00&Language=en-us&Customer=C9&Datetime=2024-01-02+03%3A04%3A05PM&Note=&Key={}&Status=000&ID=77",
            key.to_uppercase()
        );

        let callback = DepositCallback::from_form(&body).unwrap();
        assert!(callback.is_success());
        assert_eq!(callback.id, "77");
        assert_eq!(client.acknowledge(&callback).unwrap(), "OK");

        let mut forged = callback.clone();
        forged.status = "001".into();
        assert!(client.acknowledge(&forged).unwrap_err().is_rejection());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(DepositStatus::from_code("009"), Some(DepositStatus::Pending));
        assert!(!DepositStatus::Pending.is_final());
        assert!(DepositStatus::Rejected.is_final());
        assert_eq!(DepositStatus::from_code("123"), None);
    }
}
