//! AsiaBank payment page adapter
//!
//! Payments are started by posting a signed form from the customer's browser
//! to the merchant's payment page. Both the form and the callback are signed
//! with SHA-512 over the sorted, form-escaped fields followed by the secret.

use crate::{
    GatewayError, GatewayResult,
    amount::{format_fixed_bank, is_positive},
    config::EnvLoader,
    form::{PaymentForm, value},
};
use paygate_signing::{
    DigestAlgorithm, DigestEncoding, FieldSet, KeyMaterial, SecretSuffix, SigningScheme,
    SortedPolicy, UrlEscape,
};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::str::FromStr;
use tracing::{debug, info};

const ENDPOINT_TEMPLATE: &str = "https://payment.pa-sys.com/app/page/{MerchantToken}";

/// AsiaBank configuration
#[derive(Debug)]
pub struct AsiaBankConfig {
    pub merchant_token: String,
    pub secret_key: SecretString,
    /// Where the customer returns after paying
    pub success_url: String,
}

impl AsiaBankConfig {
    pub fn new(merchant_token: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            merchant_token: merchant_token.into(),
            secret_key: SecretString::new(secret_key.into().into()),
            success_url: String::new(),
        }
    }

    pub fn success_url(mut self, url: impl Into<String>) -> Self {
        self.success_url = url.into();
        self
    }

    /// Load from `<PREFIX>_MERCHANT_TOKEN`, `<PREFIX>_SECRET_KEY` and
    /// `<PREFIX>_SUCCESS_URL`
    pub fn from_env(loader: &EnvLoader) -> GatewayResult<Self> {
        Ok(Self::new(loader.load_var("merchant_token")?, loader.load_var("secret_key")?)
            .success_url(loader.load_var_or("success_url", "")))
    }
}

/// Payment status reported in callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Authorized,
    Processing,
}

impl PaymentStatus {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "0" => Some(Self::Pending),
            "1" => Some(Self::Success),
            "2" => Some(Self::Failed),
            "3" => Some(Self::Authorized),
            "4" => Some(Self::Processing),
            _ => None,
        }
    }
}

/// Payment page request
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub merchant_order_id: String,
    /// ISO 4217 code, e.g. `MYR`
    pub currency: String,
    pub amount: Decimal,
    pub customer_ip: String,
    pub customer_first_name: String,
    pub customer_last_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub network: String,
}

impl PaymentRequest {
    pub fn validate(&self) -> GatewayResult<()> {
        let required = [
            (&self.merchant_order_id, "merchant order id"),
            (&self.currency, "currency"),
            (&self.customer_ip, "customer ip"),
            (&self.customer_first_name, "customer first name"),
            (&self.customer_last_name, "customer last name"),
            (&self.customer_phone, "customer phone"),
            (&self.customer_email, "customer email"),
            (&self.network, "network"),
        ];
        for (field, name) in required {
            if field.is_empty() {
                return Err(GatewayError::Validation(format!("{} is empty", name)));
            }
        }
        if !is_positive(self.amount) {
            return Err(GatewayError::Validation("amount is invalid".to_string()));
        }
        Ok(())
    }

    fn fields(&self, config: &AsiaBankConfig) -> FieldSet {
        // Optional fields still take part in the signature as empty strings
        FieldSet::builder()
            .field("merchant_reference", &self.merchant_order_id)
            .field("currency", &self.currency)
            .field("amount", format_fixed_bank(self.amount, 2))
            .field("return_url", &config.success_url)
            .field("customer_ip", &self.customer_ip)
            .field("customer_first_name", &self.customer_first_name)
            .field("customer_last_name", &self.customer_last_name)
            .field("customer_address", "")
            .field("customer_phone", &self.customer_phone)
            .field("customer_email", &self.customer_email)
            .field("customer_state", "")
            .field("customer_country", "")
            .field("network", &self.network)
            .build()
    }
}

/// Payment result callback, posted as a form
#[derive(Debug, Clone)]
pub struct PaymentCallback {
    pub merchant_reference: String,
    pub request_reference: String,
    pub currency: String,
    /// Amount exactly as transmitted; this text is what was signed
    pub amount: String,
    pub status: String,
    pub sign: String,
}

impl PaymentCallback {
    /// Build from decoded form fields
    pub fn from_fields(fields: &FieldSet) -> GatewayResult<Self> {
        let callback = Self {
            merchant_reference: value(fields, "merchant_reference"),
            request_reference: value(fields, "request_reference"),
            currency: value(fields, "currency"),
            amount: value(fields, "amount"),
            status: value(fields, "status"),
            sign: value(fields, "sign"),
        };
        callback.amount()?;
        Ok(callback)
    }

    /// Build from an `application/x-www-form-urlencoded` body
    pub fn from_form(body: &str) -> GatewayResult<Self> {
        Self::from_fields(&crate::form::parse_form(body))
    }

    pub fn amount(&self) -> GatewayResult<Decimal> {
        Decimal::from_str(&self.amount)
            .map_err(|e| GatewayError::Callback(format!("failed to parse amount: {}", e)))
    }

    pub fn status(&self) -> Option<PaymentStatus> {
        PaymentStatus::from_code(&self.status)
    }

    pub fn is_success(&self) -> bool {
        self.status() == Some(PaymentStatus::Success)
    }

    fn signed_fields(&self) -> FieldSet {
        FieldSet::new()
            .with("merchant_reference", &self.merchant_reference)
            .with("request_reference", &self.request_reference)
            .with("currency", &self.currency)
            .with("amount", &self.amount)
            .with("status", &self.status)
    }
}

/// Acknowledgment body expected after a verified callback
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CallbackReply {
    pub code: i32,
    pub message: String,
    pub success: bool,
    pub data: Option<serde_json::Value>,
}

impl Default for CallbackReply {
    fn default() -> Self {
        Self {
            code: 1,
            message: "success".to_string(),
            success: true,
            data: None,
        }
    }
}

/// AsiaBank client
#[derive(Debug)]
pub struct AsiaBankClient {
    config: AsiaBankConfig,
    endpoint: String,
    scheme: SigningScheme,
}

impl AsiaBankClient {
    pub fn new(config: AsiaBankConfig) -> GatewayResult<Self> {
        if config.merchant_token.is_empty() {
            return Err(GatewayError::Config("merchant token is empty".to_string()));
        }
        let scheme = SigningScheme::new(
            SortedPolicy::new()
                .escape(UrlEscape::QueryPlus)
                .suffix(SecretSuffix::Bare)
                .reserved("sign"),
            DigestAlgorithm::Sha512,
            DigestEncoding::LowerHex,
            KeyMaterial::shared(config.secret_key.expose_secret()),
        )?;
        let endpoint = ENDPOINT_TEMPLATE.replace("{MerchantToken}", &config.merchant_token);

        Ok(Self {
            config,
            endpoint,
            scheme,
        })
    }

    /// Build the signed form that opens the payment page
    pub fn payment_form(&self, request: &PaymentRequest) -> GatewayResult<PaymentForm> {
        request.validate()?;
        let fields = self.scheme.sign_into(request.fields(&self.config))?;
        debug!(order = %request.merchant_order_id, "Built AsiaBank payment form");
        Ok(PaymentForm::post(self.endpoint.clone(), fields))
    }

    /// Verify a callback's signature
    pub fn verify_callback(&self, callback: &PaymentCallback) -> GatewayResult<()> {
        self.scheme.verify(&callback.signed_fields(), &callback.sign)?;
        info!(order = %callback.merchant_reference, status = %callback.status, "AsiaBank callback verified");
        Ok(())
    }

    /// Verify a callback and produce the acknowledgment body
    pub fn acknowledge(&self, callback: &PaymentCallback) -> GatewayResult<CallbackReply> {
        self.verify_callback(callback)?;
        Ok(CallbackReply::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AsiaBankClient {
        AsiaBankClient::new(
            AsiaBankConfig::new("tok123", "s3cret").success_url("https://shop.example.com/done"),
        )
        .unwrap()
    }

    fn request() -> PaymentRequest {
        PaymentRequest {
            merchant_order_id: "ORD-1".into(),
            currency: "MYR".into(),
            amount: Decimal::from_str("10.005").unwrap(),
            customer_ip: "1.2.3.4".into(),
            customer_first_name: "Ann".into(),
            customer_last_name: "Lee".into(),
            customer_phone: "0123".into(),
            customer_email: "ann@example.com".into(),
            network: "DuitNow".into(),
        }
    }

    #[test]
    fn test_payment_form() {
        let form = client().payment_form(&request()).unwrap();
        assert_eq!(form.method, "POST");
        assert_eq!(form.action, "https://payment.pa-sys.com/app/page/tok123");
        assert_eq!(form.fields.get("amount"), Some("10.00"));
        assert_eq!(form.fields.get("customer_address"), Some(""));
        let sign = form.fields.get("sign").unwrap();
        assert_eq!(sign.len(), 128);
    }

    #[test]
    fn test_payment_form_validation() {
        let mut req = request();
        req.customer_email.clear();
        assert!(matches!(
            client().payment_form(&req),
            Err(GatewayError::Validation(_))
        ));

        let mut req = request();
        req.amount = Decimal::ZERO;
        assert!(client().payment_form(&req).is_err());
    }

    #[test]
    fn test_callback_round_trip() {
        let client = client();
        let unsigned = FieldSet::new()
            .with("merchant_reference", "ORD-1")
            .with("request_reference", "AB-77")
            .with("currency", "MYR")
            .with("amount", "10.00")
            .with("status", "1");
        let sign = client.scheme.sign(&unsigned).unwrap().to_uppercase();

        let callback = PaymentCallback::from_fields(&unsigned.with("sign", sign)).unwrap();
        assert!(callback.is_success());
        assert_eq!(callback.amount().unwrap(), Decimal::from_str("10.00").unwrap());
        assert_eq!(client.acknowledge(&callback).unwrap(), CallbackReply::default());
    }

    #[test]
    fn test_callback_tampered_amount_rejected() {
        let client = client();
        let body = "merchant_reference=ORD-1&request_reference=AB-77&currency=MYR&amount=10.00&status=1&sign=00";
        let callback = PaymentCallback::from_form(body).unwrap();
        let err = client.acknowledge(&callback).unwrap_err();
        assert!(err.is_rejection());
    }

    #[test]
    fn test_callback_bad_amount() {
        assert!(matches!(
            PaymentCallback::from_form("amount=abc&status=1"),
            Err(GatewayError::Callback(_))
        ));
    }

    #[test]
    fn test_reply_shape() {
        let json = serde_json::to_value(CallbackReply::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"code": 1, "message": "success", "success": true, "data": null})
        );
    }
}
