//! Shared configuration helpers
//!
//! Provider configurations can be built in code or loaded from environment
//! variables. [`EnvLoader`] looks variables up under a prefix, so
//! `EnvLoader::new(Some("PAYGATE_BFT".into())).load_var("uid")` reads
//! `PAYGATE_BFT_UID`.

use crate::{GatewayError, GatewayResult};
use std::env;
use std::str::FromStr;

/// Which of a provider's published endpoints to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Sandbox,
    Production,
}

impl Environment {
    /// Pick the base URL for this environment
    pub fn select<'a>(self, sandbox: &'a str, production: &'a str) -> &'a str {
        match self {
            Environment::Sandbox => sandbox,
            Environment::Production => production,
        }
    }
}

impl FromStr for Environment {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sandbox" | "dev" | "test" => Ok(Environment::Sandbox),
            "production" | "prod" | "live" => Ok(Environment::Production),
            other => Err(GatewayError::Config(format!("unknown environment: {}", other))),
        }
    }
}

/// Environment variable loader
#[derive(Debug, Clone, Default)]
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Create a loader after reading a `.env` file if one exists
    pub fn with_dotenv(prefix: Option<String>) -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::new(prefix)
    }

    fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }

    /// Load a required variable
    pub fn load_var(&self, key: &str) -> GatewayResult<String> {
        let full_key = self.full_key(key);
        env::var(&full_key)
            .map_err(|e| GatewayError::Config(format!("{}: {}", full_key, e)))
    }

    /// Load an optional variable; empty values count as missing
    pub fn load_optional(&self, key: &str) -> Option<String> {
        env::var(self.full_key(key)).ok().filter(|v| !v.is_empty())
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Load `<PREFIX>_ENV`, defaulting to the sandbox
    pub fn load_environment(&self) -> GatewayResult<Environment> {
        match self.load_optional("env") {
            Some(value) => value.parse(),
            None => Ok(Environment::Sandbox),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_select() {
        assert_eq!(Environment::Sandbox.select("a", "b"), "a");
        assert_eq!(Environment::Production.select("a", "b"), "b");
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!("PROD".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Sandbox);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_env_loader_empty_value_is_missing() {
        // SAFETY: the variable name is unique to this test
        unsafe { env::set_var("PAYGATE_CFG_EMPTY_NOTIFY_URL", "") };
        let loader = EnvLoader::new(Some("PAYGATE_CFG_EMPTY".to_string()));
        assert_eq!(loader.load_optional("notify_url"), None);
        assert_eq!(
            loader.load_var_or("notify_url", "https://shop.example.com/cb"),
            "https://shop.example.com/cb"
        );
    }

    #[test]
    fn test_env_loader_uppercases_under_prefix() {
        // SAFETY: the variable name is unique to this test
        unsafe { env::set_var("PAYGATE_CFG_CASE_MERCHANT_ID", "M-77") };
        let loader = EnvLoader::new(Some("PAYGATE_CFG_CASE".to_string()));
        assert_eq!(loader.load_var("merchant_id").unwrap(), "M-77");
    }

    #[test]
    fn test_env_loader_missing_var_is_config_error() {
        let loader = EnvLoader::new(Some("PAYGATE_CFG_MISSING".to_string()));
        match loader.load_var("secret_key") {
            Err(GatewayError::Config(message)) => {
                assert!(message.starts_with("PAYGATE_CFG_MISSING_SECRET_KEY"))
            }
            other => panic!("expected a config error, got {:?}", other),
        }
    }

    #[test]
    fn test_env_loader_rejects_unknown_environment() {
        // SAFETY: the variable name is unique to this test
        unsafe { env::set_var("PAYGATE_CFG_STAGE_ENV", "staging") };
        let loader = EnvLoader::new(Some("PAYGATE_CFG_STAGE".to_string()));
        assert!(matches!(
            loader.load_environment(),
            Err(GatewayError::Config(_))
        ));
    }

    #[test]
    fn test_env_loader_default_environment() {
        let loader = EnvLoader::new(Some("PAYGATE_NO_SUCH_PROVIDER".to_string()));
        assert_eq!(loader.load_environment().unwrap(), Environment::Sandbox);
    }
}
