//! JSON wire helpers
//!
//! Some callbacks send numbers that are covered by the signature. The exact
//! text the provider sent has to be signed, so these fields are kept as
//! strings whether they arrive quoted or bare.

use serde::{Deserialize, Deserializer};
use serde_json::value::RawValue;

/// Deserialize a JSON string or number into its literal text
pub fn number_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Box<RawValue> = Deserialize::deserialize(deserializer)?;
    let text = raw.get();
    if text.starts_with('"') {
        serde_json::from_str(text).map_err(serde::de::Error::custom)
    } else if text == "null" {
        Ok(String::new())
    } else {
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "number_text")]
        value: String,
    }

    fn parse(json: &str) -> String {
        serde_json::from_str::<Sample>(json).unwrap().value
    }

    #[test]
    fn test_number_text_keeps_literal() {
        assert_eq!(parse(r#"{"value": 1.50}"#), "1.50");
        assert_eq!(parse(r#"{"value": 1700000000}"#), "1700000000");
        assert_eq!(parse(r#"{"value": "4"}"#), "4");
        assert_eq!(parse(r#"{"value": null}"#), "");
    }

    #[test]
    fn test_number_text_passes_other_json_through() {
        assert_eq!(parse(r#"{"value": {"a":1}}"#), r#"{"a":1}"#);
    }
}
