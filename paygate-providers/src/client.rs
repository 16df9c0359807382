//! HTTP transport shared by the adapters
//!
//! Request paths are resolved against the provider's base URL, so adapters
//! only ever deal with paths such as `/api/v1/session`.

use crate::{GatewayError, GatewayResult};
use reqwest::header::REFERER;
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::debug;
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Common HTTP client for providers
#[derive(Debug, Clone)]
pub struct ProviderClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ProviderClient {
    /// Create a new provider client
    pub fn new(base_url: &str) -> GatewayResult<Self> {
        let client = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Self::with_client(base_url, client)
    }

    /// Create a provider client around an existing `reqwest::Client`
    pub fn with_client(base_url: &str, client: reqwest::Client) -> GatewayResult<Self> {
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a path against the base URL
    pub fn url(&self, path: &str) -> GatewayResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// POST request with JSON body
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        headers: &[(&str, String)],
    ) -> GatewayResult<reqwest::Response> {
        let url = self.url(path)?;
        debug!(url = %url, "POST");
        let mut request = self
            .client
            .post(url)
            .header(REFERER, self.base_url.as_str())
            .json(body);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }
        Ok(request.send().await?)
    }

    /// GET request with query parameters
    pub async fn get(
        &self,
        path: &str,
        query: &[(String, String)],
        headers: &[(&str, String)],
    ) -> GatewayResult<reqwest::Response> {
        let url = self.url(path)?;
        debug!(url = %url, "GET");
        let mut request = self
            .client
            .get(url)
            .header(REFERER, self.base_url.as_str())
            .query(query);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }
        Ok(request.send().await?)
    }

    /// Read a JSON response body
    ///
    /// A body that does not parse is reported as a provider error when the
    /// HTTP status is not a success, and as a serialization error otherwise.
    pub async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> GatewayResult<T> {
        let status = response.status();
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                GatewayError::from(e)
            } else {
                GatewayError::provider(status.as_u16(), body)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize)]
    struct Echo {
        ok: bool,
    }

    #[test]
    fn test_url_resolution() {
        let client = ProviderClient::new("https://api.example.com").unwrap();
        assert_eq!(
            client.url("/coin/pay/order").unwrap().as_str(),
            "https://api.example.com/coin/pay/order"
        );

        let nested = ProviderClient::new("https://api.example.com/v2/").unwrap();
        assert_eq!(
            nested.url("/api/x").unwrap().as_str(),
            "https://api.example.com/api/x"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ProviderClient::new("::nope"),
            Err(GatewayError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_post_json_sends_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .and(header("x-sig", "abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let client = ProviderClient::new(&server.uri()).unwrap();
        let resp = client
            .post_json("/orders", &serde_json::json!({"a": 1}), &[("x-sig", "abc".to_string())])
            .await
            .unwrap();
        let echo: Echo = ProviderClient::read_json(resp).await.unwrap();
        assert!(echo.ok);
    }

    #[tokio::test]
    async fn test_get_with_query_and_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/va"))
            .and(query_param("id", "7"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = ProviderClient::new(&server.uri()).unwrap();
        let resp = client
            .get("/va", &[("id".to_string(), "7".to_string())], &[])
            .await
            .unwrap();
        let err = ProviderClient::read_json::<Echo>(resp).await.unwrap_err();
        assert!(matches!(err, GatewayError::Provider { ref code, .. } if code == "502"));
    }
}
