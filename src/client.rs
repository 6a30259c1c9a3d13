//! HTTP transport for the Explore API v2.

use std::future::Future;
use std::time::Duration;

use reqwest::Url;
use serde_json::Value;

use crate::error::{OdsqlError, OdsqlResult};
use crate::resolver::EndpointDecision;

/// Root of the API below the host.
pub const API_ROOT: [&str; 2] = ["api", "v2"];

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Something that can answer a resolved request with a JSON body.
pub trait Transport {
    fn fetch(&self, decision: &EndpointDecision) -> impl Future<Output = OdsqlResult<Value>>;
}

/// HTTP basic auth credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

/// [`Transport`] over reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base: Url,
    credentials: Option<Credentials>,
}

impl HttpTransport {
    /// `host` may omit the scheme, `https://` is assumed.
    pub fn new(
        host: &str,
        credentials: Option<Credentials>,
        timeout: Duration,
    ) -> OdsqlResult<Self> {
        let base = parse_host(host)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("odsql/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base,
            credentials,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn request_url(&self, decision: &EndpointDecision) -> OdsqlResult<Url> {
        request_url(&self.base, decision)
    }

    /// The GET for `decision`, with query parameters and credentials attached.
    pub fn request(&self, decision: &EndpointDecision) -> OdsqlResult<reqwest::RequestBuilder> {
        let url = self.request_url(decision)?;
        tracing::debug!(%url, params = ?decision.parameters, "GET {}", decision.endpoint);

        let mut request = self.client.get(url).query(&decision.parameters);
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.user, Some(&credentials.password));
        }
        Ok(request)
    }
}

impl Transport for HttpTransport {
    async fn fetch(&self, decision: &EndpointDecision) -> OdsqlResult<Value> {
        let response = self.request(decision)?.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "request failed");
            return Err(OdsqlError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

pub fn parse_host(host: &str) -> OdsqlResult<Url> {
    let with_scheme = if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    };
    let url = Url::parse(&with_scheme)
        .map_err(|e| OdsqlError::Config(format!("invalid host '{}': {}", host, e)))?;
    if url.cannot_be_a_base() {
        return Err(OdsqlError::Config(format!("invalid host '{}'", host)));
    }
    Ok(url)
}

/// `{base}/api/v2/{path}`; each path segment is percent-encoded on its own.
pub fn request_url(base: &Url, decision: &EndpointDecision) -> OdsqlResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| OdsqlError::Config(format!("'{}' cannot be a base URL", base)))?
        .pop_if_empty()
        .extend(API_ROOT)
        .extend(decision.path_segments());
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::DataQuery;
    use crate::options::OptionStore;
    use crate::resolver::resolve;

    #[test]
    fn test_host_without_scheme() {
        let url = parse_host("data.example.com").unwrap();
        assert_eq!(url.as_str(), "https://data.example.com/");
    }

    #[test]
    fn test_records_url() {
        let base = parse_host("http://localhost:8080").unwrap();
        let decision = resolve(&DataQuery::new("my-set"), &OptionStore::new());
        assert_eq!(
            request_url(&base, &decision).unwrap().as_str(),
            "http://localhost:8080/api/v2/catalog/datasets/my-set/records"
        );
    }

    #[test]
    fn test_catalog_url_with_base_path() {
        let base = parse_host("https://example.com/portal/").unwrap();
        let decision = resolve(&DataQuery::new("catalog"), &OptionStore::new());
        assert_eq!(
            request_url(&base, &decision).unwrap().as_str(),
            "https://example.com/portal/api/v2/catalog/datasets"
        );
    }

    #[test]
    fn test_dataset_segment_is_encoded() {
        let base = parse_host("https://example.com").unwrap();
        let decision = resolve(&DataQuery::new("a/b c"), &OptionStore::new());
        assert_eq!(
            request_url(&base, &decision).unwrap().as_str(),
            "https://example.com/api/v2/catalog/datasets/a%2Fb%20c/records"
        );
    }

    #[test]
    fn test_request_carries_auth_and_params() {
        let credentials = Credentials {
            user: "alice".to_string(),
            password: "secret".to_string(),
        };
        let transport = HttpTransport::new(
            "data.example.com",
            Some(credentials),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
        .unwrap();
        let mut q = DataQuery::new("sales");
        q.limit = Some(10);
        let request = transport
            .request(&resolve(&q, &OptionStore::new()))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(
            request.headers()["authorization"],
            "Basic YWxpY2U6c2VjcmV0"
        );
        assert_eq!(
            request.url().as_str(),
            "https://data.example.com/api/v2/catalog/datasets/sales/records?select=*&rows=10&timezone=UTC"
        );
    }

    #[test]
    fn test_anonymous_request_has_no_auth() {
        let transport =
            HttpTransport::new("data.example.com", None, Duration::from_secs(1)).unwrap();
        let request = transport
            .request(&resolve(&DataQuery::new("catalog"), &OptionStore::new()))
            .unwrap()
            .build()
            .unwrap();
        assert!(request.headers().get("authorization").is_none());
    }

    #[test]
    fn test_invalid_host() {
        assert!(matches!(
            parse_host("http://"),
            Err(OdsqlError::Config(_))
        ));
    }
}
