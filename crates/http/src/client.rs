use std::time::Duration;

use async_trait::async_trait;
use crosscheck_core::config::ServiceConfig;
use crosscheck_core::domain::http::{HttpMethod, HttpRequest, HttpResponse};
use crosscheck_core::errors::TransportError;
use crosscheck_core::ports::HttpAdapter;
use reqwest::{Client, Method};
use tracing::debug;

/// `HttpAdapter` over a shared reqwest client. Status codes pass through
/// untouched; there are no retries.
pub struct ReqwestAdapter {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ReqwestAdapter {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = Client::builder().timeout(timeout).build().map_err(|error| {
            TransportError::InvalidRequest { url: base_url.clone(), message: error.to_string() }
        })?;

        Ok(Self { client, base_url, timeout })
    }

    pub fn from_config(service: &ServiceConfig) -> Result<Self, TransportError> {
        Self::new(&service.base_url, Duration::from_secs(service.request_timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, path: &str) -> String {
        if path.is_empty() {
            return self.base_url.clone();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn classify(&self, url: &str, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else if error.is_builder() {
            TransportError::InvalidRequest { url: url.to_string(), message: error.to_string() }
        } else {
            TransportError::Unreachable { url: url.to_string(), message: error.to_string() }
        }
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl HttpAdapter for ReqwestAdapter {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self.url_for(&request.path);
        let mut builder = self.client.request(method(request.method), &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|error| self.classify(&url, error))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
            })
            .collect();
        let body = response.text().await.map_err(|error| {
            if error.is_timeout() {
                self.classify(&url, error)
            } else {
                TransportError::Body { url: url.clone(), message: error.to_string() }
            }
        })?;

        debug!(
            event_name = "http.exchange.completed",
            method = %request.method,
            url = %url,
            status,
            "received response"
        );

        Ok(HttpResponse { status, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crosscheck_core::config::AppConfig;

    use super::ReqwestAdapter;

    #[test]
    fn url_join_never_doubles_slashes() {
        let adapter =
            ReqwestAdapter::new("http://localhost:8081/", Duration::from_secs(1)).expect("client");

        assert_eq!(adapter.base_url(), "http://localhost:8081");
        assert_eq!(adapter.url_for("/api/customer"), "http://localhost:8081/api/customer");
        assert_eq!(adapter.url_for("api/customer/7"), "http://localhost:8081/api/customer/7");
        assert_eq!(adapter.url_for(""), "http://localhost:8081");
    }

    #[test]
    fn config_supplies_base_url() {
        let config = AppConfig::default();
        let adapter = ReqwestAdapter::from_config(&config.service).expect("client");

        assert_eq!(adapter.base_url(), "http://localhost:8081");
    }
}
