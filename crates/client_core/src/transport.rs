use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One logical request against the audit server. `path` is relative to the
/// transport's base url.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

pub struct HttpTransport {
    http: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let mut base_url =
            Url::parse(server_url).map_err(|err| TransportError::InvalidUrl(err.to_string()))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|err| TransportError::Connection(err.to_string()))?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| TransportError::InvalidUrl(err.to_string()))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_decode() || err.is_body() {
        TransportError::Malformed(err.to_string())
    } else {
        TransportError::Connection(err.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.endpoint(&request.path)?;
        let builder = match (request.method, request.body.as_ref()) {
            (Method::Get, None) => self.http.get(url),
            (Method::Get, Some(query)) => self.http.get(url).query(query),
            (Method::Post, None) => self.http.post(url),
            (Method::Post, Some(body)) => self.http.post(url).json(body),
        };

        let res = builder.send().await.map_err(map_reqwest_error)?;
        let status = res.status().as_u16();
        let raw = res.text().await.map_err(map_reqwest_error)?;
        debug!(status, path = %request.path, bytes = raw.len(), "response received");

        let body = if raw.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&raw).map_err(|err| TransportError::Malformed(err.to_string()))?
        };

        Ok(ApiResponse { status, body })
    }
}
