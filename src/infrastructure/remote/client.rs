use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{redirect, Client as ReqwestClient, Response};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::codec::{EncodingScheme, ENCODING_SCHEME_HEADER};
use super::errors::RemoteError;
use super::retry::RetryPolicy;
use super::stream::LineDecoderStream;
use crate::domain::models::{Document, RemoteConfig};
use crate::infrastructure::credentials::ApiKey;

/// Request header carrying the number of documents in the call
pub const ROW_COUNT_HEADER: &str = "X-Signal-RowCount";

/// Configuration for the remote execution client
#[derive(Debug, Clone)]
pub struct RemoteClientConfig {
    /// Base URL of the remote service, without a trailing slash
    pub base_url: String,

    /// Bearer token sent with every request
    pub api_key: ApiKey,

    /// Timeout for the whole request, including streaming the body
    pub timeout_secs: u64,

    pub retry: RetryPolicy,
}

impl RemoteClientConfig {
    pub fn from_config(config: &RemoteConfig, api_key: ApiKey) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout_secs: config.timeout_secs,
            retry: RetryPolicy::from_config(&config.retry),
        }
    }
}

/// An operation exposed by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEndpoint {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Stateless streaming client for the remote execution service.
///
/// Each call is one HTTP request whose response body is decoded lazily, one
/// Item per line. Redirects are not followed: any status of 300 or above is
/// treated as a failed request.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http_client: ReqwestClient,
    base_url: String,
    api_key: ApiKey,
    retry_policy: RetryPolicy,
}

impl RemoteClient {
    pub fn new(config: RemoteClientConfig) -> Result<Self, RemoteError> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(redirect::Policy::none())
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()?;

        debug!(
            base_url = %config.base_url,
            api_key = %config.api_key.redacted(),
            "Remote client configured"
        );

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            retry_policy: config.retry,
        })
    }

    pub fn from_config(config: &RemoteConfig, api_key: ApiKey) -> Result<Self, RemoteError> {
        Self::new(RemoteClientConfig::from_config(config, api_key))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_headers(&self) -> Result<HeaderMap, RemoteError> {
        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key.expose()))
            .map_err(|_| RemoteError::InvalidApiKey(self.api_key.redacted()))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    /// Offload `operation` for `documents`.
    ///
    /// Returns once the status and encoding scheme are known; Items are decoded
    /// as the caller pulls from the returned stream. A failed status yields no
    /// stream at all, with the full response body as the error message.
    #[instrument(skip(self, documents, options), fields(rows = documents.len()))]
    pub async fn call(
        &self,
        operation: &str,
        documents: &[Document],
        options: &BTreeMap<String, String>,
    ) -> Result<LineDecoderStream, RemoteError> {
        let rows = documents.len();
        let url = format!("{}/{}", self.base_url, operation.trim_start_matches('/'));
        let body = serde_json::to_vec(documents)?;
        let headers = self.auth_headers()?;

        info!(operation, rows, "Offloading signal computation");

        let response = self
            .retry_policy
            .execute(rows, || self.send(&url, headers.clone(), body.clone(), options, rows))
            .await?;

        let scheme = encoding_scheme(&response)?;
        debug!(operation, %scheme, "Remote stream opened");

        Ok(LineDecoderStream::new(response.bytes_stream(), scheme, rows))
    }

    async fn send(
        &self,
        url: &str,
        headers: HeaderMap,
        body: Vec<u8>,
        options: &BTreeMap<String, String>,
        rows: usize,
    ) -> Result<Response, RemoteError> {
        let response = self
            .http_client
            .post(url)
            .headers(headers)
            .header(ROW_COUNT_HEADER, rows)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .query(options)
            .body(body)
            .send()
            .await?;

        ensure_success(response).await
    }

    async fn get(&self, url: &str, headers: HeaderMap) -> Result<Response, RemoteError> {
        let response = self.http_client.get(url).headers(headers).send().await?;
        ensure_success(response).await
    }

    /// List the operations the remote service exposes
    #[instrument(skip(self))]
    pub async fn list_endpoints(&self) -> Result<Vec<RemoteEndpoint>, RemoteError> {
        let url = format!("{}/", self.base_url);
        let headers = self.auth_headers()?;

        let response = self
            .retry_policy
            .execute(0, || self.get(&url, headers.clone()))
            .await?;

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

async fn ensure_success(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.as_u16() < 300 {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error response".to_string());
    Err(RemoteError::Request { status, message })
}

fn encoding_scheme(response: &Response) -> Result<EncodingScheme, RemoteError> {
    let value = response
        .headers()
        .get(ENCODING_SCHEME_HEADER)
        .ok_or(RemoteError::MissingEncodingScheme(ENCODING_SCHEME_HEADER))?;
    let value = value.to_str().map_err(|_| {
        RemoteError::UnknownEncodingScheme(String::from_utf8_lossy(value.as_bytes()).into_owned())
    })?;
    value.parse()
}
