use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::common::ApiErrorDetails;
use super::error::ApiError;

/// Prefix of v2 tokens (NetBox 4.5+), sent as a bearer token
const V2_TOKEN_PREFIX: &str = "nbt_";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub api_token: String,
    /// Accept self-signed or otherwise invalid TLS certificates
    pub insecure: bool,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_token: api_token.into(),
            insecure: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// NetBox API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    auth_header: String,
}

impl Client {
    /// Create a new API client with the default timeout
    pub fn new(endpoint: &str, api_token: &str, insecure: bool) -> Result<Self, ApiError> {
        Self::with_config(ClientConfig {
            insecure,
            ..ClientConfig::new(endpoint, api_token)
        })
    }

    pub fn with_config(config: ClientConfig) -> Result<Self, ApiError> {
        let parsed = url::Url::parse(&config.endpoint)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", config.endpoint, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!(
                "{}: scheme must be http or https",
                config.endpoint
            )));
        }

        let http_client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: config.endpoint.trim_end_matches('/').to_string(),
                auth_header: auth_header(&config.api_token),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Users API operations
    pub fn users(&self) -> crate::api::users::UsersApi<'_> {
        crate::api::users::UsersApi::new(self)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.execute(self.request(Method::GET, path)).await?;
        Self::parse_success_response(response).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .execute(self.request(Method::POST, path).json(body))
            .await?;
        Self::parse_success_response(response).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .execute(self.request(Method::PUT, path).json(body))
            .await?;
        Self::parse_success_response(response).await
    }

    /// NetBox answers a successful DELETE with 204 and no body
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute(self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.inner.base_url, path);
        tracing::debug!(%method, %url, "NetBox API request");

        self.inner
            .http_client
            .request(method, url)
            .header(AUTHORIZATION, &self.inner.auth_header)
            .header(ACCEPT, "application/json")
    }

    /// Send a request once and map non-success statuses to errors
    async fn execute(&self, request: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        tracing::debug!(status = status.as_u16(), "NetBox API response");

        if status.is_success() {
            return Ok(response);
        }
        Err(Self::handle_error_response(response).await)
    }

    async fn parse_success_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;

        serde_json::from_str::<T>(&text).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })
    }

    async fn handle_error_response(response: reqwest::Response) -> ApiError {
        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::warn!(status = status.as_u16(), "NetBox rejected the API token");
            return ApiError::AuthError {
                status: status.as_u16(),
                message: text,
            };
        }

        let details = ApiErrorDetails::from_body(&text).map(Box::new);
        let message = match &details {
            Some(details) => details.to_string(),
            None => text,
        };

        ApiError::ApiError {
            status: status.as_u16(),
            message,
            details,
        }
    }
}

fn auth_header(api_token: &str) -> String {
    if api_token.starts_with(V2_TOKEN_PREFIX) {
        format!("Bearer {}", api_token)
    } else {
        format!("Token {}", api_token)
    }
}
