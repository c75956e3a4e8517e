pub mod api;
pub mod provider_data;
pub mod resources;

pub use provider_data::NetboxProviderData;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, Provider, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse, ResourceFactory,
    StopProviderRequest, StopProviderResponse, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::resource::ResourceWithConfigure;
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue, ServerCapabilities};
use tracing::info;

pub const SERVER_URL_ENV: &str = "NETBOX_SERVER_URL";
pub const API_TOKEN_ENV: &str = "NETBOX_API_TOKEN";
pub const ALLOW_INSECURE_HTTPS_ENV: &str = "NETBOX_ALLOW_INSECURE_HTTPS";
pub const REQUEST_TIMEOUT_ENV: &str = "NETBOX_REQUEST_TIMEOUT";

#[derive(Default)]
pub struct NetboxProvider {
    provider_data: Option<NetboxProviderData>,
}

impl NetboxProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_configured(&self) -> bool {
        self.provider_data.is_some()
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// String attribute from the provider block, falling back to its env var
fn string_setting(config: &DynamicValue, name: &str, env: &str) -> Option<String> {
    config
        .get_string(&AttributePath::new(name))
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| env_value(env))
}

fn insecure_setting(config: &DynamicValue) -> Result<bool, Diagnostic> {
    if let Ok(insecure) = config.get_bool(&AttributePath::new("allow_insecure_https")) {
        return Ok(insecure);
    }
    match env_value(ALLOW_INSECURE_HTTPS_ENV) {
        Some(value) => value.parse::<bool>().map_err(|_| {
            Diagnostic::error(
                "Invalid allow_insecure_https",
                format!(
                    "{} must be \"true\" or \"false\", got {:?}",
                    ALLOW_INSECURE_HTTPS_ENV, value
                ),
            )
        }),
        None => Ok(false),
    }
}

fn timeout_setting(config: &DynamicValue) -> Result<Duration, Diagnostic> {
    let path = AttributePath::new("request_timeout");
    let invalid = |detail: String| {
        Diagnostic::error("Invalid request_timeout", detail).with_attribute(path.clone())
    };

    let seconds = match config.get(&path) {
        Ok(value) if !value.is_null() => config
            .get_i64(&path)
            .map_err(|_| invalid("request_timeout must be a whole number of seconds".into()))?,
        _ => match env_value(REQUEST_TIMEOUT_ENV) {
            Some(value) => value.parse::<i64>().map_err(|_| {
                invalid(format!(
                    "{} must be a whole number of seconds, got {:?}",
                    REQUEST_TIMEOUT_ENV, value
                ))
            })?,
            None => return Ok(api::client::DEFAULT_TIMEOUT),
        },
    };

    if seconds <= 0 {
        return Err(invalid(format!(
            "request_timeout must be positive, got {}",
            seconds
        )));
    }
    Ok(Duration::from_secs(seconds as u64))
}

/// Resolve the client configuration from the provider block and environment
fn client_config(config: &DynamicValue) -> Result<api::ClientConfig, Vec<Diagnostic>> {
    let mut diagnostics = vec![];

    let server_url = string_setting(config, "server_url", SERVER_URL_ENV);
    if server_url.is_none() {
        diagnostics.push(
            Diagnostic::error(
                "server_url is required",
                format!(
                    "Set server_url in the provider configuration or the {} environment variable",
                    SERVER_URL_ENV
                ),
            )
            .with_attribute(AttributePath::new("server_url")),
        );
    }

    let api_token = string_setting(config, "api_token", API_TOKEN_ENV);
    if api_token.is_none() {
        diagnostics.push(
            Diagnostic::error(
                "api_token is required",
                format!(
                    "Set api_token in the provider configuration or the {} environment variable",
                    API_TOKEN_ENV
                ),
            )
            .with_attribute(AttributePath::new("api_token")),
        );
    }

    let insecure = insecure_setting(config).map_err(|d| diagnostics.push(d)).ok();
    let timeout = timeout_setting(config).map_err(|d| diagnostics.push(d)).ok();

    match (server_url, api_token, insecure, timeout) {
        (Some(endpoint), Some(api_token), Some(insecure), Some(timeout))
            if diagnostics.is_empty() =>
        {
            Ok(api::ClientConfig {
                endpoint,
                api_token,
                insecure,
                timeout,
            })
        }
        _ => Err(diagnostics),
    }
}

#[async_trait]
impl Provider for NetboxProvider {
    fn type_name(&self) -> &str {
        "netbox"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
            server_capabilities: ServerCapabilities::default(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        let schema = SchemaBuilder::new()
            .description("Manage NetBox objects through the REST API")
            .attribute(
                AttributeBuilder::new("server_url", AttributeType::String)
                    .description(&format!(
                        "Location of the NetBox server including scheme, e.g. https://netbox.example.com. \
                         Reads {} when unset.",
                        SERVER_URL_ENV
                    ))
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("api_token", AttributeType::String)
                    .description(&format!(
                        "NetBox API token. v2 tokens (nbt_...) are sent as Bearer tokens. \
                         Reads {} when unset.",
                        API_TOKEN_ENV
                    ))
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("allow_insecure_https", AttributeType::Bool)
                    .description(&format!(
                        "Skip TLS certificate verification. Reads {} when unset, defaults to false.",
                        ALLOW_INSECURE_HTTPS_ENV
                    ))
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("request_timeout", AttributeType::Number)
                    .description(&format!(
                        "HTTP request timeout in seconds. Reads {} when unset, defaults to 30.",
                        REQUEST_TIMEOUT_ENV
                    ))
                    .optional()
                    .build(),
            )
            .build();

        ProviderSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        let mut diagnostics = vec![];

        if let Ok(server_url) = request.config.get_string(&AttributePath::new("server_url")) {
            if let Err(e) = url::Url::parse(&server_url) {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid server_url",
                        format!("{:?} is not a valid URL: {}", server_url, e),
                    )
                    .with_attribute(AttributePath::new("server_url")),
                );
            }
        }

        if matches!(
            request.config.get(&AttributePath::new("request_timeout")),
            Ok(value) if !value.is_unknown() && !value.is_null()
        ) {
            if let Err(diag) = timeout_setting(&request.config) {
                diagnostics.push(diag);
            }
        }

        ValidateProviderConfigResponse { diagnostics }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let config = match client_config(&request.config) {
            Ok(config) => config,
            Err(diagnostics) => {
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        };

        let endpoint = config.endpoint.clone();
        let insecure = config.insecure;
        match api::Client::with_config(config) {
            Ok(client) => {
                info!(%endpoint, insecure, "Configured NetBox provider");
                let data = NetboxProviderData::new(client);
                self.provider_data = Some(data.clone());

                ConfigureProviderResponse {
                    diagnostics: vec![],
                    provider_data: Some(Arc::new(data)),
                }
            }
            Err(e) => ConfigureProviderResponse {
                diagnostics: vec![Diagnostic::error(
                    "Failed to create API client",
                    e.to_string(),
                )],
                provider_data: None,
            },
        }
    }

    async fn stop(&self, _ctx: Context, _request: StopProviderRequest) -> StopProviderResponse {
        StopProviderResponse { error: None }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            "netbox_token".to_string(),
            Box::new(|| {
                Box::new(resources::TokenResource::new()) as Box<dyn ResourceWithConfigure>
            }),
        );
        factories
    }
}
