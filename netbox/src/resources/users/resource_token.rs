//! Token resource implementation
//!
//! Tokens are always written with a full-object PUT and re-read afterwards,
//! so the stored state reflects what the server kept.

use crate::api::users::tokens::{Token, WritableToken};
use crate::api::{ApiError, Client};
use crate::NetboxProviderData;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat};
use std::future::Future;
use tfplug::context::Context;
use tfplug::import::import_state_passthrough_id;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder, StringKind};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{CidrValidator, ListElementsValidator, Rfc3339Validator};
use tracing::{debug, warn};

/// Length of a legacy (v1) token key
const V1_KEY_LENGTH: usize = 40;

const RESOURCE_DESCRIPTION: &str = "From the [official documentation](https://docs.netbox.dev/en/stable/rest-api/authentication/#tokens):

> A token is a unique identifier mapped to a NetBox user account. Each user may have one or more tokens which he or she can use for authentication when making REST API requests. To create a token, navigate to the API tokens page under your user profile.

**NetBox 4.5+ Token Versions:**
- **v1 tokens**: Legacy 40-character tokens. You can specify the key directly.
- **v2 tokens**: New format (nbt_<KEY>.<SECRET>). Leave key empty to let NetBox generate a v2 token. The full token is only shown once at creation time in the NetBox UI.";

/// The write a request body is built for
///
/// A create sends any non-empty key and leaves an unset expiry out. An update
/// only sends v1 keys, since v2 keys cannot be changed, and clears an unset
/// expiry with an explicit null.
#[derive(Debug, Clone, Copy, PartialEq)]
enum WriteKind {
    Create,
    Update,
}

#[derive(Default)]
pub struct TokenResource {
    provider_data: Option<NetboxProviderData>,
}

impl TokenResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self) -> Result<&Client, Diagnostic> {
        self.provider_data
            .as_ref()
            .map(|data| data.client.as_ref())
            .ok_or_else(|| {
                Diagnostic::error(
                    "Provider not configured",
                    "Provider data was not properly configured",
                )
            })
    }
}

fn attr(name: &str) -> AttributePath {
    AttributePath::new(name)
}

/// Run an API call, giving up when Terraform stops the provider
async fn cancellable<T>(
    ctx: &Context,
    call: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, ApiError> {
    tokio::select! {
        _ = ctx.cancelled() => Err(ApiError::Cancelled),
        result = call => result,
    }
}

fn parse_id(state: &DynamicValue) -> Result<i64, Diagnostic> {
    let id = state.get_string(&attr("id")).unwrap_or_default();
    id.parse::<i64>().map_err(|_| {
        Diagnostic::error(
            "Invalid token ID",
            format!("Expected a numeric NetBox token ID, got {:?}", id),
        )
        .with_attribute(attr("id"))
    })
}

/// Build the write request from a planned state
fn writable_token(planned: &DynamicValue, kind: WriteKind) -> Result<WritableToken, Diagnostic> {
    let user = planned.get_i64(&attr("user_id")).map_err(|e| {
        Diagnostic::error("Invalid user_id", e.to_string()).with_attribute(attr("user_id"))
    })?;

    let key = planned
        .get_string(&attr("key"))
        .ok()
        .filter(|key| !key.is_empty())
        .filter(|key| kind == WriteKind::Create || key.len() == V1_KEY_LENGTH);

    let expires = match planned.get_string(&attr("expires")) {
        Ok(expires) if !expires.is_empty() => {
            Some(Some(DateTime::parse_from_rfc3339(&expires).map_err(|e| {
                Diagnostic::error(
                    "Invalid expires",
                    format!("{:?} is not an RFC 3339 timestamp: {}", expires, e),
                )
                .with_attribute(attr("expires"))
            })?))
        }
        _ if kind == WriteKind::Update => Some(None),
        _ => None,
    };

    Ok(WritableToken {
        user,
        key,
        allowed_ips: planned.get_string_list(&attr("allowed_ips")).unwrap_or_default(),
        write_enabled: planned.get_bool(&attr("write_enabled")).unwrap_or(false),
        description: planned.get_string(&attr("description")).unwrap_or_default(),
        expires,
    })
}

/// Map a token onto Terraform state
///
/// `basis` is the planned or prior state. Optional attributes that are null
/// there stay null when the server reports its zero value, withheld keys keep
/// their known value and equal expiry instants keep the configured spelling.
fn token_state(token: &Token, basis: &DynamicValue) -> DynamicValue {
    let mut values = std::collections::HashMap::new();
    let known = |name: &str| match basis.get_or_null(&attr(name)) {
        Dynamic::Unknown => Dynamic::Null,
        value => value,
    };
    let null_in_basis = |name: &str| basis.get_or_null(&attr(name)).is_null();

    values.insert("id".to_string(), Dynamic::String(token.id.to_string()));

    let user_id = match &token.user {
        Some(user) => Dynamic::Number(user.id() as f64),
        None => known("user_id"),
    };
    values.insert("user_id".to_string(), user_id);

    let key = match token.key.as_deref() {
        Some(key) if !key.is_empty() => Dynamic::String(key.to_string()),
        _ => known("key"),
    };
    values.insert("key".to_string(), key);

    let last_used = token
        .last_used
        .map(|ts| Dynamic::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
        .unwrap_or(Dynamic::Null);
    values.insert("last_used".to_string(), last_used);

    let expires = match token.expires {
        None => Dynamic::Null,
        Some(remote) => match basis.get_string(&attr("expires")) {
            Ok(spelled) if DateTime::parse_from_rfc3339(&spelled).is_ok_and(|t| t == remote) => {
                Dynamic::String(spelled)
            }
            _ => Dynamic::String(remote.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        },
    };
    values.insert("expires".to_string(), expires);

    let allowed_ips = if token.allowed_ips.is_empty() && null_in_basis("allowed_ips") {
        Dynamic::Null
    } else {
        Dynamic::List(
            token
                .allowed_ips
                .iter()
                .cloned()
                .map(Dynamic::String)
                .collect(),
        )
    };
    values.insert("allowed_ips".to_string(), allowed_ips);

    let write_enabled = if !token.write_enabled && null_in_basis("write_enabled") {
        Dynamic::Null
    } else {
        Dynamic::Bool(token.write_enabled)
    };
    values.insert("write_enabled".to_string(), write_enabled);

    let description = if token.description.is_empty() && null_in_basis("description") {
        Dynamic::Null
    } else {
        Dynamic::String(token.description.clone())
    };
    values.insert("description".to_string(), description);

    DynamicValue::new(Dynamic::Map(values))
}

/// Fetch a token and map it onto state, `None` when it no longer exists
async fn refresh(
    ctx: &Context,
    client: &Client,
    id: i64,
    basis: &DynamicValue,
) -> Result<Option<DynamicValue>, ApiError> {
    match cancellable(ctx, client.users().tokens().get(id)).await {
        Ok(token) => Ok(Some(token_state(&token, basis))),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Re-read a token after a write, falling back to the write response
async fn state_after_write(
    ctx: &Context,
    client: &Client,
    written: &Token,
    basis: &DynamicValue,
    diagnostics: &mut Vec<Diagnostic>,
) -> DynamicValue {
    match refresh(ctx, client, written.id, basis).await {
        Ok(Some(state)) => state,
        Ok(None) => {
            diagnostics.push(Diagnostic::error(
                "Token disappeared",
                format!("Token {} was not found right after it was written", written.id),
            ));
            token_state(written, basis)
        }
        Err(e) => {
            diagnostics.push(Diagnostic::error(
                "Failed to read token",
                format!("API error: {}", e),
            ));
            token_state(written, basis)
        }
    }
}

#[async_trait]
impl Resource for TokenResource {
    fn type_name(&self) -> &str {
        "netbox_token"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description(RESOURCE_DESCRIPTION)
            .description_kind(StringKind::Markdown)
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("NetBox ID of the token")
                    .computed()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("user_id", AttributeType::Number)
                    .description("ID of the user owning the token")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("key", AttributeType::String)
                    .description(
                        "For v1 tokens: specify a 40-character key. For v2 tokens (NetBox 4.5+): \
                         leave empty to let NetBox generate the token. Note: v2 token plaintext \
                         is only available at creation time in NetBox UI.",
                    )
                    .optional()
                    .computed()
                    .sensitive()
                    .plan_modifier(Box::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "allowed_ips",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("Source prefixes the token may be used from, in CIDR notation")
                .optional()
                .validator(Box::new(ListElementsValidator::new(Box::new(CidrValidator))))
                .build(),
            )
            .attribute(
                AttributeBuilder::new("write_enabled", AttributeType::Bool)
                    .description("Permit create/update/delete operations using this token")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("last_used", AttributeType::String)
                    .description("Time the token was last used")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("expires", AttributeType::String)
                    .description("Expiration time of the token, as an RFC 3339 timestamp")
                    .optional()
                    .validator(Box::new(Rfc3339Validator))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .optional()
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];

        if let Ok(user_id) = request.config.get_number(&attr("user_id")) {
            if user_id.fract() != 0.0 || user_id < 1.0 {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid user_id",
                        format!("user_id must be a positive whole number, got {}", user_id),
                    )
                    .with_attribute(attr("user_id")),
                );
            }
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let client = match self.client() {
            Ok(client) => client,
            Err(diag) => {
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };

        let body = match writable_token(&request.planned_state, WriteKind::Create) {
            Ok(body) => body,
            Err(diag) => {
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };

        let created = match cancellable(&ctx, client.users().tokens().create(&body)).await {
            Ok(created) => created,
            Err(e) => {
                warn!(error = %e, "Token create failed");
                diagnostics.push(Diagnostic::error(
                    "Failed to create token",
                    format!("API error: {}", e),
                ));
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    private: vec![],
                    diagnostics,
                };
            }
        };
        debug!(id = created.id, "Created token");

        // The key is usually only returned here; later reads withhold it
        let mut basis = request.planned_state;
        if let Some(key) = created.key.as_ref().filter(|key| !key.is_empty()) {
            if let Err(e) = basis.set_string(&attr("key"), key.clone()) {
                diagnostics.push(
                    Diagnostic::warning("Failed to record token key", e.to_string())
                        .with_attribute(attr("key")),
                );
            }
        }

        let new_state = state_after_write(&ctx, client, &created, &basis, &mut diagnostics).await;

        CreateResourceResponse {
            new_state,
            private: vec![],
            diagnostics,
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let fail = |request: ReadResourceRequest, diag: Diagnostic| ReadResourceResponse {
            new_state: Some(request.current_state),
            diagnostics: vec![diag],
            private: request.private,
        };

        let client = match self.client() {
            Ok(client) => client,
            Err(diag) => return fail(request, diag),
        };
        let id = match parse_id(&request.current_state) {
            Ok(id) => id,
            Err(diag) => return fail(request, diag),
        };

        match refresh(&ctx, client, id, &request.current_state).await {
            Ok(Some(state)) => ReadResourceResponse {
                new_state: Some(state),
                diagnostics: vec![],
                private: request.private,
            },
            Ok(None) => {
                debug!(id, "Token no longer exists, removing from state");
                ReadResourceResponse {
                    new_state: None,
                    diagnostics: vec![],
                    private: request.private,
                }
            }
            Err(e) => fail(
                request,
                Diagnostic::error("Failed to read token", format!("API error: {}", e)),
            ),
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut diagnostics = vec![];

        let prepared = self.client().and_then(|client| {
            let id = parse_id(&request.prior_state)?;
            let body = writable_token(&request.planned_state, WriteKind::Update)?;
            Ok((client, id, body))
        });
        let (client, id, body) = match prepared {
            Ok(prepared) => prepared,
            Err(diag) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };

        let updated = match cancellable(&ctx, client.users().tokens().update(id, &body)).await {
            Ok(updated) => updated,
            Err(e) => {
                warn!(id, error = %e, "Token update failed");
                diagnostics.push(Diagnostic::error(
                    "Failed to update token",
                    format!("API error: {}", e),
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let new_state = state_after_write(
            &ctx,
            client,
            &updated,
            &request.planned_state,
            &mut diagnostics,
        )
        .await;

        UpdateResourceResponse {
            new_state,
            private: vec![],
            diagnostics,
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let prepared = self
            .client()
            .and_then(|client| Ok((client, parse_id(&request.prior_state)?)));
        let (client, id) = match prepared {
            Ok(prepared) => prepared,
            Err(diag) => {
                return DeleteResourceResponse {
                    diagnostics: vec![diag],
                }
            }
        };

        match cancellable(&ctx, client.users().tokens().delete(id)).await {
            Ok(()) => DeleteResourceResponse {
                diagnostics: vec![],
            },
            Err(e) if e.is_not_found() => {
                debug!(id, "Token already deleted");
                DeleteResourceResponse {
                    diagnostics: vec![],
                }
            }
            Err(e) => DeleteResourceResponse {
                diagnostics: vec![Diagnostic::error(
                    "Failed to delete token",
                    format!("API error: {}", e),
                )],
            },
        }
    }

    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };

        if request.id.parse::<i64>().is_err() {
            response.diagnostics.push(Diagnostic::error(
                "Invalid import ID",
                format!("Expected a numeric NetBox token ID, got {:?}", request.id),
            ));
            return response;
        }

        import_state_passthrough_id(&ctx, attr("id"), &request, &mut response);
        response
    }
}

#[async_trait]
impl ResourceWithConfigure for TokenResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        // No data yet is normal: Terraform validates before configuring
        if let Some(data) = request.provider_data {
            if let Some(provider_data) = data.downcast_ref::<NetboxProviderData>() {
                self.provider_data = Some(provider_data.clone());
            } else {
                diagnostics.push(Diagnostic::error(
                    "Invalid provider data",
                    "Expected NetboxProviderData from the netbox provider",
                ));
            }
        }

        ConfigureResourceResponse { diagnostics }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::users::tokens::UserRef;
    use std::sync::Arc;
    use tfplug::types::ClientCapabilities;

    const V1_KEY: &str = "0123456789abcdef0123456789abcdef01234567";

    fn token() -> Token {
        Token {
            id: 7,
            user: Some(UserRef::Id(3)),
            key: None,
            allowed_ips: vec![],
            write_enabled: false,
            last_used: None,
            expires: None,
            description: String::new(),
        }
    }

    fn planned(pairs: &[(&str, Dynamic)]) -> DynamicValue {
        let mut state = DynamicValue::empty_object();
        for name in [
            "id",
            "user_id",
            "key",
            "allowed_ips",
            "write_enabled",
            "last_used",
            "expires",
            "description",
        ] {
            state.set_null(&attr(name)).unwrap();
        }
        for (name, value) in pairs {
            state.set_dynamic(&attr(name), value.clone()).unwrap();
        }
        state
    }

    #[test]
    fn create_request_sends_any_non_empty_key() {
        let state = planned(&[
            ("user_id", Dynamic::Number(3.0)),
            ("key", Dynamic::String("short".into())),
            ("expires", Dynamic::String("2030-01-01T00:00:00+02:00".into())),
        ]);

        let body = writable_token(&state, WriteKind::Create).unwrap();
        assert_eq!(body.user, 3);
        assert_eq!(body.key.as_deref(), Some("short"));
        assert!(body.allowed_ips.is_empty());
        assert!(!body.write_enabled);
        assert_eq!(body.description, "");
        assert_eq!(
            body.expires,
            Some(Some(
                DateTime::parse_from_rfc3339("2029-12-31T22:00:00Z").unwrap()
            ))
        );

        let unset = planned(&[("user_id", Dynamic::Number(3.0))]);
        assert_eq!(writable_token(&unset, WriteKind::Create).unwrap().expires, None);
    }

    #[test]
    fn update_request_clears_unset_expiry() {
        let state = planned(&[("user_id", Dynamic::Number(3.0))]);

        let body = writable_token(&state, WriteKind::Update).unwrap();
        assert_eq!(body.expires, Some(None));

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json.get("expires"), Some(&serde_json::Value::Null));
    }

    #[test]
    fn update_request_sends_only_v1_keys() {
        let v1 = planned(&[
            ("user_id", Dynamic::Number(3.0)),
            ("key", Dynamic::String(V1_KEY.into())),
        ]);
        assert_eq!(
            writable_token(&v1, WriteKind::Update).unwrap().key.as_deref(),
            Some(V1_KEY)
        );

        let v2 = planned(&[
            ("user_id", Dynamic::Number(3.0)),
            ("key", Dynamic::String("nbt_abc123".into())),
        ]);
        assert!(writable_token(&v2, WriteKind::Update).unwrap().key.is_none());

        let unknown = planned(&[("user_id", Dynamic::Number(3.0)), ("key", Dynamic::Unknown)]);
        assert!(writable_token(&unknown, WriteKind::Create)
            .unwrap()
            .key
            .is_none());
    }

    #[test]
    fn malformed_expires_is_rejected_before_any_call() {
        let state = planned(&[
            ("user_id", Dynamic::Number(3.0)),
            ("expires", Dynamic::String("tomorrow".into())),
        ]);

        let diag = writable_token(&state, WriteKind::Create).unwrap_err();
        assert_eq!(diag.summary, "Invalid expires");
    }

    #[test]
    fn unset_optionals_stay_null_for_zero_values() {
        let state = token_state(&token(), &planned(&[("key", Dynamic::Unknown)]));

        assert_eq!(state.get_string(&attr("id")).unwrap(), "7");
        assert_eq!(state.get_i64(&attr("user_id")).unwrap(), 3);
        for name in [
            "key",
            "allowed_ips",
            "write_enabled",
            "description",
            "expires",
            "last_used",
        ] {
            assert!(state.get(&attr(name)).unwrap().is_null(), "{}", name);
        }
    }

    #[test]
    fn configured_values_are_reported_even_when_zero() {
        let basis = planned(&[
            ("allowed_ips", Dynamic::List(vec![])),
            ("write_enabled", Dynamic::Bool(false)),
            ("description", Dynamic::String(String::new())),
        ]);
        let state = token_state(&token(), &basis);

        assert_eq!(state.get_list(&attr("allowed_ips")).unwrap(), vec![]);
        assert!(!state.get_bool(&attr("write_enabled")).unwrap());
        assert_eq!(state.get_string(&attr("description")).unwrap(), "");
    }

    #[test]
    fn withheld_key_keeps_known_value() {
        let basis = planned(&[("key", Dynamic::String(V1_KEY.into()))]);
        let state = token_state(&token(), &basis);
        assert_eq!(state.get_string(&attr("key")).unwrap(), V1_KEY);

        let mut returned = token();
        returned.key = Some("nbt_public".into());
        let state = token_state(&returned, &basis);
        assert_eq!(state.get_string(&attr("key")).unwrap(), "nbt_public");
    }

    #[test]
    fn expires_keeps_spelling_of_same_instant() {
        let mut remote = token();
        remote.expires = Some(DateTime::parse_from_rfc3339("2029-12-31T22:00:00Z").unwrap());

        let same = planned(&[("expires", Dynamic::String("2030-01-01T00:00:00+02:00".into()))]);
        assert_eq!(
            token_state(&remote, &same)
                .get_string(&attr("expires"))
                .unwrap(),
            "2030-01-01T00:00:00+02:00"
        );

        let other = planned(&[("expires", Dynamic::String("2031-01-01T00:00:00Z".into()))]);
        assert_eq!(
            token_state(&remote, &other)
                .get_string(&attr("expires"))
                .unwrap(),
            "2029-12-31T22:00:00Z"
        );
    }

    #[test]
    fn remote_user_overrides_state() {
        let mut remote = token();
        remote.user = None;
        let state = token_state(&remote, &planned(&[("user_id", Dynamic::Number(9.0))]));
        assert_eq!(state.get_i64(&attr("user_id")).unwrap(), 9);

        let state = token_state(&token(), &planned(&[("user_id", Dynamic::Number(9.0))]));
        assert_eq!(state.get_i64(&attr("user_id")).unwrap(), 3);
    }

    #[test]
    fn non_numeric_id_is_an_error() {
        let diag = parse_id(&planned(&[("id", Dynamic::String("abc".into()))])).unwrap_err();
        assert_eq!(diag.summary, "Invalid token ID");
        assert_eq!(
            parse_id(&planned(&[("id", Dynamic::String("12".into()))])).unwrap(),
            12
        );
    }

    #[tokio::test]
    async fn crud_requires_configured_provider() {
        let mut resource = TokenResource::new();
        let response = resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: None,
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());

        let state = planned(&[("id", Dynamic::String("7".into()))]);
        let read = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "netbox_token".to_string(),
                    current_state: state.clone(),
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;
        assert_eq!(read.diagnostics[0].summary, "Provider not configured");
        assert_eq!(read.new_state, Some(state));
    }

    #[tokio::test]
    async fn configure_rejects_foreign_provider_data() {
        let mut resource = TokenResource::new();
        let response = resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(Arc::new("not provider data")),
                },
            )
            .await;

        assert_eq!(response.diagnostics[0].summary, "Invalid provider data");
    }

    #[tokio::test]
    async fn cancelled_context_aborts_calls() {
        let ctx = Context::new();
        ctx.cancel();

        let result: Result<(), ApiError> =
            cancellable(&ctx, std::future::pending::<Result<(), ApiError>>()).await;
        assert!(matches!(result, Err(ApiError::Cancelled)));
    }

    #[tokio::test]
    async fn import_rejects_non_numeric_ids() {
        let resource = TokenResource::new();
        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "netbox_token".to_string(),
                    id: "ci-token".to_string(),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert!(response.imported_resources.is_empty());
        assert_eq!(response.diagnostics[0].summary, "Invalid import ID");
    }
}
