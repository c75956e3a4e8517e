//! gRPC service implementation
//!
//! This module implements the Terraform Plugin Protocol v6 on top of the
//! [`Provider`] trait. Resources are created from the provider's factories on
//! every request and configured with the data returned by ConfigureProvider.

use crate::context::Context;
use crate::plan_modifier::values_equal;
use crate::proto::{self, provider_server::Provider as ProviderService};
use crate::provider::{
    ConfigureProviderRequest, Provider, ProviderMetadataRequest, ProviderSchemaRequest,
    StopProviderRequest, ValidateProviderConfigRequest,
};
use crate::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ReadResourceRequest, ResourceSchemaRequest,
    ResourceWithConfigure, UpdateResourceRequest, ValidateResourceConfigRequest,
};
use crate::schema::{
    Attribute, AttributeType, PlanModifierRequest, Schema, StringKind, ValidatorRequest,
};
use crate::types::{
    has_errors, AttributePath, AttributePathStep, ClientCapabilities, Diagnostic,
    DiagnosticSeverity, Dynamic, DynamicValue,
};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, OnceCell, RwLock};
use tonic::{Request, Response, Status};
use tracing::{debug, warn};

/// Schemas gathered once from the provider and its resources
struct SchemaCache {
    provider: Schema,
    resources: HashMap<String, Schema>,
    diagnostics: Vec<Diagnostic>,
}

pub struct GrpcProviderServer<P: Provider> {
    provider: Arc<RwLock<P>>,
    provider_data: RwLock<Option<Arc<dyn Any + Send + Sync>>>,
    schemas: OnceCell<Arc<SchemaCache>>,
    stop_tx: watch::Sender<bool>,
}

impl<P: Provider + 'static> GrpcProviderServer<P> {
    pub fn new(provider: P) -> Self {
        let (stop_tx, _) = watch::channel(false);

        Self {
            provider: Arc::new(RwLock::new(provider)),
            provider_data: RwLock::new(None),
            schemas: OnceCell::new(),
            stop_tx,
        }
    }

    /// Request context, cancelled when Terraform calls StopProvider
    fn context(&self) -> Context {
        Context::new().with_stop(self.stop_tx.subscribe())
    }

    async fn schemas(&self) -> Arc<SchemaCache> {
        self.schemas
            .get_or_init(|| async {
                let ctx = self.context();
                let provider = self.provider.read().await;
                let mut diagnostics = vec![];

                let provider_schema = provider.schema(ctx.clone(), ProviderSchemaRequest).await;
                diagnostics.extend(provider_schema.diagnostics);

                let mut resources = HashMap::new();
                for (type_name, factory) in provider.resources() {
                    let response = factory().schema(ctx.clone(), ResourceSchemaRequest).await;
                    diagnostics.extend(response.diagnostics);
                    resources.insert(type_name, response.schema);
                }

                Arc::new(SchemaCache {
                    provider: provider_schema.schema,
                    resources,
                    diagnostics,
                })
            })
            .await
            .clone()
    }

    #[allow(clippy::result_large_err)]
    fn resource_schema<'a>(
        schemas: &'a SchemaCache,
        type_name: &str,
    ) -> std::result::Result<&'a Schema, Status> {
        schemas
            .resources
            .get(type_name)
            .ok_or_else(|| Status::not_found(format!("Unknown resource type: {}", type_name)))
    }

    /// Create a resource from its factory and hand it the provider data
    async fn resource(
        &self,
        ctx: &Context,
        type_name: &str,
    ) -> std::result::Result<(Box<dyn ResourceWithConfigure>, Vec<Diagnostic>), Status> {
        let mut resource = {
            let provider = self.provider.read().await;
            let factories = provider.resources();
            let factory = factories
                .get(type_name)
                .ok_or_else(|| Status::not_found(format!("Unknown resource type: {}", type_name)))?;
            factory()
        };

        let provider_data = self.provider_data.read().await.clone();
        let response = resource
            .configure(ctx.clone(), ConfigureResourceRequest { provider_data })
            .await;

        Ok((resource, response.diagnostics))
    }
}

#[tonic::async_trait]
impl<P: Provider + 'static> ProviderService for GrpcProviderServer<P> {
    async fn get_metadata(
        &self,
        _request: Request<proto::get_metadata::Request>,
    ) -> std::result::Result<Response<proto::get_metadata::Response>, Status> {
        let provider = self.provider.read().await;
        let metadata = provider
            .metadata(self.context(), ProviderMetadataRequest)
            .await;

        let mut resources: Vec<_> = provider
            .resources()
            .into_keys()
            .map(|type_name| proto::get_metadata::ResourceMetadata { type_name })
            .collect();
        resources.sort_by(|a, b| a.type_name.cmp(&b.type_name));

        Ok(Response::new(proto::get_metadata::Response {
            server_capabilities: Some(server_capabilities_to_proto(&metadata.server_capabilities)),
            diagnostics: vec![],
            resources,
        }))
    }

    async fn get_provider_schema(
        &self,
        _request: Request<proto::get_provider_schema::Request>,
    ) -> std::result::Result<Response<proto::get_provider_schema::Response>, Status> {
        let schemas = self.schemas().await;
        let metadata = self
            .provider
            .read()
            .await
            .metadata(self.context(), ProviderMetadataRequest)
            .await;

        let resource_schemas = schemas
            .resources
            .iter()
            .map(|(name, schema)| (name.clone(), schema_to_proto(schema)))
            .collect();

        Ok(Response::new(proto::get_provider_schema::Response {
            provider: Some(schema_to_proto(&schemas.provider)),
            resource_schemas,
            data_source_schemas: HashMap::new(),
            diagnostics: diagnostics_to_proto(&schemas.diagnostics),
            provider_meta: None,
            server_capabilities: Some(server_capabilities_to_proto(&metadata.server_capabilities)),
        }))
    }

    async fn validate_provider_config(
        &self,
        request: Request<proto::validate_provider_config::Request>,
    ) -> std::result::Result<Response<proto::validate_provider_config::Response>, Status> {
        let req = request.into_inner();
        let config = decode_dynamic_value(req.config.as_ref())?;
        let schemas = self.schemas().await;

        let mut diagnostics = validate_attributes(&schemas.provider, &config);
        let response = self
            .provider
            .read()
            .await
            .validate(self.context(), ValidateProviderConfigRequest { config })
            .await;
        diagnostics.extend(response.diagnostics);

        Ok(Response::new(proto::validate_provider_config::Response {
            diagnostics: diagnostics_to_proto(&diagnostics),
        }))
    }

    async fn validate_resource_config(
        &self,
        request: Request<proto::validate_resource_config::Request>,
    ) -> std::result::Result<Response<proto::validate_resource_config::Response>, Status> {
        let req = request.into_inner();
        debug!(type_name = %req.type_name, "ValidateResourceConfig");

        let config = decode_dynamic_value(req.config.as_ref())?;
        let schemas = self.schemas().await;
        let schema = Self::resource_schema(&schemas, &req.type_name)?;

        let ctx = self.context();
        let (resource, mut diagnostics) = self.resource(&ctx, &req.type_name).await?;
        diagnostics.extend(validate_attributes(schema, &config));

        let response = resource
            .validate(
                ctx,
                ValidateResourceConfigRequest {
                    type_name: req.type_name,
                    config,
                    client_capabilities: client_capabilities_from_proto(
                        req.client_capabilities.as_ref(),
                    ),
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        Ok(Response::new(proto::validate_resource_config::Response {
            diagnostics: diagnostics_to_proto(&diagnostics),
        }))
    }

    async fn upgrade_resource_state(
        &self,
        request: Request<proto::upgrade_resource_state::Request>,
    ) -> std::result::Result<Response<proto::upgrade_resource_state::Response>, Status> {
        let req = request.into_inner();
        debug!(type_name = %req.type_name, version = req.version, "UpgradeResourceState");

        let schemas = self.schemas().await;
        let schema = Self::resource_schema(&schemas, &req.type_name)?;
        let raw_state = req.raw_state.unwrap_or_default();

        let mut diagnostics = vec![];
        let mut upgraded = DynamicValue::null();

        if req.version > schema.version {
            diagnostics.push(Diagnostic::error(
                "Unable to upgrade resource state",
                format!(
                    "The stored state for {} was written by a newer provider (schema version {}, \
                     this provider supports {}). Upgrade the provider.",
                    req.type_name, req.version, schema.version
                ),
            ));
        } else if req.version < schema.version {
            diagnostics.push(Diagnostic::error(
                "Unable to upgrade resource state",
                format!(
                    "{} has no state upgrader from schema version {} to {}",
                    req.type_name, req.version, schema.version
                ),
            ));
        } else if !raw_state.json.is_empty() {
            match DynamicValue::decode_json(&raw_state.json) {
                Ok(state) => upgraded = conform_to_schema(schema, state),
                Err(e) => diagnostics.push(Diagnostic::error(
                    "Unable to read stored state",
                    e.to_string(),
                )),
            }
        } else if !raw_state.flatmap.is_empty() {
            diagnostics.push(Diagnostic::error(
                "Unable to upgrade resource state",
                "State in the legacy flatmap format is not supported",
            ));
        }

        Ok(Response::new(proto::upgrade_resource_state::Response {
            upgraded_state: Some(encode_dynamic_value(&upgraded)?),
            diagnostics: diagnostics_to_proto(&diagnostics),
        }))
    }

    async fn configure_provider(
        &self,
        request: Request<proto::configure_provider::Request>,
    ) -> std::result::Result<Response<proto::configure_provider::Response>, Status> {
        let req = request.into_inner();
        debug!(terraform_version = %req.terraform_version, "ConfigureProvider");

        let config = decode_dynamic_value(req.config.as_ref())?;
        let schemas = self.schemas().await;
        let config = conform_to_schema(&schemas.provider, config);

        let response = self
            .provider
            .write()
            .await
            .configure(
                self.context(),
                ConfigureProviderRequest {
                    terraform_version: req.terraform_version,
                    config,
                    client_capabilities: client_capabilities_from_proto(
                        req.client_capabilities.as_ref(),
                    ),
                },
            )
            .await;

        if !has_errors(&response.diagnostics) {
            *self.provider_data.write().await = response.provider_data;
        }

        Ok(Response::new(proto::configure_provider::Response {
            diagnostics: diagnostics_to_proto(&response.diagnostics),
        }))
    }

    async fn read_resource(
        &self,
        request: Request<proto::read_resource::Request>,
    ) -> std::result::Result<Response<proto::read_resource::Response>, Status> {
        let req = request.into_inner();
        debug!(type_name = %req.type_name, "ReadResource");

        let schemas = self.schemas().await;
        let schema = Self::resource_schema(&schemas, &req.type_name)?;
        let current_state =
            conform_to_schema(schema, decode_dynamic_value(req.current_state.as_ref())?);

        let ctx = self.context();
        let (resource, mut diagnostics) = self.resource(&ctx, &req.type_name).await?;
        if has_errors(&diagnostics) {
            return Ok(Response::new(proto::read_resource::Response {
                new_state: Some(encode_dynamic_value(&current_state)?),
                diagnostics: diagnostics_to_proto(&diagnostics),
                private: req.private,
            }));
        }

        let response = resource
            .read(
                ctx,
                ReadResourceRequest {
                    type_name: req.type_name,
                    current_state,
                    private: req.private,
                    provider_meta: req
                        .provider_meta
                        .as_ref()
                        .map(|meta| decode_dynamic_value(Some(meta)))
                        .transpose()?,
                    client_capabilities: client_capabilities_from_proto(
                        req.client_capabilities.as_ref(),
                    ),
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        // A missing object is reported as a null state, which removes it
        let new_state = match response.new_state {
            Some(state) => {
                let state = conform_to_schema(schema, state);
                diagnostics.extend(check_types(schema, &state));
                state
            }
            None => DynamicValue::null(),
        };

        Ok(Response::new(proto::read_resource::Response {
            new_state: Some(encode_dynamic_value(&new_state)?),
            diagnostics: diagnostics_to_proto(&diagnostics),
            private: response.private,
        }))
    }

    async fn plan_resource_change(
        &self,
        request: Request<proto::plan_resource_change::Request>,
    ) -> std::result::Result<Response<proto::plan_resource_change::Response>, Status> {
        let req = request.into_inner();
        debug!(type_name = %req.type_name, "PlanResourceChange");

        let schemas = self.schemas().await;
        let schema = Self::resource_schema(&schemas, &req.type_name)?;

        let prior_state = decode_dynamic_value(req.prior_state.as_ref())?;
        let proposed_new_state = decode_dynamic_value(req.proposed_new_state.as_ref())?;
        let config = decode_dynamic_value(req.config.as_ref())?;

        let plan = plan_change(schema, &prior_state, &proposed_new_state, &config);

        Ok(Response::new(proto::plan_resource_change::Response {
            planned_state: Some(encode_dynamic_value(&plan.planned_state)?),
            requires_replace: plan
                .requires_replace
                .iter()
                .map(attribute_path_to_proto)
                .collect(),
            planned_private: req.prior_private,
            diagnostics: diagnostics_to_proto(&plan.diagnostics),
            legacy_type_system: false,
        }))
    }

    async fn apply_resource_change(
        &self,
        request: Request<proto::apply_resource_change::Request>,
    ) -> std::result::Result<Response<proto::apply_resource_change::Response>, Status> {
        let req = request.into_inner();
        debug!(type_name = %req.type_name, "ApplyResourceChange");

        let schemas = self.schemas().await;
        let schema = Self::resource_schema(&schemas, &req.type_name)?;

        let prior_state = decode_dynamic_value(req.prior_state.as_ref())?;
        let planned_state = decode_dynamic_value(req.planned_state.as_ref())?;
        let config = decode_dynamic_value(req.config.as_ref())?;
        let provider_meta = req
            .provider_meta
            .as_ref()
            .map(|meta| decode_dynamic_value(Some(meta)))
            .transpose()?;

        let ctx = self.context();
        let (resource, mut diagnostics) = self.resource(&ctx, &req.type_name).await?;
        if has_errors(&diagnostics) {
            return Ok(Response::new(proto::apply_resource_change::Response {
                new_state: Some(encode_dynamic_value(&prior_state)?),
                private: vec![],
                diagnostics: diagnostics_to_proto(&diagnostics),
                legacy_type_system: false,
            }));
        }

        let (new_state, private) = if planned_state.is_null() {
            let response = resource
                .delete(
                    ctx,
                    DeleteResourceRequest {
                        type_name: req.type_name,
                        prior_state: prior_state.clone(),
                        planned_private: req.planned_private,
                        provider_meta,
                    },
                )
                .await;
            let failed = has_errors(&response.diagnostics);
            diagnostics.extend(response.diagnostics);

            if failed {
                (prior_state, vec![])
            } else {
                (DynamicValue::null(), vec![])
            }
        } else if prior_state.is_null() {
            let response = resource
                .create(
                    ctx,
                    CreateResourceRequest {
                        type_name: req.type_name,
                        planned_state,
                        config,
                        planned_private: req.planned_private,
                        provider_meta,
                    },
                )
                .await;
            let failed = has_errors(&response.diagnostics);
            diagnostics.extend(response.diagnostics);

            // A failed create only leaves state behind if the object was
            // fully created before the error
            if failed && (response.new_state.is_null() || !response.new_state.value.is_fully_known())
            {
                (DynamicValue::null(), vec![])
            } else {
                (conform_to_schema(schema, response.new_state), response.private)
            }
        } else {
            let response = resource
                .update(
                    ctx,
                    UpdateResourceRequest {
                        type_name: req.type_name,
                        prior_state: prior_state.clone(),
                        planned_state,
                        config,
                        planned_private: req.planned_private,
                        provider_meta,
                    },
                )
                .await;
            let failed = has_errors(&response.diagnostics);
            diagnostics.extend(response.diagnostics);

            if failed && (response.new_state.is_null() || !response.new_state.value.is_fully_known())
            {
                (prior_state, vec![])
            } else {
                (conform_to_schema(schema, response.new_state), response.private)
            }
        };

        if !has_errors(&diagnostics) {
            if !new_state.value.is_fully_known() {
                warn!("apply left unknown values in state");
                diagnostics.push(Diagnostic::error(
                    "Provider returned invalid result object after apply",
                    "After the apply operation, the provider still indicated an unknown value. \
                     All values must be known after apply, so this is always a bug in the provider.",
                ));
            }
            diagnostics.extend(check_types(schema, &new_state));
        }

        Ok(Response::new(proto::apply_resource_change::Response {
            new_state: Some(encode_dynamic_value(&new_state)?),
            private,
            diagnostics: diagnostics_to_proto(&diagnostics),
            legacy_type_system: false,
        }))
    }

    async fn import_resource_state(
        &self,
        request: Request<proto::import_resource_state::Request>,
    ) -> std::result::Result<Response<proto::import_resource_state::Response>, Status> {
        let req = request.into_inner();
        debug!(type_name = %req.type_name, id = %req.id, "ImportResourceState");

        let schemas = self.schemas().await;
        Self::resource_schema(&schemas, &req.type_name)?;

        let ctx = self.context();
        let (resource, mut diagnostics) = self.resource(&ctx, &req.type_name).await?;
        if has_errors(&diagnostics) {
            return Ok(Response::new(proto::import_resource_state::Response {
                imported_resources: vec![],
                diagnostics: diagnostics_to_proto(&diagnostics),
            }));
        }

        let response = resource
            .import_state(
                ctx,
                ImportResourceStateRequest {
                    type_name: req.type_name,
                    id: req.id,
                    client_capabilities: client_capabilities_from_proto(
                        req.client_capabilities.as_ref(),
                    ),
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        let mut imported_resources = Vec::with_capacity(response.imported_resources.len());
        for imported in response.imported_resources {
            let state = match schemas.resources.get(&imported.type_name) {
                Some(schema) => conform_to_schema(schema, imported.state),
                None => imported.state,
            };
            imported_resources.push(proto::import_resource_state::ImportedResource {
                type_name: imported.type_name,
                state: Some(encode_dynamic_value(&state)?),
                private: imported.private,
            });
        }

        Ok(Response::new(proto::import_resource_state::Response {
            imported_resources,
            diagnostics: diagnostics_to_proto(&diagnostics),
        }))
    }

    async fn stop_provider(
        &self,
        _request: Request<proto::stop_provider::Request>,
    ) -> std::result::Result<Response<proto::stop_provider::Response>, Status> {
        debug!("StopProvider");
        self.stop_tx.send_replace(true);

        let response = self
            .provider
            .read()
            .await
            .stop(Context::new(), StopProviderRequest)
            .await;

        Ok(Response::new(proto::stop_provider::Response {
            error: response.error.unwrap_or_default(),
        }))
    }
}

/// Result of planning a single resource change
pub(crate) struct PlannedChange {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Compute the planned state from Terraform's proposal
///
/// Computed attributes left null in configuration become unknown when the
/// resource is created or changes; attribute plan modifiers run afterwards.
pub(crate) fn plan_change(
    schema: &Schema,
    prior_state: &DynamicValue,
    proposed_new_state: &DynamicValue,
    config: &DynamicValue,
) -> PlannedChange {
    let mut diagnostics = vec![];
    let mut requires_replace = vec![];

    if proposed_new_state.is_null() {
        return PlannedChange {
            planned_state: DynamicValue::null(),
            requires_replace,
            diagnostics,
        };
    }

    let prior_state = conform_to_schema(schema, prior_state.clone());
    let mut planned_state = conform_to_schema(schema, proposed_new_state.clone());

    let changing = prior_state.is_null() || !values_equal(&prior_state.value, &planned_state.value);

    for attr in &schema.block.attributes {
        let path = AttributePath::new(&attr.name);
        let config_value = config.get_or_null(&path);

        if changing && attr.computed && config_value.is_null() {
            if let Err(e) = planned_state.mark_unknown(&path) {
                diagnostics.push(
                    Diagnostic::error("Failed to plan attribute", e.to_string())
                        .with_attribute(path.clone()),
                );
            }
        }

        let mut plan_value = DynamicValue::new(planned_state.get_or_null(&path));
        let state_value = DynamicValue::new(prior_state.get_or_null(&path));
        for modifier in &attr.plan_modifiers {
            let response = modifier.modify(PlanModifierRequest {
                config_value: DynamicValue::new(config_value.clone()),
                state_value: state_value.clone(),
                plan_value,
                path: path.clone(),
            });
            plan_value = response.plan_value;
            diagnostics.extend(response.diagnostics);
            if response.requires_replace && !requires_replace.contains(&path) {
                requires_replace.push(path.clone());
            }
        }

        if !attr.plan_modifiers.is_empty() {
            if let Err(e) = planned_state.set_dynamic(&path, plan_value.value) {
                diagnostics.push(
                    Diagnostic::error("Failed to plan attribute", e.to_string())
                        .with_attribute(path.clone()),
                );
            }
        }
    }

    PlannedChange {
        planned_state,
        requires_replace,
        diagnostics,
    }
}

/// Every schema attribute present, keys outside the schema dropped
pub(crate) fn conform_to_schema(schema: &Schema, value: DynamicValue) -> DynamicValue {
    match value.value {
        Dynamic::Map(mut values) => {
            let conformed = schema
                .block
                .attributes
                .iter()
                .map(|attr| {
                    let value = values.remove(&attr.name).unwrap_or(Dynamic::Null);
                    (attr.name.clone(), value)
                })
                .collect();
            DynamicValue::new(Dynamic::Map(conformed))
        }
        other => DynamicValue::new(other),
    }
}

/// Run the schema validators of every attribute against the configuration
pub(crate) fn validate_attributes(schema: &Schema, config: &DynamicValue) -> Vec<Diagnostic> {
    let mut diagnostics = vec![];

    for attr in &schema.block.attributes {
        if attr.validators.is_empty() {
            continue;
        }
        let path = AttributePath::new(&attr.name);
        let value = config.get_or_null(&path);
        for validator in &attr.validators {
            let response = validator.validate(ValidatorRequest {
                config_value: DynamicValue::new(value.clone()),
                path: path.clone(),
            });
            diagnostics.extend(response.diagnostics);
        }
    }

    diagnostics
}

/// Report attributes whose value does not match the declared type
fn check_types(schema: &Schema, state: &DynamicValue) -> Vec<Diagnostic> {
    schema
        .block
        .attributes
        .iter()
        .filter_map(|attr| {
            let path = AttributePath::new(&attr.name);
            let value = state.get_or_null(&path);
            if matches_type(&value, &attr.r#type) {
                None
            } else {
                Some(
                    Diagnostic::error(
                        "Provider produced invalid object",
                        format!(
                            "{} must be {}, got {}",
                            attr.name,
                            attr.r#type.to_type_json(),
                            value.type_name()
                        ),
                    )
                    .with_attribute(path),
                )
            }
        })
        .collect()
}

fn matches_type(value: &Dynamic, expected_type: &AttributeType) -> bool {
    match (value, expected_type) {
        (Dynamic::Null | Dynamic::Unknown, _) => true,
        (Dynamic::String(_), AttributeType::String) => true,
        (Dynamic::Number(_), AttributeType::Number) => true,
        (Dynamic::Bool(_), AttributeType::Bool) => true,
        (Dynamic::List(list), AttributeType::List(elem_type) | AttributeType::Set(elem_type)) => {
            list.iter().all(|elem| matches_type(elem, elem_type))
        }
        (Dynamic::Map(map), AttributeType::Map(elem_type)) => {
            map.values().all(|elem| matches_type(elem, elem_type))
        }
        (Dynamic::Map(map), AttributeType::Object(attrs)) => map
            .iter()
            .all(|(name, value)| attrs.get(name).is_some_and(|ty| matches_type(value, ty))),
        _ => false,
    }
}

#[allow(clippy::result_large_err)]
fn decode_dynamic_value(
    value: Option<&proto::DynamicValue>,
) -> std::result::Result<DynamicValue, Status> {
    let Some(value) = value else {
        return Ok(DynamicValue::null());
    };

    if !value.msgpack.is_empty() {
        DynamicValue::decode_msgpack(&value.msgpack)
            .map_err(|e| Status::invalid_argument(e.to_string()))
    } else if !value.json.is_empty() {
        DynamicValue::decode_json(&value.json).map_err(|e| Status::invalid_argument(e.to_string()))
    } else {
        Ok(DynamicValue::null())
    }
}

#[allow(clippy::result_large_err)]
fn encode_dynamic_value(value: &DynamicValue) -> std::result::Result<proto::DynamicValue, Status> {
    let msgpack = value
        .encode_msgpack()
        .map_err(|e| Status::internal(e.to_string()))?;

    Ok(proto::DynamicValue {
        msgpack,
        json: vec![],
    })
}

fn severity_to_proto(severity: DiagnosticSeverity) -> i32 {
    let severity = match severity {
        DiagnosticSeverity::Invalid => proto::diagnostic::Severity::Invalid,
        DiagnosticSeverity::Error => proto::diagnostic::Severity::Error,
        DiagnosticSeverity::Warning => proto::diagnostic::Severity::Warning,
    };
    severity as i32
}

fn diagnostics_to_proto(diagnostics: &[Diagnostic]) -> Vec<proto::Diagnostic> {
    diagnostics
        .iter()
        .map(|diag| proto::Diagnostic {
            severity: severity_to_proto(diag.severity),
            summary: diag.summary.clone(),
            detail: diag.detail.clone(),
            attribute: diag.attribute.as_ref().map(attribute_path_to_proto),
        })
        .collect()
}

fn attribute_path_to_proto(path: &AttributePath) -> proto::AttributePath {
    use proto::attribute_path::{step::Selector, Step};

    proto::AttributePath {
        steps: path
            .steps
            .iter()
            .map(|step| Step {
                selector: Some(match step {
                    AttributePathStep::AttributeName(name) => Selector::AttributeName(name.clone()),
                    AttributePathStep::ElementKeyString(key) => {
                        Selector::ElementKeyString(key.clone())
                    }
                    AttributePathStep::ElementKeyInt(idx) => Selector::ElementKeyInt(*idx),
                }),
            })
            .collect(),
    }
}

fn string_kind_to_proto(kind: StringKind) -> i32 {
    match kind {
        StringKind::Plain => proto::StringKind::Plain as i32,
        StringKind::Markdown => proto::StringKind::Markdown as i32,
    }
}

fn attribute_to_proto(attr: &Attribute) -> proto::schema::Attribute {
    proto::schema::Attribute {
        name: attr.name.clone(),
        r#type: attr.r#type.to_bytes(),
        nested_type: None,
        description: attr.description.clone(),
        required: attr.required,
        optional: attr.optional,
        computed: attr.computed,
        sensitive: attr.sensitive,
        description_kind: string_kind_to_proto(attr.description_kind),
        deprecated: attr.deprecated,
        write_only: false,
    }
}

fn schema_to_proto(schema: &Schema) -> proto::Schema {
    proto::Schema {
        version: schema.version,
        block: Some(proto::schema::Block {
            version: schema.block.version,
            attributes: schema.block.attributes.iter().map(attribute_to_proto).collect(),
            block_types: vec![],
            description: schema.block.description.clone(),
            description_kind: string_kind_to_proto(schema.block.description_kind),
            deprecated: schema.block.deprecated,
        }),
    }
}

fn server_capabilities_to_proto(
    capabilities: &crate::types::ServerCapabilities,
) -> proto::ServerCapabilities {
    proto::ServerCapabilities {
        plan_destroy: capabilities.plan_destroy,
        get_provider_schema_optional: capabilities.get_provider_schema_optional,
        move_resource_state: capabilities.move_resource_state,
    }
}

fn client_capabilities_from_proto(
    capabilities: Option<&proto::ClientCapabilities>,
) -> ClientCapabilities {
    capabilities
        .map(|c| ClientCapabilities {
            deferral_allowed: c.deferral_allowed,
            write_only_attributes_allowed: c.write_only_attributes_allowed,
        })
        .unwrap_or_default()
}
