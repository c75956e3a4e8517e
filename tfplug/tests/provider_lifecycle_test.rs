//! Drives a small in-memory provider through the gRPC service the way
//! Terraform does: schema, validate, configure, plan, apply, read, import, stop.

#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tfplug::context::Context;
use tfplug::grpc::GrpcProviderServer;
use tfplug::import::import_state_passthrough_id;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::proto::{self, provider_server::Provider as _};
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, Provider, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse, ResourceFactory,
    StopProviderRequest, StopProviderResponse, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue, ServerCapabilities};
use tfplug::validator::{CidrValidator, ListElementsValidator};
use tonic::Request;

/// Objects "stored remotely", keyed by id
#[derive(Default)]
struct Store {
    items: Mutex<HashMap<String, (String, Vec<String>)>>,
    next_id: AtomicU64,
}

struct StoreProvider {
    store: Arc<Store>,
}

#[async_trait]
impl Provider for StoreProvider {
    fn type_name(&self) -> &str {
        "store"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: "store".to_string(),
            server_capabilities: ServerCapabilities::default(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(
                    AttributeBuilder::new("region", AttributeType::String)
                        .optional()
                        .build(),
                )
                .build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let mut diagnostics = vec![];
        if request
            .config
            .get_string(&AttributePath::new("region"))
            .is_ok_and(|r| r == "nowhere")
        {
            diagnostics.push(Diagnostic::error("Unknown region", "nowhere"));
        }

        ConfigureProviderResponse {
            diagnostics,
            provider_data: Some(self.store.clone()),
        }
    }

    async fn stop(&self, _ctx: Context, _request: StopProviderRequest) -> StopProviderResponse {
        StopProviderResponse { error: None }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            "store_item".to_string(),
            Box::new(|| Box::new(ItemResource::default()) as Box<dyn ResourceWithConfigure>),
        );
        factories
    }
}

#[derive(Default)]
struct ItemResource {
    store: Option<Arc<Store>>,
}

impl ItemResource {
    fn state_for(id: &str, name: &str, cidrs: &[String]) -> DynamicValue {
        let mut state = DynamicValue::empty_object();
        state
            .set_string(&AttributePath::new("id"), id.to_string())
            .unwrap();
        state
            .set_string(&AttributePath::new("name"), name.to_string())
            .unwrap();
        if cidrs.is_empty() {
            state.set_null(&AttributePath::new("cidrs")).unwrap();
        } else {
            state
                .set_string_list(&AttributePath::new("cidrs"), cidrs.to_vec())
                .unwrap();
        }
        state
    }
}

#[async_trait]
impl Resource for ItemResource {
    fn type_name(&self) -> &str {
        "store_item"
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
        ResourceSchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(
                    AttributeBuilder::new("id", AttributeType::String)
                        .computed()
                        .plan_modifier(Box::new(UseStateForUnknown))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("name", AttributeType::String)
                        .required()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new(
                        "cidrs",
                        AttributeType::List(Box::new(AttributeType::String)),
                    )
                    .optional()
                    .validator(Box::new(ListElementsValidator::new(Box::new(CidrValidator))))
                    .build(),
                )
                .build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];
        if request
            .config
            .get_string(&AttributePath::new("name"))
            .is_ok_and(|n| n.is_empty())
        {
            diagnostics.push(
                Diagnostic::error("Empty name", "name must not be empty")
                    .with_attribute(AttributePath::new("name")),
            );
        }
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let Some(store) = &self.store else {
            return CreateResourceResponse {
                new_state: DynamicValue::null(),
                private: vec![],
                diagnostics: vec![Diagnostic::error(
                    "Provider not configured",
                    "The provider must be configured before managing items",
                )],
            };
        };

        let name = request
            .config
            .get_string(&AttributePath::new("name"))
            .unwrap();
        if name == "slow" {
            tokio::select! {
                _ = ctx.cancelled() => {
                    return CreateResourceResponse {
                        new_state: DynamicValue::null(),
                        private: vec![],
                        diagnostics: vec![Diagnostic::error("Create cancelled", "provider stopping")],
                    };
                }
                _ = tokio::time::sleep(Duration::from_secs(30)) => {}
            }
        }

        let cidrs = request
            .config
            .get_string_list(&AttributePath::new("cidrs"))
            .unwrap_or_default();
        let id = (store.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string();
        store
            .items
            .lock()
            .unwrap()
            .insert(id.clone(), (name.clone(), cidrs.clone()));

        CreateResourceResponse {
            new_state: Self::state_for(&id, &name, &cidrs),
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let store = self.store.as_ref().unwrap();
        let id = request
            .current_state
            .get_string(&AttributePath::new("id"))
            .unwrap();

        let new_state = store
            .items
            .lock()
            .unwrap()
            .get(&id)
            .map(|(name, cidrs)| Self::state_for(&id, name, cidrs));

        ReadResourceResponse {
            new_state,
            diagnostics: vec![],
            private: request.private,
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        UpdateResourceResponse {
            new_state: request.planned_state,
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        let store = self.store.as_ref().unwrap();
        let id = request
            .prior_state
            .get_string(&AttributePath::new("id"))
            .unwrap();
        store.items.lock().unwrap().remove(&id);

        DeleteResourceResponse {
            diagnostics: vec![],
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
        import_state_passthrough_id(&ctx, AttributePath::new("id"), &request, &mut response);
        response
    }
}

#[async_trait]
impl ResourceWithConfigure for ItemResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        if let Some(data) = request.provider_data {
            match data.downcast::<Store>() {
                Ok(store) => self.store = Some(store),
                Err(_) => diagnostics.push(Diagnostic::error(
                    "Invalid provider data",
                    "Expected the item store",
                )),
            }
        }

        ConfigureResourceResponse { diagnostics }
    }
}

fn server() -> (GrpcProviderServer<StoreProvider>, Arc<Store>) {
    let store = Arc::new(Store::default());
    let provider = StoreProvider {
        store: store.clone(),
    };
    (GrpcProviderServer::new(provider), store)
}

fn object(pairs: &[(&str, Dynamic)]) -> DynamicValue {
    DynamicValue::new(Dynamic::Map(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    ))
}

fn string(s: &str) -> Dynamic {
    Dynamic::String(s.to_string())
}

fn encode(value: &DynamicValue) -> Option<proto::DynamicValue> {
    Some(proto::DynamicValue {
        msgpack: value.encode_msgpack().unwrap(),
        json: vec![],
    })
}

fn decode(value: Option<proto::DynamicValue>) -> DynamicValue {
    DynamicValue::decode_msgpack(&value.unwrap().msgpack).unwrap()
}

fn error_summaries(diagnostics: &[proto::Diagnostic]) -> Vec<String> {
    diagnostics
        .iter()
        .filter(|d| d.severity == proto::diagnostic::Severity::Error as i32)
        .map(|d| d.summary.clone())
        .collect()
}

async fn configure(server: &GrpcProviderServer<StoreProvider>, region: &str) -> Vec<String> {
    let response = server
        .configure_provider(Request::new(proto::configure_provider::Request {
            terraform_version: "1.9.0".to_string(),
            config: encode(&object(&[("region", string(region))])),
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();
    error_summaries(&response.diagnostics)
}

async fn apply(
    server: &GrpcProviderServer<StoreProvider>,
    prior: &DynamicValue,
    planned: &DynamicValue,
    config: &DynamicValue,
) -> proto::apply_resource_change::Response {
    server
        .apply_resource_change(Request::new(proto::apply_resource_change::Request {
            type_name: "store_item".to_string(),
            prior_state: encode(prior),
            planned_state: encode(planned),
            config: encode(config),
            planned_private: vec![],
            provider_meta: None,
        }))
        .await
        .unwrap()
        .into_inner()
}

async fn plan(
    server: &GrpcProviderServer<StoreProvider>,
    prior: &DynamicValue,
    config: &DynamicValue,
) -> proto::plan_resource_change::Response {
    server
        .plan_resource_change(Request::new(proto::plan_resource_change::Request {
            type_name: "store_item".to_string(),
            prior_state: encode(prior),
            proposed_new_state: encode(config),
            config: encode(config),
            prior_private: vec![],
            provider_meta: None,
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner()
}

#[tokio::test]
async fn metadata_and_schema_describe_resources() {
    let (server, _) = server();

    let metadata = server
        .get_metadata(Request::new(proto::get_metadata::Request {}))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(metadata.resources.len(), 1);
    assert_eq!(metadata.resources[0].type_name, "store_item");

    let schema = server
        .get_provider_schema(Request::new(proto::get_provider_schema::Request {}))
        .await
        .unwrap()
        .into_inner();
    assert!(schema.diagnostics.is_empty());
    assert!(schema.provider.is_some());

    let item = schema.resource_schemas.get("store_item").unwrap();
    let block = item.block.as_ref().unwrap();
    let cidrs = block.attributes.iter().find(|a| a.name == "cidrs").unwrap();
    assert_eq!(cidrs.r#type, br#"["list","string"]"#.to_vec());
    let id = block.attributes.iter().find(|a| a.name == "id").unwrap();
    assert!(id.computed && !id.optional);
}

#[tokio::test]
async fn validation_runs_schema_and_resource_checks() {
    let (server, _) = server();

    let config = object(&[
        ("name", string("")),
        ("cidrs", Dynamic::List(vec![string("10.0.0.0/8"), string("10.0.0.1")])),
    ]);
    let response = server
        .validate_resource_config(Request::new(proto::validate_resource_config::Request {
            type_name: "store_item".to_string(),
            config: encode(&config),
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();

    let errors = error_summaries(&response.diagnostics);
    assert_eq!(errors.len(), 2, "{:?}", errors);
    assert!(errors.iter().any(|e| e.contains("Invalid CIDR")));
    assert!(errors.iter().any(|e| e == "Empty name"));
}

#[tokio::test]
async fn create_read_delete_lifecycle() {
    let (server, store) = server();
    assert!(configure(&server, "local").await.is_empty());

    let config = object(&[("name", string("web")), ("cidrs", Dynamic::Null)]);

    let planned = plan(&server, &DynamicValue::null(), &config).await;
    assert!(planned.diagnostics.is_empty());
    let planned_state = decode(planned.planned_state);
    assert!(planned_state
        .get(&AttributePath::new("id"))
        .unwrap()
        .is_unknown());

    let applied = apply(&server, &DynamicValue::null(), &planned_state, &config).await;
    assert!(applied.diagnostics.is_empty(), "{:?}", applied.diagnostics);
    let state = decode(applied.new_state);
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "1");
    assert_eq!(store.items.lock().unwrap().len(), 1);

    // Refresh with no changes keeps the id and plans no replacement
    let replanned = plan(&server, &state, &state).await;
    assert!(replanned.requires_replace.is_empty());
    assert_eq!(decode(replanned.planned_state), state);

    let read = server
        .read_resource(Request::new(proto::read_resource::Request {
            type_name: "store_item".to_string(),
            current_state: encode(&state),
            private: vec![],
            provider_meta: None,
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(decode(read.new_state), state);

    let deleted = apply(&server, &state, &DynamicValue::null(), &DynamicValue::null()).await;
    assert!(deleted.diagnostics.is_empty());
    assert!(decode(deleted.new_state).is_null());
    assert!(store.items.lock().unwrap().is_empty());
}

#[tokio::test]
async fn read_of_missing_object_returns_null_state() {
    let (server, _) = server();
    configure(&server, "local").await;

    let state = object(&[
        ("id", string("99")),
        ("name", string("gone")),
        ("cidrs", Dynamic::Null),
    ]);
    let read = server
        .read_resource(Request::new(proto::read_resource::Request {
            type_name: "store_item".to_string(),
            current_state: encode(&state),
            private: vec![],
            provider_meta: None,
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();

    assert!(read.diagnostics.is_empty());
    assert!(decode(read.new_state).is_null());
}

#[tokio::test]
async fn apply_before_configure_reports_diagnostic() {
    let (server, store) = server();

    let config = object(&[("name", string("web"))]);
    let applied = apply(&server, &DynamicValue::null(), &config, &config).await;

    assert_eq!(
        error_summaries(&applied.diagnostics),
        vec!["Provider not configured".to_string()]
    );
    assert!(decode(applied.new_state).is_null());
    assert!(store.items.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failed_configure_keeps_provider_unconfigured() {
    let (server, _) = server();
    assert_eq!(configure(&server, "nowhere").await, vec!["Unknown region"]);

    let config = object(&[("name", string("web"))]);
    let applied = apply(&server, &DynamicValue::null(), &config, &config).await;
    assert_eq!(
        error_summaries(&applied.diagnostics),
        vec!["Provider not configured".to_string()]
    );
}

#[tokio::test]
async fn import_passes_id_through() {
    let (server, _) = server();
    configure(&server, "local").await;

    let response = server
        .import_resource_state(Request::new(proto::import_resource_state::Request {
            type_name: "store_item".to_string(),
            id: "42".to_string(),
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();

    assert!(response.diagnostics.is_empty());
    assert_eq!(response.imported_resources.len(), 1);
    let state = decode(response.imported_resources[0].state.clone());
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "42");
    // Conformed to the schema for msgpack decoding on the Terraform side
    assert_eq!(state.get_or_null(&AttributePath::new("name")), Dynamic::Null);
}

#[tokio::test]
async fn upgrade_resource_state_decodes_json_state() {
    let (server, _) = server();

    let response = server
        .upgrade_resource_state(Request::new(proto::upgrade_resource_state::Request {
            type_name: "store_item".to_string(),
            version: 0,
            raw_state: Some(proto::RawState {
                json: br#"{"id":"3","name":"db","obsolete":true}"#.to_vec(),
                flatmap: HashMap::new(),
            }),
        }))
        .await
        .unwrap()
        .into_inner();

    assert!(response.diagnostics.is_empty());
    let state = decode(response.upgraded_state);
    assert_eq!(state.get_string(&AttributePath::new("name")).unwrap(), "db");
    assert!(state.get(&AttributePath::new("obsolete")).is_err());

    let newer = server
        .upgrade_resource_state(Request::new(proto::upgrade_resource_state::Request {
            type_name: "store_item".to_string(),
            version: 3,
            raw_state: Some(proto::RawState {
                json: br#"{"id":"3"}"#.to_vec(),
                flatmap: HashMap::new(),
            }),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(error_summaries(&newer.diagnostics).len(), 1);
}

#[tokio::test]
async fn unknown_resource_type_is_an_error() {
    let (server, _) = server();

    let result = server
        .read_resource(Request::new(proto::read_resource::Request {
            type_name: "store_missing".to_string(),
            current_state: None,
            private: vec![],
            provider_meta: None,
            client_capabilities: None,
        }))
        .await;

    assert!(result.unwrap_err().message().contains("store_missing"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_provider_cancels_in_flight_operations() {
    let (server, _) = server();
    let server = Arc::new(server);
    configure(&server, "local").await;

    let config = object(&[("name", string("slow")), ("cidrs", Dynamic::Null)]);
    let apply_task = {
        let server = server.clone();
        let config = config.clone();
        tokio::spawn(async move { apply(&server, &DynamicValue::null(), &config, &config).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    let stopped = server
        .stop_provider(Request::new(proto::stop_provider::Request {}))
        .await
        .unwrap()
        .into_inner();
    assert!(stopped.error.is_empty());

    let applied = tokio::time::timeout(Duration::from_secs(5), apply_task)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        error_summaries(&applied.diagnostics),
        vec!["Create cancelled".to_string()]
    );
}
