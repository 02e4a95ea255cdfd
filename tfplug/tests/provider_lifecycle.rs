//! End-to-end exercise of the provider traits with an in-memory backend

#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use tfplug::context::{Context, ContextError};
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::defaults::StaticDefault;
use tfplug::plan::plan_resource_change;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetaSchemaRequest, ProviderMetaSchemaResponse, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse, ResourceFactory,
    StopProviderRequest, StopProviderResponse, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource, ModifyPlanRequest,
    ModifyPlanResponse, ReadResourceRequest, ReadResourceResponse, Resource,
    ResourceMetadataRequest, ResourceMetadataResponse, ResourceSchemaRequest,
    ResourceSchemaResponse, ResourceWithConfigure, ResourceWithImportState,
    ResourceWithModifyPlan, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{
    AttributePath, ClientCapabilities, Diagnostic, Dynamic, DynamicValue, ServerCapabilities,
};
use tfplug::validator::{validate_config, OneOfValidator};

type Store = Arc<RwLock<HashMap<String, String>>>;

struct KvProvider {
    store: Store,
    creates: Arc<AtomicUsize>,
}

impl KvProvider {
    fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
            creates: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Provider for KvProvider {
    fn type_name(&self) -> &str {
        "kv"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: "kv".to_string(),
            server_capabilities: ServerCapabilities::default(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: SchemaBuilder::new().build(),
            diagnostics: vec![],
        }
    }

    async fn meta_schema(
        &self,
        _ctx: Context,
        _request: ProviderMetaSchemaRequest,
    ) -> ProviderMetaSchemaResponse {
        ProviderMetaSchemaResponse {
            schema: None,
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        _request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(self.store.clone() as Arc<dyn std::any::Any + Send + Sync>),
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

    async fn stop(&self, _ctx: Context, _request: StopProviderRequest) -> StopProviderResponse {
        StopProviderResponse { error: None }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let creates = self.creates.clone();
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            "kv_entry".to_string(),
            Box::new(move || {
                Box::new(EntryResource {
                    store: None,
                    creates: creates.clone(),
                }) as Box<dyn ResourceWithConfigure>
            }),
        );
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories: HashMap<String, DataSourceFactory> = HashMap::new();
        factories.insert(
            "kv_entries".to_string(),
            Box::new(|| Box::new(EntriesDataSource { store: None }) as Box<dyn DataSourceWithConfigure>),
        );
        factories
    }
}

struct EntryResource {
    store: Option<Store>,
    creates: Arc<AtomicUsize>,
}

fn entry_schema() -> Schema {
    SchemaBuilder::new()
        .attribute(
            AttributeBuilder::new("key", AttributeType::String)
                .required()
                .plan_modifier(Arc::new(RequiresReplace))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("value", AttributeType::String)
                .optional()
                .computed()
                .default(StaticDefault::string("empty"))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("kind", AttributeType::String)
                .optional()
                .validator(Arc::new(OneOfValidator::new(&["plain", "secret"])))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .computed()
                .plan_modifier(Arc::new(UseStateForUnknown))
                .build(),
        )
        .build()
}

fn entry_state(key: &str, value: &str) -> DynamicValue {
    let mut state = DynamicValue::object();
    state.set_string(&AttributePath::new("key"), key.to_string()).unwrap();
    state
        .set_string(&AttributePath::new("value"), value.to_string())
        .unwrap();
    state.set_string(&AttributePath::new("id"), format!("kv/{}", key)).unwrap();
    state
}

impl EntryResource {
    fn store(&self) -> Result<&Store, Diagnostic> {
        self.store
            .as_ref()
            .ok_or_else(|| Diagnostic::error("Unconfigured", "provider data missing"))
    }
}

#[async_trait]
impl Resource for EntryResource {
    fn type_name(&self) -> &str {
        "kv_entry"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: "kv_entry".to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: entry_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: validate_config(&entry_schema(), &request.config),
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        self.creates.fetch_add(1, Ordering::SeqCst);
        let store = match self.store() {
            Ok(s) => s,
            Err(d) => {
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    diagnostics: vec![d],
                }
            }
        };
        let key = request.planned_state.get_string(&AttributePath::new("key")).unwrap();
        let value = request
            .planned_state
            .get_string(&AttributePath::new("value"))
            .unwrap();

        let write = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            store.write().await.insert(key.clone(), value.clone());
        };
        if let Err(e) = ctx.run(write).await {
            return CreateResourceResponse {
                new_state: DynamicValue::null(),
                diagnostics: vec![Diagnostic::error("Create interrupted", e.to_string())],
            };
        }

        CreateResourceResponse {
            new_state: entry_state(&key, &value),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let key = request.current_state.get_string(&AttributePath::new("key")).unwrap();
        let store = self.store().unwrap().read().await;
        ReadResourceResponse {
            new_state: store.get(&key).map(|v| entry_state(&key, v)),
            diagnostics: vec![],
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let key = request.planned_state.get_string(&AttributePath::new("key")).unwrap();
        let value = request
            .planned_state
            .get_string(&AttributePath::new("value"))
            .unwrap();
        self.store().unwrap().write().await.insert(key.clone(), value.clone());
        UpdateResourceResponse {
            new_state: entry_state(&key, &value),
            diagnostics: vec![],
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let key = request.prior_state.get_string(&AttributePath::new("key")).unwrap();
        self.store().unwrap().write().await.remove(&key);
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }

    fn as_modify_plan(&self) -> Option<&dyn ResourceWithModifyPlan> {
        Some(self)
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for EntryResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match request.provider_data.and_then(|d| d.downcast::<RwLock<HashMap<String, String>>>().ok()) {
            Some(store) => self.store = Some(store),
            None => diagnostics.push(Diagnostic::error("Invalid provider data", "expected store")),
        }
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithModifyPlan for EntryResource {
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        let planned = plan_resource_change(
            &entry_schema(),
            &request.config,
            &request.prior_state,
            &request.proposed_new_state,
        );
        ModifyPlanResponse {
            planned_state: planned.planned_state,
            requires_replace: planned.requires_replace,
            diagnostics: planned.diagnostics,
        }
    }
}

#[async_trait]
impl ResourceWithImportState for EntryResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut state = DynamicValue::object();
        match state.set_string(&AttributePath::new("key"), request.id.clone()) {
            Ok(()) => ImportResourceStateResponse {
                imported_resources: vec![ImportedResource {
                    type_name: request.type_name,
                    state,
                }],
                diagnostics: vec![],
            },
            Err(e) => ImportResourceStateResponse {
                imported_resources: vec![],
                diagnostics: vec![Diagnostic::error("Failed to set import ID", e.to_string())],
            },
        }
    }
}

struct EntriesDataSource {
    store: Option<Store>,
}

#[async_trait]
impl DataSource for EntriesDataSource {
    fn type_name(&self) -> &str {
        "kv_entries"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: "kv_entries".to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(
                    AttributeBuilder::new("keys", AttributeType::List(Box::new(AttributeType::String)))
                        .computed()
                        .build(),
                )
                .build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, _request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let mut keys: Vec<String> = match &self.store {
            Some(store) => store.read().await.keys().cloned().collect(),
            None => vec![],
        };
        keys.sort();
        let mut state = DynamicValue::object();
        state
            .set_list(
                &AttributePath::new("keys"),
                keys.into_iter().map(Dynamic::String).collect(),
            )
            .unwrap();
        ReadDataSourceResponse {
            state,
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for EntriesDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        self.store = request
            .provider_data
            .and_then(|d| d.downcast::<RwLock<HashMap<String, String>>>().ok());
        ConfigureDataSourceResponse {
            diagnostics: vec![],
        }
    }
}

async fn configured_resource(provider: &mut KvProvider) -> Box<dyn ResourceWithConfigure> {
    let configured = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                terraform_version: "1.9.0".to_string(),
                config: DynamicValue::object(),
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    let factories = provider.resources();
    let mut resource = factories.get("kv_entry").unwrap()();
    let response = resource
        .configure(
            Context::new(),
            ConfigureResourceRequest {
                provider_data: configured.provider_data,
            },
        )
        .await;
    assert!(response.diagnostics.is_empty());
    resource
}

#[tokio::test]
async fn full_lifecycle_through_factories() {
    let mut provider = KvProvider::new();
    let resource = configured_resource(&mut provider).await;

    let mut config = DynamicValue::object();
    config.set_string(&AttributePath::new("key"), "a".to_string()).unwrap();

    let plan = resource
        .as_modify_plan()
        .unwrap()
        .modify_plan(
            Context::new(),
            ModifyPlanRequest {
                type_name: "kv_entry".to_string(),
                config: config.clone(),
                prior_state: DynamicValue::null(),
                proposed_new_state: config.clone(),
                provider_meta: None,
            },
        )
        .await;
    assert_eq!(
        plan.planned_state.get_string(&AttributePath::new("value")).unwrap(),
        "empty"
    );

    let created = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "kv_entry".to_string(),
                planned_state: plan.planned_state,
                config,
                provider_meta: None,
            },
        )
        .await;
    assert!(created.diagnostics.is_empty());

    resource
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "kv_entry".to_string(),
                prior_state: created.new_state.clone(),
                provider_meta: None,
            },
        )
        .await;

    let read = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "kv_entry".to_string(),
                current_state: created.new_state,
                provider_meta: None,
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    assert!(read.new_state.is_none());
}

#[tokio::test]
async fn invalid_config_is_reported() {
    let mut provider = KvProvider::new();
    let resource = configured_resource(&mut provider).await;

    let mut config = DynamicValue::object();
    config.set_string(&AttributePath::new("key"), "a".to_string()).unwrap();
    config.set_string(&AttributePath::new("kind"), "weird".to_string()).unwrap();

    let response = resource
        .validate(
            Context::new(),
            ValidateResourceConfigRequest {
                type_name: "kv_entry".to_string(),
                config,
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    assert_eq!(response.diagnostics.len(), 1);
}

#[tokio::test]
async fn import_sets_key() {
    let mut provider = KvProvider::new();
    let resource = configured_resource(&mut provider).await;

    let response = resource
        .as_import_state()
        .unwrap()
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: "kv_entry".to_string(),
                id: "imported".to_string(),
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    assert_eq!(
        response.imported_resources[0]
            .state
            .get_string(&AttributePath::new("key"))
            .unwrap(),
        "imported"
    );
}

#[tokio::test]
async fn concurrent_creates_share_store() {
    let mut provider = KvProvider::new();
    let resource: Arc<Box<dyn ResourceWithConfigure>> =
        Arc::new(configured_resource(&mut provider).await);

    let mut handles = vec![];
    for i in 0..8 {
        let resource = resource.clone();
        handles.push(tokio::spawn(async move {
            resource
                .create(
                    Context::new(),
                    CreateResourceRequest {
                        type_name: "kv_entry".to_string(),
                        planned_state: entry_state(&format!("k{}", i), "v"),
                        config: DynamicValue::object(),
                        provider_meta: None,
                    },
                )
                .await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().diagnostics.is_empty());
    }

    assert_eq!(provider.creates.load(Ordering::SeqCst), 8);
    assert_eq!(provider.store.read().await.len(), 8);

    let factories = provider.data_sources();
    let mut data_source = factories.get("kv_entries").unwrap()();
    data_source
        .configure(
            Context::new(),
            ConfigureDataSourceRequest {
                provider_data: Some(provider.store.clone() as Arc<dyn std::any::Any + Send + Sync>),
            },
        )
        .await;
    let read = data_source
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "kv_entries".to_string(),
                config: DynamicValue::object(),
                provider_meta: None,
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    assert_eq!(read.state.get_list(&AttributePath::new("keys")).unwrap().len(), 8);
}

#[tokio::test]
async fn expired_context_aborts_create() {
    let mut provider = KvProvider::new();
    let resource = configured_resource(&mut provider).await;

    let ctx = Context::new();
    ctx.cancel();
    assert_eq!(ctx.run(async {}).await, Err(ContextError::Cancelled));

    let response = resource
        .create(
            ctx,
            CreateResourceRequest {
                type_name: "kv_entry".to_string(),
                planned_state: entry_state("late", "v"),
                config: DynamicValue::object(),
                provider_meta: None,
            },
        )
        .await;
    assert_eq!(response.diagnostics.len(), 1);
    assert!(provider.store.read().await.is_empty());
}
