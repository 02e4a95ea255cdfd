//! Terraform provider for Infoblox NIOS DNS and IPAM
//!
//! Every managed object type is described by a static table (see
//! [`resources::descriptor`]) and served by one generic resource and one
//! generic list data source. Extensible attributes inherited from parent
//! objects are kept out of the user-owned `extattrs` map and reported in
//! `extattrs_all`.

pub mod api;
pub mod config;
pub mod data_sources;
pub mod logging;
pub mod provider_data;
pub mod resources;
pub mod utils;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::DataSourceWithConfigure;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetaSchemaRequest, ProviderMetaSchemaResponse, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse, ResourceFactory,
    StopProviderRequest, StopProviderResponse, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::resource::ResourceWithConfigure;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{Diagnostic, ServerCapabilities};
use tfplug::validator::{validate_config, NumberRangeValidator};

pub use config::ProviderConfig;
pub use provider_data::NiosProviderData;

use data_sources::ObjectListDataSource;
use resources::{DescriptorResource, IpAssociationResource};

#[derive(Default)]
pub struct NiosProvider {
    provider_data: Option<Arc<NiosProviderData>>,
}

impl NiosProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider_data(&self) -> Option<&Arc<NiosProviderData>> {
        self.provider_data.as_ref()
    }

    fn build_schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Infoblox NIOS provider")
            .attribute(
                AttributeBuilder::new("nios_host_url", AttributeType::String)
                    .description("Grid master URL, e.g. https://gm.example.com. Env: NIOS_HOST_URL")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("nios_username", AttributeType::String)
                    .description("WAPI user name. Env: NIOS_USERNAME")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("nios_password", AttributeType::String)
                    .description("WAPI password. Env: NIOS_PASSWORD")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("wapi_version", AttributeType::String)
                    .description("WAPI version, defaults to 2.13.6. Env: NIOS_WAPI_VERSION")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("insecure", AttributeType::Bool)
                    .description("Skip TLS certificate verification. Env: NIOS_INSECURE")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("timeout_seconds", AttributeType::Number)
                    .description("Per request timeout in seconds, defaults to 60")
                    .optional()
                    .validator(Arc::new(NumberRangeValidator {
                        min: Some(1.0),
                        max: None,
                    }))
                    .build(),
            )
            .build()
    }
}

#[async_trait]
impl Provider for NiosProvider {
    fn type_name(&self) -> &str {
        "nios"
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
        ProviderSchemaResponse {
            schema: Self::build_schema(),
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
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        logging::init();
        tracing::debug!("Configuring nios provider for Terraform {}", request.terraform_version);

        let config = match ProviderConfig::from_dynamic(&request.config) {
            Ok(config) => config,
            Err(diagnostics) => {
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        };

        match api::Client::new(config.client_config()) {
            Ok(client) => {
                tracing::info!("Using WAPI at {}", client.base_url());
                let data = Arc::new(NiosProviderData::new(client));
                self.provider_data = Some(data.clone());
                ConfigureProviderResponse {
                    diagnostics: vec![],
                    provider_data: Some(data as Arc<dyn std::any::Any + Send + Sync>),
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

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: validate_config(&Self::build_schema(), &request.config),
        }
    }

    async fn stop(&self, _ctx: Context, _request: StopProviderRequest) -> StopProviderResponse {
        StopProviderResponse { error: None }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        for desc in resources::descriptors() {
            factories.insert(
                desc.type_name.to_string(),
                Box::new(move || {
                    Box::new(DescriptorResource::new(desc)) as Box<dyn ResourceWithConfigure>
                }),
            );
        }
        factories.insert(
            "nios_ip_association".to_string(),
            Box::new(|| Box::new(IpAssociationResource::new()) as Box<dyn ResourceWithConfigure>),
        );
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories: HashMap<String, DataSourceFactory> = HashMap::new();
        for desc in resources::descriptors() {
            factories.insert(
                desc.type_name.to_string(),
                Box::new(move || {
                    Box::new(ObjectListDataSource::new(desc)) as Box<dyn DataSourceWithConfigure>
                }),
            );
        }
        factories
    }
}
