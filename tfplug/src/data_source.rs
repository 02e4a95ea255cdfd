//! Read-only data sources
//!
//! A data source only has to provide its schema and `read`. Metadata comes
//! from [`DataSource::type_name`] and validation checks the config against
//! the schema unless an implementation needs more.

use crate::context::Context;
use crate::schema::Schema;
use crate::types::{ClientCapabilities, Diagnostic, DynamicValue};
use crate::validator::validate_config;
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

#[async_trait]
pub trait DataSource: Send + Sync {
    /// Must match the key used in `Provider::data_sources`
    fn type_name(&self) -> &str;

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        ctx: Context,
        request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse;

    async fn validate(
        &self,
        ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        let schema = self.schema(ctx, DataSourceSchemaRequest).await;
        let mut diagnostics = schema.diagnostics;
        diagnostics.extend(validate_config(&schema.schema, &request.config));
        ValidateDataSourceConfigResponse { diagnostics }
    }

    /// Every schema attribute must be present in the returned state
    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse;
}

pub struct DataSourceMetadataRequest;

pub struct DataSourceMetadataResponse {
    pub type_name: String,
}

pub struct DataSourceSchemaRequest;

pub struct DataSourceSchemaResponse {
    pub schema: Schema,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ValidateDataSourceConfigRequest {
    pub type_name: String,
    pub config: DynamicValue,
}

pub struct ValidateDataSourceConfigResponse {
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ReadDataSourceRequest {
    pub type_name: String,
    pub config: DynamicValue,
    pub provider_meta: Option<DynamicValue>,
    pub client_capabilities: ClientCapabilities,
}

pub struct ReadDataSourceResponse {
    pub state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}

/// Receives the provider data handed out by provider configure
#[async_trait]
pub trait DataSourceWithConfigure: DataSource {
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse;
}

pub struct ConfigureDataSourceRequest {
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}

pub struct ConfigureDataSourceResponse {
    pub diagnostics: Vec<Diagnostic>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
    use crate::types::Dynamic;
    use crate::validator::OneOfValidator;
    use std::collections::HashMap;

    struct Names;

    #[async_trait]
    impl DataSource for Names {
        fn type_name(&self) -> &str {
            "test_names"
        }

        async fn schema(
            &self,
            _ctx: Context,
            _request: DataSourceSchemaRequest,
        ) -> DataSourceSchemaResponse {
            DataSourceSchemaResponse {
                schema: SchemaBuilder::new()
                    .attribute(
                        AttributeBuilder::new("kind", AttributeType::String)
                            .optional()
                            .validator(Arc::new(OneOfValidator::new(&["zone", "view"])))
                            .build(),
                    )
                    .build(),
                diagnostics: vec![],
            }
        }

        async fn read(
            &self,
            _ctx: Context,
            request: ReadDataSourceRequest,
        ) -> ReadDataSourceResponse {
            ReadDataSourceResponse {
                state: request.config,
                diagnostics: vec![],
            }
        }
    }

    fn config(kind: &str) -> ValidateDataSourceConfigRequest {
        ValidateDataSourceConfigRequest {
            type_name: "test_names".to_string(),
            config: DynamicValue::new(Dynamic::Map(HashMap::from([(
                "kind".to_string(),
                Dynamic::String(kind.to_string()),
            )]))),
        }
    }

    #[test]
    fn metadata_defaults_to_type_name() {
        let response =
            tokio_test::block_on(Names.metadata(Context::new(), DataSourceMetadataRequest));
        assert_eq!(response.type_name, "test_names");
    }

    #[tokio::test]
    async fn validate_defaults_to_schema_checks() {
        let rejected = Names.validate(Context::new(), config("record")).await;
        assert_eq!(rejected.diagnostics.len(), 1);

        let accepted = Names.validate(Context::new(), config("zone")).await;
        assert!(accepted.diagnostics.is_empty());
    }
}
