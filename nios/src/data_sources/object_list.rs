//! List data source for any descriptor-driven object type

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::api::{ApiQueryParams, WapiObject};
use crate::provider_data::NiosProviderData;
use crate::resources::codec;
use crate::resources::descriptor::{ObjectDescriptor, EXTATTRS, EXTATTRS_ALL, FUNC_CALL};
use crate::resources::engine::provider_data_from;
use crate::utils::extattrs::{ext_attrs_from_json, reconcile_state};
use crate::utils::flex;

pub struct ObjectListDataSource {
    desc: &'static ObjectDescriptor,
    provider_data: Option<Arc<NiosProviderData>>,
}

impl ObjectListDataSource {
    pub fn new(desc: &'static ObjectDescriptor) -> Self {
        Self {
            desc,
            provider_data: None,
        }
    }

    /// String map attribute as sorted pairs, so query strings are stable
    fn string_pairs(config: &DynamicValue, name: &str) -> Result<Vec<(String, String)>, Diagnostic> {
        let Some(map) = config.get_known(&AttributePath::new(name)).and_then(Dynamic::as_map) else {
            return Ok(vec![]);
        };
        let mut pairs = map
            .iter()
            .map(|(k, v)| {
                flex::dynamic_to_string(k, v)
                    .map(|s| (k.clone(), s.unwrap_or_default()))
                    .map_err(|e| {
                        Diagnostic::error("Invalid filter", e.to_string())
                            .with_attribute(AttributePath::new(name).key(k))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        pairs.sort();
        Ok(pairs)
    }

    fn query(&self, config: &DynamicValue) -> Result<ApiQueryParams, Diagnostic> {
        let mut params = ApiQueryParams::new();
        for (field, value) in Self::string_pairs(config, "filters")? {
            params = params.add(field, value);
        }
        if self.desc.supports_extattrs {
            for (name, value) in Self::string_pairs(config, "extattrfilters")? {
                params = params.ext_attr_filter(&name, &value);
            }
        }
        Ok(params.proxy_search_gm())
    }

    fn flatten_result(&self, object: &WapiObject) -> Result<Dynamic, Diagnostic> {
        let read_error = |detail: String| {
            Diagnostic::error(
                format!("Failed to read {} response", self.desc.type_name),
                detail,
            )
        };
        let state =
            codec::flatten(self.desc, object, &DynamicValue::null()).map_err(|e| read_error(e.to_string()))?;
        let Dynamic::Map(mut item) = state.value else {
            return Err(read_error("flattened object is not a map".to_string()));
        };

        if self.desc.supports_extattrs {
            let eas = ext_attrs_from_json(object.get(EXTATTRS)).map_err(|e| read_error(e.to_string()))?;
            let (owned, all) = reconcile_state(&Dynamic::Map(HashMap::new()), &eas)
                .map_err(|e| read_error(e.to_string()))?;
            item.insert(EXTATTRS.to_string(), owned);
            item.insert(EXTATTRS_ALL.to_string(), all);
        }

        item.remove(FUNC_CALL);
        for field in self.desc.fields.iter().filter(|f| f.write_only) {
            item.remove(field.name);
        }
        Ok(Dynamic::Map(item))
    }

    async fn list(&self, ctx: &Context, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let provider_data = self.provider_data.as_ref().ok_or_else(|| {
            Diagnostic::error(
                "Provider not configured",
                "Provider data was not properly configured",
            )
        })?;
        let params = self.query(config)?;

        let objects = provider_data
            .client
            .objects(self.desc.object_type)
            .list(ctx, params, &codec::return_fields(self.desc))
            .await
            .map_err(|e| {
                Diagnostic::error(
                    format!("Failed to list {}", self.desc.object_type),
                    format!("API error: {}", e),
                )
            })?;
        tracing::debug!("Found {} {} objects", objects.len(), self.desc.object_type);

        let result = objects
            .iter()
            .map(|object| self.flatten_result(object))
            .collect::<Result<Vec<_>, _>>()?;

        let mut state = config.clone();
        state
            .set_list(&AttributePath::new("result"), result)
            .map_err(|e| Diagnostic::error("Failed to set state", e.to_string()))?;
        Ok(state)
    }
}

#[async_trait]
impl DataSource for ObjectListDataSource {
    fn type_name(&self) -> &str {
        self.desc.type_name
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: self.desc.data_source_schema(),
            diagnostics: vec![],
        }
    }

    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        match self.list(&ctx, &request.config).await {
            Ok(state) => ReadDataSourceResponse {
                state,
                diagnostics: vec![],
            },
            Err(diagnostic) => ReadDataSourceResponse {
                state: DynamicValue::null(),
                diagnostics: vec![diagnostic],
            },
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for ObjectListDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        match provider_data_from(request.provider_data) {
            Ok(data) => {
                self.provider_data = Some(data);
                ConfigureDataSourceResponse {
                    diagnostics: vec![],
                }
            }
            Err(diagnostic) => ConfigureDataSourceResponse {
                diagnostics: vec![diagnostic],
            },
        }
    }
}
