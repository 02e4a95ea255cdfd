//! Generic CRUD resource driven by an [`ObjectDescriptor`]
//!
//! Create, read, update, delete and import follow the same sequence for
//! every WAPI object type. Each operation issues its requests once; any
//! WAPI error is reported verbatim and nothing is retried.

use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::plan::plan_resource_change;
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
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::validate_config;

use super::codec::{self, WriteMode};
use super::descriptor::{ObjectDescriptor, EXTATTRS, EXTATTRS_ALL, REF};
use crate::api::{extract_ref, ApiError, Client, ObjectRef, WapiObject};
use crate::provider_data::NiosProviderData;
use crate::utils::extattrs::{
    add_inherited_ext_attrs, add_internal_id_to_ext_attrs, expand_ext_attrs,
    expand_stored_ext_attrs, ext_attrs_from_json, ext_attrs_to_json, internal_id,
    reconcile_stored_state, stored_internal_id, ExtAttrError, ExtAttrs,
};

/// Downcast the value returned by provider configure
pub(crate) fn provider_data_from(
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
) -> Result<Arc<NiosProviderData>, Diagnostic> {
    provider_data
        .ok_or_else(|| {
            Diagnostic::error(
                "Provider not configured",
                "Provider data was not properly configured",
            )
        })?
        .downcast::<NiosProviderData>()
        .map_err(|_| {
            Diagnostic::error(
                "Invalid provider data",
                "Expected NiosProviderData from provider configure",
            )
        })
}

fn ext_attr_error(e: ExtAttrError) -> Diagnostic {
    Diagnostic::error("Invalid extensible attributes", e.to_string())
        .with_attribute(AttributePath::new(EXTATTRS))
}

fn state_map(state: &DynamicValue, name: &str) -> Result<ExtAttrs, Diagnostic> {
    let value = state.get(&AttributePath::new(name)).cloned().unwrap_or_default();
    Ok(expand_ext_attrs(&value).map_err(ext_attr_error)?.unwrap_or_default())
}

/// EA map the provider wrote to state; values that do not parse stay strings
fn stored_map(state: &DynamicValue, name: &str) -> ExtAttrs {
    state
        .get(&AttributePath::new(name))
        .and_then(expand_stored_ext_attrs)
        .unwrap_or_default()
}

pub struct DescriptorResource {
    desc: &'static ObjectDescriptor,
    provider_data: Option<Arc<NiosProviderData>>,
}

impl DescriptorResource {
    pub fn new(desc: &'static ObjectDescriptor) -> Self {
        Self {
            desc,
            provider_data: None,
        }
    }

    pub fn descriptor(&self) -> &'static ObjectDescriptor {
        self.desc
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

    fn api_error(&self, action: &str, e: ApiError) -> Diagnostic {
        Diagnostic::error(
            format!("Failed to {} {}", action, self.desc.type_name),
            e.to_string(),
        )
    }

    fn reference(&self, state: &DynamicValue) -> Option<String> {
        state
            .get_known(&AttributePath::new(REF))
            .and_then(Dynamic::as_str)
            .map(str::to_string)
    }

    /// Flatten a WAPI object and reconcile its extensible attributes against `prior`
    fn to_state(&self, api: &WapiObject, prior: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let mut state = codec::flatten(self.desc, api, prior).map_err(|e| {
            Diagnostic::error(
                format!("Failed to read {} response", self.desc.type_name),
                e.to_string(),
            )
        })?;

        if self.desc.supports_extattrs {
            let api_eas = ext_attrs_from_json(api.get(EXTATTRS)).map_err(ext_attr_error)?;
            let planned = prior
                .get(&AttributePath::new(EXTATTRS))
                .cloned()
                .unwrap_or_default();
            let (owned, all) = reconcile_stored_state(&planned, &api_eas);
            for (name, value) in [(EXTATTRS, owned), (EXTATTRS_ALL, all)] {
                state
                    .set(&AttributePath::new(name), value)
                    .map_err(|e| Diagnostic::error("Failed to set state", e.to_string()))?;
            }
        }

        Ok(state)
    }

    fn request_body(&self, plan: &DynamicValue, mode: WriteMode) -> Result<WapiObject, Diagnostic> {
        codec::expand(self.desc, plan, mode).map_err(|e| {
            Diagnostic::error(
                format!("Invalid {} configuration", self.desc.type_name),
                e.to_string(),
            )
        })
    }

    async fn create_object(
        &self,
        ctx: &Context,
        plan: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let client = self.client()?;
        let mut body = self.request_body(plan, WriteMode::Create)?;

        if self.desc.supports_extattrs {
            let mut eas = state_map(plan, EXTATTRS)?;
            let id = add_internal_id_to_ext_attrs(&mut eas);
            tracing::debug!("Creating {} with internal id {}", self.desc.type_name, id);
            body.insert(EXTATTRS.to_string(), ext_attrs_to_json(&eas));
        }

        let created = client
            .objects(self.desc.object_type)
            .create(ctx, &body, &codec::return_fields(self.desc))
            .await
            .map_err(|e| self.api_error("create", e))?;

        self.to_state(&created, plan)
    }

    /// GET by reference, falling back to the tracking EA when the object is
    /// gone or the reference now points at a different object
    async fn find_object(
        &self,
        ctx: &Context,
        reference: &str,
        expected_id: Option<&str>,
    ) -> Result<Option<WapiObject>, Diagnostic> {
        let client = self.client()?;
        let objects = client.objects(self.desc.object_type);
        let fields = codec::return_fields(self.desc);

        match objects.get(ctx, reference, &fields).await {
            Ok(found) => {
                let found_id = ext_attrs_from_json(found.get(EXTATTRS))
                    .ok()
                    .and_then(|eas| internal_id(&eas).map(str::to_string));
                match (expected_id, found_id.as_deref()) {
                    (Some(expected), Some(actual)) if expected != actual => {
                        tracing::warn!(
                            "{} now belongs to another object (internal id {}), searching for {}",
                            reference,
                            actual,
                            expected
                        );
                    }
                    _ => return Ok(Some(found)),
                }
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!("{} not found by reference", reference);
            }
            Err(e) => return Err(self.api_error("read", e)),
        }

        let Some(expected) = expected_id else {
            return Ok(None);
        };
        let found = objects
            .find_by_internal_id(ctx, expected, &fields)
            .await
            .map_err(|e| self.api_error("search", e))?;
        if let Some(object) = &found {
            tracing::warn!(
                "{} moved to {}",
                reference,
                object.get("_ref").and_then(|r| r.as_str()).unwrap_or_default()
            );
        }
        Ok(found)
    }

    async fn read_object(
        &self,
        ctx: &Context,
        current: &DynamicValue,
    ) -> Result<Option<DynamicValue>, Diagnostic> {
        let Some(reference) = self.reference(current) else {
            return Ok(None);
        };
        let expected_id = if self.desc.supports_extattrs {
            current
                .get(&AttributePath::new(EXTATTRS_ALL))
                .and_then(stored_internal_id)
                .map(str::to_string)
        } else {
            None
        };

        match self.find_object(ctx, &reference, expected_id.as_deref()).await? {
            Some(object) => self.to_state(&object, current).map(Some),
            None => {
                tracing::info!("{} {} no longer exists", self.desc.type_name, reference);
                Ok(None)
            }
        }
    }

    async fn update_object(
        &self,
        ctx: &Context,
        prior: &DynamicValue,
        plan: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let client = self.client()?;
        let reference = self.reference(prior).ok_or_else(|| {
            Diagnostic::error("Missing reference", "Prior state has no object reference")
                .with_attribute(AttributePath::new(REF))
        })?;
        let mut body = self.request_body(plan, WriteMode::Update)?;

        if self.desc.supports_extattrs {
            let planned = state_map(plan, EXTATTRS)?;
            let prior_all = stored_map(prior, EXTATTRS_ALL);
            let prior_owned = stored_map(prior, EXTATTRS);
            let mut merged = add_inherited_ext_attrs(&planned, &prior_all, &prior_owned);
            add_internal_id_to_ext_attrs(&mut merged);
            body.insert(EXTATTRS.to_string(), ext_attrs_to_json(&merged));
        }

        let updated = client
            .objects(self.desc.object_type)
            .update(ctx, &reference, &body, &codec::return_fields(self.desc))
            .await
            .map_err(|e| self.api_error("update", e))?;

        self.to_state(&updated, plan)
    }

    async fn delete_object(&self, ctx: &Context, prior: &DynamicValue) -> Result<(), Diagnostic> {
        let client = self.client()?;
        let Some(reference) = self.reference(prior) else {
            return Ok(());
        };

        match client.objects(self.desc.object_type).delete(ctx, &reference).await {
            Ok(deleted) => {
                tracing::debug!("Deleted {}", deleted);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!("{} already gone", reference);
                Ok(())
            }
            Err(e) => Err(self.api_error("delete", e)),
        }
    }

    async fn import_object(&self, ctx: &Context, id: &str) -> Result<DynamicValue, Diagnostic> {
        let client = self.client()?;
        let invalid = |detail: String| Diagnostic::error("Invalid import ID", detail);

        let reference = extract_ref(id).map_err(|e| invalid(e.to_string()))?;
        let parsed = ObjectRef::parse(&reference).map_err(|e| invalid(e.to_string()))?;
        if !parsed.is_type(self.desc.object_type) {
            return Err(invalid(format!(
                "{} is a {} reference, expected {}",
                reference, parsed.object_type, self.desc.object_type
            )));
        }

        let objects = client.objects(self.desc.object_type);
        let fields = codec::return_fields(self.desc);
        let mut object = objects
            .get(ctx, &reference, &fields)
            .await
            .map_err(|e| self.api_error("import", e))?;

        if self.desc.supports_extattrs && self.desc.import_attaches_internal_id {
            let eas = ext_attrs_from_json(object.get(EXTATTRS)).map_err(ext_attr_error)?;
            if internal_id(&eas).is_none() {
                let mut tracking = ExtAttrs::new();
                let id = add_internal_id_to_ext_attrs(&mut tracking);
                tracing::debug!("Attaching internal id {} to {}", id, reference);

                let mut body = WapiObject::new();
                body.insert("extattrs+".to_string(), ext_attrs_to_json(&tracking));
                object = objects
                    .update(ctx, &reference, &body, &fields)
                    .await
                    .map_err(|e| self.api_error("import", e))?;
            }
        }

        // Every non-inherited EA found on import is treated as user owned
        let mut prior = DynamicValue::object();
        if self.desc.supports_extattrs {
            prior
                .set_map(&AttributePath::new(EXTATTRS), Default::default())
                .map_err(|e| Diagnostic::error("Failed to set state", e.to_string()))?;
        }
        let mut state = self.to_state(&object, &prior)?;

        let owned = AttributePath::new(EXTATTRS);
        if state
            .get(&owned)
            .and_then(Dynamic::as_map)
            .is_some_and(|m| m.is_empty())
        {
            state
                .set(&owned, Dynamic::Null)
                .map_err(|e| Diagnostic::error("Failed to set state", e.to_string()))?;
        }
        Ok(state)
    }
}

#[async_trait]
impl Resource for DescriptorResource {
    fn type_name(&self) -> &str {
        self.desc.type_name
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
            schema: self.desc.schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: validate_config(&self.desc.schema(), &request.config),
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        match self.create_object(&ctx, &request.planned_state).await {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(diagnostic) => CreateResourceResponse {
                new_state: DynamicValue::null(),
                diagnostics: vec![diagnostic],
            },
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        match self.read_object(&ctx, &request.current_state).await {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(diagnostic) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![diagnostic],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        match self
            .update_object(&ctx, &request.prior_state, &request.planned_state)
            .await
        {
            Ok(new_state) => UpdateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(diagnostic) => UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![diagnostic],
            },
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        DeleteResourceResponse {
            diagnostics: self
                .delete_object(&ctx, &request.prior_state)
                .await
                .err()
                .into_iter()
                .collect(),
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
impl ResourceWithConfigure for DescriptorResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        match provider_data_from(request.provider_data) {
            Ok(data) => {
                self.provider_data = Some(data);
                ConfigureResourceResponse {
                    diagnostics: vec![],
                }
            }
            Err(diagnostic) => ConfigureResourceResponse {
                diagnostics: vec![diagnostic],
            },
        }
    }
}

#[async_trait]
impl ResourceWithModifyPlan for DescriptorResource {
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        let mut planned = plan_resource_change(
            &self.desc.schema(),
            &request.config,
            &request.prior_state,
            &request.proposed_new_state,
        );

        // The complete EA map changes whenever the owned map does
        if self.desc.supports_extattrs
            && !planned.planned_state.is_null()
            && !request.prior_state.is_null()
        {
            let owned = AttributePath::new(EXTATTRS);
            if planned.planned_state.get(&owned) != request.prior_state.get(&owned) {
                if let Err(e) = planned
                    .planned_state
                    .mark_unknown(&AttributePath::new(EXTATTRS_ALL))
                {
                    planned
                        .diagnostics
                        .push(Diagnostic::error("Plan modification failed", e.to_string()));
                }
            }
        }

        ModifyPlanResponse {
            planned_state: planned.planned_state,
            requires_replace: planned.requires_replace,
            diagnostics: planned.diagnostics,
        }
    }
}

#[async_trait]
impl ResourceWithImportState for DescriptorResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        match self.import_object(&ctx, &request.id).await {
            Ok(state) => ImportResourceStateResponse {
                imported_resources: vec![ImportedResource {
                    type_name: request.type_name,
                    state,
                }],
                diagnostics: vec![],
            },
            Err(diagnostic) => ImportResourceStateResponse {
                imported_resources: vec![],
                diagnostics: vec![diagnostic],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::descriptor::{FieldKind, FieldSpec};
    use crate::utils::extattrs::INTERNAL_ID_KEY;
    use crate::utils::flex::json_to_dynamic;
    use serde_json::json;

    static TXT: ObjectDescriptor = ObjectDescriptor {
        type_name: "nios_dns_record_txt",
        object_type: "record:txt",
        description: "TXT record",
        fields: &[
            FieldSpec::required("name", FieldKind::String),
            FieldSpec::required("text", FieldKind::String),
        ],
        supports_extattrs: true,
        import_attaches_internal_id: true,
        function_call_fields: &[],
        rules: &[],
    };

    fn value(v: serde_json::Value) -> DynamicValue {
        DynamicValue::new(json_to_dynamic(&v))
    }

    #[tokio::test]
    async fn unconfigured_resource_reports_error() {
        let resource = DescriptorResource::new(&TXT);
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: TXT.type_name.to_string(),
                    planned_state: value(json!({"name": "t.example.com", "text": "hi"})),
                    config: DynamicValue::null(),
                    provider_meta: None,
                },
            )
            .await;
        assert!(response.new_state.is_null());
        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    }

    #[tokio::test]
    async fn configure_rejects_foreign_provider_data() {
        let mut resource = DescriptorResource::new(&TXT);
        let response = resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(Arc::new("not provider data".to_string())),
                },
            )
            .await;
        assert_eq!(response.diagnostics[0].summary, "Invalid provider data");
    }

    #[tokio::test]
    async fn modify_plan_marks_all_map_unknown_when_owned_changes() {
        let resource = DescriptorResource::new(&TXT);
        let prior = value(json!({
            "ref": "record:txt/abc:t.example.com/default",
            "name": "t.example.com",
            "text": "hi",
            "extattrs": {"Site": "NY"},
            "extattrs_all": {"Site": "NY", INTERNAL_ID_KEY: "id-1"}
        }));
        let config = value(json!({
            "ref": null,
            "name": "t.example.com",
            "text": "hi",
            "extattrs": {"Site": "SF"},
            "extattrs_all": null
        }));
        let mut proposed = prior.clone();
        proposed
            .set(&AttributePath::new(EXTATTRS), json_to_dynamic(&json!({"Site": "SF"})))
            .unwrap();

        let response = resource
            .modify_plan(
                Context::new(),
                ModifyPlanRequest {
                    type_name: TXT.type_name.to_string(),
                    config,
                    prior_state: prior,
                    proposed_new_state: proposed,
                    provider_meta: None,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(response.requires_replace.is_empty());
        assert_eq!(
            response.planned_state.get(&AttributePath::new(EXTATTRS_ALL)),
            Some(&Dynamic::Unknown)
        );
        assert_eq!(
            response.planned_state.get_string(&AttributePath::new(REF)).unwrap(),
            "record:txt/abc:t.example.com/default"
        );
    }

    #[tokio::test]
    async fn import_rejects_wrong_object_type() {
        let server = mockito::Server::new_async().await;
        let mut resource = DescriptorResource::new(&TXT);
        let data = NiosProviderData::new(crate::api::test_helpers::create_test_client(&server.url()));
        resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(Arc::new(data)),
                },
            )
            .await;

        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: TXT.type_name.to_string(),
                    id: "record:a/ZG5z:www.example.com/default".to_string(),
                    client_capabilities: Default::default(),
                },
            )
            .await;
        assert!(response.imported_resources.is_empty());
        assert_eq!(response.diagnostics[0].summary, "Invalid import ID");
    }
}
