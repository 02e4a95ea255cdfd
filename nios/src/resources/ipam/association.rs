//! DHCP association of a host record address
//!
//! The address itself belongs to `nios_ip_allocation`; this resource only
//! manages the MAC or DUID and the DHCP flag of one entry. WAPI has no
//! endpoint for a single host address, so every change rewrites the whole
//! address list of the host.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{validate_config, AtLeastOneOf};

use crate::api::{ApiError, Client, WapiObject};
use crate::provider_data::NiosProviderData;
use crate::resources::engine::provider_data_from;
use crate::utils::flex;

const HOST: &str = "record:host";
const ZERO_MAC: &str = "00:00:00:00:00:00";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    V4,
    V6,
}

impl Family {
    fn list(self) -> &'static str {
        match self {
            Family::V4 => "ipv4addrs",
            Family::V6 => "ipv6addrs",
        }
    }

    fn address(self) -> &'static str {
        match self {
            Family::V4 => "ipv4addr",
            Family::V6 => "ipv6addr",
        }
    }

    /// Hardware identifier WAPI uses for this family
    fn hardware(self) -> &'static str {
        match self {
            Family::V4 => "mac",
            Family::V6 => "duid",
        }
    }

    fn of(address: &str) -> Option<Self> {
        match address.parse::<std::net::IpAddr>().ok()? {
            std::net::IpAddr::V4(_) => Some(Family::V4),
            std::net::IpAddr::V6(_) => Some(Family::V6),
        }
    }
}

/// Desired association as planned by Terraform
#[derive(Debug, Clone, Default)]
struct Association {
    host_ref: String,
    ip_address: Option<String>,
    mac: Option<String>,
    duid: Option<String>,
    configure_for_dhcp: Option<bool>,
}

impl Association {
    fn from_state(state: &DynamicValue) -> Result<Self, Diagnostic> {
        let text = |name: &str| -> Result<Option<String>, Diagnostic> {
            let value = state.get(&AttributePath::new(name)).cloned().unwrap_or_default();
            flex::dynamic_to_string(name, &value).map_err(|e| {
                Diagnostic::error("Invalid configuration", e.to_string())
                    .with_attribute(AttributePath::new(name))
            })
        };

        let host_ref = text("host_ref")?.ok_or_else(|| {
            Diagnostic::error("Missing host reference", "host_ref must be set")
                .with_attribute(AttributePath::new("host_ref"))
        })?;
        let configure_for_dhcp = state
            .get_known(&AttributePath::new("configure_for_dhcp"))
            .and_then(Dynamic::as_bool);

        Ok(Self {
            host_ref,
            ip_address: text("ip_address")?,
            mac: text("mac")?,
            duid: text("duid")?,
            configure_for_dhcp,
        })
    }

    /// Address family to look in; a bare DUID means IPv6
    fn family(&self) -> Family {
        match self.ip_address.as_deref().and_then(Family::of) {
            Some(family) => family,
            None if self.mac.is_none() && self.duid.is_some() => Family::V6,
            None => Family::V4,
        }
    }
}

/// Index of the host entry matching `address`, or the first one of the family
fn find_entry(entries: &[Value], family: Family, address: Option<&str>) -> Option<usize> {
    match address {
        Some(wanted) => entries.iter().position(|entry| {
            entry
                .get(family.address())
                .and_then(Value::as_str)
                .is_some_and(|a| flex::ip_equivalent(a, wanted))
        }),
        None if entries.is_empty() => None,
        None => Some(0),
    }
}

/// WAPI rejects read-only members when the list is written back
fn writable(entries: &mut [Value]) {
    for entry in entries.iter_mut() {
        if let Some(obj) = entry.as_object_mut() {
            obj.remove("_ref");
            obj.remove("host");
        }
    }
}

#[derive(Default)]
pub struct IpAssociationResource {
    provider_data: Option<Arc<NiosProviderData>>,
}

impl IpAssociationResource {
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

    fn api_error(action: &str, e: ApiError) -> Diagnostic {
        Diagnostic::error(
            format!("Failed to {} nios_ip_association", action),
            e.to_string(),
        )
    }

    fn build_schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Associates a MAC address or DUID with a host record address for DHCP")
            .attribute(
                AttributeBuilder::new("ref", AttributeType::String)
                    .description("WAPI reference of the host address")
                    .computed()
                    .plan_modifier(Arc::new(UseStateForUnknown))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("host_ref", AttributeType::String)
                    .description("Reference of the host record, e.g. nios_ip_allocation.ref")
                    .required()
                    .plan_modifier(Arc::new(RequiresReplace))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ip_address", AttributeType::String)
                    .description("Host address to associate; defaults to the first address")
                    .optional()
                    .computed()
                    .plan_modifier(Arc::new(RequiresReplace))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("mac", AttributeType::String)
                    .description("MAC address for an IPv4 address")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("duid", AttributeType::String)
                    .description("DHCPv6 unique identifier for an IPv6 address")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("configure_for_dhcp", AttributeType::Bool)
                    .description("Serve the address over DHCP")
                    .optional()
                    .computed()
                    .build(),
            )
            .config_validator(Arc::new(AtLeastOneOf {
                attributes: vec!["mac".to_string(), "duid".to_string()],
            }))
            .build()
    }

    async fn host_entries(
        client: &Client,
        ctx: &Context,
        host_ref: &str,
        family: Family,
    ) -> Result<Option<Vec<Value>>, ApiError> {
        match client
            .objects(HOST)
            .get(ctx, host_ref, &[family.list()])
            .await
        {
            Ok(host) => Ok(Some(
                host.get(family.list())
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
            )),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write_entries(
        client: &Client,
        ctx: &Context,
        host_ref: &str,
        family: Family,
        mut entries: Vec<Value>,
    ) -> Result<Vec<Value>, ApiError> {
        writable(&mut entries);
        let mut body = WapiObject::new();
        body.insert(family.list().to_string(), Value::Array(entries));
        let host = client
            .objects(HOST)
            .update(ctx, host_ref, &body, &[family.list()])
            .await?;
        Ok(host
            .get(family.list())
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    fn to_state(
        host_ref: &str,
        family: Family,
        entry: &Value,
        prior: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let text = |name: &str| entry.get(name).and_then(Value::as_str);
        let prior_address = prior
            .get(&AttributePath::new("ip_address"))
            .cloned()
            .unwrap_or_default();

        let mut state = DynamicValue::object();
        let values = [
            ("ref", flex::string_to_dynamic(text("_ref"))),
            ("host_ref", Dynamic::string(host_ref)),
            (
                "ip_address",
                flex::flatten_ip(text(family.address()), &prior_address),
            ),
            (
                "mac",
                match family {
                    Family::V4 => flex::optional_string_to_dynamic(text("mac")),
                    Family::V6 => Dynamic::Null,
                },
            ),
            (
                "duid",
                match family {
                    Family::V4 => Dynamic::Null,
                    Family::V6 => flex::optional_string_to_dynamic(text("duid")),
                },
            ),
            (
                "configure_for_dhcp",
                flex::bool_to_dynamic(entry.get("configure_for_dhcp").and_then(Value::as_bool)),
            ),
        ];
        for (name, value) in values {
            state
                .set(&AttributePath::new(name), value)
                .map_err(|e| Diagnostic::error("Failed to set state", e.to_string()))?;
        }
        Ok(state)
    }

    async fn apply(&self, ctx: &Context, plan: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let client = self.client()?;
        let wanted = Association::from_state(plan)?;
        let family = wanted.family();
        let hardware = match family {
            Family::V4 => wanted.mac.clone(),
            Family::V6 => wanted.duid.clone(),
        }
        .ok_or_else(|| {
            Diagnostic::error(
                "Missing hardware identifier",
                format!(
                    "{} must be set to associate an {} address",
                    family.hardware(),
                    family.address()
                ),
            )
            .with_attribute(AttributePath::new(family.hardware()))
        })?;

        let mut entries = Self::host_entries(client, ctx, &wanted.host_ref, family)
            .await
            .map_err(|e| Self::api_error("read host for", e))?
            .ok_or_else(|| {
                Diagnostic::error(
                    "Host not found",
                    format!("{} does not exist", wanted.host_ref),
                )
                .with_attribute(AttributePath::new("host_ref"))
            })?;

        let idx = find_entry(&entries, family, wanted.ip_address.as_deref()).ok_or_else(|| {
            Diagnostic::error(
                "Address not found",
                format!(
                    "{} has no {} {}",
                    wanted.host_ref,
                    family.address(),
                    wanted.ip_address.as_deref().unwrap_or_default()
                ),
            )
            .with_attribute(AttributePath::new("ip_address"))
        })?;
        let address = entries[idx]
            .get(family.address())
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if let Some(entry) = entries[idx].as_object_mut() {
            entry.insert(family.hardware().to_string(), Value::String(hardware));
            entry.insert(
                "configure_for_dhcp".to_string(),
                Value::Bool(wanted.configure_for_dhcp.unwrap_or(true)),
            );
        }
        tracing::debug!("Associating {} on {}", address, wanted.host_ref);

        let written = Self::write_entries(client, ctx, &wanted.host_ref, family, entries)
            .await
            .map_err(|e| Self::api_error("update host for", e))?;
        let entry = find_entry(&written, family, Some(&address))
            .map(|i| &written[i])
            .ok_or_else(|| {
                Diagnostic::error(
                    "Address not found",
                    format!("{} vanished from {} after update", address, wanted.host_ref),
                )
            })?;

        Self::to_state(&wanted.host_ref, family, entry, plan)
    }

    async fn read_association(
        &self,
        ctx: &Context,
        current: &DynamicValue,
    ) -> Result<Option<DynamicValue>, Diagnostic> {
        let client = self.client()?;
        let known = Association::from_state(current)?;
        let family = known.family();
        let Some(entries) = Self::host_entries(client, ctx, &known.host_ref, family)
            .await
            .map_err(|e| Self::api_error("read", e))?
        else {
            tracing::info!("Host {} no longer exists", known.host_ref);
            return Ok(None);
        };

        let Some(address) = known.ip_address.as_deref() else {
            return Ok(None);
        };
        find_entry(&entries, family, Some(address))
            .map(|i| Self::to_state(&known.host_ref, family, &entries[i], current))
            .transpose()
    }

    async fn dissociate(&self, ctx: &Context, prior: &DynamicValue) -> Result<(), Diagnostic> {
        let client = self.client()?;
        let known = Association::from_state(prior)?;
        let family = known.family();
        let Some(mut entries) = Self::host_entries(client, ctx, &known.host_ref, family)
            .await
            .map_err(|e| Self::api_error("read host for", e))?
        else {
            return Ok(());
        };
        let Some(idx) = known
            .ip_address
            .as_deref()
            .and_then(|a| find_entry(&entries, family, Some(a)))
        else {
            return Ok(());
        };

        if let Some(entry) = entries[idx].as_object_mut() {
            match family {
                Family::V4 => {
                    entry.insert("mac".to_string(), Value::String(ZERO_MAC.to_string()));
                }
                Family::V6 => {
                    entry.remove("duid");
                }
            }
            entry.insert("configure_for_dhcp".to_string(), Value::Bool(false));
        }

        match Self::write_entries(client, ctx, &known.host_ref, family, entries).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(Self::api_error("delete", e)),
        }
    }
}

#[async_trait]
impl Resource for IpAssociationResource {
    fn type_name(&self) -> &str {
        "nios_ip_association"
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
            schema: Self::build_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = validate_config(&Self::build_schema(), &request.config);

        let path = AttributePath::new("ip_address");
        if let Some(address) = request.config.get_known(&path).and_then(Dynamic::as_str) {
            if Family::of(address).is_none() {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid address for ip_address",
                        format!("'{}' must be a valid IPv4 or IPv6 address", address),
                    )
                    .with_attribute(path),
                );
            }
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        match self.apply(&ctx, &request.planned_state).await {
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
        match self.read_association(&ctx, &request.current_state).await {
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
        match self.apply(&ctx, &request.planned_state).await {
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
                .dissociate(&ctx, &request.prior_state)
                .await
                .err()
                .into_iter()
                .collect(),
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for IpAssociationResource {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use crate::utils::flex::json_to_dynamic;
    use mockito::{Matcher, Server};
    use serde_json::json;

    const HOST_REF: &str = "record:host/ZG5z:h.example.com/default";
    const HOST_PATH: &str = "/wapi/v2.13.6/record:host/ZG5z:h.example.com/default";

    fn value(v: serde_json::Value) -> DynamicValue {
        DynamicValue::new(json_to_dynamic(&v))
    }

    async fn configured(url: &str) -> IpAssociationResource {
        let mut resource = IpAssociationResource::new();
        let data = NiosProviderData::new(create_test_client(url));
        resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(Arc::new(data)),
                },
            )
            .await;
        resource
    }

    fn host_body(entries: serde_json::Value) -> String {
        json!({"result": {"_ref": HOST_REF, "ipv4addrs": entries}}).to_string()
    }

    #[test]
    fn family_follows_address_then_identifier() {
        let mut wanted = Association {
            host_ref: HOST_REF.to_string(),
            duid: Some("00:01".to_string()),
            ..Default::default()
        };
        assert_eq!(wanted.family(), Family::V6);
        wanted.ip_address = Some("10.0.0.5".to_string());
        assert_eq!(wanted.family(), Family::V4);
    }

    #[test]
    fn writable_strips_read_only_members() {
        let mut entries = vec![json!({
            "_ref": "record:host_ipv4addr/x",
            "host": "h.example.com",
            "ipv4addr": "10.0.0.5"
        })];
        writable(&mut entries);
        assert_eq!(entries, vec![json!({"ipv4addr": "10.0.0.5"})]);
    }

    #[test]
    fn v6_state_keeps_prior_address_spelling() {
        let entry = json!({
            "_ref": "record:host_ipv6addr/c",
            "ipv6addr": "2001:db8::5",
            "duid": "00:01:00:01",
            "configure_for_dhcp": true
        });
        let prior = value(json!({"ip_address": "2001:0db8:0:0:0:0:0:5"}));
        let state = IpAssociationResource::to_state(HOST_REF, Family::V6, &entry, &prior).unwrap();

        assert_eq!(
            state.get_string(&AttributePath::new("ip_address")).unwrap(),
            "2001:0db8:0:0:0:0:0:5"
        );
        assert_eq!(
            state.get_string(&AttributePath::new("duid")).unwrap(),
            "00:01:00:01"
        );
        assert!(state
            .get(&AttributePath::new("mac"))
            .is_some_and(Dynamic::is_null));
    }

    #[tokio::test]
    async fn create_sets_mac_on_matching_entry() {
        let mut server = Server::new_async().await;
        let get = server
            .mock("GET", HOST_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(host_body(json!([
                {"_ref": "record:host_ipv4addr/a", "host": "h.example.com",
                 "ipv4addr": "10.0.0.4", "configure_for_dhcp": false},
                {"_ref": "record:host_ipv4addr/b", "host": "h.example.com",
                 "ipv4addr": "10.0.0.5", "configure_for_dhcp": false}
            ])))
            .create_async()
            .await;
        let put = server
            .mock("PUT", HOST_PATH)
            .match_query(Matcher::Any)
            .match_body(Matcher::Json(json!({"ipv4addrs": [
                {"ipv4addr": "10.0.0.4", "configure_for_dhcp": false},
                {"ipv4addr": "10.0.0.5", "configure_for_dhcp": true, "mac": "aa:bb:cc:dd:ee:ff"}
            ]})))
            .with_status(200)
            .with_body(host_body(json!([
                {"_ref": "record:host_ipv4addr/a", "ipv4addr": "10.0.0.4",
                 "configure_for_dhcp": false},
                {"_ref": "record:host_ipv4addr/b", "ipv4addr": "10.0.0.5",
                 "configure_for_dhcp": true, "mac": "aa:bb:cc:dd:ee:ff"}
            ])))
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "nios_ip_association".to_string(),
                    planned_state: value(json!({
                        "host_ref": HOST_REF,
                        "ip_address": "10.0.0.5",
                        "mac": "aa:bb:cc:dd:ee:ff"
                    })),
                    config: DynamicValue::null(),
                    provider_meta: None,
                },
            )
            .await;

        get.assert_async().await;
        put.assert_async().await;
        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = response.new_state;
        assert_eq!(
            state.get_string(&AttributePath::new("ref")).unwrap(),
            "record:host_ipv4addr/b"
        );
        assert_eq!(
            state.get_bool(&AttributePath::new("configure_for_dhcp")).unwrap(),
            true
        );
        assert!(state
            .get(&AttributePath::new("duid"))
            .is_some_and(Dynamic::is_null));
    }

    #[tokio::test]
    async fn read_tombstones_when_host_is_gone() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", HOST_PATH)
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"Error": "AdmConDataNotFoundError", "code": "Client.Ibap.Data.NotFound"}"#)
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "nios_ip_association".to_string(),
                    current_state: value(json!({
                        "host_ref": HOST_REF,
                        "ip_address": "10.0.0.5",
                        "mac": "aa:bb:cc:dd:ee:ff"
                    })),
                    provider_meta: None,
                    client_capabilities: Default::default(),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
        assert!(response.new_state.is_none());
    }

    #[tokio::test]
    async fn delete_clears_mac_and_dhcp() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", HOST_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(host_body(json!([
                {"_ref": "record:host_ipv4addr/b", "host": "h.example.com",
                 "ipv4addr": "10.0.0.5", "configure_for_dhcp": true,
                 "mac": "aa:bb:cc:dd:ee:ff"}
            ])))
            .create_async()
            .await;
        let put = server
            .mock("PUT", HOST_PATH)
            .match_query(Matcher::Any)
            .match_body(Matcher::Json(json!({"ipv4addrs": [
                {"ipv4addr": "10.0.0.5", "configure_for_dhcp": false, "mac": ZERO_MAC}
            ]})))
            .with_status(200)
            .with_body(host_body(json!([])))
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "nios_ip_association".to_string(),
                    prior_state: value(json!({
                        "host_ref": HOST_REF,
                        "ip_address": "10.0.0.5",
                        "mac": "aa:bb:cc:dd:ee:ff",
                        "configure_for_dhcp": true
                    })),
                    provider_meta: None,
                },
            )
            .await;
        put.assert_async().await;
        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    }

    #[tokio::test]
    async fn validate_requires_hardware_identifier() {
        let resource = IpAssociationResource::new();
        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "nios_ip_association".to_string(),
                    config: value(json!({"host_ref": HOST_REF, "ip_address": "not-an-ip"})),
                    client_capabilities: Default::default(),
                },
            )
            .await;
        assert_eq!(response.diagnostics.len(), 2);
    }
}
