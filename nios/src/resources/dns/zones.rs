//! Authoritative, forward, delegated, stub and response policy zones

use super::{
    comment, disable, fqdn, locked, prefix, servers, view, zone_format, EXTERNAL_SERVER,
    FORWARDING_MEMBER, FORWARD_TARGET, MEMBER_SERVER,
};
use crate::resources::descriptor::{Check, FieldKind, FieldSpec, ObjectDescriptor, Rule};

const SOA_TIMERS: &[&str] = &[
    "soa_default_ttl",
    "soa_expire",
    "soa_negative_ttl",
    "soa_refresh",
    "soa_retry",
];

const fn soa_timer(name: &'static str) -> FieldSpec {
    FieldSpec::optional(name, FieldKind::Int).checks(&[Check::IntRange(0, 4_294_967_295)])
}

const fn ns_group() -> FieldSpec {
    FieldSpec::optional("ns_group", FieldKind::String).doc("Name server group serving the zone")
}

const fn dns_fqdn() -> FieldSpec {
    FieldSpec::computed("dns_fqdn", FieldKind::String)
}

pub static ZONE_AUTH: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_zone_auth",
    object_type: "zone_auth",
    description: "Manages an authoritative DNS zone",
    fields: &[
        fqdn(),
        view(),
        zone_format(),
        prefix(),
        comment(),
        disable(),
        locked(),
        ns_group(),
        servers("grid_primary", MEMBER_SERVER),
        servers("grid_secondaries", MEMBER_SERVER),
        servers("external_primaries", EXTERNAL_SERVER),
        servers("external_secondaries", EXTERNAL_SERVER),
        FieldSpec::optional("use_grid_zone_timer", FieldKind::Bool)
            .doc("Override the grid SOA timers with the soa_* values"),
        soa_timer("soa_default_ttl"),
        soa_timer("soa_expire"),
        soa_timer("soa_negative_ttl"),
        soa_timer("soa_refresh"),
        soa_timer("soa_retry"),
        FieldSpec::optional("soa_email", FieldKind::String),
        FieldSpec::optional("notify_delay", FieldKind::Int).checks(&[Check::IntRange(5, 86400)]),
        FieldSpec::optional("restart_if_needed", FieldKind::Bool)
            .write_only()
            .doc("Restart member services after the change when required"),
        dns_fqdn(),
        FieldSpec::computed("primary_type", FieldKind::String),
        FieldSpec::computed("network_view", FieldKind::String),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[
        Rule::ConflictsWith(&["ns_group", "grid_primary"]),
        Rule::ConflictsWith(&["ns_group", "external_primaries"]),
        Rule::RequiresTrue {
            fields: SOA_TIMERS,
            flag: "use_grid_zone_timer",
        },
    ],
};

pub static ZONE_FORWARD: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_zone_forward",
    object_type: "zone_forward",
    description: "Manages a forward zone",
    fields: &[
        fqdn(),
        view(),
        zone_format(),
        prefix(),
        comment(),
        disable(),
        locked(),
        FieldSpec::optional(
            "forward_to",
            FieldKind::ObjectList {
                fields: FORWARD_TARGET,
                key: Some("name"),
            },
        ),
        FieldSpec::optional("forwarders_only", FieldKind::Bool),
        servers("forwarding_servers", FORWARDING_MEMBER),
        ns_group().doc("Forwarding member name server group"),
        FieldSpec::optional("external_ns_group", FieldKind::String)
            .doc("Forward/stub server name server group"),
        dns_fqdn(),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[
        Rule::ExactlyOneOf(&["forward_to", "external_ns_group"]),
        Rule::ConflictsWith(&["ns_group", "forwarding_servers"]),
    ],
};

pub static ZONE_DELEGATED: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_zone_delegated",
    object_type: "zone_delegated",
    description: "Manages a delegated zone",
    fields: &[
        fqdn(),
        view(),
        zone_format(),
        prefix(),
        comment(),
        disable(),
        locked(),
        servers("delegate_to", EXTERNAL_SERVER),
        ns_group().doc("Delegation name server group"),
        FieldSpec::optional("delegated_ttl", FieldKind::Int).use_flag("use_delegated_ttl"),
        FieldSpec::optional("use_delegated_ttl", FieldKind::Bool),
        dns_fqdn(),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[Rule::ExactlyOneOf(&["delegate_to", "ns_group"])],
};

pub static ZONE_STUB: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_zone_stub",
    object_type: "zone_stub",
    description: "Manages a stub zone",
    fields: &[
        fqdn(),
        view(),
        zone_format(),
        prefix(),
        comment(),
        disable(),
        locked(),
        servers("stub_from", EXTERNAL_SERVER),
        servers("stub_members", MEMBER_SERVER),
        ns_group().doc("Stub member name server group"),
        FieldSpec::optional("external_ns_group", FieldKind::String),
        FieldSpec::optional("disable_forwarding", FieldKind::Bool),
        dns_fqdn(),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[
        Rule::ConflictsWith(&["ns_group", "stub_members"]),
        Rule::ConflictsWith(&["external_ns_group", "stub_from"]),
        Rule::AtLeastOneOf(&["stub_from", "external_ns_group"]),
    ],
};

pub static ZONE_RP: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_zone_rp",
    object_type: "zone_rp",
    description: "Manages a response policy zone",
    fields: &[
        fqdn(),
        view(),
        comment(),
        disable(),
        locked(),
        ns_group(),
        servers("grid_primary", MEMBER_SERVER),
        servers("grid_secondaries", MEMBER_SERVER),
        servers("external_primaries", EXTERNAL_SERVER),
        servers("external_secondaries", EXTERNAL_SERVER),
        FieldSpec::optional("rpz_policy", FieldKind::String).checks(&[Check::OneOf(&[
            "DISABLED",
            "GIVEN",
            "NODATA",
            "NXDOMAIN",
            "PASSTHRU",
            "SUBSTITUTE",
        ])]),
        FieldSpec::optional("rpz_severity", FieldKind::String).checks(&[Check::OneOf(&[
            "CRITICAL",
            "MAJOR",
            "WARNING",
            "INFORMATIONAL",
        ])]),
        FieldSpec::optional("rpz_type", FieldKind::String)
            .create_only()
            .checks(&[Check::OneOf(&["LOCAL", "FEED", "FIREEYE"])]),
        FieldSpec::optional("substitute_name", FieldKind::String),
        FieldSpec::optional("record_parent_ttl", FieldKind::Int),
        FieldSpec::optional("use_grid_zone_timer", FieldKind::Bool),
        soa_timer("soa_default_ttl"),
        soa_timer("soa_expire"),
        soa_timer("soa_negative_ttl"),
        soa_timer("soa_refresh"),
        soa_timer("soa_retry"),
        FieldSpec::computed("rpz_last_updated_time", FieldKind::Int),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[
        Rule::ConflictsWith(&["ns_group", "grid_primary"]),
        Rule::AlsoRequires {
            field: "substitute_name",
            requires: &["rpz_policy"],
        },
        Rule::RequiresTrue {
            fields: SOA_TIMERS,
            flag: "use_grid_zone_timer",
        },
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::flex::json_to_dynamic;
    use serde_json::json;
    use tfplug::types::DynamicValue;
    use tfplug::validator::validate_config;

    fn config(v: serde_json::Value) -> DynamicValue {
        DynamicValue::new(json_to_dynamic(&v))
    }

    #[test]
    fn soa_timers_need_grid_timer_override() {
        let schema = ZONE_AUTH.schema();
        let diags = validate_config(
            &schema,
            &config(json!({"fqdn": "example.com", "soa_refresh": 3600})),
        );
        assert_eq!(diags.len(), 1);
        assert!(diags[0].detail.contains("use_grid_zone_timer"));

        let diags = validate_config(
            &schema,
            &config(json!({
                "fqdn": "example.com",
                "soa_refresh": 3600,
                "use_grid_zone_timer": true
            })),
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn ns_group_conflicts_with_explicit_primary() {
        let diags = validate_config(
            &ZONE_AUTH.schema(),
            &config(json!({
                "fqdn": "example.com",
                "ns_group": "default",
                "grid_primary": [{"name": "infoblox.localdomain"}]
            })),
        );
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn zone_format_is_checked() {
        let diags = validate_config(
            &ZONE_AUTH.schema(),
            &config(json!({"fqdn": "10.in-addr.arpa", "zone_format": "IPV5"})),
        );
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn delegation_needs_exactly_one_target() {
        let schema = ZONE_DELEGATED.schema();
        assert_eq!(
            validate_config(&schema, &config(json!({"fqdn": "sub.example.com"}))).len(),
            1
        );
        assert!(validate_config(
            &schema,
            &config(json!({"fqdn": "sub.example.com", "ns_group": "delegation"}))
        )
        .is_empty());
    }
}
