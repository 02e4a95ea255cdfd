use crate::resources::descriptor::{Check, DefaultValue, FieldKind, FieldSpec, ObjectDescriptor, Rule};
use crate::resources::dns::{comment, disable, dns_name, name, ttl, use_ttl, view, zone};

const HOST_IPV4: &[FieldSpec] = &[
    FieldSpec::computed("ref", FieldKind::String).api("_ref"),
    FieldSpec::required("ipv4addr", FieldKind::Ipv4).checks(&[Check::Ipv4]),
    FieldSpec::optional("mac", FieldKind::String),
    FieldSpec::optional("configure_for_dhcp", FieldKind::Bool),
    FieldSpec::computed("host", FieldKind::String),
];

const HOST_IPV6: &[FieldSpec] = &[
    FieldSpec::computed("ref", FieldKind::String).api("_ref"),
    FieldSpec::required("ipv6addr", FieldKind::Ipv6).checks(&[Check::Ipv6]),
    FieldSpec::optional("duid", FieldKind::String),
    FieldSpec::optional("configure_for_dhcp", FieldKind::Bool),
    FieldSpec::computed("host", FieldKind::String),
];

/// `record:host` with its address lists
pub static HOST: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_ip_allocation",
    object_type: "record:host",
    description: "Allocates IP addresses to a host record",
    fields: &[
        name(),
        FieldSpec::optional(
            "ipv4addrs",
            FieldKind::ObjectList {
                fields: HOST_IPV4,
                key: Some("ipv4addr"),
            },
        ),
        FieldSpec::optional(
            "ipv6addrs",
            FieldKind::ObjectList {
                fields: HOST_IPV6,
                key: Some("ipv6addr"),
            },
        ),
        view(),
        FieldSpec::optional("network_view", FieldKind::String).replace(),
        FieldSpec::optional("configure_for_dns", FieldKind::Bool)
            .default(DefaultValue::Bool(true))
            .doc("Create the host in DNS as well as IPAM"),
        FieldSpec::optional("aliases", FieldKind::StringList { ordered: false }),
        comment(),
        disable(),
        ttl(),
        use_ttl(),
        FieldSpec::optional("restart_if_needed", FieldKind::Bool).write_only(),
        zone(),
        dns_name(),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[Rule::AtLeastOneOf(&["ipv4addrs", "ipv6addrs"])],
};
