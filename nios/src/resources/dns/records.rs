//! Resource records

use super::{comment, creator, ddns_protected, disable, dns_name, name, ttl, use_ttl, view, zone};
use crate::resources::descriptor::{Check, FieldKind, FieldSpec, ObjectDescriptor, Rule};

const fn ipv4addr() -> FieldSpec {
    FieldSpec::optional("ipv4addr", FieldKind::Ipv4)
        .checks(&[Check::Ipv4])
        .doc("IPv4 address, or allocate one with func_call")
}

const fn ipv6addr() -> FieldSpec {
    FieldSpec::optional("ipv6addr", FieldKind::Ipv6)
        .checks(&[Check::Ipv6])
        .doc("IPv6 address, or allocate one with func_call")
}

const fn port_range(name: &'static str) -> FieldSpec {
    FieldSpec::required(name, FieldKind::Int).checks(&[Check::IntRange(0, 65535)])
}

const fn forbid_reclamation() -> FieldSpec {
    FieldSpec::optional("forbid_reclamation", FieldKind::Bool)
}

pub static RECORD_A: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_record_a",
    object_type: "record:a",
    description: "Manages an A record",
    fields: &[
        name(),
        ipv4addr(),
        view(),
        comment(),
        disable(),
        ttl(),
        use_ttl(),
        creator(),
        ddns_protected(),
        forbid_reclamation(),
        zone(),
        dns_name(),
        FieldSpec::computed("creation_time", FieldKind::Int),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &["ipv4addr"],
    rules: &[Rule::ExactlyOneOf(&["ipv4addr", "func_call"])],
};

pub static RECORD_AAAA: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_record_aaaa",
    object_type: "record:aaaa",
    description: "Manages an AAAA record",
    fields: &[
        name(),
        ipv6addr(),
        view(),
        comment(),
        disable(),
        ttl(),
        use_ttl(),
        creator(),
        ddns_protected(),
        forbid_reclamation(),
        zone(),
        dns_name(),
        FieldSpec::computed("creation_time", FieldKind::Int),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &["ipv6addr"],
    rules: &[Rule::ExactlyOneOf(&["ipv6addr", "func_call"])],
};

pub static RECORD_CNAME: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_record_cname",
    object_type: "record:cname",
    description: "Manages a CNAME record",
    fields: &[
        name(),
        FieldSpec::required("canonical", FieldKind::String).checks(&[Check::NoSurroundingSpace]),
        view(),
        comment(),
        disable(),
        ttl(),
        use_ttl(),
        creator(),
        ddns_protected(),
        forbid_reclamation(),
        zone(),
        dns_name(),
        FieldSpec::computed("dns_canonical", FieldKind::String),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[],
};

pub static RECORD_MX: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_record_mx",
    object_type: "record:mx",
    description: "Manages an MX record",
    fields: &[
        name(),
        FieldSpec::required("mail_exchanger", FieldKind::String),
        port_range("preference"),
        view(),
        comment(),
        disable(),
        ttl(),
        use_ttl(),
        creator(),
        ddns_protected(),
        forbid_reclamation(),
        zone(),
        dns_name(),
        FieldSpec::computed("dns_mail_exchanger", FieldKind::String),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[],
};

pub static RECORD_PTR: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_record_ptr",
    object_type: "record:ptr",
    description: "Manages a PTR record",
    fields: &[
        FieldSpec::required("ptrdname", FieldKind::String).checks(&[Check::NoSurroundingSpace]),
        FieldSpec::optional("name", FieldKind::String)
            .doc("Reverse name, derived from the address when omitted"),
        ipv4addr(),
        ipv6addr(),
        view(),
        comment(),
        disable(),
        ttl(),
        use_ttl(),
        creator(),
        ddns_protected(),
        forbid_reclamation(),
        zone(),
        FieldSpec::computed("dns_ptrdname", FieldKind::String),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &["ipv4addr", "ipv6addr"],
    rules: &[
        Rule::AtLeastOneOf(&["name", "ipv4addr", "ipv6addr", "func_call"]),
        Rule::ConflictsWith(&["ipv4addr", "ipv6addr", "func_call"]),
    ],
};

pub static RECORD_TXT: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_record_txt",
    object_type: "record:txt",
    description: "Manages a TXT record",
    fields: &[
        name(),
        FieldSpec::required("text", FieldKind::String),
        view(),
        comment(),
        disable(),
        ttl(),
        use_ttl(),
        creator(),
        ddns_protected(),
        forbid_reclamation(),
        zone(),
        dns_name(),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[],
};

pub static RECORD_SRV: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_record_srv",
    object_type: "record:srv",
    description: "Manages an SRV record",
    fields: &[
        name(),
        port_range("priority"),
        port_range("weight"),
        port_range("port"),
        FieldSpec::required("target", FieldKind::String),
        view(),
        comment(),
        disable(),
        ttl(),
        use_ttl(),
        creator(),
        ddns_protected(),
        forbid_reclamation(),
        zone(),
        dns_name(),
        FieldSpec::computed("dns_target", FieldKind::String),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[],
};

const NS_ADDRESS: &[FieldSpec] = &[
    FieldSpec::required("address", FieldKind::Ipv4).checks(&[Check::Ipv4]),
    FieldSpec::optional("auto_create_ptr", FieldKind::Bool),
];

/// NS records carry no extensible attributes
pub static RECORD_NS: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_record_ns",
    object_type: "record:ns",
    description: "Manages an NS record",
    fields: &[
        name().replace(),
        FieldSpec::required("nameserver", FieldKind::String).replace(),
        FieldSpec::required(
            "addresses",
            FieldKind::ObjectList {
                fields: NS_ADDRESS,
                key: Some("address"),
            },
        ),
        view(),
        creator(),
        FieldSpec::computed("dns_name", FieldKind::String),
        FieldSpec::computed("ms_delegation_name", FieldKind::String),
        FieldSpec::computed("policy", FieldKind::String),
    ],
    supports_extattrs: false,
    import_attaches_internal_id: false,
    function_call_fields: &[],
    rules: &[],
};

pub static RECORD_CAA: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_record_caa",
    object_type: "record:caa",
    description: "Manages a CAA record",
    fields: &[
        name(),
        FieldSpec::required("ca_flag", FieldKind::Int).checks(&[Check::IntRange(0, 255)]),
        FieldSpec::required("ca_tag", FieldKind::String)
            .checks(&[Check::OneOf(&["issue", "issuewild", "iodef"])]),
        FieldSpec::required("ca_value", FieldKind::String),
        view(),
        comment(),
        disable(),
        ttl(),
        use_ttl(),
        creator(),
        ddns_protected(),
        forbid_reclamation(),
        zone(),
        dns_name(),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[],
};

pub static RECORD_ALIAS: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_record_alias",
    object_type: "record:alias",
    description: "Manages an ALIAS record",
    fields: &[
        name(),
        FieldSpec::required("target_name", FieldKind::String),
        FieldSpec::required("target_type", FieldKind::String).checks(&[Check::OneOf(&[
            "A", "AAAA", "MX", "NAPTR", "PTR", "SPF", "SRV", "TXT",
        ])]),
        view(),
        comment(),
        disable(),
        ttl(),
        use_ttl(),
        creator(),
        zone(),
        dns_name(),
        FieldSpec::computed("dns_target_name", FieldKind::String),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[],
};

pub static RECORD_DNAME: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_record_dname",
    object_type: "record:dname",
    description: "Manages a DNAME record",
    fields: &[
        name(),
        FieldSpec::required("target", FieldKind::String),
        view(),
        comment(),
        disable(),
        ttl(),
        use_ttl(),
        creator(),
        ddns_protected(),
        forbid_reclamation(),
        zone(),
        dns_name(),
        FieldSpec::computed("dns_target", FieldKind::String),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[],
};
