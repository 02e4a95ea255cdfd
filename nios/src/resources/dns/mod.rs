//! DNS object types

pub mod nsgroups;
pub mod records;
pub mod shared;
pub mod view;
pub mod zones;

use super::descriptor::{Check, DefaultValue, FieldKind, FieldSpec};

pub(crate) const fn name() -> FieldSpec {
    FieldSpec::required("name", FieldKind::String)
        .checks(&[Check::NoSurroundingSpace])
        .doc("Name of the object")
}

pub(crate) const fn view() -> FieldSpec {
    FieldSpec::optional("view", FieldKind::String)
        .default(DefaultValue::Str("default"))
        .replace()
        .doc("DNS view the object lives in")
}

pub(crate) const fn comment() -> FieldSpec {
    FieldSpec::optional("comment", FieldKind::String)
        .checks(&[Check::MaxLen(256)])
        .doc("Comment, up to 256 characters")
}

pub(crate) const fn disable() -> FieldSpec {
    FieldSpec::optional("disable", FieldKind::Bool)
        .default(DefaultValue::Bool(false))
        .doc("Disable the object")
}

pub(crate) const fn ttl() -> FieldSpec {
    FieldSpec::optional("ttl", FieldKind::Int)
        .use_flag("use_ttl")
        .checks(&[Check::IntRange(0, 4_294_967_295)])
        .doc("Time to live in seconds")
}

pub(crate) const fn use_ttl() -> FieldSpec {
    FieldSpec::optional("use_ttl", FieldKind::Bool).doc("Use the ttl set on the object")
}

pub(crate) const fn creator() -> FieldSpec {
    FieldSpec::optional("creator", FieldKind::String)
        .default(DefaultValue::Str("STATIC"))
        .checks(&[Check::OneOf(&["STATIC", "DYNAMIC", "SYSTEM"])])
}

pub(crate) const fn ddns_protected() -> FieldSpec {
    FieldSpec::optional("ddns_protected", FieldKind::Bool)
        .doc("Protect the record from dynamic DNS updates")
}

pub(crate) const fn zone() -> FieldSpec {
    FieldSpec::computed("zone", FieldKind::String).doc("Zone that contains the record")
}

pub(crate) const fn dns_name() -> FieldSpec {
    FieldSpec::computed("dns_name", FieldKind::String).doc("Name in punycode format")
}

pub(crate) const fn fqdn() -> FieldSpec {
    FieldSpec::required("fqdn", FieldKind::String)
        .replace()
        .checks(&[Check::NoSurroundingSpace])
        .doc("Fully qualified name of the zone")
}

pub(crate) const fn zone_format() -> FieldSpec {
    FieldSpec::optional("zone_format", FieldKind::String)
        .default(DefaultValue::Str("FORWARD"))
        .replace()
        .checks(&[Check::OneOf(&["FORWARD", "IPV4", "IPV6"])])
}

pub(crate) const fn prefix() -> FieldSpec {
    FieldSpec::optional("prefix", FieldKind::String)
        .create_only()
        .doc("RFC 2317 prefix for classless reverse zones")
}

pub(crate) const fn locked() -> FieldSpec {
    FieldSpec::optional("locked", FieldKind::Bool)
}

/// External name server (`extserver` struct)
pub const EXTERNAL_SERVER: &[FieldSpec] = &[
    FieldSpec::required("name", FieldKind::String),
    FieldSpec::required("address", FieldKind::Ipv4).checks(&[Check::Ipv4]),
    FieldSpec::optional("stealth", FieldKind::Bool),
    FieldSpec::optional("tsig_key", FieldKind::String).sensitive(),
    FieldSpec::optional("tsig_key_alg", FieldKind::String)
        .checks(&[Check::OneOf(&["HMAC-MD5", "HMAC-SHA256"])]),
    FieldSpec::optional("tsig_key_name", FieldKind::String),
    FieldSpec::optional("use_tsig_key_name", FieldKind::Bool),
];

/// Grid member acting as a name server (`memberserver` struct)
pub const MEMBER_SERVER: &[FieldSpec] = &[
    FieldSpec::required("name", FieldKind::String),
    FieldSpec::optional("grid_replicate", FieldKind::Bool),
    FieldSpec::optional("lead", FieldKind::Bool),
    FieldSpec::optional("stealth", FieldKind::Bool),
];

/// Forwarding target (`forwardingmemberserver.forward_to`)
pub const FORWARD_TARGET: &[FieldSpec] = &[
    FieldSpec::required("name", FieldKind::String),
    FieldSpec::required("address", FieldKind::Ipv4).checks(&[Check::Ipv4]),
];

/// Grid member forwarding a zone (`forwardingmemberserver` struct)
pub const FORWARDING_MEMBER: &[FieldSpec] = &[
    FieldSpec::required("name", FieldKind::String),
    FieldSpec::optional("forwarders_only", FieldKind::Bool),
    FieldSpec::optional("use_override_forwarders", FieldKind::Bool),
    FieldSpec::optional(
        "forward_to",
        FieldKind::ObjectList {
            fields: FORWARD_TARGET,
            key: Some("name"),
        },
    ),
];

pub(crate) const fn servers(name: &'static str, fields: &'static [FieldSpec]) -> FieldSpec {
    FieldSpec::optional(
        name,
        FieldKind::ObjectList {
            fields,
            key: Some("name"),
        },
    )
}
