//! Shared record groups and the records that live in them

use super::{comment, disable, dns_name, name, ttl, use_ttl};
use crate::resources::descriptor::{Check, DefaultValue, FieldKind, FieldSpec, ObjectDescriptor};

const ZONE_ASSOCIATION: &[FieldSpec] = &[
    FieldSpec::required("fqdn", FieldKind::String),
    FieldSpec::optional("view", FieldKind::String).default(DefaultValue::Str("default")),
];

const fn shared_record_group() -> FieldSpec {
    FieldSpec::required("shared_record_group", FieldKind::String)
        .replace()
        .doc("Shared record group holding the record")
}

pub static SHAREDRECORDGROUP: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_sharedrecordgroup",
    object_type: "sharedrecordgroup",
    description: "Manages a shared record group",
    fields: &[
        name(),
        comment(),
        FieldSpec::optional(
            "zone_associations",
            FieldKind::ObjectList {
                fields: ZONE_ASSOCIATION,
                key: Some("fqdn"),
            },
        ),
        FieldSpec::optional("record_name_policy", FieldKind::String),
        FieldSpec::optional("use_record_name_policy", FieldKind::Bool),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[],
};

pub static SHAREDRECORD_A: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_sharedrecord_a",
    object_type: "sharedrecord:a",
    description: "Manages a shared A record",
    fields: &[
        name(),
        FieldSpec::required("ipv4addr", FieldKind::Ipv4).checks(&[Check::Ipv4]),
        shared_record_group(),
        comment(),
        disable(),
        ttl(),
        use_ttl(),
        dns_name(),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[],
};

pub static SHAREDRECORD_AAAA: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_sharedrecord_aaaa",
    object_type: "sharedrecord:aaaa",
    description: "Manages a shared AAAA record",
    fields: &[
        name(),
        FieldSpec::required("ipv6addr", FieldKind::Ipv6).checks(&[Check::Ipv6]),
        shared_record_group(),
        comment(),
        disable(),
        ttl(),
        use_ttl(),
        dns_name(),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[],
};

pub static SHAREDRECORD_CNAME: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_sharedrecord_cname",
    object_type: "sharedrecord:cname",
    description: "Manages a shared CNAME record",
    fields: &[
        name(),
        FieldSpec::required("canonical", FieldKind::String),
        shared_record_group(),
        comment(),
        disable(),
        ttl(),
        use_ttl(),
        dns_name(),
        FieldSpec::computed("dns_canonical", FieldKind::String),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[],
};

pub static SHAREDRECORD_MX: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_sharedrecord_mx",
    object_type: "sharedrecord:mx",
    description: "Manages a shared MX record",
    fields: &[
        name(),
        FieldSpec::required("mail_exchanger", FieldKind::String),
        FieldSpec::required("preference", FieldKind::Int).checks(&[Check::IntRange(0, 65535)]),
        shared_record_group(),
        comment(),
        disable(),
        ttl(),
        use_ttl(),
        dns_name(),
        FieldSpec::computed("dns_mail_exchanger", FieldKind::String),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[],
};

pub static SHAREDRECORD_SRV: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_sharedrecord_srv",
    object_type: "sharedrecord:srv",
    description: "Manages a shared SRV record",
    fields: &[
        name(),
        FieldSpec::required("priority", FieldKind::Int).checks(&[Check::IntRange(0, 65535)]),
        FieldSpec::required("weight", FieldKind::Int).checks(&[Check::IntRange(0, 65535)]),
        FieldSpec::required("port", FieldKind::Int).checks(&[Check::IntRange(0, 65535)]),
        FieldSpec::required("target", FieldKind::String),
        shared_record_group(),
        comment(),
        disable(),
        ttl(),
        use_ttl(),
        dns_name(),
        FieldSpec::computed("dns_target", FieldKind::String),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[],
};

pub static SHAREDRECORD_TXT: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_sharedrecord_txt",
    object_type: "sharedrecord:txt",
    description: "Manages a shared TXT record",
    fields: &[
        name(),
        FieldSpec::required("text", FieldKind::String),
        shared_record_group(),
        comment(),
        disable(),
        ttl(),
        use_ttl(),
        dns_name(),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[],
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::codec::{expand, WriteMode};
    use crate::utils::flex::json_to_dynamic;
    use serde_json::json;
    use tfplug::types::DynamicValue;

    #[test]
    fn group_body_carries_zone_associations() {
        let plan = DynamicValue::new(json_to_dynamic(&json!({
            "name": "common",
            "zone_associations": [{"fqdn": "example.com", "view": "default"}]
        })));
        let body = expand(&SHAREDRECORDGROUP, &plan, WriteMode::Create).unwrap();
        assert_eq!(
            body["zone_associations"],
            json!([{"fqdn": "example.com", "view": "default"}])
        );
    }

    #[test]
    fn shared_records_cannot_move_groups() {
        for desc in [
            &SHAREDRECORD_A,
            &SHAREDRECORD_AAAA,
            &SHAREDRECORD_CNAME,
            &SHAREDRECORD_MX,
            &SHAREDRECORD_SRV,
            &SHAREDRECORD_TXT,
        ] {
            let field = desc.field("shared_record_group").unwrap();
            assert!(field.replace, "{}", desc.type_name);
        }
    }
}
