//! Name server groups

use super::{
    comment, servers, EXTERNAL_SERVER, FORWARDING_MEMBER, FORWARD_TARGET, MEMBER_SERVER,
};
use crate::resources::descriptor::{Check, FieldKind, FieldSpec, ObjectDescriptor, Rule};

const fn group_name() -> FieldSpec {
    FieldSpec::required("name", FieldKind::String)
        .checks(&[Check::NoSurroundingSpace])
        .doc("Name of the group")
}

pub static NSGROUP: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_nsgroup",
    object_type: "nsgroup",
    description: "Manages a name server group",
    fields: &[
        group_name(),
        comment(),
        servers("grid_primary", MEMBER_SERVER),
        servers("grid_secondaries", MEMBER_SERVER),
        servers("external_primaries", EXTERNAL_SERVER),
        servers("external_secondaries", EXTERNAL_SERVER),
        FieldSpec::optional("use_external_primary", FieldKind::Bool),
        FieldSpec::optional("is_grid_default", FieldKind::Bool),
        FieldSpec::computed("is_multimaster", FieldKind::Bool),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[
        Rule::RequiresTrue {
            fields: &["external_primaries"],
            flag: "use_external_primary",
        },
        Rule::AtLeastOneOf(&["grid_primary", "external_primaries"]),
    ],
};

pub static NSGROUP_FORWARDINGMEMBER: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_nsgroup_forwardingmember",
    object_type: "nsgroup:forwardingmember",
    description: "Manages a forwarding member name server group",
    fields: &[
        group_name(),
        comment(),
        FieldSpec::required(
            "forwarding_servers",
            FieldKind::ObjectList {
                fields: FORWARDING_MEMBER,
                key: Some("name"),
            },
        ),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[],
};

pub static NSGROUP_DELEGATION: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_nsgroup_delegation",
    object_type: "nsgroup:delegation",
    description: "Manages a delegation name server group",
    fields: &[
        group_name(),
        comment(),
        FieldSpec::required(
            "delegate_to",
            FieldKind::ObjectList {
                fields: EXTERNAL_SERVER,
                key: Some("name"),
            },
        ),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[],
};

pub static NSGROUP_STUBMEMBER: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_nsgroup_stubmember",
    object_type: "nsgroup:stubmember",
    description: "Manages a stub member name server group",
    fields: &[
        group_name(),
        comment(),
        FieldSpec::required(
            "stub_members",
            FieldKind::ObjectList {
                fields: MEMBER_SERVER,
                key: Some("name"),
            },
        ),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[],
};

pub static NSGROUP_FORWARDSTUBSERVER: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_nsgroup_forwardstubserver",
    object_type: "nsgroup:forwardstubserver",
    description: "Manages a forward/stub server name server group",
    fields: &[
        group_name(),
        comment(),
        FieldSpec::required(
            "external_servers",
            FieldKind::ObjectList {
                fields: FORWARD_TARGET,
                key: Some("name"),
            },
        ),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[],
};
