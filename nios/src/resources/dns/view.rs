use super::{comment, disable};
use crate::resources::descriptor::{Check, DefaultValue, FieldKind, FieldSpec, ObjectDescriptor, Rule};

pub static VIEW: ObjectDescriptor = ObjectDescriptor {
    type_name: "nios_dns_view",
    object_type: "view",
    description: "Manages a DNS view",
    fields: &[
        FieldSpec::required("name", FieldKind::String).checks(&[Check::NoSurroundingSpace]),
        FieldSpec::optional("network_view", FieldKind::String)
            .default(DefaultValue::Str("default"))
            .replace(),
        comment(),
        disable(),
        FieldSpec::optional("recursion", FieldKind::Bool),
        FieldSpec::optional("forwarders", FieldKind::StringList { ordered: true })
            .doc("Forwarders in order of preference"),
        FieldSpec::optional("forward_only", FieldKind::Bool),
        FieldSpec::optional("lame_ttl", FieldKind::Int)
            .use_flag("use_lame_ttl")
            .checks(&[Check::IntRange(0, 1800)]),
        FieldSpec::optional("use_lame_ttl", FieldKind::Bool),
        FieldSpec::optional("root_name_server_type", FieldKind::String)
            .checks(&[Check::OneOf(&["CUSTOM", "INTERNET"])]),
        FieldSpec::computed("is_default", FieldKind::Bool),
    ],
    supports_extattrs: true,
    import_attaches_internal_id: true,
    function_call_fields: &[],
    rules: &[Rule::AlsoRequires {
        field: "forward_only",
        requires: &["forwarders"],
    }],
};
