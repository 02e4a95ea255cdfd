//! Static per-object-type tables
//!
//! Every WAPI object type the provider manages is described by one
//! [`ObjectDescriptor`]: the Terraform attribute names, the WAPI field each
//! maps to, the value kind, and the flags that drive schema generation,
//! request building and response flattening. The engine in
//! [`super::engine`] interprets these tables; no object type has its own
//! codec.

use std::collections::HashMap;
use std::sync::Arc;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::schema::{
    Attribute, AttributeBuilder, AttributeType, ConfigValidator, NestedType, ObjectNestingMode,
    Schema, SchemaBuilder,
};
use tfplug::types::Dynamic;
use tfplug::validator::{
    AlsoRequires, AtLeastOneOf, ConflictsWith, ExactlyOneOf, IpAddressValidator, IpFamily,
    NoSurroundingWhitespaceValidator, NumberRangeValidator, OneOfValidator, RequiresTrue,
    StringLengthValidator,
};

pub const REF: &str = "ref";
pub const EXTATTRS: &str = "extattrs";
pub const EXTATTRS_ALL: &str = "extattrs_all";
pub const FUNC_CALL: &str = "func_call";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Str(&'static str),
    Bool(bool),
    Int(i64),
}

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    String,
    Bool,
    Int,
    Ipv4,
    Ipv6,
    /// `ordered: false` lists are realigned to plan order after reads
    StringList { ordered: bool },
    Object(&'static [FieldSpec]),
    /// `key` names the member attribute used to realign the list
    ObjectList {
        fields: &'static [FieldSpec],
        key: Option<&'static str>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    /// Optional and computed: the appliance fills in what the user omits
    Optional,
    Computed,
}

#[derive(Debug, Clone, Copy)]
pub enum Check {
    OneOf(&'static [&'static str]),
    IntRange(i64, i64),
    Ipv4,
    Ipv6,
    NoSurroundingSpace,
    MaxLen(usize),
}

#[derive(Debug, Clone, Copy)]
pub enum Rule {
    ConflictsWith(&'static [&'static str]),
    ExactlyOneOf(&'static [&'static str]),
    AtLeastOneOf(&'static [&'static str]),
    RequiresTrue {
        fields: &'static [&'static str],
        flag: &'static str,
    },
    AlsoRequires {
        field: &'static str,
        requires: &'static [&'static str],
    },
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub api_name: &'static str,
    pub kind: FieldKind,
    pub presence: Presence,
    pub replace: bool,
    pub create_only: bool,
    pub write_only: bool,
    pub sensitive: bool,
    pub default: Option<DefaultValue>,
    /// Companion `use_*` flag WAPI needs set for this field to take effect
    pub use_flag: Option<&'static str>,
    pub checks: &'static [Check],
    pub description: &'static str,
}

impl FieldSpec {
    const fn new(name: &'static str, kind: FieldKind, presence: Presence) -> Self {
        Self {
            name,
            api_name: name,
            kind,
            presence,
            replace: false,
            create_only: false,
            write_only: false,
            sensitive: false,
            default: None,
            use_flag: None,
            checks: &[],
            description: "",
        }
    }

    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self::new(name, kind, Presence::Required)
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self::new(name, kind, Presence::Optional)
    }

    pub const fn computed(name: &'static str, kind: FieldKind) -> Self {
        Self::new(name, kind, Presence::Computed)
    }

    /// WAPI field name when it differs from the attribute name
    pub const fn api(mut self, api_name: &'static str) -> Self {
        self.api_name = api_name;
        self
    }

    pub const fn replace(mut self) -> Self {
        self.replace = true;
        self
    }

    pub const fn create_only(mut self) -> Self {
        self.create_only = true;
        self
    }

    /// Sent to WAPI but never returned; state keeps the planned value
    pub const fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    pub const fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub const fn default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    pub const fn use_flag(mut self, flag: &'static str) -> Self {
        self.use_flag = Some(flag);
        self
    }

    pub const fn checks(mut self, checks: &'static [Check]) -> Self {
        self.checks = checks;
        self
    }

    pub const fn doc(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn attribute_type(&self) -> AttributeType {
        match self.kind {
            FieldKind::String | FieldKind::Ipv4 | FieldKind::Ipv6 => AttributeType::String,
            FieldKind::Bool => AttributeType::Bool,
            FieldKind::Int => AttributeType::Number,
            FieldKind::StringList { .. } => AttributeType::List(Box::new(AttributeType::String)),
            FieldKind::Object(fields) => object_type(fields),
            FieldKind::ObjectList { fields, .. } => {
                AttributeType::List(Box::new(object_type(fields)))
            }
        }
    }

    fn to_attribute(&self) -> Attribute {
        let mut builder =
            AttributeBuilder::new(self.name, self.attribute_type()).description(self.description);

        builder = match self.presence {
            Presence::Required => builder.required(),
            Presence::Optional => builder.optional().computed(),
            Presence::Computed => builder
                .computed()
                .plan_modifier(Arc::new(UseStateForUnknown)),
        };

        if self.replace {
            builder = builder.plan_modifier(Arc::new(RequiresReplace));
        }
        if self.sensitive {
            builder = builder.sensitive();
        }
        if let Some(default) = self.default {
            builder = builder.default(StaticDefault::create(default.to_dynamic()));
        }
        for check in self.checks {
            builder = match *check {
                Check::OneOf(values) => builder.validator(Arc::new(OneOfValidator::new(values))),
                Check::IntRange(min, max) => builder.validator(Arc::new(NumberRangeValidator {
                    min: Some(min as f64),
                    max: Some(max as f64),
                })),
                Check::Ipv4 => builder.validator(Arc::new(IpAddressValidator {
                    family: IpFamily::V4,
                })),
                Check::Ipv6 => builder.validator(Arc::new(IpAddressValidator {
                    family: IpFamily::V6,
                })),
                Check::NoSurroundingSpace => {
                    builder.validator(Arc::new(NoSurroundingWhitespaceValidator))
                }
                Check::MaxLen(max) => builder.validator(Arc::new(StringLengthValidator {
                    min: None,
                    max: Some(max),
                })),
            };
        }

        match self.kind {
            FieldKind::Object(fields) => {
                builder = builder.nested_type(nested(fields, ObjectNestingMode::Single))
            }
            FieldKind::ObjectList { fields, .. } => {
                builder = builder.nested_type(nested(fields, ObjectNestingMode::List))
            }
            _ => {}
        }

        builder.build()
    }
}

impl DefaultValue {
    pub fn to_dynamic(self) -> Dynamic {
        match self {
            DefaultValue::Str(s) => Dynamic::string(s),
            DefaultValue::Bool(b) => Dynamic::Bool(b),
            DefaultValue::Int(i) => Dynamic::Number(i as f64),
        }
    }
}

fn object_type(fields: &[FieldSpec]) -> AttributeType {
    AttributeType::Object(
        fields
            .iter()
            .map(|f| (f.name.to_string(), f.attribute_type()))
            .collect::<HashMap<_, _>>(),
    )
}

fn nested(fields: &[FieldSpec], nesting: ObjectNestingMode) -> NestedType {
    NestedType {
        attributes: fields.iter().map(FieldSpec::to_attribute).collect(),
        nesting,
    }
}

impl Rule {
    fn to_validator(self) -> Arc<dyn ConfigValidator> {
        let owned = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();
        match self {
            Rule::ConflictsWith(names) => Arc::new(ConflictsWith {
                attributes: owned(names),
            }),
            Rule::ExactlyOneOf(names) => Arc::new(ExactlyOneOf {
                attributes: owned(names),
            }),
            Rule::AtLeastOneOf(names) => Arc::new(AtLeastOneOf {
                attributes: owned(names),
            }),
            Rule::RequiresTrue { fields, flag } => Arc::new(RequiresTrue {
                attributes: owned(fields),
                flag: flag.to_string(),
            }),
            Rule::AlsoRequires { field, requires } => Arc::new(AlsoRequires {
                attribute: field.to_string(),
                requires: owned(requires),
            }),
        }
    }
}

/// One WAPI object type exposed as a resource and a list data source
#[derive(Debug)]
pub struct ObjectDescriptor {
    pub type_name: &'static str,
    pub object_type: &'static str,
    pub description: &'static str,
    pub fields: &'static [FieldSpec],
    pub supports_extattrs: bool,
    /// Import writes the tracking EA onto the object straight away
    pub import_attaches_internal_id: bool,
    /// Fields that may be allocated with a WAPI function call
    pub function_call_fields: &'static [&'static str],
    pub rules: &'static [Rule],
}

impl ObjectDescriptor {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn schema(&self) -> Schema {
        let mut builder = SchemaBuilder::new()
            .version(0)
            .description(self.description)
            .attribute(
                AttributeBuilder::new(REF, AttributeType::String)
                    .description("WAPI reference of the object")
                    .computed()
                    .plan_modifier(Arc::new(UseStateForUnknown))
                    .build(),
            );

        for field in self.fields {
            builder = builder.attribute(field.to_attribute());
        }

        if self.supports_extattrs {
            builder = builder
                .attribute(
                    AttributeBuilder::new(EXTATTRS, AttributeType::Map(Box::new(AttributeType::String)))
                        .description("Extensible attributes managed by Terraform")
                        .optional()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new(
                        EXTATTRS_ALL,
                        AttributeType::Map(Box::new(AttributeType::String)),
                    )
                    .description("All extensible attributes, including inherited ones")
                    .computed()
                    .build(),
                );
        }

        if !self.function_call_fields.is_empty() {
            builder = builder.attribute(func_call_attribute(self.function_call_fields));
        }

        for rule in self.rules {
            builder = builder.config_validator(rule.to_validator());
        }

        builder.build()
    }

    /// Attribute types of one object as the list data source reports it
    pub fn result_object_type(&self) -> AttributeType {
        let mut types: HashMap<String, AttributeType> = self
            .fields
            .iter()
            .filter(|f| !f.write_only)
            .map(|f| (f.name.to_string(), f.attribute_type()))
            .collect();
        types.insert(REF.to_string(), AttributeType::String);
        if self.supports_extattrs {
            let map = AttributeType::Map(Box::new(AttributeType::String));
            types.insert(EXTATTRS.to_string(), map.clone());
            types.insert(EXTATTRS_ALL.to_string(), map);
        }
        AttributeType::Object(types)
    }

    pub fn data_source_schema(&self) -> Schema {
        let string_map = || AttributeType::Map(Box::new(AttributeType::String));
        let mut builder = SchemaBuilder::new()
            .version(0)
            .description(self.description)
            .attribute(
                AttributeBuilder::new("filters", string_map())
                    .description("Search filters, WAPI field name to value")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "result",
                    AttributeType::List(Box::new(self.result_object_type())),
                )
                .description("Matching objects")
                .computed()
                .build(),
            );
        if self.supports_extattrs {
            builder = builder.attribute(
                AttributeBuilder::new("extattrfilters", string_map())
                    .description("Extensible attribute filters, name to value")
                    .optional()
                    .build(),
            );
        }
        builder.build()
    }
}

pub const FUNC_CALL_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("attribute_name", FieldKind::String)
        .doc("Attribute that receives the function result, e.g. ipv4addr"),
    FieldSpec::optional("object_function", FieldKind::String)
        .default(DefaultValue::Str("next_available_ip")),
    FieldSpec::optional("object", FieldKind::String)
        .doc("Object type the function runs on, e.g. network"),
    FieldSpec::optional("result_field", FieldKind::String).default(DefaultValue::Str("ips")),
    FieldSpec::optional("object_parameters", FieldKind::String)
        .doc("JSON object selecting the object, e.g. {\"network\": \"10.0.0.0/24\"}"),
    FieldSpec::optional("parameters", FieldKind::String)
        .doc("JSON object with function parameters, e.g. {\"exclude\": [\"10.0.0.1\"]}"),
];

fn func_call_attribute(targets: &[&str]) -> Attribute {
    let mut nested_type = nested(FUNC_CALL_FIELDS, ObjectNestingMode::Single);
    for attribute in nested_type.attributes.iter_mut() {
        if attribute.name == "attribute_name" {
            attribute.validators.push(Arc::new(OneOfValidator::new(targets)));
        }
    }

    AttributeBuilder::new(FUNC_CALL, object_type(FUNC_CALL_FIELDS))
        .description("Allocate a value with a WAPI function call at create time")
        .optional()
        .nested_type(nested_type)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMBER: &[FieldSpec] = &[
        FieldSpec::required("name", FieldKind::String),
        FieldSpec::optional("address", FieldKind::Ipv4).checks(&[Check::Ipv4]),
    ];

    static TEST_OBJECT: ObjectDescriptor = ObjectDescriptor {
        type_name: "nios_test_object",
        object_type: "test:object",
        description: "Test object",
        fields: &[
            FieldSpec::required("name", FieldKind::String)
                .replace()
                .checks(&[Check::NoSurroundingSpace]),
            FieldSpec::optional("ttl", FieldKind::Int).use_flag("use_ttl"),
            FieldSpec::optional("use_ttl", FieldKind::Bool),
            FieldSpec::optional("view", FieldKind::String).default(DefaultValue::Str("default")),
            FieldSpec::computed("zone", FieldKind::String),
            FieldSpec::optional("servers", FieldKind::ObjectList {
                fields: MEMBER,
                key: Some("name"),
            }),
            FieldSpec::optional("ipv4addr", FieldKind::Ipv4),
        ],
        supports_extattrs: true,
        import_attaches_internal_id: true,
        function_call_fields: &["ipv4addr"],
        rules: &[Rule::ExactlyOneOf(&["ipv4addr", "func_call"])],
    };

    #[test]
    fn schema_has_reference_and_extattrs() {
        let schema = TEST_OBJECT.schema();
        let reference = schema.attribute(REF).unwrap();
        assert!(reference.computed && !reference.optional);
        assert!(schema.attribute(EXTATTRS).is_some_and(|a| a.optional && !a.computed));
        assert!(schema.attribute(EXTATTRS_ALL).is_some_and(|a| a.computed));
        assert!(schema.attribute(FUNC_CALL).is_some());
        assert_eq!(schema.config_validators.len(), 1);
    }

    #[test]
    fn presence_maps_to_flags() {
        let schema = TEST_OBJECT.schema();
        let name = schema.attribute("name").unwrap();
        assert!(name.required);
        assert_eq!(name.plan_modifiers.len(), 1);
        assert_eq!(name.validators.len(), 1);

        let ttl = schema.attribute("ttl").unwrap();
        assert!(ttl.optional && ttl.computed);
        assert_eq!(ttl.r#type, AttributeType::Number);

        let view = schema.attribute("view").unwrap();
        assert!(view.default.is_some());

        let zone = schema.attribute("zone").unwrap();
        assert!(zone.computed && !zone.optional);
    }

    #[test]
    fn object_lists_get_nested_types() {
        let schema = TEST_OBJECT.schema();
        let servers = schema.attribute("servers").unwrap();
        let nested = servers.nested_type.as_ref().unwrap();
        assert_eq!(nested.nesting, ObjectNestingMode::List);
        assert_eq!(nested.attributes.len(), 2);
        assert_eq!(nested.attributes[1].validators.len(), 1);
    }

    #[test]
    fn data_source_schema_lists_results() {
        let schema = TEST_OBJECT.data_source_schema();
        assert!(schema.attribute("filters").is_some());
        assert!(schema.attribute("extattrfilters").is_some());
        let AttributeType::List(inner) = &schema.attribute("result").unwrap().r#type else {
            panic!("result must be a list");
        };
        let AttributeType::Object(fields) = inner.as_ref() else {
            panic!("result elements must be objects");
        };
        assert!(fields.contains_key(REF));
        assert!(fields.contains_key(EXTATTRS_ALL));
        assert!(fields.contains_key("servers"));
    }
}
