//! Attribute and configuration validators
//!
//! Attribute validators skip null and unknown values; Terraform enforces
//! required-ness itself. Config validators look at several attributes at once.

use crate::schema::{
    Attribute, ConfigValidator, ObjectNestingMode, Schema, Validator, ValidatorRequest,
    ValidatorResponse,
};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::net::{Ipv4Addr, Ipv6Addr};

fn value_at<'a>(request: &'a ValidatorRequest) -> Option<&'a Dynamic> {
    request.config_value.get_known(&request.path)
}

fn fail(path: &AttributePath, summary: String, detail: String) -> ValidatorResponse {
    ValidatorResponse {
        diagnostics: vec![Diagnostic::error(summary, detail).with_attribute(path.clone())],
    }
}

fn ok() -> ValidatorResponse {
    ValidatorResponse {
        diagnostics: vec![],
    }
}

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("string length must be between {} and {}", min, max),
            (Some(min), None) => format!("string length must be at least {}", min),
            (None, Some(max)) => format!("string length must be at most {}", max),
            (None, None) => "any string length".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let Some(s) = value_at(&request).and_then(Dynamic::as_str) else {
            return ok();
        };
        let len = s.chars().count();
        if self.min.is_some_and(|min| len < min) || self.max.is_some_and(|max| len > max) {
            return fail(
                &request.path,
                format!("{}: {}", request.path, self.description()),
                format!("Got length {}", len),
            );
        }
        ok()
    }
}

pub struct StringPatternValidator {
    pub pattern: regex::Regex,
    pub description: String,
}

impl Validator for StringPatternValidator {
    fn description(&self) -> String {
        format!("must match {}", self.description)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        match value_at(&request).and_then(Dynamic::as_str) {
            Some(s) if !self.pattern.is_match(s) => fail(
                &request.path,
                format!("{} must match {}", request.path, self.description),
                format!("Value '{}' does not match pattern", s),
            ),
            _ => ok(),
        }
    }
}

/// Rejects leading or trailing whitespace
pub struct NoSurroundingWhitespaceValidator;

impl Validator for NoSurroundingWhitespaceValidator {
    fn description(&self) -> String {
        "must not have leading or trailing whitespace".to_string()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        match value_at(&request).and_then(Dynamic::as_str) {
            Some(s) if s.trim() != s => fail(
                &request.path,
                format!("{} {}", request.path, self.description()),
                format!("Value '{}' has surrounding whitespace", s),
            ),
            _ => ok(),
        }
    }
}

pub struct OneOfValidator {
    pub values: Vec<String>,
}

impl OneOfValidator {
    pub fn new(values: &[&str]) -> Self {
        Self {
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

impl Validator for OneOfValidator {
    fn description(&self) -> String {
        format!("must be one of: {}", self.values.join(", "))
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        match value_at(&request).and_then(Dynamic::as_str) {
            Some(s) if !self.values.iter().any(|v| v == s) => fail(
                &request.path,
                format!("Invalid value for {}", request.path),
                format!("'{}' {}", s, self.description()),
            ),
            _ => ok(),
        }
    }
}

pub struct NumberRangeValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Validator for NumberRangeValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("must be between {} and {}", min, max),
            (Some(min), None) => format!("must be at least {}", min),
            (None, Some(max)) => format!("must be at most {}", max),
            (None, None) => "any number".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let Some(n) = value_at(&request).and_then(Dynamic::as_number) else {
            return ok();
        };
        if self.min.is_some_and(|min| n < min) || self.max.is_some_and(|max| n > max) {
            return fail(
                &request.path,
                format!("{} {}", request.path, self.description()),
                format!("Got {}", n),
            );
        }
        ok()
    }
}

pub struct ListLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for ListLengthValidator {
    fn description(&self) -> String {
        format!(
            "list must have between {} and {} items",
            self.min.unwrap_or(0),
            self.max.map_or_else(|| "any".to_string(), |m| m.to_string())
        )
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let Some(items) = value_at(&request).and_then(Dynamic::as_list) else {
            return ok();
        };
        if self.min.is_some_and(|min| items.len() < min)
            || self.max.is_some_and(|max| items.len() > max)
        {
            return fail(
                &request.path,
                format!("{}: {}", request.path, self.description()),
                format!("Got {} items", items.len()),
            );
        }
        ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpFamily {
    V4,
    V6,
}

/// Accepts a literal address of the given family
pub struct IpAddressValidator {
    pub family: IpFamily,
}

impl Validator for IpAddressValidator {
    fn description(&self) -> String {
        match self.family {
            IpFamily::V4 => "must be a valid IPv4 address".to_string(),
            IpFamily::V6 => "must be a valid IPv6 address".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let Some(s) = value_at(&request).and_then(Dynamic::as_str) else {
            return ok();
        };
        let valid = match self.family {
            IpFamily::V4 => s.parse::<Ipv4Addr>().is_ok(),
            IpFamily::V6 => s.parse::<Ipv6Addr>().is_ok(),
        };
        if valid {
            ok()
        } else {
            fail(
                &request.path,
                format!("Invalid address for {}", request.path),
                format!("'{}' {}", s, self.description()),
            )
        }
    }
}

fn is_set(config: &DynamicValue, name: &str) -> bool {
    config
        .get(&AttributePath::new(name))
        .is_some_and(|v| !v.is_null())
}

fn names(attrs: &[String]) -> String {
    attrs.join(", ")
}

/// At most one of the listed attributes may be set
pub struct ConflictsWith {
    pub attributes: Vec<String>,
}

impl ConfigValidator for ConflictsWith {
    fn description(&self) -> String {
        format!("at most one of [{}] may be set", names(&self.attributes))
    }

    fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let set: Vec<&String> = self
            .attributes
            .iter()
            .filter(|a| is_set(config, a))
            .collect();
        if set.len() > 1 {
            let listed: Vec<String> = set.iter().map(|s| s.to_string()).collect();
            vec![Diagnostic::error(
                "Conflicting attributes",
                format!("{} cannot be set together", names(&listed)),
            )]
        } else {
            vec![]
        }
    }
}

/// Exactly one of the listed attributes must be set
pub struct ExactlyOneOf {
    pub attributes: Vec<String>,
}

impl ConfigValidator for ExactlyOneOf {
    fn description(&self) -> String {
        format!("exactly one of [{}] must be set", names(&self.attributes))
    }

    fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let count = self
            .attributes
            .iter()
            .filter(|a| is_set(config, a))
            .count();
        if count == 1 {
            vec![]
        } else {
            vec![Diagnostic::error(
                "Invalid attribute combination",
                format!(
                    "Exactly one of [{}] must be set, found {}",
                    names(&self.attributes),
                    count
                ),
            )]
        }
    }
}

/// At least one of the listed attributes must be set
pub struct AtLeastOneOf {
    pub attributes: Vec<String>,
}

impl ConfigValidator for AtLeastOneOf {
    fn description(&self) -> String {
        format!("at least one of [{}] must be set", names(&self.attributes))
    }

    fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        if self.attributes.iter().any(|a| is_set(config, a)) {
            vec![]
        } else {
            vec![Diagnostic::error(
                "Missing attribute",
                format!("At least one of [{}] must be set", names(&self.attributes)),
            )]
        }
    }
}

/// Setting any of `attributes` requires `flag` to be true
pub struct RequiresTrue {
    pub attributes: Vec<String>,
    pub flag: String,
}

impl ConfigValidator for RequiresTrue {
    fn description(&self) -> String {
        format!("[{}] require {} = true", names(&self.attributes), self.flag)
    }

    fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let flag = config.get(&AttributePath::new(&self.flag));
        // Unknown flags are settled at apply time
        if matches!(flag, Some(Dynamic::Bool(true)) | Some(Dynamic::Unknown)) {
            return vec![];
        }
        self.attributes
            .iter()
            .filter(|a| is_set(config, a))
            .map(|a| {
                Diagnostic::error(
                    "Invalid attribute combination",
                    format!("{} can only be set when {} is true", a, self.flag),
                )
                .with_attribute(AttributePath::new(a))
            })
            .collect()
    }
}

/// If `attribute` is set every one of `requires` must be set too
pub struct AlsoRequires {
    pub attribute: String,
    pub requires: Vec<String>,
}

impl ConfigValidator for AlsoRequires {
    fn description(&self) -> String {
        format!("{} requires [{}]", self.attribute, names(&self.requires))
    }

    fn validate(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        if !is_set(config, &self.attribute) {
            return vec![];
        }
        self.requires
            .iter()
            .filter(|r| !is_set(config, r))
            .map(|r| {
                Diagnostic::error(
                    "Missing required attribute",
                    format!("{} must be set when {} is set", r, self.attribute),
                )
                .with_attribute(AttributePath::new(r))
            })
            .collect()
    }
}

/// Run every attribute validator (nested ones included) and every config
/// validator in `schema` against `config`.
pub fn validate_config(schema: &Schema, config: &DynamicValue) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for attribute in &schema.block.attributes {
        validate_attribute(attribute, config, AttributePath::new(&attribute.name), &mut diagnostics);
    }
    for validator in &schema.config_validators {
        diagnostics.extend(validator.validate(config));
    }
    diagnostics
}

fn validate_attribute(
    attribute: &Attribute,
    config: &DynamicValue,
    path: AttributePath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for validator in &attribute.validators {
        let response = validator.validate(ValidatorRequest {
            config_value: config.clone(),
            path: path.clone(),
        });
        diagnostics.extend(response.diagnostics);
    }

    let Some(nested) = &attribute.nested_type else {
        return;
    };
    match nested.nesting {
        ObjectNestingMode::Single => {
            for child in &nested.attributes {
                validate_attribute(child, config, path.clone().attribute(&child.name), diagnostics);
            }
        }
        ObjectNestingMode::List | ObjectNestingMode::Set => {
            let len = config
                .get_known(&path)
                .and_then(Dynamic::as_list)
                .map_or(0, |l| l.len());
            for idx in 0..len {
                for child in &nested.attributes {
                    let child_path = path.clone().index(idx as i64).attribute(&child.name);
                    validate_attribute(child, config, child_path, diagnostics);
                }
            }
        }
        ObjectNestingMode::Map => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeBuilder, AttributeType, NestedType, SchemaBuilder};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn config(pairs: &[(&str, Dynamic)]) -> DynamicValue {
        let map: HashMap<String, Dynamic> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        DynamicValue::new(Dynamic::Map(map))
    }

    fn run(validator: &dyn Validator, value: Dynamic) -> Vec<Diagnostic> {
        validator
            .validate(ValidatorRequest {
                config_value: config(&[("field", value)]),
                path: AttributePath::new("field"),
            })
            .diagnostics
    }

    #[test]
    fn string_length_validator_bounds() {
        let validator = StringLengthValidator {
            min: Some(3),
            max: Some(5),
        };
        assert!(run(&validator, "abcd".into()).is_empty());
        assert_eq!(run(&validator, "ab".into()).len(), 1);
        assert_eq!(run(&validator, "abcdef".into()).len(), 1);
        assert!(run(&validator, Dynamic::Null).is_empty());
    }

    #[test]
    fn string_pattern_validator_rejects_non_matching() {
        let validator = StringPatternValidator {
            pattern: regex::Regex::new(r"^[a-z]+$").unwrap(),
            description: "lowercase letters".to_string(),
        };
        assert!(run(&validator, "abc".into()).is_empty());
        let diags = run(&validator, "ABC".into());
        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("lowercase letters"));
    }

    #[test]
    fn surrounding_whitespace_is_rejected() {
        let validator = NoSurroundingWhitespaceValidator;
        assert!(run(&validator, "a b".into()).is_empty());
        assert_eq!(run(&validator, " ab".into()).len(), 1);
        assert_eq!(run(&validator, "ab\n".into()).len(), 1);
    }

    #[test]
    fn one_of_validator() {
        let validator = OneOfValidator::new(&["FORWARD", "IPV4", "IPV6"]);
        assert!(run(&validator, "IPV4".into()).is_empty());
        assert_eq!(run(&validator, "ipv4".into()).len(), 1);
    }

    #[test]
    fn number_range_validator() {
        let validator = NumberRangeValidator {
            min: Some(0.0),
            max: Some(65535.0),
        };
        assert!(run(&validator, Dynamic::Number(53.0)).is_empty());
        assert_eq!(run(&validator, Dynamic::Number(70000.0)).len(), 1);
        assert!(run(&validator, Dynamic::Unknown).is_empty());
    }

    #[test]
    fn list_length_validator() {
        let validator = ListLengthValidator {
            min: Some(1),
            max: Some(2),
        };
        assert!(run(&validator, Dynamic::List(vec!["a".into()])).is_empty());
        assert_eq!(run(&validator, Dynamic::List(vec![])).len(), 1);
    }

    #[test]
    fn ip_address_validator() {
        let v4 = IpAddressValidator {
            family: IpFamily::V4,
        };
        let v6 = IpAddressValidator {
            family: IpFamily::V6,
        };
        assert!(run(&v4, "10.0.0.1".into()).is_empty());
        assert_eq!(run(&v4, "10.0.0.256".into()).len(), 1);
        assert_eq!(run(&v4, "2001:db8::1".into()).len(), 1);
        assert!(run(&v6, "2001:db8::1".into()).is_empty());
        assert_eq!(run(&v6, "10.0.0.1".into()).len(), 1);
    }

    #[test]
    fn conflicts_with() {
        let validator = ConflictsWith {
            attributes: vec!["ipv4addr".to_string(), "func_call".to_string()],
        };
        assert!(validator
            .validate(&config(&[("ipv4addr", "10.0.0.1".into())]))
            .is_empty());
        let diags = validator.validate(&config(&[
            ("ipv4addr", "10.0.0.1".into()),
            ("func_call", Dynamic::Map(HashMap::new())),
        ]));
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn exactly_and_at_least_one_of() {
        let attrs = vec!["a".to_string(), "b".to_string()];
        let exactly = ExactlyOneOf {
            attributes: attrs.clone(),
        };
        let at_least = AtLeastOneOf { attributes: attrs };

        let none = config(&[("a", Dynamic::Null)]);
        let both = config(&[("a", "x".into()), ("b", "y".into())]);
        let one = config(&[("b", "y".into())]);

        assert_eq!(exactly.validate(&none).len(), 1);
        assert_eq!(exactly.validate(&both).len(), 1);
        assert!(exactly.validate(&one).is_empty());
        assert_eq!(at_least.validate(&none).len(), 1);
        assert!(at_least.validate(&both).is_empty());
    }

    #[test]
    fn requires_true_flags_timers_without_switch() {
        let validator = RequiresTrue {
            attributes: vec!["soa_refresh".to_string(), "soa_retry".to_string()],
            flag: "use_grid_zone_timer".to_string(),
        };
        let bad = config(&[
            ("soa_refresh", Dynamic::Number(3600.0)),
            ("use_grid_zone_timer", Dynamic::Bool(false)),
        ]);
        let good = config(&[
            ("soa_refresh", Dynamic::Number(3600.0)),
            ("use_grid_zone_timer", Dynamic::Bool(true)),
        ]);
        assert_eq!(validator.validate(&bad).len(), 1);
        assert!(validator.validate(&good).is_empty());
    }

    #[test]
    fn also_requires() {
        let validator = AlsoRequires {
            attribute: "mac".to_string(),
            requires: vec!["configure_for_dhcp".to_string()],
        };
        assert!(validator.validate(&config(&[])).is_empty());
        assert_eq!(
            validator
                .validate(&config(&[("mac", "aa:bb:cc:dd:ee:ff".into())]))
                .len(),
            1
        );
    }

    #[test]
    fn validate_config_walks_nested_lists() {
        let nested = NestedType {
            attributes: vec![AttributeBuilder::new("address", AttributeType::String)
                .required()
                .validator(Arc::new(IpAddressValidator {
                    family: IpFamily::V4,
                }))
                .build()],
            nesting: ObjectNestingMode::List,
        };
        let schema = SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new(
                    "forwarders",
                    AttributeType::List(Box::new(AttributeType::Object(HashMap::from([(
                        "address".to_string(),
                        AttributeType::String,
                    )])))),
                )
                .optional()
                .nested_type(nested)
                .build(),
            )
            .config_validator(Arc::new(AtLeastOneOf {
                attributes: vec!["forwarders".to_string()],
            }))
            .build();

        let element = |addr: &str| {
            Dynamic::Map(HashMap::from([("address".to_string(), Dynamic::from(addr))]))
        };
        let cfg = config(&[(
            "forwarders",
            Dynamic::List(vec![element("10.0.0.1"), element("bogus")]),
        )]);

        let diags = validate_config(&schema, &cfg);
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].attribute,
            Some(AttributePath::new("forwarders").index(1).attribute("address"))
        );
    }
}
