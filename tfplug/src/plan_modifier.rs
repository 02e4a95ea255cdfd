//! Built-in plan modifiers
//!
//! Plan modifiers run once Terraform has proposed a new state and may rewrite
//! the planned value, flag a replacement, or attach diagnostics.

use crate::schema::{PlanModifier, PlanModifierRequest, PlanModifierResponse};
use crate::types::{AttributePath, Dynamic, DynamicValue};

fn at<'a>(value: &'a DynamicValue, path: &AttributePath) -> &'a Dynamic {
    value.get(path).unwrap_or(&Dynamic::Null)
}

/// Marks an attribute as requiring replacement when it changes
pub struct RequiresReplace;

impl PlanModifier for RequiresReplace {
    fn description(&self) -> String {
        "changing this attribute replaces the resource".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        // A null prior state means the resource is being created
        let requires_replace = !request.state_value.is_null() && {
            let state = at(&request.state_value, &request.path);
            let plan = at(&request.plan_value, &request.path);
            !plan.is_unknown() && !values_equal(state, plan)
        };

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: vec![],
        }
    }
}

/// Uses the prior state value when the planned value is unknown
///
/// Keeps computed attributes such as object references stable across
/// updates instead of showing them as "known after apply".
pub struct UseStateForUnknown;

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "keeps the prior state value when the planned value is unknown".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let mut plan_value = request.plan_value;
        let planned = at(&plan_value, &request.path);
        let prior = at(&request.state_value, &request.path).clone();

        let mut diagnostics = vec![];
        if planned.is_unknown() && !prior.is_null_or_unknown() {
            if let Err(e) = plan_value.set(&request.path, prior) {
                diagnostics.push(crate::types::Diagnostic::error(
                    "Plan modification failed",
                    e.to_string(),
                ));
            }
        }

        PlanModifierResponse {
            plan_value,
            requires_replace: false,
            diagnostics,
        }
    }
}

/// Structural equality with tolerance for number encoding noise
pub fn values_equal(a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (Dynamic::Null, Dynamic::Null) => true,
        (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
        (Dynamic::Number(a), Dynamic::Number(b)) => (a - b).abs() < f64::EPSILON,
        (Dynamic::String(a), Dynamic::String(b)) => a == b,
        (Dynamic::List(a), Dynamic::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Dynamic::Map(a), Dynamic::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|v2| values_equal(v, v2)))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn object(name: &str, value: Dynamic) -> DynamicValue {
        DynamicValue::new(Dynamic::Map(HashMap::from([(name.to_string(), value)])))
    }

    fn request(state: DynamicValue, plan: DynamicValue) -> PlanModifierRequest {
        PlanModifierRequest {
            config_value: plan.clone(),
            state_value: state,
            plan_value: plan,
            path: AttributePath::new("fqdn"),
        }
    }

    #[test]
    fn requires_replace_on_change() {
        let response = RequiresReplace.modify(request(
            object("fqdn", "a.example.com".into()),
            object("fqdn", "b.example.com".into()),
        ));
        assert!(response.requires_replace);
    }

    #[test]
    fn requires_replace_ignores_same_value() {
        let response = RequiresReplace.modify(request(
            object("fqdn", "a.example.com".into()),
            object("fqdn", "a.example.com".into()),
        ));
        assert!(!response.requires_replace);
    }

    #[test]
    fn requires_replace_ignores_create_and_unknown() {
        let create = RequiresReplace.modify(request(
            DynamicValue::null(),
            object("fqdn", "a.example.com".into()),
        ));
        assert!(!create.requires_replace);

        let unknown = RequiresReplace.modify(request(
            object("fqdn", "a.example.com".into()),
            object("fqdn", Dynamic::Unknown),
        ));
        assert!(!unknown.requires_replace);
    }

    #[test]
    fn use_state_for_unknown_copies_prior_value() {
        let response = UseStateForUnknown.modify(request(
            object("fqdn", "zone_auth/abc".into()),
            object("fqdn", Dynamic::Unknown),
        ));
        assert_eq!(
            response.plan_value.get_string(&AttributePath::new("fqdn")).unwrap(),
            "zone_auth/abc"
        );
    }

    #[test]
    fn use_state_for_unknown_keeps_known_plan() {
        let response = UseStateForUnknown.modify(request(
            object("fqdn", "old".into()),
            object("fqdn", "new".into()),
        ));
        assert_eq!(
            response.plan_value.get_string(&AttributePath::new("fqdn")).unwrap(),
            "new"
        );
    }

    #[test]
    fn values_equal_handles_nested_values() {
        let a = Dynamic::List(vec![Dynamic::Map(HashMap::from([(
            "k".to_string(),
            Dynamic::Number(1.0),
        )]))]);
        let b = a.clone();
        let c = Dynamic::List(vec![Dynamic::Map(HashMap::new())]);
        assert!(values_equal(&a, &b));
        assert!(!values_equal(&a, &c));
        assert!(!values_equal(&Dynamic::Null, &Dynamic::String(String::new())));
    }
}
