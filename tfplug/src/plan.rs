//! Plan computation shared by all resources
//!
//! Given the schema, the configuration, the prior state and Terraform's
//! proposed new state, this fills in defaults, marks unset computed values
//! unknown and runs every attribute's plan modifiers.

use crate::schema::{DefaultRequest, PlanModifierRequest, Schema};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

/// Result of planning a resource change
#[derive(Debug, Clone)]
pub struct PlannedChange {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn plan_resource_change(
    schema: &Schema,
    config: &DynamicValue,
    prior_state: &DynamicValue,
    proposed_new_state: &DynamicValue,
) -> PlannedChange {
    // Destroy plans carry no proposed state
    if proposed_new_state.is_null() {
        return PlannedChange {
            planned_state: DynamicValue::null(),
            requires_replace: vec![],
            diagnostics: vec![],
        };
    }

    let mut planned = proposed_new_state.clone();
    let mut requires_replace = Vec::new();
    let mut diagnostics = Vec::new();

    for attribute in &schema.block.attributes {
        let path = AttributePath::new(&attribute.name);
        let configured = config.get(&path).is_some_and(|v| !v.is_null());
        if configured {
            continue;
        }

        let current = planned.get(&path).cloned().unwrap_or(Dynamic::Null);
        let replacement = match (&attribute.default, current.is_null()) {
            (Some(default), _) if attribute.optional && attribute.computed => {
                Some(default.default_value(DefaultRequest { path: path.clone() }).value.value)
            }
            (None, true) if attribute.computed => Some(Dynamic::Unknown),
            _ => None,
        };

        if let Some(value) = replacement {
            if let Err(e) = planned.set(&path, value) {
                diagnostics.push(Diagnostic::error("Failed to apply default", e.to_string()));
            }
        }
    }

    for attribute in &schema.block.attributes {
        let path = AttributePath::new(&attribute.name);
        for modifier in &attribute.plan_modifiers {
            let response = modifier.modify(PlanModifierRequest {
                config_value: config.clone(),
                state_value: prior_state.clone(),
                plan_value: planned,
                path: path.clone(),
            });
            planned = response.plan_value;
            if response.requires_replace && !requires_replace.contains(&path) {
                tracing::debug!(attribute = %path, "change requires replacement");
                requires_replace.push(path.clone());
            }
            diagnostics.extend(response.diagnostics);
        }
    }

    PlannedChange {
        planned_state: planned,
        requires_replace,
        diagnostics,
    }
}
