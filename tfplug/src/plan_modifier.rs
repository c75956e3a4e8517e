use crate::schema::{PlanModifier, PlanModifierRequest, PlanModifierResponse};
use crate::types::Dynamic;

/// Marks an attribute as requiring replacement when it changes
pub struct RequiresReplace;

impl PlanModifier for RequiresReplace {
    fn description(&self) -> String {
        "changing this value forces a new resource".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        // Nothing to replace while creating, or while the new value is pending
        let requires_replace = !request.state_value.is_null()
            && !request.plan_value.is_unknown()
            && !values_equal(&request.state_value.value, &request.plan_value.value);

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: vec![],
        }
    }
}

/// A plan modifier that uses the current state value when the planned value is unknown
///
/// This is particularly useful for computed attributes that should retain their value
/// during planning when Terraform doesn't know what the new value will be.
pub struct UseStateForUnknown;

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "once set, the value of this attribute in state will not change".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let keep_state = request.plan_value.is_unknown()
            && !request.state_value.is_null()
            && !request.config_value.is_unknown();

        PlanModifierResponse {
            plan_value: if keep_state {
                request.state_value
            } else {
                request.plan_value
            },
            requires_replace: false,
            diagnostics: vec![],
        }
    }
}

/// Helper function to compare two Dynamic values for equality
pub fn values_equal(a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (Dynamic::Null, Dynamic::Null) => true,
        (Dynamic::Unknown, Dynamic::Unknown) => true,
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
    use crate::types::{AttributePath, DynamicValue};
    use std::collections::HashMap;

    fn request(state: Dynamic, plan: Dynamic, config: Dynamic) -> PlanModifierRequest {
        PlanModifierRequest {
            state_value: DynamicValue::new(state),
            plan_value: DynamicValue::new(plan),
            config_value: DynamicValue::new(config),
            path: AttributePath::new("field"),
        }
    }

    fn string(s: &str) -> Dynamic {
        Dynamic::String(s.to_string())
    }

    #[test]
    fn requires_replace_does_not_trigger_on_same_value() {
        let response = RequiresReplace.modify(request(string("hello"), string("hello"), string("hello")));

        assert!(!response.requires_replace);
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn requires_replace_triggers_on_different_value() {
        let response = RequiresReplace.modify(request(string("hello"), string("world"), string("world")));

        assert!(response.requires_replace);
    }

    #[test]
    fn requires_replace_ignores_create_and_unknown_plan() {
        let response = RequiresReplace.modify(request(Dynamic::Null, string("new"), string("new")));
        assert!(!response.requires_replace);

        let response = RequiresReplace.modify(request(string("value"), Dynamic::Unknown, Dynamic::Unknown));
        assert!(!response.requires_replace);
    }

    #[test]
    fn values_equal_handles_all_types() {
        // Numbers
        assert!(values_equal(&Dynamic::Number(42.0), &Dynamic::Number(42.0)));
        assert!(!values_equal(
            &Dynamic::Number(42.0),
            &Dynamic::Number(43.0)
        ));

        // Booleans
        assert!(values_equal(&Dynamic::Bool(true), &Dynamic::Bool(true)));
        assert!(!values_equal(&Dynamic::Bool(true), &Dynamic::Bool(false)));

        // Lists
        let list1 = Dynamic::List(vec![string("a"), Dynamic::Number(1.0)]);
        let list2 = Dynamic::List(vec![string("a"), Dynamic::Number(1.0)]);
        let list3 = Dynamic::List(vec![string("b"), Dynamic::Number(1.0)]);
        assert!(values_equal(&list1, &list2));
        assert!(!values_equal(&list1, &list3));

        // Maps
        let map1 = HashMap::from([("key".to_string(), string("value"))]);
        let map2 = HashMap::from([("key".to_string(), string("value"))]);
        let map3 = HashMap::from([("key".to_string(), string("different"))]);

        assert!(values_equal(
            &Dynamic::Map(map1.clone()),
            &Dynamic::Map(map2)
        ));
        assert!(!values_equal(&Dynamic::Map(map1), &Dynamic::Map(map3)));

        // Null is only equal to null
        assert!(!values_equal(&Dynamic::Null, &string("")));
    }

    #[test]
    fn use_state_for_unknown_preserves_state_when_unknown() {
        let response = UseStateForUnknown.modify(request(
            string("existing-value"),
            Dynamic::Unknown,
            Dynamic::Null,
        ));

        assert_eq!(response.plan_value.value, string("existing-value"));
        assert!(!response.requires_replace);
    }

    #[test]
    fn use_state_for_unknown_uses_plan_when_known() {
        let response = UseStateForUnknown.modify(request(
            string("existing-value"),
            string("new-value"),
            string("new-value"),
        ));

        assert_eq!(response.plan_value.value, string("new-value"));
    }

    #[test]
    fn use_state_for_unknown_leaves_create_unknown() {
        let response = UseStateForUnknown.modify(request(Dynamic::Null, Dynamic::Unknown, Dynamic::Null));

        assert!(response.plan_value.is_unknown());
    }

    #[test]
    fn use_state_for_unknown_respects_unknown_config() {
        let response = UseStateForUnknown.modify(request(
            string("existing-value"),
            Dynamic::Unknown,
            Dynamic::Unknown,
        ));

        assert!(response.plan_value.is_unknown());
    }
}
