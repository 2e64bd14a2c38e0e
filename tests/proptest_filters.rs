//! Property-based tests using proptest
//!
//! These tests check the listing filters of the backend against a direct
//! reading of each filter rule, over randomized templates and filters.

use inspector_mock::inspector::{Filter, InspectorBackend};
use proptest::prelude::*;
use serde_json::{json, Value};

const RULES: [&str; 4] = ["rules-a", "rules-b", "rules-c", "rules-d"];

#[derive(Debug, Clone)]
struct TemplateParams {
    name: String,
    duration: i64,
    rules: Vec<String>,
}

/// Generate template parameters
fn arb_template() -> impl Strategy<Value = TemplateParams> {
    (
        "[a-z]{1,8}",
        60i64..4000,
        prop::sample::subsequence(RULES.to_vec(), 0..=RULES.len()),
    )
        .prop_map(|(name, duration, rules)| TemplateParams {
            name,
            duration,
            rules: rules.into_iter().map(str::to_string).collect(),
        })
}

fn arb_template_list() -> impl Strategy<Value = Vec<TemplateParams>> {
    prop::collection::vec(arb_template(), 0..20)
}

fn to_filter(value: Value) -> Filter {
    value.as_object().cloned().unwrap_or_default()
}

/// Backend holding one target with the given templates; returns their ARNs
/// in creation order
fn populate(templates: &[TemplateParams]) -> (InspectorBackend, Vec<String>) {
    let mut backend = InspectorBackend::new("us-east-1", "123456789012");
    let target_arn = backend.create_assessment_target("target", None).arn.clone();
    let arns = templates
        .iter()
        .map(|params| {
            backend
                .create_assessment_template(
                    &target_arn,
                    &params.name,
                    params.duration,
                    params.rules.clone(),
                    Vec::new(),
                )
                .arn
                .clone()
        })
        .collect();
    (backend, arns)
}

/// ARNs of the templates accepted by `keep`, in creation order
fn expected(templates: &[TemplateParams], arns: &[String], keep: impl Fn(&TemplateParams) -> bool) -> Vec<String> {
    templates
        .iter()
        .zip(arns)
        .filter(|(params, _)| keep(params))
        .map(|(_, arn)| arn.clone())
        .collect()
}

proptest! {
    #[test]
    fn name_pattern_is_substring_match(
        templates in arb_template_list(),
        pattern in "[a-z]{1,3}"
    ) {
        let (backend, arns) = populate(&templates);
        let filter = to_filter(json!({"namePattern": pattern}));

        let listed = backend.list_assessment_templates(None, Some(&filter)).unwrap();
        prop_assert_eq!(listed, expected(&templates, &arns, |s| s.name.contains(pattern.as_str())));
    }

    #[test]
    fn duration_range_bounds_are_inclusive(
        templates in arb_template_list(),
        min in 0i64..4000,
        width in 0i64..2000
    ) {
        let max = min + width;
        let (backend, arns) = populate(&templates);
        let filter = to_filter(json!({"durationRange": {"minSeconds": min, "maxSeconds": max}}));

        let listed = backend.list_assessment_templates(None, Some(&filter)).unwrap();
        prop_assert_eq!(listed, expected(&templates, &arns, |s| min <= s.duration && s.duration <= max));
    }

    #[test]
    fn rules_packages_must_be_subset(
        templates in arb_template_list(),
        allowed in prop::sample::subsequence(RULES.to_vec(), 0..=RULES.len())
    ) {
        let (backend, arns) = populate(&templates);
        let filter = to_filter(json!({"rulesPackageArns": allowed}));

        let listed = backend.list_assessment_templates(None, Some(&filter)).unwrap();
        prop_assert_eq!(
            listed,
            expected(&templates, &arns, |s| s.rules.iter().all(|r| allowed.contains(&r.as_str())))
        );
    }

    #[test]
    fn combined_keys_are_conjunctive(
        templates in arb_template_list(),
        pattern in "[a-z]",
        min in 0i64..4000
    ) {
        let (backend, arns) = populate(&templates);
        let filter = to_filter(json!({
            "namePattern": pattern,
            "durationRange": {"minSeconds": min, "maxSeconds": 4000}
        }));

        let listed = backend.list_assessment_templates(None, Some(&filter)).unwrap();
        prop_assert_eq!(
            listed,
            expected(&templates, &arns, |s| s.name.contains(pattern.as_str()) && s.duration >= min)
        );
    }

    #[test]
    fn empty_filter_yields_nothing(templates in arb_template_list()) {
        let (backend, _) = populate(&templates);
        let listed = backend.list_assessment_templates(None, Some(&Filter::new())).unwrap();
        prop_assert!(listed.is_empty());
    }

    #[test]
    fn no_filter_yields_everything(templates in arb_template_list()) {
        let (backend, arns) = populate(&templates);
        prop_assert_eq!(backend.list_assessment_templates(None, None).unwrap(), arns);
    }

    #[test]
    fn unknown_keys_are_ignored(
        templates in arb_template_list(),
        pattern in "[a-z]{1,2}",
        junk in "[A-Z][a-zA-Z]{3,10}"
    ) {
        let (backend, _) = populate(&templates);
        let plain = to_filter(json!({"namePattern": pattern}));
        let noisy = to_filter(json!({"namePattern": pattern, junk: {"anything": [1, 2]}}));

        prop_assert_eq!(
            backend.list_assessment_templates(None, Some(&plain)).unwrap(),
            backend.list_assessment_templates(None, Some(&noisy)).unwrap()
        );
    }

    #[test]
    fn only_unknown_keys_yield_nothing(
        templates in arb_template_list(),
        junk in "[A-Z][a-zA-Z]{3,10}"
    ) {
        let (backend, _) = populate(&templates);
        let filter = to_filter(json!({junk: "value"}));
        prop_assert!(backend.list_assessment_templates(None, Some(&filter)).unwrap().is_empty());
    }
}

mod target_filter_tests {
    use super::*;

    proptest! {
        #[test]
        fn target_pattern_is_substring_match(
            names in prop::collection::vec("[a-z]{1,6}", 0..15),
            pattern in "[a-z]{1,2}"
        ) {
            let mut backend = InspectorBackend::new("us-east-1", "123456789012");
            let arns: Vec<String> = names
                .iter()
                .map(|name| backend.create_assessment_target(name, None).arn.clone())
                .collect();
            let filter = to_filter(json!({"assessmentTargetNamePattern": pattern}));

            let expected: Vec<String> = names
                .iter()
                .zip(&arns)
                .filter(|(name, _)| name.contains(pattern.as_str()))
                .map(|(_, arn)| arn.clone())
                .collect();
            prop_assert_eq!(backend.list_assessment_targets(Some(&filter)).unwrap(), expected);
        }

        #[test]
        fn target_filter_rejects_other_keys(key in "[a-z]{3,12}") {
            prop_assume!(key != "assessmentTargetNamePattern");
            let backend = InspectorBackend::new("us-east-1", "123456789012");
            let filter = to_filter(json!({key: "x"}));

            let err = backend.list_assessment_targets(Some(&filter)).unwrap_err();
            prop_assert_eq!(err.code(), "InvalidFilterValue");
        }
    }
}
