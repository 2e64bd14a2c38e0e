//! Filter evaluation
//!
//! Each entity type has a static table mapping a filter key to a predicate
//! over `(entity, parameters)`. [`matches`] folds a logical AND over every
//! key of the filter that appears in the table:
//!
//! - keys missing from the table are ignored,
//! - a filter with no recognized key (including `{}`) matches nothing, since
//!   the intersection over zero per-key sets is empty,
//! - every recognized predicate is evaluated, so a malformed parameter is
//!   reported even when an earlier key already rejected the entity.
//!
//! Adding a filter key is a matter of adding a row to the right table.

use super::error::{InspectorError, Result};
use super::models::{AssessmentRun, AssessmentTarget, AssessmentTemplate, Finding};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Filter document as received on the wire: filter key -> parameters
pub type Filter = Map<String, Value>;

/// Decides whether an entity satisfies one filter key
pub type Predicate<E> = fn(&E, &Value) -> Result<bool>;

/// One row of a filter table
pub struct FilterRule<E> {
    pub key: &'static str,
    pub predicate: Predicate<E>,
}

/// The only key accepted by target listing
pub const TARGET_NAME_PATTERN: &str = "assessmentTargetNamePattern";

pub const NAME_PATTERN: &str = "namePattern";
pub const DURATION_RANGE: &str = "durationRange";
pub const RULES_PACKAGE_ARNS: &str = "rulesPackageArns";
pub const STATES: &str = "states";
pub const START_TIME_RANGE: &str = "startTimeRange";
pub const COMPLETION_TIME_RANGE: &str = "completionTimeRange";
pub const STATE_CHANGE_TIME_RANGE: &str = "stateChangeTimeRange";
pub const AGENT_IDS: &str = "agentIds";
pub const AUTO_SCALING_GROUPS: &str = "autoScalingGroups";
pub const RULE_NAMES: &str = "ruleNames";
pub const SEVERITIES: &str = "severities";
pub const CREATION_TIME_RANGE: &str = "creationTimeRange";

pub static TEMPLATE_FILTERS: &[FilterRule<AssessmentTemplate>] = &[
    FilterRule { key: NAME_PATTERN, predicate: template_name_pattern },
    FilterRule { key: DURATION_RANGE, predicate: template_duration_range },
    FilterRule { key: RULES_PACKAGE_ARNS, predicate: template_rules_packages },
];

pub static RUN_FILTERS: &[FilterRule<AssessmentRun>] = &[
    FilterRule { key: NAME_PATTERN, predicate: run_name_pattern },
    FilterRule { key: STATES, predicate: run_states },
    FilterRule { key: DURATION_RANGE, predicate: run_duration_range },
    FilterRule { key: RULES_PACKAGE_ARNS, predicate: run_rules_packages },
    FilterRule { key: START_TIME_RANGE, predicate: run_start_time_range },
    FilterRule { key: COMPLETION_TIME_RANGE, predicate: run_completion_time_range },
    FilterRule { key: STATE_CHANGE_TIME_RANGE, predicate: run_state_change_time_range },
];

pub static FINDING_FILTERS: &[FilterRule<Finding>] = &[
    FilterRule { key: AGENT_IDS, predicate: finding_agent_ids },
    FilterRule { key: AUTO_SCALING_GROUPS, predicate: finding_auto_scaling_groups },
    FilterRule { key: RULE_NAMES, predicate: finding_rule_names },
    FilterRule { key: SEVERITIES, predicate: finding_severities },
    FilterRule { key: CREATION_TIME_RANGE, predicate: finding_creation_time_range },
    FilterRule { key: RULES_PACKAGE_ARNS, predicate: finding_rules_packages },
];

/// Look up the rule for a filter key
pub fn find_rule<'r, E>(rules: &'r [FilterRule<E>], key: &str) -> Option<&'r FilterRule<E>> {
    rules.iter().find(|rule| rule.key == key)
}

/// Evaluate a filter against one entity
pub fn matches<E>(rules: &[FilterRule<E>], filter: &Filter, subject: &E) -> Result<bool> {
    let mut constrained = false;
    let mut accepted = true;

    for (key, params) in filter {
        let Some(rule) = find_rule(rules, key) else {
            tracing::trace!("Ignoring unrecognized filter key {}", key);
            continue;
        };
        constrained = true;
        accepted &= (rule.predicate)(subject, params)?;
    }

    Ok(constrained && accepted)
}

/// Extract the name pattern from a target filter.
///
/// Target listing is stricter than the other listings: the filter must hold
/// exactly one key, `assessmentTargetNamePattern`.
pub fn target_name_pattern(filter: &Filter) -> Result<&str> {
    if filter.len() != 1 || !filter.contains_key(TARGET_NAME_PATTERN) {
        return Err(InspectorError::InvalidFilterValue(format!(
            "Only {} allowed as filter.",
            TARGET_NAME_PATTERN
        )));
    }
    string_param(TARGET_NAME_PATTERN, &filter[TARGET_NAME_PATTERN])
}

pub fn target_matches(target: &AssessmentTarget, pattern: &str) -> bool {
    target.name.contains(pattern)
}

// =============================================================================
// Parameter shapes
// =============================================================================

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DurationRange {
    min_seconds: i64,
    max_seconds: i64,
}

impl DurationRange {
    fn parse(key: &str, params: &Value) -> Result<Self> {
        Self::deserialize(params).map_err(|_| {
            InspectorError::invalid_filter_value(key, "an object with integer minSeconds and maxSeconds")
        })
    }

    fn contains(&self, seconds: i64) -> bool {
        self.min_seconds <= seconds && seconds <= self.max_seconds
    }
}

/// Inclusive range of epoch seconds
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimestampRange {
    begin_date: f64,
    end_date: f64,
}

impl TimestampRange {
    fn parse(key: &str, params: &Value) -> Result<Self> {
        Self::deserialize(params).map_err(|_| {
            InspectorError::invalid_filter_value(key, "an object with numeric beginDate and endDate")
        })
    }

    fn contains(&self, at: DateTime<Utc>) -> bool {
        let seconds = at.timestamp() as f64;
        self.begin_date <= seconds && seconds <= self.end_date
    }
}

fn string_param<'v>(key: &str, params: &'v Value) -> Result<&'v str> {
    params
        .as_str()
        .ok_or_else(|| InspectorError::invalid_filter_value(key, "a string"))
}

fn string_list<'v>(key: &str, params: &'v Value) -> Result<Vec<&'v str>> {
    let expected = || InspectorError::invalid_filter_value(key, "a list of strings");
    params
        .as_array()
        .ok_or_else(expected)?
        .iter()
        .map(|v| v.as_str().ok_or_else(expected))
        .collect()
}

fn list_contains(key: &str, params: &Value, value: &str) -> Result<bool> {
    Ok(string_list(key, params)?.contains(&value))
}

/// Every ARN the entity uses must be present in the supplied list
fn rules_subset(own: &[String], params: &Value) -> Result<bool> {
    let allowed = string_list(RULES_PACKAGE_ARNS, params)?;
    Ok(own.iter().all(|arn| allowed.contains(&arn.as_str())))
}

// =============================================================================
// Template predicates
// =============================================================================

fn template_name_pattern(template: &AssessmentTemplate, params: &Value) -> Result<bool> {
    Ok(template.name.contains(string_param(NAME_PATTERN, params)?))
}

fn template_duration_range(template: &AssessmentTemplate, params: &Value) -> Result<bool> {
    Ok(DurationRange::parse(DURATION_RANGE, params)?.contains(template.duration_in_seconds))
}

fn template_rules_packages(template: &AssessmentTemplate, params: &Value) -> Result<bool> {
    rules_subset(&template.rules_package_arns, params)
}

// =============================================================================
// Run predicates
// =============================================================================

fn run_name_pattern(run: &AssessmentRun, params: &Value) -> Result<bool> {
    Ok(run.name.contains(string_param(NAME_PATTERN, params)?))
}

fn run_states(run: &AssessmentRun, params: &Value) -> Result<bool> {
    list_contains(STATES, params, run.state.as_str())
}

fn run_duration_range(run: &AssessmentRun, params: &Value) -> Result<bool> {
    Ok(DurationRange::parse(DURATION_RANGE, params)?.contains(run.duration_in_seconds))
}

fn run_rules_packages(run: &AssessmentRun, params: &Value) -> Result<bool> {
    rules_subset(&run.rules_package_arns, params)
}

fn run_start_time_range(run: &AssessmentRun, params: &Value) -> Result<bool> {
    Ok(TimestampRange::parse(START_TIME_RANGE, params)?.contains(run.start_time))
}

fn run_completion_time_range(run: &AssessmentRun, params: &Value) -> Result<bool> {
    Ok(TimestampRange::parse(COMPLETION_TIME_RANGE, params)?.contains(run.expected_completion()))
}

fn run_state_change_time_range(run: &AssessmentRun, params: &Value) -> Result<bool> {
    Ok(TimestampRange::parse(STATE_CHANGE_TIME_RANGE, params)?.contains(run.state_change_time))
}

// =============================================================================
// Finding predicates
// =============================================================================

fn finding_agent_ids(finding: &Finding, params: &Value) -> Result<bool> {
    list_contains(AGENT_IDS, params, &finding.agent_id)
}

fn finding_auto_scaling_groups(finding: &Finding, params: &Value) -> Result<bool> {
    let groups = string_list(AUTO_SCALING_GROUPS, params)?;
    Ok(finding
        .auto_scaling_group
        .as_deref()
        .is_some_and(|group| groups.contains(&group)))
}

fn finding_rule_names(finding: &Finding, params: &Value) -> Result<bool> {
    list_contains(RULE_NAMES, params, &finding.rule_name)
}

fn finding_severities(finding: &Finding, params: &Value) -> Result<bool> {
    list_contains(SEVERITIES, params, finding.severity.as_str())
}

fn finding_creation_time_range(finding: &Finding, params: &Value) -> Result<bool> {
    Ok(TimestampRange::parse(CREATION_TIME_RANGE, params)?.contains(finding.created_at))
}

fn finding_rules_packages(finding: &Finding, params: &Value) -> Result<bool> {
    let packages = string_list(RULES_PACKAGE_ARNS, params)?;
    Ok(finding
        .rules_package_arn
        .as_deref()
        .is_some_and(|arn| packages.contains(&arn)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspector::models::Severity;
    use serde_json::json;

    fn filter(value: Value) -> Filter {
        value.as_object().cloned().expect("filter must be an object")
    }

    fn template(name: &str, duration: i64, rules: &[&str]) -> AssessmentTemplate {
        AssessmentTemplate::new(
            "us-east-1",
            "arn:aws:inspector:us-east-1:123456789012:target/0-abcdefgh",
            name,
            duration,
            rules.iter().map(|r| r.to_string()).collect(),
            vec![],
        )
    }

    fn finding() -> Finding {
        Finding {
            arn: "arn:finding".to_string(),
            region: "us-east-1".to_string(),
            assessment_run_arn: "arn:run".to_string(),
            agent_id: "i-0123abcd".to_string(),
            auto_scaling_group: None,
            rule_name: "Insecure Server Protocols".to_string(),
            rules_package_arn: Some("rp-1".to_string()),
            severity: Severity::Informational,
            title: "title".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_filter_matches_nothing() {
        let t = template("test", 900, &["rule-arn"]);
        assert!(!matches(TEMPLATE_FILTERS, &Filter::new(), &t).unwrap());
    }

    #[test]
    fn test_only_unknown_keys_matches_nothing() {
        let t = template("test", 900, &["rule-arn"]);
        let f = filter(json!({"somethingElse": "x"}));
        assert!(!matches(TEMPLATE_FILTERS, &f, &t).unwrap());
    }

    #[test]
    fn test_unknown_keys_are_ignored_next_to_known_ones() {
        let t = template("test", 900, &["rule-arn"]);
        let f = filter(json!({"namePattern": "es", "somethingElse": 42}));
        assert!(matches(TEMPLATE_FILTERS, &f, &t).unwrap());
    }

    #[test]
    fn test_template_name_pattern() {
        let t = template("nightly-web", 900, &[]);
        assert!(matches(TEMPLATE_FILTERS, &filter(json!({"namePattern": "web"})), &t).unwrap());
        assert!(!matches(TEMPLATE_FILTERS, &filter(json!({"namePattern": "db"})), &t).unwrap());
    }

    #[test]
    fn test_duration_range_is_inclusive() {
        let t = template("t", 900, &[]);
        let exact = filter(json!({"durationRange": {"minSeconds": 900, "maxSeconds": 900}}));
        let below = filter(json!({"durationRange": {"minSeconds": 901, "maxSeconds": 1000}}));
        assert!(matches(TEMPLATE_FILTERS, &exact, &t).unwrap());
        assert!(!matches(TEMPLATE_FILTERS, &below, &t).unwrap());
    }

    #[test]
    fn test_rules_packages_subset() {
        let t = template("t", 900, &["a", "b"]);
        let superset = filter(json!({"rulesPackageArns": ["a", "b", "c"]}));
        let partial = filter(json!({"rulesPackageArns": ["a"]}));
        assert!(matches(TEMPLATE_FILTERS, &superset, &t).unwrap());
        assert!(!matches(TEMPLATE_FILTERS, &partial, &t).unwrap());
    }

    #[test]
    fn test_all_keys_must_hold() {
        let t = template("test", 900, &["rule-arn"]);
        let f = filter(json!({
            "rulesPackageArns": ["rule-arn"],
            "durationRange": {"minSeconds": 1000, "maxSeconds": 2000}
        }));
        assert!(!matches(TEMPLATE_FILTERS, &f, &t).unwrap());
    }

    #[test]
    fn test_malformed_range_is_invalid_filter_value() {
        let t = template("test", 900, &[]);
        let f = filter(json!({"durationRange": {"minSeconds": 800}}));
        let err = matches(TEMPLATE_FILTERS, &f, &t).unwrap_err();
        assert_eq!(err.code(), "InvalidFilterValue");
        assert!(err.to_string().contains("durationRange"));
    }

    #[test]
    fn test_malformed_key_reported_after_rejecting_key() {
        let t = template("test", 900, &[]);
        let f = filter(json!({"namePattern": "nope", "rulesPackageArns": "not-a-list"}));
        assert!(matches(TEMPLATE_FILTERS, &f, &t).is_err());
    }

    #[test]
    fn test_run_filters() {
        let run = AssessmentRun::start(&template("test", 900, &["rule-arn"]), "test run");
        let now = Utc::now().timestamp();
        let f = filter(json!({
            "namePattern": "run",
            "states": ["START_DATA_COLLECTION_PENDING"],
            "durationRange": {"minSeconds": 800, "maxSeconds": 900},
            "rulesPackageArns": ["rule-arn"],
            "startTimeRange": {"beginDate": now - 60, "endDate": now + 60},
            "completionTimeRange": {"beginDate": now, "endDate": now + 4000},
            "stateChangeTimeRange": {"beginDate": now - 60, "endDate": now + 900}
        }));
        assert!(matches(RUN_FILTERS, &f, &run).unwrap());

        let f = filter(json!({"states": ["COMPLETED"]}));
        assert!(!matches(RUN_FILTERS, &f, &run).unwrap());
    }

    #[test]
    fn test_completion_time_range_uses_duration() {
        let run = AssessmentRun::start(&template("test", 3600, &[]), "r");
        let now = Utc::now().timestamp();
        let too_early = filter(json!({"completionTimeRange": {"beginDate": now - 10, "endDate": now + 10}}));
        assert!(!matches(RUN_FILTERS, &too_early, &run).unwrap());
    }

    #[test]
    fn test_start_time_range_honours_end_date() {
        let run = AssessmentRun::start(&template("test", 900, &[]), "r");
        let now = Utc::now().timestamp();
        let past = filter(json!({"startTimeRange": {"beginDate": 1588604930, "endDate": now - 3600}}));
        assert!(!matches(RUN_FILTERS, &past, &run).unwrap());
    }

    #[test]
    fn test_fractional_timestamps_accepted() {
        let run = AssessmentRun::start(&template("test", 900, &[]), "r");
        let now = Utc::now().timestamp() as f64;
        let f = filter(json!({"startTimeRange": {"beginDate": now - 5.5, "endDate": now + 10.25}}));
        assert!(matches(RUN_FILTERS, &f, &run).unwrap());
    }

    #[test]
    fn test_finding_filters() {
        let mut finding = finding();
        let f = filter(json!({
            "agentIds": ["i-0123abcd", "i-other"],
            "ruleNames": ["Insecure Server Protocols"],
            "severities": ["Informational", "High"],
            "rulesPackageArns": ["rp-1"]
        }));
        assert!(matches(FINDING_FILTERS, &f, &finding).unwrap());

        let asg = filter(json!({"autoScalingGroups": ["web-asg"]}));
        assert!(!matches(FINDING_FILTERS, &asg, &finding).unwrap());
        finding.auto_scaling_group = Some("web-asg".to_string());
        assert!(matches(FINDING_FILTERS, &asg, &finding).unwrap());
    }

    #[test]
    fn test_target_filter_shape() {
        assert_eq!(
            target_name_pattern(&filter(json!({"assessmentTargetNamePattern": "web"}))).unwrap(),
            "web"
        );
        for bad in [
            json!({}),
            json!({"unsupportedKey": "x"}),
            json!({"assessmentTargetNamePattern": "web", "extra": "x"}),
        ] {
            let err = target_name_pattern(&filter(bad)).unwrap_err();
            assert_eq!(err.code(), "InvalidFilterValue");
        }
        assert!(target_name_pattern(&filter(json!({"assessmentTargetNamePattern": 7}))).is_err());
    }

    #[test]
    fn test_every_table_key_is_unique() {
        fn unique<E>(rules: &[FilterRule<E>]) -> bool {
            let mut keys: Vec<_> = rules.iter().map(|r| r.key).collect();
            keys.sort_unstable();
            keys.windows(2).all(|w| w[0] != w[1])
        }
        assert!(unique(TEMPLATE_FILTERS));
        assert!(unique(RUN_FILTERS));
        assert!(unique(FINDING_FILTERS));
    }
}
