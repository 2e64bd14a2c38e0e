//! Action dispatch
//!
//! Maps Inspector action names to backend calls: extracts the wire
//! parameters, invokes the backend and shapes the JSON response document.

use crate::inspector::{Filter, InspectorBackend, InspectorError, Result, TagEntry};
use crate::inspector::models::{Attribute, MAX_DURATION_SECONDS, MIN_DURATION_SECONDS};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Invoke an Inspector action against one region's backend
pub fn invoke(backend: &mut InspectorBackend, operation: &str, params: &Value) -> Result<Value> {
    tracing::debug!("invoke: region={}, operation={}", backend.region(), operation);

    match operation {
        "CreateResourceGroup" | "DescribeResourceGroups" => {
            invoke_resource_group(operation, backend, params)
        }
        "CreateAssessmentTarget" | "ListAssessmentTargets" | "DescribeAssessmentTargets" => {
            invoke_target(operation, backend, params)
        }
        "CreateAssessmentTemplate"
        | "ListAssessmentTemplates"
        | "DescribeAssessmentTemplates"
        | "SubscribeToEvent"
        | "ListEventSubscriptions" => invoke_template(operation, backend, params),
        "StartAssessmentRun" | "ListAssessmentRuns" | "DescribeAssessmentRuns" => {
            invoke_run(operation, backend, params)
        }
        "ListFindings" | "DescribeFindings" => invoke_finding(operation, backend, params),
        "ListRulesPackages" | "DescribeRulesPackages" => {
            invoke_rules_package(operation, backend, params)
        }
        _ => Err(InspectorError::UnknownOperation(operation.to_string())),
    }
}

// =============================================================================
// Resource groups
// =============================================================================

fn invoke_resource_group(
    operation: &str,
    backend: &mut InspectorBackend,
    params: &Value,
) -> Result<Value> {
    match operation {
        "CreateResourceGroup" => {
            let tags: Vec<TagEntry> = get_param_items(params, "resourceGroupTags")?
                .ok_or_else(|| InspectorError::missing_param("resourceGroupTags"))?;
            let group = backend.create_resource_group(tags)?;
            Ok(json!({ "resourceGroupArn": group.arn }))
        }
        "DescribeResourceGroups" => {
            let arns = get_param_list(params, "resourceGroupArns")?
                .ok_or_else(|| InspectorError::missing_param("resourceGroupArns"))?;
            let groups = backend.describe_resource_groups(&arns);
            Ok(json!({ "resourceGroups": groups, "failedItems": {} }))
        }
        _ => Err(InspectorError::UnknownOperation(operation.to_string())),
    }
}

// =============================================================================
// Assessment targets
// =============================================================================

fn invoke_target(operation: &str, backend: &mut InspectorBackend, params: &Value) -> Result<Value> {
    match operation {
        "CreateAssessmentTarget" => {
            let name = get_param_str(params, "assessmentTargetName")?;
            let resource_group_arn = get_param_str_opt(params, "resourceGroupArn");
            let target = backend.create_assessment_target(name, resource_group_arn);
            Ok(json!({ "assessmentTargetArn": target.arn }))
        }
        "ListAssessmentTargets" => {
            let filter = get_param_filter(params)?;
            let arns = backend.list_assessment_targets(filter)?;
            paginated(params, "assessmentTargetArns", arns)
        }
        "DescribeAssessmentTargets" => {
            let arns = get_param_list(params, "assessmentTargetArns")?
                .ok_or_else(|| InspectorError::missing_param("assessmentTargetArns"))?;
            let targets = backend.describe_assessment_targets(&arns);
            Ok(json!({ "assessmentTargets": targets, "failedItems": {} }))
        }
        _ => Err(InspectorError::UnknownOperation(operation.to_string())),
    }
}

// =============================================================================
// Assessment templates and event subscriptions
// =============================================================================

fn invoke_template(operation: &str, backend: &mut InspectorBackend, params: &Value) -> Result<Value> {
    match operation {
        "CreateAssessmentTemplate" => {
            let target_arn = get_param_str(params, "assessmentTargetArn")?;
            let name = get_param_str(params, "assessmentTemplateName")?;
            let duration = get_param_i64(params, "durationInSeconds")?;
            if !(MIN_DURATION_SECONDS..=MAX_DURATION_SECONDS).contains(&duration) {
                return Err(InspectorError::InvalidInput(format!(
                    "durationInSeconds must be between {} and {}",
                    MIN_DURATION_SECONDS, MAX_DURATION_SECONDS
                )));
            }
            let rules_package_arns = get_param_list(params, "rulesPackageArns")?.unwrap_or_default();
            let user_attributes: Vec<Attribute> =
                get_param_items(params, "userAttributesForFindings")?.unwrap_or_default();
            let template = backend.create_assessment_template(
                target_arn,
                name,
                duration,
                rules_package_arns,
                user_attributes,
            );
            Ok(json!({ "assessmentTemplateArn": template.arn }))
        }
        "ListAssessmentTemplates" => {
            let target_arns = get_param_list(params, "assessmentTargetArns")?;
            let filter = get_param_filter(params)?;
            let arns = backend.list_assessment_templates(target_arns.as_deref(), filter)?;
            paginated(params, "assessmentTemplateArns", arns)
        }
        "DescribeAssessmentTemplates" => {
            let arns = get_param_list(params, "assessmentTemplateArns")?
                .ok_or_else(|| InspectorError::missing_param("assessmentTemplateArns"))?;
            let templates = backend.describe_assessment_templates(&arns);
            Ok(json!({ "assessmentTemplates": templates, "failedItems": {} }))
        }
        "SubscribeToEvent" => {
            let resource_arn = get_param_str(params, "resourceArn")?;
            let event = get_param_str(params, "event")?;
            let topic_arn = get_param_str(params, "topicArn")?;
            backend.subscribe_to_event(resource_arn, event, topic_arn)?;
            // Fixed acknowledgement; the action has no output members
            Ok(json!({}))
        }
        "ListEventSubscriptions" => {
            let resource_arn = get_param_str_opt(params, "resourceArn");
            let subscriptions = backend.list_event_subscriptions(resource_arn.as_deref())?;
            Ok(json!({ "subscriptions": subscriptions }))
        }
        _ => Err(InspectorError::UnknownOperation(operation.to_string())),
    }
}

// =============================================================================
// Assessment runs
// =============================================================================

fn invoke_run(operation: &str, backend: &mut InspectorBackend, params: &Value) -> Result<Value> {
    match operation {
        "StartAssessmentRun" => {
            let template_arn = get_param_str(params, "assessmentTemplateArn")?;
            let name = get_param_str_opt(params, "assessmentRunName");
            let run = backend.start_assessment_run(template_arn, name.as_deref())?;
            Ok(json!({ "assessmentRunArn": run.arn }))
        }
        "ListAssessmentRuns" => {
            let template_arns = get_param_list(params, "assessmentTemplateArns")?;
            let filter = get_param_filter(params)?;
            let arns = backend.list_assessment_runs(template_arns.as_deref(), filter)?;
            paginated(params, "assessmentRunArns", arns)
        }
        "DescribeAssessmentRuns" => {
            let arns = get_param_list(params, "assessmentRunArns")?
                .ok_or_else(|| InspectorError::missing_param("assessmentRunArns"))?;
            let runs = backend.describe_assessment_runs(&arns);
            Ok(json!({ "assessmentRuns": runs, "failedItems": {} }))
        }
        _ => Err(InspectorError::UnknownOperation(operation.to_string())),
    }
}

// =============================================================================
// Findings
// =============================================================================

fn invoke_finding(operation: &str, backend: &mut InspectorBackend, params: &Value) -> Result<Value> {
    match operation {
        "ListFindings" => {
            let run_arns = get_param_list(params, "assessmentRunArns")?;
            let filter = get_param_filter(params)?;
            let arns = backend.list_findings(run_arns.as_deref(), filter)?;
            paginated(params, "findingArns", arns)
        }
        "DescribeFindings" => {
            let arns = get_param_list(params, "findingArns")?
                .ok_or_else(|| InspectorError::missing_param("findingArns"))?;
            let findings = backend.describe_findings(&arns);
            Ok(json!({ "findings": findings, "failedItems": {} }))
        }
        _ => Err(InspectorError::UnknownOperation(operation.to_string())),
    }
}

// =============================================================================
// Rules packages
// =============================================================================

fn invoke_rules_package(
    operation: &str,
    backend: &mut InspectorBackend,
    params: &Value,
) -> Result<Value> {
    match operation {
        "ListRulesPackages" => {
            let arns = backend.list_rules_packages();
            paginated(params, "rulesPackageArns", arns)
        }
        "DescribeRulesPackages" => {
            let arns = get_param_list(params, "rulesPackageArns")?
                .ok_or_else(|| InspectorError::missing_param("rulesPackageArns"))?;
            let packages = backend.describe_rules_packages(&arns);
            Ok(json!({ "rulesPackages": packages, "failedItems": {} }))
        }
        _ => Err(InspectorError::UnknownOperation(operation.to_string())),
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn get_param_str<'p>(params: &'p Value, key: &str) -> Result<&'p str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| InspectorError::missing_param(key))
}

fn get_param_str_opt(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

fn get_param_i64(params: &Value, key: &str) -> Result<i64> {
    match params.get(key) {
        None | Some(Value::Null) => Err(InspectorError::missing_param(key)),
        Some(value) => value.as_i64().ok_or_else(|| {
            InspectorError::InvalidInput(format!("Parameter {} must be an integer", key))
        }),
    }
}

/// Optional list of strings; `None` when absent or null
fn get_param_list(params: &Value, key: &str) -> Result<Option<Vec<String>>> {
    get_param_items(params, key)
}

/// Optional list of structured items; `None` when absent or null
fn get_param_items<T: DeserializeOwned>(params: &Value, key: &str) -> Result<Option<Vec<T>>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Vec::<T>::deserialize(value).map(Some).map_err(|e| {
            InspectorError::InvalidInput(format!("Invalid value for parameter {}: {}", key, e))
        }),
    }
}

/// Optional `filter` object
fn get_param_filter(params: &Value) -> Result<Option<&Filter>> {
    match params.get("filter") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(filter)) => Ok(Some(filter)),
        Some(_) => Err(InspectorError::InvalidFilterValue(
            "Filter must be an object.".to_string(),
        )),
    }
}

/// Build a list response, honouring `maxResults`/`nextToken` when the client
/// sends them. The token is the offset of the next item.
fn paginated(params: &Value, field: &str, arns: Vec<String>) -> Result<Value> {
    let max_results = match params.get("maxResults") {
        None | Some(Value::Null) => None,
        Some(value) => Some(
            value
                .as_u64()
                .filter(|n| *n > 0)
                .ok_or_else(|| InspectorError::InvalidInput("maxResults must be positive".to_string()))?
                as usize,
        ),
    };
    let offset = match get_param_str_opt(params, "nextToken") {
        Some(token) => token
            .parse::<usize>()
            .map_err(|_| InspectorError::InvalidInput(format!("Invalid nextToken: {}", token)))?,
        None => 0,
    };

    let end = match max_results {
        Some(max) => offset.saturating_add(max).min(arns.len()),
        None => arns.len(),
    };
    let page: Vec<String> = arns
        .get(offset.min(arns.len())..end)
        .unwrap_or_default()
        .to_vec();

    let mut response = Map::new();
    response.insert(field.to_string(), json!(page));
    if end < arns.len() {
        response.insert("nextToken".to_string(), Value::String(end.to_string()));
    }
    Ok(Value::Object(response))
}
