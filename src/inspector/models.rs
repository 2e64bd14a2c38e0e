//! Inspector resource entities
//!
//! Each entity carries its ARN, derived once at construction from the
//! parent ARN (or region/account) and a random id. Entities serialize to the
//! camelCase shapes returned by the describe operations, with timestamps as
//! epoch seconds.

use super::ids;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Assessment durations accepted by `CreateAssessmentTemplate`, in seconds
pub const MIN_DURATION_SECONDS: i64 = 180;
pub const MAX_DURATION_SECONDS: i64 = 86400;

/// Key/value pair selecting instances by tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroupTag {
    pub key: String,
    pub value: String,
}

/// User attribute attached to every finding of a template.
/// Unlike resource group tags the value is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroup {
    pub arn: String,
    #[serde(skip)]
    pub region: String,
    pub tags: Vec<ResourceGroupTag>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
}

impl ResourceGroup {
    pub fn new(region: &str, account_id: &str, tags: Vec<ResourceGroupTag>) -> Self {
        Self {
            arn: ids::resource_group_arn(region, account_id, &ids::random_id()),
            region: region.to_string(),
            tags,
            created_at: Utc::now(),
        }
    }
}

/// Named scan scope, optionally bound to a resource group
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentTarget {
    pub arn: String,
    #[serde(skip)]
    pub region: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group_arn: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub updated_at: DateTime<Utc>,
}

impl AssessmentTarget {
    pub fn new(
        region: &str,
        account_id: &str,
        name: &str,
        resource_group_arn: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            arn: ids::target_arn(region, account_id, &ids::random_id()),
            region: region.to_string(),
            name: name.to_string(),
            resource_group_arn,
            created_at: now,
            updated_at: now,
        }
    }
}

/// SNS topic notified for an event on a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSubscription {
    pub event: String,
    #[serde(skip)]
    pub topic_arn: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub subscribed_at: DateTime<Utc>,
}

/// Events of one template delivered to one topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub resource_arn: String,
    pub topic_arn: String,
    pub event_subscriptions: Vec<EventSubscription>,
}

/// Reusable scan configuration bound to a target
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentTemplate {
    pub arn: String,
    #[serde(skip)]
    pub region: String,
    pub assessment_target_arn: String,
    pub name: String,
    pub duration_in_seconds: i64,
    pub rules_package_arns: Vec<String>,
    pub user_attributes_for_findings: Vec<Attribute>,
    /// Append-only; the only part of a template that changes after creation
    #[serde(skip)]
    pub subscriptions: Vec<EventSubscription>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
}

impl AssessmentTemplate {
    pub fn new(
        region: &str,
        assessment_target_arn: &str,
        name: &str,
        duration_in_seconds: i64,
        rules_package_arns: Vec<String>,
        user_attributes_for_findings: Vec<Attribute>,
    ) -> Self {
        Self {
            arn: ids::template_arn(assessment_target_arn, &ids::random_id()),
            region: region.to_string(),
            assessment_target_arn: assessment_target_arn.to_string(),
            name: name.to_string(),
            duration_in_seconds,
            rules_package_arns,
            user_attributes_for_findings,
            subscriptions: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn subscribe(&mut self, event: &str, topic_arn: &str) {
        self.subscriptions.push(EventSubscription {
            event: event.to_string(),
            topic_arn: topic_arn.to_string(),
            subscribed_at: Utc::now(),
        });
    }

    /// Subscriptions grouped per topic, topics in first-subscribed order
    pub fn subscriptions_by_topic(&self) -> Vec<Subscription> {
        let mut grouped: Vec<Subscription> = Vec::new();
        for subscription in &self.subscriptions {
            match grouped
                .iter_mut()
                .find(|s| s.topic_arn == subscription.topic_arn)
            {
                Some(entry) => entry.event_subscriptions.push(subscription.clone()),
                None => grouped.push(Subscription {
                    resource_arn: self.arn.clone(),
                    topic_arn: subscription.topic_arn.clone(),
                    event_subscriptions: vec![subscription.clone()],
                }),
            }
        }
        grouped
    }
}

/// Lifecycle state of an assessment run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Created,
    StartDataCollectionPending,
    StartDataCollectionInProgress,
    CollectingData,
    StopDataCollectionPending,
    DataCollected,
    StartEvaluatingRulesPending,
    EvaluatingRules,
    Failed,
    Error,
    Completed,
    CompletedWithErrors,
    Canceled,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::StartDataCollectionPending => "START_DATA_COLLECTION_PENDING",
            Self::StartDataCollectionInProgress => "START_DATA_COLLECTION_IN_PROGRESS",
            Self::CollectingData => "COLLECTING_DATA",
            Self::StopDataCollectionPending => "STOP_DATA_COLLECTION_PENDING",
            Self::DataCollected => "DATA_COLLECTED",
            Self::StartEvaluatingRulesPending => "START_EVALUATING_RULES_PENDING",
            Self::EvaluatingRules => "EVALUATING_RULES",
            Self::Failed => "FAILED",
            Self::Error => "ERROR",
            Self::Completed => "COMPLETED",
            Self::CompletedWithErrors => "COMPLETED_WITH_ERRORS",
            Self::Canceled => "CANCELED",
        }
    }
}

/// One executed instance of a template.
///
/// Duration, rules packages and user attributes are copied from the template
/// when the run starts, so run filters never need to reach back to it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRun {
    pub arn: String,
    #[serde(skip)]
    pub region: String,
    pub assessment_template_arn: String,
    pub name: String,
    pub state: RunState,
    pub duration_in_seconds: i64,
    pub rules_package_arns: Vec<String>,
    pub user_attributes_for_findings: Vec<Attribute>,
    #[serde(rename = "createdAt", with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "startedAt", with = "chrono::serde::ts_seconds")]
    pub start_time: DateTime<Utc>,
    #[serde(rename = "completedAt", with = "chrono::serde::ts_seconds")]
    pub completion_time: DateTime<Utc>,
    #[serde(rename = "stateChangedAt", with = "chrono::serde::ts_seconds")]
    pub state_change_time: DateTime<Utc>,
}

impl AssessmentRun {
    pub fn start(template: &AssessmentTemplate, name: &str) -> Self {
        let now = Utc::now();
        Self {
            arn: ids::run_arn(&template.arn, &ids::random_id()),
            region: template.region.clone(),
            assessment_template_arn: template.arn.clone(),
            name: name.to_string(),
            state: RunState::StartDataCollectionPending,
            duration_in_seconds: template.duration_in_seconds,
            rules_package_arns: template.rules_package_arns.clone(),
            user_attributes_for_findings: template.user_attributes_for_findings.clone(),
            created_at: now,
            start_time: now,
            completion_time: now,
            state_change_time: now,
        }
    }

    /// Moment the run is expected to finish: completion time plus the
    /// template duration, clamped to the representable range
    pub fn expected_completion(&self) -> DateTime<Utc> {
        TimeDelta::try_seconds(self.duration_in_seconds)
            .and_then(|duration| self.completion_time.checked_add_signed(duration))
            .unwrap_or(if self.duration_in_seconds < 0 {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            })
    }

    pub fn set_state(&mut self, state: RunState) {
        self.state = state;
        self.state_change_time = Utc::now();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Informational,
    Undefined,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Informational => "Informational",
            Self::Undefined => "Undefined",
        }
    }
}

/// Result record produced by a run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub arn: String,
    pub region: String,
    pub assessment_run_arn: String,
    pub agent_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_scaling_group: Option<String>,
    pub rule_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_package_arn: Option<String>,
    pub severity: Severity,
    pub title: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
}

/// Attributes returned by `DescribeFindings`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingDescription {
    pub arn: String,
    pub region: String,
    pub agent_id: String,
}

impl Finding {
    /// Finding reported by `run` on a freshly generated agent
    pub fn for_run(run: &AssessmentRun, rule_name: &str, title: &str, severity: Severity) -> Self {
        Self {
            arn: ids::finding_arn(&run.arn, &ids::random_id()),
            region: run.region.clone(),
            assessment_run_arn: run.arn.clone(),
            agent_id: format!("i-{}", ids::random_id().to_lowercase()),
            auto_scaling_group: None,
            rule_name: rule_name.to_string(),
            rules_package_arn: run.rules_package_arns.first().cloned(),
            severity,
            title: title.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn describe(&self) -> FindingDescription {
        FindingDescription {
            arn: self.arn.clone(),
            region: self.region.clone(),
            agent_id: self.agent_id.clone(),
        }
    }
}
