//! Per-region Inspector backend
//!
//! Owns every entity created in one region, keyed by ARN in insertion order
//! so listings are deterministic. The backend is plain single-threaded state;
//! callers sharing it across threads serialize access themselves (see
//! [`crate::service::regions`]).

use super::catalog::{self, RulesPackage};
use super::error::{InspectorError, Result};
use super::filter::{self, Filter, FilterRule};
use super::models::{
    AssessmentRun, AssessmentTarget, AssessmentTemplate, Attribute, Finding, FindingDescription,
    ResourceGroup, ResourceGroupTag, Subscription,
};
use chrono::Utc;
use indexmap::IndexMap;
use serde::Deserialize;

/// Resource group tag as received on the wire; both fields are checked
/// before a [`ResourceGroupTag`] is built from it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagEntry {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl TagEntry {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: Some(key.to_string()),
            value: Some(value.to_string()),
        }
    }
}

/// In-memory state of the Inspector service for one region
#[derive(Debug)]
pub struct InspectorBackend {
    region: String,
    account_id: String,
    resource_groups: IndexMap<String, ResourceGroup>,
    targets: IndexMap<String, AssessmentTarget>,
    templates: IndexMap<String, AssessmentTemplate>,
    runs: IndexMap<String, AssessmentRun>,
    findings: IndexMap<String, Finding>,
}

impl InspectorBackend {
    pub fn new(region: &str, account_id: &str) -> Self {
        Self {
            region: region.to_string(),
            account_id: account_id.to_string(),
            resource_groups: IndexMap::new(),
            targets: IndexMap::new(),
            templates: IndexMap::new(),
            runs: IndexMap::new(),
            findings: IndexMap::new(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Drop every entity, keeping region and account
    pub fn reset(&mut self) {
        tracing::info!("Resetting inspector backend for {}", self.region);
        self.resource_groups.clear();
        self.targets.clear();
        self.templates.clear();
        self.runs.clear();
        self.findings.clear();
    }

    // =========================================================================
    // Creation
    // =========================================================================

    pub fn create_resource_group(&mut self, tags: Vec<TagEntry>) -> Result<&ResourceGroup> {
        let tags = tags
            .into_iter()
            .map(|tag| match (tag.key, tag.value) {
                (Some(key), Some(value)) => Ok(ResourceGroupTag { key, value }),
                _ => Err(InspectorError::InvalidFilterKey(
                    "Key and Value required.".to_string(),
                )),
            })
            .collect::<Result<Vec<_>>>()?;

        let group = ResourceGroup::new(&self.region, &self.account_id, tags);
        tracing::info!("Created resource group {}", group.arn);
        let (index, _) = self.resource_groups.insert_full(group.arn.clone(), group);
        Ok(&self.resource_groups[index])
    }

    /// Create a target. The resource group ARN is stored as given.
    pub fn create_assessment_target(
        &mut self,
        name: &str,
        resource_group_arn: Option<String>,
    ) -> &AssessmentTarget {
        let target = AssessmentTarget::new(&self.region, &self.account_id, name, resource_group_arn);
        tracing::info!("Created assessment target {} ({})", target.arn, name);
        let (index, _) = self.targets.insert_full(target.arn.clone(), target);
        &self.targets[index]
    }

    /// Create a template. The target ARN is stored as given.
    pub fn create_assessment_template(
        &mut self,
        target_arn: &str,
        name: &str,
        duration_in_seconds: i64,
        rules_package_arns: Vec<String>,
        user_attributes_for_findings: Vec<Attribute>,
    ) -> &AssessmentTemplate {
        let template = AssessmentTemplate::new(
            &self.region,
            target_arn,
            name,
            duration_in_seconds,
            rules_package_arns,
            user_attributes_for_findings,
        );
        tracing::info!("Created assessment template {} ({})", template.arn, name);
        let (index, _) = self.templates.insert_full(template.arn.clone(), template);
        &self.templates[index]
    }

    /// Start a run of a template, reporting one synthetic finding for it
    pub fn start_assessment_run(
        &mut self,
        template_arn: &str,
        name: Option<&str>,
    ) -> Result<&AssessmentRun> {
        let template = self
            .templates
            .get(template_arn)
            .ok_or_else(|| no_such_template(template_arn))?;

        let name = match name {
            Some(name) => name.to_string(),
            None => format!(
                "Run - {} - {}",
                template.name,
                Utc::now().format("%Y-%m-%dT%H:%M:%S")
            ),
        };
        let run = AssessmentRun::start(template, &name);

        let synthetic = catalog::synthetic_finding();
        let finding = Finding::for_run(
            &run,
            &synthetic.rule_name,
            &synthetic.title,
            synthetic.severity,
        );

        tracing::info!("Started assessment run {} with finding {}", run.arn, finding.arn);
        self.findings.insert(finding.arn.clone(), finding);
        let (index, _) = self.runs.insert_full(run.arn.clone(), run);
        Ok(&self.runs[index])
    }

    pub fn subscribe_to_event(&mut self, resource_arn: &str, event: &str, topic_arn: &str) -> Result<()> {
        let template = self
            .templates
            .get_mut(resource_arn)
            .ok_or_else(|| no_such_template(resource_arn))?;
        template.subscribe(event, topic_arn);
        tracing::info!("Subscribed {} to {} on {}", topic_arn, event, resource_arn);
        Ok(())
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// List target ARNs, optionally narrowed by `assessmentTargetNamePattern`
    pub fn list_assessment_targets(&self, filter: Option<&Filter>) -> Result<Vec<String>> {
        let pattern = filter.map(filter::target_name_pattern).transpose()?;
        tracing::debug!("list_assessment_targets: pattern={:?}", pattern);

        Ok(self
            .targets
            .values()
            .filter(|target| pattern.map_or(true, |p| filter::target_matches(target, p)))
            .map(|target| target.arn.clone())
            .collect())
    }

    pub fn list_assessment_templates(
        &self,
        target_arns: Option<&[String]>,
        filter: Option<&Filter>,
    ) -> Result<Vec<String>> {
        tracing::debug!(
            "list_assessment_templates: targets={:?}, filter={:?}",
            target_arns,
            filter
        );
        select(
            &self.templates,
            target_arns,
            template_parent,
            filter,
            filter::TEMPLATE_FILTERS,
        )
    }

    pub fn list_assessment_runs(
        &self,
        template_arns: Option<&[String]>,
        filter: Option<&Filter>,
    ) -> Result<Vec<String>> {
        tracing::debug!(
            "list_assessment_runs: templates={:?}, filter={:?}",
            template_arns,
            filter
        );
        select(&self.runs, template_arns, run_parent, filter, filter::RUN_FILTERS)
    }

    pub fn list_findings(
        &self,
        run_arns: Option<&[String]>,
        filter: Option<&Filter>,
    ) -> Result<Vec<String>> {
        tracing::debug!("list_findings: runs={:?}, filter={:?}", run_arns, filter);
        select(
            &self.findings,
            run_arns,
            finding_parent,
            filter,
            filter::FINDING_FILTERS,
        )
    }

    /// Subscriptions of one template, or of every template when no ARN is given
    pub fn list_event_subscriptions(&self, resource_arn: Option<&str>) -> Result<Vec<Subscription>> {
        match resource_arn {
            Some(arn) => {
                let template = self.templates.get(arn).ok_or_else(|| no_such_template(arn))?;
                Ok(template.subscriptions_by_topic())
            }
            None => Ok(self
                .templates
                .values()
                .flat_map(|template| template.subscriptions_by_topic())
                .collect()),
        }
    }

    pub fn list_rules_packages(&self) -> Vec<String> {
        catalog::rules_package_arns(&self.region)
    }

    // =========================================================================
    // Describe (unknown ARNs are skipped)
    // =========================================================================

    pub fn describe_findings(&self, arns: &[String]) -> Vec<FindingDescription> {
        pick(&self.findings, arns)
            .into_iter()
            .map(Finding::describe)
            .collect()
    }

    pub fn describe_assessment_targets(&self, arns: &[String]) -> Vec<&AssessmentTarget> {
        pick(&self.targets, arns)
    }

    pub fn describe_assessment_templates(&self, arns: &[String]) -> Vec<&AssessmentTemplate> {
        pick(&self.templates, arns)
    }

    pub fn describe_assessment_runs(&self, arns: &[String]) -> Vec<&AssessmentRun> {
        pick(&self.runs, arns)
    }

    pub fn describe_resource_groups(&self, arns: &[String]) -> Vec<&ResourceGroup> {
        pick(&self.resource_groups, arns)
    }

    pub fn describe_rules_packages(&self, arns: &[String]) -> Vec<RulesPackage> {
        catalog::rules_packages(&self.region)
            .into_iter()
            .filter(|package| arns.contains(&package.arn))
            .collect()
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn template(&self, arn: &str) -> Option<&AssessmentTemplate> {
        self.templates.get(arn)
    }

    pub fn run(&self, arn: &str) -> Option<&AssessmentRun> {
        self.runs.get(arn)
    }

    pub fn finding(&self, arn: &str) -> Option<&Finding> {
        self.findings.get(arn)
    }
}

fn no_such_template(arn: &str) -> InspectorError {
    InspectorError::NoSuchEntity {
        entity: "Assessment template",
        arn: arn.to_string(),
    }
}

fn template_parent(template: &AssessmentTemplate) -> &str {
    &template.assessment_target_arn
}

fn run_parent(run: &AssessmentRun) -> &str {
    &run.assessment_template_arn
}

fn finding_parent(finding: &Finding) -> &str {
    &finding.assessment_run_arn
}

/// ARNs of the entities whose parent is listed (when parents are given) and
/// that satisfy the filter (when a filter is given), in insertion order
fn select<E>(
    items: &IndexMap<String, E>,
    parent_arns: Option<&[String]>,
    parent_of: fn(&E) -> &str,
    filter: Option<&Filter>,
    rules: &[FilterRule<E>],
) -> Result<Vec<String>> {
    let mut arns = Vec::new();

    for (arn, item) in items {
        if let Some(parents) = parent_arns {
            let parent = parent_of(item);
            if !parents.iter().any(|p| p == parent) {
                continue;
            }
        }
        if let Some(filter) = filter {
            if !filter::matches(rules, filter, item)? {
                continue;
            }
        }
        arns.push(arn.clone());
    }

    Ok(arns)
}

/// Entities for the requested ARNs, in request order, skipping unknown ones
fn pick<'a, E>(items: &'a IndexMap<String, E>, arns: &[String]) -> Vec<&'a E> {
    arns.iter().filter_map(|arn| items.get(arn)).collect()
}
