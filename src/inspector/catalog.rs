//! Static service catalog
//!
//! Supported regions, the rules packages every region publishes and the
//! attributes of the synthetic finding created with each run. The data is
//! embedded from `src/resources/inspector.json` at compile time.

use super::ids;
use super::models::Severity;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Embedded catalog JSON (compiled into the binary)
const CATALOG_FILE: &str = include_str!("../resources/inspector.json");

/// Rules package definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct RulesPackageDef {
    pub id: String,
    pub name: String,
}

/// Attributes of the finding each run reports
#[derive(Debug, Clone, Deserialize)]
pub struct SyntheticFindingDef {
    pub rule_name: String,
    pub title: String,
    pub severity: Severity,
}

/// Root structure of resources/inspector.json
#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    pub regions: Vec<String>,
    pub rules_package_account_id: String,
    pub rules_packages: Vec<RulesPackageDef>,
    pub synthetic_finding: SyntheticFindingDef,
}

static CATALOG: OnceLock<Catalog> = OnceLock::new();

/// Get the catalog (parsed from the embedded JSON on first access)
pub fn get_catalog() -> &'static Catalog {
    CATALOG.get_or_init(|| {
        serde_json::from_str(CATALOG_FILE)
            .unwrap_or_else(|e| panic!("Failed to parse embedded catalog JSON: {}", e))
    })
}

/// Regions served when the configuration does not list any
pub fn supported_regions() -> &'static [String] {
    &get_catalog().regions
}

/// Rules package as returned by `DescribeRulesPackages`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesPackage {
    pub arn: String,
    pub name: String,
    pub version: &'static str,
    pub provider: &'static str,
}

/// Rules packages published in a region, in catalog order
pub fn rules_packages(region: &str) -> Vec<RulesPackage> {
    let catalog = get_catalog();
    catalog
        .rules_packages
        .iter()
        .map(|package| RulesPackage {
            arn: ids::rules_package_arn(region, &catalog.rules_package_account_id, &package.id),
            name: package.name.clone(),
            version: "1.1",
            provider: "Amazon Web Services, Inc.",
        })
        .collect()
}

pub fn rules_package_arns(region: &str) -> Vec<String> {
    rules_packages(region)
        .into_iter()
        .map(|package| package.arn)
        .collect()
}

pub fn synthetic_finding() -> &'static SyntheticFindingDef {
    &get_catalog().synthetic_finding
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads_successfully() {
        let catalog = get_catalog();
        assert!(!catalog.regions.is_empty(), "Catalog should list regions");
        assert_eq!(catalog.rules_packages.len(), 4);
    }

    #[test]
    fn test_us_east_1_is_supported() {
        assert!(supported_regions().iter().any(|r| r == "us-east-1"));
    }

    #[test]
    fn test_rules_package_arns_are_regional() {
        let arns = rules_package_arns("eu-west-1");
        assert_eq!(arns.len(), 4);
        assert!(arns
            .iter()
            .all(|arn| arn.starts_with("arn:aws:inspector:eu-west-1:316112463485:rulespackage/0-")));
    }

    #[test]
    fn test_synthetic_finding_defaults() {
        let finding = synthetic_finding();
        assert!(!finding.rule_name.is_empty());
        assert_eq!(finding.severity, Severity::Informational);
    }
}
