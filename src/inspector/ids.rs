//! Random identifiers and ARN construction

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of the random suffix in every generated ARN
pub const ID_LENGTH: usize = 8;

/// Generate a random alphanumeric id.
///
/// Uniqueness is not checked; with 62^8 possible values a collision inside
/// one test run is not a practical concern.
pub fn random_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LENGTH)
        .map(char::from)
        .collect()
}

fn service_arn(region: &str, account_id: &str, resource: &str) -> String {
    format!("arn:aws:inspector:{}:{}:{}", region, account_id, resource)
}

pub fn resource_group_arn(region: &str, account_id: &str, id: &str) -> String {
    service_arn(region, account_id, &format!("resourcegroup/0-{}", id))
}

pub fn target_arn(region: &str, account_id: &str, id: &str) -> String {
    service_arn(region, account_id, &format!("target/0-{}", id))
}

pub fn template_arn(target_arn: &str, id: &str) -> String {
    format!("{}/template/0-{}", target_arn, id)
}

pub fn run_arn(template_arn: &str, id: &str) -> String {
    format!("{}/run/0-{}", template_arn, id)
}

pub fn finding_arn(run_arn: &str, id: &str) -> String {
    format!("{}/finding/0-{}", run_arn, id)
}

pub fn rules_package_arn(region: &str, account_id: &str, package_id: &str) -> String {
    service_arn(region, account_id, &format!("rulespackage/{}", package_id))
}
