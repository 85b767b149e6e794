use std::path::Path;

use rollout_cloud::{AwsClient, CheckResult, DockerClient, DoctorReport, StaticCredentials};
use rollout_core::{CONFIG_FILE_NAME, RolloutConfig};

pub async fn doctor(project_dir: &Path) -> anyhow::Result<()> {
    let mut report = DoctorReport::probe(&AwsClient::new(), &DockerClient::new()).await;

    report.credentials = if StaticCredentials::from_env().is_complete() {
        CheckResult::ok("AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY set")
    } else {
        CheckResult::fail("AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY not set")
    };

    // Every check runs even when rollout.toml is missing or invalid.
    let config = if project_dir.join(CONFIG_FILE_NAME).exists() {
        match RolloutConfig::load(project_dir) {
            Ok(config) => {
                report.config_file = CheckResult::ok("Found");
                Some(config)
            }
            Err(e) => {
                report.config_file = CheckResult::fail(&e.to_string());
                None
            }
        }
    } else {
        report.config_file = CheckResult::fail("Not found");
        None
    };

    report.deploy_target = match config.as_ref().map(|c| (&c.deploy.cluster, &c.deploy.service)) {
        Some((Some(cluster), Some(service))) => CheckResult::ok(&format!("{cluster}/{service}")),
        Some(_) => CheckResult::fail("[deploy].cluster and [deploy].service must be set"),
        None => CheckResult::fail("no configuration"),
    };

    println!();
    for (name, check) in report.checks() {
        println!("  {name:<14} {}  {}", check.icon(), check.detail);
    }
    println!();

    if !report.all_passed() {
        anyhow::bail!("some checks failed — see above for details");
    }

    println!("All checks passed.");
    Ok(())
}
