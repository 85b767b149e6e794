//! Diagnostic report for `rollout doctor`.

use crate::aws::AwsClient;
use crate::docker::DockerClient;
use crate::executor::ToolExecutor;

#[derive(Debug, Default)]
pub struct DoctorReport {
    pub aws_cli: CheckResult,
    pub docker_cli: CheckResult,
    pub credentials: CheckResult,
    pub config_file: CheckResult,
    pub deploy_target: CheckResult,
}

impl DoctorReport {
    /// Probe the two external CLIs. The remaining checks are filled in by
    /// the caller, which owns the configuration and the environment.
    pub async fn probe<A: ToolExecutor, D: ToolExecutor>(
        aws: &AwsClient<A>,
        docker: &DockerClient<D>,
    ) -> Self {
        let aws_cli = match aws.version().await {
            Ok(v) => CheckResult::ok(&v),
            Err(e) => CheckResult::fail(&e.to_string()),
        };
        let docker_cli = match docker.version().await {
            Ok(v) => CheckResult::ok(&v),
            Err(e) => CheckResult::fail(&e.to_string()),
        };

        Self {
            aws_cli,
            docker_cli,
            ..Default::default()
        }
    }

    pub fn checks(&self) -> [(&'static str, &CheckResult); 5] {
        [
            ("aws CLI", &self.aws_cli),
            ("docker CLI", &self.docker_cli),
            ("Credentials", &self.credentials),
            ("rollout.toml", &self.config_file),
            ("Deploy target", &self.deploy_target),
        ]
    }

    pub fn all_passed(&self) -> bool {
        self.checks().iter().all(|(_, c)| c.passed)
    }
}

#[derive(Debug, Default, Clone)]
pub struct CheckResult {
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    pub fn ok(detail: &str) -> Self {
        Self {
            passed: true,
            detail: detail.to_owned(),
        }
    }

    pub fn fail(detail: &str) -> Self {
        Self {
            passed: false,
            detail: detail.to_owned(),
        }
    }

    pub fn icon(&self) -> &'static str {
        if self.passed { "OK" } else { "NG" }
    }
}
