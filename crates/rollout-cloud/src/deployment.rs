//! Structured view of an ECS service as returned by `update-service` and
//! `describe-services`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStatus {
    #[serde(default)]
    pub service_arn: Option<String>,
    pub service_name: String,
    #[serde(default)]
    pub cluster_arn: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub desired_count: u32,
    #[serde(default)]
    pub running_count: u32,
    #[serde(default)]
    pub pending_count: u32,
    #[serde(default)]
    pub task_definition: Option<String>,
    #[serde(default)]
    pub deployments: Vec<Deployment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub task_definition: Option<String>,
    #[serde(default)]
    pub desired_count: u32,
    #[serde(default)]
    pub running_count: u32,
    #[serde(default)]
    pub pending_count: u32,
    #[serde(default)]
    pub rollout_state: Option<String>,
    #[serde(default)]
    pub created_at: Option<serde_json::Value>,
}

impl DeploymentStatus {
    /// The deployment ECS marks `PRIMARY`, i.e. the one just requested.
    pub fn primary(&self) -> Option<&Deployment> {
        self.deployments.iter().find(|d| d.status == "PRIMARY")
    }
}

#[derive(Deserialize)]
pub(crate) struct UpdateServiceResponse {
    pub service: DeploymentStatus,
}

#[derive(Deserialize)]
pub(crate) struct DescribeServicesResponse {
    #[serde(default)]
    pub services: Vec<DeploymentStatus>,
}
