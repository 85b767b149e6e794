use std::path::Path;

use rollout_cloud::{AwsClient, StaticCredentials};

use super::Project;

pub async fn status(project_dir: &Path) -> anyhow::Result<()> {
    let settings = Project::load(project_dir)?.settings()?;

    let client = AwsClient::new();
    let credentials = client
        .exchange_credentials(
            &StaticCredentials::from_env(),
            &settings.region,
            settings.session_duration_secs,
        )
        .await?;
    let status = client
        .describe_service(&credentials, &settings.target)
        .await?;

    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
