use std::path::Path;

use rollout::pipeline::{PipelineOutcome, ReleasePipeline};
use rollout_cloud::StaticCredentials;
use rollout_core::{RolloutConfig, TriggerGate};

use super::{Project, capture_event};

/// Run the release pipeline for one push event.
///
/// Only `[trigger]` is consulted for events on other branches, so those
/// exit cleanly even where the rest of the project is not set up.
pub async fn release(
    project_dir: &Path,
    branch: Option<String>,
    commit: Option<String>,
) -> anyhow::Result<()> {
    let config = RolloutConfig::load(project_dir)?;
    let event = capture_event(project_dir, branch, commit)?;

    let gate = TriggerGate::new(config.trigger.branch.trim());
    if !gate.admits(&event) {
        tracing::warn!(
            branch = event.branch(),
            release_branch = gate.branch(),
            "branch is not the release branch, skipping"
        );
        eprintln!(
            "Skipping: '{}' is not the release branch '{}'",
            event.branch(),
            gate.branch()
        );
        return Ok(());
    }

    let project = Project::from_config(project_dir, config)?;
    let settings = project.settings()?;
    let (build, _) = project.build_input(project_dir)?;

    let pipeline = ReleasePipeline::new(settings);
    let outcome = pipeline
        .run(&event, &StaticCredentials::from_env(), &build)
        .await?;

    match outcome {
        PipelineOutcome::Skipped { branch } => {
            eprintln!(
                "Skipping: '{branch}' is not the release branch '{}'",
                pipeline.settings().branch
            );
        }
        PipelineOutcome::Released(report) => {
            eprintln!();
            eprintln!("Released {}", report.event);
            eprintln!("  Image:  {} ({})", report.artifact.reference, report.artifact.image_id);
            for pushed in &report.pushed {
                eprintln!("  Pushed: {pushed}");
            }
            eprintln!("  Redeploy requested for {}", pipeline.settings().target);
            println!("{}", serde_json::to_string_pretty(&report.deployment)?);
        }
    }

    Ok(())
}
