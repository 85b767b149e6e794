//! The release pipeline: gate, credentials, build, publish, redeploy.
//!
//! Stages run strictly in order. The first failing stage ends the run and
//! nothing is retried.

use std::fmt;
use std::path::PathBuf;

use rollout_cloud::{
    AwsClient, BuildError, CredentialError, DeployError, DeploymentStatus, DockerClient,
    ImageArtifact, RealExecutor, RepositoryStatus, StaticCredentials, ToolExecutor,
};
use rollout_core::tags::registry_host;
use rollout_core::{ImageRef, ReleaseEvent, ReleaseSettings, TagSet, TriggerGate};

use crate::publish::{PublishError, Publisher};

/// What the image builder is given for one run.
#[derive(Debug, Clone)]
pub struct BuildInput {
    /// Descriptor text, generated or ejected.
    pub descriptor: String,
    /// Build context on disk.
    pub context: PathBuf,
}

#[derive(Debug)]
pub enum PipelineOutcome {
    /// The event's branch is not the release branch; nothing ran.
    Skipped { branch: String },
    Released(Box<ReleaseReport>),
}

#[derive(Debug)]
pub struct ReleaseReport {
    pub event: ReleaseEvent,
    pub artifact: ImageArtifact,
    pub repository: RepositoryStatus,
    pub tags: TagSet,
    pub pushed: Vec<ImageRef>,
    pub deployment: DeploymentStatus,
}

pub struct ReleasePipeline<A: ToolExecutor = RealExecutor, D: ToolExecutor = RealExecutor> {
    settings: ReleaseSettings,
    gate: TriggerGate,
    aws: AwsClient<A>,
    docker: DockerClient<D>,
}

impl ReleasePipeline<RealExecutor, RealExecutor> {
    pub fn new(settings: ReleaseSettings) -> Self {
        Self::with_clients(settings, AwsClient::new(), DockerClient::new())
    }
}

impl<A: ToolExecutor, D: ToolExecutor> ReleasePipeline<A, D> {
    pub fn with_clients(settings: ReleaseSettings, aws: AwsClient<A>, docker: DockerClient<D>) -> Self {
        let gate = TriggerGate::new(settings.branch.clone());
        Self {
            settings,
            gate,
            aws,
            docker,
        }
    }

    pub fn settings(&self) -> &ReleaseSettings {
        &self.settings
    }

    /// Run every stage for `event`.
    ///
    /// `build` is only read once the gate and credentials have passed.
    pub async fn run(
        &self,
        event: &ReleaseEvent,
        secrets: &StaticCredentials,
        build: &BuildInput,
    ) -> Result<PipelineOutcome, PipelineError> {
        if !self.gate.admits(event) {
            tracing::warn!(
                branch = event.branch(),
                release_branch = self.gate.branch(),
                "branch is not the release branch, skipping"
            );
            return Ok(PipelineOutcome::Skipped {
                branch: event.branch().to_owned(),
            });
        }
        tracing::info!(%event, "release started");

        // Credentials
        let credentials = self
            .aws
            .exchange_credentials(
                secrets,
                &self.settings.region,
                self.settings.session_duration_secs,
            )
            .await
            .map_err(PipelineError::Credentials)?;
        let account = match &self.settings.account_id {
            Some(account) => account.clone(),
            None => self
                .aws
                .caller_account(&credentials)
                .await
                .map_err(PipelineError::Credentials)?,
        };
        tracing::info!(region = %credentials.region(), "credentials provisioned");

        // Build
        let artifact = self
            .docker
            .build(&build.descriptor, &build.context, &self.settings.local_image())
            .await
            .map_err(PipelineError::Build)?;
        tracing::info!(reference = %artifact.reference, image_id = %artifact.image_id, "image built");

        // Publish
        let host = registry_host(&account, &self.settings.region);
        let tags = TagSet::for_event(&host, &self.settings.repository, event);
        let published = Publisher::new(&self.aws, &self.docker)
            .publish(&credentials, &artifact, &tags)
            .await
            .map_err(PipelineError::Publish)?;
        tracing::info!(latest = %tags.latest(), commit = %tags.commit(), "image published");

        // Deploy
        let deployment = self
            .aws
            .force_new_deployment(&credentials, &self.settings.target)
            .await
            .map_err(PipelineError::Deploy)?;
        tracing::info!(deploy_target = %self.settings.target, "redeploy requested");

        Ok(PipelineOutcome::Released(Box::new(ReleaseReport {
            event: event.clone(),
            artifact,
            repository: published.repository,
            tags,
            pushed: published.pushed,
            deployment,
        })))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Credentials,
    Build,
    Publish,
    Deploy,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credentials => f.write_str("credentials"),
            Self::Build => f.write_str("build"),
            Self::Publish => f.write_str("publish"),
            Self::Deploy => f.write_str("deploy"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("credentials stage failed")]
    Credentials(#[source] CredentialError),

    #[error("build stage failed")]
    Build(#[source] BuildError),

    #[error("publish stage failed")]
    Publish(#[source] PublishError),

    #[error("deploy stage failed")]
    Deploy(#[source] DeployError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Credentials(_) => Stage::Credentials,
            Self::Build(_) => Stage::Build,
            Self::Publish(_) => Stage::Publish,
            Self::Deploy(_) => Stage::Deploy,
        }
    }
}
