//! Registry publisher: repository, tag set, login, push.

use std::fmt;

use rollout_cloud::{
    AwsClient, CredentialSet, DockerClient, DockerError, ImageArtifact, RegistryError,
    RepositoryStatus, ToolError, ToolExecutor,
};
use rollout_core::{ImageRef, TagName, TagSet};

/// What a completed publish did.
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub repository: RepositoryStatus,
    pub pushed: Vec<ImageRef>,
}

/// A tag whose push did not go through.
#[derive(Debug, Clone)]
pub struct FailedPush {
    pub reference: ImageRef,
    pub reason: String,
}

/// Publishes one artifact under its tag set.
pub struct Publisher<'a, A: ToolExecutor, D: ToolExecutor> {
    aws: &'a AwsClient<A>,
    docker: &'a DockerClient<D>,
}

impl<'a, A: ToolExecutor, D: ToolExecutor> Publisher<'a, A, D> {
    pub fn new(aws: &'a AwsClient<A>, docker: &'a DockerClient<D>) -> Self {
        Self { aws, docker }
    }

    pub async fn publish(
        &self,
        credentials: &CredentialSet,
        artifact: &ImageArtifact,
        tags: &TagSet,
    ) -> Result<PublishReport, PublishError> {
        let repository = self
            .aws
            .ensure_repository(credentials, tags.repository())
            .await
            .map_err(|e| PublishError::Repository { source: e })?;

        for (name, reference) in tags.entries() {
            self.bind_tag(artifact, name, reference).await?;
        }

        self.check_commit_tag(credentials, artifact, tags.commit())
            .await?;

        let password = self
            .aws
            .login_password(credentials)
            .await
            .map_err(|e| PublishError::Registry { source: e })?;
        self.docker
            .login(tags.host(), &password)
            .await
            .map_err(|e| PublishError::Login { source: e })?;

        let mut pushed = Vec::new();
        let mut failed = Vec::new();
        for (name, reference) in tags.entries() {
            let target = reference.to_string();
            match self.docker.push(&target).await {
                Ok(()) => {
                    tracing::info!(tag = %name, reference = %target, "pushed");
                    pushed.push(reference.clone());
                }
                Err(e) => {
                    tracing::error!(tag = %name, reference = %target, error = %e, "push failed");
                    failed.push(FailedPush {
                        reference: reference.clone(),
                        reason: error_chain(&e),
                    });
                }
            }
        }

        if !failed.is_empty() {
            return Err(PublishError::PartialPush { pushed, failed });
        }

        Ok(PublishReport { repository, pushed })
    }

    /// Apply one tag and confirm it resolves to the artifact.
    async fn bind_tag(
        &self,
        artifact: &ImageArtifact,
        name: TagName,
        reference: &ImageRef,
    ) -> Result<(), PublishError> {
        let target = reference.to_string();
        self.docker
            .tag(&artifact.reference, &target)
            .await
            .map_err(|e| PublishError::Tag { source: e })?;

        let actual = self
            .docker
            .image_id(&target)
            .await
            .map_err(|e| PublishError::Inspect {
                reference: target.clone(),
                source: e,
            })?;
        if actual != artifact.image_id {
            return Err(PublishError::TagMismatch {
                reference: target,
                expected: artifact.image_id.clone(),
                actual,
            });
        }

        tracing::debug!(tag = %name, reference = %target, "tag bound to artifact");
        Ok(())
    }

    /// A commit tag, once published, must keep pointing at the same image.
    async fn check_commit_tag(
        &self,
        credentials: &CredentialSet,
        artifact: &ImageArtifact,
        commit: &ImageRef,
    ) -> Result<(), PublishError> {
        let existing = self
            .aws
            .image_config_digest(credentials, &commit.repository, &commit.tag)
            .await
            .map_err(|e| PublishError::Registry { source: e })?;

        match existing {
            Some(digest) if digest != artifact.image_id => Err(PublishError::CommitTagConflict {
                reference: commit.to_string(),
                existing: digest,
                image_id: artifact.image_id.clone(),
            }),
            Some(_) => {
                tracing::info!(reference = %commit, "commit tag already holds this image");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

struct RefList<'a>(&'a [ImageRef]);

impl fmt::Display for RefList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("none");
        }
        for (i, r) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{r}")?;
        }
        Ok(())
    }
}

fn failed_refs(failed: &[FailedPush]) -> String {
    let refs: Vec<ImageRef> = failed.iter().map(|f| f.reference.clone()).collect();
    RefList(&refs).to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("registry repository could not be ensured")]
    Repository { source: RegistryError },

    #[error("tagging failed")]
    Tag { source: DockerError },

    #[error("failed to inspect {reference}")]
    Inspect {
        reference: String,
        source: ToolError,
    },

    #[error("{reference} resolves to {actual}, expected {expected}")]
    TagMismatch {
        reference: String,
        expected: String,
        actual: String,
    },

    #[error("{reference} already holds image {existing}; refusing to repoint it to {image_id}")]
    CommitTagConflict {
        reference: String,
        existing: String,
        image_id: String,
    },

    #[error("registry request failed")]
    Registry { source: RegistryError },

    #[error("registry login failed")]
    Login { source: DockerError },

    #[error("push incomplete: failed {}; pushed {}", failed_refs(.failed), RefList(.pushed))]
    PartialPush {
        pushed: Vec<ImageRef>,
        failed: Vec<FailedPush>,
    },
}
