use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::executor::{ExecEnv, RealExecutor, ToolExecutor};
use crate::tool::ToolError;

/// A locally built image: the build-namespace reference and the engine's
/// content id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageArtifact {
    pub reference: String,
    pub image_id: String,
}

/// Container engine client, parameterized over the executor for testability.
pub struct DockerClient<E: ToolExecutor = RealExecutor> {
    executor: E,
}

impl DockerClient<RealExecutor> {
    pub fn new() -> Self {
        Self {
            executor: RealExecutor::docker(),
        }
    }
}

impl Default for DockerClient<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ToolExecutor> DockerClient<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    pub async fn version(&self) -> Result<String, ToolError> {
        let out = self
            .executor
            .exec(
                &args(["version", "--format", "{{.Client.Version}}"]),
                &ExecEnv::new(),
            )
            .await?;
        Ok(out.trim().to_owned())
    }

    /// Build `descriptor` against `context` and tag the result `reference`.
    ///
    /// The descriptor is streamed on stdin so an ejected or generated one
    /// is used without writing it into the build context. Build output goes
    /// straight to the terminal.
    pub async fn build(
        &self,
        descriptor: &str,
        context: &Path,
        reference: &str,
    ) -> Result<ImageArtifact, BuildError> {
        let context_str = context
            .to_str()
            .ok_or_else(|| BuildError::InvalidContext(context.to_path_buf()))?;

        tracing::info!(reference, context = %context.display(), "building image");
        self.executor
            .exec_streaming_with_stdin(
                &args(["build", "--file", "-", "--tag", reference, context_str]),
                &ExecEnv::new(),
                descriptor.as_bytes(),
            )
            .await
            .map_err(|e| BuildError::Build { source: e })?;

        let image_id = self
            .image_id(reference)
            .await
            .map_err(|e| BuildError::Inspect {
                reference: reference.to_owned(),
                source: e,
            })?;
        if image_id.is_empty() {
            return Err(BuildError::MissingImageId {
                reference: reference.to_owned(),
            });
        }

        Ok(ImageArtifact {
            reference: reference.to_owned(),
            image_id,
        })
    }

    /// Content id a local reference resolves to.
    pub async fn image_id(&self, reference: &str) -> Result<String, ToolError> {
        let out = self
            .executor
            .exec(
                &args(["image", "inspect", "--format", "{{.Id}}", reference]),
                &ExecEnv::new(),
            )
            .await?;
        Ok(out.trim().to_owned())
    }

    pub async fn tag(&self, source: &str, target: &str) -> Result<(), DockerError> {
        self.executor
            .exec(&args(["tag", source, target]), &ExecEnv::new())
            .await
            .map_err(|e| DockerError::Tag {
                target: target.to_owned(),
                source: e,
            })?;
        Ok(())
    }

    /// Authenticate against `host`; the password only travels over stdin.
    pub async fn login(&self, host: &str, password: &SecretString) -> Result<(), DockerError> {
        self.executor
            .exec_with_stdin(
                &args(["login", "--username", "AWS", "--password-stdin", host]),
                &ExecEnv::new(),
                password.expose_secret().as_bytes(),
            )
            .await
            .map_err(|e| DockerError::Login {
                host: host.to_owned(),
                source: e,
            })?;
        Ok(())
    }

    pub async fn push(&self, reference: &str) -> Result<(), DockerError> {
        self.executor
            .exec_streaming(&args(["push", reference]), &ExecEnv::new())
            .await
            .map_err(|e| DockerError::Push {
                reference: reference.to_owned(),
                source: e,
            })
    }
}

fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("build context path is not valid UTF-8: {0}")]
    InvalidContext(PathBuf),

    #[error("image build failed")]
    Build { source: ToolError },

    #[error("failed to inspect built image {reference}")]
    Inspect {
        reference: String,
        source: ToolError,
    },

    #[error("built image {reference} has no id")]
    MissingImageId { reference: String },
}

#[derive(Debug, thiserror::Error)]
pub enum DockerError {
    #[error("failed to tag image as {target}")]
    Tag { target: String, source: ToolError },

    #[error("failed to log in to {host}")]
    Login { host: String, source: ToolError },

    #[error("failed to push {reference}")]
    Push {
        reference: String,
        source: ToolError,
    },
}
