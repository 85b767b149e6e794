use secrecy::SecretString;
use serde::Deserialize;

use rollout_core::DeploymentTarget;

use crate::credentials::{CredentialError, CredentialSet, StaticCredentials};
use crate::deployment::{DeploymentStatus, DescribeServicesResponse, UpdateServiceResponse};
use crate::executor::{ExecEnv, RealExecutor, ToolExecutor};
use crate::tool::ToolError;

/// Manifest media types accepted when looking up an existing tag.
const MANIFEST_MEDIA_TYPES: [&str; 2] = [
    "application/vnd.docker.distribution.manifest.v2+json",
    "application/vnd.oci.image.manifest.v1+json",
];

const ALREADY_EXISTS: &str = "RepositoryAlreadyExistsException";

/// Outcome of an idempotent repository create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryStatus {
    Created,
    AlreadyExists,
}

/// AWS operations client, parameterized over the executor for testability.
pub struct AwsClient<E: ToolExecutor = RealExecutor> {
    executor: E,
}

impl AwsClient<RealExecutor> {
    pub fn new() -> Self {
        Self {
            executor: RealExecutor::aws(),
        }
    }
}

impl Default for AwsClient<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ToolExecutor> AwsClient<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    /// `aws --version`, first token (e.g. `aws-cli/2.17.0`).
    pub async fn version(&self) -> Result<String, ToolError> {
        let out = self
            .executor
            .exec(&args(["--version"]), &ExecEnv::new())
            .await?;
        Ok(out.split_whitespace().next().unwrap_or_default().to_owned())
    }

    // ── STS ──

    /// Exchange the static pair for session credentials scoped to `region`.
    pub async fn exchange_credentials(
        &self,
        static_credentials: &StaticCredentials,
        region: &str,
        duration_secs: u32,
    ) -> Result<CredentialSet, CredentialError> {
        let env = static_credentials.env(region)?;
        let duration = duration_secs.to_string();

        let output = self
            .executor
            .exec(
                &args([
                    "sts",
                    "get-session-token",
                    "--duration-seconds",
                    &duration,
                    "--region",
                    region,
                    "--output",
                    "json",
                ]),
                &env,
            )
            .await
            .map_err(|e| CredentialError::Exchange { source: e })?;

        let credentials = CredentialSet::from_session_token_json(&output, region)?;
        tracing::debug!(region, expiration = ?credentials.expiration(), "session credentials issued");
        Ok(credentials)
    }

    /// Account id the credentials belong to.
    pub async fn caller_account(&self, credentials: &CredentialSet) -> Result<String, CredentialError> {
        let output = self
            .executor
            .exec(
                &args([
                    "sts",
                    "get-caller-identity",
                    "--query",
                    "Account",
                    "--output",
                    "text",
                ]),
                &credentials.env(),
            )
            .await
            .map_err(|e| CredentialError::Identity { source: e })?;

        Ok(output.trim().to_owned())
    }

    // ── ECR ──

    /// Create the repository, treating "already exists" as success.
    ///
    /// Only the create call is ever issued, so an existing repository is
    /// never modified.
    pub async fn ensure_repository(
        &self,
        credentials: &CredentialSet,
        repository: &str,
    ) -> Result<RepositoryStatus, RegistryError> {
        let result = self
            .executor
            .exec(
                &args([
                    "ecr",
                    "create-repository",
                    "--repository-name",
                    repository,
                    "--region",
                    credentials.region(),
                    "--output",
                    "json",
                ]),
                &credentials.env(),
            )
            .await;

        match result {
            Ok(_) => {
                tracing::info!(repository, "registry repository created");
                Ok(RepositoryStatus::Created)
            }
            Err(e) if e.stderr().is_some_and(|s| s.contains(ALREADY_EXISTS)) => {
                tracing::debug!(repository, "registry repository already exists");
                Ok(RepositoryStatus::AlreadyExists)
            }
            Err(e) => Err(RegistryError::CreateRepository {
                repository: repository.to_owned(),
                source: e,
            }),
        }
    }

    /// Registry login token, kept secret until piped into `docker login`.
    pub async fn login_password(
        &self,
        credentials: &CredentialSet,
    ) -> Result<SecretString, RegistryError> {
        let output = self
            .executor
            .exec(
                &args(["ecr", "get-login-password", "--region", credentials.region()]),
                &credentials.env(),
            )
            .await
            .map_err(|e| RegistryError::LoginPassword { source: e })?;

        let token = output.trim();
        if token.is_empty() {
            return Err(RegistryError::EmptyLoginPassword);
        }
        Ok(SecretString::from(token.to_owned()))
    }

    /// Config digest of the image currently published under `tag`, if any.
    ///
    /// `None` only when the registry reports `ImageNotFound`; any other
    /// lookup failure is an error. The digest equals the local image id for
    /// the classic Docker image store. With the containerd image store,
    /// `docker image inspect` reports the index digest instead, so a rerun of
    /// an already published commit is reported as a conflict there.
    pub async fn image_config_digest(
        &self,
        credentials: &CredentialSet,
        repository: &str,
        tag: &str,
    ) -> Result<Option<String>, RegistryError> {
        let image_id = format!("imageTag={tag}");
        let mut cmd = args([
            "ecr",
            "batch-get-image",
            "--repository-name",
            repository,
            "--image-ids",
            &image_id,
            "--region",
            credentials.region(),
            "--output",
            "json",
            "--accepted-media-types",
        ]);
        cmd.extend(MANIFEST_MEDIA_TYPES.iter().map(|s| (*s).to_owned()));

        let output = self
            .executor
            .exec(&cmd, &credentials.env())
            .await
            .map_err(|e| RegistryError::DescribeImage {
                tag: tag.to_owned(),
                source: e,
            })?;

        parse_config_digest(tag, &output)
    }

    // ── ECS ──

    /// Ask the orchestrator to replace the service's running tasks.
    ///
    /// Returns as soon as the request is acknowledged; the rollout itself is
    /// not awaited.
    pub async fn force_new_deployment(
        &self,
        credentials: &CredentialSet,
        target: &DeploymentTarget,
    ) -> Result<DeploymentStatus, DeployError> {
        let output = self
            .executor
            .exec(
                &args([
                    "ecs",
                    "update-service",
                    "--cluster",
                    &target.cluster,
                    "--service",
                    &target.service,
                    "--force-new-deployment",
                    "--region",
                    credentials.region(),
                    "--output",
                    "json",
                ]),
                &credentials.env(),
            )
            .await
            .map_err(|e| DeployError::UpdateService {
                target: target.to_string(),
                source: e,
            })?;

        let response: UpdateServiceResponse = serde_json::from_str(&output)
            .map_err(|e| DeployError::InvalidResponse { source: e })?;
        Ok(response.service)
    }

    pub async fn describe_service(
        &self,
        credentials: &CredentialSet,
        target: &DeploymentTarget,
    ) -> Result<DeploymentStatus, DeployError> {
        let output = self
            .executor
            .exec(
                &args([
                    "ecs",
                    "describe-services",
                    "--cluster",
                    &target.cluster,
                    "--services",
                    &target.service,
                    "--region",
                    credentials.region(),
                    "--output",
                    "json",
                ]),
                &credentials.env(),
            )
            .await
            .map_err(|e| DeployError::DescribeService {
                target: target.to_string(),
                source: e,
            })?;

        let response: DescribeServicesResponse = serde_json::from_str(&output)
            .map_err(|e| DeployError::InvalidResponse { source: e })?;
        response
            .services
            .into_iter()
            .next()
            .ok_or_else(|| DeployError::ServiceNotFound {
                target: target.to_string(),
            })
    }
}

// ── Helpers ──

fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetImageResponse {
    #[serde(default)]
    images: Vec<RegistryImage>,
    #[serde(default)]
    failures: Vec<ImageFailure>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageFailure {
    failure_code: String,
    #[serde(default)]
    failure_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryImage {
    image_manifest: String,
}

#[derive(Deserialize)]
struct ImageManifest {
    config: ManifestConfig,
}

#[derive(Deserialize)]
struct ManifestConfig {
    digest: String,
}

const IMAGE_NOT_FOUND: &str = "ImageNotFound";

fn parse_config_digest(tag: &str, output: &str) -> Result<Option<String>, RegistryError> {
    let response: BatchGetImageResponse = serde_json::from_str(output)
        .map_err(|e| RegistryError::InvalidResponse { source: e })?;

    if let Some(failure) = response
        .failures
        .iter()
        .find(|f| f.failure_code != IMAGE_NOT_FOUND)
    {
        return Err(RegistryError::ImageLookup {
            tag: tag.to_owned(),
            code: failure.failure_code.clone(),
            reason: failure.failure_reason.clone().unwrap_or_default(),
        });
    }

    match response.images.first() {
        Some(image) => {
            let manifest: ImageManifest = serde_json::from_str(&image.image_manifest)
                .map_err(|e| RegistryError::InvalidResponse { source: e })?;
            Ok(Some(manifest.config.digest))
        }
        None => Ok(None),
    }
}

// ── Error types ──

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to create registry repository '{repository}'")]
    CreateRepository {
        repository: String,
        source: ToolError,
    },

    #[error("failed to obtain registry login token")]
    LoginPassword { source: ToolError },

    #[error("registry returned an empty login token")]
    EmptyLoginPassword,

    #[error("failed to look up tag '{tag}' in the registry")]
    DescribeImage { tag: String, source: ToolError },

    #[error("registry could not resolve tag '{tag}': {code} {reason}")]
    ImageLookup {
        tag: String,
        code: String,
        reason: String,
    },

    #[error("registry response could not be parsed")]
    InvalidResponse { source: serde_json::Error },
}

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("forcing a new deployment of {target} failed")]
    UpdateService { target: String, source: ToolError },

    #[error("describing {target} failed")]
    DescribeService { target: String, source: ToolError },

    #[error("service {target} not found")]
    ServiceNotFound { target: String },

    #[error("orchestrator response could not be parsed")]
    InvalidResponse { source: serde_json::Error },
}
