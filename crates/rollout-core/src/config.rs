use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Name of the configuration file looked up in the project directory.
pub const CONFIG_FILE_NAME: &str = "rollout.toml";

/// rollout.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RolloutConfig {
    #[serde(default)]
    pub trigger: TriggerConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub deploy: DeployConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// The one branch whose pushes are released (exact match)
    #[serde(default = "default_branch")]
    pub branch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service binary name (defaults to the Cargo default binary)
    pub name: Option<String>,
    /// Interface the service binds to inside the container
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
    /// Port the service listens on
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    /// The single region every credential and API call is scoped to
    #[serde(default = "default_region")]
    pub region: String,
    /// Registry account; resolved through STS when omitted
    pub account_id: Option<String>,
    /// Lifetime requested for the short-lived session credentials
    #[serde(default = "default_session_duration")]
    pub session_duration_secs: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Repository name (defaults to the service name)
    pub repository: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Which descriptor shape to generate
    #[serde(default)]
    pub variant: DescriptorVariant,
    /// Fixed tag of the locally built image, independent of the commit
    #[serde(default = "default_version_tag")]
    pub version_tag: String,
    /// Rust builder image
    #[serde(default = "default_builder_image")]
    pub base_image: String,
    /// Runtime base image (multi-stage only)
    #[serde(default = "default_runtime_image")]
    pub runtime_image: String,
    /// Additional system packages to install via apt-get
    #[serde(default)]
    pub extra_packages: Vec<String>,
    /// Build context, relative to the project directory
    #[serde(default = "default_context")]
    pub context: PathBuf,
    /// Pass `--locked` to cargo; requires a committed `Cargo.lock`
    #[serde(default = "default_locked")]
    pub locked: bool,
    /// Static environment variables baked into the container image.
    /// These become ENV directives in the Dockerfile.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Orchestration cluster hosting the service
    pub cluster: Option<String>,
    /// Orchestration service to force-redeploy
    pub service: Option<String>,
}

/// Shape of the generated build descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DescriptorVariant {
    /// Compile in the builder image, run from a minimal runtime image.
    #[default]
    MultiStage,
    /// Compile and run in the builder image.
    SingleStage,
}

impl fmt::Display for DescriptorVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultiStage => f.write_str("multi-stage"),
            Self::SingleStage => f.write_str("single-stage"),
        }
    }
}

impl std::str::FromStr for DescriptorVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multi-stage" => Ok(Self::MultiStage),
            "single-stage" => Ok(Self::SingleStage),
            other => Err(format!(
                "unknown descriptor variant '{other}' (expected multi-stage or single-stage)"
            )),
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            branch: default_branch(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: None,
            bind_host: default_bind_host(),
            port: default_port(),
        }
    }
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            account_id: None,
            session_duration_secs: default_session_duration(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            variant: DescriptorVariant::default(),
            version_tag: default_version_tag(),
            base_image: default_builder_image(),
            runtime_image: default_runtime_image(),
            extra_packages: Vec::new(),
            context: default_context(),
            locked: default_locked(),
            env: HashMap::new(),
        }
    }
}

impl RolloutConfig {
    /// Load from rollout.toml at the given path, or return defaults if not found.
    pub fn load(project_dir: &Path) -> crate::Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                    path: config_path.clone(),
                    source: e,
                })?;
            let config = toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                path: config_path.clone(),
                source: e,
            })?;
            tracing::debug!(path = %config_path.display(), "loaded configuration");
            Ok(config)
        } else {
            tracing::debug!(path = %config_path.display(), "no configuration file, using defaults");
            Ok(Self::default())
        }
    }
}

/// The (cluster, service) pair whose running instances get replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    pub cluster: String,
    pub service: String,
}

impl fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.cluster, self.service)
    }
}

/// Fully resolved, validated settings for one pipeline run.
///
/// Built once from [`RolloutConfig`] and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ReleaseSettings {
    pub branch: String,
    pub service_name: String,
    pub region: String,
    pub account_id: Option<String>,
    pub session_duration_secs: u32,
    pub repository: String,
    pub version_tag: String,
    pub target: DeploymentTarget,
}

impl ReleaseSettings {
    /// Validate `config` and bind it to the discovered service binary name.
    pub fn resolve(config: &RolloutConfig, service_name: &str) -> crate::Result<Self> {
        let branch = non_empty(&config.trigger.branch, "trigger.branch")?;
        let region = non_empty(&config.aws.region, "aws.region")?;
        let version_tag = non_empty(&config.build.version_tag, "build.version_tag")?;
        let service_name = non_empty(service_name, "service.name")?;

        let cluster = config
            .deploy
            .cluster
            .as_deref()
            .ok_or(crate::Error::MissingSetting("deploy.cluster"))
            .and_then(|c| non_empty(c, "deploy.cluster"))?;
        let service = config
            .deploy
            .service
            .as_deref()
            .ok_or(crate::Error::MissingSetting("deploy.service"))
            .and_then(|s| non_empty(s, "deploy.service"))?;

        let repository = match config.registry.repository.as_deref() {
            Some(repo) => non_empty(repo, "registry.repository")?,
            None => service_name.clone(),
        };

        let account_id = config
            .aws
            .account_id
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_owned);

        Ok(Self {
            branch,
            service_name,
            region,
            account_id,
            session_duration_secs: config.aws.session_duration_secs,
            repository,
            version_tag,
            target: DeploymentTarget { cluster, service },
        })
    }

    /// Local image reference in the build namespace: `<service>:<version-tag>`.
    pub fn local_image(&self) -> String {
        format!("{}:{}", self.service_name, self.version_tag)
    }
}

fn non_empty(value: &str, key: &'static str) -> crate::Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(crate::Error::EmptySetting(key))
    } else {
        Ok(trimmed.to_owned())
    }
}

fn default_branch() -> String {
    "main".to_owned()
}

fn default_bind_host() -> String {
    "0.0.0.0".to_owned()
}

fn default_port() -> u16 {
    8080
}

fn default_region() -> String {
    "us-east-1".to_owned()
}

fn default_session_duration() -> u32 {
    3600
}

fn default_version_tag() -> String {
    "v1".to_owned()
}

fn default_builder_image() -> String {
    "rust:1.84-bookworm".to_owned()
}

fn default_runtime_image() -> String {
    "debian:bookworm-slim".to_owned()
}

fn default_locked() -> bool {
    true
}

fn default_context() -> PathBuf {
    PathBuf::from(".")
}
