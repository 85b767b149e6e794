mod ci;
mod doctor;
mod eject;
mod init;
mod plan;
mod release;
mod status;

use std::path::Path;

use rollout::pipeline::BuildInput;
use rollout_build::{ServiceBinary, resolve_dockerfile};
use rollout_core::{ReleaseEvent, ReleaseSettings, RolloutConfig, ServicePackage};

pub use ci::ci_init;
pub use doctor::doctor;
pub use eject::eject;
pub use init::init_project;
pub use plan::plan;
pub use release::release;
pub use status::status;

/// Configuration plus the service binary it applies to.
pub(crate) struct Project {
    pub config: RolloutConfig,
    pub service_name: String,
}

impl Project {
    pub fn load(project_dir: &Path) -> anyhow::Result<Self> {
        Self::from_config(project_dir, RolloutConfig::load(project_dir)?)
    }

    /// Bind an already loaded configuration to its service binary.
    pub fn from_config(project_dir: &Path, config: RolloutConfig) -> anyhow::Result<Self> {
        let service_name = match &config.service.name {
            Some(name) => name.clone(),
            None => ServicePackage::discover(project_dir)?.binary,
        };
        Ok(Self {
            config,
            service_name,
        })
    }

    pub fn settings(&self) -> anyhow::Result<ReleaseSettings> {
        Ok(ReleaseSettings::resolve(&self.config, &self.service_name)?)
    }

    pub fn service_binary(&self) -> ServiceBinary {
        ServiceBinary::new(
            &self.service_name,
            &self.config.service.bind_host,
            self.config.service.port,
        )
    }

    /// Descriptor and build context for this project. The flag tells
    /// whether the descriptor came from `.rollout/Dockerfile`.
    pub fn build_input(&self, project_dir: &Path) -> anyhow::Result<(BuildInput, bool)> {
        let resolved =
            resolve_dockerfile(project_dir, &self.config.build, &self.service_binary())?;
        Ok((
            BuildInput {
                descriptor: resolved.content,
                context: project_dir.join(&self.config.build.context),
            },
            resolved.ejected,
        ))
    }
}

/// The event to release: explicit values first, then the local checkout.
pub(crate) fn capture_event(
    project_dir: &Path,
    branch: Option<String>,
    commit: Option<String>,
) -> anyhow::Result<ReleaseEvent> {
    match (branch, commit) {
        (Some(branch), Some(commit)) => Ok(ReleaseEvent::new(&branch, &commit)?),
        (branch, commit) => {
            let head = rollout_build::git::head_event(project_dir)?;
            if rollout_build::git::is_dirty(project_dir)? {
                tracing::warn!(
                    commit = head.short_commit(),
                    "working tree has uncommitted changes; they will be built but not tagged"
                );
            }
            Ok(ReleaseEvent::new(
                branch.as_deref().unwrap_or(head.branch()),
                commit.as_deref().unwrap_or(head.commit()),
            )?)
        }
    }
}

/// Load `<project>/.env` into the process environment when present.
pub(crate) fn load_dotenv(project_dir: &Path) -> anyhow::Result<()> {
    let path = project_dir.join(".env");
    if path.exists() {
        dotenvy::from_path(&path)?;
        tracing::debug!(path = %path.display(), "loaded .env");
    }
    Ok(())
}
