//! Build descriptors, Dockerfile rendering, eject, and checkout inspection
//! for rollout.
//!
//! # Descriptor variants
//!
//! ```text
//! multi-stage   FROM <base_image> AS builder ── cargo build --release
//!               FROM <runtime_image>         ── COPY --from=builder <binary>
//!
//! single-stage  FROM <base_image>            ── cargo build --release, run in place
//! ```
//!
//! Both end with `EXPOSE <port>` and `CMD ["<service>", "--bind", "<host>:<port>"]`.
//!
//! # Descriptor source
//!
//! An ejected `.rollout/Dockerfile` wins over the generated descriptor; see
//! [`eject`].

pub mod descriptor;
pub mod dockerfile;
pub mod eject;
pub mod git;

pub use descriptor::{BuildDescriptor, BuildStage, CopyRule, ServiceBinary};
pub use dockerfile::DockerfileGenerator;

use std::path::Path;

use rollout_core::BuildConfig;

/// Descriptor text for a run: the ejected file when present, else the
/// generated descriptor for the configured variant.
pub fn resolve_dockerfile(
    project_dir: &Path,
    config: &BuildConfig,
    service: &ServiceBinary,
) -> Result<ResolvedDockerfile, eject::EjectError> {
    if eject::is_ejected(project_dir) {
        let content = eject::load_ejected_dockerfile(project_dir)?;
        tracing::info!("using ejected descriptor from .rollout/Dockerfile");
        return Ok(ResolvedDockerfile {
            content,
            ejected: true,
        });
    }

    let descriptor = BuildDescriptor::new(config.variant, config, service);
    Ok(ResolvedDockerfile {
        content: DockerfileGenerator::new(&descriptor).render(),
        ejected: false,
    })
}

/// Descriptor text plus where it came from.
#[derive(Debug, Clone)]
pub struct ResolvedDockerfile {
    pub content: String,
    pub ejected: bool,
}
