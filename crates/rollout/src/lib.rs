//! Build, publish and redeploy a Rust service container on AWS.
//!
//! This is the facade crate: it re-exports the rollout sub-crates and hosts
//! the release pipeline that strings them together.
//!
//! # Feature flags
//!
//! | Feature | Default | Crate | Description |
//! |---------|---------|-------|-------------|
//! | `core` | yes | `rollout-core` | Configuration, release events, tag sets |
//! | `build` | yes | `rollout-build` | Build descriptor generation and eject |
//! | `cloud` | yes | `rollout-cloud` | AWS and Docker operations, release pipeline |
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use rollout::{ReleaseEvent, ReleaseSettings, RolloutConfig};
//! use rollout::cloud::StaticCredentials;
//! use rollout::pipeline::{BuildInput, ReleasePipeline};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RolloutConfig::load(Path::new("."))?;
//! let settings = ReleaseSettings::resolve(&config, "lila-gif")?;
//! let event = ReleaseEvent::new("main", "abc1234def5678")?;
//! let build = BuildInput {
//!     descriptor: std::fs::read_to_string(".rollout/Dockerfile")?,
//!     context: ".".into(),
//! };
//!
//! let outcome = ReleasePipeline::new(settings)
//!     .run(&event, &StaticCredentials::from_env(), &build)
//!     .await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

// Core types flattened into root namespace for convenience.
#[cfg(feature = "core")]
pub use rollout_core::*;

/// Build descriptor generation, eject, and git checkout inspection.
#[cfg(feature = "build")]
pub mod build {
    pub use rollout_build::*;
}

/// AWS (STS, ECR, ECS) and Docker operations.
#[cfg(feature = "cloud")]
pub mod cloud {
    pub use rollout_cloud::*;
}

#[cfg(feature = "cloud")]
pub mod pipeline;
#[cfg(feature = "cloud")]
pub mod publish;
