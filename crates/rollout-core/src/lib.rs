//! Core types and configuration for rollout.
//!
//! This crate defines the `rollout.toml` schema ([`RolloutConfig`]), the
//! release event and its branch filter ([`ReleaseEvent`], [`TriggerGate`]),
//! the published tag set ([`TagSet`]), service binary discovery
//! ([`ServicePackage`]), and shared error types.

pub mod cargo;
pub mod config;
pub mod error;
pub mod event;
pub mod tags;

pub use cargo::ServicePackage;
pub use config::{
    AwsConfig, BuildConfig, DeployConfig, DeploymentTarget, DescriptorVariant, RegistryConfig,
    ReleaseSettings, RolloutConfig, ServiceConfig, TriggerConfig, CONFIG_FILE_NAME,
};
pub use error::{Error, Result};
pub use event::{ReleaseEvent, TriggerGate};
pub use tags::{ImageRef, TagName, TagSet, LATEST_TAG};
