pub mod aws;
pub mod credentials;
pub mod deployment;
pub mod docker;
pub mod doctor;
pub mod executor;
pub mod tool;

pub use aws::{AwsClient, DeployError, RegistryError, RepositoryStatus};
pub use credentials::{CredentialError, CredentialSet, StaticCredentials};
pub use deployment::{Deployment, DeploymentStatus};
pub use docker::{BuildError, DockerClient, DockerError, ImageArtifact};
pub use doctor::{CheckResult, DoctorReport};
pub use executor::{ExecEnv, RealExecutor, ToolExecutor};
pub use tool::ToolError;
