//! Service binary discovery via `cargo metadata`.
//!
//! Used when `[service].name` is not configured: the released binary is
//! the package's default binary, resolved the way `cargo run` resolves it.

use cargo_metadata::{MetadataCommand, TargetKind};
use std::path::Path;

/// The package whose binary gets containerized.
#[derive(Debug, Clone)]
pub struct ServicePackage {
    /// Package name from `[package].name`
    pub name: String,
    /// Resolved version (handles `version.workspace = true`)
    pub version: String,
    /// All binary target names in this package
    pub binaries: Vec<String>,
    /// The binary invoked as the container entrypoint.
    ///
    /// **Invariant:** must match a name in [`binaries`](Self::binaries).
    pub binary: String,
}

impl ServicePackage {
    /// Discover the package at `project_dir` with `cargo metadata --no-deps`.
    ///
    /// # Errors
    ///
    /// - [`Error::CargoMetadata`](crate::Error::CargoMetadata) if `cargo metadata` fails
    /// - [`Error::NoPackageInDir`](crate::Error::NoPackageInDir) for a virtual workspace root
    /// - [`Error::NoBinaryTarget`](crate::Error::NoBinaryTarget) for library-only packages
    /// - [`Error::MultipleBinaries`](crate::Error::MultipleBinaries) when the choice is ambiguous
    pub fn discover(project_dir: &Path) -> crate::Result<Self> {
        let manifest_path = project_dir.join("Cargo.toml");
        tracing::debug!(path = %manifest_path.display(), "running cargo metadata");

        let metadata = MetadataCommand::new()
            .manifest_path(&manifest_path)
            .no_deps()
            .exec()
            .map_err(|e| crate::Error::CargoMetadata {
                manifest_path: manifest_path.clone(),
                detail: e.to_string(),
            })?;

        let canonical_dir =
            project_dir
                .canonicalize()
                .map_err(|e| crate::Error::ProjectDirResolve {
                    path: project_dir.to_path_buf(),
                    source: e,
                })?;

        let package = metadata
            .packages
            .iter()
            .find(|p| {
                p.manifest_path
                    .as_std_path()
                    .parent()
                    .and_then(|d| match d.canonicalize() {
                        Ok(c) => Some(c),
                        Err(e) => {
                            tracing::warn!(
                                path = %d.display(),
                                error = %e,
                                "failed to canonicalize manifest parent; skipping package"
                            );
                            None
                        }
                    })
                    .is_some_and(|d| d == canonical_dir)
            })
            .ok_or_else(|| crate::Error::NoPackageInDir {
                dir: canonical_dir.clone(),
                workspace_members: metadata
                    .packages
                    .iter()
                    .filter(|p| metadata.workspace_members.contains(&p.id))
                    .map(|p| p.name.to_string())
                    .collect(),
            })?;

        let binaries: Vec<String> = package
            .targets
            .iter()
            .filter(|t| t.kind.contains(&TargetKind::Bin))
            .map(|t| t.name.clone())
            .collect();

        let binary = resolve_binary(&binaries, package.default_run.as_deref(), &package.name)?;

        tracing::debug!(
            name = %package.name,
            version = %package.version,
            binary = %binary,
            "service package discovered"
        );

        Ok(Self {
            name: package.name.to_string(),
            version: package.version.to_string(),
            binaries,
            binary,
        })
    }
}

/// Select the binary to release.
///
/// Priority:
/// 1. `default-run` from Cargo.toml
/// 2. Single binary
/// 3. Binary matching the package name
fn resolve_binary(
    binaries: &[String],
    default_run: Option<&str>,
    package_name: &str,
) -> crate::Result<String> {
    if let Some(name) = default_run
        && binaries.iter().any(|b| b == name)
    {
        return Ok(name.to_owned());
    }

    match binaries {
        [] => Err(crate::Error::NoBinaryTarget {
            package: package_name.to_owned(),
        }),
        [only] => Ok(only.clone()),
        _ if binaries.iter().any(|b| b == package_name) => Ok(package_name.to_owned()),
        _ => Err(crate::Error::MultipleBinaries {
            names: binaries.to_vec(),
        }),
    }
}
