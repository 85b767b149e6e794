use std::path::Path;

use rollout_build::{BuildDescriptor, DockerfileGenerator};
use rollout_core::DescriptorVariant;

use super::Project;

pub fn eject(project_dir: &Path, variant: Option<DescriptorVariant>) -> anyhow::Result<()> {
    let project = Project::load(project_dir)?;
    let variant = variant.unwrap_or(project.config.build.variant);

    let descriptor =
        BuildDescriptor::new(variant, &project.config.build, &project.service_binary());
    let dockerfile = DockerfileGenerator::new(&descriptor).render();

    let path = rollout_build::eject::eject(project_dir, &dockerfile)?;

    println!("Ejected {variant} build descriptor to {}", path.display());
    println!("You can now edit it directly. rollout release will use this file.");
    Ok(())
}
