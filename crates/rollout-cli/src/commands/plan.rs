use std::path::Path;

use rollout_core::tags::registry_host;
use rollout_core::{TagSet, TriggerGate};

use super::{Project, capture_event};

/// Print what `release` would do for the event, touching nothing.
pub fn plan(project_dir: &Path, branch: Option<String>, commit: Option<String>) -> anyhow::Result<()> {
    let project = Project::load(project_dir)?;
    let settings = project.settings()?;
    let event = capture_event(project_dir, branch, commit)?;
    let (build, ejected) = project.build_input(project_dir)?;

    let gate = TriggerGate::new(settings.branch.clone());
    let account = settings.account_id.as_deref().unwrap_or("<account>");
    let tags = TagSet::for_event(
        &registry_host(account, &settings.region),
        &settings.repository,
        &event,
    );

    println!("Event:       {event}");
    if gate.admits(&event) {
        println!("Gate:        admitted");
    } else {
        println!(
            "Gate:        skipped (release branch is '{}')",
            gate.branch()
        );
    }
    println!("Image:       {}", settings.local_image());
    println!("Context:     {}", build.context.display());
    println!("Tags:        {}", tags.latest());
    println!("             {}", tags.commit());
    println!("Deploy:      {} ({})", settings.target, settings.region);
    if ejected {
        println!("Descriptor:  ejected (.rollout/Dockerfile)");
    } else {
        println!("Descriptor:  generated ({})", project.config.build.variant);
    }
    println!();
    print!("{}", build.descriptor);

    Ok(())
}
