use std::path::Path;

use rollout_core::CONFIG_FILE_NAME;

const ROLLOUT_TOML: &str = r#"[trigger]
# branch = "main"

[service]
# name = "my-service"
# bind_host = "0.0.0.0"
# port = 8080

[aws]
# region = "us-east-1"
# account_id = "123456789012"

[registry]
# repository = "my-service"

[build]
# variant = "multi-stage"
# version_tag = "v1"
# extra_packages = []
# locked = true               # cargo --locked: commit Cargo.lock, or set false

[deploy]
# cluster = "my-cluster"
# service = "my-service"
"#;

const ENV_EXAMPLE: &str = "AWS_ACCESS_KEY_ID=your-access-key-id
AWS_SECRET_ACCESS_KEY=your-secret-access-key
";

/// Initialize rollout in an existing Rust project.
pub fn init_project(project_dir: &Path) -> anyhow::Result<()> {
    if !project_dir.join("Cargo.toml").exists() {
        anyhow::bail!("Cargo.toml not found. Run this command from a Rust project root.");
    }

    let mut created = Vec::new();

    for (name, content) in [(CONFIG_FILE_NAME, ROLLOUT_TOML), (".env.example", ENV_EXAMPLE)] {
        let path = project_dir.join(name);
        if path.exists() {
            eprintln!("{name} already exists, skipping");
        } else {
            std::fs::write(&path, content)?;
            created.push(name);
        }
    }

    let gitignore_path = project_dir.join(".gitignore");
    let gitignore = if gitignore_path.exists() {
        std::fs::read_to_string(&gitignore_path)?
    } else {
        String::new()
    };
    if !gitignore.lines().any(|l| l.trim() == ".env") {
        let mut updated = gitignore;
        if !updated.is_empty() && !updated.ends_with('\n') {
            updated.push('\n');
        }
        updated.push_str(".env\n");
        std::fs::write(&gitignore_path, updated)?;
        created.push(".gitignore (.env entry)");
    }

    if created.is_empty() {
        println!("Nothing to do: rollout is already initialized.");
    } else {
        println!("Initialized rollout:");
        for name in &created {
            println!("  {name}");
        }
        println!();
        println!("Next: set [deploy].cluster and [deploy].service in {CONFIG_FILE_NAME}");
    }

    Ok(())
}
