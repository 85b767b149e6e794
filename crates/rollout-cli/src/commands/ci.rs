use std::path::Path;

use rollout_core::RolloutConfig;

const WORKFLOW_PATH: &str = ".github/workflows/rollout.yml";

/// Write the GitHub Actions workflow that releases on every push to the
/// release branch.
pub fn ci_init(project_dir: &Path) -> anyhow::Result<()> {
    let workflow_path = project_dir.join(WORKFLOW_PATH);
    if workflow_path.exists() {
        anyhow::bail!(
            "Workflow already exists at {WORKFLOW_PATH} — edit it directly, or delete it to re-run ci init"
        );
    }

    let config = RolloutConfig::load(project_dir)?;

    if let Some(parent) = workflow_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&workflow_path, generate_workflow_yaml(&config.trigger.branch))?;

    println!("Created {WORKFLOW_PATH}");
    println!();
    println!("Add these repository secrets before the first push:");
    println!("  AWS_ACCESS_KEY_ID");
    println!("  AWS_SECRET_ACCESS_KEY");
    Ok(())
}

/// Generate the GitHub Actions workflow yaml content.
fn generate_workflow_yaml(branch: &str) -> String {
    format!(
        r#"# Generated by: rollout ci init
name: Release

on:
  push:
    branches: [{branch}]

env:
  CARGO_TERM_COLOR: always

jobs:
  release:
    runs-on: ubuntu-latest
    permissions:
      contents: read

    steps:
      - uses: actions/checkout@v4

      - name: Install Rust
        uses: dtolnay/rust-toolchain@stable

      - name: Cache rollout binary
        uses: actions/cache@v4
        with:
          path: ~/.cargo/bin/rollout
          key: rollout-cli-${{{{ hashFiles('Cargo.lock') }}}}

      - name: Install rollout
        run: |
          if ! command -v rollout &> /dev/null; then
            cargo install rollout-cli
          fi

      - name: Release
        env:
          AWS_ACCESS_KEY_ID: ${{{{ secrets.AWS_ACCESS_KEY_ID }}}}
          AWS_SECRET_ACCESS_KEY: ${{{{ secrets.AWS_SECRET_ACCESS_KEY }}}}
        run: rollout release
"#
    )
}
