mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rollout_core::DescriptorVariant;

#[derive(Parser)]
#[command(
    name = "rollout",
    about = "Build, publish and redeploy a Rust service container on AWS"
)]
#[command(version)]
struct Cli {
    /// Project directory containing Cargo.toml and rollout.toml
    #[arg(long, short = 'C', global = true, default_value = ".")]
    project: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct TriggerArgs {
    /// Branch the push landed on (plain name or refs/heads/ ref)
    #[arg(long, env = "GITHUB_REF_NAME")]
    branch: Option<String>,
    /// Full commit hash of the push
    #[arg(long, env = "GITHUB_SHA")]
    commit: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the release pipeline for one push event
    Release {
        #[command(flatten)]
        trigger: TriggerArgs,
    },
    /// Show what a release would do, without calling aws or docker
    Plan {
        #[command(flatten)]
        trigger: TriggerArgs,
    },
    /// Write rollout.toml and .env.example into an existing Rust project
    Init,
    /// Eject the build descriptor for manual customization
    Eject {
        /// Descriptor variant to eject (defaults to [build].variant)
        #[arg(long)]
        variant: Option<DescriptorVariant>,
    },
    /// Check tools, credentials and configuration
    Doctor,
    /// Show the deployed service's status
    Status,
    /// Manage the CI workflow
    Ci {
        #[command(subcommand)]
        action: CiAction,
    },
}

#[derive(Subcommand)]
enum CiAction {
    /// Write a GitHub Actions workflow that runs `rollout release` on push
    Init,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    commands::load_dotenv(&cli.project)?;

    match cli.command {
        Commands::Release { trigger } => {
            commands::release(&cli.project, trigger.branch, trigger.commit).await?
        }
        Commands::Plan { trigger } => commands::plan(&cli.project, trigger.branch, trigger.commit)?,
        Commands::Init => commands::init_project(&cli.project)?,
        Commands::Eject { variant } => commands::eject(&cli.project, variant)?,
        Commands::Doctor => commands::doctor(&cli.project).await?,
        Commands::Status => commands::status(&cli.project).await?,
        Commands::Ci { action } => match action {
            CiAction::Init => commands::ci_init(&cli.project)?,
        },
    }

    Ok(())
}
