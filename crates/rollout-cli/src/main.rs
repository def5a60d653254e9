mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::args::{ResolveFlags, StampFlags, TargetFlags};
use cmd::config::ConfigSubcommand;
use cmd::object::ObjectAction;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "rollout",
    about = "Resolve parameterized Kubernetes manifests and drive cluster operations",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from rollout.yaml or .git/)
    #[arg(long, global = true, env = "ROLLOUT_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a template into a concrete manifest plus audit side-file
    Resolve {
        #[command(flatten)]
        resolve: ResolveFlags,

        /// Output path (default: <template stem>.resolved.yaml)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Create the objects; fails if they already exist
    Create {
        #[command(flatten)]
        resolve: ResolveFlags,
        #[command(flatten)]
        target: TargetFlags,
    },

    /// Apply the objects (idempotent upsert; recommended for repeated runs)
    Apply {
        #[command(flatten)]
        resolve: ResolveFlags,
        #[command(flatten)]
        target: TargetFlags,
    },

    /// Replace the objects; they must already exist
    Replace {
        #[command(flatten)]
        resolve: ResolveFlags,
        #[command(flatten)]
        target: TargetFlags,
    },

    /// Delete the objects by identity projection
    Delete {
        #[command(flatten)]
        resolve: ResolveFlags,
        #[command(flatten)]
        target: TargetFlags,
    },

    /// Show drift between the resolved manifest and live cluster state
    Diff {
        #[command(flatten)]
        resolve: ResolveFlags,
        #[command(flatten)]
        target: TargetFlags,
    },

    /// Describe live objects of a kind, from the unresolved template
    Describe {
        /// Manifest template (.yaml or .json)
        #[arg(long)]
        template: PathBuf,

        /// Object kind to describe (e.g. deployment)
        #[arg(long)]
        kind: String,

        #[command(flatten)]
        stamp: StampFlags,
        #[command(flatten)]
        target: TargetFlags,
    },

    /// Inspect and validate rollout.yaml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let root_path = cli.root.as_deref();
    let root = root::resolve_root(root_path);

    let result = match cli.command {
        Commands::Resolve { resolve, output } => {
            cmd::resolve::run(&root, resolve, output, cli.json)
        }
        Commands::Create { resolve, target } => {
            cmd::object::run(&root, ObjectAction::Create, resolve, target, cli.json)
        }
        Commands::Apply { resolve, target } => {
            cmd::object::run(&root, ObjectAction::Apply, resolve, target, cli.json)
        }
        Commands::Replace { resolve, target } => {
            cmd::object::run(&root, ObjectAction::Replace, resolve, target, cli.json)
        }
        Commands::Delete { resolve, target } => {
            cmd::object::run(&root, ObjectAction::Delete, resolve, target, cli.json)
        }
        Commands::Diff { resolve, target } => {
            cmd::object::run(&root, ObjectAction::Diff, resolve, target, cli.json)
        }
        Commands::Describe {
            template,
            kind,
            stamp,
            target,
        } => cmd::object::describe(&root, &template, &kind, stamp, target, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
