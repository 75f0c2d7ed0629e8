//! Stacksmith CLI tool.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{BuiltinApp, Source};

#[derive(Parser)]
#[command(name = "stacksmith")]
#[command(about = "Declare, synthesize and deploy serverless stacks", long_about = None)]
struct Cli {
    /// Topology file; the built-in application is used when omitted
    #[arg(long, short, global = true, env = "STACKSMITH_CONFIG")]
    config: Option<PathBuf>,

    /// Built-in application to use without a topology file
    #[arg(long, global = true, value_enum, default_value_t = BuiltinApp::ServerlessMl)]
    app: BuiltinApp,

    /// Variable for the topology file, as NAME=VALUE
    #[arg(long = "var", global = true, value_parser = commands::parse_var)]
    vars: Vec<(String, String)>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the topology and write its manifest
    Synth {
        /// Output file; stdout when omitted
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Validate a topology file
    Validate {
        /// Path to the topology file
        #[arg(default_value = "stacksmith.kdl")]
        path: PathBuf,
    },
    /// List stacks in deployment order
    List,
    /// Deploy stacks with the dry-run deployer
    Deploy {
        /// Stacks to deploy, with their dependencies; all when omitted
        #[arg(long = "stack")]
        stacks: Vec<String>,
        /// Make the simulated provider reject a stack
        #[arg(long = "reject")]
        reject: Vec<String>,
        /// Print the deployment report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show what tearing the stacks down would remove
    Destroy,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let source = Source {
        config: cli.config,
        app: cli.app,
        vars: cli.vars,
    };

    match cli.command {
        Commands::Synth { out } => {
            commands::synth::synth(&source, out.as_deref())?;
        }
        Commands::Validate { path } => {
            commands::validate(&path, &source.vars)?;
        }
        Commands::List => {
            commands::list(&source)?;
        }
        Commands::Deploy {
            stacks,
            reject,
            json,
        } => {
            commands::deploy::deploy(&source, &stacks, &reject, json).await?;
        }
        Commands::Destroy => {
            commands::deploy::destroy(&source)?;
        }
    }

    Ok(())
}
