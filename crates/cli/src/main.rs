use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
use commands::diagnose::DiagnoseArgs;

#[derive(Parser)]
#[command(name = "edgescope")]
#[command(about = "Diagnose CDN distribution misconfigurations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a diagnosis against a distribution configuration
    Diagnose(DiagnoseArgs),

    /// List the built-in rule catalog
    Rules,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Diagnose(args) => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(commands::diagnose::execute(args))
        }
        Commands::Rules => commands::rules::execute(),
    }
}
