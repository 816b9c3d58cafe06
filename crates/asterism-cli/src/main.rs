mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "asterism")]
#[command(version, about = "Asterism CLI - file-based routing toolkit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the compiled route table
    Routes {
        /// Routes directory (defaults to routing.routes_dir in asterism.toml)
        #[arg(short, long)]
        dir: Option<String>,

        /// Emit the full manifest as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the route table; exits non-zero on errors
    Check {
        /// Routes directory (defaults to routing.routes_dir in asterism.toml)
        #[arg(short, long)]
        dir: Option<String>,
    },
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Execute command
    match cli.command {
        Commands::Routes { dir, json } => {
            commands::routes::execute(dir.as_deref(), json)?;
        }
        Commands::Check { dir } => {
            commands::check::execute(dir.as_deref())?;
        }
    }

    Ok(())
}
