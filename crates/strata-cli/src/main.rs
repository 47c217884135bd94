//! Strata command-line interface.
//!
//! Run forward models from TOML job files:
//! ```sh
//! strata run job.toml
//! strata validate job.toml
//! strata methods
//! ```
//!
//! Set `RUST_LOG=info` (or `debug`) for solver progress.

mod config;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use strata_core::HankelMethod;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Strata: EM fields of dipoles and loops over a layered earth")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a forward model from a TOML job file.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Parse a job file and build its model without running it.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
    /// List the available Hankel transform methods.
    Methods,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            println!("Strata layered-earth solver");
            println!("===========================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let model = runner::build_model(&job)?;
            let table = runner::run_model(&job, &model)?;

            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));
            if let Some(e) = &table.efield {
                runner::write_field_csv(&table, e, &out_dir.join("efield.csv"))?;
            }
            if let Some(h) = &table.hfield {
                runner::write_field_csv(&table, h, &out_dir.join("hfield.csv"))?;
            }
            if job.output.save_json {
                runner::write_fields_json(&table, &out_dir.join("fields.json"))?;
            }

            println!("Forward model complete.");
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            runner::build_model(&job)?;
            println!("Configuration is valid: {}", config.display());
            Ok(())
        }
        Commands::Methods => {
            println!("Hankel transform methods:");
            println!();
            for method in HankelMethod::ALL {
                let marker = if method == HankelMethod::default() { " (default)" } else { "" };
                println!("  {:<12} {}{}", method.name(), method.description(), marker);
            }
            Ok(())
        }
    }
}
