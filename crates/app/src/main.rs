use anyhow::Result;
use clap::{Parser, Subcommand};
use finsort_import::CategoryEdit;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod render;

#[derive(Parser, Debug)]
#[command(name = "finsort", version, about = "Keyword categorization for bank statements")]
struct Cli {
    /// Category file (overrides the config and the platform default)
    #[arg(long, global = true, value_name = "PATH")]
    categories: Option<PathBuf>,

    /// TOML config file (default: finsort.toml in the platform config dir)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage categories and keywords
    Categories {
        #[command(subcommand)]
        command: CategoryCommand,
    },

    /// Classify a statement and print tables, totals and breakdowns
    Classify {
        csv: PathBuf,

        /// Print the classification as JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Classify a statement, apply corrections and learn keywords from them
    Save {
        csv: PathBuf,

        /// Correction for one row, e.g. `--set 3=Dining` (repeatable)
        #[arg(long = "set", value_name = "ROW=CATEGORY", required = true)]
        edits: Vec<CategoryEdit>,

        /// Print the reclassified statement as JSON instead of tables
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
    /// List categories in match order with their keywords
    List,
    /// Create an empty category
    Add { name: String },
    /// Delete a category and its keywords
    Remove { name: String },
    /// Teach a keyword to a category
    Learn { category: String, text: String },
}

fn init_tracing(config_filter: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config_filter.unwrap_or("warn")))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::load_config(cli.config.as_deref())?;
    init_tracing(config.log_filter.as_deref());

    let categories_path = match cli.categories {
        Some(p) => p,
        None => config.categories_path()?,
    };
    tracing::debug!("Using category file {}", categories_path.display());

    let mut out = io::stdout().lock();
    match cli.command {
        Command::Categories { command } => {
            let mut store = commands::open_store(&categories_path)?;
            match command {
                CategoryCommand::List => commands::list_categories(&store, &mut out)?,
                CategoryCommand::Add { name } => commands::add_category(&mut store, &name, &mut out)?,
                CategoryCommand::Remove { name } => {
                    commands::remove_category(&mut store, &name, &mut out)?
                }
                CategoryCommand::Learn { category, text } => {
                    commands::learn_keyword(&mut store, &category, &text, &mut out)?
                }
            }
        }

        Command::Classify { csv, json } => {
            let store = commands::open_store(&categories_path)?;
            commands::classify_file(store, &csv, &config.csv, json, &mut out)?;
        }

        Command::Save { csv, edits, json } => {
            let store = commands::open_store(&categories_path)?;
            commands::save_edits(store, &csv, &config.csv, &edits, json, &mut out)?;
        }
    }

    Ok(())
}
