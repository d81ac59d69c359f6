pub mod cli;
pub mod core;
pub mod providers;

use crate::cli::ui;
use crate::core::config::AppConfig;
use crate::core::{DatasetProvider, SearchOptions};
use crate::providers::csv_provider::CsvDatasetProvider;
use anyhow::Result;
use tracing::{debug, info};

/// Arguments of a substitute search.
#[derive(Debug, Clone, Default)]
pub struct SearchArgs {
    pub id: String,
    /// Explicit `name=value` criteria, in the order given.
    pub exclude: Vec<(String, String)>,
    /// Criteria whose value is taken from the target fund itself.
    pub avoid: Vec<String>,
    pub max_results: Option<usize>,
    pub json: bool,
}

#[derive(Debug, Clone)]
pub enum AppCommand {
    Search(SearchArgs),
    Inspect { id: String },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Fund substitute finder starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let mut provider = CsvDatasetProvider::new(&config.data.funds_path);
    if let Some(path) = &config.data.normalized_path {
        provider = provider.with_normalized(path);
    }

    let spinner = ui::new_spinner("Loading funds...");
    let data = provider.load().await;
    spinner.finish_and_clear();
    let data = data?;

    match command {
        AppCommand::Search(args) => {
            let mut options = SearchOptions::from(&config.search);
            if let Some(max_results) = args.max_results {
                options.max_results = max_results;
            }
            cli::search::run(&data, &args, options)
        }
        AppCommand::Inspect { id } => cli::inspect::run(&data, &id),
    }
}
