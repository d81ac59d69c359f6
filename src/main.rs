use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fundsub::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Find substitute funds for a fund identifier
    Search {
        /// Identifier of the fund to replace
        id: String,

        /// Exclusion or threshold criterion, e.g. currency=USD or management_fee=1.2
        #[arg(short, long, value_name = "NAME=VALUE", value_parser = parse_criterion)]
        exclude: Vec<(String, String)>,

        /// Criterion to avoid, using the fund's own value for it
        #[arg(short, long, value_name = "NAME")]
        avoid: Vec<String>,

        /// Nearest funds to consider before applying criteria
        #[arg(short = 'n', long, value_parser = parse_max_results)]
        max_results: Option<usize>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a fund's attributes and cluster
    Inspect {
        /// Identifier of the fund
        id: String,
    },
}

impl From<Commands> for fundsub::AppCommand {
    fn from(cmd: Commands) -> fundsub::AppCommand {
        match cmd {
            Commands::Search {
                id,
                exclude,
                avoid,
                max_results,
                json,
            } => fundsub::AppCommand::Search(fundsub::SearchArgs {
                id,
                exclude,
                avoid,
                max_results,
                json,
            }),
            Commands::Inspect { id } => fundsub::AppCommand::Inspect { id },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

fn parse_criterion(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {s:?}"))?;
    Ok((name.trim().to_string(), value.to_string()))
}

fn parse_max_results(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fundsub::cli::setup::setup(),
        Some(cmd) => fundsub::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
