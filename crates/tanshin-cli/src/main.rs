mod commands;
mod error;
mod fetch;
mod logging;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tanshin",
    version,
    about = "Extract financial figures from Japanese earnings summaries (決算短信)"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract metrics and forecasts from a tanshin PDF
    Analyze {
        /// Path or http(s) URL of the PDF
        input: String,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Custom JSON config (default: built-in vocabulary)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Only analyze the first N pages
        #[arg(long, value_name = "N")]
        max_pages: Option<usize>,

        /// Give up analysis after this many seconds (download time excluded)
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Include the decision trace in JSON output
        #[arg(long)]
        trace: bool,
    },
    /// Print the tables detected in a PDF, without metric matching
    Tables {
        /// Path or http(s) URL of the PDF
        input: String,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Custom JSON config for table detection settings
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Inspect and validate analyzer configs
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the built-in config as JSON
    Show,
    /// Validate a custom config file
    Validate {
        /// Path to JSON config file
        file: PathBuf,
    },
}

fn main() {
    logging::setup_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze {
            input,
            output,
            config,
            max_pages,
            timeout,
            trace,
        } => commands::analyze::run(&input, &output, config, max_pages, timeout, trace),
        Commands::Tables {
            input,
            output,
            config,
        } => commands::tables::run(&input, &output, config),
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(),
            ConfigAction::Validate { file } => commands::config::validate(&file),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
