//! Command-line interface.

use std::future::Future;
use std::path::PathBuf;

use carpecarb_lookup::{CarbLog, JsonFileStore, LookupConfig, LookupResult, LookupService, Mode};
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{CliError, Result};

/// CarpeCarb - carbohydrate lookups backed by cited nutrition sources.
#[derive(Parser)]
#[command(name = "carpecarb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Food log file (default: $CARPECARB_STORE or ./carpecarb.json)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Look up every food item named in free text.
    Lookup {
        /// What you ate (e.g., "Big Mac and medium fries")
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Look up a single food item.
    Check {
        /// Food item (e.g., "apple")
        #[arg(required = true, num_args = 1..)]
        food: Vec<String>,
    },

    /// Look up free text and add every item to the food log.
    Log {
        /// What you ate
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Show the running total, the last item and goal progress.
    Total,

    /// Set the daily carb goal in grams (0 clears it).
    Goal {
        grams: f64,
    },

    /// Clear the running total and the food log.
    Reset,
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let store = cli
        .store
        .map(JsonFileStore::new)
        .unwrap_or_else(JsonFileStore::from_env);
    tracing::debug!(store = %store.path().display(), "using food log");

    match cli.command {
        Commands::Lookup { text } => lookup_command(&text.join(" "), Mode::Multi),
        Commands::Check { food } => lookup_command(&food.join(" "), Mode::Single),
        Commands::Log { text } => log_command(&text.join(" "), &store),
        Commands::Total => total_command(&store),
        Commands::Goal { grams } => goal_command(grams, &store),
        Commands::Reset => reset_command(&store),
    }
}

fn lookup_command(text: &str, mode: Mode) -> Result<()> {
    let service = LookupService::from_config(&LookupConfig::from_env())?;
    let result = with_spinner(service.lookup(text, mode))??;
    print_result(&result);
    Ok(())
}

fn log_command(text: &str, store: &JsonFileStore) -> Result<()> {
    let service = LookupService::from_config(&LookupConfig::from_env())?;
    let result = with_spinner(service.lookup_and_report(text, Mode::Multi, store))??;
    print_result(&result);

    if !result.items().is_empty() {
        println!();
        println!(
            "{} {}",
            style("Logged:").green().bold(),
            format_grams(result.total_carbs())
        );
    }
    print_log(&store.load()?);
    Ok(())
}

fn total_command(store: &JsonFileStore) -> Result<()> {
    print_log(&store.load()?);
    Ok(())
}

fn goal_command(grams: f64, store: &JsonFileStore) -> Result<()> {
    let log = store.set_daily_goal(Some(grams))?;
    match log.daily_goal {
        Some(goal) => println!(
            "{} {}",
            style("Daily goal set to").bold(),
            style(format_grams(goal)).cyan()
        ),
        None => println!("{}", style("Daily goal cleared").bold()),
    }
    Ok(())
}

fn reset_command(store: &JsonFileStore) -> Result<()> {
    store.reset()?;
    println!("{}", style("Food log cleared").bold());
    Ok(())
}

/// Drive a lookup to completion on a fresh runtime behind a spinner.
fn with_spinner<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.set_message("Looking up carbs...");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let output = runtime.block_on(future);
    pb.finish_and_clear();
    Ok(output)
}

fn print_result(result: &LookupResult) {
    let items = result.items();
    if items.is_empty() {
        println!("{}", style("No food items recognised.").yellow());
        return;
    }

    for item in items {
        println!(
            "  {:>8}  {}",
            style(format_grams(item.carbs)).cyan().bold(),
            style(&item.name).green()
        );
        if let Some(details) = &item.details {
            println!("            {}", style(details).dim());
        }
    }

    if items.len() > 1 {
        println!(
            "  {:>8}  {}",
            style(format_grams(result.total_carbs())).bold(),
            style("total").bold()
        );
    }

    if !result.citations().is_empty() {
        println!();
        println!("{}", style("Sources:").bold());
        for (i, url) in result.citations().iter().enumerate() {
            println!("  [{}] {}", i + 1, url);
        }
    }
}

fn print_log(log: &CarbLog) {
    println!(
        "{} {}",
        style("Total today:").bold(),
        style(format_grams(log.total_carbs)).cyan().bold()
    );
    if let Some(last) = log.last_item() {
        println!(
            "  Last: {} ({})",
            style(&last.name).green(),
            format_grams(last.carbs)
        );
    }
    if let (Some(goal), Some(remaining)) = (log.daily_goal, log.remaining()) {
        println!("  Goal: {}", format_grams(goal));
        if remaining >= 0.0 {
            println!("  Remaining: {}", style(format_grams(remaining)).green());
        } else {
            println!("  Over by: {}", style(format_grams(-remaining)).red().bold());
        }
    }
}

fn format_grams(grams: f64) -> String {
    format!("{grams:.1} g")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_parse_lookup_joins_words() {
        let cli = Cli::parse_from(["carpecarb", "lookup", "Big", "Mac"]);

        let Commands::Lookup { text } = cli.command else {
            panic!("expected lookup command");
        };
        assert_eq!(text, vec!["Big".to_string(), "Mac".to_string()]);
        assert!(cli.store.is_none());
    }

    #[test]
    fn test_cli_parse_store_after_subcommand() {
        let cli = Cli::parse_from(["carpecarb", "total", "--store", "/tmp/log.json"]);

        assert!(matches!(cli.command, Commands::Total));
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/log.json")));
    }

    #[test]
    fn test_cli_parse_goal() {
        let cli = Cli::parse_from(["carpecarb", "goal", "150"]);

        let Commands::Goal { grams } = cli.command else {
            panic!("expected goal command");
        };
        assert_eq!(grams, 150.0);
    }

    #[test]
    fn test_cli_rejects_empty_lookup() {
        assert!(Cli::try_parse_from(["carpecarb", "lookup"]).is_err());
        assert!(Cli::try_parse_from(["carpecarb", "goal", "lots"]).is_err());
    }

    #[test]
    fn test_format_grams() {
        assert_eq!(format_grams(45.0), "45.0 g");
        assert_eq!(format_grams(12.34), "12.3 g");
    }
}
