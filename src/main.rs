mod audit;
mod cli;
mod error;
mod fmt;
mod ledger;
mod mailbox;
mod models;
mod parser;
mod reports;
mod settings;
mod store;
mod sync;
#[cfg(test)]
mod test_utils;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use settings::Config;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> error::Result<()> {
    let config = Config::load()?;

    match cli.command {
        Commands::Sync {
            dry_run,
            output,
            store,
            friend_id,
            split,
            sender,
        } => cli::sync::run(
            &config,
            cli::sync::SyncArgs {
                dry_run: dry_run || output.is_some(),
                output,
                store,
                friend_id,
                split,
                sender,
            },
        ),
        Commands::Summary {
            month,
            periods,
            friend_id,
            limit,
            exclude,
        } => cli::summary::run(
            &config,
            cli::summary::SummaryArgs {
                month,
                periods,
                friend_id,
                limit,
                exclude,
            },
        ),
        Commands::Expenses { limit, output } => cli::expenses::run(&config, limit, output),
        Commands::Delete { expense_id } => cli::delete::run(&config, &expense_id),
        Commands::Health => cli::health::run(&config),
        Commands::Status => cli::status::run(&config),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
