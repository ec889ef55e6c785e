//! Bindery CLI: the `bindery` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let config = support::load_config_or_exit(&cli.config, cli.data_dir.as_deref());

    match cli.command {
        Commands::Serve { bind, max_requests } => commands::serve::run(config, bind, max_requests),

        Commands::Seed { json } => commands::seed::run(&config, json),

        Commands::Request {
            target,
            cookies,
            body,
            json,
        } => commands::request::run(&config, target, cookies, body, json),

        Commands::Show { record, id } => commands::show::run(&config, record, id),

        Commands::Schema { record, json } => commands::schema::run(record, json),

        Commands::Bind {
            record,
            params,
            query,
        } => commands::bind::run(record, params, query),

        Commands::Records { json } => commands::records::run(json),
    }
}

// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn,bindery=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
