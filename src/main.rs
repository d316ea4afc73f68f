use clap::Parser;
use tracing_subscriber::EnvFilter;

mod archive;
mod cli;
mod config;
mod core;
mod index;
mod parsing;
mod store;
mod utils;
mod web;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("allele_store=debug,info")
    } else {
        EnvFilter::new("allele_store=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let config = config::StoreConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        cli::Commands::Build(args) => {
            cli::build::run(args, &config, cli.format, cli.verbose)?;
        }
        cli::Commands::Query(args) => {
            cli::query::run(args, &config, cli.format, cli.verbose)?;
        }
        cli::Commands::Inspect(args) => {
            cli::inspect::run(args, &config, cli.format, cli.verbose)?;
        }
        cli::Commands::Archive(args) => {
            cli::archive::run(args, &config, cli.format, cli.verbose)?;
        }
        cli::Commands::Serve(args) => {
            web::server::run(args, &config)?;
        }
    }

    Ok(())
}
