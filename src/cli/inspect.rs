use std::path::PathBuf;

use clap::Args;

use crate::cli::OutputFormat;
use crate::config::StoreConfig;
use crate::store::layout::{inspect, DatabaseLayout, InspectEntry};

#[derive(Args)]
pub struct InspectArgs {
    /// Database directory (defaults to config `database.base_dir`, then `.`)
    #[arg(short, long)]
    pub database: Option<PathBuf>,
}

/// Execute inspect subcommand
///
/// # Errors
///
/// Returns an error if a present archive header cannot be decoded.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: InspectArgs, config: &StoreConfig, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let layout = DatabaseLayout::resolve(args.database.as_deref(), &config.database);
    let entries = inspect(&layout)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Tsv => {
            println!("store\tpath\tpresent\tkind\tsource_version\tbuilt_at\tpartitions");
            for e in &entries {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    e.store,
                    e.path.display(),
                    e.present,
                    e.kind.as_deref().unwrap_or_default(),
                    e.source_version.as_deref().unwrap_or_default(),
                    e.built_at.as_deref().unwrap_or_default(),
                    e.partitions.map(|n| n.to_string()).unwrap_or_default()
                );
            }
        }
        OutputFormat::Text => print_text(&entries, verbose),
    }
    Ok(())
}

fn print_text(entries: &[InspectEntry], verbose: bool) {
    let present = entries.iter().filter(|e| e.present).count();
    println!("Database ({present} of {} stores present)\n", entries.len());
    println!("{:<12} {:<10} {:<20} {:>10}", "Store", "Source", "Built", "Parts");
    println!("{}", "-".repeat(55));
    for e in entries {
        if !e.present {
            println!("{:<12} (missing)", e.store);
            continue;
        }
        let built = e.built_at.as_deref().unwrap_or("-");
        println!(
            "{:<12} {:<10} {:<20} {:>10}",
            e.store,
            e.source_version.as_deref().unwrap_or("-"),
            built.get(..19).unwrap_or(built),
            e.partitions.map_or_else(|| "-".to_string(), |n| n.to_string())
        );
        if verbose {
            println!("  └─ {} ({})", e.path.display(), e.kind.as_deref().unwrap_or("no header"));
        }
    }
}
