use std::path::PathBuf;

use clap::{Args, Subcommand};
use serde_json::json;

use crate::archive::Backend;
use crate::cli::OutputFormat;
use crate::config::StoreConfig;
use crate::index::tables::ShapeCounts;
use crate::store::annotation::build_annotation_cache;
use crate::store::coverage::build_coverage_store;
use crate::store::curated::build_curated_store;
use crate::store::dvd::build_dvd_store;
use crate::store::frequency::build_frequency_store;
use crate::store::population::build_population_store;

#[derive(Args)]
pub struct BuildArgs {
    #[command(subcommand)]
    pub command: BuildCommands,

    /// Compression backend for written archives (overrides config)
    #[arg(long, global = true)]
    pub backend: Option<Backend>,

    /// Compression level (overrides config)
    #[arg(long, global = true)]
    pub level: Option<i32>,
}

#[derive(Subcommand)]
pub enum BuildCommands {
    /// Chunked population store from per-chromosome VCFs
    Population {
        /// Input VCF(s), one chromosome each - can be specified multiple times
        #[arg(short, long = "input", required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Positions per chunk (overrides config)
        #[arg(long)]
        chunk_size: Option<u32>,

        /// Worker threads (overrides config)
        #[arg(short = 'j', long)]
        workers: Option<usize>,
    },

    /// Single-archive allele frequency store
    Frequency {
        /// Input VCF(s) - can be specified multiple times
        #[arg(short, long = "input", required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Output archive
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Curated record store with id and transcript indices
    Curated {
        /// Input VCF
        #[arg(short, long)]
        input: PathBuf,

        /// Output archive
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Annotation cache from an annotated VCF
    Annotation {
        /// Input VCF carrying CSQ payloads
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Hearing-loss variant store from a DVD VCF
    Dvd {
        /// Input VCF
        #[arg(short, long)]
        input: PathBuf,

        /// Output archive
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Coverage store from a per-base coverage summary TSV
    Coverage {
        /// Input TSV (plain or gzip); a `release/<name>/` path segment sets the source version
        #[arg(short, long)]
        input: PathBuf,

        /// Output archive
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Execute build subcommand
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the build fails.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: BuildArgs, config: &StoreConfig, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let mut config = config.clone();
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if args.level.is_some() {
        config.compression_level = args.level;
    }

    match args.command {
        BuildCommands::Population {
            inputs,
            output,
            chunk_size,
            workers,
        } => {
            config.chunk_size = chunk_size.unwrap_or(config.chunk_size);
            config.workers = workers.unwrap_or(config.workers);
            config.validate()?;
            if verbose {
                eprintln!(
                    "Building {} chunk(s) of {} positions with {} workers",
                    inputs.len(),
                    config.chunk_size,
                    config.workers
                );
            }
            let summary = build_population_store(&inputs, &output, &config)?;
            print_summary(
                format,
                "population",
                &output,
                summary.counts,
                &[
                    ("chunks", summary.chunks_written),
                    ("chromosomes", summary.chromosomes.len()),
                    ("skipped_by_filter", summary.skipped_by_filter),
                    ("skipped_unrepresentable", summary.skipped_unrepresentable),
                    ("invalid", summary.intake.invalid),
                    ("unknown_chromosome", summary.intake.unknown_chromosome),
                ],
            )?;
        }
        BuildCommands::Frequency { inputs, output } => {
            config.validate()?;
            let store = build_frequency_store(&inputs, &output, &config)?;
            print_summary(format, "frequency", &output, store.total_counts(), &[])?;
        }
        BuildCommands::Curated { input, output } => {
            config.validate()?;
            let store = build_curated_store(&input, &output, &config)?;
            print_summary(
                format,
                "curated",
                &output,
                ShapeCounts::default(),
                &[
                    ("records", store.len()),
                    ("ids", store.id_count()),
                    ("transcripts", store.transcript_count()),
                ],
            )?;
        }
        BuildCommands::Annotation { input, output } => {
            config.validate()?;
            let summary = build_annotation_cache(&input, &output, &config)?;
            print_summary(
                format,
                "annotation",
                &output,
                ShapeCounts::default(),
                &[
                    ("tables", summary.tables_written),
                    ("records", summary.records),
                    ("without_payload", summary.without_payload),
                    ("invalid", summary.intake.invalid),
                    ("unknown_chromosome", summary.intake.unknown_chromosome),
                ],
            )?;
        }
        BuildCommands::Dvd { input, output } => {
            config.validate()?;
            let store = build_dvd_store(&input, &output, &config)?;
            print_summary(format, "dvd", &output, ShapeCounts::default(), &[("records", store.len())])?;
        }
        BuildCommands::Coverage { input, output } => {
            config.validate()?;
            let summary = build_coverage_store(&input, &output, &config)?;
            print_summary(
                format,
                "coverage",
                &output,
                ShapeCounts::default(),
                &[
                    ("rows", summary.rows),
                    ("runs", summary.runs),
                    ("chromosomes", summary.chromosomes),
                    ("invalid", summary.invalid),
                    ("unknown_chromosome", summary.unknown_chromosome),
                ],
            )?;
        }
    }
    Ok(())
}

fn print_summary(
    format: OutputFormat,
    store: &str,
    output: &std::path::Path,
    counts: ShapeCounts,
    extra: &[(&str, usize)],
) -> anyhow::Result<()> {
    let mut rows: Vec<(&str, usize)> = Vec::new();
    if counts.total() > 0 {
        rows.extend([
            ("snps", counts.snps),
            ("insertions", counts.insertions),
            ("deletions", counts.deletions),
        ]);
    }
    rows.extend_from_slice(extra);

    match format {
        OutputFormat::Text => {
            println!("Built {store} store at {}", output.display());
            for (name, value) in &rows {
                println!("  {name:<24} {value:>12}");
            }
        }
        OutputFormat::Json => {
            let counts: serde_json::Map<String, serde_json::Value> =
                rows.iter().map(|(k, v)| ((*k).to_string(), json!(v))).collect();
            let value = json!({
                "store": store,
                "output": output.display().to_string(),
                "counts": counts,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Tsv => {
            println!("store\tcount\tvalue");
            for (name, value) in &rows {
                println!("{store}\t{name}\t{value}");
            }
        }
    }
    Ok(())
}
