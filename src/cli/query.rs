use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Args;

use crate::cli::OutputFormat;
use crate::config::StoreConfig;
use crate::core::types::Lookup;
use crate::index::cross::Projection;
use crate::store::annotation::AnnotationCache;
use crate::store::curated::{CuratedRecord, CuratedStore};
use crate::store::layout::{Database, DatabaseLayout, VariantReport};
use crate::utils::validation::validate_query;

#[derive(Args)]
pub struct QueryArgs {
    /// Database directory (defaults to config `database.base_dir`, then `.`)
    #[arg(short, long)]
    pub database: Option<PathBuf>,

    /// Chromosome, position, reference and alternate of one allele
    #[arg(num_args = 4, value_names = ["CHROM", "POS", "REF", "ALT"], conflicts_with_all = ["input", "id", "transcript"])]
    pub allele: Vec<String>,

    /// VCF whose records are looked up in the annotation cache
    #[arg(short, long, conflicts_with_all = ["id", "transcript"])]
    pub input: Option<PathBuf>,

    /// TSV output for --input (defaults to stdout)
    #[arg(short, long, requires = "input")]
    pub output: Option<PathBuf>,

    /// Curated record by variation id
    #[arg(long, conflicts_with = "transcript")]
    pub id: Option<u64>,

    /// Curated records on this transcript, within --window
    #[arg(long, requires = "window")]
    pub transcript: Option<String>,

    /// Inclusive coordinate window for --transcript
    #[arg(long, num_args = 2, value_names = ["FROM", "TO"])]
    pub window: Vec<u32>,

    /// Coordinate system of --window
    #[arg(long, value_enum, default_value = "protein")]
    pub projection: Projection,
}

/// Execute query subcommand
///
/// # Errors
///
/// Returns an error if the database cannot be opened, the allele is
/// malformed, or a store is corrupt.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: QueryArgs, config: &StoreConfig, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let layout = DatabaseLayout::resolve(args.database.as_deref(), &config.database);

    if let Some(input) = &args.input {
        let mut cache = AnnotationCache::open(&layout.annotation)
            .with_context(|| format!("opening annotation cache {}", layout.annotation.display()))?;
        let summary = match &args.output {
            Some(path) => {
                let mut out = BufWriter::new(File::create(path)?);
                let summary = cache.query_file(input, &mut out)?;
                out.flush()?;
                summary
            }
            None => {
                let mut out = io::stdout().lock();
                cache.query_file(input, &mut out)?
            }
        };
        if verbose {
            eprintln!(
                "Looked up {} records: {} cached, {} on unaccepted chromosomes ({} table loads)",
                summary.records,
                summary.found,
                summary.unknown_chromosome,
                cache.load_count()
            );
        }
        return Ok(());
    }

    if args.id.is_some() || args.transcript.is_some() {
        let (_, store) = CuratedStore::load(&layout.curated)
            .with_context(|| format!("opening curated store {}", layout.curated.display()))?;
        let records: Vec<&CuratedRecord> = match (&args.transcript, args.id) {
            (Some(transcript), _) => {
                let &[lo, hi] = &args.window[..] else {
                    bail!("--window takes two coordinates");
                };
                store.find_in_range(transcript, lo.min(hi), lo.max(hi), args.projection)
            }
            (None, Some(id)) => store.find_by_id(id).found().into_iter().collect(),
            (None, None) => Vec::new(),
        };
        return print_records(&records, format);
    }

    let [chrom, pos, reference, alternate] = &args.allele[..] else {
        bail!("expected CHROM POS REF ALT, --input, --id or --transcript");
    };
    let pos: u64 = pos.parse().with_context(|| format!("invalid position '{pos}'"))?;
    let (pos, reference, alternate) = validate_query(pos, reference, alternate)?;

    let mut db = Database::open(&layout, config)?;
    if db.open_count() == 0 {
        bail!("no stores found (looked for {})", layout.curated.display());
    }
    let report = db.lookup(chrom, pos, &reference, &alternate)?;
    print_report(&report, format)
}

fn outcome<T>(lookup: Option<&Lookup<T>>, show: impl Fn(&T) -> String) -> String {
    match lookup {
        None => "unavailable".to_string(),
        Some(Lookup::Found(value)) => show(value),
        Some(Lookup::Missing(absence)) => format!("not found ({absence:?})"),
    }
}

fn print_report(report: &VariantReport, format: OutputFormat) -> anyhow::Result<()> {
    let rows = [
        (
            "curated",
            outcome(report.curated.as_ref(), |r| {
                format!("{} [{}] {}", r.significance, r.review_status, r.gene_info)
            }),
        ),
        ("frequency", outcome(report.frequency.as_ref(), |af| format!("{af}"))),
        (
            "population",
            outcome(report.population.as_ref(), |s| {
                format!("{:?} / homozygotes {:?}", s.frequency, s.homozygotes)
            }),
        ),
        ("annotation", outcome(report.annotation.as_ref(), Clone::clone)),
        (
            "dvd",
            outcome(report.dvd.as_ref(), |r| format!("{} {}", r.pathogenicity, r.gene_symbol)),
        ),
        ("coverage", outcome(report.coverage.as_ref(), ToString::to_string)),
    ];

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            println!(
                "{}:{} {}>{}",
                report.chromosome, report.position, report.reference, report.alternate
            );
            for (store, value) in &rows {
                println!("  {store:<12} {value}");
            }
        }
        OutputFormat::Tsv => {
            println!("chrom\tpos\tref\talt\tstore\tresult");
            for (store, value) in &rows {
                println!(
                    "{}\t{}\t{}\t{}\t{store}\t{value}",
                    report.chromosome, report.position, report.reference, report.alternate
                );
            }
        }
    }
    Ok(())
}

fn print_records(records: &[&CuratedRecord], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(records)?),
        OutputFormat::Text => {
            println!("{} curated record(s)", records.len());
            for r in records {
                let id = r.variation_id.map_or_else(|| "-".to_string(), |id| id.to_string());
                println!(
                    "  {id:<10} {}>{} {} [{} star] {}",
                    r.reference,
                    r.alternate,
                    r.significance,
                    r.stars(),
                    r.genes().join(",")
                );
            }
        }
        OutputFormat::Tsv => {
            println!("id\tref\talt\tsignificance\treview_status\tgenes\tprotein_change");
            for r in records {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    r.variation_id.map(|id| id.to_string()).unwrap_or_default(),
                    r.reference,
                    r.alternate,
                    r.significance,
                    r.review_status,
                    r.genes().join(","),
                    r.protein_change.as_deref().unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}
