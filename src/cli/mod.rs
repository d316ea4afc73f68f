//! Command-line interface for allele-store.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **build**: Build a store from a VCF source
//! - **query**: Look up one allele, or every record of a VCF, in a database
//! - **inspect**: Show what each store of a database was built from
//! - **archive**: Re-compress archive files
//! - **serve**: Start the HTTP lookup service
//!
//! ## Usage
//!
//! ```text
//! # Build the chunked population store, one worker per source
//! allele-store build population -i gnomad.chr1.vcf.bgz -i gnomad.chr2.vcf.bgz -o db/gnomad
//!
//! # Build the curated store
//! allele-store build curated -i clinvar.vcf.gz -o db/clinvar.arc
//!
//! # Build the coverage store from a gnomAD coverage summary
//! allele-store build coverage -i release/3.0.1/coverage.tsv.bgz -o db/coverage.arc
//!
//! # Look up one allele in every store
//! allele-store query --database db 1 16103 T G --format json
//!
//! # Replay an annotated VCF through the annotation cache
//! allele-store query --database db --input sample.vcf --output sample.tsv
//!
//! # Start the lookup service
//! allele-store serve --database db --port 8080
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod archive;
pub mod build;
pub mod inspect;
pub mod query;

#[derive(Parser)]
#[command(name = "allele-store")]
#[command(version)]
#[command(about = "Build and query compact variant annotation stores")]
#[command(
    long_about = "allele-store builds position-indexed stores from variant sources and answers exact allele lookups against them.\n\nStores:\n- population: chunked frequency/homozygote classes\n- frequency: raw allele frequencies in one archive\n- curated: curated records with id and transcript-coordinate indices\n- annotation: per-chromosome cache of annotation payloads\n- dvd: hearing-loss variant records\n- coverage: per-position coverage classes"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// JSON configuration file (thresholds, chunk size, workers, compression, paths)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a store from VCF input
    Build(build::BuildArgs),

    /// Look up alleles in a database
    Query(query::QueryArgs),

    /// Show the stores of a database
    Inspect(inspect::InspectArgs),

    /// Compress or decompress archive files
    Archive(archive::ArchiveArgs),

    /// Start the HTTP lookup service
    Serve(ServeArgs),
}

#[derive(clap::Args)]
pub struct ServeArgs {
    /// Database directory
    #[arg(short, long)]
    pub database: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1")]
    pub address: String,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}
