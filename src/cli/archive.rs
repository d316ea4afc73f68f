use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::archive::{compress, decompress, read_header, Backend, Compression};
use crate::cli::OutputFormat;
use crate::config::StoreConfig;

#[derive(Args)]
pub struct ArchiveArgs {
    #[command(subcommand)]
    pub command: ArchiveCommands,
}

#[derive(Subcommand)]
pub enum ArchiveCommands {
    /// Compress a file (for example a decompressed archive) with one backend
    Compress {
        /// File to read
        #[arg(short, long)]
        input: PathBuf,

        /// File to write
        #[arg(short, long)]
        output: PathBuf,

        /// Compression backend (defaults to config)
        #[arg(long)]
        backend: Option<Backend>,

        /// Compression level (defaults to config, then the backend default)
        #[arg(long)]
        level: Option<i32>,
    },

    /// Decompress a file written by either backend
    Decompress {
        /// File to read
        #[arg(short, long)]
        input: PathBuf,

        /// File to write
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Execute archive subcommand
///
/// # Errors
///
/// Returns an error if the input cannot be read or the output written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ArchiveArgs, config: &StoreConfig, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let (action, input, output, backend, bytes) = match args.command {
        ArchiveCommands::Compress {
            input,
            output,
            backend,
            level,
        } => {
            let compression = Compression {
                backend: backend.unwrap_or(config.backend),
                level: level.or(config.compression_level),
            };
            let bytes = compress(&input, &output, compression)?;
            if verbose {
                if let Ok(header) = read_header(&output) {
                    eprintln!("Re-compressed a {} archive", header.kind);
                }
            }
            ("compress", input, output, compression.backend, bytes)
        }
        ArchiveCommands::Decompress { input, output } => {
            let (backend, bytes) = decompress(&input, &output)?;
            ("decompress", input, output, backend, bytes)
        }
    };

    match format {
        OutputFormat::Text => println!(
            "{action}: {} -> {} ({backend}, {bytes} bytes uncompressed)",
            input.display(),
            output.display()
        ),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "action": action,
                "input": input.display().to_string(),
                "output": output.display().to_string(),
                "backend": backend,
                "bytes": bytes,
            }))?
        ),
        OutputFormat::Tsv => {
            println!("action\tinput\toutput\tbackend\tbytes");
            println!("{action}\t{}\t{}\t{backend}\t{bytes}", input.display(), output.display());
        }
    }
    Ok(())
}
