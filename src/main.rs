use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use zinflate::zlib::InflateOptions;

mod commands;

#[derive(Parser)]
#[command(version, about = "Inflate zlib and raw DEFLATE streams")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decompress a file to stdout
    Inflate {
        file: PathBuf,
        /// The input is a bare DEFLATE stream with no zlib header or trailer
        #[arg(long)]
        raw: bool,
        /// Don't check the ADLER-32 trailer
        #[arg(long)]
        no_verify: bool,
        /// Give up once the output would grow past this many bytes
        #[arg(long, default_value_t = InflateOptions::default().max_output)]
        max_output: usize,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the zlib header of a file
    Metadata { file: PathBuf },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Inflate {
            file,
            raw,
            no_verify,
            max_output,
            output,
        } => {
            let options = InflateOptions {
                max_output,
                verify_checksum: !no_verify,
                ..Default::default()
            };
            commands::inflate(&file, raw, &options, output.as_deref())
        }
        Command::Metadata { file } => commands::metadata(&file),
    }
}
