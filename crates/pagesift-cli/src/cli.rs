//! CLI argument definitions (clap derive)

use std::path::PathBuf;

use clap::Parser;

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[derive(Parser)]
#[command(
    name = "pagesift",
    about = "Scan a flat text dump for <page> records matching keywords",
    version
)]
pub struct Cli {
    /// Corpus file to scan
    #[arg(long)]
    pub file: PathBuf,

    /// Comma-separated keywords to match (case-insensitive)
    #[arg(long, required = true, value_delimiter = ',')]
    pub keywords: Vec<String>,

    /// Directory for match output files
    #[arg(long, default_value = "./matches")]
    pub output_dir: PathBuf,

    /// Reader worker pool size
    #[arg(long, default_value_t = num_cpus())]
    pub readers: usize,

    /// Writer worker pool size
    #[arg(long, default_value_t = num_cpus())]
    pub writers: usize,

    /// Chunk size per reader scan, in MB
    #[arg(long, default_value_t = 10)]
    pub chunk_mb: u64,

    /// Chars buffered per writer before flushing to a file
    #[arg(long, default_value_t = 10_000)]
    pub flush_threshold: usize,

    /// Suppress info logs (only warnings and errors)
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable debug logging (per-worker chunk and flush events)
    #[arg(short, long)]
    pub verbose: bool,
}
