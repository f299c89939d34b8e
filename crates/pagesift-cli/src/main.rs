//! pagesift - Concurrent keyword scan over huge flat text dumps
//!
//! Splits the corpus into chunks scanned in parallel, extracts
//! `<page>…</page>` records, and writes keyword matches to size-bounded
//! files in the output directory.

use anyhow::{Context, Result};
use clap::Parser;

mod cli;
mod config;

use cli::Cli;
use config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();
    pagesift_core::init_logging(cli.quiet, cli.verbose);

    let config = Config::try_from(cli)?;
    let corpus = pagesift_core::Corpus::open(&config.file)
        .with_context(|| format!("cannot open corpus: {}", config.file.display()))?;

    log::info!(
        "scanning {} ({} MB): {} readers, {} writers, {} keywords -> {}",
        corpus.path().display(),
        corpus.size() / pagesift_core::progress::MB,
        config.pipeline.readers,
        config.pipeline.writers,
        config.pipeline.keywords.len(),
        config.pipeline.output_dir.display()
    );

    let report = pagesift_core::pipeline::run(&corpus, &config.pipeline)?;
    report.log();
    log::info!("parsing took {:.2?}", report.elapsed);
    Ok(())
}
