//! Runtime configuration resolved from CLI arguments

use std::path::PathBuf;

use pagesift_core::pipeline::PipelineConfig;
use pagesift_core::progress::MB;
use pagesift_core::ScanRules;

use crate::cli::Cli;

/// Validated pipeline invocation.
#[derive(Debug)]
pub struct Config {
    pub file: PathBuf,
    pub pipeline: PipelineConfig,
}

impl TryFrom<Cli> for Config {
    type Error = anyhow::Error;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        anyhow::ensure!(cli.readers >= 1, "--readers must be at least 1");
        anyhow::ensure!(cli.writers >= 1, "--writers must be at least 1");
        anyhow::ensure!(cli.chunk_mb >= 1, "--chunk-mb must be at least 1");

        // Keywords are matched against lower-cased entity text. They are
        // not trimmed: a space-padded keyword like " pi " matches the
        // whole word only.
        let keywords: Vec<String> = cli.keywords.iter().map(|k| k.to_lowercase()).collect();
        anyhow::ensure!(
            keywords.iter().all(|k| !k.trim().is_empty()),
            "keywords must not be blank"
        );

        Ok(Self {
            file: cli.file,
            pipeline: PipelineConfig {
                readers: cli.readers,
                writers: cli.writers,
                chunk_size: cli.chunk_mb * MB,
                flush_threshold: cli.flush_threshold,
                keywords,
                output_dir: cli.output_dir,
                rules: ScanRules::default(),
            },
        })
    }
}
