//! Pagesift Core - Concurrent chunk-scanning pipeline for large dump files
//!
//! This crate splits a flat text corpus into independently scanned byte
//! chunks, extracts `<page>…</page>` records in parallel, scores them
//! against a keyword set, and persists matches into size-bounded output
//! files.

pub mod corpus;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod scanner;
pub mod sink;

// Re-exports for convenience
pub use corpus::{Corpus, CorpusHandle};
pub use error::PipelineError;
pub use logging::init_logging;
pub use pipeline::{PipelineConfig, PipelineReport};
pub use scanner::{ChunkScan, Entity, ScanRules};
pub use sink::MatchSink;
