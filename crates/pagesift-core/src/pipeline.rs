//! Pipeline driver — offset scheduler, reader/writer pools, completion
//! barriers
//!
//! The offset scheduler is a bounded channel with capacity equal to the
//! reader pool: there is no scheduler thread, each reader both drains
//! and refills it, which load-balances remaining work across idle
//! workers. Entities flow over a second bounded channel to the writer
//! pool; a side channel feeds per-chunk byte counts to the progress
//! tracker. The driver joins the reader pool, then the writer pool;
//! channel disconnection after each pool drains is the only shutdown
//! signal.

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::corpus::{Corpus, CorpusHandle};
use crate::error::PipelineError;
use crate::progress::{self, MB};
use crate::scanner::{self, ChunkScan, Entity, ScanRules};
use crate::sink::MatchSink;

/// Offset past any real corpus position. Dispatched to every reader once
/// no live chunk chain can produce further work, so each observes an
/// offset beyond end-of-corpus and terminates.
const END_OF_WORK: u64 = u64::MAX;

/// Everything the pipeline needs beyond the corpus itself.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Reader pool size (also the scheduler and entity channel capacity).
    pub readers: usize,
    /// Writer pool size.
    pub writers: usize,
    /// Per-chunk byte budget for reader scans.
    pub chunk_size: u64,
    /// Writer flush threshold in chars.
    pub flush_threshold: usize,
    /// Literal substrings scored against lower-cased entity text, in
    /// list order. Must be lower-case themselves.
    pub keywords: Vec<String>,
    pub output_dir: PathBuf,
    pub rules: ScanRules,
}

#[derive(Debug, Default)]
struct ReaderStats {
    chunks: usize,
    entities: usize,
}

#[derive(Debug, Default)]
struct WriterStats {
    matched: usize,
    files: usize,
}

/// Aggregated run statistics.
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub chunks_scanned: usize,
    pub entities_extracted: usize,
    pub entities_matched: usize,
    pub files_written: usize,
    /// Byte total accumulated by the progress tracker.
    pub bytes_scanned: u64,
    pub elapsed: Duration,
}

impl PipelineReport {
    pub fn log(&self) {
        log::info!(
            "scanned {} chunks ({} MB): {} entities, {} matched, {} output files [{:.1}s]",
            self.chunks_scanned,
            self.bytes_scanned / MB,
            self.entities_extracted,
            self.entities_matched,
            self.files_written,
            self.elapsed.as_secs_f64()
        );
    }
}

fn validate(config: &PipelineConfig) -> Result<(), PipelineError> {
    if config.readers == 0 {
        return Err(PipelineError::config("reader pool size must be at least 1"));
    }
    if config.writers == 0 {
        return Err(PipelineError::config("writer pool size must be at least 1"));
    }
    if config.chunk_size == 0 {
        return Err(PipelineError::config("chunk size must be at least 1 byte"));
    }
    if config.keywords.is_empty() {
        return Err(PipelineError::config("keyword list must not be empty"));
    }
    if config.keywords.iter().any(|k| k.is_empty()) {
        return Err(PipelineError::config("keywords must not be empty strings"));
    }
    Ok(())
}

/// Run the full pipeline over `corpus` and block until both pools have
/// drained. The first worker failure (or panic) is surfaced after all
/// workers have been joined; every I/O error is fatal to the run.
pub fn run(corpus: &Corpus, config: &PipelineConfig) -> Result<PipelineReport, PipelineError> {
    validate(config)?;
    std::fs::create_dir_all(&config.output_dir)?;

    let start = Instant::now();
    let (offset_tx, offset_rx) = bounded::<u64>(config.readers);
    let (entity_tx, entity_rx) = bounded::<Entity>(config.readers);
    let (progress_tx, progress_rx) = bounded::<u64>(config.readers);

    // Unresolved chunk chains; the reader resolving the last one floods
    // the scheduler with END_OF_WORK offsets.
    let pending = AtomicUsize::new(config.readers);

    // Seed exactly one chunk per reader, evenly spaced. The channel has
    // one slot per seed, so this cannot block.
    for i in 0..config.readers as u64 {
        offset_tx
            .send(i * config.chunk_size)
            .expect("offset scheduler closed before seeding");
    }

    let mut report = thread::scope(|s| -> Result<PipelineReport, PipelineError> {
        let mut reader_handles = Vec::with_capacity(config.readers);
        for id in 0..config.readers {
            let offset_rx = offset_rx.clone();
            let offset_tx = offset_tx.clone();
            let entity_tx = entity_tx.clone();
            let progress_tx = progress_tx.clone();
            let pending = &pending;
            let handle = thread::Builder::new()
                .name(format!("reader-{id}"))
                .spawn_scoped(s, move || {
                    reader_loop(
                        id,
                        corpus,
                        config,
                        offset_rx,
                        offset_tx,
                        entity_tx,
                        progress_tx,
                        pending,
                    )
                })
                .map_err(PipelineError::Io)?;
            reader_handles.push(handle);
        }

        let mut writer_handles = Vec::with_capacity(config.writers);
        for id in 0..config.writers {
            let entity_rx = entity_rx.clone();
            let handle = thread::Builder::new()
                .name(format!("writer-{id}"))
                .spawn_scoped(s, move || writer_loop(id, config, entity_rx))
                .map_err(PipelineError::Io)?;
            writer_handles.push(handle);
        }

        let bar = progress::scan_bar(corpus.size());
        let tracker = thread::Builder::new()
            .name("progress".to_string())
            .spawn_scoped(s, move || progress::run_tracker(progress_rx, bar))
            .map_err(PipelineError::Io)?;

        // From here on the pools hold the only live channel ends; each
        // pool draining closes the channel behind it.
        drop(offset_tx);
        drop(offset_rx);
        drop(entity_tx);
        drop(entity_rx);
        drop(progress_tx);

        let mut report = PipelineReport::default();
        let mut first_err: Option<PipelineError> = None;

        // Barrier 1: reader pool. Joining it drops the last entity
        // senders, which lets the writers drain out.
        for handle in reader_handles {
            match join_worker(handle) {
                Ok(stats) => {
                    report.chunks_scanned += stats.chunks;
                    report.entities_extracted += stats.entities;
                }
                Err(e) => record_failure(&mut first_err, e),
            }
        }

        // Barrier 2: writer pool.
        for handle in writer_handles {
            match join_worker(handle) {
                Ok(stats) => {
                    report.entities_matched += stats.matched;
                    report.files_written += stats.files;
                }
                Err(e) => record_failure(&mut first_err, e),
            }
        }

        report.bytes_scanned = tracker.join().unwrap_or(0);

        match first_err {
            Some(e) => Err(e),
            None => Ok(report),
        }
    })?;

    report.elapsed = start.elapsed();
    Ok(report)
}

/// Mark one chunk chain as finished. The last chain to finish floods the
/// scheduler with end-of-work offsets so every blocked reader wakes up.
/// The flood cannot block: with no chain left unresolved the scheduler
/// is empty, and its capacity equals the flood size.
fn resolve_chain(pending: &AtomicUsize, scheduler: &Sender<u64>, pool_size: usize) {
    if pending.fetch_sub(1, Ordering::AcqRel) == 1 {
        for _ in 0..pool_size {
            let _ = scheduler.send(END_OF_WORK);
        }
    }
}

/// Seek, align and scan one chunk. `None` means end-of-corpus was hit
/// while aligning to a word boundary, so nothing scannable remains past
/// this offset.
fn scan_at(
    handle: &mut CorpusHandle,
    offset: u64,
    config: &PipelineConfig,
) -> io::Result<Option<ChunkScan>> {
    let mut reader = handle.reader_at(offset)?;
    if offset != 0 && scanner::align_to_delimiter(&mut reader, config.rules.delimiter)?.is_none() {
        return Ok(None);
    }
    scanner::scan_chunk(&mut reader, config.chunk_size, &config.rules).map(Some)
}

/// Reader worker: turn dispatched offsets into entities plus follow-up
/// offsets until one past end-of-corpus arrives.
#[allow(clippy::too_many_arguments)]
fn reader_loop(
    id: usize,
    corpus: &Corpus,
    config: &PipelineConfig,
    offsets: Receiver<u64>,
    scheduler: Sender<u64>,
    entities: Sender<Entity>,
    progress: Sender<u64>,
    pending: &AtomicUsize,
) -> io::Result<ReaderStats> {
    let mut handle = corpus.handle()?;
    let mut stats = ReaderStats::default();
    let size = corpus.size();

    while let Ok(offset) = offsets.recv() {
        if offset > size {
            if offset != END_OF_WORK {
                // A dispatched offset ran past the corpus: its chain is
                // done producing work.
                resolve_chain(pending, &scheduler, config.readers);
            }
            break;
        }

        let scan = match scan_at(&mut handle, offset, config) {
            Ok(Some(scan)) => scan,
            Ok(None) => {
                resolve_chain(pending, &scheduler, config.readers);
                break;
            }
            Err(e) => {
                resolve_chain(pending, &scheduler, config.readers);
                return Err(e);
            }
        };

        stats.chunks += 1;
        for entity in scan.entities {
            if entities.send(entity).is_err() {
                resolve_chain(pending, &scheduler, config.readers);
                return Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "writer pool disconnected",
                ));
            }
            stats.entities += 1;
        }

        if scan.reached_eof {
            // End of corpus before the budget: report coverage, no
            // follow-up. The worker keeps serving offsets until one
            // past end-of-corpus arrives.
            let _ = progress.send(scan.consumed);
            resolve_chain(pending, &scheduler, config.readers);
        } else {
            // One boundary byte is skipped between chunks; the next
            // scan realigns to a delimiter.
            let _ = scheduler.send(offset + scan.consumed + 1);
            let _ = progress.send(scan.consumed + 1);
        }
    }

    log::debug!(
        "reader-{id}: done after {} chunks, {} entities",
        stats.chunks,
        stats.entities
    );
    Ok(stats)
}

/// Writer worker: drain the entity channel into a keyword-scoring sink
/// until the channel disconnects.
fn writer_loop(
    id: usize,
    config: &PipelineConfig,
    entities: Receiver<Entity>,
) -> io::Result<WriterStats> {
    let mut sink = MatchSink::new(&config.output_dir, id, config.flush_threshold);

    for entity in entities {
        sink.push(entity, &config.keywords)?;
    }

    // Only threshold-crossing flushes are persisted; whatever is still
    // below the threshold at shutdown is dropped.
    if sink.buffered_chars() > 0 {
        log::debug!(
            "writer-{id}: dropping {} buffered chars below flush threshold",
            sink.buffered_chars()
        );
    }
    log::debug!(
        "writer-{id}: done, {} of {} entities matched, {} files",
        sink.entities_matched(),
        sink.entities_seen(),
        sink.files_written()
    );
    Ok(WriterStats {
        matched: sink.entities_matched(),
        files: sink.files_written(),
    })
}

fn join_worker<T>(handle: thread::ScopedJoinHandle<'_, io::Result<T>>) -> Result<T, PipelineError> {
    let name = handle.thread().name().unwrap_or("worker").to_string();
    match handle.join() {
        Ok(Ok(stats)) => Ok(stats),
        Ok(Err(e)) => Err(PipelineError::worker(name, e)),
        Err(_) => Err(PipelineError::worker_panic(name)),
    }
}

/// A reader failing with `BrokenPipe` lost its writer pool; the writer's
/// own failure is the root cause.
fn derived_failure(err: &PipelineError) -> bool {
    matches!(
        err,
        PipelineError::Worker { source, .. } if source.kind() == io::ErrorKind::BrokenPipe
    )
}

/// Keep the first failure seen, unless it is derived and a root cause
/// turns up at a later join.
fn record_failure(first: &mut Option<PipelineError>, err: PipelineError) {
    match first {
        None => *first = Some(err),
        Some(prev) if derived_failure(prev) && !derived_failure(&err) => *first = Some(err),
        Some(_) => {}
    }
}
