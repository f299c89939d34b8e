//! Progress tracking — aggregates consumed-byte reports from readers
//!
//! TTY mode: indicatif byte-progress bar on stderr.
//! Non-TTY mode: periodic log output.

use std::io::IsTerminal;

use crossbeam_channel::Receiver;
use indicatif::{ProgressBar, ProgressStyle};

pub const MB: u64 = 1024 * 1024;

/// Log a line per this many bytes when no bar is visible.
const LOG_INTERVAL: u64 = 100 * MB;

/// Byte-progress bar for the scan; hidden when stderr is not a TTY.
pub fn scan_bar(total_bytes: u64) -> ProgressBar {
    if !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total_bytes);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{prefix:<10.dim} {bar:30.green/dim} {binary_bytes:>9}/{binary_total_bytes:9} {eta:>4}",
            )
            .expect("invalid template")
            .progress_chars("--"),
    );
    pb.set_prefix("scanning");
    pb
}

/// Sum consumed-byte reports until every reader has dropped its sender,
/// driving the bar (or periodic logs off-TTY). Returns the byte total.
///
/// Observability only: the tracker has no effect on pipeline
/// correctness or control flow.
pub fn run_tracker(reports: Receiver<u64>, bar: ProgressBar) -> u64 {
    let mut total = 0u64;
    let mut logged = 0u64;
    for consumed in reports {
        total += consumed;
        bar.set_position(total.min(bar.length().unwrap_or(total)));
        if bar.is_hidden() && total - logged >= LOG_INTERVAL {
            log::info!("scanned {} MB", total / MB);
            logged = total;
        }
    }
    bar.finish_and_clear();
    total
}
