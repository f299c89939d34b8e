//! Logging setup over env_logger

/// Padded label for a log level.
fn level_label(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    }
}

/// Initialize process-wide logging.
///
/// `quiet` caps output at warnings; `verbose` enables debug detail
/// (per-worker chunk and flush events). `RUST_LOG` overrides both.
pub fn init_logging(quiet: bool, verbose: bool) {
    use std::io::Write;

    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            writeln!(buf, "[{}] {}", level_label(record.level()), record.args())
        })
        .init();
}
