use std::io;

fn main() {
    // The first call builds the process-wide logger: ./log/server-<today>.log
    // plus stdout. The ./log directory must exist.
    let logger = daylog::multi_sink_logger("server", [Box::new(io::stdout()) as Box<dyn io::Write + Send>]);

    // Any later call returns the very same logger.
    let same = daylog::multi_sink_logger("other", Vec::new());
    assert!(std::ptr::eq(logger, same));

    logger.debug(["cache", "warmed"]);
    daylog::warn!(logger, "{} requests queued", 128);
    logger.criticalf(format_args!("replica {} lagging by {}s", "db-2", 42));

    let id = logger.add_sink(io::stderr()).expect("multi-sink logger");
    logger.error(["also", "on", "stderr"]);
    logger.remove_sink(id).expect("registered above");

    daylog::fatal!(logger, "shutting down with status {}", daylog::FATAL_EXIT_CODE);
}
