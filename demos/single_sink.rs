use daylog::{FileStyle, LineFormat};

fn main() {
    // `2025/04/01 19:55:03 single_sink.rs:7: INFO      id=7 ready`
    let format = LineFormat::new().date(true).time(true).file(FileStyle::Short);
    let logger = daylog::single_sink_logger(std::io::stdout(), format);
    logger.infof(format_args!("id={} ready", 7));
    logger.warn(["plain", "arguments", "are", "space", "joined"]);
}
