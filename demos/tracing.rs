use {
    daylog::LoggerBuilder,
    tracing_subscriber::util::SubscriberInitExt,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // The logger reports its own trouble (failed sink writes, rotations,
    // files that could not be closed) through `tracing`.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish()
        .try_init()?;

    let logger = LoggerBuilder::new("tracing").create_dir(true).sink(Unplugged).build()?;

    logger.info(["This line reaches the file; the unplugged sink fails quietly"]);
    daylog::error!(logger, "error code {}", 503);

    Ok(())
}

struct Unplugged;

impl std::io::Write for Unplugged {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(std::io::ErrorKind::NotConnected, "unplugged"))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
