use daylog::{LoggerBuilder, TimeZone};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logger = LoggerBuilder::new("daily")
        .directory("./log")
        .create_dir(true)
        .time_zone(TimeZone::UTC) // Roll over at UTC midnight in every region
        .file_mode(0o640) // Owner rw, group r, others none
        .build()?;

    // These lines land in ./log/daily-<UTC day>.log
    logger.info(["System startup - UTC day decides the file name"]);
    daylog::info!(logger, "Configuration loaded from {}", "config.toml");
    daylog::info!(logger, "Server listening on port {}", 8080);

    Ok(())
}
