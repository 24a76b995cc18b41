//! Basic logger usage example
//!
//! Demonstrates console logging, level filtering and structured context.
//!
//! Run with: cargo run --example basic_usage

use correlated_logger::prelude::*;
use std::time::Duration;

fn main() -> Result<()> {
    println!("=== Correlated Logger - Basic Usage Example ===\n");

    let logger = Logger::builder()
        .app_name("basic_usage")
        .level(LogLevel::Debug)
        .batch_size(1)
        .flush_interval(Duration::from_secs(1))
        .destination(ConsoleDestination::new())
        .build()?;

    // Log messages at different levels
    println!("1. Logging at different levels:");
    logger.debug("This is a debug message");
    logger.info("This is an info message");
    logger.warning("This is a warning message");
    logger.error("This is an error message");
    logger.critical("This is a critical message");
    logger.flush();

    println!("\n2. Logging with different minimum levels:");
    logger.set_level(LogLevel::Warning);
    println!("   Minimum level set to WARNING - debug and info won't show:");
    logger.debug("Debug message (hidden)");
    logger.info("Info message (hidden)");
    logger.warning("Warning message (visible)");
    logger.flush();

    println!("\n3. Structured context:");
    logger.set_level(LogLevel::Info);
    logger.info_with_context(
        "Dataset uploaded",
        LogContext::new()
            .action("upload_data")
            .entity(Entity::new("dataset").with_id("ds-42").with_name("Sales"))
            .status(Status::Success)
            .duration_ms(1250)
            .color("cyan")
            .with_field("rows", 10_000),
    );

    let report = logger.close();
    println!("\n=== Example completed (delivered {} in final flush) ===", report.delivered);

    Ok(())
}
