//! File logging example
//!
//! Demonstrates fan-out to console and a JSON-lines file simultaneously.
//!
//! Run with: cargo run --example file_logging

use correlated_logger::prelude::*;

fn main() -> Result<()> {
    println!("=== Correlated Logger - File Logging Example ===\n");

    let logger = Logger::builder()
        .app_name("file_logging")
        .level(LogLevel::Debug)
        .batch_size(10)
        .destination(ConsoleDestination::new().with_output_format(OutputFormat::Text))
        .destination(FileDestination::new("application.log")?)
        .build()?;

    println!("1. Logging to both console and file:");

    logger.info("Application started");
    logger.debug("Loading configuration...");
    logger.info("Configuration loaded successfully");
    logger.warning("Using default settings for some options");
    logger.info_with_context(
        "Connected to database",
        LogContext::new().action("connect").duration_ms(35),
    );
    logger.error("Failed to load optional plugin");

    println!("\n2. Performing some operations:");

    for i in 1..=5 {
        logger.info(format!("Processing item {}/5", i));
        if i == 3 {
            logger.warning("Item 3 took longer than expected");
        }
    }

    logger.info("All operations completed");

    // Close flushes everything still buffered
    let report = logger.close();
    if !report.is_success() {
        eprintln!("Some destinations failed: {:?}", report.failed_destinations());
    }

    println!("\n=== Example completed successfully! ===");
    println!("Check 'application.log' for the JSON lines output");

    Ok(())
}
