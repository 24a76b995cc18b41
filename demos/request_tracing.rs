//! Request tracing example
//!
//! Demonstrates trace/span correlation across requests, nested spans,
//! worker threads and instrumented calls.
//!
//! Run with: cargo run --example request_tracing

use correlated_logger::prelude::*;
use std::sync::Arc;
use std::thread;

fn handle_upload(logger: &Logger, dataset_id: &str) -> std::result::Result<u64, String> {
    let args = CallArgs::new()
        .arg("dataset_id", dataset_id)
        .arg("method", "PUT")
        .arg("url", format!("https://api.example.com/v1/datasets/{}/data", dataset_id))
        .arg("api_key", "not-logged");

    CallLogger::new(logger, "upload_dataset")
        .include_params(true)
        .call(&args, || {
            if dataset_id.is_empty() {
                Err("missing dataset id".to_string())
            } else {
                Ok(10_000)
            }
        })
}

fn main() -> Result<()> {
    println!("=== Correlated Logger - Request Tracing Example ===\n");

    let logger = Arc::new(
        Logger::builder()
            .app_name("request_tracing")
            .destination(ConsoleDestination::new().with_output_format(OutputFormat::Logfmt))
            .build()?,
    );

    println!("1. One request, nested spans:");
    {
        let request = logger.request_scope(None);
        logger.info(format!("request {} received", request.request_id()));
        {
            let _span = logger.span();
            logger.info("validating payload");
        }
        let _ = handle_upload(&logger, "ds-42");
        let _ = handle_upload(&logger, "");
    }
    logger.flush();

    println!("\n2. Continuing an upstream trace:");
    let upstream = CorrelationManager::generate_trace_id();
    {
        let _request = logger.request_scope(Some(&upstream));
        logger.info("handled on behalf of upstream service");
    }
    logger.flush();

    println!("\n3. Handing the context to a worker thread:");
    {
        let _request = logger.request_scope(None);
        let snapshot = logger.capture_context();
        let worker = {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                let _entered = snapshot.enter();
                logger.info("background work in the same trace");
            })
        };
        let _ = worker.join();
        logger.info("request finished");
    }

    logger.close();
    println!("\n=== Example completed successfully! ===");

    Ok(())
}
