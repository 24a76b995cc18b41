//! Network destination for remote logging
//!
//! Sends batches to a remote collector as newline-delimited JSON over TCP.

use crate::core::{Destination, LogEntry, LoggerError, Result};
use std::io::Write;
use std::net::TcpStream;
use std::time::Duration;

const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Network destination that sends entries to a remote TCP collector
///
/// # Example
///
/// ```no_run
/// use correlated_logger::destinations::NetworkDestination;
/// use correlated_logger::prelude::*;
///
/// let collector = NetworkDestination::new("127.0.0.1:5170")
///     .expect("Failed to connect to log collector");
///
/// let logger = Logger::builder().destination(collector).build().unwrap();
/// logger.info("This entry will be sent to 127.0.0.1:5170");
/// logger.close();
/// ```
pub struct NetworkDestination {
    name: String,
    stream: Option<TcpStream>,
    address: String,
    reconnect_on_error: bool,
}

impl NetworkDestination {
    /// Connect to `address` (e.g. "localhost:5170")
    pub fn new(address: impl Into<String>) -> Result<Self> {
        let mut destination = Self::lazy(address);
        destination.reconnect()?;
        Ok(destination)
    }

    /// Create without connecting; the first delivery opens the connection
    pub fn lazy(address: impl Into<String>) -> Self {
        Self {
            name: "network".to_string(),
            stream: None,
            address: address.into(),
            reconnect_on_error: true,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Enable or disable automatic reconnection on errors
    ///
    /// Default: enabled
    #[must_use]
    pub fn with_reconnect(mut self, enable: bool) -> Self {
        self.reconnect_on_error = enable;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn reconnect(&mut self) -> Result<()> {
        let connect = |address: &str| -> std::io::Result<TcpStream> {
            let stream = TcpStream::connect(address)?;
            stream.set_write_timeout(Some(IO_TIMEOUT))?;
            stream.set_read_timeout(Some(IO_TIMEOUT))?;
            stream.set_nodelay(true)?;
            Ok(stream)
        };
        let stream = connect(&self.address).map_err(|e| {
            LoggerError::io_operation("connecting to log collector", self.address.clone(), e)
        })?;
        self.stream = Some(stream);
        Ok(())
    }

    fn encode(batch: &[LogEntry]) -> Result<Vec<u8>> {
        let mut payload = Vec::with_capacity(batch.len() * 256);
        for entry in batch {
            serde_json::to_writer(&mut payload, entry)?;
            payload.push(b'\n');
        }
        Ok(payload)
    }

    fn send(&mut self, payload: &[u8]) -> std::io::Result<()> {
        match self.stream {
            Some(ref mut stream) => {
                stream.write_all(payload)?;
                stream.flush()
            }
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "network stream not connected",
            )),
        }
    }
}

impl Destination for NetworkDestination {
    fn deliver(&mut self, batch: &[LogEntry]) -> Result<()> {
        let payload = Self::encode(batch)?;

        if self.stream.is_none() && self.reconnect_on_error {
            self.reconnect()
                .map_err(|e| LoggerError::write_error(&self.name, e.to_string()))?;
        }

        match self.send(&payload) {
            Ok(()) => Ok(()),
            Err(e) => {
                // Connection lost
                self.stream = None;
                if !self.reconnect_on_error {
                    return Err(LoggerError::write_error(&self.name, e.to_string()));
                }
                match self.reconnect() {
                    Ok(()) => self
                        .send(&payload)
                        .map_err(|e| LoggerError::write_error(&self.name, e.to_string())),
                    Err(reconnect_err) => Err(LoggerError::write_error(
                        &self.name,
                        format!(
                            "failed to send batch and reconnect: {} (reconnect: {})",
                            e, reconnect_err
                        ),
                    )),
                }
            }
        }
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut stream) = self.stream {
            stream.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.flush()?;
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
