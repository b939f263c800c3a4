//! Outbound transports for record batches.
//!
//! The engine treats publishing as fire-and-forget: a transport reports a
//! result, the scheduler logs it, and nothing is retried.

use crate::config::TransportConfig;
use crate::core::queue::Batch;
use crate::core::window::Record;
use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use std::process::Command;

/// Delivers a batch off the device.
pub trait Transport: Send {
    fn publish(&mut self, batch: &Batch) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn publish(&mut self, batch: &Batch) -> Result<(), TransportError> {
        (**self).publish(batch)
    }
}

/// Transport error types.
#[derive(Debug)]
pub enum TransportError {
    /// Payload file could not be written
    Io(std::io::Error),
    /// JSON serialization error
    Serialization(String),
    /// Publisher program could not be started
    Spawn { program: String, source: std::io::Error },
    /// Publisher program exited unsuccessfully
    Command { program: String, code: Option<i32> },
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Io(e) => write!(f, "Payload write failed: {e}"),
            TransportError::Serialization(msg) => write!(f, "Payload serialization error: {msg}"),
            TransportError::Spawn { program, source } => {
                write!(f, "Could not run {program}: {source}")
            }
            TransportError::Command { program, code } => match code {
                Some(code) => write!(f, "{program} exited with status {code}"),
                None => write!(f, "{program} was terminated by a signal"),
            },
        }
    }
}

impl std::error::Error for TransportError {}

/// Payload handed to the publisher.
#[derive(Debug, Clone, Serialize)]
pub struct PublishPayload<'a> {
    /// Unique id for this batch
    pub batch_id: String,
    /// Device identifier
    pub device_id: &'a str,
    /// Publish time (RFC3339)
    pub published_at: String,
    /// Number of records in the batch
    pub size: usize,
    pub records: &'a [Record],
}

impl<'a> PublishPayload<'a> {
    pub fn new(device_id: &'a str, batch: &'a Batch) -> Self {
        Self {
            batch_id: uuid::Uuid::new_v4().to_string(),
            device_id,
            published_at: Utc::now().to_rfc3339(),
            size: batch.len(),
            records: batch.records(),
        }
    }
}

/// Device identifier derived from the hostname.
pub fn device_id() -> String {
    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    format!("press-{hostname}")
}

/// Transport that only logs the batch.
#[derive(Debug, Default)]
pub struct LogTransport;

impl Transport for LogTransport {
    fn publish(&mut self, batch: &Batch) -> Result<(), TransportError> {
        tracing::info!("Published records: {}", batch.len());
        for (i, record) in batch.records().iter().enumerate() {
            tracing::info!(
                "Record#{} - TotalCount:{}, LastCycleTime:{}, AvgCycleTime:{}",
                i + 1,
                record.count,
                record.last_duration,
                record.windowed_average
            );
        }
        Ok(())
    }
}

/// Transport that writes the batch to a file and runs a publisher program.
///
/// This fits command-line MQTT clients that publish a file's contents
/// (for example `mosquitto_pub -f <payload_path>`), keeping broker
/// credentials and TLS setup outside the agent.
#[derive(Debug, Clone)]
pub struct CommandTransport {
    program: String,
    args: Vec<String>,
    payload_path: PathBuf,
    device_id: String,
}

impl CommandTransport {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        payload_path: impl Into<PathBuf>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            payload_path: payload_path.into(),
            device_id: device_id.into(),
        }
    }

    fn write_payload(&self, batch: &Batch) -> Result<(), TransportError> {
        let payload = PublishPayload::new(&self.device_id, batch);
        let json = serde_json::to_vec(&payload)
            .map_err(|e| TransportError::Serialization(e.to_string()))?;

        if let Some(parent) = self.payload_path.parent() {
            std::fs::create_dir_all(parent).map_err(TransportError::Io)?;
        }
        std::fs::write(&self.payload_path, json).map_err(TransportError::Io)
    }
}

impl Transport for CommandTransport {
    fn publish(&mut self, batch: &Batch) -> Result<(), TransportError> {
        self.write_payload(batch)?;

        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .map_err(|source| TransportError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(TransportError::Command {
                program: self.program.clone(),
                code: status.code(),
            });
        }

        tracing::info!("Published {} records via {}", batch.len(), self.program);
        Ok(())
    }
}

/// Build the transport described by the deployment config.
pub fn build_transport(config: &TransportConfig) -> Box<dyn Transport> {
    match config {
        TransportConfig::Log => Box::new(LogTransport),
        TransportConfig::Command {
            program,
            args,
            payload_path,
        } => Box::new(CommandTransport::new(
            program.clone(),
            args.clone(),
            payload_path.clone(),
            device_id(),
        )),
    }
}
