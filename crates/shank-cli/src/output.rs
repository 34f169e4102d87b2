//! Rendering of received messages to the output stream.

use std::io::{self, Write};

use serde::Serialize;
use thiserror::Error;

/// Failures writing rendered output.
#[derive(Debug, Error)]
pub(crate) enum OutputError {
    #[error("failed to render message: {0}")]
    Render(#[source] serde_json::Error),
    #[error("failed to write output: {0}")]
    Write(#[source] io::Error),
}

/// Writes each rendered message as one JSON line, or raw bytes for file
/// transfers.
pub(crate) struct RecordSink<'a> {
    writer: &'a mut dyn Write,
}

impl<'a> RecordSink<'a> {
    pub(crate) fn new(writer: &'a mut dyn Write) -> Self {
        Self { writer }
    }

    /// Writes `message` as a single JSON record and flushes it.
    pub(crate) fn record<M: Serialize>(&mut self, message: &M) -> Result<(), OutputError> {
        let mut line = serde_json::to_vec(message).map_err(OutputError::Render)?;
        line.push(b'\n');
        self.writer.write_all(&line).map_err(OutputError::Write)?;
        self.flush()
    }

    /// Writes `bytes` unframed.
    pub(crate) fn write_raw(&mut self, bytes: &[u8]) -> Result<(), OutputError> {
        self.writer.write_all(bytes).map_err(OutputError::Write)
    }

    pub(crate) fn flush(&mut self) -> Result<(), OutputError> {
        self.writer.flush().map_err(OutputError::Write)
    }
}
