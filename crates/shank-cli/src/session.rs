//! The session driver: runs one exchange pattern over a connection.
//!
//! A [`Session`] owns the connection for the whole exchange and renders
//! every received message, in arrival order, to its [`RecordSink`]. Every
//! streaming loop ends on an in-message sentinel (an exit status or an
//! end-of-file marker); the connection closing first is a failure.

use std::io::{self, Read};

use shank_protocol::{Frame, FrameError, Message, ProcessPayload, RequestKind, StreamChunk};
use thiserror::Error;
use tracing::{debug, trace};

use crate::output::{OutputError, RecordSink};
use crate::schema::ExchangePattern;
use crate::transport::{Connection, TransportError};

const SESSION_TARGET: &str = "shank::session";

/// Size of each local read forwarded by `streamIn`.
pub(crate) const STREAM_IN_BLOCK_SIZE: usize = 64 * 1024;

/// Failures that end an exchange.
#[derive(Debug, Error)]
pub(crate) enum ExchangeError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("server error: {message}")]
    Server { message: String },
    #[error(transparent)]
    Frame(FrameError),
    #[error("stream interrupted: {0}")]
    ReadInput(#[source] io::Error),
    #[error(transparent)]
    Output(#[from] OutputError),
}

impl From<FrameError> for ExchangeError {
    fn from(error: FrameError) -> Self {
        match error {
            FrameError::Server { message } => Self::Server { message },
            other => Self::Frame(other),
        }
    }
}

/// Drives one command's exchange to completion.
pub(crate) struct Session<'a> {
    connection: &'a mut dyn Connection,
    sink: RecordSink<'a>,
}

impl<'a> Session<'a> {
    pub(crate) fn new(connection: &'a mut dyn Connection, sink: RecordSink<'a>) -> Self {
        Self { connection, sink }
    }

    /// Runs `pattern` for `request`, reading local data from `input` when
    /// the pattern uploads.
    pub(crate) fn execute<K: RequestKind>(
        &mut self,
        pattern: ExchangePattern,
        request: &K,
        input: &mut dyn Read,
    ) -> Result<(), ExchangeError> {
        debug!(target: SESSION_TARGET, kind = K::KIND_NAME, %pattern, "starting exchange");
        self.send(request)?;
        match pattern {
            ExchangePattern::Simple => {
                let response: K::Response = self.receive()?;
                self.sink.record(&response)?;
            }
            ExchangePattern::RunLike => {
                let response: K::Response = self.receive()?;
                self.sink.record(&response)?;
                self.follow_process()?;
            }
            ExchangePattern::AttachLike => self.follow_process()?,
            ExchangePattern::StreamOut => {
                let response: K::Response = self.receive()?;
                debug!(target: SESSION_TARGET, ?response, "download opened");
                self.copy_chunks_out()?;
            }
            ExchangePattern::StreamIn => {
                let response: K::Response = self.receive()?;
                debug!(target: SESSION_TARGET, ?response, "upload opened");
                self.forward_input(input)?;
                let completed: K::Response = self.receive()?;
                self.sink.record(&completed)?;
            }
        }
        debug!(target: SESSION_TARGET, kind = K::KIND_NAME, "exchange complete");
        Ok(())
    }

    fn follow_process(&mut self) -> Result<(), ExchangeError> {
        loop {
            let payload: ProcessPayload = self.receive()?;
            self.sink.record(&payload)?;
            if payload.is_terminal() {
                return Ok(());
            }
        }
    }

    fn copy_chunks_out(&mut self) -> Result<(), ExchangeError> {
        loop {
            let chunk: StreamChunk = self.receive()?;
            if let Some(content) = chunk.content.as_deref() {
                self.sink.write_raw(content)?;
            }
            if chunk.is_eof() {
                self.sink.flush()?;
                return Ok(());
            }
        }
    }

    fn forward_input(&mut self, input: &mut dyn Read) -> Result<(), ExchangeError> {
        let mut buffer = vec![0_u8; STREAM_IN_BLOCK_SIZE];
        loop {
            let read = match input.read(&mut buffer) {
                Ok(read) => read,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(ExchangeError::ReadInput(error)),
            };
            if read == 0 {
                break;
            }
            let content = buffer.get(..read).unwrap_or_default().to_vec();
            trace!(target: SESSION_TARGET, bytes = read, "forwarding chunk");
            self.send(&StreamChunk::with_content(content))?;
        }
        self.send(&StreamChunk::end_of_file())
    }

    fn send<M: Message>(&mut self, message: &M) -> Result<(), ExchangeError> {
        let frame = Frame::from_message(message)?;
        self.connection.send_frame(&frame)?;
        Ok(())
    }

    fn receive<M: Message>(&mut self) -> Result<M, ExchangeError> {
        let frame = self.connection.receive_frame()?;
        Ok(frame.into_message()?)
    }
}
