//! Socket transport for the `shank` client.
//!
//! A [`ConnectionProvider`] turns resolved connection settings into a live
//! [`Connection`]. The default [`SocketProvider`] dials Unix domain sockets
//! or TCP and exchanges frames as JSON lines, so the session driver never
//! sees the underlying stream type.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

#[cfg(unix)]
use socket2::{Domain, SockAddr, Socket, Type};

use camino::Utf8Path;
use shank_config::{ConnectionConfig, EndpointError};
use shank_protocol::Frame;
use thiserror::Error;
use tracing::{debug, trace, warn};

const TRANSPORT_TARGET: &str = "shank::transport";

pub(crate) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);
pub(crate) const EMPTY_LINE_LIMIT: usize = 10;

/// Transport-level failures.
#[derive(Debug, Error)]
pub(crate) enum TransportError {
    #[error("invalid server address: {0}")]
    Endpoint(#[from] EndpointError),
    #[error("warden at {server} is unreachable: {source}")]
    Connect { server: String, source: io::Error },
    #[cfg(not(unix))]
    #[error("warden at {0} needs a Unix socket, which this platform lacks")]
    UnsupportedUnixTransport(String),
    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to send frame: {0}")]
    Send(#[source] io::Error),
    #[error("failed to read frame: {0}")]
    Receive(#[source] io::Error),
    #[error("failed to parse frame: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("connection closed by server")]
    Closed,
    #[error("received {0} consecutive empty lines from server")]
    TooManyEmptyLines(usize),
}

/// A duplex frame channel to the server.
pub(crate) trait Connection {
    /// Sends one frame.
    fn send_frame(&mut self, frame: &Frame) -> Result<(), TransportError>;

    /// Blocks until one frame arrives.
    fn receive_frame(&mut self) -> Result<Frame, TransportError>;
}

/// Source of connections for resolved settings.
pub(crate) trait ConnectionProvider {
    fn provide(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>, TransportError>;
}

/// Dials the server over Unix domain sockets or TCP.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct SocketProvider;

impl ConnectionProvider for SocketProvider {
    fn provide(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>, TransportError> {
        let endpoint = config.endpoint()?;
        let stream = match endpoint.unix_path() {
            Some(path) => dial_unix(config, path)?,
            None => dial_tcp(config.addr()).map_err(|source| unreachable_server(config, source))?,
        };
        debug!(target: TRANSPORT_TARGET, server = %config, "connected");
        Ok(Box::new(JsonlConnection::new(stream)))
    }
}

fn unreachable_server(config: &ConnectionConfig, source: io::Error) -> TransportError {
    TransportError::Connect {
        server: config.to_string(),
        source,
    }
}

/// Byte stream to the server for either network family.
pub(crate) enum ServerStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Read for ServerStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for ServerStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Self::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Self::Unix(stream) => stream.flush(),
        }
    }
}

/// Tries every address `addr` resolves to, keeping the last failure.
fn dial_tcp(addr: &str) -> io::Result<ServerStream> {
    let mut last_failure =
        io::Error::new(io::ErrorKind::AddrNotAvailable, "address resolved to nothing");
    for candidate in addr.to_socket_addrs()? {
        match TcpStream::connect_timeout(&candidate, CONNECTION_TIMEOUT) {
            Ok(stream) => return Ok(ServerStream::Tcp(stream)),
            Err(failure) => {
                trace!(target: TRANSPORT_TARGET, %candidate, %failure, "tcp dial failed");
                last_failure = failure;
            }
        }
    }
    Err(last_failure)
}

#[cfg(unix)]
fn dial_unix(config: &ConnectionConfig, path: &Utf8Path) -> Result<ServerStream, TransportError> {
    let dial = || -> io::Result<ServerStream> {
        let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
        socket.connect_timeout(&SockAddr::unix(path)?, CONNECTION_TIMEOUT)?;
        Ok(ServerStream::Unix(socket.into()))
    };
    dial().map_err(|source| unreachable_server(config, source))
}

#[cfg(not(unix))]
fn dial_unix(config: &ConnectionConfig, _path: &Utf8Path) -> Result<ServerStream, TransportError> {
    Err(TransportError::UnsupportedUnixTransport(config.to_string()))
}

/// Frames exchanged as newline-terminated JSON over a byte stream.
pub(crate) struct JsonlConnection<S> {
    stream: BufReader<S>,
    line: String,
}

impl<S: Read + Write> JsonlConnection<S> {
    pub(crate) fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
            line: String::new(),
        }
    }
}

impl<S: Read + Write> Connection for JsonlConnection<S> {
    fn send_frame(&mut self, frame: &Frame) -> Result<(), TransportError> {
        let mut line = serde_json::to_vec(frame).map_err(TransportError::Encode)?;
        line.push(b'\n');
        trace!(target: TRANSPORT_TARGET, kind = %frame.kind, bytes = line.len(), "sending frame");
        let writer = self.stream.get_mut();
        writer.write_all(&line).map_err(TransportError::Send)?;
        writer.flush().map_err(TransportError::Send)
    }

    fn receive_frame(&mut self) -> Result<Frame, TransportError> {
        let mut consecutive_empty_lines = 0;
        loop {
            self.line.clear();
            let read = self
                .stream
                .read_line(&mut self.line)
                .map_err(TransportError::Receive)?;
            if read == 0 {
                return Err(TransportError::Closed);
            }
            if self.line.trim().is_empty() {
                consecutive_empty_lines += 1;
                if consecutive_empty_lines >= EMPTY_LINE_LIMIT {
                    warn!(
                        target: TRANSPORT_TARGET,
                        limit = EMPTY_LINE_LIMIT,
                        "server sent too many empty lines; aborting"
                    );
                    return Err(TransportError::TooManyEmptyLines(EMPTY_LINE_LIMIT));
                }
                continue;
            }
            let frame: Frame = serde_json::from_str(&self.line).map_err(TransportError::Decode)?;
            trace!(target: TRANSPORT_TARGET, kind = %frame.kind, "received frame");
            return Ok(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shank_config::{ConnectionSettings, NetworkFamily};
    use shank_protocol::{EchoRequest, MessageType};
    use std::io::Cursor;

    /// In-memory stream: reads from a canned buffer, records writes.
    struct Duplex {
        input: Cursor<Vec<u8>>,
        written: Vec<u8>,
    }

    impl Duplex {
        fn new(input: &str) -> Self {
            Self {
                input: Cursor::new(input.as_bytes().to_vec()),
                written: Vec::new(),
            }
        }
    }

    impl Read for Duplex {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Duplex {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn frames_are_written_as_json_lines() {
        let mut connection = JsonlConnection::new(Duplex::new(""));
        let request = EchoRequest {
            message: String::from("hi"),
        };
        let frame = Frame::from_message(&request).expect("frame");
        connection.send_frame(&frame).expect("send");
        assert_eq!(
            String::from_utf8(connection.stream.get_ref().written.clone()).expect("utf8"),
            "{\"type\":\"Echo\",\"payload\":{\"message\":\"hi\"}}\n"
        );
    }

    #[test]
    fn blank_lines_between_frames_are_skipped() {
        let mut connection =
            JsonlConnection::new(Duplex::new("\n\n{\"type\":\"Ping\",\"payload\":{}}\n"));
        let frame = connection.receive_frame().expect("frame");
        assert_eq!(frame.kind, MessageType::Ping);
    }

    #[test]
    fn end_of_stream_is_a_closed_connection() {
        let mut connection = JsonlConnection::new(Duplex::new(""));
        assert!(matches!(
            connection.receive_frame(),
            Err(TransportError::Closed)
        ));
    }

    #[test]
    fn too_many_blank_lines_abort() {
        let mut connection = JsonlConnection::new(Duplex::new(&"\n".repeat(EMPTY_LINE_LIMIT)));
        assert!(matches!(
            connection.receive_frame(),
            Err(TransportError::TooManyEmptyLines(EMPTY_LINE_LIMIT))
        ));
    }

    #[test]
    fn malformed_lines_fail_to_decode() {
        let mut connection = JsonlConnection::new(Duplex::new("not json\n"));
        assert!(matches!(
            connection.receive_frame(),
            Err(TransportError::Decode(_))
        ));
    }

    #[test]
    fn tcp_addresses_must_carry_a_port() {
        let config = ConnectionConfig::resolve(
            None,
            &ConnectionSettings::new(NetworkFamily::Tcp, "localhost"),
        );
        let result = SocketProvider.provide(&config);
        assert!(matches!(result, Err(TransportError::Endpoint(_))));
    }

    #[cfg(unix)]
    #[test]
    fn missing_unix_socket_fails_to_connect() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("absent.sock");
        let config = ConnectionConfig::resolve(
            None,
            &ConnectionSettings::new(NetworkFamily::Unix, path.display().to_string()),
        );
        let result = SocketProvider.provide(&config);
        assert!(matches!(
            result,
            Err(TransportError::Connect { ref server, .. }) if *server == config.to_string()
        ));
    }

    #[test]
    fn refused_tcp_dials_name_the_resolved_server() {
        let config = ConnectionConfig::resolve(
            None,
            &ConnectionSettings::new(NetworkFamily::Tcp, "127.0.0.1:1"),
        );
        let Err(error) = SocketProvider.provide(&config) else {
            panic!("nothing listens on port 1");
        };
        assert!(
            error.to_string().starts_with("warden at tcp://127.0.0.1:1 is unreachable"),
            "{error}"
        );
    }
}
