//! Test support for the `shank` runtime.
//!
//! Supplies a scripted in-memory connection, a config store rooted in a
//! temporary directory, a loopback fake warden server, and the world used by
//! the behaviour suite.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::fs;
use std::io::{self, BufRead, BufReader, Cursor, Write};
use std::net::{TcpListener, TcpStream};
use std::process::ExitCode;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, ensure};
use camino::Utf8PathBuf;
use rstest::fixture;
use shank_config::{ConfigError, ConfigStore, ConnectionConfig};
use shank_protocol::{Frame, Message};
use tempfile::TempDir;

use crate::config::StoreLocator;
use crate::transport::{Connection, ConnectionProvider, SocketProvider, TransportError};
use crate::{IoStreams, run_with};

const SERVER_TIMEOUT: Duration = Duration::from_secs(5);

pub(super) fn frame<M: Message>(message: &M) -> Frame {
    Frame::from_message(message).expect("message encodes")
}

pub(super) fn wire_line<M: Message>(message: &M) -> String {
    serde_json::to_string(&frame(message)).expect("frame encodes")
}

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<Frame>,
    sent: Vec<Frame>,
    operations: usize,
    fail_at: Option<usize>,
}

impl Script {
    /// Counts one transport operation and reports whether it should fail.
    fn step(&mut self) -> bool {
        self.operations += 1;
        self.fail_at == Some(self.operations)
    }
}

/// In-memory connection replaying canned frames and recording sent ones.
///
/// Clones share one script, so a test keeps a handle while the session owns
/// another.
#[derive(Debug, Clone, Default)]
pub(super) struct ScriptedConnection {
    script: Rc<RefCell<Script>>,
}

impl ScriptedConnection {
    pub(super) fn new(replies: Vec<Frame>) -> Self {
        Self {
            script: Rc::new(RefCell::new(Script {
                replies: replies.into(),
                ..Script::default()
            })),
        }
    }

    /// Fails the `step`th transport operation, counting from one.
    pub(super) fn failing_at(replies: Vec<Frame>, step: usize) -> Self {
        let connection = Self::new(replies);
        connection.script.borrow_mut().fail_at = Some(step);
        connection
    }

    pub(super) fn sent(&self) -> Vec<Frame> {
        self.script.borrow().sent.clone()
    }

    pub(super) fn operations(&self) -> usize {
        self.script.borrow().operations
    }

    pub(super) fn pending(&self) -> usize {
        self.script.borrow().replies.len()
    }
}

impl Connection for ScriptedConnection {
    fn send_frame(&mut self, frame: &Frame) -> Result<(), TransportError> {
        let mut script = self.script.borrow_mut();
        if script.step() {
            return Err(TransportError::Send(io::Error::from(
                io::ErrorKind::BrokenPipe,
            )));
        }
        script.sent.push(frame.clone());
        Ok(())
    }

    fn receive_frame(&mut self) -> Result<Frame, TransportError> {
        let mut script = self.script.borrow_mut();
        if script.step() {
            return Err(TransportError::Receive(io::Error::from(
                io::ErrorKind::ConnectionReset,
            )));
        }
        script.replies.pop_front().ok_or(TransportError::Closed)
    }
}

/// Hands out a scripted connection and records the settings it was asked
/// to dial.
#[derive(Debug, Default)]
pub(super) struct ScriptedProvider {
    connection: ScriptedConnection,
    refuse: bool,
    dialled: RefCell<Vec<String>>,
}

impl ScriptedProvider {
    pub(super) fn new(connection: ScriptedConnection) -> Self {
        Self {
            connection,
            ..Self::default()
        }
    }

    pub(super) fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub(super) fn dialled(&self) -> Vec<String> {
        self.dialled.borrow().clone()
    }
}

impl ConnectionProvider for ScriptedProvider {
    fn provide(&self, config: &ConnectionConfig) -> Result<Box<dyn Connection>, TransportError> {
        self.dialled.borrow_mut().push(config.to_string());
        if self.refuse {
            return Err(TransportError::Connect {
                server: config.to_string(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            });
        }
        Ok(Box::new(self.connection.clone()))
    }
}

/// Config store inside a temporary directory.
pub(super) struct FixedStore {
    _dir: TempDir,
    store: ConfigStore,
}

impl FixedStore {
    pub(super) fn new() -> Result<Self> {
        let dir = TempDir::new().context("create temporary directory")?;
        let path = Utf8PathBuf::from_path_buf(dir.path().join(".shankrc"))
            .map_err(|path| anyhow!("temporary path is not UTF-8: {}", path.display()))?;
        Ok(Self {
            _dir: dir,
            store: ConfigStore::new(path),
        })
    }

    pub(super) const fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub(super) fn write_raw(&self, contents: &str) -> Result<()> {
        fs::write(self.store.path(), contents).context("write config store")
    }
}

impl StoreLocator for FixedStore {
    fn locate(&self) -> Result<ConfigStore, ConfigError> {
        Ok(self.store.clone())
    }
}

/// Captured result of one CLI invocation.
#[derive(Debug)]
pub(super) struct Outcome {
    pub(super) exit: ExitCode,
    pub(super) stdout: Vec<u8>,
    pub(super) stderr: Vec<u8>,
}

impl Outcome {
    pub(super) fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub(super) fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Runs `shank` with `args`, feeding `stdin` and capturing both outputs.
pub(super) fn invoke<P: ConnectionProvider>(
    args: &[&str],
    stdin: &[u8],
    store: &FixedStore,
    provider: &P,
) -> Outcome {
    let argv: Vec<OsString> = std::iter::once("shank")
        .chain(args.iter().copied())
        .map(OsString::from)
        .collect();
    let mut input = Cursor::new(stdin.to_vec());
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit = run_with(
        argv,
        IoStreams::new(&mut input, &mut stdout, &mut stderr),
        store,
        provider,
    );
    Outcome {
        exit,
        stdout,
        stderr,
    }
}

/// One step of a fake server conversation.
#[derive(Debug, Clone)]
pub(super) enum ServerStep {
    /// Reads this many lines from the client.
    Read(usize),
    /// Writes one line to the client.
    Write(String),
}

/// Loopback warden stand-in that serves one client from a script.
pub(super) struct FakeServer {
    port: u16,
    handle: Option<thread::JoinHandle<Result<Vec<String>>>>,
}

impl FakeServer {
    /// Listens on an ephemeral TCP port and serves the first client.
    pub(super) fn spawn(steps: Vec<ServerStep>) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake server")?;
        listener
            .set_nonblocking(true)
            .context("fake server nonblocking")?;
        let port = listener.local_addr().context("local addr")?.port();
        let handle = thread::spawn(move || Self::serve(&listener, steps));
        Ok(Self {
            port,
            handle: Some(handle),
        })
    }

    pub(super) fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// Waits for the conversation to finish and returns the lines the client
    /// sent.
    pub(super) fn take_requests(&mut self) -> Result<Vec<String>> {
        let handle = self.handle.take().context("fake server already joined")?;
        handle
            .join()
            .map_err(|_| anyhow!("fake server thread panicked"))?
    }

    fn serve(listener: &TcpListener, steps: Vec<ServerStep>) -> Result<Vec<String>> {
        let stream = Self::accept(listener)?;
        stream
            .set_nonblocking(false)
            .context("client stream blocking")?;
        stream
            .set_read_timeout(Some(SERVER_TIMEOUT))
            .context("client read timeout")?;
        let mut reader = BufReader::new(stream.try_clone().context("clone client stream")?);
        let mut writer = stream;
        let mut received = Vec::new();
        for step in steps {
            match step {
                ServerStep::Read(count) => {
                    for _ in 0..count {
                        let mut line = String::new();
                        let read = reader.read_line(&mut line).context("read client line")?;
                        ensure!(read > 0, "client closed after {} lines", received.len());
                        received.push(line.trim_end().to_owned());
                    }
                }
                ServerStep::Write(line) => {
                    writer
                        .write_all(format!("{line}\n").as_bytes())
                        .context("write server line")?;
                    writer.flush().context("flush server line")?;
                }
            }
        }
        Ok(received)
    }

    fn accept(listener: &TcpListener) -> Result<TcpStream> {
        let deadline = Instant::now() + SERVER_TIMEOUT;
        loop {
            match listener.accept() {
                Ok((stream, _)) => return Ok(stream),
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                    ensure!(Instant::now() < deadline, "no client connected");
                    thread::sleep(Duration::from_millis(10));
                }
                Err(error) => return Err(error).context("accept client"),
            }
        }
    }
}

/// State shared by the behaviour steps of one scenario.
#[derive(Default)]
pub(super) struct TestWorld {
    store: Option<FixedStore>,
    server: Option<FakeServer>,
    address: Option<String>,
    pub(super) stdin: Vec<u8>,
    outcome: Option<Outcome>,
    pub(super) requests: Vec<String>,
}

impl TestWorld {
    pub(super) fn store(&mut self) -> Result<&FixedStore> {
        if self.store.is_none() {
            self.store = Some(FixedStore::new()?);
        }
        self.store.as_ref().context("config store missing")
    }

    pub(super) fn start_server(&mut self, steps: Vec<ServerStep>) -> Result<()> {
        let server = FakeServer::spawn(steps)?;
        self.address = Some(server.address());
        self.server = Some(server);
        Ok(())
    }

    /// Points the client at a TCP port nothing listens on.
    pub(super) fn target_unreachable_server(&mut self) {
        self.address = Some(String::from("127.0.0.1:1"));
    }

    /// Runs a whitespace-separated command line. The fake server address, if
    /// any, is passed as global flags ahead of the command.
    pub(super) fn run(&mut self, command: &str) -> Result<()> {
        let mut args: Vec<String> = Vec::new();
        if let Some(address) = self.address.as_ref() {
            args.extend([
                String::from("--network"),
                String::from("tcp"),
                String::from("--addr"),
                address.clone(),
            ]);
        }
        args.extend(
            command
                .split_whitespace()
                .map(|token| token.trim_matches('"').to_owned()),
        );
        let argv: Vec<&str> = args.iter().map(String::as_str).collect();
        let stdin = self.stdin.clone();
        let outcome = invoke(&argv, &stdin, self.store()?, &SocketProvider);
        self.outcome = Some(outcome);
        if let Some(server) = self.server.as_mut() {
            self.requests = server.take_requests()?;
        }
        self.server = None;
        Ok(())
    }

    pub(super) fn outcome(&self) -> Result<&Outcome> {
        self.outcome.as_ref().context("no command has run")
    }

    pub(super) fn assert_exit_code(&self, expected: u8) -> Result<()> {
        let exit = self.outcome()?.exit;
        ensure!(
            exit == ExitCode::from(expected),
            "expected exit code {expected}, got {exit:?}"
        );
        Ok(())
    }
}

#[fixture]
pub(super) fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::default())
}
