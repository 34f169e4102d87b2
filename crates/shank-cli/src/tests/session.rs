//! Session driver tests against scripted connections.

use std::io::{self, Cursor, Read};

use rstest::rstest;
use shank_protocol::{
    AttachRequest, EchoRequest, EchoResponse, ErrorResponse, Frame, MessageType, PayloadSource,
    ProcessPayload, RunRequest, RunResponse, StreamChunk, StreamInRequest, StreamInResponse,
    StreamOutRequest, StreamOutResponse,
};

use super::support::{ScriptedConnection, frame};
use crate::output::RecordSink;
use crate::schema::ExchangePattern;
use crate::session::{ExchangeError, STREAM_IN_BLOCK_SIZE, Session};
use crate::transport::TransportError;

fn echo_request() -> EchoRequest {
    EchoRequest {
        message: String::from("hello"),
    }
}

fn run_request() -> RunRequest {
    RunRequest {
        handle: String::from("c1"),
        script: String::from("echo hi"),
        ..RunRequest::default()
    }
}

fn process_frames() -> Vec<Frame> {
    vec![
        frame(&ProcessPayload::output(7, PayloadSource::Stdout, "hi\n")),
        frame(&ProcessPayload::output(7, PayloadSource::Stderr, "warn\n")),
        frame(&ProcessPayload::exited(7, 0)),
    ]
}

fn chunk(bytes: &[u8]) -> Frame {
    frame(&StreamChunk::with_content(bytes.to_vec()))
}

/// Drives the exchange for the command each pattern belongs to.
fn execute(
    pattern: ExchangePattern,
    connection: &mut ScriptedConnection,
    input: &mut dyn Read,
    output: &mut Vec<u8>,
) -> Result<(), ExchangeError> {
    let mut session = Session::new(connection, RecordSink::new(output));
    match pattern {
        ExchangePattern::Simple => session.execute(pattern, &echo_request(), input),
        ExchangePattern::RunLike => session.execute(pattern, &run_request(), input),
        ExchangePattern::AttachLike => session.execute(
            pattern,
            &AttachRequest {
                handle: String::from("c1"),
                process_id: 7,
            },
            input,
        ),
        ExchangePattern::StreamOut => session.execute(
            pattern,
            &StreamOutRequest {
                handle: String::from("c1"),
                src_path: String::from("/etc/hostname"),
            },
            input,
        ),
        ExchangePattern::StreamIn => session.execute(
            pattern,
            &StreamInRequest {
                handle: String::from("c1"),
                dst_path: String::from("/tmp/upload"),
            },
            input,
        ),
    }
}

/// A complete, well-behaved server conversation for `pattern`.
fn replies_for(pattern: ExchangePattern) -> Vec<Frame> {
    match pattern {
        ExchangePattern::Simple => vec![frame(&EchoResponse {
            message: String::from("hello"),
        })],
        ExchangePattern::RunLike => {
            let mut replies = vec![frame(&RunResponse { process_id: 7 })];
            replies.extend(process_frames());
            replies
        }
        ExchangePattern::AttachLike => process_frames(),
        ExchangePattern::StreamOut => vec![
            frame(&StreamOutResponse {}),
            chunk(b"ab"),
            chunk(b"cd"),
            frame(&StreamChunk::end_of_file()),
        ],
        ExchangePattern::StreamIn => vec![frame(&StreamInResponse {}), frame(&StreamInResponse {})],
    }
}

fn lines(output: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(output)
        .lines()
        .map(str::to_owned)
        .collect()
}

fn sent_chunks(connection: &ScriptedConnection) -> Vec<StreamChunk> {
    connection
        .sent()
        .into_iter()
        .filter(|sent| sent.kind == MessageType::StreamChunk)
        .map(|sent| sent.into_message().expect("chunk decodes"))
        .collect()
}

#[test]
fn simple_exchange_records_one_response() {
    let mut connection = ScriptedConnection::new(vec![
        frame(&EchoResponse {
            message: String::from("hello"),
        }),
        frame(&EchoResponse::default()),
    ]);
    let mut output = Vec::new();
    execute(
        ExchangePattern::Simple,
        &mut connection,
        &mut io::empty(),
        &mut output,
    )
    .expect("echo completes");

    assert_eq!(lines(&output), vec![String::from(r#"{"message":"hello"}"#)]);
    assert_eq!(connection.sent().len(), 1);
    assert_eq!(connection.pending(), 1, "nothing is read past the response");
}

#[test]
fn the_request_is_sent_before_any_read() {
    let mut connection = ScriptedConnection::new(replies_for(ExchangePattern::Simple));
    let mut output = Vec::new();
    execute(
        ExchangePattern::Simple,
        &mut connection,
        &mut io::empty(),
        &mut output,
    )
    .expect("echo completes");

    let sent = connection.sent();
    let request: EchoRequest = sent
        .first()
        .cloned()
        .expect("request sent")
        .into_message()
        .expect("request decodes");
    assert_eq!(request, echo_request());
}

#[test]
fn run_records_the_response_then_every_payload() {
    let mut replies = replies_for(ExchangePattern::RunLike);
    replies.push(frame(&ProcessPayload::output(7, PayloadSource::Stdout, "late")));
    let mut connection = ScriptedConnection::new(replies);
    let mut output = Vec::new();
    execute(
        ExchangePattern::RunLike,
        &mut connection,
        &mut io::empty(),
        &mut output,
    )
    .expect("run completes");

    let records = lines(&output);
    assert_eq!(records.len(), 4);
    assert_eq!(records.first().map(String::as_str), Some(r#"{"process_id":7}"#));
    let last: ProcessPayload =
        serde_json::from_str(records.last().expect("final record")).expect("payload record");
    assert_eq!(last.exit_status, Some(0));
    assert_eq!(connection.pending(), 1, "the exit status ends the exchange");
}

#[test]
fn attach_records_payloads_without_a_response() {
    let mut connection = ScriptedConnection::new(replies_for(ExchangePattern::AttachLike));
    let mut output = Vec::new();
    execute(
        ExchangePattern::AttachLike,
        &mut connection,
        &mut io::empty(),
        &mut output,
    )
    .expect("attach completes");

    assert_eq!(lines(&output).len(), 3);
    assert_eq!(connection.operations(), 4);
}

#[test]
fn stream_out_writes_raw_content_only() {
    let mut connection = ScriptedConnection::new(replies_for(ExchangePattern::StreamOut));
    let mut output = Vec::new();
    execute(
        ExchangePattern::StreamOut,
        &mut connection,
        &mut io::empty(),
        &mut output,
    )
    .expect("stream out completes");

    assert_eq!(output, b"abcd");
}

#[test]
fn stream_out_keeps_content_carried_by_the_final_chunk() {
    let mut connection = ScriptedConnection::new(vec![
        frame(&StreamOutResponse {}),
        frame(&StreamChunk {
            content: Some(b"tail".to_vec()),
            eof: Some(true),
        }),
    ]);
    let mut output = Vec::new();
    execute(
        ExchangePattern::StreamOut,
        &mut connection,
        &mut io::empty(),
        &mut output,
    )
    .expect("stream out completes");

    assert_eq!(output, b"tail");
}

#[test]
fn stream_out_reads_past_a_false_end_marker() {
    let mut connection = ScriptedConnection::new(vec![
        frame(&StreamOutResponse {}),
        frame(&StreamChunk {
            content: Some(b"ab".to_vec()),
            eof: Some(false),
        }),
        chunk(b"cd"),
        frame(&StreamChunk::end_of_file()),
    ]);
    let mut output = Vec::new();
    execute(
        ExchangePattern::StreamOut,
        &mut connection,
        &mut io::empty(),
        &mut output,
    )
    .expect("stream out completes");

    assert_eq!(output, b"abcd");
    assert_eq!(connection.pending(), 0);
}

#[test]
fn stream_in_forwards_input_in_fixed_blocks() {
    let payload: Vec<u8> = b"0123456789abcdef"
        .iter()
        .copied()
        .cycle()
        .take(130 * 1024)
        .collect();
    let mut input = Cursor::new(payload.clone());
    let mut connection = ScriptedConnection::new(replies_for(ExchangePattern::StreamIn));
    let mut output = Vec::new();
    execute(
        ExchangePattern::StreamIn,
        &mut connection,
        &mut input,
        &mut output,
    )
    .expect("stream in completes");

    let chunks = sent_chunks(&connection);
    let sizes: Vec<usize> = chunks
        .iter()
        .map(|sent| sent.content.as_ref().map_or(0, Vec::len))
        .collect();
    assert_eq!(
        sizes,
        vec![STREAM_IN_BLOCK_SIZE, STREAM_IN_BLOCK_SIZE, 2 * 1024, 0]
    );
    assert!(chunks.last().is_some_and(StreamChunk::is_eof));
    let forwarded: Vec<u8> = chunks
        .iter()
        .filter_map(|sent| sent.content.clone())
        .flatten()
        .collect();
    assert_eq!(forwarded, payload);
    assert_eq!(lines(&output), vec![String::from("{}")]);
}

#[test]
fn stream_in_with_empty_input_sends_only_the_end_marker() {
    let mut connection = ScriptedConnection::new(replies_for(ExchangePattern::StreamIn));
    let mut output = Vec::new();
    execute(
        ExchangePattern::StreamIn,
        &mut connection,
        &mut io::empty(),
        &mut output,
    )
    .expect("stream in completes");

    assert_eq!(sent_chunks(&connection), vec![StreamChunk::end_of_file()]);
}

/// Reader that is interrupted once before yielding its data.
struct InterruptedOnce {
    interrupted: bool,
    inner: Cursor<Vec<u8>>,
}

impl Read for InterruptedOnce {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.interrupted {
            self.interrupted = true;
            return Err(io::Error::from(io::ErrorKind::Interrupted));
        }
        self.inner.read(buf)
    }
}

#[test]
fn interrupted_reads_are_retried() {
    let mut input = InterruptedOnce {
        interrupted: false,
        inner: Cursor::new(b"data".to_vec()),
    };
    let mut connection = ScriptedConnection::new(replies_for(ExchangePattern::StreamIn));
    let mut output = Vec::new();
    execute(
        ExchangePattern::StreamIn,
        &mut connection,
        &mut input,
        &mut output,
    )
    .expect("stream in completes");

    assert_eq!(
        sent_chunks(&connection),
        vec![
            StreamChunk::with_content(b"data".to_vec()),
            StreamChunk::end_of_file()
        ]
    );
}

struct BrokenInput;

impl Read for BrokenInput {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::other("disk gone"))
    }
}

#[test]
fn failing_input_aborts_without_an_end_marker() {
    let mut connection = ScriptedConnection::new(replies_for(ExchangePattern::StreamIn));
    let mut output = Vec::new();
    let error = execute(
        ExchangePattern::StreamIn,
        &mut connection,
        &mut BrokenInput,
        &mut output,
    )
    .expect_err("input failure ends the exchange");

    assert!(matches!(error, ExchangeError::ReadInput(_)));
    assert!(sent_chunks(&connection).is_empty());
}

#[test]
fn server_errors_fail_the_exchange() {
    let mut connection = ScriptedConnection::new(vec![frame(&ErrorResponse {
        message: String::from("unknown handle: c9"),
        ..ErrorResponse::default()
    })]);
    let mut output = Vec::new();
    let error = execute(
        ExchangePattern::Simple,
        &mut connection,
        &mut io::empty(),
        &mut output,
    )
    .expect_err("error frame fails");

    assert!(
        matches!(error, ExchangeError::Server { ref message } if message == "unknown handle: c9")
    );
    assert!(output.is_empty());
}

#[test]
fn unexpected_frames_fail_the_exchange() {
    let mut connection = ScriptedConnection::new(vec![frame(&StreamOutResponse {})]);
    let mut output = Vec::new();
    let error = execute(
        ExchangePattern::Simple,
        &mut connection,
        &mut io::empty(),
        &mut output,
    )
    .expect_err("wrong frame type fails");

    assert!(matches!(error, ExchangeError::Frame(_)));
}

#[test]
fn a_close_mid_stream_is_a_failure() {
    let mut connection = ScriptedConnection::new(vec![
        frame(&RunResponse { process_id: 7 }),
        frame(&ProcessPayload::output(7, PayloadSource::Stdout, "partial")),
    ]);
    let mut output = Vec::new();
    let error = execute(
        ExchangePattern::RunLike,
        &mut connection,
        &mut io::empty(),
        &mut output,
    )
    .expect_err("missing exit status fails");

    assert!(matches!(
        error,
        ExchangeError::Transport(TransportError::Closed)
    ));
    assert_eq!(lines(&output).len(), 2, "records before the close are kept");
}

#[test]
fn stream_out_without_an_end_marker_is_a_failure() {
    let mut connection =
        ScriptedConnection::new(vec![frame(&StreamOutResponse {}), chunk(b"partial")]);
    let mut output = Vec::new();
    let error = execute(
        ExchangePattern::StreamOut,
        &mut connection,
        &mut io::empty(),
        &mut output,
    )
    .expect_err("missing end marker fails");

    assert!(matches!(
        error,
        ExchangeError::Transport(TransportError::Closed)
    ));
}

#[rstest]
#[case::simple_send(ExchangePattern::Simple, 1)]
#[case::simple_receive(ExchangePattern::Simple, 2)]
#[case::run_response(ExchangePattern::RunLike, 2)]
#[case::run_payload(ExchangePattern::RunLike, 4)]
#[case::attach_payload(ExchangePattern::AttachLike, 3)]
#[case::stream_out_response(ExchangePattern::StreamOut, 2)]
#[case::stream_out_chunk(ExchangePattern::StreamOut, 4)]
#[case::stream_in_chunk(ExchangePattern::StreamIn, 3)]
#[case::stream_in_end_marker(ExchangePattern::StreamIn, 4)]
#[case::stream_in_final_response(ExchangePattern::StreamIn, 5)]
fn transport_failures_stop_the_exchange(#[case] pattern: ExchangePattern, #[case] step: usize) {
    let mut connection = ScriptedConnection::failing_at(replies_for(pattern), step);
    let mut input = Cursor::new(b"upload".to_vec());
    let mut output = Vec::new();
    let error = execute(pattern, &mut connection, &mut input, &mut output)
        .expect_err("injected failure surfaces");

    assert!(matches!(error, ExchangeError::Transport(_)));
    assert_eq!(
        connection.operations(),
        step,
        "no operation follows the failure"
    );
}
