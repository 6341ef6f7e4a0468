#![cfg(feature = "cli")]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Command, Output};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use bytes::BytesMut;
use rsmux::frame::{
    decode_auth, decode_composite_metadata, decode_frame_length_prefixed, decode_routes,
    encode_frame_length_prefixed, Authentication, Frame, FrameBody, Payload,
    DEFAULT_MAX_FRAME_SIZE,
};

/// A one-connection TCP responder. Every received frame is forwarded to the
/// returned channel; `respond` produces the replies.
fn spawn_server(respond: fn(&Frame) -> Vec<Frame>) -> (String, mpsc::Receiver<Frame>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
    let url = format!("tcp://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let Ok((mut socket, _)) = listener.accept() else {
            return;
        };
        let mut buf = BytesMut::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = match socket.read(&mut chunk) {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            buf.extend_from_slice(&chunk[..n]);
            while let Some(frame) = decode_frame_length_prefixed(&mut buf, DEFAULT_MAX_FRAME_SIZE)
                .expect("client frames should decode")
            {
                if !write_frames(&mut socket, &respond(&frame)) {
                    return;
                }
                let _ = tx.send(frame);
            }
        }
    });

    (url, rx)
}

fn write_frames(socket: &mut TcpStream, frames: &[Frame]) -> bool {
    if frames.is_empty() {
        return true;
    }
    let mut out = BytesMut::new();
    for frame in frames {
        encode_frame_length_prefixed(frame, &mut out).expect("reply should encode");
    }
    socket.write_all(&out).is_ok()
}

fn responder(frame: &Frame) -> Vec<Frame> {
    let id = frame.stream_id;
    match &frame.body {
        FrameBody::RequestResponse(payload) => {
            vec![Frame::next(id, Payload::new(payload.data.clone()), true)]
        }
        FrameBody::RequestStream { .. } => vec![
            Frame::next(id, Payload::new("\"a\""), false),
            Frame::next(id, Payload::new("\"b\""), false),
            Frame::next(id, Payload::new("\"c\""), true),
        ],
        _ => Vec::new(),
    }
}

fn rsmux(args: &[&str]) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_rsmux"));
    command
        .env_remove("RSMUX_TOKEN")
        .env_remove("RSMUX_LOG")
        .args(["--log-level", "error"])
        .args(args);
    command
}

fn run(command: &mut Command) -> Output {
    command.output().expect("rsmux should run")
}

/// Frames the server saw, skipping SETUP and keepalives.
fn requests(rx: &mpsc::Receiver<Frame>) -> Vec<Frame> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.recv_timeout(Duration::from_millis(500)) {
        if !matches!(
            frame.body,
            FrameBody::Setup(_) | FrameBody::KeepAlive { .. }
        ) {
            frames.push(frame);
        }
    }
    frames
}

fn metadata_of(frame: &Frame) -> (String, Option<String>) {
    let metadata = match &frame.body {
        FrameBody::RequestResponse(payload) | FrameBody::RequestFnf(payload) => {
            payload.metadata.clone()
        }
        FrameBody::RequestStream { payload, .. } => payload.metadata.clone(),
        other => panic!("not a request: {other:?}"),
    };
    let entries = decode_composite_metadata(metadata.expect("request has metadata")).unwrap();
    let route = decode_routes(entries[0].content.clone()).unwrap().remove(0);
    let bearer = entries
        .iter()
        .find_map(|entry| match decode_auth(entry.content.clone()) {
            Ok(Authentication::Bearer(token)) => Some(token),
            _ => None,
        });
    (route, bearer)
}

#[test]
fn version_prints_package_version() {
    let output = run(&mut rsmux(&["version"]));
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("rsmux "), "{stdout}");
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn request_prints_echoed_response_as_json() {
    let (url, rx) = spawn_server(responder);

    let output = run(rsmux(&[
        "--format",
        "json",
        "request",
        &url,
        "echo",
        "--json",
        "{\"msg\":\"hi\"}",
        "--timeout",
        "5s",
    ])
    .env("RSMUX_TOKEN", "secret"));

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"route\":\"echo\""), "{stdout}");
    assert!(stdout.contains("\"value\":{\"msg\":\"hi\"}"), "{stdout}");

    let requests = requests(&rx);
    assert!(matches!(requests[0].body, FrameBody::RequestResponse(_)));
    assert_eq!(
        metadata_of(&requests[0]),
        ("echo".to_string(), Some("secret".to_string()))
    );
}

#[test]
fn stream_prints_each_value_raw() {
    let (url, _rx) = spawn_server(responder);

    let output = run(&mut rsmux(&[
        "--format", "raw", "stream", &url, "letters", "--timeout", "5s",
    ]));

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(String::from_utf8_lossy(&output.stdout), "a\nb\nc\n");
}

#[test]
fn fire_sends_route_without_token() {
    let (url, rx) = spawn_server(responder);

    let output = run(&mut rsmux(&["fire", &url, "audit", "--data", "event"]));

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let requests = requests(&rx);
    let FrameBody::RequestFnf(payload) = &requests[0].body else {
        panic!("expected fire-and-forget, got {:?}", requests[0]);
    };
    assert_eq!(&payload.data[..], b"event");
    assert_eq!(metadata_of(&requests[0]), ("audit".to_string(), None));
}

#[test]
fn fire_without_server_gives_up_with_transport_exit_code() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let url = format!("tcp://127.0.0.1:{port}");

    let output = run(&mut rsmux(&[
        "fire",
        &url,
        "audit",
        "--max-reconnect-attempts",
        "0",
        "--connect-timeout",
        "5s",
    ]));

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("gave up"), "{stderr}");
}

#[test]
fn unsupported_scheme_is_a_usage_error() {
    let output = run(&mut rsmux(&["request", "http://localhost:1", "echo"]));
    assert_eq!(output.status.code(), Some(64));
}
