// Copyright (c) 2026 The sessionwatch authors
// SPDX-License-Identifier: MIT

//! HttpConnector against a loopback TCP server speaking canned SSE.

use sessionwatch::{parse_sse_data, HttpConnector, MonitorError, SessionStatus, StreamConnector};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Accept one connection, read the request head, answer with `status_line`
/// and `body`, then close.
async fn serve_once(listener: TcpListener, status_line: &'static str, body: &'static str) {
    let (mut socket, _) = listener.accept().await.expect("accept");

    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = socket.read(&mut buf).await.expect("read request");
        if n == 0 {
            return;
        }
        request.extend_from_slice(&buf[..n]);
        if request.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }

    let response = format!(
        "{status_line}\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n{body}"
    );
    socket
        .write_all(response.as_bytes())
        .await
        .expect("write response");
    socket.shutdown().await.ok();
}

#[tokio::test]
async fn test_http_connector_reads_sse_frames() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");

    let body = concat!(
        ": keepalive\n\n",
        "data: {\"type\":\"session_update\",\"sessionId\":\"sess_http\",",
        "\"status\":\"waiting_for_permission\",\"lastActivity\":42}\n\n",
        "data: not json\n\n",
    );
    let server = tokio::spawn(serve_once(listener, "HTTP/1.1 200 OK", body));

    let connector = HttpConnector::new().expect("connector");
    let url = format!("http://{addr}/events");
    let mut stream = connector.open(&url).await.expect("open stream");

    // The comment-only frame is skipped by the decoder.
    let first = stream
        .next_frame()
        .await
        .expect("first frame")
        .expect("not eof");
    let event = parse_sse_data(&first).expect("valid event");
    let update = event.as_session_update().expect("session update");
    assert_eq!(update.session_id, "sess_http");
    assert_eq!(update.status, SessionStatus::WaitingForPermission);
    assert_eq!(update.last_activity, 42);

    // The malformed payload still arrives as a frame; classifying it is the
    // parser's job, and it classifies it as garbage.
    let second = stream
        .next_frame()
        .await
        .expect("second frame")
        .expect("not eof");
    assert_eq!(second, "not json");
    assert_eq!(parse_sse_data(&second), None);

    // Server closed after the body: orderly end of stream.
    assert!(stream.next_frame().await.expect("eof result").is_none());

    server.await.expect("server task");
}

#[tokio::test]
async fn test_http_connector_rejects_error_status() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");

    let server = tokio::spawn(serve_once(listener, "HTTP/1.1 503 Service Unavailable", ""));

    let connector = HttpConnector::new().expect("connector");
    let url = format!("http://{addr}/events");
    let Err(err) = connector.open(&url).await else {
        panic!("open must fail");
    };
    assert!(matches!(err, MonitorError::HttpStatus(503)));

    server.await.expect("server task");
}

#[tokio::test]
async fn test_http_connector_unreachable_server() {
    // Bind then drop to get a port with nothing listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let connector = HttpConnector::new().expect("connector");
    let Err(err) = connector.open(&format!("http://{addr}/events")).await else {
        panic!("open must fail");
    };
    assert!(matches!(err, MonitorError::Http(_)));
}
