//! Client-side stream decoder tests: SSE reassembly and cooperative
//! cancellation against a hand-rolled chunked HTTP fixture.

use feedback_core::relay::StreamEvent;
use feedback_core::sse::{consume, encode_event, stream_url};
use feedback_core::{Error, GenerationRequest};
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Serve one HTTP response with the given SSE blocks as separate chunked
/// transfer chunks. With `hold_open` the connection is left dangling after
/// the blocks, so the only ways out for the client are a terminal event or
/// cancellation.
async fn spawn_sse_fixture(blocks: Vec<String>, hold_open: bool) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request_head = [0u8; 1024];
        let _ = socket.read(&mut request_head).await;
        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\n\
                  content-type: text/event-stream\r\n\
                  transfer-encoding: chunked\r\n\r\n",
            )
            .await
            .unwrap();
        for block in blocks {
            let chunk = format!("{:x}\r\n{}\r\n", block.len(), block);
            socket.write_all(chunk.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
        }
        if hold_open {
            tokio::time::sleep(Duration::from_secs(60)).await;
        } else {
            let _ = socket.write_all(b"0\r\n\r\n").await;
        }
    });
    addr
}

fn fixture_url(addr: SocketAddr) -> url::Url {
    stream_url(
        &format!("http://{addr}"),
        &GenerationRequest::new("late order"),
    )
    .unwrap()
}

#[tokio::test]
async fn test_consume_stops_at_terminal_event_without_eof() {
    let blocks = vec![
        encode_event(&StreamEvent::Chunk { text: "Hi".to_string() }),
        encode_event(&StreamEvent::Chunk { text: " there".to_string() }),
        encode_event(&StreamEvent::Done { meta: json!({"model": "m"}) }),
    ];
    // hold_open: the fixture never closes, so returning proves the decoder
    // honors the terminal event.
    let addr = spawn_sse_fixture(blocks, true).await;

    let client = reqwest::Client::new();
    let mut events = Vec::new();
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        consume(
            &client,
            fixture_url(addr),
            CancellationToken::new(),
            |event| events.push(event),
        ),
    )
    .await
    .expect("decoder must return at the terminal event");
    result.unwrap();

    assert_eq!(
        events,
        vec![
            StreamEvent::Chunk { text: "Hi".to_string() },
            StreamEvent::Chunk { text: " there".to_string() },
            StreamEvent::Done { meta: json!({"model": "m"}) },
        ]
    );
}

#[tokio::test]
async fn test_consume_split_blocks_reassembled() {
    // One block cut across two transfer chunks plus a terminal block.
    let chunk_block = encode_event(&StreamEvent::Chunk {
        text: "fragment with\nnewline and {braces}".to_string(),
    });
    let (front, back) = chunk_block.split_at(chunk_block.len() / 2);
    let blocks = vec![
        front.to_string(),
        format!(
            "{}{}",
            back,
            encode_event(&StreamEvent::Done { meta: json!({}) })
        ),
    ];
    let addr = spawn_sse_fixture(blocks, false).await;

    let client = reqwest::Client::new();
    let mut events = Vec::new();
    consume(
        &client,
        fixture_url(addr),
        CancellationToken::new(),
        |event| events.push(event),
    )
    .await
    .unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0],
        StreamEvent::Chunk {
            text: "fragment with\nnewline and {braces}".to_string()
        }
    );
}

#[tokio::test]
async fn test_consume_cancellation_releases_connection() {
    let blocks = vec![encode_event(&StreamEvent::Chunk { text: "Hi".to_string() })];
    let addr = spawn_sse_fixture(blocks, true).await;

    let cancel = CancellationToken::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let client = reqwest::Client::new();
    let url = fixture_url(addr);
    let task_cancel = cancel.clone();
    let task = tokio::spawn(async move {
        consume(&client, url, task_cancel, move |event| {
            let _ = tx.send(event);
        })
        .await
    });

    // Wait for the first fragment, then cancel; the read loop must stop
    // without ever seeing a terminal event.
    let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first, StreamEvent::Chunk { text: "Hi".to_string() });

    cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("cancellation must stop the read loop")
        .unwrap();
    assert!(result.is_ok());
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_consume_non_success_status_is_an_error() {
    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .respond_with(wiremock::ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let url = stream_url(&server.uri(), &GenerationRequest::new("hi")).unwrap();
    let err = consume(&client, url, CancellationToken::new(), |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Upstream { status: 502, .. }));
}
