//! Integration tests for the REST comment store.
//!
//! Each test runs a one-shot HTTP stub on a local `TcpListener` that records the
//! request line and body of every call and answers with a canned response.

mod common;

use common::VIEWPORT;
use pinmark_core::store::http::HttpStore;
use pinmark_core::store::{execute, CommentStore, StoreError, StoreOutcome, StoreRequest};
use pinmark_core::types::{Anchor, NewComment, PositionUpdate};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// One request as the stub saw it.
#[derive(Debug)]
struct Recorded {
    line: String,
    body: String,
}

impl Recorded {
    fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Position of the blank line ending the header block, if it has arrived.
fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Serves `responses` in order, one connection each, and returns the API base
/// URL plus a receiver of the recorded requests.
async fn serve(responses: Vec<(u16, String)>) -> (String, mpsc::UnboundedReceiver<Recorded>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            let split = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before headers");
                buf.extend_from_slice(&chunk[..n]);
                if let Some(split) = header_end(&buf) {
                    break split;
                }
            };
            let head = String::from_utf8_lossy(&buf[..split]).into_owned();
            let wanted = content_length(&head);
            while buf.len() - split < wanted {
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before body");
                buf.extend_from_slice(&chunk[..n]);
            }

            let line = head.lines().next().unwrap_or_default().to_owned();
            let recorded_body = String::from_utf8_lossy(&buf[split..split + wanted]).into_owned();
            tx.send(Recorded { line, body: recorded_body }).unwrap();

            let response = format!(
                "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        }
    });

    (format!("http://{addr}/api"), rx)
}

fn comment_json(id: &str) -> Value {
    json!({
        "id": id,
        "selector": ".card.featured",
        "xPercentage": 50.0,
        "yPercentage": 25.0,
        "content": "tighten this copy",
        "author": { "id": "u-1", "name": "Dana Reviewer", "avatar": "" },
        "createdAt": "2026-01-01T00:00:00.000Z",
        "resolved": false,
        "thread": []
    })
}

fn update() -> PositionUpdate {
    PositionUpdate {
        locator: "#top".to_owned(),
        x_percentage: 10.0,
        y_percentage: 90.0,
        viewport: VIEWPORT,
    }
}

#[tokio::test]
async fn fetch_reads_the_comment_list() {
    let body = json!({ "comments": [comment_json("c-1")] }).to_string();
    let (base, mut rx) = serve(vec![(200, body)]).await;
    let store = HttpStore::new(&base).unwrap();

    let comments = store.fetch_comments().await.unwrap();
    assert_eq!(rx.recv().await.unwrap().line, "GET /api/comments HTTP/1.1");
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].id, "c-1");
    assert_eq!(comments[0].locator, ".card.featured");
    assert_eq!(comments[0].author.name, "Dana Reviewer");
    assert_eq!(comments[0].viewport, None);
}

#[tokio::test]
async fn create_posts_the_wire_field_names() {
    let (base, mut rx) = serve(vec![(201, comment_json("c-2").to_string())]).await;
    let store = HttpStore::new(&base).unwrap();

    let created = store
        .create_comment(NewComment {
            locator: ".card.featured".to_owned(),
            x_percentage: 50.0,
            y_percentage: 25.0,
            content: "tighten this copy".to_owned(),
            viewport: VIEWPORT,
        })
        .await
        .unwrap();
    assert_eq!(created.id, "c-2");

    let request = rx.recv().await.unwrap();
    assert_eq!(request.line, "POST /api/comments HTTP/1.1");
    assert_eq!(
        request.json(),
        json!({
            "selector": ".card.featured",
            "xPercentage": 50.0,
            "yPercentage": 25.0,
            "content": "tighten this copy",
            "viewport": { "width": 800.0, "height": 600.0 }
        })
    );
}

#[tokio::test]
async fn delete_resolve_and_reposition_hit_the_comment_routes() {
    let ok = || (200, "{}".to_owned());
    let (base, mut rx) = serve(vec![ok(), ok(), ok()]).await;
    let store = HttpStore::new(&format!("{base}/")).unwrap();

    store.delete_comment("c 1").await.unwrap();
    assert_eq!(rx.recv().await.unwrap().line, "DELETE /api/comments/c%201 HTTP/1.1");

    store.resolve_comment("c-1").await.unwrap();
    assert_eq!(rx.recv().await.unwrap().line, "PATCH /api/comments/c-1/resolve HTTP/1.1");

    store.update_position("c-1", update()).await.unwrap();
    let request = rx.recv().await.unwrap();
    assert_eq!(request.line, "PATCH /api/comments/c-1/position HTTP/1.1");
    assert_eq!(
        request.json(),
        json!({
            "selector": "#top",
            "xPercentage": 10.0,
            "yPercentage": 90.0,
            "viewport": { "width": 800.0, "height": 600.0 }
        })
    );
}

#[tokio::test]
async fn non_success_statuses_are_errors() {
    let (base, _rx) = serve(vec![(404, "{}".to_owned()), (500, "{}".to_owned())]).await;
    let store = HttpStore::new(&base).unwrap();

    match store.resolve_comment("missing").await {
        Err(StoreError::Status { action, status }) => {
            assert_eq!((action, status), ("resolve", 404));
        }
        other => panic!("expected a status error, got {other:?}"),
    }
    match store.fetch_comments().await {
        Err(StoreError::Status { action, status }) => assert_eq!((action, status), ("fetch", 500)),
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn execute_folds_server_errors_into_failed_outcomes() {
    let (base, _rx) = serve(vec![(500, "{}".to_owned()), (404, "{}".to_owned())]).await;
    let store = HttpStore::new(&base).unwrap();

    assert_eq!(
        execute(&store, StoreRequest::Delete { id: "c-1".to_owned() }).await,
        StoreOutcome::Deleted { id: "c-1".to_owned(), ok: false }
    );

    let previous = Anchor {
        locator: ".hero".to_owned(),
        x_percentage: 50.0,
        y_percentage: 50.0,
        viewport: None,
    };
    let outcome = execute(
        &store,
        StoreRequest::UpdatePosition { id: "c-1".to_owned(), update: update(), previous: previous.clone() },
    )
    .await;
    assert_eq!(
        outcome,
        StoreOutcome::PositionUpdated { id: "c-1".to_owned(), update: update(), previous, ok: false }
    );
}

#[tokio::test]
async fn refused_connections_become_failed_outcomes() {
    // Bind then drop, so the port is known to be closed.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let store = HttpStore::new(&format!("http://{addr}/api")).unwrap();

    assert!(matches!(store.fetch_comments().await, Err(StoreError::Http(_))));
    assert_eq!(
        execute(&store, StoreRequest::Fetch).await,
        StoreOutcome::Fetched { comments: Vec::new(), ok: false }
    );
    assert_eq!(execute(&store, StoreRequest::Resolve { id: "c-1".to_owned() }).await, StoreOutcome::Resolved {
        id: "c-1".to_owned(),
        ok: false
    });
}
