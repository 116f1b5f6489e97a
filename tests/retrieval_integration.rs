//! End-to-end tests against a local axum stand-in for the retrieval and
//! history services.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use data_copilot::chat::{
    ChatSession, ERROR_MESSAGE, HttpRetrievalClient, QueryMode, RetrievalRequest, Role,
    SessionOptions, TurnOutcome,
};
use data_copilot::history::{ChatSummary, HistoryClient};
use serde_json::json;

#[derive(Clone, Default)]
struct Backend {
    deleted: Arc<Mutex<Vec<String>>>,
}

async fn retrieval(Json(req): Json<RetrievalRequest>) -> Body {
    let chunks = vec![
        format!("[{}] ", req.rag_type),
        "Hel".to_string(),
        "lo, ".to_string(),
        req.user_query,
    ];
    Body::from_stream(async_stream::stream! {
        for chunk in chunks {
            tokio::time::sleep(Duration::from_millis(5)).await;
            yield Ok::<_, std::io::Error>(chunk);
        }
    })
}

async fn split_euro() -> Body {
    Body::from_stream(async_stream::stream! {
        yield Ok::<_, std::io::Error>(vec![b'=', 0xE2, 0x82]);
        tokio::time::sleep(Duration::from_millis(5)).await;
        yield Ok::<_, std::io::Error>(vec![0xAC]);
    })
}

async fn slow() -> Body {
    Body::from_stream(async_stream::stream! {
        yield Ok::<_, std::io::Error>("Hel".to_string());
        tokio::time::sleep(Duration::from_secs(30)).await;
        yield Ok::<_, std::io::Error>("lo".to_string());
    })
}

async fn history_list() -> Json<serde_json::Value> {
    Json(json!([
        { "id": "1", "title": "Previous Analysis", "date": "2024-03-20" },
        { "id": "2", "title": "SQL Query Help", "date": "2024-03-19" }
    ]))
}

async fn history_delete(State(backend): State<Backend>, Path(id): Path<String>) -> StatusCode {
    backend.deleted.lock().unwrap().push(id);
    StatusCode::NO_CONTENT
}

async fn spawn_backend() -> (String, Backend) {
    let backend = Backend::default();
    let app = Router::new()
        .route("/retrieval", post(retrieval))
        .route("/euro", post(split_euro))
        .route("/slow", post(slow))
        .route("/broken", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route("/empty", post(|| async { StatusCode::NO_CONTENT }))
        .route("/api/chat/history", get(history_list))
        .route("/api/chat/history/{id}", delete(history_delete))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), backend)
}

fn session_for(base: &str, path: &str) -> ChatSession {
    let transport = HttpRetrievalClient::new(format!("{base}{path}")).unwrap();
    ChatSession::new(Arc::new(transport))
}

#[tokio::test]
async fn test_streams_answer_into_placeholder() {
    let (base, _) = spawn_backend().await;
    let session = session_for(&base, "/retrieval");
    session.set_mode(QueryMode::Unstructured);

    let outcome = session.send_message("  churn drivers ").await;

    assert_eq!(outcome, TurnOutcome::Completed);
    let messages = session.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role(), Role::User);
    assert_eq!(messages[0].mode(), QueryMode::Unstructured);
    assert_eq!(messages[1].content(), "[unstructured] Hello, churn drivers");
    assert!(!session.is_loading());
}

#[tokio::test]
async fn test_split_character_across_chunks() {
    let (base, _) = spawn_backend().await;
    let session = session_for(&base, "/euro");

    assert_eq!(session.send_message("price").await, TurnOutcome::Completed);
    assert_eq!(session.messages()[1].content(), "=€");
}

#[tokio::test]
async fn test_http_500_shows_error_message() {
    let (base, _) = spawn_backend().await;
    let session = session_for(&base, "/broken");

    assert_eq!(session.send_message("q").await, TurnOutcome::Failed);
    assert_eq!(session.messages()[1].content(), ERROR_MESSAGE);
    assert!(!session.is_loading());
}

#[tokio::test]
async fn test_no_content_is_missing_body() {
    let (base, _) = spawn_backend().await;
    let session = session_for(&base, "/empty");

    assert_eq!(session.send_message("q").await, TurnOutcome::Failed);
    assert_eq!(session.messages()[1].content(), ERROR_MESSAGE);
}

#[tokio::test]
async fn test_unreachable_backend_fails_turn() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let session = session_for(&format!("http://{addr}"), "/retrieval");
    assert_eq!(session.send_message("q").await, TurnOutcome::Failed);
    assert_eq!(session.messages()[1].content(), ERROR_MESSAGE);
}

#[tokio::test]
async fn test_clear_cancels_slow_stream() {
    let (base, _) = spawn_backend().await;
    let session = session_for(&base, "/slow");
    let mut rx = session.subscribe();

    let task = tokio::spawn({
        let session = session.clone();
        async move { session.send_message("q").await }
    });

    rx.wait_for(|conv| conv.last().is_some_and(|m| m.content() == "Hel"))
        .await
        .unwrap();
    session.clear_messages();

    let outcome = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("cancelled turn should return promptly")
        .unwrap();
    assert_eq!(outcome, TurnOutcome::Cancelled);
    assert!(session.messages().is_empty());
    assert!(!session.is_loading());
}

#[tokio::test]
async fn test_idle_timeout_against_slow_stream() {
    let (base, _) = spawn_backend().await;
    let transport = HttpRetrievalClient::new(format!("{base}/slow")).unwrap();
    let session = ChatSession::with_options(
        Arc::new(transport),
        SessionOptions {
            chunk_timeout: Some(Duration::from_millis(200)),
            ..SessionOptions::default()
        },
    );

    assert_eq!(session.send_message("q").await, TurnOutcome::Failed);
    assert_eq!(session.messages()[1].content(), ERROR_MESSAGE);
}

#[tokio::test]
async fn test_history_list_and_delete() {
    let (base, backend) = spawn_backend().await;
    let history = HistoryClient::new(format!("{base}/api")).unwrap();

    let items = history.list().await;
    assert_eq!(
        items[0],
        ChatSummary {
            id: "1".to_string(),
            title: "Previous Analysis".to_string(),
            date: "2024-03-20".to_string(),
        }
    );
    assert_eq!(items.len(), 2);

    history.delete("2").await.unwrap();
    assert_eq!(*backend.deleted.lock().unwrap(), vec!["2".to_string()]);
}

#[tokio::test]
async fn test_history_list_falls_back_to_empty() {
    let (base, _) = spawn_backend().await;
    let history = HistoryClient::new(format!("{base}/missing")).unwrap();

    assert!(history.list().await.is_empty());
    assert!(history.delete("1").await.is_err());
}
