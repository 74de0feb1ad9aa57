// src/server.rs
// =============================================================================
// Live crawl updates over a WebSocket.
//
// Routes:
//   GET /ws      WebSocket endpoint
//   GET /health  returns "ok"
//
// Protocol on /ws:
//   client -> {"url": "https://example.com"}          (once)
//   server -> {"page": "...", "links": [...]}          (zero or more)
//   server -> {"status": "completed"} or {"error": "..."}   (exactly once)
//   server closes the socket
//
// The crawl runs in its own task and pushes pages into a channel; this side
// drains the channel into the socket. If the client goes away, the crawl is
// cancelled.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::HeaderValue;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{CrawlConfig, Schedule};
use crate::crawl::Crawler;
use crate::sink::{PageResult, OBSERVER_CAPACITY};

pub const DEFAULT_SERVER_MAX_DEPTH: usize = 2;

// Crawl parameters applied to every WebSocket session
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub max_depth: usize,
    pub rate_limit_secs: f64,
    pub request_timeout: Duration,
    pub workers: usize,
    pub schedule: Schedule,
    pub user_agent: String,
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct StartRequest {
    url: Option<String>,
}

// Everything the server sends, serialized without a wrapper tag
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Outbound {
    Page(PageResult),
    Status { status: &'static str },
    Error { error: String },
}

enum SessionError {
    // Nobody left to tell
    ClientGone,
    // Sent to the client as the terminal {"error": ...}
    Failed(String),
}

pub fn build_router(settings: ServerSettings) -> Result<Router> {
    let origins = settings
        .allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("Invalid origin '{}'", origin))
        })
        .collect::<Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any);

    Ok(Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(|| async { "ok" }))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(settings)))
}

pub async fn serve(addr: &str, settings: ServerSettings) -> Result<()> {
    let app = build_router(settings)?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(settings): State<Arc<ServerSettings>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, settings))
}

async fn handle_socket(socket: WebSocket, settings: Arc<ServerSettings>) {
    let (mut sender, mut receiver) = socket.split();
    run_session(&mut sender, &mut receiver, &settings).await;
    let _ = sender.close().await;
}

// One start request, one crawl, one terminal message
async fn run_session<S, R>(sender: &mut S, receiver: &mut R, settings: &ServerSettings)
where
    S: Sink<Message> + Unpin,
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let terminal = match stream_crawl(sender, receiver, settings).await {
        Ok(()) => Outbound::Status {
            status: "completed",
        },
        Err(SessionError::Failed(error)) => Outbound::Error { error },
        Err(SessionError::ClientGone) => {
            info!("client disconnected, crawl cancelled");
            return;
        }
    };

    if send(sender, &terminal).await.is_err() {
        warn!("could not deliver final message");
    }
}

async fn stream_crawl<S, R>(
    sender: &mut S,
    receiver: &mut R,
    settings: &ServerSettings,
) -> Result<(), SessionError>
where
    S: Sink<Message> + Unpin,
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let url = read_start_request(receiver).await?;

    let config = CrawlConfig::new(&url)
        .map_err(|e| SessionError::Failed(e.to_string()))?
        .with_max_depth(settings.max_depth)
        .with_rate_limit(settings.rate_limit_secs)
        .with_request_timeout(settings.request_timeout)
        .with_workers(settings.workers)
        .with_schedule(settings.schedule)
        .with_user_agent(settings.user_agent.as_str());

    let (tx, mut rx) = mpsc::channel(OBSERVER_CAPACITY);
    let cancel = CancellationToken::new();
    let crawler = Crawler::new(config)
        .map_err(|e| SessionError::Failed(e.to_string()))?
        .with_observer(tx)
        .with_cancellation(cancel.clone());

    // Cancels the crawl on every early return below
    let _guard = cancel.clone().drop_guard();
    let crawl = tokio::spawn(crawler.run());

    loop {
        tokio::select! {
            page = rx.recv() => match page {
                Some(page) => {
                    if send(sender, &Outbound::Page(page)).await.is_err() {
                        return Err(SessionError::ClientGone);
                    }
                }
                // The crawler dropped its end: the crawl is over
                None => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    return Err(SessionError::ClientGone);
                }
                Some(Ok(_)) => {}
            },
        }
    }

    let report = crawl
        .await
        .map_err(|e| SessionError::Failed(format!("Crawl task failed: {}", e)))?;

    match report.start_error {
        Some(error) if report.pages.is_empty() => Err(SessionError::Failed(error)),
        _ => Ok(()),
    }
}

async fn read_start_request<R>(receiver: &mut R) -> Result<String, SessionError>
where
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    loop {
        let payload = match receiver.next().await {
            Some(Ok(Message::Text(text))) => text.into_bytes(),
            Some(Ok(Message::Binary(bytes))) => bytes,
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                return Err(SessionError::ClientGone)
            }
        };

        let request: StartRequest = serde_json::from_slice(&payload)
            .map_err(|e| SessionError::Failed(format!("Invalid start request: {}", e)))?;

        return match request.url {
            Some(url) if !url.trim().is_empty() => Ok(url),
            _ => Err(SessionError::Failed("Missing start URL".to_string())),
        };
    }
}

async fn send<S>(sender: &mut S, message: &Outbound) -> Result<(), ()>
where
    S: Sink<Message> + Unpin,
{
    let text = serde_json::to_string(message).map_err(|_| ())?;
    sender.send(Message::Text(text)).await.map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use futures::channel::mpsc as chan;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings() -> ServerSettings {
        ServerSettings {
            max_depth: DEFAULT_SERVER_MAX_DEPTH,
            rate_limit_secs: 0.0,
            request_timeout: Duration::from_secs(2),
            workers: 4,
            schedule: Schedule::Concurrent,
            user_agent: crate::config::DEFAULT_USER_AGENT.to_string(),
            allowed_origins: vec!["http://localhost:8080".to_string()],
        }
    }

    // Runs a session fed with `first`, returns every JSON message sent back
    async fn session(first: &str) -> Vec<serde_json::Value> {
        let (out_tx, out_rx) = chan::unbounded::<Message>();
        let (in_tx, in_rx) = chan::unbounded::<Result<Message, axum::Error>>();
        in_tx.unbounded_send(Ok(Message::Text(first.to_string()))).unwrap();

        let mut sender = out_tx;
        let mut receiver = in_rx;
        run_session(&mut sender, &mut receiver, &settings()).await;
        drop(sender);
        drop(in_tx);

        out_rx
            .map(|message| match message {
                Message::Text(text) => serde_json::from_str(&text).unwrap(),
                other => panic!("unexpected message {:?}", other),
            })
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_streams_pages_then_completes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"<a href="/a">a</a>"#))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>leaf</p>"))
            .mount(&server)
            .await;

        let start = format!(r#"{{"url": "{}"}}"#, server.uri());
        let messages = session(&start).await;

        assert_eq!(messages.len(), 3);
        assert!(messages[..2].iter().all(|m| m.get("page").is_some()));
        assert_eq!(messages[2], serde_json::json!({"status": "completed"}));
    }

    #[tokio::test]
    async fn test_missing_url_is_an_error() {
        let messages = session("{}").await;
        assert_eq!(messages, vec![serde_json::json!({"error": "Missing start URL"})]);
    }

    #[tokio::test]
    async fn test_malformed_url_is_an_error() {
        let messages = session(r#"{"url": "not a url"}"#).await;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].get("error").is_some());
    }

    #[tokio::test]
    async fn test_unreachable_start_sends_single_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        drop(listener);

        let messages = session(&format!(r#"{{"url": "{}"}}"#, url)).await;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].get("error").is_some());
    }

    #[tokio::test]
    async fn test_client_gone_before_request() {
        let (out_tx, out_rx) = chan::unbounded::<Message>();
        let (in_tx, in_rx) = chan::unbounded::<Result<Message, axum::Error>>();
        drop(in_tx);

        let mut sender = out_tx;
        let mut receiver = in_rx;
        run_session(&mut sender, &mut receiver, &settings()).await;
        drop(sender);

        assert!(out_rx.collect::<Vec<_>>().await.is_empty());
    }

    #[tokio::test]
    async fn test_health_route() {
        let app = build_router(settings()).unwrap();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let app = build_router(settings()).unwrap();
        let response = app
            .oneshot(
                Request::get("/health")
                    .header("origin", "http://localhost:8080")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:8080"
        );
    }

    #[test]
    fn test_invalid_origin_rejected() {
        let mut bad = settings();
        bad.allowed_origins = vec!["bad\norigin".to_string()];
        assert!(build_router(bad).is_err());
    }
}
