pub mod protocol;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{Notify, RwLock};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{ChatTurn, Config};
use crate::providers::{Provider, client_for};
use crate::server::protocol::{
    AskRequest, AskResponse, MAX_FRAME_BYTES, Request, Response, SessionInfoRequest,
    SessionInfoResponse, StatusResponse, UploadRequest, UploadResponse, decode_length,
    encode_message,
};
use crate::services::{
    Answer, MetricsStore, RetrievalPipeline, SessionStore, SharedSession, VectorIndex,
};

/// Everything a connection task needs, shared behind one `Arc`. The session
/// store lives here for the life of the process; request handlers receive
/// it explicitly rather than through a global.
struct DaemonState {
    config: Config,
    store: SessionStore,
    pipeline: RetrievalPipeline,
    metrics: Option<std::sync::Mutex<MetricsStore>>,
    last_request: RwLock<Instant>,
    requests_served: AtomicU64,
    shutdown: AtomicBool,
    shutdown_signal: Notify,
}

pub struct DaemonServer {
    socket_path: PathBuf,
    state: Arc<DaemonState>,
}

impl DaemonServer {
    pub fn new(config: Config) -> Self {
        let socket_path = config.socket_path();

        let metrics = if config.daemon.metrics_enabled {
            open_metrics(config.daemon.metrics_retention_days)
        } else {
            None
        };

        let state = Arc::new(DaemonState {
            store: SessionStore::new(config.session.ttl()),
            pipeline: RetrievalPipeline::new(&config),
            metrics,
            last_request: RwLock::new(Instant::now()),
            requests_served: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
            shutdown_signal: Notify::new(),
            config,
        });

        Self { socket_path, state }
    }

    pub async fn run(&self) -> Result<(), std::io::Error> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        self.write_pid_file()?;

        eprintln!("Daemon listening on: {}", self.socket_path.display());
        eprintln!("Session TTL: {}s", self.state.config.session.ttl_secs);

        let idle_timeout = Duration::from_secs(self.state.config.daemon.idle_timeout_secs);
        let check_interval = Duration::from_secs(10);

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, _)) => {
                            *self.state.last_request.write().await = Instant::now();
                            let state = Arc::clone(&self.state);
                            tokio::spawn(async move {
                                handle_connection(state, stream).await;
                            });
                        }
                        Err(e) => {
                            eprintln!("Accept error: {}", e);
                        }
                    }
                }
                _ = tokio::time::sleep(check_interval) => {
                    if self.state.shutdown.load(Ordering::Relaxed) {
                        break;
                    }
                    let swept = self.state.store.sweep_expired().await;
                    if swept > 0 {
                        eprintln!("Swept {} expired session(s)", swept);
                    }
                    let last = *self.state.last_request.read().await;
                    if last.elapsed() > idle_timeout {
                        eprintln!("Idle timeout reached, shutting down");
                        break;
                    }
                }
                _ = self.state.shutdown_signal.notified() => {
                    break;
                }
                _ = tokio::signal::ctrl_c() => {
                    eprintln!("Received SIGINT, shutting down");
                    break;
                }
            }
        }

        self.cleanup();
        Ok(())
    }

    fn write_pid_file(&self) -> Result<(), std::io::Error> {
        let pid_path = self.state.config.pid_path();
        std::fs::write(&pid_path, std::process::id().to_string())
    }

    fn cleanup(&self) {
        let _ = std::fs::remove_file(&self.socket_path);
        let _ = std::fs::remove_file(self.state.config.pid_path());
        eprintln!("Daemon stopped");
    }
}

fn open_metrics(retention_days: u32) -> Option<std::sync::Mutex<MetricsStore>> {
    let path = Config::metrics_db_path()?;
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match MetricsStore::open(&path) {
        Ok(store) => {
            store.cleanup(retention_days);
            Some(std::sync::Mutex::new(store))
        }
        Err(e) => {
            eprintln!("Warning: failed to open metrics database: {}", e);
            None
        }
    }
}

async fn handle_connection(state: Arc<DaemonState>, mut stream: UnixStream) {
    let mut len_buf = [0u8; 4];

    while stream.read_exact(&mut len_buf).await.is_ok() {
        let len = decode_length(&len_buf);
        if len > MAX_FRAME_BYTES {
            break;
        }

        let mut msg_buf = vec![0u8; len];
        if stream.read_exact(&mut msg_buf).await.is_err() {
            break;
        }

        let request: Request = match serde_json::from_slice(&msg_buf) {
            Ok(r) => r,
            Err(e) => {
                let response = Response::error(format!("invalid request: {}", e));
                if let Ok(encoded) = encode_message(&response) {
                    let _ = stream.write_all(&encoded).await;
                }
                continue;
            }
        };

        let response = handle_request(&state, request).await;
        state.requests_served.fetch_add(1, Ordering::Relaxed);
        *state.last_request.write().await = Instant::now();

        let shutting_down = matches!(response, Response::ShutdownAck);
        if let Ok(encoded) = encode_message(&response)
            && stream.write_all(&encoded).await.is_err()
        {
            break;
        }
        if shutting_down {
            break;
        }
    }
}

async fn handle_request(state: &Arc<DaemonState>, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Shutdown => {
            state.shutdown.store(true, Ordering::Relaxed);
            state.shutdown_signal.notify_one();
            Response::ShutdownAck
        }

        Request::Status => {
            let metrics = state.metrics.as_ref().and_then(|m| {
                m.lock()
                    .ok()
                    .map(|m| m.summary(state.config.daemon.metrics_retention_days))
            });
            let last = *state.last_request.read().await;
            Response::Status(StatusResponse {
                running: true,
                active_sessions: state.store.len().await,
                idle_secs: last.elapsed().as_secs(),
                requests_served: state.requests_served.load(Ordering::Relaxed),
                metrics,
            })
        }

        Request::Upload(req) => timed(state, "upload", handle_upload(state, req)).await,

        Request::Ask(req) => timed(state, "ask", handle_ask(state, req)).await,

        Request::Reset(req) => {
            state.store.reset(&req.session_id).await;
            Response::ResetAck
        }

        Request::SessionInfo(req) => match handle_session_info(state, req).await {
            Ok(response) => response,
            Err(e) => Response::error(e.to_string()),
        },
    }
}

/// Run a handler, record its latency in the metrics log, and flatten
/// failures into an error response.
async fn timed<F>(state: &DaemonState, kind: &str, handler: F) -> Response
where
    F: Future<Output = Result<Response, AppError>>,
{
    let start = Instant::now();
    let result = handler.await;
    let latency_ms = start.elapsed().as_millis() as u64;

    if let Some(metrics) = &state.metrics
        && let Ok(metrics) = metrics.lock()
    {
        metrics.record(kind, latency_ms, result.is_ok());
    }

    result.unwrap_or_else(|e| Response::error(e.to_string()))
}

async fn handle_upload(state: &DaemonState, req: UploadRequest) -> Result<Response, AppError> {
    let UploadRequest {
        session_id,
        filename,
        text,
        provider,
        api_key,
    } = req;

    // Reuse the session while it is live; an unknown or lapsed id starts a
    // fresh one, matching how a browser re-uploads after expiry.
    let (session_id, session) = match session_id {
        Some(id) => match state.store.get(&id).await {
            Ok(handle) => (id, handle),
            Err(_) => create_session(state, provider, &api_key).await?,
        },
        None => create_session(state, provider, &api_key).await?,
    };

    // The session's binding wins over whatever the request carried, so one
    // index never mixes embedding dimensions.
    let (bound_provider, bound_key) = {
        let session = session.lock().await;
        (session.provider, session.api_key.clone())
    };
    let client = client_for(bound_provider, &bound_key, &state.config.providers)?;

    let chunk_count = state
        .pipeline
        .ingest_into(client.as_ref(), &session, &text, &filename)
        .await?;

    let files = session.lock().await.files.clone();
    Ok(Response::Upload(UploadResponse {
        session_id,
        chunk_count,
        files,
    }))
}

async fn create_session(
    state: &DaemonState,
    provider: Provider,
    api_key: &str,
) -> Result<(String, SharedSession), AppError> {
    let id = Uuid::new_v4().to_string();
    let handle = state.store.create(&id, provider, api_key).await?;
    Ok((id, handle))
}

async fn handle_ask(state: &DaemonState, req: AskRequest) -> Result<Response, AppError> {
    let session = state.store.get(&req.session_id).await?;

    let (provider, api_key) = {
        let session = session.lock().await;
        (session.provider, session.api_key.clone())
    };
    let client = client_for(provider, &api_key, &state.config.providers)?;

    let Answer { answer, sources } = state
        .pipeline
        .query(client.as_ref(), &session, &req.question)
        .await?;

    // Best-effort history append: if the session expired while the
    // completion was in flight, the merge silently drops.
    let recorded = answer.clone();
    state
        .store
        .update(&req.session_id, move |session| {
            session.history.push(ChatTurn::human(req.question));
            session.history.push(ChatTurn::assistant(recorded));
        })
        .await;

    Ok(Response::Ask(AskResponse { answer, sources }))
}

async fn handle_session_info(
    state: &DaemonState,
    req: SessionInfoRequest,
) -> Result<Response, AppError> {
    let session = state.store.get(&req.session_id).await?;
    let session = session.lock().await;

    Ok(Response::SessionInfo(SessionInfoResponse {
        session_id: session.id.clone(),
        provider: session.provider,
        files: session.files.clone(),
        history_len: session.history.len(),
        index_size: session.index.as_ref().map(VectorIndex::len).unwrap_or(0),
        age_secs: session.age().as_secs(),
        started_at: session.started_at.to_rfc3339(),
    }))
}

pub async fn run_daemon(config: Config) -> Result<(), std::io::Error> {
    let server = DaemonServer::new(config);
    server.run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> Arc<DaemonState> {
        let mut config = Config::default();
        config.daemon.metrics_enabled = false;
        DaemonServer::new(config).state
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let state = state();
        let response = handle_request(&state, Request::Ping).await;
        assert!(matches!(response, Response::Pong));
    }

    #[tokio::test]
    async fn test_status_reports_sessions() {
        let state = state();
        state
            .store
            .create("s1", Provider::OpenAi, "key")
            .await
            .unwrap();

        let response = handle_request(&state, Request::Status).await;
        match response {
            Response::Status(status) => {
                assert!(status.running);
                assert_eq!(status.active_sessions, 1);
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reset_unknown_session_acks() {
        let state = state();
        let response = handle_request(
            &state,
            Request::Reset(crate::server::protocol::ResetRequest {
                session_id: "missing".to_string(),
            }),
        )
        .await;
        assert!(matches!(response, Response::ResetAck));
    }

    #[tokio::test]
    async fn test_ask_unknown_session_is_error() {
        let state = state();
        let response = handle_request(
            &state,
            Request::Ask(AskRequest {
                session_id: "missing".to_string(),
                question: "anything?".to_string(),
            }),
        )
        .await;
        match response {
            Response::Error(e) => assert!(e.message.contains("unknown session")),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_session_info_reflects_state() {
        let state = state();
        let handle = state
            .store
            .create("s1", Provider::Gemini, "key")
            .await
            .unwrap();
        {
            let mut session = handle.lock().await;
            session.files.push("a.txt".to_string());
            session.history.push(ChatTurn::human("hi"));
        }

        let response = handle_request(
            &state,
            Request::SessionInfo(SessionInfoRequest {
                session_id: "s1".to_string(),
            }),
        )
        .await;
        match response {
            Response::SessionInfo(info) => {
                assert_eq!(info.provider, Provider::Gemini);
                assert_eq!(info.files, vec!["a.txt"]);
                assert_eq!(info.history_len, 1);
                assert_eq!(info.index_size, 0);
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_shutdown_ack() {
        let state = state();
        let response = handle_request(&state, Request::Shutdown).await;
        assert!(matches!(response, Response::ShutdownAck));
        assert!(state.shutdown.load(Ordering::Relaxed));
    }
}
