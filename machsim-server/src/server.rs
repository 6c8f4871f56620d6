//! TCP server implementation.
//!
//! Clients speak line-delimited JSON: one request envelope per line in,
//! one response envelope per line out.

use crate::config::Config;
use crate::error::ServerError;
use crate::handler::CommandHandler;
use crate::session::{Session, SessionState};
use machsim_core::SimulationRegistry;
use machsim_protocol::message::{Request, Response, ResponseError};
use machsim_protocol::ErrorCode;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Idle connection timeout.
    pub idle_timeout: Duration,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Maximum size of a single protocol line.
    pub max_message_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:7400".parse().unwrap(),
            idle_timeout: Duration::from_secs(300),
            max_connections: 1000,
            max_message_bytes: machsim_protocol::MAX_MESSAGE_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    /// Builds a runtime configuration from the file/env configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            bind_addr: config.network.bind_addr,
            idle_timeout: config.network.idle_timeout(),
            max_connections: config.network.max_connections,
            max_message_bytes: config.limits.max_message_bytes,
        }
    }
}

/// Server statistics.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    pub requests_total: AtomicU64,
    pub errors_total: AtomicU64,
}

/// TCP server for machsim.
pub struct Server {
    config: ServerConfig,
    handler: Arc<CommandHandler>,
    stats: Arc<ServerStats>,
    shutdown: broadcast::Sender<()>,
    running: AtomicBool,
}

impl Server {
    /// Creates a new server over a shared simulation registry.
    pub fn new(config: ServerConfig, registry: Arc<SimulationRegistry>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            handler: Arc::new(CommandHandler::new(registry)),
            stats: Arc::new(ServerStats::default()),
            shutdown: shutdown_tx,
            running: AtomicBool::new(false),
        }
    }

    /// Returns the command handler.
    pub fn handler(&self) -> &Arc<CommandHandler> {
        &self.handler
    }

    /// Returns the server statistics.
    pub fn stats(&self) -> &Arc<ServerStats> {
        &self.stats
    }

    /// Signals the server to stop accepting connections and close down.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }

    /// Binds the configured address and serves until shutdown.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serves connections from an already-bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        self.running.store(true, Ordering::SeqCst);
        tracing::info!("Server listening on {}", listener.local_addr()?);

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.stats.connections_active.load(Ordering::Relaxed)
                                >= self.config.max_connections as u64
                            {
                                tracing::warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            self.stats.connections_total.fetch_add(1, Ordering::Relaxed);
                            self.stats.connections_active.fetch_add(1, Ordering::Relaxed);

                            let handler = self.handler.clone();
                            let stats = self.stats.clone();
                            let config = self.config.clone();
                            let mut conn_shutdown = self.shutdown.subscribe();

                            tokio::spawn(async move {
                                let result = Self::handle_connection(
                                    stream,
                                    addr,
                                    handler,
                                    config,
                                    stats.clone(),
                                    &mut conn_shutdown,
                                )
                                .await;

                                if let Err(e) = result {
                                    tracing::debug!("Connection {} error: {}", addr, e);
                                    stats.errors_total.fetch_add(1, Ordering::Relaxed);
                                }

                                stats.connections_active.fetch_sub(1, Ordering::Relaxed);
                                tracing::info!("Client disconnected: {}", addr);
                            });
                        }
                        Err(e) => {
                            tracing::error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Server shutting down");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Handles a single connection. Whatever way the connection ends, any
    /// interactive simulation sessions it still owns are disposed of.
    async fn handle_connection(
        stream: TcpStream,
        addr: SocketAddr,
        handler: Arc<CommandHandler>,
        config: ServerConfig,
        stats: Arc<ServerStats>,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        tracing::info!("Client connected: {}", addr);

        let mut session = Session::new(addr);
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let mut line = String::new();

        let result = loop {
            line.clear();
            tokio::select! {
                _ = shutdown.recv() => break Ok(()),

                read = tokio::time::timeout(config.idle_timeout, reader.read_line(&mut line)) => {
                    let n = match read {
                        Err(_) => {
                            tracing::debug!("[{}] idle timeout", addr);
                            break Ok(());
                        }
                        Ok(r) => r?,
                    };
                    if n == 0 {
                        break Ok(());
                    }
                    if n > config.max_message_bytes {
                        break Err(ServerError::Protocol(
                            machsim_protocol::ProtocolError::MessageTooLarge {
                                size: n,
                                max: config.max_message_bytes,
                            },
                        ));
                    }

                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    stats.requests_total.fetch_add(1, Ordering::Relaxed);
                    let response = match serde_json::from_str::<Request>(trimmed) {
                        Ok(request) => handler.handle(&mut session, &request),
                        Err(e) => Response::error(
                            "",
                            ResponseError::new(
                                ErrorCode::BadRequest,
                                format!("invalid request: {e}"),
                            ),
                        ),
                    };
                    if response.is_error() {
                        stats.errors_total.fetch_add(1, Ordering::Relaxed);
                    }

                    let mut bytes = serde_json::to_vec(&response)?;
                    bytes.push(b'\n');
                    write_half.write_all(&bytes).await?;

                    if session.state() == SessionState::Closing {
                        break Ok(());
                    }
                }
            }
        };

        handler.end_abandoned(&session);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

    async fn spawn_server() -> (Arc<Server>, SocketAddr) {
        let registry = Arc::new(SimulationRegistry::new());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(Server::new(ServerConfig::new(addr), registry));
        let serving = server.clone();
        tokio::spawn(async move { serving.serve(listener).await });
        (server, addr)
    }

    async fn connect(addr: SocketAddr) -> (BufReader<OwnedReadHalf>, OwnedWriteHalf) {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, write_half) = stream.into_split();
        (BufReader::new(read_half), write_half)
    }

    async fn send(
        reader: &mut BufReader<OwnedReadHalf>,
        writer: &mut OwnedWriteHalf,
        request: Value,
    ) -> Response {
        let mut bytes = serde_json::to_vec(&request).unwrap();
        bytes.push(b'\n');
        writer.write_all(&bytes).await.unwrap();

        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        serde_json::from_str(&line).unwrap()
    }

    fn odd_as_machine() -> Value {
        json!({
            "Type": "DFA",
            "Alphabet": "ab",
            "Start": "q0",
            "States": [
                {"Id": "q0", "Ending": false},
                {"Id": "q1", "Ending": true}
            ],
            "Transitions": [
                {"Start": "q0", "End": "q1", "Symbol": "a"},
                {"Start": "q0", "End": "q0", "Symbol": "b"},
                {"Start": "q1", "End": "q0", "Symbol": "a"},
                {"Start": "q1", "End": "q1", "Symbol": "b"}
            ]
        })
    }

    #[tokio::test]
    async fn test_ping_over_tcp() {
        let (server, addr) = spawn_server().await;
        let (mut reader, mut writer) = connect(addr).await;

        let response = send(
            &mut reader,
            &mut writer,
            json!({"type": "request", "id": "1", "op": "PING"}),
        )
        .await;

        assert!(response.is_ok());
        assert_eq!(response.result.unwrap()["pong"], true);

        server.shutdown();
    }

    #[tokio::test]
    async fn test_do_over_tcp() {
        let (server, addr) = spawn_server().await;
        let (mut reader, mut writer) = connect(addr).await;

        let response = send(
            &mut reader,
            &mut writer,
            json!({
                "type": "request",
                "id": "1",
                "op": "DO",
                "params": {"tape": "aaba", "machine": odd_as_machine()}
            }),
        )
        .await;

        assert!(response.is_ok());
        let result = response.result.unwrap();
        assert_eq!(result["Accepted"], true);
        assert_eq!(result["Path"], json!(["q0", "q1", "q0", "q0", "q1"]));
        assert_eq!(result["RemainingInput"], "");

        server.shutdown();
    }

    #[tokio::test]
    async fn test_invalid_line_is_a_bad_request() {
        let (server, addr) = spawn_server().await;
        let (mut reader, mut writer) = connect(addr).await;

        writer.write_all(b"this is not json\n").await.unwrap();
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let response: Response = serde_json::from_str(&line).unwrap();

        assert!(response.is_error());
        assert_eq!(response.error.unwrap().code, ErrorCode::BadRequest);

        server.shutdown();
    }

    #[tokio::test]
    async fn test_bye_closes_the_connection() {
        let (server, addr) = spawn_server().await;
        let (mut reader, mut writer) = connect(addr).await;

        let response = send(
            &mut reader,
            &mut writer,
            json!({"type": "request", "id": "1", "op": "BYE"}),
        )
        .await;
        assert!(response.is_ok());

        // The server hangs up after the goodbye.
        let mut line = String::new();
        let n = reader.read_line(&mut line).await.unwrap();
        assert_eq!(n, 0);

        server.shutdown();
    }

    #[tokio::test]
    async fn test_disconnect_ends_interactive_sessions() {
        let (server, addr) = spawn_server().await;
        let (mut reader, mut writer) = connect(addr).await;

        let response = send(
            &mut reader,
            &mut writer,
            json!({
                "type": "request",
                "id": "1",
                "op": "START",
                "params": {"tape": "aaba", "machine": odd_as_machine()}
            }),
        )
        .await;
        assert!(response.is_ok());
        assert_eq!(server.handler().registry().len(), 1);

        drop(reader);
        drop(writer);

        // The connection task notices EOF and disposes of the session.
        for _ in 0..50 {
            if server.handler().registry().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(server.handler().registry().is_empty());

        server.shutdown();
    }
}
