//! WebSocket Key Server
//!
//! Async WebSocket front door for custody requests and ledger queries.
//! Clients authenticate with an attendee JWT, then ask for custody of
//! their own account. Queries need no authentication.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::time::interval;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::core::PublicKey;
use crate::ledger::Query;
use crate::network::auth::{validate_token, AuthConfig, AuthError};
use crate::network::protocol::{ClientMessage, ErrorCode, ServerMessage};
use crate::network::service::{KeyService, SecretDelivery, ServiceError};
use crate::relay::{ClientError, LedgerClient, RelayError};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Idle time after which a connection is dropped.
    pub idle_timeout: Duration,
    /// How often idle connections are swept.
    pub cleanup_interval: Duration,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 1337)),
            max_connections: 1000,
            idle_timeout: Duration::from_secs(300),
            cleanup_interval: Duration::from_secs(60),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `LINKEDUP_BIND_ADDR`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(addr) = std::env::var("LINKEDUP_BIND_ADDR")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.bind_addr = addr;
        }
        config
    }
}

/// Key server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Connected client state.
struct ConnectedClient {
    /// Ticket id once authenticated.
    attendee_id: Option<String>,
    /// Connection time.
    connected_at: Instant,
    /// Last activity.
    last_activity: Instant,
    /// Tells the connection task to close the socket.
    close_tx: Option<oneshot::Sender<()>>,
}

type Clients = Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>;

/// State shared by every connection task.
struct Shared<C, D> {
    config: ServerConfig,
    auth: AuthConfig,
    service: Arc<KeyService<C, D>>,
    clients: Clients,
}

/// The key server.
pub struct KeyServer<C, D> {
    shared: Arc<Shared<C, D>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl<C, D> KeyServer<C, D>
where
    C: LedgerClient + 'static,
    D: SecretDelivery + 'static,
{
    /// Create a new key server.
    pub fn new(config: ServerConfig, auth: AuthConfig, service: Arc<KeyService<C, D>>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            shared: Arc::new(Shared {
                config,
                auth,
                service,
                clients: Arc::new(RwLock::new(BTreeMap::new())),
            }),
            shutdown_tx,
        }
    }

    /// Run until shutdown.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.shared.config.bind_addr).await?;
        info!("Key server listening on {}", self.shared.config.bind_addr);

        let cleanup_shared = Arc::clone(&self.shared);
        let cleanup_handle = tokio::spawn(async move {
            cleanup_shared.run_cleanup_loop().await;
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.shared.clients.read().await.len();
                            if clients_count >= self.shared.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        cleanup_handle.abort();
        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let shared = Arc::clone(&self.shared);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);
            let (close_tx, mut close_rx) = oneshot::channel();

            shared.clients.write().await.insert(
                addr,
                ConnectedClient {
                    attendee_id: None,
                    connected_at: Instant::now(),
                    last_activity: Instant::now(),
                    close_tx: Some(close_tx),
                },
            );

            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                let _ = ws_sender.close().await;
            });

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let client_msg = match ClientMessage::from_json(&text) {
                                    Ok(m) => m,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        let _ = msg_tx
                                            .send(ServerMessage::error(
                                                ErrorCode::InvalidMessage,
                                                "Invalid message format",
                                            ))
                                            .await;
                                        continue;
                                    }
                                };

                                shared.touch(addr).await;
                                let reply = shared.handle_client_message(addr, client_msg).await;
                                if msg_tx.send(reply).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                    _ = &mut close_rx => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Idle timeout".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // let the closing notice flush before tearing down
            drop(msg_tx);
            let _ = sender_task.await;

            if let Some(client) = shared.clients.write().await.remove(&addr) {
                debug!(
                    "Client {} cleaned up after {:?}",
                    addr,
                    client.connected_at.elapsed()
                );
            }
        });
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.shared.clients.read().await.len()
    }
}

impl<C, D> Shared<C, D>
where
    C: LedgerClient,
    D: SecretDelivery,
{
    async fn touch(&self, addr: SocketAddr) {
        if let Some(client) = self.clients.write().await.get_mut(&addr) {
            client.last_activity = Instant::now();
        }
    }

    /// Handle one client message and produce the reply.
    async fn handle_client_message(&self, addr: SocketAddr, msg: ClientMessage) -> ServerMessage {
        match msg {
            ClientMessage::Auth { token, .. } => self.handle_auth(addr, &token).await,
            ClientMessage::Key { public_key } => self.handle_key(addr, public_key).await,
            ClientMessage::Query { query } => self.handle_query(&query).await,
            ClientMessage::Ping { timestamp } => ServerMessage::Pong {
                timestamp,
                server_time: Utc::now().timestamp_millis() as u64,
            },
        }
    }

    async fn handle_auth(&self, addr: SocketAddr, token: &str) -> ServerMessage {
        let claims = match validate_token(token, &self.auth) {
            Ok(claims) => claims,
            Err(e) => {
                debug!("Client {} failed auth: {}", addr, e);
                return ServerMessage::AuthResult {
                    success: false,
                    address: None,
                    server_version: self.config.version.clone(),
                    error: Some(auth_error_message(&e)),
                };
            }
        };

        let address = claims.attendee_address();
        if let Some(client) = self.clients.write().await.get_mut(&addr) {
            client.attendee_id = Some(claims.sub.clone());
        }

        debug!("Client {} authenticated as attendee {}", addr, claims.sub);
        ServerMessage::AuthResult {
            success: true,
            address: Some(address),
            server_version: self.config.version.clone(),
            error: None,
        }
    }

    async fn handle_key(&self, addr: SocketAddr, public_key: PublicKey) -> ServerMessage {
        let attendee_id = self
            .clients
            .read()
            .await
            .get(&addr)
            .and_then(|c| c.attendee_id.clone());
        let Some(attendee_id) = attendee_id else {
            return ServerMessage::error(ErrorCode::NotAuthenticated, "Authenticate first");
        };

        if public_key.verifying_key().is_err() {
            return ServerMessage::error(ErrorCode::InvalidMessage, "Invalid public key");
        }

        match self.service.key_attendee(&attendee_id, public_key).await {
            Ok(address) => ServerMessage::Keyed { address },
            Err(e) => {
                debug!("Custody request from {} failed: {}", addr, e);
                ServerMessage::error(service_error_code(&e), e.to_string())
            }
        }
    }

    async fn handle_query(&self, query: &Query) -> ServerMessage {
        match self.service.query(query).await {
            Ok(result) => ServerMessage::QueryResult { result },
            Err(e) => ServerMessage::error(service_error_code(&e), e.to_string()),
        }
    }

    /// Drop idle connections periodically.
    async fn run_cleanup_loop(&self) {
        let mut interval = interval(self.config.cleanup_interval);

        loop {
            interval.tick().await;
            self.sweep_idle().await;
        }
    }

    /// Close every connection idle longer than the timeout. Returns how many.
    async fn sweep_idle(&self) -> usize {
        let now = Instant::now();
        let mut clients = self.clients.write().await;
        let idle: Vec<SocketAddr> = clients
            .iter()
            .filter(|(_, c)| now.duration_since(c.last_activity) > self.config.idle_timeout)
            .map(|(addr, _)| *addr)
            .collect();

        for addr in &idle {
            if let Some(client) = clients.remove(addr) {
                if let Some(close_tx) = client.close_tx {
                    let _ = close_tx.send(());
                }
                info!("Closed idle client {}", addr);
            }
        }
        idle.len()
    }
}

fn auth_error_message(err: &AuthError) -> String {
    match err {
        AuthError::NotConfigured => "Authentication unavailable".to_string(),
        other => other.to_string(),
    }
}

/// Map a service failure to the code clients act on.
fn service_error_code(err: &ServiceError) -> ErrorCode {
    match err {
        ServiceError::InvalidAttendeeId(_) => ErrorCode::InvalidMessage,
        ServiceError::NotFound => ErrorCode::AttendeeNotFound,
        ServiceError::AlreadyKeyed => ErrorCode::AlreadyKeyed,
        ServiceError::Relay(RelayError::InvalidRequest(_)) => ErrorCode::InvalidMessage,
        ServiceError::Relay(RelayError::Submission(_)) => ErrorCode::LedgerUnavailable,
        ServiceError::Relay(RelayError::Busy(_)) => ErrorCode::Busy,
        ServiceError::Relay(RelayError::FailedTx { .. }) => ErrorCode::LedgerRejected,
        ServiceError::Client(ClientError::Unreachable(_)) => ErrorCode::LedgerUnavailable,
        ServiceError::Client(_) => ErrorCode::LedgerRejected,
        _ => ErrorCode::InternalError,
    }
}
