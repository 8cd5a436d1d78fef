//! `RealtimeTransport` over a Pusher protocol 7 WebSocket.
//!
//! The transport methods are synchronous: they update the shared
//! [`ChannelRegistry`] and queue a command for the connection task, which
//! owns the socket. The task reconnects with capped exponential backoff and
//! resubscribes every registered channel once the server assigns a new
//! socket id.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::config::PusherConfig;
use crate::domain::realtime::{leave_targets, requires_auth, EventFormatter, PRIVATE_PREFIX};
use crate::ports::{
    AuthorizationError, ChannelAuthorizer, ChannelHandle, Disconnect, GlobalListener, Listener,
    RealtimeTransport,
};

use super::protocol::{
    self, ConnectionEstablished, InboundFrame, ProtocolError, ReconnectPolicy, ServerError,
};
use super::registry::ChannelRegistry;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Errors raised by the Pusher transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Authorization failed: {0}")]
    Authorization(#[from] AuthorizationError),

    #[error("Transport is closed")]
    Closed,
}

/// Connection lifecycle as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Initialized,
    Connecting,
    /// Socket open and `connection_established` received.
    Connected,
    /// Waiting to retry after a failure.
    Unavailable,
    /// The server refused the connection for good.
    Failed,
    Disconnected,
}

enum Command {
    Subscribe(String),
    Unsubscribe(String),
    Shutdown,
}

struct Shared {
    registry: ChannelRegistry,
    formatter: EventFormatter,
    socket_id: RwLock<Option<String>>,
    state: watch::Sender<ConnectionState>,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    fn set_socket_id(&self, socket_id: Option<String>) {
        *self.socket_id.write().unwrap_or_else(PoisonError::into_inner) = socket_id;
    }
}

/// Pusher protocol client implementing [`RealtimeTransport`].
///
/// Must be started inside a Tokio runtime.
pub struct PusherTransport {
    shared: Arc<Shared>,
    commands: mpsc::UnboundedSender<Command>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PusherTransport {
    /// Spawns the connection task and returns immediately.
    pub fn start(
        config: PusherConfig,
        formatter: EventFormatter,
        authorizer: Option<Arc<dyn ChannelAuthorizer>>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Initialized);
        let shared = Arc::new(Shared {
            registry: ChannelRegistry::new(),
            formatter,
            socket_id: RwLock::new(None),
            state,
        });
        let (commands, receiver) = mpsc::unbounded_channel();

        let connection = Connection {
            shared: Arc::clone(&shared),
            config,
            authorizer,
        };
        let task = tokio::spawn(connection.run(receiver));

        Self {
            shared,
            commands,
            task: Mutex::new(Some(task)),
        }
    }

    /// Socket id assigned by the server for the current connection.
    pub fn socket_id(&self) -> Option<String> {
        self.shared
            .socket_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Receiver notified on every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Whether the server confirmed the subscription to `channel`.
    pub fn is_subscribed(&self, channel: &str) -> bool {
        self.shared.registry.is_subscribed(channel)
    }

    /// Closes the socket and waits for the connection task to finish.
    pub async fn shutdown(&self) -> Result<(), TransportError> {
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(TransportError::Closed)?;
        // The task may already have stopped on its own.
        let _ = self.commands.send(Command::Shutdown);
        task.await.map_err(|_| TransportError::Closed)?;
        tracing::info!("Pusher transport shut down");
        Ok(())
    }

    fn open(&self, name: String) -> Arc<dyn ChannelHandle> {
        if self.shared.registry.ensure(&name) {
            tracing::debug!(channel = %name, "Channel registered");
            let _ = self.commands.send(Command::Subscribe(name.clone()));
        }
        Arc::new(PusherChannel {
            name,
            shared: Arc::clone(&self.shared),
            commands: self.commands.clone(),
        })
    }
}

impl RealtimeTransport for PusherTransport {
    fn channel(&self, name: &str) -> Arc<dyn ChannelHandle> {
        self.open(name.to_string())
    }

    fn private(&self, name: &str) -> Arc<dyn ChannelHandle> {
        self.open(format!("{}{}", PRIVATE_PREFIX, name))
    }

    fn leave(&self, name: &str) {
        for target in leave_targets(name) {
            if self.shared.registry.remove(&target) {
                tracing::debug!(channel = %target, "Leaving channel");
                let _ = self.commands.send(Command::Unsubscribe(target));
            }
        }
    }
}

/// Handle to one registered channel.
pub struct PusherChannel {
    name: String,
    shared: Arc<Shared>,
    commands: mpsc::UnboundedSender<Command>,
}

impl ChannelHandle for PusherChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn listen(&self, event_label: &str, listener: Listener) {
        let event = self.shared.formatter.format(event_label);
        self.shared.registry.listen(&self.name, event, listener);
    }

    fn bind_global(&self, listener: GlobalListener) {
        self.shared.registry.bind_global(&self.name, listener);
    }

    fn unbind_global(&self) {
        self.shared.registry.unbind_global(&self.name);
    }

    fn disconnector(&self) -> Option<&dyn Disconnect> {
        Some(self as &dyn Disconnect)
    }
}

impl Disconnect for PusherChannel {
    /// Unsubscribes this channel only; the socket stays open for the others.
    fn disconnect(&self) {
        if self.shared.registry.remove(&self.name) {
            tracing::debug!(channel = %self.name, "Channel disconnected");
            let _ = self.commands.send(Command::Unsubscribe(self.name.clone()));
        }
    }
}

/// Doubles `current`, capped at `max`.
fn next_backoff(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}

fn millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

async fn wait_for_shutdown(commands: &mut mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = commands.recv().await {
        // The registry already reflects subscribe/unsubscribe requests.
        if matches!(command, Command::Shutdown) {
            return;
        }
    }
}

async fn send_text(write: &mut WsSink, text: String) -> Result<(), TransportError> {
    write.send(Message::Text(text.into())).await?;
    Ok(())
}

enum SessionEnd {
    Shutdown,
    Reconnect(ReconnectPolicy),
}

struct Session {
    socket_id: Option<String>,
    activity_timeout: Duration,
    requested: HashSet<String>,
}

struct Connection {
    shared: Arc<Shared>,
    config: PusherConfig,
    authorizer: Option<Arc<dyn ChannelAuthorizer>>,
}

impl Connection {
    async fn run(self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let url = self.config.websocket_url();
        let mut backoff = self.config.reconnect_min();

        loop {
            self.shared.set_state(ConnectionState::Connecting);
            tracing::debug!(host = %self.config.host, port = self.config.port, "Connecting to websocket");

            let attempt = tokio::select! {
                result = connect_async(url.as_str()) => result,
                () = wait_for_shutdown(&mut commands) => break,
            };

            let mut session = Session {
                socket_id: None,
                activity_timeout: self.config.activity_timeout(),
                requested: HashSet::new(),
            };
            let policy = match attempt {
                Ok((stream, _)) => {
                    tracing::debug!("WebSocket handshake completed");
                    let end = self.session(stream, &mut commands, &mut session).await;
                    self.shared.set_socket_id(None);
                    self.shared.registry.reset_subscriptions();
                    match end {
                        SessionEnd::Shutdown => break,
                        SessionEnd::Reconnect(policy) => policy,
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to connect to websocket server");
                    ReconnectPolicy::Backoff
                }
            };

            if session.socket_id.is_some() {
                backoff = self.config.reconnect_min();
            }

            match policy {
                ReconnectPolicy::Stop => {
                    tracing::error!("Server refused the connection, not reconnecting");
                    self.shared.set_state(ConnectionState::Failed);
                    return;
                }
                ReconnectPolicy::Immediate => {
                    tracing::info!("Reconnecting immediately");
                }
                ReconnectPolicy::Backoff => {
                    self.shared.set_state(ConnectionState::Unavailable);
                    tracing::info!(
                        delay_ms = millis(backoff),
                        "Reconnecting after backoff"
                    );
                    tokio::select! {
                        () = sleep(backoff) => {}
                        () = wait_for_shutdown(&mut commands) => break,
                    }
                    backoff = next_backoff(backoff, self.config.reconnect_max());
                }
            }
        }

        self.shared.set_state(ConnectionState::Disconnected);
        tracing::debug!("Connection task finished");
    }

    async fn session(
        &self,
        stream: WsStream,
        commands: &mut mpsc::UnboundedReceiver<Command>,
        session: &mut Session,
    ) -> SessionEnd {
        let (mut write, mut read) = stream.split();
        let mut deadline = Instant::now() + session.activity_timeout;
        let mut awaiting_pong = false;

        loop {
            tokio::select! {
                message = read.next() => {
                    let message = match message {
                        Some(Ok(message)) => message,
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "WebSocket read failed");
                            return SessionEnd::Reconnect(ReconnectPolicy::Backoff);
                        }
                        None => {
                            tracing::info!("WebSocket stream ended");
                            return SessionEnd::Reconnect(ReconnectPolicy::Backoff);
                        }
                    };
                    awaiting_pong = false;

                    match message {
                        Message::Text(text) => {
                            if let Err(e) = self.handle_frame(text.as_str(), &mut write, session).await {
                                tracing::warn!(error = %e, "Failed to handle frame");
                                if matches!(e, TransportError::WebSocket(_)) {
                                    return SessionEnd::Reconnect(ReconnectPolicy::Backoff);
                                }
                            }
                        }
                        Message::Ping(payload) => {
                            if write.send(Message::Pong(payload)).await.is_err() {
                                return SessionEnd::Reconnect(ReconnectPolicy::Backoff);
                            }
                        }
                        Message::Close(frame) => {
                            let code = frame.map(|f| u16::from(f.code));
                            tracing::info!(code = ?code, "Server closed the connection");
                            return SessionEnd::Reconnect(ReconnectPolicy::for_code(code));
                        }
                        _ => {}
                    }
                    deadline = Instant::now() + session.activity_timeout;
                }
                command = commands.recv() => {
                    let result = match command {
                        Some(Command::Subscribe(channel)) => {
                            self.subscribe(&channel, &mut write, session).await
                        }
                        Some(Command::Unsubscribe(channel)) => {
                            if session.requested.remove(&channel) {
                                send_text(&mut write, protocol::unsubscribe(&channel)).await
                            } else {
                                Ok(())
                            }
                        }
                        Some(Command::Shutdown) | None => {
                            let _ = write.send(Message::Close(None)).await;
                            return SessionEnd::Shutdown;
                        }
                    };
                    if let Err(e) = result {
                        tracing::warn!(error = %e, "Command failed");
                        if matches!(e, TransportError::WebSocket(_)) {
                            return SessionEnd::Reconnect(ReconnectPolicy::Backoff);
                        }
                    }
                }
                () = sleep_until(deadline) => {
                    if awaiting_pong {
                        tracing::warn!("No pong from server, reconnecting");
                        return SessionEnd::Reconnect(ReconnectPolicy::Backoff);
                    }
                    tracing::trace!("Sending ping");
                    if send_text(&mut write, protocol::ping()).await.is_err() {
                        return SessionEnd::Reconnect(ReconnectPolicy::Backoff);
                    }
                    awaiting_pong = true;
                    deadline = Instant::now() + self.config.pong_timeout();
                }
            }
        }
    }

    async fn handle_frame(
        &self,
        text: &str,
        write: &mut WsSink,
        session: &mut Session,
    ) -> Result<(), TransportError> {
        let frame = InboundFrame::parse(text)?;
        let registry = &self.shared.registry;

        match frame.event.as_str() {
            protocol::CONNECTION_ESTABLISHED => {
                let established: ConnectionEstablished = frame.data_as()?;
                if let Some(server_timeout) = established.activity_timeout {
                    session.activity_timeout = self
                        .config
                        .activity_timeout()
                        .min(Duration::from_secs(server_timeout));
                }
                tracing::info!(socket_id = %established.socket_id, "Connected");
                self.shared.set_socket_id(Some(established.socket_id.clone()));
                session.socket_id = Some(established.socket_id);
                self.shared.set_state(ConnectionState::Connected);

                for channel in registry.names() {
                    match self.subscribe(&channel, write, session).await {
                        Err(e @ TransportError::WebSocket(_)) => return Err(e),
                        Err(e) => tracing::warn!(channel = %channel, error = %e, "Resubscribe failed"),
                        Ok(()) => {}
                    }
                }
            }
            protocol::PING => send_text(write, protocol::pong()).await?,
            protocol::PONG => {}
            protocol::ERROR => {
                let error: ServerError = frame.data_as().unwrap_or(ServerError {
                    message: None,
                    code: None,
                });
                tracing::warn!(code = ?error.code, message = ?error.message, "Server reported an error");
            }
            protocol::INTERNAL_SUBSCRIPTION_SUCCEEDED => {
                if let Some(channel) = &frame.channel {
                    registry.set_subscribed(channel, true);
                    tracing::debug!(channel = %channel, "Subscription succeeded");
                    registry.route(channel, protocol::SUBSCRIPTION_SUCCEEDED, &frame.data);
                }
            }
            protocol::SUBSCRIPTION_ERROR => {
                tracing::warn!(channel = ?frame.channel, data = %frame.data, "Subscription rejected");
                if let Some(channel) = &frame.channel {
                    session.requested.remove(channel);
                    registry.route(channel, protocol::SUBSCRIPTION_ERROR, &frame.data);
                }
            }
            _ => match &frame.channel {
                Some(channel) => {
                    let delivered = registry.route(channel, &frame.event, &frame.data);
                    tracing::trace!(channel = %channel, event = %frame.event, delivered, "Event delivered");
                }
                None => tracing::debug!(event = %frame.event, "Ignoring frame without channel"),
            },
        }
        Ok(())
    }

    /// Sends `pusher:subscribe`, authorizing private channels first.
    ///
    /// Does nothing before the socket id is known, for channels that were
    /// left in the meantime, or when the subscribe already went out.
    async fn subscribe(
        &self,
        channel: &str,
        write: &mut WsSink,
        session: &mut Session,
    ) -> Result<(), TransportError> {
        let Some(socket_id) = session.socket_id.clone() else {
            return Ok(());
        };
        if session.requested.contains(channel) || !self.shared.registry.contains(channel) {
            return Ok(());
        }

        let auth = if requires_auth(channel) {
            let Some(authorizer) = &self.authorizer else {
                tracing::warn!(channel, "No authorizer configured for private channel");
                return Ok(());
            };
            match authorizer.authorize(&socket_id, channel).await {
                Ok(auth) => Some(auth),
                Err(e) => {
                    self.shared.registry.route(
                        channel,
                        protocol::SUBSCRIPTION_ERROR,
                        &json!({ "error": e.to_string() }),
                    );
                    return Err(e.into());
                }
            }
        } else {
            None
        };

        send_text(write, protocol::subscribe(channel, auth.as_ref())).await?;
        session.requested.insert(channel.to_string());
        tracing::debug!(channel, "Subscribe sent");
        Ok(())
    }
}
