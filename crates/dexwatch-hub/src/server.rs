//! HTTP and WebSocket server using axum.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use dexwatch_core::PollInterval;
use dexwatch_monitor::{Monitor, SubscriptionId};
use futures_util::stream::{SplitSink, StreamExt};
use futures_util::SinkExt;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::broadcast::relay_events;
use crate::config::HubConfig;
use crate::control::IntervalControl;
use crate::error::{HubError, HubResult};
use crate::gateway;
use crate::protocol::{views, ClientMessage, ServerMessage};
use crate::session::{ConnectionGuard, ConnectionLimiter, SessionRegistry};

/// Shared state for axum handlers.
#[derive(Clone)]
pub(crate) struct HubState {
    pub(crate) monitor: Monitor,
    broadcast_tx: broadcast::Sender<String>,
    control: Arc<IntervalControl>,
    sessions: Arc<SessionRegistry>,
    limiter: Arc<ConnectionLimiter>,
    config: HubConfig,
    shutdown: CancellationToken,
}

/// Broadcast hub bound to one monitor.
///
/// Dropping the hub detaches its relay from the monitor.
pub struct Hub {
    state: HubState,
    origin: HeaderValue,
    relay: SubscriptionId,
}

impl Hub {
    /// Create a hub. `active` is the interval the caller already started and
    /// hands over to the hub; the first `changeInterval` stops it.
    pub fn new(monitor: Monitor, config: HubConfig, active: Option<PollInterval>) -> HubResult<Self> {
        config.validate()?;
        let origin = config.cors_origin()?;

        let (broadcast_tx, _) = broadcast::channel::<String>(config.broadcast_capacity);
        let relay = relay_events(&monitor, broadcast_tx.clone());

        let state = HubState {
            control: Arc::new(IntervalControl::new(monitor.clone(), active)),
            monitor,
            broadcast_tx,
            sessions: Arc::new(SessionRegistry::new()),
            limiter: Arc::new(ConnectionLimiter::new(config.max_connections)),
            config,
            shutdown: CancellationToken::new(),
        };

        Ok(Self {
            state,
            origin,
            relay,
        })
    }

    /// Build the router.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(self.origin.clone())
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true);

        Router::new()
            .route("/health", get(gateway::health))
            .route("/api/transactions/{interval}", get(gateway::transactions))
            .route("/api/snapshot", get(gateway::snapshot))
            .route("/metrics", get(gateway::metrics))
            .route("/ws", get(ws_handler))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(self.state.clone())
    }

    /// Interval the hub currently owns.
    pub async fn active_interval(&self) -> Option<PollInterval> {
        self.state.control.current().await
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.state.sessions
    }

    /// Close every session and stop accepting connections.
    pub fn shutdown(&self) {
        self.state.shutdown.cancel();
    }

    /// Serve on an already bound listener until [`Hub::shutdown`].
    pub async fn serve(&self, listener: TcpListener) -> HubResult<()> {
        let addr = listener.local_addr()?;
        info!(%addr, frontend = %self.state.config.frontend_url, "Starting hub server");

        let shutdown = self.state.shutdown.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Hub server stopped");
        Ok(())
    }

    /// Bind the configured address and serve.
    pub async fn run(&self) -> HubResult<()> {
        let listener = TcpListener::bind(self.state.config.bind_addr()?).await?;
        self.serve(listener).await
    }
}

impl Drop for Hub {
    fn drop(&mut self) {
        self.state.monitor.unsubscribe(self.relay);
    }
}

/// WebSocket upgrade handler.
async fn ws_handler(State(state): State<HubState>, ws: WebSocketUpgrade) -> Response {
    let Some(guard) = state.limiter.try_acquire() else {
        warn!(
            current = state.limiter.current_count(),
            max = state.limiter.max(),
            "WebSocket connection limit reached"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
    };

    ws.on_upgrade(move |socket| handle_session(socket, state, guard))
}

type WsSender = SplitSink<WebSocket, Message>;

/// Drive one session until either side goes away.
async fn handle_session(socket: WebSocket, state: HubState, _guard: ConnectionGuard) {
    let session = state.sessions.register();
    let session_id = session.id;
    info!(%session_id, sessions = state.sessions.len(), "Session connected");

    let (mut sender, mut receiver) = socket.split();

    // Subscribe before reading the snapshot so no update falls in between.
    let mut broadcast_rx = state.broadcast_tx.subscribe();

    let initial = ServerMessage::Initial(views(&state.monitor.snapshot()));
    if send_message(&mut sender, &initial).await.is_err() {
        debug!(%session_id, "Failed to send initial snapshot, client disconnected");
        state.sessions.remove(session_id);
        return;
    }

    // Replies meant for this session only.
    let (direct_tx, mut direct_rx) = mpsc::channel::<ServerMessage>(state.config.session_queue);

    let control = Arc::clone(&state.control);
    let mut incoming_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            let reply = match result {
                Ok(Message::Text(text)) => handle_client_text(&control, session_id, text.as_str()).await,
                Ok(Message::Binary(_)) => ServerMessage::error("Binary frames are not supported"),
                Ok(Message::Close(_)) => {
                    debug!(%session_id, "Client sent close frame");
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    debug!(%session_id, error = %e, "WebSocket receive error");
                    break;
                }
            };
            if direct_tx.send(reply).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            result = broadcast_rx.recv() => match result {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        debug!(%session_id, "Failed to send broadcast, client disconnected");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(%session_id, skipped = n, "Session lagged, skipping to latest");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(%session_id, "Broadcast channel closed");
                    break;
                }
            },
            Some(reply) = direct_rx.recv() => {
                if send_message(&mut sender, &reply).await.is_err() {
                    debug!(%session_id, "Failed to send reply, client disconnected");
                    break;
                }
            }
            _ = &mut incoming_task => {
                debug!(%session_id, "Incoming task completed, closing session");
                break;
            }
            _ = state.shutdown.cancelled() => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    }

    incoming_task.abort();
    state.sessions.remove(session_id);
    info!(%session_id, sessions = state.sessions.len(), "Session disconnected");
}

/// Handle one text frame and produce the reply for its sender.
async fn handle_client_text(control: &IntervalControl, session_id: Uuid, text: &str) -> ServerMessage {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::ChangeInterval(requested)) => {
            info!(%session_id, requested = %requested, "Interval change requested");
            match control.change(&requested).await {
                Ok(interval) => ServerMessage::IntervalChanged(interval),
                Err(e) => {
                    warn!(%session_id, error = %e, "Rejected interval change");
                    ServerMessage::error(format!("Failed to change interval: {e}"))
                }
            }
        }
        Err(e) => {
            debug!(%session_id, error = %e, "Unrecognized client message");
            ServerMessage::error(format!("Unrecognized message: {e}"))
        }
    }
}

async fn send_message(sender: &mut WsSender, message: &ServerMessage) -> HubResult<()> {
    let json = message.to_json()?;
    sender
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| HubError::Send(e.to_string()))
}
