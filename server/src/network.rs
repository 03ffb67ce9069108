//! Server network layer: WebSocket connections and the game loop task
//!
//! Connection tasks never touch game state. They decode frames, forward
//! requests to the [`GameLoop`] over a channel and drain their own outbound
//! queue into the socket. The game loop is the single owner of the player
//! registry and the connection table.

use crate::client_manager::ClientManager;
use crate::game::{GameState, Outbound};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{Direction, Message, PlayerId, ProtocolError, SERVER_FPS, SERVER_PORT};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_tungstenite::{accept_async, tungstenite};

type WsMessage = tungstenite::Message;

/// Capacity of the channel from connection tasks to the game loop.
const EVENT_QUEUE_CAPACITY: usize = 1024;

/// How long a closing connection may spend flushing its queue.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub tick_rate: u32,
    pub max_clients: usize,
    /// Per-connection outbound queue length before the peer is dropped.
    pub queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, SERVER_PORT)),
            tick_rate: SERVER_FPS,
            max_clients: 64,
            queue_capacity: 256,
        }
    }
}

impl ServerConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }
}

/// A decoded message a client is allowed to send.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClientRequest {
    Move { start: bool, direction: Direction },
    Ping { timestamp: f64 },
}

impl TryFrom<Message> for ClientRequest {
    type Error = ProtocolError;

    fn try_from(message: Message) -> Result<Self, Self::Error> {
        match message {
            Message::AmmaMoving { start, direction } => Ok(ClientRequest::Move { start, direction }),
            Message::Ping { timestamp } => Ok(ClientRequest::Ping { timestamp }),
            other => Err(ProtocolError::UnexpectedMessage { kind: other.kind() }),
        }
    }
}

/// Decodes a binary frame from a client.
pub fn parse_frame(bytes: &[u8]) -> Result<ClientRequest, ProtocolError> {
    ClientRequest::try_from(Message::decode(bytes)?)
}

/// Messages sent from connection tasks to the game loop
#[derive(Debug)]
pub enum ServerMessage {
    Connected {
        addr: SocketAddr,
        outbound: mpsc::Sender<Message>,
        /// Answered with the assigned id, or `None` when the server is full.
        reply: oneshot::Sender<Option<PlayerId>>,
    },
    Request {
        id: PlayerId,
        request: ClientRequest,
    },
    Disconnected {
        id: PlayerId,
    },
}

/// Listening socket plus the configuration the game loop is started with.
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        info!("Server listening on {}", listener.local_addr()?);
        Ok(Self { listener, config })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Runs the acceptor and the game loop until the event channel closes.
    pub async fn run(self) -> Result<(), ServerError> {
        let (server_tx, server_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);

        let acceptor = tokio::spawn(accept_connections(
            self.listener,
            server_tx,
            self.config.queue_capacity,
        ));

        let mut game_loop = GameLoop::new(&self.config);
        game_loop.run(server_rx).await;

        acceptor.abort();
        Ok(())
    }
}

async fn accept_connections(
    listener: TcpListener,
    server_tx: mpsc::Sender<ServerMessage>,
    queue_capacity: usize,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                debug!("TCP connection from {}", addr);
                let server_tx = server_tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, addr, server_tx, queue_capacity).await
                    {
                        warn!("Connection {} ended with error: {}", addr, e);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {}", e);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    server_tx: mpsc::Sender<ServerMessage>,
    queue_capacity: usize,
) -> Result<(), ServerError> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Message>(queue_capacity.max(1));
    let (reply_tx, reply_rx) = oneshot::channel();
    let connected = ServerMessage::Connected {
        addr,
        outbound: outbound_tx,
        reply: reply_tx,
    };
    if server_tx.send(connected).await.is_err() {
        return Ok(());
    }

    let id = match reply_rx.await {
        Ok(Some(id)) => id,
        _ => {
            // Full, or shutting down. Close without a Hello.
            let _ = ws_sender.close().await;
            return Ok(());
        }
    };

    let mut writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let bytes = match message.encode() {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!("Failed to encode {:?}: {}", message.kind(), e);
                    continue;
                }
            };
            if ws_sender.send(WsMessage::Binary(bytes)).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });
    let mut writer_done = false;

    loop {
        tokio::select! {
            frame = ws_receiver.next() => match frame {
                Some(Ok(WsMessage::Binary(bytes))) => match parse_frame(&bytes) {
                    Ok(request) => {
                        if server_tx.send(ServerMessage::Request { id, request }).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Protocol violation from client {}: {}", id, e);
                        break;
                    }
                },
                Some(Ok(WsMessage::Text(_))) => {
                    warn!("Protocol violation from client {}: text frame", id);
                    break;
                }
                Some(Ok(WsMessage::Close(_))) | None => break,
                // Transport-level ping/pong is answered by tungstenite.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Transport error from client {}: {}", id, e);
                    break;
                }
            },
            _ = &mut writer, if !writer_done => {
                writer_done = true;
                break;
            }
        }
    }

    // The game loop drops our queue sender on Disconnected, which lets the
    // writer flush what is left and send a close frame.
    let _ = server_tx.send(ServerMessage::Disconnected { id }).await;
    if !writer_done && timeout(CLOSE_GRACE, &mut writer).await.is_err() {
        writer.abort();
    }
    Ok(())
}

/// Single owner of all mutable server state.
pub struct GameLoop {
    clients: ClientManager,
    game_state: GameState,
    tick_duration: Duration,
    /// Ticks between stats lines, one second's worth.
    stats_every: u64,
    rng: StdRng,
}

impl GameLoop {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            clients: ClientManager::new(config.max_clients),
            game_state: GameState::new(),
            tick_duration: config.tick_duration(),
            stats_every: config.tick_rate.max(1) as u64,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn clients(&self) -> &ClientManager {
        &self.clients
    }

    pub fn game_state(&self) -> &GameState {
        &self.game_state
    }

    /// Main server loop: events and ticks, until every sender is gone.
    pub async fn run(&mut self, mut server_rx: mpsc::Receiver<ServerMessage>) {
        let mut tick_interval = interval(self.tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_tick = Instant::now();

        info!(
            "Game loop running at {:.0} Hz",
            1.0 / self.tick_duration.as_secs_f64()
        );

        loop {
            tokio::select! {
                message = server_rx.recv() => match message {
                    Some(message) => self.handle_message(message),
                    None => {
                        info!("Event channel closed, stopping game loop");
                        break;
                    }
                },
                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;
                    self.tick(dt);
                }
            }
        }
    }

    pub fn tick(&mut self, dt: f32) {
        self.game_state.step(dt);
        if self.stats_due() && !self.clients.is_empty() {
            debug!(
                "Tick {}: {} connections, {} players",
                self.game_state.tick,
                self.clients.len(),
                self.game_state.players().len()
            );
        }
    }

    fn stats_due(&self) -> bool {
        self.game_state.tick % self.stats_every == 0
    }

    pub fn handle_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Connected {
                addr,
                outbound,
                reply,
            } => {
                let id = self.clients.accept(addr, outbound);
                if let Some(id) = id {
                    let player = GameState::spawn(id, &mut self.rng);
                    self.clients.mark_joined(id);
                    let outbound = self.game_state.join(player);
                    self.deliver(outbound);
                }
                if reply.send(id).is_err() {
                    // Connection task went away before hearing back.
                    if let Some(id) = id {
                        self.disconnect(id);
                    }
                }
            }

            ServerMessage::Request { id, request } => match request {
                ClientRequest::Move { start, direction } => {
                    match self.game_state.set_moving(id, start, direction) {
                        Ok(outbound) => self.deliver(outbound),
                        Err(e) => {
                            warn!("Dropping move from client {}: {}", id, e);
                            self.disconnect(id);
                        }
                    }
                }
                ClientRequest::Ping { timestamp } => {
                    self.deliver(vec![Outbound::Send {
                        to: id,
                        message: Message::Pong { timestamp },
                    }]);
                }
            },

            ServerMessage::Disconnected { id } => self.disconnect(id),
        }
    }

    /// Queues `outbound` and drops every peer that could not keep up, which
    /// may in turn announce more departures.
    fn deliver(&mut self, outbound: Vec<Outbound>) {
        let mut pending = self.clients.dispatch(outbound);
        while let Some(id) = pending.pop() {
            warn!("Outbound queue for client {} full or closed, dropping it", id);
            pending.extend(self.close_and_announce(id));
        }
    }

    fn disconnect(&mut self, id: PlayerId) {
        let failed = self.close_and_announce(id);
        for id in failed {
            self.disconnect(id);
        }
    }

    fn close_and_announce(&mut self, id: PlayerId) -> Vec<PlayerId> {
        if self.clients.close(id).is_none() {
            return Vec::new();
        }
        let outbound = self.game_state.leave(id);
        self.clients.dispatch(outbound)
    }
}
