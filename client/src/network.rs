use crate::game::{ClientGameState, WorldView};
use crate::input::{InputEvent, InputState};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use shared::{Clock, LatencyTracker, Message, ProtocolError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite, MaybeTlsStream, WebSocketStream};

type WsMessage = tungstenite::Message;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("connection closed by server")]
    Closed,
    #[error("unexpected {0} frame from server")]
    UnexpectedFrame(&'static str),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Minimum time between two pings.
    pub ping_cooldown: Duration,
    /// How often the local world is advanced and published.
    pub frame_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ping_cooldown: Duration::from_millis(1000),
            frame_interval: Duration::from_millis(16),
        }
    }
}

/// One connection to the server and the world as this client sees it.
pub struct Client {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    config: ClientConfig,
    game_state: ClientGameState,
    input: InputState,
    latency: LatencyTracker,
    clock: Clock,
    view_tx: watch::Sender<WorldView>,
}

impl Client {
    pub async fn connect(url: &str, config: ClientConfig) -> Result<Self, ClientError> {
        let (ws, _response) = connect_async(url).await?;
        info!("Connected to {}", url);

        let (view_tx, _) = watch::channel(WorldView::default());
        Ok(Self {
            ws,
            latency: LatencyTracker::new(config.ping_cooldown),
            config,
            game_state: ClientGameState::new(),
            input: InputState::new(),
            clock: Clock::new(),
            view_tx,
        })
    }

    /// Receives a fresh [`WorldView`] after every frame.
    pub fn subscribe(&self) -> watch::Receiver<WorldView> {
        self.view_tx.subscribe()
    }

    pub fn game_state(&self) -> &ClientGameState {
        &self.game_state
    }

    pub fn latency_ms(&self) -> Option<f64> {
        self.latency.latency_ms()
    }

    /// Drives the connection until the server goes away or `inputs` is
    /// closed. Closing `inputs` is the normal way to disconnect. The socket is
    /// closed on every exit, including protocol violations by the server.
    pub async fn run(&mut self, inputs: mpsc::Receiver<InputEvent>) -> Result<(), ClientError> {
        let result = self.drive(inputs).await;
        match &result {
            Ok(()) => info!("Input closed, disconnecting"),
            Err(e) => warn!("Disconnecting: {}", e),
        }
        if let Err(e) = self.ws.close(None).await {
            debug!("Close handshake failed: {}", e);
        }
        result
    }

    async fn drive(&mut self, mut inputs: mpsc::Receiver<InputEvent>) -> Result<(), ClientError> {
        let mut frame_timer = interval(self.config.frame_interval);
        frame_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_frame = Instant::now();

        loop {
            tokio::select! {
                frame = self.ws.next() => match frame {
                    Some(Ok(WsMessage::Binary(bytes))) => self.handle_frame(&bytes)?,
                    Some(Ok(WsMessage::Text(_))) => return Err(ClientError::UnexpectedFrame("text")),
                    Some(Ok(WsMessage::Close(_))) | None => return Err(ClientError::Closed),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                },
                _ = frame_timer.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_frame).as_secs_f32();
                    last_frame = now;
                    self.frame(dt).await?;
                }
                event = inputs.recv() => match event {
                    Some(event) => {
                        if let Some(message) = self.input.apply(event) {
                            self.send(message).await?;
                        }
                    }
                    None => return Ok(()),
                },
            }
        }
    }

    fn handle_frame(&mut self, bytes: &[u8]) -> Result<(), ClientError> {
        let message = Message::decode(bytes).map_err(ProtocolError::from)?;
        match message {
            Message::Pong { timestamp } if self.game_state.is_joined() => {
                match self.latency.on_pong(timestamp, self.clock.now_ms()) {
                    Some(rtt) => debug!("Round trip {:.2} ms", rtt),
                    None => warn!("Ignoring pong for {} with no matching ping", timestamp),
                }
            }
            other => self.game_state.apply(other)?,
        }
        Ok(())
    }

    async fn frame(&mut self, dt: f32) -> Result<(), ClientError> {
        self.game_state.advance(dt);
        if self.game_state.is_joined() {
            if let Some(ping) = self.latency.poll(self.clock.now_ms()) {
                self.send(ping).await?;
            }
        }
        self.view_tx
            .send_replace(self.game_state.view(self.latency.latency_ms()));
        Ok(())
    }

    async fn send(&mut self, message: Message) -> Result<(), ClientError> {
        let bytes = message.encode().map_err(ProtocolError::from)?;
        self.ws.send(WsMessage::Binary(bytes)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.ping_cooldown, Duration::from_secs(1));
        assert_eq!(config.frame_interval, Duration::from_millis(16));
    }

    #[test]
    fn test_error_messages() {
        let protocol: ClientError = ProtocolError::DuplicateHello.into();
        assert_eq!(protocol.to_string(), ProtocolError::DuplicateHello.to_string());
        assert_eq!(
            ClientError::UnexpectedFrame("text").to_string(),
            "unexpected text frame from server"
        );
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Grab a free port and release it so nothing is listening there.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = Client::connect(&format!("ws://{}", addr), ClientConfig::default()).await;
        assert!(matches!(result, Err(ClientError::WebSocket(_))));
    }
}
