//! Connection bookkeeping for the game task
//!
//! This module tracks every live WebSocket connection on the server side:
//! - Id allocation, unique among live connections
//! - Capacity limits for new connections
//! - The `Connecting -> Joined -> Closed` lifecycle
//! - Fan-out of [`Outbound`] messages into per-connection queues
//!
//! Each connection owns a bounded outbound queue drained by its writer task.
//! Delivery never blocks the game task: a queue that is full or whose writer
//! is gone is reported back so the caller can drop that connection.

use crate::game::Outbound;
use log::{debug, info};
use shared::{Message, PlayerId};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Upgraded and registered, `Hello` not yet queued.
    Connecting,
    Joined,
    Closed,
}

impl ConnectionState {
    fn can_become(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Connecting, Joined) | (Connecting, Closed) | (Joined, Closed)
        )
    }
}

/// Why a message could not be queued for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryFailure {
    Overflow,
    Closed,
}

/// A live connection and the sending half of its outbound queue.
#[derive(Debug)]
pub struct Connection {
    pub id: PlayerId,
    pub addr: SocketAddr,
    pub state: ConnectionState,
    pub connected_at: Instant,
    outbound: mpsc::Sender<Message>,
}

impl Connection {
    pub fn new(id: PlayerId, addr: SocketAddr, outbound: mpsc::Sender<Message>) -> Self {
        Self {
            id,
            addr,
            state: ConnectionState::Connecting,
            connected_at: Instant::now(),
            outbound,
        }
    }

    /// Moves to `next` if the lifecycle allows it.
    pub fn transition(&mut self, next: ConnectionState) -> bool {
        if self.state.can_become(next) {
            self.state = next;
            true
        } else {
            false
        }
    }

    pub fn deliver(&self, message: Message) -> Result<(), DeliveryFailure> {
        self.outbound.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryFailure::Overflow,
            TrySendError::Closed(_) => DeliveryFailure::Closed,
        })
    }
}

pub struct ClientManager {
    connections: HashMap<PlayerId, Connection>,
    next_client_id: PlayerId,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            connections: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Registers a new connection, or returns `None` when the server is full.
    pub fn accept(
        &mut self,
        addr: SocketAddr,
        outbound: mpsc::Sender<Message>,
    ) -> Option<PlayerId> {
        if self.connections.len() >= self.max_clients {
            info!(
                "Rejecting {}: server full ({}/{})",
                addr,
                self.connections.len(),
                self.max_clients
            );
            return None;
        }

        let id = self.allocate_id();
        self.connections
            .insert(id, Connection::new(id, addr, outbound));
        info!("Client {} connected from {}", id, addr);
        Some(id)
    }

    // Ids wrap around and skip any that are still live.
    fn allocate_id(&mut self) -> PlayerId {
        loop {
            let id = self.next_client_id;
            self.next_client_id = self.next_client_id.wrapping_add(1);
            if !self.connections.contains_key(&id) {
                return id;
            }
        }
    }

    pub fn mark_joined(&mut self, id: PlayerId) -> bool {
        self.connections
            .get_mut(&id)
            .map_or(false, |c| c.transition(ConnectionState::Joined))
    }

    /// Removes the connection. Dropping the returned value drops its queue
    /// sender, which lets the writer task finish.
    pub fn close(&mut self, id: PlayerId) -> Option<Connection> {
        let mut connection = self.connections.remove(&id)?;
        connection.transition(ConnectionState::Closed);
        info!(
            "Client {} disconnected after {:.1}s",
            id,
            connection.connected_at.elapsed().as_secs_f32()
        );
        Some(connection)
    }

    pub fn state(&self, id: PlayerId) -> Option<ConnectionState> {
        self.connections.get(&id).map(|c| c.state)
    }

    pub fn joined_ids(&self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self
            .connections
            .values()
            .filter(|c| c.state == ConnectionState::Joined)
            .map(|c| c.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Queues every item in order and returns the ids whose queue could not
    /// take a message. A connection that fails once gets nothing further from
    /// this batch, so its stream never has gaps before it is dropped.
    pub fn dispatch(&self, outbound: Vec<Outbound>) -> Vec<PlayerId> {
        let mut failed = Vec::new();

        for item in outbound {
            match item {
                Outbound::Send { to, message } => {
                    if let Some(connection) = self.connections.get(&to) {
                        self.try_deliver(connection, message, &mut failed);
                    }
                }
                Outbound::Broadcast { message, exclude } => {
                    for connection in self.connections.values() {
                        if connection.state == ConnectionState::Joined
                            && Some(connection.id) != exclude
                        {
                            self.try_deliver(connection, message, &mut failed);
                        }
                    }
                }
            }
        }

        failed
    }

    fn try_deliver(&self, connection: &Connection, message: Message, failed: &mut Vec<PlayerId>) {
        if failed.contains(&connection.id) {
            return;
        }
        if let Err(reason) = connection.deliver(message) {
            debug!(
                "Could not queue {:?} for client {}: {:?}",
                message.kind(),
                connection.id,
                reason
            );
            failed.push(connection.id);
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
