//! # Presence Server Library
//!
//! Authoritative server for the shared 2D presence world. Players connect
//! over WebSocket, receive their own avatar, learn about everyone else, and
//! send move intents. The server owns every position and relays intent
//! changes to all connected clients.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Each player's position is advanced every tick from its current move
//! intent using the movement model in `shared`. Clients run the same model
//! between updates, so the only thing that travels on the wire is a change of
//! intent together with the position it took effect at.
//!
//! ### Client Management
//! - Id assignment, unique among live connections
//! - Capacity limits
//! - The join handshake and its ordering guarantees
//! - Disconnect and overflow cleanup, announced exactly once
//!
//! ## Architecture Design
//!
//! ### Single Owner Game Loop
//! All mutable state lives in one [`network::GameLoop`] task. Connection
//! tasks talk to it over a bounded channel and receive their outbound
//! messages through a per-connection queue. Nothing is shared behind a lock.
//!
//! ### Binary WebSocket Frames
//! Every protocol message is one binary frame in the fixed little-endian
//! layout defined by `shared::codec`. Anything else a client sends ends its
//! connection.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The player registry, spawn rules, and the join/leave/move rules that
//! produce ordered [`game::Outbound`] messages.
//!
//! ### Client Manager Module (`client_manager`)
//! The connection table, lifecycle states, and non-blocking fan-out into
//! per-connection queues.
//!
//! ### Network Module (`network`)
//! Listener, per-connection reader and writer tasks, and the tick loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(ServerConfig::default()).await?;
//!     println!("listening on {}", server.local_addr()?);
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod game;
pub mod network;
