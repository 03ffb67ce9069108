//! # Presence Client Library
//!
//! Client half of the presence world: connects to the server over WebSocket,
//! keeps a local copy of every player, predicts their motion between
//! updates, and measures round-trip latency.
//!
//! ## Architecture Overview
//!
//! ### Intent-Based Synchronization
//! The server only sends a player's position when its move intent changes.
//! Between those updates the client advances every player with the shared
//! movement model, so both sides agree without a constant position stream.
//!
//! ### Single Cooperative Loop
//! [`network::Client::run`] multiplexes socket frames, a frame timer and an
//! input channel in one `tokio::select!`. Each inbound message is applied in
//! full before the next frame, so there is no locking anywhere.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The local player set, the rules for applying server messages, and the
//! [`game::WorldView`] snapshot.
//!
//! ### Input Module (`input`)
//! Held-direction tracking that only emits a message on a real change, and a
//! random wander source for headless runs.
//!
//! ### Network Module (`network`)
//! Connection setup, the client loop, latency probing and view publishing.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::input::InputEvent;
//! use client::network::{Client, ClientConfig};
//! use shared::Direction;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::connect("ws://127.0.0.1:6970", ClientConfig::default()).await?;
//!     let mut view = client.subscribe();
//!     let (inputs, input_rx) = mpsc::channel(16);
//!
//!     tokio::spawn(async move {
//!         let _ = inputs.send(InputEvent::press(Direction::Right)).await;
//!         while view.changed().await.is_ok() {
//!             let players = view.borrow().players.len();
//!             println!("{} players online", players);
//!         }
//!     });
//!
//!     client.run(input_rx).await?;
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod input;
pub mod network;
