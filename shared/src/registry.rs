//! Player registry keyed by connection id.
//!
//! The registry itself does no locking. On the server it is owned by the game
//! task; on the client by the single client loop.

use crate::{Player, PlayerId};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct PlayerRegistry {
    players: HashMap<PlayerId, Player>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entry for `player.id`, returning the old one.
    pub fn upsert(&mut self, player: Player) -> Option<Player> {
        self.players.insert(player.id, player)
    }

    pub fn remove(&mut self, id: PlayerId) -> Option<Player> {
        self.players.remove(&id)
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn for_each<F: FnMut(&Player)>(&self, f: F) {
        self.players.values().for_each(f);
    }

    /// Runs the movement model on every player for one frame.
    pub fn advance_all(&mut self, dt: f32) {
        for player in self.players.values_mut() {
            player.advance(dt);
        }
    }

    /// Copies of every player, ordered by id.
    pub fn snapshot(&self) -> Vec<Player> {
        let mut players: Vec<Player> = self.players.values().copied().collect();
        players.sort_by_key(|p| p.id);
        players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
