//! Protocol boundary: domain entities to wire types, and JSON in/out.

use crate::collectible::Collectible;
use crate::player::Player;
pub use arena_shared::protocol::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

impl From<&Player> for PlayerWire {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            x: player.x,
            y: player.y,
            speed: player.speed,
            radius: player.radius,
            colour: player.colour.clone(),
        }
    }
}

impl From<&Collectible> for DotWire {
    fn from(dot: &Collectible) -> Self {
        Self {
            id: dot.id,
            colour: dot.colour.clone(),
            radius: dot.radius,
            x: dot.x,
            y: dot.y,
        }
    }
}

pub fn roster(players: &HashMap<PlayerId, Player>) -> BTreeMap<PlayerId, PlayerWire> {
    players
        .iter()
        .map(|(id, player)| (*id, PlayerWire::from(player)))
        .collect()
}

pub fn dots<'a>(collectibles: impl IntoIterator<Item = &'a Collectible>) -> Vec<DotWire> {
    collectibles.into_iter().map(DotWire::from).collect()
}

pub fn decode_client_msg(text: &str) -> Result<ClientMsg, serde_json::Error> {
    serde_json::from_str(text)
}

/// Encode once so the same frame can be shared by every session.
pub fn encode(msg: &ServerMsg) -> Option<Arc<str>> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            tracing::error!("Failed to encode server message: {}", e);
            None
        }
    }
}
