//! Collision Detection
//!
//! Engulfment rules for players and collectibles. Everything here works on
//! snapshots; callers write the results back to the stores.
//!
//! A circle engulfs another when it is strictly larger and the smaller
//! centre lies within the radius difference. Comparisons are on squared
//! integer distances.

use crate::collectible::Collectible;
use crate::player::Player;
use arena_shared::config::WorldConfig;
use arena_shared::protocol::{DotId, PlayerId};
use std::collections::BTreeSet;

/// Outcome of a player-vs-player pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Collisions {
    /// Players that were eaten and must be removed
    pub eliminated: BTreeSet<PlayerId>,
    /// Players whose radius changed during the pass
    pub grown: BTreeSet<PlayerId>,
}

impl Collisions {
    pub fn is_empty(&self) -> bool {
        self.eliminated.is_empty()
    }

    pub fn merge(&mut self, other: Collisions) {
        self.eliminated.extend(other.eliminated);
        self.grown.extend(other.grown);
    }
}

#[inline]
fn engulfs(outer: (i32, i32, i32), inner: (i32, i32, i32)) -> bool {
    let (ox, oy, or) = outer;
    let (ix, iy, ir) = inner;
    if or <= ir {
        return false;
    }
    let dx = (ix - ox) as i64;
    let dy = (iy - oy) as i64;
    let reach = (or - ir) as i64;
    dx * dx + dy * dy <= reach * reach
}

/// Whether the player swallows the collectible.
pub fn collectible_collision(player: &Player, dot: &Collectible) -> bool {
    engulfs(
        (player.x, player.y, player.radius),
        (dot.x, dot.y, dot.radius),
    )
}

/// Whether either player swallows the other. Equal radii never collide.
pub fn player_collision(a: &Player, b: &Player) -> bool {
    let a_circle = (a.x, a.y, a.radius);
    let b_circle = (b.x, b.y, b.radius);
    engulfs(a_circle, b_circle) || engulfs(b_circle, a_circle)
}

/// Grow `player` by every collectible it engulfs in `dots`. Gains are summed
/// before being applied, so one pass uses the starting radius throughout.
/// Returns the consumed ids for the caller to respawn.
pub fn consume_collectibles(
    player: &mut Player,
    dots: &[Collectible],
    world: &WorldConfig,
) -> Vec<DotId> {
    let mut gain = 0;
    let mut consumed = Vec::new();
    for dot in dots {
        if collectible_collision(player, dot) {
            gain += world.growth_for(dot.radius);
            consumed.push(dot.id);
        }
    }
    player.radius += gain;
    consumed
}

/// Resolve one moving player against everyone else. Gains apply immediately;
/// the pass stops once the mover itself is eaten.
pub fn resolve_mover(mover: &mut Player, others: &mut [Player], world: &WorldConfig) -> Collisions {
    let mut result = Collisions::default();
    for other in others.iter_mut() {
        if other.id == mover.id {
            continue;
        }
        if !player_collision(mover, other) {
            continue;
        }
        if mover.radius > other.radius {
            mover.radius += world.growth_for(other.radius);
            result.grown.insert(mover.id);
            result.eliminated.insert(other.id);
        } else {
            other.radius += world.growth_for(mover.radius);
            result.grown.insert(other.id);
            result.eliminated.insert(mover.id);
            break;
        }
    }
    result
}

/// Resolve every pair once. An eliminated player neither eats nor is eaten
/// for the rest of the pass, so nobody is credited twice.
pub fn resolve_all_pairs(players: &mut [Player], world: &WorldConfig) -> Collisions {
    let mut result = Collisions::default();
    for i in 0..players.len() {
        for j in (i + 1)..players.len() {
            if result.eliminated.contains(&players[i].id) {
                break;
            }
            if result.eliminated.contains(&players[j].id) {
                continue;
            }
            if !player_collision(&players[i], &players[j]) {
                continue;
            }
            let (larger, smaller) = if players[i].radius > players[j].radius {
                (i, j)
            } else {
                (j, i)
            };
            let gain = world.growth_for(players[smaller].radius);
            players[larger].radius += gain;
            result.grown.insert(players[larger].id);
            result.eliminated.insert(players[smaller].id);
        }
    }
    result
}
