//! Collectible dots and the fixed-size pool that owns them.
//!
//! Dots are never removed. Consuming one, or the periodic refresh, moves it to
//! a new random spot under the same id.

use crate::config::CollectibleConfig;
use crate::player::random_position;
use arena_shared::config::{WorldConfig, DOT_COLOURS};
use arena_shared::protocol::DotId;
use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub struct Collectible {
    pub id: DotId,
    pub x: i32,
    pub y: i32,
    pub radius: i32,
    pub colour: String,
}

impl Collectible {
    fn spawn(id: DotId, world: &WorldConfig, rng: &mut impl Rng) -> Self {
        let (x, y) = random_position(world, rng);
        Self {
            id,
            x,
            y,
            radius: world.dot_radius,
            colour: DOT_COLOURS
                .choose(rng)
                .copied()
                .unwrap_or(DOT_COLOURS[0])
                .to_string(),
        }
    }
}

struct Pool {
    /// Indexed by id
    dots: Vec<Collectible>,
    last_refresh: Option<Instant>,
    rng: ChaCha8Rng,
}

impl Pool {
    fn fill(&mut self, size: usize, world: &WorldConfig) {
        self.dots = (0..size as DotId)
            .map(|id| Collectible::spawn(id, world, &mut self.rng))
            .collect();
        self.last_refresh = None;
    }

    fn respawn(&mut self, id: DotId, world: &WorldConfig) -> Option<Collectible> {
        let slot = self.dots.get_mut(id as usize)?;
        *slot = Collectible::spawn(id, world, &mut self.rng);
        Some(slot.clone())
    }
}

/// Thread-safe pool of collectibles keyed by id
pub struct CollectibleStore {
    config: CollectibleConfig,
    world: WorldConfig,
    pool: RwLock<Pool>,
}

impl CollectibleStore {
    pub fn new(config: CollectibleConfig, world: WorldConfig, rng: ChaCha8Rng) -> Self {
        let mut pool = Pool {
            dots: Vec::new(),
            last_refresh: None,
            rng,
        };
        pool.fill(config.pool_size, &world);
        Self {
            config,
            world,
            pool: RwLock::new(pool),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Pool> {
        self.pool.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Pool> {
        self.pool.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.read().dots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every collectible, ordered by id.
    pub fn snapshot(&self) -> Vec<Collectible> {
        self.read().dots.clone()
    }

    pub fn get(&self, id: DotId) -> Option<Collectible> {
        self.read().dots.get(id as usize).cloned()
    }

    /// Move one collectible to a new random position, keeping its id.
    pub fn respawn(&self, id: DotId) -> Option<Collectible> {
        self.write().respawn(id, &self.world)
    }

    pub fn needs_refresh(&self, now: Instant) -> bool {
        needs_refresh(self.read().last_refresh, now, &self.config)
    }

    /// Teleport `refresh_count` random collectibles once the refresh interval
    /// has elapsed. Returns the moved collectibles, or nothing if it is not
    /// time yet.
    pub fn tick(&self, now: Instant) -> Vec<Collectible> {
        let mut pool = self.write();
        if !needs_refresh(pool.last_refresh, now, &self.config) {
            return Vec::new();
        }
        pool.last_refresh = Some(now);

        let count = self.config.refresh_count.min(pool.dots.len());
        let ids = (0..pool.dots.len() as DotId).choose_multiple(&mut pool.rng, count);
        ids.into_iter()
            .filter_map(|id| pool.respawn(id, &self.world))
            .collect()
    }

    /// Rebuild the whole pool for a new round and return it.
    pub fn reset_all(&self) -> Vec<Collectible> {
        let mut pool = self.write();
        pool.fill(self.config.pool_size, &self.world);
        pool.dots.clone()
    }
}

fn needs_refresh(last: Option<Instant>, now: Instant, config: &CollectibleConfig) -> bool {
    match last {
        None => true,
        Some(last) => now.saturating_duration_since(last) >= config.refresh_interval,
    }
}
