use crate::player::Player;
use arena_shared::protocol::PlayerId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Thread-safe storage for live players keyed by id.
///
/// Readers always get copies, so broadcasting a snapshot never races a
/// writer.
pub struct PlayerStore {
    players: RwLock<HashMap<PlayerId, Player>>,
    next_id: AtomicU32,
    /// Bumped whenever membership changes
    generation: AtomicU64,
}

impl PlayerStore {
    pub fn new() -> Self {
        Self {
            players: RwLock::new(HashMap::new()),
            next_id: AtomicU32::new(1),
            generation: AtomicU64::new(0),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<PlayerId, Player>> {
        self.players.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<PlayerId, Player>> {
        self.players.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate an id that has never been handed out before.
    pub fn next_id(&self) -> PlayerId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Membership version. Changes on every add, remove or clear; in-place
    /// modifications leave it alone.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Add or replace a player.
    pub fn add(&self, player: Player) {
        self.write().insert(player.id, player);
        self.bump();
    }

    pub fn remove(&self, id: PlayerId) -> Option<Player> {
        let removed = self.write().remove(&id);
        if removed.is_some() {
            self.bump();
        }
        removed
    }

    pub fn get(&self, id: PlayerId) -> Option<Player> {
        self.read().get(&id).cloned()
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> HashMap<PlayerId, Player> {
        self.read().clone()
    }

    /// Copy of all players ordered by id, for deterministic collision passes.
    pub fn sorted(&self) -> Vec<Player> {
        let mut players: Vec<Player> = self.read().values().cloned().collect();
        players.sort_by_key(|p| p.id);
        players
    }

    /// Mutate a player in place. Does nothing (and returns `None`) if the
    /// player is gone, so a late write can never resurrect it.
    pub fn modify<R>(&self, id: PlayerId, f: impl FnOnce(&mut Player) -> R) -> Option<R> {
        self.write().get_mut(&id).map(f)
    }

    pub fn modify_all(&self, mut f: impl FnMut(&mut Player)) {
        for player in self.write().values_mut() {
            f(player);
        }
    }

    pub fn clear(&self) {
        self.write().clear();
        self.bump();
    }
}

impl Default for PlayerStore {
    fn default() -> Self {
        Self::new()
    }
}
