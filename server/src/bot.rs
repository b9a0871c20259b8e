//! Bot players that keep the arena populated.
//!
//! Bots are lightweight state machines that:
//! - Hold one of eight headings for a random number of passes
//! - Emit that heading as a `MovementInput` each pass
//! - Disappear from the roster once their player has been eaten
//!
//! Bots never touch player positions themselves. Their inputs go through the
//! same command queue as human input and are applied by the game loop.

use crate::config::BotConfig;
use crate::player::Player;
use crate::store::PlayerStore;
use arena_shared::config::WorldConfig;
use arena_shared::protocol::{MovementInput, PlayerId};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// One of the eight key combinations a bot can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    Up,
    Left,
    Down,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl Heading {
    pub const ALL: [Heading; 8] = [
        Heading::Up,
        Heading::Left,
        Heading::Down,
        Heading::Right,
        Heading::UpLeft,
        Heading::UpRight,
        Heading::DownLeft,
        Heading::DownRight,
    ];

    pub fn random(rng: &mut impl Rng) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    pub fn to_input(self, id: PlayerId) -> MovementInput {
        let (w, a, s, d) = match self {
            Heading::Up => (true, false, false, false),
            Heading::Left => (false, true, false, false),
            Heading::Down => (false, false, true, false),
            Heading::Right => (false, false, false, true),
            Heading::UpLeft => (true, true, false, false),
            Heading::UpRight => (true, false, false, true),
            Heading::DownLeft => (false, true, true, false),
            Heading::DownRight => (false, false, true, true),
        };
        MovementInput { id, w, a, s, d }
    }
}

/// A bot and its current heading
#[derive(Debug, Clone)]
pub struct BotPlayer {
    /// The player ID (same as in the player store)
    pub player_id: PlayerId,
    pub heading: Heading,
    /// Passes left before a new heading is drawn
    pub remaining_steps: u32,
}

impl BotPlayer {
    pub fn new(player_id: PlayerId, rng: &mut impl Rng) -> Self {
        Self {
            player_id,
            heading: Heading::random(rng),
            // Draw a real hold on the first pass.
            remaining_steps: 0,
        }
    }

    /// Advance one pass and return the input to submit.
    pub fn step(&mut self, config: &BotConfig, rng: &mut impl Rng) -> MovementInput {
        if self.remaining_steps == 0 {
            self.heading = Heading::random(rng);
            self.remaining_steps = hold_steps(config, rng);
        }
        self.remaining_steps -= 1;
        self.heading.to_input(self.player_id)
    }
}

/// Number of passes a freshly drawn heading is held for.
fn hold_steps(config: &BotConfig, rng: &mut impl Rng) -> u32 {
    let min = config.min_hold.as_millis() as u64;
    let max = config.max_hold.as_millis() as u64;
    let hold = rng.gen_range(min..=max);
    let avg = (config.average_step_delay().as_millis() as u64).max(1);
    (hold / avg).max(1) as u32
}

struct Roster {
    bots: Vec<BotPlayer>,
    rng: ChaCha8Rng,
}

/// Manages all bot players. Shared between the bot task and the round
/// lifecycle, so the roster sits behind a mutex.
pub struct BotManager {
    config: BotConfig,
    world: WorldConfig,
    roster: Mutex<Roster>,
}

impl BotManager {
    pub fn new(config: BotConfig, world: WorldConfig, rng: ChaCha8Rng) -> Self {
        Self {
            config,
            world,
            roster: Mutex::new(Roster {
                bots: Vec::new(),
                rng,
            }),
        }
    }

    fn roster(&self) -> MutexGuard<'_, Roster> {
        self.roster.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove every tracked bot from the store and spawn a fresh population.
    pub fn reset_bots(&self, players: &PlayerStore) {
        let mut roster = self.roster();
        for bot in roster.bots.drain(..) {
            players.remove(bot.player_id);
        }

        let mut fresh = Vec::with_capacity(self.config.count);
        for _ in 0..self.config.count {
            let id = players.next_id();
            let mut player = Player::spawn(id, &self.world, &mut roster.rng);
            player.name = format!("bot-{}", id);
            players.add(player);
            fresh.push(BotPlayer::new(id, &mut roster.rng));
        }
        roster.bots = fresh;
        tracing::info!(count = self.config.count, "bot population reset");
    }

    /// One scheduler pass: drop bots whose player is gone, then produce an
    /// input for each survivor.
    pub fn step(&self, players: &PlayerStore) -> Vec<MovementInput> {
        let mut roster = self.roster();
        let before = roster.bots.len();
        roster.bots.retain(|b| players.contains(b.player_id));
        let pruned = before - roster.bots.len();
        if pruned > 0 {
            tracing::debug!(pruned, "pruned eliminated bots");
        }

        let Roster { bots, rng } = &mut *roster;
        bots.iter_mut()
            .map(|bot| bot.step(&self.config, rng))
            .collect()
    }

    /// Random pause before the next pass.
    pub fn next_delay(&self) -> Duration {
        let min = self.config.min_step_delay;
        let max = self.config.max_step_delay;
        let mut roster = self.roster();
        roster.rng.gen_range(min..=max)
    }

    /// Check if a player ID belongs to a bot
    pub fn is_bot(&self, player_id: PlayerId) -> bool {
        self.roster().bots.iter().any(|b| b.player_id == player_id)
    }

    pub fn bot_count(&self) -> usize {
        self.roster().bots.len()
    }

    pub fn bot_ids(&self) -> Vec<PlayerId> {
        self.roster().bots.iter().map(|b| b.player_id).collect()
    }
}
