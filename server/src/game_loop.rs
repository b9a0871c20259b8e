use crate::collectible::Collectible;
use crate::collision::{consume_collectibles, resolve_all_pairs, resolve_mover, Collisions};
use crate::player::Player;
use crate::protocol::{self, DotId, DotsMsg, MovementInput, PlayerId, ResetRoundMsg, ServerMsg};
use crate::state::World;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch};

/// Commands from sessions and bots to the game loop
#[derive(Debug, Clone)]
pub enum GameCommand {
    Input(MovementInput),
    /// Last player standing asks for a new round under a new profile.
    ResetRequest {
        player_id: PlayerId,
        name: String,
        colour: String,
    },
}

/// Tracks the most players seen at once during the current round.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoundTracker {
    max_players_seen: usize,
}

impl RoundTracker {
    pub fn observe(&mut self, count: usize) {
        self.max_players_seen = self.max_players_seen.max(count);
    }

    /// A round is over once it has had company and is down to one.
    pub fn should_reset(&self, count: usize) -> bool {
        self.max_players_seen >= 2 && count == 1
    }

    pub fn reset(&mut self) {
        self.max_players_seen = 0;
    }

    pub fn high_water_mark(&self) -> usize {
        self.max_players_seen
    }
}

/// What a single tick did
#[derive(Debug, Default)]
pub struct TickOutcome {
    pub eliminated: BTreeSet<PlayerId>,
    pub changed_collectibles: Vec<DotId>,
    pub round_reset: bool,
}

/// Owns the command queue and applies it to the world once per tick.
pub struct GameLoop {
    world: Arc<World>,
    commands: mpsc::Receiver<GameCommand>,
    round: RoundTracker,
    rng: ChaCha8Rng,
}

impl GameLoop {
    pub fn new(world: Arc<World>, commands: mpsc::Receiver<GameCommand>) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(world.config.rng_seed.wrapping_add(3));
        Self {
            world,
            commands,
            round: RoundTracker::default(),
            rng,
        }
    }

    pub fn round(&self) -> &RoundTracker {
        &self.round
    }

    /// Run one tick, logging instead of propagating a panic.
    pub fn run_tick(&mut self, now: Instant) -> Option<TickOutcome> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.tick(now))) {
            Ok(outcome) => Some(outcome),
            Err(_) => {
                tracing::error!("tick panicked; continuing with next tick");
                None
            }
        }
    }

    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let world = self.world.clone();
        let config = world.config.world;

        // Collectibles visible to this tick, kept current as they respawn.
        let mut dots = world.collectibles.snapshot();
        let mut changed: BTreeMap<DotId, Collectible> = world
            .collectibles
            .tick(now)
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
        for moved in changed.values() {
            replace_dot(&mut dots, moved.clone());
        }

        // Players visible to this tick, ordered by id. Refreshed only when
        // membership changes; positions and radii are kept current here.
        let mut generation = world.players.generation();
        let mut roster = world.players.sorted();

        let mut collisions = Collisions::default();
        let mut reset_requested = false;

        while let Ok(cmd) = self.commands.try_recv() {
            match cmd {
                GameCommand::Input(input) => {
                    if generation != world.players.generation() {
                        generation = world.players.generation();
                        roster = world.players.sorted();
                    }
                    let Some(idx) = roster.iter().position(|p| p.id == input.id) else {
                        continue;
                    };
                    let mut mover = roster.remove(idx);
                    mover.apply_input(&input, &config);

                    let result = resolve_mover(&mut mover, &mut roster, &config);
                    self.write_back(&roster, &result);
                    roster.retain(|p| !result.eliminated.contains(&p.id));
                    let mover_eaten = result.eliminated.contains(&mover.id);
                    collisions.merge(result);
                    if mover_eaten {
                        continue;
                    }

                    for id in consume_collectibles(&mut mover, &dots, &config) {
                        if let Some(fresh) = world.collectibles.respawn(id) {
                            replace_dot(&mut dots, fresh.clone());
                            changed.insert(id, fresh);
                        }
                    }
                    world.players.modify(mover.id, |p| {
                        p.x = mover.x;
                        p.y = mover.y;
                        p.radius = mover.radius;
                    });
                    let idx = roster.partition_point(|p| p.id < mover.id);
                    roster.insert(idx, mover);
                }
                GameCommand::ResetRequest {
                    player_id,
                    name,
                    colour,
                } => {
                    if world.players.len() == 1 && world.players.contains(player_id) {
                        world
                            .players
                            .modify(player_id, |p| p.apply_profile(&name, &colour));
                        reset_requested = true;
                    } else {
                        tracing::debug!(player_id, "reset request ignored; not the last player");
                    }
                }
            }
        }

        if generation != world.players.generation() {
            roster = world.players.sorted();
        }
        let passive = resolve_all_pairs(&mut roster, &config);
        self.write_back(&roster, &passive);
        collisions.merge(passive);

        let count = world.players.len();
        self.round.observe(count);

        let round_reset = reset_requested || self.round.should_reset(count);
        if round_reset {
            self.reset_round();
        } else {
            world.broadcast_roster();
            if !changed.is_empty() {
                world.broadcast(&ServerMsg::UpdateDots(DotsMsg {
                    dots: protocol::dots(changed.values()),
                }));
            }
        }

        for &id in &collisions.eliminated {
            world.notify_eliminated(id);
        }

        TickOutcome {
            eliminated: collisions.eliminated,
            changed_collectibles: changed.into_keys().collect(),
            round_reset,
        }
    }

    /// Remove eaten players and store the new radii of the winners.
    fn write_back(&self, players: &[Player], result: &Collisions) {
        for &id in &result.eliminated {
            self.world.players.remove(id);
        }
        for player in players {
            if result.grown.contains(&player.id) && !result.eliminated.contains(&player.id) {
                let radius = player.radius;
                self.world.players.modify(player.id, |p| p.radius = radius);
            }
        }
    }

    /// Start a new round: fresh collectibles, every survivor back to default
    /// size at a new spot, a fresh bot population.
    pub fn reset_round(&mut self) {
        let world = self.world.clone();
        let pool = world.collectibles.reset_all();
        world.bots.reset_bots(&world.players);
        let rng = &mut self.rng;
        world
            .players
            .modify_all(|p| p.reset_for_new_round(&world.config.world, &mut *rng));
        self.round.reset();

        world.broadcast_roster();
        world.broadcast(&ServerMsg::UpdateDots(DotsMsg {
            dots: protocol::dots(&pool),
        }));
        world.broadcast(&ServerMsg::ResetRound(ResetRoundMsg::default()));
        tracing::info!(players = world.players.len(), "round reset");
    }
}

fn replace_dot(dots: &mut [Collectible], fresh: Collectible) {
    if let Some(slot) = dots.iter_mut().find(|d| d.id == fresh.id) {
        *slot = fresh;
    }
}

/// Run the fixed-rate game loop until shutdown is signalled.
pub async fn run_game_loop(mut game: GameLoop, mut shutdown: watch::Receiver<bool>) {
    let tick_duration = game.world.config.tick_duration();
    let mut tick_interval = tokio::time::interval(tick_duration);
    tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                game.run_tick(Instant::now());
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    tracing::info!("Game loop ended");
}

/// Drive the bot population: sleep a random pass delay, then queue one input
/// per live bot.
pub async fn run_bots(world: Arc<World>, mut shutdown: watch::Receiver<bool>) {
    loop {
        let delay = world.bots.next_delay();
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
        for input in world.bots.step(&world.players) {
            world.submit(GameCommand::Input(input));
        }
    }

    tracing::info!("Bot scheduler ended");
}
