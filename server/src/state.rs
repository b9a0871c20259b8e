use crate::bot::BotManager;
use crate::collectible::CollectibleStore;
use crate::config::ServerConfig;
use crate::game_loop::GameCommand;
use crate::player::Player;
use crate::protocol::{
    self, ClientMsg, DotsMsg, EliminatedMsg, InitPlayerMsg, PlayerId, PlayerWire, PlayersMsg,
    ServerMsg,
};
use crate::session::{DeferredCloses, SessionHandle, SessionRegistry};
use crate::store::PlayerStore;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// The simulation context: every store, the bot population and the inbound
/// command queue. One per process, shared by the game loop, the bot task and
/// the session transport.
pub struct World {
    pub config: ServerConfig,
    pub players: PlayerStore,
    pub collectibles: CollectibleStore,
    pub sessions: SessionRegistry,
    pub bots: BotManager,
    pub closes: DeferredCloses,
    commands: mpsc::Sender<GameCommand>,
    spawn_rng: Mutex<ChaCha8Rng>,
}

impl World {
    /// Build the world and its initial bot population. The receiver is the
    /// game loop's end of the command queue.
    pub fn new(config: ServerConfig) -> (Arc<World>, mpsc::Receiver<GameCommand>) {
        let (tx, rx) = mpsc::channel(config.input_queue_capacity);
        let seed = config.rng_seed;

        let world = World {
            players: PlayerStore::new(),
            collectibles: CollectibleStore::new(
                config.collectibles.clone(),
                config.world,
                ChaCha8Rng::seed_from_u64(seed.wrapping_add(1)),
            ),
            sessions: SessionRegistry::new(),
            bots: BotManager::new(
                config.bots.clone(),
                config.world,
                ChaCha8Rng::seed_from_u64(seed.wrapping_add(2)),
            ),
            closes: DeferredCloses::new(),
            commands: tx,
            spawn_rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
            config,
        };
        world.bots.reset_bots(&world.players);
        (Arc::new(world), rx)
    }

    /// Queue a command for the next tick. Never blocks; a full queue drops
    /// the command.
    pub fn submit(&self, cmd: GameCommand) -> bool {
        match self.commands.try_send(cmd) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("input queue full, dropping command");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Create a player for a new session, send it the initial state, then
    /// register the session for broadcasts.
    pub fn connect(&self, session: SessionHandle) -> Player {
        let id = self.players.next_id();
        let player = {
            let mut rng = self.spawn_rng.lock().unwrap_or_else(PoisonError::into_inner);
            Player::spawn(id, &self.config.world, &mut *rng)
        };
        self.players.add(player.clone());
        self.send_initial_state(&session, &player);
        self.register_session(id, session);
        tracing::info!(player_id = id, "player connected");
        player
    }

    /// Make a session visible to broadcasts. A tick may already have eaten its
    /// player while the initial state was being queued; such a session is
    /// told so and closed instead of lingering without a player.
    pub fn register_session(&self, id: PlayerId, session: SessionHandle) {
        self.sessions.add(id, session);
        if !self.players.contains(id) {
            self.notify_eliminated(id);
        }
    }

    /// Unregister an eaten player's session, send it `Eliminated` and schedule
    /// the close. No-op if the session is already gone.
    pub fn notify_eliminated(&self, id: PlayerId) {
        let Some(session) = self.sessions.remove(id) else {
            return;
        };
        let notice = ServerMsg::Eliminated(EliminatedMsg { player_id: id });
        if let Some(text) = protocol::encode(&notice) {
            session.send_text(text);
        }
        self.closes
            .schedule(id, session, self.config.elimination_close_delay);
        tracing::info!(player_id = id, "player eliminated");
    }

    /// `InitPlayer`, `InitPlayers`, `InitDots`, in that order.
    pub fn send_initial_state(&self, session: &SessionHandle, player: &Player) {
        let messages = [
            ServerMsg::InitPlayer(InitPlayerMsg {
                player: PlayerWire::from(player),
            }),
            ServerMsg::InitPlayers(PlayersMsg {
                players: protocol::roster(&self.players.snapshot()),
            }),
            ServerMsg::InitDots(DotsMsg {
                dots: protocol::dots(&self.collectibles.snapshot()),
            }),
        ];
        for msg in &messages {
            if let Some(text) = protocol::encode(msg) {
                session.send_text(text);
            }
        }
    }

    /// Dispatch a decoded message from the session bound to `player_id`.
    pub fn handle_client_msg(&self, player_id: PlayerId, msg: ClientMsg) {
        match msg {
            ClientMsg::Input(input) => {
                if input.id != player_id {
                    tracing::warn!(
                        player_id,
                        claimed = input.id,
                        "input for another player; ignoring"
                    );
                    return;
                }
                self.submit(GameCommand::Input(input));
            }
            ClientMsg::InitConfig(config) => {
                if self.configure_player(player_id, &config.name, &config.colour) {
                    self.broadcast_roster();
                }
            }
            ClientMsg::Reset(config) => {
                self.submit(GameCommand::ResetRequest {
                    player_id,
                    name: config.name,
                    colour: config.colour,
                });
            }
        }
    }

    /// Decode a raw text frame and dispatch it. Malformed payloads are logged
    /// and dropped.
    pub fn handle_text(&self, player_id: PlayerId, text: &str) {
        match protocol::decode_client_msg(text) {
            Ok(msg) => self.handle_client_msg(player_id, msg),
            Err(e) => tracing::warn!(player_id, error = %e, "invalid payload; ignoring"),
        }
    }

    /// Apply name and colour. Returns false if the player no longer exists.
    pub fn configure_player(&self, id: PlayerId, name: &str, colour: &str) -> bool {
        self.players
            .modify(id, |p| p.apply_profile(name, colour))
            .is_some()
    }

    /// Forget a closed session and its player, then tell everyone.
    pub fn disconnect(&self, id: PlayerId) {
        self.closes.cancel(id);
        self.sessions.remove(id);
        self.players.remove(id);
        self.broadcast_roster();
        tracing::info!(player_id = id, "player disconnected");
    }

    pub fn broadcast(&self, msg: &ServerMsg) {
        let Some(text) = protocol::encode(msg) else {
            return;
        };
        for (id, session) in self.sessions.all() {
            if !session.send_text(text.clone()) {
                tracing::debug!(player_id = id, "frame not delivered");
            }
        }
    }

    pub fn broadcast_roster(&self) {
        self.broadcast(&ServerMsg::UpdatePlayers(PlayersMsg {
            players: protocol::roster(&self.players.snapshot()),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Outbound, SessionOutbox};

    fn quiet_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.bots.count = 0;
        config.collectibles.pool_size = 4;
        config.collectibles.refresh_count = 2;
        config
    }

    fn drain(outbox: &mut SessionOutbox) -> Vec<serde_json::Value> {
        let mut frames = Vec::new();
        while let Some(Outbound::Text(text)) = outbox.try_next() {
            frames.push(serde_json::from_str(&text).unwrap());
        }
        frames
    }

    #[test]
    fn new_world_spawns_bots() {
        let mut config = quiet_config();
        config.bots.count = 6;
        let (world, _rx) = World::new(config);
        assert_eq!(world.players.len(), 6);
        assert_eq!(world.bots.bot_count(), 6);
        assert_eq!(world.collectibles.len(), 4);
    }

    #[test]
    fn connect_sends_initial_state_in_order() {
        let (world, _rx) = World::new(quiet_config());
        let (handle, mut outbox) = SessionHandle::channel(16);
        let player = world.connect(handle);

        let frames = drain(&mut outbox);
        let types: Vec<&str> = frames.iter().map(|f| f["type"].as_str().unwrap()).collect();
        assert_eq!(types, vec!["InitPlayer", "InitPlayers", "InitDots"]);
        assert_eq!(frames[0]["player"]["id"], player.id);
        assert!(frames[1]["players"].get(player.id.to_string()).is_some());
        assert_eq!(frames[2]["dots"].as_array().unwrap().len(), 4);

        assert!(world.players.contains(player.id));
        assert!(world.sessions.get(player.id).is_some());
    }

    #[test]
    fn init_config_updates_and_broadcasts() {
        let (world, _rx) = World::new(quiet_config());
        let (handle, mut outbox) = SessionHandle::channel(16);
        let player = world.connect(handle);
        drain(&mut outbox);

        world.handle_text(
            player.id,
            r##"{"type":"InitConfig","name":"  Alex ","colour":"#2979FF"}"##,
        );

        let stored = world.players.get(player.id).unwrap();
        assert_eq!(stored.name, "Alex");
        assert_eq!(stored.colour, "#2979FF");
        let frames = drain(&mut outbox);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "UpdatePlayers");
        assert_eq!(frames[0]["players"][player.id.to_string()]["name"], "Alex");
    }

    #[test]
    fn malformed_payload_is_dropped() {
        let (world, mut rx) = World::new(quiet_config());
        let (handle, mut outbox) = SessionHandle::channel(16);
        let player = world.connect(handle);
        drain(&mut outbox);

        world.handle_text(player.id, "{bad json}");
        world.handle_text(player.id, r#"{"type":"fly"}"#);

        assert!(rx.try_recv().is_err());
        assert!(drain(&mut outbox).is_empty());
        assert!(world.players.contains(player.id));
    }

    #[test]
    fn input_is_queued_for_own_player_only() {
        let (world, mut rx) = World::new(quiet_config());
        let (handle, _outbox) = SessionHandle::channel(16);
        let player = world.connect(handle);

        let own = format!(
            r#"{{"type":"input","id":{},"w":true,"a":false,"s":false,"d":false}}"#,
            player.id
        );
        let other = r#"{"type":"input","id":999,"w":true,"a":false,"s":false,"d":false}"#;
        world.handle_text(player.id, &own);
        world.handle_text(player.id, other);

        match rx.try_recv() {
            Ok(GameCommand::Input(input)) => assert_eq!(input.id, player.id),
            _ => panic!("Expected queued input"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn disconnect_removes_and_rebroadcasts() {
        let (world, _rx) = World::new(quiet_config());
        let (h1, _o1) = SessionHandle::channel(16);
        let (h2, mut o2) = SessionHandle::channel(16);
        let p1 = world.connect(h1);
        let _p2 = world.connect(h2);
        drain(&mut o2);

        world.disconnect(p1.id);

        assert!(!world.players.contains(p1.id));
        assert!(world.sessions.get(p1.id).is_none());
        let frames = drain(&mut o2);
        assert_eq!(frames.len(), 1);
        assert!(frames[0]["players"].get(p1.id.to_string()).is_none());
    }

    #[test]
    fn session_without_player_is_closed_on_register() {
        let mut config = quiet_config();
        config.elimination_close_delay = std::time::Duration::ZERO;
        let (world, _rx) = World::new(config);
        let (handle, mut outbox) = SessionHandle::channel(16);

        world.register_session(77, handle);

        assert!(world.sessions.get(77).is_none());
        match outbox.try_next() {
            Some(Outbound::Text(text)) => {
                let frame: serde_json::Value = serde_json::from_str(&text).unwrap();
                assert_eq!(frame["type"], "Eliminated");
                assert_eq!(frame["playerId"], 77);
            }
            other => panic!("Expected Eliminated, got {:?}", other),
        }
        assert_eq!(outbox.try_next(), Some(Outbound::Close));
    }

    #[test]
    fn notify_eliminated_is_idempotent() {
        let mut config = quiet_config();
        config.elimination_close_delay = std::time::Duration::ZERO;
        let (world, _rx) = World::new(config);
        let (handle, mut outbox) = SessionHandle::channel(16);
        let player = world.connect(handle);
        drain(&mut outbox);

        world.players.remove(player.id);
        world.notify_eliminated(player.id);
        world.notify_eliminated(player.id);

        assert_eq!(drain(&mut outbox).len(), 1);
        assert_eq!(outbox.try_next(), None);
    }

    #[test]
    fn full_queue_drops_commands() {
        let mut config = quiet_config();
        config.input_queue_capacity = 1;
        let (world, _rx) = World::new(config);
        let input = crate::protocol::MovementInput::default();
        assert!(world.submit(GameCommand::Input(input)));
        assert!(!world.submit(GameCommand::Input(input)));
    }
}
