use arena_shared::config::WorldConfig;
use std::env;
use std::time::Duration;

/// Collectible pool configuration
#[derive(Debug, Clone)]
pub struct CollectibleConfig {
    pub pool_size: usize,
    /// Minimum time between periodic refreshes
    pub refresh_interval: Duration,
    /// Number of dots teleported per refresh
    pub refresh_count: usize,
}

impl Default for CollectibleConfig {
    fn default() -> Self {
        Self {
            pool_size: 750,
            refresh_interval: Duration::from_secs(20),
            refresh_count: 5,
        }
    }
}

/// Bot population configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub count: usize,
    /// Bounds of the random pause between bot passes
    pub min_step_delay: Duration,
    pub max_step_delay: Duration,
    /// Bounds of how long a bot keeps one heading
    pub min_hold: Duration,
    pub max_hold: Duration,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            count: 100,
            min_step_delay: Duration::from_millis(5),
            max_step_delay: Duration::from_millis(15),
            min_hold: Duration::from_millis(1000),
            max_hold: Duration::from_millis(3000),
        }
    }
}

impl BotConfig {
    pub fn average_step_delay(&self) -> Duration {
        (self.min_step_delay + self.max_step_delay) / 2
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub tick_rate_hz: u32,
    pub rng_seed: u64,
    pub input_queue_capacity: usize,
    /// Outbound frames buffered per session before frames are dropped
    pub session_queue_capacity: usize,
    /// Time an eliminated session stays open after its notice
    pub elimination_close_delay: Duration,
    pub world: WorldConfig,
    pub collectibles: CollectibleConfig,
    pub bots: BotConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            tick_rate_hz: 128,
            rng_seed: 42,
            input_queue_capacity: 4096,
            session_queue_capacity: 256,
            elimination_close_delay: Duration::from_secs(3),
            world: WorldConfig::default(),
            collectibles: CollectibleConfig::default(),
            bots: BotConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults overlaid with `ARENA_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = env::var("ARENA_LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Some(seed) = env_parse("ARENA_RNG_SEED") {
            config.rng_seed = seed;
        }
        if let Some(count) = env_parse("ARENA_BOT_COUNT") {
            config.bots.count = count;
        }
        if let Some(hz) = env_parse("ARENA_TICK_RATE_HZ") {
            config.tick_rate_hz = hz;
        }
        config
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz as f64)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.world.validate()?;
        if self.tick_rate_hz == 0 {
            return Err("tick_rate_hz must be > 0".to_string());
        }
        if self.input_queue_capacity == 0 || self.session_queue_capacity == 0 {
            return Err("queue capacities must be > 0".to_string());
        }
        if self.collectibles.refresh_count > self.collectibles.pool_size {
            return Err("collectibles.refresh_count must be <= pool_size".to_string());
        }
        if self.bots.min_step_delay > self.bots.max_step_delay {
            return Err("bots.min_step_delay must be <= max_step_delay".to_string());
        }
        if self.bots.max_step_delay.is_zero() {
            return Err("bots.max_step_delay must be > 0".to_string());
        }
        if self.bots.min_hold > self.bots.max_hold {
            return Err("bots.min_hold must be <= max_hold".to_string());
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let value = env::var(key).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(key, value = %value, "ignoring unparseable environment override");
            None
        }
    }
}
