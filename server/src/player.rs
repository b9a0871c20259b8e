use arena_shared::config::{is_player_colour, WorldConfig, DEFAULT_PLAYER_NAME, PLAYER_COLOURS};
use arena_shared::protocol::{MovementInput, PlayerId};
use rand::seq::SliceRandom;
use rand::Rng;
use std::f64::consts::TAU;

/// A player (human or bot) in the arena
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub speed: i32,
    pub radius: i32,
    pub colour: String,
}

impl Player {
    /// New player with default size and speed at a random point in the world.
    pub fn spawn(id: PlayerId, world: &WorldConfig, rng: &mut impl Rng) -> Self {
        let (x, y) = random_position(world, rng);
        Self {
            id,
            name: DEFAULT_PLAYER_NAME.to_string(),
            x,
            y,
            speed: world.player_speed,
            radius: world.player_radius,
            colour: random_colour(rng),
        }
    }

    /// Move by `speed` per held direction, then clamp into the world circle.
    ///
    /// Diagonals are not normalized, so two orthogonal keys cover more ground
    /// than one.
    pub fn apply_input(&mut self, input: &MovementInput, world: &WorldConfig) {
        if input.w {
            self.y -= self.speed;
        }
        if input.a {
            self.x -= self.speed;
        }
        if input.s {
            self.y += self.speed;
        }
        if input.d {
            self.x += self.speed;
        }
        self.clamp_to_world(world);
    }

    /// Pull the player back onto the boundary if it left the world circle.
    pub fn clamp_to_world(&mut self, world: &WorldConfig) {
        let (cx, cy) = world.center();
        let dx = (self.x - cx) as i64;
        let dy = (self.y - cy) as i64;
        let limit = world.world_radius as i64;
        let dist_sq = dx * dx + dy * dy;
        if dist_sq <= limit * limit {
            return;
        }
        let scale = limit as f64 / (dist_sq as f64).sqrt();
        // Truncating the offset rounds toward the centre, never past the edge.
        self.x = cx + (dx as f64 * scale).trunc() as i32;
        self.y = cy + (dy as f64 * scale).trunc() as i32;
    }

    /// Back to starting size at a fresh position; id, name and colour stay.
    pub fn reset_for_new_round(&mut self, world: &WorldConfig, rng: &mut impl Rng) {
        let (x, y) = random_position(world, rng);
        self.x = x;
        self.y = y;
        self.radius = world.player_radius;
    }

    /// Apply a client-chosen name and colour. Unknown colours are ignored.
    pub fn apply_profile(&mut self, name: &str, colour: &str) {
        let trimmed = name.trim();
        self.name = if trimmed.is_empty() {
            DEFAULT_PLAYER_NAME.to_string()
        } else {
            trimmed.to_string()
        };
        if is_player_colour(colour) {
            self.colour = colour.to_string();
        }
    }
}

/// Uniformly distributed point inside the world circle.
pub fn random_position(world: &WorldConfig, rng: &mut impl Rng) -> (i32, i32) {
    let (cx, cy) = world.center();
    let angle = rng.gen_range(0.0..TAU);
    let distance = world.world_radius as f64 * rng.gen::<f64>().sqrt();
    (
        cx + (distance * angle.cos()) as i32,
        cy + (distance * angle.sin()) as i32,
    )
}

fn random_colour(rng: &mut impl Rng) -> String {
    PLAYER_COLOURS
        .choose(rng)
        .copied()
        .unwrap_or(PLAYER_COLOURS[0])
        .to_string()
}
