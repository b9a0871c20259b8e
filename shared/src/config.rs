/// Colours a player may pick (or be assigned) for their avatar.
pub const PLAYER_COLOURS: [&str; 15] = [
    "#FF1744", "#FF6D00", "#FFEA00", "#76FF03", "#00E5FF", "#2979FF", "#651FFF", "#D500F9",
    "#FF4081", "#00C853", "#1DE9B6", "#00B0FF", "#FF9100", "#C6FF00", "#F50057",
];

/// Colours used for collectible dots.
pub const DOT_COLOURS: [&str; 5] = ["#39FF14", "#FF073A", "#00E5FF", "#FF00FF", "#FF9100"];

/// Name given to players that have not configured one.
pub const DEFAULT_PLAYER_NAME: &str = "undefined";

pub fn is_player_colour(colour: &str) -> bool {
    PLAYER_COLOURS.contains(&colour)
}

/// World geometry and gameplay tuning
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldConfig {
    /// Radius of the circular world. The centre sits at (radius, radius).
    pub world_radius: i32,
    pub player_radius: i32,
    /// Distance moved per active direction per input
    pub player_speed: i32,
    pub dot_radius: i32,
    /// Fraction of the eaten radius added to the eater (floored)
    pub growth_factor: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            world_radius: 3000,
            player_radius: 24,
            player_speed: 3,
            dot_radius: 8,
            growth_factor: 0.2,
        }
    }
}

impl WorldConfig {
    pub fn center(&self) -> (i32, i32) {
        (self.world_radius, self.world_radius)
    }

    /// Radius gained by engulfing something of the given radius.
    pub fn growth_for(&self, eaten_radius: i32) -> i32 {
        (eaten_radius as f64 * self.growth_factor).floor() as i32
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.world_radius <= 0 {
            return Err("world_radius must be > 0".to_string());
        }
        if self.player_radius <= 0 || self.player_radius > self.world_radius {
            return Err("player_radius must be in 1..=world_radius".to_string());
        }
        if self.dot_radius <= 0 {
            return Err("dot_radius must be > 0".to_string());
        }
        if self.player_speed < 0 {
            return Err("player_speed must be >= 0".to_string());
        }
        if !self.growth_factor.is_finite() || self.growth_factor < 0.0 {
            return Err("growth_factor must be finite and >= 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_world_config_is_valid() {
        assert!(WorldConfig::default().validate().is_ok());
    }

    #[test]
    fn growth_is_floored() {
        let config = WorldConfig::default();
        assert_eq!(config.growth_for(20), 4);
        assert_eq!(config.growth_for(8), 1);
        assert_eq!(config.growth_for(4), 0);
    }

    #[test]
    fn negative_growth_invalid() {
        let config = WorldConfig {
            growth_factor: -0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn palette_membership() {
        assert!(is_player_colour("#FF1744"));
        assert!(!is_player_colour("#000000"));
        assert!(!is_player_colour("#39FF14"));
    }
}
