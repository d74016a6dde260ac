//! Tunable game constants.
//!
//! Every field has a default; JS may pass a JSON object overriding any subset
//! through `start_game_with_config`. Speeds are expressed in pixels per 60 Hz
//! frame and scaled by the elapsed frame fraction in the update loop.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference frame length used to turn `delta_ms` into frame fractions.
pub const FRAME_MS: f64 = 1000.0 / 60.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConfig {
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub road_left_x: f64,
    pub road_width: f64,
    pub num_lanes: u8,
    pub player_width: f64,
    pub player_height: f64,
    pub obstacle_width: f64,
    pub obstacle_height: f64,
    pub powerup_size: f64,
    pub base_obstacle_speed: f64,
    pub speed_increment: f64,
    pub speed_increment_interval_ms: f64,
    pub obstacle_spawn_interval_ms: f64,
    pub powerup_spawn_interval_ms: f64,
    pub min_obstacle_gap: f64,
    pub near_miss_threshold: f64,
    pub near_miss_bonus: u64,
    pub combo_window_ms: f64,
    pub max_combo: u32,
    pub powerup_duration_ms: f64,
    pub powerup_points_bonus: u64,
    pub countdown_ms: f64,
    pub log_level: String,
    /// Service worker script for offline play; empty disables registration.
    pub service_worker_url: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            canvas_width: 400.0,
            canvas_height: 600.0,
            road_left_x: 50.0,
            road_width: 300.0,
            num_lanes: 4,
            player_width: 40.0,
            player_height: 60.0,
            obstacle_width: 40.0,
            obstacle_height: 60.0,
            powerup_size: 40.0,
            base_obstacle_speed: 3.0,
            speed_increment: 0.5,
            speed_increment_interval_ms: 5_000.0,
            obstacle_spawn_interval_ms: 1_500.0,
            powerup_spawn_interval_ms: 8_000.0,
            min_obstacle_gap: 150.0,
            near_miss_threshold: 40.0,
            near_miss_bonus: 50,
            combo_window_ms: 3_000.0,
            max_combo: 5,
            powerup_duration_ms: 5_000.0,
            powerup_points_bonus: 100,
            countdown_ms: 4_000.0,
            log_level: "info".into(),
            service_worker_url: "sw.js".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    Parse(String),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "config is not valid JSON: {msg}"),
            ConfigError::Invalid(what) => write!(f, "invalid config: {what}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl GameConfig {
    /// Parse a (possibly partial) JSON override and validate the result.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: GameConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_lanes == 0 {
            return Err(ConfigError::Invalid("numLanes must be at least 1"));
        }
        if self.canvas_width <= 0.0 || self.canvas_height <= 0.0 {
            return Err(ConfigError::Invalid("canvas dimensions must be positive"));
        }
        if self.road_left_x < 0.0 || self.road_left_x + self.road_width > self.canvas_width {
            return Err(ConfigError::Invalid("road must fit inside the canvas"));
        }
        if self.player_width > self.lane_width() || self.obstacle_width > self.lane_width() {
            return Err(ConfigError::Invalid("vehicles must fit inside a lane"));
        }
        if self.obstacle_spawn_interval_ms <= 0.0
            || self.powerup_spawn_interval_ms <= 0.0
            || self.speed_increment_interval_ms <= 0.0
        {
            return Err(ConfigError::Invalid("intervals must be positive"));
        }
        if self.countdown_ms < 0.0 || self.powerup_duration_ms < 0.0 {
            return Err(ConfigError::Invalid("durations must not be negative"));
        }
        Ok(())
    }

    pub fn lane_width(&self) -> f64 {
        self.road_width / self.num_lanes as f64
    }

    /// Left x of a box of `width` centred in `lane`.
    pub fn lane_x(&self, lane: u8, width: f64) -> f64 {
        self.road_left_x + lane as f64 * self.lane_width() + (self.lane_width() - width) / 2.0
    }

    /// Lane containing the horizontal position `x`, clamped to the road.
    pub fn lane_of_x(&self, x: f64) -> u8 {
        let rel = ((x - self.road_left_x) / self.lane_width()).floor();
        rel.clamp(0.0, (self.num_lanes - 1) as f64) as u8
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}
