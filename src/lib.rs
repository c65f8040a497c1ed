//! Bullet Beat - a chart-driven rhythm / bullet-hell hybrid
//!
//! Core modules:
//! - `sim`: Deterministic simulation (phases, spawning, collisions, session state)
//! - `chart`: Chart model and JSON loading
//! - `clock`: Playback clock source (media position or wall clock)
//! - `playback`: Deterministic action replay
//! - `renderer`: Canvas-2d presentation
//! - `audio`: Per-note sound cues

pub mod chart;
pub mod clock;
pub mod playback;
pub mod settings;
pub mod sim;

#[cfg(target_arch = "wasm32")]
pub mod audio;
#[cfg(target_arch = "wasm32")]
pub mod renderer;

pub use chart::Chart;
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Play field dimensions (logical pixels)
    pub const FIELD_WIDTH: f32 = 800.0;
    pub const FIELD_HEIGHT: f32 = 600.0;

    /// Dodge-mode lane grid
    pub const LANE_COUNT: u32 = 10;

    /// Dodge player
    pub const PLAYER_SIZE: f32 = 40.0;
    /// Distance from the bottom of the field to the hit-line
    pub const PLAYER_Y_OFFSET: f32 = 60.0;
    pub const PLAYER_MAX_SPEED: f32 = 20.0;
    pub const PLAYER_ACCELERATION: f32 = 1.5;
    pub const PLAYER_FRICTION: f32 = 0.7;

    /// Bullet-hell player
    pub const HELL_HITBOX_RADIUS: f32 = 4.0;
    pub const HELL_VISUAL_RADIUS: f32 = 15.0;
    pub const HELL_SPEED: f32 = 7.0;
    pub const HELL_FOCUS_SPEED: f32 = 3.0;
    pub const HELL_GRAZE_RADIUS: f32 = 30.0;

    /// Bullets
    pub const BULLET_RADIUS: f32 = 6.0;
    /// Bullets are released once they leave the field by this margin
    pub const BULLET_FIELD_MARGIN: f32 = 50.0;
    /// Hard cap on concurrently pooled bullets; spawns past it are dropped
    pub const BULLET_POOL_CAP: usize = 2048;

    /// Travel-time derivation: a 120 BPM chart gives notes 1200 ms from
    /// spawn to hit-line; faster charts get proportionally less
    pub const BASE_BPM: f64 = 120.0;
    pub const BASE_TRAVEL_TIME_MS: f64 = 1200.0;

    /// Spawn lead for bullet-hell pattern events (ms before startTime)
    pub const PATTERN_SPAWN_LEAD_MS: f64 = 100.0;

    /// Scoring
    pub const NOTE_SCORE: u64 = 10;
    pub const GRAZE_SCORE: u64 = 10;
}

/// Y coordinate of the hit-line, where dodge obstacles are judged
#[inline]
pub fn hit_line_y() -> f32 {
    consts::FIELD_HEIGHT - consts::PLAYER_Y_OFFSET
}

/// Width of one dodge lane
#[inline]
pub fn lane_width() -> f32 {
    consts::FIELD_WIDTH / consts::LANE_COUNT as f32
}

/// Left edge of a dodge lane
#[inline]
pub fn lane_x(lane: u32) -> f32 {
    lane as f32 * lane_width()
}
