//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Clock-driven only (the tick takes the playback time, nothing else)
//! - Seeded RNG only
//! - No rendering, audio, or platform dependencies - side effects surface
//!   as `GameEvent`s for the driver to drain

pub mod bullet;
pub mod collision;
pub mod obstacle;
pub mod phase;
pub mod state;
pub mod tick;

pub use bullet::{Bullet, BulletPool, BulletSpawner};
pub use collision::{Aabb, Circle, aabb_overlap, circles_overlap};
pub use obstacle::Obstacle;
pub use phase::SpawnCursor;
pub use state::{
    BulletHellPlayer, DodgePlayer, EndReason, GameEvent, InputAction, Player, SessionState,
    SessionStatus, StatsSnapshot,
};
pub use tick::tick;
