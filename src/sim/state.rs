//! Session state and core simulation types
//!
//! One `SessionState` owns everything a play session mutates. It is passed by
//! reference into the tick function and the subsystems; there are no ambient
//! singletons, and the sim never touches the platform - side effects surface
//! as `GameEvent`s for the driver to drain.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::chart::{Chart, ChartEvent, Phase, PhaseKind};
use crate::consts::*;
use crate::playback::PlaybackCursor;
use crate::sim::bullet::{BulletPool, BulletSpawner};
use crate::sim::collision::{Aabb, Circle};
use crate::sim::obstacle::Obstacle;
use crate::sim::phase::SpawnCursor;

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Player was hit (dodge block or bullet)
    Collision,
    /// The song finished
    Completed,
}

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    Paused,
    Ended(EndReason),
}

/// Side effects produced by the sim during a tick, drained by the driver
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// A dodge note's bottom edge crossed the hit-line: cue its sound (the
    /// driver falls back to a generic hit when `sound` is None) and flash a
    /// flare at x on the hit-line
    NoteHit { sound: Option<String>, x: f32 },
    /// A bullet spawner became active; cue its sound once
    PatternStarted { sound: String },
    /// Near-miss reward, at the bullet's position
    Graze { x: f32, y: f32 },
    /// The phase machine switched phases
    PhaseChanged { index: usize, kind: PhaseKind },
    /// The session is over
    Ended { reason: EndReason },
}

/// Player input surface, shared by live input handlers and action replay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    MoveLeft,
    StopLeft,
    MoveRight,
    StopRight,
    MoveUp,
    StopUp,
    MoveDown,
    StopDown,
    Focus(bool),
}

/// Dodge-mode slider: 1-D position with velocity/friction integration
#[derive(Debug, Clone)]
pub struct DodgePlayer {
    pub x: f32,
    pub velocity: f32,
    moving_left: bool,
    moving_right: bool,
}

impl Default for DodgePlayer {
    fn default() -> Self {
        Self {
            x: FIELD_WIDTH / 2.0 - PLAYER_SIZE / 2.0,
            velocity: 0.0,
            moving_left: false,
            moving_right: false,
        }
    }
}

impl DodgePlayer {
    /// The slider's fixed vertical position (straddles the hit-line)
    pub fn y() -> f32 {
        FIELD_HEIGHT - PLAYER_Y_OFFSET - 25.0
    }

    pub fn update(&mut self) {
        if self.moving_left {
            self.velocity -= PLAYER_ACCELERATION;
        }
        if self.moving_right {
            self.velocity += PLAYER_ACCELERATION;
        }
        if !self.moving_left && !self.moving_right {
            self.velocity *= PLAYER_FRICTION;
            if self.velocity.abs() < 0.1 {
                self.velocity = 0.0;
            }
        }
        self.velocity = self.velocity.clamp(-PLAYER_MAX_SPEED, PLAYER_MAX_SPEED);
        self.x += self.velocity;

        if self.x < 0.0 {
            self.x = 0.0;
            self.velocity = 0.0;
        }
        if self.x > FIELD_WIDTH - PLAYER_SIZE {
            self.x = FIELD_WIDTH - PLAYER_SIZE;
            self.velocity = 0.0;
        }
    }

    /// Absolute positioning from the on-screen slider control, 0..=1
    pub fn set_position(&mut self, fraction: f32) {
        self.x = fraction.clamp(0.0, 1.0) * (FIELD_WIDTH - PLAYER_SIZE);
        self.velocity = 0.0;
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.x, Self::y(), PLAYER_SIZE, PLAYER_SIZE)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + PLAYER_SIZE / 2.0, Self::y() + PLAYER_SIZE / 2.0)
    }
}

/// Bullet-hell player: free 2-D movement, dual speed, and a hit circle much
/// smaller than the visual body
#[derive(Debug, Clone)]
pub struct BulletHellPlayer {
    pub pos: Vec2,
    pub focused: bool,
    moving_left: bool,
    moving_right: bool,
    moving_up: bool,
    moving_down: bool,
}

impl Default for BulletHellPlayer {
    fn default() -> Self {
        Self {
            pos: Vec2::new(FIELD_WIDTH / 2.0, FIELD_HEIGHT * 0.75),
            focused: false,
            moving_left: false,
            moving_right: false,
            moving_up: false,
            moving_down: false,
        }
    }
}

impl BulletHellPlayer {
    pub fn update(&mut self) {
        let speed = if self.focused { HELL_FOCUS_SPEED } else { HELL_SPEED };

        let mut dir = Vec2::ZERO;
        if self.moving_left {
            dir.x -= 1.0;
        }
        if self.moving_right {
            dir.x += 1.0;
        }
        if self.moving_up {
            dir.y -= 1.0;
        }
        if self.moving_down {
            dir.y += 1.0;
        }
        // Diagonals move no faster than cardinals
        self.pos += dir.normalize_or_zero() * speed;

        let margin = HELL_VISUAL_RADIUS;
        self.pos.x = self.pos.x.clamp(margin, FIELD_WIDTH - margin);
        self.pos.y = self.pos.y.clamp(margin, FIELD_HEIGHT - margin);
    }

    pub fn hitbox(&self) -> Circle {
        Circle::new(self.pos, HELL_HITBOX_RADIUS)
    }

    pub fn graze_area(&self) -> Circle {
        Circle::new(self.pos, HELL_GRAZE_RADIUS)
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(
            self.pos.x - HELL_HITBOX_RADIUS,
            self.pos.y - HELL_HITBOX_RADIUS,
            HELL_HITBOX_RADIUS * 2.0,
            HELL_HITBOX_RADIUS * 2.0,
        )
    }
}

/// Exactly one player variant is live at a time; phase transitions swap the
/// whole value rather than mutating across modes.
#[derive(Debug, Clone)]
pub enum Player {
    Dodge(DodgePlayer),
    BulletHell(BulletHellPlayer),
}

impl Player {
    pub fn for_phase(kind: PhaseKind) -> Self {
        match kind {
            PhaseKind::Dodge => Player::Dodge(DodgePlayer::default()),
            PhaseKind::BulletHell => Player::BulletHell(BulletHellPlayer::default()),
        }
    }

    pub fn update(&mut self) {
        match self {
            Player::Dodge(p) => p.update(),
            Player::BulletHell(p) => p.update(),
        }
    }

    pub fn bounds(&self) -> Aabb {
        match self {
            Player::Dodge(p) => p.bounds(),
            Player::BulletHell(p) => p.bounds(),
        }
    }

    pub fn center(&self) -> Vec2 {
        match self {
            Player::Dodge(p) => p.center(),
            Player::BulletHell(p) => p.pos,
        }
    }

    /// Route an input action to whichever variant is live. Actions the
    /// current mode has no use for are ignored.
    pub fn apply(&mut self, action: InputAction) {
        match self {
            Player::Dodge(p) => match action {
                InputAction::MoveLeft => p.moving_left = true,
                InputAction::StopLeft => p.moving_left = false,
                InputAction::MoveRight => p.moving_right = true,
                InputAction::StopRight => p.moving_right = false,
                _ => {}
            },
            Player::BulletHell(p) => match action {
                InputAction::MoveLeft => p.moving_left = true,
                InputAction::StopLeft => p.moving_left = false,
                InputAction::MoveRight => p.moving_right = true,
                InputAction::StopRight => p.moving_right = false,
                InputAction::MoveUp => p.moving_up = true,
                InputAction::StopUp => p.moving_up = false,
                InputAction::MoveDown => p.moving_down = true,
                InputAction::StopDown => p.moving_down = false,
                InputAction::Focus(f) => p.focused = f,
            },
        }
    }
}

/// Per-note judgment tally. Every note that crosses the hit-line while the
/// player survives it counts as perfect; the other grades are reserved for
/// timing-window play.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Judgments {
    pub perfect: u32,
    pub great: u32,
    pub bad: u32,
    pub miss: u32,
}

impl Judgments {
    pub fn total(&self) -> u32 {
        self.perfect + self.great + self.bad + self.miss
    }

    /// Weighted accuracy percentage: perfect 100, great 75, bad 25, miss 0
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let weighted = self.perfect as f64 * 100.0 + self.great as f64 * 75.0 + self.bad as f64 * 25.0;
        weighted / total as f64
    }
}

/// Letter grade from accuracy
pub fn grade(accuracy: f64) -> &'static str {
    if accuracy >= 95.0 {
        "S"
    } else if accuracy >= 85.0 {
        "A"
    } else if accuracy >= 70.0 {
        "B"
    } else {
        "C"
    }
}

/// End-of-session statistics snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub score: u64,
    pub max_combo: u32,
    pub graze_count: u32,
    pub judgments: Judgments,
    pub accuracy: f64,
    pub grade: &'static str,
}

/// The single mutable root of one play session
#[derive(Debug)]
pub struct SessionState {
    pub chart: Chart,
    /// Spawn-to-hit-line lead, derived once from the chart's BPM
    pub travel_time: f64,
    pub seed: u64,
    pub rng: Pcg32,

    /// Current phase index; None until the clock first enters a phase window
    pub phase_index: Option<usize>,
    pub cursor: SpawnCursor,
    /// The active phase's events, copied on transition (and pre-filtered in
    /// skip mode)
    pub event_queue: Vec<ChartEvent>,

    pub obstacles: Vec<Obstacle>,
    pub bullets: BulletPool,
    pub spawners: Vec<BulletSpawner>,
    pub player: Player,

    pub score: u64,
    pub combo: u32,
    pub max_combo: u32,
    pub graze_count: u32,
    pub judgments: Judgments,

    pub status: SessionStatus,
    /// Collisions are non-terminal while set
    pub god_mode: bool,
    /// Events with a start time before this are dropped when a phase's queue
    /// is bound (skip-to-time sessions)
    pub skip_from: Option<f64>,
    /// Action replay driving the player instead of live input
    pub playback: Option<PlaybackCursor>,

    pub(crate) events: Vec<GameEvent>,
}

impl SessionState {
    /// Fresh session from the start of the song
    pub fn new(chart: Chart, seed: u64) -> Self {
        let travel_time = chart.travel_time_ms();
        log::info!("session start: bpm={}, travel_time={}ms", chart.bpm, travel_time);
        Self {
            chart,
            travel_time,
            seed,
            rng: Pcg32::seed_from_u64(seed),
            phase_index: None,
            cursor: SpawnCursor::default(),
            event_queue: Vec::new(),
            obstacles: Vec::new(),
            bullets: BulletPool::new(),
            spawners: Vec::new(),
            player: Player::Dodge(DodgePlayer::default()),
            score: 0,
            combo: 0,
            max_combo: 0,
            graze_count: 0,
            judgments: Judgments::default(),
            status: SessionStatus::Running,
            god_mode: false,
            skip_from: None,
            playback: None,
            events: Vec::new(),
        }
    }

    /// Session starting at an explicit song position: events before the skip
    /// point are filtered out of each phase queue as it binds, so the catch-up
    /// spawn after the clock jump only produces future entities.
    pub fn new_at(chart: Chart, seed: u64, skip_ms: f64) -> Self {
        let mut state = Self::new(chart, seed);
        state.skip_from = Some(skip_ms);
        state
    }

    pub fn current_phase(&self) -> Option<&Phase> {
        self.phase_index.map(|i| &self.chart.phases[i])
    }

    /// Active gameplay mode; dodge until the first phase binds
    pub fn mode(&self) -> PhaseKind {
        self.current_phase().map(|p| p.kind).unwrap_or(PhaseKind::Dodge)
    }

    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    pub fn pause(&mut self) {
        if self.status == SessionStatus::Running {
            self.status = SessionStatus::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.status == SessionStatus::Paused {
            self.status = SessionStatus::Running;
        }
    }

    /// Terminal transition; idempotent, later calls keep the first reason
    pub fn end(&mut self, reason: EndReason) {
        if matches!(self.status, SessionStatus::Ended(_)) {
            return;
        }
        self.status = SessionStatus::Ended(reason);
        self.events.push(GameEvent::Ended { reason });
        log::info!(
            "session ended ({reason:?}): score={}, max_combo={}, graze={}",
            self.score,
            self.max_combo,
            self.graze_count
        );
    }

    /// Live or replayed input, routed to the current player variant
    pub fn handle_input(&mut self, action: InputAction) {
        if self.is_running() {
            self.player.apply(action);
        }
    }

    pub(crate) fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Drain this tick's side effects (driver: audio, flares, HUD)
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, GameEvent> {
        self.events.drain(..)
    }

    pub(crate) fn bump_combo(&mut self) {
        self.combo += 1;
        self.max_combo = self.max_combo.max(self.combo);
    }

    pub fn stats(&self) -> StatsSnapshot {
        let accuracy = self.judgments.accuracy();
        StatsSnapshot {
            score: self.score,
            max_combo: self.max_combo,
            graze_count: self.graze_count,
            judgments: self.judgments,
            accuracy,
            grade: grade(accuracy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dodge_chart() -> Chart {
        Chart::from_json(r#"{"bpm": 120, "phases": [
            {"type": "dodge", "startTime": 0, "endTime": 10000, "slides": []}
        ]}"#)
        .unwrap()
    }

    #[test]
    fn dodge_player_accelerates_and_stops_with_friction() {
        let mut p = DodgePlayer::default();
        p.moving_right = true;
        for _ in 0..10 {
            p.update();
        }
        assert!(p.velocity > 0.0);
        let x_moving = p.x;

        p.moving_right = false;
        for _ in 0..60 {
            p.update();
        }
        assert_eq!(p.velocity, 0.0);
        assert!(p.x > x_moving);
    }

    #[test]
    fn dodge_player_clamps_to_field() {
        let mut p = DodgePlayer::default();
        p.moving_right = true;
        for _ in 0..200 {
            p.update();
        }
        assert_eq!(p.x, FIELD_WIDTH - PLAYER_SIZE);
        assert_eq!(p.velocity, 0.0);
    }

    #[test]
    fn hell_player_diagonal_speed_is_normalized() {
        let mut p = BulletHellPlayer::default();
        let start = p.pos;
        p.moving_right = true;
        p.moving_down = true;
        p.update();
        let moved = p.pos - start;
        assert!((moved.length() - HELL_SPEED).abs() < 1e-3);
    }

    #[test]
    fn focus_halves_movement() {
        let mut p = BulletHellPlayer::default();
        p.moving_right = true;
        p.focused = true;
        let start = p.pos.x;
        p.update();
        assert!((p.pos.x - start - HELL_FOCUS_SPEED).abs() < 1e-3);
    }

    #[test]
    fn input_routing_ignores_vertical_in_dodge() {
        let mut player = Player::Dodge(DodgePlayer::default());
        player.apply(InputAction::MoveUp);
        player.apply(InputAction::MoveLeft);
        let Player::Dodge(p) = &player else { unreachable!() };
        assert!(p.moving_left);
    }

    #[test]
    fn end_is_idempotent_and_keeps_first_reason() {
        let mut state = SessionState::new(dodge_chart(), 1);
        state.end(EndReason::Collision);
        state.end(EndReason::Completed);
        assert_eq!(state.status, SessionStatus::Ended(EndReason::Collision));
        let ends = state
            .drain_events()
            .filter(|e| matches!(e, GameEvent::Ended { .. }))
            .count();
        assert_eq!(ends, 1);
    }

    #[test]
    fn accuracy_and_grade() {
        let j = Judgments { perfect: 19, great: 0, bad: 0, miss: 1 };
        assert!((j.accuracy() - 95.0).abs() < 1e-9);
        assert_eq!(grade(j.accuracy()), "S");
        assert_eq!(grade(84.9), "B");
        assert_eq!(grade(10.0), "C");
    }
}
