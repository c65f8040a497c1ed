//! Enemy bullets: pooled projectiles and pattern spawners
//!
//! Bullets churn at hundreds per second, so they live in a slot pool with a
//! free list: spawning reuses a retired slot instead of allocating, and a
//! handle is just the slot index. Acquire resets the whole slot, so a stale
//! read of released state is impossible by construction.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use crate::chart::{PatternKind, PatternSpec};
use crate::consts::{BULLET_FIELD_MARGIN, BULLET_POOL_CAP, FIELD_HEIGHT, FIELD_WIDTH};
use crate::sim::collision::Circle;
use crate::sim::state::GameEvent;

/// Default bullet palette; spawners without an explicit color pick from the
/// brighter end of this list.
const PALETTE: &[u32] = &[
    0x050505, 0x141414, 0x2D2D2D, 0x4A0000, 0x8A0000, 0xFF3333, 0x00E0E0, 0xE5E5E5,
];

/// Parse a `#rrggbb` color string
pub fn parse_color(s: &str) -> Option<u32> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

/// A pooled projectile. `active` is false exactly while the slot sits on the
/// free list.
#[derive(Debug, Clone, Copy)]
pub struct Bullet {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub color: u32,
    /// Each bullet can award a graze at most once
    pub grazed: bool,
    pub active: bool,
}

impl Bullet {
    fn reset(&mut self, pos: Vec2, vel: Vec2, radius: f32, color: u32) {
        *self = Bullet {
            pos,
            vel,
            radius,
            color,
            grazed: false,
            active: true,
        };
    }

    /// Advance one tick (velocities are px per tick)
    pub fn advance(&mut self) {
        self.pos += self.vel;
    }

    pub fn circle(&self) -> Circle {
        Circle::new(self.pos, self.radius)
    }

    /// Past the field bounds by the release margin
    pub fn is_out_of_field(&self) -> bool {
        self.pos.x < -BULLET_FIELD_MARGIN
            || self.pos.x > FIELD_WIDTH + BULLET_FIELD_MARGIN
            || self.pos.y < -BULLET_FIELD_MARGIN
            || self.pos.y > FIELD_HEIGHT + BULLET_FIELD_MARGIN
    }
}

/// Slot pool with free list. Live handles keep a stable order list so the
/// tick can iterate and release in place.
#[derive(Debug, Default)]
pub struct BulletPool {
    slots: Vec<Bullet>,
    free: Vec<u32>,
    live: Vec<u32>,
    dropped: u64,
}

impl BulletPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a slot and reset it. Returns None when the pool is at its
    /// hard cap; overload degrades by dropping spawns, never by failing.
    pub fn spawn(&mut self, pos: Vec2, vel: Vec2, radius: f32, color: u32) -> Option<u32> {
        let handle = match self.free.pop() {
            Some(h) => h,
            None if self.slots.len() < BULLET_POOL_CAP => {
                self.slots.push(Bullet {
                    pos: Vec2::ZERO,
                    vel: Vec2::ZERO,
                    radius: 0.0,
                    color: 0,
                    grazed: false,
                    active: false,
                });
                (self.slots.len() - 1) as u32
            }
            None => {
                self.dropped += 1;
                log::debug!("bullet pool at cap, dropping spawn ({} so far)", self.dropped);
                return None;
            }
        };
        self.slots[handle as usize].reset(pos, vel, radius, color);
        self.live.push(handle);
        Some(handle)
    }

    pub fn live_len(&self) -> usize {
        self.live.len()
    }

    pub fn live_at(&self, i: usize) -> u32 {
        self.live[i]
    }

    pub fn get(&self, handle: u32) -> &Bullet {
        &self.slots[handle as usize]
    }

    pub fn get_mut(&mut self, handle: u32) -> &mut Bullet {
        &mut self.slots[handle as usize]
    }

    /// Release the bullet at position `i` of the live list back to the pool
    pub fn release_live(&mut self, i: usize) {
        let handle = self.live.swap_remove(i);
        self.slots[handle as usize].active = false;
        self.free.push(handle);
    }

    /// Release everything (phase transitions)
    pub fn clear(&mut self) {
        while !self.live.is_empty() {
            self.release_live(self.live.len() - 1);
        }
    }

    pub fn iter_live(&self) -> impl Iterator<Item = &Bullet> {
        self.live.iter().map(|&h| &self.slots[h as usize])
    }

    /// Total slots ever allocated (pool growth diagnostics and tests)
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

/// Runtime state for one pattern event: emits a burst every `interval`
/// while the spawner's time window is open.
#[derive(Debug, Clone)]
pub struct BulletSpawner {
    pattern: PatternKind,
    start_time: f64,
    pos: Vec2,
    bullet_speed: f32,
    bullet_count: u32,
    duration: f64,
    interval: f64,
    color: u32,
    bullet_radius: f32,
    sound: Option<String>,
    /// Rotating phase accumulator shared by the rotating patterns
    angle: f32,
    angle_step: f32,
    last_spawn_time: f64,
    spawn_count: u32,
    active: bool,
    finished: bool,
    sound_played: bool,
}

impl BulletSpawner {
    pub fn from_spec(spec: &PatternSpec, rng: &mut impl Rng) -> Self {
        let color = spec
            .color
            .as_deref()
            .and_then(parse_color)
            // Skip the two near-black palette entries when picking randomly
            .unwrap_or_else(|| PALETTE[rng.random_range(2..PALETTE.len())]);
        Self {
            pattern: spec.pattern,
            start_time: spec.start_time,
            pos: Vec2::new(spec.x, spec.y),
            bullet_speed: spec.bullet_speed,
            bullet_count: spec.bullet_count,
            duration: spec.duration,
            interval: spec.interval,
            color,
            bullet_radius: spec.bullet_radius,
            sound: spec.sound_id.clone(),
            angle: spec.start_angle,
            angle_step: spec.angle_step,
            last_spawn_time: 0.0,
            spawn_count: 0,
            active: false,
            finished: false,
            sound_played: false,
        }
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Inside the active window and past the first tick
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn spawn_count(&self) -> u32 {
        self.spawn_count
    }

    /// Tick the spawner: activate inside the window, cue the sound exactly
    /// once, and emit a burst when the interval has elapsed.
    pub fn update(
        &mut self,
        now: f64,
        pool: &mut BulletPool,
        player_center: Vec2,
        rng: &mut impl Rng,
        events: &mut Vec<GameEvent>,
    ) {
        if self.finished || now < self.start_time {
            return;
        }
        if now > self.start_time + self.duration {
            self.finished = true;
            return;
        }
        self.active = true;

        if !self.sound_played {
            self.sound_played = true;
            if let Some(sound) = &self.sound {
                events.push(GameEvent::PatternStarted {
                    sound: sound.clone(),
                });
            }
        }

        if now - self.last_spawn_time < self.interval {
            return;
        }
        self.last_spawn_time = now;
        self.emit_burst(pool, player_center, rng);
        self.spawn_count += 1;
    }

    fn emit_burst(&mut self, pool: &mut BulletPool, player_center: Vec2, rng: &mut impl Rng) {
        let (pos, radius, color) = (self.pos, self.bullet_radius, self.color);
        let mut shoot = |pos: Vec2, vel: Vec2| {
            pool.spawn(pos, vel, radius, color);
        };

        match self.pattern {
            PatternKind::Spiral => {
                let speed = self.bullet_speed * 1.8;
                for i in 0..6 {
                    let angle = self.angle + i as f32 * (TAU / 6.0);
                    shoot(pos, Vec2::from_angle(angle) * speed);
                }
                self.angle += self.angle_step * 2.2;
            }
            PatternKind::Radial => {
                let count = (self.bullet_count as f32 * 2.5).floor() as u32;
                let speed = self.bullet_speed * 1.8;
                for i in 0..count {
                    let angle = (i as f32 / count as f32) * TAU + self.angle;
                    shoot(pos, Vec2::from_angle(angle) * speed);
                }
                self.angle += self.angle_step * 1.5;
            }
            PatternKind::Aimed => {
                // True aim: direction recomputed from the live player
                // position on every burst
                let speed = self.bullet_speed * 2.2;
                let to_player = player_center - pos;
                let base_angle = to_player.y.atan2(to_player.x);
                shoot(pos, Vec2::from_angle(base_angle) * speed);
                let spread = 0.15;
                for i in 1..=4 {
                    let offset = spread * i as f32;
                    shoot(pos, Vec2::from_angle(base_angle + offset) * speed);
                    shoot(pos, Vec2::from_angle(base_angle - offset) * speed);
                }
            }
            PatternKind::Wave => {
                for i in 0..9 {
                    let offset_x = (i as f32 - 4.0) * 25.0;
                    let vx = (self.angle + i as f32 * 0.5).sin() * 2.0;
                    let vy = self.bullet_speed * 1.5;
                    shoot(pos + Vec2::new(offset_x, 0.0), Vec2::new(vx, vy));
                }
                self.angle += 0.5;
            }
            PatternKind::Random => {
                for _ in 0..8 {
                    let angle = rng.random::<f32>() * TAU;
                    let speed = self.bullet_speed * (1.0 + rng.random::<f32>() * 1.2);
                    let jitter = (rng.random::<f32>() - 0.5) * 150.0;
                    shoot(pos + Vec2::new(jitter, 0.0), Vec2::from_angle(angle) * speed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn spec(json: &str) -> PatternSpec {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn pool_reuses_slots() {
        let mut pool = BulletPool::new();
        let v = Vec2::new(0.0, 1.0);

        // K bullets live at once, released and re-acquired N times: the pool
        // must never grow past K distinct slots.
        let k = 8;
        for _ in 0..10 {
            for i in 0..k {
                pool.spawn(Vec2::new(i as f32, 0.0), v, 6.0, 0xFF3333);
            }
            assert_eq!(pool.live_len(), k as usize);
            pool.clear();
            assert_eq!(pool.live_len(), 0);
        }
        assert_eq!(pool.slot_count(), k as usize);
    }

    #[test]
    fn no_two_live_bullets_alias_one_slot() {
        let mut pool = BulletPool::new();
        for i in 0..32 {
            pool.spawn(Vec2::new(i as f32, 0.0), Vec2::ZERO, 6.0, 0);
        }
        // Release every other bullet, spawn replacements
        for i in (0..32).step_by(2).rev() {
            pool.release_live(i);
        }
        for i in 0..16 {
            pool.spawn(Vec2::new(100.0 + i as f32, 0.0), Vec2::ZERO, 6.0, 0);
        }
        let mut seen = std::collections::HashSet::new();
        for i in 0..pool.live_len() {
            assert!(seen.insert(pool.live_at(i)), "handle aliased");
            assert!(pool.get(pool.live_at(i)).active);
        }
    }

    #[test]
    fn acquire_resets_full_state() {
        let mut pool = BulletPool::new();
        let h = pool.spawn(Vec2::ZERO, Vec2::ONE, 6.0, 0).unwrap();
        pool.get_mut(h).grazed = true;
        pool.release_live(0);
        assert!(!pool.get(h).active);

        let h2 = pool.spawn(Vec2::new(5.0, 5.0), Vec2::ZERO, 4.0, 1).unwrap();
        assert_eq!(h, h2, "freed slot is reused first");
        let b = pool.get(h2);
        assert!(b.active);
        assert!(!b.grazed);
        assert_eq!(b.radius, 4.0);
    }

    #[test]
    fn pool_caps_instead_of_failing() {
        let mut pool = BulletPool::new();
        for _ in 0..BULLET_POOL_CAP {
            assert!(pool.spawn(Vec2::ZERO, Vec2::ZERO, 6.0, 0).is_some());
        }
        assert!(pool.spawn(Vec2::ZERO, Vec2::ZERO, 6.0, 0).is_none());
        assert_eq!(pool.slot_count(), BULLET_POOL_CAP);
    }

    #[test]
    fn radial_spawner_bursts_and_finishes() {
        // interval 100 over a 300ms window: exactly 3 bursts of
        // bulletCount * 2.5 bullets, finished strictly after the window.
        let spec = spec(
            r#"{"pattern": "radial", "startTime": 1000, "x": 400, "y": 50,
                "bulletCount": 12, "interval": 100, "duration": 300}"#,
        );
        let mut rng = Pcg32::seed_from_u64(9);
        let mut spawner = BulletSpawner::from_spec(&spec, &mut rng);
        let mut pool = BulletPool::new();
        let mut events = Vec::new();

        let mut now = 1005.0;
        while now < 1400.0 {
            spawner.update(now, &mut pool, Vec2::new(400.0, 450.0), &mut rng, &mut events);
            now += 10.0;
        }
        assert_eq!(spawner.spawn_count(), 3);
        assert_eq!(pool.live_len(), 3 * 30);
        assert!(spawner.finished());
    }

    #[test]
    fn spawner_not_finished_inside_window() {
        let spec = spec(r#"{"pattern": "radial", "startTime": 0, "duration": 300}"#);
        let mut rng = Pcg32::seed_from_u64(1);
        let mut spawner = BulletSpawner::from_spec(&spec, &mut rng);
        let mut pool = BulletPool::new();
        let mut events = Vec::new();
        spawner.update(300.0, &mut pool, Vec2::ZERO, &mut rng, &mut events);
        assert!(!spawner.finished(), "finished only strictly after start+duration");
        spawner.update(300.1, &mut pool, Vec2::ZERO, &mut rng, &mut events);
        assert!(spawner.finished());
    }

    #[test]
    fn sound_cue_fires_once_per_spawner() {
        let spec = spec(
            r#"{"pattern": "spiral", "startTime": 0, "duration": 500,
                "interval": 100, "soundId": "kick"}"#,
        );
        let mut rng = Pcg32::seed_from_u64(2);
        let mut spawner = BulletSpawner::from_spec(&spec, &mut rng);
        let mut pool = BulletPool::new();
        let mut events = Vec::new();
        for t in [0.0, 100.0, 200.0, 300.0, 400.0] {
            spawner.update(t, &mut pool, Vec2::ZERO, &mut rng, &mut events);
        }
        let cues = events
            .iter()
            .filter(|e| matches!(e, GameEvent::PatternStarted { .. }))
            .count();
        assert_eq!(cues, 1);
    }

    #[test]
    fn aimed_burst_points_at_player() {
        let spec = spec(
            r#"{"pattern": "aimed", "startTime": 0, "x": 400, "y": 50,
                "bulletSpeed": 3, "interval": 10, "duration": 1000}"#,
        );
        let mut rng = Pcg32::seed_from_u64(4);
        let mut spawner = BulletSpawner::from_spec(&spec, &mut rng);
        let mut pool = BulletPool::new();
        let mut events = Vec::new();

        let player = Vec2::new(400.0, 450.0); // straight down from spawner
        spawner.update(100.0, &mut pool, player, &mut rng, &mut events);

        // 1 aimed + 4 offset pairs
        assert_eq!(pool.live_len(), 9);
        let center = pool.get(pool.live_at(0));
        assert!(center.vel.x.abs() < 1e-3);
        assert!(center.vel.y > 0.0);
        assert!((center.vel.length() - 3.0 * 2.2).abs() < 1e-3);
    }

    #[test]
    fn wave_burst_spreads_across_x() {
        let spec = spec(
            r#"{"pattern": "wave", "startTime": 0, "x": 400, "y": 0,
                "interval": 10, "duration": 1000}"#,
        );
        let mut rng = Pcg32::seed_from_u64(5);
        let mut spawner = BulletSpawner::from_spec(&spec, &mut rng);
        let mut pool = BulletPool::new();
        let mut events = Vec::new();
        spawner.update(50.0, &mut pool, Vec2::ZERO, &mut rng, &mut events);

        assert_eq!(pool.live_len(), 9);
        let xs: Vec<f32> = pool.iter_live().map(|b| b.pos.x).collect();
        assert!(xs.contains(&300.0));
        assert!(xs.contains(&500.0));
        // Wave bullets always fall downward
        assert!(pool.iter_live().all(|b| b.vel.y > 0.0));
    }

    #[test]
    fn parse_color_roundtrip() {
        assert_eq!(parse_color("#FF3333"), Some(0xFF3333));
        assert_eq!(parse_color("#00e0e0"), Some(0x00E0E0));
        assert_eq!(parse_color("red"), None);
        assert_eq!(parse_color("#FFF"), None);
    }
}
