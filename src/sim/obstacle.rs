//! Falling-block obstacles for dodge mode
//!
//! An obstacle's vertical position is never integrated: it is recomputed each
//! tick as a pure function of the clock, so its bottom edge reaches the
//! hit-line exactly at the note's start time regardless of frame rate. That
//! property is what keeps visuals locked to the music.

use rand::Rng;

use crate::chart::Slide;
use crate::consts::FIELD_HEIGHT;
use crate::sim::collision::Aabb;
use crate::{hit_line_y, lane_width, lane_x};

// Display lines keyed by note length: quick notes get a single glyph, long
// notes get a full sentence.
const LYRICS_TINY: &[&str] = &["嘘", "罪", "闇", "痛", "怖", "逃"];
const LYRICS_SHORT: &[&str] = &[
    "やめて",
    "消えて",
    "ごめん",
    "嫌い",
    "助けて",
    "見ないで",
    "怖い",
    "逃げたい",
    "疲れた",
    "もう無理",
];
const LYRICS_MEDIUM: &[&str] = &[
    "本当の私",
    "誰も分からない",
    "笑顔は嘘",
    "壊れそう",
    "息ができない",
    "独りにして",
    "全部消したい",
    "何が正解？",
    "もう限界",
    "誰か気づいて",
    "心が痛い",
    "仮面の下",
];
const LYRICS_LONG: &[&str] = &[
    "この醜い心を見ないで",
    "私なんか消えればいい",
    "誰にも理解されない",
    "本当の私は怖いでしょう",
    "笑顔の裏側、見える？",
    "もう疲れたよ、全部",
    "化けの皮が剥がれる",
    "綺麗なふりも限界",
    "誰も本当の私を知らない",
    "この花は毒を持っている",
    "愛されたいのに怖い",
    "全部嘘だったらいいのに",
    "心の中は真っ暗",
    "助けてって言えない",
    "もう誰も信じられない",
    "この仮面、外せない",
];

/// Duration buckets for lyric selection (ms)
const TINY_THRESHOLD: f64 = 150.0;
const SHORT_THRESHOLD: f64 = 300.0;
const MEDIUM_THRESHOLD: f64 = 600.0;

/// Pick a display line for a note of the given duration: one of four
/// duration-bucketed pools, uniform within the bucket.
pub fn pick_lyric(duration_ms: f64, rng: &mut impl Rng) -> &'static str {
    let pool = if duration_ms <= TINY_THRESHOLD {
        LYRICS_TINY
    } else if duration_ms <= SHORT_THRESHOLD {
        LYRICS_SHORT
    } else if duration_ms <= MEDIUM_THRESHOLD {
        LYRICS_MEDIUM
    } else {
        LYRICS_LONG
    };
    pool[rng.random_range(0..pool.len())]
}

/// Glitch chance scales with phase intensity, up to this ceiling
const GLITCH_MAX_CHANCE: f32 = 0.15;
/// A glitch that hasn't triggered by 65% progress never will
const GLITCH_WINDOW_END: f32 = 0.65;
/// Visual glitch aftermath duration (ms)
const GLITCH_FADE_MS: f64 = 300.0;

/// One-shot mid-flight lane reassignment, chance-gated by phase intensity.
/// The random draw is made at construction; whether it clears the bar is
/// decided the first tick the obstacle is on screen, because intensity
/// belongs to the phase, not the note.
#[derive(Debug, Clone)]
struct Glitch {
    roll: f32,
    trigger_progress: f32,
    chance_checked: bool,
    can_glitch: bool,
    has_glitched: bool,
    glitch_time: f64,
}

/// A falling note-block, owned exclusively by the active obstacle list
#[derive(Debug, Clone)]
pub struct Obstacle {
    pub lane: u32,
    pub start_time: f64,
    pub end_time: f64,
    pub sound: Option<String>,
    pub lyric: &'static str,
    pub x: f32,
    pub width: f32,
    pub y: f32,
    pub height: f32,
    /// Hit-line score/sound/flare fires exactly once
    pub has_flared: bool,
    /// Visual glitch strength for the renderer, 0..=1
    pub glitch_intensity: f32,
    glitch: Glitch,
}

impl Obstacle {
    pub fn new(slide: &Slide, travel_time: f64, rng: &mut impl Rng) -> Self {
        let duration = slide.duration();
        let height = (duration * (FIELD_HEIGHT as f64 / travel_time)) as f32;
        Self {
            lane: slide.lane,
            start_time: slide.start_time,
            end_time: slide.end_time,
            sound: slide.sound_id().map(str::to_owned),
            lyric: pick_lyric(duration, rng),
            x: lane_x(slide.lane),
            width: lane_width(),
            y: -height,
            height,
            has_flared: false,
            glitch_intensity: 0.0,
            glitch: Glitch {
                roll: rng.random(),
                // Trigger somewhere midway through the screen
                trigger_progress: 0.35 + rng.random::<f32>() * 0.20,
                chance_checked: false,
                can_glitch: false,
                has_glitched: false,
                glitch_time: 0.0,
            },
        }
    }

    /// The clock value at which this obstacle enters the field
    pub fn spawn_time(&self, travel_time: f64) -> f64 {
        self.start_time - travel_time
    }

    /// Recompute position from the clock and advance the glitch sub-state
    pub fn update(&mut self, now: f64, travel_time: f64, intensity: f32, rng: &mut impl Rng) {
        let progress = ((now - self.spawn_time(travel_time)) / travel_time) as f32;
        let bottom = progress * hit_line_y();
        self.y = bottom - self.height;

        if !self.glitch.chance_checked && progress > 0.0 {
            self.glitch.chance_checked = true;
            self.glitch.can_glitch = self.glitch.roll < GLITCH_MAX_CHANCE * intensity;
        }

        if self.glitch.can_glitch
            && !self.glitch.has_glitched
            && progress >= self.glitch.trigger_progress
            && progress < GLITCH_WINDOW_END
        {
            self.glitch.has_glitched = true;
            self.glitch.glitch_time = now;
            self.shift_lane(rng);
        }

        self.glitch_intensity = if self.glitch.has_glitched {
            let since = now - self.glitch.glitch_time;
            (1.0 - since / GLITCH_FADE_MS).max(0.0) as f32
        } else if self.glitch.can_glitch {
            // Subtle flicker hinting the note is unstable
            (0.3 + (now * 0.02).sin() as f32 * 0.2) * intensity
        } else {
            0.0
        };
    }

    /// Reassign to an adjacent lane; boundary lanes can only shift inward
    fn shift_lane(&mut self, rng: &mut impl Rng) {
        use crate::consts::LANE_COUNT;
        let new_lane = if self.lane == 0 {
            1
        } else if self.lane == LANE_COUNT - 1 {
            self.lane - 1
        } else if rng.random::<f32>() < 0.5 {
            self.lane - 1
        } else {
            self.lane + 1
        };
        self.lane = new_lane;
        self.x = lane_x(new_lane);
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.x, self.y, self.width, self.height)
    }

    /// Whether the block has scrolled past the bottom of the field
    pub fn is_off_screen(&self) -> bool {
        self.y > FIELD_HEIGHT
    }
}
