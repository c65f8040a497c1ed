//! Chart model and JSON loading
//!
//! A chart binds a song to a timed sequence of gameplay events. It is loaded
//! once at session start and never mutated afterwards. Charts are authored
//! externally; this module only consumes them.

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

use crate::consts::{BASE_BPM, BASE_TRAVEL_TIME_MS, BULLET_RADIUS, FIELD_WIDTH};

/// Failure to produce a usable chart. A session cannot start without one.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("chart is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Gameplay mode of a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PhaseKind {
    Dodge,
    #[serde(alias = "touhou")]
    BulletHell,
}

/// Bullet pattern algorithm names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Spiral,
    Radial,
    Aimed,
    Wave,
    Random,
}

/// A dodge-mode note: a falling block in one lane
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub lane: u32,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default)]
    pub sound: Option<String>,
    #[serde(default)]
    pub note_type: Option<String>,
}

impl Slide {
    /// Note duration; drives block height and lyric selection
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Sound id for the hit-line cue: explicit `sound`, else the note type
    pub fn sound_id(&self) -> Option<&str> {
        self.sound.as_deref().or(self.note_type.as_deref())
    }
}

/// A bullet-hell event: one pattern spawner's configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternSpec {
    pub pattern: PatternKind,
    pub start_time: f64,
    #[serde(default = "default_pattern_x")]
    pub x: f32,
    #[serde(default = "default_pattern_y")]
    pub y: f32,
    #[serde(default = "default_bullet_speed")]
    pub bullet_speed: f32,
    #[serde(default = "default_bullet_count")]
    pub bullet_count: u32,
    /// How long the spawner stays active (ms)
    #[serde(default = "default_duration")]
    pub duration: f64,
    /// Time between bursts (ms)
    #[serde(default = "default_interval")]
    pub interval: f64,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub glow_color: Option<String>,
    #[serde(default = "default_bullet_radius")]
    pub bullet_radius: f32,
    #[serde(default)]
    pub start_angle: f32,
    #[serde(default = "default_angle_step")]
    pub angle_step: f32,
    #[serde(default)]
    pub sound_id: Option<String>,
}

fn default_pattern_x() -> f32 {
    FIELD_WIDTH / 2.0
}
fn default_pattern_y() -> f32 {
    50.0
}
fn default_bullet_speed() -> f32 {
    3.0
}
fn default_bullet_count() -> u32 {
    12
}
fn default_duration() -> f64 {
    3000.0
}
fn default_interval() -> f64 {
    100.0
}
fn default_bullet_radius() -> f32 {
    BULLET_RADIUS
}
fn default_angle_step() -> f32 {
    0.15
}

/// One timed entry in a phase's event list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ChartEvent {
    Pattern(PatternSpec),
    Slide(Slide),
}

impl ChartEvent {
    pub fn start_time(&self) -> f64 {
        match self {
            ChartEvent::Slide(s) => s.start_time,
            ChartEvent::Pattern(p) => p.start_time,
        }
    }
}

/// A contiguous time window with one gameplay mode and an intensity level.
///
/// Phases are scanned in list order; the first whose `[start_time, end_time)`
/// window contains the clock is current. Overlapping windows are legal chart
/// data and resolve to the first match.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    #[serde(rename = "type")]
    pub kind: PhaseKind,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default)]
    pub intensity: f32,
    #[serde(rename = "slides", default)]
    pub events: Vec<ChartEvent>,
}

impl Phase {
    pub fn contains(&self, time_ms: f64) -> bool {
        time_ms >= self.start_time && time_ms < self.end_time
    }
}

/// Parsed chart: immutable after load
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    #[serde(default = "default_bpm")]
    pub bpm: f64,
    #[serde(default)]
    pub music: Option<String>,
    /// soundId -> audio file path
    #[serde(default)]
    pub sounds: HashMap<String, String>,
    #[serde(default)]
    pub phases: Vec<Phase>,
    /// Legacy single-mode charts carry a flat slide list instead of phases
    #[serde(default)]
    slides: Vec<ChartEvent>,
}

fn default_bpm() -> f64 {
    BASE_BPM
}

impl Chart {
    /// Parse a chart from JSON and normalize it for the engine:
    /// legacy flat-slide charts get a single indefinite dodge phase, and each
    /// phase's event list is sorted by start time (the spawn cursor assumes
    /// ordered events).
    pub fn from_json(json: &str) -> Result<Self, ChartError> {
        let mut chart: Chart = serde_json::from_str(json)?;
        chart.normalize();
        Ok(chart)
    }

    fn normalize(&mut self) {
        if self.phases.is_empty() {
            log::info!("chart has no phases, wrapping legacy slides in a dodge phase");
            self.phases.push(Phase {
                kind: PhaseKind::Dodge,
                start_time: 0.0,
                end_time: f64::INFINITY,
                intensity: 0.0,
                events: std::mem::take(&mut self.slides),
            });
        }
        for phase in &mut self.phases {
            phase
                .events
                .sort_by(|a, b| a.start_time().total_cmp(&b.start_time()));
        }
    }

    /// Lead time between an obstacle's spawn and its hit-line arrival,
    /// derived once from the chart's BPM: faster songs get shorter leads.
    pub fn travel_time_ms(&self) -> f64 {
        (BASE_TRAVEL_TIME_MS * BASE_BPM / self.bpm).round()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiphase_chart() {
        let json = r#"{
            "bpm": 180,
            "music": "song.mp3",
            "sounds": {"kick": "kick.wav"},
            "phases": [
                {"type": "dodge", "startTime": 0, "endTime": 10000, "intensity": 0.5,
                 "slides": [{"lane": 2, "startTime": 2000, "endTime": 2200, "sound": "kick"}]},
                {"type": "bulletHell", "startTime": 10000, "endTime": 20000, "intensity": 1.0,
                 "slides": [{"pattern": "radial", "startTime": 11000, "x": 400, "y": 80}]}
            ]
        }"#;
        let chart = Chart::from_json(json).unwrap();
        assert_eq!(chart.phases.len(), 2);
        assert_eq!(chart.phases[0].kind, PhaseKind::Dodge);
        assert_eq!(chart.phases[1].kind, PhaseKind::BulletHell);
        assert!(matches!(chart.phases[0].events[0], ChartEvent::Slide(_)));
        match &chart.phases[1].events[0] {
            ChartEvent::Pattern(p) => {
                assert_eq!(p.pattern, PatternKind::Radial);
                // unspecified fields take the engine defaults
                assert_eq!(p.bullet_count, 12);
                assert_eq!(p.interval, 100.0);
            }
            other => panic!("expected pattern event, got {other:?}"),
        }
    }

    #[test]
    fn accepts_legacy_touhou_phase_name() {
        let json = r#"{"bpm": 120, "phases": [
            {"type": "touhou", "startTime": 0, "endTime": 5000, "slides": []}
        ]}"#;
        let chart = Chart::from_json(json).unwrap();
        assert_eq!(chart.phases[0].kind, PhaseKind::BulletHell);
    }

    #[test]
    fn legacy_chart_becomes_indefinite_dodge_phase() {
        let json = r#"{"bpm": 120, "slides": [
            {"lane": 0, "startTime": 1000, "endTime": 1100},
            {"lane": 3, "startTime": 500, "endTime": 600}
        ]}"#;
        let chart = Chart::from_json(json).unwrap();
        assert_eq!(chart.phases.len(), 1);
        let phase = &chart.phases[0];
        assert_eq!(phase.kind, PhaseKind::Dodge);
        assert_eq!(phase.start_time, 0.0);
        assert_eq!(phase.end_time, f64::INFINITY);
        assert!(phase.contains(1e12));
        // loader sorts events by start time
        assert_eq!(phase.events[0].start_time(), 500.0);
        assert_eq!(phase.events[1].start_time(), 1000.0);
    }

    #[test]
    fn travel_time_scales_with_bpm() {
        let chart = Chart::from_json(r#"{"bpm": 180, "phases": []}"#).unwrap();
        assert_eq!(chart.travel_time_ms(), 800.0);
        let chart = Chart::from_json(r#"{"bpm": 120, "phases": []}"#).unwrap();
        assert_eq!(chart.travel_time_ms(), 1200.0);
    }

    #[test]
    fn slide_sound_falls_back_to_note_type() {
        let slide: Slide = serde_json::from_str(
            r#"{"lane": 1, "startTime": 0, "endTime": 100, "noteType": "clap"}"#,
        )
        .unwrap();
        assert_eq!(slide.sound_id(), Some("clap"));
    }

    #[test]
    fn invalid_json_is_a_load_error() {
        assert!(Chart::from_json("{not json").is_err());
    }
}
