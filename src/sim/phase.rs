//! Phase state machine and spawn cursor
//!
//! The phase machine decides which chart phase owns the clock and performs
//! the transition side effects; the spawn cursor walks the bound phase's
//! event queue and materializes entities the moment the clock crosses each
//! event's spawn time. Both run at the top of every tick, before any entity
//! is updated, so a fresh phase never sees stale state.

use crate::chart::{ChartEvent, Phase, PhaseKind};
use crate::consts::PATTERN_SPAWN_LEAD_MS;
use crate::sim::bullet::BulletSpawner;
use crate::sim::obstacle::Obstacle;
use crate::sim::state::{GameEvent, Player, SessionState};

/// Monotonic index into the active phase's event queue. Only ever moves
/// forward; a clock jump makes one `advance` pass spawn everything it
/// skipped over.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpawnCursor {
    next: usize,
}

impl SpawnCursor {
    pub fn index(&self) -> usize {
        self.next
    }

    pub fn advance(&mut self) {
        self.next += 1;
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

/// First phase whose `[start, end)` window contains `now`, by scan order.
/// Overlapping windows resolve to the earlier entry; this is documented
/// policy, not a data error.
pub fn current_phase_index(phases: &[Phase], now: f64) -> Option<usize> {
    phases.iter().position(|p| p.contains(now))
}

/// Evaluate the transition rule. When no phase matches the engine holds its
/// last state.
pub fn update(state: &mut SessionState, now: f64) {
    let Some(candidate) = current_phase_index(&state.chart.phases, now) else {
        return;
    };
    if state.phase_index == Some(candidate) {
        return;
    }

    let old_mode = state.mode();
    let phase = &state.chart.phases[candidate];
    let kind = phase.kind;
    log::info!(
        "phase {} ({:?}) [{} - {}), intensity {}",
        candidate,
        kind,
        phase.start_time,
        phase.end_time,
        phase.intensity
    );

    // Bind the new phase's queue, dropping pre-skip events in skip mode
    let skip_from = state.skip_from.unwrap_or(f64::NEG_INFINITY);
    state.event_queue = phase
        .events
        .iter()
        .filter(|e| e.start_time() >= skip_from)
        .cloned()
        .collect();
    state.cursor.reset();

    state.obstacles.clear();
    if old_mode == PhaseKind::BulletHell || kind == PhaseKind::BulletHell {
        state.bullets.clear();
        state.spawners.clear();
    }
    if kind == PhaseKind::BulletHell {
        state.graze_count = 0;
    }

    state.player = Player::for_phase(kind);
    state.phase_index = Some(candidate);
    state.push_event(GameEvent::PhaseChanged { index: candidate, kind });
}

/// Advance the spawn cursor: spawn every queued event whose spawn time the
/// clock has reached. Dodge notes lead by the travel time so they arrive at
/// the hit-line on the beat; patterns lead by a fixed small constant.
pub fn advance_spawning(state: &mut SessionState, now: f64) {
    let Some(index) = state.phase_index else {
        return;
    };
    let kind = state.chart.phases[index].kind;

    while state.cursor.index() < state.event_queue.len() {
        let event = &state.event_queue[state.cursor.index()];
        let spawn_time = match event {
            ChartEvent::Slide(s) => s.start_time - state.travel_time,
            ChartEvent::Pattern(p) => p.start_time - PATTERN_SPAWN_LEAD_MS,
        };
        if now < spawn_time {
            break;
        }

        let event = event.clone();
        match (kind, event) {
            (PhaseKind::Dodge, ChartEvent::Slide(slide)) => {
                let obstacle = Obstacle::new(&slide, state.travel_time, &mut state.rng);
                state.obstacles.push(obstacle);
            }
            (PhaseKind::BulletHell, ChartEvent::Pattern(spec)) => {
                let spawner = BulletSpawner::from_spec(&spec, &mut state.rng);
                state.spawners.push(spawner);
            }
            (kind, event) => {
                // Chart data mismatching its phase mode is dropped, not fatal
                log::warn!(
                    "ignoring {} event at {} in a {:?} phase",
                    match event {
                        ChartEvent::Slide(_) => "slide",
                        ChartEvent::Pattern(_) => "pattern",
                    },
                    event.start_time(),
                    kind
                );
            }
        }
        state.cursor.advance();
    }
}
