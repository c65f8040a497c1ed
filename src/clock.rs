//! Playback clock source
//!
//! Everything in the sim is timed off one clock: the music's playback
//! position when a track is loaded, or wall-clock time since session start
//! when it isn't. Pausing freezes the clock; seeking jumps it forward, and
//! the spawn cursor is written to tolerate that.

#[derive(Debug, Clone, Copy, PartialEq)]
enum Source {
    /// Media-element position (ms), fed in by the driver each frame
    Media { pos_ms: f64 },
    /// Frame timestamps relative to a session start timestamp
    Wall { start: f64, paused_at: Option<f64> },
}

/// The session's time authority. `now` is in chart milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameClock {
    source: Source,
}

impl GameClock {
    /// Clock backed by a media element. Call `set_media_position` every
    /// frame with the element's current position.
    pub fn media() -> Self {
        Self {
            source: Source::Media { pos_ms: 0.0 },
        }
    }

    /// Wall-clock fallback for silent sessions, anchored at the first
    /// frame's timestamp
    pub fn wall(start_ts: f64) -> Self {
        Self {
            source: Source::Wall {
                start: start_ts,
                paused_at: None,
            },
        }
    }

    pub fn is_media(&self) -> bool {
        matches!(self.source, Source::Media { .. })
    }

    /// Feed the media position (seconds, as media elements report it)
    pub fn set_media_position(&mut self, seconds: f64) {
        if let Source::Media { pos_ms } = &mut self.source {
            *pos_ms = seconds * 1000.0;
        }
    }

    /// Current chart time in ms. `frame_ts` is the frame callback timestamp;
    /// media-backed clocks ignore it.
    pub fn now(&self, frame_ts: f64) -> f64 {
        match self.source {
            Source::Media { pos_ms } => pos_ms,
            Source::Wall { start, paused_at } => paused_at.unwrap_or(frame_ts) - start,
        }
    }

    /// Freeze a wall clock. Media clocks freeze themselves when the element
    /// is paused.
    pub fn pause(&mut self, frame_ts: f64) {
        if let Source::Wall { paused_at, .. } = &mut self.source {
            if paused_at.is_none() {
                *paused_at = Some(frame_ts);
            }
        }
    }

    /// Resume a paused wall clock, re-anchoring so no time elapsed while
    /// paused
    pub fn resume(&mut self, frame_ts: f64) {
        if let Source::Wall { start, paused_at } = &mut self.source {
            if let Some(at) = paused_at.take() {
                *start += frame_ts - at;
            }
        }
    }

    /// Jump to an explicit chart time (skip-to-time sessions)
    pub fn seek(&mut self, to_ms: f64, frame_ts: f64) {
        match &mut self.source {
            Source::Media { pos_ms } => *pos_ms = to_ms,
            Source::Wall { start, paused_at } => {
                let anchor = paused_at.unwrap_or(frame_ts);
                *start = anchor - to_ms;
            }
        }
    }
}
