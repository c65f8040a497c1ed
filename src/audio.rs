//! Audio: chart music and per-note sound cues
//!
//! Sounds are plain audio elements loaded from the chart's sound map; cues
//! clone the element so overlapping notes overlap audibly. Every failure
//! degrades: missing music means a silent session on the wall clock, a
//! missing sound just skips its cue, and autoplay rejections are swallowed.

use std::collections::HashMap;

use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlAudioElement;

/// Fallback cue for notes with no assigned sound
const DEFAULT_HIT_SOUND: &str = "down-hit.wav";

pub struct AudioManager {
    music: Option<HtmlAudioElement>,
    sounds: HashMap<String, HtmlAudioElement>,
    fallback_hit: Option<HtmlAudioElement>,
    music_volume: f64,
    sfx_volume: f64,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioManager {
    pub fn new() -> Self {
        Self {
            music: None,
            sounds: HashMap::new(),
            fallback_hit: make_element(DEFAULT_HIT_SOUND),
            music_volume: 0.8,
            sfx_volume: 0.7,
        }
    }

    pub fn set_volumes(&mut self, music: f64, sfx: f64) {
        self.music_volume = music.clamp(0.0, 1.0);
        self.sfx_volume = sfx.clamp(0.0, 1.0);
        if let Some(m) = &self.music {
            m.set_volume(self.music_volume);
        }
    }

    /// Load the chart's music track. On failure the session simply has no
    /// music and the driver falls back to the wall clock.
    pub fn load_music(&mut self, path: &str) {
        self.music = make_element(path);
        if let Some(m) = &self.music {
            m.set_volume(self.music_volume);
        }
    }

    pub fn has_music(&self) -> bool {
        self.music.is_some()
    }

    pub fn music_element(&self) -> Option<&HtmlAudioElement> {
        self.music.as_ref()
    }

    /// Load every sound the chart declares. Individual failures skip that
    /// sound; the rest of the map still loads.
    pub fn load_chart_sounds(&mut self, sounds: &HashMap<String, String>) {
        for (id, path) in sounds {
            match make_element(path) {
                Some(el) => {
                    self.sounds.insert(id.clone(), el);
                }
                None => log::warn!("sound {id} failed to load, cue will be skipped"),
            }
        }
        log::info!("loaded {} chart sounds", self.sounds.len());
    }

    /// Cue a note sound by id; None plays the generic hit. Legacy charts
    /// name the clap sound "special2". An id the chart never loaded skips
    /// the cue entirely.
    pub fn play_note(&self, sound_id: Option<&str>) {
        let element = match sound_id {
            Some(id) => {
                let found = self
                    .sounds
                    .get(id)
                    .or_else(|| (id == "clap").then(|| self.sounds.get("special2")).flatten());
                if found.is_none() {
                    log::warn!("sound not found: {id}");
                }
                found
            }
            None => self.fallback_hit.as_ref(),
        };
        if let Some(el) = element {
            self.play_clone(el);
        }
    }

    /// Clone the element so an already-playing cue isn't cut off
    fn play_clone(&self, el: &HtmlAudioElement) {
        let Ok(node) = el.clone_node() else { return };
        let Ok(clone) = node.dyn_into::<HtmlAudioElement>() else {
            return;
        };
        clone.set_volume(self.sfx_volume);
        if let Ok(promise) = clone.play() {
            // Autoplay rejection is logged, never propagated
            wasm_bindgen_futures::spawn_local(async move {
                if JsFuture::from(promise).await.is_err() {
                    log::debug!("sound cue blocked by autoplay policy");
                }
            });
        }
    }

    /// Start (or restart) the music at a chart position, in ms
    pub fn play_music_from(&self, position_ms: f64) {
        if let Some(m) = &self.music {
            m.set_current_time(position_ms / 1000.0);
            m.set_volume(self.music_volume);
            if let Ok(promise) = m.play() {
                wasm_bindgen_futures::spawn_local(async move {
                    if JsFuture::from(promise).await.is_err() {
                        log::warn!("music autoplay blocked");
                    }
                });
            }
        }
    }

    pub fn pause_music(&self) {
        if let Some(m) = &self.music {
            let _ = m.pause();
        }
    }

    pub fn resume_music(&self) {
        if let Some(m) = &self.music {
            if let Ok(promise) = m.play() {
                wasm_bindgen_futures::spawn_local(async move {
                    let _ = JsFuture::from(promise).await;
                });
            }
        }
    }

    /// Music playback position in seconds, for the media clock
    pub fn music_position(&self) -> Option<f64> {
        self.music.as_ref().map(|m| m.current_time())
    }
}

fn make_element(path: &str) -> Option<HtmlAudioElement> {
    match HtmlAudioElement::new_with_src(path) {
        Ok(el) => {
            el.set_preload("auto");
            Some(el)
        }
        Err(e) => {
            log::warn!("failed to create audio element for {path}: {e:?}");
            None
        }
    }
}
