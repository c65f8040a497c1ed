//! Game settings and preferences
//!
//! Persisted to LocalStorage, separately from anything session-scoped.

use serde::{Deserialize, Serialize};

/// User settings/preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Music volume (0.0 - 1.0)
    pub music_volume: f64,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f64,
    /// Background video layer
    pub bg_video_enabled: bool,
    /// Flares and particle effects
    pub vfx_enabled: bool,
    /// On-screen slider control for dodge mode
    pub dodge_slider_enabled: bool,
    /// On-screen touch buttons
    pub touch_controls_enabled: bool,
    /// Collisions are non-terminal
    pub god_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            music_volume: 0.8,
            sfx_volume: 0.7,
            bg_video_enabled: true,
            vfx_enabled: true,
            dodge_slider_enabled: false,
            touch_controls_enabled: false,
            god_mode: false,
        }
    }
}

impl Settings {
    /// LocalStorage key
    const STORAGE_KEY: &'static str = "bullet_beat_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(settings) = serde_json::from_str(&json) {
                    log::info!("Loaded settings from LocalStorage");
                    return settings;
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let s: Settings = serde_json::from_str(r#"{"god_mode": true}"#).unwrap();
        assert!(s.god_mode);
        assert_eq!(s.music_volume, 0.8);
        assert!(s.vfx_enabled);
    }
}
