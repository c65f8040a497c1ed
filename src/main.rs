//! Bullet Beat entry point
//!
//! Handles platform wiring and runs the frame loop. All gameplay decisions
//! live in `bullet_beat::sim`; this file only moves data between the DOM,
//! the audio elements, and the session state.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{Document, HtmlCanvasElement, HtmlInputElement, KeyboardEvent};

    use bullet_beat::audio::AudioManager;
    use bullet_beat::chart::{Chart, PhaseKind};
    use bullet_beat::clock::GameClock;
    use bullet_beat::playback::{PlaybackCursor, PlaybackScript};
    use bullet_beat::renderer::RenderState;
    use bullet_beat::sim::{
        EndReason, GameEvent, InputAction, SessionState, SessionStatus, StatsSnapshot, tick,
    };
    use bullet_beat::Settings;

    const CHART_FILE: &str = "chart.json";
    const PLAYBACK_FILE: &str = "playback.json";
    /// "Skip to the drop" debug entry point
    const SKIP_TO_MS: f64 = 66000.0;

    /// Platform-side state: the session plus everything it talks to
    pub struct Game {
        chart: Option<Chart>,
        state: Option<SessionState>,
        clock: GameClock,
        renderer: Option<RenderState>,
        audio: AudioManager,
        audio_loaded: bool,
        settings: Settings,
    }

    impl Game {
        fn new(settings: Settings) -> Self {
            Self {
                chart: None,
                state: None,
                clock: GameClock::media(),
                renderer: None,
                audio: AudioManager::new(),
                audio_loaded: false,
                settings,
            }
        }
    }

    fn document() -> Document {
        web_sys::window().expect("no window").document().expect("no document")
    }

    fn perf_now() -> f64 {
        web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .unwrap_or(0.0)
    }

    fn set_text(id: &str, value: &str) {
        if let Some(el) = document().get_element_by_id(id) {
            el.set_text_content(Some(value));
        }
    }

    fn set_hidden(id: &str, hidden: bool) {
        if let Some(el) = document().get_element_by_id(id) {
            if hidden {
                let _ = el.class_list().add_1("hidden");
            } else {
                let _ = el.class_list().remove_1("hidden");
            }
        }
    }

    async fn fetch_text(url: &str) -> Result<String, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let resp: web_sys::Response =
            JsFuture::from(window.fetch_with_str(url)).await?.dyn_into()?;
        if !resp.ok() {
            return Err(JsValue::from_str(&format!("HTTP {}", resp.status())));
        }
        JsFuture::from(resp.text()?)
            .await?
            .as_string()
            .ok_or_else(|| JsValue::from_str("body is not text"))
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("failed to init logger");
        log::info!("Bullet Beat starting...");

        let settings = Settings::load();
        let game = Rc::new(RefCell::new(Game::new(settings)));

        if let Some(canvas) = document()
            .get_element_by_id("gameCanvas")
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
        {
            match RenderState::new(&canvas) {
                Ok(r) => game.borrow_mut().renderer = Some(r),
                Err(e) => log::error!("renderer init failed: {e:?}"),
            }
        } else {
            log::error!("no #gameCanvas element");
        }

        // Pre-load the chart; a session cannot start without it
        match fetch_text(CHART_FILE).await {
            Ok(json) => match Chart::from_json(&json) {
                Ok(chart) => {
                    log::info!("chart loaded: {} phases", chart.phases.len());
                    game.borrow_mut().chart = Some(chart);
                }
                Err(e) => log::error!("chart rejected: {e}"),
            },
            Err(e) => log::error!("chart fetch failed: {e:?}"),
        }

        setup_buttons(&game);
        setup_keyboard(&game);
        setup_slider(&game);

        log::info!("Bullet Beat ready");
    }

    fn start_session(
        game: &Rc<RefCell<Game>>,
        skip_ms: Option<f64>,
        playback: Option<PlaybackCursor>,
    ) {
        {
            let g = &mut *game.borrow_mut();
            let Some(chart) = g.chart.clone() else {
                log::error!("no chart loaded, cannot start");
                return;
            };

            if !g.audio_loaded {
                if let Some(music) = &chart.music {
                    g.audio.load_music(music);
                }
                g.audio.load_chart_sounds(&chart.sounds);
                g.audio_loaded = true;
            }
            g.audio
                .set_volumes(g.settings.music_volume, g.settings.sfx_volume);

            let seed = js_sys::Date::now() as u64;
            let mut state = match skip_ms {
                Some(t) => SessionState::new_at(chart, seed, t),
                None => SessionState::new(chart, seed),
            };
            state.god_mode = g.settings.god_mode;
            state.playback = playback;
            g.state = Some(state);

            let start_pos = skip_ms.unwrap_or(0.0);
            if g.audio.has_music() {
                g.clock = GameClock::media();
                g.clock.set_media_position(start_pos / 1000.0);
                g.audio.play_music_from(start_pos);
            } else {
                // Silent session: wall clock anchored to the frame timeline
                let now = perf_now();
                g.clock = GameClock::wall(now);
                g.clock.seek(start_pos, now);
            }

            if let Some(r) = g.renderer.as_mut() {
                r.clear_effects();
            }

            set_hidden("menu", true);
            set_hidden("gameOver", true);
            set_hidden("gameComplete", true);
            set_hidden("pauseMenu", true);
            set_hidden("dodgeSlider", !g.settings.dodge_slider_enabled);
        }
        wire_music_ended(game);
        schedule_frame(game.clone());
    }

    /// Hook the music's `ended` event to the session-complete transition.
    /// Wired after every start so restarts keep working.
    fn wire_music_ended(game: &Rc<RefCell<Game>>) {
        let g = game.borrow();
        let Some(el) = g.audio.music_element().cloned() else {
            return;
        };
        drop(g);

        let game = game.clone();
        let closure = Closure::<dyn FnMut()>::new(move || {
            let mut g = game.borrow_mut();
            if let Some(state) = g.state.as_mut() {
                if state.is_running() {
                    log::info!("music ended, session complete");
                    state.end(EndReason::Completed);
                }
            }
        });
        el.set_onended(Some(closure.as_ref().unchecked_ref()));
        closure.forget();
    }

    fn schedule_frame(game: Rc<RefCell<Game>>) {
        let window = web_sys::window().expect("no window");
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        let keep_running = {
            let g = &mut *game.borrow_mut();
            let Some(state) = g.state.as_mut() else {
                return;
            };

            // Media position drives the clock when music is present
            if let Some(pos) = g.audio.music_position() {
                g.clock.set_media_position(pos);
            }
            let now = g.clock.now(time);

            tick(state, now);

            let events: Vec<GameEvent> = state.drain_events().collect();
            let stats = state.stats();
            for event in &events {
                match event {
                    GameEvent::NoteHit { sound, x } => {
                        g.audio.play_note(sound.as_deref());
                        if g.settings.vfx_enabled {
                            if let Some(r) = g.renderer.as_mut() {
                                r.add_flare(*x);
                            }
                        }
                    }
                    GameEvent::PatternStarted { sound } => g.audio.play_note(Some(sound)),
                    GameEvent::Graze { .. } => {}
                    GameEvent::PhaseChanged { kind, .. } => {
                        let show_slider =
                            *kind == PhaseKind::Dodge && g.settings.dodge_slider_enabled;
                        set_hidden("dodgeSlider", !show_slider);
                        set_hidden("hellControls", *kind != PhaseKind::BulletHell);
                    }
                    GameEvent::Ended { reason } => {
                        g.audio.pause_music();
                        show_end_screen(*reason, &stats);
                    }
                }
            }

            update_hud(state);
            let state = g.state.as_ref().expect("state set above");
            if let Some(r) = g.renderer.as_mut() {
                r.render(state);
            }
            state.status == SessionStatus::Running
        };

        if keep_running {
            schedule_frame(game);
        }
    }

    fn update_hud(state: &SessionState) {
        set_text("score", &state.score.to_string());
        set_text("combo", &state.combo.to_string());
        set_text("graze", &state.graze_count.to_string());
    }

    fn show_end_screen(reason: EndReason, stats: &StatsSnapshot) {
        match reason {
            EndReason::Collision => {
                set_text("finalScore", &stats.score.to_string());
                set_text("finalCombo", &stats.max_combo.to_string());
                set_text("finalGraze", &stats.graze_count.to_string());
                set_hidden("gameOver", false);
            }
            EndReason::Completed => {
                set_text("completeScore", &stats.score.to_string());
                set_text("completeCombo", &stats.max_combo.to_string());
                set_text("completeGraze", &stats.graze_count.to_string());
                set_text("completionGrade", stats.grade);
                set_hidden("gameComplete", false);
            }
        }
        set_hidden("dodgeSlider", true);
    }

    fn toggle_pause(game: &Rc<RefCell<Game>>) {
        let mut resumed = false;
        {
            let g = &mut *game.borrow_mut();
            let Some(state) = g.state.as_mut() else {
                return;
            };
            match state.status {
                SessionStatus::Running => {
                    state.pause();
                    g.clock.pause(perf_now());
                    g.audio.pause_music();
                    set_hidden("pauseMenu", false);
                }
                SessionStatus::Paused => {
                    state.resume();
                    // Re-anchor before the first resumed tick
                    g.clock.resume(perf_now());
                    g.audio.resume_music();
                    set_hidden("pauseMenu", true);
                    resumed = true;
                }
                SessionStatus::Ended(_) => {}
            }
        }
        if resumed {
            schedule_frame(game.clone());
        }
    }

    fn start_normal(game: &Rc<RefCell<Game>>) {
        start_session(game, None, None);
    }

    fn start_skip(game: &Rc<RefCell<Game>>) {
        start_session(game, Some(SKIP_TO_MS), None);
    }

    fn start_playback(game: &Rc<RefCell<Game>>) {
        let game = game.clone();
        wasm_bindgen_futures::spawn_local(async move {
            match fetch_text(PLAYBACK_FILE).await {
                Ok(json) => match PlaybackScript::from_json(&json) {
                    Ok(script) => {
                        start_session(&game, None, Some(PlaybackCursor::new(script)))
                    }
                    Err(e) => log::error!("playback file rejected: {e}"),
                },
                Err(e) => log::error!("playback fetch failed: {e:?}"),
            }
        });
    }

    fn setup_buttons(game: &Rc<RefCell<Game>>) {
        wire_click("startBtn", game, start_normal);
        wire_click("skipBtn", game, start_skip);
        wire_click("restartBtn", game, start_normal);
        wire_click("completeRestartBtn", game, start_normal);
        wire_click("playbackBtn", game, start_playback);
        wire_click("pauseBtn", game, toggle_pause);
        wire_click("resumeBtn", game, toggle_pause);
    }

    fn wire_click(id: &str, game: &Rc<RefCell<Game>>, handler: fn(&Rc<RefCell<Game>>)) {
        let Some(el) = document().get_element_by_id(id) else {
            return;
        };
        let game = game.clone();
        let closure = Closure::<dyn FnMut(web_sys::MouseEvent)>::new(move |_| handler(&game));
        let _ = el.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    /// Map a key to the input surface. The sim routes actions to whichever
    /// player variant is live, so the mapping itself is mode-agnostic.
    fn key_to_action(key: &str, down: bool) -> Option<InputAction> {
        Some(match (key, down) {
            ("ArrowLeft" | "a" | "A", true) => InputAction::MoveLeft,
            ("ArrowLeft" | "a" | "A", false) => InputAction::StopLeft,
            ("ArrowRight" | "d" | "D", true) => InputAction::MoveRight,
            ("ArrowRight" | "d" | "D", false) => InputAction::StopRight,
            ("ArrowUp" | "w" | "W", true) => InputAction::MoveUp,
            ("ArrowUp" | "w" | "W", false) => InputAction::StopUp,
            ("ArrowDown" | "s" | "S", true) => InputAction::MoveDown,
            ("ArrowDown" | "s" | "S", false) => InputAction::StopDown,
            ("Shift", down) => InputAction::Focus(down),
            _ => return None,
        })
    }

    fn setup_keyboard(game: &Rc<RefCell<Game>>) {
        let window = web_sys::window().expect("no window");

        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let key = event.key();
                if key == "Escape" {
                    toggle_pause(&game);
                    return;
                }
                if let Some(action) = key_to_action(&key, true) {
                    event.prevent_default();
                    if let Some(state) = game.borrow_mut().state.as_mut() {
                        state.handle_input(action);
                    }
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                if let Some(action) = key_to_action(&event.key(), false) {
                    if let Some(state) = game.borrow_mut().state.as_mut() {
                        state.handle_input(action);
                    }
                }
            });
            let _ =
                window.add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Absolute-position slider control for dodge mode
    fn setup_slider(game: &Rc<RefCell<Game>>) {
        let Some(el) = document().get_element_by_id("playerSlider") else {
            return;
        };
        let game = game.clone();
        let closure = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
            let Some(input) = event
                .target()
                .and_then(|t| t.dyn_into::<HtmlInputElement>().ok())
            else {
                return;
            };
            let Ok(value) = input.value().parse::<f32>() else {
                return;
            };
            let mut g = game.borrow_mut();
            if !g.settings.dodge_slider_enabled {
                return;
            }
            if let Some(state) = g.state.as_mut() {
                if let bullet_beat::sim::Player::Dodge(p) = &mut state.player {
                    p.set_position(value / 100.0);
                }
            }
        });
        let _ = el.add_event_listener_with_callback("input", closure.as_ref().unchecked_ref());
        closure.forget();
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use bullet_beat::chart::Chart;
    use bullet_beat::sim::{self, SessionState};

    env_logger::init();

    // Headless run: drive the whole chart at 60 ticks/sec on a synthetic
    // clock and print the session stats. Handy for sanity-checking charts.
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "chart.json".to_string());
    let json = match std::fs::read_to_string(&path) {
        Ok(json) => json,
        Err(e) => {
            log::error!("cannot read {path}: {e}");
            return;
        }
    };
    let chart = match Chart::from_json(&json) {
        Ok(chart) => chart,
        Err(e) => {
            log::error!("chart rejected: {e}");
            return;
        }
    };

    let end = chart
        .phases
        .iter()
        .map(|p| p.end_time)
        .fold(0.0_f64, f64::max)
        .min(180_000.0);

    let mut state = SessionState::new(chart, 0xBEA7);
    state.god_mode = true; // nobody is holding the controls

    let mut now = 0.0;
    while now <= end {
        sim::tick(&mut state, now);
        state.drain_events().for_each(drop);
        now += 1000.0 / 60.0;
    }

    let stats = state.stats();
    println!(
        "headless run of {path}: score={} max_combo={} graze={} accuracy={:.1}% grade={}",
        stats.score, stats.max_combo, stats.graze_count, stats.accuracy, stats.grade
    );
}
