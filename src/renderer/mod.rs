//! Canvas-2d presentation of the sim state
//!
//! Deliberately thin: the sim owns every gameplay number, the renderer only
//! paints what it is handed. Cosmetic state that persists across frames
//! (hit-line flares, frame counter) lives on the renderer struct, not in
//! captured closures.

use std::f64::consts::TAU;

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::chart::PhaseKind;
use crate::consts::*;
use crate::hit_line_y;
use crate::sim::{Player, SessionState};

const BACKGROUND: &str = "#0a0a0f";
const OBSTACLE_COLOR: &str = "#6b5fff";
const HIT_LINE_COLOR: &str = "#e94560";
const PLAYER_COLOR: &str = "rgba(255, 255, 255, 0.95)";

/// Flare lifetime in frames
const FLARE_FRAMES: u32 = 24;

struct Flare {
    x: f64,
    age: u32,
}

/// Renderer-owned state: the 2d context plus cross-frame cosmetic bits
pub struct RenderState {
    ctx: CanvasRenderingContext2d,
    flares: Vec<Flare>,
}

impl RenderState {
    pub fn new(canvas: &HtmlCanvasElement) -> Result<Self, JsValue> {
        canvas.set_width(FIELD_WIDTH as u32);
        canvas.set_height(FIELD_HEIGHT as u32);
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self {
            ctx,
            flares: Vec::new(),
        })
    }

    /// Queue a hit-line flare (driver calls this on NoteHit events)
    pub fn add_flare(&mut self, x: f32) {
        self.flares.push(Flare { x: x as f64, age: 0 });
    }

    pub fn clear_effects(&mut self) {
        self.flares.clear();
    }

    /// Paint one frame of the session
    pub fn render(&mut self, state: &SessionState) {
        let ctx = &self.ctx;

        ctx.set_global_alpha(1.0);
        ctx.set_fill_style_str(BACKGROUND);
        ctx.fill_rect(0.0, 0.0, FIELD_WIDTH as f64, FIELD_HEIGHT as f64);

        match state.mode() {
            PhaseKind::Dodge => self.render_dodge(state),
            PhaseKind::BulletHell => self.render_bullet_hell(state),
        }

        self.render_flares();
    }

    fn render_dodge(&self, state: &SessionState) {
        let ctx = &self.ctx;

        // Hit-line
        ctx.set_stroke_style_str(HIT_LINE_COLOR);
        ctx.set_line_width(2.0);
        ctx.begin_path();
        ctx.move_to(0.0, hit_line_y() as f64);
        ctx.line_to(FIELD_WIDTH as f64, hit_line_y() as f64);
        ctx.stroke();

        for ob in &state.obstacles {
            let (x, y) = (ob.x as f64, ob.y as f64);
            let (w, h) = (ob.width as f64, ob.height as f64);

            // Chromatic ghosting while a glitch is winding up or fading out
            if ob.glitch_intensity > 0.0 {
                let off = ob.glitch_intensity as f64 * 12.0;
                ctx.set_global_alpha(ob.glitch_intensity as f64 * 0.6);
                ctx.set_fill_style_str("#00ffff");
                ctx.fill_rect(x - off, y - off / 2.0, w, h);
                ctx.set_fill_style_str("#ff0000");
                ctx.fill_rect(x + off, y + off / 2.0, w, h);
                ctx.set_global_alpha(1.0);
            }

            ctx.set_fill_style_str(OBSTACLE_COLOR);
            ctx.fill_rect(x, y, w, h);

            // Lyric, one glyph per line down the block
            ctx.set_fill_style_str("rgba(240, 240, 240, 0.9)");
            ctx.set_font("bold 28px serif");
            ctx.set_text_align("center");
            let cx = x + w / 2.0;
            for (i, ch) in ob.lyric.chars().enumerate() {
                let cy = y + 30.0 + i as f64 * 30.0;
                if cy > y + h {
                    break;
                }
                let _ = ctx.fill_text(&ch.to_string(), cx, cy);
            }
        }

        if let Player::Dodge(p) = &state.player {
            let bounds = p.bounds();
            self.ctx.set_fill_style_str(PLAYER_COLOR);
            self.ctx.fill_rect(
                bounds.x as f64,
                bounds.y as f64,
                bounds.w as f64,
                bounds.h as f64,
            );
        }
    }

    fn render_bullet_hell(&self, state: &SessionState) {
        let ctx = &self.ctx;

        for bullet in state.bullets.iter_live() {
            let (x, y, r) = (bullet.pos.x as f64, bullet.pos.y as f64, bullet.radius as f64);
            ctx.set_fill_style_str(&format!("#{:06x}", bullet.color));
            ctx.begin_path();
            let _ = ctx.arc(x, y, r, 0.0, TAU);
            ctx.fill();
            // Bright core keeps bullets readable against the background
            ctx.set_fill_style_str("#ffffff");
            ctx.begin_path();
            let _ = ctx.arc(x, y, r * 0.4, 0.0, TAU);
            ctx.fill();
        }

        if let Player::BulletHell(p) = &state.player {
            let (x, y) = (p.pos.x as f64, p.pos.y as f64);

            ctx.set_fill_style_str("rgba(100, 220, 255, 0.9)");
            ctx.begin_path();
            let _ = ctx.arc(x, y, HELL_VISUAL_RADIUS as f64, 0.0, TAU);
            ctx.fill();

            // The part that actually matters: the hit core
            ctx.set_fill_style_str("#ffffff");
            ctx.begin_path();
            let _ = ctx.arc(x, y, HELL_HITBOX_RADIUS as f64, 0.0, TAU);
            ctx.fill();

            if p.focused {
                ctx.set_stroke_style_str("rgba(255, 120, 120, 0.8)");
                ctx.set_line_width(2.0);
                ctx.begin_path();
                let _ = ctx.arc(x, y, (HELL_VISUAL_RADIUS + 4.0) as f64, 0.0, TAU);
                ctx.stroke();
            }
        }

        ctx.set_fill_style_str("rgba(255, 255, 255, 0.8)");
        ctx.set_font("bold 20px sans-serif");
        ctx.set_text_align("left");
        let _ = ctx.fill_text(&format!("Graze: {}", state.graze_count), 20.0, 80.0);
    }

    fn render_flares(&mut self) {
        let ctx = &self.ctx;
        for flare in &mut self.flares {
            flare.age += 1;
            let t = flare.age as f64 / FLARE_FRAMES as f64;
            ctx.set_global_alpha((1.0 - t).max(0.0));
            ctx.set_fill_style_str(HIT_LINE_COLOR);
            ctx.begin_path();
            let _ = ctx.arc(flare.x, hit_line_y() as f64, 6.0 + t * 30.0, 0.0, TAU);
            ctx.fill();
        }
        ctx.set_global_alpha(1.0);
        self.flares.retain(|f| f.age < FLARE_FRAMES);
    }
}
