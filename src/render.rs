//! Canvas drawing. Reads the session and never mutates game state; the only
//! thing it owns is the scroll offset of the lane markings.

use crate::accessibility::AccessibilitySettings;
use crate::config::FRAME_MS;
use crate::environments::{Environment, EnvironmentManager, WeatherParticle};
use crate::game::modes::{GameModeId, TIME_TRIAL_MS};
use crate::game::obstacles::{Obstacle, ObstacleKind};
use crate::game::particles::{Particle, ParticleShape};
use crate::game::player::Player;
use crate::game::powerups::{PowerUp, PowerUpKind};
use crate::game::{GameState, MAX_DELTA_MS, Session};
use std::f64::consts::{PI, TAU};
use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

const DASH_LEN: f64 = 20.0;
const DASH_PERIOD: f64 = 40.0;

pub struct Renderer {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    road_offset: f64,
}

impl Renderer {
    pub fn new(canvas: HtmlCanvasElement, ctx: CanvasRenderingContext2d) -> Self {
        Self { canvas, ctx, road_offset: 0.0 }
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    /// Draw one frame. Order: sky and weather, road, power-ups, obstacles,
    /// player, particles, then the in-canvas HUD.
    pub fn draw_frame(
        &mut self,
        s: &Session,
        env: &EnvironmentManager,
        a11y: &AccessibilitySettings,
        delta_ms: f64,
    ) {
        let w = self.canvas.width() as f64;
        let h = self.canvas.height() as f64;
        let theme = env.current();
        if s.state == GameState::Playing {
            let frames = delta_ms.min(MAX_DELTA_MS) / FRAME_MS;
            self.road_offset = (self.road_offset + s.obstacles.effective_speed() * frames) % DASH_PERIOD;
        }

        self.ctx.save();
        if !a11y.reduced_motion {
            let (dx, dy) = s.shake.offset();
            self.ctx.translate(dx, dy).ok();
        }

        self.background(theme, w, h);
        self.weather(&env.weather);
        self.road(s, theme, h);
        for p in &s.powerups.powerups {
            self.powerup(p);
        }
        for o in &s.obstacles.obstacles {
            self.obstacle(o);
        }
        if s.state != GameState::Menu {
            self.player(&s.player, s.powerups.has_shield());
        }
        for p in &s.particles.particles {
            self.particle(p);
        }
        self.ctx.set_global_alpha(1.0);
        self.ctx.restore();

        self.hud(s, a11y, w);
        match s.state {
            GameState::Countdown => self.banner(s.countdown_label(), w, h, 72),
            GameState::Paused => self.banner("PAUSED", w, h, 48),
            _ => {}
        }
    }

    fn background(&self, theme: &Environment, w: f64, h: f64) {
        let grad = self.ctx.create_linear_gradient(0.0, 0.0, 0.0, h);
        if grad.add_color_stop(0.0, theme.sky_color).is_ok()
            && grad.add_color_stop(1.0, theme.bg_color).is_ok()
        {
            self.ctx.set_fill_style_canvas_gradient(&grad);
        } else {
            self.ctx.set_fill_style_str(theme.bg_color);
        }
        self.ctx.fill_rect(0.0, 0.0, w, h);
    }

    fn weather(&self, particles: &[WeatherParticle]) {
        for wp in particles {
            match *wp {
                WeatherParticle::Drop { x, y, length, opacity, .. } => {
                    self.ctx.set_stroke_style_str(&format!("rgba(174,194,224,{opacity:.2})"));
                    self.ctx.set_line_width(1.0);
                    self.ctx.begin_path();
                    self.ctx.move_to(x, y);
                    self.ctx.line_to(x - 1.0, y + length);
                    self.ctx.stroke();
                }
                WeatherParticle::Star { x, y, size, twinkle } => {
                    let alpha = 0.5 + twinkle.sin() * 0.5;
                    self.ctx.set_fill_style_str(&format!("rgba(255,255,255,{alpha:.2})"));
                    self.ctx.fill_rect(x, y, size, size);
                }
                WeatherParticle::Fog { x, y, radius, opacity, .. } => {
                    self.ctx.set_fill_style_str(&format!("rgba(200,200,200,{opacity:.2})"));
                    self.ctx.begin_path();
                    self.ctx.arc(x, y, radius, 0.0, TAU).ok();
                    self.ctx.fill();
                }
            }
        }
    }

    fn road(&self, s: &Session, theme: &Environment, h: f64) {
        let cfg = &s.cfg;
        self.ctx.set_fill_style_str(theme.road_color);
        self.ctx.fill_rect(cfg.road_left_x, 0.0, cfg.road_width, h);

        self.ctx.set_fill_style_str("#ffffff");
        self.ctx.fill_rect(cfg.road_left_x - 4.0, 0.0, 4.0, h);
        self.ctx.fill_rect(cfg.road_left_x + cfg.road_width, 0.0, 4.0, h);

        self.ctx.set_fill_style_str(theme.lane_color);
        let lane_w = cfg.lane_width();
        for i in 1..cfg.num_lanes {
            let x = cfg.road_left_x + f64::from(i) * lane_w - 2.0;
            let mut y = self.road_offset - DASH_PERIOD;
            while y < h {
                self.ctx.fill_rect(x, y, 4.0, DASH_LEN);
                y += DASH_PERIOD;
            }
        }
    }

    fn powerup(&self, p: &PowerUp) {
        let cx = p.x + p.width / 2.0;
        let cy = p.y + p.height / 2.0;
        let r = p.width / 2.0;
        self.ctx.set_shadow_color(p.kind.color());
        self.ctx.set_shadow_blur(12.0);
        self.ctx.set_fill_style_str(p.kind.color());
        self.ctx.begin_path();
        self.ctx.arc(cx, cy, r, 0.0, TAU).ok();
        self.ctx.fill();
        self.ctx.set_shadow_blur(0.0);

        self.ctx.set_fill_style_str("#ffffff");
        self.ctx.set_font("bold 18px sans-serif");
        self.ctx.set_text_align("center");
        self.ctx.set_text_baseline("middle");
        let glyph = match p.kind {
            PowerUpKind::Shield => "S",
            PowerUpKind::SlowMo => "T",
            PowerUpKind::Points => "+",
            PowerUpKind::Multiplier => "x2",
        };
        self.ctx.fill_text(glyph, cx, cy).ok();
    }

    fn obstacle(&self, o: &Obstacle) {
        match o.kind {
            ObstacleKind::Car => {
                self.ctx.set_fill_style_str(o.color);
                self.ctx.fill_rect(o.x, o.y, o.width, o.height);
                self.ctx.set_fill_style_str("rgba(20,20,40,0.8)");
                self.ctx.fill_rect(o.x + 5.0, o.y + o.height - 20.0, o.width - 10.0, 12.0);
                self.ctx.set_fill_style_str("#ff0000");
                self.ctx.fill_rect(o.x + 4.0, o.y + o.height - 4.0, 8.0, 4.0);
                self.ctx.fill_rect(o.x + o.width - 12.0, o.y + o.height - 4.0, 8.0, 4.0);
            }
            ObstacleKind::Truck => {
                let cab = o.height * 0.3;
                self.ctx.set_fill_style_str("#444444");
                self.ctx.fill_rect(o.x, o.y, o.width, o.height - cab);
                self.ctx.set_fill_style_str(o.color);
                self.ctx.fill_rect(o.x + 2.0, o.y + o.height - cab, o.width - 4.0, cab);
            }
            ObstacleKind::Barrier => {
                self.ctx.set_fill_style_str(o.color);
                self.ctx.fill_rect(o.x, o.y, o.width, o.height);
                self.ctx.set_fill_style_str("#000000");
                let stripe = o.height / 6.0;
                for i in [1.0, 3.0, 5.0] {
                    self.ctx.fill_rect(o.x, o.y + i * stripe, o.width, stripe);
                }
            }
        }
    }

    fn player(&self, p: &Player, shielded: bool) {
        let cx = p.x + p.width / 2.0;
        let cy = p.y + p.height / 2.0;
        self.ctx.save();
        self.ctx.translate(cx, cy).ok();
        self.ctx.rotate(p.tilt).ok();

        let (hw, hh) = (p.width / 2.0, p.height / 2.0);
        self.ctx.set_fill_style_str(p.color);
        self.ctx.fill_rect(-hw, -hh, p.width, p.height);
        self.ctx.set_fill_style_str("rgba(150,200,255,0.85)");
        self.ctx.fill_rect(-hw + 5.0, -hh + 8.0, p.width - 10.0, 14.0);
        self.ctx.set_fill_style_str("#111111");
        for (wx, wy) in [(-hw - 3.0, -hh + 8.0), (hw - 3.0, -hh + 8.0), (-hw - 3.0, hh - 20.0), (hw - 3.0, hh - 20.0)] {
            self.ctx.fill_rect(wx, wy, 6.0, 12.0);
        }
        self.ctx.set_fill_style_str("#ffffcc");
        self.ctx.fill_rect(-hw + 4.0, -hh, 8.0, 4.0);
        self.ctx.fill_rect(hw - 12.0, -hh, 8.0, 4.0);

        if shielded {
            self.ctx.set_stroke_style_str("rgba(0,255,255,0.7)");
            self.ctx.set_line_width(3.0);
            self.ctx.begin_path();
            self.ctx.arc(0.0, 0.0, hh + 8.0, 0.0, TAU).ok();
            self.ctx.stroke();
        }
        self.ctx.restore();
    }

    fn particle(&self, p: &Particle) {
        self.ctx.set_global_alpha(p.life.clamp(0.0, 1.0));
        self.ctx.set_fill_style_str(p.color);
        self.ctx.set_stroke_style_str(p.color);
        match p.shape {
            ParticleShape::Circle | ParticleShape::Trail => {
                self.ctx.begin_path();
                self.ctx.arc(p.x, p.y, p.size, 0.0, TAU).ok();
                self.ctx.fill();
            }
            ParticleShape::Square | ParticleShape::Debris => {
                self.ctx.save();
                self.ctx.translate(p.x, p.y).ok();
                self.ctx.rotate(p.rotation).ok();
                self.ctx.fill_rect(-p.size / 2.0, -p.size / 2.0, p.size, p.size);
                self.ctx.restore();
            }
            ParticleShape::Spark | ParticleShape::Line => {
                self.ctx.set_line_width(p.size.max(1.0) / 2.0);
                self.ctx.begin_path();
                self.ctx.move_to(p.x, p.y);
                self.ctx.line_to(p.x - p.vx * 2.0, p.y - p.vy * 2.0);
                self.ctx.stroke();
            }
            ParticleShape::Star => {
                self.ctx.begin_path();
                for i in 0..10 {
                    let r = if i % 2 == 0 { p.size } else { p.size / 2.0 };
                    let a = p.rotation + f64::from(i) * PI / 5.0;
                    let (x, y) = (p.x + r * a.cos(), p.y + r * a.sin());
                    if i == 0 {
                        self.ctx.move_to(x, y);
                    } else {
                        self.ctx.line_to(x, y);
                    }
                }
                self.ctx.close_path();
                self.ctx.fill();
            }
            ParticleShape::Triangle => {
                self.ctx.begin_path();
                self.ctx.move_to(p.x, p.y - p.size);
                self.ctx.line_to(p.x - p.size, p.y + p.size);
                self.ctx.line_to(p.x + p.size, p.y + p.size);
                self.ctx.close_path();
                self.ctx.fill();
            }
        }
    }

    fn hud(&self, s: &Session, a11y: &AccessibilitySettings, w: f64) {
        if !matches!(s.state, GameState::Playing | GameState::Paused | GameState::Countdown) {
            return;
        }
        let palette = a11y.palette();
        let font = if a11y.large_text { "bold 18px sans-serif" } else { "bold 14px sans-serif" };
        self.ctx.set_font(font);
        self.ctx.set_text_baseline("top");

        if s.mode.mode == GameModeId::TimeTrial {
            let secs = s.mode.time_remaining_secs();
            self.ctx.set_text_align("center");
            let urgent = s.mode.time_remaining_ms < 10_000.0;
            self.ctx.set_fill_style_str(if urgent { palette.red } else { "#ffffff" });
            self.ctx.fill_text(&format!("{secs}s"), w / 2.0, 10.0).ok();
            let frac = (s.mode.time_remaining_ms / TIME_TRIAL_MS).clamp(0.0, 1.0);
            self.ctx.set_fill_style_str("rgba(255,255,255,0.25)");
            self.ctx.fill_rect(w / 4.0, 32.0, w / 2.0, 6.0);
            self.ctx.set_fill_style_str(if urgent { palette.red } else { palette.green });
            self.ctx.fill_rect(w / 4.0, 32.0, w / 2.0 * frac, 6.0);
        }
        if let Some(ch) = s.mode.current_challenge() {
            self.ctx.set_text_align("center");
            self.ctx.set_fill_style_str("#ffffff");
            self.ctx.fill_text(ch.description, w / 2.0, 10.0).ok();
            self.ctx.set_fill_style_str("rgba(255,255,255,0.25)");
            self.ctx.fill_rect(w / 4.0, 32.0, w / 2.0, 6.0);
            self.ctx.set_fill_style_str(palette.green);
            self.ctx.fill_rect(w / 4.0, 32.0, w / 2.0 * s.mode.challenge_progress(), 6.0);
        }

        self.ctx.set_text_align("left");
        let mut y = 48.0;
        for fx in s.powerups.active_effects(s.game_time_ms) {
            let secs = (fx.remaining_ms / 1000.0).ceil();
            self.ctx.set_fill_style_str(fx.kind.color());
            self.ctx.fill_text(&format!("{} {secs}s", fx.kind.label()), 10.0, y).ok();
            y += 20.0;
        }
        if s.combo > 1 {
            self.ctx.set_text_align("right");
            self.ctx.set_fill_style_str(palette.yellow);
            self.ctx.fill_text(&format!("x{} COMBO", s.combo), w - 10.0, 48.0).ok();
        }
    }

    fn banner(&self, text: &str, w: f64, h: f64, px: u32) {
        self.ctx.set_fill_style_str("rgba(0,0,0,0.35)");
        self.ctx.fill_rect(0.0, 0.0, w, h);
        self.ctx.set_font(&format!("bold {px}px sans-serif"));
        self.ctx.set_text_align("center");
        self.ctx.set_text_baseline("middle");
        self.ctx.set_line_width(6.0);
        self.ctx.set_stroke_style_str("#000000");
        self.ctx.stroke_text(text, w / 2.0, h / 2.0).ok();
        self.ctx.set_fill_style_str("#ffffff");
        self.ctx.fill_text(text, w / 2.0, h / 2.0).ok();
    }
}

/// Best-effort text update of a DOM element by id.
pub fn set_text(doc: &web_sys::Document, id: &str, text: &str) {
    if let Some(el) = doc.get_element_by_id(id) {
        el.set_text_content(Some(text));
    }
}

/// Show or hide an overlay through the `hidden` attribute.
pub fn set_visible(doc: &web_sys::Document, id: &str, visible: bool) -> Result<(), JsValue> {
    if let Some(el) = doc.get_element_by_id(id) {
        el.toggle_attribute_with_force("hidden", !visible)?;
    }
    Ok(())
}
