//! Browser shell: canvas setup, input listeners, the animation loop and the
//! DOM HUD. All game rules live in [`crate::game`]; this module only feeds it
//! frame deltas and input and reacts to the events it returns.

use crate::accessibility::{ColorBlindMode, Difficulty};
use crate::config::{FRAME_MS, GameConfig};
use crate::game::modes::GameModeId;
use crate::game::{GameEvent, GameState, MAX_DELTA_MS, Session};
use crate::leaderboard::format_score;
use crate::logging;
use crate::offline;
use crate::perf::{PerfMode, PerfMonitor};
use crate::profile::{GameOutcome, Profile};
use crate::render::{self, Renderer};
use crate::rng::Rng;
use crate::sound::{SoundEffect, SoundManager};
use crate::storage::{BrowserStorage, KeyValueStore, MemoryStorage};
use crate::touch::TouchTracker;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, window};

const CANVAS_ID: &str = "ld-canvas";
const REDUCED_PERF_PARTICLES: usize = 50;
const HUD_STYLE: &str = "position:fixed; top:10px; left:10px; font-family:'Fira Code', monospace; font-size:14px; color:#fff; padding:6px 10px; background:rgba(0,0,0,0.45); border:1px solid #333; border-radius:6px; z-index:44; line-height:1.5;";
const TOUCH_BUTTON_STYLE: &str = "position:fixed; width:72px; height:72px; border-radius:50%; background:rgba(255,255,255,0.3); color:#fff; font-size:36px; display:flex; justify-content:center; align-items:center; user-select:none; touch-action:none; z-index:45;";
const OVERLAY_STYLE: &str = "position:fixed; left:50%; top:50%; transform:translate(-50%,-50%); min-width:260px; text-align:center; font-family:'Fira Code', monospace; color:#fff; padding:18px 24px; background:rgba(0,0,0,0.78); border:2px solid #444; border-radius:12px; z-index:50;";

struct App {
    session: Session,
    profile: Profile,
    renderer: Renderer,
    sound: SoundManager,
    perf: PerfMonitor,
    touch: TouchTracker,
    player_name: String,
    last_ts: Option<f64>,
    last_outcome: Option<GameOutcome>,
}

thread_local! {
    static APP: RefCell<Option<App>> = const { RefCell::new(None) };
    static LOOP_STARTED: Cell<bool> = const { Cell::new(false) };
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

#[wasm_bindgen]
pub fn start_game() -> Result<(), JsValue> {
    launch(GameConfig::default())
}

/// Start with a JSON object overriding any subset of the default tunables.
#[wasm_bindgen]
pub fn start_game_with_config(json: &str) -> Result<(), JsValue> {
    let cfg = GameConfig::from_json(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    launch(cfg)
}

fn launch(cfg: GameConfig) -> Result<(), JsValue> {
    logging::init(cfg.log_level());
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let doc = win.document().ok_or_else(|| JsValue::from_str("no document"))?;

    let canvas: HtmlCanvasElement = if let Some(el) = doc.get_element_by_id(CANVAS_ID) {
        el.dyn_into()?
    } else {
        let c: HtmlCanvasElement = doc.create_element("canvas")?.dyn_into()?;
        c.set_id(CANVAS_ID);
        c.set_attribute("style", "position:fixed; left:50%; top:50%; transform:translate(-50%,-50%); border-radius:12px; border:2px solid #222; z-index:20;").ok();
        doc.body().ok_or_else(|| JsValue::from_str("no body"))?.append_child(&c)?;
        c
    };
    canvas.set_width(cfg.canvas_width as u32);
    canvas.set_height(cfg.canvas_height as u32);
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("no 2d context"))?
        .dyn_into()?;

    let store: Box<dyn KeyValueStore> = match BrowserStorage::open() {
        Ok(s) => Box::new(s),
        Err(err) => {
            log::warn!("{err}; progress will not be saved");
            Box::new(MemoryStorage::new())
        }
    };
    let profile = Profile::load(store);
    profile.accessibility.apply()?;

    let mut session = Session::new(cfg.clone(), Rng::from_entropy());
    session.set_vehicle(profile.vehicles.current());
    session.set_difficulty(profile.accessibility.difficulty);
    session.environment = profile.environments.current().id;
    session.particles.set_max_particles(profile.accessibility.max_particles());

    ensure_dom(&doc)?;
    offline::register(&cfg.service_worker_url);
    let app = App {
        sound: SoundManager::new(profile.sound),
        session,
        profile,
        renderer: Renderer::new(canvas.clone(), ctx),
        perf: PerfMonitor::new(),
        touch: TouchTracker::new(),
        player_name: String::new(),
        last_ts: None,
        last_outcome: None,
    };
    let high = app.profile.high_score(app.session.mode.mode);
    render::set_text(&doc, "ld-high-score", &format!("Best: {}", format_score(high)));
    APP.with(|cell| *cell.borrow_mut() = Some(app));
    log::info!("lane dash ready");

    if !LOOP_STARTED.with(|s| s.replace(true)) {
        install_listeners(&doc, &canvas)?;
        start_loop();
    }
    Ok(())
}

/// Create the HUD and overlay elements unless the page already provides them.
fn ensure_dom(doc: &Document) -> Result<(), JsValue> {
    let body = doc.body().ok_or_else(|| JsValue::from_str("no body"))?;
    if doc.get_element_by_id("ld-hud").is_none() {
        let hud = doc.create_element("div")?;
        hud.set_id("ld-hud");
        hud.set_attribute("style", HUD_STYLE).ok();
        hud.set_inner_html(
            "<div id='ld-score'>Score: 0</div><div id='ld-high-score'>Best: 0</div>\
             <div id='ld-speed'>0 km/h</div><div id='ld-distance'>0.0 km</div>\
             <div id='ld-combo'></div><div id='ld-countdown'></div>",
        );
        body.append_child(&hud)?;
    }
    let overlays = [
        ("ld-menu", "<h2>Lane Dash</h2><p>Arrow keys or swipe to change lanes</p><p>Press Enter or double tap to start</p>"),
        ("ld-pause", "<h2>Paused</h2><p>Esc or double tap to resume</p><p>Q to quit the run</p>"),
        ("ld-game-over", "<h2>Game Over</h2><p id='ld-final-score'></p><p id='ld-outcome'></p><p>Press R or double tap to retry</p>"),
    ];
    for (id, html) in overlays {
        if doc.get_element_by_id(id).is_none() {
            let div = doc.create_element("div")?;
            div.set_id(id);
            div.set_attribute("style", OVERLAY_STYLE).ok();
            div.set_inner_html(html);
            body.append_child(&div)?;
        }
    }
    let touch_buttons = [
        ("ld-touch-left", "\u{2190}", "left:20px; bottom:40px;"),
        ("ld-touch-right", "\u{2192}", "right:20px; bottom:40px;"),
        ("ld-touch-pause", "\u{23F8}", "right:20px; top:20px; width:48px; height:48px; font-size:24px;"),
    ];
    for (id, label, place) in touch_buttons {
        if doc.get_element_by_id(id).is_none() {
            let el = doc.create_element("div")?;
            el.set_id(id);
            el.set_attribute("style", &format!("{TOUCH_BUTTON_STYLE} {place}")).ok();
            el.set_text_content(Some(label));
            body.append_child(&el)?;
        }
    }
    render::set_visible(doc, "ld-pause", false)?;
    render::set_visible(doc, "ld-game-over", false)?;
    Ok(())
}

fn install_listeners(doc: &Document, canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
    {
        let closure = Closure::wrap(Box::new(move |evt: web_sys::KeyboardEvent| {
            let key = evt.key();
            if matches!(key.as_str(), "ArrowLeft" | "ArrowRight" | " ") {
                evt.prevent_default();
            }
            with_app(|app| {
                app.sound.unlock();
                if key == "m" || key == "M" {
                    toggle_sound_inner(app);
                } else if app.session.handle_key(&key) {
                    on_input_handled(app);
                }
            });
        }) as Box<dyn FnMut(_)>);
        doc.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    for kind in ["touchstart", "touchmove", "touchend", "touchcancel"] {
        let closure = Closure::wrap(Box::new(move |evt: web_sys::TouchEvent| {
            evt.prevent_default();
            let now = now_ms();
            let touches = evt.changed_touches();
            with_app(|app| {
                app.sound.unlock();
                for i in 0..touches.length() {
                    let Some(t) = touches.get(i) else { continue };
                    let (id, x, y) = (t.identifier(), f64::from(t.client_x()), f64::from(t.client_y()));
                    match kind {
                        "touchstart" => app.touch.start(id, x, y, now),
                        "touchmove" => app.touch.move_to(id, x, y),
                        "touchcancel" => app.touch.cancel(id),
                        _ => {
                            for g in app.touch.end(id, now) {
                                if app.session.handle_gesture(g) {
                                    on_input_handled(app);
                                }
                            }
                        }
                    }
                }
            });
        }) as Box<dyn FnMut(_)>);
        canvas.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    let buttons: [(&str, fn(&mut App)); 6] = [
        ("ld-start-btn", |app| {
            app.session.start_if_idle();
        }),
        ("ld-restart-btn", |app| {
            app.session.start_if_idle();
        }),
        ("ld-pause-btn", |app| {
            app.session.toggle_pause();
        }),
        ("ld-touch-left", |app| {
            app.session.handle_key("ArrowLeft");
        }),
        ("ld-touch-right", |app| {
            app.session.handle_key("ArrowRight");
        }),
        ("ld-touch-pause", |app| {
            app.session.toggle_pause();
        }),
    ];
    for (id, action) in buttons {
        let Some(el) = doc.get_element_by_id(id) else { continue };
        let closure = Closure::wrap(Box::new(move |_evt: web_sys::MouseEvent| {
            with_app(|app| {
                app.sound.unlock();
                app.sound.play(SoundEffect::ButtonClick);
                action(app);
                on_input_handled(app);
            });
        }) as Box<dyn FnMut(_)>);
        el.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    Ok(())
}

/// Sync overlays after input may have changed the game state.
fn on_input_handled(app: &mut App) {
    match app.session.state {
        GameState::Countdown => {
            app.last_outcome = None;
            app.last_ts = None;
        }
        // quitting from pause ends the run outside the frame loop
        GameState::GameOver if app.last_outcome.is_none() => {
            app.sound.play(SoundEffect::GameOver);
            finish(app);
        }
        _ => {}
    }
    if let Some(doc) = window().and_then(|w| w.document()) {
        show_overlays(&doc, app.session.state);
    }
}

fn start_loop() {
    let f: FrameCallback = Rc::new(RefCell::new(None));
    let g = f.clone();
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
        with_app(|app| tick(app, ts));
        if let (Some(w), Some(cb)) = (window(), f.borrow().as_ref()) {
            let _ = w.request_animation_frame(cb.as_ref().unchecked_ref());
        }
    }) as Box<dyn FnMut(f64)>));
    if let (Some(w), Some(cb)) = (window(), g.borrow().as_ref()) {
        let _ = w.request_animation_frame(cb.as_ref().unchecked_ref());
    }
}

fn tick(app: &mut App, ts: f64) {
    let delta = app.last_ts.map_or(0.0, |last| ts - last);
    app.last_ts = Some(ts);

    if app.perf.frame(ts).is_some() {
        let cap = particle_cap(app);
        app.session.particles.set_max_particles(cap);
    }

    let events = app.session.update(delta);
    let intense = matches!(app.session.difficulty, Difficulty::Hard | Difficulty::Insane);
    app.sound.sync(app.session.state, app.session.speed_kmh(), intense);
    if app.session.state == GameState::Playing {
        let frames = delta.clamp(0.0, MAX_DELTA_MS) / FRAME_MS;
        let w = app.session.cfg.canvas_width;
        let h = app.session.cfg.canvas_height;
        app.profile.environments.update(frames, w, h, &mut app.session.rng);
        if app.perf.mode() == PerfMode::Normal {
            let p = &app.session.player;
            let (x, y) = (p.x + p.width / 2.0, p.y + p.height);
            app.session.particles.exhaust(x, y, &mut app.session.rng);
        }
    }
    for ev in &events {
        if let Some(effect) = SoundEffect::for_event(ev) {
            app.sound.play(effect);
        }
        if *ev == GameEvent::GameOver {
            finish(app);
        }
    }

    app.renderer.draw_frame(&app.session, &app.profile.environments, &app.profile.accessibility, delta);
    if let Some(doc) = window().and_then(|w| w.document()) {
        update_hud(&doc, app);
        if !events.is_empty() {
            show_overlays(&doc, app.session.state);
        }
    }
}

fn finish(app: &mut App) {
    let summary = app.session.summary();
    let outcome = app.profile.finish_game(&summary, &app.player_name, js_sys::Date::now());
    if outcome.new_high_score {
        app.sound.play(SoundEffect::HighScore);
    }
    if !outcome.unlocked_achievements.is_empty() {
        app.sound.play(SoundEffect::Achievement);
    }
    app.profile.achievements.clear_notifications();
    app.last_outcome = Some(outcome);
}

fn update_hud(doc: &Document, app: &App) {
    let s = &app.session;
    render::set_text(doc, "ld-score", &s.mode.score_label(s.score));
    render::set_text(doc, "ld-speed", &format!("{} km/h", s.speed_kmh()));
    render::set_text(doc, "ld-distance", &format!("{:.1} km", s.distance_m / 1000.0));
    let combo = if s.combo > 1 { format!("Combo x{}", s.combo) } else { String::new() };
    render::set_text(doc, "ld-combo", &combo);
    let countdown = if s.state == GameState::Countdown { s.countdown_label() } else { "" };
    render::set_text(doc, "ld-countdown", countdown);
    let best = app.profile.high_score(s.mode.mode).max(s.score);
    render::set_text(doc, "ld-high-score", &format!("Best: {}", format_score(best)));

    if let Some(out) = &app.last_outcome {
        render::set_text(doc, "ld-final-score", &format!("Score: {}", format_score(s.score)));
        render::set_text(doc, "ld-outcome", &out.summary_lines().join(" · "));
    }
}

fn show_overlays(doc: &Document, state: GameState) {
    let shown = [
        ("ld-menu", state == GameState::Menu),
        ("ld-pause", state == GameState::Paused),
        ("ld-game-over", state == GameState::GameOver),
    ];
    for (id, visible) in shown {
        if let Err(err) = render::set_visible(doc, id, visible) {
            log::debug!("overlay {id}: {err:?}");
        }
    }
}

fn with_app<R>(f: impl FnOnce(&mut App) -> R) -> Option<R> {
    APP.with(|cell| cell.borrow_mut().as_mut().map(f))
}

fn now_ms() -> f64 {
    window().and_then(|w| w.performance()).map_or(0.0, |p| p.now())
}

fn toggle_sound_inner(app: &mut App) -> bool {
    let on = app.profile.toggle_sound();
    app.sound.settings = app.profile.sound;
    on
}

// --- exports for the page ---------------------------------------------------

#[wasm_bindgen]
pub fn select_vehicle(id: &str) -> bool {
    with_app(|app| {
        let ok = !app.session.is_running() && app.profile.select_vehicle(id);
        if ok {
            app.session.set_vehicle(app.profile.vehicles.current());
        }
        ok
    })
    .unwrap_or(false)
}

#[wasm_bindgen]
pub fn select_environment(index: usize) -> bool {
    with_app(|app| {
        let ok = !app.session.is_running() && app.profile.select_environment(index);
        if ok {
            app.session.environment = app.profile.environments.current().id;
        }
        ok
    })
    .unwrap_or(false)
}

#[wasm_bindgen]
pub fn select_mode(key: &str) -> bool {
    let Some(mode) = GameModeId::from_key(key) else {
        return false;
    };
    with_app(|app| app.session.set_mode(mode)).unwrap_or(false)
}

#[wasm_bindgen]
pub fn set_difficulty(key: &str) -> bool {
    let Some(difficulty) = Difficulty::from_key(key) else {
        return false;
    };
    with_app(|app| {
        let ok = app.session.set_difficulty(difficulty);
        if ok {
            app.profile.set_difficulty(difficulty);
        }
        ok
    })
    .unwrap_or(false)
}

/// End a paused run and record it. Returns false when nothing was paused.
#[wasm_bindgen]
pub fn quit_game() -> bool {
    with_app(|app| {
        let ended = !app.session.quit().is_empty();
        if ended {
            on_input_handled(app);
        }
        ended
    })
    .unwrap_or(false)
}

fn apply_accessibility(app: &mut App) {
    if let Err(err) = app.profile.accessibility.apply() {
        log::warn!("could not apply display settings: {err:?}");
    }
    let cap = particle_cap(app);
    app.session.particles.set_max_particles(cap);
}

fn particle_cap(app: &App) -> usize {
    let cap = app.profile.accessibility.max_particles();
    match app.perf.mode() {
        PerfMode::Normal => cap,
        PerfMode::Reduced => cap.min(REDUCED_PERF_PARTICLES),
    }
}

#[wasm_bindgen]
pub fn set_high_contrast(on: bool) {
    with_app(|app| {
        app.profile.set_high_contrast(on);
        apply_accessibility(app);
    });
}

#[wasm_bindgen]
pub fn set_reduced_motion(on: bool) {
    with_app(|app| {
        app.profile.set_reduced_motion(on);
        apply_accessibility(app);
    });
}

#[wasm_bindgen]
pub fn set_large_text(on: bool) {
    with_app(|app| {
        app.profile.set_large_text(on);
        apply_accessibility(app);
    });
}

#[wasm_bindgen]
pub fn set_color_blind_mode(key: &str) -> bool {
    let Some(mode) = ColorBlindMode::from_key(key) else {
        return false;
    };
    with_app(|app| {
        app.profile.set_color_blind_mode(mode);
        apply_accessibility(app);
    })
    .is_some()
}

#[wasm_bindgen]
pub fn set_player_name(name: &str) {
    with_app(|app| app.player_name = name.trim().to_string());
}

/// Returns whether sound is now enabled.
#[wasm_bindgen]
pub fn toggle_sound() -> bool {
    with_app(toggle_sound_inner).unwrap_or(false)
}

#[wasm_bindgen]
pub fn leaderboard_json(mode: &str) -> Result<String, JsValue> {
    let mode = GameModeId::from_key(mode).ok_or_else(|| JsValue::from_str("unknown game mode"))?;
    with_app(|app| serde_json::to_string(app.profile.leaderboard.top_for_mode(mode, 10)))
        .ok_or_else(|| JsValue::from_str("game not started"))?
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn achievements_json() -> Result<String, JsValue> {
    with_app(|app| serde_json::to_string(&app.profile.achievements.all()))
        .ok_or_else(|| JsValue::from_str("game not started"))?
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn vehicles_json() -> Result<String, JsValue> {
    with_app(|app| serde_json::to_string(&app.profile.vehicles.all()))
        .ok_or_else(|| JsValue::from_str("game not started"))?
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
