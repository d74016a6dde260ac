//! Synthesized sound effects over Web Audio. Each effect is a small recipe of
//! oscillator tones; nothing is loaded from disk.

use crate::game::{GameEvent, GameState};
use crate::storage::{self, KeyValueStore};
use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;
use web_sys::{
    AudioContext, AudioContextState, BiquadFilterNode, BiquadFilterType, GainNode, OscillatorNode,
    OscillatorType,
};

const STORAGE_NAME: &str = "sound";

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SoundSettings {
    pub enabled: bool,
    pub volume: f64,
    pub music_volume: f64,
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self { enabled: true, volume: 0.7, music_volume: 0.5 }
    }
}

impl SoundSettings {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let mut s: SoundSettings = storage::load_or_default(store, STORAGE_NAME);
        s.volume = s.volume.clamp(0.0, 1.0);
        s.music_volume = s.music_volume.clamp(0.0, 1.0);
        s
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> bool {
        storage::save_or_warn(store, STORAGE_NAME, self)
    }

    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    pub fn set_volume(&mut self, v: f64) {
        self.volume = if v.is_finite() { v.clamp(0.0, 1.0) } else { self.volume };
    }

    pub fn set_music_volume(&mut self, v: f64) {
        self.music_volume = if v.is_finite() { v.clamp(0.0, 1.0) } else { self.music_volume };
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wave {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Wave {
    fn web(self) -> OscillatorType {
        match self {
            Wave::Sine => OscillatorType::Sine,
            Wave::Square => OscillatorType::Square,
            Wave::Sawtooth => OscillatorType::Sawtooth,
            Wave::Triangle => OscillatorType::Triangle,
        }
    }
}

/// One oscillator voice. Times are seconds relative to the trigger.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tone {
    pub wave: Wave,
    pub freq: f64,
    pub freq_end: Option<f64>,
    pub delay: f64,
    pub duration: f64,
    /// Fraction of the master volume.
    pub gain: f64,
    pub gain_end: f64,
}

const fn tone(wave: Wave, freq: f64, freq_end: Option<f64>, duration: f64, gain: f64, gain_end: f64) -> Tone {
    Tone { wave, freq, freq_end, delay: 0.0, duration, gain, gain_end }
}

const fn note(freq: f64, step: usize, duration: f64, gain: f64, gain_end: f64) -> Tone {
    Tone {
        wave: Wave::Sine,
        freq,
        freq_end: None,
        delay: step as f64 * 0.1,
        duration,
        gain,
        gain_end,
    }
}

const COLLISION: [Tone; 1] = [tone(Wave::Sawtooth, 100.0, Some(40.0), 0.3, 0.7, 0.01)];
const NEAR_MISS: [Tone; 1] = [tone(Wave::Sine, 800.0, Some(1200.0), 0.1, 0.3, 0.01)];
const SCORE: [Tone; 2] = [
    tone(Wave::Sine, 523.25, None, 0.1, 0.4, 0.001),
    tone(Wave::Sine, 659.25, None, 0.1, 0.4, 0.001),
];
const CLICK: [Tone; 1] = [tone(Wave::Square, 800.0, None, 0.05, 0.3, 0.001)];
const POWER_UP: [Tone; 1] = [tone(Wave::Sine, 400.0, Some(800.0), 0.2, 0.6, 0.001)];
const BRAKE: [Tone; 1] = [tone(Wave::Sawtooth, 5000.0, Some(500.0), 0.3, 0.5, 0.001)];
const GAME_OVER: [Tone; 1] = [tone(Wave::Square, 300.0, Some(100.0), 0.5, 0.5, 0.01)];
const HIGH_SCORE: [Tone; 4] = [
    note(523.0, 0, 0.2, 0.3, 0.01),
    note(659.0, 1, 0.2, 0.3, 0.01),
    note(784.0, 2, 0.2, 0.3, 0.01),
    note(1047.0, 3, 0.2, 0.3, 0.01),
];
const ACHIEVEMENT: [Tone; 4] = [
    note(523.25, 0, 0.3, 0.7, 0.001),
    note(659.25, 1, 0.3, 0.7, 0.001),
    note(783.99, 2, 0.3, 0.7, 0.001),
    note(1046.5, 3, 0.3, 0.7, 0.001),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SoundEffect {
    Collision,
    NearMiss,
    Score,
    ButtonClick,
    PowerUp,
    Brake,
    GameOver,
    HighScore,
    Achievement,
}

impl SoundEffect {
    pub fn recipe(self) -> &'static [Tone] {
        match self {
            SoundEffect::Collision => &COLLISION,
            SoundEffect::NearMiss => &NEAR_MISS,
            SoundEffect::Score => &SCORE,
            SoundEffect::ButtonClick => &CLICK,
            SoundEffect::PowerUp => &POWER_UP,
            SoundEffect::Brake => &BRAKE,
            SoundEffect::GameOver => &GAME_OVER,
            SoundEffect::HighScore => &HIGH_SCORE,
            SoundEffect::Achievement => &ACHIEVEMENT,
        }
    }

    /// Total length including arpeggio delays, in seconds.
    pub fn length(self) -> f64 {
        self.recipe().iter().map(|t| t.delay + t.duration).fold(0.0, f64::max)
    }

    pub fn for_event(event: &GameEvent) -> Option<Self> {
        match event {
            GameEvent::CountdownTick(_) => Some(SoundEffect::ButtonClick),
            GameEvent::NearMiss { .. } => Some(SoundEffect::NearMiss),
            GameEvent::PowerUp(_) => Some(SoundEffect::PowerUp),
            GameEvent::ShieldBroken => Some(SoundEffect::Brake),
            GameEvent::Crash => Some(SoundEffect::Collision),
            GameEvent::ChallengeComplete { .. } => Some(SoundEffect::Score),
            GameEvent::GameOver => Some(SoundEffect::GameOver),
        }
    }
}

/// Speed that maps to the engine's idle pitch.
const ENGINE_BASE_KMH: f64 = 60.0;
const ENGINE_BASE_HZ: f64 = 60.0;
const ENGINE_GAIN: f64 = 0.2;
const ENGINE_RAMP_S: f64 = 0.1;
const MUSIC_HZ: f64 = 110.0;
const MUSIC_GAIN: f64 = 0.1;
const MUSIC_FADE_S: f64 = 0.5;
const VIBRATO_DEPTH_HZ: f32 = 5.0;

/// Oscillator pitch and band-pass centre for the engine loop at `speed_kmh`.
pub fn engine_tone(speed_kmh: u32) -> (f64, f64) {
    let factor = (f64::from(speed_kmh) / ENGINE_BASE_KMH).max(0.1);
    (ENGINE_BASE_HZ * factor, 100.0 + factor * 150.0)
}

/// Vibrato rate of the background drone; faster when the run is intense.
pub fn vibrato_hz(intense: bool) -> f64 {
    if intense { 5.0 } else { 2.0 }
}

/// Which loops should be running in `state`.
pub fn loops_for(state: GameState) -> (bool, bool) {
    match state {
        GameState::Playing => (true, true),
        GameState::Countdown => (false, true),
        GameState::Menu | GameState::Paused | GameState::GameOver => (false, false),
    }
}

struct EngineLoop {
    osc: OscillatorNode,
    filter: BiquadFilterNode,
    gain: GainNode,
}

struct MusicLoop {
    osc: OscillatorNode,
    lfo: OscillatorNode,
    gain: GainNode,
}

/// Owns the lazily created `AudioContext`. Browsers refuse to start audio
/// before a user gesture, so `unlock` is called from input handlers.
pub struct SoundManager {
    pub settings: SoundSettings,
    ctx: Option<AudioContext>,
    unavailable: bool,
    engine: Option<EngineLoop>,
    music: Option<MusicLoop>,
}

impl SoundManager {
    pub fn new(settings: SoundSettings) -> Self {
        Self { settings, ctx: None, unavailable: false, engine: None, music: None }
    }

    pub fn unlock(&mut self) {
        if self.ctx.is_none() && !self.unavailable {
            match AudioContext::new() {
                Ok(ctx) => self.ctx = Some(ctx),
                Err(err) => {
                    log::warn!("Web Audio unavailable: {err:?}");
                    self.unavailable = true;
                }
            }
        }
        if let Some(ctx) = &self.ctx {
            if ctx.state() == AudioContextState::Suspended {
                let _ = ctx.resume();
            }
        }
    }

    pub fn play(&self, effect: SoundEffect) {
        if !self.settings.enabled || self.settings.volume <= 0.0 {
            return;
        }
        let Some(ctx) = &self.ctx else {
            return;
        };
        if let Err(err) = self.schedule(ctx, effect) {
            log::debug!("could not play {effect:?}: {err:?}");
        }
    }

    /// Start, retune or stop the engine and music loops for this frame.
    pub fn sync(&mut self, state: GameState, speed_kmh: u32, intense: bool) {
        let Some(ctx) = self.ctx.clone() else {
            return;
        };
        let (engine_on, music_on) = loops_for(state);
        let engine_on = engine_on && self.settings.enabled && self.settings.volume > 0.0;
        let music_on = music_on && self.settings.enabled && self.settings.music_volume > 0.0;

        let res = match (engine_on, self.engine.is_some()) {
            (true, false) => self.start_engine(&ctx, speed_kmh),
            (true, true) => self.retune_engine(&ctx, speed_kmh),
            (false, true) => self.stop_engine(&ctx),
            (false, false) => Ok(()),
        };
        if let Err(err) = res {
            log::debug!("engine loop: {err:?}");
            self.engine = None;
        }

        let res = match (music_on, self.music.is_some()) {
            (true, false) => self.start_music(&ctx, intense),
            (false, true) => self.stop_music(&ctx),
            _ => Ok(()),
        };
        if let Err(err) = res {
            log::debug!("music loop: {err:?}");
            self.music = None;
        }
    }

    fn start_engine(&mut self, ctx: &AudioContext, speed_kmh: u32) -> Result<(), JsValue> {
        let now = ctx.current_time();
        let (freq, band) = engine_tone(speed_kmh);
        let osc = ctx.create_oscillator()?;
        let filter = ctx.create_biquad_filter()?;
        let gain = ctx.create_gain()?;
        osc.set_type(OscillatorType::Sawtooth);
        osc.frequency().set_value_at_time(freq as f32, now)?;
        filter.set_type(BiquadFilterType::Bandpass);
        filter.frequency().set_value(band as f32);
        filter.q().set_value(5.0);
        gain.gain().set_value_at_time((self.settings.volume * ENGINE_GAIN) as f32, now)?;
        osc.connect_with_audio_node(&filter)?;
        filter.connect_with_audio_node(&gain)?;
        gain.connect_with_audio_node(&ctx.destination())?;
        osc.start()?;
        self.engine = Some(EngineLoop { osc, filter, gain });
        Ok(())
    }

    fn retune_engine(&self, ctx: &AudioContext, speed_kmh: u32) -> Result<(), JsValue> {
        let Some(e) = &self.engine else {
            return Ok(());
        };
        let at = ctx.current_time() + ENGINE_RAMP_S;
        let (freq, band) = engine_tone(speed_kmh);
        e.osc.frequency().exponential_ramp_to_value_at_time(freq as f32, at)?;
        e.filter.frequency().exponential_ramp_to_value_at_time(band as f32, at)?;
        Ok(())
    }

    fn stop_engine(&mut self, ctx: &AudioContext) -> Result<(), JsValue> {
        let Some(e) = self.engine.take() else {
            return Ok(());
        };
        let at = ctx.current_time() + ENGINE_RAMP_S;
        e.gain.gain().exponential_ramp_to_value_at_time(0.01, at)?;
        e.osc.stop_with_when(at)?;
        Ok(())
    }

    fn start_music(&mut self, ctx: &AudioContext, intense: bool) -> Result<(), JsValue> {
        let now = ctx.current_time();
        let osc = ctx.create_oscillator()?;
        let lfo = ctx.create_oscillator()?;
        let depth = ctx.create_gain()?;
        let gain = ctx.create_gain()?;
        lfo.frequency().set_value_at_time(vibrato_hz(intense) as f32, now)?;
        depth.gain().set_value_at_time(VIBRATO_DEPTH_HZ, now)?;
        lfo.connect_with_audio_node(&depth)?;
        depth.connect_with_audio_param(&osc.frequency())?;
        osc.set_type(OscillatorType::Triangle);
        osc.frequency().set_value_at_time(MUSIC_HZ as f32, now)?;
        gain.gain().set_value_at_time(0.0, now)?;
        let level = self.settings.music_volume * MUSIC_GAIN;
        gain.gain().linear_ramp_to_value_at_time(level as f32, now + MUSIC_FADE_S)?;
        osc.connect_with_audio_node(&gain)?;
        gain.connect_with_audio_node(&ctx.destination())?;
        osc.start()?;
        lfo.start()?;
        self.music = Some(MusicLoop { osc, lfo, gain });
        Ok(())
    }

    fn stop_music(&mut self, ctx: &AudioContext) -> Result<(), JsValue> {
        let Some(m) = self.music.take() else {
            return Ok(());
        };
        let at = ctx.current_time() + MUSIC_FADE_S;
        m.gain.gain().linear_ramp_to_value_at_time(0.0, at)?;
        m.osc.stop_with_when(at)?;
        m.lfo.stop_with_when(at)?;
        Ok(())
    }

    fn schedule(&self, ctx: &AudioContext, effect: SoundEffect) -> Result<(), JsValue> {
        let now = ctx.current_time();
        for t in effect.recipe() {
            let start = now + t.delay;
            let end = start + t.duration;
            let osc = ctx.create_oscillator()?;
            let gain = ctx.create_gain()?;
            osc.set_type(t.wave.web());
            osc.frequency().set_value_at_time(t.freq as f32, start)?;
            if let Some(f) = t.freq_end {
                osc.frequency().exponential_ramp_to_value_at_time(f as f32, end)?;
            }
            let level = (self.settings.volume * t.gain).max(0.001);
            gain.gain().set_value_at_time(level as f32, start)?;
            gain.gain().exponential_ramp_to_value_at_time(t.gain_end as f32, end)?;
            osc.connect_with_audio_node(&gain)?;
            gain.connect_with_audio_node(&ctx.destination())?;
            osc.start_with_when(start)?;
            osc.stop_with_when(end)?;
        }
        Ok(())
    }
}
