//! Session state and the per-frame rules. Nothing in here touches the browser;
//! the shell feeds `update` with frame deltas and draws whatever it finds.

pub mod effects;
pub mod modes;
pub mod obstacles;
pub mod particles;
pub mod player;
pub mod powerups;

use crate::accessibility::Difficulty;
use crate::config::{FRAME_MS, GameConfig};
use crate::rng::Rng;
use crate::touch::Gesture;
use crate::vehicles::Vehicle;
use effects::ScreenShake;
use modes::{CHALLENGE_REWARD_MS, ChallengeReward, GameModeId, ModeRuntime, ModeStats};
use obstacles::ObstacleManager;
use particles::ParticleSystem;
use player::{Player, START_LANE};
use powerups::{PowerUpKind, PowerUpManager};
use serde::Serialize;

/// Long frames (tab switches, breakpoints) are clamped to this.
pub const MAX_DELTA_MS: f64 = 100.0;
const SCORE_TICK_MS: f64 = 100.0;
const ZEN_BUMP_POINTS: u64 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameState {
    Menu,
    Countdown,
    Playing,
    Paused,
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GameEvent {
    CountdownTick(&'static str),
    NearMiss { combo: u32, points: u64 },
    PowerUp(PowerUpKind),
    ShieldBroken,
    Crash,
    ChallengeComplete { index: usize },
    GameOver,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub score: u64,
    pub time_ms: f64,
    pub distance_m: f64,
    pub near_misses: u32,
    pub powerups_collected: u32,
    pub cars_dodged: u32,
    pub mode: GameModeId,
    pub difficulty: Difficulty,
    pub vehicle: String,
    pub environment: String,
}

pub struct Session {
    pub cfg: GameConfig,
    pub state: GameState,
    pub player: Player,
    pub obstacles: ObstacleManager,
    pub powerups: PowerUpManager,
    pub particles: ParticleSystem,
    pub shake: ScreenShake,
    pub mode: ModeRuntime,
    pub difficulty: Difficulty,
    pub environment: &'static str,
    pub rng: Rng,

    pub score: u64,
    pub game_time_ms: f64,
    pub distance_m: f64,
    pub near_misses: u32,
    pub near_miss_streak: u32,
    pub combo: u32,
    pub cars_dodged: u32,
    pub powerups_collected: u32,
    last_near_miss_ms: Option<f64>,
    countdown_left_ms: f64,
    score_tick_ms: f64,
}

impl Session {
    pub fn new(cfg: GameConfig, rng: Rng) -> Self {
        Self {
            player: Player::new(START_LANE, &cfg),
            obstacles: ObstacleManager::new(&cfg),
            powerups: PowerUpManager::new(&cfg),
            particles: ParticleSystem::new(),
            shake: ScreenShake::default(),
            mode: ModeRuntime::new(GameModeId::Endless),
            difficulty: Difficulty::Normal,
            environment: "day",
            rng,
            state: GameState::Menu,
            score: 0,
            game_time_ms: 0.0,
            distance_m: 0.0,
            near_misses: 0,
            near_miss_streak: 0,
            combo: 0,
            cars_dodged: 0,
            powerups_collected: 0,
            last_near_miss_ms: None,
            countdown_left_ms: 0.0,
            score_tick_ms: 0.0,
            cfg,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, GameState::Countdown | GameState::Playing | GameState::Paused)
    }

    /// Mode and difficulty only change between runs.
    pub fn set_mode(&mut self, mode: GameModeId) -> bool {
        if self.is_running() {
            return false;
        }
        self.mode = ModeRuntime::new(mode);
        true
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) -> bool {
        if self.is_running() {
            return false;
        }
        self.difficulty = difficulty;
        true
    }

    pub fn set_vehicle(&mut self, vehicle: &Vehicle) {
        self.player.apply_vehicle(vehicle);
    }

    /// Reset every counter and entity and begin the countdown.
    pub fn start(&mut self) {
        self.player.reset();
        self.obstacles.reset();
        self.obstacles.set_difficulty_multiplier(self.difficulty.speed_multiplier());
        self.powerups.reset();
        self.particles.clear();
        self.shake.stop();
        self.mode.reset();
        self.score = 0;
        self.game_time_ms = 0.0;
        self.distance_m = 0.0;
        self.near_misses = 0;
        self.near_miss_streak = 0;
        self.combo = 0;
        self.cars_dodged = 0;
        self.powerups_collected = 0;
        self.last_near_miss_ms = None;
        self.score_tick_ms = 0.0;
        self.countdown_left_ms = self.cfg.countdown_ms;
        self.state = GameState::Countdown;
        log::info!(
            "game start: mode={} difficulty={} vehicle={}",
            self.mode.mode.key(),
            self.difficulty.key(),
            self.player.vehicle_id
        );
    }

    /// Start unless a run is already in progress.
    pub fn start_if_idle(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        self.start();
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.state != GameState::Playing {
            return false;
        }
        self.state = GameState::Paused;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.state != GameState::Paused {
            return false;
        }
        self.state = GameState::Playing;
        true
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.pause() || self.resume()
    }

    /// Abandon a paused run. The run still ends through the normal game-over
    /// path so its score and stats are recorded.
    pub fn quit(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.state == GameState::Paused {
            self.end(&mut events);
        }
        events
    }

    /// "3", "2", "1" then "GO!" for the final second.
    pub fn countdown_label(&self) -> &'static str {
        let elapsed = self.cfg.countdown_ms - self.countdown_left_ms;
        match (elapsed / 1000.0).floor() as i64 {
            i64::MIN..=0 => "3",
            1 => "2",
            2 => "1",
            _ => "GO!",
        }
    }

    /// Returns whether the key did anything.
    pub fn handle_key(&mut self, key: &str) -> bool {
        match self.state {
            GameState::Playing | GameState::Countdown => match key {
                "Escape" => self.pause(),
                "ArrowLeft" | "a" | "A" => self.player.move_left(),
                "ArrowRight" | "d" | "D" => self.player.move_right(),
                _ => false,
            },
            GameState::Paused => match key {
                "Escape" => self.resume(),
                "q" | "Q" => !self.quit().is_empty(),
                _ => false,
            },
            GameState::Menu | GameState::GameOver => match key {
                "r" | "R" | "Enter" => {
                    self.start();
                    true
                }
                _ => false,
            },
        }
    }

    pub fn handle_gesture(&mut self, gesture: Gesture) -> bool {
        match (self.state, gesture) {
            (GameState::Playing | GameState::Countdown, Gesture::SwipeLeft) => self.player.move_left(),
            (GameState::Playing | GameState::Countdown, Gesture::SwipeRight) => {
                self.player.move_right()
            }
            (GameState::Playing | GameState::Paused, Gesture::DoubleTap) => self.toggle_pause(),
            (GameState::Menu | GameState::GameOver, Gesture::DoubleTap) => {
                self.start();
                true
            }
            _ => false,
        }
    }

    pub fn speed_kmh(&self) -> u32 {
        (self.obstacles.current_speed * 20.0).floor() as u32
    }

    pub fn summary(&self) -> GameSummary {
        GameSummary {
            score: self.score,
            time_ms: self.game_time_ms,
            distance_m: self.distance_m,
            near_misses: self.near_misses,
            powerups_collected: self.powerups_collected,
            cars_dodged: self.cars_dodged,
            mode: self.mode.mode,
            difficulty: self.difficulty,
            vehicle: self.player.vehicle_id.to_string(),
            environment: self.environment.to_string(),
        }
    }

    /// Advance the session by one animation frame.
    pub fn update(&mut self, delta_ms: f64) -> Vec<GameEvent> {
        let delta_ms = delta_ms.clamp(0.0, MAX_DELTA_MS);
        let frames = delta_ms / FRAME_MS;
        let mut events = Vec::new();

        self.shake.update(delta_ms, &mut self.rng);
        match self.state {
            GameState::Countdown => self.update_countdown(delta_ms, frames, &mut events),
            GameState::Playing => self.update_playing(delta_ms, frames, &mut events),
            GameState::GameOver => self.particles.update(frames),
            GameState::Menu | GameState::Paused => {}
        }
        events
    }

    fn update_countdown(&mut self, delta_ms: f64, frames: f64, events: &mut Vec<GameEvent>) {
        let before = self.countdown_label();
        self.countdown_left_ms -= delta_ms;
        self.player.update(frames);
        if self.countdown_left_ms <= 0.0 {
            self.countdown_left_ms = 0.0;
            self.state = GameState::Playing;
            return;
        }
        let label = self.countdown_label();
        if label != before {
            events.push(GameEvent::CountdownTick(label));
        }
    }

    fn update_playing(&mut self, delta_ms: f64, frames: f64, events: &mut Vec<GameEvent>) {
        let prev_second = (self.game_time_ms / 1000.0).floor();
        self.game_time_ms += delta_ms;
        let now = self.game_time_ms;

        self.player.update(frames);
        let slow = self.powerups.speed_factor();
        self.obstacles.update(now, frames, slow, &mut self.rng);
        let blocked = self.obstacles.occupied_lanes();
        let lane_speed = self.obstacles.effective_speed();
        self.powerups.update(now, frames, lane_speed, &blocked, &mut self.rng);
        self.particles.update(frames);

        let pbox = self.player.collision_box();
        let (cx, cy) = pbox.center();

        if let Some(index) = self.obstacles.check_collision(&pbox) {
            if self.powerups.consume_shield() {
                self.obstacles.remove(index);
                self.particles.shield_break(cx, cy, &mut self.rng);
                self.shake.start(150.0, 3);
                self.near_miss_streak = 0;
                events.push(GameEvent::ShieldBroken);
            } else if self.mode.forgives_collisions() {
                if let Some(o) = self.obstacles.remove(index) {
                    let (ox, oy) = o.collision_box().center();
                    self.particles.explosion(ox, oy, 10, &mut self.rng);
                }
                self.score += ZEN_BUMP_POINTS;
                self.near_miss_streak = 0;
                events.push(GameEvent::Crash);
            } else {
                self.particles.explosion(cx, cy, 20, &mut self.rng);
                self.shake.start(300.0, 5);
                events.push(GameEvent::Crash);
                self.end(events);
                return;
            }
        }

        if let Some(kind) = self.powerups.check_collision(&pbox, now) {
            self.powerups_collected += 1;
            if kind == PowerUpKind::Points {
                self.score += self.cfg.powerup_points_bonus;
            }
            self.particles.power_up(cx, cy, kind.color(), &mut self.rng);
            events.push(GameEvent::PowerUp(kind));
        }

        if self.last_near_miss_ms.is_some_and(|t| now - t > self.cfg.combo_window_ms) {
            self.combo = 0;
        }
        let near = self.obstacles.check_near_misses(&pbox, self.cfg.near_miss_threshold);
        for _ in 0..near {
            self.combo = (self.combo + 1).min(self.cfg.max_combo);
            self.last_near_miss_ms = Some(now);
            let points =
                self.cfg.near_miss_bonus * u64::from(self.combo) * self.powerups.score_multiplier();
            self.score += points;
            self.near_misses += 1;
            self.near_miss_streak += 1;
            self.particles.near_miss(cx, cy);
            events.push(GameEvent::NearMiss { combo: self.combo, points });
        }
        self.cars_dodged += self.obstacles.take_passed();

        self.score_tick_ms += delta_ms;
        while self.score_tick_ms >= SCORE_TICK_MS {
            self.score_tick_ms -= SCORE_TICK_MS;
            self.score += self.powerups.score_multiplier();
        }
        self.distance_m += self.obstacles.current_speed * 0.1 * delta_ms / 1000.0;

        let stats = ModeStats {
            game_time_ms: now,
            score: self.score,
            cars_dodged: self.cars_dodged,
            near_miss_streak: self.near_miss_streak,
            combo: self.combo,
        };
        let tick = self.mode.update(delta_ms, &stats);
        if let Some((index, reward)) = tick.completed {
            self.apply_reward(reward, now);
            log::info!("challenge {index} complete");
            events.push(GameEvent::ChallengeComplete { index });
        }
        if tick.game_over {
            self.end(events);
            return;
        }

        if (now / 1000.0).floor() > prev_second {
            log::debug!("playing: score={} time={}s", self.score, (now / 1000.0).floor());
        }
    }

    fn apply_reward(&mut self, reward: ChallengeReward, now: f64) {
        let kind = match reward {
            ChallengeReward::Shield => PowerUpKind::Shield,
            ChallengeReward::Multiplier => PowerUpKind::Multiplier,
            ChallengeReward::SlowMo => PowerUpKind::SlowMo,
            ChallengeReward::ClearRoad => {
                self.obstacles.clear();
                return;
            }
        };
        self.powerups.activate(kind, now, CHALLENGE_REWARD_MS);
    }

    fn end(&mut self, events: &mut Vec<GameEvent>) {
        self.state = GameState::GameOver;
        log::info!(
            "game over: score={} time={:.1}s near_misses={}",
            self.score,
            self.game_time_ms / 1000.0,
            self.near_misses
        );
        events.push(GameEvent::GameOver);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::obstacles::{Obstacle, ObstacleKind};
    use super::powerups::PowerUp;

    fn session() -> Session {
        Session::new(GameConfig::default(), Rng::seeded(99))
    }

    fn playing() -> Session {
        playing_in(GameModeId::Endless)
    }

    fn playing_in(mode: GameModeId) -> Session {
        let mut s = session();
        assert!(s.set_mode(mode));
        s.start();
        while s.state == GameState::Countdown {
            s.update(MAX_DELTA_MS);
        }
        assert_eq!(s.state, GameState::Playing);
        s.obstacles.clear();
        s
    }

    fn obstacle_at(s: &mut Session, lane: u8, y: f64) {
        let cfg = s.cfg.clone();
        let mut o = Obstacle::new(lane, 0.0, ObstacleKind::Car, &cfg, &mut s.rng);
        o.y = y;
        s.obstacles.obstacles.push(o);
    }

    #[test]
    fn countdown_labels_then_play() {
        let mut s = session();
        s.start();
        assert_eq!(s.state, GameState::Countdown);
        assert_eq!(s.countdown_label(), "3");
        let ev = s.update(100.0);
        assert!(ev.is_empty());
        let mut labels = Vec::new();
        for _ in 0..38 {
            for e in s.update(100.0) {
                if let GameEvent::CountdownTick(l) = e {
                    labels.push(l);
                }
            }
        }
        assert_eq!(labels, vec!["2", "1", "GO!"]);
        assert_eq!(s.state, GameState::Countdown);
        s.update(100.0);
        assert_eq!(s.state, GameState::Playing);
    }

    #[test]
    fn moves_are_accepted_during_countdown() {
        let mut s = session();
        s.start();
        assert!(s.handle_key("ArrowRight"));
        assert_eq!(s.player.target_lane, 2);
    }

    #[test]
    fn escape_pauses_and_resumes() {
        let mut s = playing();
        let t = s.game_time_ms;
        assert!(s.handle_key("Escape"));
        assert_eq!(s.state, GameState::Paused);
        s.update(50.0);
        assert_eq!(s.game_time_ms, t);
        assert!(s.handle_key("Escape"));
        assert_eq!(s.state, GameState::Playing);
    }

    #[test]
    fn double_tap_toggles_pause() {
        let mut s = playing();
        assert!(s.handle_gesture(Gesture::DoubleTap));
        assert_eq!(s.state, GameState::Paused);
        assert!(s.handle_gesture(Gesture::DoubleTap));
        assert_eq!(s.state, GameState::Playing);
    }

    #[test]
    fn survival_scores_one_point_per_100ms() {
        let mut s = playing();
        let before = s.score;
        s.update(50.0);
        s.update(50.0);
        s.update(100.0);
        assert_eq!(s.score - before, 2);
    }

    #[test]
    fn collision_ends_the_run() {
        let mut s = playing();
        let y = s.player.y;
        let lane = s.player.lane;
        obstacle_at(&mut s, lane, y);
        let ev = s.update(10.0);
        assert!(ev.contains(&GameEvent::Crash));
        assert!(ev.contains(&GameEvent::GameOver));
        assert_eq!(s.state, GameState::GameOver);
        assert!(s.shake.is_active());
        assert!(s.handle_key("r"));
        assert_eq!(s.state, GameState::Countdown);
        assert_eq!(s.score, 0);
    }

    #[test]
    fn shield_absorbs_one_hit() {
        let mut s = playing();
        s.powerups.activate(PowerUpKind::Shield, s.game_time_ms, 5_000.0);
        let (y, lane) = (s.player.y, s.player.lane);
        obstacle_at(&mut s, lane, y);
        let ev = s.update(10.0);
        assert_eq!(ev, vec![GameEvent::ShieldBroken]);
        assert_eq!(s.state, GameState::Playing);
        assert!(!s.powerups.has_shield());
        assert!(s.obstacles.obstacles.is_empty());
    }

    #[test]
    fn zen_removes_obstacle_and_awards_points() {
        let mut s = session();
        assert!(s.set_mode(GameModeId::Zen));
        s.start();
        while s.state == GameState::Countdown {
            s.update(MAX_DELTA_MS);
        }
        s.obstacles.clear();
        let before = s.score;
        let (y, lane) = (s.player.y, s.player.lane);
        obstacle_at(&mut s, lane, y);
        let ev = s.update(10.0);
        assert_eq!(ev, vec![GameEvent::Crash]);
        assert_eq!(s.state, GameState::Playing);
        assert_eq!(s.score - before, ZEN_BUMP_POINTS);
    }

    #[test]
    fn near_misses_build_combo_within_window() {
        let mut s = playing();
        let y = s.player.y;
        let side = s.player.lane + 1;
        obstacle_at(&mut s, side, y - 20.0);
        let ev = s.update(1.0);
        assert_eq!(ev, vec![GameEvent::NearMiss { combo: 1, points: 50 }]);
        s.obstacles.clear();

        obstacle_at(&mut s, side, y - 20.0);
        let ev = s.update(1.0);
        assert_eq!(ev, vec![GameEvent::NearMiss { combo: 2, points: 100 }]);
        assert_eq!(s.near_misses, 2);
        assert_eq!(s.near_miss_streak, 2);
    }

    #[test]
    fn combo_resets_after_window() {
        let mut s = playing();
        let y = s.player.y;
        let side = s.player.lane + 1;
        obstacle_at(&mut s, side, y - 20.0);
        s.update(1.0);
        s.obstacles.clear();
        s.last_near_miss_ms = Some(s.game_time_ms - 3_500.0);
        obstacle_at(&mut s, side, y - 20.0);
        let ev = s.update(1.0);
        assert_eq!(ev, vec![GameEvent::NearMiss { combo: 1, points: 50 }]);
    }

    #[test]
    fn multiplier_doubles_near_miss_points() {
        let mut s = playing();
        s.powerups.activate(PowerUpKind::Multiplier, s.game_time_ms, 5_000.0);
        let y = s.player.y;
        let side = s.player.lane + 1;
        obstacle_at(&mut s, side, y - 20.0);
        let ev = s.update(1.0);
        assert_eq!(ev, vec![GameEvent::NearMiss { combo: 1, points: 100 }]);
    }

    #[test]
    fn time_trial_runs_out() {
        let mut s = session();
        s.set_mode(GameModeId::TimeTrial);
        s.start();
        while s.state == GameState::Countdown {
            s.update(MAX_DELTA_MS);
        }
        let mut over = false;
        for _ in 0..601 {
            s.obstacles.clear();
            if s.update(MAX_DELTA_MS).contains(&GameEvent::GameOver) {
                over = true;
                break;
            }
        }
        assert!(over);
        assert_eq!(s.summary().mode, GameModeId::TimeTrial);
    }

    #[test]
    fn settings_are_locked_while_running() {
        let mut s = session();
        s.start();
        assert!(!s.set_mode(GameModeId::Zen));
        assert!(!s.set_difficulty(Difficulty::Hard));
    }

    #[test]
    fn speed_readout_tracks_obstacle_speed() {
        let s = session();
        assert_eq!(s.speed_kmh(), 60);
    }

    #[test]
    fn zen_run_can_be_quit_from_pause() {
        let mut s = playing_in(GameModeId::Zen);
        for _ in 0..50 {
            s.update(MAX_DELTA_MS);
        }
        assert!(s.quit().is_empty());
        assert_eq!(s.state, GameState::Playing);

        assert!(s.handle_key("Escape"));
        assert!(!s.set_mode(GameModeId::Endless));
        assert!(s.handle_key("q"));
        assert_eq!(s.state, GameState::GameOver);
        let run = s.summary();
        assert_eq!(run.mode, GameModeId::Zen);
        assert!(run.score >= 49);
        assert!(s.set_mode(GameModeId::Endless));
    }

    #[test]
    fn start_button_keeps_a_live_run() {
        let mut s = playing();
        s.update(500.0);
        let t = s.game_time_ms;
        assert!(!s.start_if_idle());
        assert_eq!(s.state, GameState::Playing);
        assert_eq!(s.game_time_ms, t);
        s.pause();
        assert!(!s.start_if_idle());
        assert!(s.quit().contains(&GameEvent::GameOver));
        assert!(s.start_if_idle());
        assert_eq!(s.state, GameState::Countdown);
    }

    #[test]
    fn quit_reports_game_over() {
        let mut s = playing();
        s.pause();
        assert_eq!(s.quit(), vec![GameEvent::GameOver]);
        assert!(s.quit().is_empty());
    }

    #[test]
    fn clear_road_reward_empties_traffic() {
        let mut s = playing_in(GameModeId::Challenge);
        s.mode.challenge_index = 4;
        s.combo = 3;
        obstacle_at(&mut s, 3, 0.0);
        obstacle_at(&mut s, 0, 40.0);
        let ev = s.update(10.0);
        assert!(ev.contains(&GameEvent::ChallengeComplete { index: 4 }));
        assert!(s.obstacles.obstacles.is_empty());
    }

    #[test]
    fn shield_reward_lasts_ten_seconds() {
        let mut s = playing_in(GameModeId::Challenge);
        s.game_time_ms = 29_995.0;
        let ev = s.update(10.0);
        assert!(ev.contains(&GameEvent::ChallengeComplete { index: 0 }));
        let now = s.game_time_ms;
        let shield = s
            .powerups
            .active_effects(now)
            .into_iter()
            .find(|e| e.kind == PowerUpKind::Shield)
            .expect("shield active");
        assert_eq!(shield.remaining_ms, CHALLENGE_REWARD_MS);
        s.powerups.expire(now + CHALLENGE_REWARD_MS - 1.0);
        assert!(s.powerups.has_shield());
        s.powerups.expire(now + CHALLENGE_REWARD_MS + 1.0);
        assert!(!s.powerups.has_shield());
    }

    #[test]
    fn points_pickup_adds_bonus() {
        let mut s = playing();
        let cfg = s.cfg.clone();
        let mut p = PowerUp::new(s.player.lane, 0.0, PowerUpKind::Points, &cfg);
        p.x = s.player.x;
        p.y = s.player.y;
        s.powerups.powerups.push(p);
        let before = s.score;
        let ev = s.update(10.0);
        assert_eq!(ev, vec![GameEvent::PowerUp(PowerUpKind::Points)]);
        assert_eq!(s.score - before, cfg.powerup_points_bonus);
        assert_eq!(s.powerups_collected, 1);
    }

    #[test]
    fn slowmo_halves_traffic_movement() {
        let mut s = playing();
        obstacle_at(&mut s, 3, 0.0);
        s.obstacles.obstacles[0].speed = 4.0;

        let y0 = s.obstacles.obstacles[0].y;
        s.update(FRAME_MS);
        let normal = s.obstacles.obstacles[0].y - y0;

        s.powerups.activate(PowerUpKind::SlowMo, s.game_time_ms, 5_000.0);
        let y1 = s.obstacles.obstacles[0].y;
        s.update(FRAME_MS);
        let slowed = s.obstacles.obstacles[0].y - y1;

        assert!((normal - 4.0).abs() < 1e-9);
        assert!((slowed - normal / 2.0).abs() < 1e-9);
    }
}
