use crate::config::GameConfig;
use crate::geom::Rect;
use crate::rng::Rng;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerUpKind {
    Shield,
    SlowMo,
    Points,
    Multiplier,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 4] =
        [PowerUpKind::Shield, PowerUpKind::SlowMo, PowerUpKind::Points, PowerUpKind::Multiplier];

    pub fn is_timed(self) -> bool {
        !matches!(self, PowerUpKind::Points)
    }

    pub fn color(self) -> &'static str {
        match self {
            PowerUpKind::Shield => "#00ccff",
            PowerUpKind::SlowMo => "#ffcc00",
            PowerUpKind::Points => "#00ff00",
            PowerUpKind::Multiplier => "#ff00ff",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PowerUpKind::Shield => "Shield",
            PowerUpKind::SlowMo => "Slow-Mo",
            PowerUpKind::Points => "Points",
            PowerUpKind::Multiplier => "2x Points",
        }
    }
}

#[derive(Clone, Debug)]
pub struct PowerUp {
    pub lane: u8,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub speed: f64,
    pub kind: PowerUpKind,
    pub collected: bool,
}

impl PowerUp {
    pub fn new(lane: u8, speed: f64, kind: PowerUpKind, cfg: &GameConfig) -> Self {
        let size = cfg.powerup_size;
        Self {
            lane,
            x: cfg.lane_x(lane, size),
            y: -size,
            width: size,
            height: size,
            speed,
            kind,
            collected: false,
        }
    }

    pub fn collision_box(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Active timed effect as shown by the HUD timers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActiveEffect {
    pub kind: PowerUpKind,
    pub remaining_ms: f64,
}

pub struct PowerUpManager {
    pub powerups: Vec<PowerUp>,
    last_spawn_ms: f64,
    // end times in game milliseconds, indexed like PowerUpKind::ALL
    ends: [Option<f64>; 4],
    cfg: GameConfig,
}

fn slot(kind: PowerUpKind) -> usize {
    match kind {
        PowerUpKind::Shield => 0,
        PowerUpKind::SlowMo => 1,
        PowerUpKind::Points => 2,
        PowerUpKind::Multiplier => 3,
    }
}

impl PowerUpManager {
    pub fn new(cfg: &GameConfig) -> Self {
        Self { powerups: Vec::new(), last_spawn_ms: 0.0, ends: [None; 4], cfg: cfg.clone() }
    }

    pub fn update(
        &mut self,
        game_time_ms: f64,
        frames: f64,
        game_speed: f64,
        blocked_lanes: &[u8],
        rng: &mut Rng,
    ) {
        let canvas_h = self.cfg.canvas_height;
        for p in &mut self.powerups {
            p.y += p.speed * frames;
        }
        self.powerups.retain(|p| !p.collected && p.y <= canvas_h);

        if game_time_ms - self.last_spawn_ms > self.cfg.powerup_spawn_interval_ms {
            self.spawn(game_speed, blocked_lanes, rng);
            self.last_spawn_ms = game_time_ms;
        }

        self.expire(game_time_ms);
    }

    /// Spawns into a random lane not listed in `blocked_lanes`.
    pub fn spawn(&mut self, speed: f64, blocked_lanes: &[u8], rng: &mut Rng) -> Option<u8> {
        let free: Vec<u8> = (0..self.cfg.num_lanes).filter(|l| !blocked_lanes.contains(l)).collect();
        let lane = *rng.pick(&free)?;
        let kind = *rng.pick(&PowerUpKind::ALL)?;
        self.powerups.push(PowerUp::new(lane, speed, kind, &self.cfg));
        Some(lane)
    }

    pub fn expire(&mut self, now: f64) {
        for end in self.ends.iter_mut() {
            if end.is_some_and(|t| now > t) {
                *end = None;
            }
        }
    }

    /// First uncollected power-up touching the player is collected and its
    /// effect activated.
    pub fn check_collision(&mut self, player_box: &Rect, now: f64) -> Option<PowerUpKind> {
        let p = self
            .powerups
            .iter_mut()
            .find(|p| !p.collected && p.collision_box().intersects(player_box))?;
        p.collected = true;
        let kind = p.kind;
        self.activate(kind, now, self.cfg.powerup_duration_ms);
        Some(kind)
    }

    /// Timed kinds run until `now + duration_ms`; re-activation keeps the
    /// later end time. `Points` is instant and leaves no state here.
    pub fn activate(&mut self, kind: PowerUpKind, now: f64, duration_ms: f64) {
        if !kind.is_timed() {
            return;
        }
        let end = now + duration_ms;
        let cur = &mut self.ends[slot(kind)];
        *cur = Some(cur.map_or(end, |t| t.max(end)));
    }

    pub fn is_active(&self, kind: PowerUpKind) -> bool {
        self.ends[slot(kind)].is_some()
    }

    pub fn has_shield(&self) -> bool {
        self.is_active(PowerUpKind::Shield)
    }

    pub fn has_slowmo(&self) -> bool {
        self.is_active(PowerUpKind::SlowMo)
    }

    pub fn consume_shield(&mut self) -> bool {
        self.ends[slot(PowerUpKind::Shield)].take().is_some()
    }

    pub fn score_multiplier(&self) -> u64 {
        if self.is_active(PowerUpKind::Multiplier) { 2 } else { 1 }
    }

    pub fn speed_factor(&self) -> f64 {
        if self.has_slowmo() { 0.5 } else { 1.0 }
    }

    pub fn remaining_secs(&self, kind: PowerUpKind, now: f64) -> u32 {
        self.ends[slot(kind)].map_or(0, |t| ((t - now).max(0.0) / 1000.0).ceil() as u32)
    }

    pub fn active_effects(&self, now: f64) -> Vec<ActiveEffect> {
        PowerUpKind::ALL
            .iter()
            .filter_map(|&kind| {
                self.ends[slot(kind)]
                    .map(|t| ActiveEffect { kind, remaining_ms: (t - now).max(0.0) })
            })
            .collect()
    }

    pub fn reset(&mut self) {
        self.powerups.clear();
        self.last_spawn_ms = 0.0;
        self.ends = [None; 4];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> PowerUpManager {
        PowerUpManager::new(&GameConfig::default())
    }

    #[test]
    fn spawn_respects_blocked_lanes() {
        let mut m = manager();
        let mut rng = Rng::seeded(5);
        for _ in 0..40 {
            let lane = m.spawn(3.0, &[0, 1, 3], &mut rng).unwrap();
            assert_eq!(lane, 2);
        }
        assert_eq!(m.spawn(3.0, &[0, 1, 2, 3], &mut rng), None);
    }

    #[test]
    fn spawns_on_interval() {
        let mut m = manager();
        let mut rng = Rng::seeded(5);
        m.update(8_000.0, 1.0, 3.0, &[], &mut rng);
        assert!(m.powerups.is_empty());
        m.update(8_001.0, 1.0, 3.0, &[], &mut rng);
        assert_eq!(m.powerups.len(), 1);
    }

    #[test]
    fn timed_effects_expire() {
        let mut m = manager();
        m.activate(PowerUpKind::SlowMo, 1_000.0, 5_000.0);
        assert!(m.has_slowmo());
        assert_eq!(m.speed_factor(), 0.5);
        assert_eq!(m.remaining_secs(PowerUpKind::SlowMo, 1_500.0), 5);
        m.expire(6_000.0);
        assert!(m.has_slowmo());
        m.expire(6_001.0);
        assert!(!m.has_slowmo());
        assert_eq!(m.speed_factor(), 1.0);
    }

    #[test]
    fn reactivation_extends_to_later_end() {
        let mut m = manager();
        m.activate(PowerUpKind::Multiplier, 0.0, 5_000.0);
        m.activate(PowerUpKind::Multiplier, 3_000.0, 5_000.0);
        m.expire(7_000.0);
        assert_eq!(m.score_multiplier(), 2);
        m.expire(8_500.0);
        assert_eq!(m.score_multiplier(), 1);
    }

    #[test]
    fn points_leave_no_timer() {
        let mut m = manager();
        m.activate(PowerUpKind::Points, 0.0, 5_000.0);
        assert!(m.active_effects(0.0).is_empty());
    }

    #[test]
    fn collecting_activates_and_removes() {
        let cfg = GameConfig::default();
        let mut m = manager();
        let mut p = PowerUp::new(1, 3.0, PowerUpKind::Shield, &cfg);
        p.y = 450.0;
        m.powerups.push(p);
        let player = Rect::new(cfg.lane_x(1, 40.0), 440.0, 40.0, 60.0);
        assert_eq!(m.check_collision(&player, 100.0), Some(PowerUpKind::Shield));
        assert!(m.has_shield());
        assert_eq!(m.check_collision(&player, 100.0), None);
        m.update(200.0, 1.0, 3.0, &[], &mut Rng::seeded(1));
        assert!(m.powerups.is_empty());
        assert!(m.consume_shield());
        assert!(!m.has_shield());
    }
}
