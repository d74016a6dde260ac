use crate::config::GameConfig;
use crate::geom::Rect;
use crate::rng::Rng;

/// Extra collision height carried by trucks (trailer).
pub const TRUCK_EXTRA_HEIGHT: f64 = 20.0;
const CAR_COLORS: [&str; 4] = ["#ff3333", "#ff9933", "#9933ff", "#33ff99"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObstacleKind {
    Car,
    Truck,
    Barrier,
}

impl ObstacleKind {
    /// 75% cars, 15% trucks, 10% barriers.
    pub fn roll(rng: &mut Rng) -> Self {
        let r = rng.next_f64();
        if r < 0.75 {
            ObstacleKind::Car
        } else if r < 0.90 {
            ObstacleKind::Truck
        } else {
            ObstacleKind::Barrier
        }
    }
}

#[derive(Clone, Debug)]
pub struct Obstacle {
    pub lane: u8,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub speed: f64,
    pub kind: ObstacleKind,
    pub color: &'static str,
    pub passed_player: bool,
    pub near_miss_counted: bool,
}

impl Obstacle {
    pub fn new(lane: u8, speed: f64, kind: ObstacleKind, cfg: &GameConfig, rng: &mut Rng) -> Self {
        let color = match kind {
            ObstacleKind::Car => CAR_COLORS[rng.index(CAR_COLORS.len())],
            ObstacleKind::Truck => "#666666",
            ObstacleKind::Barrier => "#ffcc00",
        };
        Self {
            lane,
            x: cfg.lane_x(lane, cfg.obstacle_width),
            y: -cfg.obstacle_height,
            width: cfg.obstacle_width,
            height: cfg.obstacle_height,
            speed,
            kind,
            color,
            passed_player: false,
            near_miss_counted: false,
        }
    }

    pub fn update(&mut self, frames: f64, speed_multiplier: f64) {
        self.y += self.speed * speed_multiplier * frames;
    }

    pub fn is_off_screen(&self, canvas_height: f64) -> bool {
        self.y > canvas_height
    }

    pub fn collision_box(&self) -> Rect {
        let h = match self.kind {
            ObstacleKind::Truck => self.height + TRUCK_EXTRA_HEIGHT,
            _ => self.height,
        };
        Rect::new(self.x, self.y, self.width, h)
    }
}

/// Owns live obstacles, the spawn timer and the global speed ramp.
pub struct ObstacleManager {
    pub obstacles: Vec<Obstacle>,
    pub current_speed: f64,
    last_spawn_ms: f64,
    last_speed_increase_ms: f64,
    difficulty_multiplier: f64,
    passed_since_take: u32,
    cfg: GameConfig,
}

impl ObstacleManager {
    pub fn new(cfg: &GameConfig) -> Self {
        Self {
            obstacles: Vec::new(),
            current_speed: cfg.base_obstacle_speed,
            last_spawn_ms: 0.0,
            last_speed_increase_ms: 0.0,
            difficulty_multiplier: 1.0,
            passed_since_take: 0,
            cfg: cfg.clone(),
        }
    }

    pub fn set_difficulty_multiplier(&mut self, m: f64) {
        self.difficulty_multiplier = m.max(0.1);
    }

    pub fn difficulty_multiplier(&self) -> f64 {
        self.difficulty_multiplier
    }

    /// Effective downward speed of newly spawned traffic.
    pub fn effective_speed(&self) -> f64 {
        self.current_speed * self.difficulty_multiplier
    }

    pub fn update(&mut self, game_time_ms: f64, frames: f64, speed_multiplier: f64, rng: &mut Rng) {
        if game_time_ms - self.last_speed_increase_ms > self.cfg.speed_increment_interval_ms {
            self.current_speed += self.cfg.speed_increment;
            self.last_speed_increase_ms = game_time_ms;
        }

        let canvas_h = self.cfg.canvas_height;
        for o in &mut self.obstacles {
            o.update(frames, speed_multiplier);
        }
        self.obstacles.retain(|o| !o.is_off_screen(canvas_h));

        if game_time_ms - self.last_spawn_ms > self.cfg.obstacle_spawn_interval_ms {
            self.spawn(rng);
            self.last_spawn_ms = game_time_ms;
        }
    }

    /// Lanes with an obstacle still inside the spawn band.
    pub fn occupied_lanes(&self) -> Vec<u8> {
        let mut lanes: Vec<u8> = self
            .obstacles
            .iter()
            .filter(|o| o.y < self.cfg.min_obstacle_gap)
            .map(|o| o.lane)
            .collect();
        lanes.sort_unstable();
        lanes.dedup();
        lanes
    }

    /// Lanes a new obstacle may enter. The last free lane of the spawn band is
    /// never handed out so that a path through the band always exists.
    pub fn spawnable_lanes(&self) -> Vec<u8> {
        let occupied = self.occupied_lanes();
        let free: Vec<u8> = (0..self.cfg.num_lanes).filter(|l| !occupied.contains(l)).collect();
        if free.len() <= 1 && self.cfg.num_lanes > 1 {
            return Vec::new();
        }
        free
    }

    /// Returns the spawned lane, or `None` when no lane was eligible.
    pub fn spawn(&mut self, rng: &mut Rng) -> Option<u8> {
        let lanes = self.spawnable_lanes();
        let lane = *rng.pick(&lanes)?;
        let kind = ObstacleKind::roll(rng);
        let obstacle = Obstacle::new(lane, self.effective_speed(), kind, &self.cfg, rng);
        self.obstacles.push(obstacle);
        Some(lane)
    }

    pub fn check_collision(&self, player_box: &Rect) -> Option<usize> {
        self.obstacles.iter().position(|o| o.collision_box().intersects(player_box))
    }

    /// Count obstacles passing alongside the player within `threshold` px
    /// without touching. Each obstacle is counted at most once. Also marks
    /// obstacles that have fully passed the player.
    pub fn check_near_misses(&mut self, player_box: &Rect, threshold: f64) -> u32 {
        let mut near = 0;
        for o in &mut self.obstacles {
            let b = o.collision_box();
            if !o.passed_player && b.y > player_box.bottom() {
                o.passed_player = true;
                self.passed_since_take += 1;
            }
            if o.near_miss_counted || b.intersects(player_box) {
                continue;
            }
            if b.overlaps_vertically(player_box) && b.horizontal_gap(player_box) <= threshold {
                o.near_miss_counted = true;
                near += 1;
            }
        }
        near
    }

    /// Obstacles that passed the player since the last call ("cars dodged").
    pub fn take_passed(&mut self) -> u32 {
        std::mem::take(&mut self.passed_since_take)
    }

    pub fn remove(&mut self, index: usize) -> Option<Obstacle> {
        (index < self.obstacles.len()).then(|| self.obstacles.remove(index))
    }

    pub fn clear(&mut self) {
        self.obstacles.clear();
    }

    pub fn reset(&mut self) {
        self.obstacles.clear();
        self.current_speed = self.cfg.base_obstacle_speed;
        self.last_spawn_ms = 0.0;
        self.last_speed_increase_ms = 0.0;
        self.passed_since_take = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (ObstacleManager, Rng) {
        (ObstacleManager::new(&GameConfig::default()), Rng::seeded(11))
    }

    fn place(m: &mut ObstacleManager, lane: u8, y: f64, rng: &mut Rng) {
        let cfg = GameConfig::default();
        let mut o = Obstacle::new(lane, 3.0, ObstacleKind::Car, &cfg, rng);
        o.y = y;
        m.obstacles.push(o);
    }

    #[test]
    fn spawn_avoids_lanes_inside_min_gap() {
        let (mut m, mut rng) = manager();
        place(&mut m, 0, 20.0, &mut rng);
        place(&mut m, 2, 100.0, &mut rng);
        for _ in 0..50 {
            let lanes = m.spawnable_lanes();
            assert!(!lanes.contains(&0) && !lanes.contains(&2));
        }
        let lane = m.spawn(&mut rng).unwrap();
        assert!(lane == 1 || lane == 3);
    }

    #[test]
    fn obstacles_below_gap_do_not_block_lane() {
        let (mut m, mut rng) = manager();
        place(&mut m, 0, 200.0, &mut rng);
        assert!(m.occupied_lanes().is_empty());
    }

    #[test]
    fn last_free_lane_is_never_filled() {
        let (mut m, mut rng) = manager();
        for lane in 0..3 {
            place(&mut m, lane, 0.0, &mut rng);
        }
        assert!(m.spawnable_lanes().is_empty());
        assert_eq!(m.spawn(&mut rng), None);
        assert_eq!(m.obstacles.len(), 3);
    }

    #[test]
    fn spawns_on_interval_and_ramps_speed() {
        let (mut m, mut rng) = manager();
        m.update(1_000.0, 1.0, 1.0, &mut rng);
        assert!(m.obstacles.is_empty());
        m.update(1_501.0, 1.0, 1.0, &mut rng);
        assert_eq!(m.obstacles.len(), 1);
        assert_eq!(m.current_speed, 3.0);
        m.update(5_001.0, 1.0, 1.0, &mut rng);
        assert_eq!(m.current_speed, 3.5);
    }

    #[test]
    fn off_screen_obstacles_are_removed() {
        let (mut m, mut rng) = manager();
        place(&mut m, 1, 599.0, &mut rng);
        m.update(10.0, 1.0, 1.0, &mut rng);
        assert!(m.obstacles.is_empty());
    }

    #[test]
    fn difficulty_scales_new_obstacle_speed() {
        let (mut m, mut rng) = manager();
        m.set_difficulty_multiplier(1.2);
        m.spawn(&mut rng);
        assert!((m.obstacles[0].speed - 3.6).abs() < 1e-9);
    }

    #[test]
    fn collision_uses_truck_trailer() {
        let cfg = GameConfig::default();
        let (mut m, mut rng) = manager();
        let mut truck = Obstacle::new(1, 3.0, ObstacleKind::Truck, &cfg, &mut rng);
        // player top is at 440; truck body ends at 435, trailer at 455
        truck.y = 375.0;
        m.obstacles.push(truck);
        let player = Rect::new(cfg.lane_x(1, 40.0), 440.0, 40.0, 60.0);
        assert_eq!(m.check_collision(&player), Some(0));
    }

    #[test]
    fn near_miss_counts_adjacent_lane_once() {
        let cfg = GameConfig::default();
        let (mut m, mut rng) = manager();
        place(&mut m, 2, 420.0, &mut rng);
        let player = Rect::new(cfg.lane_x(1, 40.0), 440.0, 40.0, 60.0);
        assert_eq!(m.check_near_misses(&player, cfg.near_miss_threshold), 1);
        assert_eq!(m.check_near_misses(&player, cfg.near_miss_threshold), 0);
    }

    #[test]
    fn far_lane_and_collisions_are_not_near_misses() {
        let cfg = GameConfig::default();
        let (mut m, mut rng) = manager();
        place(&mut m, 3, 420.0, &mut rng);
        place(&mut m, 1, 420.0, &mut rng);
        let player = Rect::new(cfg.lane_x(1, 40.0), 440.0, 40.0, 60.0);
        assert_eq!(m.check_near_misses(&player, cfg.near_miss_threshold), 0);
    }

    #[test]
    fn passed_obstacles_are_reported_once() {
        let cfg = GameConfig::default();
        let (mut m, mut rng) = manager();
        place(&mut m, 0, 520.0, &mut rng);
        let player = Rect::new(cfg.lane_x(1, 40.0), 440.0, 40.0, 60.0);
        m.check_near_misses(&player, cfg.near_miss_threshold);
        m.check_near_misses(&player, cfg.near_miss_threshold);
        assert_eq!(m.take_passed(), 1);
        assert_eq!(m.take_passed(), 0);
    }

    #[test]
    fn reset_restores_base_speed() {
        let (mut m, mut rng) = manager();
        m.update(6_000.0, 1.0, 1.0, &mut rng);
        m.reset();
        assert!(m.obstacles.is_empty());
        assert_eq!(m.current_speed, 3.0);
    }
}
