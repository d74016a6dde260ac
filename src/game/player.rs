use crate::config::GameConfig;
use crate::geom::Rect;
use crate::vehicles::Vehicle;

pub const START_LANE: u8 = 1;
const TILT: f64 = 0.1;
const TILT_EASE: f64 = 0.2;

/// The player's vehicle. Lane changes are discrete requests animated over
/// several frames; a new request is ignored until the current one lands.
#[derive(Clone, Debug)]
pub struct Player {
    pub lane: u8,
    pub target_lane: u8,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub moving: bool,
    pub move_speed: f64,
    pub tilt: f64,
    pub target_tilt: f64,
    pub color: &'static str,
    pub vehicle_id: &'static str,
    lanes: u8,
    cfg: GameConfig,
}

impl Player {
    pub fn new(start_lane: u8, cfg: &GameConfig) -> Self {
        let lane = start_lane.min(cfg.num_lanes - 1);
        let mut p = Self {
            lane,
            target_lane: lane,
            x: 0.0,
            y: 0.0,
            width: cfg.player_width,
            height: cfg.player_height,
            moving: false,
            move_speed: 10.0,
            tilt: 0.0,
            target_tilt: 0.0,
            color: "#4d79ff",
            vehicle_id: "sedan",
            lanes: cfg.num_lanes,
            cfg: cfg.clone(),
        };
        p.place();
        p
    }

    fn place(&mut self) {
        self.x = self.cfg.lane_x(self.lane, self.width);
        self.y = self.cfg.canvas_height - self.height - 100.0;
    }

    pub fn move_to_lane(&mut self, target: u8) -> bool {
        if target >= self.lanes || self.moving || target == self.lane {
            return false;
        }
        self.target_tilt = if target < self.lane { -TILT } else { TILT };
        self.target_lane = target;
        self.moving = true;
        true
    }

    pub fn move_left(&mut self) -> bool {
        match self.lane.checked_sub(1) {
            Some(l) => self.move_to_lane(l),
            None => false,
        }
    }

    pub fn move_right(&mut self) -> bool {
        self.move_to_lane(self.lane + 1)
    }

    /// Advance the lane transition by `frames` 60 Hz frames.
    pub fn update(&mut self, frames: f64) {
        if self.moving {
            let target_x = self.cfg.lane_x(self.target_lane, self.width);
            let dx = target_x - self.x;
            let step = self.move_speed * frames;
            if dx.abs() < step || dx.abs() < 1e-9 {
                self.x = target_x;
                self.lane = self.target_lane;
                self.moving = false;
                self.target_tilt = 0.0;
            } else {
                self.x += step.copysign(dx);
            }
        }

        if (self.tilt - self.target_tilt).abs() > 0.01 {
            let ease = (TILT_EASE * frames).min(1.0);
            self.tilt += (self.target_tilt - self.tilt) * ease;
        } else {
            self.tilt = self.target_tilt;
        }
    }

    pub fn collision_box(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Vehicle stats drive handling (lane change speed) and footprint.
    pub fn apply_vehicle(&mut self, vehicle: &Vehicle) {
        self.move_speed = 5.0 + vehicle.stats.speed as f64 * 0.8;
        let size_factor = 0.7 + (vehicle.stats.size as f64 / 10.0) * 0.6;
        self.width = (self.cfg.player_width * size_factor).min(self.cfg.lane_width());
        self.height = self.cfg.player_height * size_factor;
        self.color = vehicle.color;
        self.vehicle_id = vehicle.id;
        self.place();
    }

    pub fn reset(&mut self) {
        self.lane = START_LANE.min(self.lanes - 1);
        self.target_lane = self.lane;
        self.moving = false;
        self.tilt = 0.0;
        self.target_tilt = 0.0;
        self.place();
    }
}
