//! Short-lived visual particles. Purely cosmetic; nothing in the rules reads
//! them back.

use crate::rng::Rng;
use std::f64::consts::TAU;

pub const DEFAULT_MAX_PARTICLES: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParticleShape {
    Circle,
    Square,
    Spark,
    Debris,
    Star,
    Trail,
    Line,
    Triangle,
}

#[derive(Clone, Debug)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub size: f64,
    pub color: &'static str,
    pub life: f64,
    pub decay: f64,
    pub shape: ParticleShape,
    pub gravity: f64,
    pub rotation: f64,
    pub rotation_speed: f64,
}

impl Particle {
    fn new(x: f64, y: f64, shape: ParticleShape, color: &'static str) -> Self {
        Self {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            size: 3.0,
            color,
            life: 1.0,
            decay: 0.02,
            shape,
            gravity: 0.1,
            rotation: 0.0,
            rotation_speed: 0.0,
        }
    }

    fn with_velocity(mut self, vx: f64, vy: f64) -> Self {
        self.vx = vx;
        self.vy = vy;
        self
    }

    fn with_life(mut self, life: f64, decay: f64) -> Self {
        self.life = life;
        self.decay = decay;
        self
    }

    fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    /// Returns whether the particle is still alive.
    pub fn update(&mut self, frames: f64) -> bool {
        self.x += self.vx * frames;
        self.y += self.vy * frames;
        if matches!(self.shape, ParticleShape::Spark | ParticleShape::Debris) {
            self.vy += self.gravity * frames;
        }
        self.rotation += self.rotation_speed * frames;
        self.life -= self.decay * frames;
        if self.life < 0.2 {
            self.size *= 0.98;
        }
        self.life > 0.0
    }
}

fn polar(angle: f64, speed: f64) -> (f64, f64) {
    (angle.cos() * speed, angle.sin() * speed)
}

pub struct ParticleSystem {
    pub particles: Vec<Particle>,
    max_particles: usize,
}

impl Default for ParticleSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticleSystem {
    pub fn new() -> Self {
        Self { particles: Vec::new(), max_particles: DEFAULT_MAX_PARTICLES }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn max_particles(&self) -> usize {
        self.max_particles
    }

    pub fn set_max_particles(&mut self, max: usize) {
        self.max_particles = max;
        self.trim();
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    pub fn update(&mut self, frames: f64) {
        self.particles.retain_mut(|p| p.update(frames));
        self.trim();
    }

    // keep the newest
    fn trim(&mut self) {
        if self.particles.len() > self.max_particles {
            let excess = self.particles.len() - self.max_particles;
            self.particles.drain(..excess);
        }
    }

    pub fn explosion(&mut self, x: f64, y: f64, count: usize, rng: &mut Rng) {
        let color = *rng.pick(&["#ff9900", "#ff6600", "#ffff00"]).unwrap_or(&"#ff9900");
        for i in 0..count {
            let (vx, vy) = polar(TAU * i as f64 / count as f64, rng.range_f64(2.0, 10.0));
            let shape = if rng.chance(0.5) { ParticleShape::Circle } else { ParticleShape::Square };
            self.particles.push(
                Particle::new(x, y, shape, color)
                    .with_velocity(vx, vy)
                    .with_size(rng.range_f64(2.0, 8.0))
                    .with_life(1.0, rng.range_f64(0.02, 0.04)),
            );
        }
        for _ in 0..10 {
            let (vx, vy) = polar(rng.range_f64(0.0, TAU), rng.range_f64(5.0, 15.0));
            let mut p = Particle::new(x, y, ParticleShape::Spark, "#ffff99")
                .with_velocity(vx, vy)
                .with_size(rng.range_f64(1.0, 5.0))
                .with_life(1.0, rng.range_f64(0.03, 0.06));
            p.gravity = 0.15;
            self.particles.push(p);
        }
    }

    pub fn near_miss(&mut self, x: f64, y: f64) {
        for i in 0..8 {
            let (vx, vy) = polar(TAU * i as f64 / 8.0, 3.0);
            self.particles.push(
                Particle::new(x, y, ParticleShape::Star, "#00ffff")
                    .with_velocity(vx, vy)
                    .with_life(1.0, 0.05),
            );
        }
        for i in [-2i32, -1, 1, 2] {
            self.particles.push(
                Particle::new(x + f64::from(i) * 10.0, y, ParticleShape::Trail, "#ffffff")
                    .with_velocity(0.0, -5.0)
                    .with_size(f64::from(i.abs()) * 2.0 + 1.0)
                    .with_life(0.8, 0.08),
            );
        }
    }

    pub fn power_up(&mut self, x: f64, y: f64, color: &'static str, rng: &mut Rng) {
        for i in 0..16 {
            let (vx, vy) = polar(TAU * i as f64 / 16.0, 4.0);
            self.particles.push(
                Particle::new(x, y, ParticleShape::Circle, color).with_velocity(vx, vy),
            );
        }
        self.sparkles(x, y, 5, "#ffffff", rng);
    }

    pub fn shield_break(&mut self, x: f64, y: f64, rng: &mut Rng) {
        for _ in 0..12 {
            let (vx, vy) = polar(rng.range_f64(0.0, TAU), rng.range_f64(2.0, 6.0));
            let mut p = Particle::new(x, y, ParticleShape::Debris, "#00ccff")
                .with_velocity(vx, vy)
                .with_size(rng.range_f64(4.0, 12.0));
            p.rotation = rng.range_f64(0.0, TAU);
            p.rotation_speed = rng.range_f64(-0.15, 0.15);
            self.particles.push(p);
        }
        for _ in 0..8 {
            let (vx, vy) = polar(rng.range_f64(0.0, TAU), rng.range_f64(3.0, 9.0));
            self.particles.push(
                Particle::new(x, y, ParticleShape::Spark, "#ffffff")
                    .with_velocity(vx, vy)
                    .with_size(rng.range_f64(1.0, 4.0))
                    .with_life(0.8, 0.04),
            );
        }
    }

    /// Streaks falling past the road at high speed; `spread` is usually one
    /// lane width.
    pub fn speed_lines(&mut self, x: f64, y: f64, spread: f64, count: usize, rng: &mut Rng) {
        for _ in 0..count {
            self.particles.push(
                Particle::new(x + rng.range_f64(-0.5, 0.5) * spread, y, ParticleShape::Line, "#ffffff")
                    .with_velocity(0.0, rng.range_f64(4.0, 12.0))
                    .with_size(rng.range_f64(1.0, 3.0))
                    .with_life(0.8, 0.03),
            );
        }
    }

    pub fn sparkles(&mut self, x: f64, y: f64, count: usize, color: &'static str, rng: &mut Rng) {
        for _ in 0..count {
            let (vx, vy) = polar(rng.range_f64(0.0, TAU), rng.range_f64(0.5, 2.5));
            let mut p = Particle::new(x, y, ParticleShape::Star, color)
                .with_velocity(vx, vy)
                .with_size(rng.range_f64(1.0, 3.0));
            p.rotation_speed = rng.range_f64(-0.1, 0.1);
            self.particles.push(p);
        }
    }

    pub fn exhaust(&mut self, x: f64, y: f64, rng: &mut Rng) {
        const SMOKE: [&str; 3] = ["#666666", "#888888", "#aaaaaa"];
        for _ in 0..3 {
            self.particles.push(
                Particle::new(x + rng.range_f64(-5.0, 5.0), y, ParticleShape::Circle, SMOKE[rng.index(3)])
                    .with_velocity(rng.range_f64(-0.25, 0.25), -rng.range_f64(1.0, 3.0))
                    .with_size(rng.range_f64(4.0, 12.0))
                    .with_life(0.6, 0.02),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gravity_applies_only_to_sparks_and_debris() {
        let mut spark = Particle::new(0.0, 0.0, ParticleShape::Spark, "#fff");
        let mut circle = Particle::new(0.0, 0.0, ParticleShape::Circle, "#fff");
        spark.update(1.0);
        circle.update(1.0);
        assert!(spark.vy > 0.0);
        assert_eq!(circle.vy, 0.0);
    }

    #[test]
    fn particles_die_when_life_runs_out() {
        let mut p = Particle::new(0.0, 0.0, ParticleShape::Star, "#fff").with_life(0.1, 0.05);
        assert!(p.update(1.0));
        let size = p.size;
        assert!(!p.update(1.0));
        assert!(p.size < size);
    }

    #[test]
    fn system_caps_to_newest() {
        let mut rng = Rng::seeded(3);
        let mut sys = ParticleSystem::new();
        sys.set_max_particles(50);
        sys.explosion(0.0, 0.0, 20, &mut rng);
        sys.explosion(0.0, 0.0, 20, &mut rng);
        sys.near_miss(9.0, 9.0);
        sys.update(0.0);
        assert_eq!(sys.len(), 50);
        // the near-miss burst was emitted last and must survive the trim
        assert_eq!(sys.particles.last().map(|p| p.shape), Some(ParticleShape::Trail));
    }

    #[test]
    fn emitters_produce_expected_counts() {
        let mut rng = Rng::seeded(3);
        let mut sys = ParticleSystem::new();
        sys.near_miss(0.0, 0.0);
        assert_eq!(sys.len(), 12);
        sys.clear();
        sys.power_up(0.0, 0.0, "#00ccff", &mut rng);
        assert_eq!(sys.len(), 21);
        sys.clear();
        sys.shield_break(0.0, 0.0, &mut rng);
        assert_eq!(sys.len(), 20);
        sys.clear();
        sys.exhaust(0.0, 0.0, &mut rng);
        assert_eq!(sys.len(), 3);
    }

    #[test]
    fn everything_eventually_expires() {
        let mut rng = Rng::seeded(9);
        let mut sys = ParticleSystem::new();
        sys.explosion(100.0, 100.0, 20, &mut rng);
        sys.speed_lines(100.0, 0.0, 75.0, 5, &mut rng);
        for _ in 0..200 {
            sys.update(1.0);
        }
        assert!(sys.is_empty());
    }
}
