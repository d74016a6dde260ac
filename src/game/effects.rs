use crate::rng::Rng;

/// Camera shake applied as a translate around the playfield draw.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScreenShake {
    pub remaining_ms: f64,
    pub magnitude: i32,
    offset: (i32, i32),
}

impl ScreenShake {
    pub fn start(&mut self, duration_ms: f64, magnitude: i32) {
        self.remaining_ms = self.remaining_ms.max(duration_ms);
        self.magnitude = self.magnitude.max(magnitude);
    }

    pub fn is_active(&self) -> bool {
        self.remaining_ms > 0.0
    }

    pub fn update(&mut self, delta_ms: f64, rng: &mut Rng) {
        if !self.is_active() {
            return;
        }
        self.remaining_ms -= delta_ms;
        if self.remaining_ms <= 0.0 {
            *self = Self::default();
            return;
        }
        let m = self.magnitude;
        self.offset = (rng.range_i32(-m, m), rng.range_i32(-m, m));
    }

    pub fn offset(&self) -> (f64, f64) {
        (f64::from(self.offset.0), f64::from(self.offset.1))
    }

    pub fn stop(&mut self) {
        *self = Self::default();
    }
}
