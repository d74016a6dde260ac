//! Touch gesture recognition. The tracker is fed raw touch points by the
//! browser shell and turns completed touches into gestures.

use std::collections::HashMap;

pub const SWIPE_MIN_PX: f64 = 30.0;
pub const SWIPE_MAX_MS: f64 = 300.0;
pub const DOUBLE_TAP_MS: f64 = 300.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gesture {
    SwipeLeft,
    SwipeRight,
    DoubleTap,
}

#[derive(Clone, Copy, Debug)]
struct TouchPoint {
    start_x: f64,
    start_y: f64,
    x: f64,
    y: f64,
    start_ms: f64,
}

#[derive(Default)]
pub struct TouchTracker {
    active: HashMap<i32, TouchPoint>,
    last_tap_ms: Option<f64>,
}

impl TouchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_touches(&self) -> usize {
        self.active.len()
    }

    pub fn start(&mut self, id: i32, x: f64, y: f64, now_ms: f64) {
        self.active.insert(id, TouchPoint { start_x: x, start_y: y, x, y, start_ms: now_ms });
    }

    pub fn move_to(&mut self, id: i32, x: f64, y: f64) {
        if let Some(t) = self.active.get_mut(&id) {
            t.x = x;
            t.y = y;
        }
    }

    pub fn cancel(&mut self, id: i32) {
        self.active.remove(&id);
    }

    /// Finish a touch. A fast horizontal drag is a swipe; anything else counts
    /// as a tap, and two taps close together form a double tap.
    pub fn end(&mut self, id: i32, now_ms: f64) -> Vec<Gesture> {
        let Some(t) = self.active.remove(&id) else {
            return Vec::new();
        };
        let dx = t.x - t.start_x;
        let dy = t.y - t.start_y;
        let elapsed = now_ms - t.start_ms;

        if dx.abs() > SWIPE_MIN_PX && dx.abs() >= dy.abs() && elapsed < SWIPE_MAX_MS {
            self.last_tap_ms = None;
            return vec![if dx < 0.0 { Gesture::SwipeLeft } else { Gesture::SwipeRight }];
        }

        match self.last_tap_ms {
            Some(prev) if now_ms - prev < DOUBLE_TAP_MS => {
                self.last_tap_ms = None;
                vec![Gesture::DoubleTap]
            }
            _ => {
                self.last_tap_ms = Some(now_ms);
                Vec::new()
            }
        }
    }
}
