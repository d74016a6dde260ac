use std::collections::VecDeque;

const HISTORY_SECS: usize = 60;
pub const REDUCE_BELOW_FPS: f64 = 30.0;
pub const RESTORE_AT_FPS: f64 = 45.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PerfMode {
    Normal,
    Reduced,
}

/// Frame-rate watchdog. Counts frames per wall-clock second and flips into
/// `Reduced` when the rolling average drops; hysteresis keeps it from
/// flapping.
pub struct PerfMonitor {
    frames: u32,
    window_start_ms: Option<f64>,
    history: VecDeque<u32>,
    mode: PerfMode,
}

impl Default for PerfMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl PerfMonitor {
    pub fn new() -> Self {
        Self { frames: 0, window_start_ms: None, history: VecDeque::new(), mode: PerfMode::Normal }
    }

    pub fn mode(&self) -> PerfMode {
        self.mode
    }

    pub fn last_fps(&self) -> Option<u32> {
        self.history.back().copied()
    }

    pub fn average_fps(&self) -> Option<f64> {
        if self.history.is_empty() {
            return None;
        }
        let sum: u32 = self.history.iter().sum();
        Some(f64::from(sum) / self.history.len() as f64)
    }

    /// Record a frame at `now_ms`. Returns the new mode when it changed.
    pub fn frame(&mut self, now_ms: f64) -> Option<PerfMode> {
        let start = *self.window_start_ms.get_or_insert(now_ms);
        self.frames += 1;
        if now_ms - start < 1000.0 {
            return None;
        }
        self.history.push_back(self.frames);
        if self.history.len() > HISTORY_SECS {
            self.history.pop_front();
        }
        self.frames = 0;
        self.window_start_ms = Some(now_ms);

        let avg = self.average_fps()?;
        let next = match self.mode {
            PerfMode::Normal if avg < REDUCE_BELOW_FPS => PerfMode::Reduced,
            PerfMode::Reduced if avg >= RESTORE_AT_FPS => PerfMode::Normal,
            m => m,
        };
        if next == self.mode {
            return None;
        }
        log::info!("performance mode -> {next:?} (avg {avg:.1} fps)");
        self.mode = next;
        Some(next)
    }
}
