use serde::{Deserialize, Serialize};

pub const TIME_TRIAL_MS: f64 = 60_000.0;
/// Delay between finishing the last challenge and the end of the run.
pub const CHALLENGE_FINISH_DELAY_MS: f64 = 2_000.0;
/// Reward effects granted by challenges last longer than pickups.
pub const CHALLENGE_REWARD_MS: f64 = 10_000.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameModeId {
    #[default]
    Endless,
    TimeTrial,
    Challenge,
    Zen,
}

impl GameModeId {
    pub const ALL: [GameModeId; 4] =
        [GameModeId::Endless, GameModeId::TimeTrial, GameModeId::Challenge, GameModeId::Zen];

    /// Stable key used in storage and by the page.
    pub fn key(self) -> &'static str {
        match self {
            GameModeId::Endless => "endless",
            GameModeId::TimeTrial => "timeTrial",
            GameModeId::Challenge => "challenge",
            GameModeId::Zen => "zen",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.key() == key)
    }

    pub fn name(self) -> &'static str {
        match self {
            GameModeId::Endless => "Endless",
            GameModeId::TimeTrial => "Time Trial",
            GameModeId::Challenge => "Challenge",
            GameModeId::Zen => "Zen",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            GameModeId::Endless => "Survive as long as you can with increasing difficulty.",
            GameModeId::TimeTrial => "Score as many points as possible in 60 seconds!",
            GameModeId::Challenge => "Complete specific challenges to earn rewards!",
            GameModeId::Zen => "Relaxing mode without collisions or pressure.",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChallengeReward {
    Shield,
    Multiplier,
    SlowMo,
    ClearRoad,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ChallengeGoal {
    SurviveMs(f64),
    DodgeCars(u32),
    Score(u64),
    NearMissStreak(u32),
    Combo(u32),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Challenge {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub goal: ChallengeGoal,
    pub reward: ChallengeReward,
}

pub static CHALLENGES: [Challenge; 5] = [
    Challenge {
        id: "survive30",
        name: "Survive 30 Seconds",
        description: "Survive for 30 seconds",
        goal: ChallengeGoal::SurviveMs(30_000.0),
        reward: ChallengeReward::Shield,
    },
    Challenge {
        id: "dodge10",
        name: "Dodge 10 Cars",
        description: "Successfully dodge 10 cars",
        goal: ChallengeGoal::DodgeCars(10),
        reward: ChallengeReward::Multiplier,
    },
    Challenge {
        id: "score100",
        name: "Score 100 Points",
        description: "Score 100 points",
        goal: ChallengeGoal::Score(100),
        reward: ChallengeReward::Multiplier,
    },
    Challenge {
        id: "nearMiss5",
        name: "5 Near Misses",
        description: "Get 5 near misses in a row",
        goal: ChallengeGoal::NearMissStreak(5),
        reward: ChallengeReward::SlowMo,
    },
    Challenge {
        id: "combo3",
        name: "3x Combo",
        description: "Get a 3x combo",
        goal: ChallengeGoal::Combo(3),
        reward: ChallengeReward::ClearRoad,
    },
];

/// Session counters the mode rules look at.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ModeStats {
    pub game_time_ms: f64,
    pub score: u64,
    pub cars_dodged: u32,
    pub near_miss_streak: u32,
    pub combo: u32,
}

impl ChallengeGoal {
    pub fn is_met(self, s: &ModeStats) -> bool {
        match self {
            ChallengeGoal::SurviveMs(ms) => s.game_time_ms >= ms,
            ChallengeGoal::DodgeCars(n) => s.cars_dodged >= n,
            ChallengeGoal::Score(n) => s.score >= n,
            ChallengeGoal::NearMissStreak(n) => s.near_miss_streak >= n,
            ChallengeGoal::Combo(n) => s.combo >= n,
        }
    }
}

/// What happened to the mode during one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ModeTick {
    pub completed: Option<(usize, ChallengeReward)>,
    pub game_over: bool,
}

/// Per-run state of the selected mode.
#[derive(Clone, Debug)]
pub struct ModeRuntime {
    pub mode: GameModeId,
    pub time_remaining_ms: f64,
    pub challenge_index: usize,
    finish_in_ms: Option<f64>,
}

impl ModeRuntime {
    pub fn new(mode: GameModeId) -> Self {
        Self { mode, time_remaining_ms: TIME_TRIAL_MS, challenge_index: 0, finish_in_ms: None }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.mode);
    }

    pub fn forgives_collisions(&self) -> bool {
        self.mode == GameModeId::Zen
    }

    pub fn current_challenge(&self) -> Option<&'static Challenge> {
        match self.mode {
            GameModeId::Challenge => CHALLENGES.get(self.challenge_index),
            _ => None,
        }
    }

    /// Fraction of challenges completed.
    pub fn challenge_progress(&self) -> f64 {
        self.challenge_index as f64 / CHALLENGES.len() as f64
    }

    pub fn time_remaining_secs(&self) -> u32 {
        (self.time_remaining_ms.max(0.0) / 1000.0).ceil() as u32
    }

    pub fn update(&mut self, delta_ms: f64, stats: &ModeStats) -> ModeTick {
        let mut tick = ModeTick::default();
        match self.mode {
            GameModeId::Endless | GameModeId::Zen => {}
            GameModeId::TimeTrial => {
                self.time_remaining_ms -= delta_ms;
                if self.time_remaining_ms <= 0.0 {
                    self.time_remaining_ms = 0.0;
                    tick.game_over = true;
                }
            }
            GameModeId::Challenge => {
                if let Some(left) = self.finish_in_ms.as_mut() {
                    *left -= delta_ms;
                    tick.game_over = *left <= 0.0;
                } else if let Some(ch) = self.current_challenge() {
                    if ch.goal.is_met(stats) {
                        tick.completed = Some((self.challenge_index, ch.reward));
                        self.challenge_index += 1;
                        if self.challenge_index >= CHALLENGES.len() {
                            self.finish_in_ms = Some(CHALLENGE_FINISH_DELAY_MS);
                        }
                    }
                }
            }
        }
        tick
    }

    pub fn score_label(&self, score: u64) -> String {
        match self.mode {
            GameModeId::Challenge => format!(
                "Score: {score} | Challenge: {}/{}",
                (self.challenge_index + 1).min(CHALLENGES.len()),
                CHALLENGES.len()
            ),
            GameModeId::Zen => format!("Relaxation Points: {score}"),
            _ => format!("Score: {score}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip() {
        for m in GameModeId::ALL {
            assert_eq!(GameModeId::from_key(m.key()), Some(m));
        }
        assert_eq!(GameModeId::from_key("arcade"), None);
        assert_eq!(serde_json::to_string(&GameModeId::TimeTrial).unwrap(), "\"timeTrial\"");
    }

    #[test]
    fn time_trial_ends_at_zero() {
        let mut rt = ModeRuntime::new(GameModeId::TimeTrial);
        let stats = ModeStats::default();
        assert!(!rt.update(59_000.0, &stats).game_over);
        assert_eq!(rt.time_remaining_secs(), 1);
        assert!(rt.update(1_000.0, &stats).game_over);
        assert_eq!(rt.time_remaining_ms, 0.0);
    }

    #[test]
    fn challenges_advance_in_order() {
        let mut rt = ModeRuntime::new(GameModeId::Challenge);
        let mut stats = ModeStats { cars_dodged: 50, ..Default::default() };
        // dodging first does not skip survive30
        assert_eq!(rt.update(16.0, &stats).completed, None);
        stats.game_time_ms = 30_000.0;
        assert_eq!(rt.update(16.0, &stats).completed, Some((0, ChallengeReward::Shield)));
        assert_eq!(rt.update(16.0, &stats).completed, Some((1, ChallengeReward::Multiplier)));
        assert_eq!(rt.current_challenge().map(|c| c.id), Some("score100"));
        assert_eq!(rt.score_label(42), "Score: 42 | Challenge: 3/5");
    }

    #[test]
    fn run_ends_two_seconds_after_last_challenge() {
        let mut rt = ModeRuntime::new(GameModeId::Challenge);
        let stats = ModeStats {
            game_time_ms: 30_000.0,
            score: 100,
            cars_dodged: 10,
            near_miss_streak: 5,
            combo: 3,
        };
        for i in 0..5 {
            let tick = rt.update(16.0, &stats);
            assert_eq!(tick.completed.map(|c| c.0), Some(i));
            assert!(!tick.game_over);
        }
        assert!(rt.current_challenge().is_none());
        assert!(!rt.update(1_000.0, &stats).game_over);
        assert!(rt.update(1_000.0, &stats).game_over);
    }

    #[test]
    fn only_zen_forgives() {
        assert!(ModeRuntime::new(GameModeId::Zen).forgives_collisions());
        assert!(!ModeRuntime::new(GameModeId::Endless).forgives_collisions());
        assert_eq!(ModeRuntime::new(GameModeId::Zen).score_label(7), "Relaxation Points: 7");
    }
}
