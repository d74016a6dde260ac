//! Achievements are derived from lifetime [`PlayerStats`]. Stats are merged
//! after every run and the unlocked ids are stored separately, so an
//! achievement never re-locks even if the stats blob is lost.

use crate::accessibility::Difficulty;
use crate::game::GameSummary;
use crate::storage::{self, KeyValueStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const STATS_NAME: &str = "stats";
const UNLOCKED_NAME: &str = "achievements";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerStats {
    pub total_games: u32,
    pub high_score: u64,
    pub max_time_ms: f64,
    pub max_near_misses: u32,
    pub total_power_ups: u32,
    pub max_insane_score: u64,
    pub environments_played: BTreeSet<String>,
    pub vehicles_used: BTreeSet<String>,
}

impl PlayerStats {
    /// Fold one finished run into the lifetime stats.
    pub fn merge(&mut self, run: &GameSummary) {
        self.total_games += 1;
        self.high_score = self.high_score.max(run.score);
        self.max_time_ms = self.max_time_ms.max(run.time_ms);
        self.max_near_misses = self.max_near_misses.max(run.near_misses);
        self.total_power_ups += run.powerups_collected;
        if run.difficulty == Difficulty::Insane {
            self.max_insane_score = self.max_insane_score.max(run.score);
        }
        self.environments_played.insert(run.environment.clone());
        self.vehicles_used.insert(run.vehicle.clone());
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "camelCase")]
pub enum Condition {
    HighScore(u64),
    SurviveMs(f64),
    NearMisses(u32),
    PowerUps(u32),
    Games(u32),
    Environments(usize),
    InsaneFinish,
    Vehicles(usize),
}

impl Condition {
    /// Progress toward the goal, 0.0 to 1.0.
    pub fn progress(self, s: &PlayerStats) -> f64 {
        let ratio = |have: f64, want: f64| if want <= 0.0 { 1.0 } else { (have / want).min(1.0) };
        match self {
            Condition::HighScore(n) => ratio(s.high_score as f64, n as f64),
            Condition::SurviveMs(ms) => ratio(s.max_time_ms, ms),
            Condition::NearMisses(n) => ratio(f64::from(s.max_near_misses), f64::from(n)),
            Condition::PowerUps(n) => ratio(f64::from(s.total_power_ups), f64::from(n)),
            Condition::Games(n) => ratio(f64::from(s.total_games), f64::from(n)),
            Condition::Environments(n) => ratio(s.environments_played.len() as f64, n as f64),
            Condition::InsaneFinish => {
                if s.max_insane_score > 0 {
                    1.0
                } else {
                    0.0
                }
            }
            Condition::Vehicles(n) => ratio(s.vehicles_used.len() as f64, n as f64),
        }
    }

    pub fn is_met(self, s: &PlayerStats) -> bool {
        self.progress(s) >= 1.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub condition: Condition,
}

const fn ach(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    condition: Condition,
) -> Achievement {
    Achievement { id, name, description, icon, condition }
}

pub static ACHIEVEMENTS: [Achievement; 17] = [
    ach("score_100", "Rookie", "Score 100 points in a single game", "🏆", Condition::HighScore(100)),
    ach("score_500", "Expert", "Score 500 points in a single game", "🏆", Condition::HighScore(500)),
    ach("score_1000", "Master", "Score 1000 points in a single game", "🏆", Condition::HighScore(1000)),
    ach("score_5000", "Legend", "Score 5000 points in a single game", "🏆", Condition::HighScore(5000)),
    ach("survive_30", "Endurance", "Survive for 30 seconds", "⏱️", Condition::SurviveMs(30_000.0)),
    ach("survive_60", "Marathon", "Survive for 60 seconds", "⏱️", Condition::SurviveMs(60_000.0)),
    ach("survive_120", "Immortal", "Survive for 120 seconds", "⏱️", Condition::SurviveMs(120_000.0)),
    ach("nearmiss_10", "Daredevil", "Get 10 near misses in a single game", "💨", Condition::NearMisses(10)),
    ach("nearmiss_25", "Risk Taker", "Get 25 near misses in a single game", "💨", Condition::NearMisses(25)),
    ach("powerup_10", "Collector", "Collect 10 power-ups", "⚡", Condition::PowerUps(10)),
    ach("powerup_50", "Gadgeteer", "Collect 50 power-ups", "⚡", Condition::PowerUps(50)),
    ach("games_10", "Committed", "Play 10 games", "🎮", Condition::Games(10)),
    ach("games_50", "Dedicated", "Play 50 games", "🎮", Condition::Games(50)),
    ach("games_100", "Veteran", "Play 100 games", "🎮", Condition::Games(100)),
    ach("environments_all", "World Traveler", "Play in all environments", "🌍", Condition::Environments(5)),
    ach("insane_complete", "Insane", "Complete a game on Insane difficulty", "😈", Condition::InsaneFinish),
    ach("cars_all", "Car Collector", "Play with all car types", "🚗", Condition::Vehicles(4)),
];

pub fn find(id: &str) -> Option<&'static Achievement> {
    ACHIEVEMENTS.iter().find(|a| a.id == id)
}

/// Achievement row for the achievements screen.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementStatus {
    pub achievement: &'static Achievement,
    pub unlocked: bool,
    pub unlocked_at_ms: Option<f64>,
    pub progress: f64,
}

pub struct AchievementManager {
    stats: PlayerStats,
    // id -> unlock timestamp (ms since epoch)
    unlocked: BTreeMap<String, f64>,
    pending: Vec<&'static Achievement>,
}

impl AchievementManager {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let mut unlocked: BTreeMap<String, f64> = storage::load_or_default(store, UNLOCKED_NAME);
        unlocked.retain(|id, _| find(id).is_some());
        Self { stats: storage::load_or_default(store, STATS_NAME), unlocked, pending: Vec::new() }
    }

    pub fn stats(&self) -> &PlayerStats {
        &self.stats
    }

    /// Merge a finished run into the stored stats.
    pub fn record_game(&mut self, run: &GameSummary, store: &dyn KeyValueStore) -> &PlayerStats {
        self.stats.merge(run);
        storage::save_or_warn(store, STATS_NAME, &self.stats);
        &self.stats
    }

    /// Unlock everything the current stats satisfy. Each achievement unlocks
    /// once and is queued for notification.
    pub fn check(&mut self, now_ms: f64, store: &dyn KeyValueStore) -> Vec<&'static Achievement> {
        let fresh: Vec<&'static Achievement> = ACHIEVEMENTS
            .iter()
            .filter(|a| !self.unlocked.contains_key(a.id) && a.condition.is_met(&self.stats))
            .collect();
        if fresh.is_empty() {
            return fresh;
        }
        for a in &fresh {
            log::info!("achievement unlocked: {} ({})", a.name, a.id);
            self.unlocked.insert(a.id.to_string(), now_ms);
        }
        storage::save_or_warn(store, UNLOCKED_NAME, &self.unlocked);
        self.pending.extend(fresh.iter().copied());
        fresh
    }

    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked.contains_key(id)
    }

    pub fn progress(&self, id: &str) -> f64 {
        if self.is_unlocked(id) {
            return 1.0;
        }
        find(id).map_or(0.0, |a| a.condition.progress(&self.stats))
    }

    pub fn unlocked_count(&self) -> usize {
        self.unlocked.len()
    }

    pub fn total_count(&self) -> usize {
        ACHIEVEMENTS.len()
    }

    pub fn all(&self) -> Vec<AchievementStatus> {
        ACHIEVEMENTS
            .iter()
            .map(|a| AchievementStatus {
                achievement: a,
                unlocked: self.is_unlocked(a.id),
                unlocked_at_ms: self.unlocked.get(a.id).copied(),
                progress: self.progress(a.id),
            })
            .collect()
    }

    pub fn pending_notifications(&self) -> &[&'static Achievement] {
        &self.pending
    }

    pub fn clear_notifications(&mut self) {
        self.pending.clear();
    }

    pub fn reset(&mut self, store: &dyn KeyValueStore) {
        self.stats = PlayerStats::default();
        self.unlocked.clear();
        self.pending.clear();
        storage::save_or_warn(store, STATS_NAME, &self.stats);
        storage::save_or_warn(store, UNLOCKED_NAME, &self.unlocked);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::modes::GameModeId;
    use crate::storage::MemoryStorage;

    fn run(score: u64, secs: f64, near: u32, difficulty: Difficulty) -> GameSummary {
        GameSummary {
            score,
            time_ms: secs * 1000.0,
            distance_m: 0.0,
            near_misses: near,
            powerups_collected: 2,
            cars_dodged: 0,
            mode: GameModeId::Endless,
            difficulty,
            vehicle: "sedan".into(),
            environment: "day".into(),
        }
    }

    #[test]
    fn there_are_seventeen_unique_ids() {
        let ids: BTreeSet<_> = ACHIEVEMENTS.iter().map(|a| a.id).collect();
        assert_eq!(ids.len(), 17);
    }

    #[test]
    fn merge_keeps_maxima_and_sums() {
        let mut s = PlayerStats::default();
        s.merge(&run(300, 40.0, 12, Difficulty::Normal));
        s.merge(&run(120, 70.0, 3, Difficulty::Insane));
        assert_eq!(s.total_games, 2);
        assert_eq!(s.high_score, 300);
        assert_eq!(s.max_time_ms, 70_000.0);
        assert_eq!(s.max_near_misses, 12);
        assert_eq!(s.total_power_ups, 4);
        assert_eq!(s.max_insane_score, 120);
        assert_eq!(s.environments_played.len(), 1);
    }

    #[test]
    fn unlocks_once_and_queues_notifications() {
        let store = MemoryStorage::new();
        let mut m = AchievementManager::load(&store);
        m.record_game(&run(150, 35.0, 10, Difficulty::Normal), &store);
        let ids: Vec<_> = m.check(1.0, &store).iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["score_100", "survive_30", "nearmiss_10"]);
        assert!(m.check(2.0, &store).is_empty());
        assert_eq!(m.pending_notifications().len(), 3);
        m.clear_notifications();
        assert!(m.pending_notifications().is_empty());

        let reloaded = AchievementManager::load(&store);
        assert_eq!(reloaded.unlocked_count(), 3);
        assert_eq!(reloaded.stats().total_games, 1);
    }

    #[test]
    fn progress_is_fractional_until_unlocked() {
        let store = MemoryStorage::new();
        let mut m = AchievementManager::load(&store);
        m.record_game(&run(250, 1.0, 0, Difficulty::Normal), &store);
        assert!((m.progress("score_500") - 0.5).abs() < 1e-9);
        assert_eq!(m.progress("insane_complete"), 0.0);
        assert_eq!(m.progress("nope"), 0.0);
        m.check(0.0, &store);
        assert_eq!(m.progress("score_100"), 1.0);
    }

    #[test]
    fn insane_run_unlocks_insane() {
        let store = MemoryStorage::new();
        let mut m = AchievementManager::load(&store);
        m.record_game(&run(5, 1.0, 0, Difficulty::Insane), &store);
        let ids: Vec<_> = m.check(0.0, &store).iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["insane_complete"]);
    }
}
