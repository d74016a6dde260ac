//! Everything persisted for the local player, bundled over one store.
//! Each manager saves its own blob; there is no cross-manager transaction.

use crate::accessibility::{AccessibilitySettings, ColorBlindMode, Difficulty};
use crate::achievements::{self, AchievementManager};
use crate::environments::EnvironmentManager;
use crate::game::GameSummary;
use crate::game::modes::GameModeId;
use crate::leaderboard::Leaderboard;
use crate::sound::SoundSettings;
use crate::storage::{self, KeyValueStore};
use crate::vehicles::VehicleManager;
use serde::Serialize;
use std::collections::BTreeMap;

const HIGH_SCORES_NAME: &str = "highScores";

/// What a finished run changed, for the game-over screen.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOutcome {
    pub new_high_score: bool,
    pub high_score: u64,
    pub rank: Option<usize>,
    pub unlocked_achievements: Vec<&'static str>,
    pub unlocked_vehicles: Vec<&'static str>,
    pub unlocked_environments: Vec<&'static str>,
}

impl GameOutcome {
    /// Lines for the game-over screen.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if self.new_high_score {
            lines.push("New high score!".to_string());
        }
        if let Some(rank) = self.rank {
            lines.push(format!("Leaderboard rank #{rank}"));
        }
        for id in &self.unlocked_achievements {
            let name = achievements::find(id).map_or(*id, |a| a.name);
            lines.push(format!("Achievement: {name}"));
        }
        for v in &self.unlocked_vehicles {
            lines.push(format!("Unlocked vehicle: {v}"));
        }
        for e in &self.unlocked_environments {
            lines.push(format!("Unlocked environment: {e}"));
        }
        lines
    }
}

pub struct Profile {
    store: Box<dyn KeyValueStore>,
    pub achievements: AchievementManager,
    pub leaderboard: Leaderboard,
    pub vehicles: VehicleManager,
    pub environments: EnvironmentManager,
    pub sound: SoundSettings,
    pub accessibility: AccessibilitySettings,
    high_scores: BTreeMap<String, u64>,
}

impl Profile {
    pub fn load(store: Box<dyn KeyValueStore>) -> Self {
        let s = store.as_ref();
        Self {
            achievements: AchievementManager::load(s),
            leaderboard: Leaderboard::load(s),
            vehicles: VehicleManager::load(s),
            environments: EnvironmentManager::load(s),
            sound: SoundSettings::load(s),
            accessibility: AccessibilitySettings::load(s),
            high_scores: storage::load_or_default(s, HIGH_SCORES_NAME),
            store,
        }
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    pub fn high_score(&self, mode: GameModeId) -> u64 {
        self.high_scores.get(mode.key()).copied().unwrap_or(0)
    }

    pub fn select_vehicle(&mut self, id: &str) -> bool {
        self.vehicles.select(id, self.store.as_ref())
    }

    pub fn select_environment(&mut self, index: usize) -> bool {
        self.environments.set(index, self.store.as_ref())
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.accessibility.difficulty = difficulty;
        self.accessibility.save(self.store.as_ref());
    }

    /// Display toggles. The caller applies the result to the page.
    pub fn set_high_contrast(&mut self, on: bool) {
        self.accessibility.high_contrast = on;
        self.accessibility.save(self.store.as_ref());
    }

    pub fn set_reduced_motion(&mut self, on: bool) {
        self.accessibility.reduced_motion = on;
        self.accessibility.save(self.store.as_ref());
    }

    pub fn set_large_text(&mut self, on: bool) {
        self.accessibility.large_text = on;
        self.accessibility.save(self.store.as_ref());
    }

    pub fn set_color_blind_mode(&mut self, mode: ColorBlindMode) {
        self.accessibility.color_blind_mode = mode;
        self.accessibility.save(self.store.as_ref());
    }

    pub fn toggle_sound(&mut self) -> bool {
        let on = self.sound.toggle();
        self.sound.save(self.store.as_ref());
        on
    }

    /// Record a finished run everywhere it counts.
    pub fn finish_game(&mut self, run: &GameSummary, name: &str, now_ms: f64) -> GameOutcome {
        let store = self.store.as_ref();
        let mut out = GameOutcome::default();

        let best = self.high_scores.entry(run.mode.key().to_string()).or_insert(0);
        if run.score > *best {
            *best = run.score;
            out.new_high_score = true;
            storage::save_or_warn(store, HIGH_SCORES_NAME, &self.high_scores);
        }
        out.high_score = self.high_score(run.mode);

        if run.score > 0 {
            out.rank = self.leaderboard.add_score(
                run.score,
                run.mode,
                name,
                run.difficulty,
                now_ms,
                store,
            );
        }

        self.achievements.record_game(run, store);
        out.unlocked_achievements =
            self.achievements.check(now_ms, store).into_iter().map(|a| a.id).collect();

        self.vehicles.record_score(&run.vehicle, run.score, store);
        out.unlocked_vehicles = self.vehicles.check_unlocks(run.score, store);

        let lifetime_best = self.achievements.stats().high_score;
        out.unlocked_environments = self
            .environments
            .check_unlocks(lifetime_best, store)
            .into_iter()
            .map(|e| e.id)
            .collect();

        out
    }

    /// Wipe all progress.
    pub fn reset(&mut self) {
        let store = self.store.as_ref();
        self.achievements.reset(store);
        self.leaderboard.clear(store);
        self.vehicles.reset(store);
        self.environments.reset(store);
        self.high_scores.clear();
        storage::save_or_warn(store, HIGH_SCORES_NAME, &self.high_scores);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn run(score: u64, mode: GameModeId) -> GameSummary {
        GameSummary {
            score,
            time_ms: 12_000.0,
            distance_m: 3.6,
            near_misses: 1,
            powerups_collected: 0,
            cars_dodged: 4,
            mode,
            difficulty: Difficulty::Normal,
            vehicle: "sedan".into(),
            environment: "day".into(),
        }
    }

    #[test]
    fn high_scores_are_per_mode() {
        let mut p = Profile::load(Box::new(MemoryStorage::new()));
        assert!(p.finish_game(&run(80, GameModeId::Endless), "a", 0.0).new_high_score);
        assert!(p.finish_game(&run(20, GameModeId::Zen), "a", 0.0).new_high_score);
        assert!(!p.finish_game(&run(50, GameModeId::Endless), "a", 0.0).new_high_score);
        assert_eq!(p.high_score(GameModeId::Endless), 80);
        assert_eq!(p.high_score(GameModeId::TimeTrial), 0);
    }

    #[test]
    fn big_run_unlocks_everything_it_reaches() {
        let mut p = Profile::load(Box::new(MemoryStorage::new()));
        let out = p.finish_game(&run(320, GameModeId::Endless), "ace", 1.0);
        assert_eq!(out.rank, Some(1));
        assert_eq!(out.unlocked_vehicles, vec!["sports", "truck", "motorcycle"]);
        assert_eq!(out.unlocked_environments, vec!["night", "rain"]);
        assert!(out.unlocked_achievements.contains(&"score_100"));
        assert!(p.select_vehicle("motorcycle"));
        assert!(p.select_environment(2));
    }

    #[test]
    fn zero_score_skips_leaderboard() {
        let mut p = Profile::load(Box::new(MemoryStorage::new()));
        let out = p.finish_game(&run(0, GameModeId::Endless), "x", 0.0);
        assert_eq!(out.rank, None);
        assert!(p.leaderboard.top(10).is_empty());
        assert_eq!(p.achievements.stats().total_games, 1);
    }

    #[test]
    fn reset_clears_progress() {
        let mut p = Profile::load(Box::new(MemoryStorage::new()));
        p.finish_game(&run(500, GameModeId::Endless), "x", 0.0);
        p.reset();
        assert_eq!(p.high_score(GameModeId::Endless), 0);
        assert!(!p.vehicles.is_unlocked("sports"));
        assert_eq!(p.achievements.unlocked_count(), 0);
    }

    #[test]
    fn display_toggles_are_saved() {
        let mut p = Profile::load(Box::new(MemoryStorage::new()));
        p.set_high_contrast(true);
        assert!(AccessibilitySettings::load(p.store()).high_contrast);
        p.set_large_text(true);
        assert!(AccessibilitySettings::load(p.store()).large_text);
        p.set_color_blind_mode(ColorBlindMode::Tritanopia);
        assert_eq!(
            AccessibilitySettings::load(p.store()).color_blind_mode,
            ColorBlindMode::Tritanopia
        );
        p.set_high_contrast(false);
        let saved = AccessibilitySettings::load(p.store());
        assert!(!saved.high_contrast);
        assert!(saved.large_text);
    }

    #[test]
    fn reduced_motion_lowers_particle_cap() {
        let mut p = Profile::load(Box::new(MemoryStorage::new()));
        assert_eq!(p.accessibility.max_particles(), 200);
        p.set_reduced_motion(true);
        assert_eq!(p.accessibility.max_particles(), 50);
        assert!(AccessibilitySettings::load(p.store()).reduced_motion);
    }

    #[test]
    fn outcome_lines_name_unlocked_achievements() {
        let mut p = Profile::load(Box::new(MemoryStorage::new()));
        let out = p.finish_game(&run(120, GameModeId::Endless), "x", 0.0);
        let lines = out.summary_lines();
        assert_eq!(lines[0], "New high score!");
        assert_eq!(lines[1], "Leaderboard rank #1");
        let first = achievements::find(out.unlocked_achievements[0]).expect("known id");
        assert!(lines.contains(&format!("Achievement: {}", first.name)));
        assert!(!lines.iter().any(|l| l.starts_with("Achievements:")));
    }
}
