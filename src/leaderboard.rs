use crate::accessibility::Difficulty;
use crate::game::modes::GameModeId;
use crate::storage::{self, KeyValueStore};
use serde::{Deserialize, Serialize};

const STORAGE_NAME: &str = "leaderboard";
pub const MAX_ENTRIES: usize = 10;
pub const ANONYMOUS: &str = "Anonymous";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScoreEntry {
    pub score: u64,
    pub player_name: String,
    #[serde(rename = "gameMode")]
    pub mode: GameModeId,
    pub difficulty: Difficulty,
    #[serde(rename = "timestamp")]
    pub timestamp_ms: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Boards {
    endless: Vec<ScoreEntry>,
    time_trial: Vec<ScoreEntry>,
    challenge: Vec<ScoreEntry>,
    zen: Vec<ScoreEntry>,
}

impl Boards {
    fn get(&self, mode: GameModeId) -> &Vec<ScoreEntry> {
        match mode {
            GameModeId::Endless => &self.endless,
            GameModeId::TimeTrial => &self.time_trial,
            GameModeId::Challenge => &self.challenge,
            GameModeId::Zen => &self.zen,
        }
    }

    fn get_mut(&mut self, mode: GameModeId) -> &mut Vec<ScoreEntry> {
        match mode {
            GameModeId::Endless => &mut self.endless,
            GameModeId::TimeTrial => &mut self.time_trial,
            GameModeId::Challenge => &mut self.challenge,
            GameModeId::Zen => &mut self.zen,
        }
    }
}

/// Stored shape: older saves were a bare array of endless scores.
#[derive(Deserialize)]
#[serde(untagged)]
enum Stored {
    Legacy(Vec<ScoreEntry>),
    Modes(Boards),
}

pub struct Leaderboard {
    boards: Boards,
}

/// Position a score would take in `list`; equal scores rank after older ones.
fn insertion_index(list: &[ScoreEntry], score: u64) -> usize {
    list.iter().position(|e| e.score < score).unwrap_or(list.len())
}

impl Leaderboard {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let boards = match storage::load_json::<Stored>(store, STORAGE_NAME) {
            Ok(Some(Stored::Modes(b))) => b,
            Ok(Some(Stored::Legacy(endless))) => {
                log::info!("migrating legacy leaderboard ({} entries)", endless.len());
                Boards { endless, ..Default::default() }
            }
            Ok(None) => Boards::default(),
            Err(err) => {
                log::warn!("{err}; starting with an empty leaderboard");
                Boards::default()
            }
        };
        let mut lb = Self { boards };
        for mode in GameModeId::ALL {
            let list = lb.boards.get_mut(mode);
            list.sort_by(|a, b| b.score.cmp(&a.score));
            list.truncate(MAX_ENTRIES);
        }
        lb
    }

    fn save(&self, store: &dyn KeyValueStore) {
        storage::save_or_warn(store, STORAGE_NAME, &self.boards);
    }

    /// Insert a score. Returns the 1-based rank of the new entry, or `None`
    /// when it did not make the top ten.
    pub fn add_score(
        &mut self,
        score: u64,
        mode: GameModeId,
        name: &str,
        difficulty: Difficulty,
        now_ms: f64,
        store: &dyn KeyValueStore,
    ) -> Option<usize> {
        let list = self.boards.get_mut(mode);
        let idx = insertion_index(list, score);
        if idx >= MAX_ENTRIES {
            return None;
        }
        let name = name.trim();
        list.insert(
            idx,
            ScoreEntry {
                score,
                player_name: if name.is_empty() { ANONYMOUS.to_string() } else { name.to_string() },
                mode,
                difficulty,
                timestamp_ms: now_ms,
            },
        );
        list.truncate(MAX_ENTRIES);
        self.save(store);
        Some(idx + 1)
    }

    /// Rank `score` would get if submitted now.
    pub fn rank_of(&self, score: u64, mode: GameModeId) -> Option<usize> {
        let idx = insertion_index(self.boards.get(mode), score);
        (idx < MAX_ENTRIES).then_some(idx + 1)
    }

    pub fn qualifies(&self, score: u64, mode: GameModeId) -> bool {
        self.rank_of(score, mode).is_some()
    }

    pub fn top_for_mode(&self, mode: GameModeId, limit: usize) -> &[ScoreEntry] {
        let list = self.boards.get(mode);
        &list[..limit.min(list.len())]
    }

    fn merged(&self, filter: impl Fn(&ScoreEntry) -> bool, limit: usize) -> Vec<ScoreEntry> {
        let mut all: Vec<ScoreEntry> = GameModeId::ALL
            .iter()
            .flat_map(|m| self.boards.get(*m).iter())
            .filter(|e| filter(e))
            .cloned()
            .collect();
        all.sort_by(|a, b| b.score.cmp(&a.score));
        all.truncate(limit);
        all
    }

    pub fn top(&self, limit: usize) -> Vec<ScoreEntry> {
        self.merged(|_| true, limit)
    }

    pub fn top_for_difficulty(&self, difficulty: Difficulty, limit: usize) -> Vec<ScoreEntry> {
        self.merged(|e| e.difficulty == difficulty, limit)
    }

    pub fn clear(&mut self, store: &dyn KeyValueStore) {
        self.boards = Boards::default();
        self.save(store);
    }

    pub fn clear_mode(&mut self, mode: GameModeId, store: &dyn KeyValueStore) {
        self.boards.get_mut(mode).clear();
        self.save(store);
    }
}

/// `1234567` -> `"1,234,567"`.
pub fn format_score(score: u64) -> String {
    let digits = score.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn add(lb: &mut Leaderboard, store: &MemoryStorage, score: u64, name: &str, t: f64) -> Option<usize> {
        lb.add_score(score, GameModeId::Endless, name, Difficulty::Normal, t, store)
    }

    #[test]
    fn ranks_and_ties() {
        let store = MemoryStorage::new();
        let mut lb = Leaderboard::load(&store);
        assert_eq!(add(&mut lb, &store, 100, "a", 1.0), Some(1));
        assert_eq!(add(&mut lb, &store, 300, "b", 2.0), Some(1));
        assert_eq!(add(&mut lb, &store, 100, "c", 3.0), Some(3));
        let names: Vec<_> = lb
            .top_for_mode(GameModeId::Endless, 10)
            .iter()
            .map(|e| e.player_name.as_str())
            .collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn only_top_ten_are_kept() {
        let store = MemoryStorage::new();
        let mut lb = Leaderboard::load(&store);
        for i in 1..=10 {
            add(&mut lb, &store, i * 10, "p", i as f64);
        }
        assert!(!lb.qualifies(10, GameModeId::Endless));
        assert_eq!(add(&mut lb, &store, 5, "low", 11.0), None);
        assert_eq!(add(&mut lb, &store, 55, "mid", 12.0), Some(6));
        let list = lb.top_for_mode(GameModeId::Endless, 50);
        assert_eq!(list.len(), 10);
        assert_eq!(list.last().map(|e| e.score), Some(20));
    }

    #[test]
    fn blank_name_is_anonymous() {
        let store = MemoryStorage::new();
        let mut lb = Leaderboard::load(&store);
        add(&mut lb, &store, 10, "   ", 0.0);
        assert_eq!(lb.top(1)[0].player_name, ANONYMOUS);
    }

    #[test]
    fn modes_are_separate_but_top_merges() {
        let store = MemoryStorage::new();
        let mut lb = Leaderboard::load(&store);
        lb.add_score(50, GameModeId::Zen, "z", Difficulty::Easy, 0.0, &store);
        lb.add_score(70, GameModeId::Endless, "e", Difficulty::Hard, 0.0, &store);
        assert_eq!(lb.top_for_mode(GameModeId::TimeTrial, 10).len(), 0);
        let top: Vec<_> = lb.top(10).into_iter().map(|e| e.score).collect();
        assert_eq!(top, vec![70, 50]);
        assert_eq!(lb.top_for_difficulty(Difficulty::Easy, 5).len(), 1);
        lb.clear_mode(GameModeId::Zen, &store);
        assert_eq!(lb.top(10).len(), 1);
    }

    #[test]
    fn legacy_array_loads_as_endless() {
        let store = MemoryStorage::new();
        store
            .set_item(
                "lanedash.leaderboard",
                r#"[{"score":40,"playerName":"old","gameMode":"endless","timestamp":5},{"score":90,"playerName":"older"}]"#,
            )
            .unwrap();
        let lb = Leaderboard::load(&store);
        let list = lb.top_for_mode(GameModeId::Endless, 10);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].player_name, "older");
        assert_eq!(list[1].timestamp_ms, 5.0);
    }

    #[test]
    fn persists_across_loads() {
        let store = MemoryStorage::new();
        let mut lb = Leaderboard::load(&store);
        lb.add_score(12, GameModeId::TimeTrial, "t", Difficulty::Normal, 0.0, &store);
        let lb = Leaderboard::load(&store);
        assert_eq!(lb.top_for_mode(GameModeId::TimeTrial, 10)[0].score, 12);
    }

    #[test]
    fn formats_thousands() {
        assert_eq!(format_score(0), "0");
        assert_eq!(format_score(999), "999");
        assert_eq!(format_score(1000), "1,000");
        assert_eq!(format_score(1234567), "1,234,567");
    }
}
