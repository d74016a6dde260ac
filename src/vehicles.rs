use crate::storage::{self, KeyValueStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const STORAGE_NAME: &str = "vehicles";
pub const DEFAULT_VEHICLE: &str = "sedan";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct VehicleStats {
    pub speed: u8,
    pub handling: u8,
    pub size: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Vehicle {
    pub id: &'static str,
    pub name: &'static str,
    pub stats: VehicleStats,
    pub color: &'static str,
    /// Best single-game score needed to unlock. Zero means always available.
    pub unlock_score: u64,
}

pub static VEHICLES: [Vehicle; 4] = [
    Vehicle {
        id: "sedan",
        name: "Sedan",
        stats: VehicleStats { speed: 5, handling: 5, size: 5 },
        color: "#4d79ff",
        unlock_score: 0,
    },
    Vehicle {
        id: "sports",
        name: "Sports Car",
        stats: VehicleStats { speed: 8, handling: 7, size: 3 },
        color: "#ff4d4d",
        unlock_score: 100,
    },
    Vehicle {
        id: "truck",
        name: "Truck",
        stats: VehicleStats { speed: 3, handling: 3, size: 8 },
        color: "#8B4513",
        unlock_score: 200,
    },
    Vehicle {
        id: "motorcycle",
        name: "Motorcycle",
        stats: VehicleStats { speed: 9, handling: 9, size: 2 },
        color: "#666666",
        unlock_score: 300,
    },
];

pub fn find(id: &str) -> Option<&'static Vehicle> {
    VEHICLES.iter().find(|v| v.id == id)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct VehicleData {
    current: String,
    unlocked: BTreeSet<String>,
    best_scores: BTreeMap<String, u64>,
}

impl Default for VehicleData {
    fn default() -> Self {
        Self {
            current: DEFAULT_VEHICLE.to_string(),
            unlocked: BTreeSet::from([DEFAULT_VEHICLE.to_string()]),
            best_scores: BTreeMap::new(),
        }
    }
}

/// Row returned by [`VehicleManager::all`] for the selection screen.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleEntry {
    pub vehicle: &'static Vehicle,
    pub unlocked: bool,
    pub current: bool,
    pub best_score: u64,
}

pub struct VehicleManager {
    data: VehicleData,
}

impl VehicleManager {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let mut data: VehicleData = storage::load_or_default(store, STORAGE_NAME);
        data.unlocked.insert(DEFAULT_VEHICLE.to_string());
        if find(&data.current).is_none() || !data.unlocked.contains(&data.current) {
            data.current = DEFAULT_VEHICLE.to_string();
        }
        Self { data }
    }

    fn save(&self, store: &dyn KeyValueStore) {
        storage::save_or_warn(store, STORAGE_NAME, &self.data);
    }

    pub fn current(&self) -> &'static Vehicle {
        find(&self.data.current).unwrap_or(&VEHICLES[0])
    }

    pub fn is_unlocked(&self, id: &str) -> bool {
        self.data.unlocked.contains(id)
    }

    /// Switch vehicle. Locked or unknown ids are refused.
    pub fn select(&mut self, id: &str, store: &dyn KeyValueStore) -> bool {
        if find(id).is_none() || !self.is_unlocked(id) {
            return false;
        }
        self.data.current = id.to_string();
        self.save(store);
        true
    }

    pub fn unlock(&mut self, id: &str, store: &dyn KeyValueStore) -> bool {
        if find(id).is_none() || !self.data.unlocked.insert(id.to_string()) {
            return false;
        }
        log::info!("vehicle unlocked: {id}");
        self.save(store);
        true
    }

    /// Unlock every vehicle whose threshold `score` reaches. Returns the ids
    /// that were newly unlocked.
    pub fn check_unlocks(&mut self, score: u64, store: &dyn KeyValueStore) -> Vec<&'static str> {
        let mut fresh = Vec::new();
        for v in VEHICLES.iter().filter(|v| v.unlock_score > 0 && score >= v.unlock_score) {
            if self.data.unlocked.insert(v.id.to_string()) {
                log::info!("vehicle unlocked: {}", v.id);
                fresh.push(v.id);
            }
        }
        if !fresh.is_empty() {
            self.save(store);
        }
        fresh
    }

    /// Keep the best score per vehicle. Returns true on a new personal best.
    pub fn record_score(&mut self, id: &str, score: u64, store: &dyn KeyValueStore) -> bool {
        if find(id).is_none() {
            return false;
        }
        let best = self.data.best_scores.entry(id.to_string()).or_insert(0);
        if score <= *best {
            return false;
        }
        *best = score;
        self.save(store);
        true
    }

    pub fn best_score(&self, id: &str) -> u64 {
        self.data.best_scores.get(id).copied().unwrap_or(0)
    }

    pub fn all(&self) -> Vec<VehicleEntry> {
        VEHICLES
            .iter()
            .map(|v| VehicleEntry {
                vehicle: v,
                unlocked: self.is_unlocked(v.id),
                current: v.id == self.data.current,
                best_score: self.best_score(v.id),
            })
            .collect()
    }

    pub fn reset(&mut self, store: &dyn KeyValueStore) {
        self.data = VehicleData::default();
        self.save(store);
    }
}
