use crate::rng::Rng;
use crate::storage::{self, KeyValueStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::f64::consts::TAU;

const STORAGE_NAME: &str = "environments";
const STAR_COUNT: usize = 30;
const MAX_FOG_PATCHES: usize = 5;
const RAIN_CHANCE: f64 = 0.3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Weather {
    Stars,
    Rain,
    Fog,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub id: &'static str,
    pub name: &'static str,
    pub road_color: &'static str,
    pub lane_color: &'static str,
    pub bg_color: &'static str,
    pub sky_color: &'static str,
    pub weather: Option<Weather>,
    /// Best score needed to unlock.
    pub unlock_score: u64,
}

pub static ENVIRONMENTS: [Environment; 6] = [
    Environment {
        id: "day",
        name: "Day - Clear",
        road_color: "#3a3a3a",
        lane_color: "#ffffff",
        bg_color: "#87CEEB",
        sky_color: "#87CEEB",
        weather: None,
        unlock_score: 0,
    },
    Environment {
        id: "night",
        name: "Night",
        road_color: "#2a2a2a",
        lane_color: "#ffff99",
        bg_color: "#0a0a2a",
        sky_color: "#000033",
        weather: Some(Weather::Stars),
        unlock_score: 150,
    },
    Environment {
        id: "rain",
        name: "Rain",
        road_color: "#4a4a4a",
        lane_color: "#ffffff",
        bg_color: "#606080",
        sky_color: "#606080",
        weather: Some(Weather::Rain),
        unlock_score: 300,
    },
    Environment {
        id: "fog",
        name: "Fog",
        road_color: "#4a4a4a",
        lane_color: "#cccccc",
        bg_color: "#d0d0d0",
        sky_color: "#d0d0d0",
        weather: Some(Weather::Fog),
        unlock_score: 500,
    },
    Environment {
        id: "sunset",
        name: "Sunset",
        road_color: "#5a3a3a",
        lane_color: "#ffffff",
        bg_color: "#ff9666",
        sky_color: "#ff9666",
        weather: None,
        unlock_score: 800,
    },
    Environment {
        id: "desert",
        name: "Desert",
        road_color: "#c2b280",
        lane_color: "#ffffff",
        bg_color: "#ffd89b",
        sky_color: "#ffd89b",
        weather: None,
        unlock_score: 1200,
    },
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WeatherParticle {
    Drop { x: f64, y: f64, length: f64, speed: f64, opacity: f64 },
    Star { x: f64, y: f64, size: f64, twinkle: f64 },
    Fog { x: f64, y: f64, radius: f64, speed: f64, opacity: f64 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EnvironmentData {
    current: usize,
    unlocked: BTreeSet<usize>,
}

impl Default for EnvironmentData {
    fn default() -> Self {
        Self { current: 0, unlocked: BTreeSet::from([0]) }
    }
}

pub struct EnvironmentManager {
    data: EnvironmentData,
    pub weather: Vec<WeatherParticle>,
}

impl EnvironmentManager {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let mut data: EnvironmentData = storage::load_or_default(store, STORAGE_NAME);
        data.unlocked.retain(|&i| i < ENVIRONMENTS.len());
        data.unlocked.insert(0);
        if !data.unlocked.contains(&data.current) {
            data.current = 0;
        }
        Self { data, weather: Vec::new() }
    }

    fn save(&self, store: &dyn KeyValueStore) {
        storage::save_or_warn(store, STORAGE_NAME, &self.data);
    }

    pub fn current(&self) -> &'static Environment {
        ENVIRONMENTS.get(self.data.current).unwrap_or(&ENVIRONMENTS[0])
    }

    pub fn current_index(&self) -> usize {
        self.data.current
    }

    pub fn is_unlocked(&self, index: usize) -> bool {
        self.data.unlocked.contains(&index)
    }

    pub fn set(&mut self, index: usize, store: &dyn KeyValueStore) -> bool {
        if !self.is_unlocked(index) {
            return false;
        }
        if index != self.data.current {
            self.data.current = index;
            self.weather.clear();
            self.save(store);
        }
        true
    }

    /// Cycle to the next unlocked environment.
    pub fn next(&mut self, store: &dyn KeyValueStore) -> usize {
        let n = ENVIRONMENTS.len();
        let next = (1..=n)
            .map(|step| (self.data.current + step) % n)
            .find(|i| self.is_unlocked(*i))
            .unwrap_or(0);
        self.set(next, store);
        next
    }

    pub fn unlock(&mut self, index: usize, store: &dyn KeyValueStore) -> bool {
        if index >= ENVIRONMENTS.len() || !self.data.unlocked.insert(index) {
            return false;
        }
        self.save(store);
        true
    }

    /// Unlock every environment whose threshold `best_score` reaches and
    /// return the newly unlocked ones.
    pub fn check_unlocks(&mut self, best_score: u64, store: &dyn KeyValueStore) -> Vec<&'static Environment> {
        let fresh: Vec<&'static Environment> = ENVIRONMENTS
            .iter()
            .enumerate()
            .filter(|(i, e)| best_score >= e.unlock_score && self.data.unlocked.insert(*i))
            .map(|(_, e)| e)
            .collect();
        for e in &fresh {
            log::info!("environment unlocked: {}", e.name);
        }
        if !fresh.is_empty() {
            self.save(store);
        }
        fresh
    }

    pub fn unlocked_count(&self) -> usize {
        self.data.unlocked.len()
    }

    /// Advance the weather of the current environment.
    pub fn update(&mut self, frames: f64, width: f64, height: f64, rng: &mut Rng) {
        match self.current().weather {
            None => self.weather.clear(),
            Some(Weather::Rain) => {
                if rng.chance((RAIN_CHANCE * frames).min(1.0)) {
                    self.weather.push(WeatherParticle::Drop {
                        x: rng.range_f64(0.0, width),
                        y: -10.0,
                        length: rng.range_f64(5.0, 15.0),
                        speed: rng.range_f64(10.0, 15.0),
                        opacity: rng.range_f64(0.3, 0.8),
                    });
                }
                self.weather.retain_mut(|p| match p {
                    WeatherParticle::Drop { y, speed, .. } => {
                        *y += *speed * frames;
                        *y <= height
                    }
                    _ => false,
                });
            }
            Some(Weather::Stars) => {
                if self.weather.is_empty() {
                    for _ in 0..STAR_COUNT {
                        self.weather.push(WeatherParticle::Star {
                            x: rng.range_f64(0.0, width),
                            y: rng.range_f64(0.0, height / 2.0),
                            size: rng.range_f64(1.0, 3.0),
                            twinkle: rng.range_f64(0.0, TAU),
                        });
                    }
                }
                for p in &mut self.weather {
                    if let WeatherParticle::Star { twinkle, .. } = p {
                        *twinkle += 0.05 * frames;
                    }
                }
            }
            Some(Weather::Fog) => {
                let patches = self.weather.iter().filter(|p| matches!(p, WeatherParticle::Fog { .. })).count();
                if patches < MAX_FOG_PATCHES {
                    self.weather.push(WeatherParticle::Fog {
                        x: rng.range_f64(0.0, width),
                        y: rng.range_f64(0.0, height),
                        radius: rng.range_f64(30.0, 80.0),
                        speed: rng.range_f64(0.2, 0.7),
                        opacity: rng.range_f64(0.1, 0.3),
                    });
                }
                self.weather.retain_mut(|p| match p {
                    WeatherParticle::Fog { x, radius, speed, .. } => {
                        *x += *speed * frames;
                        *x <= width + *radius
                    }
                    _ => false,
                });
            }
        }
    }

    pub fn reset(&mut self, store: &dyn KeyValueStore) {
        self.data = EnvironmentData::default();
        self.weather.clear();
        self.save(store);
    }
}
