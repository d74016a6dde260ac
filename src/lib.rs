//! Lane Dash core crate.
//!
//! An endless lane dodger rendered to a 2D canvas. The rules (`game`) and the
//! persisted progression (`profile` and the managers it bundles) are plain
//! Rust and run natively under `cargo test`; `app` and `render` are the thin
//! browser shell started from `start_game()`.

use wasm_bindgen::prelude::*;

pub mod accessibility;
pub mod achievements;
pub mod app;
pub mod config;
pub mod environments;
pub mod game;
pub mod geom;
pub mod leaderboard;
pub mod logging;
pub mod offline;
pub mod perf;
pub mod profile;
pub mod render;
pub mod rng;
pub mod sound;
pub mod storage;
pub mod touch;
pub mod vehicles;

pub use app::{start_game, start_game_with_config};
pub use config::GameConfig;
pub use game::{GameEvent, GameState, GameSummary, Session};
pub use profile::{GameOutcome, Profile};

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}
