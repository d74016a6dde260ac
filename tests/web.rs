// Browser-only checks; run with `wasm-pack test --headless --firefox`.
#![cfg(target_arch = "wasm32")]

use lane_dash::storage::{self, BrowserStorage, KeyValueStore};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn local_storage_round_trip() {
    let store = BrowserStorage::open().expect("localStorage");
    storage::save_json(&store, "web-test", &vec![1u32, 2, 3]).expect("save");
    let back: Option<Vec<u32>> = storage::load_json(&store, "web-test").expect("load");
    assert_eq!(back, Some(vec![1, 2, 3]));
    store.remove_item(&storage::storage_key("web-test")).expect("remove");
    assert!(store.get_item("lanedash.web-test").expect("get").is_none());
}

#[wasm_bindgen_test]
fn canvas_2d_context_available() {
    let document = web_sys::window().expect("no window").document().expect("no document");
    let canvas = document
        .create_element("canvas")
        .expect("create canvas")
        .dyn_into::<HtmlCanvasElement>()
        .expect("canvas element");
    let ctx = canvas
        .get_context("2d")
        .expect("get context")
        .expect("2d context")
        .dyn_into::<CanvasRenderingContext2d>()
        .expect("cast 2d");
    ctx.set_fill_style_str("#3a3a3a");
    ctx.fill_rect(0.0, 0.0, 10.0, 10.0);
}

#[wasm_bindgen_test]
fn start_game_builds_canvas_and_hud() {
    lane_dash::start_game().expect("start");
    let document = web_sys::window().expect("no window").document().expect("no document");
    assert!(document.get_element_by_id("ld-canvas").is_some());
    assert!(document.get_element_by_id("ld-score").is_some());
    assert!(lane_dash::app::select_mode("zen"));
    assert!(!lane_dash::app::select_mode("warp"));
    let board = lane_dash::app::leaderboard_json("zen").expect("json");
    assert!(board.starts_with('['));
}

#[wasm_bindgen_test]
fn logging_init_tolerates_repeat_calls() {
    lane_dash::logging::init(log::LevelFilter::Debug);
    lane_dash::logging::init(log::LevelFilter::Warn);
    assert_eq!(log::max_level(), log::LevelFilter::Warn);
}

#[wasm_bindgen_test]
fn page_controls_and_settings_exports() {
    lane_dash::start_game().expect("start");
    let document = web_sys::window().expect("no window").document().expect("no document");
    for id in ["ld-touch-left", "ld-touch-right", "ld-touch-pause"] {
        assert!(document.get_element_by_id(id).is_some(), "{id}");
    }
    assert!(!lane_dash::app::quit_game());
    assert!(lane_dash::app::set_color_blind_mode("protanopia"));
    assert!(!lane_dash::app::set_color_blind_mode("sepia"));
    lane_dash::app::set_high_contrast(true);
    let body = document.body().expect("body");
    assert!(body.class_list().contains("high-contrast"));
    assert!(body.class_list().contains("protanopia"));
    lane_dash::app::set_high_contrast(false);
    lane_dash::app::set_color_blind_mode("normal");
    assert!(!body.class_list().contains("high-contrast"));
}
