//! Console logging through `console_log`.

use log::{Level, LevelFilter};

/// Install the console logger. Safe to call more than once; later calls only
/// adjust the level.
pub fn init(filter: LevelFilter) {
    let level = filter.to_level().unwrap_or(Level::Error);
    if console_log::init_with_level(level).is_err() {
        log::debug!("logger already installed");
    }
    log::set_max_level(filter);
}
