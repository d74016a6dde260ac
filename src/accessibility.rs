use crate::storage::{self, KeyValueStore};
use serde::{Deserialize, Serialize};

const STORAGE_NAME: &str = "accessibility";
pub const REDUCED_MOTION_PARTICLES: usize = 50;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
    Insane,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] =
        [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard, Difficulty::Insane];

    pub fn key(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
            Difficulty::Insane => "insane",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.key() == key)
    }

    /// Scales the speed of spawned traffic.
    pub fn speed_multiplier(self) -> f64 {
        match self {
            Difficulty::Easy => 0.8,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.2,
            Difficulty::Insane => 1.5,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColorBlindMode {
    #[default]
    Normal,
    Protanopia,
    Deuteranopia,
    Tritanopia,
}

/// Named colors used by the HUD and power-up art, remapped per color-blind mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub red: &'static str,
    pub green: &'static str,
    pub blue: &'static str,
    pub yellow: &'static str,
    pub orange: &'static str,
    pub purple: &'static str,
    pub cyan: &'static str,
}

const BASE: Palette = Palette {
    red: "#ff4d4d",
    green: "#4dff4d",
    blue: "#4d79ff",
    yellow: "#ffcc33",
    orange: "#ff9900",
    purple: "#9900ff",
    cyan: "#00ffff",
};

impl ColorBlindMode {
    pub const ALL: [ColorBlindMode; 4] = [
        ColorBlindMode::Normal,
        ColorBlindMode::Protanopia,
        ColorBlindMode::Deuteranopia,
        ColorBlindMode::Tritanopia,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ColorBlindMode::Normal => "normal",
            ColorBlindMode::Protanopia => "protanopia",
            ColorBlindMode::Deuteranopia => "deuteranopia",
            ColorBlindMode::Tritanopia => "tritanopia",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.key() == key)
    }

    pub fn palette(self) -> Palette {
        match self {
            ColorBlindMode::Normal => BASE,
            ColorBlindMode::Protanopia => Palette {
                red: "#0080ff",
                green: "#ffcc00",
                orange: "#ffcc00",
                purple: "#4d79ff",
                ..BASE
            },
            ColorBlindMode::Deuteranopia => Palette {
                red: "#800080",
                green: "#ffff00",
                orange: "#ffff00",
                purple: "#800080",
                ..BASE
            },
            ColorBlindMode::Tritanopia => Palette {
                red: "#008080",
                green: "#ffcc00",
                orange: "#ffcc00",
                purple: "#008080",
                ..BASE
            },
        }
    }

    fn css_class(self) -> Option<&'static str> {
        match self {
            ColorBlindMode::Normal => None,
            other => Some(other.key()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccessibilitySettings {
    pub high_contrast: bool,
    pub reduced_motion: bool,
    pub large_text: bool,
    pub color_blind_mode: ColorBlindMode,
    pub difficulty: Difficulty,
}

impl AccessibilitySettings {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        storage::load_or_default(store, STORAGE_NAME)
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> bool {
        storage::save_or_warn(store, STORAGE_NAME, self)
    }

    pub fn speed_multiplier(&self) -> f64 {
        self.difficulty.speed_multiplier()
    }

    pub fn max_particles(&self) -> usize {
        if self.reduced_motion {
            REDUCED_MOTION_PARTICLES
        } else {
            crate::game::particles::DEFAULT_MAX_PARTICLES
        }
    }

    pub fn palette(&self) -> Palette {
        self.color_blind_mode.palette()
    }

    /// Toggle the body classes the stylesheet keys off.
    pub fn apply(&self) -> Result<(), wasm_bindgen::JsValue> {
        let body = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.body())
            .ok_or_else(|| wasm_bindgen::JsValue::from_str("no document body"))?;
        let classes = body.class_list();
        classes.toggle_with_force("high-contrast", self.high_contrast)?;
        classes.toggle_with_force("reduced-motion", self.reduced_motion)?;
        classes.toggle_with_force("large-text", self.large_text)?;
        for mode in [ColorBlindMode::Protanopia, ColorBlindMode::Deuteranopia, ColorBlindMode::Tritanopia] {
            if let Some(class) = mode.css_class() {
                classes.toggle_with_force(class, mode == self.color_blind_mode)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn difficulty_multipliers() {
        let m: Vec<f64> = Difficulty::ALL.iter().map(|d| d.speed_multiplier()).collect();
        assert_eq!(m, vec![0.8, 1.0, 1.2, 1.5]);
        assert_eq!(Difficulty::from_key("insane"), Some(Difficulty::Insane));
    }

    #[test]
    fn reduced_motion_caps_particles() {
        let mut s = AccessibilitySettings::default();
        assert_eq!(s.max_particles(), 200);
        s.reduced_motion = true;
        assert_eq!(s.max_particles(), 50);
    }

    #[test]
    fn palettes_remap_red_and_green() {
        let p = ColorBlindMode::Protanopia.palette();
        assert_eq!(p.red, "#0080ff");
        assert_eq!(p.blue, BASE.blue);
        assert_eq!(ColorBlindMode::Normal.palette(), BASE);
        assert_eq!(ColorBlindMode::from_key("deuteranopia"), Some(ColorBlindMode::Deuteranopia));
        assert_eq!(ColorBlindMode::from_key("sepia"), None);
    }

    #[test]
    fn settings_persist_and_tolerate_partial_blobs() {
        let store = MemoryStorage::new();
        let s = AccessibilitySettings {
            reduced_motion: true,
            difficulty: Difficulty::Hard,
            ..Default::default()
        };
        assert!(s.save(&store));
        assert_eq!(AccessibilitySettings::load(&store), s);

        store.set_item("lanedash.accessibility", r#"{"largeText":true}"#).unwrap();
        let partial = AccessibilitySettings::load(&store);
        assert!(partial.large_text);
        assert_eq!(partial.difficulty, Difficulty::Normal);
    }
}
