//! Bridge to the host's reflected settings menu.
//!
//! The in-game menu is an externally-owned reflected list; the only
//! contract is that each entry carries an integer identifier and a payload
//! matching one of slider/stepper/checkbox. Everything layout-specific
//! stays on the host side; this module exposes lookup-by-id plus a clamped
//! apply against the same `Setting` surface the rest of the core uses.

use std::sync::Arc;

use crate::setting::Setting;
use crate::settings::Settings;

/// Stable identifiers for the reflected menu entries.
pub mod ids {
    pub const DISPLAY_MODE: i32 = 1;
    pub const PEAK_BRIGHTNESS: i32 = 2;
    pub const GAME_PAPER_WHITE: i32 = 3;
    pub const UI_PAPER_WHITE: i32 = 4;
    pub const EXTEND_GAMUT: i32 = 5;
    pub const AUTO_HDR_VIDEOS: i32 = 6;
    pub const SECONDARY_BRIGHTNESS: i32 = 7;
    pub const TONE_MAPPER_TYPE: i32 = 8;
    pub const SATURATION: i32 = 9;
    pub const CONTRAST: i32 = 10;
    pub const HIGHLIGHTS: i32 = 11;
    pub const SHADOWS: i32 = 12;
    pub const BLOOM: i32 = 13;
    pub const COLOR_GRADING_STRENGTH: i32 = 14;
    pub const LUT_CORRECTION_STRENGTH: i32 = 15;
    pub const VANILLA_MENU_LUTS: i32 = 16;
    pub const STRICT_LUT_APPLICATION: i32 = 17;
    pub const GAMMA_CORRECTION_STRENGTH: i32 = 18;
    pub const FILM_GRAIN_TYPE: i32 = 19;
    pub const FILM_GRAIN_FPS_LIMIT: i32 = 20;
    pub const POST_SHARPEN: i32 = 21;
    pub const HDR_SCREENSHOTS: i32 = 22;
    pub const HDR_SCREENSHOTS_LOSSLESS: i32 = 23;
    pub const FORCE_SDR_ON_HDR: i32 = 24;
    pub const ENFORCE_USER_DISPLAY_MODE: i32 = 25;
    pub const DEV_SETTING_01: i32 = 26;
    pub const DEV_SETTING_02: i32 = 27;
    pub const DEV_SETTING_03: i32 = 28;
    pub const DEV_SETTING_04: i32 = 29;
    pub const DEV_SETTING_05: i32 = 30;
}

/// Value payload coming back from a reflected menu entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MenuValue {
    Slider(f32),
    Stepper(i32),
    Checkbox(bool),
}

enum Control {
    Slider {
        setting: Arc<Setting<f32>>,
        min: f32,
        max: f32,
    },
    Stepper {
        setting: Arc<Setting<i32>>,
        min: i32,
        max: i32,
    },
    Checkbox {
        setting: Arc<Setting<bool>>,
    },
}

pub struct BridgeEntry {
    id: i32,
    label: &'static str,
    /// Changing this entry can change the resolver's output; the runtime
    /// must re-synchronize the swap-chain format afterwards.
    affects_display_mode: bool,
    control: Control,
}

impl BridgeEntry {
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn affects_display_mode(&self) -> bool {
        self.affects_display_mode
    }

    pub fn is_default(&self) -> bool {
        match &self.control {
            Control::Slider { setting, .. } => setting.is_default(),
            Control::Stepper { setting, .. } => setting.is_default(),
            Control::Checkbox { setting } => setting.is_default(),
        }
    }

    pub fn reset(&self) -> bool {
        let changed = !self.is_default();
        match &self.control {
            Control::Slider { setting, .. } => setting.reset(),
            Control::Stepper { setting, .. } => setting.reset(),
            Control::Checkbox { setting } => setting.reset(),
        }
        changed
    }

    pub fn current(&self) -> MenuValue {
        match &self.control {
            Control::Slider { setting, .. } => MenuValue::Slider(setting.get()),
            Control::Stepper { setting, .. } => MenuValue::Stepper(setting.get()),
            Control::Checkbox { setting } => MenuValue::Checkbox(setting.get()),
        }
    }
}

/// Result of applying a menu payload.
#[derive(Debug, Clone, Copy)]
pub struct Applied {
    pub changed: bool,
    pub affects_display_mode: bool,
}

pub struct MenuBridge {
    entries: Vec<BridgeEntry>,
}

impl MenuBridge {
    pub fn new(settings: &Settings) -> Self {
        let mut entries = Vec::new();

        let mut slider =
            |id: i32, label: &'static str, setting: &Arc<Setting<f32>>, min: f32, max: f32| {
                entries.push(BridgeEntry {
                    id,
                    label,
                    affects_display_mode: false,
                    control: Control::Slider {
                        setting: setting.clone(),
                        min,
                        max,
                    },
                });
            };

        slider(ids::EXTEND_GAMUT, "Extend Gamut", &settings.extend_gamut, 0.0, 100.0);
        slider(
            ids::SECONDARY_BRIGHTNESS,
            "Brightness",
            &settings.secondary_brightness,
            0.0,
            100.0,
        );
        slider(ids::SATURATION, "Saturation", &settings.saturation, 0.0, 100.0);
        slider(ids::CONTRAST, "Contrast", &settings.contrast, 0.0, 100.0);
        slider(ids::HIGHLIGHTS, "Highlights", &settings.highlights, 0.0, 100.0);
        slider(ids::SHADOWS, "Shadows", &settings.shadows, 0.0, 100.0);
        slider(ids::BLOOM, "Bloom", &settings.bloom, 0.0, 100.0);
        slider(
            ids::COLOR_GRADING_STRENGTH,
            "Color Grading Strength",
            &settings.color_grading_strength,
            0.0,
            100.0,
        );
        slider(
            ids::LUT_CORRECTION_STRENGTH,
            "LUT Correction Strength",
            &settings.lut_correction_strength,
            0.0,
            100.0,
        );
        slider(
            ids::GAMMA_CORRECTION_STRENGTH,
            "Gamma Correction Strength",
            &settings.gamma_correction_strength,
            0.0,
            100.0,
        );
        slider(
            ids::FILM_GRAIN_FPS_LIMIT,
            "Film Grain FPS Limit",
            &settings.film_grain_fps_limit,
            12.0,
            120.0,
        );

        if cfg!(feature = "development") {
            for (index, (id, label)) in [
                (ids::DEV_SETTING_01, "Dev Setting 01"),
                (ids::DEV_SETTING_02, "Dev Setting 02"),
                (ids::DEV_SETTING_03, "Dev Setting 03"),
                (ids::DEV_SETTING_04, "Dev Setting 04"),
                (ids::DEV_SETTING_05, "Dev Setting 05"),
            ]
            .into_iter()
            .enumerate()
            {
                slider(id, label, &settings.dev_settings[index], 0.0, 100.0);
            }
        }

        let mut stepper =
            |id: i32, label: &'static str, setting: &Arc<Setting<i32>>, min: i32, max: i32, affects: bool| {
                entries.push(BridgeEntry {
                    id,
                    label,
                    affects_display_mode: affects,
                    control: Control::Stepper {
                        setting: setting.clone(),
                        min,
                        max,
                    },
                });
            };

        stepper(ids::DISPLAY_MODE, "Display Mode", &settings.display_mode, 0, 2, true);
        stepper(
            ids::PEAK_BRIGHTNESS,
            "Peak Brightness",
            &settings.peak_brightness,
            80,
            10000,
            false,
        );
        stepper(
            ids::GAME_PAPER_WHITE,
            "Game Paper White",
            &settings.game_paper_white,
            80,
            500,
            false,
        );
        stepper(
            ids::UI_PAPER_WHITE,
            "UI Paper White",
            &settings.ui_paper_white,
            80,
            500,
            false,
        );
        stepper(
            ids::TONE_MAPPER_TYPE,
            "Tone Mapper",
            &settings.tone_mapper_type,
            0,
            2,
            false,
        );
        stepper(
            ids::FILM_GRAIN_TYPE,
            "Film Grain Type",
            &settings.film_grain_type,
            0,
            1,
            false,
        );

        let mut checkbox =
            |id: i32, label: &'static str, setting: &Arc<Setting<bool>>, affects: bool| {
                entries.push(BridgeEntry {
                    id,
                    label,
                    affects_display_mode: affects,
                    control: Control::Checkbox {
                        setting: setting.clone(),
                    },
                });
            };

        checkbox(ids::AUTO_HDR_VIDEOS, "Auto HDR Videos", &settings.auto_hdr_videos, false);
        checkbox(
            ids::VANILLA_MENU_LUTS,
            "Vanilla Menu LUTs",
            &settings.vanilla_menu_luts,
            false,
        );
        checkbox(
            ids::STRICT_LUT_APPLICATION,
            "Strict LUT Application",
            &settings.strict_lut_application,
            false,
        );
        checkbox(ids::POST_SHARPEN, "Post Sharpen", &settings.post_sharpen, false);
        checkbox(
            ids::HDR_SCREENSHOTS,
            "HDR Screenshots",
            &settings.hdr_screenshots,
            false,
        );
        checkbox(
            ids::HDR_SCREENSHOTS_LOSSLESS,
            "Lossless HDR Screenshots",
            &settings.hdr_screenshots_lossless,
            false,
        );

        if cfg!(feature = "development") {
            checkbox(
                ids::FORCE_SDR_ON_HDR,
                "Force SDR on HDR",
                &settings.force_sdr_on_hdr,
                true,
            );
            checkbox(
                ids::ENFORCE_USER_DISPLAY_MODE,
                "Enforce User Display Mode",
                &settings.enforce_user_display_mode,
                true,
            );
        }

        Self { entries }
    }

    pub fn find_by_id(&self, id: i32) -> Option<&BridgeEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Clamp and write a payload into the entry's setting. Returns `None`
    /// when the payload kind does not match the control.
    pub fn apply(&self, entry: &BridgeEntry, value: MenuValue) -> Option<Applied> {
        let changed = match (&entry.control, value) {
            (Control::Slider { setting, min, max }, MenuValue::Slider(v)) => {
                let clamped = v.clamp(*min, *max);
                let changed = setting.get() != clamped;
                setting.set(clamped);
                changed
            }
            (Control::Stepper { setting, min, max }, MenuValue::Stepper(v)) => {
                let clamped = v.clamp(*min, *max);
                let changed = setting.get() != clamped;
                setting.set(clamped);
                changed
            }
            (Control::Checkbox { setting }, MenuValue::Checkbox(v)) => {
                let changed = setting.get() != v;
                setting.set(v);
                changed
            }
            _ => return None,
        };

        Some(Applied {
            changed,
            affects_display_mode: entry.affects_display_mode,
        })
    }
}
