//! The settings registry and its persistence coordinator.
//!
//! `Settings` owns the `ConfigStore` exclusively. Binding happens exactly
//! once per process through `initialize`; `reload` re-reads values and
//! `save` serializes them. Everything else in the crate only ever borrows
//! individual settings read-only.

use parking_lot::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::display::{self, FrameGenPolicy, FrameGenTech, ResolveInputs, ResolvedDisplayMode};
use crate::setting::{ListSetting, Setting};
use crate::store::ConfigStore;
use crate::{log_error, log_info, log_warn};

/// Render targets whose formats follow the resolved display mode. The
/// second list is opt-in; some drivers misbehave with those upgraded.
const DEFAULT_UPGRADE_TARGETS: &[&str] = &[
    "SceneColor",
    "PostProcessColor",
    "UIComposite",
    "SceneColorHalfRes",
    "BloomChain",
    "TAAHistoryColor",
    "LUTOutput",
    "EnvironmentBRDF",
];

const DEFAULT_EXTRA_UPGRADE_TARGETS: &[&str] = &["NativeResColor0", "NativeResColor1"];

pub struct Settings {
    // HDR
    pub display_mode: Arc<Setting<i32>>,
    pub enforce_user_display_mode: Arc<Setting<bool>>,
    pub force_sdr_on_hdr: Arc<Setting<bool>>,
    pub peak_brightness: Arc<Setting<i32>>,
    pub game_paper_white: Arc<Setting<i32>>,
    pub ui_paper_white: Arc<Setting<i32>>,
    pub extend_gamut: Arc<Setting<f32>>,
    pub auto_hdr_videos: Arc<Setting<bool>>,

    // SDR
    pub secondary_brightness: Arc<Setting<f32>>,

    // Tone mapper
    pub tone_mapper_type: Arc<Setting<i32>>,
    pub saturation: Arc<Setting<f32>>,
    pub contrast: Arc<Setting<f32>>,
    pub highlights: Arc<Setting<f32>>,
    pub shadows: Arc<Setting<f32>>,
    pub bloom: Arc<Setting<f32>>,

    // Color grading
    pub color_grading_strength: Arc<Setting<f32>>,
    pub lut_correction_strength: Arc<Setting<f32>>,
    pub vanilla_menu_luts: Arc<Setting<bool>>,
    pub strict_lut_application: Arc<Setting<bool>>,

    // Misc
    pub gamma_correction_strength: Arc<Setting<f32>>,
    pub film_grain_type: Arc<Setting<i32>>,
    pub film_grain_fps_limit: Arc<Setting<f32>>,
    pub post_sharpen: Arc<Setting<bool>>,
    pub hdr_screenshots: Arc<Setting<bool>>,
    pub hdr_screenshots_lossless: Arc<Setting<bool>>,
    pub frame_gen_interop: Arc<Setting<bool>>,
    pub dev_settings: [Arc<Setting<f32>>; 5],

    // Render-target upgrades
    pub render_targets_to_upgrade: Arc<ListSetting>,
    pub extra_render_targets_to_upgrade: Arc<ListSetting>,
    pub upgrade_extra_render_targets: Arc<Setting<bool>>,
    pub peak_brightness_auto_detected: Arc<Setting<bool>>,

    // Transient per-session state, never persisted.
    hdr_screenshot_requested: AtomicBool,
    sdr_screenshot_requested: AtomicBool,
    // The only field with a hard atomic requirement: written by the render
    // thread at frame end, read by the constant builder from any thread.
    end_of_frame: AtomicBool,
    interop_shim_present: AtomicBool,

    policy: FrameGenPolicy,
    store: ConfigStore,
    bind_once: Once,
    initialized: AtomicBool,
}

impl Settings {
    pub fn new(store: ConfigStore, policy: FrameGenPolicy) -> Self {
        Self {
            display_mode: Arc::new(Setting::new("DisplayMode", 0)),
            enforce_user_display_mode: Arc::new(Setting::new("EnforceUserDisplayMode", false)),
            force_sdr_on_hdr: Arc::new(Setting::new("ForceSDROnHDR", false)),
            peak_brightness: Arc::new(Setting::new("PeakBrightness", 1000)),
            game_paper_white: Arc::new(Setting::new("GamePaperWhite", 200)),
            ui_paper_white: Arc::new(Setting::new("UIPaperWhite", 200)),
            extend_gamut: Arc::new(Setting::new("ExtendGamut", 0.0)),
            auto_hdr_videos: Arc::new(Setting::new("AutoHDRVideos", true)),

            secondary_brightness: Arc::new(Setting::new("SecondaryBrightness", 50.0)),

            tone_mapper_type: Arc::new(Setting::new("ToneMapperType", 0)),
            saturation: Arc::new(Setting::new("Saturation", 50.0)),
            contrast: Arc::new(Setting::new("Contrast", 50.0)),
            highlights: Arc::new(Setting::new("Highlights", 50.0)),
            shadows: Arc::new(Setting::new("Shadows", 50.0)),
            bloom: Arc::new(Setting::new("Bloom", 50.0)),

            color_grading_strength: Arc::new(Setting::new("ColorGradingStrength", 100.0)),
            lut_correction_strength: Arc::new(Setting::new("LUTCorrectionStrength", 100.0)),
            vanilla_menu_luts: Arc::new(Setting::new("VanillaMenuLUTs", true)),
            strict_lut_application: Arc::new(Setting::new("StrictLUTApplication", true)),

            gamma_correction_strength: Arc::new(Setting::new("GammaCorrectionStrength", 100.0)),
            film_grain_type: Arc::new(Setting::new("FilmGrainType", 0)),
            film_grain_fps_limit: Arc::new(Setting::new("FilmGrainFPSLimit", 24.0)),
            post_sharpen: Arc::new(Setting::new("PostSharpen", true)),
            hdr_screenshots: Arc::new(Setting::new("HDRScreenshots", false)),
            hdr_screenshots_lossless: Arc::new(Setting::new("HDRScreenshotsLossless", false)),
            frame_gen_interop: Arc::new(Setting::new("FrameGenInterop", false)),
            dev_settings: [
                Arc::new(Setting::new("DevSetting01", 50.0)),
                Arc::new(Setting::new("DevSetting02", 50.0)),
                Arc::new(Setting::new("DevSetting03", 50.0)),
                Arc::new(Setting::new("DevSetting04", 50.0)),
                Arc::new(Setting::new("DevSetting05", 50.0)),
            ],

            render_targets_to_upgrade: Arc::new(ListSetting::new(
                "RenderTargetsToUpgrade",
                DEFAULT_UPGRADE_TARGETS,
            )),
            extra_render_targets_to_upgrade: Arc::new(ListSetting::new(
                "ExtraRenderTargetsToUpgrade",
                DEFAULT_EXTRA_UPGRADE_TARGETS,
            )),
            upgrade_extra_render_targets: Arc::new(Setting::new(
                "UpgradeExtraRenderTargets",
                false,
            )),
            peak_brightness_auto_detected: Arc::new(Setting::new(
                "PeakBrightnessAutoDetected",
                false,
            )),

            hdr_screenshot_requested: AtomicBool::new(false),
            sdr_screenshot_requested: AtomicBool::new(false),
            end_of_frame: AtomicBool::new(false),
            interop_shim_present: AtomicBool::new(false),

            policy,
            store,
            bind_once: Once::new(),
            initialized: AtomicBool::new(false),
        }
    }

    /// Explicit startup step: bind every setting, then read the store.
    /// Binding runs exactly once per process no matter which thread gets
    /// here first; calling this again only re-reads values.
    pub fn initialize(&self) {
        self.bind_once.call_once(|| {
            self.bind_all();
            self.initialized.store(true, Ordering::Release);
        });

        self.store.load();
        log_info!("Settings loaded ({} bindings)", self.store.binding_count());

        // Resolve with last session's interop detection until the probe
        // runs; late detection changes the mode mid-frame otherwise.
        self.interop_shim_present
            .store(self.frame_gen_interop.get(), Ordering::Relaxed);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Re-read every bound value from the store.
    pub fn reload(&self) {
        if !self.is_initialized() {
            log_warn!("Settings reload requested before initialize; ignoring");
            return;
        }
        self.store.load();
    }

    /// Persist current values. Failures are reported and swallowed; the
    /// in-memory state stays authoritative either way.
    pub fn save(&self) {
        if let Err(e) = self.store.save() {
            log_error!("Failed to save settings: {}", e);
        }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn frame_gen_policy(&self) -> &FrameGenPolicy {
        &self.policy
    }

    fn bind_all(&self) {
        // HDR
        self.store.bind_i32(self.display_mode.clone());
        self.store.bind_bool(self.enforce_user_display_mode.clone());
        self.store.bind_bool(self.force_sdr_on_hdr.clone());
        self.store.bind_i32(self.peak_brightness.clone());
        self.store.bind_i32(self.game_paper_white.clone());
        self.store.bind_i32(self.ui_paper_white.clone());
        self.store.bind_f32(self.extend_gamut.clone());
        self.store.bind_bool(self.auto_hdr_videos.clone());

        // SDR
        self.store.bind_f32(self.secondary_brightness.clone());

        // Tone mapper
        self.store.bind_i32(self.tone_mapper_type.clone());
        self.store.bind_f32(self.saturation.clone());
        self.store.bind_f32(self.contrast.clone());
        self.store.bind_f32(self.highlights.clone());
        self.store.bind_f32(self.shadows.clone());
        self.store.bind_f32(self.bloom.clone());

        // Color grading
        self.store.bind_f32(self.color_grading_strength.clone());
        self.store.bind_f32(self.lut_correction_strength.clone());
        self.store.bind_bool(self.vanilla_menu_luts.clone());
        self.store.bind_bool(self.strict_lut_application.clone());

        self.store.bind_f32(self.gamma_correction_strength.clone());
        self.store.bind_i32(self.film_grain_type.clone());
        self.store.bind_f32(self.film_grain_fps_limit.clone());
        self.store.bind_bool(self.post_sharpen.clone());
        self.store.bind_bool(self.hdr_screenshots.clone());
        self.store.bind_bool(self.hdr_screenshots_lossless.clone());
        self.store.bind_bool(self.frame_gen_interop.clone());
        for dev in &self.dev_settings {
            self.store.bind_f32(dev.clone());
        }

        self.store.bind_list(self.render_targets_to_upgrade.clone());
        self.store
            .bind_list(self.extra_render_targets_to_upgrade.clone());
        self.store
            .bind_bool(self.upgrade_extra_render_targets.clone());
        self.store
            .bind_bool(self.peak_brightness_auto_detected.clone());
    }

    // ===== Transient flags =====

    pub fn request_hdr_screenshot(&self, pending: bool) {
        self.hdr_screenshot_requested.store(pending, Ordering::Relaxed);
    }

    pub fn hdr_screenshot_requested(&self) -> bool {
        self.hdr_screenshot_requested.load(Ordering::Relaxed)
    }

    pub fn request_sdr_screenshot(&self, pending: bool) {
        self.sdr_screenshot_requested.store(pending, Ordering::Relaxed);
    }

    pub fn sdr_screenshot_requested(&self) -> bool {
        self.sdr_screenshot_requested.load(Ordering::Relaxed)
    }

    pub fn set_end_of_frame(&self, at_end: bool) {
        self.end_of_frame.store(at_end, Ordering::Release);
    }

    pub fn end_of_frame(&self) -> bool {
        self.end_of_frame.load(Ordering::Acquire)
    }

    pub fn set_interop_shim_present(&self, present: bool) {
        self.interop_shim_present.store(present, Ordering::Relaxed);
    }

    pub fn interop_shim_present(&self) -> bool {
        self.interop_shim_present.load(Ordering::Relaxed)
    }

    // ===== Mode predicates =====

    /// The user preference targets an HDR encoding, before any remapping.
    pub fn is_display_mode_set_to_hdr(&self) -> bool {
        display::clamp_preference(self.display_mode.get()) > display::PREFERENCE_SDR
    }

    /// The GPU pipeline will tonemap to SDR when this holds.
    pub fn is_sdr_forced_on_hdr(&self, acknowledge_screenshots: bool) -> bool {
        self.force_sdr_on_hdr.get()
            || (acknowledge_screenshots
                && !self.hdr_screenshot_requested()
                && self.sdr_screenshot_requested()
                && self.is_display_mode_set_to_hdr())
    }

    pub fn is_rendering_hdr(&self, acknowledge_screenshots: bool) -> bool {
        self.is_display_mode_set_to_hdr() && !self.is_sdr_forced_on_hdr(acknowledge_screenshots)
    }

    pub fn is_custom_tone_mapper(&self) -> bool {
        self.is_display_mode_set_to_hdr() || self.tone_mapper_type.get() > 0
    }

    pub fn is_film_grain_improved(&self) -> bool {
        self.film_grain_type.get() == 1
    }

    /// Resolve the authoritative display mode for the given frame-gen tech.
    pub fn actual_display_mode(
        &self,
        acknowledge_screenshots: bool,
        frame_gen: FrameGenTech,
    ) -> ResolvedDisplayMode {
        display::resolve(
            ResolveInputs {
                preference: self.display_mode.get(),
                frame_gen,
                enforce_user_mode: self.enforce_user_display_mode.get(),
                force_sdr: self.is_sdr_forced_on_hdr(acknowledge_screenshots),
                shim_active: self.interop_shim_present(),
            },
            &self.policy,
        )
    }
}

#[cfg(test)]
pub(crate) fn test_settings(name: &str) -> Settings {
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let path = std::env::temp_dir().join(format!(
        "lumenshift_settings_{}_{}_{}.db",
        name,
        std::process::id(),
        nonce
    ));
    let store = ConfigStore::open(&path).unwrap();
    Settings::new(store, FrameGenPolicy::default())
}
