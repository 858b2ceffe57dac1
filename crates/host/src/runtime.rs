//! Composition root for the in-process plugin.
//!
//! Owns the settings registry, the HDR capability monitor, the swap-chain
//! synchronizer and the menu bridge, and sequences them through startup and
//! the events the host raises afterwards.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use lumenshift_core::constants::{self, BuildContext, ConstantsPass, ShaderConstants};
use lumenshift_core::display::FrameGenTech;
use lumenshift_core::{log_fatal, log_info, MenuBridge, MenuValue, Settings};

use crate::compat::{CompatPolicy, ModuleProbe};
use crate::hdr::{HdrCapabilityState, HdrMonitor};
use crate::surface::DisplaySurface;
use crate::swapchain::{SwapchainSynchronizer, SwapchainTarget};

/// Output gamma the host is pinned to. The GPU passes decode with 2.4
/// regardless of what the host's own video settings say.
pub const HOST_GAMMA: f32 = 2.4;

pub struct Runtime {
    settings: Arc<Settings>,
    bridge: MenuBridge,
    hdr: RwLock<HdrMonitor>,
    swapchain: SwapchainSynchronizer,
    probe: Box<dyn ModuleProbe + Send + Sync>,
    compat: CompatPolicy,
    // Reported by the host's upscaler integration each time it changes.
    frame_gen: AtomicU8,
    started: Instant,
}

impl Runtime {
    pub fn new(
        settings: Arc<Settings>,
        surface: Box<dyn DisplaySurface + Send + Sync>,
        target: Box<dyn SwapchainTarget + Send + Sync>,
        probe: Box<dyn ModuleProbe + Send + Sync>,
        compat: CompatPolicy,
    ) -> Self {
        let bridge = MenuBridge::new(&settings);
        Self {
            settings,
            bridge,
            hdr: RwLock::new(HdrMonitor::new(surface)),
            swapchain: SwapchainSynchronizer::new(target),
            probe,
            compat,
            frame_gen: AtomicU8::new(FrameGenTech::None.as_raw()),
            started: Instant::now(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn bridge(&self) -> &MenuBridge {
        &self.bridge
    }

    pub fn hdr_state(&self) -> HdrCapabilityState {
        self.hdr.read().state()
    }

    pub fn frame_generation(&self) -> FrameGenTech {
        FrameGenTech::from_raw(self.frame_gen.load(Ordering::Relaxed))
    }

    /// Startup sequence, called once after the host loads the plugin and
    /// `Settings::initialize` has run. Returns `false` when the process
    /// must not hook the renderer.
    pub fn init_compatibility(&self) -> bool {
        if !self.settings.is_initialized() {
            log_fatal!("Runtime started before settings were initialized");
            return false;
        }

        if let Some(name) = self.compat.find_legacy_module(self.probe.as_ref()) {
            log_fatal!(
                "Conflicting module {} is loaded; refusing to start. Remove the old plugin.",
                name
            );
            return false;
        }

        if !self.compat.companion_present(self.probe.as_ref()) {
            log_fatal!("Shader injector module not found; the plugin cannot run without it");
            return false;
        }

        self.swapchain.pin_gamma(HOST_GAMMA);

        // Stale stores can hold out-of-range preferences; normalize once so
        // the menu shows what the resolver will actually use.
        let preference = self.settings.display_mode.get();
        let clamped = lumenshift_core::display::clamp_preference(preference);
        if clamped != preference {
            self.settings.display_mode.set(clamped);
        }

        let before = self
            .settings
            .actual_display_mode(false, self.frame_generation());

        let shim = self.compat.interop_shim_present(self.probe.as_ref());
        self.settings.set_interop_shim_present(shim);
        if self.settings.frame_gen_interop.get() != shim {
            self.settings.frame_gen_interop.set(shim);
            self.settings.save();
        }

        {
            let mut hdr = self.hdr.write();
            hdr.refresh_support();
            hdr.refresh_enable(&self.settings);
        }

        // The swap chain does not exist yet, so a changed mode only needs
        // its formats pushed, not a recreation.
        let after = self
            .settings
            .actual_display_mode(false, self.frame_generation());
        if after != before {
            self.swapchain.prime(after);
        }

        log_info!("Runtime initialized in {:?} mode", after);
        true
    }

    /// The host reports its upscaler switched frame-generation tech.
    ///
    /// Every tech change re-resolves the display mode. An unchanged
    /// resolved mode implies an unchanged format and color space (both are
    /// total functions of the mode), so the swap chain is already correct
    /// and the recreation is skipped.
    pub fn set_frame_generation(&self, tech: FrameGenTech) {
        let before = self
            .settings
            .actual_display_mode(false, self.frame_generation());
        self.frame_gen.store(tech.as_raw(), Ordering::Relaxed);
        let after = self.settings.actual_display_mode(false, tech);

        if after != before {
            self.swapchain.apply(after);
        }
    }

    /// The user changed the display-mode preference, or a display event
    /// invalidated the resolved mode.
    pub fn on_display_mode_changed(&self) {
        {
            let mut hdr = self.hdr.write();
            hdr.refresh_support();
            hdr.refresh_enable(&self.settings);
        }
        self.refresh_swapchain_format();
    }

    /// Re-derive formats from the current resolved mode and force the host
    /// to recreate its swap chain.
    pub fn refresh_swapchain_format(&self) {
        let mode = self
            .settings
            .actual_display_mode(false, self.frame_generation());
        self.swapchain.apply(mode);
    }

    /// Build the constant block for one GPU pass.
    pub fn shader_constants(
        &self,
        pass: ConstantsPass,
        lut_correction_needed: bool,
    ) -> ShaderConstants {
        let resolved = self
            .settings
            .actual_display_mode(true, self.frame_generation());
        constants::build(
            &self.settings,
            &BuildContext {
                resolved,
                pass,
                runtime_ms: self.started.elapsed().as_secs_f64() as f32 * 1000.0,
                lut_correction_needed,
            },
        )
    }

    // Capture intents and the frame marker, forwarded to the transient
    // atomics on the settings registry.

    pub fn request_hdr_screenshot(&self, pending: bool) {
        self.settings.request_hdr_screenshot(pending);
    }

    pub fn request_sdr_screenshot(&self, pending: bool) {
        self.settings.request_sdr_screenshot(pending);
    }

    pub fn set_end_of_frame(&self, at_end: bool) {
        self.settings.set_end_of_frame(at_end);
    }

    /// Route one edit from the settings menu. Persists on change and
    /// propagates display-mode effects.
    pub fn apply_menu_value(&self, id: i32, value: MenuValue) -> bool {
        let Some(entry) = self.bridge.find_by_id(id) else {
            return false;
        };
        let Some(applied) = self.bridge.apply(entry, value) else {
            return false;
        };

        if applied.changed {
            self.settings.save();
            if applied.affects_display_mode {
                self.on_display_mode_changed();
            }
        }
        applied.changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumenshift_core::display::{BufferFormat, ColorSpace, FrameGenPolicy, ResolvedDisplayMode};
    use lumenshift_core::ConfigStore;
    use parking_lot::Mutex;

    struct FixedProbe(Vec<&'static str>);

    impl ModuleProbe for FixedProbe {
        fn is_loaded(&self, module_name: &str) -> bool {
            self.0.contains(&module_name)
        }
    }

    struct StaticSurface {
        supported: bool,
        enabled: bool,
        luminance: Option<f32>,
    }

    impl DisplaySurface for StaticSurface {
        fn hdr_supported(&self) -> bool {
            self.supported
        }

        fn hdr_enabled(&self) -> bool {
            self.enabled
        }

        fn try_enable_hdr(&self) -> bool {
            self.supported
        }

        fn max_luminance(&self) -> Option<f32> {
            self.luminance
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        RenderTarget(BufferFormat),
        SwapChain(BufferFormat),
        ColorSpace(ColorSpace),
        Recreate,
        Gamma(f32),
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Call>>,
    }

    impl SwapchainTarget for Arc<Recorder> {
        fn set_render_target_format(&self, format: BufferFormat) {
            self.calls.lock().push(Call::RenderTarget(format));
        }

        fn set_swap_chain_format(&self, format: BufferFormat) {
            self.calls.lock().push(Call::SwapChain(format));
        }

        fn set_color_space(&self, color_space: ColorSpace) {
            self.calls.lock().push(Call::ColorSpace(color_space));
        }

        fn request_recreation(&self) {
            self.calls.lock().push(Call::Recreate);
        }

        fn pin_gamma(&self, gamma: f32) {
            self.calls.lock().push(Call::Gamma(gamma));
        }
    }

    fn test_settings(name: &str) -> Arc<Settings> {
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!(
            "lumenshift_runtime_{}_{}_{}.db",
            name,
            std::process::id(),
            nonce
        ));
        let store = ConfigStore::open(&path).unwrap();
        let settings = Arc::new(Settings::new(store, FrameGenPolicy::default()));
        settings.initialize();
        settings
    }

    fn hdr_surface() -> Box<StaticSurface> {
        Box::new(StaticSurface {
            supported: true,
            enabled: true,
            luminance: Some(1000.0),
        })
    }

    fn runtime_with(
        settings: Arc<Settings>,
        surface: Box<StaticSurface>,
        modules: Vec<&'static str>,
    ) -> (Runtime, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let runtime = Runtime::new(
            settings,
            surface,
            Box::new(recorder.clone()),
            Box::new(FixedProbe(modules)),
            CompatPolicy::default(),
        );
        (runtime, recorder)
    }

    #[test]
    fn legacy_module_aborts_startup() {
        let (runtime, recorder) = runtime_with(
            test_settings("legacy"),
            hdr_surface(),
            vec!["ShaderInjector.dll", "AutoHDRRetrofit.dll"],
        );

        assert!(!runtime.init_compatibility());
        assert!(recorder.calls.lock().is_empty());
    }

    #[test]
    fn missing_companion_aborts_startup() {
        let (runtime, _) = runtime_with(test_settings("companion"), hdr_surface(), vec![]);
        assert!(!runtime.init_compatibility());
    }

    #[test]
    fn startup_pins_gamma_and_persists_shim_detection() {
        let settings = test_settings("shim");
        let (runtime, recorder) = runtime_with(
            settings.clone(),
            hdr_surface(),
            vec!["ShaderInjector.dll", "FrameGenBridge.dll"],
        );

        assert!(runtime.init_compatibility());
        assert!(recorder.calls.lock().contains(&Call::Gamma(HOST_GAMMA)));
        assert!(settings.interop_shim_present());
        assert_eq!(
            settings.store().read_raw("FrameGenInterop").as_deref(),
            Some("true")
        );
    }

    #[test]
    fn unsupported_display_primes_sdr_without_recreation() {
        let settings = test_settings("prime_sdr");
        settings.display_mode.set(2);
        let surface = Box::new(StaticSurface {
            supported: false,
            enabled: false,
            luminance: None,
        });
        let (runtime, recorder) =
            runtime_with(settings.clone(), surface, vec!["ShaderInjector.dll"]);

        assert!(runtime.init_compatibility());
        assert_eq!(settings.display_mode.get(), 0);

        let calls = recorder.calls.lock();
        assert!(calls.contains(&Call::SwapChain(BufferFormat::Rgb10A2Unorm)));
        assert!(!calls.contains(&Call::Recreate));
    }

    #[test]
    fn frame_gen_change_retargets_the_swapchain() {
        let settings = test_settings("framegen");
        settings.display_mode.set(1);
        let (runtime, recorder) = runtime_with(
            settings.clone(),
            hdr_surface(),
            vec!["ShaderInjector.dll"],
        );
        assert!(runtime.init_compatibility());
        recorder.calls.lock().clear();

        // FSR3 frame generation promotes HDR10 to scRGB.
        runtime.set_frame_generation(FrameGenTech::Fsr3);
        assert_eq!(
            runtime
                .settings()
                .actual_display_mode(false, runtime.frame_generation()),
            ResolvedDisplayMode::Scrgb
        );
        {
            let calls = recorder.calls.lock();
            assert!(calls.contains(&Call::SwapChain(BufferFormat::Rgba16Float)));
            assert!(calls.contains(&Call::Recreate));
        }

        // Reporting the same tech again does not thrash the swap chain.
        recorder.calls.lock().clear();
        runtime.set_frame_generation(FrameGenTech::Fsr3);
        assert!(recorder.calls.lock().is_empty());
    }

    #[test]
    fn menu_edits_persist_and_propagate_mode_changes() {
        let settings = test_settings("menu");
        let (runtime, recorder) =
            runtime_with(settings.clone(), hdr_surface(), vec!["ShaderInjector.dll"]);
        assert!(runtime.init_compatibility());
        recorder.calls.lock().clear();

        let changed = runtime.apply_menu_value(
            lumenshift_core::bridge::ids::DISPLAY_MODE,
            MenuValue::Stepper(1),
        );
        assert!(changed);
        assert_eq!(
            settings.store().read_raw("DisplayMode").as_deref(),
            Some("1")
        );
        assert!(recorder.calls.lock().contains(&Call::Recreate));

        // Re-applying the same value is a no-op.
        recorder.calls.lock().clear();
        assert!(!runtime.apply_menu_value(
            lumenshift_core::bridge::ids::DISPLAY_MODE,
            MenuValue::Stepper(1),
        ));
        assert!(recorder.calls.lock().is_empty());
    }

    #[test]
    fn shader_constants_follow_the_resolved_mode() {
        let settings = test_settings("constants");
        settings.display_mode.set(1);
        let (runtime, _) =
            runtime_with(settings, hdr_surface(), vec!["ShaderInjector.dll"]);
        assert!(runtime.init_compatibility());

        let constants = runtime.shader_constants(ConstantsPass::Default, true);
        assert_eq!(constants.display_mode, 1);

        runtime.set_frame_generation(FrameGenTech::Fsr3);
        let constants = runtime.shader_constants(ConstantsPass::Default, true);
        assert_eq!(constants.display_mode, 2);
    }
}
