//! HDR capability monitor.
//!
//! Tracks whether the attached output supports and currently presents HDR,
//! downgrades the session when support disappears, and auto-detects peak
//! luminance the first time HDR engages.

use lumenshift_core::constants::PEAK_LUMINANCE_FLOOR_NITS;
use lumenshift_core::display::PREFERENCE_SDR;
use lumenshift_core::{log_info, log_warn, Settings};

use crate::surface::DisplaySurface;

/// Snapshot of the monitor's last refresh, for diagnostics and the menu.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HdrCapabilityState {
    pub supported: bool,
    pub enabled: bool,
    pub peak_luminance_nits: Option<f32>,
}

pub struct HdrMonitor {
    surface: Box<dyn DisplaySurface + Send + Sync>,
    supported: bool,
    enabled: bool,
    peak_luminance_nits: Option<f32>,
}

impl HdrMonitor {
    pub fn new(surface: Box<dyn DisplaySurface + Send + Sync>) -> Self {
        Self {
            surface,
            supported: false,
            enabled: false,
            peak_luminance_nits: None,
        }
    }

    pub fn state(&self) -> HdrCapabilityState {
        HdrCapabilityState {
            supported: self.supported,
            enabled: self.enabled,
            peak_luminance_nits: self.peak_luminance_nits,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Re-probe the output. Called at startup and whenever the host reports
    /// a display change.
    pub fn refresh_support(&mut self) {
        let supported = self.surface.hdr_supported();
        if supported != self.supported {
            log_info!(
                "HDR display support changed: {}",
                if supported { "supported" } else { "unsupported" }
            );
        }
        self.supported = supported;
        self.enabled = self.surface.hdr_enabled();
    }

    /// Reconcile the user's preference with what the output can do.
    ///
    /// When the preference targets HDR but the output cannot present it, the
    /// in-memory preference drops to SDR without being saved: the downgrade
    /// is transient and the stored preference survives a monitor coming
    /// back. The first time HDR actually engages, the output's reported
    /// peak luminance becomes the new default for `PeakBrightness`, and the
    /// value itself is adopted and saved exactly once.
    pub fn refresh_enable(&mut self, settings: &Settings) {
        if self.supported && !self.enabled && settings.is_rendering_hdr(false) {
            self.enabled = self.surface.try_enable_hdr();
        }

        if !self.supported && settings.is_display_mode_set_to_hdr() {
            log_warn!("HDR requested but the display does not support it; using SDR this session");
            settings.display_mode.set(PREFERENCE_SDR);
        }

        if self.enabled {
            self.detect_peak_luminance(settings);
        }
    }

    fn detect_peak_luminance(&mut self, settings: &Settings) {
        let Some(nits) = self.surface.max_luminance() else {
            return;
        };
        // Panels report garbage while HDR is mid-toggle.
        let nits = nits.max(PEAK_LUMINANCE_FLOOR_NITS);
        self.peak_luminance_nits = Some(nits);

        settings.peak_brightness.set_default(nits as i32);

        if !settings.peak_brightness_auto_detected.get() {
            settings.peak_brightness.set(nits as i32);
            settings.peak_brightness_auto_detected.set(true);
            settings.save();
            log_info!("Auto-detected peak brightness: {} nits", nits as i32);
        }
    }
}
