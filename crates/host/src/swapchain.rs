//! Swap-chain format synchronizer.
//!
//! Translates a resolved display mode into the format and color-space calls
//! the host renderer exposes, in a fixed order: render-target format first,
//! then swap-chain format, then color space, then (optionally) a recreation
//! request. The host applies color space only at present time, so ordering
//! matters when a recreation is in flight.

use lumenshift_core::display::{BufferFormat, ColorSpace, ResolvedDisplayMode};
use lumenshift_core::log_info;

/// Renderer hooks the synchronizer drives. Implemented over the host's
/// swap-chain wrapper; mocked in tests.
pub trait SwapchainTarget {
    fn set_render_target_format(&self, format: BufferFormat);
    fn set_swap_chain_format(&self, format: BufferFormat);
    fn set_color_space(&self, color_space: ColorSpace);
    /// Nudge the host into destroying and recreating the swap chain so a
    /// format change takes effect mid-session.
    fn request_recreation(&self);
    /// Pin the host's output gamma. Hosts without a gamma control ignore it.
    fn pin_gamma(&self, _gamma: f32) {}
}

pub struct SwapchainSynchronizer {
    target: Box<dyn SwapchainTarget + Send + Sync>,
}

impl SwapchainSynchronizer {
    pub fn new(target: Box<dyn SwapchainTarget + Send + Sync>) -> Self {
        Self { target }
    }

    pub fn pin_gamma(&self, gamma: f32) {
        self.target.pin_gamma(gamma);
    }

    /// Push formats for `mode` without forcing a recreation. Used during
    /// startup, before the first swap chain exists.
    pub fn prime(&self, mode: ResolvedDisplayMode) {
        self.push_formats(mode);
    }

    /// Push formats for `mode` and request a swap-chain recreation so the
    /// change takes effect on the next present.
    pub fn apply(&self, mode: ResolvedDisplayMode) {
        self.push_formats(mode);
        self.target.request_recreation();
        log_info!(
            "Swap chain retargeted: {:?} / {:?}",
            mode.buffer_format(),
            mode.color_space()
        );
    }

    fn push_formats(&self, mode: ResolvedDisplayMode) {
        let format = mode.buffer_format();
        self.target.set_render_target_format(format);
        self.target.set_swap_chain_format(format);
        self.target.set_color_space(mode.color_space());
    }
}

/// DXGI equivalents for the abstract format and color-space types.
#[cfg(windows)]
pub mod dxgi {
    use lumenshift_core::display::{BufferFormat, ColorSpace};
    use windows::Win32::Graphics::Dxgi::Common::{
        DXGI_COLOR_SPACE_RGB_FULL_G10_NONE_P709, DXGI_COLOR_SPACE_RGB_FULL_G2084_NONE_P2020,
        DXGI_COLOR_SPACE_RGB_FULL_G22_NONE_P709, DXGI_COLOR_SPACE_TYPE, DXGI_FORMAT,
        DXGI_FORMAT_R10G10B10A2_UNORM, DXGI_FORMAT_R16G16B16A16_FLOAT,
    };

    pub fn format(format: BufferFormat) -> DXGI_FORMAT {
        match format {
            BufferFormat::Rgb10A2Unorm => DXGI_FORMAT_R10G10B10A2_UNORM,
            BufferFormat::Rgba16Float => DXGI_FORMAT_R16G16B16A16_FLOAT,
        }
    }

    pub fn color_space(color_space: ColorSpace) -> DXGI_COLOR_SPACE_TYPE {
        match color_space {
            ColorSpace::SrgbG22 => DXGI_COLOR_SPACE_RGB_FULL_G22_NONE_P709,
            ColorSpace::HdrPq2020 => DXGI_COLOR_SPACE_RGB_FULL_G2084_NONE_P2020,
            ColorSpace::ScrgbLinear => DXGI_COLOR_SPACE_RGB_FULL_G10_NONE_P709,
        }
    }
}
