//! The display surface the HDR capability monitor queries.
//!
//! All layout and API specifics stay behind `DisplaySurface`; the monitor's
//! state machine never touches DXGI directly, so it tests against a mock on
//! any platform.

/// Capability queries against the output the host window presents on.
pub trait DisplaySurface {
    /// The attached display can accept an HDR signal.
    fn hdr_supported(&self) -> bool;
    /// The output is currently presenting in HDR.
    fn hdr_enabled(&self) -> bool;
    /// Attempt to switch the output into HDR; returns whether it is now
    /// enabled.
    fn try_enable_hdr(&self) -> bool;
    /// Peak luminance in nits as reported by the output. Only meaningful
    /// while HDR is enabled; the value is cached by the OS at swap-chain
    /// creation and goes stale across monitor moves or HDR recalibration.
    fn max_luminance(&self) -> Option<f32>;
}

/// DXGI-backed surface: first attached output of the first adapter.
#[cfg(windows)]
pub struct DxgiSurface;

#[cfg(windows)]
mod dxgi {
    use windows::core::Interface;
    use windows::Win32::Graphics::Dxgi::Common::DXGI_COLOR_SPACE_RGB_FULL_G2084_NONE_P2020;
    use windows::Win32::Graphics::Dxgi::{
        CreateDXGIFactory1, IDXGIFactory1, IDXGIOutput6, DXGI_ERROR_NOT_FOUND,
        DXGI_OUTPUT_DESC1,
    };

    /// Luminance threshold below which a panel is assumed SDR-only when it
    /// is not already presenting HDR.
    const HDR_CAPABLE_NITS: f32 = 400.0;

    pub(super) fn primary_output_desc() -> Option<DXGI_OUTPUT_DESC1> {
        unsafe {
            let factory: IDXGIFactory1 = CreateDXGIFactory1().ok()?;

            for adapter_index in 0.. {
                let adapter = match factory.EnumAdapters1(adapter_index) {
                    Ok(adapter) => adapter,
                    Err(_) => break,
                };

                for output_index in 0.. {
                    let output = match adapter.EnumOutputs(output_index) {
                        Ok(output) => output,
                        Err(e) if e.code() == DXGI_ERROR_NOT_FOUND => break,
                        Err(_) => break,
                    };

                    let Ok(desc) = output.GetDesc() else {
                        continue;
                    };
                    if !desc.AttachedToDesktop.as_bool() {
                        continue;
                    }

                    if let Ok(output6) = output.cast::<IDXGIOutput6>() {
                        if let Ok(desc1) = output6.GetDesc1() {
                            return Some(desc1);
                        }
                    }
                }
            }

            None
        }
    }

    pub(super) fn is_hdr_color_space(desc: &DXGI_OUTPUT_DESC1) -> bool {
        desc.ColorSpace == DXGI_COLOR_SPACE_RGB_FULL_G2084_NONE_P2020
    }

    pub(super) fn is_hdr_capable(desc: &DXGI_OUTPUT_DESC1) -> bool {
        is_hdr_color_space(desc) || desc.MaxLuminance >= HDR_CAPABLE_NITS
    }
}

/// OS-side HDR switch, the display-config advanced-color state. DXGI can
/// only report the current color mode; flipping it goes through the
/// display-config API.
#[cfg(windows)]
mod advanced_color {
    use windows::Win32::Devices::Display::{
        DisplayConfigGetDeviceInfo, DisplayConfigSetDeviceInfo, GetDisplayConfigBufferSizes,
        QueryDisplayConfig, DISPLAYCONFIG_DEVICE_INFO_GET_ADVANCED_COLOR_INFO,
        DISPLAYCONFIG_DEVICE_INFO_SET_ADVANCED_COLOR_STATE, DISPLAYCONFIG_GET_ADVANCED_COLOR_INFO,
        DISPLAYCONFIG_MODE_INFO, DISPLAYCONFIG_PATH_INFO, DISPLAYCONFIG_SET_ADVANCED_COLOR_STATE,
        QDC_ONLY_ACTIVE_PATHS,
    };

    const ADVANCED_COLOR_SUPPORTED: u32 = 0x1;
    const ADVANCED_COLOR_ENABLED: u32 = 0x2;

    fn active_paths() -> Option<Vec<DISPLAYCONFIG_PATH_INFO>> {
        unsafe {
            let mut path_count = 0u32;
            let mut mode_count = 0u32;
            if GetDisplayConfigBufferSizes(QDC_ONLY_ACTIVE_PATHS, &mut path_count, &mut mode_count)
                .is_err()
            {
                return None;
            }

            let mut paths = vec![DISPLAYCONFIG_PATH_INFO::default(); path_count as usize];
            let mut modes = vec![DISPLAYCONFIG_MODE_INFO::default(); mode_count as usize];
            if QueryDisplayConfig(
                QDC_ONLY_ACTIVE_PATHS,
                &mut path_count,
                paths.as_mut_ptr(),
                &mut mode_count,
                modes.as_mut_ptr(),
                None,
            )
            .is_err()
            {
                return None;
            }

            paths.truncate(path_count as usize);
            Some(paths)
        }
    }

    /// Turn advanced color on for every active path that supports it but
    /// has it off. Returns whether any path was switched. Applies to all
    /// paths; at init time we cannot yet tell which output the host window
    /// will land on.
    pub(super) fn enable() -> bool {
        let Some(paths) = active_paths() else {
            return false;
        };

        let mut switched = false;
        for path in &paths {
            unsafe {
                let mut info = DISPLAYCONFIG_GET_ADVANCED_COLOR_INFO::default();
                info.header.r#type = DISPLAYCONFIG_DEVICE_INFO_GET_ADVANCED_COLOR_INFO;
                info.header.size =
                    std::mem::size_of::<DISPLAYCONFIG_GET_ADVANCED_COLOR_INFO>() as u32;
                info.header.adapterId = path.targetInfo.adapterId;
                info.header.id = path.targetInfo.id;
                if DisplayConfigGetDeviceInfo(&mut info.header) != 0 {
                    continue;
                }

                let flags = info.Anonymous.value;
                if flags & ADVANCED_COLOR_SUPPORTED == 0 || flags & ADVANCED_COLOR_ENABLED != 0 {
                    continue;
                }

                let mut state = DISPLAYCONFIG_SET_ADVANCED_COLOR_STATE::default();
                state.header.r#type = DISPLAYCONFIG_DEVICE_INFO_SET_ADVANCED_COLOR_STATE;
                state.header.size =
                    std::mem::size_of::<DISPLAYCONFIG_SET_ADVANCED_COLOR_STATE>() as u32;
                state.header.adapterId = path.targetInfo.adapterId;
                state.header.id = path.targetInfo.id;
                state.Anonymous.value = 1; // enableAdvancedColor
                if DisplayConfigSetDeviceInfo(&state.header) == 0 {
                    switched = true;
                }
            }
        }
        switched
    }
}

#[cfg(windows)]
use lumenshift_core::{log_info, log_warn};

#[cfg(windows)]
impl DisplaySurface for DxgiSurface {
    fn hdr_supported(&self) -> bool {
        dxgi::primary_output_desc()
            .map(|desc| dxgi::is_hdr_capable(&desc))
            .unwrap_or(false)
    }

    fn hdr_enabled(&self) -> bool {
        dxgi::primary_output_desc()
            .map(|desc| dxgi::is_hdr_color_space(&desc))
            .unwrap_or(false)
    }

    fn try_enable_hdr(&self) -> bool {
        if self.hdr_enabled() {
            return true;
        }

        if advanced_color::enable() {
            log_info!("Requested HDR output from the OS");
        } else {
            log_warn!("No display path accepted an HDR enable request");
        }

        // The switch lands through a display change; the re-probe decides.
        self.hdr_enabled()
    }

    fn max_luminance(&self) -> Option<f32> {
        dxgi::primary_output_desc().map(|desc| desc.MaxLuminance)
    }
}

/// Inert surface for platforms without a display stack (tooling, CI).
pub struct NullSurface;

impl DisplaySurface for NullSurface {
    fn hdr_supported(&self) -> bool {
        false
    }

    fn hdr_enabled(&self) -> bool {
        false
    }

    fn try_enable_hdr(&self) -> bool {
        false
    }

    fn max_luminance(&self) -> Option<f32> {
        None
    }
}
