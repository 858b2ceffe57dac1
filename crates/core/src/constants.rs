//! Shader constant derivation.
//!
//! Maps persisted settings plus the resolved display mode into the flat
//! parameter block the GPU passes consume. Pure over its inputs; the caller
//! owns the output and rebuilds it whenever it needs fresh values.

use crate::display::ResolvedDisplayMode;
use crate::settings::Settings;

/// Peak brightness forced while an HDR-range screenshot is pending, so
/// captures come out display-independent (HDR10 signal maximum).
pub const HDR_CAPTURE_PEAK_NITS: f32 = 10000.0;

/// Lowest peak luminance we accept from auto-detection. HDR10 certification
/// starts at 400 nits but panels report lower values when HDR is mid-toggle.
pub const PEAK_LUMINANCE_FLOOR_NITS: f32 = 80.0;

/// Linear rescale of `value` from `[min, max]` onto `[new_min, new_max]`.
pub fn linear_normalization(value: f32, min: f32, max: f32, new_min: f32, new_max: f32) -> f32 {
    new_min + (value - min) * (new_max - new_min) / (max - min)
}

/// Which render pass the constants are built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantsPass {
    Default,
    /// The dedicated LUT-correction pass; menu LUTs may bypass correction.
    LutApplication,
}

/// Per-call inputs that are not settings.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext {
    pub resolved: ResolvedDisplayMode,
    pub pass: ConstantsPass,
    pub runtime_ms: f32,
    /// Host-evaluated predicate: the current frame's LUTs still need the
    /// correction pass. When false, vanilla menu LUTs pass through.
    pub lut_correction_needed: bool,
}

/// Flat parameter block consumed by the GPU pipeline. Field order matches
/// the constant buffer layout on the shader side.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ShaderConstants {
    pub display_mode: i32,
    pub peak_brightness: f32,
    pub game_paper_white: f32,
    pub ui_paper_white: f32,
    pub extend_gamut: f32,
    pub auto_hdr_videos: u32,
    pub sdr_secondary_brightness: f32,
    pub tone_mapper_type: u32,
    pub saturation: f32,
    pub contrast: f32,
    pub highlights: f32,
    pub shadows: f32,
    pub bloom: f32,
    pub color_grading_strength: f32,
    pub lut_correction_strength: f32,
    pub strict_lut_application: u32,
    pub gamma_correction_strength: f32,
    pub film_grain_type: u32,
    pub film_grain_fps_limit: f32,
    pub post_sharpen: u32,
    pub is_at_end_of_frame: u32,
    pub runtime_ms: f32,
    pub dev_setting_01: f32,
    pub dev_setting_02: f32,
    pub dev_setting_03: f32,
    pub dev_setting_04: f32,
    pub dev_setting_05: f32,
}

impl Default for ShaderConstants {
    fn default() -> Self {
        Self {
            display_mode: 0,
            peak_brightness: 1000.0,
            game_paper_white: 200.0,
            ui_paper_white: 200.0,
            extend_gamut: 0.0,
            auto_hdr_videos: 1,
            sdr_secondary_brightness: 1.0,
            tone_mapper_type: 0,
            saturation: 1.0,
            contrast: 1.0,
            highlights: 0.5,
            shadows: 0.5,
            bloom: 0.5,
            color_grading_strength: 1.0,
            lut_correction_strength: 1.0,
            strict_lut_application: 1,
            gamma_correction_strength: 1.0,
            film_grain_type: 0,
            film_grain_fps_limit: 24.0,
            post_sharpen: 1,
            is_at_end_of_frame: 0,
            runtime_ms: 0.0,
            dev_setting_01: 0.5,
            dev_setting_02: 0.5,
            dev_setting_03: 0.5,
            dev_setting_04: 0.5,
            dev_setting_05: 0.5,
        }
    }
}

/// Build the constant block for one pass.
pub fn build(settings: &Settings, ctx: &BuildContext) -> ShaderConstants {
    let custom_tone_mapper = settings.is_custom_tone_mapper() || ctx.resolved.is_hdr();

    let mut constants = ShaderConstants {
        display_mode: ctx.resolved.shader_value(),
        peak_brightness: if settings.hdr_screenshot_requested() {
            // Unlock the full HDR10 range while capturing so screenshots
            // look the same regardless of the configured peak.
            HDR_CAPTURE_PEAK_NITS
        } else {
            settings.peak_brightness.get() as f32
        },
        game_paper_white: settings.game_paper_white.get() as f32,
        ui_paper_white: settings.ui_paper_white.get() as f32,
        extend_gamut: settings.extend_gamut.get() * 0.01, // 0-100 to 0-1
        auto_hdr_videos: settings.auto_hdr_videos.get() as u32,
        sdr_secondary_brightness: if settings.is_rendering_hdr(true) {
            1.0
        } else {
            settings.secondary_brightness.get() * 0.02 // 0-100 to 0-2
        },
        tone_mapper_type: settings.tone_mapper_type.get().max(0) as u32,
        saturation: linear_normalization(settings.saturation.get(), 0.0, 100.0, 0.5, 1.5),
        contrast: linear_normalization(settings.contrast.get(), 0.0, 100.0, 0.5, 1.5),
        highlights: if custom_tone_mapper {
            settings.highlights.get() * 0.01 // 0-100 to 0-1
        } else {
            0.5
        },
        shadows: if custom_tone_mapper {
            settings.shadows.get() * 0.01 // 0-100 to 0-1
        } else {
            0.5
        },
        bloom: settings.bloom.get() * 0.01,
        color_grading_strength: settings.color_grading_strength.get() * 0.01,
        lut_correction_strength: settings.lut_correction_strength.get() * 0.01,
        strict_lut_application: settings.strict_lut_application.get() as u32,
        gamma_correction_strength: settings.gamma_correction_strength.get() * 0.01,
        film_grain_type: settings.film_grain_type.get().max(0) as u32,
        film_grain_fps_limit: settings.film_grain_fps_limit.get(),
        post_sharpen: settings.post_sharpen.get() as u32,
        is_at_end_of_frame: settings.end_of_frame() as u32,
        runtime_ms: ctx.runtime_ms,
        dev_setting_01: settings.dev_settings[0].get() * 0.01,
        dev_setting_02: settings.dev_settings[1].get() * 0.01,
        dev_setting_03: settings.dev_settings[2].get() * 0.01,
        dev_setting_04: settings.dev_settings[3].get() * 0.01,
        dev_setting_05: settings.dev_settings[4].get() * 0.01,
    };

    if ctx.pass == ConstantsPass::LutApplication
        && settings.vanilla_menu_luts.get()
        && !ctx.lut_correction_needed
    {
        constants.lut_correction_strength = 0.0;
        constants.color_grading_strength = 1.0;
    }

    constants
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::FrameGenTech;
    use crate::settings::test_settings;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    fn ctx(settings: &Settings) -> BuildContext {
        BuildContext {
            resolved: settings.actual_display_mode(true, FrameGenTech::None),
            pass: ConstantsPass::Default,
            runtime_ms: 0.0,
            lut_correction_needed: true,
        }
    }

    #[test]
    fn saturation_midpoint_maps_to_unity() {
        let settings = test_settings("saturation");

        settings.saturation.set(50.0);
        assert_eq!(build(&settings, &ctx(&settings)).saturation, 1.0);

        settings.saturation.set(0.0);
        assert_eq!(build(&settings, &ctx(&settings)).saturation, 0.5);

        settings.saturation.set(100.0);
        assert_eq!(build(&settings, &ctx(&settings)).saturation, 1.5);
    }

    #[test]
    fn hdr_capture_overrides_peak_brightness() {
        let settings = test_settings("capture_peak");
        settings.peak_brightness.set(650);

        assert_eq!(build(&settings, &ctx(&settings)).peak_brightness, 650.0);

        settings.request_hdr_screenshot(true);
        assert_eq!(
            build(&settings, &ctx(&settings)).peak_brightness,
            HDR_CAPTURE_PEAK_NITS
        );
    }

    #[test]
    fn vanilla_tone_mapper_neutralizes_highlights_and_shadows() {
        let settings = test_settings("neutral_tonemap");
        settings.highlights.set(90.0);
        settings.shadows.set(10.0);

        let constants = build(&settings, &ctx(&settings));
        assert_eq!(constants.highlights, 0.5);
        assert_eq!(constants.shadows, 0.5);

        settings.tone_mapper_type.set(1);
        let constants = build(&settings, &ctx(&settings));
        assert!(close(constants.highlights, 0.9));
        assert!(close(constants.shadows, 0.1));
    }

    #[test]
    fn hdr_mode_enables_custom_tone_mapper_fields() {
        let settings = test_settings("hdr_tonemap");
        settings.display_mode.set(1);
        settings.highlights.set(75.0);

        let constants = build(&settings, &ctx(&settings));
        assert!(close(constants.highlights, 0.75));
    }

    #[test]
    fn secondary_brightness_is_pinned_while_rendering_hdr() {
        let settings = test_settings("secondary");
        settings.secondary_brightness.set(75.0);

        assert!(close(
            build(&settings, &ctx(&settings)).sdr_secondary_brightness,
            1.5
        ));

        settings.display_mode.set(2);
        assert_eq!(
            build(&settings, &ctx(&settings)).sdr_secondary_brightness,
            1.0
        );
    }

    #[test]
    fn lut_pass_bypasses_correction_for_vanilla_menu_luts() {
        let settings = test_settings("lut_bypass");
        settings.lut_correction_strength.set(80.0);
        settings.color_grading_strength.set(60.0);

        let mut context = ctx(&settings);
        context.pass = ConstantsPass::LutApplication;
        context.lut_correction_needed = false;

        let constants = build(&settings, &context);
        assert_eq!(constants.lut_correction_strength, 0.0);
        assert_eq!(constants.color_grading_strength, 1.0);

        // Outside the LUT pass the persisted strengths apply unchanged.
        context.pass = ConstantsPass::Default;
        let constants = build(&settings, &context);
        assert!(close(constants.lut_correction_strength, 0.8));
        assert!(close(constants.color_grading_strength, 0.6));
    }

    #[test]
    fn forced_sdr_reaches_the_shader_as_minus_one() {
        let settings = test_settings("forced_sdr_value");
        settings.display_mode.set(1);
        settings.force_sdr_on_hdr.set(true);

        assert_eq!(build(&settings, &ctx(&settings)).display_mode, -1);
    }

    #[test]
    fn end_of_frame_flag_passes_through() {
        let settings = test_settings("frame_flag");
        assert_eq!(build(&settings, &ctx(&settings)).is_at_end_of_frame, 0);

        settings.set_end_of_frame(true);
        assert_eq!(build(&settings, &ctx(&settings)).is_at_end_of_frame, 1);
    }
}
