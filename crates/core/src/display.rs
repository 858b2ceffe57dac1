//! Display-mode resolution.
//!
//! Reconciles the persisted user preference, HDR capability and the active
//! frame-generation technology into one authoritative output mode, plus the
//! buffer format and color space that mode implies. Everything in this
//! module is pure; side effects (swap-chain mutation, persistence) live in
//! the host crate.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::log_warn;

/// Frame-generation technology reported by the render host. Read-only input;
/// the host owns this state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameGenTech {
    None,
    Fsr3,
    Dlssg,
}

impl FrameGenTech {
    pub fn is_active(self) -> bool {
        self != FrameGenTech::None
    }

    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => FrameGenTech::Fsr3,
            2 => FrameGenTech::Dlssg,
            _ => FrameGenTech::None,
        }
    }

    pub fn as_raw(self) -> u8 {
        match self {
            FrameGenTech::None => 0,
            FrameGenTech::Fsr3 => 1,
            FrameGenTech::Dlssg => 2,
        }
    }
}

/// Which frame-generation technologies force a display-mode remap.
///
/// This is policy data, not logic: the vendor lists shift with driver and
/// interop-mod releases, so they are deserializable from a JSON file next
/// to the plugin and only default to the currently known-good sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameGenPolicy {
    /// Technologies whose UI composition only works with extended-range
    /// linear output; an HDR10 preference is promoted to scRGB.
    pub scrgb_required: Vec<FrameGenTech>,
    /// Technologies that cannot present extended-range buffers; an scRGB
    /// preference falls back to HDR10 unless the interop shim is active.
    pub hdr10_fallback: Vec<FrameGenTech>,
    /// Technologies the interop shim re-routes onto the scRGB path while
    /// the shim module is loaded.
    pub shim_promoted: Vec<FrameGenTech>,
}

impl Default for FrameGenPolicy {
    fn default() -> Self {
        Self {
            scrgb_required: vec![FrameGenTech::Fsr3],
            hdr10_fallback: vec![FrameGenTech::Dlssg],
            shim_promoted: vec![FrameGenTech::Dlssg],
        }
    }
}

impl FrameGenPolicy {
    /// Load a policy override from disk, falling back to the built-in
    /// defaults when the file is missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(policy) => policy,
                Err(e) => {
                    log_warn!("Ignoring malformed frame-gen policy {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    fn requires_scrgb(&self, tech: FrameGenTech, shim_active: bool) -> bool {
        self.scrgb_required.contains(&tech)
            || (shim_active && self.shim_promoted.contains(&tech))
    }

    fn requires_hdr10_fallback(&self, tech: FrameGenTech, shim_active: bool) -> bool {
        self.hdr10_fallback.contains(&tech)
            && !(shim_active && self.shim_promoted.contains(&tech))
    }
}

/// Output buffer format implied by the resolved mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferFormat {
    Rgb10A2Unorm,
    Rgba16Float,
}

/// Output color-space tag implied by the resolved mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    /// Gamma 2.2, BT.709 primaries.
    SrgbG22,
    /// PQ transfer, BT.2020 primaries.
    HdrPq2020,
    /// Linear transfer, BT.709 primaries, values beyond [0,1].
    ScrgbLinear,
}

/// The authoritative display mode after reconciling every input. Never
/// persisted; recomputed on demand from the raw preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedDisplayMode {
    /// Development/capture path: tonemap to SDR inside an scRGB buffer,
    /// bypassing every other branch.
    ForcedSdr,
    Sdr,
    Hdr10,
    Scrgb,
}

impl ResolvedDisplayMode {
    /// Value handed to the GPU pipeline: -1, 0, 1 or 2.
    pub fn shader_value(self) -> i32 {
        match self {
            ResolvedDisplayMode::ForcedSdr => -1,
            ResolvedDisplayMode::Sdr => 0,
            ResolvedDisplayMode::Hdr10 => 1,
            ResolvedDisplayMode::Scrgb => 2,
        }
    }

    pub fn buffer_format(self) -> BufferFormat {
        match self {
            ResolvedDisplayMode::Sdr | ResolvedDisplayMode::Hdr10 => BufferFormat::Rgb10A2Unorm,
            ResolvedDisplayMode::ForcedSdr | ResolvedDisplayMode::Scrgb => {
                BufferFormat::Rgba16Float
            }
        }
    }

    pub fn color_space(self) -> ColorSpace {
        match self {
            ResolvedDisplayMode::Sdr => ColorSpace::SrgbG22,
            ResolvedDisplayMode::Hdr10 => ColorSpace::HdrPq2020,
            ResolvedDisplayMode::ForcedSdr | ResolvedDisplayMode::Scrgb => ColorSpace::ScrgbLinear,
        }
    }

    pub fn is_hdr(self) -> bool {
        matches!(self, ResolvedDisplayMode::Hdr10 | ResolvedDisplayMode::Scrgb)
    }
}

/// Raw display-mode preference values. The backing store may contain stale
/// out-of-range data, so every consumer clamps first.
pub const PREFERENCE_SDR: i32 = 0;
pub const PREFERENCE_HDR10: i32 = 1;
pub const PREFERENCE_SCRGB: i32 = 2;

pub fn clamp_preference(raw: i32) -> i32 {
    raw.clamp(PREFERENCE_SDR, PREFERENCE_SCRGB)
}

/// Everything the resolution state machine looks at.
#[derive(Debug, Clone, Copy)]
pub struct ResolveInputs {
    /// Persisted preference, possibly out of range.
    pub preference: i32,
    pub frame_gen: FrameGenTech,
    /// User opted out of frame-gen remapping; the clamped preference wins.
    pub enforce_user_mode: bool,
    /// SDR-forcing override (development toggle or SDR screenshot capture).
    pub force_sdr: bool,
    /// The frame-gen interop shim module is loaded.
    pub shim_active: bool,
}

/// Resolve the actual display mode. Ordered, first match wins.
pub fn resolve(inputs: ResolveInputs, policy: &FrameGenPolicy) -> ResolvedDisplayMode {
    if inputs.force_sdr {
        return ResolvedDisplayMode::ForcedSdr;
    }

    let preference = clamp_preference(inputs.preference);

    if inputs.frame_gen.is_active() && !inputs.enforce_user_mode {
        if preference == PREFERENCE_HDR10
            && policy.requires_scrgb(inputs.frame_gen, inputs.shim_active)
        {
            return ResolvedDisplayMode::Scrgb;
        }

        if preference == PREFERENCE_SCRGB
            && policy.requires_hdr10_fallback(inputs.frame_gen, inputs.shim_active)
        {
            return ResolvedDisplayMode::Hdr10;
        }
    }

    match preference {
        PREFERENCE_HDR10 => ResolvedDisplayMode::Hdr10,
        PREFERENCE_SCRGB => ResolvedDisplayMode::Scrgb,
        _ => ResolvedDisplayMode::Sdr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(preference: i32, frame_gen: FrameGenTech) -> ResolveInputs {
        ResolveInputs {
            preference,
            frame_gen,
            enforce_user_mode: false,
            force_sdr: false,
            shim_active: false,
        }
    }

    #[test]
    fn out_of_range_preference_behaves_as_clamped() {
        let policy = FrameGenPolicy::default();
        for raw in [-3, 5, i32::MAX] {
            let clamped = clamp_preference(raw);
            assert_eq!(
                resolve(inputs(raw, FrameGenTech::None), &policy),
                resolve(inputs(clamped, FrameGenTech::None), &policy),
            );
        }
        assert_eq!(
            resolve(inputs(5, FrameGenTech::None), &policy),
            ResolvedDisplayMode::Scrgb,
        );
    }

    #[test]
    fn forced_sdr_beats_everything() {
        let policy = FrameGenPolicy::default();
        let mut i = inputs(PREFERENCE_SCRGB, FrameGenTech::Fsr3);
        i.force_sdr = true;
        assert_eq!(resolve(i, &policy), ResolvedDisplayMode::ForcedSdr);

        i.enforce_user_mode = true;
        assert_eq!(resolve(i, &policy), ResolvedDisplayMode::ForcedSdr);
    }

    #[test]
    fn frame_gen_promotes_hdr10_to_scrgb() {
        let policy = FrameGenPolicy::default();
        let i = inputs(PREFERENCE_HDR10, FrameGenTech::Fsr3);
        assert_eq!(resolve(i, &policy), ResolvedDisplayMode::Scrgb);
    }

    #[test]
    fn shim_promotes_fallback_tech() {
        let policy = FrameGenPolicy::default();
        let mut i = inputs(PREFERENCE_HDR10, FrameGenTech::Dlssg);
        assert_eq!(resolve(i, &policy), ResolvedDisplayMode::Hdr10);

        i.shim_active = true;
        assert_eq!(resolve(i, &policy), ResolvedDisplayMode::Scrgb);
    }

    #[test]
    fn frame_gen_demotes_scrgb_to_hdr10() {
        let policy = FrameGenPolicy::default();
        let i = inputs(PREFERENCE_SCRGB, FrameGenTech::Dlssg);
        assert_eq!(resolve(i, &policy), ResolvedDisplayMode::Hdr10);
    }

    #[test]
    fn shim_suppresses_demotion() {
        let policy = FrameGenPolicy::default();
        let mut i = inputs(PREFERENCE_SCRGB, FrameGenTech::Dlssg);
        i.shim_active = true;
        assert_eq!(resolve(i, &policy), ResolvedDisplayMode::Scrgb);
    }

    #[test]
    fn enforcement_suppresses_remapping() {
        let policy = FrameGenPolicy::default();
        let mut i = inputs(PREFERENCE_HDR10, FrameGenTech::Fsr3);
        i.enforce_user_mode = true;
        assert_eq!(resolve(i, &policy), ResolvedDisplayMode::Hdr10);
    }

    #[test]
    fn format_and_color_space_are_total() {
        use ResolvedDisplayMode::*;
        for mode in [ForcedSdr, Sdr, Hdr10, Scrgb] {
            match mode.buffer_format() {
                BufferFormat::Rgb10A2Unorm => assert!(!matches!(mode, ForcedSdr | Scrgb)),
                BufferFormat::Rgba16Float => assert!(matches!(mode, ForcedSdr | Scrgb)),
            }
        }
        assert_eq!(Sdr.color_space(), ColorSpace::SrgbG22);
        assert_eq!(Hdr10.color_space(), ColorSpace::HdrPq2020);
        assert_eq!(ForcedSdr.color_space(), ColorSpace::ScrgbLinear);
        assert_eq!(Scrgb.color_space(), ColorSpace::ScrgbLinear);
    }

    #[test]
    fn policy_round_trips_through_json() {
        let policy = FrameGenPolicy {
            scrgb_required: vec![FrameGenTech::Fsr3, FrameGenTech::Dlssg],
            hdr10_fallback: vec![],
            shim_promoted: vec![],
        };
        let json = serde_json::to_string(&policy).unwrap();
        let back: FrameGenPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back.scrgb_required.len(), 2);

        let i = inputs(PREFERENCE_HDR10, FrameGenTech::Dlssg);
        assert_eq!(resolve(i, &back), ResolvedDisplayMode::Scrgb);
    }
}
