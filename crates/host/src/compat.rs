//! Companion and conflicting module detection.
//!
//! The plugin only works alongside the shader injector it ships with, and
//! refuses to run next to the older standalone HDR plugin it replaced. Both
//! checks go through `ModuleProbe` so the decision logic tests without a
//! process to inspect.

/// Asks the host process whether a module is currently loaded.
pub trait ModuleProbe {
    fn is_loaded(&self, module_name: &str) -> bool;
}

/// Probes the live process. Always answers `false` off Windows.
pub struct SystemModuleProbe;

impl ModuleProbe for SystemModuleProbe {
    #[cfg(windows)]
    fn is_loaded(&self, module_name: &str) -> bool {
        use windows::core::HSTRING;
        use windows::Win32::System::LibraryLoader::GetModuleHandleW;

        unsafe { GetModuleHandleW(&HSTRING::from(module_name)).is_ok() }
    }

    #[cfg(not(windows))]
    fn is_loaded(&self, _module_name: &str) -> bool {
        false
    }
}

/// Module names the startup checks look for.
#[derive(Debug, Clone)]
pub struct CompatPolicy {
    /// The retired standalone plugin this one supersedes. Running both
    /// corrupts the swap chain, so its presence aborts initialization.
    pub legacy_modules: Vec<&'static str>,
    /// The shader injector the GPU passes depend on. Any one match counts.
    pub companion_modules: Vec<&'static str>,
    /// The frame-generation interop shim that restores scRGB support.
    pub interop_shim_modules: Vec<&'static str>,
}

impl Default for CompatPolicy {
    fn default() -> Self {
        Self {
            legacy_modules: vec!["AutoHDRRetrofit.dll", "AutoHDRRetrofit.asi"],
            companion_modules: vec!["ShaderInjector.dll", "ShaderInjector.asi"],
            interop_shim_modules: vec!["FrameGenBridge.dll"],
        }
    }
}

impl CompatPolicy {
    /// First conflicting legacy module found, if any.
    pub fn find_legacy_module(&self, probe: &dyn ModuleProbe) -> Option<&'static str> {
        self.legacy_modules
            .iter()
            .copied()
            .find(|name| probe.is_loaded(name))
    }

    pub fn companion_present(&self, probe: &dyn ModuleProbe) -> bool {
        self.companion_modules
            .iter()
            .any(|name| probe.is_loaded(name))
    }

    pub fn interop_shim_present(&self, probe: &dyn ModuleProbe) -> bool {
        self.interop_shim_modules
            .iter()
            .any(|name| probe.is_loaded(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProbe(Vec<&'static str>);

    impl ModuleProbe for FixedProbe {
        fn is_loaded(&self, module_name: &str) -> bool {
            self.0.contains(&module_name)
        }
    }

    #[test]
    fn legacy_module_is_reported_by_name() {
        let policy = CompatPolicy::default();
        let probe = FixedProbe(vec!["ShaderInjector.dll", "AutoHDRRetrofit.asi"]);

        assert_eq!(
            policy.find_legacy_module(&probe),
            Some("AutoHDRRetrofit.asi")
        );
    }

    #[test]
    fn any_companion_variant_satisfies_the_check() {
        let policy = CompatPolicy::default();

        assert!(policy.companion_present(&FixedProbe(vec!["ShaderInjector.asi"])));
        assert!(!policy.companion_present(&FixedProbe(vec![])));
    }

    #[test]
    fn shim_detection_is_independent_of_the_other_checks() {
        let policy = CompatPolicy::default();
        let probe = FixedProbe(vec!["FrameGenBridge.dll"]);

        assert!(policy.interop_shim_present(&probe));
        assert!(!policy.companion_present(&probe));
        assert_eq!(policy.find_legacy_module(&probe), None);
    }
}
