//! Host-side integration: display probing, swap-chain control and the
//! runtime that wires the core settings machinery into a live renderer.

pub mod compat;
pub mod hdr;
pub mod runtime;
pub mod surface;
pub mod swapchain;

pub use compat::{CompatPolicy, ModuleProbe, SystemModuleProbe};
pub use hdr::{HdrCapabilityState, HdrMonitor};
pub use runtime::{Runtime, HOST_GAMMA};
pub use surface::{DisplaySurface, NullSurface};
pub use swapchain::{SwapchainSynchronizer, SwapchainTarget};

#[cfg(windows)]
pub use surface::DxgiSurface;

use lumenshift_core::ConfigStore;

/// Start the session log under the plugin data directory.
pub fn init_logging(retention_count: usize) -> anyhow::Result<()> {
    let log_dir = ConfigStore::default_data_dir()?.join("logs");
    lumenshift_core::logger::init_logger(log_dir, "lumenshift", retention_count)
}
