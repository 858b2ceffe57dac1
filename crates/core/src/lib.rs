pub mod bridge;
pub mod constants;
pub mod display;
pub mod logger;
pub mod setting;
pub mod settings;
pub mod store;

pub use bridge::{Applied, BridgeEntry, MenuBridge, MenuValue};
pub use constants::{BuildContext, ConstantsPass, ShaderConstants};
pub use display::{
    BufferFormat, ColorSpace, FrameGenPolicy, FrameGenTech, ResolveInputs, ResolvedDisplayMode,
};
pub use setting::{ListSetting, Setting};
pub use settings::Settings;
pub use store::{ConfigStore, StoreError};
