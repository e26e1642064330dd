//! # podium-settings
//!
//! Layered configuration for the podium server.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`PodiumSettings::default()`]
//! 2. **Settings file**: `~/.podium/settings.json` or an explicit path (deep-merged over defaults)
//! 3. **Environment variables**: `PODIUM_*` overrides (highest priority)
//!
//! Command-line flags are applied on top by the binary.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    deep_merge, load_settings, load_settings_from_path, load_settings_with_env, settings_path,
};
pub use types::*;
