//! Configuration file loading for webpilot
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `--config <path>` specified file
//! 2. Project root: `./webpilot.toml` or `./.webpilot.toml`
//! 3. XDG config: `$XDG_CONFIG_HOME/webpilot/config.toml`
//! 4. Fallback: `~/.config/webpilot/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileBrowserConfig, FileConfig, FileEngineConfig, FileLoggingConfig,
    FileModelsConfig, FileVariableConfig, FileViewportConfig,
};
pub use loader::ConfigLoader;
