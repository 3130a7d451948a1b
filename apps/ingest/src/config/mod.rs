#[allow(clippy::module_inception)]
mod config;

pub use config::{
    init_app_config, Branding, ConfigError, DefaultSheet, RadarConfig, DEFAULT_SHEETS_API_BASE,
    DEFAULT_TITLE,
};
