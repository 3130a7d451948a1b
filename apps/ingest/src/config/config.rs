use dotenv::dotenv;
use std::env;
use thiserror::Error;

use crate::domain::{DefaultQuadrant, DefaultRing};

pub const DEFAULT_TITLE: &str = "Company Tech Radar";
pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

const MAX_RINGS: usize = 4;
const REQUIRED_QUADRANTS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{variable} must be a JSON array of names: {reason}")]
    InvalidList { variable: &'static str, reason: String },
    #[error("Unexpected number of quadrants or rings. Please check in the configuration.")]
    UnexpectedTableSize { rings: usize, quadrants: usize },
}

/// Sheet to load when the locator carries no document id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultSheet {
    pub sheet_id: String,
    pub sheet_name: Option<String>,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branding {
    pub company_name: String,
    pub company_url: String,
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadarConfig {
    pub default_sheet: Option<DefaultSheet>,
    pub default_title: String,
    pub branding: Branding,
    pub rings: Vec<String>,
    pub quadrants: Vec<String>,
    /// Selects the configured assembly policy over the data-derived one.
    pub fixed_tables: bool,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub account: Option<String>,
    pub sheets_api_base: String,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            default_sheet: None,
            default_title: DEFAULT_TITLE.to_string(),
            branding: Branding {
                company_name: "Your Company".to_string(),
                company_url: "https://example.com".to_string(),
            },
            rings: DefaultRing::ALL
                .iter()
                .map(|ring| ring.label().to_string())
                .collect(),
            quadrants: DefaultQuadrant::ALL
                .iter()
                .map(|quadrant| quadrant.label().to_string())
                .collect(),
            fixed_tables: false,
            api_key: None,
            access_token: None,
            account: None,
            sheets_api_base: DEFAULT_SHEETS_API_BASE.to_string(),
        }
    }
}

impl RadarConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup. Empty
    /// values count as unset.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let default_title = var("DEFAULT_RADAR_TITLE").unwrap_or(defaults.default_title);
        let default_sheet = var("DEFAULT_RADAR_SHEET_ID")
            .or_else(|| var("DEFAULT_RADAR_SHEET_URL"))
            .map(|sheet_id| DefaultSheet {
                sheet_id,
                sheet_name: var("DEFAULT_RADAR_SHEET_NAME"),
                title: default_title.clone(),
            });

        let rings = match var("RINGS") {
            Some(raw) => parse_name_list("RINGS", &raw)?,
            None => defaults.rings,
        };
        let quadrants = match var("QUADRANTS") {
            Some(raw) => parse_name_list("QUADRANTS", &raw)?,
            None => defaults.quadrants,
        };

        Ok(Self {
            default_sheet,
            default_title,
            branding: Branding {
                company_name: var("COMPANY_NAME").unwrap_or(defaults.branding.company_name),
                company_url: var("COMPANY_URL").unwrap_or(defaults.branding.company_url),
            },
            rings,
            quadrants,
            fixed_tables: var("FIXED_RADAR_TABLES").is_some_and(|value| parse_flag(&value)),
            api_key: var("API_KEY"),
            access_token: var("GOOGLE_ACCESS_TOKEN"),
            account: var("GOOGLE_ACCOUNT"),
            sheets_api_base: var("SHEETS_API_BASE")
                .map_or(defaults.sheets_api_base, |base| {
                    base.trim_end_matches('/').to_string()
                }),
        })
    }

    /// Checks that the ring and quadrant tables can describe a radar:
    /// exactly four quadrants and between one and four rings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rings = self.rings.len();
        let quadrants = self.quadrants.len();
        if quadrants != REQUIRED_QUADRANTS || rings == 0 || rings > MAX_RINGS {
            return Err(ConfigError::UnexpectedTableSize { rings, quadrants });
        }
        Ok(())
    }
}

/// Loads `.env` if present and reads the configuration.
pub fn init_app_config() -> Result<RadarConfig, ConfigError> {
    // Load environment variables from .env file
    dotenv().ok();

    RadarConfig::from_env()
}

fn parse_name_list(variable: &'static str, raw: &str) -> Result<Vec<String>, ConfigError> {
    let names: Vec<String> =
        serde_json::from_str(raw).map_err(|error| ConfigError::InvalidList {
            variable,
            reason: error.to_string(),
        })?;
    Ok(names
        .into_iter()
        .map(|name| name.trim().to_string())
        .collect())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
