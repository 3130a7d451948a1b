use clap::Parser;

use tech_radar_ingest::Locator;

#[derive(Debug, Parser)]
#[command(
    name = "tech-radar-ingest",
    version,
    about = "Load a tech radar from a CSV file, a JSON file or a Google Sheet"
)]
pub struct CliArgs {
    /// Page URL, query string or document reference
    #[arg(value_name = "LOCATOR")]
    pub locator: Option<String>,

    /// Tab to load from a Google Sheet
    #[arg(long = "sheet-name", value_name = "NAME")]
    pub sheet_name: Option<String>,

    /// Print the radar as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Override the Google Sheets API key
    #[arg(long = "api-key", value_name = "KEY")]
    pub api_key: Option<String>,

    /// Use the configured rings and quadrants instead of deriving them
    #[arg(long = "fixed-tables")]
    pub fixed_tables: bool,

    /// Never ask for consent or offer to switch account
    #[arg(long = "no-prompt")]
    pub no_prompt: bool,
}

impl CliArgs {
    pub fn apply_env_overrides(&self) {
        if let Some(key) = &self.api_key {
            std::env::set_var("API_KEY", key);
        }
        if self.fixed_tables {
            std::env::set_var("FIXED_RADAR_TABLES", "1");
        }
    }

    pub fn locator(&self) -> Locator {
        self.locator
            .as_deref()
            .map(Locator::parse)
            .unwrap_or_default()
            .with_sheet_name(self.sheet_name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_name_flag_overrides_the_query_string() -> Result<(), Box<dyn std::error::Error>> {
        let args = CliArgs::try_parse_from([
            "tech-radar-ingest",
            "?sheetId=https://docs.google.com/spreadsheets/d/abc&sheetName=Old",
            "--sheet-name",
            "New",
        ])?;
        let locator = args.locator();
        assert_eq!(locator.sheet_name(), Some("New"));
        assert_eq!(
            locator.document_id(),
            Some("https://docs.google.com/spreadsheets/d/abc")
        );
        Ok(())
    }

    #[test]
    fn no_locator_is_empty() -> Result<(), Box<dyn std::error::Error>> {
        let args = CliArgs::try_parse_from(["tech-radar-ingest", "--json"])?;
        assert!(args.json);
        assert_eq!(args.locator(), Locator::default());
        Ok(())
    }
}
