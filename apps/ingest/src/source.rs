//! Decides which loader a locator needs. Never touches the network.

use reqwest::Url;
use serde::Serialize;
use std::fmt;

use crate::config::RadarConfig;

pub const DOCUMENT_ID_PARAM: &str = "documentId";
pub const SHEET_ID_PARAM: &str = "sheetId";
pub const SHEET_NAME_PARAM: &str = "sheetName";

const GOOGLE_DOMAIN: &str = "google.com";
const DATA_EXTENSIONS: [&str; 2] = [".csv", ".json"];
/// Placeholder origin for parsing bare query strings.
const LOCATOR_BASE: &str = "http://locator.invalid/";
const SHEETS_URL_PREFIX: &str = "https://docs.google.com/spreadsheets/d/";

/// Source tag carried by classified errors to pick user-facing copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Csv,
    Json,
    Sheet,
}

impl SourceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Sheet => "sheet",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The parameters read from the page query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locator {
    document_id: Option<String>,
    sheet_name: Option<String>,
}

impl Locator {
    pub fn new(document_id: Option<String>, sheet_name: Option<String>) -> Self {
        Self {
            document_id: document_id.filter(|id| !id.trim().is_empty()),
            sheet_name: sheet_name.filter(|name| !name.trim().is_empty()),
        }
    }

    /// Accepts a page URL, a bare query string, or a bare document
    /// reference (which becomes the id parameter).
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() {
            return Self::default();
        }

        let has_params = [DOCUMENT_ID_PARAM, SHEET_ID_PARAM]
            .iter()
            .any(|param| input.contains(&format!("{param}=")));
        if !has_params {
            return Self::new(Some(input.to_string()), None);
        }

        let query = input.split_once('?').map_or(input, |(_, query)| query);
        let Some(url) = query_url(query) else {
            return Self::default();
        };

        let mut document_id = None;
        let mut sheet_id = None;
        let mut sheet_name = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                DOCUMENT_ID_PARAM => document_id = Some(value.into_owned()),
                SHEET_ID_PARAM => sheet_id = Some(value.into_owned()),
                SHEET_NAME_PARAM => sheet_name = Some(value.into_owned()),
                _ => {}
            }
        }

        Self::new(document_id.or(sheet_id), sheet_name)
    }

    #[must_use]
    pub fn with_sheet_name(mut self, sheet_name: Option<String>) -> Self {
        if let Some(name) = sheet_name.filter(|name| !name.trim().is_empty()) {
            self.sheet_name = Some(name);
        }
        self
    }

    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    pub fn sheet_name(&self) -> Option<&str> {
        self.sheet_name.as_deref()
    }
}

/// A Google Sheets document plus an optional tab selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetReference {
    reference: String,
    sheet_name: Option<String>,
}

impl SheetReference {
    pub fn new(reference: impl Into<String>, sheet_name: Option<String>) -> Self {
        Self {
            reference: reference.into(),
            sheet_name,
        }
    }

    /// The spreadsheet id, whether the reference was a full URL or the id.
    pub fn id(&self) -> &str {
        self.reference
            .strip_prefix(SHEETS_URL_PREFIX)
            .map_or(self.reference.as_str(), |rest| {
                rest.split(['/', '?']).next().unwrap_or(rest)
            })
    }

    pub fn sheet_name(&self) -> Option<&str> {
        self.sheet_name.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedSource {
    Csv { url: String },
    Json { url: String },
    GoogleSheet(SheetReference),
    ConfiguredDefault { sheet: SheetReference, title: String },
    None { title: String },
}

impl ResolvedSource {
    pub const fn source_kind(&self) -> Option<SourceKind> {
        match self {
            Self::Csv { .. } => Some(SourceKind::Csv),
            Self::Json { .. } => Some(SourceKind::Json),
            Self::GoogleSheet(_) | Self::ConfiguredDefault { .. } => Some(SourceKind::Sheet),
            Self::None { .. } => None,
        }
    }
}

/// Picks the source for a locator; the first matching rule wins.
pub fn resolve(locator: &Locator, config: &RadarConfig) -> ResolvedSource {
    if let Some(id) = locator.document_id() {
        let lowered = id.to_ascii_lowercase();
        if lowered.ends_with(".csv") {
            return ResolvedSource::Csv { url: id.to_string() };
        }
        if lowered.ends_with(".json") {
            return ResolvedSource::Json { url: id.to_string() };
        }
        let on_google = domain_name(id)
            .is_some_and(|domain| domain.to_ascii_lowercase().ends_with(GOOGLE_DOMAIN));
        if on_google {
            return ResolvedSource::GoogleSheet(SheetReference::new(
                id,
                locator.sheet_name().map(str::to_string),
            ));
        }
    } else if let Some(default) = &config.default_sheet {
        return ResolvedSource::ConfiguredDefault {
            sheet: SheetReference::new(default.sheet_id.clone(), default.sheet_name.clone()),
            title: default.title.clone(),
        };
    }

    ResolvedSource::None {
        title: config.default_title.clone(),
    }
}

/// Host part of a `scheme://host/...` reference, percent-encoded or not.
pub fn domain_name(reference: &str) -> Option<String> {
    Url::parse(reference)
        .or_else(|_| Url::parse(&form_decode(reference)))
        .ok()?
        .host_str()
        .map(str::to_string)
}

/// Last path segment of a URL, decoded, with a `.csv`/`.json` extension
/// removed.
pub fn file_title(url: &str) -> String {
    let segment = Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| url.rsplit(['/', '\\']).next().unwrap_or(url).to_string());
    let decoded = form_decode(&segment);
    strip_data_extension(&decoded).to_string()
}

pub fn strip_data_extension(title: &str) -> &str {
    DATA_EXTENSIONS
        .iter()
        .find_map(|extension| {
            let cut = title.len().checked_sub(extension.len())?;
            let suffix = title.get(cut..)?;
            suffix.eq_ignore_ascii_case(extension).then(|| &title[..cut])
        })
        .unwrap_or(title)
}

fn query_url(query: &str) -> Option<Url> {
    Url::parse(LOCATOR_BASE).ok()?.join(&format!("?{query}")).ok()
}

/// Form-style decoding of a single component: `+` is a space, `%XX` a byte.
fn form_decode(raw: &str) -> String {
    let escaped = raw
        .replace('&', "%26")
        .replace('=', "%3D")
        .replace('#', "%23");
    query_url(&escaped)
        .and_then(|url| url.query_pairs().next().map(|(key, _)| key.into_owned()))
        .unwrap_or_else(|| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultSheet;

    fn config() -> RadarConfig {
        RadarConfig::default()
    }

    #[test]
    fn csv_and_json_extensions_are_case_insensitive() {
        let csv = Locator::parse("documentId=https%3A%2F%2Fexample.com%2Fradar.CSV");
        assert_eq!(
            resolve(&csv, &config()),
            ResolvedSource::Csv {
                url: "https://example.com/radar.CSV".to_string()
            }
        );

        let json = Locator::parse("https://radar.example.com/?documentId=https://example.com/data.Json");
        assert!(matches!(resolve(&json, &config()), ResolvedSource::Json { .. }));
    }

    #[test]
    fn google_sheet_reads_the_tab_selector() {
        let locator = Locator::parse(
            "?sheetId=https%3A%2F%2Fdocs.google.com%2Fspreadsheets%2Fd%2Fabc123%2Fedit&sheetName=Q3+2024",
        );
        match resolve(&locator, &config()) {
            ResolvedSource::GoogleSheet(sheet) => {
                assert_eq!(sheet.id(), "abc123");
                assert_eq!(sheet.sheet_name(), Some("Q3 2024"));
            }
            other => panic!("expected a google sheet, got {other:?}"),
        }
    }

    #[test]
    fn extension_wins_over_google_domain() {
        let locator = Locator::parse("documentId=https://docs.google.com/files/radar.csv");
        assert!(matches!(resolve(&locator, &config()), ResolvedSource::Csv { .. }));
    }

    #[test]
    fn missing_id_uses_the_configured_default_sheet() {
        let mut config = config();
        config.default_sheet = Some(DefaultSheet {
            sheet_id: "default-id".to_string(),
            sheet_name: Some("Current".to_string()),
            title: "Platform Radar".to_string(),
        });

        match resolve(&Locator::default(), &config) {
            ResolvedSource::ConfiguredDefault { sheet, title } => {
                assert_eq!(sheet.id(), "default-id");
                assert_eq!(sheet.sheet_name(), Some("Current"));
                assert_eq!(title, "Platform Radar");
            }
            other => panic!("expected the default sheet, got {other:?}"),
        }
    }

    #[test]
    fn unknown_id_does_not_fall_back_to_the_default_sheet() {
        let mut config = config();
        config.default_sheet = Some(DefaultSheet {
            sheet_id: "default-id".to_string(),
            sheet_name: None,
            title: "Platform Radar".to_string(),
        });

        let locator = Locator::parse("documentId=https://example.com/radar.xlsx");
        assert_eq!(
            resolve(&locator, &config),
            ResolvedSource::None {
                title: config.default_title.clone()
            }
        );
    }

    #[test]
    fn bare_reference_becomes_the_document_id() {
        let locator = Locator::parse("  https://example.com/radar.json ");
        assert_eq!(locator.document_id(), Some("https://example.com/radar.json"));
        assert_eq!(locator.sheet_name(), None);
    }

    #[test]
    fn sheet_reference_accepts_urls_and_ids() {
        let from_url = SheetReference::new("https://docs.google.com/spreadsheets/d/xyz/edit#gid=0", None);
        let from_query = SheetReference::new("https://docs.google.com/spreadsheets/d/xyz?usp=sharing", None);
        let bare = SheetReference::new("xyz", None);
        assert_eq!(from_url.id(), "xyz");
        assert_eq!(from_query.id(), "xyz");
        assert_eq!(bare.id(), "xyz");
    }

    #[test]
    fn file_title_strips_extension_and_decodes() {
        assert_eq!(file_title("https://example.com/data/My+Radar.csv"), "My Radar");
        assert_eq!(file_title("https://example.com/tech%20radar.json"), "tech radar");
        assert_eq!(file_title("radar"), "radar");
        assert_eq!(file_title("https://example.com/export/radar.csv?dl=1"), "radar");
    }

    #[test]
    fn title_extension_is_stripped_whatever_its_case() {
        assert_eq!(file_title("https://example.com/radar.CSV"), "radar");
        assert_eq!(file_title("https://example.com/Team%20Radar.Json"), "Team Radar");
        assert_eq!(strip_data_extension("notes.csv.bak"), "notes.csv.bak");
    }

    #[test]
    fn locator_keeps_invalid_escapes_and_ignores_fragments() {
        let locator = Locator::parse("?documentId=100%25+sure.csv&sheetName=%zz%41#top");
        assert_eq!(locator.document_id(), Some("100% sure.csv"));
        assert_eq!(locator.sheet_name(), Some("%zzA"));
    }

    #[test]
    fn domain_name_reads_plain_and_encoded_references() {
        assert_eq!(
            domain_name("https://docs.google.com/spreadsheets/d/abc").as_deref(),
            Some("docs.google.com")
        );
        assert_eq!(
            domain_name("https%3A%2F%2Fdocs.google.com%2Fspreadsheets").as_deref(),
            Some("docs.google.com")
        );
        assert_eq!(domain_name("abc123"), None);
    }
}
