use reqwest::Url;
use serde::Deserialize;

use crate::auth::{AuthError, AuthFlow};
use crate::domain::{ColumnSet, RadarMetadata};
use crate::error::{classify, ClassifiedError, LoadFailure};
use crate::net::{FetchError, FetchRequest};
use crate::sanitize::RowSanitizer;
use crate::source::{SheetReference, SourceKind};
use crate::validate::ContentValidator;

use super::csv::CsvLoader;
use super::{LoadContext, LoadedDocument};

pub const SHEETS_EXPORT_BASE: &str = "https://docs.google.com/spreadsheets/d/";

#[derive(Debug, Default, Deserialize)]
struct Spreadsheet {
    #[serde(default)]
    properties: SpreadsheetProperties,
    #[serde(default)]
    sheets: Vec<Tab>,
}

#[derive(Debug, Default, Deserialize)]
struct SpreadsheetProperties {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct Tab {
    properties: SpreadsheetProperties,
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Loads a radar from a Google Sheet, escalating authorization for private
/// documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLoader {
    sheet: SheetReference,
    title: Option<String>,
}

impl SheetLoader {
    /// `title` replaces the document title (configured default sheets).
    pub const fn new(sheet: SheetReference, title: Option<String>) -> Self {
        Self { sheet, title }
    }

    pub async fn build(&self, ctx: &mut LoadContext<'_>) -> Result<LoadedDocument, ClassifiedError> {
        if ctx.config.api_key.is_none() {
            log::info!(
                "no API key configured, loading sheet {} through its CSV export",
                self.sheet.id()
            );
            return self.build_from_export(ctx).await;
        }
        self.authenticate(false, ctx).await
    }

    /// Runs the authorization flow and loads the selected tab. `force` goes
    /// straight to interactive consent (switch account).
    pub async fn authenticate(
        &self,
        force: bool,
        ctx: &mut LoadContext<'_>,
    ) -> Result<LoadedDocument, ClassifiedError> {
        match self.load_protected(force, ctx).await {
            Ok(document) => Ok(document),
            Err(failure) => {
                let classified = classify(&failure, SourceKind::Sheet);
                let account = classified
                    .is_unauthorized()
                    .then(|| ctx.consent.account())
                    .flatten();
                Err(classified.with_account(account))
            }
        }
    }

    async fn build_from_export(&self, ctx: &LoadContext<'_>) -> Result<LoadedDocument, ClassifiedError> {
        let classify_csv = |failure: LoadFailure| classify(&failure, SourceKind::Csv);
        let url = export_url(self.sheet.id(), self.sheet.sheet_name())
            .map_err(|error| classify_csv(error.into()))?;
        let title = self
            .title
            .clone()
            .unwrap_or_else(|| ctx.config.default_title.clone());

        CsvLoader::new(url)
            .with_title(title)
            .build(ctx.fetcher)
            .await
            .map_err(classify_csv)
    }

    async fn load_protected(
        &self,
        force: bool,
        ctx: &mut LoadContext<'_>,
    ) -> Result<LoadedDocument, LoadFailure> {
        let base = ctx.config.sheets_api_base.as_str();
        let api_key = ctx.config.api_key.as_deref();
        let id = self.sheet.id();

        let metadata_url = spreadsheet_url(base, id, api_key)?;
        let mut flow = AuthFlow::new(ctx.fetcher, ctx.consent);
        let access = flow.access(&mut *ctx.session, &metadata_url, force).await?;
        if !access.response.is_success() {
            return Err(LoadFailure::Status {
                url: metadata_url,
                status: access.response.status,
            });
        }

        let spreadsheet: Spreadsheet =
            serde_json::from_str(&access.response.body).map_err(|error| LoadFailure::Parse {
                what: "spreadsheet metadata",
                reason: error.to_string(),
            })?;
        let tabs: Vec<String> = spreadsheet
            .sheets
            .into_iter()
            .map(|tab| tab.properties.title)
            .collect();
        let current = self
            .sheet
            .sheet_name()
            .map(str::to_string)
            .or_else(|| tabs.first().cloned())
            .ok_or_else(|| LoadFailure::Parse {
                what: "spreadsheet metadata",
                reason: "the document has no tabs".to_string(),
            })?;

        let range_url = values_url(base, id, &current, api_key)?;
        let response = ctx
            .fetcher
            .fetch(&FetchRequest::get(&range_url).with_bearer(access.token))
            .await?;
        if response.is_forbidden() {
            return Err(AuthError::Denied.into());
        }
        if !response.is_success() {
            return Err(LoadFailure::Status {
                url: range_url,
                status: response.status,
            });
        }

        let range: ValueRange =
            serde_json::from_str(&response.body).map_err(|error| LoadFailure::Parse {
                what: "sheet values",
                reason: error.to_string(),
            })?;
        let mut values = range.values.into_iter();
        let header = values.next().unwrap_or_default();
        let rows: Vec<Vec<String>> = values
            .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
            .collect();

        ContentValidator::new(&ColumnSet::from(header.clone()))
            .verify()
            .map_err(|error| LoadFailure::Structure {
                error,
                headers: header.clone(),
                sample: serde_json::to_string(&rows[..rows.len().min(3)]).unwrap_or_default(),
            })?;

        let sanitizer = RowSanitizer::new();
        let records = rows
            .iter()
            .map(|row| sanitizer.sanitize_for_protected_sheet(row, &header))
            .collect();
        let alternatives = tabs.into_iter().filter(|tab| *tab != current).collect();

        Ok(LoadedDocument {
            records,
            metadata: RadarMetadata {
                title: self
                    .title
                    .clone()
                    .unwrap_or(spreadsheet.properties.title),
                current_sheet: current,
                alternatives,
            },
            source_kind: SourceKind::Sheet,
        })
    }
}

fn invalid_url(url: &str, reason: impl ToString) -> FetchError {
    FetchError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

fn api_url(base: &str, segments: &[&str], api_key: Option<&str>) -> Result<String, FetchError> {
    let mut url = Url::parse(base).map_err(|error| invalid_url(base, error))?;
    url.path_segments_mut()
        .map_err(|()| invalid_url(base, "cannot be a base"))?
        .pop_if_empty()
        .extend(segments);
    if let Some(key) = api_key {
        url.query_pairs_mut().append_pair("key", key);
    }
    Ok(url.into())
}

/// Spreadsheet metadata endpoint (title and tab names).
pub fn spreadsheet_url(base: &str, id: &str, api_key: Option<&str>) -> Result<String, FetchError> {
    api_url(base, &["v4", "spreadsheets", id], api_key)
}

/// Cell values of one tab.
pub fn values_url(
    base: &str,
    id: &str,
    range: &str,
    api_key: Option<&str>,
) -> Result<String, FetchError> {
    api_url(base, &["v4", "spreadsheets", id, "values", range], api_key)
}

/// Public CSV export: the first tab, or the named one through the
/// visualization endpoint.
pub fn export_url(id: &str, sheet_name: Option<&str>) -> Result<String, FetchError> {
    let mut url = Url::parse(SHEETS_EXPORT_BASE).map_err(|error| invalid_url(SHEETS_EXPORT_BASE, error))?;
    let segments: &[&str] = if sheet_name.is_some() {
        &[id, "gviz", "tq"]
    } else {
        &[id, "export"]
    };
    url.path_segments_mut()
        .map_err(|()| invalid_url(SHEETS_EXPORT_BASE, "cannot be a base"))?
        .pop_if_empty()
        .extend(segments);

    match sheet_name {
        Some(name) => {
            url.query_pairs_mut()
                .append_pair("tqx", "out:csv")
                .append_pair("sheet", name);
        }
        None => {
            url.query_pairs_mut()
                .append_pair("format", "csv")
                .append_pair("gid", "0");
        }
    }
    Ok(url.into())
}
