use crate::domain::{ColumnSet, RadarMetadata, RawRow};
use crate::error::LoadFailure;
use crate::net::{FetchRequest, Fetcher};
use crate::sanitize::RowSanitizer;
use crate::source::{file_title, SourceKind};
use crate::validate::ContentValidator;

use super::{sample_json, LoadedDocument};

pub const CSV_SHEET_LABEL: &str = "CSV File";

/// Loads a radar from a CSV URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvLoader {
    url: String,
    title: Option<String>,
}

impl CsvLoader {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
        }
    }

    /// Overrides the title otherwise taken from the file name.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub async fn build(&self, fetcher: &dyn Fetcher) -> Result<LoadedDocument, LoadFailure> {
        let response = fetcher.fetch(&FetchRequest::get(&self.url)).await?;
        if !response.is_success() {
            return Err(LoadFailure::Status {
                url: self.url.clone(),
                status: response.status,
            });
        }

        let rows = repair_headers(parse_rows(&response.body)?);
        let columns = rows.first().map(ColumnSet::from_row).unwrap_or_default();
        let sample = sample_json(&rows);
        log::debug!("parsed CSV columns: {:?}", columns.names());
        log::debug!("parsed CSV first rows sample: {sample}");

        ContentValidator::new(&columns)
            .verify()
            .map_err(|error| LoadFailure::Structure {
                error,
                headers: columns.names().to_vec(),
                sample,
            })?;

        let sanitizer = RowSanitizer::new();
        let records = rows.iter().map(|row| sanitizer.sanitize(row)).collect();

        Ok(LoadedDocument {
            records,
            metadata: RadarMetadata {
                title: self.title.clone().unwrap_or_else(|| file_title(&self.url)),
                current_sheet: CSV_SHEET_LABEL.to_string(),
                alternatives: Vec::new(),
            },
            source_kind: SourceKind::Csv,
        })
    }
}

/// Parses a CSV body into rows keyed by the header line. Short records are
/// padded with empty cells.
pub fn parse_rows(body: &str) -> Result<Vec<RawRow>, LoadFailure> {
    let body = body.strip_prefix('\u{feff}').unwrap_or(body);
    let parse_error = |error: ::csv::Error| LoadFailure::Parse {
        what: "CSV",
        reason: error.to_string(),
    };

    let mut reader = ::csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes());
    let headers = reader.headers().map_err(parse_error)?.clone();

    let mut rows: Vec<RawRow> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(parse_error)?;
        rows.push(
            headers
                .iter()
                .enumerate()
                .map(|(index, header)| (header, record.get(index).unwrap_or_default()))
                .collect(),
        );
    }
    Ok(rows)
}

/// Renames an escaped or stray-punctuation first-row key to `name` when the
/// document has no usable `name` column.
pub fn repair_headers(mut rows: Vec<RawRow>) -> Vec<RawRow> {
    let Some(first) = rows.first() else {
        return rows;
    };
    if first.get("name").is_some_and(|name| !name.is_empty()) {
        return rows;
    }
    let Some(bad_key) = first.keys().find(|key| is_malformed_key(key)).map(str::to_string) else {
        return rows;
    };

    log::debug!("renaming malformed CSV header {bad_key:?} to \"name\"");
    for row in &mut rows {
        row.rename_key(&bad_key, "name");
    }
    rows
}

fn is_malformed_key(key: &str) -> bool {
    key == "\\"
        || key == "\\\\"
        || (key.chars().count() <= 2 && key.contains(['\\', '/', '"', '\'', '`']))
}
