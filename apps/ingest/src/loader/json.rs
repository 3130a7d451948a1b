use serde_json::Value;

use crate::domain::{ColumnSet, RadarMetadata, RawRow};
use crate::error::LoadFailure;
use crate::net::{FetchRequest, Fetcher};
use crate::sanitize::RowSanitizer;
use crate::source::{file_title, SourceKind};
use crate::validate::{ContentValidator, ValidationError};

use super::{sample_json, LoadedDocument};

pub const JSON_SHEET_LABEL: &str = "JSON File";

/// Loads a radar from a URL serving a JSON array of objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonLoader {
    url: String,
}

impl JsonLoader {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub async fn build(&self, fetcher: &dyn Fetcher) -> Result<LoadedDocument, LoadFailure> {
        let response = fetcher.fetch(&FetchRequest::get(&self.url)).await?;
        if !response.is_success() {
            return Err(LoadFailure::Status {
                url: self.url.clone(),
                status: response.status,
            });
        }

        let document: Value =
            serde_json::from_str(&response.body).map_err(|error| LoadFailure::Parse {
                what: "JSON",
                reason: error.to_string(),
            })?;
        let rows = json_rows(&document)?;
        let columns = rows.first().map(ColumnSet::from_row).unwrap_or_default();

        ContentValidator::new(&columns)
            .verify()
            .map_err(|error| LoadFailure::Structure {
                error,
                headers: columns.names().to_vec(),
                sample: sample_json(&rows),
            })?;

        let sanitizer = RowSanitizer::new();
        let records = rows.iter().map(|row| sanitizer.sanitize(row)).collect();

        Ok(LoadedDocument {
            records,
            metadata: RadarMetadata {
                title: file_title(&self.url),
                current_sheet: JSON_SHEET_LABEL.to_string(),
                alternatives: Vec::new(),
            },
            source_kind: SourceKind::Json,
        })
    }
}

/// Flattens an array of objects into rows. Anything other than an array
/// whose first element is an object is a structural error.
pub fn json_rows(document: &Value) -> Result<Vec<RawRow>, LoadFailure> {
    let structure_error = || LoadFailure::Structure {
        error: ValidationError::MissingContent,
        headers: Vec::new(),
        sample: document.to_string().chars().take(200).collect(),
    };

    let items = document.as_array().ok_or_else(structure_error)?;
    if !items.first().is_some_and(Value::is_object) {
        return Err(structure_error());
    }

    Ok(items
        .iter()
        .map(|item| {
            item.as_object()
                .map(|object| {
                    object
                        .iter()
                        .map(|(key, value)| (key.as_str(), cell_text(value)))
                        .collect::<RawRow>()
                })
                .unwrap_or_default()
        })
        .collect())
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
