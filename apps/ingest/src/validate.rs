use thiserror::Error;

use crate::domain::ColumnSet;

/// Columns every radar document must carry.
pub const REQUIRED_HEADERS: [&str; 5] = ["name", "ring", "quadrant", "isNew", "description"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Document is missing content.")]
    MissingContent,
    #[error(
        "Document is missing one or more required headers or they are misspelled. \
         Check that your document contains headers for \"name\", \"ring\", \"quadrant\", \"isNew\", \"description\"."
    )]
    MissingHeaders { missing: Vec<String> },
}

/// Structural checks on the column names of a document, run once per load
/// before any row is sanitized.
#[derive(Debug, Clone)]
pub struct ContentValidator {
    columns: Vec<String>,
}

impl ContentValidator {
    pub fn new(columns: &ColumnSet) -> Self {
        Self {
            columns: columns
                .names()
                .iter()
                .map(|name| name.trim().to_string())
                .collect(),
        }
    }

    pub fn verify_content(&self) -> Result<(), ValidationError> {
        if self.columns.is_empty() {
            return Err(ValidationError::MissingContent);
        }
        Ok(())
    }

    pub fn verify_headers(&self) -> Result<(), ValidationError> {
        let missing: Vec<String> = REQUIRED_HEADERS
            .iter()
            .filter(|header| !self.columns.iter().any(|column| column == *header))
            .map(|header| (*header).to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingHeaders { missing })
        }
    }

    pub fn verify(&self) -> Result<(), ValidationError> {
        self.verify_content()?;
        self.verify_headers()
    }
}
