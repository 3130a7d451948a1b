//! Per-source document loaders behind one tagged union.

pub mod csv;
pub mod json;
pub mod sheet;

pub use self::csv::{CsvLoader, CSV_SHEET_LABEL};
pub use self::json::{JsonLoader, JSON_SHEET_LABEL};
pub use self::sheet::SheetLoader;

use crate::auth::{AuthSession, ConsentProvider};
use crate::config::RadarConfig;
use crate::domain::{CanonicalBlipRecord, RadarMetadata, RawRow};
use crate::error::{classify, ClassifiedError};
use crate::net::Fetcher;
use crate::presenter::{Phase, Presenter};
use crate::source::{ResolvedSource, SourceKind};

const SAMPLE_ROWS: usize = 3;

/// What a loader needs from the pipeline for one load.
pub struct LoadContext<'a> {
    pub fetcher: &'a dyn Fetcher,
    pub consent: &'a dyn ConsentProvider,
    pub session: &'a mut AuthSession,
    pub config: &'a RadarConfig,
}

/// Sanitized records plus metadata, ready for assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub records: Vec<CanonicalBlipRecord>,
    pub metadata: RadarMetadata,
    /// The protocol actually used; a sheet read through its CSV export
    /// reports `Csv`.
    pub source_kind: SourceKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loader {
    Csv(CsvLoader),
    Json(JsonLoader),
    Sheet(SheetLoader),
}

impl Loader {
    /// `None` when the source needs user input instead of a load.
    pub fn for_source(source: &ResolvedSource) -> Option<Self> {
        match source {
            ResolvedSource::Csv { url } => Some(Self::Csv(CsvLoader::new(url.clone()))),
            ResolvedSource::Json { url } => Some(Self::Json(JsonLoader::new(url.clone()))),
            ResolvedSource::GoogleSheet(sheet) => {
                Some(Self::Sheet(SheetLoader::new(sheet.clone(), None)))
            }
            ResolvedSource::ConfiguredDefault { sheet, title } => Some(Self::Sheet(
                SheetLoader::new(sheet.clone(), Some(title.clone())),
            )),
            ResolvedSource::None { .. } => None,
        }
    }

    pub const fn source_kind(&self) -> SourceKind {
        match self {
            Self::Csv(_) => SourceKind::Csv,
            Self::Json(_) => SourceKind::Json,
            Self::Sheet(_) => SourceKind::Sheet,
        }
    }

    /// Signals the loading phase. No I/O.
    pub fn init(&self, presenter: &mut dyn Presenter) {
        log::debug!("loading {} source", self.source_kind());
        presenter.phase(Phase::Loading);
    }

    /// Fetches, validates and sanitizes the document. Every failure comes
    /// back classified.
    pub async fn build(&self, ctx: &mut LoadContext<'_>) -> Result<LoadedDocument, ClassifiedError> {
        match self {
            Self::Csv(loader) => loader
                .build(ctx.fetcher)
                .await
                .map_err(|failure| classify(&failure, SourceKind::Csv)),
            Self::Json(loader) => loader
                .build(ctx.fetcher)
                .await
                .map_err(|failure| classify(&failure, SourceKind::Json)),
            Self::Sheet(loader) => loader.build(ctx).await,
        }
    }
}

pub(crate) fn sample_json(rows: &[RawRow]) -> String {
    let sample = &rows[..rows.len().min(SAMPLE_ROWS)];
    serde_json::to_string(sample).unwrap_or_default()
}
