//! Builds the radar model from sanitized records.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use crate::config::RadarConfig;
use crate::domain::{Blip, CanonicalBlipRecord, Quadrant, Radar, RadarMetadata, Ring};

pub const MAX_RINGS: usize = 4;
pub const MAX_QUADRANTS: usize = 4;

const CONJUNCTION_PATTERN: &str = r"(-|\s+)(and)(-|\s+)|\s*(&)\s*";

static CONJUNCTION: OnceLock<Option<Regex>> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    #[error("More than 4 rings.")]
    TooManyRings,
    #[error(
        "There are more than 4 quadrant names listed in your data. Check the quadrant column for errors."
    )]
    TooManyQuadrants,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedTables {
    pub rings: Vec<String>,
    pub quadrants: Vec<String>,
}

/// How rings and quadrants are obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyPolicy {
    /// Derived from the data in first-seen order; a fifth ring is an error.
    Legacy,
    /// Fixed by configuration; blips that match neither table are dropped.
    Configured(FixedTables),
}

impl AssemblyPolicy {
    pub fn from_config(config: &RadarConfig) -> Self {
        if config.fixed_tables {
            Self::Configured(FixedTables {
                rings: config.rings.clone(),
                quadrants: config.quadrants.clone(),
            })
        } else {
            Self::Legacy
        }
    }

    pub fn tables(
        &self,
        records: &[CanonicalBlipRecord],
    ) -> Result<(RingTable, QuadrantTable), AssemblyError> {
        match self {
            Self::Legacy => derive_tables(records),
            Self::Configured(tables) => Ok((
                LabelTable::normalized(tables.rings.iter().cloned()),
                LabelTable::normalized(tables.quadrants.iter().cloned()),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Matching {
    Exact,
    Normalized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Label {
    key: String,
    display: String,
}

/// Ordered names plus the rule used to match blip labels against them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<Label>,
    matching: Matching,
}

pub type RingTable = LabelTable;
pub type QuadrantTable = LabelTable;

impl LabelTable {
    fn normalized(names: impl Iterator<Item = String>) -> Self {
        Self {
            labels: names
                .map(|name| Label {
                    key: normalize_label(&name),
                    display: name,
                })
                .collect(),
            matching: Matching::Normalized,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|label| label.display.as_str())
    }

    /// Position of the entry `label` refers to, if any.
    pub fn resolve(&self, label: &str) -> Option<usize> {
        match self.matching {
            Matching::Exact => self.labels.iter().position(|entry| entry.key == label),
            Matching::Normalized => {
                let wanted = normalize_label(label);
                self.labels
                    .iter()
                    .position(|entry| entry.key == wanted)
            }
        }
    }

    fn display(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(|label| label.display.as_str())
    }
}

/// Lowercases and folds "and", "&" and hyphen conjunctions to `" & "`.
pub fn normalize_label(label: &str) -> String {
    let lowered = label.to_lowercase();
    CONJUNCTION
        .get_or_init(|| Regex::new(CONJUNCTION_PATTERN).ok())
        .as_ref()
        .map_or_else(
            || lowered.clone(),
            |pattern| pattern.replace_all(&lowered, " & ").into_owned(),
        )
}

fn derive_tables(records: &[CanonicalBlipRecord]) -> Result<(RingTable, QuadrantTable), AssemblyError> {
    let mut rings: Vec<Label> = Vec::new();
    for record in records {
        if rings.iter().any(|ring| ring.key == record.ring) {
            continue;
        }
        if rings.len() == MAX_RINGS {
            return Err(AssemblyError::TooManyRings);
        }
        rings.push(Label {
            key: record.ring.clone(),
            display: record.ring.clone(),
        });
    }

    let mut quadrants: Vec<Label> = Vec::new();
    for record in records {
        if quadrants.iter().any(|quadrant| quadrant.key == record.quadrant) {
            continue;
        }
        if quadrants.len() == MAX_QUADRANTS {
            return Err(AssemblyError::TooManyQuadrants);
        }
        quadrants.push(Label {
            key: record.quadrant.clone(),
            display: capitalize_first(&record.quadrant),
        });
    }

    Ok((
        LabelTable {
            labels: rings,
            matching: Matching::Exact,
        },
        LabelTable {
            labels: quadrants,
            matching: Matching::Exact,
        },
    ))
}

fn capitalize_first(value: &str) -> String {
    let mut chars = value.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadarAssembler {
    policy: AssemblyPolicy,
}

impl RadarAssembler {
    pub const fn new(policy: AssemblyPolicy) -> Self {
        Self { policy }
    }

    /// Resolves the tables for `records` and places every blip.
    pub fn assemble(
        &self,
        records: &[CanonicalBlipRecord],
        metadata: &RadarMetadata,
    ) -> Result<Radar, AssemblyError> {
        let (rings, quadrants) = self.policy.tables(records)?;
        Ok(place_blips(records, &rings, &quadrants, metadata))
    }
}

/// Places each record into its quadrant and numbers the blips in drawing
/// order. Records whose ring or quadrant does not resolve are skipped.
pub fn place_blips(
    records: &[CanonicalBlipRecord],
    rings: &RingTable,
    quadrants: &QuadrantTable,
    metadata: &RadarMetadata,
) -> Radar {
    let mut placed: Vec<Quadrant> = quadrants
        .names()
        .map(|name| Quadrant {
            name: name.to_string(),
            blips: Vec::new(),
        })
        .collect();

    for record in records {
        let quadrant = quadrants.resolve(&record.quadrant);
        let ring = rings.resolve(&record.ring).and_then(|index| rings.display(index));
        match (quadrant.and_then(|index| placed.get_mut(index)), ring) {
            (Some(quadrant), Some(ring)) => quadrant.blips.push(Blip {
                number: 0,
                name: record.name.clone(),
                ring: ring.to_string(),
                is_new: record.is_new,
                status: record.status.clone(),
                topic: record.topic.clone(),
                description: record.description.clone(),
            }),
            _ => log::debug!(
                "dropping blip {:?}: ring {:?} or quadrant {:?} is not in the table",
                record.name,
                record.ring,
                record.quadrant
            ),
        }
    }

    let mut number = 0;
    for blip in placed.iter_mut().flat_map(|quadrant| quadrant.blips.iter_mut()) {
        number += 1;
        blip.number = number;
    }

    Radar {
        title: metadata.title.clone(),
        current_sheet: metadata.current_sheet.clone(),
        alternatives: metadata.alternatives.clone(),
        rings: rings
            .names()
            .enumerate()
            .map(|(order, name)| Ring {
                name: name.to_string(),
                order,
            })
            .collect(),
        quadrants: placed,
    }
}
