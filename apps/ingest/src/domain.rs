use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Rings used when `RINGS` is not configured, innermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultRing {
    Adopt,
    Trial,
    Assess,
    Hold,
}

impl DefaultRing {
    pub const ALL: [Self; 4] = [Self::Adopt, Self::Trial, Self::Assess, Self::Hold];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Adopt => "Adopt",
            Self::Trial => "Trial",
            Self::Assess => "Assess",
            Self::Hold => "Hold",
        }
    }
}

/// Quadrants used when `QUADRANTS` is not configured, in drawing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultQuadrant {
    Techniques,
    Platforms,
    Tools,
    LanguagesAndFrameworks,
}

impl DefaultQuadrant {
    pub const ALL: [Self; 4] = [
        Self::Techniques,
        Self::Platforms,
        Self::Tools,
        Self::LanguagesAndFrameworks,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Techniques => "Techniques",
            Self::Platforms => "Platforms",
            Self::Tools => "Tools",
            Self::LanguagesAndFrameworks => "Languages & Frameworks",
        }
    }
}

/// One record as produced by a source parser: column name to cell text,
/// in column order. Keys are not trusted and may be malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    fields: Vec<(String, String)>,
}

impl RawRow {
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Sets `key` to `value`, replacing an existing entry in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Renames the column `from` to `to`, keeping its position. Any other
    /// column already called `to` is dropped so the key stays unique.
    pub fn rename_key(&mut self, from: &str, to: &str) {
        if !self.fields.iter().any(|(key, _)| key == from) {
            return;
        }
        self.fields.retain(|(key, _)| key != to);
        for (key, _) in &mut self.fields {
            if key == from {
                *key = to.to_string();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Self::new();
        for (key, value) in iter {
            row.insert(key, value);
        }
        row
    }
}

impl Serialize for RawRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Column names observed in the first row of a tabular source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSet(Vec<String>);

impl ColumnSet {
    pub fn from_row(row: &RawRow) -> Self {
        Self(row.keys().map(str::to_string).collect())
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for ColumnSet {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

/// A sanitized blip, ready for ring and quadrant resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CanonicalBlipRecord {
    pub name: String,
    pub ring: String,
    pub is_new: bool,
    pub status: String,
    pub quadrant: String,
    pub topic: String,
    pub description: String,
}

/// Everything about a load that is not a blip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RadarMetadata {
    pub title: String,
    pub current_sheet: String,
    pub alternatives: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ring {
    pub name: String,
    pub order: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Blip {
    pub number: usize,
    pub name: String,
    pub ring: String,
    pub is_new: bool,
    pub status: String,
    pub topic: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quadrant {
    pub name: String,
    pub blips: Vec<Blip>,
}

/// The assembled radar handed to the rendering stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Radar {
    pub title: String,
    pub current_sheet: String,
    pub alternatives: Vec<String>,
    pub rings: Vec<Ring>,
    pub quadrants: Vec<Quadrant>,
}

impl Radar {
    pub fn blip_count(&self) -> usize {
        self.quadrants.iter().map(|quadrant| quadrant.blips.len()).sum()
    }

    pub fn blips(&self) -> impl Iterator<Item = (&Quadrant, &Blip)> {
        self.quadrants
            .iter()
            .flat_map(|quadrant| quadrant.blips.iter().map(move |blip| (quadrant, blip)))
    }

    pub fn quadrant(&self, name: &str) -> Option<&Quadrant> {
        self.quadrants.iter().find(|quadrant| quadrant.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_key_keeps_position_and_drops_duplicates() {
        let mut row: RawRow = [("\\", "Rust"), ("name", ""), ("ring", "Adopt")]
            .into_iter()
            .collect();

        row.rename_key("\\", "name");

        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["name", "ring"]);
        assert_eq!(row.get("name"), Some("Rust"));
    }

    #[test]
    fn raw_row_serializes_as_ordered_map() -> Result<(), Box<dyn std::error::Error>> {
        let row: RawRow = [("name", "Rust"), ("ring", "Adopt")].into_iter().collect();
        assert_eq!(serde_json::to_string(&row)?, r#"{"name":"Rust","ring":"Adopt"}"#);
        Ok(())
    }

    #[test]
    fn default_tables_have_four_labelled_entries() {
        let rings: Vec<&str> = DefaultRing::ALL.iter().map(|ring| ring.label()).collect();
        assert_eq!(rings, vec!["Adopt", "Trial", "Assess", "Hold"]);
        assert_eq!(DefaultQuadrant::ALL.len(), 4);
        assert_eq!(
            DefaultQuadrant::LanguagesAndFrameworks.label(),
            "Languages & Frameworks"
        );
    }
}
