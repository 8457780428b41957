use serde::Serialize;
use std::{
    cmp::Ordering,
    hash::{Hash, Hasher},
};

/// Placeholder for any string field with no usable source value.
pub const NOT_AVAILABLE: &str = "N/A";

/// One output row. Every field is total; see `process::utils` for the
/// coercion defaults.
///
/// `area` takes part in equality, hashing and ordering by its bit pattern,
/// so the flattener stores a zero area as `0.0`, never `-0.0`.
#[derive(Debug, Clone, Serialize)]
pub struct FlatRow {
    pub name_common: String,
    pub name_official: String,
    pub region: String,
    pub subregion: String,
    pub capital: String,
    pub population: i64,
    pub area: f64,
    pub currency_code: String,
    pub currency_name: String,
    pub language: String,
}

impl FlatRow {
    /// Sort key used for deterministic output and test comparison.
    pub fn sort_key(&self) -> (&str, &str, &str) {
        (&self.name_common, &self.currency_code, &self.language)
    }
}

impl PartialEq for FlatRow {
    fn eq(&self, other: &Self) -> bool {
        self.name_common == other.name_common
            && self.name_official == other.name_official
            && self.region == other.region
            && self.subregion == other.subregion
            && self.capital == other.capital
            && self.population == other.population
            && self.area.to_bits() == other.area.to_bits()
            && self.currency_code == other.currency_code
            && self.currency_name == other.currency_name
            && self.language == other.language
    }
}

impl Eq for FlatRow {}

impl Hash for FlatRow {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name_common.hash(state);
        self.name_official.hash(state);
        self.region.hash(state);
        self.subregion.hash(state);
        self.capital.hash(state);
        self.population.hash(state);
        self.area.to_bits().hash(state);
        self.currency_code.hash(state);
        self.currency_name.hash(state);
        self.language.hash(state);
    }
}

impl Ord for FlatRow {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.name_official.cmp(&other.name_official))
            .then_with(|| self.region.cmp(&other.region))
            .then_with(|| self.subregion.cmp(&other.subregion))
            .then_with(|| self.capital.cmp(&other.capital))
            .then_with(|| self.population.cmp(&other.population))
            .then_with(|| self.area.total_cmp(&other.area))
            .then_with(|| self.currency_name.cmp(&other.currency_name))
    }
}

impl PartialOrd for FlatRow {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Deduplicated output table, in first-occurrence order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatTable {
    rows: Vec<FlatRow>,
}

impl FlatTable {
    /// Callers must guarantee `rows` holds no duplicates; use `dedupe`.
    pub(crate) fn from_unique(rows: Vec<FlatRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[FlatRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows ordered by (name_common, currency_code, language), then the rest.
    pub fn sorted(&self) -> Vec<&FlatRow> {
        let mut out: Vec<&FlatRow> = self.rows.iter().collect();
        out.sort();
        out
    }

    pub fn into_rows(self) -> Vec<FlatRow> {
        self.rows
    }
}
