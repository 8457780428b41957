// src/process/flatten.rs

use rayon::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use super::row::{FlatRow, NOT_AVAILABLE};
use super::utils::{cast_float, cast_int, cast_string, non_negative, Fallback};

/// A field fell back to its default because the source value was present
/// but unusable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoercionDefault {
    pub field: &'static str,
    /// `name.common` of the record, or `#<index>` when that is unavailable.
    pub record: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FlattenStats {
    pub records_seen: usize,
    /// Records that were not JSON objects; skipped.
    pub malformed_records: usize,
    pub rows_emitted: usize,
    /// Records whose population was present but invalid (negative or
    /// unparsable), counted before dedupe.
    pub invalid_population_records: usize,
    pub coercion_defaults: Vec<CoercionDefault>,
}

#[derive(Debug, Clone, Default)]
pub struct Flattened {
    pub rows: Vec<FlatRow>,
    /// Source record index of each entry in `rows`.
    pub origins: Vec<usize>,
    /// Indices of the records with an invalid population, ascending.
    pub invalid_population: Vec<usize>,
    pub stats: FlattenStats,
}

struct RecordOutcome {
    rows: Vec<FlatRow>,
    defaults: Vec<CoercionDefault>,
    invalid_population: bool,
}

/// Collects coercion fallbacks for one record.
struct Defaults<'a> {
    record: &'a str,
    events: Vec<CoercionDefault>,
}

impl<'a> Defaults<'a> {
    fn resolve<T>(&mut self, field: &'static str, cast: Result<T, Fallback>, default: T) -> T {
        match cast {
            Ok(v) => v,
            Err(Fallback::Missing) => default,
            Err(Fallback::Invalid) => {
                self.flag(field);
                default
            }
        }
    }

    fn flag(&mut self, field: &'static str) {
        debug!(record = %self.record, field, "invalid source value, using default");
        self.events.push(CoercionDefault {
            field,
            record: self.record.to_string(),
        });
    }

    fn text(&mut self, field: &'static str, cast: Result<String, Fallback>) -> String {
        self.resolve(field, cast, NOT_AVAILABLE.to_string())
    }
}

/// Expand every record into one or more `FlatRow`s.
///
/// Each record contributes the Cartesian product of its currency entries and
/// its language entries; an empty or absent map counts as one placeholder
/// entry, so every object record yields at least one row. Non-object records
/// are skipped and counted. Output keeps source record order.
#[instrument(level = "info", skip_all, fields(records = records.len()))]
pub fn flatten(records: &[Value]) -> Flattened {
    let outcomes: Vec<Option<RecordOutcome>> = records
        .par_iter()
        .enumerate()
        .map(|(idx, record)| flatten_record(idx, record))
        .collect();

    let mut out = Flattened::default();
    out.stats.records_seen = records.len();
    for (idx, outcome) in outcomes.into_iter().enumerate() {
        let Some(outcome) = outcome else {
            out.stats.malformed_records += 1;
            continue;
        };
        if outcome.invalid_population {
            out.invalid_population.push(idx);
        }
        out.stats.coercion_defaults.extend(outcome.defaults);
        out.origins.extend(std::iter::repeat(idx).take(outcome.rows.len()));
        out.rows.extend(outcome.rows);
    }
    out.stats.invalid_population_records = out.invalid_population.len();
    out.stats.rows_emitted = out.rows.len();

    if out.stats.malformed_records > 0 {
        warn!(
            skipped = out.stats.malformed_records,
            "skipped records that are not JSON objects"
        );
    }
    info!(
        rows = out.stats.rows_emitted,
        coercion_defaults = out.stats.coercion_defaults.len(),
        "flatten finished"
    );
    out
}

fn flatten_record(idx: usize, record: &Value) -> Option<RecordOutcome> {
    let obj = record.as_object()?;

    let ident = obj
        .get("name")
        .and_then(|n| n.get("common"))
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| format!("#{}", idx));
    let mut defaults = Defaults {
        record: &ident,
        events: Vec::new(),
    };

    let (common, official) = match obj.get("name") {
        Some(Value::Object(name)) => (
            cast_string(name.get("common")),
            cast_string(name.get("official")),
        ),
        None | Some(Value::Null) => (Err(Fallback::Missing), Err(Fallback::Missing)),
        Some(_) => (Err(Fallback::Invalid), Err(Fallback::Invalid)),
    };
    let name_common = defaults.text("name_common", common);
    let name_official = defaults.text("name_official", official);
    let region = defaults.text("region", cast_string(obj.get("region")));
    let subregion = defaults.text("subregion", cast_string(obj.get("subregion")));
    let capital = defaults.text("capital", capital_head(obj.get("capital")));

    let raw_population = cast_int(obj.get("population"));
    if let Ok(p) = raw_population {
        if p < 0 {
            warn!(record = %ident, population = p, "negative population, coercing to 0");
        }
    }
    let population_cast = non_negative(raw_population);
    let invalid_population = population_cast == Err(Fallback::Invalid);
    let population = defaults.resolve("population", population_cast, 0);
    let area = defaults.resolve("area", non_negative(cast_float(obj.get("area"))), 0.0);
    let area = if area == 0.0 { 0.0 } else { area };

    let currencies: Vec<(String, String)> = entries(&mut defaults, "currencies", obj)
        .into_iter()
        .map(|(code, value)| match (code, value) {
            (Some(code), value) => {
                let name = match value {
                    Some(Value::Object(c)) => cast_string(c.get("name")),
                    None | Some(Value::Null) => Err(Fallback::Missing),
                    Some(_) => Err(Fallback::Invalid),
                };
                (code.to_string(), defaults.text("currency_name", name))
            }
            (None, _) => (NOT_AVAILABLE.to_string(), NOT_AVAILABLE.to_string()),
        })
        .collect();

    let languages: Vec<String> = entries(&mut defaults, "languages", obj)
        .into_iter()
        .map(|(_, value)| defaults.text("language", cast_string(value)))
        .collect();

    let mut rows = Vec::with_capacity(currencies.len() * languages.len());
    for (currency_code, currency_name) in &currencies {
        for language in &languages {
            rows.push(FlatRow {
                name_common: name_common.clone(),
                name_official: name_official.clone(),
                region: region.clone(),
                subregion: subregion.clone(),
                capital: capital.clone(),
                population,
                area,
                currency_code: currency_code.clone(),
                currency_name: currency_name.clone(),
                language: language.clone(),
            });
        }
    }

    Some(RecordOutcome {
        rows,
        defaults: defaults.events,
        invalid_population,
    })
}

/// Only the first capital is kept.
fn capital_head(value: Option<&Value>) -> Result<String, Fallback> {
    match value {
        Some(Value::Array(items)) => match items.first() {
            Some(head) => cast_string(Some(head)),
            None => Err(Fallback::Missing),
        },
        other => cast_string(other),
    }
}

/// Entries of a map field, or one `(None, None)` placeholder when the map is
/// empty, absent or not a map at all.
fn entries<'v>(
    defaults: &mut Defaults<'_>,
    field: &'static str,
    obj: &'v Map<String, Value>,
) -> Vec<(Option<&'v str>, Option<&'v Value>)> {
    match obj.get(field) {
        Some(Value::Object(map)) if !map.is_empty() => map
            .iter()
            .map(|(k, v)| (Some(k.as_str()), Some(v)))
            .collect(),
        Some(Value::Object(_)) | Some(Value::Null) | None => vec![(None, None)],
        Some(_) => {
            defaults.flag(field);
            vec![(None, None)]
        }
    }
}
