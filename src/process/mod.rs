// src/process/mod.rs

//! The transform core: validate → flatten → dedupe, with no I/O.

pub mod convert;
pub mod dedupe;
pub mod flatten;
pub mod row;
pub mod utils;

pub use convert::rows_to_record_batch;
pub use dedupe::{dedupe, dedupe_indexed};
pub use flatten::{flatten, CoercionDefault, FlattenStats, Flattened};
pub use row::{FlatRow, FlatTable, NOT_AVAILABLE};

use serde_json::Value;
use std::collections::HashSet;
use tracing::instrument;

use crate::error::StructuralValidationError;
use crate::schema::{validate, FieldSpec, ValidationReport};

/// Everything the core produces for one batch of records.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub report: ValidationReport,
    pub stats: FlattenStats,
    pub table: FlatTable,
    /// Invalid-population records with at least one row left in `table`.
    pub invalid_population_records: usize,
}

/// Run the full core over `records`. Only a missing required field is fatal.
#[instrument(level = "info", skip_all)]
pub fn transform(
    records: &[Value],
    specs: &[(&'static str, FieldSpec)],
) -> Result<TransformOutput, StructuralValidationError> {
    let report = validate(records, specs)?;
    let Flattened {
        rows,
        origins,
        invalid_population,
        stats,
    } = flatten(records);
    let (table, kept) = dedupe_indexed(rows);

    let surviving: HashSet<usize> = kept
        .iter()
        .filter_map(|&i| origins.get(i).copied())
        .collect();
    let invalid_population_records = invalid_population
        .iter()
        .filter(|idx| surviving.contains(*idx))
        .count();

    Ok(TransformOutput {
        report,
        stats,
        table,
        invalid_population_records,
    })
}
