// src/schema/arrow.rs

use arrow::datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema};
use std::sync::Arc;

/// Output columns, in write order. Every column is non-nullable because
/// every `FlatRow` field is total.
pub const FLAT_COLUMNS: &[(&str, DataType)] = &[
    ("name_common", DataType::Utf8),
    ("name_official", DataType::Utf8),
    ("region", DataType::Utf8),
    ("subregion", DataType::Utf8),
    ("capital", DataType::Utf8),
    ("population", DataType::Int64),
    ("area", DataType::Float64),
    ("currency_code", DataType::Utf8),
    ("currency_name", DataType::Utf8),
    ("language", DataType::Utf8),
];

/// Build the ArrowSchema (inside an Arc) for the flattened table.
pub fn flat_row_schema() -> Arc<ArrowSchema> {
    let fields: Vec<ArrowField> = FLAT_COLUMNS
        .iter()
        .map(|(name, dt)| ArrowField::new(*name, dt.clone(), /* nullable = */ false))
        .collect();

    Arc::new(ArrowSchema::new(fields))
}
