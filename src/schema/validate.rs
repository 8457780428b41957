use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::derive::infer_collection_shape;
use super::{FieldSpec, Shape};
use crate::error::StructuralValidationError;

/// A required field is present but its inferred shape disagrees with the spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldShapeWarning {
    pub field: String,
    pub expected: String,
    pub observed: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub records_inspected: usize,
    pub skipped_records: usize,
    pub warnings: Vec<FieldShapeWarning>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Check the inferred structure of `records` against `specs`.
///
/// A required top-level field missing from every record is fatal. Shape
/// disagreements only produce warnings; the flattener coerces per field.
#[instrument(level = "info", skip_all, fields(records = records.len()))]
pub fn validate(
    records: &[Value],
    specs: &[(&'static str, FieldSpec)],
) -> Result<ValidationReport, StructuralValidationError> {
    info!("validating raw schema");
    let inferred = infer_collection_shape(records);
    let mut report = ValidationReport {
        records_inspected: inferred.records_inspected,
        skipped_records: inferred.skipped_records,
        warnings: Vec::new(),
    };

    for (name, spec) in specs {
        let observed = inferred
            .fields
            .get(*name)
            .ok_or_else(|| StructuralValidationError::MissingRequiredField(name.to_string()))?;
        check_field(name, spec, observed, &mut report.warnings);
    }

    for w in &report.warnings {
        warn!(
            field = %w.field,
            expected = %w.expected,
            observed = %w.observed,
            "field shape differs from expected; continuing with coercion"
        );
    }
    info!(warnings = report.warnings.len(), "schema validation finished");
    Ok(report)
}

fn check_field(path: &str, spec: &FieldSpec, observed: &Shape, out: &mut Vec<FieldShapeWarning>) {
    if !spec.accepts(observed) {
        out.push(FieldShapeWarning {
            field: path.to_string(),
            expected: spec.to_string(),
            observed: observed.to_string(),
        });
        return;
    }

    // one level into nested objects
    if let (FieldSpec::Object(nested), Shape::Object(fields)) = (spec, observed) {
        for (name, nested_spec) in nested {
            let nested_path = format!("{}.{}", path, name);
            match fields.get(*name) {
                Some(shape) if !nested_spec.accepts(shape) => out.push(FieldShapeWarning {
                    field: nested_path,
                    expected: nested_spec.to_string(),
                    observed: shape.to_string(),
                }),
                Some(_) => {}
                None => out.push(FieldShapeWarning {
                    field: nested_path,
                    expected: nested_spec.to_string(),
                    observed: "missing".to_string(),
                }),
            }
        }
    }
}
