use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use super::Shape;

/// Infer the shape of a single JSON value.
pub fn shape_of(value: &Value) -> Shape {
    match value {
        Value::Null => Shape::Null,
        Value::Bool(_) => Shape::Boolean,
        Value::Number(n) if n.is_i64() || n.is_u64() => Shape::Integer,
        Value::Number(_) => Shape::Float,
        Value::String(_) => Shape::String,
        Value::Array(items) => Shape::Array(Box::new(
            items.iter().map(shape_of).fold(Shape::Null, merge),
        )),
        Value::Object(map) => Shape::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), shape_of(v)))
                .collect(),
        ),
    }
}

/// Merge two shapes:
///  - null yields to the other side
///  - integer + float widen to float
///  - objects union their fields, arrays merge their element shapes
///  - any other conflict widens to string
pub fn merge(a: Shape, b: Shape) -> Shape {
    match (a, b) {
        (Shape::Null, other) | (other, Shape::Null) => other,
        (Shape::Integer, Shape::Float) | (Shape::Float, Shape::Integer) => Shape::Float,
        (Shape::Array(x), Shape::Array(y)) => Shape::Array(Box::new(merge(*x, *y))),
        (Shape::Object(mut left), Shape::Object(right)) => {
            for (name, shape) in right {
                let merged = match left.remove(&name) {
                    Some(existing) => merge(existing, shape),
                    None => shape,
                };
                left.insert(name, merged);
            }
            Shape::Object(left)
        }
        (x, y) if x == y => x,
        (x, y) => {
            debug!("shape conflict {} vs {}, widening to string", x, y);
            Shape::String
        }
    }
}

/// Inferred top-level structure of a record collection.
#[derive(Debug, Clone, Default)]
pub struct CollectionShape {
    pub fields: BTreeMap<String, Shape>,
    pub records_inspected: usize,
    /// Records that were not JSON objects and took no part in inference.
    pub skipped_records: usize,
}

/// Merge the shapes of every object record in `records`.
pub fn infer_collection_shape(records: &[Value]) -> CollectionShape {
    let mut out = CollectionShape::default();
    let mut merged = Shape::Object(BTreeMap::new());

    for record in records {
        if !record.is_object() {
            out.skipped_records += 1;
            continue;
        }
        out.records_inspected += 1;
        merged = merge(merged, shape_of(record));
    }

    if let Shape::Object(fields) = merged {
        out.fields = fields;
    }
    out
}
