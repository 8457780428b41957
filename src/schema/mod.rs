pub mod arrow;
pub mod derive;
pub mod types;
pub mod validate;

pub use self::arrow::{flat_row_schema, FLAT_COLUMNS};
pub use derive::{infer_collection_shape, CollectionShape};
pub use types::{required_fields, FieldSpec, ScalarType, Shape};
pub use validate::{validate, FieldShapeWarning, ValidationReport};
