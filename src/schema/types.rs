// src/schema/types.rs

use serde::Serialize;
use std::{collections::BTreeMap, fmt};

/// Structure observed in a JSON value, or merged over a whole collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Shape {
    Null,
    Boolean,
    Integer,
    Float,
    String,
    Array(Box<Shape>),
    Object(BTreeMap<String, Shape>),
}

impl Shape {
    /// Field map of an object shape.
    pub fn fields(&self) -> Option<&BTreeMap<String, Shape>> {
        match self {
            Shape::Object(fields) => Some(fields),
            _ => None,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Null => f.write_str("null"),
            Shape::Boolean => f.write_str("boolean"),
            Shape::Integer => f.write_str("integer"),
            Shape::Float => f.write_str("float"),
            Shape::String => f.write_str("string"),
            Shape::Array(elem) => write!(f, "array<{}>", elem),
            Shape::Object(fields) => {
                f.write_str("object{")?;
                for (i, (name, shape)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", name, shape)?;
                }
                f.write_str("}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Integer,
    Float,
}

/// Expected shape of a required field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSpec {
    Scalar(ScalarType),
    MapOf(Box<FieldSpec>),
    ArrayOf(Box<FieldSpec>),
    Object(Vec<(&'static str, FieldSpec)>),
}

impl FieldSpec {
    pub fn string() -> Self {
        FieldSpec::Scalar(ScalarType::String)
    }

    pub fn integer() -> Self {
        FieldSpec::Scalar(ScalarType::Integer)
    }

    pub fn float() -> Self {
        FieldSpec::Scalar(ScalarType::Float)
    }

    pub fn map_of(value: FieldSpec) -> Self {
        FieldSpec::MapOf(Box::new(value))
    }

    pub fn array_of(elem: FieldSpec) -> Self {
        FieldSpec::ArrayOf(Box::new(elem))
    }

    /// Does an observed shape satisfy this spec?
    ///
    /// - `null` satisfies anything: there is no evidence of drift
    /// - `integer` satisfies `float` (lossless widening)
    /// - a map spec accepts an object whose every field satisfies the value spec
    /// - an object spec only checks the outer kind; nested fields are
    ///   checked separately so each mismatch gets its own warning
    pub fn accepts(&self, shape: &Shape) -> bool {
        match (self, shape) {
            (_, Shape::Null) => true,
            (FieldSpec::Scalar(ScalarType::String), Shape::String) => true,
            (FieldSpec::Scalar(ScalarType::Integer), Shape::Integer) => true,
            (FieldSpec::Scalar(ScalarType::Float), Shape::Integer | Shape::Float) => true,
            (FieldSpec::MapOf(value), Shape::Object(fields)) => {
                fields.values().all(|s| value.accepts_deep(s))
            }
            (FieldSpec::ArrayOf(elem), Shape::Array(inner)) => elem.accepts_deep(inner),
            (FieldSpec::Object(_), Shape::Object(_)) => true,
            _ => false,
        }
    }

    /// Like `accepts`, but descends into object specs.
    fn accepts_deep(&self, shape: &Shape) -> bool {
        match (self, shape) {
            (FieldSpec::Object(expected), Shape::Object(fields)) => {
                expected.iter().all(|(name, spec)| {
                    fields.get(*name).map_or(true, |s| spec.accepts_deep(s))
                })
            }
            _ => self.accepts(shape),
        }
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSpec::Scalar(ScalarType::String) => f.write_str("string"),
            FieldSpec::Scalar(ScalarType::Integer) => f.write_str("integer"),
            FieldSpec::Scalar(ScalarType::Float) => f.write_str("float"),
            FieldSpec::MapOf(value) => write!(f, "map<string, {}>", value),
            FieldSpec::ArrayOf(elem) => write!(f, "array<{}>", elem),
            FieldSpec::Object(fields) => {
                f.write_str("object{")?;
                for (i, (name, spec)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", name, spec)?;
                }
                f.write_str("}")
            }
        }
    }
}

/// The fields a country collection must carry, in check order.
pub fn required_fields() -> Vec<(&'static str, FieldSpec)> {
    vec![
        (
            "name",
            FieldSpec::Object(vec![
                ("common", FieldSpec::string()),
                ("official", FieldSpec::string()),
            ]),
        ),
        (
            "currencies",
            FieldSpec::map_of(FieldSpec::Object(vec![
                ("name", FieldSpec::string()),
                ("symbol", FieldSpec::string()),
            ])),
        ),
        ("languages", FieldSpec::map_of(FieldSpec::string())),
        ("capital", FieldSpec::array_of(FieldSpec::string())),
        ("population", FieldSpec::integer()),
        ("area", FieldSpec::float()),
        ("region", FieldSpec::string()),
        ("subregion", FieldSpec::string()),
    ]
}
