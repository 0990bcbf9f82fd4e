// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schemas and records for features embedded in a style document.
//!
//! Features found under a user layer's `InlineFeature` element are read into
//! a [`Schema`] inferred from the first feature plus one [`Record`] per
//! feature. Geometry markup and spatial reference codes are decoded by the
//! [`GeometryFromMarkup`] and [`ResolveAuthorityCode`] collaborators.

use std::fmt;

use thiserror::Error;

mod gml;
mod srs;

pub use gml::GmlGeometry;
pub use srs::{AuthorityError, EpsgAuthority, ResolveAuthorityCode, SpatialReference, SrsCache};

use crate::de::Element;

/// The namespace given to every inferred schema.
pub const INLINE_NAMESPACE: &str = "http://temp.inline.feature.sld.com";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FieldKind {
    Text,
    Geometry,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

/// A record type inferred from inline features.
#[derive(Clone, Debug, PartialEq)]
pub struct Schema {
    pub name: String,
    pub namespace: String,
    pub fields: Vec<Field>,

    /// The spatial reference declared by the first geometry, if any.
    pub srs: Option<SpatialReference>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Schema {
            name: name.into(),
            namespace: INLINE_NAMESPACE.to_owned(),
            fields: Vec::new(),
            srs: None,
        }
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// The first geometry field, which renderers draw by default.
    pub fn default_geometry(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.kind == FieldKind::Geometry)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polygon {
    pub exterior: Vec<Coord>,
    pub interiors: Vec<Vec<Coord>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    /// A point; `None` for an empty `<Point/>`.
    Point(Option<Coord>),
    LineString(Vec<Coord>),
    LinearRing(Vec<Coord>),
    Polygon(Polygon),
    MultiPoint(Vec<Coord>),
    MultiLineString(Vec<Vec<Coord>>),
    MultiPolygon(Vec<Polygon>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Text(String),
    Geometry(Geometry),
}

impl FieldValue {
    fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Geometry(_) => FieldKind::Geometry,
        }
    }
}

/// One feature; `values` is parallel to the schema's fields.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub id: Option<String>,
    pub values: Vec<Option<FieldValue>>,
}

impl Record {
    pub fn get<'a>(&'a self, schema: &Schema, name: &str) -> Option<&'a FieldValue> {
        self.values.get(schema.field_index(name)?)?.as_ref()
    }
}

#[derive(Debug, Error)]
pub enum FieldError {
    #[error("no field named {0:?}")]
    NoSuchField(String),
    #[error("field {0:?} holds {1:?} values")]
    WrongKind(String, FieldKind),
}

/// Builds records against a fixed schema.
pub trait RecordFactory: Send + Sync {
    /// Creates a record with every field unset.
    fn create(&self, schema: &Schema, id: Option<String>) -> Record;

    fn set(
        &self,
        schema: &Schema,
        record: &mut Record,
        name: &str,
        value: FieldValue,
    ) -> Result<(), FieldError>;
}

/// The default [`RecordFactory`], checking field names and kinds.
#[derive(Copy, Clone, Debug, Default)]
pub struct SimpleRecords;

impl RecordFactory for SimpleRecords {
    fn create(&self, schema: &Schema, id: Option<String>) -> Record {
        Record {
            id,
            values: vec![None; schema.fields.len()],
        }
    }

    fn set(
        &self,
        schema: &Schema,
        record: &mut Record,
        name: &str,
        value: FieldValue,
    ) -> Result<(), FieldError> {
        let i = schema
            .field_index(name)
            .ok_or_else(|| FieldError::NoSuchField(name.to_owned()))?;
        let field = &schema.fields[i];
        if field.kind != value.kind() {
            return Err(FieldError::WrongKind(name.to_owned(), field.kind));
        }
        record.values[i] = Some(value);
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("unsupported geometry element {0}")]
    Unsupported(String),
    #[error("bad coordinate {0:?}")]
    BadCoordinate(String),
    #[error("{0} has no {1}")]
    Missing(&'static str, &'static str),
}

/// Decodes geometry markup such as `<gml:Point>`.
pub trait GeometryFromMarkup: Send + Sync {
    fn geometry(&self, node: &Element) -> Result<Geometry, GeometryError>;
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn schema() -> Schema {
        let mut s = Schema::new("P");
        s.fields.push(Field {
            name: "a".to_owned(),
            kind: FieldKind::Text,
        });
        s.fields.push(Field {
            name: "b".to_owned(),
            kind: FieldKind::Geometry,
        });
        s
    }

    #[test]
    fn set_checks_name_and_kind() {
        let s = schema();
        let mut r = SimpleRecords.create(&s, None);
        assert_eq!(r.values, [None, None]);
        SimpleRecords
            .set(&s, &mut r, "a", FieldValue::Text("1".to_owned()))
            .unwrap();
        assert_matches!(
            SimpleRecords.set(&s, &mut r, "c", FieldValue::Text("1".to_owned())),
            Err(FieldError::NoSuchField(_))
        );
        assert_matches!(
            SimpleRecords.set(&s, &mut r, "b", FieldValue::Text("1".to_owned())),
            Err(FieldError::WrongKind(_, FieldKind::Geometry))
        );
        assert_eq!(r.get(&s, "a"), Some(&FieldValue::Text("1".to_owned())));
        assert_eq!(r.get(&s, "b"), None);
        assert_eq!(s.default_geometry().map(|f| f.name.as_str()), Some("b"));
    }
}
