// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core types used throughout shpcodec.
//!
//! This module provides the foundational types for the library:
//! - [`ShpError`] - Error handling
//! - [`Shape`] - Geometry value model
//! - [`Field`] - Attribute table columns
//! - [`ShapeType`] - Geometry type tag

pub mod error;
pub mod field;
pub mod shape;

pub use error::{Result, ShpError};
pub use field::{Field, FieldType, FieldValue};
pub use shape::{
    BBox, MultiPatch, MultiPoint, MultiPointM, MultiPointZ, PatchType, Point, PointM, PointZ,
    PolyLine, PolyLineM, PolyLineZ, Polygon, PolygonM, PolygonZ, Shape,
};

use serde::{Deserialize, Serialize};

/// Geometry type tag, uniform across all records of a file set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeType {
    Null,
    Point,
    PolyLine,
    Polygon,
    MultiPoint,
    PointZ,
    PolyLineZ,
    PolygonZ,
    MultiPointZ,
    PointM,
    PolyLineM,
    PolygonM,
    MultiPointM,
    MultiPatch,
}

impl ShapeType {
    /// Numeric tag stored in headers and records.
    pub fn tag(&self) -> i32 {
        match self {
            ShapeType::Null => 0,
            ShapeType::Point => 1,
            ShapeType::PolyLine => 3,
            ShapeType::Polygon => 5,
            ShapeType::MultiPoint => 8,
            ShapeType::PointZ => 11,
            ShapeType::PolyLineZ => 13,
            ShapeType::PolygonZ => 15,
            ShapeType::MultiPointZ => 18,
            ShapeType::PointM => 21,
            ShapeType::PolyLineM => 23,
            ShapeType::PolygonM => 25,
            ShapeType::MultiPointM => 28,
            ShapeType::MultiPatch => 31,
        }
    }

    /// Resolve a stored tag.
    ///
    /// Unknown tags are [`ShpError::UnsupportedShapeType`].
    pub fn from_tag(tag: i32) -> Result<Self> {
        Ok(match tag {
            0 => ShapeType::Null,
            1 => ShapeType::Point,
            3 => ShapeType::PolyLine,
            5 => ShapeType::Polygon,
            8 => ShapeType::MultiPoint,
            11 => ShapeType::PointZ,
            13 => ShapeType::PolyLineZ,
            15 => ShapeType::PolygonZ,
            18 => ShapeType::MultiPointZ,
            21 => ShapeType::PointM,
            23 => ShapeType::PolyLineM,
            25 => ShapeType::PolygonM,
            28 => ShapeType::MultiPointM,
            31 => ShapeType::MultiPatch,
            other => return Err(ShpError::unsupported_shape_type(other)),
        })
    }

    /// Whether the variant carries Z values.
    pub fn has_z(&self) -> bool {
        matches!(
            self,
            ShapeType::PointZ
                | ShapeType::PolyLineZ
                | ShapeType::PolygonZ
                | ShapeType::MultiPointZ
                | ShapeType::MultiPatch
        )
    }

    /// Whether the variant carries M values.
    pub fn has_m(&self) -> bool {
        self.has_z()
            || matches!(
                self,
                ShapeType::PointM
                    | ShapeType::PolyLineM
                    | ShapeType::PolygonM
                    | ShapeType::MultiPointM
            )
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeType::Null => "null",
            ShapeType::Point => "point",
            ShapeType::PolyLine => "polyline",
            ShapeType::Polygon => "polygon",
            ShapeType::MultiPoint => "multipoint",
            ShapeType::PointZ => "pointz",
            ShapeType::PolyLineZ => "polylinez",
            ShapeType::PolygonZ => "polygonz",
            ShapeType::MultiPointZ => "multipointz",
            ShapeType::PointM => "pointm",
            ShapeType::PolyLineM => "polylinem",
            ShapeType::PolygonM => "polygonm",
            ShapeType::MultiPointM => "multipointm",
            ShapeType::MultiPatch => "multipatch",
        }
    }
}

impl std::fmt::Display for ShapeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a `ShapeType` from string fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseShapeTypeError {
    _private: (),
}

impl std::fmt::Display for ParseShapeTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid shape type name")
    }
}

impl std::error::Error for ParseShapeTypeError {}

impl std::str::FromStr for ShapeType {
    type Err = ParseShapeTypeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ALL_SHAPE_TYPES
            .iter()
            .copied()
            .find(|t| t.as_str() == s.to_lowercase())
            .ok_or(ParseShapeTypeError { _private: () })
    }
}

/// Every shape type, in tag order.
pub const ALL_SHAPE_TYPES: [ShapeType; 14] = [
    ShapeType::Null,
    ShapeType::Point,
    ShapeType::PolyLine,
    ShapeType::Polygon,
    ShapeType::MultiPoint,
    ShapeType::PointZ,
    ShapeType::PolyLineZ,
    ShapeType::PolygonZ,
    ShapeType::MultiPointZ,
    ShapeType::PointM,
    ShapeType::PolyLineM,
    ShapeType::PolygonM,
    ShapeType::MultiPointM,
    ShapeType::MultiPatch,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        for ty in ALL_SHAPE_TYPES {
            assert_eq!(ShapeType::from_tag(ty.tag()).unwrap(), ty);
        }
    }

    #[test]
    fn test_unknown_tag_is_error() {
        let err = ShapeType::from_tag(7).unwrap_err();
        assert!(matches!(err, ShpError::UnsupportedShapeType { tag: 7 }));
    }

    #[test]
    fn test_from_str() {
        assert_eq!("Polygon".parse::<ShapeType>().unwrap(), ShapeType::Polygon);
        assert_eq!(
            "multipointz".parse::<ShapeType>().unwrap(),
            ShapeType::MultiPointZ
        );
        assert!("hexagon".parse::<ShapeType>().is_err());
    }

    #[test]
    fn test_z_and_m_flags() {
        assert!(ShapeType::PolygonZ.has_z());
        assert!(ShapeType::PolygonZ.has_m());
        assert!(!ShapeType::PolygonM.has_z());
        assert!(ShapeType::PolygonM.has_m());
        assert!(!ShapeType::Polygon.has_m());
    }
}
