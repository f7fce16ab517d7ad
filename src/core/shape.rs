// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Geometry value model.
//!
//! [`Shape`] is a closed enum over every geometry variant the format can
//! store. Multi-part variants keep a flat point list plus part-start
//! indices; Z and M variants keep their extra values in arrays parallel to
//! the point list. Wire encoding lives in [`crate::encoding::geometry`].

use serde::{Deserialize, Serialize};

use super::{Result, ShapeType, ShpError};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    /// Create a box from its bounds.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Zero-area box located at `point`.
    pub fn from_point(point: &Point) -> Self {
        Self::new(point.x, point.y, point.x, point.y)
    }

    /// Coordinate-wise min/max over `points`.
    ///
    /// An empty slice yields the degenerate box at the origin.
    pub fn from_points(points: &[Point]) -> Self {
        let mut iter = points.iter();
        let Some(first) = iter.next() else {
            return Self::default();
        };
        let mut bbox = Self::from_point(first);
        for p in iter {
            bbox.extend_point(p);
        }
        bbox
    }

    /// Grow this box to cover `other`.
    pub fn extend(&mut self, other: &BBox) {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    /// Grow this box to cover `point`.
    pub fn extend_point(&mut self, point: &Point) {
        self.min_x = self.min_x.min(point.x);
        self.min_y = self.min_y.min(point.y);
        self.max_x = self.max_x.max(point.x);
        self.max_y = self.max_y.max(point.y);
    }

    /// Whether `point` lies inside or on the edge of this box.
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.min_x && point.x <= self.max_x && point.y >= self.min_y && point.y <= self.max_y
    }
}

/// A 2D coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A point with a measure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointM {
    pub x: f64,
    pub y: f64,
    pub m: f64,
}

/// A point with elevation and measure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointZ {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub m: f64,
}

/// An unordered set of points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiPoint {
    pub bbox: BBox,
    pub points: Vec<Point>,
}

impl MultiPoint {
    pub fn new(points: Vec<Point>) -> Self {
        Self {
            bbox: BBox::from_points(&points),
            points,
        }
    }
}

/// Points with measures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiPointM {
    pub bbox: BBox,
    pub points: Vec<Point>,
    pub m_range: [f64; 2],
    pub m_array: Vec<f64>,
}

impl MultiPointM {
    pub fn new(points: Vec<Point>, m_array: Vec<f64>) -> Self {
        Self {
            bbox: BBox::from_points(&points),
            points,
            m_range: value_range(&m_array),
            m_array,
        }
    }
}

/// Points with elevations and measures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiPointZ {
    pub bbox: BBox,
    pub points: Vec<Point>,
    pub z_range: [f64; 2],
    pub z_array: Vec<f64>,
    pub m_range: [f64; 2],
    pub m_array: Vec<f64>,
}

impl MultiPointZ {
    pub fn new(points: Vec<Point>, z_array: Vec<f64>, m_array: Vec<f64>) -> Self {
        Self {
            bbox: BBox::from_points(&points),
            points,
            z_range: value_range(&z_array),
            z_array,
            m_range: value_range(&m_array),
            m_array,
        }
    }
}

/// One or more connected sequences of points.
///
/// `parts[i]` is the index in `points` where part `i` begins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolyLine {
    pub bbox: BBox,
    pub parts: Vec<i32>,
    pub points: Vec<Point>,
}

/// Rings share the polyline layout. Rings must be closed and must not
/// self-intersect; the codec does not check either.
pub type Polygon = PolyLine;

impl PolyLine {
    /// Build from one point list per part.
    pub fn new(parts: Vec<Vec<Point>>) -> Self {
        let (parts, points) = flatten_parts(parts);
        Self {
            bbox: BBox::from_points(&points),
            parts,
            points,
        }
    }

    /// Iterate over the points of each part.
    pub fn part_points(&self) -> PartIter<'_> {
        PartIter::new(&self.parts, &self.points)
    }
}

/// Polyline with measures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolyLineM {
    pub bbox: BBox,
    pub parts: Vec<i32>,
    pub points: Vec<Point>,
    pub m_range: [f64; 2],
    pub m_array: Vec<f64>,
}

pub type PolygonM = PolyLineM;

impl PolyLineM {
    pub fn new(parts: Vec<Vec<Point>>, m_array: Vec<f64>) -> Self {
        let (parts, points) = flatten_parts(parts);
        Self {
            bbox: BBox::from_points(&points),
            parts,
            points,
            m_range: value_range(&m_array),
            m_array,
        }
    }
}

/// Polyline with elevations and measures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolyLineZ {
    pub bbox: BBox,
    pub parts: Vec<i32>,
    pub points: Vec<Point>,
    pub z_range: [f64; 2],
    pub z_array: Vec<f64>,
    pub m_range: [f64; 2],
    pub m_array: Vec<f64>,
}

pub type PolygonZ = PolyLineZ;

impl PolyLineZ {
    pub fn new(parts: Vec<Vec<Point>>, z_array: Vec<f64>, m_array: Vec<f64>) -> Self {
        let (parts, points) = flatten_parts(parts);
        Self {
            bbox: BBox::from_points(&points),
            parts,
            points,
            z_range: value_range(&z_array),
            z_array,
            m_range: value_range(&m_array),
            m_array,
        }
    }
}

/// How the vertices of a multipatch part are to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatchType {
    TriangleStrip,
    TriangleFan,
    OuterRing,
    InnerRing,
    FirstRing,
    Ring,
    /// Tag not defined by the format, kept as stored
    Other(i32),
}

impl PatchType {
    pub fn tag(&self) -> i32 {
        match self {
            PatchType::TriangleStrip => 0,
            PatchType::TriangleFan => 1,
            PatchType::OuterRing => 2,
            PatchType::InnerRing => 3,
            PatchType::FirstRing => 4,
            PatchType::Ring => 5,
            PatchType::Other(tag) => *tag,
        }
    }
}

impl From<i32> for PatchType {
    fn from(tag: i32) -> Self {
        match tag {
            0 => PatchType::TriangleStrip,
            1 => PatchType::TriangleFan,
            2 => PatchType::OuterRing,
            3 => PatchType::InnerRing,
            4 => PatchType::FirstRing,
            5 => PatchType::Ring,
            other => PatchType::Other(other),
        }
    }
}

/// Surface made of typed parts, always carrying Z and M arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiPatch {
    pub bbox: BBox,
    pub parts: Vec<i32>,
    pub part_types: Vec<PatchType>,
    pub points: Vec<Point>,
    pub z_range: [f64; 2],
    pub z_array: Vec<f64>,
    pub m_range: [f64; 2],
    pub m_array: Vec<f64>,
}

impl MultiPatch {
    pub fn new(parts: Vec<(PatchType, Vec<Point>)>, z_array: Vec<f64>, m_array: Vec<f64>) -> Self {
        let (part_types, parts): (Vec<_>, Vec<_>) = parts.into_iter().unzip();
        let (parts, points) = flatten_parts(parts);
        Self {
            bbox: BBox::from_points(&points),
            parts,
            part_types,
            points,
            z_range: value_range(&z_array),
            z_array,
            m_range: value_range(&m_array),
            m_array,
        }
    }
}

/// A geometry record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Null,
    Point(Point),
    PolyLine(PolyLine),
    Polygon(Polygon),
    MultiPoint(MultiPoint),
    PointZ(PointZ),
    PolyLineZ(PolyLineZ),
    PolygonZ(PolygonZ),
    MultiPointZ(MultiPointZ),
    PointM(PointM),
    PolyLineM(PolyLineM),
    PolygonM(PolygonM),
    MultiPointM(MultiPointM),
    MultiPatch(MultiPatch),
}

impl Shape {
    /// The type tag this shape is stored under.
    pub fn shape_type(&self) -> ShapeType {
        match self {
            Shape::Null => ShapeType::Null,
            Shape::Point(_) => ShapeType::Point,
            Shape::PolyLine(_) => ShapeType::PolyLine,
            Shape::Polygon(_) => ShapeType::Polygon,
            Shape::MultiPoint(_) => ShapeType::MultiPoint,
            Shape::PointZ(_) => ShapeType::PointZ,
            Shape::PolyLineZ(_) => ShapeType::PolyLineZ,
            Shape::PolygonZ(_) => ShapeType::PolygonZ,
            Shape::MultiPointZ(_) => ShapeType::MultiPointZ,
            Shape::PointM(_) => ShapeType::PointM,
            Shape::PolyLineM(_) => ShapeType::PolyLineM,
            Shape::PolygonM(_) => ShapeType::PolygonM,
            Shape::MultiPointM(_) => ShapeType::MultiPointM,
            Shape::MultiPatch(_) => ShapeType::MultiPatch,
        }
    }

    /// Bounding box computed from the coordinates.
    ///
    /// The stored box of multi-point variants is not consulted.
    pub fn bbox(&self) -> BBox {
        match self {
            Shape::Null => BBox::default(),
            Shape::Point(p) => BBox::from_point(p),
            Shape::PointM(p) => BBox::new(p.x, p.y, p.x, p.y),
            Shape::PointZ(p) => BBox::new(p.x, p.y, p.x, p.y),
            _ => BBox::from_points(self.points()),
        }
    }

    /// Flat point list of multi-point variants; empty for single points and Null.
    pub fn points(&self) -> &[Point] {
        match self {
            Shape::Null | Shape::Point(_) | Shape::PointM(_) | Shape::PointZ(_) => &[],
            Shape::PolyLine(s) | Shape::Polygon(s) => &s.points,
            Shape::PolyLineM(s) | Shape::PolygonM(s) => &s.points,
            Shape::PolyLineZ(s) | Shape::PolygonZ(s) => &s.points,
            Shape::MultiPoint(s) => &s.points,
            Shape::MultiPointM(s) => &s.points,
            Shape::MultiPointZ(s) => &s.points,
            Shape::MultiPatch(s) => &s.points,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Shape::Null)
    }

    /// Check that the parallel arrays agree with the point list.
    ///
    /// Z and M arrays must have one value per point, except that the M array
    /// of a Z variant may be empty. Part starts must be ascending indices
    /// into the point list and a multipatch needs one type per part.
    pub fn validate(&self) -> Result<()> {
        let n = self.points().len();
        let label = self.shape_type().to_string();
        match self {
            Shape::Null | Shape::Point(_) | Shape::PointM(_) | Shape::PointZ(_) => Ok(()),
            Shape::MultiPoint(_) => Ok(()),
            Shape::MultiPointM(s) => check_values(&label, "M", &s.m_array, n, false),
            Shape::MultiPointZ(s) => {
                check_values(&label, "Z", &s.z_array, n, false)?;
                check_values(&label, "M", &s.m_array, n, true)
            }
            Shape::PolyLine(s) | Shape::Polygon(s) => check_parts(&label, &s.parts, n),
            Shape::PolyLineM(s) | Shape::PolygonM(s) => {
                check_parts(&label, &s.parts, n)?;
                check_values(&label, "M", &s.m_array, n, false)
            }
            Shape::PolyLineZ(s) | Shape::PolygonZ(s) => {
                check_parts(&label, &s.parts, n)?;
                check_values(&label, "Z", &s.z_array, n, false)?;
                check_values(&label, "M", &s.m_array, n, true)
            }
            Shape::MultiPatch(s) => {
                check_parts(&label, &s.parts, n)?;
                if s.part_types.len() != s.parts.len() {
                    return Err(ShpError::invalid_value(
                        label,
                        format!(
                            "{} part types for {} parts",
                            s.part_types.len(),
                            s.parts.len()
                        ),
                    ));
                }
                check_values(&label, "Z", &s.z_array, n, false)?;
                check_values(&label, "M", &s.m_array, n, true)
            }
        }
    }
}

fn check_values(label: &str, axis: &str, values: &[f64], n: usize, optional: bool) -> Result<()> {
    if values.len() == n || (optional && values.is_empty()) {
        return Ok(());
    }
    Err(ShpError::invalid_value(
        label,
        format!("{} {axis} values for {n} points", values.len()),
    ))
}

fn check_parts(label: &str, parts: &[i32], n: usize) -> Result<()> {
    let mut previous = 0i64;
    for (i, &start) in parts.iter().enumerate() {
        let start = i64::from(start);
        if start < previous || start >= n as i64 || (i == 0 && start != 0) {
            return Err(ShpError::invalid_value(
                label,
                format!("part {i} starts at {start}, outside 0..{n} or out of order"),
            ));
        }
        previous = start;
    }
    Ok(())
}

/// Iterator over the point slices of a multi-part shape.
pub struct PartIter<'a> {
    parts: &'a [i32],
    points: &'a [Point],
    index: usize,
}

impl<'a> PartIter<'a> {
    fn new(parts: &'a [i32], points: &'a [Point]) -> Self {
        Self {
            parts,
            points,
            index: 0,
        }
    }
}

impl<'a> Iterator for PartIter<'a> {
    type Item = &'a [Point];

    fn next(&mut self) -> Option<Self::Item> {
        let start = *self.parts.get(self.index)? as usize;
        let end = self
            .parts
            .get(self.index + 1)
            .map(|&e| e as usize)
            .unwrap_or(self.points.len());
        self.index += 1;
        self.points.get(start.min(end)..end.min(self.points.len()))
    }
}

/// Concatenate parts into one point list plus start indices.
fn flatten_parts(parts: Vec<Vec<Point>>) -> (Vec<i32>, Vec<Point>) {
    let mut starts = Vec::with_capacity(parts.len());
    let mut points = Vec::with_capacity(parts.iter().map(Vec::len).sum());
    for part in parts {
        starts.push(points.len() as i32);
        points.extend(part);
    }
    (starts, points)
}

/// `[min, max]` of `values`, `[0, 0]` when empty.
pub(crate) fn value_range(values: &[f64]) -> [f64; 2] {
    let mut iter = values.iter().copied();
    let Some(first) = iter.next() else {
        return [0.0, 0.0];
    };
    iter.fold([first, first], |[lo, hi], v| [lo.min(v), hi.max(v)])
}
