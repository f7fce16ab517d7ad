// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Geometry record codec.
//!
//! Every record body starts with a little-endian `i32` type tag, followed by
//! the variant's fields in a fixed order. All payload fields are
//! little-endian; arrays are preceded (earlier in the record) by their
//! element count and are read in one contiguous read.
//!
//! | Variant              | Fields after the tag                                          |
//! |----------------------|---------------------------------------------------------------|
//! | Null                 | -                                                             |
//! | Point                | x, y                                                          |
//! | PointM               | x, y, m                                                       |
//! | PointZ               | x, y, z, m                                                    |
//! | MultiPoint           | bbox, n_points, points                                        |
//! | MultiPointM          | .. + m_range, m[]                                             |
//! | MultiPointZ          | .. + z_range, z[], m_range, m[]                               |
//! | PolyLine / Polygon   | bbox, n_parts, n_points, parts[], points                      |
//! | PolyLineM / PolygonM | .. + m_range, m[]                                             |
//! | PolyLineZ / PolygonZ | .. + z_range, z[], m_range, m[]                               |
//! | MultiPatch           | bbox, n_parts, n_points, parts[], part_types[], points, Z, M  |
//!
//! The M block of Z variants is optional on read: when the record's declared
//! length ends right after the Z block the measures are left empty.

use std::io::{Read, Write};

use crate::core::{
    BBox, MultiPatch, MultiPoint, MultiPointM, MultiPointZ, PatchType, Point, PointM, PointZ,
    PolyLine, PolyLineM, PolyLineZ, Shape, ShapeType,
};
use crate::encoding::cursor::ShapeCursor;
use crate::{Result, ShpError};

/// Per-variant wire format.
trait WireShape: Sized {
    fn decode<R: Read>(cursor: &mut ShapeCursor<'_, R>) -> Result<Self>;
    fn encode(&self, buf: &mut Vec<u8>);
}

/// Read a record body (type tag + fields) declared as `limit` bytes long.
///
/// Returns the shape and the number of bytes consumed. The caller decides
/// what to do with any bytes left over.
pub fn read_shape<R: Read>(reader: &mut R, limit: u64) -> Result<(Shape, u64)> {
    let mut cursor = ShapeCursor::new(reader, limit);
    let shape_type = ShapeType::from_tag(cursor.i32()?)?;
    let shape = decode_body(&mut cursor, shape_type)?;
    Ok((shape, cursor.consumed()))
}

/// Append the record body (type tag + fields) of `shape` to `buf`.
pub fn write_shape(shape: &Shape, buf: &mut Vec<u8>) {
    write_i32(buf, shape.shape_type().tag());
    match shape {
        Shape::Null => {}
        Shape::Point(s) => s.encode(buf),
        Shape::PointM(s) => s.encode(buf),
        Shape::PointZ(s) => s.encode(buf),
        Shape::MultiPoint(s) => s.encode(buf),
        Shape::MultiPointM(s) => s.encode(buf),
        Shape::MultiPointZ(s) => s.encode(buf),
        Shape::PolyLine(s) | Shape::Polygon(s) => s.encode(buf),
        Shape::PolyLineM(s) | Shape::PolygonM(s) => s.encode(buf),
        Shape::PolyLineZ(s) | Shape::PolygonZ(s) => s.encode(buf),
        Shape::MultiPatch(s) => s.encode(buf),
    }
}

fn decode_body<R: Read>(cursor: &mut ShapeCursor<'_, R>, shape_type: ShapeType) -> Result<Shape> {
    Ok(match shape_type {
        ShapeType::Null => Shape::Null,
        ShapeType::Point => Shape::Point(Point::decode(cursor)?),
        ShapeType::PointM => Shape::PointM(PointM::decode(cursor)?),
        ShapeType::PointZ => Shape::PointZ(PointZ::decode(cursor)?),
        ShapeType::MultiPoint => Shape::MultiPoint(MultiPoint::decode(cursor)?),
        ShapeType::MultiPointM => Shape::MultiPointM(MultiPointM::decode(cursor)?),
        ShapeType::MultiPointZ => Shape::MultiPointZ(MultiPointZ::decode(cursor)?),
        ShapeType::PolyLine => Shape::PolyLine(PolyLine::decode(cursor)?),
        ShapeType::Polygon => Shape::Polygon(PolyLine::decode(cursor)?),
        ShapeType::PolyLineM => Shape::PolyLineM(PolyLineM::decode(cursor)?),
        ShapeType::PolygonM => Shape::PolygonM(PolyLineM::decode(cursor)?),
        ShapeType::PolyLineZ => Shape::PolyLineZ(PolyLineZ::decode(cursor)?),
        ShapeType::PolygonZ => Shape::PolygonZ(PolyLineZ::decode(cursor)?),
        ShapeType::MultiPatch => Shape::MultiPatch(MultiPatch::decode(cursor)?),
    })
}

impl Shape {
    /// Decode one record body (type tag + fields) from `reader`.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Shape> {
        read_shape(reader, u64::MAX).map(|(shape, _)| shape)
    }

    /// Encode this shape's record body (type tag + fields) to `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        write_shape(self, &mut buf);
        writer
            .write_all(&buf)
            .map_err(|e| ShpError::io("Shape::write_to", &e))
    }

    /// Size in bytes of the record body, type tag included.
    pub fn encoded_len(&self) -> usize {
        let n = self.points().len();
        let parts = match self {
            Shape::PolyLine(s) | Shape::Polygon(s) => s.parts.len(),
            Shape::PolyLineM(s) | Shape::PolygonM(s) => s.parts.len(),
            Shape::PolyLineZ(s) | Shape::PolygonZ(s) => s.parts.len(),
            Shape::MultiPatch(s) => s.parts.len(),
            _ => 0,
        };
        let m_block = |m: &[f64]| if m.is_empty() { 0 } else { 16 + 8 * n };
        let body = match self {
            Shape::Null => 0,
            Shape::Point(_) => 16,
            Shape::PointM(_) => 24,
            Shape::PointZ(_) => 32,
            Shape::MultiPoint(_) => 36 + 16 * n,
            Shape::MultiPointM(_) => 36 + 16 * n + 16 + 8 * n,
            Shape::MultiPointZ(s) => 36 + 16 * n + 16 + 8 * n + m_block(&s.m_array),
            Shape::PolyLine(_) | Shape::Polygon(_) => 40 + 4 * parts + 16 * n,
            Shape::PolyLineM(_) | Shape::PolygonM(_) => 40 + 4 * parts + 16 * n + 16 + 8 * n,
            Shape::PolyLineZ(s) | Shape::PolygonZ(s) => {
                40 + 4 * parts + 16 * n + 16 + 8 * n + m_block(&s.m_array)
            }
            Shape::MultiPatch(s) => 40 + 8 * parts + 16 * n + 16 + 8 * n + m_block(&s.m_array),
        };
        4 + body
    }
}

// =============================================================================
// Variant codecs
// =============================================================================

impl WireShape for Point {
    fn decode<R: Read>(cursor: &mut ShapeCursor<'_, R>) -> Result<Self> {
        cursor.point()
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        write_point(buf, self);
    }
}

impl WireShape for PointM {
    fn decode<R: Read>(cursor: &mut ShapeCursor<'_, R>) -> Result<Self> {
        Ok(PointM {
            x: cursor.f64()?,
            y: cursor.f64()?,
            m: cursor.f64()?,
        })
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        write_f64(buf, self.x);
        write_f64(buf, self.y);
        write_f64(buf, self.m);
    }
}

impl WireShape for PointZ {
    fn decode<R: Read>(cursor: &mut ShapeCursor<'_, R>) -> Result<Self> {
        let x = cursor.f64()?;
        let y = cursor.f64()?;
        let z = cursor.f64()?;
        let m = if cursor.has_remaining(8) {
            cursor.f64()?
        } else {
            0.0
        };
        Ok(PointZ { x, y, z, m })
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        write_f64(buf, self.x);
        write_f64(buf, self.y);
        write_f64(buf, self.z);
        write_f64(buf, self.m);
    }
}

impl WireShape for MultiPoint {
    fn decode<R: Read>(cursor: &mut ShapeCursor<'_, R>) -> Result<Self> {
        let bbox = cursor.bbox()?;
        let num_points = cursor.count("point")?;
        let points = cursor.points(num_points)?;
        Ok(MultiPoint { bbox, points })
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        write_bbox(buf, &self.bbox);
        write_i32(buf, self.points.len() as i32);
        write_points(buf, &self.points);
    }
}

impl WireShape for MultiPointM {
    fn decode<R: Read>(cursor: &mut ShapeCursor<'_, R>) -> Result<Self> {
        let bbox = cursor.bbox()?;
        let num_points = cursor.count("point")?;
        let points = cursor.points(num_points)?;
        let (m_range, m_array) = read_measures(cursor, num_points)?;
        Ok(MultiPointM {
            bbox,
            points,
            m_range,
            m_array,
        })
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        write_bbox(buf, &self.bbox);
        write_i32(buf, self.points.len() as i32);
        write_points(buf, &self.points);
        write_values(buf, &self.m_range, &self.m_array);
    }
}

impl WireShape for MultiPointZ {
    fn decode<R: Read>(cursor: &mut ShapeCursor<'_, R>) -> Result<Self> {
        let bbox = cursor.bbox()?;
        let num_points = cursor.count("point")?;
        let points = cursor.points(num_points)?;
        let z_range = cursor.range()?;
        let z_array = cursor.f64_array(num_points)?;
        let (m_range, m_array) = read_optional_measures(cursor, num_points)?;
        Ok(MultiPointZ {
            bbox,
            points,
            z_range,
            z_array,
            m_range,
            m_array,
        })
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        write_bbox(buf, &self.bbox);
        write_i32(buf, self.points.len() as i32);
        write_points(buf, &self.points);
        write_values(buf, &self.z_range, &self.z_array);
        write_optional_values(buf, &self.m_range, &self.m_array);
    }
}

/// Shared prefix of every part-based variant.
struct PartsHeader {
    bbox: BBox,
    num_parts: usize,
    num_points: usize,
}

fn read_parts_header<R: Read>(cursor: &mut ShapeCursor<'_, R>) -> Result<PartsHeader> {
    Ok(PartsHeader {
        bbox: cursor.bbox()?,
        num_parts: cursor.count("part")?,
        num_points: cursor.count("point")?,
    })
}

fn write_parts_header(buf: &mut Vec<u8>, bbox: &BBox, parts: &[i32], points: &[Point]) {
    write_bbox(buf, bbox);
    write_i32(buf, parts.len() as i32);
    write_i32(buf, points.len() as i32);
}

impl WireShape for PolyLine {
    fn decode<R: Read>(cursor: &mut ShapeCursor<'_, R>) -> Result<Self> {
        let header = read_parts_header(cursor)?;
        let parts = cursor.i32_array(header.num_parts)?;
        let points = cursor.points(header.num_points)?;
        Ok(PolyLine {
            bbox: header.bbox,
            parts,
            points,
        })
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        write_parts_header(buf, &self.bbox, &self.parts, &self.points);
        write_i32s(buf, &self.parts);
        write_points(buf, &self.points);
    }
}

impl WireShape for PolyLineM {
    fn decode<R: Read>(cursor: &mut ShapeCursor<'_, R>) -> Result<Self> {
        let header = read_parts_header(cursor)?;
        let parts = cursor.i32_array(header.num_parts)?;
        let points = cursor.points(header.num_points)?;
        let (m_range, m_array) = read_measures(cursor, header.num_points)?;
        Ok(PolyLineM {
            bbox: header.bbox,
            parts,
            points,
            m_range,
            m_array,
        })
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        write_parts_header(buf, &self.bbox, &self.parts, &self.points);
        write_i32s(buf, &self.parts);
        write_points(buf, &self.points);
        write_values(buf, &self.m_range, &self.m_array);
    }
}

impl WireShape for PolyLineZ {
    fn decode<R: Read>(cursor: &mut ShapeCursor<'_, R>) -> Result<Self> {
        let header = read_parts_header(cursor)?;
        let parts = cursor.i32_array(header.num_parts)?;
        let points = cursor.points(header.num_points)?;
        let z_range = cursor.range()?;
        let z_array = cursor.f64_array(header.num_points)?;
        let (m_range, m_array) = read_optional_measures(cursor, header.num_points)?;
        Ok(PolyLineZ {
            bbox: header.bbox,
            parts,
            points,
            z_range,
            z_array,
            m_range,
            m_array,
        })
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        write_parts_header(buf, &self.bbox, &self.parts, &self.points);
        write_i32s(buf, &self.parts);
        write_points(buf, &self.points);
        write_values(buf, &self.z_range, &self.z_array);
        write_optional_values(buf, &self.m_range, &self.m_array);
    }
}

impl WireShape for MultiPatch {
    fn decode<R: Read>(cursor: &mut ShapeCursor<'_, R>) -> Result<Self> {
        let header = read_parts_header(cursor)?;
        let parts = cursor.i32_array(header.num_parts)?;
        let part_types = cursor
            .i32_array(header.num_parts)?
            .into_iter()
            .map(PatchType::from)
            .collect();
        let points = cursor.points(header.num_points)?;
        let z_range = cursor.range()?;
        let z_array = cursor.f64_array(header.num_points)?;
        let (m_range, m_array) = read_optional_measures(cursor, header.num_points)?;
        Ok(MultiPatch {
            bbox: header.bbox,
            parts,
            part_types,
            points,
            z_range,
            z_array,
            m_range,
            m_array,
        })
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        write_parts_header(buf, &self.bbox, &self.parts, &self.points);
        write_i32s(buf, &self.parts);
        for part_type in &self.part_types {
            write_i32(buf, part_type.tag());
        }
        write_points(buf, &self.points);
        write_values(buf, &self.z_range, &self.z_array);
        write_optional_values(buf, &self.m_range, &self.m_array);
    }
}

fn read_measures<R: Read>(cursor: &mut ShapeCursor<'_, R>, n: usize) -> Result<([f64; 2], Vec<f64>)> {
    let range = cursor.range()?;
    let values = cursor.f64_array(n)?;
    Ok((range, values))
}

/// Measures after a Z block, absent when the record ends early.
fn read_optional_measures<R: Read>(
    cursor: &mut ShapeCursor<'_, R>,
    n: usize,
) -> Result<([f64; 2], Vec<f64>)> {
    if !cursor.has_remaining(16 + 8 * n as u64) {
        return Ok(([0.0, 0.0], Vec::new()));
    }
    read_measures(cursor, n)
}

// =============================================================================
// Helper functions
// =============================================================================

/// Write i32 in little-endian format.
fn write_i32(buf: &mut Vec<u8>, value: i32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Write f64 in little-endian format.
fn write_f64(buf: &mut Vec<u8>, value: f64) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn write_i32s(buf: &mut Vec<u8>, values: &[i32]) {
    for &v in values {
        write_i32(buf, v);
    }
}

fn write_point(buf: &mut Vec<u8>, point: &Point) {
    write_f64(buf, point.x);
    write_f64(buf, point.y);
}

fn write_points(buf: &mut Vec<u8>, points: &[Point]) {
    for p in points {
        write_point(buf, p);
    }
}

pub(crate) fn write_bbox(buf: &mut Vec<u8>, bbox: &BBox) {
    write_f64(buf, bbox.min_x);
    write_f64(buf, bbox.min_y);
    write_f64(buf, bbox.max_x);
    write_f64(buf, bbox.max_y);
}

/// Range followed by the value array.
fn write_values(buf: &mut Vec<u8>, range: &[f64; 2], values: &[f64]) {
    write_f64(buf, range[0]);
    write_f64(buf, range[1]);
    for &v in values {
        write_f64(buf, v);
    }
}

/// Measure block of a Z variant, left out entirely when there are no measures.
fn write_optional_values(buf: &mut Vec<u8>, range: &[f64; 2], values: &[f64]) {
    if !values.is_empty() {
        write_values(buf, range, values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn round_trip(shape: Shape) {
        let mut buf = Vec::new();
        write_shape(&shape, &mut buf);
        assert_eq!(
            buf.len(),
            shape.encoded_len(),
            "encoded_len mismatch for {}",
            shape.shape_type()
        );
        let (decoded, consumed) = read_shape(&mut Cursor::new(&buf), buf.len() as u64).unwrap();
        assert_eq!(consumed, buf.len() as u64);
        assert_eq!(decoded, shape);
    }

    fn square(offset: f64) -> Vec<Point> {
        vec![
            Point::new(offset, offset),
            Point::new(offset, offset + 1.0),
            Point::new(offset + 1.0, offset + 1.0),
            Point::new(offset + 1.0, offset),
            Point::new(offset, offset),
        ]
    }

    #[test]
    fn test_round_trip_single_points() {
        round_trip(Shape::Null);
        round_trip(Shape::Point(Point::new(1.5, -2.25)));
        round_trip(Shape::PointM(PointM {
            x: 1.0,
            y: 2.0,
            m: 3.0,
        }));
        round_trip(Shape::PointZ(PointZ {
            x: 1.0,
            y: 2.0,
            z: 3.0,
            m: 4.0,
        }));
    }

    #[test]
    fn test_round_trip_multipoints() {
        round_trip(Shape::MultiPoint(MultiPoint::new(Vec::new())));
        round_trip(Shape::MultiPoint(MultiPoint::new(square(0.0))));
        round_trip(Shape::MultiPointM(MultiPointM::new(
            square(2.0),
            vec![0.0, 1.0, 2.0, 3.0, 4.0],
        )));
        round_trip(Shape::MultiPointZ(MultiPointZ::new(
            square(-3.0),
            vec![10.0, 11.0, 12.0, 13.0, 14.0],
            vec![0.5; 5],
        )));
    }

    #[test]
    fn test_round_trip_part_shapes() {
        round_trip(Shape::PolyLine(PolyLine::new(Vec::new())));
        round_trip(Shape::PolyLine(PolyLine::new(vec![square(0.0)])));
        round_trip(Shape::Polygon(PolyLine::new(vec![square(0.0), square(5.0)])));
        round_trip(Shape::PolyLineM(PolyLineM::new(
            vec![square(1.0)],
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
        )));
        round_trip(Shape::PolygonM(PolyLineM::new(
            vec![square(1.0), square(3.0)],
            vec![0.0; 10],
        )));
        round_trip(Shape::PolyLineZ(PolyLineZ::new(
            vec![square(0.0), square(4.0)],
            (0..10).map(f64::from).collect(),
            (0..10).map(|v| f64::from(v) * 0.5).collect(),
        )));
        round_trip(Shape::PolygonZ(PolyLineZ::new(
            vec![square(7.0)],
            vec![1.0; 5],
            vec![2.0; 5],
        )));
    }

    #[test]
    fn test_round_trip_multipatch() {
        round_trip(Shape::MultiPatch(MultiPatch::new(
            vec![
                (PatchType::OuterRing, square(0.0)),
                (PatchType::InnerRing, square(0.25)),
                (PatchType::Other(42), vec![Point::new(9.0, 9.0)]),
            ],
            (0..11).map(f64::from).collect(),
            vec![0.0; 11],
        )));
    }

    #[test]
    fn test_point_wire_layout() {
        let mut buf = Vec::new();
        write_shape(&Shape::Point(Point::new(1.0, 2.0)), &mut buf);
        assert_eq!(&buf[0..4], &1i32.to_le_bytes());
        assert_eq!(&buf[4..12], &1.0f64.to_le_bytes());
        assert_eq!(&buf[12..20], &2.0f64.to_le_bytes());
    }

    #[test]
    fn test_unknown_tag_is_hard_error() {
        let buf = 2i32.to_le_bytes().to_vec();
        let err = read_shape(&mut Cursor::new(buf), 4).unwrap_err();
        assert!(matches!(err, ShpError::UnsupportedShapeType { tag: 2 }));
    }

    #[test]
    fn test_polylinez_without_measures() {
        let line = PolyLineZ::new(vec![square(0.0)], vec![3.0; 5], Vec::new());
        let mut buf = Vec::new();
        write_i32(&mut buf, ShapeType::PolyLineZ.tag());
        write_parts_header(&mut buf, &line.bbox, &line.parts, &line.points);
        write_i32s(&mut buf, &line.parts);
        write_points(&mut buf, &line.points);
        write_values(&mut buf, &line.z_range, &line.z_array);

        let mut encoded = Vec::new();
        write_shape(&Shape::PolyLineZ(line.clone()), &mut encoded);
        assert_eq!(encoded, buf);
        assert_eq!(Shape::PolyLineZ(line.clone()).encoded_len(), buf.len());

        let (decoded, consumed) = read_shape(&mut Cursor::new(&buf), buf.len() as u64).unwrap();
        assert_eq!(consumed, buf.len() as u64);
        assert_eq!(decoded, Shape::PolyLineZ(line));
    }

    #[test]
    fn test_truncated_body() {
        let mut buf = Vec::new();
        write_shape(&Shape::PolyLine(PolyLine::new(vec![square(0.0)])), &mut buf);
        buf.truncate(buf.len() - 3);
        let err = Shape::read_from(&mut Cursor::new(buf)).unwrap_err();
        assert!(err.is_truncated());
    }

    #[test]
    fn test_write_to_and_read_from() {
        let shape = Shape::Polygon(PolyLine::new(vec![square(1.0)]));
        let mut out = Vec::new();
        shape.write_to(&mut out).unwrap();
        let decoded = Shape::read_from(&mut Cursor::new(out)).unwrap();
        assert_eq!(decoded, shape);
    }
}
