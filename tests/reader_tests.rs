// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Reader tests.
//!
//! Tests cover:
//! - Random-access and forward-only readers agreeing on every shape type
//! - Opening by basename
//! - Missing attribute tables
//! - Damaged geometry files

mod common;

use std::fs;

use common::{lines, write_cities, Fixture};
use shpcodec::core::{
    MultiPatch, MultiPoint, MultiPointM, MultiPointZ, PatchType, Point, PointM, PointZ, PolyLineM,
    PolyLineZ, Polygon, Shape, ShapeType,
};
use shpcodec::io::{
    ReadStrategy, Reader, ReaderBuilder, SequentialReader, ShapeReader, ShapeRecord, Writer,
};
use shpcodec::ShpError;

fn sample_shapes(shape_type: ShapeType) -> Vec<Shape> {
    let pts = vec![Point::new(1.0, 2.0), Point::new(3.0, -4.0), Point::new(5.5, 6.5)];
    match shape_type {
        ShapeType::Point => vec![
            Shape::Point(Point::new(1.0, 2.0)),
            Shape::Point(Point::new(-3.0, 4.0)),
        ],
        ShapeType::PointM => vec![Shape::PointM(PointM {
            x: 1.0,
            y: 2.0,
            m: 3.0,
        })],
        ShapeType::PointZ => vec![Shape::PointZ(PointZ {
            x: 1.0,
            y: 2.0,
            z: 3.0,
            m: 4.0,
        })],
        ShapeType::MultiPoint => vec![Shape::MultiPoint(MultiPoint::new(pts))],
        ShapeType::MultiPointM => vec![Shape::MultiPointM(MultiPointM::new(
            pts,
            vec![0.1, 0.2, 0.3],
        ))],
        ShapeType::MultiPointZ => vec![Shape::MultiPointZ(MultiPointZ::new(
            pts,
            vec![10.0, 20.0, 30.0],
            vec![0.1, 0.2, 0.3],
        ))],
        ShapeType::PolyLine => lines(3),
        ShapeType::Polygon => vec![Shape::Polygon(Polygon::new(vec![vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 0.0),
        ]]))],
        ShapeType::PolyLineM => vec![Shape::PolyLineM(PolyLineM::new(
            vec![pts.clone(), vec![Point::new(9.0, 9.0), Point::new(8.0, 8.0)]],
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
        ))],
        ShapeType::PolygonM => vec![Shape::PolygonM(PolyLineM::new(
            vec![pts],
            vec![1.0, 2.0, 3.0],
        ))],
        ShapeType::PolyLineZ => vec![Shape::PolyLineZ(PolyLineZ::new(
            vec![pts],
            vec![7.0, 8.0, 9.0],
            vec![1.0, 2.0, 3.0],
        ))],
        ShapeType::PolygonZ => vec![Shape::PolygonZ(PolyLineZ::new(
            vec![pts.clone(), pts],
            vec![1.0; 6],
            vec![2.0; 6],
        ))],
        ShapeType::MultiPatch => vec![Shape::MultiPatch(MultiPatch::new(
            vec![
                (PatchType::TriangleStrip, pts.clone()),
                (PatchType::OuterRing, pts),
            ],
            vec![0.5; 6],
            vec![0.0; 6],
        ))],
        ShapeType::Null => vec![Shape::Null, Shape::Null],
    }
}

fn read_all<R: ShapeReader>(reader: &mut R) -> Vec<ShapeRecord> {
    let records: Vec<_> = reader.records().collect::<Result<_, _>>().unwrap();
    assert!(reader.err().is_none());
    records
}

#[test]
fn test_readers_agree_on_every_type() {
    for shape_type in shpcodec::core::ALL_SHAPE_TYPES {
        let fx = Fixture::new("shapes");
        let shapes = sample_shapes(shape_type);
        let mut writer = Writer::create(&fx.shp, shape_type).unwrap();
        for shape in &shapes {
            writer.write(shape).unwrap();
        }
        writer.close().unwrap();

        let mut random = Reader::open(&fx.shp).unwrap();
        let mut sequential = SequentialReader::open(&fx.shp).unwrap();
        assert_eq!(random.shape_type(), shape_type);
        assert_eq!(random.bbox(), sequential.bbox());

        let from_random = read_all(&mut random);
        let from_sequential = read_all(&mut sequential);
        assert_eq!(from_random, from_sequential, "{shape_type}");
        let read: Vec<_> = from_random.into_iter().map(|r| r.shape).collect();
        assert_eq!(read, shapes, "{shape_type}");
    }
}

#[test]
fn test_open_by_basename() {
    let fx = Fixture::new("cities");
    write_cities(&fx.shp);
    let basename = fx.dir.path().join("cities");

    let mut reader = Reader::open(&basename).unwrap();
    assert_eq!(read_all(&mut reader).len(), 3);
    let mut reader = SequentialReader::open(&basename).unwrap();
    assert_eq!(read_all(&mut reader)[1].attributes[0], "Paris");
}

#[test]
fn test_builder_strategies_match() {
    let fx = Fixture::new("cities");
    write_cities(&fx.shp);

    let mut auto = ReaderBuilder::new().path(&fx.shp).build().unwrap();
    let mut forward = ReaderBuilder::new()
        .path(&fx.shp)
        .strategy(ReadStrategy::Sequential)
        .build()
        .unwrap();
    assert_eq!(read_all(&mut auto), read_all(&mut forward));
}

#[test]
fn test_missing_attribute_table() {
    let fx = Fixture::new("cities");
    write_cities(&fx.shp);
    fs::remove_file(fx.sibling("dbf")).unwrap();

    let mut reader = Reader::open(&fx.shp).unwrap();
    assert!(reader.advance());
    assert!(reader.fields().unwrap().is_empty());
    assert!(matches!(
        reader.attribute(0),
        Err(ShpError::MissingAttributeTable { .. })
    ));
    assert!(matches!(
        reader.read_attribute(0, 0),
        Err(ShpError::MissingAttributeTable { .. })
    ));
    assert!(reader.advance());

    let mut reader = SequentialReader::open(&fx.shp).unwrap();
    let records = read_all(&mut reader);
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.attributes.is_empty()));
}

#[test]
fn test_out_of_range_cells() {
    let fx = Fixture::new("cities");
    write_cities(&fx.shp);
    let mut reader = Reader::open(&fx.shp).unwrap();
    assert!(matches!(
        reader.read_attribute(3, 0),
        Err(ShpError::RowOutOfRange { row: 3, count: 3 })
    ));
    assert!(matches!(
        reader.read_attribute(0, 4),
        Err(ShpError::FieldIndexOutOfRange { index: 4, count: 4 })
    ));
}

#[test]
fn test_truncated_file_reports_error() {
    let fx = Fixture::new("lines");
    let mut writer = Writer::create(&fx.shp, ShapeType::PolyLine).unwrap();
    for shape in lines(3) {
        writer.write(&shape).unwrap();
    }
    writer.close().unwrap();
    let bytes = fs::read(&fx.shp).unwrap();
    fs::write(&fx.shp, &bytes[..bytes.len() - 12]).unwrap();

    let mut reader = Reader::open(&fx.shp).unwrap();
    let results: Vec<_> = reader.records().collect();
    assert_eq!(results.len(), 3);
    assert!(results[..2].iter().all(|r| r.is_ok()));
    assert!(results[2].as_ref().unwrap_err().is_truncated());
    assert!(reader.err().unwrap().is_truncated());
    assert!(!reader.advance());
}

#[test]
fn test_bad_magic_rejected() {
    let fx = Fixture::new("cities");
    write_cities(&fx.shp);
    let mut bytes = fs::read(&fx.shp).unwrap();
    bytes[0..4].copy_from_slice(&1234i32.to_be_bytes());
    fs::write(&fx.shp, &bytes).unwrap();

    assert!(matches!(
        Reader::open(&fx.shp).err(),
        Some(ShpError::MalformedHeader { .. })
    ));
    assert!(matches!(
        SequentialReader::open(&fx.shp).err(),
        Some(ShpError::MalformedHeader { .. })
    ));
}

#[test]
fn test_unknown_shape_type_rejected() {
    let fx = Fixture::new("cities");
    write_cities(&fx.shp);
    let mut bytes = fs::read(&fx.shp).unwrap();
    bytes[32..36].copy_from_slice(&2i32.to_le_bytes());
    fs::write(&fx.shp, &bytes).unwrap();

    assert!(matches!(
        Reader::open(&fx.shp).err(),
        Some(ShpError::UnsupportedShapeType { tag: 2 })
    ));
}
