// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use shpcodec::core::{Field, FieldValue, Point, PolyLine, Shape, ShapeType};
use shpcodec::io::Writer;
use tempfile::TempDir;

// ============================================================================
// Fixtures
// ============================================================================

/// Temporary directory plus the `.shp` path of a file set inside it.
pub struct Fixture {
    pub dir: TempDir,
    pub shp: PathBuf,
}

impl Fixture {
    pub fn new(name: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let shp = dir.path().join(format!("{name}.shp"));
        Self { dir, shp }
    }

    pub fn sibling(&self, ext: &str) -> PathBuf {
        self.shp.with_extension(ext)
    }
}

/// Columns used by the city fixtures.
pub fn city_fields() -> Vec<Field> {
    vec![
        Field::string("NAME", 12).unwrap(),
        Field::number("POP", 8).unwrap(),
        Field::float("AREA", 10, 2).unwrap(),
        Field::logical("CAPITAL").unwrap(),
    ]
}

/// Rows matching [`city_points`].
pub fn city_rows() -> Vec<Vec<FieldValue>> {
    vec![
        vec!["Lyon".into(), 513_275i64.into(), 47.87.into(), false.into()],
        vec!["Paris".into(), 2_161_000i64.into(), 105.4.into(), true.into()],
        vec!["Nice".into(), 342_669i64.into(), 71.92.into(), false.into()],
    ]
}

pub fn city_points() -> Vec<Point> {
    vec![
        Point::new(4.83, 45.76),
        Point::new(2.35, 48.85),
        Point::new(7.26, 43.70),
    ]
}

/// Write the city point set to `path`.
pub fn write_cities(path: &Path) {
    let mut writer = Writer::create(path, ShapeType::Point).unwrap();
    writer.set_fields(city_fields()).unwrap();
    for (point, row) in city_points().into_iter().zip(city_rows()) {
        let index = writer.write(&Shape::Point(point)).unwrap();
        writer.write_attributes(index, &row).unwrap();
    }
    writer.close().unwrap();
}

/// Two-part polylines, one per `offset`.
pub fn lines(count: usize) -> Vec<Shape> {
    (0..count)
        .map(|i| {
            let o = i as f64 * 10.0;
            Shape::PolyLine(PolyLine::new(vec![
                vec![Point::new(o, o), Point::new(o + 1.0, o + 2.0)],
                vec![Point::new(o + 3.0, o), Point::new(o + 4.0, o + 5.0)],
            ]))
        })
        .collect()
}

// ============================================================================
// Byte helpers
// ============================================================================

pub fn be_i32(bytes: &[u8], offset: usize) -> i32 {
    i32::from_be_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

pub fn le_i32(bytes: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

pub fn le_f64(bytes: &[u8], offset: usize) -> f64 {
    f64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap())
}
