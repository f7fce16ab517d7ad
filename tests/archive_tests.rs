// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ZIP archive tests.
//!
//! Tests cover:
//! - Writing a file set into an archive and reading it back
//! - Discovery of the single file set in an archive
//! - Reading archived copies of files written to disk

mod common;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use common::{city_fields, city_points, city_rows, write_cities, Fixture};
use shpcodec::core::{Shape, ShapeType};
use shpcodec::io::{ReadStrategy, Reader, ReaderBuilder, ShapeReader, ZipReader, ZipWriter};
use shpcodec::ShpError;
use zip::write::SimpleFileOptions;

/// Store the given files under the given member names.
fn zip_files(archive: &Path, members: &[(&str, PathBuf)]) {
    let file = fs::File::create(archive).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    for (name, path) in members {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(&fs::read(path).unwrap()).unwrap();
    }
    zip.finish().unwrap();
}

#[test]
fn test_zip_writer_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("cities.zip");

    let mut writer = ZipWriter::new("cities", ShapeType::Point).unwrap();
    writer.set_fields(city_fields()).unwrap();
    for (point, row) in city_points().into_iter().zip(city_rows()) {
        writer.write_record(&Shape::Point(point), &row).unwrap();
    }
    writer.save(&archive).unwrap();

    let mut reader = ZipReader::open(&archive).unwrap();
    assert_eq!(reader.members().shp, "cities.shp");
    assert_eq!(reader.members().shx.as_deref(), Some("cities.shx"));
    assert_eq!(reader.attribute_count().unwrap(), 3);
    let records: Vec<_> = reader.records().collect::<Result<_, _>>().unwrap();
    let shapes: Vec<_> = records.iter().map(|r| r.shape.clone()).collect();
    let expected: Vec<_> = city_points().into_iter().map(Shape::Point).collect();
    assert_eq!(shapes, expected);
    assert_eq!(records[1].attributes, vec!["Paris", "2161000", "105.40", "Yes"]);
}

#[test]
fn test_archive_matches_files_on_disk() {
    let fx = Fixture::new("cities");
    write_cities(&fx.shp);
    let archive = fx.dir.path().join("bundle.zip");
    zip_files(
        &archive,
        &[
            ("data/cities.shp", fx.shp.clone()),
            ("data/cities.shx", fx.sibling("shx")),
            ("data/cities.dbf", fx.sibling("dbf")),
        ],
    );

    let mut on_disk = Reader::open(&fx.shp).unwrap();
    let mut archived = ReaderBuilder::new().path(&archive).build().unwrap();
    let a: Vec<_> = on_disk.records().collect::<Result<_, _>>().unwrap();
    let b: Vec<_> = archived.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_archive_without_attribute_table() {
    let fx = Fixture::new("cities");
    write_cities(&fx.shp);
    let archive = fx.dir.path().join("bare.zip");
    zip_files(&archive, &[("cities.shp", fx.shp.clone())]);

    let mut reader = ZipReader::open(&archive).unwrap();
    assert!(reader.members().dbf.is_none());
    assert!(reader.fields().unwrap().is_empty());
    let records: Vec<_> = reader.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(records.len(), 3);
}

#[test]
fn test_discovery_failures() {
    let fx = Fixture::new("cities");
    write_cities(&fx.shp);

    let none = fx.dir.path().join("none.zip");
    zip_files(&none, &[("cities.dbf", fx.sibling("dbf"))]);
    assert!(matches!(
        ZipReader::open(&none).err(),
        Some(ShpError::NoShapefileInArchive)
    ));

    let two = fx.dir.path().join("two.zip");
    zip_files(&two, &[("a.shp", fx.shp.clone()), ("b.shp", fx.shp.clone())]);
    match ZipReader::open(&two).err() {
        Some(ShpError::MultipleShapefilesInArchive { candidates }) => {
            assert_eq!(candidates, vec!["a.shp", "b.shp"]);
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let mut reader = ReaderBuilder::new()
        .path(&two)
        .member("b.shp")
        .build()
        .unwrap();
    assert!(reader.advance());
    assert!(matches!(
        ZipReader::open_by_name(&two, "c.shp").err(),
        Some(ShpError::MemberNotFound { .. })
    ));
}

#[test]
fn test_random_access_refused_for_archives() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("pts.zip");
    let mut writer = ZipWriter::new("pts", ShapeType::Point).unwrap();
    writer.write(&Shape::Point(city_points()[0])).unwrap();
    writer.save(&archive).unwrap();

    let err = ReaderBuilder::new()
        .path(&archive)
        .strategy(ReadStrategy::RandomAccess)
        .build()
        .err();
    assert!(matches!(err, Some(ShpError::Archive { .. })));
}
