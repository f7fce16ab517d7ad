// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # shpcodec
//!
//! Reader and writer for ESRI shapefile sets: the `.shp` geometry file, the
//! `.shx` record index and the `.dbf` attribute table, on disk or inside a
//! ZIP archive.
//!
//! ## Architecture
//!
//! - `core/` - Geometry value model, attribute columns, errors
//! - `encoding/` - Geometry record codec and dBase table codec
//! - `io/` - File headers, readers, writer, archive support and builders
//!
//! ## Example: Reading a file set
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use shpcodec::io::{Reader, ShapeReader};
//!
//! let mut reader = Reader::open("roads.shp")?;
//! for record in reader.records() {
//!     let record = record?;
//!     println!("{}: {:?} {:?}", record.index, record.shape.bbox(), record.attributes);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Example: Writing a file set
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use shpcodec::core::{Field, Point, Shape, ShapeType};
//! use shpcodec::io::Writer;
//!
//! let mut writer = Writer::create("cities.shp", ShapeType::Point)?;
//! writer.set_fields(vec![Field::string("NAME", 32)?, Field::number("POP", 9)?])?;
//! let row = writer.write(&Shape::Point(Point::new(2.35, 48.85)))?;
//! writer.write_attributes(row, &["Paris".into(), 2_161_000i64.into()])?;
//! writer.close()?;
//! # Ok(())
//! # }
//! ```

// Core types
pub mod core;

// Re-export core types for convenience
pub use self::core::{
    BBox, Field, FieldType, FieldValue, Point, PointM, PointZ, Result, Shape, ShapeType, ShpError,
};

// Geometry and attribute table codecs
pub mod encoding;

// File sets, readers, writer, archives
pub mod io;

// Re-export key I/O types
pub use io::{
    ReadStrategy, Reader, ReaderBuilder, SequentialReader, ShapeReader, ShapeRecord, WriteMode,
    Writer, WriterBuilder, ZipReader, ZipWriter,
};
