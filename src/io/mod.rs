// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! I/O layer for shapefile sets.
//!
//! This module provides the file-level structures (headers, index entries),
//! the random-access and forward-only readers, the writer, and archive
//! support.

pub mod detection;
pub mod header;
pub mod index;

pub use detection::{detect_format, is_shape_file, is_zip_file, FileFormat, FileSetPaths};
pub use header::{RecordHeader, ShapeHeader};
pub use index::{read_index, IndexEntry};

// Reader trait and record iterator
pub mod traits;
pub use traits::{Records, ShapeReader, ShapeRecord};

pub mod reader;
pub mod sequential;
pub mod writer;
pub use reader::Reader;
pub use sequential::SequentialReader;
pub use writer::Writer;

// Archive containers
pub mod archive;
pub use archive::{ArchiveSource, FileSetMembers, ZipArchiveSource, ZipReader, ZipWriter};

// Configuration builders
pub mod builder;
pub use builder::{ReadStrategy, ReaderBuilder, ReaderConfig, WriteMode, WriterBuilder, WriterConfig};
