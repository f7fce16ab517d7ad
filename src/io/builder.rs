// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Builders for configuring readers and writers.
//!
//! The `ReaderBuilder` picks between random-access and forward-only
//! reading; the `WriterBuilder` picks between creating a new file set and
//! appending to an existing one.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::archive::ZipReader;
use super::detection::{detect_format, FileFormat};
use super::reader::Reader;
use super::sequential::SequentialReader;
use super::traits::ShapeReader;
use super::writer::Writer;
use crate::core::ShapeType;
use crate::{Result, ShpError};

/// Reading strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadStrategy {
    /// Seek to each record; requires seekable files on disk
    RandomAccess,
    /// Forward-only; works for archive members and plain files
    Sequential,
    /// Sequential for archives, random access otherwise
    #[default]
    Auto,
}

impl ReadStrategy {
    /// Resolve `Auto` for the given container format.
    pub fn resolve(&self, format: FileFormat) -> ReadStrategy {
        match self {
            ReadStrategy::Auto => match format {
                FileFormat::Zip => ReadStrategy::Sequential,
                FileFormat::Shapefile | FileFormat::Unknown => ReadStrategy::RandomAccess,
            },
            other => *other,
        }
    }

    /// Check if this strategy can read the given container format.
    pub fn can_handle(&self, format: FileFormat) -> bool {
        match self {
            ReadStrategy::RandomAccess => format != FileFormat::Zip,
            ReadStrategy::Sequential | ReadStrategy::Auto => true,
        }
    }
}

/// Configuration for creating a reader.
#[derive(Debug, Clone, Default)]
pub struct ReaderConfig {
    /// `.shp` path, basename, or `.zip` path
    pub path: PathBuf,
    pub strategy: ReadStrategy,
    /// Geometry member to open inside an archive, skipping discovery
    pub member: Option<String>,
}

/// Builder for creating readers.
///
/// # Example
///
/// ```rust,no_run
/// use shpcodec::io::{ReadStrategy, ReaderBuilder, ShapeReader};
///
/// let mut reader = ReaderBuilder::new()
///     .path("roads.zip")
///     .strategy(ReadStrategy::Sequential)
///     .build()?;
/// while reader.advance() {
///     let (index, shape) = reader.current().unwrap();
///     println!("{index}: {}", shape.shape_type());
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReaderBuilder {
    config: ReaderConfig,
}

impl ReaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.path = path.as_ref().to_path_buf();
        self
    }

    pub fn strategy(mut self, strategy: ReadStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Name the `.shp` member to read from an archive.
    ///
    /// Ignored for plain file sets.
    pub fn member(mut self, name: impl Into<String>) -> Self {
        self.config.member = Some(name.into());
        self
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Build the reader.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The path is not set
    /// - Random access is requested for an archive
    /// - Opening the file set fails
    pub fn build(self) -> Result<Box<dyn ShapeReader>> {
        let path = &self.config.path;
        if path.as_os_str().is_empty() {
            return Err(ShpError::parse("ReaderBuilder", "path is not set"));
        }

        let format = detect_format(path)?;
        if !self.config.strategy.can_handle(format) {
            return Err(ShpError::archive(format!(
                "random access is not available for archive {}",
                path.display()
            )));
        }
        let strategy = self.config.strategy.resolve(format);
        debug!(path = %path.display(), ?format, ?strategy, "building reader");

        if format == FileFormat::Zip {
            let reader = match &self.config.member {
                Some(name) => ZipReader::open_by_name(path, name)?,
                None => ZipReader::open(path)?,
            };
            return Ok(Box::new(reader));
        }

        match strategy {
            ReadStrategy::Sequential => Ok(Box::new(SequentialReader::open(path)?)),
            _ => Ok(Box::new(Reader::open(path)?)),
        }
    }
}

/// How a writer treats an existing file set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Truncate or create all three files
    #[default]
    Create,
    /// Continue after the last record of an existing set
    Append,
}

/// Configuration for creating a writer.
#[derive(Debug, Clone, Default)]
pub struct WriterConfig {
    pub path: PathBuf,
    /// Required for [`WriteMode::Create`]; taken from the file in append mode
    pub shape_type: Option<ShapeType>,
    pub mode: WriteMode,
}

/// Builder for creating writers.
///
/// # Example
///
/// ```rust,no_run
/// use shpcodec::core::{Point, Shape, ShapeType};
/// use shpcodec::io::WriterBuilder;
///
/// let mut writer = WriterBuilder::new()
///     .path("points.shp")
///     .shape_type(ShapeType::Point)
///     .build()?;
/// writer.write(&Shape::Point(Point::new(1.0, 2.0)))?;
/// writer.close()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct WriterBuilder {
    config: WriterConfig,
}

impl WriterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.path = path.as_ref().to_path_buf();
        self
    }

    pub fn shape_type(mut self, shape_type: ShapeType) -> Self {
        self.config.shape_type = Some(shape_type);
        self
    }

    pub fn mode(mut self, mode: WriteMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Shorthand for `mode(WriteMode::Append)`.
    pub fn append(self) -> Self {
        self.mode(WriteMode::Append)
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Build the writer.
    ///
    /// In append mode a configured shape type must match the one stored in
    /// the file.
    pub fn build(self) -> Result<Writer<File>> {
        let path = &self.config.path;
        if path.as_os_str().is_empty() {
            return Err(ShpError::parse("WriterBuilder", "path is not set"));
        }

        match self.config.mode {
            WriteMode::Create => {
                let shape_type = self
                    .config
                    .shape_type
                    .ok_or_else(|| ShpError::parse("WriterBuilder", "shape type is not set"))?;
                Writer::create(path, shape_type)
            }
            WriteMode::Append => {
                let writer = Writer::append(path)?;
                match self.config.shape_type {
                    Some(expected) if expected != writer.shape_type() => {
                        Err(ShpError::ShapeTypeMismatch {
                            expected: writer.shape_type().to_string(),
                            actual: expected.to_string(),
                        })
                    }
                    _ => Ok(writer),
                }
            }
        }
    }
}
