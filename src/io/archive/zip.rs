// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ZIP archive support.
//!
//! A ZIP member borrows the archive while it is read, so each member is
//! inflated into an owned buffer before it is handed out as a stream.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;

use ::zip::result::ZipError;
use ::zip::write::SimpleFileOptions;
use ::zip::{CompressionMethod, ZipArchive};
use tracing::debug;

use super::{
    discover, members_for, open_file_set, ArchiveReader, ArchiveSource, FileSetMembers,
    MemberStream,
};
use crate::core::{BBox, Field, FieldValue, Shape, ShapeType};
use crate::io::traits::ShapeReader;
use crate::io::writer::Writer;
use crate::{Result, ShpError};

/// Largest buffer reserved up front from a member's declared size.
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Initial buffer size for a member; larger members grow while inflating.
fn prealloc_len(declared: u64) -> usize {
    declared.min(MAX_PREALLOC) as usize
}

/// [`ArchiveSource`] over a ZIP archive.
pub struct ZipArchiveSource<R> {
    archive: ZipArchive<R>,
}

impl ZipArchiveSource<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| ShpError::io(format!("open {}", path.display()), &e))?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> ZipArchiveSource<R> {
    pub fn new(reader: R) -> Result<Self> {
        Ok(Self {
            archive: ZipArchive::new(reader)?,
        })
    }
}

impl<R: Read + Seek> ArchiveSource for ZipArchiveSource<R> {
    fn member_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    fn open_member(&mut self, name: &str) -> Result<MemberStream> {
        let mut member = self.archive.by_name(name).map_err(|e| match e {
            ZipError::FileNotFound => ShpError::MemberNotFound {
                name: name.to_string(),
            },
            other => other.into(),
        })?;
        let mut buf = Vec::with_capacity(prealloc_len(member.size()));
        member
            .read_to_end(&mut buf)
            .map_err(|e| ShpError::io(format!("inflate {name}"), &e))?;
        Ok(Box::new(Cursor::new(buf)))
    }
}

/// Sequential reader over the file set inside a ZIP archive.
pub struct ZipReader {
    inner: ArchiveReader,
    members: FileSetMembers,
}

impl ZipReader {
    /// Open the single file set in the archive at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_source(&mut ZipArchiveSource::open(path)?)
    }

    /// Open the file set whose geometry member is `shp`, skipping
    /// discovery.
    pub fn open_by_name<P: AsRef<Path>>(path: P, shp: &str) -> Result<Self> {
        Self::from_source_by_name(&mut ZipArchiveSource::open(path)?, shp)
    }

    pub fn from_source<A: ArchiveSource + ?Sized>(source: &mut A) -> Result<Self> {
        let members = discover(source.member_names())?;
        Self::with_members(source, members)
    }

    pub fn from_source_by_name<A: ArchiveSource + ?Sized>(
        source: &mut A,
        shp: &str,
    ) -> Result<Self> {
        let members = members_for(&source.member_names(), shp)?;
        Self::with_members(source, members)
    }

    fn with_members<A: ArchiveSource + ?Sized>(
        source: &mut A,
        members: FileSetMembers,
    ) -> Result<Self> {
        let inner = open_file_set(source, &members)?;
        debug!(member = %members.shp, has_attributes = members.dbf.is_some(), "opened archived shapefile");
        Ok(Self { inner, members })
    }

    /// Members this reader was opened on.
    pub fn members(&self) -> &FileSetMembers {
        &self.members
    }

    /// Number of rows declared by the attribute table.
    pub fn attribute_count(&self) -> Result<usize> {
        self.inner.attribute_count()
    }
}

impl ShapeReader for ZipReader {
    fn shape_type(&self) -> ShapeType {
        self.inner.shape_type()
    }

    fn bbox(&self) -> BBox {
        self.inner.bbox()
    }

    fn advance(&mut self) -> bool {
        self.inner.advance()
    }

    fn current(&self) -> Option<(usize, &Shape)> {
        self.inner.current()
    }

    fn fields(&mut self) -> Result<&[Field]> {
        self.inner.fields()
    }

    fn attribute(&mut self, field: usize) -> Result<String> {
        self.inner.attribute(field)
    }

    fn err(&self) -> Option<&ShpError> {
        self.inner.err()
    }
}

/// Builds a file set in memory and stores it as a ZIP archive.
///
/// Members are named `<name>.shp`, `<name>.shx`, `<name>.dbf` and, when
/// projection text was supplied, `<name>.prj`.
#[derive(Debug)]
pub struct ZipWriter {
    name: String,
    inner: Writer<Cursor<Vec<u8>>>,
    projection: Option<String>,
}

impl ZipWriter {
    /// Start a file set whose members are named after `name`.
    ///
    /// A trailing `.shp` (any case) is stripped.
    pub fn new(name: &str, shape_type: ShapeType) -> Result<Self> {
        let name = match name.rsplit_once('.') {
            Some((stem, ext)) if ext.eq_ignore_ascii_case("shp") => stem,
            _ => name,
        };
        Ok(Self {
            name: name.to_string(),
            inner: Writer::new(
                Cursor::new(Vec::new()),
                Cursor::new(Vec::new()),
                Cursor::new(Vec::new()),
                shape_type,
            )?,
            projection: None,
        })
    }

    /// Projection text stored verbatim as the `.prj` member.
    pub fn set_projection(&mut self, wkt: impl Into<String>) {
        self.projection = Some(wkt.into());
    }

    pub fn shape_type(&self) -> ShapeType {
        self.inner.shape_type()
    }

    pub fn bbox(&self) -> BBox {
        self.inner.bbox()
    }

    pub fn num_records(&self) -> usize {
        self.inner.num_records()
    }

    pub fn set_fields(&mut self, fields: Vec<Field>) -> Result<()> {
        self.inner.set_fields(fields)
    }

    pub fn write(&mut self, shape: &Shape) -> Result<usize> {
        self.inner.write(shape)
    }

    pub fn write_attribute(
        &mut self,
        row: usize,
        field: usize,
        value: impl Into<FieldValue>,
    ) -> Result<()> {
        self.inner.write_attribute(row, field, value)
    }

    pub fn write_attributes(&mut self, row: usize, values: &[FieldValue]) -> Result<()> {
        self.inner.write_attributes(row, values)
    }

    /// Write a shape together with its attribute row.
    pub fn write_record(&mut self, shape: &Shape, values: &[FieldValue]) -> Result<usize> {
        let row = self.inner.write(shape)?;
        self.inner.write_attributes(row, values)?;
        Ok(row)
    }

    /// Finalize the file set and write the archive to `out`.
    pub fn finish<W: Write + Seek>(self, out: W) -> Result<W> {
        let (shp, shx, dbf) = self.inner.into_streams()?;
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut zip = ::zip::ZipWriter::new(out);
        let mut members = vec![
            (format!("{}.shp", self.name), shp.into_inner()),
            (format!("{}.shx", self.name), shx.into_inner()),
            (format!("{}.dbf", self.name), dbf.into_inner()),
        ];
        if let Some(prj) = self.projection {
            members.push((format!("{}.prj", self.name), prj.into_bytes()));
        }
        for (member, data) in &members {
            zip.start_file(member.as_str(), options)?;
            zip.write_all(data)
                .map_err(|e| ShpError::io(format!("write {member}"), &e))?;
        }
        let out = zip.finish()?;
        debug!(name = %self.name, members = members.len(), "wrote shapefile archive");
        Ok(out)
    }

    /// Finalize and return the archive bytes.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        Ok(self.finish(Cursor::new(Vec::new()))?.into_inner())
    }

    /// Finalize and write the archive to a file.
    pub fn save<P: AsRef<Path>>(self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|e| ShpError::io(format!("create {}", path.display()), &e))?;
        let mut file = self.finish(file)?;
        file.flush()
            .map_err(|e| ShpError::io(format!("flush {}", path.display()), &e))
    }
}
