// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Incremental file-set writer.
//!
//! Each [`write`](Writer::write) appends one geometry record, one index
//! entry and, once a schema is set, one blank attribute row. Headers carry
//! totals that are only known at the end, so they are written as
//! placeholders and rewritten by [`close`](Writer::close).
//!
//! # Important
//!
//! You must call [`close()`](Writer::close) to finalize the file set.
//! Dropping the writer without closing it leaves placeholder headers behind
//! and logs a warning.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, warn};

use super::detection::FileSetPaths;
use super::header::{RecordHeader, ShapeHeader, HEADER_LEN, RECORD_HEADER_LEN};
use super::index::{IndexEntry, INDEX_ENTRY_LEN};
use crate::core::{BBox, Field, FieldValue, Shape, ShapeType};
use crate::encoding::dbf::{format_value, DbfHeader};
use crate::encoding::geometry::write_shape;
use crate::{Result, ShpError};

/// Logs a warning if dropped while still armed.
#[derive(Debug)]
struct CloseGuard {
    armed: bool,
    label: String,
}

impl CloseGuard {
    fn new(label: String) -> Self {
        Self { armed: true, label }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        if self.armed {
            warn!(target = %self.label, "shapefile writer dropped without calling close()");
        }
    }
}

/// Writer for a `.shp`/`.shx`/`.dbf` triple.
#[derive(Debug)]
pub struct Writer<S> {
    shape_type: ShapeType,
    bbox: BBox,
    /// Records written so far, including those found on append
    num_records: i32,
    schema: Option<DbfHeader>,
    shp: S,
    shx: S,
    dbf: S,
    /// End of the geometry stream
    shp_end: u64,
    /// End of the index stream
    shx_end: u64,
    guard: CloseGuard,
}

impl Writer<File> {
    /// Create a new file set, truncating existing files.
    ///
    /// `path` is the `.shp` path or a basename; sibling extensions follow
    /// its case.
    pub fn create<P: AsRef<Path>>(path: P, shape_type: ShapeType) -> Result<Self> {
        let paths = FileSetPaths::from_path(path);
        let create = |p: &Path| {
            OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(p)
                .map_err(|e| ShpError::io(format!("create {}", p.display()), &e))
        };
        let mut writer = Self::new(
            create(&paths.shp)?,
            create(&paths.shx)?,
            create(&paths.dbf)?,
            shape_type,
        )?;
        writer.guard.label = paths.shp.display().to_string();
        debug!(path = %paths.shp.display(), shape_type = %shape_type, "created shapefile");
        Ok(writer)
    }

    /// Reopen an existing file set to add records.
    ///
    /// The shape type and bounding box come from the `.shp` header and the
    /// record count from the last `.shx` entry. A missing `.dbf` is
    /// created empty; a missing `.shx` is [`ShpError::MissingIndex`].
    pub fn append<P: AsRef<Path>>(path: P) -> Result<Self> {
        let paths = FileSetPaths::resolve_existing(path);
        let open = |p: &Path| {
            OpenOptions::new()
                .read(true)
                .write(true)
                .open(p)
                .map_err(|e| ShpError::io(format!("open {}", p.display()), &e))
        };
        let shp = open(&paths.shp)?;
        let shx = match open(&paths.shx) {
            Ok(file) => file,
            Err(ShpError::Io {
                kind: io::ErrorKind::NotFound,
                ..
            }) => {
                return Err(ShpError::MissingIndex {
                    path: paths.shx.display().to_string(),
                })
            }
            Err(err) => return Err(err),
        };
        let dbf = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&paths.dbf)
            .map_err(|e| ShpError::io(format!("open {}", paths.dbf.display()), &e))?;

        let mut writer = Self::resume(shp, shx, dbf)?;
        writer.guard.label = paths.shp.display().to_string();
        debug!(
            path = %paths.shp.display(),
            shape_type = %writer.shape_type,
            records = writer.num_records,
            bbox = ?writer.bbox,
            "appending to shapefile"
        );
        Ok(writer)
    }
}

impl<S: Read + Write + Seek> Writer<S> {
    /// Resume writing to existing streams.
    ///
    /// An empty attribute stream, or one whose schema has no columns, leaves
    /// [`set_fields`](Self::set_fields) available. An existing schema keeps
    /// the header and row lengths stored in the table, so extra header bytes
    /// and the rows already written stay where they are.
    pub fn resume(mut shp: S, mut shx: S, mut dbf: S) -> Result<Self> {
        shp.seek(SeekFrom::Start(0))
            .map_err(|e| ShpError::io("SHP seek", &e))?;
        let header = ShapeHeader::read(&mut shp)?;

        let shx_end = shx
            .seek(SeekFrom::End(0))
            .map_err(|e| ShpError::io("SHX seek", &e))?;
        let num_records = if shx_end >= HEADER_LEN + INDEX_ENTRY_LEN {
            let mut raw = [0u8; INDEX_ENTRY_LEN as usize];
            shx.seek(SeekFrom::Start(shx_end - INDEX_ENTRY_LEN))
                .and_then(|_| shx.read_exact(&mut raw))
                .map_err(|e| ShpError::io("SHX last entry", &e))?;
            let last = IndexEntry::parse(&raw);

            let mut number = [0u8; 4];
            shp.seek(SeekFrom::Start(last.byte_offset()))
                .and_then(|_| shp.read_exact(&mut number))
                .map_err(|e| ShpError::io("SHP last record", &e))?;
            i32::from_be_bytes(number)
        } else {
            0
        };

        let shp_end = shp
            .seek(SeekFrom::End(0))
            .map_err(|e| ShpError::io("SHP seek", &e))?;

        let dbf_len = dbf
            .seek(SeekFrom::End(0))
            .map_err(|e| ShpError::io("DBF seek", &e))?;
        let schema = if dbf_len == 0 {
            None
        } else {
            dbf.seek(SeekFrom::Start(0))
                .map_err(|e| ShpError::io("DBF seek", &e))?;
            let mut table = DbfHeader::read(&mut dbf)?;
            if table.fields.is_empty() {
                None
            } else {
                if (table.record_length as usize) < table.computed_record_length() {
                    return Err(ShpError::malformed_header(
                        "DBF header",
                        format!(
                            "record length {} is shorter than the {} bytes of its fields",
                            table.record_length,
                            table.computed_record_length()
                        ),
                    ));
                }
                table.num_records = num_records as u32;
                Some(table)
            }
        };

        Ok(Self {
            shape_type: header.shape_type,
            bbox: header.bbox,
            num_records,
            schema,
            shp,
            shx,
            dbf,
            shp_end,
            shx_end,
            guard: CloseGuard::new("<stream>".to_string()),
        })
    }
}

impl<S: Write + Seek> Writer<S> {
    /// Start a new file set on empty streams.
    pub fn new(mut shp: S, mut shx: S, dbf: S, shape_type: ShapeType) -> Result<Self> {
        let placeholder = ShapeHeader::new(shape_type, BBox::default(), HEADER_LEN)?;
        placeholder.write(&mut shp)?;
        placeholder.write(&mut shx)?;
        Ok(Self {
            shape_type,
            bbox: BBox::default(),
            num_records: 0,
            schema: None,
            shp,
            shx,
            dbf,
            shp_end: HEADER_LEN,
            shx_end: HEADER_LEN,
            guard: CloseGuard::new("<stream>".to_string()),
        })
    }

    pub fn shape_type(&self) -> ShapeType {
        self.shape_type
    }

    /// Bounds over every record written so far.
    pub fn bbox(&self) -> BBox {
        self.bbox
    }

    /// Number of records in the file set.
    pub fn num_records(&self) -> usize {
        self.num_records as usize
    }

    /// Attribute columns, once set.
    pub fn fields(&self) -> Option<&[Field]> {
        self.schema.as_ref().map(|s| s.fields.as_slice())
    }

    /// Append a shape and return its 0-based index.
    ///
    /// The shape must have the file set's type or be [`Shape::Null`], and
    /// pass [`Shape::validate`].
    pub fn write(&mut self, shape: &Shape) -> Result<usize> {
        if !shape.is_null() && shape.shape_type() != self.shape_type {
            return Err(ShpError::ShapeTypeMismatch {
                expected: self.shape_type.to_string(),
                actual: shape.shape_type().to_string(),
            });
        }
        shape.validate()?;
        let number = self.num_records.checked_add(1).ok_or_else(|| {
            ShpError::parse("Writer", "record count exceeds the format limit")
        })?;

        let mut record = Vec::with_capacity(RECORD_HEADER_LEN as usize + shape.encoded_len());
        record.extend_from_slice(&[0u8; RECORD_HEADER_LEN as usize]);
        write_shape(shape, &mut record);
        let content_bytes = (record.len() as u64) - RECORD_HEADER_LEN;
        let entry = IndexEntry::new(self.shp_end, content_bytes)?;
        let header = RecordHeader {
            number,
            content_words: entry.content_length,
        };
        record[..RECORD_HEADER_LEN as usize].copy_from_slice(&header.encode());

        self.shp
            .seek(SeekFrom::Start(self.shp_end))
            .and_then(|_| self.shp.write_all(&record))
            .map_err(|e| ShpError::io("SHP record", &e))?;
        self.shx
            .seek(SeekFrom::Start(self.shx_end))
            .and_then(|_| self.shx.write_all(&entry.encode()))
            .map_err(|e| ShpError::io("SHX entry", &e))?;
        self.shp_end += record.len() as u64;
        self.shx_end += INDEX_ENTRY_LEN;

        if self.num_records == 0 {
            self.bbox = shape.bbox();
        } else {
            self.bbox.extend(&shape.bbox());
        }
        self.num_records = number;

        if let Some(schema) = self.schema.as_mut() {
            let row = schema.blank_row();
            let offset = schema.row_offset(number as usize - 1);
            schema.num_records = number as u32;
            self.dbf
                .seek(SeekFrom::Start(offset))
                .and_then(|_| self.dbf.write_all(&row))
                .map_err(|e| ShpError::io("DBF row", &e))?;
        }
        Ok(number as usize - 1)
    }

    /// Set the attribute columns.
    ///
    /// Allowed once. Rows for records already written are filled with blank
    /// cells.
    pub fn set_fields(&mut self, fields: Vec<Field>) -> Result<()> {
        if self.schema.is_some() {
            return Err(ShpError::SchemaAlreadySet);
        }
        let schema = DbfHeader::new(fields, self.num_records as u32)?;
        let rows: Vec<u8> = std::iter::repeat(schema.blank_row())
            .take(self.num_records as usize)
            .flatten()
            .collect();
        self.dbf
            .seek(SeekFrom::Start(schema.header_length as u64))
            .and_then(|_| self.dbf.write_all(&rows))
            .map_err(|e| ShpError::io("DBF rows", &e))?;
        self.schema = Some(schema);
        Ok(())
    }

    /// Overwrite one cell of an existing row.
    ///
    /// The value is checked before anything is written, so a failed call
    /// leaves the cell unchanged.
    pub fn write_attribute(
        &mut self,
        row: usize,
        field: usize,
        value: impl Into<FieldValue>,
    ) -> Result<()> {
        let schema = self.checked_schema(row)?;
        let descriptor = schema
            .fields
            .get(field)
            .ok_or(ShpError::FieldIndexOutOfRange {
                index: field,
                count: schema.fields.len(),
            })?;
        let cell = format_value(descriptor, &value.into())?;
        let offset = schema.cell_offset(row, field)?;
        self.dbf
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.dbf.write_all(&cell))
            .map_err(|e| ShpError::io("DBF cell", &e))
    }

    /// Overwrite a whole row, one value per column.
    pub fn write_attributes(&mut self, row: usize, values: &[FieldValue]) -> Result<()> {
        let schema = self.checked_schema(row)?;
        if values.len() != schema.fields.len() {
            return Err(ShpError::invalid_value(
                format!("row {row}"),
                format!(
                    "{} values for {} fields",
                    values.len(),
                    schema.fields.len()
                ),
            ));
        }
        let mut cells = Vec::with_capacity(schema.record_length as usize - 1);
        for (field, value) in schema.fields.iter().zip(values) {
            cells.extend(format_value(field, value)?);
        }
        let offset = schema.row_offset(row) + 1;
        self.dbf
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.dbf.write_all(&cells))
            .map_err(|e| ShpError::io("DBF row", &e))
    }

    fn checked_schema(&self, row: usize) -> Result<&DbfHeader> {
        let schema = self.schema.as_ref().ok_or(ShpError::SchemaNotSet)?;
        let count = self.num_records as usize;
        if row >= count {
            return Err(ShpError::RowOutOfRange { row, count });
        }
        Ok(schema)
    }

    /// Rewrite all headers and flush.
    ///
    /// Every stream is attempted even if an earlier one fails; failures
    /// are reported together as [`ShpError::Close`].
    pub fn close(mut self) -> Result<()> {
        self.finish_internal()
    }

    /// Close and hand back the streams.
    pub fn into_streams(mut self) -> Result<(S, S, S)> {
        self.finish_internal()?;
        let Writer { shp, shx, dbf, .. } = self;
        Ok((shp, shx, dbf))
    }

    pub(crate) fn finish_internal(&mut self) -> Result<()> {
        if !self.guard.armed {
            return Err(ShpError::Close {
                failures: vec!["writer already closed".to_string()],
            });
        }
        self.guard.disarm();

        let mut failures = Vec::new();
        if let Err(e) = rewrite_header(&mut self.shp, self.shape_type, self.bbox, self.shp_end) {
            failures.push(format!("shp: {e}"));
        }
        if let Err(e) = rewrite_header(&mut self.shx, self.shape_type, self.bbox, self.shx_end) {
            failures.push(format!("shx: {e}"));
        }
        if let Err(e) = self.finish_table() {
            failures.push(format!("dbf: {e}"));
        }

        debug!(
            target = %self.guard.label,
            shape_type = %self.shape_type,
            records = self.num_records,
            bbox = ?self.bbox,
            "closed shapefile"
        );

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ShpError::Close { failures })
        }
    }

    fn finish_table(&mut self) -> Result<()> {
        let mut schema = match self.schema.take() {
            Some(schema) => schema,
            None => {
                let empty = DbfHeader::empty(self.num_records as u32);
                let rows = vec![b' '; self.num_records as usize];
                self.dbf
                    .seek(SeekFrom::Start(empty.header_length as u64))
                    .and_then(|_| self.dbf.write_all(&rows))
                    .map_err(|e| ShpError::io("DBF rows", &e))?;
                empty
            }
        };
        schema.num_records = self.num_records as u32;
        self.dbf
            .seek(SeekFrom::Start(0))
            .map_err(|e| ShpError::io("DBF seek", &e))?;
        schema.write(&mut self.dbf)?;
        self.dbf.flush().map_err(|e| ShpError::io("DBF flush", &e))?;
        self.schema = Some(schema);
        Ok(())
    }
}

fn rewrite_header<S: Write + Seek>(
    stream: &mut S,
    shape_type: ShapeType,
    bbox: BBox,
    length: u64,
) -> Result<()> {
    let header = ShapeHeader::new(shape_type, bbox, length)?;
    stream
        .seek(SeekFrom::Start(0))
        .map_err(|e| ShpError::io("header seek", &e))?;
    header.write(stream)?;
    stream.flush().map_err(|e| ShpError::io("flush", &e))
}
