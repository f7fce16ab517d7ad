// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Random-access reader.
//!
//! The geometry stream must be seekable. The end of the stream comes from
//! seeking to its end rather than from the header's declared length, and
//! after each record the reader seeks to the start of the next one, so
//! records with trailing padding are tolerated.
//!
//! The attribute table is opened lazily on first access and rows are read
//! by seeking straight to the requested cell.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, warn};

use super::detection::FileSetPaths;
use super::header::{RecordHeader, ShapeHeader, HEADER_LEN, RECORD_HEADER_LEN};
use super::traits::ShapeReader;
use crate::core::{BBox, Field, Shape, ShapeType};
use crate::encoding::cursor::StickyReader;
use crate::encoding::dbf::{trim_cell, DbfHeader};
use crate::encoding::geometry::read_shape;
use crate::{Result, ShpError};

type TableOpener<R> = Box<dyn FnOnce() -> io::Result<Option<R>>>;

/// Attribute table in one of its lazy states.
enum TableState<R> {
    /// Not opened yet; the opener returns `None` when there is no table
    Unopened(TableOpener<R>),
    /// Stream available, header not parsed yet
    Unparsed(R),
    Ready(AttributeTable<R>),
    Absent,
    Failed(ShpError),
}

struct AttributeTable<R> {
    reader: R,
    header: DbfHeader,
}

impl<R: Read + Seek> AttributeTable<R> {
    fn read_cell(&mut self, row: usize, field: usize) -> Result<String> {
        let count = self.header.num_records as usize;
        if row >= count {
            return Err(ShpError::RowOutOfRange { row, count });
        }
        let offset = self.header.cell_offset(row, field)?;
        let width = self.header.fields[field].size();
        let mut cell = vec![0u8; width];
        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| ShpError::io("DBF seek", &e))?;
        self.reader
            .read_exact(&mut cell)
            .map_err(|e| ShpError::io("DBF cell", &e))?;
        Ok(trim_cell(&cell))
    }
}

/// Random-access reader over a seekable geometry stream.
pub struct Reader<R> {
    shp: StickyReader<R>,
    header: ShapeHeader,
    /// Real size of the geometry stream
    file_length: u64,
    /// Start of the next record header
    next_record: u64,
    current: Option<(usize, Shape)>,
    error: Option<ShpError>,
    table: TableState<R>,
    /// Where the attribute table was expected, for error messages
    table_location: String,
}

impl Reader<BufReader<File>> {
    /// Open a file set from the path of its `.shp` file or its basename.
    ///
    /// The `.dbf` sibling is opened on first attribute access; a missing
    /// table only fails attribute calls.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let paths = FileSetPaths::resolve_existing(path);
        let shp = File::open(&paths.shp)
            .map_err(|e| ShpError::io(format!("open {}", paths.shp.display()), &e))?;

        let dbf_path = paths.dbf.clone();
        let opener: TableOpener<BufReader<File>> = Box::new(move || match File::open(&dbf_path) {
            Ok(file) => Ok(Some(BufReader::new(file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        });

        let reader = Self::with_table(
            BufReader::new(shp),
            TableState::Unopened(opener),
            paths.dbf.display().to_string(),
        )?;
        debug!(
            path = %paths.shp.display(),
            shape_type = %reader.header.shape_type,
            file_length = reader.file_length,
            "opened shapefile"
        );
        Ok(reader)
    }
}

impl<R: Read + Seek> Reader<R> {
    /// Reader over already-open streams.
    pub fn new(shp: R, dbf: Option<R>) -> Result<Self> {
        let table = match dbf {
            Some(stream) => TableState::Unparsed(stream),
            None => TableState::Absent,
        };
        Self::with_table(shp, table, "<stream>".to_string())
    }

    fn with_table(shp: R, table: TableState<R>, table_location: String) -> Result<Self> {
        let mut shp = StickyReader::new(shp);
        let header = ShapeHeader::read(&mut shp)?;
        let file_length = shp
            .seek(SeekFrom::End(0))
            .map_err(|e| ShpError::io("SHP seek", &e))?;
        if file_length != header.file_length() {
            warn!(
                declared = header.file_length(),
                actual = file_length,
                "SHP header length disagrees with the file size"
            );
        }
        shp.seek(SeekFrom::Start(HEADER_LEN))
            .map_err(|e| ShpError::io("SHP seek", &e))?;

        Ok(Self {
            shp,
            header,
            file_length,
            next_record: HEADER_LEN,
            current: None,
            error: None,
            table,
            table_location,
        })
    }

    /// The parsed geometry header.
    pub fn header(&self) -> &ShapeHeader {
        &self.header
    }

    /// Number of rows declared by the attribute table.
    pub fn attribute_count(&mut self) -> Result<usize> {
        Ok(self.table()?.header.num_records as usize)
    }

    /// Text of any cell of the attribute table.
    pub fn read_attribute(&mut self, row: usize, field: usize) -> Result<String> {
        self.table()?.read_cell(row, field)
    }

    /// Open and parse the attribute table on first use.
    fn table(&mut self) -> Result<&mut AttributeTable<R>> {
        let state = std::mem::replace(&mut self.table, TableState::Absent);
        self.table = match state {
            TableState::Unopened(opener) => match opener() {
                Ok(Some(stream)) => Self::parse_table(stream),
                Ok(None) => TableState::Absent,
                Err(e) => TableState::Failed(ShpError::io("open DBF", &e)),
            },
            TableState::Unparsed(stream) => Self::parse_table(stream),
            other => other,
        };
        match &mut self.table {
            TableState::Ready(table) => Ok(table),
            TableState::Failed(err) => Err(err.clone()),
            _ => Err(ShpError::MissingAttributeTable {
                path: self.table_location.clone(),
            }),
        }
    }

    fn parse_table(mut stream: R) -> TableState<R> {
        match DbfHeader::read(&mut stream) {
            Ok(header) => TableState::Ready(AttributeTable {
                reader: stream,
                header,
            }),
            Err(err) => TableState::Failed(err),
        }
    }

    fn read_next(&mut self) -> Result<Option<(usize, Shape)>> {
        if self.next_record >= self.file_length {
            return Ok(None);
        }
        self.shp
            .seek(SeekFrom::Start(self.next_record))
            .map_err(|e| ShpError::io("SHP seek", &e))?;

        let mut raw = [0u8; RECORD_HEADER_LEN as usize];
        self.shp
            .read_exact(&mut raw)
            .map_err(|e| ShpError::io("record header", &e))?;
        let record = RecordHeader::parse(&raw)?;
        let index = record_index(&record)?;

        let (shape, _) = read_shape(&mut self.shp, record.content_length())?;
        self.next_record += RECORD_HEADER_LEN + record.content_length();
        Ok(Some((index, shape)))
    }
}

/// 0-based index of a record from its 1-based number.
pub(crate) fn record_index(record: &RecordHeader) -> Result<usize> {
    if record.number < 1 {
        return Err(ShpError::parse(
            "record header",
            format!("record number {} is not positive", record.number),
        ));
    }
    Ok((record.number - 1) as usize)
}

impl<R: Read + Seek> ShapeReader for Reader<R> {
    fn shape_type(&self) -> ShapeType {
        self.header.shape_type
    }

    fn bbox(&self) -> BBox {
        self.header.bbox
    }

    fn advance(&mut self) -> bool {
        if self.error.is_some() {
            return false;
        }
        match self.read_next() {
            Ok(Some(record)) => {
                self.current = Some(record);
                true
            }
            Ok(None) => {
                self.current = None;
                false
            }
            Err(err) => {
                self.current = None;
                self.error = Some(err);
                false
            }
        }
    }

    fn current(&self) -> Option<(usize, &Shape)> {
        self.current.as_ref().map(|(index, shape)| (*index, shape))
    }

    fn fields(&mut self) -> Result<&[Field]> {
        match self.table() {
            Ok(table) => Ok(&table.header.fields),
            Err(ShpError::MissingAttributeTable { .. }) => Ok(&[]),
            Err(err) => Err(err),
        }
    }

    fn attribute(&mut self, field: usize) -> Result<String> {
        let row = self
            .current
            .as_ref()
            .map(|(index, _)| *index)
            .ok_or(ShpError::NoCurrentRecord)?;
        self.read_attribute(row, field)
    }

    fn err(&self) -> Option<&ShpError> {
        self.error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Point;
    use crate::io::Writer;
    use std::io::Cursor;

    fn point_set(points: &[(f64, f64)]) -> (Vec<u8>, Vec<u8>) {
        let mut writer = Writer::new(
            Cursor::new(Vec::new()),
            Cursor::new(Vec::new()),
            Cursor::new(Vec::new()),
            ShapeType::Point,
        )
        .unwrap();
        writer
            .set_fields(vec![Field::string("NAME", 8).unwrap()])
            .unwrap();
        for (i, (x, y)) in points.iter().enumerate() {
            let row = writer.write(&Shape::Point(Point::new(*x, *y))).unwrap();
            writer
                .write_attribute(row, 0, format!("pt{i}"))
                .unwrap();
        }
        let (shp, _shx, dbf) = writer.into_streams().unwrap();
        (shp.into_inner(), dbf.into_inner())
    }

    #[test]
    fn test_reads_points_and_attributes() {
        let (shp, dbf) = point_set(&[(1.0, 2.0), (3.0, 4.0)]);
        let mut reader = Reader::new(Cursor::new(shp), Some(Cursor::new(dbf))).unwrap();
        assert_eq!(reader.shape_type(), ShapeType::Point);

        assert!(reader.advance());
        let (index, shape) = reader.current().unwrap();
        assert_eq!(index, 0);
        assert_eq!(shape, &Shape::Point(Point::new(1.0, 2.0)));
        assert_eq!(reader.attribute(0).unwrap(), "pt0");

        assert!(reader.advance());
        assert_eq!(reader.attributes().unwrap(), vec!["pt1"]);
        assert!(!reader.advance());
        assert!(reader.err().is_none());

        assert_eq!(reader.attribute_count().unwrap(), 2);
        assert_eq!(reader.read_attribute(0, 0).unwrap(), "pt0");
        assert!(matches!(
            reader.read_attribute(2, 0).unwrap_err(),
            ShpError::RowOutOfRange { row: 2, count: 2 }
        ));
    }

    #[test]
    fn test_attribute_needs_current_record() {
        let (shp, dbf) = point_set(&[(1.0, 2.0)]);
        let mut reader = Reader::new(Cursor::new(shp), Some(Cursor::new(dbf))).unwrap();
        assert!(matches!(
            reader.attribute(0).unwrap_err(),
            ShpError::NoCurrentRecord
        ));
        assert!(reader.advance());
        assert_eq!(reader.attribute(0).unwrap(), "pt0");
        assert!(!reader.advance());
        assert!(matches!(
            reader.attribute(0).unwrap_err(),
            ShpError::NoCurrentRecord
        ));
    }

    #[test]
    fn test_missing_table_only_fails_attributes() {
        let (shp, _) = point_set(&[(1.0, 1.0)]);
        let mut reader = Reader::new(Cursor::new(shp), None).unwrap();
        assert!(reader.fields().unwrap().is_empty());
        assert!(reader.advance());
        assert!(matches!(
            reader.attribute(0).unwrap_err(),
            ShpError::MissingAttributeTable { .. }
        ));
    }

    #[test]
    fn test_truncated_record_is_error() {
        let (mut shp, _) = point_set(&[(1.0, 1.0), (2.0, 2.0)]);
        shp.truncate(shp.len() - 5);
        let mut reader = Reader::new(Cursor::new(shp), None).unwrap();
        assert!(reader.advance());
        assert!(!reader.advance());
        assert!(reader.err().unwrap().is_truncated());
        assert!(!reader.advance());
    }

    #[test]
    fn test_skips_record_padding() {
        let (shp, _) = point_set(&[(1.0, 1.0), (2.0, 2.0)]);
        // Declare 4 extra bytes of content for record 1 and insert them.
        let mut padded = shp[..100].to_vec();
        let first = &shp[100..128];
        let mut header = first[..8].to_vec();
        header[4..8].copy_from_slice(&12i32.to_be_bytes());
        padded.extend_from_slice(&header);
        padded.extend_from_slice(&first[8..]);
        padded.extend_from_slice(&[0u8; 4]);
        padded.extend_from_slice(&shp[128..]);

        let mut reader = Reader::new(Cursor::new(padded), None).unwrap();
        let shapes: Vec<_> = reader.records().map(|r| r.unwrap().shape).collect();
        assert_eq!(
            shapes,
            vec![
                Shape::Point(Point::new(1.0, 1.0)),
                Shape::Point(Point::new(2.0, 2.0))
            ]
        );
    }
}
