// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Forward-only reader.
//!
//! Works over non-seekable streams such as archive members. The reader
//! trusts the file length declared in the geometry header, counts the
//! bytes the geometry codec consumes for each record and reads away
//! whatever the record declared beyond that. One attribute row is read in
//! lockstep with every record.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use tracing::debug;

use super::detection::FileSetPaths;
use super::header::{RecordHeader, ShapeHeader, RECORD_HEADER_LEN};
use super::reader::record_index;
use super::traits::ShapeReader;
use crate::core::{BBox, Field, Shape, ShapeType};
use crate::encoding::cursor::StickyReader;
use crate::encoding::dbf::{DbfHeader, ROW_ACTIVE, ROW_DELETED};
use crate::encoding::geometry::read_shape;
use crate::{Result, ShpError};

/// Attribute stream positioned at the first row.
struct AttributeStream<D> {
    reader: StickyReader<D>,
    header: DbfHeader,
}

/// Forward-only reader over a geometry stream and an optional attribute
/// stream.
pub struct SequentialReader<S, D> {
    shp: StickyReader<S>,
    header: ShapeHeader,
    dbf: Option<AttributeStream<D>>,
    current: Option<(usize, Shape)>,
    /// Cell texts of the current row
    row: Vec<String>,
    error: Option<ShpError>,
    finished: bool,
}

impl SequentialReader<BufReader<File>, BufReader<File>> {
    /// Open a file set on disk for forward-only reading.
    ///
    /// The `.dbf` sibling is optional.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let paths = FileSetPaths::resolve_existing(path);
        let shp = File::open(&paths.shp)
            .map_err(|e| ShpError::io(format!("open {}", paths.shp.display()), &e))?;
        let dbf = match File::open(&paths.dbf) {
            Ok(file) => Some(BufReader::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(ShpError::io(format!("open {}", paths.dbf.display()), &e)),
        };
        Self::new(BufReader::new(shp), dbf)
    }
}

impl<S: Read, D: Read> SequentialReader<S, D> {
    /// Parse both headers and position the streams at their first record.
    pub fn new(shp: S, dbf: Option<D>) -> Result<Self> {
        let mut shp = StickyReader::new(shp);
        let header = ShapeHeader::read(&mut shp)?;

        let dbf = match dbf {
            Some(stream) => {
                let mut reader = StickyReader::new(stream);
                let table = DbfHeader::read(&mut reader)?;
                let extra = (table.header_length as u64).saturating_sub(table.descriptors_end());
                reader
                    .discard(extra)
                    .map_err(|e| ShpError::io("DBF header", &e))?;
                Some(AttributeStream {
                    reader,
                    header: table,
                })
            }
            None => None,
        };

        debug!(
            shape_type = %header.shape_type,
            file_length = header.file_length(),
            has_attributes = dbf.is_some(),
            "opened shapefile stream"
        );

        Ok(Self {
            shp,
            header,
            dbf,
            current: None,
            row: Vec::new(),
            error: None,
            finished: false,
        })
    }

    /// The parsed geometry header.
    pub fn header(&self) -> &ShapeHeader {
        &self.header
    }

    /// Number of rows declared by the attribute table.
    pub fn attribute_count(&self) -> Result<usize> {
        self.dbf
            .as_ref()
            .map(|dbf| dbf.header.num_records as usize)
            .ok_or_else(missing_table)
    }

    fn read_next(&mut self) -> Result<Option<(usize, Shape)>> {
        if self.shp.consumed() >= self.header.file_length() {
            return Ok(None);
        }

        let mut raw = [0u8; RECORD_HEADER_LEN as usize];
        let filled = self
            .shp
            .fill(&mut raw)
            .map_err(|e| ShpError::io("record header", &e))?;
        if filled == 0 {
            return Ok(None);
        }
        if filled < raw.len() {
            return Err(ShpError::truncated(
                "record header",
                format!("stream ended after {filled} of {} bytes", raw.len()),
            ));
        }
        let record = RecordHeader::parse(&raw)?;
        let index = record_index(&record)?;

        let declared = record.content_length();
        let (shape, consumed) = read_shape(&mut self.shp, declared)?;
        if consumed > declared {
            return Err(ShpError::over_read(record.number, declared, consumed));
        }
        self.shp
            .discard(declared - consumed)
            .map_err(|e| ShpError::io("record padding", &e))?;

        self.row = self.read_row()?;
        Ok(Some((index, shape)))
    }

    /// Consume the attribute row paired with the record just read.
    fn read_row(&mut self) -> Result<Vec<String>> {
        let Some(dbf) = self.dbf.as_mut() else {
            return Ok(Vec::new());
        };
        let mut row = vec![0u8; dbf.header.record_length as usize];
        dbf.reader
            .read_exact(&mut row)
            .map_err(|e| ShpError::io("DBF row", &e))?;
        match row.first() {
            Some(&ROW_ACTIVE) | Some(&ROW_DELETED) => Ok(dbf.header.split_row(&row)),
            Some(other) => Err(ShpError::parse(
                "DBF row",
                format!("invalid row flag 0x{other:02X}"),
            )),
            None => Ok(Vec::new()),
        }
    }
}

fn missing_table() -> ShpError {
    ShpError::MissingAttributeTable {
        path: "<stream>".to_string(),
    }
}

impl<S: Read, D: Read> ShapeReader for SequentialReader<S, D> {
    fn shape_type(&self) -> ShapeType {
        self.header.shape_type
    }

    fn bbox(&self) -> BBox {
        self.header.bbox
    }

    fn advance(&mut self) -> bool {
        if self.finished || self.error.is_some() {
            return false;
        }
        match self.read_next() {
            Ok(Some(record)) => {
                self.current = Some(record);
                true
            }
            Ok(None) => {
                self.finished = true;
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
        Ok(self
            .dbf
            .as_ref()
            .map(|dbf| dbf.header.fields.as_slice())
            .unwrap_or_default())
    }

    fn attribute(&mut self, field: usize) -> Result<String> {
        let Some(dbf) = self.dbf.as_ref() else {
            return Err(missing_table());
        };
        if self.current.is_none() {
            return Err(ShpError::NoCurrentRecord);
        }
        self.row
            .get(field)
            .cloned()
            .ok_or(ShpError::FieldIndexOutOfRange {
                index: field,
                count: dbf.header.fields.len(),
            })
    }

    fn err(&self) -> Option<&ShpError> {
        self.error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Point, PolyLine};
    use crate::io::Writer;
    use std::io::Cursor;

    fn line_set() -> (Vec<u8>, Vec<u8>) {
        let mut writer = Writer::new(
            Cursor::new(Vec::new()),
            Cursor::new(Vec::new()),
            Cursor::new(Vec::new()),
            ShapeType::PolyLine,
        )
        .unwrap();
        writer
            .set_fields(vec![
                Field::string("NAME", 6).unwrap(),
                Field::number("LANES", 2).unwrap(),
            ])
            .unwrap();
        for i in 0..3i32 {
            let offset = f64::from(i);
            let shape = Shape::PolyLine(PolyLine::new(vec![vec![
                Point::new(offset, 0.0),
                Point::new(offset + 1.0, 1.0),
            ]]));
            let row = writer.write(&shape).unwrap();
            writer
                .write_attributes(row, &[format!("road{i}").into(), (i + 1).into()])
                .unwrap();
        }
        let (shp, _shx, dbf) = writer.into_streams().unwrap();
        (shp.into_inner(), dbf.into_inner())
    }

    #[test]
    fn test_reads_in_lockstep() {
        let (shp, dbf) = line_set();
        let mut reader = SequentialReader::new(shp.as_slice(), Some(dbf.as_slice())).unwrap();
        let records: Vec<_> = reader.records().collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].index, 2);
        assert_eq!(records[2].attributes, vec!["road2", "3"]);
        assert!(reader.err().is_none());
    }

    #[test]
    fn test_attribute_needs_current_record() {
        let (shp, dbf) = line_set();
        let mut reader = SequentialReader::new(shp.as_slice(), Some(dbf.as_slice())).unwrap();
        assert!(matches!(
            reader.attribute(0).unwrap_err(),
            ShpError::NoCurrentRecord
        ));
        assert!(reader.advance());
        assert_eq!(reader.attribute(1).unwrap(), "1");
    }

    #[test]
    fn test_without_attributes() {
        let (shp, _) = line_set();
        let mut reader = SequentialReader::<_, &[u8]>::new(shp.as_slice(), None).unwrap();
        assert!(reader.advance());
        assert!(reader.fields().unwrap().is_empty());
        assert!(matches!(
            reader.attribute(0).unwrap_err(),
            ShpError::MissingAttributeTable { .. }
        ));
    }

    #[test]
    fn test_over_read_is_error() {
        let (mut shp, dbf) = line_set();
        // Shrink the declared length of the first record below its body.
        shp[104..108].copy_from_slice(&2i32.to_be_bytes());
        let mut reader = SequentialReader::new(shp.as_slice(), Some(dbf.as_slice())).unwrap();
        assert!(!reader.advance());
        assert!(matches!(
            reader.err(),
            Some(ShpError::LengthExceeded { .. }) | Some(ShpError::OverRead { .. })
        ));
    }

    #[test]
    fn test_fixed_field_over_read() {
        let mut writer = Writer::new(
            Cursor::new(Vec::new()),
            Cursor::new(Vec::new()),
            Cursor::new(Vec::new()),
            ShapeType::Point,
        )
        .unwrap();
        writer.write(&Shape::Point(Point::new(1.0, 2.0))).unwrap();
        let (shp, _, _) = writer.into_streams().unwrap();
        let mut shp = shp.into_inner();
        shp[104..108].copy_from_slice(&4i32.to_be_bytes());

        let mut reader = SequentialReader::<_, &[u8]>::new(shp.as_slice(), None).unwrap();
        assert!(!reader.advance());
        assert!(matches!(
            reader.err(),
            Some(ShpError::OverRead {
                record: 1,
                declared: 8,
                consumed: 20
            })
        ));
    }

    #[test]
    fn test_truncated_stream() {
        let (shp, dbf) = line_set();
        let cut = &shp[..shp.len() - 10];
        let mut reader = SequentialReader::new(cut, Some(dbf.as_slice())).unwrap();
        assert!(reader.advance());
        assert!(reader.advance());
        assert!(!reader.advance());
        assert!(reader.err().unwrap().is_truncated());
    }

    #[test]
    fn test_bad_row_flag() {
        let (shp, mut dbf) = line_set();
        let header = DbfHeader::read(&mut dbf.as_slice()).unwrap();
        dbf[header.header_length as usize] = b'?';
        let mut reader = SequentialReader::new(shp.as_slice(), Some(dbf.as_slice())).unwrap();
        assert!(!reader.advance());
        assert!(matches!(reader.err(), Some(ShpError::ParseError { .. })));
    }

    #[test]
    fn test_deleted_rows_are_read() {
        let (shp, mut dbf) = line_set();
        let header = DbfHeader::read(&mut dbf.as_slice()).unwrap();
        dbf[header.header_length as usize] = b'*';
        let mut reader = SequentialReader::new(shp.as_slice(), Some(dbf.as_slice())).unwrap();
        assert!(reader.advance());
        assert_eq!(reader.attribute(0).unwrap(), "road0");
    }
}
