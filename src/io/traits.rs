// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Reader trait shared by the random-access, sequential and archive readers.
//!
//! A reader is a cursor over records: [`advance`](ShapeReader::advance)
//! moves to the next record and reports whether one is available,
//! [`current`](ShapeReader::current) exposes it, and
//! [`err`](ShapeReader::err) tells a clean end from a failure.
//!
//! # Example
//!
//! ```rust,no_run
//! use shpcodec::io::{Reader, ShapeReader};
//!
//! let mut reader = Reader::open("roads.shp")?;
//! while reader.advance() {
//!     if let Some((index, shape)) = reader.current() {
//!         println!("{index}: {}", shape.shape_type());
//!     }
//! }
//! if let Some(err) = reader.err() {
//!     eprintln!("stopped early: {err}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::core::{BBox, Field, Shape, ShapeType};
use crate::{Result, ShpError};

/// Cursor over the records of a file set.
pub trait ShapeReader {
    /// Type declared in the geometry header.
    fn shape_type(&self) -> ShapeType;

    /// Bounding box declared in the geometry header.
    fn bbox(&self) -> BBox;

    /// Move to the next record.
    ///
    /// Returns `false` at the end of the stream or after a failure; check
    /// [`err`](Self::err) to tell the two apart.
    fn advance(&mut self) -> bool;

    /// The record reached by the last successful `advance`, with its
    /// 0-based index.
    fn current(&self) -> Option<(usize, &Shape)>;

    /// Columns of the attribute table; empty when there is none.
    fn fields(&mut self) -> Result<&[Field]>;

    /// Text of one cell of the current record's attribute row.
    fn attribute(&mut self, field: usize) -> Result<String>;

    /// Every cell of the current record's attribute row.
    fn attributes(&mut self) -> Result<Vec<String>> {
        let count = self.fields()?.len();
        (0..count).map(|field| self.attribute(field)).collect()
    }

    /// First failure that stopped iteration.
    fn err(&self) -> Option<&ShpError>;

    /// Iterate over the remaining records.
    fn records(&mut self) -> Records<'_, Self>
    where
        Self: Sized,
    {
        Records {
            reader: self,
            finished: false,
        }
    }

    /// Drop the reader and its streams.
    ///
    /// Read streams have nothing to flush, so the only failure reported
    /// here is the one that stopped iteration, if any.
    fn close(self) -> Result<()>
    where
        Self: Sized,
    {
        match self.err() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl<R: ShapeReader + ?Sized> ShapeReader for Box<R> {
    fn shape_type(&self) -> ShapeType {
        (**self).shape_type()
    }

    fn bbox(&self) -> BBox {
        (**self).bbox()
    }

    fn advance(&mut self) -> bool {
        (**self).advance()
    }

    fn current(&self) -> Option<(usize, &Shape)> {
        (**self).current()
    }

    fn fields(&mut self) -> Result<&[Field]> {
        (**self).fields()
    }

    fn attribute(&mut self, field: usize) -> Result<String> {
        (**self).attribute(field)
    }

    fn attributes(&mut self) -> Result<Vec<String>> {
        (**self).attributes()
    }

    fn err(&self) -> Option<&ShpError> {
        (**self).err()
    }
}

/// One record with its attribute texts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRecord {
    /// 0-based record index
    pub index: usize,
    pub shape: Shape,
    /// Cell texts, one per field
    pub attributes: Vec<String>,
}

/// Iterator returned by [`ShapeReader::records`].
///
/// Yields each record, then the reader's failure once if iteration
/// stopped early.
pub struct Records<'a, R: ?Sized> {
    reader: &'a mut R,
    finished: bool,
}

impl<R: ShapeReader + ?Sized> Iterator for Records<'_, R> {
    type Item = Result<ShapeRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if !self.reader.advance() {
            self.finished = true;
            return self.reader.err().cloned().map(Err);
        }
        let (index, shape) = match self.reader.current() {
            Some((index, shape)) => (index, shape.clone()),
            None => {
                self.finished = true;
                return None;
            }
        };
        match self.reader.attributes() {
            Ok(attributes) => Some(Ok(ShapeRecord {
                index,
                shape,
                attributes,
            })),
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Point;

    /// Yields `shapes`, then fails with `failure` if one is given.
    struct Scripted {
        shapes: Vec<Shape>,
        position: Option<usize>,
        failure: Option<ShpError>,
        error: Option<ShpError>,
    }

    impl Scripted {
        fn new(shapes: Vec<Shape>, failure: Option<ShpError>) -> Self {
            Self {
                shapes,
                position: None,
                failure,
                error: None,
            }
        }
    }

    impl ShapeReader for Scripted {
        fn shape_type(&self) -> ShapeType {
            ShapeType::Point
        }

        fn bbox(&self) -> BBox {
            BBox::default()
        }

        fn advance(&mut self) -> bool {
            let next = self.position.map_or(0, |p| p + 1);
            if next < self.shapes.len() {
                self.position = Some(next);
                return true;
            }
            self.position = None;
            self.error = self.failure.take();
            false
        }

        fn current(&self) -> Option<(usize, &Shape)> {
            self.position.map(|p| (p, &self.shapes[p]))
        }

        fn fields(&mut self) -> Result<&[Field]> {
            Ok(&[])
        }

        fn attribute(&mut self, field: usize) -> Result<String> {
            Err(ShpError::FieldIndexOutOfRange { index: field, count: 0 })
        }

        fn err(&self) -> Option<&ShpError> {
            self.error.as_ref()
        }
    }

    fn points(n: usize) -> Vec<Shape> {
        (0..n)
            .map(|i| Shape::Point(Point::new(i as f64, 0.0)))
            .collect()
    }

    #[test]
    fn test_records_until_end() {
        let mut reader = Scripted::new(points(2), None);
        let records: Vec<_> = reader.records().collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].index, 1);
        assert!(records[1].attributes.is_empty());
    }

    #[test]
    fn test_records_yield_failure_once() {
        let mut reader = Scripted::new(points(1), Some(ShpError::truncated("test", "eof")));
        let mut records = reader.records();
        assert!(records.next().unwrap().is_ok());
        assert!(records.next().unwrap().unwrap_err().is_truncated());
        assert!(records.next().is_none());
    }

    #[test]
    fn test_close_reports_stopping_failure() {
        let mut reader = Scripted::new(points(1), None);
        assert_eq!(reader.records().count(), 1);
        assert!(reader.close().is_ok());

        let mut reader = Scripted::new(points(1), Some(ShpError::truncated("test", "eof")));
        while reader.advance() {}
        assert!(reader.close().unwrap_err().is_truncated());
    }

    #[test]
    fn test_boxed_reader_forwards() {
        let mut reader: Box<dyn ShapeReader> = Box::new(Scripted::new(points(3), None));
        assert_eq!(reader.records().count(), 3);
        assert!(reader.err().is_none());
    }

    #[test]
    fn test_record_serializes() {
        let record = ShapeRecord {
            index: 4,
            shape: Shape::Point(Point::new(1.5, -2.0)),
            attributes: vec!["A".to_string()],
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: ShapeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
