// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for shpcodec.
//!
//! Provides error types for file-set I/O operations:
//! - Header and record decoding
//! - Attribute table schema and value formatting
//! - Archive discovery
//! - Resource release

use std::fmt;
use std::io;

/// Errors that can occur while reading or writing a shapefile set.
#[derive(Debug, Clone)]
pub enum ShpError {
    /// A file header failed validation (magic number, terminator, lengths)
    MalformedHeader {
        /// Which file or structure was being parsed
        context: String,
        /// What was wrong with it
        message: String,
    },

    /// Geometry type tag not known to the codec
    UnsupportedShapeType {
        /// Raw tag as stored in the file
        tag: i32,
    },

    /// The stream ended before a complete value could be read
    Truncated {
        /// What was being read
        context: String,
        /// Underlying error message
        message: String,
    },

    /// The geometry codec consumed more bytes than the record declared
    OverRead {
        /// 1-based record number
        record: i32,
        /// Bytes declared by the record header (content length × 2)
        declared: u64,
        /// Bytes actually consumed
        consumed: u64,
    },

    /// An array count exceeds the bytes remaining in the record
    LengthExceeded {
        /// Element count that was read
        count: usize,
        /// Size of a single element in bytes
        element_size: usize,
        /// Bytes left in the record
        remaining: u64,
    },

    /// Parse error in a value read from the stream
    ParseError {
        /// What was being parsed
        context: String,
        /// Error message
        message: String,
    },

    /// A shape does not match the type of the file set it is written to
    ShapeTypeMismatch {
        /// Type of the file set
        expected: String,
        /// Type of the shape being written
        actual: String,
    },

    /// Formatted value does not fit its column
    ValueTooWide {
        /// Column name
        field: String,
        /// Rendered text
        value: String,
        /// Declared column width
        width: usize,
    },

    /// Value cannot be rendered for the column type
    InvalidValue {
        /// Column name
        field: String,
        /// Reason
        reason: String,
    },

    /// Column descriptor is not valid
    InvalidField {
        /// Column name as given
        name: String,
        /// Reason
        reason: String,
    },

    /// `set_fields` was called on a writer that already has a schema
    SchemaAlreadySet,

    /// Attribute access before any schema was set
    SchemaNotSet,

    /// Column index beyond the schema
    FieldIndexOutOfRange {
        /// Requested column
        index: usize,
        /// Number of columns
        count: usize,
    },

    /// Attribute access on a reader that is not positioned on a record
    NoCurrentRecord,

    /// Row index beyond the table
    RowOutOfRange {
        /// Requested row
        row: usize,
        /// Number of rows
        count: usize,
    },

    /// No attribute table is available for this file set
    MissingAttributeTable {
        /// Expected location
        path: String,
    },

    /// No index file is available for this file set
    MissingIndex {
        /// Expected location
        path: String,
    },

    /// Archive has no geometry member
    NoShapefileInArchive,

    /// Archive has more than one geometry member
    MultipleShapefilesInArchive {
        /// Names of all geometry members found
        candidates: Vec<String>,
    },

    /// Named member is not present in the archive
    MemberNotFound {
        /// Member name
        name: String,
    },

    /// Error reported by the archive layer
    Archive {
        /// Error message
        message: String,
    },

    /// Other I/O failure
    Io {
        /// What was being done
        context: String,
        /// Underlying error kind
        kind: io::ErrorKind,
        /// Underlying error message
        message: String,
    },

    /// One or more streams failed to release
    Close {
        /// One entry per failed stream
        failures: Vec<String>,
    },
}

impl ShpError {
    /// Create a malformed header error.
    pub fn malformed_header(context: impl Into<String>, message: impl Into<String>) -> Self {
        ShpError::MalformedHeader {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported shape type error.
    pub fn unsupported_shape_type(tag: i32) -> Self {
        ShpError::UnsupportedShapeType { tag }
    }

    /// Create a parse error.
    pub fn parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        ShpError::ParseError {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a truncated read error.
    pub fn truncated(context: impl Into<String>, message: impl Into<String>) -> Self {
        ShpError::Truncated {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create an over-read error.
    pub fn over_read(record: i32, declared: u64, consumed: u64) -> Self {
        ShpError::OverRead {
            record,
            declared,
            consumed,
        }
    }

    /// Create a length exceeded error.
    pub fn length_exceeded(count: usize, element_size: usize, remaining: u64) -> Self {
        ShpError::LengthExceeded {
            count,
            element_size,
            remaining,
        }
    }

    /// Create an invalid field error.
    pub fn invalid_field(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ShpError::InvalidField {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ShpError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an archive error.
    pub fn archive(message: impl Into<String>) -> Self {
        ShpError::Archive {
            message: message.into(),
        }
    }

    /// Wrap an I/O error with context.
    ///
    /// `UnexpectedEof` is reported as [`ShpError::Truncated`].
    pub fn io(context: impl Into<String>, err: &io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            return ShpError::truncated(context, err.to_string());
        }
        ShpError::Io {
            context: context.into(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// Whether this error is a short read.
    pub fn is_truncated(&self) -> bool {
        matches!(self, ShpError::Truncated { .. })
    }

    /// Get structured fields for logging.
    pub fn log_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            ShpError::MalformedHeader { context, message }
            | ShpError::ParseError { context, message }
            | ShpError::Truncated { context, message } => {
                vec![("context", context.clone()), ("message", message.clone())]
            }
            ShpError::UnsupportedShapeType { tag } => vec![("tag", tag.to_string())],
            ShpError::OverRead {
                record,
                declared,
                consumed,
            } => vec![
                ("record", record.to_string()),
                ("declared", declared.to_string()),
                ("consumed", consumed.to_string()),
            ],
            ShpError::LengthExceeded {
                count,
                element_size,
                remaining,
            } => vec![
                ("count", count.to_string()),
                ("element_size", element_size.to_string()),
                ("remaining", remaining.to_string()),
            ],
            ShpError::ShapeTypeMismatch { expected, actual } => {
                vec![("expected", expected.clone()), ("actual", actual.clone())]
            }
            ShpError::ValueTooWide {
                field,
                value,
                width,
            } => vec![
                ("field", field.clone()),
                ("value", value.clone()),
                ("width", width.to_string()),
            ],
            ShpError::InvalidValue { field, reason } => {
                vec![("field", field.clone()), ("reason", reason.clone())]
            }
            ShpError::InvalidField { name, reason } => {
                vec![("field", name.clone()), ("reason", reason.clone())]
            }
            ShpError::SchemaAlreadySet | ShpError::SchemaNotSet | ShpError::NoCurrentRecord => {
                Vec::new()
            }
            ShpError::FieldIndexOutOfRange { index, count } => {
                vec![("index", index.to_string()), ("count", count.to_string())]
            }
            ShpError::RowOutOfRange { row, count } => {
                vec![("row", row.to_string()), ("count", count.to_string())]
            }
            ShpError::MissingAttributeTable { path } | ShpError::MissingIndex { path } => {
                vec![("path", path.clone())]
            }
            ShpError::NoShapefileInArchive => Vec::new(),
            ShpError::MultipleShapefilesInArchive { candidates } => {
                vec![("candidates", candidates.join(","))]
            }
            ShpError::MemberNotFound { name } => vec![("member", name.clone())],
            ShpError::Archive { message } => vec![("message", message.clone())],
            ShpError::Io {
                context,
                kind,
                message,
            } => vec![
                ("context", context.clone()),
                ("kind", format!("{kind:?}")),
                ("message", message.clone()),
            ],
            ShpError::Close { failures } => vec![("failures", failures.join("; "))],
        }
    }
}

impl fmt::Display for ShpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShpError::MalformedHeader { context, message } => {
                write!(f, "Malformed header in {context}: {message}")
            }
            ShpError::UnsupportedShapeType { tag } => {
                write!(f, "Unsupported shape type: {tag}")
            }
            ShpError::Truncated { context, message } => {
                write!(f, "Truncated read in {context}: {message}")
            }
            ShpError::OverRead {
                record,
                declared,
                consumed,
            } => write!(
                f,
                "Too many bytes read for record {record}: declared {declared}, consumed {consumed}"
            ),
            ShpError::LengthExceeded {
                count,
                element_size,
                remaining,
            } => write!(
                f,
                "Array of {count} elements ({element_size} bytes each) exceeds the {remaining} bytes left in the record"
            ),
            ShpError::ParseError { context, message } => {
                write!(f, "Parse error in {context}: {message}")
            }
            ShpError::ShapeTypeMismatch { expected, actual } => {
                write!(f, "Shape type mismatch: file holds {expected}, got {actual}")
            }
            ShpError::ValueTooWide {
                field,
                value,
                width,
            } => write!(
                f,
                "Value {value:?} exceeds width {width} of field '{field}'"
            ),
            ShpError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for field '{field}': {reason}")
            }
            ShpError::InvalidField { name, reason } => {
                write!(f, "Invalid field '{name}': {reason}")
            }
            ShpError::SchemaAlreadySet => write!(f, "Attribute fields are already set"),
            ShpError::SchemaNotSet => {
                write!(f, "Attribute fields are not set, call set_fields first")
            }
            ShpError::FieldIndexOutOfRange { index, count } => {
                write!(f, "Field index {index} out of range ({count} fields)")
            }
            ShpError::NoCurrentRecord => {
                write!(f, "No current record, call advance first")
            }
            ShpError::RowOutOfRange { row, count } => {
                write!(f, "Row {row} out of range ({count} rows)")
            }
            ShpError::MissingAttributeTable { path } => {
                write!(f, "No attribute table available: {path}")
            }
            ShpError::MissingIndex { path } => write!(f, "No index file available: {path}"),
            ShpError::NoShapefileInArchive => {
                write!(f, "Archive does not contain a .shp file")
            }
            ShpError::MultipleShapefilesInArchive { candidates } => write!(
                f,
                "Archive contains multiple .shp files: {}",
                candidates.join(", ")
            ),
            ShpError::MemberNotFound { name } => write!(f, "No such file in archive: {name}"),
            ShpError::Archive { message } => write!(f, "Archive error: {message}"),
            ShpError::Io {
                context, message, ..
            } => write!(f, "I/O error in {context}: {message}"),
            ShpError::Close { failures } => {
                write!(f, "Failed to close: {}", failures.join("; "))
            }
        }
    }
}

impl std::error::Error for ShpError {}

impl From<io::Error> for ShpError {
    fn from(err: io::Error) -> Self {
        ShpError::io("IO", &err)
    }
}

impl From<zip::result::ZipError> for ShpError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => ShpError::io("Archive", &e),
            other => ShpError::archive(other.to_string()),
        }
    }
}

/// Result type for shpcodec operations.
pub type Result<T> = std::result::Result<T, ShpError>;
