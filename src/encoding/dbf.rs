// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Attribute table codec.
//!
//! The table starts with a 32-byte prologue, followed by one 32-byte
//! descriptor per column and a `0x0D` terminator. Rows begin at
//! `header_length`; each row is a liveness byte followed by fixed-width
//! text cells.

use std::io::{Read, Write};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use tracing::warn;

use crate::core::{Field, FieldType, FieldValue};
use crate::{Result, ShpError};

/// Version byte written to new tables.
pub const DBF_VERSION: u8 = 0x03;

/// Size of the fixed header prologue.
pub const PROLOGUE_LEN: usize = 32;

/// Size of one column descriptor.
pub const DESCRIPTOR_LEN: usize = 32;

/// Byte ending the descriptor array.
pub const HEADER_TERMINATOR: u8 = 0x0D;

/// Liveness byte of an active row.
pub const ROW_ACTIVE: u8 = b' ';

/// Liveness byte of a deleted row.
pub const ROW_DELETED: u8 = b'*';

/// Size of the descriptor name slot.
const NAME_SLOT_LEN: usize = 11;

/// Parsed or computed attribute table header.
#[derive(Debug, Clone, PartialEq)]
pub struct DbfHeader {
    /// Number of rows
    pub num_records: u32,
    /// Offset of the first row
    pub header_length: u16,
    /// Bytes per row, liveness byte included
    pub record_length: u16,
    /// Column descriptors
    pub fields: Vec<Field>,
}

impl DbfHeader {
    /// Compute the lengths for a new table with `fields`.
    pub fn new(fields: Vec<Field>, num_records: u32) -> Result<Self> {
        let header_length = PROLOGUE_LEN + 1 + DESCRIPTOR_LEN * fields.len();
        let record_length = 1 + fields.iter().map(Field::size).sum::<usize>();
        if header_length > i16::MAX as usize || record_length > i16::MAX as usize {
            return Err(ShpError::invalid_field(
                fields.last().map(Field::name).unwrap_or_default(),
                format!(
                    "table layout too large: header {header_length} bytes, row {record_length} bytes"
                ),
            ));
        }
        Ok(Self {
            num_records,
            header_length: header_length as u16,
            record_length: record_length as u16,
            fields,
        })
    }

    /// Table with no columns; every row is just the liveness byte.
    pub fn empty(num_records: u32) -> Self {
        Self {
            num_records,
            header_length: (PROLOGUE_LEN + 1) as u16,
            record_length: 1,
            fields: Vec::new(),
        }
    }

    /// Parse the header, descriptors and terminator.
    ///
    /// Descriptors are read until the terminator. The reader is left just
    /// after it, which may be before `header_length` if the table carries
    /// extra header bytes.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut prologue = [0u8; PROLOGUE_LEN];
        reader
            .read_exact(&mut prologue)
            .map_err(|e| ShpError::io("DBF header", &e))?;

        let num_records = u32::from_le_bytes([prologue[4], prologue[5], prologue[6], prologue[7]]);
        let header_length = i16::from_le_bytes([prologue[8], prologue[9]]);
        let record_length = i16::from_le_bytes([prologue[10], prologue[11]]);

        if (header_length as i32) < (PROLOGUE_LEN + 1) as i32 {
            return Err(ShpError::malformed_header(
                "DBF header",
                format!("header length {header_length} is shorter than the prologue"),
            ));
        }
        if record_length < 1 {
            return Err(ShpError::malformed_header(
                "DBF header",
                format!("record length {record_length} is not positive"),
            ));
        }

        let max_fields = (header_length as usize - PROLOGUE_LEN - 1) / DESCRIPTOR_LEN;
        let mut fields = Vec::with_capacity(max_fields);
        let mut descriptor = [0u8; DESCRIPTOR_LEN];
        let mut terminated = false;
        while fields.len() < max_fields {
            reader
                .read_exact(&mut descriptor[..1])
                .map_err(|e| ShpError::io("DBF field descriptor", &e))?;
            if descriptor[0] == HEADER_TERMINATOR {
                terminated = true;
                break;
            }
            reader
                .read_exact(&mut descriptor[1..])
                .map_err(|e| ShpError::io("DBF field descriptor", &e))?;
            fields.push(parse_descriptor(&descriptor));
        }

        if !terminated {
            let mut terminator = [0u8; 1];
            reader
                .read_exact(&mut terminator)
                .map_err(|e| ShpError::io("DBF header terminator", &e))?;
            if terminator[0] != HEADER_TERMINATOR {
                return Err(ShpError::malformed_header(
                    "DBF header",
                    format!(
                        "expected terminator 0x0D after {max_fields} fields, found 0x{:02X}",
                        terminator[0]
                    ),
                ));
            }
        }

        let header = Self {
            num_records,
            header_length: header_length as u16,
            record_length: record_length as u16,
            fields,
        };
        let computed = header.computed_record_length();
        if computed != header.record_length as usize {
            warn!(
                declared = header.record_length,
                computed = computed,
                "DBF record length disagrees with field widths"
            );
        }
        Ok(header)
    }

    /// Encode the header stamped with `date`.
    pub fn encode(&self, date: NaiveDate) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.header_length as usize);
        buf.push(DBF_VERSION);
        buf.push((date.year() - 1900).clamp(0, 255) as u8);
        buf.push(date.month() as u8);
        buf.push(date.day() as u8);
        buf.extend_from_slice(&self.num_records.to_le_bytes());
        buf.extend_from_slice(&(self.header_length as i16).to_le_bytes());
        buf.extend_from_slice(&(self.record_length as i16).to_le_bytes());
        buf.extend_from_slice(&[0u8; 20]);

        for field in &self.fields {
            let mut name = [0u8; NAME_SLOT_LEN];
            let bytes = field.name().as_bytes();
            let len = bytes.len().min(NAME_SLOT_LEN - 1);
            name[..len].copy_from_slice(&bytes[..len]);
            buf.extend_from_slice(&name);
            buf.push(field.field_type().tag());
            buf.extend_from_slice(&[0u8; 4]);
            buf.push(field.size() as u8);
            buf.push(field.precision() as u8);
            buf.extend_from_slice(&[0u8; 14]);
        }
        buf.push(HEADER_TERMINATOR);
        buf
    }

    /// Write the header stamped with today's UTC date.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer
            .write_all(&self.encode(Utc::now().date_naive()))
            .map_err(|e| ShpError::io("DBF header", &e))
    }

    /// Byte offset of the first row in a table with this many columns.
    pub fn descriptors_end(&self) -> u64 {
        (PROLOGUE_LEN + DESCRIPTOR_LEN * self.fields.len() + 1) as u64
    }

    /// `1 + Σ widths`.
    pub fn computed_record_length(&self) -> usize {
        1 + self.fields.iter().map(Field::size).sum::<usize>()
    }

    /// Offset of `field` within a row, liveness byte included.
    pub fn field_offset(&self, field: usize) -> Result<usize> {
        if field >= self.fields.len() {
            return Err(ShpError::FieldIndexOutOfRange {
                index: field,
                count: self.fields.len(),
            });
        }
        Ok(1 + self.fields[..field].iter().map(Field::size).sum::<usize>())
    }

    /// Absolute byte offset of a cell in the table file.
    pub fn cell_offset(&self, row: usize, field: usize) -> Result<u64> {
        let in_row = self.field_offset(field)?;
        Ok(self.header_length as u64 + row as u64 * self.record_length as u64 + in_row as u64)
    }

    /// Absolute byte offset of the start of a row.
    pub fn row_offset(&self, row: usize) -> u64 {
        self.header_length as u64 + row as u64 * self.record_length as u64
    }

    /// Active row with every cell zeroed.
    pub fn blank_row(&self) -> Vec<u8> {
        let mut row = vec![0u8; self.record_length as usize];
        if let Some(flag) = row.first_mut() {
            *flag = ROW_ACTIVE;
        }
        row
    }

    /// Split a full row into trimmed cell texts.
    pub fn split_row(&self, row: &[u8]) -> Vec<String> {
        let mut offset = 1;
        self.fields
            .iter()
            .map(|field| {
                let end = (offset + field.size()).min(row.len());
                let cell = row.get(offset.min(end)..end).unwrap_or_default();
                offset += field.size();
                trim_cell(cell)
            })
            .collect()
    }
}

fn parse_descriptor(raw: &[u8; DESCRIPTOR_LEN]) -> Field {
    let name_slot = &raw[..NAME_SLOT_LEN];
    let name_end = name_slot
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(NAME_SLOT_LEN);
    let name = String::from_utf8_lossy(&name_slot[..name_end])
        .trim_end()
        .to_string();
    Field::from_raw(name, FieldType::from_tag(raw[11]), raw[16], raw[17])
}

/// Cell text with space and NUL padding removed.
pub fn trim_cell(cell: &[u8]) -> String {
    String::from_utf8_lossy(cell)
        .trim_matches(|c| c == ' ' || c == '\0')
        .to_string()
}

/// Render `value` into exactly `field.size()` bytes.
///
/// Text is left-justified and space-padded. A rendering wider than the
/// column is [`ShpError::ValueTooWide`]; nothing is ever truncated.
pub fn format_value(field: &Field, value: &FieldValue) -> Result<Vec<u8>> {
    let text = render(field, value)?;
    let width = field.size();
    if text.len() > width {
        return Err(ShpError::ValueTooWide {
            field: field.name().to_string(),
            value: text,
            width,
        });
    }
    let mut cell = text.into_bytes();
    cell.resize(width, b' ');
    Ok(cell)
}

fn render(field: &Field, value: &FieldValue) -> Result<String> {
    let precision = field.precision();
    Ok(match (field.field_type(), value) {
        (FieldType::Date, FieldValue::Str(s)) => format_date(parse_date(field, s)?),
        (_, FieldValue::Date(d)) => format_date(*d),
        (_, FieldValue::Str(s)) => s.clone(),
        (FieldType::Float, FieldValue::Int(v)) => format!("{:.precision$}", *v as f64),
        (_, FieldValue::Int(v)) => v.to_string(),
        (_, FieldValue::Float(v)) => format!("{v:.precision$}"),
        (_, FieldValue::Bool(b)) => if *b { "Yes" } else { "No" }.to_string(),
    })
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Accepts `YYYY-MM-DD`, `YYYYMMDD` or an RFC 3339 timestamp.
fn parse_date(field: &Field, text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    let parsed = match text.len() {
        10 => NaiveDate::parse_from_str(text, "%Y-%m-%d").ok(),
        8 => NaiveDate::parse_from_str(text, "%Y%m%d").ok(),
        _ => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|dt| dt.date_naive()),
    };
    parsed.ok_or_else(|| {
        ShpError::invalid_value(field.name(), format!("cannot parse {text:?} as a date"))
    })
}
