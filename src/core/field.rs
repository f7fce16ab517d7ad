// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Attribute table column descriptors and cell values.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::{Result, ShpError};

/// Longest column name the descriptor slot can hold.
pub const MAX_FIELD_NAME_LEN: usize = 10;

/// Column type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// `C`: text
    Character,
    /// `N`: integer or fixed-point number
    Numeric,
    /// `F`: floating point number with precision
    Float,
    /// `D`: date as `YYYYMMDD`
    Date,
    /// `L`: logical
    Logical,
    /// Any other tag found in an existing table, kept as stored
    Other(u8),
}

impl FieldType {
    /// The tag byte stored in the descriptor.
    pub fn tag(&self) -> u8 {
        match self {
            FieldType::Character => b'C',
            FieldType::Numeric => b'N',
            FieldType::Float => b'F',
            FieldType::Date => b'D',
            FieldType::Logical => b'L',
            FieldType::Other(tag) => *tag,
        }
    }

    /// Parse a descriptor tag byte.
    pub fn from_tag(tag: u8) -> Self {
        match tag.to_ascii_uppercase() {
            b'C' => FieldType::Character,
            b'N' => FieldType::Numeric,
            b'F' => FieldType::Float,
            b'D' => FieldType::Date,
            b'L' => FieldType::Logical,
            _ => FieldType::Other(tag),
        }
    }
}

/// A column of the attribute table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    name: String,
    field_type: FieldType,
    size: u8,
    precision: u8,
}

impl Field {
    /// Create a column descriptor, validating the name.
    ///
    /// The name must be 1 to 10 printable ASCII characters.
    pub fn new(name: &str, field_type: FieldType, size: u8, precision: u8) -> Result<Self> {
        if name.is_empty() || name.len() > MAX_FIELD_NAME_LEN {
            return Err(ShpError::invalid_field(
                name,
                format!("name must be 1 to {MAX_FIELD_NAME_LEN} characters"),
            ));
        }
        if !name.bytes().all(|b| b.is_ascii_graphic() || b == b' ') {
            return Err(ShpError::invalid_field(
                name,
                "name must be printable ASCII",
            ));
        }
        if size == 0 {
            return Err(ShpError::invalid_field(name, "width must be positive"));
        }
        Ok(Self {
            name: name.to_string(),
            field_type,
            size,
            precision,
        })
    }

    /// Text column.
    pub fn string(name: &str, size: u8) -> Result<Self> {
        Self::new(name, FieldType::Character, size, 0)
    }

    /// Integer column.
    pub fn number(name: &str, size: u8) -> Result<Self> {
        Self::new(name, FieldType::Numeric, size, 0)
    }

    /// Floating point column with `precision` decimals.
    pub fn float(name: &str, size: u8, precision: u8) -> Result<Self> {
        Self::new(name, FieldType::Float, size, precision)
    }

    /// Date column, always 8 bytes wide.
    pub fn date(name: &str) -> Result<Self> {
        Self::new(name, FieldType::Date, 8, 0)
    }

    /// Logical column, wide enough for `Yes`/`No`.
    pub fn logical(name: &str) -> Result<Self> {
        Self::new(name, FieldType::Logical, 3, 0)
    }

    /// Build a descriptor exactly as read from a table header.
    ///
    /// No validation: existing files are taken as they are.
    pub(crate) fn from_raw(name: String, field_type: FieldType, size: u8, precision: u8) -> Self {
        Self {
            name,
            field_type,
            size,
            precision,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Width of the cell in bytes.
    pub fn size(&self) -> usize {
        self.size as usize
    }

    pub fn precision(&self) -> usize {
        self.precision as usize
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A typed value to be stored in a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(v as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(v: NaiveDate) -> Self {
        FieldValue::Date(v)
    }
}
