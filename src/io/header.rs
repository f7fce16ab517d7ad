// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Main file header and record header.
//!
//! The 100-byte header is shared by the `.shp` and `.shx` files. It mixes
//! byte orders: the file code and file length are big-endian, everything
//! from the version on is little-endian. Lengths are counted in 16-bit
//! words.

use std::io::{Read, Write};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use tracing::warn;

use crate::core::{BBox, ShapeType};
use crate::{Result, ShpError};

/// File code at offset 0.
pub const FILE_CODE: i32 = 9994;

/// Version at offset 28.
pub const FILE_VERSION: i32 = 1000;

/// Header size in bytes.
pub const HEADER_LEN: u64 = 100;

/// Record header size in bytes.
pub const RECORD_HEADER_LEN: u64 = 8;

/// Main file header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeHeader {
    /// File length in 16-bit words, header included
    pub file_length_words: i32,
    /// Type of every record in the file set
    pub shape_type: ShapeType,
    /// Bounds over all records
    pub bbox: BBox,
    /// Elevation range, written as zero
    pub z_range: [f64; 2],
    /// Measure range, written as zero
    pub m_range: [f64; 2],
}

impl ShapeHeader {
    /// Header for a file of `file_length` bytes.
    pub fn new(shape_type: ShapeType, bbox: BBox, file_length: u64) -> Result<Self> {
        let words = i32::try_from(file_length / 2).map_err(|_| {
            ShpError::malformed_header(
                "SHP header",
                format!("file length {file_length} bytes does not fit in the header"),
            )
        })?;
        Ok(Self {
            file_length_words: words,
            shape_type,
            bbox,
            z_range: [0.0, 0.0],
            m_range: [0.0, 0.0],
        })
    }

    /// Declared file length in bytes.
    pub fn file_length(&self) -> u64 {
        self.file_length_words as u64 * 2
    }

    /// Parse and validate the header.
    ///
    /// A wrong file code is [`ShpError::MalformedHeader`]; an unknown
    /// version is tolerated with a warning.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let map = |e: std::io::Error| ShpError::io("SHP header", &e);

        let file_code = reader.read_i32::<BigEndian>().map_err(map)?;
        if file_code != FILE_CODE {
            return Err(ShpError::malformed_header(
                "SHP header",
                format!("file code {file_code}, expected {FILE_CODE}"),
            ));
        }
        let mut unused = [0u8; 20];
        reader.read_exact(&mut unused).map_err(map)?;
        let file_length_words = reader.read_i32::<BigEndian>().map_err(map)?;
        if file_length_words < 0 {
            return Err(ShpError::malformed_header(
                "SHP header",
                format!("negative file length {file_length_words}"),
            ));
        }

        let version = reader.read_i32::<LittleEndian>().map_err(map)?;
        if version != FILE_VERSION {
            warn!(version, "unexpected shapefile version");
        }
        let shape_type = ShapeType::from_tag(reader.read_i32::<LittleEndian>().map_err(map)?)?;

        let mut values = [0.0f64; 8];
        reader
            .read_f64_into::<LittleEndian>(&mut values)
            .map_err(map)?;

        Ok(Self {
            file_length_words,
            shape_type,
            bbox: BBox::new(values[0], values[1], values[2], values[3]),
            z_range: [values[4], values[5]],
            m_range: [values[6], values[7]],
        })
    }

    /// Encode the 100-byte header.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN as usize);
        buf.extend_from_slice(&FILE_CODE.to_be_bytes());
        buf.extend_from_slice(&[0u8; 20]);
        buf.extend_from_slice(&self.file_length_words.to_be_bytes());
        buf.extend_from_slice(&FILE_VERSION.to_le_bytes());
        buf.extend_from_slice(&self.shape_type.tag().to_le_bytes());
        for v in [
            self.bbox.min_x,
            self.bbox.min_y,
            self.bbox.max_x,
            self.bbox.max_y,
            self.z_range[0],
            self.z_range[1],
            self.m_range[0],
            self.m_range[1],
        ] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer
            .write_all(&self.encode())
            .map_err(|e| ShpError::io("SHP header", &e))
    }
}

/// Record header preceding each geometry body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// 1-based record number
    pub number: i32,
    /// Body length in 16-bit words
    pub content_words: i32,
}

impl RecordHeader {
    /// Parse from the 8 raw bytes.
    pub fn parse(raw: &[u8; 8]) -> Result<Self> {
        let number = i32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let content_words = i32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]);
        if content_words < 0 {
            return Err(ShpError::parse(
                "record header",
                format!("record {number} has negative content length {content_words}"),
            ));
        }
        Ok(Self {
            number,
            content_words,
        })
    }

    /// Body length in bytes.
    pub fn content_length(&self) -> u64 {
        self.content_words as u64 * 2
    }

    pub fn encode(&self) -> [u8; 8] {
        let mut raw = [0u8; 8];
        raw[..4].copy_from_slice(&self.number.to_be_bytes());
        raw[4..].copy_from_slice(&self.content_words.to_be_bytes());
        raw
    }
}
