// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Record index (`.shx`).
//!
//! After the main header, the index holds one 8-byte big-endian entry per
//! record: the word offset of the record header in the `.shp` stream and
//! the record's content length in words.

use std::io::Read;

use serde::{Deserialize, Serialize};

use super::header::{ShapeHeader, HEADER_LEN};
use crate::{Result, ShpError};

/// Size of one index entry in bytes.
pub const INDEX_ENTRY_LEN: u64 = 8;

/// Location of one record in the geometry stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Word offset of the record header
    pub offset: i32,
    /// Content length in words
    pub content_length: i32,
}

impl IndexEntry {
    /// Entry for a record header starting at `byte_offset`.
    pub fn new(byte_offset: u64, content_bytes: u64) -> Result<Self> {
        let words = |bytes: u64, what: &str| {
            i32::try_from(bytes / 2).map_err(|_| {
                ShpError::parse("SHX entry", format!("{what} {bytes} exceeds the format limit"))
            })
        };
        Ok(Self {
            offset: words(byte_offset, "offset")?,
            content_length: words(content_bytes, "content length")?,
        })
    }

    /// Offset of the record header in bytes.
    pub fn byte_offset(&self) -> u64 {
        self.offset as u64 * 2
    }

    pub fn parse(raw: &[u8; 8]) -> Self {
        Self {
            offset: i32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]),
            content_length: i32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]),
        }
    }

    pub fn encode(&self) -> [u8; 8] {
        let mut raw = [0u8; 8];
        raw[..4].copy_from_slice(&self.offset.to_be_bytes());
        raw[4..].copy_from_slice(&self.content_length.to_be_bytes());
        raw
    }
}

/// Read a whole index file.
///
/// The entry count comes from the header's file length.
pub fn read_index<R: Read>(reader: &mut R) -> Result<(ShapeHeader, Vec<IndexEntry>)> {
    let header = ShapeHeader::read(reader)?;
    let count = header.file_length().saturating_sub(HEADER_LEN) / INDEX_ENTRY_LEN;
    let mut entries = Vec::with_capacity(count.min(1 << 20) as usize);
    let mut raw = [0u8; 8];
    for _ in 0..count {
        reader
            .read_exact(&mut raw)
            .map_err(|e| ShpError::io("SHX entry", &e))?;
        entries.push(IndexEntry::parse(&raw));
    }
    Ok((header, entries))
}
