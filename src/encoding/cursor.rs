// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Read helpers shared by the geometry and attribute codecs.
//!
//! - [`StickyReader`] wraps a stream, counts consumed bytes and remembers the
//!   first failure. Once a read has failed every later read returns that same
//!   failure without touching the stream, so a decoder can issue many small
//!   reads and the caller always sees the *first* error.
//! - [`ShapeCursor`] reads little-endian geometry fields and checks array
//!   counts against the bytes a record declared before allocating.

use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::core::{BBox, Point};
use crate::{Result, ShpError};

/// Reader that counts bytes and short-circuits after the first failure.
#[derive(Debug)]
pub struct StickyReader<R> {
    inner: R,
    /// First failure seen on this stream
    failure: Option<(io::ErrorKind, String)>,
    /// Bytes consumed since creation
    consumed: u64,
}

impl<R: Read> StickyReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            failure: None,
            consumed: 0,
        }
    }

    /// Bytes read since creation; seeks are not counted.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// The stored failure, if any.
    pub fn failure(&self) -> Option<io::Error> {
        self.failure
            .as_ref()
            .map(|(kind, msg)| io::Error::new(*kind, msg.clone()))
    }

    pub fn has_failed(&self) -> bool {
        self.failure.is_some()
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Fill `buf` as far as the stream allows.
    ///
    /// Returns the number of bytes read; fewer than `buf.len()` means the
    /// stream ended. End of stream is not recorded as a failure here so the
    /// caller can tell a clean end (0 bytes) from a partial read.
    pub fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    /// Read and throw away exactly `n` bytes. Never seeks.
    pub fn discard(&mut self, n: u64) -> io::Result<()> {
        let copied = io::copy(&mut self.by_ref().take(n), &mut io::sink())?;
        if copied < n {
            return Err(self.record(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("stream ended after discarding {copied} of {n} bytes"),
            )));
        }
        Ok(())
    }

    fn stored(&self) -> Option<io::Error> {
        self.failure()
    }

    fn record(&mut self, err: io::Error) -> io::Error {
        if self.failure.is_none() {
            self.failure = Some((err.kind(), err.to_string()));
        }
        err
    }
}

impl<R: Read> Read for StickyReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(err) = self.stored() {
            return Err(err);
        }
        match self.inner.read(buf) {
            Ok(n) => {
                self.consumed += n as u64;
                Ok(n)
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Err(e),
            Err(e) => Err(self.record(e)),
        }
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        if let Some(err) = self.stored() {
            return Err(err);
        }
        let filled = self.fill(buf)?;
        if filled < buf.len() {
            return Err(self.record(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {} bytes, stream ended after {filled}", buf.len()),
            )));
        }
        Ok(())
    }
}

impl<R: Seek> Seek for StickyReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        if let Some((kind, msg)) = &self.failure {
            return Err(io::Error::new(*kind, msg.clone()));
        }
        match self.inner.seek(pos) {
            Ok(n) => Ok(n),
            Err(e) => {
                self.failure = Some((e.kind(), e.to_string()));
                Err(e)
            }
        }
    }
}

/// Little-endian field reader for one geometry record body.
///
/// `limit` is the number of body bytes the record declared; arrays that
/// would not fit in what is left are rejected before allocation.
pub struct ShapeCursor<'a, R> {
    reader: &'a mut R,
    consumed: u64,
    limit: u64,
}

impl<'a, R: Read> ShapeCursor<'a, R> {
    pub fn new(reader: &'a mut R, limit: u64) -> Self {
        Self {
            reader,
            consumed: 0,
            limit,
        }
    }

    /// Cursor with no declared record length.
    pub fn unbounded(reader: &'a mut R) -> Self {
        Self::new(reader, u64::MAX)
    }

    /// Bytes consumed through this cursor.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn f64(&mut self) -> Result<f64> {
        let v = self
            .reader
            .read_f64::<LittleEndian>()
            .map_err(|e| ShpError::io("shape record", &e))?;
        self.consumed += 8;
        Ok(v)
    }

    pub fn i32(&mut self) -> Result<i32> {
        let v = self
            .reader
            .read_i32::<LittleEndian>()
            .map_err(|e| ShpError::io("shape record", &e))?;
        self.consumed += 4;
        Ok(v)
    }

    /// Read an element count; negative counts are rejected.
    pub fn count(&mut self, what: &str) -> Result<usize> {
        let n = self.i32()?;
        usize::try_from(n)
            .map_err(|_| ShpError::parse("shape record", format!("negative {what} count {n}")))
    }

    pub fn point(&mut self) -> Result<Point> {
        Ok(Point::new(self.f64()?, self.f64()?))
    }

    pub fn bbox(&mut self) -> Result<BBox> {
        Ok(BBox::new(self.f64()?, self.f64()?, self.f64()?, self.f64()?))
    }

    /// `[min, max]` pair.
    pub fn range(&mut self) -> Result<[f64; 2]> {
        Ok([self.f64()?, self.f64()?])
    }

    pub fn points(&mut self, n: usize) -> Result<Vec<Point>> {
        let Some(len) = n.checked_mul(2) else {
            return Err(ShpError::length_exceeded(n, 16, self.remaining()));
        };
        let coords = self.f64_array(len)?;
        Ok(coords
            .chunks_exact(2)
            .map(|c| Point::new(c[0], c[1]))
            .collect())
    }

    pub fn f64_array(&mut self, n: usize) -> Result<Vec<f64>> {
        self.check(n, 8)?;
        let mut values = vec![0.0; n];
        self.reader
            .read_f64_into::<LittleEndian>(&mut values)
            .map_err(|e| ShpError::io("shape record", &e))?;
        self.consumed += n as u64 * 8;
        Ok(values)
    }

    pub fn i32_array(&mut self, n: usize) -> Result<Vec<i32>> {
        self.check(n, 4)?;
        let mut values = vec![0; n];
        self.reader
            .read_i32_into::<LittleEndian>(&mut values)
            .map_err(|e| ShpError::io("shape record", &e))?;
        self.consumed += n as u64 * 4;
        Ok(values)
    }

    /// Whether at least `bytes` of the declared record length are left.
    pub fn has_remaining(&self, bytes: u64) -> bool {
        self.remaining() >= bytes
    }

    fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.consumed)
    }

    fn check(&self, n: usize, element_size: usize) -> Result<()> {
        let needed = (n as u64).checked_mul(element_size as u64);
        match needed {
            Some(bytes) if bytes <= self.remaining() => Ok(()),
            _ => Err(ShpError::length_exceeded(
                n,
                element_size,
                self.remaining(),
            )),
        }
    }
}
