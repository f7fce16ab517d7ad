// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Binary encoding/decoding for the three member files.
//!
//! - [`cursor`] - Sticky-error counting reader and bounded field cursor
//! - [`geometry`] - Geometry record bodies of the `.shp` stream
//! - [`dbf`] - Attribute table header, descriptors and fixed-width cells

pub mod cursor;
pub mod dbf;
pub mod geometry;

pub use cursor::{ShapeCursor, StickyReader};
pub use dbf::{format_value, DbfHeader};
pub use geometry::{read_shape, write_shape};
