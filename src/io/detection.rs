// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! File-set path resolution and format detection.
//!
//! A file set is addressed by its `.shp` path (or its basename); the index
//! and attribute table are siblings with the same stem. Sibling extensions
//! follow the case of the given extension, so `ROADS.SHP` pairs with
//! `ROADS.SHX` and `ROADS.DBF`.
//!
//! # Example
//!
//! ```rust,no_run
//! use shpcodec::io::detection::{detect_format, FileFormat};
//!
//! let format = detect_format("roads.zip")?;
//! assert_eq!(format, FileFormat::Zip);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::header::FILE_CODE;
use crate::{Result, ShpError};

/// Container format of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Plain `.shp` file with siblings on disk
    Shapefile,
    /// ZIP archive holding a file set
    Zip,
    Unknown,
}

/// Paths of the three member files of a set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSetPaths {
    pub shp: PathBuf,
    pub shx: PathBuf,
    pub dbf: PathBuf,
}

impl FileSetPaths {
    /// Derive sibling paths from a `.shp` path or a basename.
    ///
    /// If `path` does not end in `.shp` (any case) it is treated as the
    /// basename and lowercase extensions are appended.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let ext = path.extension().and_then(|e| e.to_str());
        match ext {
            Some(e) if e.eq_ignore_ascii_case("shp") => {
                let upper = e.chars().all(|c| c.is_ascii_uppercase());
                let pick = |lower: &str| {
                    if upper {
                        lower.to_ascii_uppercase()
                    } else {
                        lower.to_string()
                    }
                };
                Self {
                    shp: path.to_path_buf(),
                    shx: path.with_extension(pick("shx")),
                    dbf: path.with_extension(pick("dbf")),
                }
            }
            _ => {
                let with = |ext: &str| {
                    let mut name = path.as_os_str().to_os_string();
                    name.push(".");
                    name.push(ext);
                    PathBuf::from(name)
                };
                Self {
                    shp: with("shp"),
                    shx: with("shx"),
                    dbf: with("dbf"),
                }
            }
        }
    }

    /// Like [`from_path`](Self::from_path), but for siblings that do not
    /// exist with the expected case, fall back to the other case when that
    /// one exists.
    pub fn resolve_existing<P: AsRef<Path>>(path: P) -> Self {
        let mut paths = Self::from_path(path);
        paths.shx = existing_variant(paths.shx);
        paths.dbf = existing_variant(paths.dbf);
        paths
    }
}

fn existing_variant(path: PathBuf) -> PathBuf {
    if path.exists() {
        return path;
    }
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return path;
    };
    let swapped = if ext.chars().all(|c| c.is_ascii_uppercase()) {
        ext.to_ascii_lowercase()
    } else {
        ext.to_ascii_uppercase()
    };
    let candidate = path.with_extension(swapped);
    if candidate.exists() {
        candidate
    } else {
        path
    }
}

/// Detect the container format of `path` from its magic bytes, falling
/// back to the extension.
pub fn detect_format<P: AsRef<Path>>(path: P) -> Result<FileFormat> {
    let path_ref = path.as_ref();

    match detect_from_magic(path_ref) {
        Ok(FileFormat::Unknown) | Err(_) => {}
        Ok(format) => return Ok(format),
    }

    Ok(detect_from_extension(path_ref))
}

fn detect_from_magic(path: &Path) -> Result<FileFormat> {
    let mut file = File::open(path).map_err(|e| ShpError::io("format detection", &e))?;
    let mut header = [0u8; 4];
    let n = file
        .read(&mut header)
        .map_err(|e| ShpError::io("format detection", &e))?;
    if n < header.len() {
        return Ok(FileFormat::Unknown);
    }
    Ok(format_from_magic(&header))
}

/// Classify the first four bytes of a stream.
pub fn format_from_magic(header: &[u8; 4]) -> FileFormat {
    if i32::from_be_bytes(*header) == FILE_CODE {
        FileFormat::Shapefile
    } else if header == b"PK\x03\x04" || header == b"PK\x05\x06" {
        FileFormat::Zip
    } else {
        FileFormat::Unknown
    }
}

fn detect_from_extension(path: &Path) -> FileFormat {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| match ext.to_lowercase().as_str() {
            "shp" => FileFormat::Shapefile,
            "zip" => FileFormat::Zip,
            _ => FileFormat::Unknown,
        })
        .unwrap_or(FileFormat::Unknown)
}

/// Check if a path is likely a ZIP archive.
pub fn is_zip_file<P: AsRef<Path>>(path: P) -> bool {
    matches!(detect_format(path), Ok(FileFormat::Zip))
}

/// Check if a path is likely a `.shp` file.
pub fn is_shape_file<P: AsRef<Path>>(path: P) -> bool {
    matches!(detect_format(path), Ok(FileFormat::Shapefile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_siblings_lowercase() {
        let paths = FileSetPaths::from_path("data/roads.shp");
        assert_eq!(paths.shx, PathBuf::from("data/roads.shx"));
        assert_eq!(paths.dbf, PathBuf::from("data/roads.dbf"));
    }

    #[test]
    fn test_siblings_follow_case() {
        let paths = FileSetPaths::from_path("ROADS.SHP");
        assert_eq!(paths.shx, PathBuf::from("ROADS.SHX"));
        assert_eq!(paths.dbf, PathBuf::from("ROADS.DBF"));
    }

    #[test]
    fn test_basename_gets_extensions() {
        let paths = FileSetPaths::from_path("out/parcels");
        assert_eq!(paths.shp, PathBuf::from("out/parcels.shp"));
        assert_eq!(paths.dbf, PathBuf::from("out/parcels.dbf"));

        let dotted = FileSetPaths::from_path("out/v1.2");
        assert_eq!(dotted.shp, PathBuf::from("out/v1.2.shp"));
    }

    #[test]
    fn test_resolve_existing_other_case() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mixed.DBF"), b"").unwrap();
        let paths = FileSetPaths::resolve_existing(dir.path().join("mixed.shp"));
        assert_eq!(paths.dbf, dir.path().join("mixed.DBF"));
        assert_eq!(paths.shx, dir.path().join("mixed.shx"));
    }

    #[test]
    fn test_format_from_magic() {
        assert_eq!(format_from_magic(&9994i32.to_be_bytes()), FileFormat::Shapefile);
        assert_eq!(format_from_magic(b"PK\x03\x04"), FileFormat::Zip);
        assert_eq!(format_from_magic(b"abcd"), FileFormat::Unknown);
    }

    #[test]
    fn test_detect_falls_back_to_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.zip");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"xx").unwrap();
        drop(file);
        assert!(is_zip_file(&path));
        assert!(!is_shape_file(&path));
        assert_eq!(
            detect_format(dir.path().join("missing.shp")).unwrap(),
            FileFormat::Shapefile
        );
    }
}
