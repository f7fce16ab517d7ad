// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! File sets stored inside archives.
//!
//! - [`ArchiveSource`] - Member listing and opening, implemented for ZIP in [`zip`]
//! - [`discover`] - Locate the single geometry/index/attribute triple
//! - [`open_file_set`] - Sequential reader over the located members
//!
//! Archive members are consumed as forward-only streams, so reading always
//! goes through [`SequentialReader`].

pub mod zip;

pub use self::zip::{ZipArchiveSource, ZipReader, ZipWriter};

use std::collections::BTreeMap;
use std::io::Read;

use super::sequential::SequentialReader;
use crate::{Result, ShpError};

/// Member stream handed out by an archive.
pub type MemberStream = Box<dyn Read + Send>;

/// Sequential reader over archive members.
pub type ArchiveReader = SequentialReader<MemberStream, MemberStream>;

/// A container that can list and open named members.
pub trait ArchiveSource {
    /// Names of every member, in archive order.
    fn member_names(&self) -> Vec<String>;

    /// Open a member for reading.
    ///
    /// A name not present in the archive is [`ShpError::MemberNotFound`].
    fn open_member(&mut self, name: &str) -> Result<MemberStream>;
}

/// Member names making up one file set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSetMembers {
    /// Member name without its extension
    pub basename: String,
    pub shp: String,
    pub shx: Option<String>,
    pub dbf: Option<String>,
}

/// Member kinds recognised by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberKind {
    Geometry,
    Index,
    Attributes,
    /// Projection or code page, recognised and not used
    Sidecar,
}

fn classify(name: &str) -> Option<(&str, MemberKind)> {
    if name.ends_with('/') || name.starts_with("__MACOSX/") {
        return None;
    }
    let (basename, ext) = name.rsplit_once('.')?;
    let kind = match ext.to_ascii_lowercase().as_str() {
        "shp" => MemberKind::Geometry,
        "shx" => MemberKind::Index,
        "dbf" => MemberKind::Attributes,
        "prj" | "cpg" => MemberKind::Sidecar,
        _ => return None,
    };
    Some((basename, kind))
}

/// Group members by basename and pick the one group holding a `.shp`.
///
/// No such group is [`ShpError::NoShapefileInArchive`]; more than one is
/// [`ShpError::MultipleShapefilesInArchive`].
pub fn discover<I, S>(names: I) -> Result<FileSetMembers>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut groups: BTreeMap<String, FileSetMembers> = BTreeMap::new();
    let mut others: Vec<(String, String, MemberKind)> = Vec::new();

    for name in names {
        let name = name.as_ref();
        let Some((basename, kind)) = classify(name) else {
            continue;
        };
        if kind == MemberKind::Geometry {
            groups.insert(
                basename.to_string(),
                FileSetMembers {
                    basename: basename.to_string(),
                    shp: name.to_string(),
                    shx: None,
                    dbf: None,
                },
            );
        } else {
            others.push((basename.to_string(), name.to_string(), kind));
        }
    }

    for (basename, name, kind) in others {
        let Some(group) = groups.get_mut(&basename) else {
            continue;
        };
        match kind {
            MemberKind::Index => group.shx = Some(name),
            MemberKind::Attributes => group.dbf = Some(name),
            MemberKind::Geometry | MemberKind::Sidecar => {}
        }
    }

    let mut groups = groups.into_values();
    match (groups.next(), groups.next()) {
        (None, _) => Err(ShpError::NoShapefileInArchive),
        (Some(only), None) => Ok(only),
        (Some(first), Some(second)) => {
            let candidates = [first, second]
                .into_iter()
                .chain(groups)
                .map(|g| g.shp)
                .collect();
            Err(ShpError::MultipleShapefilesInArchive { candidates })
        }
    }
}

/// Members for an explicitly named `.shp` member, bypassing discovery.
pub fn members_for<S: AsRef<str>>(names: &[S], shp: &str) -> Result<FileSetMembers> {
    if !names.iter().any(|n| n.as_ref() == shp) {
        return Err(ShpError::MemberNotFound {
            name: shp.to_string(),
        });
    }
    let basename = shp.rsplit_once('.').map(|(b, _)| b).unwrap_or(shp);
    let mut members = FileSetMembers {
        basename: basename.to_string(),
        shp: shp.to_string(),
        shx: None,
        dbf: None,
    };
    for name in names {
        match classify(name.as_ref()) {
            Some((b, MemberKind::Index)) if b == basename => {
                members.shx = Some(name.as_ref().to_string())
            }
            Some((b, MemberKind::Attributes)) if b == basename => {
                members.dbf = Some(name.as_ref().to_string())
            }
            _ => {}
        }
    }
    Ok(members)
}

/// Open the geometry and attribute members as a sequential reader.
///
/// The index member is not needed.
pub fn open_file_set<A: ArchiveSource + ?Sized>(
    source: &mut A,
    members: &FileSetMembers,
) -> Result<ArchiveReader> {
    let shp = source.open_member(&members.shp)?;
    let dbf = match &members.dbf {
        Some(name) => Some(source.open_member(name)?),
        None => None,
    };
    SequentialReader::new(shp, dbf)
}
