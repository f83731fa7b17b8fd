//! tar+gzip writer

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufWriter, Write};

use crate::error::Result;

use super::ArchiveEntry;

/// Write `entries` into `file`, returning the archive size in bytes
pub(super) fn write(file: File, entries: &[ArchiveEntry]) -> Result<u64> {
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);

    for entry in entries {
        match entry {
            ArchiveEntry::Dir { name, path } => builder.append_dir(name, path)?,
            ArchiveEntry::File { name, path, .. } => builder.append_path_with_name(path, name)?,
        }
    }

    let mut out = builder.into_inner()?.finish()?;
    out.flush()?;
    Ok(out.get_ref().metadata()?.len())
}
