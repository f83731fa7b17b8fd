//! ZIP writer

use std::fs::File;
use std::io::{self, BufWriter, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::Result;

use super::ArchiveEntry;

/// Members at or above this size need ZIP64 headers
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Write `entries` into `file`, returning the archive size in bytes
pub(super) fn write(file: File, entries: &[ArchiveEntry]) -> Result<u64> {
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in entries {
        match entry {
            ArchiveEntry::Dir { name, .. } => {
                zip.add_directory(name.as_str(), options)?;
            }
            ArchiveEntry::File { name, path, len } => {
                zip.start_file(name.as_str(), options.large_file(*len >= ZIP64_THRESHOLD))?;
                let mut source = File::open(path)?;
                io::copy(&mut source, &mut zip)?;
            }
        }
    }

    let mut out = zip.finish()?;
    out.flush()?;
    Ok(out.get_ref().metadata()?.len())
}
