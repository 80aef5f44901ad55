use crate::error::{ProcessingError, Result};
use flate2::read::MultiGzDecoder;
use std::fs;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Copy `reader` into a temporary file beside `dest`, then rename it into place.
/// Nothing appears at `dest` until the body is fully written.
fn stage_into<R: Read>(mut reader: R, dest: &Path) -> Result<u64> {
    let parent = dest.parent().ok_or_else(|| {
        ProcessingError::InvalidFormat(format!("{} has no parent directory", dest.display()))
    })?;
    fs::create_dir_all(parent)?;

    let mut staged = NamedTempFile::new_in(parent)?;
    let written = {
        let mut writer = BufWriter::new(staged.as_file_mut());
        let written = std::io::copy(&mut reader, &mut writer)?;
        writer.flush()?;
        written
    };

    staged
        .persist(dest)
        .map_err(|e| ProcessingError::Io(e.error))?;
    Ok(written)
}

/// Decompress a gzip body into `dest`. Returns the decompressed size.
pub fn write_gunzipped(body: &[u8], dest: &Path) -> Result<u64> {
    stage_into(MultiGzDecoder::new(body), dest)
}

/// Write an uncompressed body into `dest`.
pub fn write_plain(body: &[u8], dest: &Path) -> Result<u64> {
    stage_into(body, dest)
}

/// Present and non-empty.
pub fn is_present(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
}
