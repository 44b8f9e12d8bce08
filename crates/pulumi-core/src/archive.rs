//! Archive extraction for plugin tarballs
//!
//! Plugins ship as gzip-compressed tar archives. Extraction streams the
//! source reader straight into the destination directory, so memory stays
//! bounded regardless of archive size. There is no temp-dir-and-rename step;
//! crash safety is handled by the installer's partial-install markers.

use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use tar::Archive;

use crate::error::Result;

/// Extract a gzip-compressed tarball into `dest`, preserving relative paths.
pub fn extract_tar_gz<R: Read>(reader: R, dest: &Path) -> Result<()> {
    let decoder = GzDecoder::new(reader);
    let mut archive = Archive::new(decoder);
    archive.set_preserve_permissions(true);
    archive.unpack(dest)?;
    Ok(())
}
