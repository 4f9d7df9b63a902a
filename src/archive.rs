//! Archive extraction
//!
//! Each backup is a gzip-compressed tar archive expected to carry a single
//! digest member. The tar stream is walked entry by entry so peak memory
//! stays bounded to one digest file, never the whole archive.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use tar::Archive;

use crate::error::{Error, Result};

fn archive_error(path: &Path, message: impl ToString) -> Error {
    Error::Archive {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}

/// Extract the named member from a gzip tar archive.
///
/// Returns the member's content, or an empty string when the archive does
/// not contain it. Decompression and tar errors are fatal: a skipped
/// archive would silently corrupt the deduplication fold downstream.
pub fn extract_member(path: &Path, member_name: &str) -> Result<String> {
    let file = File::open(path).map_err(|e| archive_error(path, e))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let entries = archive.entries().map_err(|e| archive_error(path, e))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| archive_error(path, e))?;
        let entry_path = entry.path().map_err(|e| archive_error(path, e))?;
        if entry_path.to_str() == Some(member_name) {
            let mut content = String::new();
            entry
                .read_to_string(&mut content)
                .map_err(|e| archive_error(path, e))?;
            return Ok(content);
        }
    }

    Ok(String::new())
}
