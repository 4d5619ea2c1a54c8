//! # Conveyor Archiver
//!
//! Packages a directory of results into a single compressed artifact. The
//! archive is rebuilt every run with full-replace semantics: any
//! pre-existing file at the destination is deleted before writing, so a
//! cancelled run never leaves a partially appended archive behind.
pub mod error;

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub use error::ArchiveError;

/// A produced archive and the directory it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveArtifact {
    pub path: PathBuf,
    pub source_dir: PathBuf,
}

/// Archive every regular file under `source` into a zip at `dest`,
/// preserving relative paths. Members are written in sorted order so two
/// archives of an unchanged directory have identical member sets.
pub fn archive_dir(source: &Path, dest: &Path) -> Result<ArchiveArtifact, ArchiveError> {
    if !source.is_dir() {
        return Err(ArchiveError::SourceMissing { path: source.to_path_buf() });
    }

    let mut files = Vec::new();
    collect_files(source, &mut files).map_err(|source_err| ArchiveError::Io {
        operation: "scan".to_string(),
        path: source.to_path_buf(),
        source: source_err,
    })?;
    if files.is_empty() {
        return Err(ArchiveError::SourceEmpty { path: source.to_path_buf() });
    }
    files.sort();

    // Full-replace semantics: never append to a previous run's archive.
    if dest.exists() {
        fs::remove_file(dest).map_err(|source_err| ArchiveError::Io {
            operation: "remove_stale_archive".to_string(),
            path: dest.to_path_buf(),
            source: source_err,
        })?;
    }

    let out = File::create(dest).map_err(|source_err| ArchiveError::Io {
        operation: "create".to_string(),
        path: dest.to_path_buf(),
        source: source_err,
    })?;
    let mut zip = ZipWriter::new(out);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for file in &files {
        let Ok(relative) = file.strip_prefix(source) else {
            continue; // collected under source, cannot happen
        };
        // Member names must be valid UTF-8; a lossy conversion would
        // silently rename the entry inside the archive.
        let Some(member_name) = relative.to_str() else {
            return Err(ArchiveError::Io {
                operation: "member_name".to_string(),
                path: file.clone(),
                source: io::Error::new(io::ErrorKind::InvalidData, "non-UTF-8 file name"),
            });
        };
        zip.start_file(member_name, options)
            .map_err(|e| ArchiveError::Zip { path: dest.to_path_buf(), source: e })?;
        let mut input = File::open(file).map_err(|source_err| ArchiveError::Io {
            operation: "read_member".to_string(),
            path: file.clone(),
            source: source_err,
        })?;
        io::copy(&mut input, &mut zip).map_err(|source_err| ArchiveError::Io {
            operation: "write_member".to_string(),
            path: file.clone(),
            source: source_err,
        })?;
    }

    zip.finish().map_err(|e| ArchiveError::Zip { path: dest.to_path_buf(), source: e })?;
    log::info!("Archived {} files from {} into {}", files.len(), source.display(), dest.display());

    Ok(ArchiveArtifact { path: dest.to_path_buf(), source_dir: source.to_path_buf() })
}

/// Recursively gather regular files under `path`.
fn collect_files(path: &Path, result: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(path)? {
        let entry_path = entry?.path();
        if entry_path.is_file() {
            result.push(entry_path);
        } else if entry_path.is_dir() {
            collect_files(&entry_path, result)?;
        }
    }
    Ok(())
}
