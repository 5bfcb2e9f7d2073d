//! Walks the code entries of one project archive.
//!
//! The archive and its entries are opened with scoped acquisition; every
//! per-entry failure is logged and skipped so the remaining entries still
//! flow. Only an unreadable archive as a whole abandons the project.
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::{Duration, Instant};

use log::warn;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::language::LanguageProfile;
use crate::output::SidecarWriter;
use crate::pool::worker::WorkerState;
use crate::tokenize::{self, EntryContext, Granularity};

/// Where one project's wall-clock went, reported per project at info level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkTimings {
    /// Opening archive entries.
    pub zip: Duration,
    /// Reading and decoding entry contents.
    pub read: Duration,
    /// Everything downstream: stats, token bags, hashing, record writes.
    pub tokenize: Duration,
}

/// Streams every matching entry of the archive at `archive_path` through the
/// selected pipeline.
///
/// Returns `Err` only when the archive itself cannot be opened or is not a
/// valid ZIP; the caller logs that and moves to the next project.
pub fn process_archive(
    profile: &LanguageProfile,
    granularity: Granularity,
    state: &mut WorkerState,
    writer: &mut SidecarWriter,
    display_proj_id: &str,
    archive_path: &Path,
) -> Result<WalkTimings, ZipError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;
    let mut timings = WalkTimings::default();

    for index in 0..archive.len() {
        let opened_at = Instant::now();
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(
                    "Unable to open entry #{} in <{}>: {}",
                    index,
                    archive_path.display(),
                    err
                );
                continue;
            }
        };
        timings.zip += opened_at.elapsed();
        if !profile.matches_path(entry.name()) {
            continue;
        }

        let entry_path = entry.name().to_string();
        let file_bytes = entry.size();
        // The id is allocated before the entry is read: skipped entries
        // leave gaps, never reuse.
        let file_id = state.next_file_id();

        let read_at = Instant::now();
        let mut raw = Vec::new();
        if let Err(err) = entry.read_to_end(&mut raw) {
            warn!("File {} can't be read: {}", entry_path, err);
            continue;
        }
        let contents = match String::from_utf8(raw) {
            Ok(contents) => contents,
            Err(_) => {
                warn!("File {} is not valid UTF-8", entry_path);
                continue;
            }
        };
        timings.read += read_at.elapsed();

        let full_path = format!("{}/{}", archive_path.display(), entry_path);
        let entry_context = EntryContext {
            display_proj_id,
            file_id,
            full_path: &full_path,
            file_bytes,
        };
        let tokenize_at = Instant::now();
        tokenize::process_entry(
            granularity,
            profile,
            &mut state.extractor,
            writer,
            &entry_context,
            &contents,
        );
        timings.tokenize += tokenize_at.elapsed();
    }

    Ok(timings)
}
