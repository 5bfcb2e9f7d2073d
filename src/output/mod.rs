//! Output layout bootstrap and the per-worker sidecar streams.
//!
//! Each worker owns three append-only streams named by its slot. Free-text
//! fields (paths, hashes, qualified names) are wrapped in double quotes but
//! not escaped; inputs are expected not to contain quotes or newlines, which
//! is what the downstream detector and pretty-printer assume.
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::error;
use thiserror::Error;

use crate::settings::FoldersSection;
use crate::tokenize::data::{EntryContext, FragmentStats, TokenSummary};

/// Failure to establish the output directories.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// A pre-existing folder means records from an earlier run would be
    /// appended to; the run refuses to start instead.
    #[error("output folder [{0}] already exists")]
    AlreadyExists(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The three output directories, one per sidecar stream.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    stats_folder: PathBuf,
    bookkeeping_folder: PathBuf,
    tokens_folder: PathBuf,
}

impl OutputLayout {
    /// Validates and creates the output directories.
    ///
    /// All three are checked before anything is created, so a failed run
    /// leaves either no directories or all of them.
    pub fn bootstrap(folders: &FoldersSection) -> Result<Self, LayoutError> {
        let layout = Self {
            stats_folder: folders.path_stats_file_folder.clone(),
            bookkeeping_folder: folders.path_bookkeeping_proj_folder.clone(),
            tokens_folder: folders.path_tokens_file_folder.clone(),
        };
        for folder in layout.folders() {
            if folder.exists() {
                return Err(LayoutError::AlreadyExists(
                    folder.display().to_string(),
                ));
            }
        }
        for folder in layout.folders() {
            fs::create_dir_all(folder)?;
        }
        Ok(layout)
    }

    fn folders(&self) -> [&Path; 3] {
        [
            &self.stats_folder,
            &self.bookkeeping_folder,
            &self.tokens_folder,
        ]
    }

    pub(crate) fn tokens_file(&self, slot: usize) -> PathBuf {
        self.tokens_folder
            .join(format!("files-tokens-{}.tokens", slot))
    }

    pub(crate) fn bookkeeping_file(&self, slot: usize) -> PathBuf {
        self.bookkeeping_folder
            .join(format!("bookkeeping-proj-{}.projs", slot))
    }

    pub(crate) fn stats_file(&self, slot: usize) -> PathBuf {
        self.stats_folder.join(format!("files-stats-{}.stats", slot))
    }
}

/// One worker's tokens, bookkeeping and stats streams.
pub struct SidecarWriter {
    tokens: BufWriter<File>,
    bookkeeping: BufWriter<File>,
    stats: BufWriter<File>,
}

impl SidecarWriter {
    /// Opens the three streams for `slot` in append mode.
    pub fn open(layout: &OutputLayout, slot: usize) -> io::Result<Self> {
        Ok(Self {
            tokens: open_append(&layout.tokens_file(slot))?,
            bookkeeping: open_append(&layout.bookkeeping_file(slot))?,
            stats: open_append(&layout.stats_file(slot))?,
        })
    }

    /// Bookkeeping record: `{display_proj_id},"{archive_path}"`.
    pub fn project(&mut self, display_proj_id: &str, archive_path: &str) {
        let line = format!("{},\"{}\"", display_proj_id, archive_path);
        put(&mut self.bookkeeping, "bookkeeping", line);
    }

    /// File-mode stats record.
    pub fn file_stats(&mut self, entry: &EntryContext<'_>, stats: &FragmentStats) {
        let line = format!(
            "{},{},\"{}\",\"{}\",{},{},{},{}",
            entry.display_proj_id,
            entry.file_id,
            entry.full_path,
            stats.hash,
            entry.file_bytes,
            stats.lines,
            stats.lines_of_code,
            stats.source_lines_of_code
        );
        put(&mut self.stats, "stats", line);
    }

    /// File-mode tokens record.
    pub fn file_tokens(&mut self, entry: &EntryContext<'_>, tokens: &TokenSummary) {
        let line = format!(
            "{},{},{},{},{}@#@{}",
            entry.display_proj_id,
            entry.file_id,
            tokens.total,
            tokens.unique,
            tokens.hash,
            tokens.formatted
        );
        put(&mut self.tokens, "tokens", line);
    }

    /// Block-mode `f`-record for the containing file. The empty quoted field
    /// is a vestigial URL column retained for record-shape compatibility.
    pub fn block_file_stats(&mut self, entry: &EntryContext<'_>, stats: &FragmentStats) {
        let line = format!(
            "f,{},{},\"{}\",\"\",\"{}\",{},{},{},{}",
            entry.display_proj_id,
            entry.file_id,
            entry.full_path,
            stats.hash,
            entry.file_bytes,
            stats.lines,
            stats.lines_of_code,
            stats.source_lines_of_code
        );
        put(&mut self.stats, "stats", line);
    }

    /// Block-mode `b`-record.
    pub fn block_stats(
        &mut self,
        entry: &EntryContext<'_>,
        block_id: &str,
        stats: &FragmentStats,
        start_line: usize,
        end_line: usize,
    ) {
        let line = format!(
            "b,{},{},\"{}\",{},{},{},{},{}",
            entry.display_proj_id,
            block_id,
            stats.hash,
            stats.lines,
            stats.lines_of_code,
            stats.source_lines_of_code,
            start_line,
            end_line
        );
        put(&mut self.stats, "stats", line);
    }

    /// Block-mode tokens record; commas in the qualified name would break the
    /// column layout, so they become semicolons.
    pub fn block_tokens(
        &mut self,
        entry: &EntryContext<'_>,
        block_id: &str,
        qualified_name: &str,
        tokens: &TokenSummary,
    ) {
        let line = format!(
            "{},{},{},{},{},{}@#@{}",
            entry.display_proj_id,
            block_id,
            tokens.total,
            tokens.unique,
            qualified_name.replace(',', ";"),
            tokens.hash,
            tokens.formatted
        );
        put(&mut self.tokens, "tokens", line);
    }

    /// Flushes all three streams, logging rather than failing: the records
    /// already on disk stay valid either way.
    pub fn flush(&mut self) {
        for (stream, name) in [
            (&mut self.tokens, "tokens"),
            (&mut self.bookkeeping, "bookkeeping"),
            (&mut self.stats, "stats"),
        ] {
            if let Err(err) = stream.flush() {
                error!("Failed to flush the {} stream: {}", name, err);
            }
        }
    }
}

fn open_append(path: &Path) -> io::Result<BufWriter<File>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(BufWriter::new(file))
}

/// A failed append is logged and the run moves on to the next record; there
/// is no retry and no rollback.
fn put(stream: &mut BufWriter<File>, stream_name: &str, line: String) {
    if let Err(err) = writeln!(stream, "{}", line) {
        error!("Failed to append to the {} stream: {}", stream_name, err);
    }
}
