//! This module contains the structs that describe one tokenized fragment and
//! the identity of the archive entry it came from.

/// Size and hash statistics of one fragment (a whole file or a block).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentStats {
    /// MD5 over the raw fragment text.
    pub hash: String,
    pub lines: usize,
    pub lines_of_code: usize,
    pub source_lines_of_code: usize,
}

/// The token side of one fragment: counts, hash and the canonical
/// serialisation that the hash covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSummary {
    pub total: u64,
    pub unique: u64,
    /// MD5 over `formatted`, exactly as emitted after the `@#@` marker.
    pub hash: String,
    pub formatted: String,
}

/// Stats and tokens of one fragment together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentRecord {
    pub stats: FragmentStats,
    pub tokens: TokenSummary,
}

/// Identity of the archive entry currently flowing through a pipeline.
///
/// `full_path` is the archive path joined with the entry path by `/`;
/// `file_bytes` is the declared uncompressed size of the entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryContext<'a> {
    pub display_proj_id: &'a str,
    pub file_id: u64,
    pub full_path: &'a str,
    pub file_bytes: u64,
}
