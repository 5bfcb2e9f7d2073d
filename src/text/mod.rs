//! Language-agnostic measurements over a single code fragment: physical line
//! counts, comment stripping, separator-driven token bagging, the canonical
//! SourcererCC token serialisation and MD5 digesting.
//!
//! Everything here is pure; the pipelines in [`crate::tokenize`] compose these
//! functions into the per-file and per-block records.
use indexmap::IndexMap;
use md5::{Digest, Md5};

use crate::language::LanguageProfile;

/// A multiset of tokens keyed by token string.
///
/// The map preserves insertion order (first occurrence wins), which is what
/// freezes the canonical serialisation - and therefore the token hash - for a
/// given input. Do not swap this for a hash map.
pub type TokenBag = IndexMap<String, u64>;

/// Hex-encoded MD5 of `text`, the digest used for both file and token hashes.
pub fn md5_hex(text: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Counts physical lines in `text`.
///
/// A final line that lacks a trailing newline still counts; a trailing
/// newline does not open an extra empty line; the empty string has no lines.
pub fn count_lines(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    let newlines = text.bytes().filter(|&byte| byte == b'\n').count();
    if text.ends_with('\n') {
        newlines
    } else {
        newlines + 1
    }
}

/// Removes the profile's comments from `text`.
///
/// Block comments are removed before line comments: an inline marker inside
/// `/* ... */` must not truncate the block match.
pub fn strip_comments(text: &str, profile: &LanguageProfile) -> String {
    let mut result = match profile.block_comment_pattern() {
        Some(pattern) => pattern.replace_all(text, "").into_owned(),
        None => text.to_string(),
    };
    if let Some(pattern) = profile.inline_comment_pattern() {
        result = pattern.replace_all(&result, "").into_owned();
    }
    result
}

/// The line counts of one fragment, together with the text that survives
/// blank-line and comment removal (the input to tokenization).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineStats {
    pub code: String,
    pub lines: usize,
    pub lines_of_code: usize,
    pub source_lines_of_code: usize,
}

/// Computes `lines`, `LOC` and `SLOC` for `text`.
///
/// `lines` counts the raw text, `LOC` what remains after dropping
/// whitespace-only lines, and `SLOC` what remains after also stripping
/// comments and re-dropping the lines that became blank.
pub fn lines_stats(text: &str, profile: &LanguageProfile) -> LineStats {
    let lines = count_lines(text);

    let code = join_non_blank(text);
    let lines_of_code = count_lines(&code);

    let stripped = strip_comments(&code, profile);
    let code = join_non_blank(&stripped).trim().to_string();
    let source_lines_of_code = count_lines(&code);

    LineStats {
        code,
        lines,
        lines_of_code,
        source_lines_of_code,
    }
}

fn join_non_blank(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the token bag of `text` under the profile's separator list.
///
/// Returns `(bag, total, unique)` where `total` sums all occurrences and
/// `unique` is the number of distinct tokens.
pub fn tokenize_string(text: &str, profile: &LanguageProfile) -> (TokenBag, u64, u64) {
    let mut scrubbed = text.to_string();
    // Plain string substitution in declared order, not a regex character
    // class; legacy corpora depend on multi-character separators being
    // applied one after another.
    for separator in profile.separators() {
        scrubbed = scrubbed.replace(separator.as_str(), " ");
    }

    let mut bag = TokenBag::new();
    let mut total: u64 = 0;
    for token in scrubbed.split_ascii_whitespace() {
        *bag.entry(token.to_string()).or_insert(0) += 1;
        total += 1;
    }
    let unique = bag.len() as u64;
    (bag, total, unique)
}

/// Serialises a token bag as `k1@@::@@v1,k2@@::@@v2,...` in bag order.
pub fn format_tokens(bag: &TokenBag) -> String {
    bag.iter()
        .map(|(token, count)| format!("{}@@::@@{}", token, count))
        .collect::<Vec<_>>()
        .join(",")
}
