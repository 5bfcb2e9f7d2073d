//! The two tokenization pipelines.
//!
//! File granularity turns one archive entry into a stats record and a tokens
//! record. Block granularity extracts function bodies first, emits an
//! `f`-record for the file and then a `b`-record plus a tokens record per
//! block, reusing the file pipeline over each body.
pub mod data;

use log::warn;

use crate::extract::FunctionExtractor;
use crate::language::LanguageProfile;
use crate::output::SidecarWriter;
use crate::text;

pub use data::{EntryContext, FragmentRecord, FragmentStats, TokenSummary};

/// A file with more blocks than this is skipped: the relative block index is
/// encoded in the five decimal digits 10000..=99999 of the block id.
pub const MAX_BLOCKS_PER_FILE: usize = 90_000;

/// First relative block index; `block_id = (BLOCK_ID_BASE + k) ∥ file_id`.
pub const BLOCK_ID_BASE: usize = 10_000;

/// The record granularity a run emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Granularity {
    /// One record pair per code file.
    File,
    /// One `f`-record per file plus record pairs per extracted block.
    Block,
}

/// Runs the whole-fragment pipeline: hash, line stats, token bag, canonical
/// serialisation, token hash.
pub fn tokenize_fragment(contents: &str, profile: &LanguageProfile) -> FragmentRecord {
    let hash = text::md5_hex(contents);
    let stats = text::lines_stats(contents, profile);
    let (bag, total, unique) = text::tokenize_string(&stats.code, profile);
    let formatted = text::format_tokens(&bag);
    let token_hash = text::md5_hex(&formatted);
    FragmentRecord {
        stats: FragmentStats {
            hash,
            lines: stats.lines,
            lines_of_code: stats.lines_of_code,
            source_lines_of_code: stats.source_lines_of_code,
        },
        tokens: TokenSummary {
            total,
            unique,
            hash: token_hash,
            formatted,
        },
    }
}

/// Tokenizes one decoded archive entry at the requested granularity and
/// appends its records to the worker's streams.
pub fn process_entry(
    granularity: Granularity,
    profile: &LanguageProfile,
    extractor: &mut FunctionExtractor,
    writer: &mut SidecarWriter,
    entry: &EntryContext<'_>,
    contents: &str,
) {
    match granularity {
        Granularity::File => process_file_entry(profile, writer, entry, contents),
        Granularity::Block => process_block_entry(profile, extractor, writer, entry, contents),
    }
}

fn process_file_entry(
    profile: &LanguageProfile,
    writer: &mut SidecarWriter,
    entry: &EntryContext<'_>,
    contents: &str,
) {
    let record = tokenize_fragment(contents, profile);
    writer.file_stats(entry, &record.stats);
    writer.file_tokens(entry, &record.tokens);
}

fn process_block_entry(
    profile: &LanguageProfile,
    extractor: &mut FunctionExtractor,
    writer: &mut SidecarWriter,
    entry: &EntryContext<'_>,
    contents: &str,
) {
    let blocks = match extractor.extract(contents) {
        Some(blocks) => blocks,
        None => {
            warn!("Problems tokenizing file {}", entry.full_path);
            return;
        }
    };
    if blocks.len() > MAX_BLOCKS_PER_FILE {
        warn!(
            "File {} has {} blocks, more than {}. Range MUST be increased.",
            entry.full_path,
            blocks.len(),
            MAX_BLOCKS_PER_FILE
        );
        return;
    }

    // The f-record always precedes the b-records of its blocks in the
    // stream; consumers rely on that order.
    let file_hash = text::md5_hex(contents);
    let file_stats = text::lines_stats(contents, profile);
    writer.block_file_stats(
        entry,
        &FragmentStats {
            hash: file_hash,
            lines: file_stats.lines,
            lines_of_code: file_stats.lines_of_code,
            source_lines_of_code: file_stats.source_lines_of_code,
        },
    );

    for (ordinal, block) in blocks.iter().enumerate() {
        let block_id = format!("{}{}", BLOCK_ID_BASE + ordinal, entry.file_id);
        let record = tokenize_fragment(&block.body, profile);
        writer.block_stats(
            entry,
            &block_id,
            &record.stats,
            block.start_line,
            block.end_line,
        );
        writer.block_tokens(entry, &block_id, &block.name, &record.tokens);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::md5_hex;

    fn java_profile() -> LanguageProfile {
        LanguageProfile::for_tests(
            "; . [ ] ( ) ~ ! - + & * / % < > ^ | ? { } = # , \" \\ : $ ' ` @",
            "//",
            "/*",
            "*/",
            ".java",
        )
    }

    #[test]
    fn test_tokenize_fragment_counts_match_bag() {
        let profile = java_profile();
        let record = tokenize_fragment("int a = 1;\nint b = a + a;\n", &profile);
        assert_eq!(record.tokens.total, 7);
        assert_eq!(record.tokens.unique, 4);
        assert_eq!(record.tokens.hash, md5_hex(&record.tokens.formatted));
        assert_eq!(record.stats.lines, 2);
    }

    #[test]
    fn test_tokenize_fragment_empty_input() {
        let profile = java_profile();
        let record = tokenize_fragment("", &profile);
        assert_eq!(record.stats.lines, 0);
        assert_eq!(record.stats.lines_of_code, 0);
        assert_eq!(record.stats.source_lines_of_code, 0);
        assert_eq!(record.tokens.total, 0);
        assert_eq!(record.tokens.unique, 0);
        assert_eq!(record.tokens.formatted, "");
        // MD5 of the empty serialisation, not of nothing-at-all.
        assert_eq!(record.tokens.hash, md5_hex(""));
    }

    #[test]
    fn test_block_id_concatenation() {
        assert_eq!(format!("{}{}", BLOCK_ID_BASE + 0, 7u64), "100007");
        assert_eq!(
            format!("{}{}", BLOCK_ID_BASE + 3, 50_000_001u64),
            "1000350000001"
        );
    }

    mod block_pipeline {
        use super::*;
        use crate::output::{OutputLayout, SidecarWriter};
        use crate::settings::FoldersSection;
        use std::fs;
        use std::path::Path;

        fn layout_in(root: &Path) -> OutputLayout {
            OutputLayout::bootstrap(&FoldersSection {
                path_stats_file_folder: root.join("files_stats"),
                path_bookkeeping_proj_folder: root.join("bookkeeping_projs"),
                path_tokens_file_folder: root.join("files_tokens"),
            })
            .expect("bootstrap")
        }

        fn run_block_entry(contents: &str) -> (String, String) {
            let dir = tempfile::tempdir().expect("tempdir");
            let layout = layout_in(dir.path());
            let profile = java_profile();
            let mut extractor = FunctionExtractor::for_profile(&profile);
            let mut writer = SidecarWriter::open(&layout, 0).expect("writer");
            let entry = EntryContext {
                display_proj_id: "11",
                file_id: 42,
                full_path: "archives/demo.zip/src/Demo.java",
                file_bytes: contents.len() as u64,
            };
            process_entry(
                Granularity::Block,
                &profile,
                &mut extractor,
                &mut writer,
                &entry,
                contents,
            );
            writer.flush();
            (
                fs::read_to_string(layout.stats_file(0)).expect("stats stream"),
                fs::read_to_string(layout.tokens_file(0)).expect("tokens stream"),
            )
        }

        #[test]
        fn test_f_record_precedes_b_records() {
            let source = "package p;\n\
                          class Demo {\n\
                          \u{20}   void one() { }\n\
                          \u{20}   void two() { }\n\
                          }\n";
            let (stats, tokens) = run_block_entry(source);
            let stats_lines: Vec<&str> = stats.lines().collect();
            assert_eq!(stats_lines.len(), 3);
            assert!(stats_lines[0].starts_with("f,11,42,"));
            assert!(stats_lines[1].starts_with("b,11,1000042,"));
            assert!(stats_lines[2].starts_with("b,11,1000142,"));

            let tokens_lines: Vec<&str> = tokens.lines().collect();
            assert_eq!(tokens_lines.len(), 2);
            assert!(tokens_lines[0].starts_with("11,1000042,"));
            assert!(tokens_lines[0].contains("p.Demo.one()"));
            assert!(tokens_lines[1].contains("p.Demo.two()"));
        }

        #[test]
        fn test_block_line_ranges_stay_within_the_file() {
            let source = "package p;\n\
                          class Demo {\n\
                          \u{20}   int f(int x) {\n\
                          \u{20}       return x;\n\
                          \u{20}   }\n\
                          }\n";
            let (stats, _) = run_block_entry(source);
            let b_record = stats
                .lines()
                .find(|line| line.starts_with("b,"))
                .expect("one block");
            let columns: Vec<&str> = b_record.split(',').collect();
            let start_line: usize = columns[columns.len() - 2].parse().expect("start");
            let end_line: usize = columns[columns.len() - 1].parse().expect("end");
            assert!(start_line <= end_line);
            assert_eq!((start_line, end_line), (3, 5));
        }

        #[test]
        fn test_unparsable_file_emits_no_records() {
            let (stats, tokens) = run_block_entry("class Broken {{{ void\n");
            assert_eq!(stats, "");
            assert_eq!(tokens, "");
        }

        #[test]
        fn test_block_cap_skips_the_whole_file() {
            let mut source = String::with_capacity(3 * 1024 * 1024);
            source.push_str("package p;\nclass Big {\n");
            for index in 0..(MAX_BLOCKS_PER_FILE + 1) {
                source.push_str(&format!("void m{}() {{ }}\n", index));
            }
            source.push_str("}\n");
            let (stats, tokens) = run_block_entry(&source);
            assert_eq!(stats, "");
            assert_eq!(tokens, "");
        }
    }
}
