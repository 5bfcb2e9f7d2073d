//! The language profile: separators, comment markers and file extensions for
//! the language a run targets, with the two comment patterns precompiled.
//!
//! A profile is immutable once built; workers share one instance for the
//! whole run.
use std::ffi::OsStr;
use std::path::Path;

use regex::Regex;

use crate::settings::LanguageSection;

/// Separator list, comment markers and extension set for one language.
#[derive(Debug, Clone)]
pub struct LanguageProfile {
    separators: Vec<String>,
    extensions: Vec<String>,
    inline_comment: Option<Regex>,
    block_comment: Option<Regex>,
}

impl LanguageProfile {
    /// Builds a profile from already-split parts.
    ///
    /// Comment markers are regex-escaped before the patterns are assembled;
    /// the separators never enter a regex at all. An empty marker disables
    /// the corresponding pattern rather than producing a match-everything
    /// expression.
    pub fn new(
        separators: Vec<String>,
        comment_inline: &str,
        comment_open_tag: &str,
        comment_close_tag: &str,
        extensions: Vec<String>,
    ) -> Result<Self, regex::Error> {
        let inline_comment = if comment_inline.is_empty() {
            None
        } else {
            // Multi-line mode: the comment runs to the end of its line.
            Some(Regex::new(&format!(
                "(?m){}.*?$",
                regex::escape(comment_inline)
            ))?)
        };
        let block_comment = if comment_open_tag.is_empty() || comment_close_tag.is_empty() {
            None
        } else {
            // Dot-matches-newline: a block comment may span lines.
            Some(Regex::new(&format!(
                "(?s){}.*?{}",
                regex::escape(comment_open_tag),
                regex::escape(comment_close_tag)
            ))?)
        };
        Ok(Self {
            separators,
            extensions,
            inline_comment,
            block_comment,
        })
    }

    /// Builds the profile from the `[Language]` section of the settings.
    pub fn from_settings(language: &LanguageSection) -> Result<Self, regex::Error> {
        Self::new(
            split_separators(&language.separators),
            &language.comment_inline,
            &language.comment_open_tag,
            &language.comment_close_tag,
            split_extensions(&language.file_extensions),
        )
    }

    /// The separator strings in their declared (application) order.
    pub fn separators(&self) -> &[String] {
        &self.separators
    }

    pub fn inline_comment_pattern(&self) -> Option<&Regex> {
        self.inline_comment.as_ref()
    }

    pub fn block_comment_pattern(&self) -> Option<&Regex> {
        self.block_comment.as_ref()
    }

    /// Whether the profile recognises the dotted extension, e.g. `".java"`.
    pub fn covers_extension(&self, dotted: &str) -> bool {
        self.extensions.iter().any(|known| known == dotted)
    }

    /// Whether an archive entry path carries one of the profile extensions.
    pub fn matches_path(&self, entry_path: &str) -> bool {
        match Path::new(entry_path).extension().and_then(OsStr::to_str) {
            Some(extension) => self.covers_extension(&format!(".{}", extension)),
            None => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests(
        separators: &str,
        comment_inline: &str,
        comment_open_tag: &str,
        comment_close_tag: &str,
        extensions: &str,
    ) -> Self {
        Self::new(
            split_separators(separators),
            comment_inline,
            comment_open_tag,
            comment_close_tag,
            split_extensions(extensions),
        )
        .expect("test profile")
    }
}

/// Splits the quoted, space-separated separator list from the configuration.
/// Outer quotes guard the leading `;` against INI comment handling; inner
/// entries may themselves be quote or backslash characters.
fn split_separators(raw: &str) -> Vec<String> {
    raw.trim_matches('"')
        .split(' ')
        .filter(|separator| !separator.is_empty())
        .map(str::to_string)
        .collect()
}

fn split_extensions(raw: &str) -> Vec<String> {
    raw.split(' ')
        .filter(|extension| !extension.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separator_list_is_unquoted_and_split() {
        let profile = LanguageProfile::for_tests("\"; . { }\"", "//", "/*", "*/", ".java");
        assert_eq!(profile.separators(), &[";", ".", "{", "}"]);
    }

    #[test]
    fn test_extension_matching() {
        let profile = LanguageProfile::for_tests("; .", "//", "/*", "*/", ".java .jav");
        assert!(profile.matches_path("src/main/Widget.java"));
        assert!(profile.matches_path("legacy/Old.jav"));
        assert!(!profile.matches_path("readme.md"));
        assert!(!profile.matches_path("no_extension"));
        assert!(!profile.matches_path("src/main/"));
        assert!(profile.covers_extension(".java"));
        assert!(!profile.covers_extension(".py"));
    }

    #[test]
    fn test_empty_markers_disable_patterns() {
        let profile = LanguageProfile::for_tests("; .", "#", "", "", ".py");
        assert!(profile.block_comment_pattern().is_none());
        let inline = profile.inline_comment_pattern().expect("inline pattern");
        assert_eq!(inline.replace_all("a = 1 # tail\nb = 2", ""), "a = 1 \nb = 2");
    }

    #[test]
    fn test_comment_markers_are_escaped() {
        // "/*" and "*/" contain regex metacharacters; the patterns must
        // treat them literally.
        let profile = LanguageProfile::for_tests("; .", "//", "/*", "*/", ".c");
        let block = profile.block_comment_pattern().expect("block pattern");
        assert_eq!(block.replace_all("a /* x \n y */ b", ""), "a  b");
        assert!(block.find("a * b / c").is_none());
    }
}
