//! Function-body extraction for block-granularity runs.
//!
//! The two supported languages share a capability set (parse, enumerate
//! declarations, slice body text, qualify the name) but no useful common
//! supertype, so the dispatch is a tagged variant keyed off the profile's
//! extension set. Each variant owns its grammar and parser instance, which
//! keeps workers independent of each other.
pub mod java;
pub mod python;

use log::error;

use crate::language::LanguageProfile;
use java::JavaExtractor;
use python::PythonExtractor;

/// One extracted function body.
///
/// `start_line` and `end_line` are 1-based, inclusive, and refer to the file
/// the block was cut from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub start_line: usize,
    pub end_line: usize,
    pub body: String,
    /// Qualified name for Java; a fixed placeholder for Python.
    pub name: String,
}

/// The per-language extractor a worker owns for the duration of a run.
pub enum FunctionExtractor {
    Java(JavaExtractor),
    Python(PythonExtractor),
    /// The profile covers no block-extractable language; every file is
    /// reported as "no blocks" and skipped with a warning upstream.
    Unsupported,
}

impl FunctionExtractor {
    /// Picks the extractor for the run from the profile's extension set.
    ///
    /// Grammar initialisation failures are logged and degrade to
    /// [`FunctionExtractor::Unsupported`]; the run then skips every file
    /// rather than aborting half-written streams.
    pub fn for_profile(profile: &LanguageProfile) -> Self {
        if profile.covers_extension(".java") {
            match JavaExtractor::new(profile.inline_comment_pattern().cloned()) {
                Ok(extractor) => return Self::Java(extractor),
                Err(err) => {
                    error!("Failed to initialise the Java grammar: {}", err);
                    return Self::Unsupported;
                }
            }
        }
        if profile.covers_extension(".py") {
            match PythonExtractor::new() {
                Ok(extractor) => return Self::Python(extractor),
                Err(err) => {
                    error!("Failed to initialise the Python grammar: {}", err);
                    return Self::Unsupported;
                }
            }
        }
        Self::Unsupported
    }

    /// Extracts the function bodies of `source`, or `None` when the file
    /// cannot be parsed (or no extractor applies).
    pub fn extract(&mut self, source: &str) -> Option<Vec<Block>> {
        match self {
            Self::Java(extractor) => extractor.extract(source),
            Self::Python(extractor) => extractor.extract(source),
            Self::Unsupported => None,
        }
    }
}
