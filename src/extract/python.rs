//! Python function extraction.
//!
//! Every `def` - top-level functions, methods and nested functions - becomes
//! one block. The qualified-name column is not populated for Python; a fixed
//! placeholder keeps the tokens-record shape uniform for downstream readers.
use tree_sitter::{Language, LanguageError, Node, Parser};

use super::Block;

/// Written in place of a qualified name for every Python block.
pub const PYTHON_BLOCK_NAME: &str = "PythonDefaultName";

pub struct PythonExtractor {
    parser: Parser,
}

impl PythonExtractor {
    pub fn new() -> Result<Self, LanguageError> {
        let mut parser = Parser::new();
        let language: Language = tree_sitter_python::LANGUAGE.into();
        parser.set_language(&language)?;
        Ok(Self { parser })
    }

    /// Extracts every function definition of `source` in document order, or
    /// `None` when the file does not parse cleanly.
    pub fn extract(&mut self, source: &str) -> Option<Vec<Block>> {
        let tree = self.parser.parse(source.as_bytes(), None)?;
        let root = tree.root_node();
        if root.has_error() {
            return None;
        }

        let lines: Vec<&str> = source.split('\n').collect();
        let mut blocks = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.kind() == "function_definition" {
                let (start_line, end_line) = line_range(node);
                let body = lines[start_line - 1..end_line.min(lines.len())].join("\n");
                blocks.push(Block {
                    start_line,
                    end_line,
                    body,
                    name: PYTHON_BLOCK_NAME.to_string(),
                });
            }
            for index in (0..node.child_count()).rev() {
                if let Some(child) = node.child(index) {
                    stack.push(child);
                }
            }
        }
        Some(blocks)
    }
}

/// 1-based inclusive line range of a definition. Decorators sit outside the
/// `function_definition` node, so the range starts at the `def` line.
fn line_range(node: Node<'_>) -> (usize, usize) {
    let start_line = node.start_position().row + 1;
    let end = node.end_position();
    // A node ending at column 0 stopped at the previous line's newline.
    let end_line = if end.column == 0 { end.row } else { end.row + 1 };
    (start_line, end_line.max(start_line))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> PythonExtractor {
        PythonExtractor::new().expect("grammar loads")
    }

    #[test]
    fn test_top_level_function() {
        let source = "import sys\n\
                      \n\
                      def greet(name):\n\
                      \u{20}   print(name)\n\
                      \u{20}   return name\n";
        let blocks = extractor().extract(source).expect("parses");
        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.start_line, 3);
        assert_eq!(block.end_line, 5);
        assert_eq!(block.name, PYTHON_BLOCK_NAME);
        assert!(block.body.starts_with("def greet"));
        assert!(block.body.ends_with("return name"));
    }

    #[test]
    fn test_methods_and_nested_functions_are_found() {
        let source = "class Greeter:\n\
                      \u{20}   def outer(self):\n\
                      \u{20}       def inner():\n\
                      \u{20}           return 1\n\
                      \u{20}       return inner()\n";
        let blocks = extractor().extract(source).expect("parses");
        assert_eq!(blocks.len(), 2);
        // Document order: the enclosing method first.
        assert_eq!(blocks[0].start_line, 2);
        assert_eq!(blocks[0].end_line, 5);
        assert_eq!(blocks[1].start_line, 3);
        assert_eq!(blocks[1].end_line, 4);
    }

    #[test]
    fn test_decorator_stays_outside_the_block() {
        let source = "import functools\n\
                      \n\
                      @functools.cache\n\
                      def cached():\n\
                      \u{20}   return 42\n";
        let blocks = extractor().extract(source).expect("parses");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start_line, 4);
        assert!(blocks[0].body.starts_with("def cached"));
    }

    #[test]
    fn test_file_without_functions_yields_empty_list() {
        let source = "x = 1\ny = x + 1\n";
        let blocks = extractor().extract(source).expect("parses");
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_syntax_error_yields_none() {
        let source = "def broken(:\n    pass\n";
        assert!(extractor().extract(source).is_none());
    }
}
