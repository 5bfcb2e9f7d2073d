//! Java method and constructor extraction.
//!
//! Declarations are enumerated from a tree-sitter parse; body text is then
//! recovered by walking raw source lines and balancing braces, with line
//! comments and string literals masked out so a brace inside either cannot
//! derail the count. Qualified names follow the
//! `package.Owner1$Owner2.method(argTypes)` shape, with `_n` suffixes
//! disambiguating repeated owner names within one file.
use regex::Regex;
use tree_sitter::{Language, LanguageError, Node, Parser};

use super::Block;

/// Name used when the compilation unit has no package declaration.
const DEFAULT_PACKAGE: &str = "JHawkDefaultPackage";

pub struct JavaExtractor {
    parser: Parser,
    inline_comment: Option<Regex>,
    string_literal: Regex,
}

impl JavaExtractor {
    pub fn new(inline_comment: Option<Regex>) -> Result<Self, LanguageError> {
        let mut parser = Parser::new();
        let language: Language = tree_sitter_java::LANGUAGE.into();
        parser.set_language(&language)?;
        Ok(Self {
            parser,
            inline_comment,
            string_literal: Regex::new("\".*?\"").unwrap(),
        })
    }

    /// Extracts every constructor and method of `source`, constructors
    /// first, each group in document order.
    ///
    /// Returns `None` when the file does not parse cleanly.
    pub fn extract(&mut self, source: &str) -> Option<Vec<Block>> {
        // Legacy corpora were produced with array-typed method references
        // rewritten (`String[]::new` becomes `String::new`); keep the
        // rewrite so bodies and line ranges line up with them.
        let source = source.replace("[]::", "::");

        let tree = self.parser.parse(source.as_bytes(), None)?;
        let root = tree.root_node();
        if root.has_error() {
            return None;
        }

        let package = package_name(root, &source).unwrap_or_else(|| DEFAULT_PACKAGE.to_string());
        let lines: Vec<&str> = source.split('\n').collect();

        let (constructors, methods) = collect_declarations(root);
        let mut owners = OwnerRegistry::default();
        let mut blocks = Vec::with_capacity(constructors.len() + methods.len());
        for declaration in constructors.into_iter().chain(methods) {
            let name = qualified_name(declaration, &package, &source, &mut owners);
            let (start_line, end_line, body) = self.body_slice(declaration, &lines);
            blocks.push(Block {
                start_line,
                end_line,
                body,
                name,
            });
        }
        Some(blocks)
    }

    /// Recovers the body text by consuming raw lines from the declaration
    /// onward until the brace balance returns to zero.
    ///
    /// Blank lines neither join the body nor advance the end-line count, and
    /// braces are counted only after comments and string literals are masked
    /// from the line.
    fn body_slice(&self, declaration: Node<'_>, lines: &[&str]) -> (usize, usize, String) {
        // The name row, not the node row: annotations above the declaration
        // belong to the node but not to the body (and `@Anno({..})` braces
        // would unbalance the count before it starts).
        let start_line = declaration
            .child_by_field_name("name")
            .map(|name| name.start_position().row + 1)
            .unwrap_or(declaration.start_position().row + 1);

        let mut opened = 0usize;
        let mut closed = 0usize;
        let mut body: Vec<&str> = Vec::new();
        for line in lines.iter().skip(start_line - 1) {
            if line.is_empty() {
                continue;
            }
            let masked = self.masked(line);
            closed += masked.matches('}').count();
            opened += masked.matches('{').count();
            body.push(line);
            if closed == opened {
                break;
            }
        }

        let end_line = start_line + body.len().saturating_sub(1);
        (start_line, end_line, body.join("\n"))
    }

    fn masked(&self, line: &str) -> String {
        let without_comment = match &self.inline_comment {
            Some(pattern) => pattern.replace_all(line, "").into_owned(),
            None => line.to_string(),
        };
        self.string_literal
            .replace_all(&without_comment, "")
            .into_owned()
    }
}

/// Preorder scan for constructor and method declarations, kept in two
/// separate document-order groups. The scan descends into bodies, so methods
/// of anonymous and nested classes are found too.
fn collect_declarations(root: Node<'_>) -> (Vec<Node<'_>>, Vec<Node<'_>>) {
    let mut constructors = Vec::new();
    let mut methods = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "constructor_declaration" => constructors.push(node),
            "method_declaration" => methods.push(node),
            _ => {}
        }
        for index in (0..node.child_count()).rev() {
            if let Some(child) = node.child(index) {
                stack.push(child);
            }
        }
    }
    (constructors, methods)
}

fn package_name(root: Node<'_>, source: &str) -> Option<String> {
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if child.kind() == "package_declaration" {
            let mut parts = child.walk();
            for part in child.children(&mut parts) {
                if matches!(part.kind(), "identifier" | "scoped_identifier") {
                    return Some(node_text(part, source));
                }
            }
        }
    }
    None
}

/// `package.Owner1$Owner2.method(argTypes)`: owners joined with `$`, the
/// outermost class introduced with `.`, the method introduced with `.`.
fn qualified_name(
    declaration: Node<'_>,
    package: &str,
    source: &str,
    owners: &mut OwnerRegistry,
) -> String {
    let method = declaration
        .child_by_field_name("name")
        .map(|name| node_text(name, source))
        .unwrap_or_default();

    // Enclosing owners, innermost first.
    let mut chain: Vec<(Node<'_>, String, bool)> = Vec::new();
    let mut current = declaration.parent();
    while let Some(ancestor) = current {
        match ancestor.kind() {
            "class_declaration" => {
                chain.push((ancestor, declared_name(ancestor, source), true));
            }
            "interface_declaration" => {
                chain.push((ancestor, declared_name(ancestor, source), false));
            }
            "object_creation_expression" => {
                // Only creators with a class body can enclose a declaration,
                // so every hit here is an anonymous class.
                let creator = ancestor
                    .child_by_field_name("type")
                    .map(|node| simple_type_name(node, source))
                    .unwrap_or_default();
                chain.push((ancestor, creator, false));
            }
            _ => {}
        }
        current = ancestor.parent();
    }
    chain.reverse();

    let mut qualified = String::from(package);
    for (index, (owner, owner_name, is_class)) in chain.iter().enumerate() {
        qualified.push(if index == 0 && *is_class { '.' } else { '$' });
        qualified.push_str(owner_name);
        qualified.push_str(&owners.suffix_for(*owner, owner_name));
    }
    qualified.push('.');
    qualified.push_str(&method);
    qualified.push('(');
    qualified.push_str(&argument_types(declaration, source));
    qualified.push(')');
    qualified
}

fn declared_name(type_declaration: Node<'_>, source: &str) -> String {
    type_declaration
        .child_by_field_name("name")
        .map(|name| node_text(name, source))
        .unwrap_or_default()
}

/// Comma-joined simple type names of the declaration's parameters, with `[]`
/// appended per array dimension.
fn argument_types(declaration: Node<'_>, source: &str) -> String {
    let mut arguments = Vec::new();
    if let Some(parameters) = declaration.child_by_field_name("parameters") {
        let mut cursor = parameters.walk();
        for parameter in parameters.named_children(&mut cursor) {
            match parameter.kind() {
                "formal_parameter" | "spread_parameter" => {
                    arguments.push(parameter_type(parameter, source));
                }
                // receiver_parameter and line comments carry no argument
                _ => {}
            }
        }
    }
    arguments.join(",")
}

fn parameter_type(parameter: Node<'_>, source: &str) -> String {
    let type_node = parameter
        .child_by_field_name("type")
        .or_else(|| parameter.named_child(0));
    let Some(type_node) = type_node else {
        return String::new();
    };
    let (base, mut dimensions) = peel_array(type_node, source);
    // C-style dimensions after the parameter name count as well.
    let mut cursor = parameter.walk();
    for child in parameter.children(&mut cursor) {
        if child.kind() == "dimensions" {
            dimensions += node_text(child, source).matches("[]").count();
        }
    }
    format!("{}{}", base, "[]".repeat(dimensions))
}

fn peel_array(type_node: Node<'_>, source: &str) -> (String, usize) {
    if type_node.kind() == "array_type" {
        let dimensions = type_node
            .child_by_field_name("dimensions")
            .map(|node| node_text(node, source).matches("[]").count())
            .unwrap_or(1);
        match type_node.child_by_field_name("element") {
            Some(element) => {
                let (base, inner) = peel_array(element, source);
                (base, inner + dimensions)
            }
            None => (String::new(), dimensions),
        }
    } else {
        (simple_type_name(type_node, source), 0)
    }
}

/// The simple name of a type: generics peeled, qualifiers dropped.
fn simple_type_name(type_node: Node<'_>, source: &str) -> String {
    match type_node.kind() {
        "generic_type" => type_node
            .named_child(0)
            .map(|base| simple_type_name(base, source))
            .unwrap_or_else(|| node_text(type_node, source)),
        "scoped_type_identifier" => {
            let mut last = None;
            let mut cursor = type_node.walk();
            for child in type_node.children(&mut cursor) {
                if child.kind() == "type_identifier" {
                    last = Some(child);
                }
            }
            last.map(|name| node_text(name, source))
                .unwrap_or_else(|| node_text(type_node, source))
        }
        _ => node_text(type_node, source),
    }
}

fn node_text(node: Node<'_>, source: &str) -> String {
    source[node.byte_range()].to_string()
}

/// Disambiguates repeated owner names within one file.
///
/// The first owner with a given name keeps a bare suffix; later owners get
/// `_0`, `_1`, ... in registration order, matching the numbering of the
/// existing corpora.
#[derive(Default)]
struct OwnerRegistry {
    seen: Vec<(usize, String, Option<usize>)>,
}

impl OwnerRegistry {
    fn suffix_for(&mut self, owner: Node<'_>, name: &str) -> String {
        for (id, _, numbering) in &self.seen {
            if *id == owner.id() {
                return Self::render(*numbering);
            }
        }
        let prior = self.seen.iter().filter(|(_, seen, _)| seen == name).count();
        let numbering = if prior == 0 { None } else { Some(prior - 1) };
        self.seen.push((owner.id(), name.to_string(), numbering));
        Self::render(numbering)
    }

    fn render(numbering: Option<usize>) -> String {
        match numbering {
            None => String::new(),
            Some(index) => format!("_{}", index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::LanguageProfile;

    fn extractor() -> JavaExtractor {
        let profile = LanguageProfile::for_tests("; .", "//", "/*", "*/", ".java");
        JavaExtractor::new(profile.inline_comment_pattern().cloned()).expect("grammar loads")
    }

    #[test]
    fn test_simple_method() {
        let source = "package com.example;\n\
                      \n\
                      class Widget {\n\
                      \u{20}   int render(int depth) {\n\
                      \u{20}       return depth + 1;\n\
                      \u{20}   }\n\
                      }\n";
        let blocks = extractor().extract(source).expect("parses");
        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.name, "com.example.Widget.render(int)");
        assert_eq!(block.start_line, 4);
        assert_eq!(block.end_line, 6);
        assert!(block.body.starts_with("    int render"));
        assert!(block.body.ends_with("}"));
    }

    #[test]
    fn test_default_package() {
        let source = "class Lonely { void go() { } }\n";
        let blocks = extractor().extract(source).expect("parses");
        assert_eq!(blocks[0].name, "JHawkDefaultPackage.Lonely.go()");
    }

    #[test]
    fn test_constructors_come_before_methods() {
        let source = "package p;\n\
                      class Pair {\n\
                      \u{20}   void first() { }\n\
                      \u{20}   Pair() { }\n\
                      }\n";
        let blocks = extractor().extract(source).expect("parses");
        assert_eq!(blocks[0].name, "p.Pair.Pair()");
        assert_eq!(blocks[1].name, "p.Pair.first()");
    }

    #[test]
    fn test_nested_class_names_join_with_dollar() {
        let source = "package p;\n\
                      class Outer {\n\
                      \u{20}   class Inner {\n\
                      \u{20}       void m(int[] xs, String name) { }\n\
                      \u{20}   }\n\
                      }\n";
        let blocks = extractor().extract(source).expect("parses");
        assert_eq!(blocks[0].name, "p.Outer$Inner.m(int[],String)");
    }

    #[test]
    fn test_repeated_owner_names_are_numbered() {
        let source = "package p;\n\
                      class A {\n\
                      \u{20}   void x() { }\n\
                      }\n\
                      class B {\n\
                      \u{20}   class A {\n\
                      \u{20}       void y() { }\n\
                      \u{20}   }\n\
                      }\n";
        let blocks = extractor().extract(source).expect("parses");
        let names: Vec<&str> = blocks.iter().map(|block| block.name.as_str()).collect();
        assert!(names.contains(&"p.A.x()"));
        assert!(names.contains(&"p.B$A_0.y()"));
    }

    #[test]
    fn test_anonymous_class_owner() {
        let source = "package p;\n\
                      class Holder {\n\
                      \u{20}   Runnable r = new Runnable() {\n\
                      \u{20}       public void run() { }\n\
                      \u{20}   };\n\
                      }\n";
        let blocks = extractor().extract(source).expect("parses");
        assert_eq!(blocks[0].name, "p.Holder$Runnable.run()");
    }

    #[test]
    fn test_braces_in_comments_and_strings_are_masked() {
        let source = "package p;\n\
                      class Tricky {\n\
                      \u{20}   String brace() {\n\
                      \u{20}       String s = \"}\"; // stray } in comment\n\
                      \u{20}       return s;\n\
                      \u{20}   }\n\
                      }\n";
        let blocks = extractor().extract(source).expect("parses");
        assert_eq!(blocks[0].start_line, 3);
        assert_eq!(blocks[0].end_line, 6);
    }

    #[test]
    fn test_blank_lines_are_passed_over() {
        let source = "package demo;\n\
                      \n\
                      class Calc {\n\
                      \u{20}   int add(int a, int b) {\n\
                      \u{20}       int sum = a + b;\n\
                      \n\
                      \u{20}       return sum;\n\
                      \u{20}   }\n\
                      }\n";
        let blocks = extractor().extract(source).expect("parses");
        let block = &blocks[0];
        assert_eq!(block.start_line, 4);
        // Four lines join the body; the blank line inside advances neither
        // the body nor the end-line count.
        assert_eq!(block.end_line, 7);
        assert!(!block.body.contains("\n\n"));
    }

    #[test]
    fn test_syntax_error_yields_none() {
        let source = "package p;\nclass Broken {{{ void\n";
        assert!(extractor().extract(source).is_none());
    }

    #[test]
    fn test_array_method_reference_is_rewritten_before_parsing() {
        let source = "package p;\n\
                      import java.util.function.IntFunction;\n\
                      class Refs {\n\
                      \u{20}   IntFunction<String[]> f() {\n\
                      \u{20}       return String[]::new;\n\
                      \u{20}   }\n\
                      }\n";
        let blocks = extractor().extract(source).expect("parses after rewrite");
        assert_eq!(blocks.len(), 1);
        // The body is sliced from the rewritten text.
        assert!(blocks[0].body.contains("String::new"));
    }

    #[test]
    fn test_varargs_parameter() {
        let source = "package p;\n\
                      class V {\n\
                      \u{20}   void log(String fmt, Object... rest) { }\n\
                      }\n";
        let blocks = extractor().extract(source).expect("parses");
        assert_eq!(blocks[0].name, "p.V.log(String,Object)");
    }
}
