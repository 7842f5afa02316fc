//! Grammar-driven syntax checking on tree-sitter

use crate::debugging::SourceParser;
use appdev_shared::{ParseFault, SourceLanguage, SyntaxFault};
use tree_sitter::{Language, Node, Parser};

/// Tree-sitter grammar for a language, if one is bundled.
///
/// Python is checked by `PythonParser` instead: its tree-sitter grammar
/// recovers from inputs the CPython grammar rejects.
pub fn grammar(language: SourceLanguage) -> Option<Language> {
    match language {
        SourceLanguage::Python => None,
        SourceLanguage::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
        SourceLanguage::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        SourceLanguage::Go => Some(tree_sitter_go::LANGUAGE.into()),
        SourceLanguage::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
    }
}

/// Parser that checks source text against one language grammar.
///
/// A fresh `tree_sitter::Parser` is built per call, so the type is
/// `Send + Sync` without any locking.
#[derive(Debug, Clone, Copy)]
pub struct TreeSitterParser {
    language: SourceLanguage,
}

impl TreeSitterParser {
    pub fn new(language: SourceLanguage) -> Self {
        Self { language }
    }
}

impl SourceParser for TreeSitterParser {
    fn parse(&self, source: &str) -> Result<(), ParseFault> {
        let language = grammar(self.language).ok_or_else(|| ParseFault::Internal {
            message: format!("no tree-sitter grammar for {}", self.language),
        })?;

        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| ParseFault::Internal {
                message: format!("{} grammar could not be loaded: {}", self.language, e),
            })?;

        let tree = parser.parse(source, None).ok_or_else(|| ParseFault::Internal {
            message: format!("{} parser produced no syntax tree", self.language),
        })?;

        let root = tree.root_node();
        if !root.has_error() {
            return Ok(());
        }

        let fault = first_fault(root).unwrap_or(root);
        Err(ParseFault::Syntax(describe(fault)))
    }
}

/// First ERROR or MISSING node in document order
fn first_fault(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }

    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_fault)
}

fn describe(node: Node<'_>) -> SyntaxFault {
    let position = node.start_position();
    let message = if node.is_missing() {
        format!("missing '{}'", node.kind())
    } else {
        "invalid syntax".to_string()
    };

    SyntaxFault {
        message,
        line: position.row + 1,
        column: position.column + 1,
    }
}
