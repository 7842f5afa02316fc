//! Syntax Debugging
//!
//! Classifies candidate source text as well formed, malformed, or
//! impossible to check, and renders the classification as a report.

pub mod parser;
pub mod python;

pub use parser::TreeSitterParser;
pub use python::PythonParser;

use crate::logging::ErrorSink;
use appdev_shared::{ParseFault, SourceLanguage, SyntaxFault};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Parsing capability
#[cfg_attr(test, mockall::automock)]
pub trait SourceParser: Send + Sync {
    /// Parse `source`, reporting why it could not be parsed
    fn parse(&self, source: &str) -> Result<(), ParseFault>;
}

/// Parser for `language`: the CPython grammar for Python, tree-sitter otherwise
pub fn parser_for(language: SourceLanguage) -> Arc<dyn SourceParser> {
    match language {
        SourceLanguage::Python => Arc::new(PythonParser::new()),
        other => Arc::new(TreeSitterParser::new(other)),
    }
}

/// Result of checking one piece of code
#[derive(Debug, Clone, PartialEq)]
pub enum DebugReport {
    /// Code parsed without errors
    Clean,

    /// Code is malformed
    Syntax(SyntaxFault),

    /// The parser itself failed
    Failure(String),
}

impl DebugReport {
    pub fn is_clean(&self) -> bool {
        matches!(self, DebugReport::Clean)
    }
}

impl fmt::Display for DebugReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebugReport::Clean => write!(f, "No syntax errors detected."),
            DebugReport::Syntax(fault) => write!(f, "SyntaxError in code: {}", fault),
            DebugReport::Failure(message) => write!(f, "Error in debugging code: {}", message),
        }
    }
}

impl From<Result<(), ParseFault>> for DebugReport {
    fn from(outcome: Result<(), ParseFault>) -> Self {
        match outcome {
            Ok(()) => DebugReport::Clean,
            Err(ParseFault::Syntax(fault)) => DebugReport::Syntax(fault),
            Err(ParseFault::Internal { message }) => DebugReport::Failure(message),
        }
    }
}

/// Static syntax checker for generated code
pub struct SyntaxDebugger {
    parser: Arc<dyn SourceParser>,
    sink: Arc<dyn ErrorSink>,
}

impl SyntaxDebugger {
    pub fn new(parser: Arc<dyn SourceParser>, sink: Arc<dyn ErrorSink>) -> Self {
        Self { parser, sink }
    }

    /// Debugger on the grammar of `language`
    pub fn for_language(language: SourceLanguage, sink: Arc<dyn ErrorSink>) -> Self {
        Self::new(parser_for(language), sink)
    }

    /// Classify `code` without reporting anything
    pub fn diagnose(&self, code: &str) -> DebugReport {
        DebugReport::from(self.parser.parse(code))
    }

    /// Check `code` and describe the outcome.
    ///
    /// Parser failures are also sent to the error sink; malformed code is not.
    #[instrument(skip_all, fields(code_len = code.len()))]
    pub fn debug_code(&self, code: &str) -> String {
        let report = self.diagnose(code);
        let message = report.to_string();

        match report {
            DebugReport::Failure(_) => self.sink.log_error(&message),
            _ => debug!("{}", message),
        }

        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MockErrorSink;
    use mockall::predicate::eq;

    fn python_debugger(sink: MockErrorSink) -> SyntaxDebugger {
        SyntaxDebugger::for_language(SourceLanguage::Python, Arc::new(sink))
    }

    #[test]
    fn test_debug_code_no_errors() {
        let mut sink = MockErrorSink::new();
        sink.expect_log_error().never();

        let result = python_debugger(sink).debug_code("def add(a, b):\n    return a + b");
        assert_eq!(result, "No syntax errors detected.");
    }

    #[test]
    fn test_debug_code_syntax_error() {
        let mut sink = MockErrorSink::new();
        sink.expect_log_error().never();

        let result = python_debugger(sink).debug_code("def add(a, b)\n    return a + b");
        assert!(result.starts_with("SyntaxError in code:"), "got {}", result);
    }

    #[test]
    fn test_debug_code_rejects_what_cpython_rejects() {
        let mut sink = MockErrorSink::new();
        sink.expect_log_error().never();
        let debugger = python_debugger(sink);

        for code in [
            "print \"hello\"",
            "exec \"x = 1\"",
            "def f(a=1, b):\n    pass",
            "f(x for x in y, 1)",
            "del f()",
            "async = 1",
            "x = 1\n  y = 2",
        ] {
            let result = debugger.debug_code(code);
            assert!(result.starts_with("SyntaxError in code:"), "{:?} gave {}", code, result);
        }
    }

    #[test]
    fn test_debug_code_unexpected_error() {
        let mut parser = MockSourceParser::new();
        parser.expect_parse().returning(|_| {
            Err(ParseFault::Internal {
                message: "Unexpected error".to_string(),
            })
        });

        let mut sink = MockErrorSink::new();
        sink.expect_log_error()
            .with(eq("Error in debugging code: Unexpected error"))
            .times(1)
            .return_const(());

        let debugger = SyntaxDebugger::new(Arc::new(parser), Arc::new(sink));
        let result = debugger.debug_code("def add(a, b):\n    return a + b");
        assert_eq!(result, "Error in debugging code: Unexpected error");
    }

    #[test]
    fn test_debug_code_is_idempotent() {
        let debugger = python_debugger(MockErrorSink::new());

        for code in ["x = [1, 2", "def f():\n    return 1"] {
            assert_eq!(debugger.diagnose(code), debugger.diagnose(code));
            assert_eq!(debugger.debug_code(code), debugger.debug_code(code));
        }
    }

    #[test]
    fn test_report_rendering() {
        let fault = SyntaxFault {
            message: "missing ':'".to_string(),
            line: 1,
            column: 14,
        };

        assert_eq!(DebugReport::Clean.to_string(), "No syntax errors detected.");
        assert_eq!(
            DebugReport::Syntax(fault).to_string(),
            "SyntaxError in code: missing ':' (line 1, column 14)"
        );
        assert_eq!(
            DebugReport::Failure("boom".to_string()).to_string(),
            "Error in debugging code: boom"
        );
    }
}
