//! Error types
//!
//! Two failure kinds exist: an expression can fail to compile, or the
//! evaluator can reject an operation mid-query (type errors, unknown
//! functions). Tree navigation itself never fails: malformed or
//! unrecognized nodes degrade to empty results instead of aborting a
//! traversal.

use thiserror::Error;

/// Malformed expression syntax, detected at compile time.
///
/// Carries the original expression and the parser's diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to compile XPath expression `{expression}`: {message}")]
pub struct CompileError {
    /// The expression text that failed to compile
    pub expression: String,
    /// The original syntax diagnostic
    pub message: String,
}

/// A type error raised by the evaluator while running a compiled expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("XPath evaluation failed: {message}")]
pub struct EvaluationError {
    /// The evaluator's diagnostic
    pub message: String,
}

impl EvaluationError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        EvaluationError {
            message: message.into(),
        }
    }
}

/// Either failure kind, for one-shot compile-and-evaluate entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_display() {
        let err = CompileError {
            expression: "//[".to_string(),
            message: "Expected node test".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("//["));
        assert!(text.contains("Expected node test"));
    }

    #[test]
    fn test_error_from_kinds() {
        let compile = CompileError {
            expression: "x[".to_string(),
            message: "Expected ]".to_string(),
        };
        let err: Error = compile.into();
        assert!(matches!(err, Error::Compile(_)));

        let eval = EvaluationError::new("count() argument must be a node-set");
        let err: Error = eval.into();
        assert!(matches!(err, Error::Evaluation(_)));
    }
}
