//! Error types for the exchange codec

use std::ops::Range;
use thiserror::Error;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Unexpected token at {pos}: expected {expected}, found {found}")]
    UnexpectedToken {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of document at {pos}")]
    UnexpectedEof { pos: usize },

    #[error("Unreadable character at {pos}")]
    LexerError { pos: usize },

    #[error("Closing tag </{found}> at {pos} does not match <{expected}>")]
    MismatchedTag {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Document root is <{found}>, expected <{expected}>")]
    WrongRoot { expected: String, found: String },

    #[error("Document contains no variant data")]
    Empty,
}

impl CodecError {
    pub fn unexpected_token(pos: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(pos: usize) -> Self {
        Self::UnexpectedEof { pos }
    }

    pub fn lexer_error(pos: usize) -> Self {
        Self::LexerError { pos }
    }

    /// True for errors caused by text that is not well-formed markup
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            CodecError::UnexpectedToken { .. }
                | CodecError::UnexpectedEof { .. }
                | CodecError::LexerError { .. }
                | CodecError::MismatchedTag { .. }
        )
    }

    pub fn span(&self) -> Option<Range<usize>> {
        match self {
            CodecError::UnexpectedToken { pos, .. }
            | CodecError::LexerError { pos }
            | CodecError::MismatchedTag { pos, .. } => Some(*pos..*pos + 1),
            CodecError::UnexpectedEof { pos } => Some(pos.saturating_sub(1)..*pos),
            CodecError::WrongRoot { .. } | CodecError::Empty => None,
        }
    }

    /// Short reason shown next to the offending span
    pub fn label(&self) -> String {
        match self {
            CodecError::UnexpectedToken { expected, .. } => format!("expected {}", expected),
            CodecError::UnexpectedEof { .. } => "document ends here".to_string(),
            CodecError::LexerError { .. } => "not valid markup".to_string(),
            CodecError::MismatchedTag { expected, .. } => format!("expected </{}>", expected),
            CodecError::WrongRoot { expected, .. } => format!("expected <{}>", expected),
            CodecError::Empty => "no variant presets".to_string(),
        }
    }
}

/// Render an error against its source with ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_error(source: &str, filename: &str, error: &CodecError) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let span = error.span().unwrap_or(0..source.len().min(1));
    let mut output = Vec::new();

    let report = Report::build(ReportKind::Error, filename, span.start)
        .with_message(error.to_string())
        .with_label(
            Label::new((filename, span))
                .with_color(Color::Red)
                .with_message(error.label()),
        )
        .finish();

    if report
        .write((filename, Source::from(source)), &mut output)
        .is_err()
    {
        return error.to_string();
    }

    String::from_utf8(output).unwrap_or_else(|_| error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_classification() {
        assert!(CodecError::lexer_error(3).is_malformed());
        assert!(CodecError::unexpected_eof(10).is_malformed());
        assert!(!CodecError::Empty.is_malformed());
        assert!(!CodecError::WrongRoot {
            expected: "a".into(),
            found: "b".into()
        }
        .is_malformed());
    }

    #[test]
    fn test_human_readable_reason() {
        let err = CodecError::WrongRoot {
            expected: "renderknecht_varianten".into(),
            found: "html".into(),
        };
        assert_eq!(
            err.to_string(),
            "Document root is <html>, expected <renderknecht_varianten>"
        );
        assert_eq!(err.span(), None);
    }

    #[cfg(feature = "pretty-errors")]
    #[test]
    fn test_format_error_mentions_message() {
        let source = "<a></b>";
        let err = CodecError::MismatchedTag {
            pos: 3,
            expected: "a".into(),
            found: "b".into(),
        };
        let report = format_error(source, "broken.xml", &err);
        assert!(report.contains("does not match"));
    }
}
