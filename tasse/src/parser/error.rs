use std::fmt;
use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};

/// What went wrong while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The root component's parentheses do not balance.
    UnbalancedDelimiter,
    /// A delimiter inside a component body does not balance, or a captured
    /// block is too short for its closing marker.
    MalformedElement,
    /// Components nest deeper than the configured limit.
    NestingTooDeep,
    /// Non-fatal finding (ignored trailing content, empty document).
    Warning,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::UnbalancedDelimiter => write!(f, "unbalanced delimiter"),
            ParseErrorKind::MalformedElement => write!(f, "malformed element"),
            ParseErrorKind::NestingTooDeep => write!(f, "nesting too deep"),
            ParseErrorKind::Warning => write!(f, "warning"),
        }
    }
}

/// Parse errors with source location information.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub span: Range<usize>,
    pub file_id: usize,
    pub severity: Severity,
    pub notes: Vec<String>,
}

impl ParseError {
    pub fn unbalanced(message: impl Into<String>, span: Range<usize>, file_id: usize) -> Self {
        Self::error(ParseErrorKind::UnbalancedDelimiter, message, span, file_id)
    }

    pub fn malformed(message: impl Into<String>, span: Range<usize>, file_id: usize) -> Self {
        Self::error(ParseErrorKind::MalformedElement, message, span, file_id)
    }

    pub fn error(
        kind: ParseErrorKind,
        message: impl Into<String>,
        span: Range<usize>,
        file_id: usize,
    ) -> Self {
        ParseError {
            kind,
            message: message.into(),
            span,
            file_id,
            severity: Severity::Error,
            notes: Vec::new(),
        }
    }

    pub fn warning(message: impl Into<String>, span: Range<usize>, file_id: usize) -> Self {
        ParseError {
            kind: ParseErrorKind::Warning,
            message: message.into(),
            span,
            file_id,
            severity: Severity::Warning,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Byte offset where the problem starts.
    pub fn offset(&self) -> usize {
        self.span.start
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::new(self.severity)
            .with_message(&self.message)
            .with_labels(vec![Label::primary(self.file_id, self.span.clone())])
            .with_notes(self.notes.clone())
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}: {}", self.kind, self.span.start, self.message)
    }
}

impl std::error::Error for ParseError {}
