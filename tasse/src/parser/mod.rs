pub mod error;
mod segment;
mod tree;

pub use error::{ParseError, ParseErrorKind};
pub use segment::{Segment, extract_outer_block};
pub use tree::{parse_element, wrap_script};

use std::fmt;
use std::str::FromStr;

use crate::Program;
use crate::ident::IdGenerator;
use crate::parser::tree::TreeBuilder;

/// Default limit on how deeply components may nest.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// How captured style, script and text blocks lose their delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrimMode {
    /// Fixed widths: one leading character, and four (style, text) or three
    /// (script) trailing characters covering the closing delimiter and the
    /// block terminator that follows it.
    #[default]
    Legacy,
    /// Drop the opening delimiter and everything from the last closing
    /// delimiter on.
    Delimited,
}

impl FromStr for TrimMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" => Ok(TrimMode::Legacy),
            "delimited" => Ok(TrimMode::Delimited),
            other => Err(format!(
                "unknown trim mode '{}' (expected 'legacy' or 'delimited')",
                other
            )),
        }
    }
}

impl fmt::Display for TrimMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrimMode::Legacy => write!(f, "legacy"),
            TrimMode::Delimited => write!(f, "delimited"),
        }
    }
}

/// Knobs that change how a document is parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    pub trim: TrimMode,
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            trim: TrimMode::Legacy,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
    options: ParseOptions,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser {
            source,
            file_id,
            options: ParseOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Parse the source into a complete Program with fresh identifiers.
    pub fn parse(&self) -> Result<Program, ParseError> {
        let mut ids = IdGenerator::new();
        self.parse_with(&mut ids)
    }

    /// Parse the source, drawing identifiers from `ids`.
    ///
    /// `ids` is reset first, so repeated calls on the same generator give
    /// the same identifiers for the same input.
    pub fn parse_with(&self, ids: &mut IdGenerator) -> Result<Program, ParseError> {
        ids.reset();

        let segment = extract_outer_block('(', ')', &self.source, self.file_id)?;
        let mut warnings = Vec::new();
        if !segment.found {
            warnings.push(
                ParseError::warning("no root component found", 0..0, self.file_id)
                    .with_note("the document body will be a single empty element"),
            );
        }
        if let Some(span) = segment.trailing.clone() {
            warnings.push(ParseError::warning(
                "content after the root component is ignored",
                span,
                self.file_id,
            ));
        }

        let root = TreeBuilder::new(ids, &self.options, self.file_id)
            .parse_element(segment.body, segment.offset)?;

        log::debug!(
            "parsed {} elements ({} warnings)",
            ids.issued(),
            warnings.len()
        );

        Ok(Program {
            root,
            warnings,
            source_id: self.file_id,
        })
    }
}
