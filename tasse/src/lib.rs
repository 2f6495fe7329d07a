pub mod element;
pub mod ident;
pub mod parser;

use crate::element::Element;
use crate::parser::ParseError;

/// A parsed tasse document.
#[derive(Debug, Clone)]
pub struct Program {
    /// The root element (the outermost parenthesized component).
    pub root: Element,
    /// Non-fatal diagnostics collected while parsing.
    pub warnings: Vec<ParseError>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}

impl Program {
    /// Number of elements in the tree, root included.
    pub fn element_count(&self) -> usize {
        self.root.count()
    }
}
