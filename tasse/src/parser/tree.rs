use std::ops::Range;

use crate::element::Element;
use crate::ident::{ElementId, IdGenerator};
use crate::parser::error::{ParseError, ParseErrorKind};
use crate::parser::{ParseOptions, TrimMode};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse one component body (the text inside its parentheses) into an element.
///
/// The element takes the next identifier from `ids` before any of its
/// children do, so identifiers follow pre-order.
pub fn parse_element(
    body: &str,
    ids: &mut IdGenerator,
    options: &ParseOptions,
) -> Result<Element, ParseError> {
    TreeBuilder::new(ids, options, 0).parse_element(body, 0)
}

// ---------------------------------------------------------------------------
// Delimiters and depth tracking
// ---------------------------------------------------------------------------

/// The four block kinds, one per delimiter pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delim {
    Paren,
    Brace,
    Bracket,
    Angle,
}

impl Delim {
    const ALL: [Delim; 4] = [Delim::Paren, Delim::Brace, Delim::Bracket, Delim::Angle];

    /// Classify a character as an opening (`true`) or closing delimiter.
    fn of(c: char) -> Option<(Delim, bool)> {
        match c {
            '(' => Some((Delim::Paren, true)),
            ')' => Some((Delim::Paren, false)),
            '{' => Some((Delim::Brace, true)),
            '}' => Some((Delim::Brace, false)),
            '[' => Some((Delim::Bracket, true)),
            ']' => Some((Delim::Bracket, false)),
            '<' => Some((Delim::Angle, true)),
            '>' => Some((Delim::Angle, false)),
            _ => None,
        }
    }

    fn open(self) -> char {
        match self {
            Delim::Paren => '(',
            Delim::Brace => '{',
            Delim::Bracket => '[',
            Delim::Angle => '<',
        }
    }

    fn close(self) -> char {
        match self {
            Delim::Paren => ')',
            Delim::Brace => '}',
            Delim::Bracket => ']',
            Delim::Angle => '>',
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Nesting depth per delimiter kind, with the offsets of the still-open
/// delimiters for error reporting.
#[derive(Debug, Default)]
struct Depths {
    open: [Vec<usize>; 4],
}

impl Depths {
    fn depth(&self, delim: Delim) -> usize {
        self.open[delim.index()].len()
    }

    fn push(&mut self, delim: Delim, offset: usize) {
        self.open[delim.index()].push(offset);
    }

    /// Returns false when there was nothing to close.
    fn pop(&mut self, delim: Delim) -> bool {
        self.open[delim.index()].pop().is_some()
    }

    fn all_zero(&self) -> bool {
        self.open.iter().all(Vec::is_empty)
    }

    /// The single kind at depth one while every other kind is at zero.
    fn sole_outer(&self) -> Option<Delim> {
        let mut found = None;
        for delim in Delim::ALL {
            match self.depth(delim) {
                0 => {}
                1 if found.is_none() => found = Some(delim),
                _ => return None,
            }
        }
        found
    }

    /// Most recently opened delimiter of the first kind, in `Delim::ALL`
    /// order, that still has one open.
    fn first_unclosed(&self) -> Option<(Delim, usize)> {
        Delim::ALL
            .into_iter()
            .find_map(|d| self.open[d.index()].last().map(|&at| (d, at)))
    }
}

/// Which buffer receives the current character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    None,
    Child,
    Style,
    Script,
    Text,
}

/// What the depth counters say to do after a character is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Exactly one block is open at depth one: write into its buffer.
    Enter(Target),
    /// Everything is balanced again and a child component is pending.
    FlushChild,
    /// Nested same-kind delimiter, or text after a block closed.
    Keep,
}

fn step(depths: &Depths, child_pending: bool) -> Step {
    match depths.sole_outer() {
        Some(Delim::Paren) => Step::Enter(Target::Child),
        Some(Delim::Brace) => Step::Enter(Target::Style),
        Some(Delim::Bracket) => Step::Enter(Target::Script),
        Some(Delim::Angle) => Step::Enter(Target::Text),
        None if depths.all_zero() && child_pending => Step::FlushChild,
        None => Step::Keep,
    }
}

// ---------------------------------------------------------------------------
// Payload extraction
// ---------------------------------------------------------------------------

/// Characters stripped from the front and back of a captured block.
///
/// The captured text starts with the opening delimiter and runs past the
/// closing delimiter up to the next block, so the trailing width covers the
/// closing delimiter plus the notation's block terminator.
#[derive(Debug, Clone, Copy)]
struct Trim {
    leading: usize,
    trailing: usize,
}

const STYLE_TRIM: Trim = Trim {
    leading: 1,
    trailing: 4,
};
const SCRIPT_TRIM: Trim = Trim {
    leading: 1,
    trailing: 3,
};
const TEXT_TRIM: Trim = Trim {
    leading: 1,
    trailing: 4,
};

/// Text captured for one payload kind, possibly from several blocks.
#[derive(Debug, Default)]
struct Payload {
    text: String,
    /// Offset in the source of the first captured character.
    start: Option<usize>,
}

impl Payload {
    fn push(&mut self, c: char, offset: usize) {
        self.start.get_or_insert(offset);
        self.text.push(c);
    }

    fn span(&self) -> Range<usize> {
        let start = self.start.unwrap_or(0);
        start..start + self.text.len()
    }
}

/// Wrap a script so it runs once with `el` bound to its element.
pub fn wrap_script(id: ElementId, code: &str) -> String {
    format!(
        "(()=>{{let el=document.getElementById(\"{}\");{};}})();",
        id, code
    )
}

// ---------------------------------------------------------------------------
// Tree builder
// ---------------------------------------------------------------------------

pub(crate) struct TreeBuilder<'a> {
    ids: &'a mut IdGenerator,
    options: &'a ParseOptions,
    file_id: usize,
    depth: usize,
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn new(ids: &'a mut IdGenerator, options: &'a ParseOptions, file_id: usize) -> Self {
        TreeBuilder {
            ids,
            options,
            file_id,
            depth: 0,
        }
    }

    /// Parse `body`, which starts at byte `offset` of the source.
    pub(crate) fn parse_element(&mut self, body: &str, offset: usize) -> Result<Element, ParseError> {
        if self.depth > self.options.max_depth {
            return Err(ParseError::error(
                ParseErrorKind::NestingTooDeep,
                format!("components nest deeper than {} levels", self.options.max_depth),
                offset..offset + body.len(),
                self.file_id,
            ));
        }

        let mut element = Element::new(self.ids.next_id(), offset..offset + body.len());

        let mut depths = Depths::default();
        let mut target = Target::None;
        // Byte index in `body` just past the character that opened the pending child.
        let mut child_start: Option<usize> = None;
        let mut style = Payload::default();
        let mut script = Payload::default();
        let mut text = Payload::default();

        for (i, c) in body.char_indices() {
            let at = offset + i;

            if let Some((delim, opening)) = Delim::of(c) {
                if opening {
                    depths.push(delim, at);
                } else if !depths.pop(delim) {
                    return Err(ParseError::malformed(
                        format!("`{}` has no matching `{}`", c, delim.open()),
                        at..at + 1,
                        self.file_id,
                    ));
                }
            }

            match step(&depths, child_start.is_some()) {
                Step::Enter(Target::Child) => {
                    if target != Target::Child {
                        child_start = Some(i + c.len_utf8());
                    }
                    target = Target::Child;
                }
                Step::Enter(next) => {
                    if let Some(start) = child_start {
                        let (delim, opened) = depths.first_unclosed().unwrap_or((Delim::Paren, at));
                        return Err(ParseError::malformed(
                            format!("`{}` opened inside a child component outlives it", delim.open()),
                            opened..opened + 1,
                            self.file_id,
                        )
                        .with_note(format!(
                            "the child component starting at byte {} closes at byte {}",
                            offset + start - 1,
                            at
                        )));
                    }
                    target = next;
                }
                Step::FlushChild => {
                    if let Some(start) = child_start.take() {
                        self.depth += 1;
                        let child = self.parse_element(&body[start..i], offset + start);
                        self.depth -= 1;
                        element.children.push(child?);
                    }
                    target = Target::None;
                }
                Step::Keep => {}
            }

            match target {
                Target::Style => style.push(c, at),
                Target::Script => script.push(c, at),
                Target::Text => text.push(c, at),
                Target::Child | Target::None => {}
            }
        }

        if let Some((delim, at)) = depths.first_unclosed() {
            return Err(ParseError::malformed(
                format!("`{}` is never closed", delim.open()),
                at..at + 1,
                self.file_id,
            )
            .with_note(format!("expected a matching `{}` before the end of the component", delim.close())));
        }

        if !style.text.is_empty() {
            element.style = Some(self.strip(&style, Delim::Brace, STYLE_TRIM)?);
        }
        if !script.text.is_empty() {
            let code = self.strip(&script, Delim::Bracket, SCRIPT_TRIM)?;
            element.script = Some(wrap_script(element.id, &code));
        }
        if !text.text.is_empty() {
            element.text = Some(self.strip(&text, Delim::Angle, TEXT_TRIM)?);
        }

        log::trace!(
            "parsed {} with {} children at {:?}",
            element.id,
            element.children.len(),
            element.span
        );
        Ok(element)
    }

    /// Remove the delimiters (and block terminator) around a captured payload.
    fn strip(&self, payload: &Payload, delim: Delim, trim: Trim) -> Result<String, ParseError> {
        let buf = payload.text.as_str();
        match self.options.trim {
            TrimMode::Legacy => {
                let len = buf.chars().count();
                if len < trim.leading + trim.trailing {
                    return Err(ParseError::malformed(
                        format!(
                            "`{}` block is too short for its closing marker",
                            delim.open()
                        ),
                        payload.span(),
                        self.file_id,
                    )
                    .with_note(format!(
                        "a `{}…{}` block needs {} trailing characters including the closing delimiter",
                        delim.open(),
                        delim.close(),
                        trim.trailing
                    )));
                }
                let start = char_boundary(buf, trim.leading);
                let end = char_boundary(buf, len - trim.trailing);
                Ok(buf[start..end].to_string())
            }
            TrimMode::Delimited => {
                let start = char_boundary(buf, trim.leading);
                match buf.rfind(delim.close()) {
                    Some(end) if end >= start => Ok(buf[start..end].to_string()),
                    _ => Err(ParseError::malformed(
                        format!("`{}` block has no closing `{}`", delim.open(), delim.close()),
                        payload.span(),
                        self.file_id,
                    )),
                }
            }
        }
    }
}

/// Byte index of the `n`th character of `s` (or `s.len()` past the end).
fn char_boundary(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map_or(s.len(), |(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<Element, ParseError> {
        parse_element(body, &mut IdGenerator::new(), &ParseOptions::default())
    }

    fn parse_delimited(body: &str) -> Result<Element, ParseError> {
        let options = ParseOptions {
            trim: TrimMode::Delimited,
            ..ParseOptions::default()
        };
        parse_element(body, &mut IdGenerator::new(), &options)
    }

    #[test]
    fn step_selects_single_open_block() {
        let mut depths = Depths::default();
        assert_eq!(step(&depths, false), Step::Keep);
        depths.push(Delim::Brace, 0);
        assert_eq!(step(&depths, false), Step::Enter(Target::Style));
        depths.push(Delim::Brace, 1);
        assert_eq!(step(&depths, false), Step::Keep);
        depths.pop(Delim::Brace);
        depths.pop(Delim::Brace);
        assert_eq!(step(&depths, true), Step::FlushChild);
    }

    #[test]
    fn siblings_become_children_in_order() {
        let root = parse("(a)(b)").unwrap();
        let ids: Vec<String> = root.children.iter().map(|c| c.id.to_string()).collect();
        assert_eq!(root.id.to_string(), "id1");
        assert_eq!(ids, ["id2", "id3"]);
    }

    #[test]
    fn legacy_trim_drops_block_terminator() {
        let root = parse("{color: red};\r\n").unwrap();
        assert_eq!(root.style.as_deref(), Some("color: red"));
    }

    #[test]
    fn legacy_trim_rejects_short_blocks() {
        for source in ["{}", "{ab}", "[]", "[a]", "<>", "<ab>"] {
            let err = parse(source).unwrap_err();
            assert_eq!(err.kind, ParseErrorKind::MalformedElement, "{source}");
        }
    }

    #[test]
    fn legacy_trim_widths_per_block_kind() {
        // style and text drop `}` / `>` plus three terminator characters,
        // script drops `]` plus two.
        assert_eq!(parse("{};\r\n").unwrap().style.as_deref(), Some(""));
        assert_eq!(parse("<>;\r\n").unwrap().text.as_deref(), Some(""));
        assert_eq!(parse("{x};\r\n").unwrap().style.as_deref(), Some("x"));
        assert_eq!(parse("<x>;\r\n").unwrap().text.as_deref(), Some("x"));

        let root = parse("[ab]").unwrap();
        assert_eq!(root.script.as_deref(), Some(wrap_script(root.id, "").as_str()));
        let root = parse("[x]\r\n").unwrap();
        assert_eq!(root.script.as_deref(), Some(wrap_script(root.id, "x").as_str()));
    }

    #[test]
    fn delimited_trim_cuts_at_last_close() {
        let root = parse_delimited("{a{b}c}\n  ").unwrap();
        assert_eq!(root.style.as_deref(), Some("a{b}c"));
    }

    #[test]
    fn interleaved_child_block_is_malformed() {
        let err = parse("( { ) }").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MalformedElement);
        assert_eq!(err.offset(), 2);
    }

    #[test]
    fn multibyte_payloads_are_trimmed_by_character() {
        let root = parse("<héllo>;\r\n").unwrap();
        assert_eq!(root.text.as_deref(), Some("héllo"));
    }

    #[test]
    fn nesting_limit_is_enforced() {
        let options = ParseOptions {
            max_depth: 2,
            ..ParseOptions::default()
        };
        let err = parse_element("(((())))", &mut IdGenerator::new(), &options).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::NestingTooDeep);
    }
}
