use std::ops::Range;

use crate::parser::error::ParseError;

/// The outermost delimited region of an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    /// Text strictly between the first opening delimiter and its match.
    pub body: &'a str,
    /// Byte offset of `body` within the scanned input.
    pub offset: usize,
    /// False when the input holds no opening delimiter at all.
    pub found: bool,
    /// Non-whitespace text following the block, which is not part of it.
    pub trailing: Option<Range<usize>>,
}

/// Return the region between the first `open` and its matching `close`.
///
/// The whole input is scanned so that an unmatched delimiter after the
/// block is still reported. An input without any `open` yields an empty,
/// not-found segment.
pub fn extract_outer_block(
    open: char,
    close: char,
    input: &str,
    file_id: usize,
) -> Result<Segment<'_>, ParseError> {
    let mut open_stack: Vec<usize> = Vec::new();
    let mut block: Option<Range<usize>> = None;
    let mut body_start = None;

    for (i, c) in input.char_indices() {
        if c == open {
            if open_stack.is_empty() && body_start.is_none() {
                body_start = Some(i + c.len_utf8());
            }
            open_stack.push(i);
        } else if c == close {
            if open_stack.pop().is_none() {
                return Err(ParseError::unbalanced(
                    format!("`{}` has no matching `{}`", close, open),
                    i..i + c.len_utf8(),
                    file_id,
                ));
            }
            if open_stack.is_empty() && block.is_none() {
                if let Some(start) = body_start {
                    block = Some(start..i);
                }
            }
        }
    }

    if let Some(&unclosed) = open_stack.last() {
        return Err(ParseError::unbalanced(
            format!("`{}` is never closed", open),
            unclosed..unclosed + open.len_utf8(),
            file_id,
        )
        .with_note(format!("{} `{}` still open at end of input", open_stack.len(), open)));
    }

    let Some(range) = block else {
        return Ok(Segment {
            body: "",
            offset: 0,
            found: false,
            trailing: None,
        });
    };

    let after = range.end + close.len_utf8();
    Ok(Segment {
        body: &input[range.clone()],
        offset: range.start,
        found: true,
        trailing: non_whitespace_span(input, after),
    })
}

/// Span covering `input[from..]` without surrounding whitespace, if non-empty.
fn non_whitespace_span(input: &str, from: usize) -> Option<Range<usize>> {
    let rest = &input[from..];
    let trimmed_start = rest.trim_start();
    if trimmed_start.is_empty() {
        return None;
    }
    let start = from + (rest.len() - trimmed_start.len());
    let end = from + rest.trim_end().len();
    Some(start..end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::error::ParseErrorKind;

    #[test]
    fn strips_the_outer_pair() {
        let seg = extract_outer_block('(', ')', "  ((a)(b))\n", 0).unwrap();
        assert_eq!(seg.body, "(a)(b)");
        assert_eq!(seg.offset, 3);
        assert!(seg.found);
        assert_eq!(seg.trailing, None);
    }

    #[test]
    fn no_opening_delimiter_is_empty() {
        let seg = extract_outer_block('(', ')', "just text", 0).unwrap();
        assert_eq!(seg.body, "");
        assert!(!seg.found);
    }

    #[test]
    fn stray_close_is_unbalanced() {
        let err = extract_outer_block('(', ')', "(a))", 0).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnbalancedDelimiter);
        assert_eq!(err.offset(), 3);
    }

    #[test]
    fn unclosed_open_is_unbalanced() {
        let err = extract_outer_block('(', ')', "((a)", 0).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnbalancedDelimiter);
        assert_eq!(err.offset(), 0);
    }

    #[test]
    fn trailing_content_is_reported_not_included() {
        let seg = extract_outer_block('(', ')', "(a) (b) \n", 0).unwrap();
        assert_eq!(seg.body, "a");
        assert_eq!(seg.trailing, Some(4..7));
    }
}
