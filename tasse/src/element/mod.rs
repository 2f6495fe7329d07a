use std::fmt;
use std::ops::Range;

use crate::ident::ElementId;

/// The HTML tag an element renders as.
/// Every component is a generic container in this version of the notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tag {
    #[default]
    Div,
}

impl Tag {
    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Div => "div",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the element tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: Tag,
    pub id: ElementId,
    /// Raw style text, emitted verbatim as the `class` attribute.
    pub style: Option<String>,
    /// Script text already wrapped in a block that binds `el` to this element.
    pub script: Option<String>,
    /// Literal text placed right after the opening tag.
    pub text: Option<String>,
    /// Child elements in source order.
    pub children: Vec<Element>,
    /// Byte span of this element's body in the source.
    pub span: Range<usize>,
}

impl Element {
    pub fn new(id: ElementId, span: Range<usize>) -> Self {
        Element {
            tag: Tag::Div,
            id,
            style: None,
            script: None,
            text: None,
            children: Vec::new(),
            span,
        }
    }

    /// Number of elements in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Element::count).sum::<usize>()
    }

    /// Iterate over this subtree in pre-order (document order).
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }
}

/// Pre-order iterator over an element subtree.
pub struct PreOrder<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.stack.pop()?;
        self.stack.extend(element.children.iter().rev());
        Some(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::IdGenerator;

    fn leaf(ids: &mut IdGenerator) -> Element {
        Element::new(ids.next_id(), 0..0)
    }

    #[test]
    fn pre_order_visits_parents_before_children() {
        let mut ids = IdGenerator::new();
        let mut root = leaf(&mut ids);
        let mut a = leaf(&mut ids);
        a.children.push(leaf(&mut ids));
        root.children.push(a);
        root.children.push(leaf(&mut ids));

        let order: Vec<String> = root.iter().map(|e| e.id.to_string()).collect();
        assert_eq!(order, ["id1", "id2", "id3", "id4"]);
        assert_eq!(root.count(), 4);
    }
}
