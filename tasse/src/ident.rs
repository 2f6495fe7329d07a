use std::fmt;

/// Identifier of an element, rendered as `id<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(u32);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id{}", self.0)
    }
}

/// Hands out element identifiers for one compilation.
///
/// Identifiers are strictly increasing from `id1` until the next [`reset`].
/// Each compilation owns its generator; there is no shared counter.
///
/// [`reset`]: IdGenerator::reset
#[derive(Debug, Default)]
pub struct IdGenerator {
    issued: u32,
}

impl IdGenerator {
    pub fn new() -> Self {
        IdGenerator { issued: 0 }
    }

    pub fn next_id(&mut self) -> ElementId {
        self.issued += 1;
        ElementId(self.issued)
    }

    pub fn reset(&mut self) {
        self.issued = 0;
    }

    /// How many identifiers were handed out since the last reset.
    pub fn issued(&self) -> u32 {
        self.issued
    }
}
