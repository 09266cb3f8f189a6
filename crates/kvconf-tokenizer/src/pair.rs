//! Pairs emitted by the tokenizer.

use crate::{KeyPath, Span};

/// One `key = value` assignment, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPair<'src> {
    /// The parsed key. Empty for a value-only assignment (`= value`).
    pub key: KeyPath,
    /// Span of the key text (trimmed).
    pub key_span: Span,
    /// The value text: trimmed for single-line values, verbatim for raw blocks.
    pub value: &'src str,
    /// Span of the value text.
    pub value_span: Span,
}

impl<'src> RawPair<'src> {
    /// The key text as written.
    pub fn key_text(&self) -> &str {
        self.key.original()
    }

    /// Span from the start of the key to the end of the value.
    pub fn span(&self) -> Span {
        if self.key.is_empty() {
            self.value_span
        } else {
            self.key_span.to(self.value_span)
        }
    }
}
