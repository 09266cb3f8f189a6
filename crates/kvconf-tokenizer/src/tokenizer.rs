//! Tokenizer for kvconf text.

use crate::key::KeyBuilder;
use crate::{RawPair, Span};
use tracing::{trace, warn};

/// Longest source the tokenizer reads, in bytes. Positions and spans are `u32`.
pub const MAX_SOURCE_LEN: usize = u32::MAX as usize;

/// The separator that applies to `text`: newline if it has one, else `;`.
///
/// Newlines take precedence, so a value on its own line may contain `;`.
pub fn separator_for(text: &str) -> char {
    if text.contains('\n') { '\n' } else { ';' }
}

/// Tokenize `text` using the separator chosen by [`separator_for`].
pub fn parse(text: &str) -> Tokenizer<'_> {
    Tokenizer::new(separator_for(text), text)
}

/// `source` cut to at most `max` bytes, at a character boundary.
fn clamp(source: &str, max: usize) -> &str {
    if source.len() <= max {
        return source;
    }
    let mut end = max;
    while !source.is_char_boundary(end) {
        end -= 1;
    }
    warn!("reading the first {} of {} bytes", end, source.len());
    &source[..end]
}

/// A lazy scanner producing [`RawPair`]s from source text.
#[derive(Clone)]
pub struct Tokenizer<'src> {
    /// The source text being tokenized.
    source: &'src str,
    /// The remaining source text (suffix of `source`).
    remaining: &'src str,
    /// Current byte position in `source`.
    pos: u32,
    /// Character ending each assignment.
    separator: char,
}

impl<'src> Tokenizer<'src> {
    /// Create a tokenizer that splits assignments on `separator`.
    ///
    /// Only the first [`MAX_SOURCE_LEN`] bytes of `source` are read.
    pub fn new(separator: char, source: &'src str) -> Self {
        let source = clamp(source, MAX_SOURCE_LEN);
        Self {
            source,
            remaining: source,
            pos: 0,
            separator,
        }
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// Get the current byte position.
    #[inline]
    pub fn position(&self) -> u32 {
        self.pos
    }

    /// Check if we're at the end of input.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.remaining.is_empty()
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.remaining.chars().next()
    }

    #[inline]
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8() as u32;
        self.remaining = &self.remaining[c.len_utf8()..];
        Some(c)
    }

    /// Move forward to the absolute byte position `pos`.
    #[inline]
    fn advance_to(&mut self, pos: u32) {
        let n = (pos - self.pos) as usize;
        self.remaining = &self.remaining[n..];
        self.pos = pos;
    }

    #[inline]
    fn slice(&self, start: u32, end: u32) -> &'src str {
        &self.source[start as usize..end as usize]
    }

    /// Skip whitespace other than the separator.
    fn skip_blank(&mut self) {
        while let Some(c) = self.peek() {
            if c == self.separator || !c.is_whitespace() {
                break;
            }
            self.advance();
        }
    }

    /// Discard everything up to and including the next separator.
    fn skip_invalid(&mut self, start: u32) {
        while let Some(c) = self.advance() {
            if c == self.separator {
                break;
            }
        }
        trace!("skipping malformed token {:?}", self.slice(start, self.pos));
    }

    /// Scan the next pair, skipping tokens that produce none.
    pub fn next_pair(&mut self) -> Option<RawPair<'src>> {
        while !self.is_eof() {
            if let Some(pair) = self.scan_token() {
                return Some(pair);
            }
        }
        None
    }

    /// Scan one token up to and including its separator.
    fn scan_token(&mut self) -> Option<RawPair<'src>> {
        self.skip_blank();
        let key_start = self.pos;
        let mut key = KeyBuilder::new();

        loop {
            match self.peek() {
                None => {
                    if self.pos > key_start {
                        trace!("dropping key without value {:?}", self.slice(key_start, self.pos));
                    }
                    return None;
                }
                Some(c) if c == self.separator => {
                    if self.pos > key_start {
                        trace!("dropping key without value {:?}", self.slice(key_start, self.pos));
                    }
                    self.advance();
                    return None;
                }
                Some('=') if !key.in_index() => break,
                Some(c) => {
                    self.advance();
                    if !key.push(c) {
                        self.skip_invalid(key_start);
                        return None;
                    }
                }
            }
        }

        let key_text = self.slice(key_start, self.pos).trim_end();
        let key_span = Span::new(key_start, key_start + key_text.len() as u32);
        self.advance(); // =

        let Some(key) = key.finish(key_text) else {
            self.skip_invalid(key_start);
            return None;
        };

        let Some((value, value_span)) = self.scan_value() else {
            trace!("dropping {:?}: empty value", key_text);
            return None;
        };

        trace!("pair {:?} = {:?} at {:?}", key_text, value, key_span.to(value_span));
        Some(RawPair {
            key,
            key_span,
            value,
            value_span,
        })
    }

    /// Scan a value. Returns `None` for an empty single-line value.
    fn scan_value(&mut self) -> Option<(&'src str, Span)> {
        self.skip_blank();
        if self.peek() == Some('{') && self.opens_block() {
            return Some(self.scan_block());
        }

        let start = self.pos;
        let mut end = start;
        while let Some(c) = self.advance() {
            if c == self.separator {
                break;
            }
            if !c.is_whitespace() {
                end = self.pos;
            }
        }
        (end > start).then(|| (self.slice(start, end), Span::new(start, end)))
    }

    /// Whether the `{` at the cursor is followed only by blanks and the separator.
    fn opens_block(&self) -> bool {
        self.remaining[1..]
            .chars()
            .find(|&c| c == self.separator || !c.is_whitespace())
            == Some(self.separator)
    }

    /// Scan a raw block. The cursor is at the opening `{`.
    ///
    /// The block ends at a separator-delimited segment holding only `}`; the
    /// value is everything between the opening separator and the separator
    /// before that segment.
    fn scan_block(&mut self) -> (&'src str, Span) {
        while let Some(c) = self.advance() {
            if c == self.separator {
                break;
            }
        }
        let start = self.pos;
        let sep_len = self.separator.len_utf8() as u32;

        loop {
            let segment_start = self.pos;
            let segment_end = match self.remaining.find(self.separator) {
                Some(i) => segment_start + i as u32,
                None => segment_start + self.remaining.len() as u32,
            };
            let segment = self.slice(segment_start, segment_end);
            let at_end = segment_end as usize == self.source.len();

            self.advance_to(segment_end);
            if !at_end {
                self.advance();
            }

            if segment.trim() == "}" {
                let end = segment_start.saturating_sub(sep_len).max(start);
                return self.block_value(start, end);
            }
            if at_end {
                trace!("raw block opened at {} is not terminated", start);
                return self.block_value(start, segment_end);
            }
        }
    }

    fn block_value(&self, start: u32, end: u32) -> (&'src str, Span) {
        let mut value = self.slice(start, end);
        if self.separator == '\n' {
            value = value.strip_suffix('\r').unwrap_or(value);
        }
        (value, Span::new(start, start + value.len() as u32))
    }
}

impl<'src> Iterator for Tokenizer<'src> {
    type Item = RawPair<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_pair()
    }
}
