//! Key paths and their normalized forms.
//!
//! A key such as `Mom.Jobs[0]` is a path of parts separated by `.`; each part
//! may carry one or more bracketed indices. Parts compare by their normalized
//! name (whitespace removed, lower-cased); indices compare by their trimmed
//! text, since they may be case-sensitive dictionary keys.

use std::fmt;

/// One `[...]` suffix on a key part.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyIndex {
    original: String,
    normalized: String,
}

impl KeyIndex {
    pub fn new(original: impl Into<String>) -> Self {
        let original = original.into();
        let normalized = original.trim().to_string();
        Self {
            original,
            normalized,
        }
    }

    /// The index as written between the brackets.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// The index with surrounding whitespace trimmed.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// The index as a sequence position, if it is numeric.
    pub fn position(&self) -> Option<usize> {
        self.normalized.parse().ok()
    }
}

/// One dot-delimited segment of a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPart {
    original: String,
    normalized: String,
    indices: Vec<KeyIndex>,
}

impl KeyPart {
    pub fn new(name: &str, indices: Vec<KeyIndex>) -> Self {
        Self {
            original: name.trim().to_string(),
            normalized: normalize_name(name),
            indices,
        }
    }

    /// The part name as written, trimmed.
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn indices(&self) -> &[KeyIndex] {
        &self.indices
    }

    /// Whether two parts address the same member and indices.
    pub fn matches(&self, other: &KeyPart) -> bool {
        self.normalized == other.normalized
            && self.indices.len() == other.indices.len()
            && self
                .indices
                .iter()
                .zip(&other.indices)
                .all(|(a, b)| a.normalized == b.normalized)
    }

    fn write_original(&self, out: &mut String) {
        out.push_str(&self.original);
        for index in &self.indices {
            out.push('[');
            out.push_str(&index.original);
            out.push(']');
        }
    }

    fn write_normalized(&self, out: &mut String) {
        out.push_str(&self.normalized);
        for index in &self.indices {
            out.push('[');
            out.push_str(&index.normalized);
            out.push(']');
        }
    }
}

/// A parsed key: an ordered sequence of [`KeyPart`]s.
///
/// The empty path (no parts) is what an assignment with nothing before its
/// `=` produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct KeyPath {
    original: String,
    parts: Vec<KeyPart>,
}

impl KeyPath {
    /// The path with no parts.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse key text such as `kid.Mom.jobs[2]`.
    ///
    /// Returns `None` when the text is not a well-formed key.
    pub fn parse(text: &str) -> Option<Self> {
        let mut builder = KeyBuilder::new();
        for c in text.chars() {
            if !builder.push(c) {
                return None;
            }
        }
        builder.finish(text)
    }

    /// The key as written, trimmed.
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }

    pub fn first(&self) -> Option<&KeyPart> {
        self.parts.first()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The path without its first `n` parts.
    pub fn skip(&self, n: usize) -> KeyPath {
        let parts = self.parts.iter().skip(n).cloned().collect::<Vec<_>>();
        let mut original = String::new();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                original.push('.');
            }
            part.write_original(&mut original);
        }
        KeyPath { original, parts }
    }

    /// Whether `prefix` matches the leading parts of this path.
    pub fn starts_with(&self, prefix: &KeyPath) -> bool {
        prefix.len() <= self.len()
            && prefix
                .parts
                .iter()
                .zip(&self.parts)
                .all(|(a, b)| a.matches(b))
    }

    /// Canonical form used for lookups: `part[index].part`.
    pub fn normalized(&self) -> String {
        let mut out = String::with_capacity(self.original.len());
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            part.write_normalized(&mut out);
        }
        out
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

/// Normalize key text for comparison.
///
/// Text that does not parse as a key falls back to [`normalize_name`] over the
/// whole string.
pub fn normalize(key: &str) -> String {
    match KeyPath::parse(key) {
        Some(path) => path.normalized(),
        None => normalize_name(key),
    }
}

/// Remove all whitespace and lower-case.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyState {
    /// Accumulating a part name.
    Name,
    /// Inside `[...]`.
    Index,
    /// Just after `]`; only whitespace, `.`, `[` may follow.
    AfterIndex,
}

/// Incremental key parser shared by [`KeyPath::parse`] and the tokenizer.
#[derive(Debug)]
pub(crate) struct KeyBuilder {
    parts: Vec<KeyPart>,
    name: String,
    index: String,
    indices: Vec<KeyIndex>,
    state: KeyState,
}

impl KeyBuilder {
    pub(crate) fn new() -> Self {
        Self {
            parts: Vec::new(),
            name: String::new(),
            index: String::new(),
            indices: Vec::new(),
            state: KeyState::Name,
        }
    }

    pub(crate) fn in_index(&self) -> bool {
        self.state == KeyState::Index
    }

    /// Feed one character of key text. Returns `false` if the key is malformed.
    pub(crate) fn push(&mut self, c: char) -> bool {
        match self.state {
            KeyState::Name => match c {
                '.' => self.end_part(),
                '[' => {
                    self.state = KeyState::Index;
                    true
                }
                ']' | '=' => false,
                _ => {
                    self.name.push(c);
                    true
                }
            },
            KeyState::Index => match c {
                ']' => {
                    let index = std::mem::take(&mut self.index);
                    self.indices.push(KeyIndex::new(index));
                    self.state = KeyState::AfterIndex;
                    true
                }
                '[' | '=' => false,
                _ => {
                    self.index.push(c);
                    true
                }
            },
            KeyState::AfterIndex => match c {
                '.' => self.end_part(),
                '[' => {
                    self.state = KeyState::Index;
                    true
                }
                c => c.is_whitespace(),
            },
        }
    }

    fn end_part(&mut self) -> bool {
        let name = std::mem::take(&mut self.name);
        let indices = std::mem::take(&mut self.indices);
        if name.trim().is_empty() {
            return false;
        }
        self.parts.push(KeyPart::new(&name, indices));
        self.state = KeyState::Name;
        true
    }

    /// Complete the key. `original` is the full key text as written.
    pub(crate) fn finish(mut self, original: &str) -> Option<KeyPath> {
        if self.state == KeyState::Index {
            return None;
        }
        if self.parts.is_empty() && self.indices.is_empty() && self.name.trim().is_empty() {
            return Some(KeyPath::empty());
        }
        if !self.end_part() {
            return None;
        }
        Some(KeyPath {
            original: original.trim().to_string(),
            parts: self.parts,
        })
    }
}
