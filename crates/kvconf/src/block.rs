//! The materialized pairs of one text.

use std::fmt;

use kvconf_tokenizer::{KeyPath, Span, Tokenizer, normalize, separator_for};
use tracing::trace;

/// One `key = value` pair of a [`Block`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    key: KeyPath,
    normalized_key: String,
    value: String,
    key_span: Span,
    value_span: Span,
}

impl Item {
    pub fn key(&self) -> &KeyPath {
        &self.key
    }

    pub fn original_key(&self) -> &str {
        self.key.original()
    }

    pub fn normalized_key(&self) -> &str {
        &self.normalized_key
    }

    pub fn original_value(&self) -> &str {
        &self.value
    }

    pub fn key_span(&self) -> Span {
        self.key_span
    }

    pub fn value_span(&self) -> Span {
        self.value_span
    }

    pub fn span(&self) -> Span {
        if self.key.is_empty() {
            self.value_span
        } else {
            self.key_span.to(self.value_span)
        }
    }
}

/// The pairs of a text, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    source: String,
    separator: char,
    items: Vec<Item>,
}

impl Block {
    /// Parse `source`, choosing the separator from its content.
    pub fn parse(source: &str) -> Self {
        Self::with_separator(separator_for(source), source)
    }

    pub fn with_separator(separator: char, source: &str) -> Self {
        let items = Tokenizer::new(separator, source)
            .map(|pair| Item {
                normalized_key: pair.key.normalized(),
                value: pair.value.to_string(),
                key_span: pair.key_span,
                value_span: pair.value_span,
                key: pair.key,
            })
            .collect();
        Self {
            source: source.to_string(),
            separator,
            items,
        }
    }

    /// A block of pairs that are already split, written as one `key=value`
    /// line each.
    ///
    /// Values are kept as given, so separators, quotes, braces and line
    /// breaks inside them stay part of the value. Pairs whose key does not
    /// parse are skipped.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut source = String::new();
        let mut items = Vec::new();
        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            let Some(path) = KeyPath::parse(key) else {
                trace!("skipping pair with key {:?}", key);
                continue;
            };
            let key_start = source.len();
            source.push_str(key);
            source.push('=');
            let value_start = source.len();
            source.push_str(value);
            source.push('\n');
            items.push(Item {
                normalized_key: path.normalized(),
                value: value.to_string(),
                key_span: span(key_start, key.len()),
                value_span: span(value_start, value.len()),
                key: path,
            });
        }
        Self {
            source,
            separator: '\n',
            items,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    /// The last item whose key normalizes like `key`.
    pub fn get(&self, key: &str) -> Option<&Item> {
        let key = normalize(key);
        self.items.iter().rev().find(|item| item.normalized_key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// `(key, value)` as written, in source order.
    pub fn contents(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.items
            .iter()
            .map(|item| (item.original_key(), item.original_value()))
    }
}

fn span(start: usize, len: usize) -> Span {
    let offset = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
    Span::new(offset(start), offset(start + len))
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    #[test]
    fn test_queries() {
        let block = Block::parse("Val1 = a\nval 2 = b\nVAL1 = c\n= loose");
        assert_eq!(block.len(), 4);
        assert_eq!(block.separator(), '\n');
        assert_eq!(block.get("val1").unwrap().original_value(), "c");
        assert_eq!(block.get("Val2").unwrap().original_key(), "val 2");
        assert!(block.contains("VAL 2"));
        assert!(!block.contains("val3"));
        assert!(block.item(3).unwrap().key().is_empty());
        assert_eq!(block.item(9), None);
    }

    #[test]
    fn test_contents_in_order() {
        let block = Block::parse("a = 1; b[x] = 2; a = 3");
        let contents = block.contents().collect::<Vec<_>>();
        assert_eq!(contents, [("a", "1"), ("b[x]", "2"), ("a", "3")]);
        assert_eq!(block.item(1).unwrap().normalized_key(), "b[x]");
    }

    #[test]
    fn test_spans() {
        let block = Block::parse("key = value");
        let item = block.item(0).unwrap();
        assert_eq!(item.key_span().slice(block.source()), "key");
        assert_eq!(item.value_span().slice(block.source()), "value");
        assert_eq!(item.span().slice(block.source()), "key = value");
    }

    #[test]
    fn test_from_pairs_keeps_values_whole() {
        let block = Block::from_pairs([
            ("note", "{"),
            ("Source", "a"),
            ("text", "x\ny = 1; z = 2"),
            ("open[", "skipped"),
        ]);
        let contents = block.contents().collect::<Vec<_>>();
        assert_eq!(
            contents,
            [("note", "{"), ("Source", "a"), ("text", "x\ny = 1; z = 2")]
        );
        let item = block.get("text").unwrap();
        assert_eq!(item.key_span().slice(block.source()), "text");
        assert_eq!(item.value_span().slice(block.source()), "x\ny = 1; z = 2");
        assert_eq!(block.separator(), '\n');
    }

    #[test]
    fn test_display_is_source() {
        let source = "a = 1\nb = 2";
        assert_eq!(Block::parse(source).to_string(), source);
    }
}
