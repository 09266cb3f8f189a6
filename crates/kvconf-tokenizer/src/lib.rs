#![doc = include_str!("../README.md")]

mod span;
pub use span::Span;

mod key;
pub use key::{KeyIndex, KeyPart, KeyPath, normalize, normalize_name};

mod pair;
pub use pair::RawPair;

mod tokenizer;
pub use tokenizer::{MAX_SOURCE_LEN, Tokenizer, parse, separator_for};
