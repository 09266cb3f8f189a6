//! Splitting a command line into tokens.

use std::fmt;

/// One whitespace-delimited word of a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Text before the first unquoted `=`, if there is one.
    pub key: Option<String>,
    pub value: String,
}

impl Token {
    pub fn new(key: Option<String>, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    /// A token without `=`.
    pub fn bare(value: impl Into<String>) -> Self {
        Self::new(None, value)
    }

    pub fn pair(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(Some(key.into()), value)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}={}", key, self.value),
            None => f.write_str(&self.value),
        }
    }
}

/// Split `line` on whitespace. Double quotes group words and are removed.
pub fn tokens(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut key = None;
    let mut text = String::new();
    let mut quoted = false;
    let mut started = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                started = true;
            }
            '=' if !quoted && key.is_none() => {
                key = Some(std::mem::take(&mut text));
                started = true;
            }
            c if c.is_whitespace() && !quoted => {
                if started {
                    tokens.push(Token::new(key.take(), std::mem::take(&mut text)));
                    started = false;
                }
            }
            c => {
                text.push(c);
                started = true;
            }
        }
    }
    if started {
        tokens.push(Token::new(key, text));
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    #[test]
    fn test_bare_and_pairs() {
        assert_eq!(
            tokens("  report.txt  verbose=true level=a=b "),
            [
                Token::bare("report.txt"),
                Token::pair("verbose", "true"),
                Token::pair("level", "a=b"),
            ]
        );
    }

    #[test]
    fn test_quotes_group_words() {
        assert_eq!(
            tokens(r#"title="hello there" "two words" "a=b" x="""#),
            [
                Token::pair("title", "hello there"),
                Token::bare("two words"),
                Token::bare("a=b"),
                Token::pair("x", ""),
            ]
        );
    }

    #[test]
    fn test_empty_line() {
        assert!(tokens(" \t ").is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(Token::pair("a", "1").to_string(), "a=1");
        assert_eq!(Token::bare("x").to_string(), "x");
    }
}
