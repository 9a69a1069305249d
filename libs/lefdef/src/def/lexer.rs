//! Splits DEF text into words.

use crate::error::{ParseError, Result};

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Token {
    pub(crate) text: String,
    /// 1-based line on which the token starts.
    pub(crate) line: usize,
    /// Whether the token was written as a quoted string.
    pub(crate) quoted: bool,
}

impl Token {
    pub(crate) fn is(&self, kw: &str) -> bool {
        !self.quoted && self.text == kw
    }
}

/// Tokenizes a whole DEF document.
///
/// Words are separated by whitespace. `#` starts a comment that runs to the end
/// of the line when it begins a word. A `;` glued to the end of a word is split
/// off into its own token.
pub(crate) fn tokenize(data: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = data.chars().peekable();
    let mut line = 1;

    while let Some(&c) = chars.peek() {
        if c == '\n' {
            line += 1;
            chars.next();
        } else if c.is_whitespace() {
            chars.next();
        } else if c == '#' {
            while let Some(&c) = chars.peek() {
                if c == '\n' {
                    break;
                }
                chars.next();
            }
        } else if c == '"' {
            let start = line;
            chars.next();
            let mut text = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => {
                        if let Some(escaped) = chars.next() {
                            text.push(escaped);
                        }
                    }
                    Some(c) => {
                        if c == '\n' {
                            line += 1;
                        }
                        text.push(c);
                    }
                    None => {
                        return Err(ParseError::Syntax {
                            line: start,
                            msg: "unterminated string".to_string(),
                        })
                    }
                }
            }
            tokens.push(Token {
                text,
                line: start,
                quoted: true,
            });
        } else {
            let mut text = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                text.push(c);
                chars.next();
            }
            if text.len() > 1 && text.ends_with(';') {
                text.pop();
                tokens.push(Token {
                    text,
                    line,
                    quoted: false,
                });
                text = ";".to_string();
            }
            tokens.push(Token {
                text,
                line,
                quoted: false,
            });
        }
    }

    Ok(tokens)
}
