use std::fmt;

/// Maximum length of a variable name in a URI template.
///
/// Names longer than this are rejected at lex time so that typos like a
/// missing segment separator surface as template errors rather than as
/// variables that never match.
pub const VARIABLE_NAME_MAX_LENGTH: usize = 32;

/// Characters that terminate a text run and become their own tokens.
///
/// `:` is not listed because it introduces a variable and is consumed by
/// the variable scanner rather than emitted as punctuation.
const PUNCTUATION: [char; 7] = ['/', '(', ')', '[', ']', ',', '='];

/// Classification of a single lexed token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A run of ordinary characters (including `.` and `-`)
    Text,
    /// One of the reserved template characters, e.g. `/` or `[`
    Punctuation,
    /// The body of a `'...'` or `"..."` literal, quotes stripped
    QuotedString,
    /// A variable name, `:` stripped; may be empty (the parser rejects that)
    Variable,
}

/// A single token produced by [`lex`] or [`lex_host`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Lexical error in a URI template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// A `'` or `"` literal was opened but never closed
    UnterminatedQuote {
        /// The quote character that opened the literal
        quote: char,
        /// Byte offset of the opening quote
        offset: usize,
    },
    /// A `]` appeared without a matching `[`, or a `[` was never closed
    UnbalancedBrackets {
        /// Byte offset of the offending bracket, or the template length
        /// when a `[` was left open at end of input
        offset: usize,
    },
    /// A variable name exceeded [`VARIABLE_NAME_MAX_LENGTH`]
    VariableNameTooLong {
        name: String,
        /// Byte offset of the `:` that introduced the variable
        offset: usize,
    },
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnterminatedQuote { quote, offset } => {
                write!(f, "unterminated {quote} quote at byte {offset}")
            }
            LexError::UnbalancedBrackets { offset } => {
                write!(f, "unbalanced square brackets at byte {offset}")
            }
            LexError::VariableNameTooLong { name, offset } => {
                write!(
                    f,
                    "variable name `{name}` at byte {offset} exceeds {VARIABLE_NAME_MAX_LENGTH} characters"
                )
            }
        }
    }
}

impl std::error::Error for LexError {}

/// Tokenizes a path template.
///
/// The template is left-padded with `/` when it does not already start
/// with one, so `users/:id` and `/users/:id` lex identically.
pub fn lex(raw: &str) -> Result<Vec<Token>, LexError> {
    if raw.starts_with('/') {
        scan(raw)
    } else {
        let padded = format!("/{raw}");
        scan(&padded)
    }
}

/// Tokenizes a host template.
///
/// Identical to [`lex`] except that no `/` padding is applied; host
/// templates have no path separator.
pub fn lex_host(raw: &str) -> Result<Vec<Token>, LexError> {
    scan(raw)
}

fn scan(template: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut bracket_depth = 0usize;
    let mut chars = template.char_indices().peekable();

    while let Some((offset, ch)) = chars.next() {
        match ch {
            '\'' | '"' => {
                flush_text(&mut text, &mut tokens);
                let mut value = String::new();
                let mut terminated = false;
                for (_, quoted) in chars.by_ref() {
                    if quoted == ch {
                        terminated = true;
                        break;
                    }
                    value.push(quoted);
                }
                if !terminated {
                    return Err(LexError::UnterminatedQuote { quote: ch, offset });
                }
                tokens.push(Token::new(TokenKind::QuotedString, value));
            }
            ':' => {
                flush_text(&mut text, &mut tokens);
                let mut name = String::new();
                while let Some(&(_, next)) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        name.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.len() > VARIABLE_NAME_MAX_LENGTH {
                    return Err(LexError::VariableNameTooLong { name, offset });
                }
                // An empty name is lexically fine; the parser rejects it
                // with a pointed error.
                tokens.push(Token::new(TokenKind::Variable, name));
            }
            '[' => {
                bracket_depth += 1;
                flush_text(&mut text, &mut tokens);
                tokens.push(Token::new(TokenKind::Punctuation, "["));
            }
            ']' => {
                if bracket_depth == 0 {
                    return Err(LexError::UnbalancedBrackets { offset });
                }
                bracket_depth -= 1;
                flush_text(&mut text, &mut tokens);
                tokens.push(Token::new(TokenKind::Punctuation, "]"));
            }
            _ if PUNCTUATION.contains(&ch) => {
                flush_text(&mut text, &mut tokens);
                tokens.push(Token::new(TokenKind::Punctuation, ch));
            }
            _ => text.push(ch),
        }
    }

    if bracket_depth != 0 {
        return Err(LexError::UnbalancedBrackets {
            offset: template.len(),
        });
    }
    flush_text(&mut text, &mut tokens);
    Ok(tokens)
}

fn flush_text(buffer: &mut String, tokens: &mut Vec<Token>) {
    if !buffer.is_empty() {
        tokens.push(Token::new(TokenKind::Text, std::mem::take(buffer)));
    }
}
