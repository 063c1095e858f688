//! # URI Template Module
//!
//! Lexing and parsing for route URI templates. A template describes one
//! path (or host) shape, with typed variables, defaults, and optional
//! segments:
//!
//! ```text
//! /users/:id(int)
//! /books/:bookId[/chapters/:chapterId]
//! /archive/:year(numeric)[/:month(between(1,12))]
//! /users/:id=me
//! ```
//!
//! ## Pipeline
//!
//! [`lex`] turns the raw template into a flat token stream; [`parse`]
//! turns the tokens into a small tree ([`AstNode`]) that the trie
//! compiler consumes. Both stages are pure functions with no knowledge
//! of routes or rules; unknown rule slugs are a compile-time concern,
//! not a parse-time one.
//!
//! ## Grammar notes
//!
//! - `:name` introduces a variable. Names are ASCII alphanumerics and
//!   `_`, at most [`VARIABLE_NAME_MAX_LENGTH`] characters.
//! - `:name=default` gives the variable a default value, used when an
//!   optional segment containing the variable is not present in the
//!   matched path.
//! - `:name(rule1, rule2(p1, p2))` attaches validation rules.
//! - `[...]` marks an optional group; groups nest.
//! - `'...'` and `"..."` quote text that would otherwise lex as
//!   punctuation.
//! - `.` and `-` are ordinary text, so host templates like
//!   `:tenant.example.com` need no quoting.

mod lexer;
mod parser;

pub use lexer::{lex, lex_host, LexError, Token, TokenKind, VARIABLE_NAME_MAX_LENGTH};
pub use parser::{parse, AstNode, AstNodeKind, ParseError};

use std::fmt;

/// Either kind of template syntax error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    Lex(LexError),
    Parse(ParseError),
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::Lex(e) => write!(f, "{e}"),
            TemplateError::Parse(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TemplateError::Lex(e) => Some(e),
            TemplateError::Parse(e) => Some(e),
        }
    }
}

impl From<LexError> for TemplateError {
    fn from(e: LexError) -> Self {
        TemplateError::Lex(e)
    }
}

impl From<ParseError> for TemplateError {
    fn from(e: ParseError) -> Self {
        TemplateError::Parse(e)
    }
}

/// Lexes and parses a path template in one step.
pub fn parse_path(raw: &str) -> Result<AstNode, TemplateError> {
    let tokens = lex(raw)?;
    Ok(parse(&tokens)?)
}

/// Lexes and parses a host template in one step.
pub fn parse_host(raw: &str) -> Result<AstNode, TemplateError> {
    let tokens = lex_host(raw)?;
    Ok(parse(&tokens)?)
}
