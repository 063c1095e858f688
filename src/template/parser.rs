use std::fmt;
use std::iter::Peekable;
use std::slice::Iter;

use super::lexer::{Token, TokenKind};

/// Kind of a node in the parsed template tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AstNodeKind {
    /// The synthetic root; its children are the template in order
    Root,
    /// Literal text, including `/` separators
    Text,
    /// A variable; `value` holds the name, children hold defaults and rules
    Variable,
    /// A variable's default value; `value` holds the default
    VariableDefaultValue,
    /// A rule attached to a variable; `value` holds the rule slug
    VariableRule,
    /// The parameter list of a rule; children are `Text` nodes
    VariableRuleParameters,
    /// A `[...]` group that may be omitted from the matched path
    OptionalSegment,
}

/// Node in the parsed template tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstNode {
    pub kind: AstNodeKind,
    pub value: Option<String>,
    pub children: Vec<AstNode>,
}

impl AstNode {
    pub fn new(kind: AstNodeKind, value: Option<String>) -> Self {
        Self {
            kind,
            value,
            children: Vec::new(),
        }
    }

    /// The node's value, or `""` when it has none
    pub fn value_str(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

/// Syntax error in a URI template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A `:` was not followed by a variable name
    EmptyVariableName,
    /// A `[` optional group was never closed
    UnclosedOptionalSegment,
    /// A `]` appeared without a matching `[`
    UnopenedOptionalSegment,
    /// A token appeared where the grammar does not allow it
    UnexpectedToken {
        found: String,
        expected: &'static str,
    },
    /// The template ended mid-construct
    UnexpectedEnd { expected: &'static str },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::EmptyVariableName => {
                write!(f, "`:` must be followed by a variable name")
            }
            ParseError::UnclosedOptionalSegment => {
                write!(f, "optional segment `[` was never closed")
            }
            ParseError::UnopenedOptionalSegment => {
                write!(f, "`]` without a matching `[`")
            }
            ParseError::UnexpectedToken { found, expected } => {
                write!(f, "unexpected `{found}`, expected {expected}")
            }
            ParseError::UnexpectedEnd { expected } => {
                write!(f, "template ended early, expected {expected}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

type TokenStream<'t> = Peekable<Iter<'t, Token>>;

/// Parses a token stream into a template tree rooted at an
/// [`AstNodeKind::Root`] node.
///
/// The grammar is LL(1): each decision looks at most one token ahead.
/// Variables may carry one `=default` and one `(rule, ...)` list, in
/// either order. Optional segments nest.
pub fn parse(tokens: &[Token]) -> Result<AstNode, ParseError> {
    let mut stream = tokens.iter().peekable();
    let mut root = AstNode::new(AstNodeKind::Root, None);
    parse_sequence(&mut stream, &mut root, 0)?;
    Ok(root)
}

/// Parses tokens into `parent.children` until end of input or, when
/// `depth > 0`, a closing `]`.
fn parse_sequence(
    stream: &mut TokenStream<'_>,
    parent: &mut AstNode,
    depth: usize,
) -> Result<(), ParseError> {
    while let Some(token) = stream.next() {
        match token.kind {
            TokenKind::Text | TokenKind::QuotedString => {
                parent
                    .children
                    .push(AstNode::new(AstNodeKind::Text, Some(token.value.clone())));
            }
            TokenKind::Variable => {
                parent.children.push(parse_variable(stream, token)?);
            }
            TokenKind::Punctuation => match token.value.as_str() {
                "[" => {
                    let mut optional = AstNode::new(AstNodeKind::OptionalSegment, None);
                    parse_sequence(stream, &mut optional, depth + 1)?;
                    parent.children.push(optional);
                }
                "]" => {
                    if depth > 0 {
                        return Ok(());
                    }
                    // The lexer balances brackets, so this only fires on
                    // hand-built token streams.
                    return Err(ParseError::UnopenedOptionalSegment);
                }
                // Stray `(`, `)`, `,`, `=` outside a variable, and every
                // `/`, are literal path text.
                other => {
                    parent
                        .children
                        .push(AstNode::new(AstNodeKind::Text, Some(other.to_string())));
                }
            },
        }
    }
    if depth > 0 {
        return Err(ParseError::UnclosedOptionalSegment);
    }
    Ok(())
}

/// Parses the suffix of a variable token: an optional `=default` and an
/// optional `(rule, rule(param, ...))` list, attached as children.
fn parse_variable(stream: &mut TokenStream<'_>, token: &Token) -> Result<AstNode, ParseError> {
    if token.value.is_empty() {
        return Err(ParseError::EmptyVariableName);
    }
    let mut variable = AstNode::new(AstNodeKind::Variable, Some(token.value.clone()));
    let mut has_default = false;
    let mut has_rules = false;
    loop {
        match stream.peek() {
            Some(next) if is_punctuation(next, "=") && !has_default => {
                stream.next();
                let value = stream.next().ok_or(ParseError::UnexpectedEnd {
                    expected: "a default value after `=`",
                })?;
                match value.kind {
                    TokenKind::Text | TokenKind::QuotedString => {
                        variable.children.push(AstNode::new(
                            AstNodeKind::VariableDefaultValue,
                            Some(value.value.clone()),
                        ));
                    }
                    _ => {
                        return Err(ParseError::UnexpectedToken {
                            found: value.value.clone(),
                            expected: "a default value after `=`",
                        });
                    }
                }
                has_default = true;
            }
            Some(next) if is_punctuation(next, "(") && !has_rules => {
                stream.next();
                parse_rules(stream, &mut variable)?;
                has_rules = true;
            }
            _ => break,
        }
    }
    Ok(variable)
}

/// Parses `rule (, rule)* )`, the opening `(` already consumed.
fn parse_rules(stream: &mut TokenStream<'_>, variable: &mut AstNode) -> Result<(), ParseError> {
    loop {
        let name = stream.next().ok_or(ParseError::UnexpectedEnd {
            expected: "a rule name",
        })?;
        if name.kind != TokenKind::Text {
            return Err(ParseError::UnexpectedToken {
                found: name.value.clone(),
                expected: "a rule name",
            });
        }
        let mut rule = AstNode::new(
            AstNodeKind::VariableRule,
            Some(name.value.trim().to_string()),
        );
        if stream.peek().is_some_and(|t| is_punctuation(t, "(")) {
            stream.next();
            rule.children.push(parse_rule_parameters(stream)?);
        }
        variable.children.push(rule);

        let separator = stream.next().ok_or(ParseError::UnexpectedEnd {
            expected: "`,` or `)` in a rule list",
        })?;
        match separator.value.as_str() {
            "," if separator.kind == TokenKind::Punctuation => continue,
            ")" if separator.kind == TokenKind::Punctuation => return Ok(()),
            _ => {
                return Err(ParseError::UnexpectedToken {
                    found: separator.value.clone(),
                    expected: "`,` or `)` in a rule list",
                });
            }
        }
    }
}

/// Parses `param (, param)* )`, the opening `(` already consumed. Bare
/// parameters are trimmed; quoted parameters are kept verbatim.
fn parse_rule_parameters(stream: &mut TokenStream<'_>) -> Result<AstNode, ParseError> {
    let mut parameters = AstNode::new(AstNodeKind::VariableRuleParameters, None);
    if stream.peek().is_some_and(|t| is_punctuation(t, ")")) {
        stream.next();
        return Ok(parameters);
    }
    loop {
        let value = stream.next().ok_or(ParseError::UnexpectedEnd {
            expected: "a rule parameter",
        })?;
        let parameter = match value.kind {
            TokenKind::Text => value.value.trim().to_string(),
            TokenKind::QuotedString => value.value.clone(),
            _ => {
                return Err(ParseError::UnexpectedToken {
                    found: value.value.clone(),
                    expected: "a rule parameter",
                });
            }
        };
        parameters
            .children
            .push(AstNode::new(AstNodeKind::Text, Some(parameter)));

        let separator = stream.next().ok_or(ParseError::UnexpectedEnd {
            expected: "`,` or `)` after a rule parameter",
        })?;
        match separator.value.as_str() {
            "," if separator.kind == TokenKind::Punctuation => continue,
            ")" if separator.kind == TokenKind::Punctuation => return Ok(parameters),
            _ => {
                return Err(ParseError::UnexpectedToken {
                    found: separator.value.clone(),
                    expected: "`,` or `)` after a rule parameter",
                });
            }
        }
    }
}

fn is_punctuation(token: &Token, value: &str) -> bool {
    token.kind == TokenKind::Punctuation && token.value == value
}
