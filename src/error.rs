//! The three error categories the interpreter can raise, unified behind a
//! single `LasError` that knows how to render itself as `file:line:col: message`.

use std::fmt;

use crate::span::Span;
use crate::token::{Token, TokenKind};
use crate::types::Type;

#[derive(Debug)]
pub enum LexErrorKind {
    UnexpectedChar(char),
    UnclosedStringLiteral,
    UnclosedCharLiteral,
    InvalidEscapeSequence(char),
    InvalidCharLiteral,
    ForbiddenCharacterInStringLiteral(char),
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexErrorKind::UnexpectedChar(c) => write!(f, "unexpected character '{c}'"),
            LexErrorKind::UnclosedStringLiteral => write!(f, "unclosed string literal"),
            LexErrorKind::UnclosedCharLiteral => write!(f, "unclosed character literal"),
            LexErrorKind::InvalidEscapeSequence(c) => write!(f, "invalid escape sequence '\\{c}'"),
            LexErrorKind::InvalidCharLiteral => write!(f, "invalid character literal"),
            LexErrorKind::ForbiddenCharacterInStringLiteral(c) => {
                write!(f, "forbidden character '{c}' in string literal")
            }
        }
    }
}

#[derive(Debug)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
}

#[derive(Debug)]
pub struct ParseError {
    pub token: Token,
}

impl ParseError {
    pub fn unexpected(token: Token) -> Self {
        Self { token }
    }
}

/// Non-local exits used to implement `break`/`continue`/`return`. These must
/// never escape the construct that can catch them; if they do, the driver
/// reports them as a runtime error naming the offending keyword's location.
pub enum Signal {
    Break(Span),
    Continue(Span),
    Return(Span, crate::value::Value),
    Error(RuntimeError),
}

impl From<RuntimeError> for Signal {
    fn from(e: RuntimeError) -> Self {
        Signal::Error(e)
    }
}

#[derive(Debug)]
pub enum RuntimeErrorKind {
    OperationNotSupportedByType { op: String, types: Vec<String> },
    CastError { target: String, from: String },
    SymbolRedefinition { name: String },
    UndefinedReference { name: String },
    UnknownType { name: String },
    TypeMismatch { expected: String, actual: String },
    ReturnTypeMismatch { expected: String, actual: String },
    FailedAssertion { text: String },
    UnableToSubscript { index_type: String, base_type: String },
    IndexOutOfBounds { index: i32, size: usize },
    LvalueRequired,
    WrongNumberOfArguments { name: String, expected: usize, actual: usize },
    WrongArgumentType { name: String, param: String, found: String },
    NoSuchMember { member: String, type_name: String },
    InvalidIntegerValue { text: String },
    DivisionByZero,
    DanglingControlFlow { keyword: &'static str },
    Io { message: String },
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeErrorKind::OperationNotSupportedByType { op, types } => write!(
                f,
                "operation '{}' cannot be applied to type(s) '{}'",
                op,
                types.join(", ")
            ),
            RuntimeErrorKind::CastError { target, from } => {
                write!(f, "cannot cast value of type '{from}' to '{target}'")
            }
            RuntimeErrorKind::SymbolRedefinition { name } => {
                write!(f, "redefinition of variable '{name}'")
            }
            RuntimeErrorKind::UndefinedReference { name } => {
                write!(f, "undefined reference to name '{name}'")
            }
            RuntimeErrorKind::UnknownType { name } => write!(f, "unknown type '{name}'"),
            RuntimeErrorKind::TypeMismatch { expected, actual } => {
                write!(f, "type mismatch: expected '{expected}', got '{actual}'")
            }
            RuntimeErrorKind::ReturnTypeMismatch { expected, actual } => write!(
                f,
                "return type mismatch: expected '{expected}', got '{actual}'"
            ),
            RuntimeErrorKind::FailedAssertion { text } => {
                write!(f, "assertion failed, '{text}' did not hold true")
            }
            RuntimeErrorKind::UnableToSubscript { index_type, base_type } => write!(
                f,
                "cannot subscript value of type '{base_type}' with index of type '{index_type}'"
            ),
            RuntimeErrorKind::IndexOutOfBounds { index, size } => {
                write!(f, "index {index} out of bounds for length {size}")
            }
            RuntimeErrorKind::LvalueRequired => write!(f, "left-hand side of assignment must be an lvalue"),
            RuntimeErrorKind::WrongNumberOfArguments { name, expected, actual } => write!(
                f,
                "'{name}' expects {expected} argument(s), got {actual}"
            ),
            RuntimeErrorKind::WrongArgumentType { name, param, found } => write!(
                f,
                "'{name}': argument '{param}' has wrong type '{found}'"
            ),
            RuntimeErrorKind::NoSuchMember { member, type_name } => {
                write!(f, "type '{type_name}' has no member '{member}'")
            }
            RuntimeErrorKind::InvalidIntegerValue { text } => {
                write!(f, "'{text}' is not a valid integer value")
            }
            RuntimeErrorKind::DivisionByZero => write!(f, "division by zero"),
            RuntimeErrorKind::DanglingControlFlow { keyword } => {
                write!(f, "'{keyword}' used outside of its enclosing construct")
            }
            RuntimeErrorKind::Io { message } => write!(f, "I/O error: {message}"),
        }
    }
}

#[derive(Debug)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub span: Span,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn operation_not_supported(op: &str, types: &[&str], span: Span) -> Self {
        Self::new(
            RuntimeErrorKind::OperationNotSupportedByType {
                op: op.to_string(),
                types: types.iter().map(|s| s.to_string()).collect(),
            },
            span,
        )
    }

    pub fn type_mismatch(expected: &Type, actual: &Type, span: Span) -> Self {
        Self::new(
            RuntimeErrorKind::TypeMismatch { expected: expected.to_string(), actual: actual.to_string() },
            span,
        )
    }
}

/// The union of every error the pipeline can produce, rendered identically
/// at the top level: a blank line, then `file:line:col: message`.
#[derive(Debug)]
pub enum LasError {
    Lex(LexError),
    Parse(ParseError),
    Runtime(RuntimeError),
}

impl From<LexError> for LasError {
    fn from(e: LexError) -> Self {
        LasError::Lex(e)
    }
}

impl From<ParseError> for LasError {
    fn from(e: ParseError) -> Self {
        LasError::Parse(e)
    }
}

impl From<RuntimeError> for LasError {
    fn from(e: RuntimeError) -> Self {
        LasError::Runtime(e)
    }
}

impl fmt::Display for LasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LasError::Lex(e) => write!(f, "{}: {}", e.span, e.kind),
            LasError::Parse(e) => {
                let found = describe_token(&e.token.kind);
                write!(f, "{}: unexpected token {found}", e.token.span)
            }
            LasError::Runtime(e) => write!(f, "{}: {}", e.span, e.kind),
        }
    }
}

fn describe_token(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Identifier(name) => format!("'{name}'"),
        TokenKind::Integer(n) => format!("'{n}'"),
        TokenKind::StringLiteral(s) => format!("'\"{s}\"'"),
        TokenKind::CharLiteral(c) => format!("'{}'", *c as char),
        TokenKind::EndOfInput => "end of input".to_string(),
        other => format!("'{other:?}'"),
    }
}
