use crate::ast::Identifier;
use crate::lexer::{InnerLexError, LexError, TokenKind};
use crate::types::SpecifierError;
use std::{error, fmt};

pub type Result<T> = std::result::Result<T, ParseError>;

#[derive(Debug, Clone, PartialEq)]
pub enum InnerParseError {
    /// the parser pulls tokens on demand, so lexical errors surface here
    Lex(InnerLexError),
    ExpectedButGot(TokenKind, TokenKind),
    ExpectedIdentifier(TokenKind),
    UnexpectedToken(TokenKind),
    BadPrimaryExpression(TokenKind),
    BadNumericLiteral(String),
    UndeclaredIdentifier(Identifier),
    FunctionDeclaratorInBlockScope(Identifier),
    BodyOnNonFunction(Identifier),
    VariadicMarkerNotLast,
    Specifier(SpecifierError),
    Unimplemented(&'static str),
}

/// A parse error with the 0-based position of the token it was detected at.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub inner: InnerParseError,
    line: u32,
    column: u32,
}

impl ParseError {
    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }
}

impl InnerParseError {
    pub fn set_location(self, line: u32, column: u32) -> ParseError {
        ParseError {
            inner: self,
            line,
            column,
        }
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        InnerParseError::Lex(err.inner().clone()).set_location(err.line(), err.column())
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl fmt::Display for InnerParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use InnerParseError as PE;
        match self {
            PE::Lex(inner) => write!(f, "{inner}"),
            PE::ExpectedButGot(expected, got) => {
                write!(f, "expected token {expected:?}, but got {got:?}")
            }
            PE::ExpectedIdentifier(got) => write!(f, "expected identifier, but got {got:?}"),
            PE::UnexpectedToken(t) => write!(f, "unexpected token {t:?}"),
            PE::BadPrimaryExpression(t) => {
                write!(f, "expected a primary expression, but got {t:?}")
            }
            PE::BadNumericLiteral(s) => write!(f, "bad numeric literal {s}"),
            PE::UndeclaredIdentifier(name) => write!(f, "use of undeclared identifier {name}"),
            PE::FunctionDeclaratorInBlockScope(name) => {
                write!(f, "function {name} declared outside file scope")
            }
            PE::BodyOnNonFunction(name) => {
                write!(f, "compound statement after non-function declarator {name}")
            }
            PE::VariadicMarkerNotLast => {
                write!(f, "variadic marker must be the last parameter")
            }
            PE::Specifier(err) => write!(f, "{err}"),
            PE::Unimplemented(what) => write!(f, "{what} are not implemented"),
        }
    }
}

impl error::Error for InnerParseError {}
impl error::Error for ParseError {}
