use super::token::Base;
use std::{error, fmt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InnerLexError {
    UnexpectedChar(char),
    BadDigit(char, Base),
    TruncatedConstant(Base),
    SecondDecimalPoint,
    BadConstantSuffix(String),
    UnterminatedString,
    UnterminatedComment,
}

/// A lexical error with the 0-based position it was detected at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    inner: InnerLexError,
    line: u32,
    column: u32,
}

impl LexError {
    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn inner(&self) -> &InnerLexError {
        &self.inner
    }
}

impl InnerLexError {
    pub(super) fn set_location(self, line: u32, column: u32) -> LexError {
        LexError {
            inner: self,
            line,
            column,
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl fmt::Display for InnerLexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnexpectedChar(c) => write!(f, "unexpected character: {c}"),
            Self::BadDigit(c, base) => {
                write!(f, "bad digit {c} for base-{} constant", base.radix())
            }
            Self::TruncatedConstant(base) => {
                write!(f, "base-{} constant with no digits", base.radix())
            }
            Self::SecondDecimalPoint => write!(f, "second decimal point in constant"),
            Self::BadConstantSuffix(s) => write!(f, "bad constant suffix: {s}"),
            Self::UnterminatedString => write!(f, "unterminated string literal"),
            Self::UnterminatedComment => write!(f, "unterminated block comment"),
        }
    }
}

impl error::Error for InnerLexError {}
impl error::Error for LexError {}
