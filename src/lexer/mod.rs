mod cursor;
mod lexer_error;
mod token;

use cursor::Cursor;
pub use lexer_error::{InnerLexError, LexError};
pub use token::{Base, IntegerSuffix, NumberKind, Token, TokenKind};

/// Scanner over one translation unit of preprocessed source.
///
/// Holds exactly one current token. [`current`](Lexer::current) returns it
/// without advancing; [`advance`](Lexer::advance) consumes whitespace and
/// comments, scans the next token and caches it. Before the first `advance`
/// the current token is the [`NotStarted`](TokenKind::NotStarted) sentinel;
/// once `Eof` has been produced, further calls idempotently return `Eof`.
pub struct Lexer<'a> {
    cursor: Cursor<'a>,
    current: Token,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
            current: Token::not_started(),
        }
    }

    pub fn current(&self) -> &Token {
        &self.current
    }

    pub fn advance(&mut self) -> Result<&Token, LexError> {
        if !self.current.is_eof() {
            self.current = scan_token(&mut self.cursor)?;
        }
        Ok(&self.current)
    }

    /// Scans one token past the current one without committing to it.
    /// Needed in the two places the grammar is not LL(1) from the current
    /// token alone: labeled statements and casts.
    pub fn peek_next(&self) -> Result<Token, LexError> {
        if self.current.is_eof() {
            return Ok(self.current.clone());
        }
        let mut cursor = self.cursor.clone();
        scan_token(&mut cursor)
    }
}

/// Convenience driver: the whole buffer as a token vector, `Eof` excluded.
pub fn lex(input: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let mut cursor = Cursor::new(input);

    loop {
        let token = scan_token(&mut cursor)?;
        if token.is_eof() {
            return Ok(tokens);
        }
        tokens.push(token);
    }
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn skip_whitespace_and_comments(cursor: &mut Cursor) -> Result<(), LexError> {
    loop {
        while cursor.skip_if(is_blank) {}

        match (cursor.peek(), cursor.peek_2nd()) {
            (Some('/'), Some('/')) => {
                while cursor.peek().filter(|c| *c != '\n').is_some() {
                    cursor.take();
                }
            }
            (Some('/'), Some('*')) => {
                let (line, column) = (cursor.line(), cursor.column());
                cursor.take();
                cursor.take();
                loop {
                    if cursor.is_eof() {
                        return Err(InnerLexError::UnterminatedComment.set_location(line, column));
                    }
                    if cursor.peek() == Some('*') && cursor.peek_2nd() == Some('/') {
                        cursor.take();
                        cursor.take();
                        break;
                    }
                    cursor.take();
                }
            }
            _ => return Ok(()),
        }
    }
}

fn scan_token(cursor: &mut Cursor) -> Result<Token, LexError> {
    skip_whitespace_and_comments(cursor)?;

    let line = cursor.line();
    let column = cursor.column();
    let set_location = |err: InnerLexError| err.set_location(line, column);

    let Some(peek) = cursor.peek() else {
        return Ok(Token::new(TokenKind::Eof, line, column));
    };

    let (kind, lexeme) = match peek {
        '"' => lex_string_literal(cursor),
        '_' | 'a'..='z' | 'A'..='Z' => Ok(lex_identifier(cursor)),
        '0'..='9' => lex_number(cursor),
        '.' => lex_dot(cursor),
        '+' | '-'
            if matches!(cursor.peek_2nd(), Some(c) if c.is_ascii_digit() || c == '.') =>
        {
            lex_number(cursor)
        }
        _ => lex_operator(cursor),
    }
    .map_err(set_location)?;

    Ok(Token::with_lexeme(kind, lexeme, line, column))
}

fn lex_identifier(cursor: &mut Cursor) -> (TokenKind, String) {
    let mut word = String::new();
    let predicate = |c: char| c.is_ascii_alphanumeric() || c == '_';
    while let Some(c) = cursor.peek().filter(|c| predicate(*c)) {
        word.push(c);
        cursor.take();
    }

    let kind = TokenKind::from(word.as_str());
    if kind == TokenKind::Identifier {
        (kind, word)
    } else {
        (kind, String::new())
    }
}

fn lex_string_literal(cursor: &mut Cursor) -> Result<(TokenKind, String), InnerLexError> {
    cursor.take();

    // interior is kept verbatim; a backslash keeps whatever follows it, so
    // \" does not close the literal
    let mut interior = String::new();
    loop {
        match cursor.take() {
            None => return Err(InnerLexError::UnterminatedString),
            Some('"') => return Ok((TokenKind::StringLiteral, interior)),
            Some('\\') => {
                interior.push('\\');
                let escaped = cursor.take().ok_or(InnerLexError::UnterminatedString)?;
                interior.push(escaped);
            }
            Some(c) => interior.push(c),
        }
    }
}

fn lex_dot(cursor: &mut Cursor) -> Result<(TokenKind, String), InnerLexError> {
    if matches!(cursor.peek_2nd(), Some(c) if c.is_ascii_digit()) {
        return lex_number(cursor);
    }

    cursor.take();
    if cursor.peek() == Some('.') {
        cursor.take();
        if cursor.bump_if('.') {
            return Ok((TokenKind::Ellipsis, String::new()));
        }
        return Err(InnerLexError::UnexpectedChar('.'));
    }

    Ok((TokenKind::Dot, String::new()))
}

/// Trailing alphanumeric run after the digits of a constant.
fn take_suffix_run(cursor: &mut Cursor) -> String {
    let mut run = String::new();
    let predicate = |c: char| c.is_ascii_alphanumeric() || c == '_';
    while let Some(c) = cursor.peek().filter(|c| predicate(*c)) {
        run.push(c);
        cursor.take();
    }
    run
}

fn parse_integer_suffix(run: &str) -> Option<IntegerSuffix> {
    // the two ls of a long-long suffix must agree in case (ll or LL, not lL)
    let mut ls = run.chars().filter(|c| c.eq_ignore_ascii_case(&'l'));
    if let (Some(first), Some(second)) = (ls.next(), ls.next()) {
        if first != second {
            return None;
        }
    }

    match run.to_ascii_lowercase().as_str() {
        "" => Some(IntegerSuffix::None),
        "u" => Some(IntegerSuffix::Unsigned),
        "l" => Some(IntegerSuffix::Long),
        "ul" | "lu" => Some(IntegerSuffix::UnsignedLong),
        "ll" => Some(IntegerSuffix::LongLong),
        "ull" | "llu" => Some(IntegerSuffix::UnsignedLongLong),
        _ => None,
    }
}

fn lex_prefixed_constant(
    cursor: &mut Cursor,
    base: Base,
    lexeme: &mut String,
) -> Result<TokenKind, InnerLexError> {
    // consume the 0x / 0b prefix
    lexeme.push(cursor.take().expect("prefix is present"));
    lexeme.push(cursor.take().expect("prefix is present"));

    let mut digits = 0;
    while let Some(c) = cursor.peek().filter(|c| base.is_digit(*c)) {
        lexeme.push(c);
        cursor.take();
        digits += 1;
    }
    if digits == 0 {
        return Err(InnerLexError::TruncatedConstant(base));
    }

    finish_integer_constant(cursor, base, lexeme)
}

fn lex_octal_constant(cursor: &mut Cursor, lexeme: &mut String) -> Result<TokenKind, InnerLexError> {
    while let Some(c) = cursor.peek().filter(|c| Base::Octal.is_digit(*c)) {
        lexeme.push(c);
        cursor.take();
    }

    finish_integer_constant(cursor, Base::Octal, lexeme)
}

fn finish_integer_constant(
    cursor: &mut Cursor,
    base: Base,
    lexeme: &mut String,
) -> Result<TokenKind, InnerLexError> {
    let run = take_suffix_run(cursor);
    if let Some(first) = run.chars().next().filter(char::is_ascii_digit) {
        return Err(InnerLexError::BadDigit(first, base));
    }
    let suffix =
        parse_integer_suffix(&run).ok_or_else(|| InnerLexError::BadConstantSuffix(run.clone()))?;

    lexeme.push_str(&run);
    Ok(TokenKind::Number(NumberKind::Integer { base, suffix }))
}

fn lex_decimal_constant(
    cursor: &mut Cursor,
    lexeme: &mut String,
) -> Result<TokenKind, InnerLexError> {
    let mut saw_dot = false;
    loop {
        match cursor.peek() {
            Some(c) if c.is_ascii_digit() => {
                lexeme.push(c);
                cursor.take();
            }
            Some('.') => {
                if saw_dot {
                    return Err(InnerLexError::SecondDecimalPoint);
                }
                saw_dot = true;
                lexeme.push('.');
                cursor.take();
            }
            _ => break,
        }
    }

    if saw_dot {
        // float suffixes and exponents are not handled yet
        let run = take_suffix_run(cursor);
        if !run.is_empty() {
            return Err(InnerLexError::BadConstantSuffix(run));
        }
        return Ok(TokenKind::Number(NumberKind::Floating));
    }

    finish_integer_constant(cursor, Base::Decimal, lexeme)
}

fn lex_number(cursor: &mut Cursor) -> Result<(TokenKind, String), InnerLexError> {
    let mut lexeme = String::new();

    // a leading sign right before a digit or dot belongs to the constant
    if let Some(sign @ ('+' | '-')) = cursor.peek() {
        lexeme.push(sign);
        cursor.take();
    }

    let kind = match (cursor.peek(), cursor.peek_2nd()) {
        (Some('0'), Some('x' | 'X')) => lex_prefixed_constant(cursor, Base::Hexadecimal, &mut lexeme),
        (Some('0'), Some('b')) => lex_prefixed_constant(cursor, Base::Binary, &mut lexeme),
        (Some('0'), Some(c)) if c.is_ascii_digit() => lex_octal_constant(cursor, &mut lexeme),
        _ => lex_decimal_constant(cursor, &mut lexeme),
    }?;

    Ok((kind, lexeme))
}

fn lex_mcharop3(first: char, second: char, third: char) -> Option<TokenKind> {
    match (first, second, third) {
        ('<', '<', '=') => Some(TokenKind::ShiftLeftEquals),
        ('>', '>', '=') => Some(TokenKind::ShiftRightEquals),
        _ => None,
    }
}

fn lex_mcharop2(first: char, second: char) -> Option<TokenKind> {
    match (first, second) {
        ('+', '+') => Some(TokenKind::PlusPlus),
        ('-', '-') => Some(TokenKind::MinusMinus),
        ('&', '&') => Some(TokenKind::LogicalAnd),
        ('|', '|') => Some(TokenKind::LogicalOr),
        ('=', '=') => Some(TokenKind::DoubleEquals),
        ('!', '=') => Some(TokenKind::NotEquals),
        ('<', '=') => Some(TokenKind::LessThanOrEqualTo),
        ('>', '=') => Some(TokenKind::GreaterThanOrEqualTo),
        ('<', '<') => Some(TokenKind::ShiftLeft),
        ('>', '>') => Some(TokenKind::ShiftRight),
        ('+', '=') => Some(TokenKind::PlusEquals),
        ('-', '=') => Some(TokenKind::MinusEquals),
        ('*', '=') => Some(TokenKind::StarEquals),
        ('/', '=') => Some(TokenKind::SlashEquals),
        ('%', '=') => Some(TokenKind::PercentEquals),
        ('&', '=') => Some(TokenKind::AmpersandEquals),
        ('|', '=') => Some(TokenKind::PipeEquals),
        ('^', '=') => Some(TokenKind::CaretEquals),
        ('-', '>') => Some(TokenKind::Arrow),
        _ => None,
    }
}

/// Maximal-munch operator scan: longest of the 3-, 2- and 1-character
/// operators that matches wins.
fn lex_operator(cursor: &mut Cursor) -> Result<(TokenKind, String), InnerLexError> {
    let first = cursor.take().expect("caller checked for a character");

    if let (Some(second), Some(third)) = (cursor.peek(), cursor.peek_2nd()) {
        if let Some(op) = lex_mcharop3(first, second, third) {
            cursor.take();
            cursor.take();
            return Ok((op, String::new()));
        }
    }

    if let Some(second) = cursor.peek() {
        if let Some(op) = lex_mcharop2(first, second) {
            cursor.take();
            return Ok((op, String::new()));
        }
    }

    TokenKind::try_from(first).map(|kind| (kind, String::new()))
}
