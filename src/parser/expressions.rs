//! Expressions, C11 6.5: the 16 precedence levels by recursive descent.
//!
//! Each left-recursive production of the standard is rewritten as
//! `next_level ( operator next_level )*`, which yields left-associative
//! trees by iteration; the conditional and assignment levels recurse on
//! their own level instead and come out right-associative.

use super::declarations::{parse_type_name, token_starts_type_name};
use super::parse_error::{InnerParseError, Result};
use super::{bump, bump_if, err_here, expect, expect_identifier};
use crate::ast::*;
use crate::lexer::{Base, IntegerSuffix, Lexer, NumberKind, TokenKind};

/// `expression: assignment-expression ( , assignment-expression )*`
pub fn parse_expression(lexer: &mut Lexer, scope: &Scope) -> Result<Exp> {
    let mut root = parse_assignment_expression(lexer, scope)?;
    while bump_if(lexer, TokenKind::Comma)? {
        let rhs = parse_assignment_expression(lexer, scope)?;
        root = Exp::comma(root, rhs);
    }
    Ok(root)
}

fn assign_op_for(kind: TokenKind) -> Option<AssignOp> {
    let op = match kind {
        TokenKind::Equals => AssignOp::Assign,
        TokenKind::PlusEquals => AssignOp::Add,
        TokenKind::MinusEquals => AssignOp::Subtract,
        TokenKind::StarEquals => AssignOp::Multiply,
        TokenKind::SlashEquals => AssignOp::Divide,
        TokenKind::PercentEquals => AssignOp::Modulo,
        TokenKind::AmpersandEquals => AssignOp::And,
        TokenKind::PipeEquals => AssignOp::Or,
        TokenKind::CaretEquals => AssignOp::Xor,
        TokenKind::ShiftLeftEquals => AssignOp::ShiftLeft,
        TokenKind::ShiftRightEquals => AssignOp::ShiftRight,
        _ => return None,
    };
    Some(op)
}

/// `assignment-expression: conditional-expression
///                       | unary-expression assignment-operator assignment-expression`
///
/// Grammatically the left operand is a unary-expression; it is parsed as a
/// conditional-expression here and lvalue-ness is left to later analysis,
/// the usual recursive-descent shortcut.
pub fn parse_assignment_expression(lexer: &mut Lexer, scope: &Scope) -> Result<Exp> {
    let left = parse_conditional_expression(lexer, scope)?;

    let Some(op) = assign_op_for(lexer.current().kind) else {
        return Ok(left);
    };
    bump(lexer)?;

    let right = parse_assignment_expression(lexer, scope)?;
    Ok(Exp::assignment(op, left, right))
}

/// `conditional-expression: logical-or ( ? expression : conditional )?`
pub fn parse_conditional_expression(lexer: &mut Lexer, scope: &Scope) -> Result<Exp> {
    let condition = parse_logical_or_expression(lexer, scope)?;

    if !bump_if(lexer, TokenKind::QuestionMark)? {
        return Ok(condition);
    }
    let then = parse_expression(lexer, scope)?;
    expect(lexer, TokenKind::Colon)?;
    let els = parse_conditional_expression(lexer, scope)?;

    Ok(Exp::conditional(condition, then, els))
}

fn parse_logical_or_expression(lexer: &mut Lexer, scope: &Scope) -> Result<Exp> {
    let mut root = parse_logical_and_expression(lexer, scope)?;
    while bump_if(lexer, TokenKind::LogicalOr)? {
        let rhs = parse_logical_and_expression(lexer, scope)?;
        root = Exp::binary(BinaryOp::LogicalOr, root, rhs);
    }
    Ok(root)
}

fn parse_logical_and_expression(lexer: &mut Lexer, scope: &Scope) -> Result<Exp> {
    let mut root = parse_bitwise_or_expression(lexer, scope)?;
    while bump_if(lexer, TokenKind::LogicalAnd)? {
        let rhs = parse_bitwise_or_expression(lexer, scope)?;
        root = Exp::binary(BinaryOp::LogicalAnd, root, rhs);
    }
    Ok(root)
}

fn parse_bitwise_or_expression(lexer: &mut Lexer, scope: &Scope) -> Result<Exp> {
    let mut root = parse_bitwise_xor_expression(lexer, scope)?;
    while bump_if(lexer, TokenKind::Pipe)? {
        let rhs = parse_bitwise_xor_expression(lexer, scope)?;
        root = Exp::binary(BinaryOp::BitwiseOr, root, rhs);
    }
    Ok(root)
}

fn parse_bitwise_xor_expression(lexer: &mut Lexer, scope: &Scope) -> Result<Exp> {
    let mut root = parse_bitwise_and_expression(lexer, scope)?;
    while bump_if(lexer, TokenKind::Caret)? {
        let rhs = parse_bitwise_and_expression(lexer, scope)?;
        root = Exp::binary(BinaryOp::BitwiseXor, root, rhs);
    }
    Ok(root)
}

fn parse_bitwise_and_expression(lexer: &mut Lexer, scope: &Scope) -> Result<Exp> {
    let mut root = parse_equality_expression(lexer, scope)?;
    while bump_if(lexer, TokenKind::Ampersand)? {
        let rhs = parse_equality_expression(lexer, scope)?;
        root = Exp::binary(BinaryOp::BitwiseAnd, root, rhs);
    }
    Ok(root)
}

fn parse_equality_expression(lexer: &mut Lexer, scope: &Scope) -> Result<Exp> {
    let mut root = parse_relational_expression(lexer, scope)?;
    loop {
        let op = match lexer.current().kind {
            TokenKind::DoubleEquals => BinaryOp::Equal,
            TokenKind::NotEquals => BinaryOp::NotEqual,
            _ => return Ok(root),
        };
        bump(lexer)?;
        let rhs = parse_relational_expression(lexer, scope)?;
        root = Exp::binary(op, root, rhs);
    }
}

fn parse_relational_expression(lexer: &mut Lexer, scope: &Scope) -> Result<Exp> {
    let mut root = parse_shift_expression(lexer, scope)?;
    loop {
        let op = match lexer.current().kind {
            TokenKind::LessThan => BinaryOp::LessThan,
            TokenKind::GreaterThan => BinaryOp::GreaterThan,
            TokenKind::LessThanOrEqualTo => BinaryOp::LessThanOrEqual,
            TokenKind::GreaterThanOrEqualTo => BinaryOp::GreaterThanOrEqual,
            _ => return Ok(root),
        };
        bump(lexer)?;
        let rhs = parse_shift_expression(lexer, scope)?;
        root = Exp::binary(op, root, rhs);
    }
}

fn parse_shift_expression(lexer: &mut Lexer, scope: &Scope) -> Result<Exp> {
    let mut root = parse_additive_expression(lexer, scope)?;
    loop {
        let op = match lexer.current().kind {
            TokenKind::ShiftLeft => BinaryOp::ShiftLeft,
            TokenKind::ShiftRight => BinaryOp::ShiftRight,
            _ => return Ok(root),
        };
        bump(lexer)?;
        let rhs = parse_additive_expression(lexer, scope)?;
        root = Exp::binary(op, root, rhs);
    }
}

fn parse_additive_expression(lexer: &mut Lexer, scope: &Scope) -> Result<Exp> {
    let mut root = parse_multiplicative_expression(lexer, scope)?;
    loop {
        let op = match lexer.current().kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Subtract,
            _ => return Ok(root),
        };
        bump(lexer)?;
        let rhs = parse_multiplicative_expression(lexer, scope)?;
        root = Exp::binary(op, root, rhs);
    }
}

fn parse_multiplicative_expression(lexer: &mut Lexer, scope: &Scope) -> Result<Exp> {
    let mut root = parse_cast_expression(lexer, scope)?;
    loop {
        let op = match lexer.current().kind {
            TokenKind::Asterisk => BinaryOp::Multiply,
            TokenKind::ForwardSlash => BinaryOp::Divide,
            TokenKind::Percent => BinaryOp::Modulo,
            _ => return Ok(root),
        };
        bump(lexer)?;
        let rhs = parse_cast_expression(lexer, scope)?;
        root = Exp::binary(op, root, rhs);
    }
}

/// `cast-expression: unary-expression | ( type-name ) cast-expression`
///
/// A `(` opens a cast only when the token after it can begin a type name;
/// otherwise it is a parenthesized expression and falls through to unary.
fn parse_cast_expression(lexer: &mut Lexer, scope: &Scope) -> Result<Exp> {
    if lexer.current().kind == TokenKind::LParen
        && token_starts_type_name(&lexer.peek_next()?, scope)
    {
        bump(lexer)?;
        let ty = parse_type_name(lexer, scope)?;
        expect(lexer, TokenKind::RParen)?;

        if lexer.current().kind == TokenKind::LBrace {
            return err_here(lexer, InnerParseError::Unimplemented("compound literals"));
        }

        let inner = parse_cast_expression(lexer, scope)?;
        return Ok(Exp::Cast(ty, Box::new(inner)));
    }

    parse_unary_expression(lexer, scope)
}

/// `unary-expression: postfix | ++/-- unary | unary-operator cast
///                  | sizeof unary | sizeof (type) | _Alignof (type)`
fn parse_unary_expression(lexer: &mut Lexer, scope: &Scope) -> Result<Exp> {
    let prefix_op = match lexer.current().kind {
        TokenKind::PlusPlus => Some(UnaryOp::PrefixIncrement),
        TokenKind::MinusMinus => Some(UnaryOp::PrefixDecrement),
        _ => None,
    };
    if let Some(op) = prefix_op {
        bump(lexer)?;
        let inner = parse_unary_expression(lexer, scope)?;
        return Ok(Exp::unary(op, inner));
    }

    let cast_op = match lexer.current().kind {
        TokenKind::Ampersand => Some(UnaryOp::AddressOf),
        TokenKind::Asterisk => Some(UnaryOp::Dereference),
        TokenKind::Plus => Some(UnaryOp::Plus),
        TokenKind::Minus => Some(UnaryOp::Negate),
        TokenKind::Tilde => Some(UnaryOp::Complement),
        TokenKind::Bang => Some(UnaryOp::LogicalNot),
        _ => None,
    };
    if let Some(op) = cast_op {
        bump(lexer)?;
        let inner = parse_cast_expression(lexer, scope)?;
        return Ok(Exp::unary(op, inner));
    }

    match lexer.current().kind {
        TokenKind::SizeOf => parse_sizeof(lexer, scope),
        TokenKind::AlignOf => parse_alignof(lexer, scope),
        _ => parse_postfix_expression(lexer, scope),
    }
}

fn parse_sizeof(lexer: &mut Lexer, scope: &Scope) -> Result<Exp> {
    expect(lexer, TokenKind::SizeOf)?;

    if lexer.current().kind == TokenKind::LParen
        && token_starts_type_name(&lexer.peek_next()?, scope)
    {
        bump(lexer)?;
        let ty = parse_type_name(lexer, scope)?;
        expect(lexer, TokenKind::RParen)?;
        return Ok(Exp::SizeOfType(ty));
    }

    let inner = parse_unary_expression(lexer, scope)?;
    Ok(Exp::SizeOfExp(Box::new(inner)))
}

fn parse_alignof(lexer: &mut Lexer, scope: &Scope) -> Result<Exp> {
    expect(lexer, TokenKind::AlignOf)?;
    expect(lexer, TokenKind::LParen)?;
    let ty = parse_type_name(lexer, scope)?;
    expect(lexer, TokenKind::RParen)?;
    Ok(Exp::AlignOfType(ty))
}

/// `postfix-expression: primary ( [exp] | (args) | .id | ->id | ++ | -- )*`
fn parse_postfix_expression(lexer: &mut Lexer, scope: &Scope) -> Result<Exp> {
    let mut root = parse_primary_expression(lexer, scope)?;

    loop {
        root = match lexer.current().kind {
            TokenKind::LBracket => {
                bump(lexer)?;
                let index = parse_expression(lexer, scope)?;
                expect(lexer, TokenKind::RBracket)?;
                Exp::Index(Box::new(root), Box::new(index))
            }
            TokenKind::LParen => {
                bump(lexer)?;
                let arguments = parse_argument_list(lexer, scope)?;
                expect(lexer, TokenKind::RParen)?;
                Exp::Call(Box::new(root), arguments)
            }
            TokenKind::Dot => {
                bump(lexer)?;
                let member = expect_identifier(lexer)?;
                Exp::Member(Box::new(root), member)
            }
            TokenKind::Arrow => {
                bump(lexer)?;
                let member = expect_identifier(lexer)?;
                Exp::Arrow(Box::new(root), member)
            }
            TokenKind::PlusPlus => {
                bump(lexer)?;
                Exp::unary(UnaryOp::PostfixIncrement, root)
            }
            TokenKind::MinusMinus => {
                bump(lexer)?;
                Exp::unary(UnaryOp::PostfixDecrement, root)
            }
            _ => return Ok(root),
        };
    }
}

fn parse_argument_list(lexer: &mut Lexer, scope: &Scope) -> Result<Vec<Exp>> {
    let mut arguments = Vec::new();
    if lexer.current().kind == TokenKind::RParen {
        return Ok(arguments);
    }
    loop {
        arguments.push(parse_assignment_expression(lexer, scope)?);
        if !bump_if(lexer, TokenKind::Comma)? {
            return Ok(arguments);
        }
    }
}

/// `primary-expression: identifier | constant | string-literal | (expression)`
fn parse_primary_expression(lexer: &mut Lexer, scope: &Scope) -> Result<Exp> {
    match lexer.current().kind {
        TokenKind::Number(kind) => parse_number(lexer, kind),
        TokenKind::StringLiteral => {
            let literal = lexer.current().lexeme.clone();
            bump(lexer)?;
            Ok(Exp::StringLiteral(literal))
        }
        TokenKind::Identifier => {
            let name = lexer.current().lexeme.clone();
            let Some(object) = scope.lookup(&name) else {
                return err_here(lexer, InnerParseError::UndeclaredIdentifier(name));
            };
            bump(lexer)?;
            Ok(Exp::Var(object))
        }
        TokenKind::LParen => {
            bump(lexer)?;
            let exp = parse_expression(lexer, scope)?;
            expect(lexer, TokenKind::RParen)?;
            Ok(exp)
        }
        TokenKind::Generic => {
            err_here(lexer, InnerParseError::Unimplemented("_Generic selections"))
        }
        got => err_here(lexer, InnerParseError::BadPrimaryExpression(got)),
    }
}

/// Digests a numeric-literal lexeme per the base detected at lex time and
/// the integer-suffix tag: value = value * base + digit, then the suffix
/// picks the fundamental type. An unsuffixed constant takes `int` when it
/// fits and widens to `long` otherwise.
fn parse_number(lexer: &mut Lexer, kind: NumberKind) -> Result<Exp> {
    let token = lexer.current().clone();
    let bad = |lexer: &Lexer| {
        err_here::<Exp>(lexer, InnerParseError::BadNumericLiteral(token.lexeme.clone()))
    };

    let constant = match kind {
        NumberKind::Floating => match token.lexeme.parse::<f64>() {
            Ok(value) => Constant::Double(value),
            Err(_) => return bad(lexer),
        },
        NumberKind::Integer { base, suffix } => {
            let mut digits = token.lexeme.as_str();
            let negative = digits.starts_with('-');
            digits = digits.trim_start_matches(['+', '-']);
            digits = match base {
                Base::Hexadecimal | Base::Binary => &digits[2..],
                Base::Octal | Base::Decimal => digits,
            };
            let digits = digits.trim_end_matches(['u', 'U', 'l', 'L']);

            let Ok(magnitude) = u64::from_str_radix(digits, base.radix()) else {
                return bad(lexer);
            };
            let signed = if negative {
                (magnitude as i64).wrapping_neg()
            } else {
                magnitude as i64
            };

            match suffix {
                IntegerSuffix::None => {
                    if i32::try_from(signed).is_ok() {
                        Constant::Int(signed as i32)
                    } else {
                        Constant::Long(signed)
                    }
                }
                IntegerSuffix::Unsigned => {
                    if u32::try_from(magnitude).is_ok() {
                        Constant::UnsignedInt(magnitude as u32)
                    } else {
                        Constant::UnsignedLong(magnitude)
                    }
                }
                IntegerSuffix::Long => Constant::Long(signed),
                IntegerSuffix::UnsignedLong => Constant::UnsignedLong(magnitude),
                IntegerSuffix::LongLong => Constant::LongLong(signed),
                IntegerSuffix::UnsignedLongLong => Constant::UnsignedLongLong(magnitude),
            }
        }
    };

    bump(lexer)?;
    Ok(Exp::Constant(constant))
}
