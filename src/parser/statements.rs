//! Statements, C11 6.8: labeled, compound, expression, selection,
//! iteration and jump statements. Compound statements open a child scope;
//! return statements capture the scope they appear in so emission can
//! recover the enclosing function's return type.

use super::declarations::{parse_declaration, token_is_declaration_specifier};
use super::expressions::{parse_conditional_expression, parse_expression};
use super::parse_error::Result;
use super::{bump, bump_if, expect, expect_identifier};
use crate::ast::*;
use crate::lexer::{Lexer, TokenKind};

pub fn parse_statement(lexer: &mut Lexer, scope: &Scope) -> Result<Statement> {
    // one token of lookahead tells `label:` apart from an expression
    // statement beginning with an identifier
    if lexer.current().kind == TokenKind::Identifier
        && lexer.peek_next()?.kind == TokenKind::Colon
    {
        return parse_labeled_statement(lexer, scope);
    }

    match lexer.current().kind {
        TokenKind::Case => parse_case(lexer, scope),
        TokenKind::Default => parse_default_case(lexer, scope),
        TokenKind::LBrace => {
            let block = parse_block(lexer, &scope.child())?;
            Ok(Statement::Compound(block))
        }
        TokenKind::If => parse_if(lexer, scope),
        TokenKind::Switch => parse_switch(lexer, scope),
        TokenKind::While => parse_while(lexer, scope),
        TokenKind::Do => parse_dowhile(lexer, scope),
        TokenKind::For => parse_for(lexer, scope),
        TokenKind::Goto => parse_goto(lexer),
        TokenKind::Continue => {
            bump(lexer)?;
            expect(lexer, TokenKind::Semicolon)?;
            Ok(Statement::Continue)
        }
        TokenKind::Break => {
            bump(lexer)?;
            expect(lexer, TokenKind::Semicolon)?;
            Ok(Statement::Break)
        }
        TokenKind::Return => parse_return(lexer, scope),
        TokenKind::Semicolon => {
            bump(lexer)?;
            Ok(Statement::Null)
        }
        _ => parse_expression_statement(lexer, scope),
    }
}

/// `compound-statement: { ( declaration | statement )* }`
///
/// The caller supplies the scope the block runs in; for a plain `{` that is
/// a fresh child, for a function body it is the parameter-seeded body scope.
pub(super) fn parse_block(lexer: &mut Lexer, scope: &Scope) -> Result<Block> {
    expect(lexer, TokenKind::LBrace)?;

    let mut items = Vec::new();
    while !bump_if(lexer, TokenKind::RBrace)? {
        let item = if token_is_declaration_specifier(lexer.current(), scope) {
            parse_declaration(lexer, scope).map(BlockItem::Declaration)?
        } else {
            parse_statement(lexer, scope).map(BlockItem::Statement)?
        };
        items.push(item);
    }

    Ok(Block { items })
}

fn parse_labeled_statement(lexer: &mut Lexer, scope: &Scope) -> Result<Statement> {
    let label = expect_identifier(lexer)?;
    expect(lexer, TokenKind::Colon)?;
    let statement = parse_statement(lexer, scope).map(Box::new)?;
    Ok(Statement::Labeled(label, statement))
}

fn parse_case(lexer: &mut Lexer, scope: &Scope) -> Result<Statement> {
    expect(lexer, TokenKind::Case)?;
    let exp = parse_conditional_expression(lexer, scope)?;
    expect(lexer, TokenKind::Colon)?;
    let body = parse_statement(lexer, scope).map(Box::new)?;
    Ok(Statement::Case(exp, body))
}

fn parse_default_case(lexer: &mut Lexer, scope: &Scope) -> Result<Statement> {
    expect(lexer, TokenKind::Default)?;
    expect(lexer, TokenKind::Colon)?;
    let body = parse_statement(lexer, scope).map(Box::new)?;
    Ok(Statement::Default(body))
}

/// `if ( expression ) statement ( else statement )?`
fn parse_if(lexer: &mut Lexer, scope: &Scope) -> Result<Statement> {
    let scope = scope.child();
    expect(lexer, TokenKind::If)?;
    expect(lexer, TokenKind::LParen)?;
    let condition = parse_expression(lexer, &scope)?;
    expect(lexer, TokenKind::RParen)?;

    let then = parse_statement(lexer, &scope).map(Box::new)?;
    let els = if bump_if(lexer, TokenKind::Else)? {
        Some(parse_statement(lexer, &scope).map(Box::new)?)
    } else {
        None
    };

    Ok(Statement::If(If {
        condition,
        then,
        els,
    }))
}

/// `switch ( expression ) statement`; case collection is left to later
/// stages.
fn parse_switch(lexer: &mut Lexer, scope: &Scope) -> Result<Statement> {
    let scope = scope.child();
    expect(lexer, TokenKind::Switch)?;
    expect(lexer, TokenKind::LParen)?;
    let ctrl_exp = parse_expression(lexer, &scope)?;
    expect(lexer, TokenKind::RParen)?;
    let body = parse_statement(lexer, &scope).map(Box::new)?;

    Ok(Statement::Switch(Switch { ctrl_exp, body }))
}

fn parse_while(lexer: &mut Lexer, scope: &Scope) -> Result<Statement> {
    let scope = scope.child();
    expect(lexer, TokenKind::While)?;
    expect(lexer, TokenKind::LParen)?;
    let condition = parse_expression(lexer, &scope)?;
    expect(lexer, TokenKind::RParen)?;
    let body = parse_statement(lexer, &scope).map(Box::new)?;

    Ok(Statement::While(While { condition, body }))
}

fn parse_dowhile(lexer: &mut Lexer, scope: &Scope) -> Result<Statement> {
    let scope = scope.child();
    expect(lexer, TokenKind::Do)?;
    let body = parse_statement(lexer, &scope).map(Box::new)?;
    expect(lexer, TokenKind::While)?;
    expect(lexer, TokenKind::LParen)?;
    let condition = parse_expression(lexer, &scope)?;
    expect(lexer, TokenKind::RParen)?;
    expect(lexer, TokenKind::Semicolon)?;

    Ok(Statement::DoWhile(DoWhile { body, condition }))
}

/// `for ( init ; cond ; step ) statement`, any header slot may be empty; a
/// declaration in the init slot lives in a scope spanning the loop.
fn parse_for(lexer: &mut Lexer, scope: &Scope) -> Result<Statement> {
    let scope = scope.child();
    expect(lexer, TokenKind::For)?;
    expect(lexer, TokenKind::LParen)?;

    let init = if bump_if(lexer, TokenKind::Semicolon)? {
        ForInit::Exp(None)
    } else if token_is_declaration_specifier(lexer.current(), &scope) {
        ForInit::Declaration(parse_declaration(lexer, &scope)?)
    } else {
        let exp = parse_expression(lexer, &scope)?;
        expect(lexer, TokenKind::Semicolon)?;
        ForInit::Exp(Some(exp))
    };

    let condition = if bump_if(lexer, TokenKind::Semicolon)? {
        None
    } else {
        let exp = parse_expression(lexer, &scope)?;
        expect(lexer, TokenKind::Semicolon)?;
        Some(exp)
    };

    let post = if lexer.current().kind == TokenKind::RParen {
        None
    } else {
        Some(parse_expression(lexer, &scope)?)
    };
    expect(lexer, TokenKind::RParen)?;

    let body = parse_statement(lexer, &scope).map(Box::new)?;

    Ok(Statement::For(For {
        init,
        condition,
        post,
        body,
    }))
}

fn parse_goto(lexer: &mut Lexer) -> Result<Statement> {
    expect(lexer, TokenKind::Goto)?;
    let label = expect_identifier(lexer)?;
    expect(lexer, TokenKind::Semicolon)?;
    Ok(Statement::Goto(label))
}

fn parse_return(lexer: &mut Lexer, scope: &Scope) -> Result<Statement> {
    expect(lexer, TokenKind::Return)?;

    let exp = if bump_if(lexer, TokenKind::Semicolon)? {
        None
    } else {
        let exp = parse_expression(lexer, scope)?;
        expect(lexer, TokenKind::Semicolon)?;
        Some(exp)
    };

    Ok(Statement::Return(Return {
        exp,
        scope: scope.clone(),
    }))
}

fn parse_expression_statement(lexer: &mut Lexer, scope: &Scope) -> Result<Statement> {
    let exp = parse_expression(lexer, scope)?;
    expect(lexer, TokenKind::Semicolon)?;
    Ok(Statement::Exp(exp))
}
