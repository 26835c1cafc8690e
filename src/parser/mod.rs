mod declarations;
mod expressions;
mod parse_error;
#[cfg(test)]
mod parser_tests;
mod statements;

use crate::ast::*;
use crate::lexer::{Lexer, TokenKind};
use std::rc::Rc;
use std::sync::Arc;

pub use declarations::parse_declaration;
pub use expressions::parse_expression;
pub use parse_error::{InnerParseError, ParseError, Result};
pub use statements::parse_statement;

use declarations::{base_type, parse_declaration_specifiers, token_is_declaration_specifier};
use statements::parse_block;

/// Position of the current token, for error reporting.
fn location(lexer: &Lexer) -> (u32, u32) {
    let token = lexer.current();
    (token.line, token.column)
}

fn err_here<T>(lexer: &Lexer, inner: InnerParseError) -> Result<T> {
    let (line, column) = location(lexer);
    Err(inner.set_location(line, column))
}

fn bump(lexer: &mut Lexer) -> Result<()> {
    lexer.advance()?;
    Ok(())
}

fn bump_if(lexer: &mut Lexer, kind: TokenKind) -> Result<bool> {
    let condition = lexer.current().kind == kind;
    if condition {
        bump(lexer)?;
    }
    Ok(condition)
}

fn expect(lexer: &mut Lexer, kind: TokenKind) -> Result<()> {
    let got = lexer.current().kind;
    if got == kind {
        bump(lexer)
    } else {
        err_here(lexer, InnerParseError::ExpectedButGot(kind, got))
    }
}

fn expect_identifier(lexer: &mut Lexer) -> Result<Identifier> {
    let token = lexer.current();
    if token.kind == TokenKind::Identifier {
        let name = token.lexeme.clone();
        bump(lexer)?;
        Ok(name)
    } else {
        let got = token.kind;
        err_here(lexer, InnerParseError::ExpectedIdentifier(got))
    }
}

/// Parses one translation unit: `( function-definition | declaration )*`.
///
/// Both alternatives start with declaration specifiers and a declarator; a
/// `{` after a function-kind declarator makes it a definition (C11 6.9.1),
/// anything else continues as a declaration.
pub fn parse_translation_unit(lexer: &mut Lexer) -> Result<TranslationUnit> {
    if lexer.current().kind == TokenKind::NotStarted {
        bump(lexer)?;
    }

    let scope = Scope::file_scope();
    let mut items = Vec::new();

    while !lexer.current().is_eof() {
        if !token_is_declaration_specifier(lexer.current(), &scope) {
            let got = lexer.current().kind;
            return err_here(lexer, InnerParseError::UnexpectedToken(got));
        }

        let at = location(lexer);
        let specifiers = parse_declaration_specifiers(lexer, &scope)?;

        // `int;` declares nothing but is a valid declaration
        if bump_if(lexer, TokenKind::Semicolon)? {
            items.push(ExternalDeclaration::Declaration(Declaration {
                declarators: Vec::new(),
            }));
            continue;
        }

        let base = base_type(&specifiers, at)?;
        let object = declarations::parse_declarator(lexer, &scope, Arc::clone(&base))?;

        if lexer.current().kind == TokenKind::LBrace {
            items.push(parse_function_definition(lexer, &scope, object)?);
        } else {
            let declaration = declarations::parse_rest_of_declaration(
                lexer,
                &scope,
                &specifiers,
                base,
                object,
            )?;
            items.push(ExternalDeclaration::Declaration(declaration));
        }
    }

    Ok(TranslationUnit { items })
}

fn parse_function_definition(
    lexer: &mut Lexer,
    scope: &Scope,
    object: Rc<Object>,
) -> Result<ExternalDeclaration> {
    let Some(function) = object.ty.function_data() else {
        let name = object.identifier.clone();
        return err_here(lexer, InnerParseError::BodyOnNonFunction(name));
    };

    // register the function name before its body so it can call itself
    scope.declare(Rc::clone(&object));

    let body_scope = scope.function_body(Arc::clone(&function.return_type));
    for parameter in &function.parameters {
        if let Some(name) = &parameter.name {
            body_scope.declare(Object::new(name.clone(), Arc::clone(&parameter.ty)));
        }
    }

    let block = parse_block(lexer, &body_scope)?;
    *object.body.borrow_mut() = Some(block);

    Ok(ExternalDeclaration::FunctionDefinition(object))
}
