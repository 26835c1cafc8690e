//! Declarations, C11 6.7: declaration specifiers, declarators, parameter
//! lists, init-declarator lists and typedef registration.
//!
//! One set of declaration specifiers applies to every init-declarator of a
//! declaration (e.g. in `const int *x, y;` both declarators share
//! `const int`), so the specifiers are folded once into a flag set and the
//! resolved base type is threaded through each declarator.

use super::expressions::{parse_assignment_expression, parse_conditional_expression};
use super::parse_error::{InnerParseError, Result};
use super::{bump, bump_if, err_here, expect, expect_identifier, location};
use crate::ast::*;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::types::{
    fundamental_type_for, FundamentalType, FunctionData, FunctionParameter, Specifier,
    SpecifierFlags, Type,
};
use std::rc::Rc;
use std::sync::Arc;

/// Declaration-specifier keyword for a token, if it is one. Typedef names
/// are not covered here: they need the scope chain.
fn specifier_for(kind: TokenKind) -> Option<Specifier> {
    let specifier = match kind {
        TokenKind::Void => Specifier::Void,
        TokenKind::Char => Specifier::Char,
        TokenKind::Signed => Specifier::Signed,
        TokenKind::Unsigned => Specifier::Unsigned,
        TokenKind::Short => Specifier::Short,
        TokenKind::Long => Specifier::Long,
        TokenKind::Int => Specifier::Int,
        TokenKind::Float => Specifier::Float,
        TokenKind::Double => Specifier::Double,
        TokenKind::Bool => Specifier::Bool,
        TokenKind::Complex => Specifier::Complex,
        TokenKind::Struct => Specifier::Struct,
        TokenKind::Union => Specifier::Union,
        TokenKind::Enum => Specifier::Enum,
        TokenKind::Typedef => Specifier::Typedef,
        TokenKind::Extern => Specifier::Extern,
        TokenKind::Static => Specifier::Static,
        TokenKind::ThreadLocal => Specifier::ThreadLocal,
        TokenKind::Auto => Specifier::Auto,
        TokenKind::Register => Specifier::Register,
        TokenKind::Const => Specifier::Const,
        TokenKind::Restrict => Specifier::Restrict,
        TokenKind::Volatile => Specifier::Volatile,
        TokenKind::Atomic => Specifier::Atomic,
        TokenKind::Inline => Specifier::Inline,
        TokenKind::NoReturn => Specifier::NoReturn,
        TokenKind::AlignAs => Specifier::AlignAs,
        _ => return None,
    };
    Some(specifier)
}

pub(super) fn token_is_declaration_specifier(token: &Token, scope: &Scope) -> bool {
    if specifier_for(token.kind).is_some() {
        return true;
    }
    token.kind == TokenKind::Identifier && scope.lookup_typedef(&token.lexeme).is_some()
}

/// Whether a type name can begin at this token; used to tell casts from
/// parenthesized expressions and `sizeof (type)` from `sizeof (exp)`.
pub(super) fn token_starts_type_name(token: &Token, scope: &Scope) -> bool {
    token.kind.is_type_specifier_keyword()
        || token.kind.is_type_qualifier()
        || (token.kind == TokenKind::Identifier && scope.lookup_typedef(&token.lexeme).is_some())
}

/// The folded specifiers of one declaration, plus the aliased type when a
/// typedef name was used as the type specifier.
pub(super) struct ParsedSpecifiers {
    pub flags: SpecifierFlags,
    pub typedef_type: Option<Arc<Type>>,
}

/// `declaration-specifiers`: loop while the current token is one, folding
/// each into the flag set. An identifier only counts as a typedef-name use
/// while no type-specifier bit is set yet, so `typedef int T; int T;`
/// redeclares `T` as an object.
pub(super) fn parse_declaration_specifiers(
    lexer: &mut Lexer,
    scope: &Scope,
) -> Result<ParsedSpecifiers> {
    let mut flags = SpecifierFlags::new();
    let mut typedef_type = None;

    loop {
        let token = lexer.current();
        let (line, column) = (token.line, token.column);

        if token.kind == TokenKind::Identifier && !flags.has_type_specifier() {
            if let Some(aliased) = scope.lookup_typedef(&token.lexeme) {
                flags
                    .apply(Specifier::TypedefName)
                    .map_err(|e| InnerParseError::Specifier(e).set_location(line, column))?;
                typedef_type = Some(aliased);
                bump(lexer)?;
                continue;
            }
        }

        let Some(specifier) = specifier_for(token.kind) else {
            break;
        };

        // member lists for these are not parsed yet
        if matches!(
            specifier,
            Specifier::Struct | Specifier::Union | Specifier::Enum
        ) {
            return err_here(lexer, InnerParseError::Unimplemented("struct/union/enum types"));
        }

        flags
            .apply(specifier)
            .map_err(|e| InnerParseError::Specifier(e).set_location(line, column))?;
        bump(lexer)?;

        if specifier == Specifier::AlignAs {
            parse_alignment_argument(lexer, scope)?;
        }
    }

    Ok(ParsedSpecifiers {
        flags,
        typedef_type,
    })
}

/// `_Alignas ( type-name )` or `_Alignas ( constant-expression )`; the
/// argument is parsed and discarded, only the flag is recorded.
fn parse_alignment_argument(lexer: &mut Lexer, scope: &Scope) -> Result<()> {
    expect(lexer, TokenKind::LParen)?;
    if token_starts_type_name(lexer.current(), scope) {
        parse_type_name(lexer, scope)?;
    } else {
        parse_conditional_expression(lexer, scope)?;
    }
    expect(lexer, TokenKind::RParen)
}

/// Resolves folded specifiers to the declaration's base type: either the
/// multiset table of C11 6.7.2, or the aliased type of a typedef name with
/// this declaration's qualifiers merged in.
pub(super) fn base_type(specifiers: &ParsedSpecifiers, at: (u32, u32)) -> Result<Arc<Type>> {
    let (line, column) = at;

    if let Some(aliased) = &specifiers.typedef_type {
        let extra = specifiers.flags.qualifying();
        if extra.is_empty() {
            return Ok(Arc::clone(aliased));
        }
        let mut merged = (**aliased).clone();
        merged.flags = merged.flags.union(extra);
        return Ok(Arc::new(merged));
    }

    let kind = specifiers
        .flags
        .resolve()
        .map_err(|e| InnerParseError::Specifier(e).set_location(line, column))?;

    match kind {
        FundamentalType::Struct
        | FundamentalType::Union
        | FundamentalType::Enum
        | FundamentalType::TypedefName => {
            Err(InnerParseError::Unimplemented("struct/union/enum types")
                .set_location(line, column))
        }
        _ => Ok(Type::with_flags(kind, specifiers.flags)),
    }
}

/// `pointer: * type-qualifier-list(opt) pointer(opt)`, built inside-out:
/// `int *const *volatile x` makes x a volatile pointer to a const pointer
/// to int.
fn parse_pointer_chain(lexer: &mut Lexer, mut base: Arc<Type>) -> Result<Arc<Type>> {
    while bump_if(lexer, TokenKind::Asterisk)? {
        let mut qualifiers = SpecifierFlags::new();
        loop {
            let kind = lexer.current().kind;
            if !kind.is_type_qualifier() {
                break;
            }
            let Some(specifier) = specifier_for(kind) else {
                break;
            };
            let (line, column) = location(lexer);
            qualifiers
                .apply(specifier)
                .map_err(|e| InnerParseError::Specifier(e).set_location(line, column))?;
            bump(lexer)?;
        }
        base = Type::pointer_to(base, qualifiers);
    }
    Ok(base)
}

/// `declarator: pointer(opt) direct-declarator`, with at most one
/// parameter-list suffix. Array declarators are recognised but not built:
/// the type model has no array kind yet.
pub(super) fn parse_declarator(
    lexer: &mut Lexer,
    scope: &Scope,
    base: Arc<Type>,
) -> Result<Rc<Object>> {
    let ty = parse_pointer_chain(lexer, base)?;
    let name = expect_identifier(lexer)?;

    match lexer.current().kind {
        TokenKind::LParen => {
            if !scope.is_file_scope() {
                return err_here(lexer, InnerParseError::FunctionDeclaratorInBlockScope(name));
            }
            bump(lexer)?;
            let (parameters, variadic) = parse_parameter_type_list(lexer, scope)?;
            expect(lexer, TokenKind::RParen)?;
            let function = Type::function(FunctionData {
                return_type: ty,
                parameters,
                variadic,
            });
            Ok(Object::new(name, function))
        }
        TokenKind::LBracket => {
            err_here(lexer, InnerParseError::Unimplemented("array declarators"))
        }
        _ => Ok(Object::new(name, ty)),
    }
}

/// `parameter-type-list: parameter-list ( , ... )?`
///
/// Each parameter is `declaration-specifiers declarator-or-abstract-
/// declarator`; the abstract form supports the pointer-only shape. A lone
/// `void` means no parameters.
fn parse_parameter_type_list(
    lexer: &mut Lexer,
    scope: &Scope,
) -> Result<(Vec<FunctionParameter>, bool)> {
    let mut parameters = Vec::new();

    if lexer.current().kind == TokenKind::RParen {
        return Ok((parameters, false));
    }
    if lexer.current().kind == TokenKind::Void && lexer.peek_next()?.kind == TokenKind::RParen {
        bump(lexer)?;
        return Ok((parameters, false));
    }

    loop {
        if bump_if(lexer, TokenKind::Ellipsis)? {
            if lexer.current().kind != TokenKind::RParen {
                return err_here(lexer, InnerParseError::VariadicMarkerNotLast);
            }
            return Ok((parameters, true));
        }

        if !token_is_declaration_specifier(lexer.current(), scope) {
            let got = lexer.current().kind;
            return err_here(lexer, InnerParseError::UnexpectedToken(got));
        }

        let at = location(lexer);
        let specifiers = parse_declaration_specifiers(lexer, scope)?;
        let base = base_type(&specifiers, at)?;
        let ty = parse_pointer_chain(lexer, base)?;

        let name = if lexer.current().kind == TokenKind::Identifier {
            Some(expect_identifier(lexer)?)
        } else {
            None
        };
        parameters.push(FunctionParameter { ty, name });

        if !bump_if(lexer, TokenKind::Comma)? {
            return Ok((parameters, false));
        }
    }
}

/// `declaration: declaration-specifiers init-declarator-list(opt) ;`
pub fn parse_declaration(lexer: &mut Lexer, scope: &Scope) -> Result<Declaration> {
    let at = location(lexer);
    let specifiers = parse_declaration_specifiers(lexer, scope)?;

    if bump_if(lexer, TokenKind::Semicolon)? {
        return Ok(Declaration {
            declarators: Vec::new(),
        });
    }

    let base = base_type(&specifiers, at)?;
    let first = parse_declarator(lexer, scope, Arc::clone(&base))?;
    parse_rest_of_declaration(lexer, scope, &specifiers, base, first)
}

/// The init-declarator list from its first declarator on: registration,
/// optional initializer, comma-separated further declarators, `;`.
pub(super) fn parse_rest_of_declaration(
    lexer: &mut Lexer,
    scope: &Scope,
    specifiers: &ParsedSpecifiers,
    base: Arc<Type>,
    first: Rc<Object>,
) -> Result<Declaration> {
    let is_typedef = specifiers.flags.contains(Specifier::Typedef);
    let mut declarators = Vec::new();
    let mut object = first;

    loop {
        // the name is visible from the end of its declarator on, before any
        // initializer (C11 6.2.1p7)
        if is_typedef {
            let registered = typedef_registered_type(&object.ty);
            scope.declare_typedef(object.identifier.clone(), registered);
        } else {
            scope.declare(Rc::clone(&object));
        }

        let init = if bump_if(lexer, TokenKind::Equals)? {
            Some(parse_initializer(lexer, scope)?)
        } else {
            None
        };
        declarators.push(InitDeclarator { object, init });

        if !bump_if(lexer, TokenKind::Comma)? {
            break;
        }
        object = parse_declarator(lexer, scope, Arc::clone(&base))?;
    }

    expect(lexer, TokenKind::Semicolon)?;
    Ok(Declaration { declarators })
}

/// The type a typedef name stands for: the declarator's type with the
/// `typedef` storage bit stripped off. The bit rides on the base type at
/// the leaf of any pointer or function wrapping, so strip it there.
fn typedef_registered_type(ty: &Arc<Type>) -> Arc<Type> {
    if ty.is_pointer() || ty.is_function() {
        let mut cleaned = (**ty).clone();
        if let Some(pointed) = &mut cleaned.pointed {
            let inner = typedef_registered_type(pointed);
            *pointed = inner;
        }
        if let Some(function) = &mut cleaned.function {
            let inner = typedef_registered_type(&function.return_type);
            function.return_type = inner;
        }
        return Arc::new(cleaned);
    }

    let flags = ty.flags.without(Specifier::Typedef);
    if flags.is_empty() {
        return fundamental_type_for(ty.kind);
    }
    let mut cleaned = (**ty).clone();
    cleaned.flags = flags;
    Arc::new(cleaned)
}

/// `initializer: assignment-expression | { initializer-list ,? }`
fn parse_initializer(lexer: &mut Lexer, scope: &Scope) -> Result<Initializer> {
    if !bump_if(lexer, TokenKind::LBrace)? {
        return parse_assignment_expression(lexer, scope).map(Initializer::Expression);
    }

    let mut items = Vec::new();
    loop {
        if bump_if(lexer, TokenKind::RBrace)? {
            break;
        }
        if matches!(lexer.current().kind, TokenKind::LBracket | TokenKind::Dot) {
            return err_here(lexer, InnerParseError::Unimplemented("designated initializers"));
        }
        items.push(parse_initializer(lexer, scope)?);
        if !bump_if(lexer, TokenKind::Comma)? {
            expect(lexer, TokenKind::RBrace)?;
            break;
        }
    }
    Ok(Initializer::List(items))
}

/// `type-name: specifier-qualifier-list abstract-declarator(opt)`, the
/// abstract declarator limited to pointer chains for now.
pub(super) fn parse_type_name(lexer: &mut Lexer, scope: &Scope) -> Result<Arc<Type>> {
    let at = location(lexer);
    let specifiers = parse_declaration_specifiers(lexer, scope)?;
    let base = base_type(&specifiers, at)?;
    parse_pointer_chain(lexer, base)
}
