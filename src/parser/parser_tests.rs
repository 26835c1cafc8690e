use super::*;
use crate::lexer::Lexer;
use crate::types::{fundamental_type_for, FundamentalType, Specifier};

fn primed(source: &str) -> Lexer {
    let mut lexer = Lexer::new(source);
    lexer.advance().expect("first token should lex");
    lexer
}

fn parse_exp_source(source: &str, scope: &Scope) -> Exp {
    let mut lexer = primed(source);
    let exp = parse_expression(&mut lexer, scope).expect("expression should parse");
    assert!(lexer.current().is_eof());
    exp
}

fn int_scope(names: &[&str]) -> Scope {
    let scope = Scope::file_scope();
    for name in names {
        scope.declare(Object::new(
            (*name).to_string(),
            fundamental_type_for(FundamentalType::Int),
        ));
    }
    scope
}

fn constant_of(exp: &Exp) -> Constant {
    match exp {
        Exp::Constant(c) => *c,
        other => panic!("expected constant, got {other:?}"),
    }
}

#[test]
fn test_single_constant() {
    let exp = parse_exp_source("1", &Scope::file_scope());
    assert_eq!(Constant::Int(1), constant_of(&exp));
}

#[test]
fn test_constant_types_from_suffixes() {
    let scope = Scope::file_scope();
    assert_eq!(
        Constant::UnsignedInt(7),
        constant_of(&parse_exp_source("7u", &scope))
    );
    assert_eq!(
        Constant::Long(7),
        constant_of(&parse_exp_source("7l", &scope))
    );
    assert_eq!(
        Constant::UnsignedLongLong(7),
        constant_of(&parse_exp_source("7ull", &scope))
    );
    assert_eq!(
        Constant::Double(2.5),
        constant_of(&parse_exp_source("2.5", &scope))
    );
    // base prefixes digest per radix
    assert_eq!(
        Constant::Int(31),
        constant_of(&parse_exp_source("0x1F", &scope))
    );
    assert_eq!(
        Constant::Int(5),
        constant_of(&parse_exp_source("0b101", &scope))
    );
    assert_eq!(
        Constant::Int(15),
        constant_of(&parse_exp_source("017", &scope))
    );
}

#[test]
fn test_unsuffixed_wide_constant_becomes_long() {
    let exp = parse_exp_source("4294967296", &Scope::file_scope());
    assert_eq!(Constant::Long(4_294_967_296), constant_of(&exp));
}

#[test]
fn test_multiplication() {
    let exp = parse_exp_source("20 * 6", &Scope::file_scope());
    let Exp::Binary(BinaryOp::Multiply, lhs, rhs) = exp else {
        panic!("expected multiplication at the root");
    };
    assert_eq!(Constant::Int(20), constant_of(&lhs));
    assert_eq!(Constant::Int(6), constant_of(&rhs));
}

#[test]
fn test_constant_has_no_children() {
    let exp = parse_exp_source("42", &Scope::file_scope());
    assert!(matches!(exp, Exp::Constant(_)));
}

#[test]
fn test_left_associative_chain() {
    // 20 * 6123 / 330 % 2 associates as ((20 * 6123) / 330) % 2
    let exp = parse_exp_source("20 * 6123 / 330 % 2", &Scope::file_scope());

    let Exp::Binary(BinaryOp::Modulo, lhs, rhs) = exp else {
        panic!("expected modulo at the root");
    };
    assert_eq!(Constant::Int(2), constant_of(&rhs));

    let Exp::Binary(BinaryOp::Divide, lhs, rhs) = *lhs else {
        panic!("expected division under the modulo");
    };
    assert_eq!(Constant::Int(330), constant_of(&rhs));

    let Exp::Binary(BinaryOp::Multiply, lhs, rhs) = *lhs else {
        panic!("expected multiplication at the bottom");
    };
    assert_eq!(Constant::Int(20), constant_of(&lhs));
    assert_eq!(Constant::Int(6123), constant_of(&rhs));
}

#[test]
fn test_precedence_pairs() {
    // for op1 tighter than op2, `a op2 b op1 c` roots at op2
    let cases = [
        ("1 + 2 * 3", BinaryOp::Add, BinaryOp::Multiply),
        ("1 << 2 + 3", BinaryOp::ShiftLeft, BinaryOp::Add),
        ("1 < 2 >> 3", BinaryOp::LessThan, BinaryOp::ShiftRight),
        ("1 == 2 < 3", BinaryOp::Equal, BinaryOp::LessThan),
        ("1 & 2 == 3", BinaryOp::BitwiseAnd, BinaryOp::Equal),
        ("1 ^ 2 & 3", BinaryOp::BitwiseXor, BinaryOp::BitwiseAnd),
        ("1 | 2 ^ 3", BinaryOp::BitwiseOr, BinaryOp::BitwiseXor),
        ("1 && 2 | 3", BinaryOp::LogicalAnd, BinaryOp::BitwiseOr),
        ("1 || 2 && 3", BinaryOp::LogicalOr, BinaryOp::LogicalAnd),
    ];

    for (source, outer, inner) in cases {
        let exp = parse_exp_source(source, &Scope::file_scope());
        let Exp::Binary(op, _, rhs) = &exp else {
            panic!("expected binary root for {source}");
        };
        assert_eq!(outer, *op, "root of {source}");
        let Exp::Binary(op, _, _) = rhs.as_ref() else {
            panic!("expected binary right subtree for {source}");
        };
        assert_eq!(inner, *op, "right subtree of {source}");
    }
}

#[test]
fn test_parentheses_override_precedence() {
    let exp = parse_exp_source("(1 + 2) * 3", &Scope::file_scope());
    let Exp::Binary(BinaryOp::Multiply, lhs, _) = exp else {
        panic!("expected multiplication at the root");
    };
    assert!(matches!(*lhs, Exp::Binary(BinaryOp::Add, _, _)));
}

#[test]
fn test_assignment_is_right_associative() {
    let scope = int_scope(&["a", "b"]);
    let exp = parse_exp_source("a = b = 1", &scope);
    let Exp::Assignment(AssignOp::Assign, dst, src) = exp else {
        panic!("expected assignment at the root");
    };
    assert!(dst.is_var());
    assert!(matches!(*src, Exp::Assignment(AssignOp::Assign, _, _)));
}

#[test]
fn test_compound_assignment_keeps_operator() {
    let scope = int_scope(&["a"]);
    let exp = parse_exp_source("a += 2", &scope);
    let Exp::Assignment(AssignOp::Add, _, src) = exp else {
        panic!("expected compound assignment");
    };
    assert_eq!(Constant::Int(2), constant_of(&src));
}

#[test]
fn test_conditional_is_right_associative() {
    let scope = int_scope(&["a", "b"]);
    let exp = parse_exp_source("a ? 1 : b ? 2 : 3", &scope);
    let Exp::Conditional(conditional) = exp else {
        panic!("expected conditional at the root");
    };
    assert!(conditional.condition.is_var());
    assert!(matches!(*conditional.els, Exp::Conditional(_)));
}

#[test]
fn test_comma_operator() {
    let scope = int_scope(&["a"]);
    let exp = parse_exp_source("a = 1, a + 2", &scope);
    assert!(matches!(exp, Exp::Comma(_, _)));
}

#[test]
fn test_unary_and_postfix() {
    let scope = int_scope(&["a"]);
    let exp = parse_exp_source("-a", &scope);
    assert!(matches!(exp, Exp::Unary(UnaryOp::Negate, _)));

    let exp = parse_exp_source("!~a", &scope);
    let Exp::Unary(UnaryOp::LogicalNot, inner) = exp else {
        panic!("expected logical not");
    };
    assert!(matches!(*inner, Exp::Unary(UnaryOp::Complement, _)));

    let exp = parse_exp_source("a++", &scope);
    assert!(matches!(exp, Exp::Unary(UnaryOp::PostfixIncrement, _)));

    let exp = parse_exp_source("++a", &scope);
    assert!(matches!(exp, Exp::Unary(UnaryOp::PrefixIncrement, _)));
}

#[test]
fn test_sizeof_forms() {
    let scope = int_scope(&["a"]);
    let exp = parse_exp_source("sizeof a", &scope);
    assert!(matches!(exp, Exp::SizeOfExp(_)));

    let exp = parse_exp_source("sizeof(unsigned long)", &scope);
    let Exp::SizeOfType(ty) = exp else {
        panic!("expected sizeof(type)");
    };
    assert_eq!(FundamentalType::UnsignedLong, ty.kind);

    let exp = parse_exp_source("sizeof(a)", &scope);
    assert!(matches!(exp, Exp::SizeOfExp(_)));
}

#[test]
fn test_cast_versus_parenthesized() {
    let scope = int_scope(&["a"]);
    let exp = parse_exp_source("(long) a", &scope);
    let Exp::Cast(ty, inner) = exp else {
        panic!("expected a cast");
    };
    assert_eq!(FundamentalType::Long, ty.kind);
    assert!(inner.is_var());

    let exp = parse_exp_source("(a) + 1", &scope);
    assert!(matches!(exp, Exp::Binary(BinaryOp::Add, _, _)));
}

#[test]
fn test_call_with_arguments() {
    let scope = Scope::file_scope();
    let mut lexer = primed("int f(int a, int b); f(1, 2 + 3)");
    let _ = parse_declaration(&mut lexer, &scope).expect("declaration should parse");
    let exp = parse_expression(&mut lexer, &scope).expect("call should parse");

    let Exp::Call(designator, arguments) = exp else {
        panic!("expected a call");
    };
    assert!(designator.is_var());
    assert_eq!(2, arguments.len());
    assert_eq!(Constant::Int(1), constant_of(&arguments[0]));
}

#[test]
fn test_undeclared_identifier() {
    let mut lexer = primed("nope");
    let err = parse_expression(&mut lexer, &Scope::file_scope()).unwrap_err();
    assert_eq!(
        InnerParseError::UndeclaredIdentifier(String::from("nope")),
        err.inner
    );
}

#[test]
fn test_simple_declaration() {
    let mut lexer = primed("int x;");
    let scope = Scope::file_scope();
    let declaration = parse_declaration(&mut lexer, &scope).expect("should parse");

    assert_eq!(1, declaration.declarators.len());
    let object = &declaration.declarators[0].object;
    assert_eq!("x", object.identifier);
    assert!(std::sync::Arc::ptr_eq(
        &object.ty,
        &fundamental_type_for(FundamentalType::Int)
    ));
    assert!(lexer.current().is_eof());
    assert!(scope.lookup("x").is_some());
}

#[test]
fn test_pointer_declaration() {
    let mut lexer = primed("int *x;");
    let declaration = parse_declaration(&mut lexer, &Scope::file_scope()).unwrap();

    let object = &declaration.declarators[0].object;
    assert_eq!(FundamentalType::Pointer, object.ty.kind);
    let pointed = object.ty.pointed_type().expect("pointer has a pointee");
    assert!(std::sync::Arc::ptr_eq(
        pointed,
        &fundamental_type_for(FundamentalType::Int)
    ));
}

#[test]
fn test_pointer_qualifier_chain() {
    // x is a volatile pointer to a const pointer to int
    let mut lexer = primed("int *const *volatile x;");
    let declaration = parse_declaration(&mut lexer, &Scope::file_scope()).unwrap();

    let outer = &declaration.declarators[0].object.ty;
    assert_eq!(FundamentalType::Pointer, outer.kind);
    assert!(outer.flags.contains(Specifier::Volatile));

    let inner = outer.pointed_type().unwrap();
    assert_eq!(FundamentalType::Pointer, inner.kind);
    assert!(inner.flags.contains(Specifier::Const));

    let leaf = inner.pointed_type().unwrap();
    assert_eq!(FundamentalType::Int, leaf.kind);
}

#[test]
fn test_function_declaration() {
    let mut lexer = primed("int x();");
    let declaration = parse_declaration(&mut lexer, &Scope::file_scope()).unwrap();

    let object = &declaration.declarators[0].object;
    assert_eq!(FundamentalType::Function, object.ty.kind);
    let function = object.ty.function_data().expect("function has data");
    assert!(std::sync::Arc::ptr_eq(
        &function.return_type,
        &fundamental_type_for(FundamentalType::Int)
    ));
    assert!(function.parameters.is_empty());
    assert!(!function.variadic);
    assert!(!object.has_body());
}

#[test]
fn test_variadic_function_declaration() {
    let mut lexer = primed("int printf(char *fmt, ...);");
    let declaration = parse_declaration(&mut lexer, &Scope::file_scope()).unwrap();

    let function = declaration.declarators[0].object.ty.function_data().unwrap();
    assert!(function.variadic);
    assert_eq!(1, function.parameters.len());
    assert_eq!(Some("fmt"), function.parameters[0].name.as_deref());
    assert_eq!(FundamentalType::Pointer, function.parameters[0].ty.kind);
}

#[test]
fn test_variadic_marker_must_be_last() {
    let mut lexer = primed("int f(..., int x);");
    let err = parse_declaration(&mut lexer, &Scope::file_scope()).unwrap_err();
    assert_eq!(InnerParseError::VariadicMarkerNotLast, err.inner);
}

#[test]
fn test_unnamed_parameters_with_pointers() {
    let mut lexer = primed("int f(int*, char**);");
    let declaration = parse_declaration(&mut lexer, &Scope::file_scope()).unwrap();
    let function = declaration.declarators[0].object.ty.function_data().unwrap();
    assert_eq!(2, function.parameters.len());
    assert!(function.parameters.iter().all(|p| p.name.is_none()));
    assert_eq!(FundamentalType::Pointer, function.parameters[1].ty.kind);
}

#[test]
fn test_init_declarator_list() {
    let mut lexer = primed("int x = 3, y, *z;");
    let scope = Scope::file_scope();
    let declaration = parse_declaration(&mut lexer, &scope).unwrap();

    assert_eq!(3, declaration.declarators.len());
    let first = &declaration.declarators[0];
    assert!(matches!(
        first.init,
        Some(Initializer::Expression(Exp::Constant(Constant::Int(3))))
    ));
    assert!(declaration.declarators[1].init.is_none());
    assert_eq!(
        FundamentalType::Pointer,
        declaration.declarators[2].object.ty.kind
    );
    assert!(scope.lookup("y").is_some());
}

#[test]
fn test_brace_initializer_list() {
    let mut lexer = primed("int x = { 1, 2, };");
    let declaration = parse_declaration(&mut lexer, &Scope::file_scope()).unwrap();
    let Some(Initializer::List(items)) = &declaration.declarators[0].init else {
        panic!("expected an initializer list");
    };
    assert_eq!(2, items.len());
}

#[test]
fn test_designated_initializers_are_unimplemented() {
    let mut lexer = primed("int x = { .a = 1 };");
    let err = parse_declaration(&mut lexer, &Scope::file_scope()).unwrap_err();
    assert_eq!(
        InnerParseError::Unimplemented("designated initializers"),
        err.inner
    );
}

#[test]
fn test_declaration_errors() {
    let mut lexer = primed("int int x;");
    let err = parse_declaration(&mut lexer, &Scope::file_scope()).unwrap_err();
    assert!(matches!(err.inner, InnerParseError::Specifier(_)));

    let mut lexer = primed("long long long x;");
    let err = parse_declaration(&mut lexer, &Scope::file_scope()).unwrap_err();
    assert!(matches!(err.inner, InnerParseError::Specifier(_)));

    let mut lexer = primed("signed float x;");
    let err = parse_declaration(&mut lexer, &Scope::file_scope()).unwrap_err();
    assert!(matches!(err.inner, InnerParseError::Specifier(_)));
}

#[test]
fn test_error_position() {
    let mut lexer = primed("int x = ;");
    let err = parse_declaration(&mut lexer, &Scope::file_scope()).unwrap_err();
    assert_eq!(0, err.line());
    assert_eq!(8, err.column());
}

#[test]
fn test_typedef_registration_and_use() {
    let mut lexer = primed("typedef unsigned long size; size x;");
    let scope = Scope::file_scope();
    let _ = parse_declaration(&mut lexer, &scope).unwrap();

    assert!(scope.lookup_typedef("size").is_some());
    // the ordinary name space stays untouched
    assert!(scope.lookup("size").is_none());

    let declaration = parse_declaration(&mut lexer, &scope).unwrap();
    let object = &declaration.declarators[0].object;
    assert!(std::sync::Arc::ptr_eq(
        &object.ty,
        &fundamental_type_for(FundamentalType::UnsignedLong)
    ));
}

#[test]
fn test_typedef_name_can_be_redeclared_as_object() {
    let mut lexer = primed("typedef int T; int T;");
    let scope = Scope::file_scope();
    let _ = parse_declaration(&mut lexer, &scope).unwrap();
    let declaration = parse_declaration(&mut lexer, &scope).unwrap();
    assert_eq!("T", declaration.declarators[0].object.identifier);
    assert!(scope.lookup("T").is_some());
}

#[test]
fn test_compound_statement() {
    let mut lexer = primed("{int x;\nchar *s;}");
    let statement = parse_statement(&mut lexer, &Scope::file_scope()).unwrap();

    let Statement::Compound(block) = statement else {
        panic!("expected compound statement");
    };
    assert_eq!(2, block.items.len());

    let BlockItem::Declaration(first) = &block.items[0] else {
        panic!("expected declaration first");
    };
    assert_eq!("x", first.declarators[0].object.identifier);
    assert!(std::sync::Arc::ptr_eq(
        &first.declarators[0].object.ty,
        &fundamental_type_for(FundamentalType::Int)
    ));

    let BlockItem::Declaration(second) = &block.items[1] else {
        panic!("expected declaration second");
    };
    let ty = &second.declarators[0].object.ty;
    assert_eq!("s", second.declarators[0].object.identifier);
    assert_eq!(FundamentalType::Pointer, ty.kind);
    assert_eq!(FundamentalType::Char, ty.pointed_type().unwrap().kind);

    assert!(lexer.current().is_eof());
}

#[test]
fn test_function_declarator_in_block_scope_is_an_error() {
    let mut lexer = primed("{ int f(); }");
    let err = parse_statement(&mut lexer, &Scope::file_scope()).unwrap_err();
    assert!(matches!(
        err.inner,
        InnerParseError::FunctionDeclaratorInBlockScope(_)
    ));
}

#[test]
fn test_statement_dispatch() {
    let scope = int_scope(&["a"]);

    let cases: &[(&str, fn(&Statement) -> bool)] = &[
        ("if (a) a = 1; else a = 2;", |s| matches!(s, Statement::If(_))),
        ("while (a) a = a - 1;", |s| matches!(s, Statement::While(_))),
        ("do a = a - 1; while (a);", |s| matches!(s, Statement::DoWhile(_))),
        ("switch (a) { }", |s| matches!(s, Statement::Switch(_))),
        ("goto out;", |s| matches!(s, Statement::Goto(_))),
        ("continue;", |s| matches!(s, Statement::Continue)),
        ("break;", |s| matches!(s, Statement::Break)),
        (";", |s| matches!(s, Statement::Null)),
        ("a = 3;", |s| matches!(s, Statement::Exp(_))),
        ("out: a = 1;", |s| matches!(s, Statement::Labeled(_, _))),
    ];

    for (source, check) in cases {
        let mut lexer = primed(source);
        let statement = parse_statement(&mut lexer, &scope).expect(source);
        assert!(check(&statement), "wrong statement kind for {source}");
    }
}

#[test]
fn test_if_else_shape() {
    let scope = int_scope(&["a"]);
    let mut lexer = primed("if (a) a = 1;");
    let Statement::If(if_st) = parse_statement(&mut lexer, &scope).unwrap() else {
        panic!("expected if");
    };
    assert!(if_st.condition.is_var());
    assert!(if_st.els.is_none());
}

#[test]
fn test_for_with_declaration_init() {
    let scope = int_scope(&["a"]);
    let mut lexer = primed("for (int i = 0; i < 10; i++) a = a + i;");
    let Statement::For(for_st) = parse_statement(&mut lexer, &scope).unwrap() else {
        panic!("expected for");
    };
    assert!(matches!(for_st.init, ForInit::Declaration(_)));
    assert!(for_st.condition.is_some());
    assert!(for_st.post.is_some());
    // the loop-header declaration does not leak into the outer scope
    assert!(scope.lookup("i").is_none());
}

#[test]
fn test_for_with_empty_header() {
    let scope = int_scope(&["a"]);
    let mut lexer = primed("for (;;) break;");
    let Statement::For(for_st) = parse_statement(&mut lexer, &scope).unwrap() else {
        panic!("expected for");
    };
    assert!(matches!(for_st.init, ForInit::Exp(None)));
    assert!(for_st.condition.is_none());
    assert!(for_st.post.is_none());
}

#[test]
fn test_return_keeps_scope_with_return_type() {
    let mut lexer = primed("long f(void) { return 1; }");
    let tu = parse_translation_unit(&mut lexer).unwrap();

    let ExternalDeclaration::FunctionDefinition(object) = &tu.items[0] else {
        panic!("expected a function definition");
    };
    let body = object.body.borrow();
    let block = body.as_ref().unwrap();
    let BlockItem::Statement(Statement::Return(ret)) = &block.items[0] else {
        panic!("expected return");
    };
    let return_type = ret.scope.return_type().expect("return sees the function");
    assert_eq!(FundamentalType::Long, return_type.kind);
}

#[test]
fn test_translation_unit() {
    let source = "void f(int x){ double y = 4; return y; } float z = 3;";
    let mut lexer = Lexer::new(source);
    let tu = parse_translation_unit(&mut lexer).unwrap();

    assert_eq!(2, tu.items.len());

    let ExternalDeclaration::FunctionDefinition(function) = &tu.items[0] else {
        panic!("expected a function definition first");
    };
    let data = function.ty.function_data().unwrap();
    assert!(std::sync::Arc::ptr_eq(
        &data.return_type,
        &fundamental_type_for(FundamentalType::Void)
    ));
    assert_eq!(1, data.parameters.len());
    assert!(std::sync::Arc::ptr_eq(
        &data.parameters[0].ty,
        &fundamental_type_for(FundamentalType::Int)
    ));

    let body = function.body.borrow();
    let block = body.as_ref().expect("definition has a body");
    let BlockItem::Declaration(first) = &block.items[0] else {
        panic!("expected the declaration of y first");
    };
    assert_eq!("y", first.declarators[0].object.identifier);
    assert!(std::sync::Arc::ptr_eq(
        &first.declarators[0].object.ty,
        &fundamental_type_for(FundamentalType::Double)
    ));

    let ExternalDeclaration::Declaration(second) = &tu.items[1] else {
        panic!("expected a declaration second");
    };
    assert_eq!("z", second.declarators[0].object.identifier);
    assert_eq!(
        FundamentalType::Float,
        second.declarators[0].object.ty.kind
    );
}

#[test]
fn test_function_can_call_itself() {
    let source = "int f(int n) { return n ? n * f(n - 1) : 1; }";
    let mut lexer = Lexer::new(source);
    let tu = parse_translation_unit(&mut lexer).unwrap();
    assert_eq!(1, tu.items.len());
}

#[test]
fn test_parameters_are_visible_in_the_body() {
    let source = "int f(int a, int b) { return a + b; }";
    let mut lexer = Lexer::new(source);
    assert!(parse_translation_unit(&mut lexer).is_ok());
}

#[test]
fn test_scope_lookup_falls_through_and_shadows() {
    let file = Scope::file_scope();
    let outer_x = Object::new(String::from("x"), fundamental_type_for(FundamentalType::Int));
    file.declare(std::rc::Rc::clone(&outer_x));

    let inner = file.child();
    // visible through the parent chain
    assert!(std::rc::Rc::ptr_eq(&inner.lookup("x").unwrap(), &outer_x));

    // shadowing: the child binding wins, the parent keeps its own
    let inner_x = Object::new(
        String::from("x"),
        fundamental_type_for(FundamentalType::Double),
    );
    inner.declare(std::rc::Rc::clone(&inner_x));
    assert!(std::rc::Rc::ptr_eq(&inner.lookup("x").unwrap(), &inner_x));
    assert!(std::rc::Rc::ptr_eq(&file.lookup("x").unwrap(), &outer_x));

    // names introduced in the child stay invisible to the parent
    inner.declare(Object::new(
        String::from("y"),
        fundamental_type_for(FundamentalType::Int),
    ));
    assert!(file.lookup("y").is_none());
}

#[test]
fn test_struct_is_unimplemented() {
    let mut lexer = primed("struct point p;");
    let err = parse_declaration(&mut lexer, &Scope::file_scope()).unwrap_err();
    assert_eq!(
        InnerParseError::Unimplemented("struct/union/enum types"),
        err.inner
    );
}
