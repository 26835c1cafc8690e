use super::*;
use crate::lexer::Lexer;
use crate::parser::parse_translation_unit;

fn emit(source: &str) -> String {
    let mut lexer = Lexer::new(source);
    let tu = parse_translation_unit(&mut lexer).expect("source should parse");
    emit_ir(&tu).expect("source should emit")
}

fn emit_err(source: &str) -> EmitError {
    let mut lexer = Lexer::new(source);
    let tu = parse_translation_unit(&mut lexer).expect("source should parse");
    emit_ir(&tu).expect_err("emission should fail")
}

#[test]
fn test_return_constant() {
    let ir = emit("int main(void) { return 2; }");
    let expected = "\
define i32 @main() {
entry:
  ret i32 2
}
";
    assert_eq!(expected, ir);
}

#[test]
fn test_parameters_are_registers() {
    let ir = emit("int add(int a, int b) { return a + b; }");
    let expected = "\
define i32 @add(i32 %0, i32 %1) {
entry:
  %2 = add i32 %0, %1
  ret i32 %2
}
";
    assert_eq!(expected, ir);
}

#[test]
fn test_local_declaration_and_load() {
    let ir = emit("int main(void) { int x = 3; return x; }");
    let expected = "\
define i32 @main() {
entry:
  %0 = alloca i32
  store i32 3, ptr %0
  %1 = load i32, ptr %0
  ret i32 %1
}
";
    assert_eq!(expected, ir);
}

#[test]
fn test_static_function_is_internal() {
    let ir = emit("static int f(void) { return 1; }");
    assert!(ir.starts_with("define internal i32 @f() {"));
}

#[test]
fn test_type_table() {
    let ir = emit(
        "void f(char c, short s, unsigned long ul, long long ll, float x, double d, _Bool b) { return; }",
    );
    assert!(ir.starts_with(
        "define void @f(i8 %0, i16 %1, i32 %2, i64 %3, float %4, double %5, i1 %6) {"
    ));
    assert!(ir.contains("ret void"));
}

#[test]
fn test_long_double_maps_to_fp128() {
    let ir = emit("long double f(long double x) { return x; }");
    assert!(ir.starts_with("define fp128 @f(fp128 %0) {"));
}

#[test]
fn test_if_else() {
    let ir = emit("int main(void) { if (1) return 2; else return 3; }");
    let expected = "\
define i32 @main() {
entry:
  %0 = icmp ne i32 1, 0
  br i1 %0, label %if.then0, label %if.else2
if.then0:
  ret i32 2
if.else2:
  ret i32 3
if.end1:
  ret i32 0
}
";
    assert_eq!(expected, ir);
}

#[test]
fn test_while_loop() {
    let ir = emit("int main(void) { int i = 0; while (i < 3) i = i + 1; return i; }");
    let expected = "\
define i32 @main() {
entry:
  %0 = alloca i32
  store i32 0, ptr %0
  br label %while.cond0
while.cond0:
  %1 = load i32, ptr %0
  %2 = icmp slt i32 %1, 3
  br i1 %2, label %while.body1, label %while.end2
while.body1:
  %3 = load i32, ptr %0
  %4 = add i32 %3, 1
  store i32 %4, ptr %0
  br label %while.cond0
while.end2:
  %5 = load i32, ptr %0
  ret i32 %5
}
";
    assert_eq!(expected, ir);
}

#[test]
fn test_for_loop_with_compound_assignment() {
    let ir = emit("int f(void) { int s = 0; for (int i = 0; i < 2; i++) s += i; return s; }");
    let expected = "\
define i32 @f() {
entry:
  %0 = alloca i32
  store i32 0, ptr %0
  %1 = alloca i32
  store i32 0, ptr %1
  br label %for.cond0
for.cond0:
  %2 = load i32, ptr %1
  %3 = icmp slt i32 %2, 2
  br i1 %3, label %for.body1, label %for.end3
for.body1:
  %4 = load i32, ptr %0
  %5 = load i32, ptr %1
  %6 = add i32 %4, %5
  store i32 %6, ptr %0
  br label %for.step2
for.step2:
  %7 = load i32, ptr %1
  %8 = add i32 %7, 1
  store i32 %8, ptr %1
  br label %for.cond0
for.end3:
  %9 = load i32, ptr %0
  ret i32 %9
}
";
    assert_eq!(expected, ir);
}

#[test]
fn test_break_branches_to_loop_end() {
    let ir = emit("int main(void) { while (1) { break; } return 0; }");
    assert!(ir.contains("br label %while.end2"));
    assert!(ir.contains("while.end2:\n  ret i32 0"));
}

#[test]
fn test_short_circuit_and() {
    let ir = emit("int f(int a, int b) { return a && b; }");
    let expected = "\
define i32 @f(i32 %0, i32 %1) {
entry:
  %2 = icmp ne i32 %0, 0
  br i1 %2, label %land.rhs0, label %land.end1
land.rhs0:
  %3 = icmp ne i32 %1, 0
  br label %land.end1
land.end1:
  %4 = phi i1 [ false, %entry ], [ %3, %land.rhs0 ]
  %5 = zext i1 %4 to i32
  ret i32 %5
}
";
    assert_eq!(expected, ir);
}

#[test]
fn test_short_circuit_or_skips_with_true() {
    let ir = emit("int f(int a, int b) { return a || b; }");
    assert!(ir.contains("br i1 %2, label %lor.end1, label %lor.rhs0"));
    assert!(ir.contains("phi i1 [ true, %entry ], [ %3, %lor.rhs0 ]"));
}

#[test]
fn test_conditional_expression_phi() {
    let ir = emit("int c(int a) { return a ? 1 : 2; }");
    let expected = "\
define i32 @c(i32 %0) {
entry:
  %1 = icmp ne i32 %0, 0
  br i1 %1, label %cond.then0, label %cond.else1
cond.then0:
  br label %cond.end2
cond.else1:
  br label %cond.end2
cond.end2:
  %2 = phi i32 [ 1, %cond.then0 ], [ 2, %cond.else1 ]
  ret i32 %2
}
";
    assert_eq!(expected, ir);
}

#[test]
fn test_signedness_of_operations() {
    let signed = emit("int f(int a) { return a / 2; }");
    assert!(signed.contains("sdiv i32"));

    let unsigned = emit("unsigned int f(unsigned int a) { return a / 2u; }");
    assert!(unsigned.contains("udiv i32"));

    let shr = emit("int f(int a) { return a >> 1; }");
    assert!(shr.contains("ashr i32"));

    let lshr = emit("unsigned int f(unsigned int a) { return a >> 1u; }");
    assert!(lshr.contains("lshr i32"));

    let cmp = emit("int f(unsigned int a, unsigned int b) { return a < b; }");
    assert!(cmp.contains("icmp ult i32"));
}

#[test]
fn test_integer_to_double_conversion() {
    let ir = emit("double g(double d) { return d * 2; }");
    let expected = "\
define double @g(double %0) {
entry:
  %1 = sitofp i32 2 to double
  %2 = fmul double %0, %1
  ret double %2
}
";
    assert_eq!(expected, ir);
}

#[test]
fn test_widening_and_narrowing() {
    let widen = emit("long long f(int a) { return a; }");
    assert!(widen.contains("sext i32 %0 to i64"));

    let widen_unsigned = emit("long long f(unsigned int a) { return a; }");
    assert!(widen_unsigned.contains("zext i32 %0 to i64"));

    let narrow = emit("char f(int a) { return a; }");
    assert!(narrow.contains("trunc i32 %0 to i8"));
}

#[test]
fn test_explicit_cast() {
    let ir = emit("int f(double d) { return (int) d; }");
    assert!(ir.contains("fptosi double %0 to i32"));
}

#[test]
fn test_call() {
    let ir = emit("int add(int a, int b) { return a + b; } int main(void) { return add(1, 2); }");
    assert!(ir.contains("%0 = call i32 @add(i32 1, i32 2)"));
    assert!(ir.contains("ret i32 %0"));
}

#[test]
fn test_unary_operators() {
    let neg = emit("int f(int a) { return -a; }");
    assert!(neg.contains("sub i32 0, %0"));

    let fneg = emit("double f(double a) { return -a; }");
    assert!(fneg.contains("fneg double %0"));

    let complement = emit("int f(int a) { return ~a; }");
    assert!(complement.contains("xor i32 %0, -1"));

    let lognot = emit("int f(int a) { return !a; }");
    assert!(lognot.contains("icmp eq i32 %0, 0"));
    assert!(lognot.contains("zext i1 %1 to i32"));
}

#[test]
fn test_increment_statement() {
    let ir = emit("int p(void) { int i = 0; i++; return ++i; }");
    let expected = "\
define i32 @p() {
entry:
  %0 = alloca i32
  store i32 0, ptr %0
  %1 = load i32, ptr %0
  %2 = add i32 %1, 1
  store i32 %2, ptr %0
  %3 = load i32, ptr %0
  %4 = add i32 %3, 1
  store i32 %4, ptr %0
  ret i32 %4
}
";
    assert_eq!(expected, ir);
}

#[test]
fn test_sizeof_folds_to_a_constant() {
    let ir = emit("int s(void) { return sizeof(long long); }");
    assert!(ir.contains("ret i32 8"));

    let ir = emit("int s(void) { return sizeof(char); }");
    assert!(ir.contains("ret i32 1"));
}

#[test]
fn test_missing_return_gets_a_zero() {
    let ir = emit("int f(void) { ; }");
    assert!(ir.contains("ret i32 0"));

    let ir = emit("void f(void) { ; }");
    assert!(ir.contains("ret void"));
}

#[test]
fn test_globals() {
    let ir = emit("int x; static long y = 5; extern double z; int f(int);");
    let expected = "\
@x = global i32 zeroinitializer
@y = internal global i32 5
@z = external global double
declare i32 @f(i32)
";
    assert_eq!(expected, ir);
}

#[test]
fn test_global_float_initializer_is_floating() {
    let ir = emit("double d = 3;");
    assert_eq!("@d = global double 3.0\n", ir);

    let ir = emit("float f = 2.5;");
    assert_eq!("@f = global float 2.5\n", ir);
}

#[test]
fn test_variadic_declare() {
    let ir = emit("int printf(char *fmt, ...);");
    assert_eq!("declare i32 @printf(ptr, ...)\n", ir);
}

#[test]
fn test_declare_skipped_for_defined_functions() {
    let ir = emit("int f(void); int f(void) { return 1; }");
    assert!(!ir.contains("declare"));
    assert!(ir.contains("define i32 @f()"));
}

#[test]
fn test_global_variable_access_from_function() {
    let ir = emit("int g; int f(void) { g = 2; return g; }");
    assert!(ir.contains("@g = global i32 zeroinitializer"));
    assert!(ir.contains("store i32 2, ptr @g"));
    assert!(ir.contains("load i32, ptr @g"));
}

#[test]
fn test_address_of_and_dereference() {
    let ir = emit("int f(void) { int x = 1; int *p = &x; return *p; }");
    assert!(ir.contains("= alloca ptr"));
    assert!(ir.contains("store ptr %0, ptr %1"));
    assert!(ir.contains("load ptr, ptr %1"));
}

#[test]
fn test_unnamed_definition_parameter_is_an_error() {
    let err = emit_err("void f(int) { return; }");
    assert_eq!(EmitError::UnnamedFunctionParameter(String::from("f")), err);
}

#[test]
fn test_switch_is_unimplemented() {
    let err = emit_err("int f(int a) { switch (a) { } return 0; }");
    assert_eq!(EmitError::Unimplemented("switch lowering"), err);
}

#[test]
fn test_goto_and_label() {
    let ir = emit("int f(void) { goto out; out: return 1; }");
    assert!(ir.contains("br label %lbl.out"));
    assert!(ir.contains("lbl.out:\n  ret i32 1"));
}
