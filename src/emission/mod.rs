//! Textual LLVM-IR emission.
//!
//! Walks the external-declaration list in parse order: function definitions
//! become `define`s with an `entry:` block and a lowered body, file-scope
//! object declarations become globals, file-scope function declarations
//! become `declare` lines.
//!
//! Lowering model: locals live in stack slots (`alloca`), every operation
//! gets a fresh SSA register from a per-function counter pre-seeded with the
//! formal parameters, and control flow uses named labels from a separate
//! counter. The sign of an operation is carried by its mnemonic
//! (`sdiv`/`udiv`, `ashr`/`lshr`, `icmp slt`/`ult`), never by the IR type.

#[cfg(test)]
mod emission_tests;

use crate::ast::*;
use crate::types::{fundamental_type_for, FundamentalType, Specifier, SpecifierFlags, Type};

use rustc_hash::FxHashMap;
use std::collections::HashSet;
use std::fmt::{self, Write};
use std::rc::Rc;
use std::sync::Arc;

pub type Result<T> = std::result::Result<T, EmitError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitError {
    UnnamedFunctionParameter(Identifier),
    UnsupportedType(FundamentalType),
    UnknownIdentifier(Identifier),
    BadAssignmentTarget,
    NonConstantGlobalInitializer(Identifier),
    BreakOutsideLoop,
    ContinueOutsideLoop,
    ReturnOutsideFunction,
    Unimplemented(&'static str),
    Fmt,
}

impl From<fmt::Error> for EmitError {
    fn from(_: fmt::Error) -> Self {
        Self::Fmt
    }
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnnamedFunctionParameter(name) => {
                write!(f, "definition of function {name} has an unnamed parameter")
            }
            Self::UnsupportedType(kind) => {
                write!(f, "emitting code for {kind:?} types is not implemented")
            }
            Self::UnknownIdentifier(name) => {
                write!(f, "identifier {name} not found during emission")
            }
            Self::BadAssignmentTarget => write!(f, "assignment target is not assignable"),
            Self::NonConstantGlobalInitializer(name) => {
                write!(f, "global {name} has a non-constant initializer")
            }
            Self::BreakOutsideLoop => write!(f, "break statement outside of a loop"),
            Self::ContinueOutsideLoop => write!(f, "continue statement outside of a loop"),
            Self::ReturnOutsideFunction => write!(f, "return statement outside of a function"),
            Self::Unimplemented(what) => write!(f, "emitting {what} is not implemented"),
            Self::Fmt => write!(f, "formatting failure"),
        }
    }
}

impl std::error::Error for EmitError {}

/// Renders a translation unit as textual LLVM-IR.
pub fn emit_ir(translation_unit: &TranslationUnit) -> Result<String> {
    let mut out = String::new();

    let defined: HashSet<&str> = translation_unit
        .items
        .iter()
        .filter_map(|item| match item {
            ExternalDeclaration::FunctionDefinition(object) => {
                Some(object.identifier.as_str())
            }
            ExternalDeclaration::Declaration(_) => None,
        })
        .collect();
    let mut declared = HashSet::new();

    for item in &translation_unit.items {
        match item {
            ExternalDeclaration::FunctionDefinition(object) => {
                emit_function_definition(&mut out, object)?;
            }
            ExternalDeclaration::Declaration(declaration) => {
                emit_file_scope_declaration(&mut out, declaration, &defined, &mut declared)?;
            }
        }
    }

    Ok(out)
}

/// The bit-exact type table: the sign is carried by operations, so the
/// signed and unsigned flavors of a width share one IR type.
fn ir_type(ty: &Type) -> Result<&'static str> {
    let text = match ty.kind {
        FundamentalType::Void => "void",
        FundamentalType::Char | FundamentalType::SignedChar | FundamentalType::UnsignedChar => {
            "i8"
        }
        FundamentalType::Short | FundamentalType::UnsignedShort => "i16",
        FundamentalType::Int
        | FundamentalType::UnsignedInt
        | FundamentalType::Long
        | FundamentalType::UnsignedLong => "i32",
        FundamentalType::LongLong | FundamentalType::UnsignedLongLong => "i64",
        FundamentalType::Float => "float",
        FundamentalType::Double => "double",
        FundamentalType::LongDouble => "fp128",
        FundamentalType::Bool => "i1",
        FundamentalType::Pointer => "ptr",
        other => return Err(EmitError::UnsupportedType(other)),
    };
    Ok(text)
}

fn int_bits(kind: FundamentalType) -> Option<u32> {
    let bits = match kind {
        FundamentalType::Bool => 1,
        FundamentalType::Char | FundamentalType::SignedChar | FundamentalType::UnsignedChar => 8,
        FundamentalType::Short | FundamentalType::UnsignedShort => 16,
        FundamentalType::Int
        | FundamentalType::UnsignedInt
        | FundamentalType::Long
        | FundamentalType::UnsignedLong
        | FundamentalType::EnumeratedValue => 32,
        FundamentalType::LongLong | FundamentalType::UnsignedLongLong => 64,
        _ => return None,
    };
    Some(bits)
}

fn float_rank(kind: FundamentalType) -> Option<u32> {
    match kind {
        FundamentalType::Float => Some(1),
        FundamentalType::Double => Some(2),
        FundamentalType::LongDouble => Some(3),
        _ => None,
    }
}

/// Size in bytes of a type's IR rendering, for `sizeof`/`_Alignof` folding.
fn type_size(ty: &Type) -> Result<u64> {
    let size = match ir_type(ty)? {
        "i1" | "i8" => 1,
        "i16" => 2,
        "i32" | "float" => 4,
        "i64" | "double" | "ptr" => 8,
        "fp128" => 16,
        _ => return Err(EmitError::UnsupportedType(ty.kind)),
    };
    Ok(size)
}

/// Storage-class flags of a declared type: they ride on the declaration's
/// base type, inside any pointer or function wrapping, so follow the chain
/// down to the leaf.
fn storage_flags(ty: &Type) -> SpecifierFlags {
    if let Some(pointed) = &ty.pointed {
        return storage_flags(pointed);
    }
    if let Some(function) = &ty.function {
        return storage_flags(&function.return_type);
    }
    ty.flags
}

fn constant_text(constant: Constant) -> String {
    match constant {
        Constant::Double(v) => float_text(v),
        other => other.to_string(),
    }
}

// LLVM wants floating constants recognisable as such; shortest round-trip
// printing keeps the value exact for doubles.
fn float_text(v: f64) -> String {
    let text = format!("{v:?}");
    if text.contains('.') || text.contains('e') || text.contains("inf") || text.contains("NaN") {
        text
    } else {
        format!("{text}.0")
    }
}

/// The usual-arithmetic-conversions, reduced: floating beats integer and
/// wider beats narrower; at equal integer width unsigned wins.
fn common_type(a: &Arc<Type>, b: &Arc<Type>) -> Result<Arc<Type>> {
    if a.kind == b.kind {
        return Ok(Arc::clone(a));
    }

    match (float_rank(a.kind), float_rank(b.kind)) {
        (Some(ra), Some(rb)) => {
            return Ok(Arc::clone(if ra >= rb { a } else { b }));
        }
        (Some(_), None) => return Ok(Arc::clone(a)),
        (None, Some(_)) => return Ok(Arc::clone(b)),
        (None, None) => {}
    }

    let (Some(bits_a), Some(bits_b)) = (int_bits(a.kind), int_bits(b.kind)) else {
        return Err(EmitError::UnsupportedType(a.kind));
    };

    // integer operands promote at least to int before an operation
    let bits = bits_a.max(bits_b).max(32);
    let unsigned = (a.kind.is_unsigned() && bits_a >= bits)
        || (b.kind.is_unsigned() && bits_b >= bits);

    let kind = match (bits, unsigned) {
        (32, false) => FundamentalType::Int,
        (32, true) => FundamentalType::UnsignedInt,
        (64, false) => FundamentalType::LongLong,
        (64, true) => FundamentalType::UnsignedLongLong,
        _ => FundamentalType::Int,
    };
    Ok(fundamental_type_for(kind))
}

/// A computed value: its textual operand form (register, literal) and type.
struct Value {
    text: String,
    ty: Arc<Type>,
}

impl Value {
    fn new(text: impl Into<String>, ty: Arc<Type>) -> Self {
        Self {
            text: text.into(),
            ty,
        }
    }
}

#[derive(Clone)]
enum Binding {
    /// formal parameter: an SSA register, directly usable
    Param { register: u32, ty: Arc<Type> },
    /// local variable: an `alloca` stack slot
    Local { slot: u32, ty: Arc<Type> },
}

struct LoopLabels {
    break_to: String,
    continue_to: String,
}

/// Per-function emission state.
struct FunctionEmitter {
    body: String,
    bindings: FxHashMap<Identifier, Binding>,
    /// monotonically increasing SSA register counter, pre-seeded with the
    /// formal parameters
    counter: u32,
    labels: u32,
    /// current basic-block label, for phi predecessors
    block: String,
    loops: Vec<LoopLabels>,
    terminated: bool,
}

impl FunctionEmitter {
    fn new() -> Self {
        Self {
            body: String::new(),
            bindings: FxHashMap::default(),
            counter: 0,
            labels: 0,
            block: String::from("entry"),
            loops: Vec::new(),
            terminated: false,
        }
    }

    fn fresh(&mut self) -> u32 {
        let register = self.counter;
        self.counter += 1;
        register
    }

    fn fresh_label(&mut self, stem: &str) -> String {
        let label = format!("{stem}{}", self.labels);
        self.labels += 1;
        label
    }

    fn start_block(&mut self, label: &str) -> Result<()> {
        writeln!(self.body, "{label}:")?;
        self.block = label.to_string();
        self.terminated = false;
        Ok(())
    }

    /// Branches to `label` unless the current block already ended.
    fn branch_to(&mut self, label: &str) -> Result<()> {
        if !self.terminated {
            writeln!(self.body, "  br label %{label}")?;
            self.terminated = true;
        }
        Ok(())
    }

    /// Statements after a terminator are dead code but still legal C; give
    /// them an unreachable block of their own.
    fn ensure_open(&mut self) -> Result<()> {
        if self.terminated {
            let label = self.fresh_label("dead");
            self.start_block(&label)?;
        }
        Ok(())
    }

    fn emit_block(&mut self, block: &Block) -> Result<()> {
        // block-scoped shadowing: bindings revert on exit
        let saved = self.bindings.clone();
        for item in &block.items {
            match item {
                BlockItem::Declaration(declaration) => {
                    self.emit_local_declaration(declaration)?;
                }
                BlockItem::Statement(statement) => self.emit_statement(statement)?,
            }
        }
        self.bindings = saved;
        Ok(())
    }

    fn emit_local_declaration(&mut self, declaration: &Declaration) -> Result<()> {
        for init_declarator in &declaration.declarators {
            let object = &init_declarator.object;
            // a typedef declares a name, not storage
            if storage_flags(&object.ty).contains(Specifier::Typedef) {
                continue;
            }
            self.ensure_open()?;

            let ty_text = ir_type(&object.ty)?;
            let slot = self.fresh();
            writeln!(self.body, "  %{slot} = alloca {ty_text}")?;
            self.bindings.insert(
                object.identifier.clone(),
                Binding::Local {
                    slot,
                    ty: Arc::clone(&object.ty),
                },
            );

            match &init_declarator.init {
                None => {}
                Some(Initializer::Expression(exp)) => {
                    let value = self.emit_exp(exp)?;
                    let value = self.convert(value, &object.ty)?;
                    writeln!(self.body, "  store {ty_text} {}, ptr %{slot}", value.text)?;
                }
                Some(Initializer::List(_)) => {
                    return Err(EmitError::Unimplemented("aggregate initializers"));
                }
            }
        }
        Ok(())
    }

    fn emit_statement(&mut self, statement: &Statement) -> Result<()> {
        match statement {
            Statement::Null => Ok(()),
            Statement::Exp(exp) => {
                self.ensure_open()?;
                self.emit_exp(exp).map(|_| ())
            }
            Statement::Compound(block) => self.emit_block(block),
            Statement::Return(ret) => self.emit_return(ret),
            Statement::If(if_st) => self.emit_if(if_st),
            Statement::While(while_st) => self.emit_while(while_st),
            Statement::DoWhile(dowhile) => self.emit_dowhile(dowhile),
            Statement::For(for_st) => self.emit_for(for_st),
            Statement::Break => {
                self.ensure_open()?;
                let Some(labels) = self.loops.last() else {
                    return Err(EmitError::BreakOutsideLoop);
                };
                let target = labels.break_to.clone();
                self.branch_to(&target)
            }
            Statement::Continue => {
                self.ensure_open()?;
                let Some(labels) = self.loops.last() else {
                    return Err(EmitError::ContinueOutsideLoop);
                };
                let target = labels.continue_to.clone();
                self.branch_to(&target)
            }
            Statement::Goto(label) => {
                self.ensure_open()?;
                let target = format!("lbl.{label}");
                self.branch_to(&target)
            }
            Statement::Labeled(label, inner) => {
                let target = format!("lbl.{label}");
                self.branch_to(&target)?;
                self.start_block(&target)?;
                self.emit_statement(inner)
            }
            Statement::Switch(_) | Statement::Case(_, _) | Statement::Default(_) => {
                Err(EmitError::Unimplemented("switch lowering"))
            }
        }
    }

    fn emit_return(&mut self, ret: &Return) -> Result<()> {
        self.ensure_open()?;
        let return_type = ret
            .scope
            .return_type()
            .ok_or(EmitError::ReturnOutsideFunction)?;

        match &ret.exp {
            None => writeln!(self.body, "  ret void")?,
            Some(exp) => {
                let value = self.emit_exp(exp)?;
                let value = self.convert(value, &return_type)?;
                writeln!(self.body, "  ret {} {}", ir_type(&return_type)?, value.text)?;
            }
        }
        self.terminated = true;
        Ok(())
    }

    fn emit_if(&mut self, if_st: &If) -> Result<()> {
        self.ensure_open()?;
        let condition = self.emit_condition(&if_st.condition)?;

        let then_label = self.fresh_label("if.then");
        let end_label = self.fresh_label("if.end");
        let else_label = if if_st.els.is_some() {
            self.fresh_label("if.else")
        } else {
            end_label.clone()
        };

        writeln!(
            self.body,
            "  br i1 {condition}, label %{then_label}, label %{else_label}"
        )?;
        self.terminated = true;

        self.start_block(&then_label)?;
        self.emit_statement(&if_st.then)?;
        self.branch_to(&end_label)?;

        if let Some(els) = &if_st.els {
            self.start_block(&else_label)?;
            self.emit_statement(els)?;
            self.branch_to(&end_label)?;
        }

        self.start_block(&end_label)
    }

    fn emit_while(&mut self, while_st: &While) -> Result<()> {
        let cond_label = self.fresh_label("while.cond");
        let body_label = self.fresh_label("while.body");
        let end_label = self.fresh_label("while.end");

        self.ensure_open()?;
        self.branch_to(&cond_label)?;
        self.start_block(&cond_label)?;
        let condition = self.emit_condition(&while_st.condition)?;
        writeln!(
            self.body,
            "  br i1 {condition}, label %{body_label}, label %{end_label}"
        )?;
        self.terminated = true;

        self.start_block(&body_label)?;
        self.loops.push(LoopLabels {
            break_to: end_label.clone(),
            continue_to: cond_label.clone(),
        });
        self.emit_statement(&while_st.body)?;
        self.loops.pop();
        self.branch_to(&cond_label)?;

        self.start_block(&end_label)
    }

    fn emit_dowhile(&mut self, dowhile: &DoWhile) -> Result<()> {
        let body_label = self.fresh_label("do.body");
        let cond_label = self.fresh_label("do.cond");
        let end_label = self.fresh_label("do.end");

        self.ensure_open()?;
        self.branch_to(&body_label)?;
        self.start_block(&body_label)?;
        self.loops.push(LoopLabels {
            break_to: end_label.clone(),
            continue_to: cond_label.clone(),
        });
        self.emit_statement(&dowhile.body)?;
        self.loops.pop();
        self.branch_to(&cond_label)?;

        self.start_block(&cond_label)?;
        let condition = self.emit_condition(&dowhile.condition)?;
        writeln!(
            self.body,
            "  br i1 {condition}, label %{body_label}, label %{end_label}"
        )?;
        self.terminated = true;

        self.start_block(&end_label)
    }

    fn emit_for(&mut self, for_st: &For) -> Result<()> {
        // the loop-header declaration scopes to the loop
        let saved = self.bindings.clone();

        self.ensure_open()?;
        match &for_st.init {
            ForInit::Declaration(declaration) => self.emit_local_declaration(declaration)?,
            ForInit::Exp(Some(exp)) => {
                self.emit_exp(exp)?;
            }
            ForInit::Exp(None) => {}
        }

        let cond_label = self.fresh_label("for.cond");
        let body_label = self.fresh_label("for.body");
        let step_label = self.fresh_label("for.step");
        let end_label = self.fresh_label("for.end");

        self.branch_to(&cond_label)?;
        self.start_block(&cond_label)?;
        match &for_st.condition {
            Some(condition) => {
                let condition = self.emit_condition(condition)?;
                writeln!(
                    self.body,
                    "  br i1 {condition}, label %{body_label}, label %{end_label}"
                )?;
                self.terminated = true;
            }
            None => self.branch_to(&body_label)?,
        }

        self.start_block(&body_label)?;
        self.loops.push(LoopLabels {
            break_to: end_label.clone(),
            continue_to: step_label.clone(),
        });
        self.emit_statement(&for_st.body)?;
        self.loops.pop();
        self.branch_to(&step_label)?;

        self.start_block(&step_label)?;
        if let Some(post) = &for_st.post {
            self.emit_exp(post)?;
        }
        self.branch_to(&cond_label)?;

        self.start_block(&end_label)?;
        self.bindings = saved;
        Ok(())
    }

    /// Evaluates an expression down to an `i1` for a branch.
    fn emit_condition(&mut self, exp: &Exp) -> Result<String> {
        let value = self.emit_exp(exp)?;
        self.to_bool(value)
    }

    fn to_bool(&mut self, value: Value) -> Result<String> {
        if value.ty.kind == FundamentalType::Bool {
            return Ok(value.text);
        }
        let ty_text = ir_type(&value.ty)?;
        let register = self.fresh();
        if value.ty.kind.is_floating() {
            writeln!(
                self.body,
                "  %{register} = fcmp une {ty_text} {}, 0.0",
                value.text
            )?;
        } else {
            writeln!(
                self.body,
                "  %{register} = icmp ne {ty_text} {}, 0",
                value.text
            )?;
        }
        Ok(format!("%{register}"))
    }

    /// Where an lvalue lives: the pointer operand to load from / store to.
    fn lvalue_slot(&mut self, exp: &Exp) -> Result<(String, Arc<Type>)> {
        match exp {
            Exp::Var(object) => match self.bindings.get(&object.identifier) {
                Some(Binding::Local { slot, ty }) => Ok((format!("%{slot}"), Arc::clone(ty))),
                Some(Binding::Param { .. }) => {
                    Err(EmitError::Unimplemented("assignment to parameters"))
                }
                // not bound in the function: a file-scope object
                None => Ok((format!("@{}", object.identifier), Arc::clone(&object.ty))),
            },
            Exp::Unary(UnaryOp::Dereference, inner) => {
                let pointer = self.emit_exp(inner)?;
                let Some(pointed) = pointer.ty.pointed_type().cloned() else {
                    return Err(EmitError::BadAssignmentTarget);
                };
                Ok((pointer.text, pointed))
            }
            _ => Err(EmitError::BadAssignmentTarget),
        }
    }

    fn emit_exp(&mut self, exp: &Exp) -> Result<Value> {
        match exp {
            Exp::Constant(constant) => Ok(Value::new(constant_text(*constant), constant.ty())),
            Exp::Var(object) => self.emit_var(object),
            Exp::Unary(op, inner) => self.emit_unary(*op, inner),
            Exp::Binary(op, lhs, rhs) if op.is_short_circuit() => {
                self.emit_logical(*op, lhs, rhs)
            }
            Exp::Binary(op, lhs, rhs) => self.emit_binary(*op, lhs, rhs),
            Exp::Assignment(op, dst, src) => self.emit_assignment(*op, dst, src),
            Exp::Conditional(conditional) => self.emit_conditional(conditional),
            Exp::Cast(ty, inner) => {
                let value = self.emit_exp(inner)?;
                self.convert(value, ty)
            }
            Exp::Call(designator, arguments) => self.emit_call(designator, arguments),
            Exp::Comma(lhs, rhs) => {
                self.emit_exp(lhs)?;
                self.emit_exp(rhs)
            }
            Exp::SizeOfExp(inner) => {
                let ty = type_of_exp(inner)?;
                let size = type_size(&ty)?;
                Ok(Value::new(
                    size.to_string(),
                    fundamental_type_for(FundamentalType::UnsignedLong),
                ))
            }
            Exp::SizeOfType(ty) | Exp::AlignOfType(ty) => {
                let size = type_size(ty)?;
                Ok(Value::new(
                    size.to_string(),
                    fundamental_type_for(FundamentalType::UnsignedLong),
                ))
            }
            Exp::StringLiteral(_) => Err(EmitError::Unimplemented("string literals")),
            Exp::Index(_, _) => Err(EmitError::Unimplemented("array indexing")),
            Exp::Member(_, _) | Exp::Arrow(_, _) => {
                Err(EmitError::Unimplemented("member access"))
            }
        }
    }

    fn emit_var(&mut self, object: &Rc<Object>) -> Result<Value> {
        match self.bindings.get(&object.identifier) {
            Some(Binding::Param { register, ty }) => {
                Ok(Value::new(format!("%{register}"), Arc::clone(ty)))
            }
            Some(Binding::Local { slot, ty }) => {
                let ty = Arc::clone(ty);
                let slot = *slot;
                let ty_text = ir_type(&ty)?;
                let register = self.fresh();
                writeln!(self.body, "  %{register} = load {ty_text}, ptr %{slot}")?;
                Ok(Value::new(format!("%{register}"), ty))
            }
            None => {
                if object.is_function() {
                    return Err(EmitError::Unimplemented("function pointers"));
                }
                // file-scope object
                let ty = Arc::clone(&object.ty);
                let ty_text = ir_type(&ty)?;
                let register = self.fresh();
                writeln!(
                    self.body,
                    "  %{register} = load {ty_text}, ptr @{}",
                    object.identifier
                )?;
                Ok(Value::new(format!("%{register}"), ty))
            }
        }
    }

    fn emit_unary(&mut self, op: UnaryOp, inner: &Exp) -> Result<Value> {
        match op {
            UnaryOp::Plus => self.emit_exp(inner),
            UnaryOp::Negate => {
                let value = self.emit_exp(inner)?;
                let ty_text = ir_type(&value.ty)?;
                let register = self.fresh();
                if value.ty.kind.is_floating() {
                    writeln!(self.body, "  %{register} = fneg {ty_text} {}", value.text)?;
                } else {
                    writeln!(self.body, "  %{register} = sub {ty_text} 0, {}", value.text)?;
                }
                Ok(Value::new(format!("%{register}"), value.ty))
            }
            UnaryOp::Complement => {
                let value = self.emit_exp(inner)?;
                let ty_text = ir_type(&value.ty)?;
                let register = self.fresh();
                writeln!(self.body, "  %{register} = xor {ty_text} {}, -1", value.text)?;
                Ok(Value::new(format!("%{register}"), value.ty))
            }
            UnaryOp::LogicalNot => {
                let value = self.emit_exp(inner)?;
                let ty_text = ir_type(&value.ty)?;
                let register = self.fresh();
                if value.ty.kind.is_floating() {
                    writeln!(
                        self.body,
                        "  %{register} = fcmp oeq {ty_text} {}, 0.0",
                        value.text
                    )?;
                } else {
                    writeln!(
                        self.body,
                        "  %{register} = icmp eq {ty_text} {}, 0",
                        value.text
                    )?;
                }
                Ok(Value::new(
                    format!("%{register}"),
                    fundamental_type_for(FundamentalType::Bool),
                ))
            }
            UnaryOp::AddressOf => {
                let (slot, ty) = self.lvalue_slot(inner)?;
                let pointer = Type::pointer_to(ty, crate::types::SpecifierFlags::new());
                Ok(Value::new(slot, pointer))
            }
            UnaryOp::Dereference => {
                let pointer = self.emit_exp(inner)?;
                let Some(pointed) = pointer.ty.pointed_type().cloned() else {
                    return Err(EmitError::Unimplemented("dereference of non-pointers"));
                };
                let ty_text = ir_type(&pointed)?;
                let register = self.fresh();
                writeln!(
                    self.body,
                    "  %{register} = load {ty_text}, ptr {}",
                    pointer.text
                )?;
                Ok(Value::new(format!("%{register}"), pointed))
            }
            UnaryOp::PrefixIncrement => self.emit_incdec(inner, BinaryOp::Add, true),
            UnaryOp::PrefixDecrement => self.emit_incdec(inner, BinaryOp::Subtract, true),
            UnaryOp::PostfixIncrement => self.emit_incdec(inner, BinaryOp::Add, false),
            UnaryOp::PostfixDecrement => self.emit_incdec(inner, BinaryOp::Subtract, false),
        }
    }

    /// `++`/`--`: load, add or subtract one, store; the value is the new
    /// one for the prefix forms and the old one for the postfix forms.
    fn emit_incdec(&mut self, target: &Exp, op: BinaryOp, prefix: bool) -> Result<Value> {
        let (slot, ty) = self.lvalue_slot(target)?;
        let ty_text = ir_type(&ty)?;

        let old = self.fresh();
        writeln!(self.body, "  %{old} = load {ty_text}, ptr {slot}")?;

        let one = if ty.kind.is_floating() { "1.0" } else { "1" };
        let mnemonic = binary_mnemonic(op, ty.kind)?;
        let new = self.fresh();
        writeln!(self.body, "  %{new} = {mnemonic} {ty_text} %{old}, {one}")?;
        writeln!(self.body, "  store {ty_text} %{new}, ptr {slot}")?;

        let result = if prefix { new } else { old };
        Ok(Value::new(format!("%{result}"), ty))
    }

    fn emit_binary(&mut self, op: BinaryOp, lhs: &Exp, rhs: &Exp) -> Result<Value> {
        let lhs = self.emit_exp(lhs)?;
        let rhs = self.emit_exp(rhs)?;
        self.emit_binary_values(op, lhs, rhs)
    }

    fn emit_binary_values(&mut self, op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value> {
        let common = common_type(&lhs.ty, &rhs.ty)?;
        let lhs = self.convert(lhs, &common)?;
        let rhs = self.convert(rhs, &common)?;
        let ty_text = ir_type(&common)?;

        if op.is_comparison() {
            let mnemonic = comparison_mnemonic(op, common.kind);
            let register = self.fresh();
            writeln!(
                self.body,
                "  %{register} = {mnemonic} {ty_text} {}, {}",
                lhs.text, rhs.text
            )?;
            return Ok(Value::new(
                format!("%{register}"),
                fundamental_type_for(FundamentalType::Bool),
            ));
        }

        let mnemonic = binary_mnemonic(op, common.kind)?;
        let register = self.fresh();
        writeln!(
            self.body,
            "  %{register} = {mnemonic} {ty_text} {}, {}",
            lhs.text, rhs.text
        )?;
        Ok(Value::new(format!("%{register}"), common))
    }

    /// `&&`/`||` short-circuit through a phi over the two predecessors.
    fn emit_logical(&mut self, op: BinaryOp, lhs: &Exp, rhs: &Exp) -> Result<Value> {
        let (stem, skip_value) = match op {
            BinaryOp::LogicalAnd => ("land", "false"),
            _ => ("lor", "true"),
        };
        let rhs_label = self.fresh_label(&format!("{stem}.rhs"));
        let end_label = self.fresh_label(&format!("{stem}.end"));

        let lhs = self.emit_condition(lhs)?;
        let skip_from = self.block.clone();
        match op {
            BinaryOp::LogicalAnd => writeln!(
                self.body,
                "  br i1 {lhs}, label %{rhs_label}, label %{end_label}"
            )?,
            _ => writeln!(
                self.body,
                "  br i1 {lhs}, label %{end_label}, label %{rhs_label}"
            )?,
        }
        self.terminated = true;

        self.start_block(&rhs_label)?;
        let rhs = self.emit_condition(rhs)?;
        let rhs_from = self.block.clone();
        self.branch_to(&end_label)?;

        self.start_block(&end_label)?;
        let register = self.fresh();
        writeln!(
            self.body,
            "  %{register} = phi i1 [ {skip_value}, %{skip_from} ], [ {rhs}, %{rhs_from} ]"
        )?;
        Ok(Value::new(
            format!("%{register}"),
            fundamental_type_for(FundamentalType::Bool),
        ))
    }

    fn emit_conditional(&mut self, conditional: &ConditionalExp) -> Result<Value> {
        let result_type = common_type(
            &type_of_exp(&conditional.then)?,
            &type_of_exp(&conditional.els)?,
        )?;
        let ty_text = ir_type(&result_type)?;

        let then_label = self.fresh_label("cond.then");
        let else_label = self.fresh_label("cond.else");
        let end_label = self.fresh_label("cond.end");

        let condition = self.emit_condition(&conditional.condition)?;
        writeln!(
            self.body,
            "  br i1 {condition}, label %{then_label}, label %{else_label}"
        )?;
        self.terminated = true;

        self.start_block(&then_label)?;
        let then_value = self.emit_exp(&conditional.then)?;
        let then_value = self.convert(then_value, &result_type)?;
        let then_from = self.block.clone();
        self.branch_to(&end_label)?;

        self.start_block(&else_label)?;
        let else_value = self.emit_exp(&conditional.els)?;
        let else_value = self.convert(else_value, &result_type)?;
        let else_from = self.block.clone();
        self.branch_to(&end_label)?;

        self.start_block(&end_label)?;
        let register = self.fresh();
        writeln!(
            self.body,
            "  %{register} = phi {ty_text} [ {}, %{then_from} ], [ {}, %{else_from} ]",
            then_value.text, else_value.text
        )?;
        Ok(Value::new(format!("%{register}"), result_type))
    }

    fn emit_assignment(&mut self, op: AssignOp, dst: &Exp, src: &Exp) -> Result<Value> {
        let (slot, ty) = self.lvalue_slot(dst)?;
        let ty_text = ir_type(&ty)?;

        let value = match op.binary_op() {
            None => {
                let value = self.emit_exp(src)?;
                self.convert(value, &ty)?
            }
            Some(binary) => {
                let old = self.fresh();
                writeln!(self.body, "  %{old} = load {ty_text}, ptr {slot}")?;
                let current = Value::new(format!("%{old}"), Arc::clone(&ty));
                let rhs = self.emit_exp(src)?;
                let combined = self.emit_binary_values(binary, current, rhs)?;
                self.convert(combined, &ty)?
            }
        };

        writeln!(self.body, "  store {ty_text} {}, ptr {slot}", value.text)?;
        Ok(value)
    }

    fn emit_call(&mut self, designator: &Exp, arguments: &[Exp]) -> Result<Value> {
        let Exp::Var(object) = designator else {
            return Err(EmitError::Unimplemented("indirect calls"));
        };
        let Some(function) = object.ty.function_data() else {
            return Err(EmitError::Unimplemented("calls through object pointers"));
        };

        let mut rendered = Vec::with_capacity(arguments.len());
        for (index, argument) in arguments.iter().enumerate() {
            let value = self.emit_exp(argument)?;
            let value = match function.parameters.get(index) {
                Some(parameter) => self.convert(value, &parameter.ty)?,
                // variadic extras go as they are
                None => value,
            };
            rendered.push(format!("{} {}", ir_type(&value.ty)?, value.text));
        }
        let rendered = rendered.join(", ");

        let return_type = Arc::clone(&function.return_type);
        if return_type.kind == FundamentalType::Void {
            writeln!(self.body, "  call void @{}({rendered})", object.identifier)?;
            Ok(Value::new("", return_type))
        } else {
            let ty_text = ir_type(&return_type)?;
            let register = self.fresh();
            writeln!(
                self.body,
                "  %{register} = call {ty_text} @{}({rendered})",
                object.identifier
            )?;
            Ok(Value::new(format!("%{register}"), return_type))
        }
    }

    /// Numeric conversion of a value to a target type, choosing the cast
    /// mnemonic from the two types' IR renderings and signedness.
    fn convert(&mut self, value: Value, target: &Arc<Type>) -> Result<Value> {
        let from_text = ir_type(&value.ty)?;
        let to_text = ir_type(target)?;

        let from_float = value.ty.kind.is_floating();
        let to_float = target.kind.is_floating();

        if from_text == to_text && from_float == to_float {
            return Ok(Value::new(value.text, Arc::clone(target)));
        }

        let mnemonic = match (from_float, to_float) {
            (false, false) => {
                let (Some(from_bits), Some(to_bits)) =
                    (int_bits(value.ty.kind), int_bits(target.kind))
                else {
                    return Err(EmitError::UnsupportedType(target.kind));
                };
                if to_bits > from_bits {
                    if value.ty.kind.is_unsigned() {
                        "zext"
                    } else {
                        "sext"
                    }
                } else {
                    "trunc"
                }
            }
            (false, true) => {
                if value.ty.kind.is_unsigned() {
                    "uitofp"
                } else {
                    "sitofp"
                }
            }
            (true, false) => {
                if target.kind.is_unsigned() {
                    "fptoui"
                } else {
                    "fptosi"
                }
            }
            (true, true) => {
                let from_rank = float_rank(value.ty.kind).unwrap_or(2);
                let to_rank = float_rank(target.kind).unwrap_or(2);
                if to_rank > from_rank {
                    "fpext"
                } else {
                    "fptrunc"
                }
            }
        };

        let register = self.fresh();
        writeln!(
            self.body,
            "  %{register} = {mnemonic} {from_text} {} to {to_text}",
            value.text
        )?;
        Ok(Value::new(format!("%{register}"), Arc::clone(target)))
    }
}

/// Structural type of an expression, used where a result type must be known
/// before both operands are emitted (phi nodes, sizeof). No implicit
/// conversions are checked; this is the hook semantic analysis would
/// replace.
fn type_of_exp(exp: &Exp) -> Result<Arc<Type>> {
    let ty = match exp {
        Exp::Constant(constant) => constant.ty(),
        Exp::Var(object) => Arc::clone(&object.ty),
        Exp::StringLiteral(_) => Type::pointer_to(
            fundamental_type_for(FundamentalType::Char),
            crate::types::SpecifierFlags::new(),
        ),
        Exp::Unary(UnaryOp::LogicalNot, _) => fundamental_type_for(FundamentalType::Int),
        Exp::Unary(UnaryOp::AddressOf, inner) => Type::pointer_to(
            type_of_exp(inner)?,
            crate::types::SpecifierFlags::new(),
        ),
        Exp::Unary(UnaryOp::Dereference, inner) => {
            let pointer = type_of_exp(inner)?;
            match pointer.pointed_type() {
                Some(pointed) => Arc::clone(pointed),
                None => return Err(EmitError::Unimplemented("dereference of non-pointers")),
            }
        }
        Exp::Unary(_, inner) => type_of_exp(inner)?,
        Exp::Binary(op, _, _) if op.is_comparison() || op.is_short_circuit() => {
            fundamental_type_for(FundamentalType::Int)
        }
        Exp::Binary(_, lhs, rhs) => common_type(&type_of_exp(lhs)?, &type_of_exp(rhs)?)?,
        Exp::Assignment(_, dst, _) => type_of_exp(dst)?,
        Exp::Conditional(conditional) => common_type(
            &type_of_exp(&conditional.then)?,
            &type_of_exp(&conditional.els)?,
        )?,
        Exp::Cast(ty, _) => Arc::clone(ty),
        Exp::Call(designator, _) => {
            let Exp::Var(object) = designator.as_ref() else {
                return Err(EmitError::Unimplemented("indirect calls"));
            };
            match object.ty.function_data() {
                Some(function) => Arc::clone(&function.return_type),
                None => return Err(EmitError::Unimplemented("calls through object pointers")),
            }
        }
        Exp::SizeOfExp(_) | Exp::SizeOfType(_) | Exp::AlignOfType(_) => {
            fundamental_type_for(FundamentalType::UnsignedLong)
        }
        Exp::Comma(_, rhs) => type_of_exp(rhs)?,
        Exp::Index(_, _) => return Err(EmitError::Unimplemented("array indexing")),
        Exp::Member(_, _) | Exp::Arrow(_, _) => {
            return Err(EmitError::Unimplemented("member access"))
        }
    };
    Ok(ty)
}

fn comparison_mnemonic(op: BinaryOp, kind: FundamentalType) -> &'static str {
    if kind.is_floating() {
        match op {
            BinaryOp::Equal => "fcmp oeq",
            BinaryOp::NotEqual => "fcmp one",
            BinaryOp::LessThan => "fcmp olt",
            BinaryOp::LessThanOrEqual => "fcmp ole",
            BinaryOp::GreaterThan => "fcmp ogt",
            _ => "fcmp oge",
        }
    } else if kind.is_unsigned() {
        match op {
            BinaryOp::Equal => "icmp eq",
            BinaryOp::NotEqual => "icmp ne",
            BinaryOp::LessThan => "icmp ult",
            BinaryOp::LessThanOrEqual => "icmp ule",
            BinaryOp::GreaterThan => "icmp ugt",
            _ => "icmp uge",
        }
    } else {
        match op {
            BinaryOp::Equal => "icmp eq",
            BinaryOp::NotEqual => "icmp ne",
            BinaryOp::LessThan => "icmp slt",
            BinaryOp::LessThanOrEqual => "icmp sle",
            BinaryOp::GreaterThan => "icmp sgt",
            _ => "icmp sge",
        }
    }
}

fn binary_mnemonic(op: BinaryOp, kind: FundamentalType) -> Result<&'static str> {
    let floating = kind.is_floating();
    let unsigned = kind.is_unsigned();

    let mnemonic = match op {
        BinaryOp::Add => {
            if floating {
                "fadd"
            } else {
                "add"
            }
        }
        BinaryOp::Subtract => {
            if floating {
                "fsub"
            } else {
                "sub"
            }
        }
        BinaryOp::Multiply => {
            if floating {
                "fmul"
            } else {
                "mul"
            }
        }
        BinaryOp::Divide => {
            if floating {
                "fdiv"
            } else if unsigned {
                "udiv"
            } else {
                "sdiv"
            }
        }
        BinaryOp::Modulo => {
            if floating {
                "frem"
            } else if unsigned {
                "urem"
            } else {
                "srem"
            }
        }
        BinaryOp::ShiftLeft if !floating => "shl",
        BinaryOp::ShiftRight if !floating => {
            if unsigned {
                "lshr"
            } else {
                "ashr"
            }
        }
        BinaryOp::BitwiseAnd if !floating => "and",
        BinaryOp::BitwiseOr if !floating => "or",
        BinaryOp::BitwiseXor if !floating => "xor",
        _ => return Err(EmitError::Unimplemented("bitwise operations on floating types")),
    };
    Ok(mnemonic)
}

/// `define [internal] <ty> @name(<ty> %0, ..) { entry: .. }` per C11 6.9.1
/// and the LangRef function-definition syntax. `internal` linkage comes
/// from a `static` in the declaration specifiers.
fn emit_function_definition(out: &mut String, object: &Rc<Object>) -> Result<()> {
    let function = object
        .ty
        .function_data()
        .expect("function definitions carry function data");

    write!(out, "define")?;
    if storage_flags(&function.return_type).contains(Specifier::Static) {
        write!(out, " internal")?;
    }
    write!(
        out,
        " {} @{}(",
        ir_type(&function.return_type)?,
        object.identifier
    )?;

    let mut emitter = FunctionEmitter::new();
    for (index, parameter) in function.parameters.iter().enumerate() {
        let Some(name) = &parameter.name else {
            return Err(EmitError::UnnamedFunctionParameter(object.identifier.clone()));
        };
        if index > 0 {
            write!(out, ", ")?;
        }
        let register = emitter.fresh();
        write!(out, "{} %{register}", ir_type(&parameter.ty)?)?;
        emitter.bindings.insert(
            name.clone(),
            Binding::Param {
                register,
                ty: Arc::clone(&parameter.ty),
            },
        );
    }
    writeln!(out, ") {{")?;
    writeln!(out, "entry:")?;

    let body = object.body.borrow();
    let block = body.as_ref().expect("definitions have bodies");
    emitter.emit_block(block)?;

    // a body may fall off the end; give it a return
    if !emitter.terminated {
        match function.return_type.kind {
            FundamentalType::Void => writeln!(emitter.body, "  ret void")?,
            kind if kind.is_floating() => writeln!(
                emitter.body,
                "  ret {} 0.0",
                ir_type(&function.return_type)?
            )?,
            _ => writeln!(emitter.body, "  ret {} 0", ir_type(&function.return_type)?)?,
        }
    }

    out.push_str(&emitter.body);
    writeln!(out, "}}")?;
    Ok(())
}

/// File-scope declarations: objects become globals, functions become
/// `declare` lines (skipped when a definition exists in this unit).
fn emit_file_scope_declaration(
    out: &mut String,
    declaration: &Declaration,
    defined: &HashSet<&str>,
    declared: &mut HashSet<Identifier>,
) -> Result<()> {
    for init_declarator in &declaration.declarators {
        let object = &init_declarator.object;

        if storage_flags(&object.ty).contains(Specifier::Typedef) {
            continue;
        }

        if object.is_function() {
            if defined.contains(object.identifier.as_str())
                || !declared.insert(object.identifier.clone())
            {
                continue;
            }
            emit_function_declare(out, object)?;
            continue;
        }

        let ty_text = ir_type(&object.ty)?;
        let storage = storage_flags(&object.ty);
        let linkage = if storage.contains(Specifier::Static) {
            "internal "
        } else {
            ""
        };

        match &init_declarator.init {
            None if storage.contains(Specifier::Extern) => {
                writeln!(out, "@{} = external global {ty_text}", object.identifier)?;
            }
            None => {
                writeln!(
                    out,
                    "@{} = {linkage}global {ty_text} zeroinitializer",
                    object.identifier
                )?;
            }
            Some(Initializer::Expression(Exp::Constant(constant))) => {
                let init_text = global_constant_text(*constant, &object.ty);
                writeln!(
                    out,
                    "@{} = {linkage}global {ty_text} {init_text}",
                    object.identifier
                )?;
            }
            Some(_) => {
                return Err(EmitError::NonConstantGlobalInitializer(
                    object.identifier.clone(),
                ));
            }
        }
    }
    Ok(())
}

/// A constant initializer rendered in the global's own type; the written
/// form must match the IR type, so an integer literal initializing a
/// floating global gets a decimal point and vice versa.
fn global_constant_text(constant: Constant, ty: &Type) -> String {
    let target_floating = ty.kind.is_floating();
    match constant {
        Constant::Double(v) => {
            if target_floating {
                float_text(v)
            } else {
                format!("{}", v as i64)
            }
        }
        other => {
            if target_floating {
                float_text(match other {
                    Constant::Int(v) => f64::from(v),
                    Constant::UnsignedInt(v) => f64::from(v),
                    Constant::Long(v) | Constant::LongLong(v) => v as f64,
                    Constant::UnsignedLong(v) | Constant::UnsignedLongLong(v) => v as f64,
                    Constant::Double(v) => v,
                })
            } else {
                other.to_string()
            }
        }
    }
}

fn emit_function_declare(out: &mut String, object: &Rc<Object>) -> Result<()> {
    let function = object
        .ty
        .function_data()
        .expect("function declarations carry function data");

    write!(
        out,
        "declare {} @{}(",
        ir_type(&function.return_type)?,
        object.identifier
    )?;
    for (index, parameter) in function.parameters.iter().enumerate() {
        if index > 0 {
            write!(out, ", ")?;
        }
        write!(out, "{}", ir_type(&parameter.ty)?)?;
    }
    if function.variadic {
        if !function.parameters.is_empty() {
            write!(out, ", ")?;
        }
        write!(out, "...")?;
    }
    writeln!(out, ")")?;
    Ok(())
}
