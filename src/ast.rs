//! The typed abstract syntax tree and the symbol/scope model.
//!
//! The nodes form the contract between the parser and the IR emitter: the
//! parser produces a [`TranslationUnit`], the emitter walks it in parse
//! order. Sharing is explicit: [`Object`]s are co-owned by the scope that
//! declared them and by every node that references them; [`Type`]s are
//! shared through the interner in [`crate::types`].

use crate::types::{fundamental_type_for, FundamentalType, Type};

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

pub type Identifier = String;

/// The whole translation unit: external declarations in source order.
#[derive(Debug)]
pub struct TranslationUnit {
    pub items: Vec<ExternalDeclaration>,
}

pub enum ExternalDeclaration {
    /// a declarator of function kind followed by its body
    FunctionDefinition(Rc<Object>),
    Declaration(Declaration),
}

/// A declared name. A function-kind object has a body iff it was parsed as
/// a function definition rather than a declaration; the body is attached
/// after the object has been registered, so the name is visible inside its
/// own body.
pub struct Object {
    pub identifier: Identifier,
    pub ty: Arc<Type>,
    pub body: RefCell<Option<Block>>,
}

impl Object {
    pub fn new(identifier: Identifier, ty: Arc<Type>) -> Rc<Self> {
        Rc::new(Self {
            identifier,
            ty,
            body: RefCell::new(None),
        })
    }

    #[inline]
    pub fn is_function(&self) -> bool {
        self.ty.is_function()
    }

    pub fn has_body(&self) -> bool {
        self.body.borrow().is_some()
    }
}

#[derive(Debug)]
pub struct Declaration {
    pub declarators: Vec<InitDeclarator>,
}

#[derive(Debug)]
pub struct InitDeclarator {
    pub object: Rc<Object>,
    pub init: Option<Initializer>,
}

#[derive(Debug)]
pub enum Initializer {
    Expression(Exp),
    List(Vec<Initializer>),
}

#[derive(Debug)]
pub struct Block {
    pub items: Vec<BlockItem>,
}

#[derive(Debug)]
pub enum BlockItem {
    Statement(Statement),
    Declaration(Declaration),
}

#[derive(Debug)]
pub enum Statement {
    Labeled(Identifier, Box<Statement>),
    Case(Exp, Box<Statement>),
    Default(Box<Statement>),
    Compound(Block),
    Exp(Exp),
    If(If),
    Switch(Switch),
    While(While),
    DoWhile(DoWhile),
    For(For),
    Goto(Identifier),
    Continue,
    Break,
    Return(Return),
    Null,
}

#[derive(Debug)]
pub struct If {
    pub condition: Exp,
    pub then: Box<Statement>,
    pub els: Option<Box<Statement>>,
}

#[derive(Debug)]
pub struct Switch {
    pub ctrl_exp: Exp,
    pub body: Box<Statement>,
}

#[derive(Debug)]
pub struct While {
    pub condition: Exp,
    pub body: Box<Statement>,
}

#[derive(Debug)]
pub struct DoWhile {
    pub body: Box<Statement>,
    pub condition: Exp,
}

#[derive(Debug)]
pub struct For {
    pub init: ForInit,
    pub condition: Option<Exp>,
    pub post: Option<Exp>,
    pub body: Box<Statement>,
}

/// The first `for` header slot: a declaration scoped to the loop, or an
/// optional expression.
#[derive(Debug)]
pub enum ForInit {
    Declaration(Declaration),
    Exp(Option<Exp>),
}

/// A return statement keeps the scope it appeared in, so the emitter can
/// recover the enclosing function's return type.
#[derive(Debug)]
pub struct Return {
    pub exp: Option<Exp>,
    pub scope: Scope,
}

#[derive(Debug, Clone)]
pub enum Exp {
    Constant(Constant),
    StringLiteral(String),
    Var(Rc<Object>),
    Unary(UnaryOp, Box<Exp>),
    Binary(BinaryOp, Box<Exp>, Box<Exp>),
    Assignment(AssignOp, Box<Exp>, Box<Exp>),
    Conditional(ConditionalExp),
    Cast(Arc<Type>, Box<Exp>),
    Call(Box<Exp>, Vec<Exp>),
    Index(Box<Exp>, Box<Exp>),
    Member(Box<Exp>, Identifier),
    Arrow(Box<Exp>, Identifier),
    SizeOfExp(Box<Exp>),
    SizeOfType(Arc<Type>),
    AlignOfType(Arc<Type>),
    Comma(Box<Exp>, Box<Exp>),
}

#[derive(Debug, Clone)]
pub struct ConditionalExp {
    pub condition: Box<Exp>,
    pub then: Box<Exp>,
    pub els: Box<Exp>,
}

impl Exp {
    pub fn unary(op: UnaryOp, inner: Exp) -> Self {
        Self::Unary(op, Box::new(inner))
    }

    pub fn binary(op: BinaryOp, lhs: Exp, rhs: Exp) -> Self {
        Self::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn assignment(op: AssignOp, dst: Exp, src: Exp) -> Self {
        Self::Assignment(op, Box::new(dst), Box::new(src))
    }

    pub fn conditional(condition: Exp, then: Exp, els: Exp) -> Self {
        Self::Conditional(ConditionalExp {
            condition: Box::new(condition),
            then: Box::new(then),
            els: Box::new(els),
        })
    }

    pub fn comma(lhs: Exp, rhs: Exp) -> Self {
        Self::Comma(Box::new(lhs), Box::new(rhs))
    }

    #[inline]
    pub fn is_var(&self) -> bool {
        matches!(self, Self::Var(_))
    }
}

/// A numeric constant with its digested value in the width of its inferred
/// fundamental type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constant {
    Int(i32),
    UnsignedInt(u32),
    Long(i64),
    UnsignedLong(u64),
    LongLong(i64),
    UnsignedLongLong(u64),
    Double(f64),
}

impl Constant {
    pub fn data_type(self) -> FundamentalType {
        match self {
            Self::Int(_) => FundamentalType::Int,
            Self::UnsignedInt(_) => FundamentalType::UnsignedInt,
            Self::Long(_) => FundamentalType::Long,
            Self::UnsignedLong(_) => FundamentalType::UnsignedLong,
            Self::LongLong(_) => FundamentalType::LongLong,
            Self::UnsignedLongLong(_) => FundamentalType::UnsignedLongLong,
            Self::Double(_) => FundamentalType::Double,
        }
    }

    pub fn ty(self) -> Arc<Type> {
        fundamental_type_for(self.data_type())
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::UnsignedInt(v) => write!(f, "{v}"),
            Self::Long(v) | Self::LongLong(v) => write!(f, "{v}"),
            Self::UnsignedLong(v) | Self::UnsignedLongLong(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    AddressOf,
    Dereference,
    Plus,
    Negate,
    Complement,
    LogicalNot,
    PrefixIncrement,
    PrefixDecrement,
    PostfixIncrement,
    PostfixDecrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Multiply,
    Divide,
    Modulo,
    Add,
    Subtract,
    ShiftLeft,
    ShiftRight,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    Equal,
    NotEqual,
    BitwiseAnd,
    BitwiseXor,
    BitwiseOr,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOp {
    #[inline]
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::LessThan
                | Self::GreaterThan
                | Self::LessThanOrEqual
                | Self::GreaterThanOrEqual
                | Self::Equal
                | Self::NotEqual
        )
    }

    #[inline]
    pub fn is_short_circuit(self) -> bool {
        matches!(self, Self::LogicalAnd | Self::LogicalOr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    And,
    Or,
    Xor,
    ShiftLeft,
    ShiftRight,
}

impl AssignOp {
    /// The binary operation a compound assignment applies before storing;
    /// `None` for plain `=`.
    pub fn binary_op(self) -> Option<BinaryOp> {
        match self {
            Self::Assign => None,
            Self::Add => Some(BinaryOp::Add),
            Self::Subtract => Some(BinaryOp::Subtract),
            Self::Multiply => Some(BinaryOp::Multiply),
            Self::Divide => Some(BinaryOp::Divide),
            Self::Modulo => Some(BinaryOp::Modulo),
            Self::And => Some(BinaryOp::BitwiseAnd),
            Self::Or => Some(BinaryOp::BitwiseOr),
            Self::Xor => Some(BinaryOp::BitwiseXor),
            Self::ShiftLeft => Some(BinaryOp::ShiftLeft),
            Self::ShiftRight => Some(BinaryOp::ShiftRight),
        }
    }
}

/// A lexically scoped symbol table with two name spaces: ordinary names
/// (variables, functions, enum constants) and typedef names. Lookup falls
/// through to the parent; the outermost scope has none.
///
/// Scopes are created on entry to a compound statement, but they are not a
/// plain parser-owned stack: return statements keep a handle, so the data
/// survives into IR emission. The handle is a cheap `Rc` clone.
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeData>,
}

struct ScopeData {
    parent: Option<Scope>,
    ordinary: RefCell<FxHashMap<Identifier, Rc<Object>>>,
    typedefs: RefCell<FxHashMap<Identifier, Arc<Type>>>,
    return_type: Option<Arc<Type>>,
}

impl Scope {
    pub fn file_scope() -> Self {
        Self::with_parent(None, None)
    }

    /// A nested scope, as opened by `{` or a `for` declaration header.
    pub fn child(&self) -> Self {
        Self::with_parent(Some(self.clone()), None)
    }

    /// The scope of a function body; it records the function's return type
    /// for the return statements inside.
    pub fn function_body(&self, return_type: Arc<Type>) -> Self {
        Self::with_parent(Some(self.clone()), Some(return_type))
    }

    fn with_parent(parent: Option<Scope>, return_type: Option<Arc<Type>>) -> Self {
        Self {
            inner: Rc::new(ScopeData {
                parent,
                ordinary: RefCell::new(FxHashMap::default()),
                typedefs: RefCell::new(FxHashMap::default()),
                return_type,
            }),
        }
    }

    pub fn is_file_scope(&self) -> bool {
        self.inner.parent.is_none()
    }

    pub fn declare(&self, object: Rc<Object>) {
        self.inner
            .ordinary
            .borrow_mut()
            .insert(object.identifier.clone(), object);
    }

    pub fn declare_typedef(&self, name: Identifier, ty: Arc<Type>) {
        self.inner.typedefs.borrow_mut().insert(name, ty);
    }

    pub fn lookup(&self, name: &str) -> Option<Rc<Object>> {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            if let Some(object) = scope.inner.ordinary.borrow().get(name) {
                return Some(Rc::clone(object));
            }
            current = scope.inner.parent.clone();
        }
        None
    }

    pub fn lookup_typedef(&self, name: &str) -> Option<Arc<Type>> {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            if let Some(ty) = scope.inner.typedefs.borrow().get(name) {
                return Some(Arc::clone(ty));
            }
            current = scope.inner.parent.clone();
        }
        None
    }

    /// The return type of the innermost enclosing function body, if any.
    pub fn return_type(&self) -> Option<Arc<Type>> {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            if let Some(ty) = &scope.inner.return_type {
                return Some(Arc::clone(ty));
            }
            current = scope.inner.parent.clone();
        }
        None
    }
}

// Debug output stays shallow wherever following a reference could loop: a
// recursive function's body contains a Var of the function's own Object.
impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("identifier", &self.identifier)
            .field("type", &self.ty.kind)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<Identifier> = self.inner.ordinary.borrow().keys().cloned().collect();
        f.debug_struct("Scope")
            .field("names", &names)
            .field("file_scope", &self.is_file_scope())
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for ExternalDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FunctionDefinition(object) => f
                .debug_struct("FunctionDefinition")
                .field("object", object)
                .field("body", &object.body.borrow())
                .finish(),
            Self::Declaration(declaration) => {
                f.debug_tuple("Declaration").field(declaration).finish()
            }
        }
    }
}
