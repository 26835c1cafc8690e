mod specifiers;

pub use specifiers::{Specifier, SpecifierError, SpecifierFlags};

use std::sync::{Arc, LazyLock};

/// The closed set of type kinds C recognises at the leaves of the type
/// grammar, plus the derived kinds (pointer, function).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FundamentalType {
    Void,
    Char,
    SignedChar,
    UnsignedChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    Double,
    LongDouble,
    FloatComplex,
    DoubleComplex,
    LongDoubleComplex,
    Bool,
    Struct,
    Union,
    Enum,
    EnumeratedValue,
    TypedefName,
    // derived kinds; these never have interned singletons
    Pointer,
    Function,
}

impl FundamentalType {
    #[inline]
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Char
                | Self::SignedChar
                | Self::UnsignedChar
                | Self::Short
                | Self::UnsignedShort
                | Self::Int
                | Self::UnsignedInt
                | Self::Long
                | Self::UnsignedLong
                | Self::LongLong
                | Self::UnsignedLongLong
                | Self::Bool
                | Self::EnumeratedValue
        )
    }

    #[inline]
    pub fn is_floating(self) -> bool {
        matches!(self, Self::Float | Self::Double | Self::LongDouble)
    }

    #[inline]
    pub fn is_arithmetic(self) -> bool {
        self.is_integer() || self.is_floating()
    }

    /// Whether operations on this kind use the unsigned IR flavor; the sign
    /// is carried by the operation, not the IR type.
    #[inline]
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            Self::UnsignedChar
                | Self::UnsignedShort
                | Self::UnsignedInt
                | Self::UnsignedLong
                | Self::UnsignedLongLong
                | Self::Bool
        )
    }
}

/// A complete C type: immutable and shared.
///
/// `pointed` is always set when `kind` is `Pointer`; `function` is always
/// set when `kind` is `Function`. The qualifying declaration-specifier flags
/// (const/volatile/storage/..) attach here; the type-specifier keywords
/// themselves are consumed by resolution and do not reappear.
#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    pub kind: FundamentalType,
    pub flags: SpecifierFlags,
    pub pointed: Option<Arc<Type>>,
    pub function: Option<FunctionData>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionData {
    pub return_type: Arc<Type>,
    pub parameters: Vec<FunctionParameter>,
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionParameter {
    pub ty: Arc<Type>,
    /// parameter names are optional in declarations; a definition with an
    /// unnamed parameter is rejected at emission
    pub name: Option<String>,
}

impl Type {
    fn fundamental(kind: FundamentalType) -> Self {
        Self {
            kind,
            flags: SpecifierFlags::new(),
            pointed: None,
            function: None,
        }
    }

    /// A fundamental type carrying qualifying flags. Falls back to the
    /// interned singleton when no flags remain after stripping the
    /// type-specifier keywords, so `int x;` gets the canonical `int`.
    pub fn with_flags(kind: FundamentalType, flags: SpecifierFlags) -> Arc<Self> {
        let qualifying = flags.qualifying();
        if qualifying.is_empty() {
            return fundamental_type_for(kind);
        }
        Arc::new(Self {
            kind,
            flags: qualifying,
            pointed: None,
            function: None,
        })
    }

    pub fn pointer_to(pointed: Arc<Type>, qualifiers: SpecifierFlags) -> Arc<Self> {
        Arc::new(Self {
            kind: FundamentalType::Pointer,
            flags: qualifiers,
            pointed: Some(pointed),
            function: None,
        })
    }

    pub fn function(data: FunctionData) -> Arc<Self> {
        Arc::new(Self {
            kind: FundamentalType::Function,
            flags: SpecifierFlags::new(),
            pointed: None,
            function: Some(data),
        })
    }

    #[inline]
    pub fn is_function(&self) -> bool {
        self.kind == FundamentalType::Function
    }

    #[inline]
    pub fn is_pointer(&self) -> bool {
        self.kind == FundamentalType::Pointer
    }

    pub fn pointed_type(&self) -> Option<&Arc<Type>> {
        self.pointed.as_ref()
    }

    pub fn function_data(&self) -> Option<&FunctionData> {
        self.function.as_ref()
    }
}

// Every non-derived kind has exactly one canonical Type, interned process
// wide before first use and never mutated after.
static FUNDAMENTAL_TYPES: LazyLock<Vec<Arc<Type>>> = LazyLock::new(|| {
    INTERNED_KINDS
        .iter()
        .map(|kind| Arc::new(Type::fundamental(*kind)))
        .collect()
});

const INTERNED_KINDS: [FundamentalType; 24] = [
    FundamentalType::Void,
    FundamentalType::Char,
    FundamentalType::SignedChar,
    FundamentalType::UnsignedChar,
    FundamentalType::Short,
    FundamentalType::UnsignedShort,
    FundamentalType::Int,
    FundamentalType::UnsignedInt,
    FundamentalType::Long,
    FundamentalType::UnsignedLong,
    FundamentalType::LongLong,
    FundamentalType::UnsignedLongLong,
    FundamentalType::Float,
    FundamentalType::Double,
    FundamentalType::LongDouble,
    FundamentalType::FloatComplex,
    FundamentalType::DoubleComplex,
    FundamentalType::LongDoubleComplex,
    FundamentalType::Bool,
    FundamentalType::Struct,
    FundamentalType::Union,
    FundamentalType::Enum,
    FundamentalType::EnumeratedValue,
    FundamentalType::TypedefName,
];

/// The canonical shared singleton for a non-derived kind.
pub fn fundamental_type_for(kind: FundamentalType) -> Arc<Type> {
    debug_assert!(
        !matches!(kind, FundamentalType::Pointer | FundamentalType::Function),
        "derived types are never interned"
    );
    Arc::clone(&FUNDAMENTAL_TYPES[kind as usize])
}
