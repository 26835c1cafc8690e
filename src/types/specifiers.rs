use std::{error, fmt};

/// One declaration-specifier keyword, decoupled from the token stream so the
/// type machinery does not depend on the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Specifier {
    // type specifiers
    Void,
    Char,
    Signed,
    Unsigned,
    Short,
    Long,
    Int,
    Float,
    Double,
    Bool,
    Complex,
    TypedefName,
    Struct,
    Union,
    Enum,
    // storage-class specifiers
    Typedef,
    Extern,
    Static,
    ThreadLocal,
    Auto,
    Register,
    // type qualifiers
    Const,
    Restrict,
    Volatile,
    Atomic,
    // function specifiers
    Inline,
    NoReturn,
    // alignment specifier
    AlignAs,
}

// Type-specifier bits stay in the low 12 so the multiset sum can be masked
// out in one AND. `long` may appear twice: it owns two adjacent bits so that
// LONG + LONG carries into LONG_SECOND and the sum stays unambiguous.
const VOID: u32 = 1;
const CHAR: u32 = 1 << 1;
const SIGNED: u32 = 1 << 2;
const UNSIGNED: u32 = 1 << 3;
const SHORT: u32 = 1 << 4;
const LONG: u32 = 1 << 5;
const LONG_SECOND: u32 = 1 << 6;
const INT: u32 = 1 << 7;
const FLOAT: u32 = 1 << 8;
const DOUBLE: u32 = 1 << 9;
const BOOL: u32 = 1 << 10;
const COMPLEX: u32 = 1 << 11;

const TYPE_SPECIFIER_MASK: u32 = 0xFFF;

const TYPEDEF_NAME: u32 = 1 << 12;
const STRUCT: u32 = 1 << 13;
const UNION: u32 = 1 << 14;
const ENUM: u32 = 1 << 15;

const TYPEDEF: u32 = 1 << 16;
const EXTERN: u32 = 1 << 17;
const STATIC: u32 = 1 << 18;
const THREAD_LOCAL: u32 = 1 << 19;
const AUTO: u32 = 1 << 20;
const REGISTER: u32 = 1 << 21;

const STORAGE_CLASS_MASK: u32 = TYPEDEF | EXTERN | STATIC | THREAD_LOCAL | AUTO | REGISTER;

const CONST: u32 = 1 << 22;
const RESTRICT: u32 = 1 << 23;
const VOLATILE: u32 = 1 << 24;
const ATOMIC: u32 = 1 << 25;

const INLINE: u32 = 1 << 26;
const NORETURN: u32 = 1 << 27;

const ALIGNAS: u32 = 1 << 28;

impl Specifier {
    fn bit(self) -> u32 {
        match self {
            Self::Void => VOID,
            Self::Char => CHAR,
            Self::Signed => SIGNED,
            Self::Unsigned => UNSIGNED,
            Self::Short => SHORT,
            Self::Long => LONG,
            Self::Int => INT,
            Self::Float => FLOAT,
            Self::Double => DOUBLE,
            Self::Bool => BOOL,
            Self::Complex => COMPLEX,
            Self::TypedefName => TYPEDEF_NAME,
            Self::Struct => STRUCT,
            Self::Union => UNION,
            Self::Enum => ENUM,
            Self::Typedef => TYPEDEF,
            Self::Extern => EXTERN,
            Self::Static => STATIC,
            Self::ThreadLocal => THREAD_LOCAL,
            Self::Auto => AUTO,
            Self::Register => REGISTER,
            Self::Const => CONST,
            Self::Restrict => RESTRICT,
            Self::Volatile => VOLATILE,
            Self::Atomic => ATOMIC,
            Self::Inline => INLINE,
            Self::NoReturn => NORETURN,
            Self::AlignAs => ALIGNAS,
        }
    }

    #[inline]
    pub fn is_type_specifier(self) -> bool {
        self.bit() & (TYPE_SPECIFIER_MASK | TYPEDEF_NAME | STRUCT | UNION | ENUM) != 0
    }

    #[inline]
    pub fn is_storage_class(self) -> bool {
        self.bit() & STORAGE_CLASS_MASK != 0
    }

    fn spelling(self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Char => "char",
            Self::Signed => "signed",
            Self::Unsigned => "unsigned",
            Self::Short => "short",
            Self::Long => "long",
            Self::Int => "int",
            Self::Float => "float",
            Self::Double => "double",
            Self::Bool => "_Bool",
            Self::Complex => "_Complex",
            Self::TypedefName => "typedef-name",
            Self::Struct => "struct",
            Self::Union => "union",
            Self::Enum => "enum",
            Self::Typedef => "typedef",
            Self::Extern => "extern",
            Self::Static => "static",
            Self::ThreadLocal => "_Thread_local",
            Self::Auto => "auto",
            Self::Register => "register",
            Self::Const => "const",
            Self::Restrict => "restrict",
            Self::Volatile => "volatile",
            Self::Atomic => "_Atomic",
            Self::Inline => "inline",
            Self::NoReturn => "_Noreturn",
            Self::AlignAs => "_Alignas",
        }
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spelling())
    }
}

/// Bitset over the declaration specifiers of one declaration.
///
/// One set of declaration specifiers applies to every init-declarator of a
/// declaration, so the parser folds the specifier tokens into a single value
/// of this type and threads it through the declarator parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpecifierFlags(u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecifierError {
    RepeatedTypeSpecifier(Specifier),
    TooManyLongs,
    ConflictingStorageClasses(Specifier),
    InvalidTypeSpecifiers(SpecifierFlags),
    EmptyTypeSpecifiers,
}

impl SpecifierFlags {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn contains(self, specifier: Specifier) -> bool {
        self.0 & specifier.bit() != 0
    }

    /// True once any type-specifier keyword (or typedef-name use) has been
    /// folded in. An identifier can only act as a typedef-name while this is
    /// still false.
    pub fn has_type_specifier(self) -> bool {
        self.0 & (TYPE_SPECIFIER_MASK | TYPEDEF_NAME | STRUCT | UNION | ENUM) != 0
    }

    /// The flags that qualify the resolved type: everything except the
    /// type-specifier keywords themselves, which resolution consumes.
    pub fn qualifying(self) -> Self {
        Self(self.0 & !(TYPE_SPECIFIER_MASK | TYPEDEF_NAME | STRUCT | UNION | ENUM))
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn without(self, specifier: Specifier) -> Self {
        Self(self.0 & !specifier.bit())
    }

    /// Folds one specifier keyword into the set, per C11 6.7:
    /// type specifiers may appear once (`long` twice); at most one storage
    /// class, except `_Thread_local` besides `static` or `extern`;
    /// qualifiers and function specifiers repeat silently.
    pub fn apply(&mut self, specifier: Specifier) -> Result<(), SpecifierError> {
        use Specifier as S;
        match specifier {
            S::Long => {
                if self.0 & LONG_SECOND != 0 {
                    return Err(SpecifierError::TooManyLongs);
                }
                self.0 += LONG;
            }

            S::Void
            | S::Char
            | S::Signed
            | S::Unsigned
            | S::Short
            | S::Int
            | S::Float
            | S::Double
            | S::Bool
            | S::Complex
            | S::TypedefName
            | S::Struct
            | S::Union
            | S::Enum => {
                if self.0 & specifier.bit() != 0 {
                    return Err(SpecifierError::RepeatedTypeSpecifier(specifier));
                }
                self.0 |= specifier.bit();
            }

            S::Typedef | S::Extern | S::Static | S::ThreadLocal | S::Auto | S::Register => {
                let set = self.0 & STORAGE_CLASS_MASK;
                if set != 0 {
                    let new_is_thread = specifier == S::ThreadLocal;
                    let new_is_linkage = matches!(specifier, S::Static | S::Extern);
                    let set_is_thread = set == THREAD_LOCAL;
                    let set_is_linkage = set == STATIC || set == EXTERN;
                    let allowed = (new_is_thread && set_is_linkage)
                        || (new_is_linkage && set_is_thread);
                    if !allowed {
                        return Err(SpecifierError::ConflictingStorageClasses(specifier));
                    }
                }
                self.0 |= specifier.bit();
            }

            // repeating a qualifier or function specifier behaves as if it
            // appeared once (C11 6.7.3p5, 6.7.4p5)
            S::Const | S::Restrict | S::Volatile | S::Atomic | S::Inline | S::NoReturn
            | S::AlignAs => {
                self.0 |= specifier.bit();
            }
        }
        Ok(())
    }

    /// Maps the type-specifier multiset to a fundamental type, following the
    /// legal combinations of C11 6.7.2p2. The low 12 bits are the multiset
    /// sum; every sum outside the table is an error.
    pub fn resolve(self) -> Result<super::FundamentalType, SpecifierError> {
        use super::FundamentalType as FT;

        let marker_bits = [
            (TYPEDEF_NAME, FT::TypedefName),
            (STRUCT, FT::Struct),
            (UNION, FT::Union),
            (ENUM, FT::Enum),
        ];
        for (bit, kind) in marker_bits {
            if self.0 & bit != 0 {
                if self.0 & TYPE_SPECIFIER_MASK != 0 || self.0 & !bit & (STRUCT | UNION | ENUM | TYPEDEF_NAME) != 0 {
                    return Err(SpecifierError::InvalidTypeSpecifiers(self));
                }
                return Ok(kind);
            }
        }

        let sum = self.0 & TYPE_SPECIFIER_MASK;
        let kind = match sum {
            0 => return Err(SpecifierError::EmptyTypeSpecifiers),
            s if s == VOID => FT::Void,
            s if s == CHAR => FT::Char,
            s if s == SIGNED + CHAR => FT::SignedChar,
            s if s == UNSIGNED + CHAR => FT::UnsignedChar,
            s if s == SHORT
                || s == SHORT + INT
                || s == SIGNED + SHORT
                || s == SIGNED + SHORT + INT =>
            {
                FT::Short
            }
            s if s == UNSIGNED + SHORT || s == UNSIGNED + SHORT + INT => FT::UnsignedShort,
            s if s == INT || s == SIGNED || s == SIGNED + INT => FT::Int,
            s if s == UNSIGNED || s == UNSIGNED + INT => FT::UnsignedInt,
            s if s == LONG
                || s == SIGNED + LONG
                || s == LONG + INT
                || s == SIGNED + LONG + INT =>
            {
                FT::Long
            }
            s if s == UNSIGNED + LONG || s == UNSIGNED + LONG + INT => FT::UnsignedLong,
            s if s == LONG + LONG
                || s == SIGNED + LONG + LONG
                || s == LONG + LONG + INT
                || s == SIGNED + LONG + LONG + INT =>
            {
                FT::LongLong
            }
            s if s == UNSIGNED + LONG + LONG || s == UNSIGNED + LONG + LONG + INT => {
                FT::UnsignedLongLong
            }
            s if s == FLOAT => FT::Float,
            s if s == DOUBLE => FT::Double,
            s if s == LONG + DOUBLE => FT::LongDouble,
            s if s == FLOAT + COMPLEX => FT::FloatComplex,
            s if s == DOUBLE + COMPLEX => FT::DoubleComplex,
            s if s == LONG + DOUBLE + COMPLEX => FT::LongDoubleComplex,
            s if s == BOOL => FT::Bool,
            _ => return Err(SpecifierError::InvalidTypeSpecifiers(self)),
        };
        Ok(kind)
    }
}

impl fmt::Display for SpecifierFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Specifier as S;
        const ALL: [Specifier; 28] = [
            S::Void,
            S::Char,
            S::Signed,
            S::Unsigned,
            S::Short,
            S::Long,
            S::Int,
            S::Float,
            S::Double,
            S::Bool,
            S::Complex,
            S::TypedefName,
            S::Struct,
            S::Union,
            S::Enum,
            S::Typedef,
            S::Extern,
            S::Static,
            S::ThreadLocal,
            S::Auto,
            S::Register,
            S::Const,
            S::Restrict,
            S::Volatile,
            S::Atomic,
            S::Inline,
            S::NoReturn,
            S::AlignAs,
        ];

        let mut first = true;
        let mut put = |f: &mut fmt::Formatter<'_>, word: &str| -> fmt::Result {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            write!(f, "{word}")
        };

        for specifier in ALL {
            if self.contains(specifier) {
                put(f, specifier.spelling())?;
                if specifier == S::Long && self.0 & LONG_SECOND != 0 {
                    put(f, "long")?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for SpecifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RepeatedTypeSpecifier(s) => write!(f, "repeated type specifier {s}"),
            Self::TooManyLongs => write!(f, "too many longs in type specification"),
            Self::ConflictingStorageClasses(s) => {
                write!(f, "storage class {s} conflicts with an earlier one")
            }
            Self::InvalidTypeSpecifiers(flags) => {
                write!(f, "invalid combination of type specifiers: {flags}")
            }
            Self::EmptyTypeSpecifiers => write!(f, "declaration without type specifiers"),
        }
    }
}

impl error::Error for SpecifierError {}
