use crate::metadata::{signatures::SIGNATURE_HEADER, token::Token};

/// The type part of a signature (II.23.2.12)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum TypeSignature {
    /// `void`, only valid as a return type or behind a pointer
    #[default]
    Void,
    /// `bool`
    Boolean,
    /// `char`
    Char,
    /// `sbyte`
    I1,
    /// `byte`
    U1,
    /// `short`
    I2,
    /// `ushort`
    U2,
    /// `int`
    I4,
    /// `uint`
    U4,
    /// `long`
    I8,
    /// `ulong`
    U8,
    /// `float`
    R4,
    /// `double`
    R8,
    /// `string`
    String,
    /// Unmanaged pointer to a type
    Ptr(SignaturePointer),
    /// Managed reference to a type
    ByRef(Box<TypeSignature>),
    /// Value type named by a `TypeDefOrRef` token
    ValueType(Token),
    /// Reference type named by a `TypeDefOrRef` token
    Class(Token),
    /// Generic parameter of the enclosing type, by position
    GenericParamType(u32),
    /// A general array
    Array(SignatureArray),
    /// Instantiation of a generic type: the generic type and its arguments
    GenericInst(Box<TypeSignature>, Vec<TypeSignature>),
    /// `TypedReference`
    TypedByRef,
    /// `nint`
    I,
    /// `nuint`
    U,
    /// Function pointer
    FnPtr(Box<SignatureMethod>),
    /// `object`
    Object,
    /// Single-dimensional, zero based array
    SzArray(SignatureSzArray),
    /// Generic parameter of the enclosing method, by position
    GenericParamMethod(u32),
    /// A type prefixed by custom modifiers in a position that has no modifier list of its own
    Modified(Vec<CustomModifier>, Box<TypeSignature>),
    /// Runtime internal type
    Internal,
    /// Pinned type, only valid in local variable signatures
    Pinned(Box<TypeSignature>),
}

/// A `modreq` or `modopt` custom modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CustomModifier {
    /// `modreq` if set, else `modopt`
    pub required: bool,
    /// The modifier type - `TypeDefOrRefOrSpecEncoded`
    pub modifier_type: Token,
}

/// A general array: element type, rank and the optional sizes and lower bounds
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SignatureArray {
    /// The type in the array
    pub base: Box<TypeSignature>,
    /// The number of dimensions
    pub rank: u32,
    /// Sizes of the leading dimensions (may be fewer than `rank`)
    pub sizes: Vec<u32>,
    /// Lower bounds of the leading dimensions (may be fewer than `rank`)
    pub lower_bounds: Vec<i32>,
}

/// A single dimensional array
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SignatureSzArray {
    /// Custom modifiers of the element type
    pub modifiers: Vec<CustomModifier>,
    /// The type in the array
    pub base: Box<TypeSignature>,
}

/// A pointer to a type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SignaturePointer {
    /// Custom modifiers of the pointed-to type
    pub modifiers: Vec<CustomModifier>,
    /// The type pointed to
    pub base: Box<TypeSignature>,
}

/// Parameter (or return type) with optional custom modifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SignatureParameter {
    /// Custom modifiers of the parameter
    pub modifiers: Vec<CustomModifier>,
    /// Parameter is passed by reference
    pub by_ref: bool,
    /// The type of the parameter
    pub base: TypeSignature,
}

/// Calling convention kinds, stored in the low nibble of a method signature's first byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CallingConvention {
    /// Managed default
    #[default]
    Default,
    /// Native `cdecl`
    C,
    /// Native `stdcall`
    StdCall,
    /// Native `thiscall`
    ThisCall,
    /// Native `fastcall`
    FastCall,
    /// Managed variable argument list
    VarArg,
    /// Native, convention given by modifiers
    Unmanaged,
}

impl CallingConvention {
    /// The low nibble encoding this convention.
    #[must_use]
    pub fn bits(self) -> u8 {
        match self {
            CallingConvention::Default => 0x0,
            CallingConvention::C => 0x1,
            CallingConvention::StdCall => 0x2,
            CallingConvention::ThisCall => 0x3,
            CallingConvention::FastCall => 0x4,
            CallingConvention::VarArg => 0x5,
            CallingConvention::Unmanaged => 0x9,
        }
    }

    /// The convention encoded by the low nibble of `byte`, if it is a method convention.
    #[must_use]
    pub fn from_bits(byte: u8) -> Option<Self> {
        match byte & 0x0F {
            0x0 => Some(CallingConvention::Default),
            0x1 => Some(CallingConvention::C),
            0x2 => Some(CallingConvention::StdCall),
            0x3 => Some(CallingConvention::ThisCall),
            0x4 => Some(CallingConvention::FastCall),
            0x5 => Some(CallingConvention::VarArg),
            0x9 => Some(CallingConvention::Unmanaged),
            _ => None,
        }
    }
}

/// Method signature: `MethodDefSig`, `MethodRefSig` and `StandAloneMethodSig` (II.23.2.1-3)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SignatureMethod {
    /// Instance method (`HASTHIS`)
    pub has_this: bool,
    /// The `this` pointer is the first explicit parameter (`EXPLICITTHIS`)
    pub explicit_this: bool,
    /// The calling convention kind
    pub calling_convention: CallingConvention,
    /// Number of generic parameters; non-zero sets the `GENERIC` flag
    pub generic_param_count: u32,
    /// The return type
    pub return_type: SignatureParameter,
    /// The fixed parameters
    pub params: Vec<SignatureParameter>,
    /// Parameters following the vararg `SENTINEL` of a call site signature
    pub varargs: Vec<SignatureParameter>,
}

/// Field signature (II.23.2.4)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SignatureField {
    /// The custom modifiers for this field
    pub modifiers: Vec<CustomModifier>,
    /// The type of this field
    pub base: TypeSignature,
}

/// Property signature (II.23.2.5)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SignatureProperty {
    /// Indicates the passing of a 'this' pointer
    pub has_this: bool,
    /// The custom modifiers of the property type
    pub modifiers: Vec<CustomModifier>,
    /// The type of this property
    pub base: TypeSignature,
    /// The indexer parameters of this property
    pub params: Vec<SignatureParameter>,
}

/// Local variable signature (II.23.2.6)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SignatureLocalVariables {
    /// The local variables
    pub locals: Vec<SignatureLocalVariable>,
}

/// Represents a local variable in a method body
///
/// Custom modifiers and the `pinned` constraint may interleave on the wire; they are encoded
/// back as all modifiers followed by the constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SignatureLocalVariable {
    /// Custom modifiers
    pub modifiers: Vec<CustomModifier>,
    /// Is passed by reference
    pub is_byref: bool,
    /// This variable is pinned
    pub is_pinned: bool,
    /// The type of this variable
    pub base: TypeSignature,
}

/// Type specification signature (II.23.2.14)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SignatureTypeSpec {
    /// The specified type
    pub base: TypeSignature,
}

/// Method instantiation signature (II.23.2.15)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SignatureMethodSpec {
    /// Types of the generic arguments
    pub generic_args: Vec<TypeSignature>,
}

/// The kinds of signature a blob can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureKind {
    /// `MethodDefSig`, `MethodRefSig` or `StandAloneMethodSig`
    Method,
    /// `FieldSig`
    Field,
    /// `PropertySig`
    Property,
    /// `LocalVarSig`
    LocalVariables,
    /// `TypeSpec`
    TypeSpec,
    /// `MethodSpec`
    MethodSpec,
}

impl SignatureKind {
    /// Kind of a `MemberRef` signature: field signatures start with `0x06`, all others are
    /// method signatures.
    #[must_use]
    pub fn for_member_ref(blob: &[u8]) -> Self {
        match blob.first() {
            Some(&SIGNATURE_HEADER::FIELD) => SignatureKind::Field,
            _ => SignatureKind::Method,
        }
    }

    /// Kind of a `StandAloneSig` signature: local variables (`0x07`) or a method.
    #[must_use]
    pub fn for_standalone(blob: &[u8]) -> Self {
        match blob.first() {
            Some(&SIGNATURE_HEADER::LOCAL_SIG) => SignatureKind::LocalVariables,
            Some(&SIGNATURE_HEADER::FIELD) => SignatureKind::Field,
            _ => SignatureKind::Method,
        }
    }
}

/// A decoded signature of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Signature {
    /// Method signature
    Method(SignatureMethod),
    /// Field signature
    Field(SignatureField),
    /// Property signature
    Property(SignatureProperty),
    /// Local variable signature
    LocalVariables(SignatureLocalVariables),
    /// Type specification
    TypeSpec(SignatureTypeSpec),
    /// Method instantiation
    MethodSpec(SignatureMethodSpec),
}

impl Signature {
    /// The kind of this signature.
    #[must_use]
    pub fn kind(&self) -> SignatureKind {
        match self {
            Signature::Method(_) => SignatureKind::Method,
            Signature::Field(_) => SignatureKind::Field,
            Signature::Property(_) => SignatureKind::Property,
            Signature::LocalVariables(_) => SignatureKind::LocalVariables,
            Signature::TypeSpec(_) => SignatureKind::TypeSpec,
            Signature::MethodSpec(_) => SignatureKind::MethodSpec,
        }
    }
}
