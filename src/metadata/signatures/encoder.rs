//! Signature encoders, the exact inverse of [`crate::metadata::signatures::SignatureParser`].
//!
//! Each encoder writes the ECMA-335 II.23.2 form of one signature kind into a fresh buffer.
//! Parsing the output yields a value equal to the input.

use crate::{
    file::io::{encode_compressed_int, encode_compressed_uint},
    metadata::{
        signatures::{
            CustomModifier, Signature, SignatureField, SignatureLocalVariables,
            SignatureMethod, SignatureMethodSpec, SignatureParameter, SignatureProperty,
            SignatureTypeSpec, TypeSignature, CALLING_CONVENTION, ELEMENT_TYPE,
            SIGNATURE_HEADER,
        },
        token::Token,
    },
    Result,
};

/// Encodes a token as a `TypeDefOrRefOrSpecEncoded` value (II.23.2.8).
///
/// - TypeDef: `(rid << 2) | 0`
/// - TypeRef: `(rid << 2) | 1`
/// - TypeSpec: `(rid << 2) | 2`
fn encode_type_def_or_ref(token: Token, buffer: &mut Vec<u8>) -> Result<()> {
    let rid = token.row();
    let coded = match token.table() {
        0x02 => rid << 2,
        0x01 => (rid << 2) | 1,
        0x1B => (rid << 2) | 2,
        table => {
            return Err(malformed_error!(
                "Invalid token table 0x{:02X} for TypeDefOrRef coded index - {}",
                table,
                token
            ))
        }
    };
    encode_compressed_uint(coded, buffer)
}

fn encode_count(count: usize, buffer: &mut Vec<u8>) -> Result<()> {
    let count = u32::try_from(count)
        .map_err(|_| malformed_error!("Too many signature entries: {}", count))?;
    encode_compressed_uint(count, buffer)
}

fn encode_custom_mods(modifiers: &[CustomModifier], buffer: &mut Vec<u8>) -> Result<()> {
    for modifier in modifiers {
        buffer.push(if modifier.required {
            ELEMENT_TYPE::CMOD_REQD
        } else {
            ELEMENT_TYPE::CMOD_OPT
        });
        encode_type_def_or_ref(modifier.modifier_type, buffer)?;
    }
    Ok(())
}

/// Encodes a single type.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for a token outside `TypeDef`/`TypeRef`/`TypeSpec` or a
/// count that cannot be compressed.
pub fn encode_type(signature: &TypeSignature, buffer: &mut Vec<u8>) -> Result<()> {
    match signature {
        TypeSignature::Void => buffer.push(ELEMENT_TYPE::VOID),
        TypeSignature::Boolean => buffer.push(ELEMENT_TYPE::BOOLEAN),
        TypeSignature::Char => buffer.push(ELEMENT_TYPE::CHAR),
        TypeSignature::I1 => buffer.push(ELEMENT_TYPE::I1),
        TypeSignature::U1 => buffer.push(ELEMENT_TYPE::U1),
        TypeSignature::I2 => buffer.push(ELEMENT_TYPE::I2),
        TypeSignature::U2 => buffer.push(ELEMENT_TYPE::U2),
        TypeSignature::I4 => buffer.push(ELEMENT_TYPE::I4),
        TypeSignature::U4 => buffer.push(ELEMENT_TYPE::U4),
        TypeSignature::I8 => buffer.push(ELEMENT_TYPE::I8),
        TypeSignature::U8 => buffer.push(ELEMENT_TYPE::U8),
        TypeSignature::R4 => buffer.push(ELEMENT_TYPE::R4),
        TypeSignature::R8 => buffer.push(ELEMENT_TYPE::R8),
        TypeSignature::String => buffer.push(ELEMENT_TYPE::STRING),
        TypeSignature::Ptr(pointer) => {
            buffer.push(ELEMENT_TYPE::PTR);
            encode_custom_mods(&pointer.modifiers, buffer)?;
            encode_type(&pointer.base, buffer)?;
        }
        TypeSignature::ByRef(base) => {
            buffer.push(ELEMENT_TYPE::BYREF);
            encode_type(base, buffer)?;
        }
        TypeSignature::ValueType(token) => {
            buffer.push(ELEMENT_TYPE::VALUETYPE);
            encode_type_def_or_ref(*token, buffer)?;
        }
        TypeSignature::Class(token) => {
            buffer.push(ELEMENT_TYPE::CLASS);
            encode_type_def_or_ref(*token, buffer)?;
        }
        TypeSignature::GenericParamType(index) => {
            buffer.push(ELEMENT_TYPE::VAR);
            encode_compressed_uint(*index, buffer)?;
        }
        TypeSignature::Array(array) => {
            buffer.push(ELEMENT_TYPE::ARRAY);
            encode_type(&array.base, buffer)?;
            encode_compressed_uint(array.rank, buffer)?;
            encode_count(array.sizes.len(), buffer)?;
            for size in &array.sizes {
                encode_compressed_uint(*size, buffer)?;
            }
            encode_count(array.lower_bounds.len(), buffer)?;
            for bound in &array.lower_bounds {
                encode_compressed_int(*bound, buffer)?;
            }
        }
        TypeSignature::GenericInst(base, args) => {
            buffer.push(ELEMENT_TYPE::GENERICINST);
            encode_type(base, buffer)?;
            encode_count(args.len(), buffer)?;
            for arg in args {
                encode_type(arg, buffer)?;
            }
        }
        TypeSignature::TypedByRef => buffer.push(ELEMENT_TYPE::TYPEDBYREF),
        TypeSignature::I => buffer.push(ELEMENT_TYPE::I),
        TypeSignature::U => buffer.push(ELEMENT_TYPE::U),
        TypeSignature::FnPtr(method) => {
            buffer.push(ELEMENT_TYPE::FNPTR);
            encode_method_into(method, buffer)?;
        }
        TypeSignature::Object => buffer.push(ELEMENT_TYPE::OBJECT),
        TypeSignature::SzArray(array) => {
            buffer.push(ELEMENT_TYPE::SZARRAY);
            encode_custom_mods(&array.modifiers, buffer)?;
            encode_type(&array.base, buffer)?;
        }
        TypeSignature::GenericParamMethod(index) => {
            buffer.push(ELEMENT_TYPE::MVAR);
            encode_compressed_uint(*index, buffer)?;
        }
        TypeSignature::Modified(modifiers, base) => {
            encode_custom_mods(modifiers, buffer)?;
            encode_type(base, buffer)?;
        }
        TypeSignature::Internal => buffer.push(ELEMENT_TYPE::INTERNAL),
        TypeSignature::Pinned(base) => {
            buffer.push(ELEMENT_TYPE::PINNED);
            encode_type(base, buffer)?;
        }
    }
    Ok(())
}

/// Param ::= CustomMod* [BYREF] Type
fn encode_parameter(parameter: &SignatureParameter, buffer: &mut Vec<u8>) -> Result<()> {
    encode_custom_mods(&parameter.modifiers, buffer)?;
    if parameter.by_ref {
        buffer.push(ELEMENT_TYPE::BYREF);
    }
    encode_type(&parameter.base, buffer)
}

fn encode_method_into(signature: &SignatureMethod, buffer: &mut Vec<u8>) -> Result<()> {
    let mut convention = signature.calling_convention.bits();
    if signature.has_this {
        convention |= CALLING_CONVENTION::HASTHIS;
    }
    if signature.explicit_this {
        convention |= CALLING_CONVENTION::EXPLICITTHIS;
    }
    if signature.generic_param_count > 0 {
        convention |= CALLING_CONVENTION::GENERIC;
    }
    buffer.push(convention);

    if signature.generic_param_count > 0 {
        encode_compressed_uint(signature.generic_param_count, buffer)?;
    }

    encode_count(signature.params.len() + signature.varargs.len(), buffer)?;
    encode_parameter(&signature.return_type, buffer)?;
    for param in &signature.params {
        encode_parameter(param, buffer)?;
    }
    if !signature.varargs.is_empty() {
        buffer.push(ELEMENT_TYPE::SENTINEL);
        for param in &signature.varargs {
            encode_parameter(param, buffer)?;
        }
    }
    Ok(())
}

/// Encodes a method signature (II.23.2.1-3).
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if a type token or count cannot be encoded.
///
/// # Examples
///
/// ```rust
/// use dotcodec::metadata::signatures::{encode_method_signature, SignatureMethod, SignatureParameter, TypeSignature};
///
/// let method = SignatureMethod {
///     has_this: true,
///     params: vec![SignatureParameter { base: TypeSignature::String, ..Default::default() }],
///     ..Default::default()
/// };
/// assert_eq!(encode_method_signature(&method)?, vec![0x20, 0x01, 0x01, 0x0E]);
/// # Ok::<(), dotcodec::Error>(())
/// ```
pub fn encode_method_signature(signature: &SignatureMethod) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    encode_method_into(signature, &mut buffer)?;
    Ok(buffer)
}

/// Encodes a field signature (II.23.2.4).
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if a type token cannot be encoded.
pub fn encode_field_signature(signature: &SignatureField) -> Result<Vec<u8>> {
    let mut buffer = vec![SIGNATURE_HEADER::FIELD];
    encode_custom_mods(&signature.modifiers, &mut buffer)?;
    encode_type(&signature.base, &mut buffer)?;
    Ok(buffer)
}

/// Encodes a property signature (II.23.2.5).
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if a type token or count cannot be encoded.
pub fn encode_property_signature(signature: &SignatureProperty) -> Result<Vec<u8>> {
    let mut head = SIGNATURE_HEADER::PROPERTY;
    if signature.has_this {
        head |= CALLING_CONVENTION::HASTHIS;
    }

    let mut buffer = vec![head];
    encode_count(signature.params.len(), &mut buffer)?;
    encode_custom_mods(&signature.modifiers, &mut buffer)?;
    encode_type(&signature.base, &mut buffer)?;
    for param in &signature.params {
        encode_parameter(param, &mut buffer)?;
    }
    Ok(buffer)
}

/// Encodes a local variable signature (II.23.2.6).
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if a type token or count cannot be encoded.
pub fn encode_local_var_signature(signature: &SignatureLocalVariables) -> Result<Vec<u8>> {
    let mut buffer = vec![SIGNATURE_HEADER::LOCAL_SIG];
    encode_count(signature.locals.len(), &mut buffer)?;
    for local in &signature.locals {
        encode_custom_mods(&local.modifiers, &mut buffer)?;
        if local.is_pinned {
            buffer.push(ELEMENT_TYPE::PINNED);
        }
        if local.is_byref {
            buffer.push(ELEMENT_TYPE::BYREF);
        }
        encode_type(&local.base, &mut buffer)?;
    }
    Ok(buffer)
}

/// Encodes a type specification (II.23.2.14).
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if a type token cannot be encoded.
pub fn encode_typespec_signature(signature: &SignatureTypeSpec) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    encode_type(&signature.base, &mut buffer)?;
    Ok(buffer)
}

/// Encodes a method instantiation (II.23.2.15).
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if a type token or count cannot be encoded.
pub fn encode_method_spec_signature(signature: &SignatureMethodSpec) -> Result<Vec<u8>> {
    let mut buffer = vec![SIGNATURE_HEADER::GENERIC_INST];
    encode_count(signature.generic_args.len(), &mut buffer)?;
    for arg in &signature.generic_args {
        encode_type(arg, &mut buffer)?;
    }
    Ok(buffer)
}

impl Signature {
    /// Encode this signature into its blob form.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a type token or count cannot be encoded.
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Signature::Method(method) => encode_method_signature(method),
            Signature::Field(field) => encode_field_signature(field),
            Signature::Property(property) => encode_property_signature(property),
            Signature::LocalVariables(locals) => encode_local_var_signature(locals),
            Signature::TypeSpec(spec) => encode_typespec_signature(spec),
            Signature::MethodSpec(spec) => encode_method_spec_signature(spec),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::signatures::{
        CallingConvention, SignatureArray, SignatureKind, SignatureLocalVariable,
        SignatureParser, SignatureSzArray,
    };

    fn param(base: TypeSignature) -> SignatureParameter {
        SignatureParameter {
            base,
            ..Default::default()
        }
    }

    #[test]
    fn encode_known_bytes() {
        let field = SignatureField {
            modifiers: vec![CustomModifier {
                required: true,
                modifier_type: Token::new(0x0100_0002),
            }],
            base: TypeSignature::I4,
        };
        assert_eq!(encode_field_signature(&field).unwrap(), vec![0x06, 0x1F, 0x09, 0x08]);

        let spec = SignatureMethodSpec {
            generic_args: vec![TypeSignature::I4, TypeSignature::String],
        };
        assert_eq!(
            encode_method_spec_signature(&spec).unwrap(),
            vec![0x0A, 0x02, 0x08, 0x0E]
        );
    }

    #[test]
    fn parse_what_was_encoded() {
        let signatures = vec![
            Signature::Method(SignatureMethod {
                calling_convention: CallingConvention::VarArg,
                generic_param_count: 2,
                return_type: param(TypeSignature::GenericParamMethod(1)),
                params: vec![param(TypeSignature::Array(SignatureArray {
                    base: Box::new(TypeSignature::R8),
                    rank: 3,
                    sizes: vec![2, 0x4000],
                    lower_bounds: vec![-5],
                }))],
                varargs: vec![param(TypeSignature::Object)],
                ..Default::default()
            }),
            Signature::Property(SignatureProperty {
                has_this: false,
                modifiers: Vec::new(),
                base: TypeSignature::SzArray(SignatureSzArray {
                    modifiers: Vec::new(),
                    base: Box::new(TypeSignature::ValueType(Token::new(0x1B00_0003))),
                }),
                params: vec![param(TypeSignature::I)],
            }),
            Signature::LocalVariables(SignatureLocalVariables {
                locals: vec![SignatureLocalVariable {
                    modifiers: Vec::new(),
                    is_byref: true,
                    is_pinned: true,
                    base: TypeSignature::U1,
                }],
            }),
            Signature::TypeSpec(SignatureTypeSpec {
                base: TypeSignature::FnPtr(Box::new(SignatureMethod {
                    calling_convention: CallingConvention::StdCall,
                    return_type: param(TypeSignature::Void),
                    ..Default::default()
                })),
            }),
        ];

        for signature in signatures {
            let bytes = signature.encode().unwrap();
            let parsed = SignatureParser::new(&bytes).parse(signature.kind()).unwrap();
            assert_eq!(parsed, signature);
        }
    }

    #[test]
    fn bad_modifier_token() {
        let field = SignatureField {
            modifiers: vec![CustomModifier {
                required: false,
                modifier_type: Token::new(0x0600_0001),
            }],
            base: TypeSignature::I4,
        };
        assert!(encode_field_signature(&field).is_err());
        assert_eq!(SignatureKind::for_member_ref(&[0x06, 0x08]), SignatureKind::Field);
    }
}
