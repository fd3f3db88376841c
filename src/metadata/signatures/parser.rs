use crate::{
    file::ByteCursor,
    metadata::signatures::{
        CallingConvention, CustomModifier, Signature, SignatureArray, SignatureField,
        SignatureKind, SignatureLocalVariable, SignatureLocalVariables, SignatureMethod,
        SignatureMethodSpec, SignatureParameter, SignaturePointer, SignatureProperty,
        SignatureSzArray, SignatureTypeSpec, TypeSignature, CALLING_CONVENTION, ELEMENT_TYPE,
        SIGNATURE_HEADER,
    },
    Error::RecursionLimit,
    Result,
};

/// Default nesting limit of [`SignatureParser`]
pub const MAX_RECURSION_DEPTH: usize = 50;

/// Signature parser that handles all signature types in ECMA-335
///
/// # Example
///
/// ```rust
/// use dotcodec::metadata::signatures::SignatureParser;
/// let data = &[0x20, 0x01, 0x01, 0x0E];
/// let mut parser = SignatureParser::new(data);
/// let sig = parser.parse_method_signature()?;
/// assert!(sig.has_this);
/// assert_eq!(sig.params.len(), 1);
/// # Ok::<(), dotcodec::Error>(())
/// ```
///
/// A parser reads a single signature; create a new one for every blob.
pub struct SignatureParser<'a> {
    cursor: ByteCursor<'a>,
    depth: usize,
    max_depth: usize,
}

impl<'a> SignatureParser<'a> {
    /// Create a new `SignatureParser` from a byte slice
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self::from_cursor(ByteCursor::new(data))
    }

    /// Create a parser over a cursor, typically a view of one blob inside the `#Blob` heap.
    #[must_use]
    pub fn from_cursor(cursor: ByteCursor<'a>) -> Self {
        SignatureParser {
            cursor,
            depth: 0,
            max_depth: MAX_RECURSION_DEPTH,
        }
    }

    /// Replace the nesting limit.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parse a signature of the given kind.
    ///
    /// # Errors
    /// Returns an error if the signature data is malformed, truncated or nested too deeply.
    pub fn parse(&mut self, kind: SignatureKind) -> Result<Signature> {
        Ok(match kind {
            SignatureKind::Method => Signature::Method(self.parse_method_signature()?),
            SignatureKind::Field => Signature::Field(self.parse_field_signature()?),
            SignatureKind::Property => Signature::Property(self.parse_property_signature()?),
            SignatureKind::LocalVariables => {
                Signature::LocalVariables(self.parse_local_var_signature()?)
            }
            SignatureKind::TypeSpec => Signature::TypeSpec(self.parse_type_spec_signature()?),
            SignatureKind::MethodSpec => {
                Signature::MethodSpec(self.parse_method_spec_signature()?)
            }
        })
    }

    /// Parse a single type from the signature blob
    fn parse_type(&mut self) -> Result<TypeSignature> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(RecursionLimit(self.max_depth));
        }

        let result = self.parse_type_inner();
        self.depth -= 1;
        result
    }

    fn parse_type_inner(&mut self) -> Result<TypeSignature> {
        let current_byte = self.cursor.read_le::<u8>()?;
        match current_byte {
            ELEMENT_TYPE::VOID => Ok(TypeSignature::Void),
            ELEMENT_TYPE::BOOLEAN => Ok(TypeSignature::Boolean),
            ELEMENT_TYPE::CHAR => Ok(TypeSignature::Char),
            ELEMENT_TYPE::I1 => Ok(TypeSignature::I1),
            ELEMENT_TYPE::U1 => Ok(TypeSignature::U1),
            ELEMENT_TYPE::I2 => Ok(TypeSignature::I2),
            ELEMENT_TYPE::U2 => Ok(TypeSignature::U2),
            ELEMENT_TYPE::I4 => Ok(TypeSignature::I4),
            ELEMENT_TYPE::U4 => Ok(TypeSignature::U4),
            ELEMENT_TYPE::I8 => Ok(TypeSignature::I8),
            ELEMENT_TYPE::U8 => Ok(TypeSignature::U8),
            ELEMENT_TYPE::R4 => Ok(TypeSignature::R4),
            ELEMENT_TYPE::R8 => Ok(TypeSignature::R8),
            ELEMENT_TYPE::STRING => Ok(TypeSignature::String),
            ELEMENT_TYPE::PTR => Ok(TypeSignature::Ptr(SignaturePointer {
                modifiers: self.parse_custom_mods()?,
                base: Box::new(self.parse_type()?),
            })),
            ELEMENT_TYPE::BYREF => Ok(TypeSignature::ByRef(Box::new(self.parse_type()?))),
            ELEMENT_TYPE::VALUETYPE => Ok(TypeSignature::ValueType(
                self.cursor.read_compressed_token()?,
            )),
            ELEMENT_TYPE::CLASS => Ok(TypeSignature::Class(self.cursor.read_compressed_token()?)),
            ELEMENT_TYPE::VAR => Ok(TypeSignature::GenericParamType(
                self.cursor.read_compressed_uint()?,
            )),
            ELEMENT_TYPE::ARRAY => {
                let base = self.parse_type()?;
                let rank = self.cursor.read_compressed_uint()?;

                let num_sizes = self.cursor.read_compressed_uint()?;
                let mut sizes = Vec::with_capacity((num_sizes as usize).min(self.cursor.remaining()));
                for _ in 0..num_sizes {
                    sizes.push(self.cursor.read_compressed_uint()?);
                }

                let num_lo_bounds = self.cursor.read_compressed_uint()?;
                let mut lower_bounds =
                    Vec::with_capacity((num_lo_bounds as usize).min(self.cursor.remaining()));
                for _ in 0..num_lo_bounds {
                    lower_bounds.push(self.cursor.read_compressed_int()?);
                }

                Ok(TypeSignature::Array(SignatureArray {
                    base: Box::new(base),
                    rank,
                    sizes,
                    lower_bounds,
                }))
            }
            ELEMENT_TYPE::GENERICINST => {
                let peek_byte = self.cursor.peek_byte()?;
                if peek_byte != ELEMENT_TYPE::CLASS && peek_byte != ELEMENT_TYPE::VALUETYPE {
                    return Err(malformed_error!(
                        "GENERICINST - Next byte is not TYPE_CLASS or TYPE_VALUE - {}",
                        peek_byte
                    ));
                }

                let base_type = self.parse_type()?;
                let arg_count = self.cursor.read_compressed_uint()?;

                let mut type_args =
                    Vec::with_capacity((arg_count as usize).min(self.cursor.remaining()));
                for _ in 0..arg_count {
                    type_args.push(self.parse_type()?);
                }

                Ok(TypeSignature::GenericInst(Box::new(base_type), type_args))
            }
            ELEMENT_TYPE::TYPEDBYREF => Ok(TypeSignature::TypedByRef),
            ELEMENT_TYPE::I => Ok(TypeSignature::I),
            ELEMENT_TYPE::U => Ok(TypeSignature::U),
            ELEMENT_TYPE::FNPTR => Ok(TypeSignature::FnPtr(Box::new(
                self.parse_method_signature()?,
            ))),
            ELEMENT_TYPE::OBJECT => Ok(TypeSignature::Object),
            ELEMENT_TYPE::SZARRAY => Ok(TypeSignature::SzArray(SignatureSzArray {
                modifiers: self.parse_custom_mods()?,
                base: Box::new(self.parse_type()?),
            })),
            ELEMENT_TYPE::MVAR => Ok(TypeSignature::GenericParamMethod(
                self.cursor.read_compressed_uint()?,
            )),
            ELEMENT_TYPE::CMOD_REQD | ELEMENT_TYPE::CMOD_OPT => {
                // Step back so the modifier list is read as a whole
                self.cursor.seek(self.cursor.pos() - 1)?;
                let modifiers = self.parse_custom_mods()?;
                Ok(TypeSignature::Modified(
                    modifiers,
                    Box::new(self.parse_type()?),
                ))
            }
            ELEMENT_TYPE::INTERNAL => Ok(TypeSignature::Internal),
            ELEMENT_TYPE::PINNED => Ok(TypeSignature::Pinned(Box::new(self.parse_type()?))),
            _ => Err(malformed_error!(
                "Unsupported ELEMENT_TYPE - {}",
                current_byte
            )),
        }
    }

    /// Parse custom modifiers (`CMOD_OPT` or `CMOD_REQD`)
    fn parse_custom_mods(&mut self) -> Result<Vec<CustomModifier>> {
        let mut mods = Vec::new();

        while self.cursor.has_more_data() {
            let next_byte = self.cursor.peek_byte()?;
            if next_byte != ELEMENT_TYPE::CMOD_REQD && next_byte != ELEMENT_TYPE::CMOD_OPT {
                break;
            }

            self.cursor.advance_by(1)?;
            mods.push(CustomModifier {
                required: next_byte == ELEMENT_TYPE::CMOD_REQD,
                modifier_type: self.cursor.read_compressed_token()?,
            });
        }

        Ok(mods)
    }

    /// Parse a parameter including custom modifiers (`return_type` counts as parameter)
    fn parse_param(&mut self) -> Result<SignatureParameter> {
        let modifiers = self.parse_custom_mods()?;

        let by_ref = self.cursor.peek_byte()? == ELEMENT_TYPE::BYREF;
        if by_ref {
            self.cursor.advance_by(1)?;
        }

        Ok(SignatureParameter {
            modifiers,
            by_ref,
            base: self.parse_type()?,
        })
    }

    /// Parse a method signature from the blob - `MethodDefSig`, `MethodRefSig`, `StandAloneMethodSig`
    ///
    /// # Errors
    /// Returns an error if the signature data is malformed or if reading beyond the buffer bounds.
    pub fn parse_method_signature(&mut self) -> Result<SignatureMethod> {
        let convention_byte = self.cursor.read_le::<u8>()?;
        let calling_convention = CallingConvention::from_bits(convention_byte)
            .filter(|_| convention_byte & CALLING_CONVENTION::RESERVED == 0)
            .ok_or_else(|| {
                malformed_error!(
                    "SignatureMethod - invalid calling convention - {}",
                    convention_byte
                )
            })?;

        let generic_param_count = if convention_byte & CALLING_CONVENTION::GENERIC != 0 {
            self.cursor.read_compressed_uint()?
        } else {
            0
        };
        let param_count = self.cursor.read_compressed_uint()?;

        let mut method = SignatureMethod {
            has_this: convention_byte & CALLING_CONVENTION::HASTHIS != 0,
            explicit_this: convention_byte & CALLING_CONVENTION::EXPLICITTHIS != 0,
            calling_convention,
            generic_param_count,
            return_type: self.parse_param()?,
            params: Vec::new(),
            varargs: Vec::new(),
        };

        let mut sentinel = false;
        for _ in 0..param_count {
            if !sentinel && self.cursor.peek_byte()? == ELEMENT_TYPE::SENTINEL {
                self.cursor.advance_by(1)?;
                sentinel = true;
            }

            let param = self.parse_param()?;
            if sentinel {
                method.varargs.push(param);
            } else {
                method.params.push(param);
            }
        }

        Ok(method)
    }

    /// Parse a field signature from the blob (II.23.2.4)
    ///
    /// # Errors
    /// Returns an error if the signature header is invalid or if the field type cannot be parsed.
    pub fn parse_field_signature(&mut self) -> Result<SignatureField> {
        let head_byte = self.cursor.read_le::<u8>()?;
        if head_byte != SIGNATURE_HEADER::FIELD {
            return Err(malformed_error!(
                "SignatureField - invalid start - {}",
                head_byte
            ));
        }

        Ok(SignatureField {
            modifiers: self.parse_custom_mods()?,
            base: self.parse_type()?,
        })
    }

    /// Parse a property signature from the blob (II.23.2.5)
    ///
    /// # Errors
    /// Returns an error if the property signature header is invalid or if the property type cannot be parsed.
    pub fn parse_property_signature(&mut self) -> Result<SignatureProperty> {
        let head_byte = self.cursor.read_le::<u8>()?;
        if head_byte & !CALLING_CONVENTION::HASTHIS != SIGNATURE_HEADER::PROPERTY {
            return Err(malformed_error!(
                "SignatureProperty - invalid start - {}",
                head_byte
            ));
        }

        let param_count = self.cursor.read_compressed_uint()?;
        let modifiers = self.parse_custom_mods()?;
        let base = self.parse_type()?;

        let mut params = Vec::with_capacity((param_count as usize).min(self.cursor.remaining()));
        for _ in 0..param_count {
            params.push(self.parse_param()?);
        }

        Ok(SignatureProperty {
            has_this: head_byte & CALLING_CONVENTION::HASTHIS != 0,
            modifiers,
            base,
            params,
        })
    }

    /// Parse a local variable signature from the blob (II.23.2.6)
    ///
    /// # Errors
    /// Returns an error if the local variable signature header is invalid or if variable types cannot be parsed.
    pub fn parse_local_var_signature(&mut self) -> Result<SignatureLocalVariables> {
        let head_byte = self.cursor.read_le::<u8>()?;
        if head_byte != SIGNATURE_HEADER::LOCAL_SIG {
            return Err(malformed_error!(
                "SignatureLocalVar - invalid start - {}",
                head_byte
            ));
        }

        let count = self.cursor.read_compressed_uint()?;

        let mut locals = Vec::with_capacity((count as usize).min(self.cursor.remaining()));
        for _ in 0..count {
            let mut modifiers = Vec::new();
            let mut is_pinned = false;

            // Custom modifiers and the PINNED constraint may come in any order
            while self.cursor.has_more_data() {
                match self.cursor.peek_byte()? {
                    ELEMENT_TYPE::CMOD_REQD | ELEMENT_TYPE::CMOD_OPT => {
                        modifiers.append(&mut self.parse_custom_mods()?);
                    }
                    ELEMENT_TYPE::PINNED => {
                        self.cursor.advance_by(1)?;
                        is_pinned = true;
                    }
                    _ => break,
                }
            }

            let is_byref = self.cursor.peek_byte()? == ELEMENT_TYPE::BYREF;
            if is_byref {
                self.cursor.advance_by(1)?;
            }

            locals.push(SignatureLocalVariable {
                modifiers,
                is_byref,
                is_pinned,
                base: self.parse_type()?,
            });
        }

        Ok(SignatureLocalVariables { locals })
    }

    /// Parse a type specification signature from the blob (II.23.2.14)
    ///
    /// # Errors
    /// Returns an error if the type specification cannot be parsed.
    pub fn parse_type_spec_signature(&mut self) -> Result<SignatureTypeSpec> {
        Ok(SignatureTypeSpec {
            base: self.parse_type()?,
        })
    }

    /// Parse a method specification signature from the blob (II.23.2.15)
    ///
    /// # Errors
    /// Returns an error if the method specification header is invalid or if the type arguments cannot be parsed.
    pub fn parse_method_spec_signature(&mut self) -> Result<SignatureMethodSpec> {
        let head_byte = self.cursor.read_le::<u8>()?;
        if head_byte != SIGNATURE_HEADER::GENERIC_INST {
            return Err(malformed_error!(
                "SignatureMethodSpec - invalid start - {}",
                head_byte
            ));
        }

        let arg_count = self.cursor.read_compressed_uint()?;
        let mut generic_args = Vec::with_capacity((arg_count as usize).min(self.cursor.remaining()));
        for _ in 0..arg_count {
            generic_args.push(self.parse_type()?);
        }

        Ok(SignatureMethodSpec { generic_args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{metadata::token::Token, Error};

    #[test]
    fn test_parse_primitive_types() {
        let test_cases = [
            (vec![0x01], TypeSignature::Void),
            (vec![0x02], TypeSignature::Boolean),
            (vec![0x03], TypeSignature::Char),
            (vec![0x04], TypeSignature::I1),
            (vec![0x05], TypeSignature::U1),
            (vec![0x06], TypeSignature::I2),
            (vec![0x07], TypeSignature::U2),
            (vec![0x08], TypeSignature::I4),
            (vec![0x09], TypeSignature::U4),
            (vec![0x0A], TypeSignature::I8),
            (vec![0x0B], TypeSignature::U8),
            (vec![0x0C], TypeSignature::R4),
            (vec![0x0D], TypeSignature::R8),
            (vec![0x0E], TypeSignature::String),
            (vec![0x1C], TypeSignature::Object),
            (vec![0x18], TypeSignature::I),
            (vec![0x19], TypeSignature::U),
            (vec![0x16], TypeSignature::TypedByRef),
        ];

        for (input, expected) in test_cases {
            let mut parser = SignatureParser::new(&input);
            let result = parser.parse_type().unwrap();
            assert_eq!(result, expected);
        }
    }

    #[test]
    fn test_parse_class_and_generic_inst() {
        // List<int>: GENERICINST CLASS TypeRef(1) 1 I4
        let mut parser = SignatureParser::new(&[0x15, 0x12, 0x05, 0x01, 0x08]);
        assert_eq!(
            parser.parse_type().unwrap(),
            TypeSignature::GenericInst(
                Box::new(TypeSignature::Class(Token::new(0x0100_0001))),
                vec![TypeSignature::I4]
            )
        );

        let mut parser = SignatureParser::new(&[0x15, 0x08, 0x01, 0x08]);
        assert!(matches!(parser.parse_type(), Err(Error::Malformed { .. })));
    }

    #[test]
    fn test_parse_array() {
        // int[0..4, -1..] : ARRAY I4 rank 2, 1 size (5), 2 lower bounds (0, -1)
        let mut parser = SignatureParser::new(&[0x14, 0x08, 0x02, 0x01, 0x05, 0x02, 0x00, 0x7F]);
        assert_eq!(
            parser.parse_type().unwrap(),
            TypeSignature::Array(SignatureArray {
                base: Box::new(TypeSignature::I4),
                rank: 2,
                sizes: vec![5],
                lower_bounds: vec![0, -1],
            })
        );
    }

    #[test]
    fn test_parse_method_signature() {
        // instance void (int32, ref string)
        let data = [0x20, 0x02, 0x01, 0x08, 0x10, 0x0E];
        let method = SignatureParser::new(&data).parse_method_signature().unwrap();
        assert!(method.has_this);
        assert!(!method.explicit_this);
        assert_eq!(method.calling_convention, CallingConvention::Default);
        assert_eq!(method.return_type.base, TypeSignature::Void);
        assert_eq!(method.params.len(), 2);
        assert!(method.params[1].by_ref);
        assert_eq!(method.params[1].base, TypeSignature::String);

        // generic method with one type parameter: !!0 M<T>(!!0)
        let data = [0x10, 0x01, 0x01, 0x1E, 0x00, 0x1E, 0x00];
        let method = SignatureParser::new(&data).parse_method_signature().unwrap();
        assert_eq!(method.generic_param_count, 1);
        assert_eq!(method.return_type.base, TypeSignature::GenericParamMethod(0));
    }

    #[test]
    fn test_parse_vararg_call_site() {
        // vararg void (int32, ..., string)
        let data = [0x05, 0x02, 0x01, 0x08, 0x41, 0x0E];
        let method = SignatureParser::new(&data).parse_method_signature().unwrap();
        assert_eq!(method.calling_convention, CallingConvention::VarArg);
        assert_eq!(method.params.len(), 1);
        assert_eq!(method.varargs.len(), 1);
        assert_eq!(method.varargs[0].base, TypeSignature::String);
    }

    #[test]
    fn test_parse_invalid_convention() {
        let data = [0x07, 0x00, 0x01];
        assert!(SignatureParser::new(&data).parse_method_signature().is_err());
        let data = [0x80, 0x00, 0x01];
        assert!(SignatureParser::new(&data).parse_method_signature().is_err());
    }

    #[test]
    fn test_parse_field_with_modifiers() {
        // modreq(TypeRef 2) volatile int32
        let data = [0x06, 0x1F, 0x09, 0x08];
        let field = SignatureParser::new(&data).parse_field_signature().unwrap();
        assert_eq!(
            field.modifiers,
            vec![CustomModifier {
                required: true,
                modifier_type: Token::new(0x0100_0002)
            }]
        );
        assert_eq!(field.base, TypeSignature::I4);

        assert!(SignatureParser::new(&[0x07, 0x08]).parse_field_signature().is_err());
    }

    #[test]
    fn test_parse_property_and_locals() {
        let data = [0x28, 0x01, 0x0E, 0x08];
        let property = SignatureParser::new(&data).parse_property_signature().unwrap();
        assert!(property.has_this);
        assert_eq!(property.base, TypeSignature::String);
        assert_eq!(property.params.len(), 1);

        // pinned ref int32, typedref
        let data = [0x07, 0x02, 0x45, 0x10, 0x08, 0x16];
        let locals = SignatureParser::new(&data).parse_local_var_signature().unwrap();
        assert_eq!(locals.locals.len(), 2);
        assert!(locals.locals[0].is_pinned);
        assert!(locals.locals[0].is_byref);
        assert_eq!(locals.locals[0].base, TypeSignature::I4);
        assert_eq!(locals.locals[1].base, TypeSignature::TypedByRef);
    }

    #[test]
    fn test_parse_method_spec() {
        let data = [0x0A, 0x02, 0x08, 0x0E];
        let spec = SignatureParser::new(&data).parse_method_spec_signature().unwrap();
        assert_eq!(spec.generic_args, vec![TypeSignature::I4, TypeSignature::String]);
        assert!(SignatureParser::new(&[0x0B, 0x00]).parse_method_spec_signature().is_err());
    }

    #[test]
    fn test_recursion_limit() {
        let mut data = vec![0x0F; 60];
        data.push(0x08);
        let mut parser = SignatureParser::new(&data);
        assert!(matches!(parser.parse_type(), Err(Error::RecursionLimit(50))));

        let mut parser = SignatureParser::new(&data).with_max_depth(100);
        assert!(parser.parse_type().is_ok());
    }

    #[test]
    fn test_truncated() {
        let mut parser = SignatureParser::new(&[0x20, 0x02, 0x01, 0x08]);
        assert!(matches!(
            parser.parse_method_signature(),
            Err(Error::OutOfBounds { .. })
        ));
    }
}
