//! Values of the `Constant` table (II.22.9).
//!
//! A constant row stores an element type byte and a blob; the blob holds the little-endian
//! value for primitives, UTF-16LE for strings, and four zero bytes for a null reference.

use widestring::U16String;

use crate::{
    metadata::signatures::ELEMENT_TYPE,
    Error::TypeMismatch,
    Result,
};

/// A decoded default value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    /// `bool`
    Boolean(bool),
    /// `char`
    Char(u16),
    /// `sbyte`
    I1(i8),
    /// `byte`
    U1(u8),
    /// `short`
    I2(i16),
    /// `ushort`
    U2(u16),
    /// `int`
    I4(i32),
    /// `uint`
    U4(u32),
    /// `long`
    I8(i64),
    /// `ulong`
    U8(u64),
    /// `float`
    R4(f32),
    /// `double`
    R8(f64),
    /// `string`
    String(U16String),
    /// The null reference
    Null,
}

fn fixed<const N: usize>(element_type: u8, data: &[u8]) -> Result<[u8; N]> {
    data.try_into().map_err(|_| {
        malformed_error!(
            "Constant of type 0x{:02X} needs {} bytes, found {}",
            element_type,
            N,
            data.len()
        )
    })
}

impl ConstantValue {
    /// Decode the blob of a `Constant` row under its declared element type.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an unknown element type or a blob of the wrong
    /// length, and [`crate::Error::TypeMismatch`] for a value the type cannot hold (a boolean
    /// other than 0 or 1, a non-null class reference).
    pub fn decode(element_type: u8, data: &[u8]) -> Result<ConstantValue> {
        Ok(match element_type {
            ELEMENT_TYPE::BOOLEAN => match fixed::<1>(element_type, data)? {
                [0] => ConstantValue::Boolean(false),
                [1] => ConstantValue::Boolean(true),
                [other] => {
                    return Err(TypeMismatch {
                        expected: "boolean (0 or 1)".to_string(),
                        actual: format!("0x{:02X}", other),
                    })
                }
            },
            ELEMENT_TYPE::CHAR => ConstantValue::Char(u16::from_le_bytes(fixed(element_type, data)?)),
            ELEMENT_TYPE::I1 => ConstantValue::I1(i8::from_le_bytes(fixed(element_type, data)?)),
            ELEMENT_TYPE::U1 => ConstantValue::U1(u8::from_le_bytes(fixed(element_type, data)?)),
            ELEMENT_TYPE::I2 => ConstantValue::I2(i16::from_le_bytes(fixed(element_type, data)?)),
            ELEMENT_TYPE::U2 => ConstantValue::U2(u16::from_le_bytes(fixed(element_type, data)?)),
            ELEMENT_TYPE::I4 => ConstantValue::I4(i32::from_le_bytes(fixed(element_type, data)?)),
            ELEMENT_TYPE::U4 => ConstantValue::U4(u32::from_le_bytes(fixed(element_type, data)?)),
            ELEMENT_TYPE::I8 => ConstantValue::I8(i64::from_le_bytes(fixed(element_type, data)?)),
            ELEMENT_TYPE::U8 => ConstantValue::U8(u64::from_le_bytes(fixed(element_type, data)?)),
            ELEMENT_TYPE::R4 => ConstantValue::R4(f32::from_le_bytes(fixed(element_type, data)?)),
            ELEMENT_TYPE::R8 => ConstantValue::R8(f64::from_le_bytes(fixed(element_type, data)?)),
            ELEMENT_TYPE::STRING => {
                if data.len() % 2 != 0 {
                    return Err(malformed_error!(
                        "String constant has an odd length - {}",
                        data.len()
                    ));
                }
                let units = data
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect::<Vec<u16>>();
                ConstantValue::String(U16String::from_vec(units))
            }
            ELEMENT_TYPE::CLASS => {
                let value = u32::from_le_bytes(fixed(element_type, data)?);
                if value != 0 {
                    return Err(TypeMismatch {
                        expected: "null reference".to_string(),
                        actual: format!("0x{:08X}", value),
                    });
                }
                ConstantValue::Null
            }
            _ => {
                return Err(malformed_error!(
                    "Invalid constant element type - 0x{:02X}",
                    element_type
                ))
            }
        })
    }

    /// The element type stored in the `Type` column for this value.
    #[must_use]
    pub fn element_type(&self) -> u8 {
        match self {
            ConstantValue::Boolean(_) => ELEMENT_TYPE::BOOLEAN,
            ConstantValue::Char(_) => ELEMENT_TYPE::CHAR,
            ConstantValue::I1(_) => ELEMENT_TYPE::I1,
            ConstantValue::U1(_) => ELEMENT_TYPE::U1,
            ConstantValue::I2(_) => ELEMENT_TYPE::I2,
            ConstantValue::U2(_) => ELEMENT_TYPE::U2,
            ConstantValue::I4(_) => ELEMENT_TYPE::I4,
            ConstantValue::U4(_) => ELEMENT_TYPE::U4,
            ConstantValue::I8(_) => ELEMENT_TYPE::I8,
            ConstantValue::U8(_) => ELEMENT_TYPE::U8,
            ConstantValue::R4(_) => ELEMENT_TYPE::R4,
            ConstantValue::R8(_) => ELEMENT_TYPE::R8,
            ConstantValue::String(_) => ELEMENT_TYPE::STRING,
            ConstantValue::Null => ELEMENT_TYPE::CLASS,
        }
    }

    /// The blob content for this value.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            ConstantValue::Boolean(value) => vec![u8::from(*value)],
            ConstantValue::Char(value) | ConstantValue::U2(value) => value.to_le_bytes().to_vec(),
            ConstantValue::I1(value) => value.to_le_bytes().to_vec(),
            ConstantValue::U1(value) => vec![*value],
            ConstantValue::I2(value) => value.to_le_bytes().to_vec(),
            ConstantValue::I4(value) => value.to_le_bytes().to_vec(),
            ConstantValue::U4(value) => value.to_le_bytes().to_vec(),
            ConstantValue::I8(value) => value.to_le_bytes().to_vec(),
            ConstantValue::U8(value) => value.to_le_bytes().to_vec(),
            ConstantValue::R4(value) => value.to_le_bytes().to_vec(),
            ConstantValue::R8(value) => value.to_le_bytes().to_vec(),
            ConstantValue::String(value) => value
                .as_slice()
                .iter()
                .flat_map(|unit| unit.to_le_bytes())
                .collect(),
            ConstantValue::Null => vec![0; 4],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn decode_primitives() {
        assert_eq!(
            ConstantValue::decode(ELEMENT_TYPE::I4, &[0xFE, 0xFF, 0xFF, 0xFF]).unwrap(),
            ConstantValue::I4(-2)
        );
        assert_eq!(
            ConstantValue::decode(ELEMENT_TYPE::BOOLEAN, &[1]).unwrap(),
            ConstantValue::Boolean(true)
        );
        assert_eq!(
            ConstantValue::decode(ELEMENT_TYPE::R8, &1.5_f64.to_le_bytes()).unwrap(),
            ConstantValue::R8(1.5)
        );
        assert_eq!(
            ConstantValue::decode(ELEMENT_TYPE::STRING, &[b'h', 0, b'i', 0]).unwrap(),
            ConstantValue::String(U16String::from_str("hi"))
        );
        assert_eq!(
            ConstantValue::decode(ELEMENT_TYPE::STRING, &[]).unwrap(),
            ConstantValue::String(U16String::new())
        );
        assert_eq!(
            ConstantValue::decode(ELEMENT_TYPE::CLASS, &[0, 0, 0, 0]).unwrap(),
            ConstantValue::Null
        );
    }

    #[test]
    fn decode_mismatches() {
        assert!(matches!(
            ConstantValue::decode(ELEMENT_TYPE::I4, &[0, 0]),
            Err(Error::Malformed { .. })
        ));
        assert!(matches!(
            ConstantValue::decode(ELEMENT_TYPE::BOOLEAN, &[2]),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            ConstantValue::decode(ELEMENT_TYPE::CLASS, &[1, 0, 0, 0]),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            ConstantValue::decode(ELEMENT_TYPE::STRING, &[0]),
            Err(Error::Malformed { .. })
        ));
        assert!(matches!(
            ConstantValue::decode(ELEMENT_TYPE::OBJECT, &[]),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn encode_matches_decode() {
        let values = [
            ConstantValue::Char(0x263A),
            ConstantValue::U8(u64::MAX),
            ConstantValue::I1(-128),
            ConstantValue::R4(0.25),
            ConstantValue::String(U16String::from_str("text")),
            ConstantValue::Null,
        ];
        for value in values {
            let decoded = ConstantValue::decode(value.element_type(), &value.encode()).unwrap();
            assert_eq!(decoded, value);
        }
    }
}
