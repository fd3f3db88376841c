//! Method body integration tests.
//!
//! Bodies are placed in a synthetic image section and located through the `MethodDef` RVA,
//! with operand tokens resolved against a real table set.

use dotcodec::{
    assembly::{Instruction, OpCode, Operand},
    file::{Section, SectionDirectory},
    metadata::{
        method::ExceptionHandlerKind,
        tables::{
            BlobIndex, MethodDefRow, ModuleRow, RangeList, RowRef, StandAloneSigRow,
            StringIndex, TableId, TableSet, TypeDefRow, TypeRefRow,
        },
        token::TokenTarget,
    },
    Error, Image, MethodBody,
};
use widestring::U16String;

const TEXT_RVA: u32 = 0x2000;
const TEXT_OFFSET: usize = 0x200;

/// Fat header with locals and a try/catch in a tiny exception section
#[rustfmt::skip]
const TRY_CATCH: [u8; 40] = [
    0x1B, 0x30, 0x02, 0x00, 0x09, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x11,
    0x00,                   // nop
    0xDE, 0x05,             // leave.s 8
    0x26,                   // pop
    0xDE, 0x02,             // leave.s 8
    0x00, 0x00,             // nop, nop
    0x2A,                   // ret
    0x00, 0x00, 0x00,
    0x01, 0x10, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x03, 0x03, 0x00, 0x03, 0x01, 0x00, 0x00, 0x01,
];

fn method(name: &str, rva: u32, impl_flags: u16) -> MethodDefRow {
    MethodDefRow {
        rva,
        impl_flags,
        flags: 0x0096,
        name: StringIndex::new(name),
        signature: BlobIndex::new(vec![0x00, 0x00, 0x01]),
        param_list: RangeList::empty(),
    }
}

fn fixture() -> TableSet {
    let mut set = TableSet::new();
    let tables = set.tables_mut();
    tables
        .module
        .push(ModuleRow {
            name: StringIndex::new("bodies.dll"),
            ..ModuleRow::default()
        })
        .unwrap();
    tables
        .type_ref
        .push(TypeRefRow {
            type_name: StringIndex::new("Exception"),
            type_namespace: StringIndex::new("System"),
            ..TypeRefRow::default()
        })
        .unwrap();
    tables
        .type_def
        .push(TypeDefRow {
            type_name: StringIndex::new("Program"),
            field_list: RangeList::empty(),
            method_list: RangeList::empty(),
            ..TypeDefRow::default()
        })
        .unwrap();
    tables
        .stand_alone_sig
        .push(StandAloneSigRow {
            signature: BlobIndex::new(vec![0x07, 0x01, 0x08]),
        })
        .unwrap();
    tables
        .method_def
        .push(method("Guarded", TEXT_RVA, 0))
        .unwrap();
    tables
        .method_def
        .push(method("Greet", TEXT_RVA + 0x40, 0))
        .unwrap();
    tables.method_def.push(method("Abstract", 0, 0)).unwrap();
    tables
        .method_def
        .push(method("Native", TEXT_RVA + 0x60, 0x0001))
        .unwrap();
    set
}

fn image(bodies: &[(u32, &[u8])]) -> Image {
    let mut data = vec![0_u8; TEXT_OFFSET + 0x200];
    for (rva, body) in bodies {
        let start = TEXT_OFFSET + (rva - TEXT_RVA) as usize;
        data[start..start + body.len()].copy_from_slice(body);
    }
    let sections = SectionDirectory::new(vec![Section::new(
        ".text",
        TEXT_RVA,
        0x200,
        TEXT_OFFSET as u32,
        0x200,
    )]);
    Image::from_mem(data, sections)
}

fn greeting() -> MethodBody {
    MethodBody::new(vec![
        Instruction::with_operand(
            0,
            OpCode::Ldstr,
            Operand::Token(TokenTarget::UserString {
                offset: 0,
                value: U16String::from_str("hello"),
            }),
        ),
        Instruction::with_operand(
            5,
            OpCode::Call,
            Operand::Token(TokenTarget::Row(RowRef::new(TableId::MethodDef, 1))),
        ),
        Instruction::new(10, OpCode::Ret),
    ])
}

#[test]
fn bodies_are_located_by_rva() {
    let mut set = fixture();
    let greet = set.encode_method_body(&greeting()).unwrap();
    assert_eq!(greet[0], (11 << 2) | 0x2);
    assert_eq!(greet[1], 0x72);
    assert_eq!(&greet[2..6], &[0x01, 0x00, 0x00, 0x70]);

    let image = image(&[(TEXT_RVA, &TRY_CATCH[..]), (TEXT_RVA + 0x40, &greet[..])]);

    let guarded = set.method_body(&image, 1).unwrap().unwrap();
    assert!(guarded.init_locals);
    assert_eq!(
        guarded.local_var_sig,
        Some(TokenTarget::Row(RowRef::new(TableId::StandAloneSig, 1)))
    );
    assert_eq!(guarded.exception_handlers.len(), 1);
    assert_eq!(
        guarded.exception_handlers[0].kind,
        ExceptionHandlerKind::Catch(TokenTarget::Row(RowRef::new(TableId::TypeRef, 1)))
    );
    assert_eq!(set.encode_method_body(&guarded).unwrap(), TRY_CATCH);

    let greet_body = set.method_body(&image, 2).unwrap().unwrap();
    assert_eq!(greet_body.header_size, 1);
    match greet_body.instructions[0].token() {
        Some(TokenTarget::UserString { offset, value }) => {
            assert_eq!(*offset, 1);
            assert_eq!(value.to_string_lossy(), "hello");
        }
        other => panic!("unexpected operand {:?}", other),
    }
    assert_eq!(
        greet_body.instructions[1].token(),
        Some(&TokenTarget::Row(RowRef::new(TableId::MethodDef, 1)))
    );
    assert_eq!(set.encode_method_body(&greet_body).unwrap(), greet);
}

#[test]
fn methods_without_il() {
    let mut set = fixture();
    let image = image(&[(TEXT_RVA, &TRY_CATCH[..])]);

    assert!(set.method_body(&image, 3).unwrap().is_none());
    assert!(matches!(
        set.method_body(&image, 4),
        Err(Error::NotSupported(_))
    ));
    assert!(matches!(
        set.method_body(&image, 9),
        Err(Error::InvalidToken(_))
    ));
}

#[test]
fn unknown_operand_tokens() {
    let mut set = fixture();
    // call MethodDef 7, which does not exist
    let body: [u8; 7] = [(6 << 2) | 0x2, 0x28, 0x07, 0x00, 0x00, 0x06, 0x2A];
    let image = image(&[(TEXT_RVA, &body[..])]);

    assert!(matches!(
        set.method_body(&image, 1),
        Err(Error::InvalidToken(_))
    ));

    let mut dangling = greeting();
    dangling.instructions[1].operand =
        Operand::Token(TokenTarget::Row(RowRef::new(TableId::Field, 1)));
    assert!(matches!(
        set.encode_method_body(&dangling),
        Err(Error::InvalidToken(_))
    ));
}

#[test]
fn edited_bodies_survive_the_image() {
    let mut set = fixture();
    let image = image(&[(TEXT_RVA, &TRY_CATCH[..])]);
    let mut body = set.method_body(&image, 1).unwrap().unwrap();

    // Grow the protected region; the clause and both leave.s targets follow
    let padding: Vec<Instruction> = (0..130)
        .map(|_| Instruction::new(u32::MAX, OpCode::Nop))
        .collect();
    body.instructions.splice(1..1, padding);

    let encoded = set.encode_method_body(&body).unwrap();
    let again = MethodBody::from_bytes(&encoded, &mut set).unwrap();
    assert_eq!(again.code_size, 9 + 130);

    let handler = &again.exception_handlers[0];
    assert_eq!((handler.try_offset, handler.try_length), (0, 133));
    assert_eq!((handler.handler_offset, handler.handler_length), (133, 3));
    assert_eq!(again.instructions[131].operand, Operand::Target(138));
}
