//! Heap and byte-level integration tests.

use dotcodec::{
    file::{ByteCursor, ByteSink, Section, SectionDirectory},
    metadata::tables::{BlobIndex, FieldRow, ModuleRow, StringIndex, TableSet},
    CodecConfig, Error, Image,
};
use proptest::prelude::*;

fn fields(names: &[String], blobs: &[Vec<u8>]) -> TableSet {
    let mut set = TableSet::new();
    set.tables_mut().module.push(ModuleRow::default()).unwrap();
    for (name, blob) in names.iter().zip(blobs) {
        set.tables_mut()
            .field
            .push(FieldRow {
                flags: 0x0001,
                name: StringIndex::new(name.as_str()),
                signature: BlobIndex::new(blob.clone()),
            })
            .unwrap();
    }
    set
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn heap_values_survive_the_pipeline(
        names in prop::collection::vec("[A-Za-z0-9_.<>`]{0,24}", 1..16),
        blobs in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..300), 16),
    ) {
        let mut set = fields(&names, &blobs);
        let metadata = set.write().unwrap().assemble("v4.0.30319").unwrap();
        let mut decoded = TableSet::from_metadata(&metadata, 0, CodecConfig::default()).unwrap();

        for (rid, (name, blob)) in (1..).zip(names.iter().zip(&blobs)) {
            let row = decoded.tables().field.get(rid).unwrap();
            prop_assert_eq!(row.name.value(), name.as_str());
            prop_assert_eq!(row.signature.value(), blob.as_slice());
        }

        let again = decoded.write().unwrap().assemble("v4.0.30319").unwrap();
        prop_assert_eq!(again, metadata);
    }

    #[test]
    fn compressed_integers_through_cursor(value in 0u32..0x2000_0000) {
        let mut sink = ByteSink::new();
        sink.write_compressed_uint(value).unwrap();
        let expected_len = match value {
            0..=0x7F => 1,
            0x80..=0x3FFF => 2,
            _ => 4,
        };
        prop_assert_eq!(sink.len(), expected_len);

        let bytes = sink.into_inner();
        let mut cursor = ByteCursor::new(&bytes);
        prop_assert_eq!(cursor.read_compressed_uint().unwrap(), value);
        prop_assert!(!cursor.has_more_data());
    }
}

#[test]
fn compressed_integer_examples() {
    let mut sink = ByteSink::new();
    sink.write_compressed_uint(300).unwrap();
    sink.write_compressed_uint(0xFFFF_FFFF).unwrap();
    assert_eq!(sink.as_slice(), &[0x81, 0x2C, 0xFF]);

    let mut cursor = ByteCursor::new(sink.as_slice());
    assert_eq!(cursor.read_compressed_uint().unwrap(), 300);
    assert_eq!(cursor.read_compressed_uint().unwrap(), 0xFFFF_FFFF);

    assert!(matches!(
        ByteSink::new().write_compressed_uint(0x2000_0000),
        Err(Error::Malformed { .. })
    ));
    assert!(matches!(
        ByteCursor::new(&[0xE0]).read_compressed_uint(),
        Err(Error::Malformed { .. })
    ));
}

#[test]
fn virtual_tail_reads_as_zero() {
    // 0x10 bytes on disk, 0x40 bytes in memory
    let mut data = vec![0_u8; 0x110];
    data[0x100..0x110].fill(0xAB);
    let sections = SectionDirectory::new(vec![Section::new(".data", 0x4000, 0x40, 0x100, 0x10)]);
    let image = Image::from_mem(data, sections);

    let mut cursor = image.cursor_sized(0x4008, 0x20).unwrap().unwrap();
    let bytes = cursor.read_bytes(0x20).unwrap();
    assert!(bytes[..8].iter().all(|&b| b == 0xAB));
    assert!(bytes[8..].iter().all(|&b| b == 0));
    assert!(matches!(
        cursor.read_le::<u8>(),
        Err(Error::OutOfBounds { .. })
    ));

    assert!(matches!(
        image.cursor_sized(0x4030, 0x20),
        Err(Error::OutOfBounds { .. })
    ));
    assert!(image.cursor_at(0).unwrap().is_none());
    assert!(matches!(image.cursor_at(0x9000), Err(Error::Malformed { .. })));
}
