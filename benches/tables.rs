//! Benchmarks for the table stream and method body codecs.
//!
//! - Decoding a synthetic metadata blob (header scan, row read, resolve)
//! - Re-encoding a decoded table set (persist, width recomputation, row write)
//! - Decoding and re-encoding a method body with branches and an exception section

extern crate dotcodec;

use criterion::{criterion_group, criterion_main, Criterion};
use dotcodec::{
    metadata::{
        tables::{
            BlobIndex, CodedIndex, FieldRow, MethodDefRow, ModuleRow, RangeList, RowRange, RowRef,
            StringIndex, TableId, TableSet, TypeDefRow, TypeRefRow,
        },
        token::RawTokens,
    },
    CodecConfig, MethodBody,
};
use std::hint::black_box;

const TYPES: u32 = 500;
const MEMBERS_PER_TYPE: u32 = 8;

/// Metadata with `TYPES` types, each owning `MEMBERS_PER_TYPE` fields and methods.
fn synthetic_metadata() -> Vec<u8> {
    let mut set = TableSet::new();
    let tables = set.tables_mut();
    tables
        .module
        .push(ModuleRow {
            name: StringIndex::new("Bench.dll"),
            ..ModuleRow::default()
        })
        .unwrap();
    tables
        .type_ref
        .push(TypeRefRow {
            type_name: StringIndex::new("Object"),
            type_namespace: StringIndex::new("System"),
            ..TypeRefRow::default()
        })
        .unwrap();

    for t in 0..TYPES {
        let first = t * MEMBERS_PER_TYPE + 1;
        let members = RowRange::new(first, first + MEMBERS_PER_TYPE);
        tables
            .type_def
            .push(TypeDefRow {
                flags: 0x0010_0001,
                type_name: StringIndex::new(format!("Type{t}")),
                type_namespace: StringIndex::new("Bench"),
                extends: CodedIndex::new(Some(RowRef::new(TableId::TypeRef, 1))),
                field_list: RangeList::new(members),
                method_list: RangeList::new(members),
            })
            .unwrap();
        for m in 0..MEMBERS_PER_TYPE {
            tables
                .field
                .push(FieldRow {
                    flags: 0x0001,
                    name: StringIndex::new(format!("field{m}")),
                    signature: BlobIndex::new(vec![0x06, 0x08]),
                })
                .unwrap();
            tables
                .method_def
                .push(MethodDefRow {
                    flags: 0x0086,
                    name: StringIndex::new(format!("Method{t}_{m}")),
                    signature: BlobIndex::new(vec![0x20, 0x01, 0x01, 0x08]),
                    param_list: RangeList::empty(),
                    ..MethodDefRow::default()
                })
                .unwrap();
        }
    }

    set.write().unwrap().assemble("v4.0.30319").unwrap()
}

fn bench_decode_tables(c: &mut Criterion) {
    let metadata = synthetic_metadata();

    c.bench_function("tables_decode", |b| {
        b.iter(|| {
            let set =
                TableSet::from_metadata(black_box(&metadata), 0, CodecConfig::default()).unwrap();
            black_box(set)
        });
    });
}

fn bench_encode_tables(c: &mut Criterion) {
    let metadata = synthetic_metadata();
    let decoded = TableSet::from_metadata(&metadata, 0, CodecConfig::default()).unwrap();

    c.bench_function("tables_encode", |b| {
        b.iter(|| {
            let mut set = decoded.clone();
            black_box(set.write().unwrap())
        });
    });
}

/// Fat header, a loop with a conditional branch, a switch and a try/finally
#[rustfmt::skip]
const METHOD_BODY: [u8; 56] = [
    0x1B, 0x30, 0x03, 0x00, 0x1B, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x16,                               // 0: ldc.i4.0
    0x0A,                               // 1: stloc.0
    0x06,                               // 2: ldloc.0
    0x17,                               // 3: ldc.i4.1
    0x58,                               // 4: add
    0x0A,                               // 5: stloc.0
    0x06,                               // 6: ldloc.0
    0x1F, 0x64,                         // 7: ldc.i4.s 100
    0x32, 0xF7,                         // 9: blt.s 2
    0x06,                               // 11: ldloc.0
    0x45, 0x01, 0x00, 0x00, 0x00,       // 12: switch (1 target)
    0x00, 0x00, 0x00, 0x00,             //     -> 21
    0xDE, 0x01,                         // 21: leave.s 24
    0x00,                               // 23: nop
    0x2A,                               // 24: ret
    0x00, 0x00,                         // 25: nop, nop
    0x00,                               // padding
    0x01, 0x10, 0x00, 0x00,             // tiny EH section
    0x02, 0x00, 0x00, 0x00, 0x15,       // finally, try 0..21
    0x17, 0x00, 0x01,                   // handler 23..24
    0x00, 0x00, 0x00, 0x00,
];

fn bench_method_body(c: &mut Criterion) {
    c.bench_function("method_body_decode", |b| {
        b.iter(|| {
            let body = MethodBody::from_bytes(black_box(&METHOD_BODY), &mut RawTokens).unwrap();
            black_box(body)
        });
    });

    let body = MethodBody::from_bytes(&METHOD_BODY, &mut RawTokens).unwrap();
    c.bench_function("method_body_encode", |b| {
        b.iter(|| black_box(body.encode(&mut RawTokens).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_decode_tables,
    bench_encode_tables,
    bench_method_body
);
criterion_main!(benches);
