//! Rows of the assembly manifest: identity, references, files, exported types and resources.

use crate::metadata::tables::{
    kind, AssemblyFlags, BlobIndex, CodedIndex, FileAttributes, ManifestResourceAttributes,
    StringIndex, TableIndex, TypeAttributes,
};

define_row! {
    /// The `Assembly` table (0x20) holds the identity of the current assembly.
    AssemblyRow(Assembly) {
        /// Hash algorithm of the manifest
        hash_alg_id: u32,
        /// Major version
        major_version: u16,
        /// Minor version
        minor_version: u16,
        /// Build number
        build_number: u16,
        /// Revision number
        revision_number: u16,
        /// A 4-byte bitmask of type [`AssemblyFlags`]
        flags: u32,
        /// The public key
        public_key: BlobIndex,
        /// The assembly name
        name: StringIndex,
        /// The culture
        culture: StringIndex,
    }
}

impl AssemblyRow {
    /// The assembly flags
    #[must_use]
    pub fn attributes(&self) -> AssemblyFlags {
        AssemblyFlags::from_bits_retain(self.flags)
    }
}

define_row! {
    /// The `AssemblyProcessor` table (0x21), ignored by the runtime.
    AssemblyProcessorRow(AssemblyProcessor) {
        /// Processor identifier
        processor: u32,
    }
}

define_row! {
    /// The `AssemblyOS` table (0x22), ignored by the runtime.
    AssemblyOsRow(AssemblyOS) {
        /// Platform identifier
        os_platform_id: u32,
        /// Major OS version
        os_major_version: u32,
        /// Minor OS version
        os_minor_version: u32,
    }
}

define_row! {
    /// The `AssemblyRef` table (0x23) references other assemblies.
    AssemblyRefRow(AssemblyRef) {
        /// Major version
        major_version: u16,
        /// Minor version
        minor_version: u16,
        /// Build number
        build_number: u16,
        /// Revision number
        revision_number: u16,
        /// A 4-byte bitmask of type [`AssemblyFlags`]
        flags: u32,
        /// The public key or its token
        public_key_or_token: BlobIndex,
        /// The assembly name
        name: StringIndex,
        /// The culture
        culture: StringIndex,
        /// Hash of the referenced assembly
        hash_value: BlobIndex,
    }
}

impl AssemblyRefRow {
    /// The assembly flags
    #[must_use]
    pub fn attributes(&self) -> AssemblyFlags {
        AssemblyFlags::from_bits_retain(self.flags)
    }
}

define_row! {
    /// The `AssemblyRefProcessor` table (0x24), ignored by the runtime.
    AssemblyRefProcessorRow(AssemblyRefProcessor) {
        /// Processor identifier
        processor: u32,
        /// The assembly reference
        assembly_ref: TableIndex<AssemblyRefRow>,
    }
}

define_row! {
    /// The `AssemblyRefOS` table (0x25), ignored by the runtime.
    AssemblyRefOsRow(AssemblyRefOS) {
        /// Platform identifier
        os_platform_id: u32,
        /// Major OS version
        os_major_version: u32,
        /// Minor OS version
        os_minor_version: u32,
        /// The assembly reference
        assembly_ref: TableIndex<AssemblyRefRow>,
    }
}

define_row! {
    /// The `File` table (0x26) lists the files of a multi-module assembly.
    FileRow(File) {
        /// A 4-byte bitmask of type [`FileAttributes`]
        flags: u32,
        /// The file name
        name: StringIndex,
        /// Hash of the file content
        hash_value: BlobIndex,
    }
}

impl FileRow {
    /// The file attributes
    #[must_use]
    pub fn attributes(&self) -> FileAttributes {
        FileAttributes::from_bits_retain(self.flags)
    }
}

define_row! {
    /// The `ExportedType` table (0x27) lists types exported from other modules or forwarded
    /// to other assemblies.
    ExportedTypeRow(ExportedType) {
        /// A 4-byte bitmask of type [`TypeAttributes`]
        flags: u32,
        /// Hint: the `TypeDef` row in the defining module
        type_def_id: u32,
        /// The type name
        type_name: StringIndex,
        /// The type namespace
        type_namespace: StringIndex,
        /// Where the type is defined
        implementation: CodedIndex<kind::Implementation>,
    }
}

impl ExportedTypeRow {
    /// The type attributes
    #[must_use]
    pub fn attributes(&self) -> TypeAttributes {
        TypeAttributes::from_bits_retain(self.flags)
    }
}

define_row! {
    /// The `ManifestResource` table (0x28) lists the resources of the assembly.
    ManifestResourceRow(ManifestResource) {
        /// Offset of the resource data within the resources directory
        offset: u32,
        /// A 4-byte bitmask of type [`ManifestResourceAttributes`]
        flags: u32,
        /// The resource name
        name: StringIndex,
        /// Where the resource lives, null for this file
        implementation: CodedIndex<kind::Implementation>,
    }
}

impl ManifestResourceRow {
    /// The resource attributes
    #[must_use]
    pub fn attributes(&self) -> ManifestResourceAttributes {
        ManifestResourceAttributes::from_bits_retain(self.flags)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        file::{ByteCursor, ByteSink},
        metadata::tables::{TableId, TableInfo, TableRow},
    };

    use super::*;

    #[test]
    fn assembly_ref_round_trip() {
        let data = [
            0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // versions
            0x00, 0x00, 0x00, 0x00, // flags
            0x01, 0x00, // public_key_or_token
            0x0A, 0x00, // name
            0x00, 0x00, // culture
            0x00, 0x00, // hash_value
        ];
        let info = TableInfo::new_test(&[(TableId::AssemblyRef, 1)], false, false, false);
        assert_eq!(AssemblyRefRow::row_size(&info), 20);

        let row = AssemblyRefRow::read_row(&mut ByteCursor::new(&data), &info).unwrap();
        assert_eq!(row.major_version, 4);
        assert_eq!(row.public_key_or_token.offset(), 1);
        assert_eq!(row.name.offset(), 0x0A);

        let mut sink = ByteSink::new();
        row.write_row(&mut sink, &info).unwrap();
        assert_eq!(sink.as_slice(), &data);
    }

    #[test]
    fn assembly_row_size() {
        let info = TableInfo::new_test(&[], true, true, false);
        assert_eq!(AssemblyRow::row_size(&info), 16 + 4 + 4 + 4);
    }
}
