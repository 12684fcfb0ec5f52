//! Writing files and reading them back

use pretty_assertions::assert_eq;
use srcdbg_core::provider::{SimpleProvider, SourceDebugProvider};
use srcdbg_core::types::{
    Address, AddressRange, FileLine, GlobalFixedSymbol, LocalFixedSymbol, Mc6809Register, Mc6809Registers,
    SymbolFlags,
};
use srcdbg_core::writer::SimpleWriter;
use srcdbg_core::{LoadOptions, SrcdbgError, WriterStatus};

fn load(writer: &SimpleWriter) -> SimpleProvider
{
    SimpleProvider::from_bytes(&writer.to_bytes().unwrap(), &LoadOptions::default()).unwrap()
}

#[test]
fn test_end_to_end_example()
{
    let mut writer = SimpleWriter::new();
    let file = writer.add_source_file_path("a.asm").unwrap();
    writer.add_line_mapping(0x3F00, 0x3F03, file, 10).unwrap();
    writer.add_global_fixed_symbol("COUNT", 5).unwrap();

    let provider = load(&writer);
    assert_eq!(
        provider.file_line_to_address_ranges(0, 10),
        vec![AddressRange::new(0x3F00, 0x3F03)]
    );
    assert_eq!(
        provider.address_to_file_line(Address::new(0x3F02)),
        Some(FileLine::new(0, 10))
    );
    assert_eq!(
        provider.global_fixed_symbols()[0],
        GlobalFixedSymbol::new("COUNT", 5, SymbolFlags::NONE)
    );
}

#[test]
fn test_everything_survives_a_round_trip()
{
    let mut writer = SimpleWriter::new();
    let main = writer.add_source_file_path("src/main.asm").unwrap();
    let util = writer.add_source_file_path("src/util.asm").unwrap();
    writer.add_line_mapping(0x4000, 0x4002, main, 1).unwrap();
    writer.add_line_mapping(0x4003, 0x4005, util, 20).unwrap();
    writer.add_line_mapping(0x4006, 0x4006, main, 2).unwrap();
    writer.add_global_fixed_symbol("SCREEN", 0x0400).unwrap();
    writer
        .add_global_fixed_symbol_with_flags("WIDTH", 40, SymbolFlags::CONSTANT)
        .unwrap();
    writer.add_local_fixed_symbol("tmp", 0x4000, 0x4002, -7).unwrap();
    writer.add_local_fixed_symbol("tmp", 0x4006, 0x4006, -7).unwrap();
    writer
        .add_local_relative_symbol("arg", 0x4003, 0x4005, Mc6809Register::S.id(), 2)
        .unwrap();

    let mut provider = load(&writer);
    assert_eq!(provider.num_files(), 2);
    assert_eq!(provider.file_index_to_path(1).unwrap().built(), "src/util.asm");

    let mappings: Vec<(u16, u16, u32)> = provider
        .line_mappings()
        .iter()
        .map(|m| (m.range.first.value(), m.source_file_index, m.line_number))
        .collect();
    assert_eq!(mappings, vec![(0x4000, 0, 1), (0x4003, 1, 20), (0x4006, 0, 2)]);

    assert_eq!(
        provider.global_fixed_symbols(),
        [
            GlobalFixedSymbol::new("SCREEN", 0x0400, SymbolFlags::NONE),
            GlobalFixedSymbol::new("WIDTH", 40, SymbolFlags::CONSTANT),
        ]
    );
    assert_eq!(
        provider.local_fixed_symbols(),
        [LocalFixedSymbol::new(
            "tmp",
            [AddressRange::new(0x4000, 0x4002), AddressRange::new(0x4006, 0x4006)]
                .into_iter()
                .collect(),
            -7
        )]
    );

    provider.complete_initialization(&Mc6809Registers::default()).unwrap();
    let relative = provider.local_relative_symbols().unwrap();
    assert_eq!(relative[0].name(), "arg");
    assert_eq!(relative[0].scoped_expressions()[0].expression(), "(S + 2)");
}

#[test]
fn test_repeated_strings_share_an_index()
{
    let mut writer = SimpleWriter::new();
    assert_eq!(writer.add_source_file_path("x.asm").unwrap(), 0);
    assert_eq!(writer.add_source_file_path("x.asm").unwrap(), 0);
    writer.add_global_fixed_symbol("A", 1).unwrap();
    writer.add_local_fixed_symbol("A", 0, 1, 1).unwrap();

    // One path string and one name string
    let bytes = writer.to_bytes().unwrap();
    assert_eq!(u32::from_le_bytes(bytes[9..13].try_into().unwrap()), 6);
    assert_eq!(u32::from_le_bytes(bytes[17..21].try_into().unwrap()), 2);
}

#[test]
fn test_writer_without_paths_is_unreadable()
{
    let bytes = SimpleWriter::new().to_bytes().unwrap();
    assert!(matches!(
        SimpleProvider::from_bytes(&bytes, &LoadOptions::default()),
        Err(SrcdbgError::NoSourceFilePaths)
    ));
}

#[test]
fn test_import_shifts_addresses_and_values()
{
    let mut rom = SimpleWriter::new();
    let file = rom.add_source_file_path("rom.asm").unwrap();
    rom.add_line_mapping(0x0010, 0x0013, file, 4).unwrap();
    rom.add_global_fixed_symbol("entry", 0x0010).unwrap();
    rom.add_global_fixed_symbol_with_flags("SIZE", 100, SymbolFlags::CONSTANT)
        .unwrap();
    rom.add_local_fixed_symbol("n", 0x0010, 0x0013, 0x0020).unwrap();
    let rom_bytes = rom.to_bytes().unwrap();

    let mut merged = SimpleWriter::new();
    merged.add_source_file_path("boot.asm").unwrap();
    merged.import_bytes(&rom_bytes, 0xC000).unwrap();

    let provider = load(&merged);
    assert_eq!(provider.num_files(), 2);
    assert_eq!(
        provider.file_line_to_address_ranges(1, 4),
        vec![AddressRange::new(0xC010, 0xC013)]
    );
    assert_eq!(provider.global_fixed_symbols()[0].value(), 0xC010);
    assert_eq!(provider.global_fixed_symbols()[1].value(), 100);
    assert_eq!(
        provider.local_fixed_symbols()[0].scope_ranges(),
        [AddressRange::new(0xC010, 0xC013)]
    );
    assert_eq!(provider.local_fixed_symbols()[0].value(), 0xC020);
}

#[test]
fn test_create_close_and_import_from_disk()
{
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.dbi");
    let merged = dir.path().join("merged.dbi");

    let mut writer = SimpleWriter::create(&first).unwrap();
    let file = writer.add_source_file_path("a.asm").unwrap();
    writer.add_line_mapping(0x100, 0x101, file, 1).unwrap();
    writer.close().unwrap();

    let mut writer = SimpleWriter::create(&merged).unwrap();
    writer.import(&first, 0x100).unwrap();
    writer.close().unwrap();

    let provider = SimpleProvider::load(&merged, &LoadOptions::default()).unwrap();
    assert_eq!(
        provider.address_to_file_line(Address::new(0x201)),
        Some(FileLine::new(0, 1))
    );
}

#[test]
fn test_import_of_missing_file()
{
    let dir = tempfile::tempdir().unwrap();
    let mut writer = SimpleWriter::new();
    let err = writer.import(dir.path().join("nope.dbi"), 0).unwrap_err();
    assert!(matches!(err, SrcdbgError::ImportFailed { .. }));
    assert_eq!(err.status(), WriterStatus::ImportFailed);
}

#[test]
fn test_create_in_missing_directory()
{
    let dir = tempfile::tempdir().unwrap();
    let err = SimpleWriter::create(dir.path().join("no/such/dir/out.dbi")).unwrap_err();
    assert_eq!(err.status(), WriterStatus::FileOpen);
}
