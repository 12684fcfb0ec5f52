//! Coalescing several debug info files into one view

use std::sync::Arc;

use pretty_assertions::assert_eq;
use srcdbg_core::aggregator::SourceDebugInfo;
use srcdbg_core::provider::{SimpleProvider, SourceDebugProvider};
use srcdbg_core::symtable::SymbolTable;
use srcdbg_core::types::{
    Address, AddressRange, FileLine, Mc6809Register, Mc6809Registers, RegisterSource, SymbolFlags,
};
use srcdbg_core::writer::SimpleWriter;
use srcdbg_core::{LoadOptions, OverlapPolicy, SrcdbgError};

/// Provider with one line mapping per file, `[base + 0x10 * i, base + 0x10 * i + 3]` at line 1
fn provider(files: &[&str], base: u16) -> Box<dyn SourceDebugProvider>
{
    let mut writer = SimpleWriter::new();
    for (i, name) in files.iter().enumerate() {
        let index = writer.add_source_file_path(name).unwrap();
        let first = base + 0x10 * u16::try_from(i).unwrap();
        writer.add_line_mapping(first, first + 3, index, 1).unwrap();
    }
    Box::new(SimpleProvider::from_bytes(&writer.to_bytes().unwrap(), &LoadOptions::default()).unwrap())
}

fn two_providers() -> SourceDebugInfo
{
    let mut info = SourceDebugInfo::new(OverlapPolicy::Permissive);
    info.add_provider("a", provider(&["a0.asm", "a1.asm"], 0x1000), 0)
        .unwrap();
    info.add_provider("b", provider(&["b0.asm", "b1.asm", "b2.asm"], 0x2000), 0)
        .unwrap();
    info
}

fn built_paths(info: &SourceDebugInfo) -> Vec<String>
{
    (0..u32::try_from(info.num_files()).unwrap())
        .map(|i| info.file_index_to_path(i).unwrap().built().to_string())
        .collect()
}

#[test]
fn test_global_indices_follow_list_order()
{
    let info = two_providers();
    assert_eq!(info.num_files(), 5);
    assert_eq!(built_paths(&info), ["a0.asm", "a1.asm", "b0.asm", "b1.asm", "b2.asm"]);
    assert_eq!(info.global_to_local(3), Some((1, 1)));
    assert_eq!(info.local_to_global(1, 2), Some(4));
    assert_eq!(info.local_to_global(1, 3), None);
}

#[test]
fn test_disabling_reindexes_and_bumps_revision()
{
    let mut info = two_providers();
    let rev = info.provider_list_rev();

    info.set_enabled(0, false).unwrap();
    assert_eq!(info.num_files(), 3);
    assert_eq!(built_paths(&info), ["b0.asm", "b1.asm", "b2.asm"]);
    assert!(info.provider_list_rev() > rev);
    assert_eq!(info.address_to_file_line(Address::new(0x1001)), None);
    assert_eq!(info.entries().len(), 2);

    let rev = info.provider_list_rev();
    info.coalesce().unwrap();
    assert!(info.provider_list_rev() > rev);
}

#[test]
fn test_address_and_line_queries_translate_indices()
{
    let info = two_providers();
    assert_eq!(
        info.address_to_file_line(Address::new(0x2012)),
        Some(FileLine::new(3, 1))
    );
    assert_eq!(
        info.file_line_to_address_ranges(4, 1),
        vec![AddressRange::new(0x2020, 0x2023)]
    );
    assert!(info.file_line_to_address_ranges(5, 1).is_empty());
}

#[test]
fn test_offset_applies_both_ways()
{
    let mut info = SourceDebugInfo::default();
    info.add_provider("rom", provider(&["rom.asm"], 0x0000), 0x4000)
        .unwrap();

    assert_eq!(
        info.file_line_to_address_ranges(0, 1),
        vec![AddressRange::new(0x4000, 0x4003)]
    );
    assert_eq!(
        info.address_to_file_line(Address::new(0x4003)),
        Some(FileLine::new(0, 1))
    );
    assert_eq!(info.address_to_file_line(Address::new(0x0003)), None);

    info.set_offset(0, -0x10).unwrap();
    assert_eq!(
        info.file_line_to_address_ranges(0, 1),
        vec![AddressRange::new(0xFFF0, 0xFFF3)]
    );
    assert_eq!(
        info.address_to_file_line(Address::new(0xFFF1)),
        Some(FileLine::new(0, 1))
    );
}

#[test]
fn test_suffix_ambiguous_across_providers()
{
    let mut info = SourceDebugInfo::default();
    info.add_provider("one", provider(&["game/src/util.asm"], 0x1000), 0)
        .unwrap();
    info.add_provider("two", provider(&["lib/src/util.asm"], 0x2000), 0)
        .unwrap();

    assert_eq!(info.file_path_to_index("util.asm"), None);
    assert_eq!(info.file_path_to_index("game/src/util.asm"), Some(0));
    assert_eq!(info.file_path_to_index("lib/src/util.asm"), Some(1));

    info.set_enabled(0, false).unwrap();
    assert_eq!(info.file_path_to_index("util.asm"), Some(0));
}

#[test]
fn test_first_provider_wins_when_permissive()
{
    let mut info = SourceDebugInfo::default();
    info.add_provider("low", provider(&["low.asm"], 0x1000), 0).unwrap();
    info.add_provider("high", provider(&["high.asm"], 0x1000), 0).unwrap();
    assert_eq!(
        info.address_to_file_line(Address::new(0x1001)),
        Some(FileLine::new(0, 1))
    );
}

#[test]
fn test_strict_policy_rolls_back_overlapping_edits()
{
    let mut info = SourceDebugInfo::new(OverlapPolicy::Strict);
    info.add_provider("low", provider(&["low.asm"], 0x1000), 0).unwrap();
    let rev = info.provider_list_rev();

    let err = info
        .add_provider("high", provider(&["high.asm"], 0x1000), 0)
        .unwrap_err();
    assert!(matches!(err, SrcdbgError::OverlappingProviders { .. }));
    assert_eq!(info.entries().len(), 1);
    assert_eq!(info.provider_list_rev(), rev);

    let index = info
        .add_provider("high", provider(&["high.asm"], 0x1000), 0x100)
        .unwrap();
    assert!(matches!(
        info.set_offset(index, 0),
        Err(SrcdbgError::OverlappingProviders { .. })
    ));
    assert_eq!(info.entries()[index].offset(), 0x100);

    info.set_enabled(index, false).unwrap();
    info.set_offset(index, 0).unwrap();
    assert!(info.set_enabled(index, true).is_err());
    assert!(!info.entries()[index].is_enabled());
}

#[test]
fn test_unknown_entry_index()
{
    let mut info = two_providers();
    assert!(matches!(info.set_enabled(7, false), Err(SrcdbgError::ProviderNotFound(7))));
    assert!(matches!(info.remove_provider(2), Err(SrcdbgError::ProviderNotFound(2))));

    let removed = info.remove_provider(0).unwrap();
    assert_eq!(removed.name(), "a");
    assert_eq!(info.num_files(), 3);
}

#[test]
fn test_symbols_are_relocated()
{
    let mut writer = SimpleWriter::new();
    writer.add_source_file_path("game.asm").unwrap();
    writer.add_global_fixed_symbol("start", 100).unwrap();
    writer
        .add_global_fixed_symbol_with_flags("LIVES", 100, SymbolFlags::CONSTANT)
        .unwrap();
    writer.add_local_fixed_symbol("i", 0x0010, 0x001F, 3).unwrap();
    writer
        .add_local_relative_symbol("arg", 0x0010, 0x001F, Mc6809Register::U.id(), 4)
        .unwrap();
    let provider = SimpleProvider::from_bytes(&writer.to_bytes().unwrap(), &LoadOptions::default()).unwrap();

    let mut info = SourceDebugInfo::default();
    info.add_provider("game", Box::new(provider), 0x4000).unwrap();

    let cpu = Arc::new(Mc6809Registers::default());
    let registers: Arc<dyn RegisterSource + Send + Sync> = cpu.clone();
    let mut globals = SymbolTable::new();
    let mut locals = SymbolTable::new();

    assert!(matches!(
        info.get_srcdbg_symbols(&mut globals, &mut locals, &registers),
        Err(SrcdbgError::NotInitialized)
    ));

    info.complete_initialization(cpu.as_ref()).unwrap();
    globals.clear();
    locals.clear();
    info.get_srcdbg_symbols(&mut globals, &mut locals, &registers)
        .unwrap();

    assert_eq!(globals.value("start"), Some(0x4064));
    assert_eq!(globals.value("LIVES"), Some(100));

    cpu.set(Mc6809Register::Pc, 0x0012);
    assert_eq!(locals.value("i"), None);

    cpu.set(Mc6809Register::Pc, 0x4012);
    cpu.set(Mc6809Register::U, 0x7000);
    assert_eq!(locals.value("i"), Some(3));
    assert_eq!(locals.value("arg"), Some(0x7004));
    assert_eq!(locals.expression("arg"), Some("(U + 4)"));
}

#[test]
fn test_symbols_untouched_when_an_entry_is_uninitialized()
{
    let cpu = Arc::new(Mc6809Registers::default());
    let registers: Arc<dyn RegisterSource + Send + Sync> = cpu.clone();

    let symbols = |global: &str, local: &str| {
        let mut writer = SimpleWriter::new();
        writer.add_source_file_path(&format!("{local}.asm")).unwrap();
        writer.add_global_fixed_symbol(global, 1).unwrap();
        writer
            .add_local_relative_symbol(local, 0x0010, 0x001F, Mc6809Register::S.id(), 2)
            .unwrap();
        Box::new(SimpleProvider::from_bytes(&writer.to_bytes().unwrap(), &LoadOptions::default()).unwrap())
    };

    let mut info = SourceDebugInfo::default();
    info.add_provider("one", symbols("G1", "l1"), 0).unwrap();
    info.complete_initialization(cpu.as_ref()).unwrap();
    info.add_provider("two", symbols("G2", "l2"), 0).unwrap();

    let mut globals = SymbolTable::new();
    let mut locals = SymbolTable::new();
    assert!(matches!(
        info.get_srcdbg_symbols(&mut globals, &mut locals, &registers),
        Err(SrcdbgError::NotInitialized)
    ));
    assert!(globals.is_empty());
    assert!(locals.is_empty());

    info.set_enabled(1, false).unwrap();
    info.get_srcdbg_symbols(&mut globals, &mut locals, &registers)
        .unwrap();
    assert_eq!(globals.names().collect::<Vec<_>>(), ["G1"]);
    assert_eq!(locals.names().collect::<Vec<_>>(), ["l1"]);
}

#[test]
fn test_ranges_wrapping_past_the_top_are_split()
{
    let mut writer = SimpleWriter::new();
    let file = writer.add_source_file_path("boot.asm").unwrap();
    writer.add_line_mapping(0x0000, 0x0003, file, 1).unwrap();
    writer.add_local_fixed_symbol("n", 0x0000, 0x0003, 9).unwrap();
    writer
        .add_local_relative_symbol("arg", 0x0000, 0x0003, Mc6809Register::U.id(), 1)
        .unwrap();
    let provider = SimpleProvider::from_bytes(&writer.to_bytes().unwrap(), &LoadOptions::default()).unwrap();

    let mut info = SourceDebugInfo::default();
    info.add_provider("boot", Box::new(provider), -2).unwrap();
    assert_eq!(
        info.file_line_to_address_ranges(0, 1),
        vec![AddressRange::new(0xFFFE, 0xFFFF), AddressRange::new(0x0000, 0x0001)]
    );

    let cpu = Arc::new(Mc6809Registers::default());
    info.complete_initialization(cpu.as_ref()).unwrap();
    let registers: Arc<dyn RegisterSource + Send + Sync> = cpu.clone();
    let mut globals = SymbolTable::new();
    let mut locals = SymbolTable::new();
    info.get_srcdbg_symbols(&mut globals, &mut locals, &registers)
        .unwrap();

    cpu.set(Mc6809Register::U, 0x0100);
    for pc in [0xFFFE, 0xFFFF, 0x0000, 0x0001] {
        cpu.set(Mc6809Register::Pc, pc);
        assert_eq!(locals.value("n"), Some(9), "pc {pc:#06X}");
        assert_eq!(locals.value("arg"), Some(0x0101), "pc {pc:#06X}");
    }
    cpu.set(Mc6809Register::Pc, 0x0002);
    assert_eq!(locals.value("n"), None);
    assert_eq!(locals.value("arg"), None);
}

#[test]
fn test_load_is_all_or_nothing()
{
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.dbi");
    let mut writer = SimpleWriter::create(&good).unwrap();
    writer.add_source_file_path("good.asm").unwrap();
    writer.close().unwrap();

    let info = SourceDebugInfo::load([&good], &LoadOptions::default()).unwrap();
    assert_eq!(info.entries()[0].name(), good.display().to_string());
    assert_eq!(info.num_files(), 1);

    let missing = dir.path().join("missing.dbi");
    assert!(matches!(
        SourceDebugInfo::load([&good, &missing], &LoadOptions::default()),
        Err(SrcdbgError::FileOpen { .. })
    ));
}
