//! One-shot queries against a set of loaded debug info files.

use std::io::{self, Write};
use std::sync::Arc;

use srcdbg_core::types::{Address, Mc6809Register, Mc6809Registers, RegisterSource};
use srcdbg_core::{SourceDebugInfo, SymbolTable};

use crate::args::SourceLine;
use crate::CliResult;

/// Print the source line that produced `address`.
pub fn address(info: &SourceDebugInfo, address: u16, out: &mut impl Write) -> CliResult<()>
{
    let address = Address::new(address);
    let file_line = info
        .address_to_file_line(address)
        .ok_or_else(|| format!("no source line maps to {address}"))?;
    let path = info
        .file_index_to_path(file_line.file_index)
        .ok_or_else(|| format!("file index {} out of range", file_line.file_index))?;
    writeln!(out, "{address}\t{path}:{}", file_line.line_number)?;
    Ok(())
}

/// Print the address ranges a source line assembled into.
pub fn line(info: &SourceDebugInfo, location: &SourceLine, out: &mut impl Write) -> CliResult<()>
{
    let file_index = info
        .file_path_to_index(&location.file)
        .ok_or_else(|| format!("'{}' matches no source file, or more than one", location.file))?;
    for range in info.file_line_to_address_ranges(file_index, location.line) {
        writeln!(out, "{range}")?;
    }
    Ok(())
}

/// Print the value of symbol `name` with the program counter at `pc`.
///
/// Global symbols are searched first, then local symbols in scope at `pc`.
pub fn symbol(info: &mut SourceDebugInfo, name: &str, pc: u16, out: &mut impl Write) -> CliResult<()>
{
    let cpu = Arc::new(Mc6809Registers::default());
    cpu.set(Mc6809Register::Pc, pc);
    info.complete_initialization(cpu.as_ref())?;

    let registers: Arc<dyn RegisterSource + Send + Sync> = cpu;
    let mut globals = SymbolTable::new();
    let mut locals = SymbolTable::new();
    info.get_srcdbg_symbols(&mut globals, &mut locals, &registers)?;

    if let Some(value) = globals.value(name) {
        write_value(out, name, value)?;
        return Ok(());
    }
    if let Some(expression) = locals.expression(name) {
        writeln!(out, "{name} = {expression}")?;
        return Ok(());
    }
    if let Some(value) = locals.value(name) {
        write_value(out, name, value)?;
        return Ok(());
    }
    if locals.entries(name).is_empty() {
        Err(format!("unknown symbol '{name}'").into())
    } else {
        Err(format!("'{name}' is not in scope at {}", Address::new(pc)).into())
    }
}

/// `name = value`, with the `$XXXX` form added when the value is a valid address.
fn write_value(out: &mut impl Write, name: &str, value: i64) -> io::Result<()>
{
    match u16::try_from(value) {
        Ok(address) => writeln!(out, "{name} = {value} ({})", Address::new(address)),
        Err(_) => writeln!(out, "{name} = {value}"),
    }
}

#[cfg(test)]
mod tests
{
    use srcdbg_core::types::SymbolFlags;
    use srcdbg_core::{LoadOptions, OverlapPolicy, SimpleProvider, SimpleWriter};

    use super::*;

    fn info() -> SourceDebugInfo
    {
        let mut writer = SimpleWriter::new();
        let file = writer.add_source_file_path("src/game.asm").unwrap();
        writer.add_line_mapping(0x0000, 0x0002, file, 5).unwrap();
        writer.add_global_fixed_symbol("SCORE", 0x0200).unwrap();
        writer
            .add_global_fixed_symbol_with_flags("DELTA", -2, SymbolFlags::CONSTANT)
            .unwrap();
        writer.add_local_fixed_symbol("lives", 0x0000, 0x0002, 3).unwrap();
        writer
            .add_local_relative_symbol("arg", 0x0000, 0x0002, Mc6809Register::S.id(), 4)
            .unwrap();
        let provider = SimpleProvider::from_bytes(&writer.to_bytes().unwrap(), &LoadOptions::default()).unwrap();

        let mut info = SourceDebugInfo::new(OverlapPolicy::Permissive);
        info.add_provider("game", Box::new(provider), 0x8000).unwrap();
        info
    }

    fn run(f: impl FnOnce(&mut Vec<u8>) -> CliResult<()>) -> String
    {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_address_and_line()
    {
        let info = info();
        assert_eq!(run(|out| address(&info, 0x8001, out)), "$8001\tsrc/game.asm:5\n");
        let location = SourceLine {
            file: "game.asm".to_string(),
            line: 5,
        };
        assert_eq!(run(|out| line(&info, &location, out)), "$8000-$8002\n");
        assert!(address(&info, 0x0001, &mut Vec::new()).is_err());
    }

    #[test]
    fn test_symbols()
    {
        let mut info = info();
        assert_eq!(run(|out| symbol(&mut info, "SCORE", 0, out)), "SCORE = 33280 ($8200)\n");
        assert_eq!(run(|out| symbol(&mut info, "arg", 0x8001, out)), "arg = (S + 4)\n");
        assert_eq!(run(|out| symbol(&mut info, "lives", 0x8001, out)), "lives = 3 ($0003)\n");
        assert!(symbol(&mut info, "lives", 0x0001, &mut Vec::new()).is_err());
        assert!(symbol(&mut info, "nope", 0x8001, &mut Vec::new()).is_err());
    }

    #[test]
    fn test_values_outside_address_space_print_decimal_only()
    {
        let mut info = info();
        assert_eq!(run(|out| symbol(&mut info, "DELTA", 0, out)), "DELTA = -2\n");
        assert_eq!(run(|out| write_value(out, "BIG", 0x1_0000).map_err(Into::into)), "BIG = 65536\n");
    }
}
