//! Human-readable listing of every record in a debug info file.

use std::io::Write;

use srcdbg_core::format::HEADER_BASE_SIZE;
use srcdbg_core::reader::{read_header, Record, Records};

use crate::CliResult;

fn print_title(out: &mut impl Write, printed: &mut bool, title: &str) -> std::io::Result<()>
{
    if !*printed {
        writeln!(out, "\n**** {title}: ****")?;
        *printed = true;
    }
    Ok(())
}

/// Which section titles have been printed so far
#[derive(Debug, Default)]
struct Titles
{
    source_file_paths: bool,
    line_mappings: bool,
    symbol_names: bool,
    global_fixed: bool,
    local_fixed: bool,
    local_relative: bool,
}

/// Write the header fields, then every record in file order.
///
/// A section's title is printed before its first record, so empty sections
/// produce no output.
pub fn dump(bytes: &[u8], out: &mut impl Write) -> CliResult<()>
{
    read_header(bytes)?;
    let base = &bytes[..HEADER_BASE_SIZE];
    writeln!(out, "magic:\t'{}'", String::from_utf8_lossy(&base[0..4]))?;
    writeln!(out, "type:\t'{}'", String::from_utf8_lossy(&base[4..8]))?;
    writeln!(out, "version:\t{}", base[8])?;

    let mut titles = Titles::default();
    for record in Records::new(bytes)? {
        match record? {
            Record::Header(header) => {
                writeln!(out, "\nReading simple format...\n")?;
                writeln!(out, "source_file_paths_size:\t{}", header.source_file_paths_size)?;
                writeln!(out, "num_line_mappings:\t{}", header.num_line_mappings)?;
                writeln!(out, "symbol_names_size:\t{}", header.symbol_names_size)?;
                writeln!(
                    out,
                    "num_global_fixed_symbol_values:\t{}",
                    header.num_global_fixed_symbol_values
                )?;
                writeln!(
                    out,
                    "local_fixed_symbol_values_size:\t{}",
                    header.local_fixed_symbol_values_size
                )?;
                writeln!(
                    out,
                    "local_relative_symbol_values_size:\t{}",
                    header.local_relative_symbol_values_size
                )?;
            }
            Record::SourcePath { index, path } => {
                print_title(out, &mut titles.source_file_paths, "Source file paths")?;
                writeln!(out, "{path} (index {index})")?;
            }
            Record::LineMapping(mapping) => {
                print_title(out, &mut titles.line_mappings, "Line mappings")?;
                writeln!(
                    out,
                    "address_first: ${:X}\taddress_last: ${:X}\tsource_file_index: {}\tline_number: {}",
                    mapping.range.first.value(),
                    mapping.range.last.value(),
                    mapping.source_file_index,
                    mapping.line_number
                )?;
            }
            Record::SymbolName { index, name } => {
                print_title(out, &mut titles.symbol_names, "Symbol names")?;
                writeln!(out, "{name} (index {index})")?;
            }
            Record::GlobalFixed {
                symbol_name_index,
                value,
                flags,
            } => {
                print_title(out, &mut titles.global_fixed, "Global fixed symbol values")?;
                write!(out, "Symbol name index: {symbol_name_index}, symbol value: {value}")?;
                if flags.is_empty() {
                    writeln!(out)?;
                } else {
                    writeln!(out, ", flags: {:#x}", flags.bits())?;
                }
            }
            Record::LocalFixed {
                symbol_name_index,
                value,
                ranges,
            } => {
                print_title(out, &mut titles.local_fixed, "Local fixed symbol values")?;
                writeln!(out, "Symbol name index: {symbol_name_index}, symbol value: {value}")?;
                for range in &ranges {
                    writeln!(
                        out,
                        "\taddress range: {:04X}-{:04X}",
                        range.first.value(),
                        range.last.value()
                    )?;
                }
            }
            Record::LocalRelative {
                symbol_name_index,
                rules,
            } => {
                print_title(out, &mut titles.local_relative, "Local relative symbol values")?;
                writeln!(out, "Symbol name index: {symbol_name_index}")?;
                for rule in &rules {
                    writeln!(
                        out,
                        "\tvalue: (reg idx {}) + {}\taddress range: {:04X}-{:04X}",
                        rule.register as i8,
                        rule.offset,
                        rule.range.first.value(),
                        rule.range.last.value()
                    )?;
                }
            }
            Record::EndSourcePaths
            | Record::EndLineMappings
            | Record::EndSymbolNames
            | Record::EndGlobalFixed
            | Record::EndLocalFixed
            | Record::EndLocalRelative => {}
        }
    }
    Ok(())
}
