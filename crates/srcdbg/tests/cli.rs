//! Running the `srcdbg` binary against files written with `srcdbg-core`

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use srcdbg_core::types::Mc6809Register;
use srcdbg_core::SimpleWriter;

fn srcdbg(args: &[&str]) -> Output
{
    Command::new(env!("CARGO_BIN_EXE_srcdbg"))
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("SRCDBG_LOG_FILE")
        .env_remove("SRCDBG_SOURCE_PATH")
        .env_remove("SRCDBG_SOURCE_PATH_MAP")
        .env_remove("SRCDBG_OVERLAP_POLICY")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String
{
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn write_sample(dir: &Path, name: &str, source: &str, first: u16) -> PathBuf
{
    let path = dir.join(name);
    let mut writer = SimpleWriter::create(&path).unwrap();
    let file = writer.add_source_file_path(source).unwrap();
    writer.add_line_mapping(first, first + 3, file, 10).unwrap();
    writer.add_global_fixed_symbol("COUNT", 5).unwrap();
    writer
        .add_local_relative_symbol("frame", first, first + 3, Mc6809Register::U.id(), -2)
        .unwrap();
    writer.close().unwrap();
    path
}

fn arg(path: &Path) -> &str
{
    path.to_str().unwrap()
}

#[test]
fn test_dump()
{
    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(dir.path(), "a.dbi", "a.asm", 0x3F00);

    let output = srcdbg(&["dump", arg(&path)]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.starts_with("Dumping '"));
    assert!(text.contains("magic:\t'MDbI'\n"));
    assert!(text.contains("a.asm (index 0)\n"));
    assert!(text.contains("address_first: $3F00\taddress_last: $3F03\tsource_file_index: 0\tline_number: 10\n"));
}

#[test]
fn test_dump_rejects_garbage()
{
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.dbi");
    std::fs::write(&path, b"not a debug info file at all").unwrap();

    let output = srcdbg(&["dump", arg(&path)]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}

#[test]
fn test_merge_then_lookup()
{
    let dir = tempfile::tempdir().unwrap();
    let a = write_sample(dir.path(), "a.dbi", "a.asm", 0x0000);
    let b = write_sample(dir.path(), "b.dbi", "b.asm", 0x0000);
    let merged = dir.path().join("merged.dbi");

    let b_at = format!("{}@0x1000", arg(&b));
    let output = srcdbg(&["merge", "--output", arg(&merged), arg(&a), &b_at]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let output = srcdbg(&["lookup", arg(&merged), "--address", "$1002"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "$1002\tb.asm:10\n");

    let output = srcdbg(&["lookup", arg(&merged), "--line", "a.asm:10"]);
    assert_eq!(stdout(&output), "$0000-$0003\n");
}

#[test]
fn test_merge_failure_removes_output()
{
    let dir = tempfile::tempdir().unwrap();
    let merged = dir.path().join("merged.dbi");
    let missing = dir.path().join("missing.dbi");

    let output = srcdbg(&["merge", "-o", arg(&merged), arg(&missing)]);
    assert!(!output.status.success());
    assert!(!merged.exists());
}

#[test]
fn test_lookup_symbols_with_offset()
{
    let dir = tempfile::tempdir().unwrap();
    let a = write_sample(dir.path(), "a.dbi", "a.asm", 0x0000);
    let a_at = format!("{}@0xC000", arg(&a));

    let output = srcdbg(&["lookup", &a_at, "--symbol", "COUNT"]);
    assert_eq!(stdout(&output), "COUNT = 49157 ($C005)\n");

    let output = srcdbg(&["lookup", &a_at, "--symbol", "frame", "--pc", "0xC001"]);
    assert_eq!(stdout(&output), "frame = (U - 2)\n");

    let output = srcdbg(&["lookup", &a_at, "--symbol", "frame", "--pc", "0x0001"]);
    assert!(!output.status.success());
}

#[test]
fn test_lookup_strict_overlap()
{
    let dir = tempfile::tempdir().unwrap();
    let a = write_sample(dir.path(), "a.dbi", "a.asm", 0x0000);
    let b = write_sample(dir.path(), "b.dbi", "b.asm", 0x0002);

    let output = srcdbg(&["lookup", arg(&a), arg(&b), "--address", "2"]);
    assert_eq!(stdout(&output), "$0002\ta.asm:10\n");

    let output = srcdbg(&["lookup", "--strict", arg(&a), arg(&b), "--address", "2"]);
    assert!(!output.status.success());
}

#[test]
fn test_lookup_needs_exactly_one_query()
{
    let dir = tempfile::tempdir().unwrap();
    let a = write_sample(dir.path(), "a.dbi", "a.asm", 0x0000);

    assert!(!srcdbg(&["lookup", arg(&a)]).status.success());
    assert!(!srcdbg(&["lookup", arg(&a), "--address", "0", "--symbol", "COUNT"])
        .status
        .success());
}
