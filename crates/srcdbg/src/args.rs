//! Command line value parsers.

use std::path::PathBuf;
use std::str::FromStr;

/// Parse a number written as decimal, `0x` hex or `$` hex, optionally negative.
pub fn parse_number(s: &str) -> Result<i64, String>
{
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else if let Some(hex) = digits.strip_prefix('$') {
        i64::from_str_radix(hex, 16)
    } else {
        digits.parse::<i64>()
    }
    .map_err(|err| format!("invalid number '{s}': {err}"))?;
    Ok(if negative { -value } else { value })
}

/// Parse a 16-bit address.
pub fn parse_address(s: &str) -> Result<u16, String>
{
    let value = parse_number(s)?;
    u16::try_from(value).map_err(|_| format!("address '{s}' is outside $0000-$FFFF"))
}

/// Parse a signed address offset.
pub fn parse_offset(s: &str) -> Result<i32, String>
{
    let value = parse_number(s)?;
    i32::try_from(value).map_err(|_| format!("offset '{s}' is out of range"))
}

/// A debug info file argument, `PATH` or `PATH@OFFSET`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile
{
    pub path: PathBuf,
    pub offset: i32,
}

impl FromStr for InputFile
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        // A trailing "@..." that is not a number belongs to the path
        if let Some((path, offset)) = s.rsplit_once('@') {
            if let Ok(offset) = parse_offset(offset) {
                return Ok(Self {
                    path: PathBuf::from(path),
                    offset,
                });
            }
        }
        Ok(Self {
            path: PathBuf::from(s),
            offset: 0,
        })
    }
}

/// A `FILE:LINE` source location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine
{
    pub file: String,
    pub line: u32,
}

impl FromStr for SourceLine
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let (file, line) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("expected FILE:LINE, got '{s}'"))?;
        let line = line
            .parse()
            .map_err(|err| format!("invalid line number '{line}': {err}"))?;
        Ok(Self {
            file: file.to_string(),
            line,
        })
    }
}
