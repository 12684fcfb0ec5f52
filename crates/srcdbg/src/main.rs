use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use srcdbg_core::{create_provider, LoadOptions, OverlapPolicy, SimpleWriter, SourceDebugInfo};
use srcdbg_utils::{debug, info, init_logging, init_logging_with_level, LogFormat, LogLevel};

use crate::args::{parse_address, InputFile, SourceLine};

mod args;
mod dump;
mod lookup;

pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Inspect and build MDbI source-level debugging information files.
#[derive(Parser, Debug)]
#[command(name = "srcdbg")]
#[command(version)]
#[command(about = "Inspect and build MDbI source-level debugging information files", long_about = None)]
struct Cli
{
    /// Log verbosity (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,
    /// Log output format: pretty or json
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Print every record of a debug info file
    Dump
    {
        /// Path to the debug info file
        path: PathBuf,
    },
    /// Combine several debug info files into one
    Merge
    {
        /// File to create
        #[arg(short, long)]
        output: PathBuf,
        /// Input files, each optionally relocated with PATH@OFFSET
        #[arg(required = true)]
        inputs: Vec<InputFile>,
    },
    /// Answer a single debugger query against loaded debug info files
    Lookup
    {
        /// Debug info files, each optionally relocated with PATH@OFFSET
        #[arg(required = true)]
        files: Vec<InputFile>,
        /// Directory searched for relative source paths (repeatable)
        #[arg(long = "source-path")]
        source_path: Vec<PathBuf>,
        /// Source path prefix replacement, FIND=REPLACE (repeatable)
        #[arg(long = "map")]
        map: Vec<String>,
        /// Refuse files whose address ranges overlap
        #[arg(long, default_value_t = false)]
        strict: bool,
        /// Program counter used to scope local symbols
        #[arg(long, value_parser = parse_address, default_value = "0")]
        pc: u16,
        #[command(flatten)]
        query: Query,
    },
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct Query
{
    /// Address to map to a source line ($hex, 0xhex or decimal)
    #[arg(long, value_parser = parse_address)]
    address: Option<u16>,
    /// FILE:LINE to map to address ranges
    #[arg(long)]
    line: Option<SourceLine>,
    /// Symbol to evaluate
    #[arg(long)]
    symbol: Option<String>,
}

fn main()
{
    let cli = Cli::parse();

    let logging = match cli.log_level {
        Some(level) => init_logging_with_level(level, cli.log_format.unwrap_or_default()),
        None => init_logging(),
    };
    let _guard = match logging {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Commands) -> CliResult<()>
{
    match command {
        Commands::Dump { path } => {
            println!("Dumping '{}'...", path.display());
            let bytes = fs::read(&path).map_err(|e| format!("unable to read '{}': {e}", path.display()))?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            dump::dump(&bytes, &mut out)?;
            out.flush()?;
            Ok(())
        }
        Commands::Merge { output, inputs } => merge(&output, &inputs),
        Commands::Lookup {
            files,
            source_path,
            map,
            strict,
            pc,
            query,
        } => {
            let mut options = LoadOptions::from_env();
            if !source_path.is_empty() {
                options = options.with_source_search_path(source_path);
            }
            if !map.is_empty() {
                let pairs = map
                    .iter()
                    .map(|pair| {
                        pair.split_once('=')
                            .ok_or_else(|| format!("expected FIND=REPLACE, got '{pair}'"))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                options = options.with_source_path_map(pairs);
            }
            if strict {
                options = options.with_overlap_policy(OverlapPolicy::Strict);
            }

            let mut debug_info = SourceDebugInfo::new(options.overlap_policy);
            for file in &files {
                let provider = create_provider(&file.path, &options)?;
                debug_info.add_provider(file.path.display().to_string(), provider, file.offset)?;
            }
            debug!(files = debug_info.entries().len(), "Loaded debug info");

            let stdout = io::stdout();
            let mut out = stdout.lock();
            if let Some(address) = query.address {
                lookup::address(&debug_info, address, &mut out)?;
            } else if let Some(location) = &query.line {
                lookup::line(&debug_info, location, &mut out)?;
            } else if let Some(name) = &query.symbol {
                lookup::symbol(&mut debug_info, name, pc, &mut out)?;
            }
            out.flush()?;
            Ok(())
        }
    }
}

/// Import every input into a new file at `output`, removing it if any import fails.
fn merge(output: &Path, inputs: &[InputFile]) -> CliResult<()>
{
    let mut writer = SimpleWriter::create(output)?;
    for input in inputs {
        info!(path = %input.path.display(), offset = input.offset, "Importing");
        if let Err(e) = writer.import(&input.path, input.offset) {
            drop(writer);
            let _ = fs::remove_file(output);
            return Err(e.into());
        }
    }
    writer.close()?;
    println!("Wrote '{}'", output.display());
    Ok(())
}
