//! kvconf command-line tool
//!
//! Examples:
//!   kvconf pairs app.conf          - list pairs
//!   kvconf pairs - --json          - list pairs from stdin as JSON
//!   kvconf get app.conf db.port    - print one value
//!   kvconf normalize "DB . Port"   - print the canonical key

use std::io::{self, Read};

use facet::Facet;
use figue as args;
use kvconf::{Block, Item, normalize};

// ============================================================================
// Exit codes
// ============================================================================

const EXIT_SUCCESS: i32 = 0;
const EXIT_NOT_FOUND: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_IO_ERROR: i32 = 3;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// CLI argument structures
// ============================================================================

#[derive(Facet, Debug)]
struct Args {
    /// Show version
    #[facet(args::named, args::short = 'V', default)]
    version: bool,

    /// Subcommand to run
    #[facet(args::subcommand, default)]
    command: Option<Command>,
}

#[derive(Facet, Debug)]
#[repr(u8)]
enum Command {
    /// Print every pair of a file
    Pairs {
        /// Input file, or "-" for stdin
        #[facet(args::positional)]
        file: String,

        /// Print as JSON
        #[facet(args::named, default)]
        json: bool,
    },

    /// Print the value of the last pair for a key
    Get {
        /// Input file, or "-" for stdin
        #[facet(args::positional)]
        file: String,

        /// Key to look up
        #[facet(args::positional)]
        key: String,
    },

    /// Print the normalized form of a key
    Normalize {
        #[facet(args::positional)]
        key: String,
    },
}

// ============================================================================
// Main entry point
// ============================================================================

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let raw_args: Vec<String> = std::env::args().skip(1).collect();
    if raw_args.is_empty() || raw_args[0] == "--help" || raw_args[0] == "-h" {
        print_help();
        std::process::exit(EXIT_SUCCESS);
    }

    match run(&raw_args) {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(e) => {
            if !matches!(e, RunError::NotFound(_)) {
                eprintln!("error: {e}");
            }
            std::process::exit(e.exit_code());
        }
    }
}

fn print_help() {
    eprintln!("kvconf {VERSION} - inspect key = value configuration text\n");
    eprintln!("USAGE:");
    eprintln!("    kvconf pairs <file> [--json]    Print every pair");
    eprintln!("    kvconf get <file> <key>         Print the value for a key");
    eprintln!("    kvconf normalize <key>          Print the normalized key\n");
    eprintln!("    Use '-' as <file> to read stdin.");
    eprintln!("    RUST_LOG=kvconf_tokenizer=trace shows how the text is tokenized.");
}

fn run(raw_args: &[String]) -> Result<(), RunError> {
    let args_strs: Vec<&str> = raw_args.iter().map(|s| s.as_str()).collect();
    let parsed: Args =
        figue::from_slice(&args_strs).map_err(|e| RunError::Usage(e.to_string()))?;

    if parsed.version {
        println!("kvconf {VERSION}");
        return Ok(());
    }

    match parsed.command {
        Some(Command::Pairs { file, json }) => run_pairs(&file, json),
        Some(Command::Get { file, key }) => run_get(&file, &key),
        Some(Command::Normalize { key }) => {
            println!("{}", normalize(&key));
            Ok(())
        }
        None => {
            print_help();
            Ok(())
        }
    }
}

fn read_input(file: &str) -> Result<String, RunError> {
    if file == "-" {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source)?;
        Ok(source)
    } else {
        Ok(std::fs::read_to_string(file)?)
    }
}

fn run_pairs(file: &str, json: bool) -> Result<(), RunError> {
    let block = Block::parse(&read_input(file)?);
    if json {
        let items = block.items().iter().map(item_json).collect::<Vec<_>>();
        let out = serde_json::to_string_pretty(&items).map_err(|e| RunError::Io(io::Error::other(e)))?;
        println!("{out}");
        return Ok(());
    }
    for item in block.items() {
        println!("{}", format_item(item));
    }
    Ok(())
}

fn run_get(file: &str, key: &str) -> Result<(), RunError> {
    let block = Block::parse(&read_input(file)?);
    let item = block
        .get(key)
        .ok_or_else(|| RunError::NotFound(key.to_string()))?;
    println!("{}", item.original_value());
    Ok(())
}

fn item_json(item: &Item) -> serde_json::Value {
    let span = item.value_span();
    serde_json::json!({
        "key": item.original_key(),
        "normalized": item.normalized_key(),
        "value": item.original_value(),
        "start": span.start,
        "end": span.end,
    })
}

/// Multi-line values print as raw blocks, so the output parses back.
fn format_item(item: &Item) -> String {
    let value = item.original_value();
    if value.contains('\n') || value.is_empty() {
        format!("{} = {{\n{}\n}}", item.original_key(), value)
    } else {
        format!("{} = {}", item.original_key(), value)
    }
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug)]
enum RunError {
    Io(io::Error),
    Usage(String),
    NotFound(String),
}

impl RunError {
    fn exit_code(&self) -> i32 {
        match self {
            RunError::Io(_) => EXIT_IO_ERROR,
            RunError::Usage(_) => EXIT_USAGE,
            RunError::NotFound(_) => EXIT_NOT_FOUND,
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Io(e) => write!(f, "{e}"),
            RunError::Usage(e) => write!(f, "{e}"),
            RunError::NotFound(key) => write!(f, "no value for '{key}'"),
        }
    }
}

impl From<io::Error> for RunError {
    fn from(e: io::Error) -> Self {
        RunError::Io(e)
    }
}
