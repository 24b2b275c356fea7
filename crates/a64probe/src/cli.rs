//! CLI definitions and argument types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use a64probe_flow::MergePolicy;

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "a64probe")]
#[command(about = "Static A64 analysis - decode, call discovery, and offset scans")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (sets RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output (only show errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Arguments shared by every command that reads a flat code image.
#[derive(Args)]
pub struct ImageArgs {
    /// Flat binary image to analyze
    #[arg(value_name = "IMAGE")]
    pub input: PathBuf,

    /// Address the image is mapped at
    #[arg(long, default_value = "0x0", value_parser = parse_address)]
    pub base: u64,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode and print instruction records
    Decode {
        #[command(flatten)]
        image: ImageArgs,

        /// Address of the first word to decode
        #[arg(long, value_parser = parse_address)]
        addr: u64,

        /// Number of consecutive words to decode
        #[arg(short = 'n', long, default_value = "1")]
        count: u32,
    },
    /// Walk a function and report discovered call targets
    Analyze {
        #[command(flatten)]
        image: ImageArgs,

        /// Function entry address
        #[arg(long, value_parser = parse_address)]
        entry: u64,

        /// Dependency handling when paths reconverge
        #[arg(long, value_enum, default_value = "discard")]
        merge: MergeArg,
    },
    /// Find the Nth direct call and print its resolved target
    FindCall {
        #[command(flatten)]
        image: ImageArgs,

        /// Address to scan forward from
        #[arg(long, value_parser = parse_address)]
        start: u64,

        /// Which match to return (1-based)
        #[arg(short = 'n', long, default_value = "1")]
        nth: u32,

        /// Number of return instructions the scan may pass
        #[arg(long)]
        rets: Option<u32>,

        /// Byte budget for the scan
        #[arg(long, default_value = "4096")]
        bytes: u64,

        /// Count indirect calls (BLR) against the match number
        #[arg(long)]
        include_indirect: bool,
    },
    /// Resolve a switch table via ADRP+ADD and evaluate one case
    EvalSwitch {
        #[command(flatten)]
        image: ImageArgs,

        /// Address to scan forward from
        #[arg(long, value_parser = parse_address)]
        start: u64,

        /// Which PC-relative address formation to use (1-based)
        #[arg(long, default_value = "1")]
        pc_rel_n: u32,

        /// Which immediate-offset instruction to compose with (1-based)
        #[arg(long, default_value = "1")]
        offset_n: u32,

        /// Switch case to evaluate (1-based)
        #[arg(long)]
        case: u32,
    },
}

/// Reconvergence policy argument.
#[derive(Clone, Copy, ValueEnum)]
pub enum MergeArg {
    /// Keep the first snapshot that reaches an address
    Discard,
    /// Union snapshots and re-expand while they grow
    Union,
}

impl From<MergeArg> for MergePolicy {
    fn from(arg: MergeArg) -> Self {
        match arg {
            MergeArg::Discard => Self::Discard,
            MergeArg::Union => Self::Union,
        }
    }
}

/// Parse an address in hex (with `0x` prefix) or decimal.
pub fn parse_address(s: &str) -> Result<u64, String> {
    let parsed = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .map_or_else(|| s.parse(), |hex| u64::from_str_radix(hex, 16));
    parsed.map_err(|e| format!("invalid address {s:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("0x1000").unwrap(), 0x1000);
        assert_eq!(parse_address("0X10").unwrap(), 0x10);
        assert_eq!(parse_address("4096").unwrap(), 4096);
        assert!(parse_address("xyz").is_err());
    }

    #[test]
    fn test_cli_parses_analyze() {
        let cli = Cli::try_parse_from([
            "a64probe", "analyze", "libgame.so", "--base", "0x1000", "--entry", "0x1234",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze { image, entry, .. } => {
                assert_eq!(image.base, 0x1000);
                assert_eq!(entry, 0x1234);
            }
            _ => panic!("wrong command"),
        }
    }
}
