//! Reachability and dataflow analysis over decoded A64 code.
//!
//! Three engines share this crate:
//!
//! - a worklist traversal that walks the instruction graph from a function
//!   entry, tracking per-path register dependencies and collecting call
//!   targets ([`analyze_function`]);
//! - address resolution for the ADRP+ADD idiom and PC-relative switch
//!   tables ([`resolve_pc_relative`], [`evaluate_switch`]);
//! - a linear pattern scanner that locates the Nth instruction matching a
//!   predicate within a byte budget ([`find_nth`]).

mod depmap;
mod resolve;
mod scan;
mod traverse;

pub use depmap::*;
pub use resolve::*;
pub use scan::*;
pub use traverse::*;

use thiserror::Error;

/// Fatal analysis failures.
///
/// These indicate either an internal inconsistency or a caller assumption
/// the target binary no longer satisfies. They are deliberately loud:
/// every variant would otherwise turn into a silently wrong address.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("direct branch at {address:#x} has no resolved target")]
    MissingBranchTarget { address: u64 },
    #[error("instruction at {address:#x} carries no immediate to resolve against")]
    MissingImmediate { address: u64 },
    #[error("switch table entry at {address:#x} is outside the image")]
    SwitchEntryUnmapped { address: u64 },
    #[error(transparent)]
    Scan(#[from] ScanError),
}

pub type Result<T> = std::result::Result<T, FlowError>;
