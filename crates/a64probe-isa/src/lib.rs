//! A64 instruction classification and operand decoder.
//!
//! This crate decodes single 4-byte A64 code words into [`Instruction`]
//! records: a three-level classification path (encoding family, encoding
//! group, mnemonic) plus the operand fields needed for dependency tracking
//! and address resolution. Decoding never fails — words the decoder cannot
//! place are returned with an incomplete classification path, and
//! architecturally unallocated encodings are marked invalid on the record.

mod bits;
mod decode;
mod families;
mod instruction;
mod kind;
mod register;

pub use bits::*;
pub use decode::*;
pub use instruction::*;
pub use kind::*;
pub use register::*;

/// Size of one A64 code word in bytes.
pub const WORD_BYTES: u64 = 4;
