//! Top-level instruction decode.

use tracing::trace;

use crate::{Family, Group, Instruction, Mnemonic, bits, families};

/// Decode one aligned code word at `address`.
///
/// Never fails: encodings the decoder cannot place come back with an
/// incomplete classification path, and architecturally unallocated
/// encodings come back fully classified but marked invalid. Decoding is
/// deterministic — the same word at the same address always yields an
/// identical record.
pub fn decode_word(code: u32, address: u64) -> Instruction {
    let mut inst = Instruction::empty(address, code);
    let top0 = bits(code, 28, 25);
    match top0 {
        0b0000..=0b0011 => {
            // Unallocated top-level space: fully classified, invalid.
            inst.kind.family = Some(Family::Reserved);
            inst.kind.group = Some(Group::Reserved);
            inst.kind.mnemonic = Some(Mnemonic::Reserved);
        }
        0b0101 | 0b1101 => families::dpreg::decode(&mut inst, code),
        0b0111 | 0b1111 => {
            // Classified at the top level only.
            inst.kind.family = Some(Family::SimdFp);
        }
        0b1000 | 0b1001 => families::dpimm::decode(&mut inst, code),
        0b1010 | 0b1011 => families::branch::decode(&mut inst, code),
        0b0100 | 0b0110 | 0b1100 | 0b1110 => families::ldst::decode(&mut inst, code),
        _ => unreachable!("op0 is a 4-bit field"),
    }
    if inst.kind.unallocated() {
        inst.valid = false;
    }
    if !inst.parsed() {
        trace!(
            address = format_args!("{address:#x}"),
            code = format_args!("{code:#010x}"),
            kind = inst.kind.deepest().as_deref().unwrap_or("none"),
            "incomplete classification"
        );
    }
    inst
}
