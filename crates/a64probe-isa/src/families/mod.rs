//! Per-family decode functions, one module per top-level encoding group.

pub(crate) mod branch;
pub(crate) mod dpimm;
pub(crate) mod dpreg;
pub(crate) mod ldst;

use crate::{Instruction, Mnemonic};

/// Mark the record architecturally unallocated at the mnemonic level.
pub(crate) fn unallocated(inst: &mut Instruction) {
    inst.kind.mnemonic = Some(Mnemonic::Reserved);
    inst.valid = false;
}
