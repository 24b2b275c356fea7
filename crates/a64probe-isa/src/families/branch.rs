//! Branches, Exception Generating and System instructions.

use crate::{
    BranchKind, Condition, Family, Group, Instruction, Mnemonic, Register, WORD_BYTES, bit, bits,
    sign_extend,
};

use super::unallocated;

pub(crate) fn decode(inst: &mut Instruction, code: u32) {
    inst.kind.family = Some(Family::BranchExcSys);
    let op0 = bits(code, 31, 29);
    let op1 = bits(code, 25, 12);
    if op0 == 0b010 {
        if op1 & (1 << 13) == 0 {
            conditional_branch(inst, code);
        } else {
            inst.kind.group = Some(Group::Reserved);
            inst.kind.mnemonic = Some(Mnemonic::Reserved);
        }
    } else if op0 == 0b110 {
        if op1 & (1 << 13) != 0 {
            branch_register(inst, code);
        }
        // Exception generation and system space stays coarse.
    } else if op0 & 0b011 == 0b000 {
        branch_immediate(inst, code);
    } else if op0 & 0b011 == 0b001 {
        if op1 & (1 << 13) == 0 {
            compare_and_branch(inst, code);
        } else {
            test_and_branch(inst, code);
        }
    }
}

fn conditional_branch(inst: &mut Instruction, code: u32) {
    inst.kind.group = Some(Group::ConditionalBranch);
    let o1 = bit(code, 24);
    let o0 = bit(code, 4);
    inst.cond = Some(Condition::from_bits(bits(code, 3, 0)));
    if o0 || o1 {
        unallocated(inst);
        return;
    }
    inst.kind.mnemonic = Some(Mnemonic::BCond);
    let offset = sign_extend(u64::from(bits(code, 23, 5)), 19) << 2;
    inst.label = Some(inst.address.wrapping_add_signed(offset));
    inst.branch = BranchKind::Direct;
}

fn branch_register(inst: &mut Instruction, code: u32) {
    inst.kind.group = Some(Group::UnconditionalBranchRegister);
    inst.sources.push(Register::new(bits(code, 9, 5), false));

    let opc = bits(code, 24, 21);
    let op2 = bits(code, 20, 16);
    let op3 = bits(code, 15, 10);
    let op4 = bits(code, 4, 0);
    if op2 != 0b11111 {
        unallocated(inst);
        return;
    }
    match opc {
        0b0000 => {
            inst.branch = BranchKind::Indirect;
            if op3 == 0 {
                if op4 != 0 {
                    unallocated(inst);
                } else {
                    inst.kind.mnemonic = Some(Mnemonic::Br);
                }
            }
            // Pointer-auth BRA* forms stay at the group level.
        }
        0b0001 => {
            inst.branch = BranchKind::IndirectCall;
            inst.dest = Some(Register::link());
            inst.result = Some(inst.address + WORD_BYTES);
            if op3 == 0 {
                if op4 != 0 {
                    unallocated(inst);
                } else {
                    inst.kind.mnemonic = Some(Mnemonic::Blr);
                }
            }
        }
        0b0010 => {
            inst.branch = BranchKind::Return;
            if op3 == 0 {
                if op4 != 0 {
                    unallocated(inst);
                } else {
                    inst.kind.mnemonic = Some(Mnemonic::Ret);
                }
            }
        }
        _ => {}
    }
}

fn branch_immediate(inst: &mut Instruction, code: u32) {
    inst.kind.group = Some(Group::UnconditionalBranchImmediate);
    let offset = sign_extend(u64::from(bits(code, 25, 0)), 26) << 2;
    inst.label = Some(inst.address.wrapping_add_signed(offset));
    if bit(code, 31) {
        inst.kind.mnemonic = Some(Mnemonic::Bl);
        inst.branch = BranchKind::DirectCall;
        inst.dest = Some(Register::link());
        inst.result = Some(inst.address + WORD_BYTES);
    } else {
        inst.kind.mnemonic = Some(Mnemonic::B);
        inst.branch = BranchKind::Direct;
    }
}

fn compare_and_branch(inst: &mut Instruction, code: u32) {
    inst.kind.group = Some(Group::CompareAndBranch);
    inst.sf = bit(code, 31);
    inst.sources.push(Register::new(bits(code, 4, 0), false));
    inst.kind.mnemonic = Some(if bit(code, 24) {
        Mnemonic::Cbnz
    } else {
        Mnemonic::Cbz
    });
    let offset = sign_extend(u64::from(bits(code, 23, 5)), 19) << 2;
    inst.label = Some(inst.address.wrapping_add_signed(offset));
    inst.branch = BranchKind::Direct;
}

fn test_and_branch(inst: &mut Instruction, code: u32) {
    inst.kind.group = Some(Group::TestAndBranch);
    inst.sources.push(Register::new(bits(code, 4, 0), false));

    let b5 = u32::from(bit(code, 31));
    let b40 = bits(code, 23, 19);
    // The tested bit index spans b5:b40.
    inst.imm = Some(i64::from((b5 << 5) | b40));
    inst.kind.mnemonic = Some(if bit(code, 24) {
        Mnemonic::Tbnz
    } else {
        Mnemonic::Tbz
    });
    let offset = sign_extend(u64::from(bits(code, 18, 5)), 14) << 2;
    inst.label = Some(inst.address.wrapping_add_signed(offset));
    inst.branch = BranchKind::Direct;
}
