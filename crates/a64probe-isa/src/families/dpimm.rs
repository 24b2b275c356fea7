//! Data Processing -- Immediate.

use crate::{
    Family, Group, Instruction, Mnemonic, Register, bit, bits, decode_bit_masks, sign_extend,
    zero_extend,
};

use super::unallocated;

pub(crate) fn decode(inst: &mut Instruction, code: u32) {
    inst.kind.family = Some(Family::DpImmediate);
    inst.sf = bit(code, 31);
    let op0 = bits(code, 25, 24);
    let op1 = bits(code, 23, 22);
    match op0 {
        0b00 => pc_rel_addressing(inst, code),
        0b01 => {
            if op1 & 0b10 == 0 {
                add_sub_immediate(inst, code);
            } else {
                add_sub_immediate_tags(inst, code);
            }
        }
        0b10 => {
            if op1 & 0b10 == 0 {
                logical_immediate(inst, code);
            } else {
                move_wide_immediate(inst, code);
            }
        }
        _ => {
            // Bitfield / Extract: classified to the group level only.
            inst.kind.group = Some(if op1 & 0b10 == 0 {
                Group::Bitfield
            } else {
                Group::Extract
            });
        }
    }
}

/// ADR / ADRP: the result is fully derivable from the word and its address.
fn pc_rel_addressing(inst: &mut Instruction, code: u32) {
    inst.kind.group = Some(Group::PcRelAddressing);
    inst.sf = true;
    inst.dest = Some(Register::new(bits(code, 4, 0), false));

    let immlo = bits(code, 30, 29);
    let immhi = bits(code, 23, 5);
    let mut imm = u64::from((immhi << 2) | immlo);
    let mut num_bits = 21;
    let mut pc = inst.address;
    if bit(code, 31) {
        inst.kind.mnemonic = Some(Mnemonic::Adrp);
        imm <<= 12;
        num_bits += 12;
        pc &= !0xFFF; // page-aligned base
    } else {
        inst.kind.mnemonic = Some(Mnemonic::Adr);
    }
    let offset = sign_extend(imm, num_bits);
    let result = pc.wrapping_add_signed(offset);
    inst.imm = Some(offset);
    inst.result = Some(result);
    inst.label = Some(result);
}

fn add_sub_immediate(inst: &mut Instruction, code: u32) {
    inst.kind.group = Some(Group::AddSubImmediate);
    let op = bit(code, 30);
    let s = bit(code, 29);
    let rd = bits(code, 4, 0);
    let rn = bits(code, 9, 5);
    inst.dest = Some(Register::new(rd, !s));
    inst.sources.push(Register::new(rn, true));

    let shift = bits(code, 23, 22);
    let mut imm = zero_extend(u64::from(bits(code, 21, 10)), 12) << (12 * shift);
    if op {
        // The immediate is subtracted for the SUB forms.
        imm = -imm;
    }
    inst.imm = Some(imm);

    inst.kind.mnemonic = Some(match (op, s) {
        (false, false) => {
            if imm == 0 && (rd == 31 || rn == 31) {
                Mnemonic::MovSp
            } else {
                Mnemonic::Add
            }
        }
        (false, true) => {
            if rd == 31 {
                inst.dest = None;
                Mnemonic::Cmn
            } else {
                Mnemonic::Adds
            }
        }
        (true, false) => Mnemonic::Sub,
        (true, true) => {
            if rd == 31 {
                inst.dest = None;
                Mnemonic::Cmp
            } else {
                Mnemonic::Subs
            }
        }
    });
}

/// ADDG/SUBG: classified to the group level; operands are not tracked.
fn add_sub_immediate_tags(inst: &mut Instruction, code: u32) {
    inst.kind.group = Some(Group::AddSubImmediateTags);
    let s = bit(code, 29);
    inst.dest = Some(Register::new(bits(code, 4, 0), true));
    inst.sources.push(Register::new(bits(code, 9, 5), true));
    if !inst.sf || s {
        unallocated(inst);
    }
}

fn logical_immediate(inst: &mut Instruction, code: u32) {
    inst.kind.group = Some(Group::LogicalImmediate);
    let sf = inst.sf;
    let opc = bits(code, 30, 29);
    let n = bit(code, 22);
    let immr = bits(code, 21, 16);
    let imms = bits(code, 15, 10);
    let rn = bits(code, 9, 5);
    let rd = bits(code, 4, 0);

    // The destination may be SP for all but the flag-setting form.
    inst.dest = Some(Register::new(rd, opc != 0b11));
    if rn != 31 {
        inst.sources.push(Register::new(rn, false));
    }

    let mask = decode_bit_masks(n, imms, immr, if sf { 64 } else { 32 });
    match mask {
        Some(m) => inst.imm = Some(m as i64),
        None => inst.valid = false,
    }

    if !sf && n {
        unallocated(inst);
        return;
    }
    inst.kind.mnemonic = Some(match opc {
        0b00 | 0b11 => {
            if rn == 31 {
                inst.result = Some(0);
            }
            if opc == 0 { Mnemonic::And } else { Mnemonic::Ands }
        }
        _ => {
            if rn == 31 {
                inst.result = mask;
            }
            if opc == 0b01 { Mnemonic::Orr } else { Mnemonic::Eor }
        }
    });
}

fn move_wide_immediate(inst: &mut Instruction, code: u32) {
    inst.kind.group = Some(Group::MoveWideImmediate);
    let sf = inst.sf;
    let opc = bits(code, 30, 29);
    let hw = bits(code, 22, 21);
    let rd = bits(code, 4, 0);
    if opc == 0b01 || (!sf && hw >= 2) {
        unallocated(inst);
        return;
    }

    let value = u64::from(bits(code, 20, 5)) << (16 * hw);
    inst.dest = Some(Register::new(rd, false));
    inst.imm = Some(value as i64);
    inst.kind.mnemonic = Some(match opc {
        0b00 => {
            let inverted = if sf { !value } else { !value & 0xFFFF_FFFF };
            inst.result = Some(inverted);
            Mnemonic::Movn
        }
        0b10 => {
            inst.result = Some(value);
            Mnemonic::Movz
        }
        _ => {
            // MOVK keeps the untouched bits of its destination.
            inst.sources.push(Register::new(rd, false));
            Mnemonic::Movk
        }
    });
}
