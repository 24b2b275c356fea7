//! Loads and Stores.
//!
//! Stores record the address base register in the destination slot and the
//! value register(s) as sources; loads do the opposite. The immediate-offset
//! scan predicate relies on this orientation.

use crate::{
    ExtendKind, Family, Group, Instruction, Mnemonic, Register, ShiftKind, bit, bits, sign_extend,
    zero_extend,
};

use super::unallocated;

pub(crate) fn decode(inst: &mut Instruction, code: u32) {
    inst.kind.family = Some(Family::LoadStore);
    let op0 = bits(code, 31, 28);
    match op0 & 0b11 {
        0b11 => register_forms(inst, code),
        0b10 => pair_forms(inst, code),
        // Exclusive, literal, and multi-register groups stay coarse.
        _ => {}
    }
}

fn register_forms(inst: &mut Instruction, code: u32) {
    let size = bits(code, 31, 30);
    let v = bit(code, 26);
    let op2 = bits(code, 24, 23);
    let op3 = bits(code, 21, 16);
    let op4 = bits(code, 11, 10);
    let opc = bits(code, 23, 22);
    let rt = bits(code, 4, 0);
    let rn = bits(code, 9, 5);
    inst.sf = size == 0b11;

    if op2 & 0b10 != 0 {
        inst.kind.group = Some(Group::LdStUnsignedImmediate);
        inst.imm = Some(zero_extend(u64::from(bits(code, 21, 10)), 12) << size);
    } else if op3 & 0b100000 == 0 {
        let imm9 = sign_extend(u64::from(bits(code, 20, 12)), 9);
        match op4 {
            0b11 => {
                inst.kind.group = Some(Group::LdStImmediatePreIndexed);
                inst.imm = Some(imm9);
                inst.wback = true;
            }
            0b01 => {
                inst.kind.group = Some(Group::LdStImmediatePostIndexed);
                inst.imm = Some(imm9);
                inst.wback = true;
                inst.postindex = true;
            }
            // Unscaled and unprivileged offsets stay coarse.
            _ => return,
        }
    } else if op4 == 0b10 {
        register_offset(inst, code, size, v, opc, rt, rn);
        return;
    } else {
        return;
    }

    if v {
        // SIMD&FP register forms stay at the group level.
        return;
    }
    if opc == 0 {
        inst.sources.push(Register::new(rt, false));
        inst.dest = Some(Register::new(rn, true));
        inst.kind.mnemonic = Some(store_mnemonic(size));
    } else {
        inst.sources.push(Register::new(rn, true));
        inst.dest = Some(Register::new(rt, false));
        inst.kind.mnemonic = Some(load_mnemonic(size, opc));
    }
}

fn store_mnemonic(size: u32) -> Mnemonic {
    match size {
        0b11 | 0b10 => Mnemonic::Str,
        0b01 => Mnemonic::Strh,
        _ => Mnemonic::Strb,
    }
}

/// Load mnemonic for opc != 0. The reserved signed-load shapes yield the
/// unallocated marker, which the top-level decode turns into an invalid
/// record.
fn load_mnemonic(size: u32, opc: u32) -> Mnemonic {
    if opc == 0b01 {
        return match size {
            0b11 | 0b10 => Mnemonic::Ldr,
            0b01 => Mnemonic::Ldrh,
            _ => Mnemonic::Ldrb,
        };
    }
    let opc64 = opc == 0b10;
    match size {
        0b11 => {
            if opc64 {
                Mnemonic::Prfm
            } else {
                Mnemonic::Reserved
            }
        }
        0b10 => {
            if opc64 {
                Mnemonic::Ldrsw
            } else {
                Mnemonic::Reserved
            }
        }
        0b01 => Mnemonic::Ldrsh,
        _ => Mnemonic::Ldrsb,
    }
}

fn register_offset(
    inst: &mut Instruction,
    code: u32,
    size: u32,
    v: bool,
    opc: u32,
    rt: u32,
    rn: u32,
) {
    inst.kind.group = Some(Group::LdStRegisterOffset);
    let rm = bits(code, 20, 16);
    let option = bits(code, 15, 13);
    let s = bit(code, 12);

    inst.extend = Some(ExtendKind::from_bits(option));
    if inst.extend == Some(ExtendKind::Uxtx) {
        inst.shift = Some(ShiftKind::Lsl);
    }
    // The offset scale in bits, when the S bit requests scaling.
    inst.imm = Some(if s { i64::from(size) } else { 0 });

    if option & 0b010 == 0 || (size & 0b01 == 0b01 && v && opc & 0b10 != 0) {
        unallocated(inst);
        return;
    }
    if v {
        // SIMD&FP register-offset forms stay at the group level.
        return;
    }
    if opc == 0 {
        inst.sources.push(Register::new(rt, false));
        inst.sources.push(Register::new(rm, false));
        inst.dest = Some(Register::new(rn, true));
        inst.kind.mnemonic = Some(store_mnemonic(size));
    } else {
        inst.sources.push(Register::new(rn, true));
        inst.sources.push(Register::new(rm, false));
        inst.dest = Some(Register::new(rt, false));
        inst.kind.mnemonic = Some(load_mnemonic(size, opc));
    }
}

fn pair_forms(inst: &mut Instruction, code: u32) {
    let opc = bits(code, 31, 30);
    let v = bit(code, 26);
    let op2 = bits(code, 24, 23);
    let l = bit(code, 22);
    let rt = bits(code, 4, 0);
    let rn = bits(code, 9, 5);
    let rt2 = bits(code, 14, 10);
    inst.sf = opc == 0b10;

    if op2 == 0 {
        inst.kind.group = Some(Group::LdStNoAllocPair);
        return;
    }
    inst.kind.group = Some(match op2 {
        0b01 => {
            inst.wback = true;
            inst.postindex = true;
            Group::LdStPairPostIndexed
        }
        0b10 => Group::LdStPairOffset,
        _ => {
            inst.wback = true;
            Group::LdStPairPreIndexed
        }
    });

    if opc == 0b11 {
        unallocated(inst);
        return;
    }
    if v {
        // SIMD&FP pairs stay at the group level.
        return;
    }

    let scale = match opc {
        0b10 => 3,
        0b01 if !l => 4, // tag-granule scaled
        _ => 2,
    };
    inst.imm = Some(sign_extend(u64::from(bits(code, 21, 15)), 7) << scale);

    if l {
        inst.sources.push(Register::new(rn, true));
        inst.dest = Some(Register::new(rt, false));
        inst.dest2 = Some(Register::new(rt2, false));
        inst.kind.mnemonic = Some(match opc {
            0b01 => Mnemonic::Ldpsw,
            _ => Mnemonic::Ldp,
        });
    } else {
        inst.sources.push(Register::new(rt, false));
        inst.sources.push(Register::new(rt2, false));
        inst.dest = Some(Register::new(rn, true));
        inst.kind.mnemonic = Some(match opc {
            0b01 => Mnemonic::Stgp,
            _ => Mnemonic::Stp,
        });
    }
}

#[cfg(test)]
mod tests {
    use crate::{ExtendKind, Group, Mnemonic, ShiftKind, decode_word};

    #[test]
    fn test_ldr_unsigned_immediate() {
        // ldr x0, [x1, #16]
        let inst = decode_word(0xF9400820, 0x1000);
        assert_eq!(inst.kind.group, Some(Group::LdStUnsignedImmediate));
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::Ldr));
        assert_eq!(inst.imm, Some(16));
        assert_eq!(inst.dest.map(super::Register::index), Some(0));
        assert_eq!(inst.sources.len(), 1);
        assert_eq!(inst.sources[0].index(), 1);
        assert!(inst.sf);
    }

    #[test]
    fn test_ldr_32bit() {
        // ldr w2, [x3]
        let inst = decode_word(0xB9400062, 0x1000);
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::Ldr));
        assert_eq!(inst.imm, Some(0));
        assert!(!inst.sf);
    }

    #[test]
    fn test_str_base_is_destination() {
        // str x0, [sp, #8]
        let inst = decode_word(0xF90007E0, 0x1000);
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::Str));
        assert!(inst.dest.is_some_and(super::Register::is_sp));
        assert_eq!(inst.sources[0].index(), 0);
        assert_eq!(inst.imm, Some(8));
    }

    #[test]
    fn test_strb() {
        // strb w1, [x2]
        let inst = decode_word(0x39000041, 0x1000);
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::Strb));
        assert_eq!(inst.imm, Some(0));
    }

    #[test]
    fn test_ldrb_scales_by_byte() {
        // ldrb w3, [x4, #1]
        let inst = decode_word(0x39400483, 0x1000);
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::Ldrb));
        assert_eq!(inst.imm, Some(1));
    }

    #[test]
    fn test_ldrsw() {
        // ldrsw x1, [x2, #4]
        let inst = decode_word(0xB9800441, 0x1000);
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::Ldrsw));
        assert_eq!(inst.imm, Some(4));
    }

    #[test]
    fn test_ldr_post_indexed() {
        // ldr x0, [x1], #8
        let inst = decode_word(0xF8408420, 0x1000);
        assert_eq!(inst.kind.group, Some(Group::LdStImmediatePostIndexed));
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::Ldr));
        assert_eq!(inst.imm, Some(8));
        assert!(inst.wback && inst.postindex);
    }

    #[test]
    fn test_str_pre_indexed_negative() {
        // str x0, [x1, #-8]!
        let inst = decode_word(0xF81F8C20, 0x1000);
        assert_eq!(inst.kind.group, Some(Group::LdStImmediatePreIndexed));
        assert_eq!(inst.imm, Some(-8));
        assert!(inst.wback && !inst.postindex);
    }

    #[test]
    fn test_ldur_stays_coarse() {
        // ldur x0, [x1]: unscaled forms are not fully decoded.
        let inst = decode_word(0xF8400020, 0x1000);
        assert!(!inst.parsed());
        assert!(inst.valid);
    }

    #[test]
    fn test_ldr_register_offset() {
        // ldr x2, [x3, x4]
        let inst = decode_word(0xF8646862, 0x1000);
        assert_eq!(inst.kind.group, Some(Group::LdStRegisterOffset));
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::Ldr));
        assert_eq!(inst.sources.len(), 2);
        assert_eq!(inst.sources[0].index(), 3);
        assert_eq!(inst.sources[1].index(), 4);
        assert_eq!(inst.extend, Some(ExtendKind::Uxtx));
        assert_eq!(inst.shift, Some(ShiftKind::Lsl));
    }

    #[test]
    fn test_stp_pre_indexed() {
        // stp x29, x30, [sp, #-16]!
        let inst = decode_word(0xA9BF7BFD, 0x1000);
        assert_eq!(inst.kind.group, Some(Group::LdStPairPreIndexed));
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::Stp));
        assert!(inst.dest.is_some_and(super::Register::is_sp));
        assert_eq!(inst.sources.len(), 2);
        assert_eq!(inst.sources[0].index(), 29);
        assert_eq!(inst.sources[1].index(), 30);
        assert_eq!(inst.imm, Some(-16));
        assert!(inst.wback);
    }

    #[test]
    fn test_ldp_post_indexed() {
        // ldp x29, x30, [sp], #16
        let inst = decode_word(0xA8C17BFD, 0x1000);
        assert_eq!(inst.kind.group, Some(Group::LdStPairPostIndexed));
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::Ldp));
        assert_eq!(inst.dest.map(super::Register::index), Some(29));
        assert_eq!(inst.dest2.map(super::Register::index), Some(30));
        assert_eq!(inst.sources[0].index(), 31);
        assert_eq!(inst.imm, Some(16));
        assert!(inst.postindex);
    }

    #[test]
    fn test_pair_opc11_unallocated() {
        let inst = decode_word(0xE9400000, 0x1000);
        assert!(!inst.valid);
        assert!(inst.parsed());
    }
}
