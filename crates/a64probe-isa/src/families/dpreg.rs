//! Data Processing -- Register.

use crate::{
    Condition, ExtendKind, Family, Group, Instruction, Mnemonic, Register, ShiftKind, bit, bits,
};

use super::unallocated;

pub(crate) fn decode(inst: &mut Instruction, code: u32) {
    inst.kind.family = Some(Family::DpRegister);
    inst.sf = bit(code, 31);
    let op1 = bit(code, 28);
    let op2 = bits(code, 24, 21);
    if op1 {
        if op2 == 0b0100 {
            conditional_select(inst, code);
        } else if op2 & 0b1000 != 0 {
            three_source(inst, code);
        }
        // Remaining op2 values (2-source, 1-source, flag ops) stay coarse.
    } else if op2 & 0b1000 == 0 {
        logical_shifted(inst, code);
    } else if op2 & 0b0001 == 0 {
        add_sub_shifted(inst, code);
    } else {
        add_sub_extended(inst, code);
    }
}

fn logical_shifted(inst: &mut Instruction, code: u32) {
    inst.kind.group = Some(Group::LogicalShiftedRegister);
    let sf = inst.sf;
    let opc = bits(code, 30, 29);
    let n = bit(code, 21);
    let imm6 = bits(code, 15, 10);
    let rd = bits(code, 4, 0);
    let rn = bits(code, 9, 5);
    let rm = bits(code, 20, 16);

    inst.dest = Some(Register::new(rd, false));
    inst.sources.push(Register::new(rn, false));
    inst.sources.push(Register::new(rm, false));
    inst.imm = Some(i64::from(imm6));
    inst.shift = Some(ShiftKind::from_bits(bits(code, 23, 22)));

    if !sf && imm6 & 0b100000 != 0 {
        unallocated(inst);
        return;
    }
    inst.kind.mnemonic = Some(match (opc, n) {
        (0b00, false) => Mnemonic::And,
        (0b00, true) => Mnemonic::Bic,
        (0b01, false) => {
            if inst.shift == Some(ShiftKind::Lsl) && imm6 == 0 && rn == 31 {
                if rm == 31 {
                    // mov xd, xzr: a known-constant write.
                    inst.sources.clear();
                    inst.result = Some(0);
                } else {
                    inst.sources = vec![Register::new(rm, false)];
                }
                Mnemonic::MovReg
            } else {
                Mnemonic::Orr
            }
        }
        (0b01, true) => {
            if rn == 31 {
                inst.sources = vec![Register::new(rm, false)];
                Mnemonic::Mvn
            } else {
                Mnemonic::Orn
            }
        }
        (0b10, false) => Mnemonic::Eor,
        (0b10, true) => Mnemonic::Eon,
        (0b11, false) => {
            if rd == 31 {
                inst.dest = None;
                Mnemonic::Tst
            } else {
                Mnemonic::Ands
            }
        }
        _ => Mnemonic::Bics,
    });
}

fn add_sub_shifted(inst: &mut Instruction, code: u32) {
    inst.kind.group = Some(Group::AddSubShiftedRegister);
    let sf = inst.sf;
    let imm6 = bits(code, 15, 10);
    let rd = bits(code, 4, 0);
    let rn = bits(code, 9, 5);
    let rm = bits(code, 20, 16);

    inst.dest = Some(Register::new(rd, false));
    inst.sources.push(Register::new(rn, false));
    inst.sources.push(Register::new(rm, false));
    inst.imm = Some(i64::from(imm6));
    inst.shift = Some(ShiftKind::from_bits(bits(code, 23, 22)));

    if inst.shift == Some(ShiftKind::Ror) || (!sf && imm6 & 0b100000 != 0) {
        unallocated(inst);
        return;
    }
    add_sub_operation(inst, code, rd, rn, rm);
}

fn add_sub_extended(inst: &mut Instruction, code: u32) {
    inst.kind.group = Some(Group::AddSubExtendedRegister);
    let sf = inst.sf;
    let s = bit(code, 29);
    let rd = bits(code, 4, 0);
    let rn = bits(code, 9, 5);
    let rm = bits(code, 20, 16);

    inst.dest = Some(Register::new(rd, !s));
    inst.sources.push(Register::new(rn, true));
    inst.sources.push(Register::new(rm, false));

    let opt = bits(code, 23, 22);
    let extend = ExtendKind::from_bits(bits(code, 15, 13));
    inst.extend = Some(extend);
    inst.imm = Some(i64::from(bits(code, 12, 10)));

    // With an SP base the canonical extend reads as a plain shift.
    if rn == 31
        && ((!sf && extend == ExtendKind::Uxtw) || (sf && extend == ExtendKind::Uxtx))
    {
        inst.shift = Some(ShiftKind::Lsl);
    }

    if opt != 0 || inst.imm.is_some_and(|i| i > 4) {
        unallocated(inst);
        return;
    }
    add_sub_operation(inst, code, rd, rn, rm);
}

/// Shared ADD/SUB operation and alias table for the two register forms.
fn add_sub_operation(inst: &mut Instruction, code: u32, rd: u32, rn: u32, rm: u32) {
    let op = bit(code, 30);
    let s = bit(code, 29);
    inst.kind.mnemonic = Some(match (op, s) {
        (false, false) => Mnemonic::Add,
        (false, true) => {
            if rd == 31 {
                inst.dest = None;
                Mnemonic::Cmn
            } else {
                Mnemonic::Adds
            }
        }
        (true, false) => {
            if rn == 31 {
                inst.sources = vec![Register::new(rm, false)];
                Mnemonic::Neg
            } else {
                Mnemonic::Sub
            }
        }
        (true, true) => {
            if rd == 31 {
                inst.dest = None;
                Mnemonic::Cmp
            } else if rn == 31 {
                inst.sources = vec![Register::new(rm, false)];
                Mnemonic::Negs
            } else {
                Mnemonic::Subs
            }
        }
    });
}

fn conditional_select(inst: &mut Instruction, code: u32) {
    inst.kind.group = Some(Group::ConditionalSelect);
    let op = bit(code, 30);
    let s = bit(code, 29);
    let op2 = bits(code, 11, 10);

    inst.dest = Some(Register::new(bits(code, 4, 0), false));
    inst.sources.push(Register::new(bits(code, 9, 5), false));
    inst.sources.push(Register::new(bits(code, 20, 16), false));
    inst.cond = Some(Condition::from_bits(bits(code, 15, 12)));

    if s || op2 & 0b10 != 0 {
        unallocated(inst);
        return;
    }
    inst.kind.mnemonic = Some(match (op, op2 & 0b01 != 0) {
        (false, false) => Mnemonic::Csel,
        (false, true) => Mnemonic::Csinc,
        (true, false) => Mnemonic::Csinv,
        (true, true) => Mnemonic::Csneg,
    });
}

fn three_source(inst: &mut Instruction, code: u32) {
    inst.kind.group = Some(Group::DpThreeSource);
    let sf = inst.sf;
    let ra = bits(code, 14, 10);

    inst.dest = Some(Register::new(bits(code, 4, 0), false));
    inst.sources.push(Register::new(bits(code, 9, 5), false));
    inst.sources.push(Register::new(bits(code, 20, 16), false));
    if ra != 31 {
        inst.sources.push(Register::new(ra, false));
    }

    let o0 = bit(code, 15);
    let op31 = bits(code, 23, 21);
    let op54 = bits(code, 30, 29);
    if op54 != 0
        || op31 == 0b011
        || op31 == 0b100
        || op31 == 0b111
        || (o0 && (op31 == 0b010 || op31 == 0b110))
        || (!sf && op31 != 0)
    {
        unallocated(inst);
        return;
    }
    inst.kind.mnemonic = Some(if op31 == 0 {
        match (o0, ra == 31) {
            (false, true) => Mnemonic::Mul,
            (false, false) => Mnemonic::Madd,
            (true, true) => Mnemonic::Mneg,
            (true, false) => Mnemonic::Msub,
        }
    } else {
        let unsigned = bit(code, 23);
        if op31 & 0b011 == 0b001 {
            match (o0, ra == 31, unsigned) {
                (false, true, true) => Mnemonic::Umull,
                (false, true, false) => Mnemonic::Smull,
                (false, false, true) => Mnemonic::Umaddl,
                (false, false, false) => Mnemonic::Smaddl,
                (true, true, true) => Mnemonic::Umnegl,
                (true, true, false) => Mnemonic::Smnegl,
                (true, false, true) => Mnemonic::Umsubl,
                (true, false, false) => Mnemonic::Smsubl,
            }
        } else if ra == 31 {
            if unsigned { Mnemonic::Umulh } else { Mnemonic::Smulh }
        } else {
            unallocated(inst);
            return;
        }
    });
}

#[cfg(test)]
mod tests {
    use crate::{Condition, ExtendKind, Group, Mnemonic, ShiftKind, decode_word};

    #[test]
    fn test_mov_register_alias() {
        // mov x0, x1
        let inst = decode_word(0xAA0103E0, 0x1000);
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::MovReg));
        assert_eq!(inst.sources.len(), 1);
        assert_eq!(inst.sources[0].index(), 1);
    }

    #[test]
    fn test_mov_zero_precomputes() {
        // mov x0, xzr
        let inst = decode_word(0xAA1F03E0, 0x1000);
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::MovReg));
        assert!(inst.sources.is_empty());
        assert_eq!(inst.result, Some(0));
    }

    #[test]
    fn test_orr_shifted() {
        // orr x0, x1, x2
        let inst = decode_word(0xAA020020, 0x1000);
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::Orr));
        assert_eq!(inst.sources.len(), 2);
    }

    #[test]
    fn test_and_shifted() {
        // and x3, x4, x5
        let inst = decode_word(0x8A050083, 0x1000);
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::And));
        assert_eq!(inst.dest.map(super::Register::index), Some(3));
    }

    #[test]
    fn test_mvn_alias() {
        // mvn x0, x1
        let inst = decode_word(0xAA2103E0, 0x1000);
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::Mvn));
        assert_eq!(inst.sources.len(), 1);
    }

    #[test]
    fn test_tst_clears_destination() {
        // tst x1, x2
        let inst = decode_word(0xEA02003F, 0x1000);
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::Tst));
        assert_eq!(inst.dest, None);
    }

    #[test]
    fn test_add_shifted() {
        // add x0, x1, x2
        let inst = decode_word(0x8B020020, 0x1000);
        assert_eq!(inst.kind.group, Some(Group::AddSubShiftedRegister));
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::Add));
        assert_eq!(inst.shift, Some(ShiftKind::Lsl));
    }

    #[test]
    fn test_cmp_shifted() {
        // cmp x1, x2
        let inst = decode_word(0xEB02003F, 0x1000);
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::Cmp));
        assert_eq!(inst.dest, None);
        assert_eq!(inst.sources.len(), 2);
    }

    #[test]
    fn test_neg_alias_folds_source() {
        // neg x3, x4
        let inst = decode_word(0xCB0403E3, 0x1000);
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::Neg));
        assert_eq!(inst.sources.len(), 1);
        assert_eq!(inst.sources[0].index(), 4);
    }

    #[test]
    fn test_add_shifted_ror_unallocated() {
        // add with a ROR shift is not an allocated encoding.
        let inst = decode_word(0x8BC20420, 0x1000);
        assert!(!inst.valid);
        assert!(inst.parsed());
    }

    #[test]
    fn test_add_extended_sp_base() {
        // add x0, sp, x2
        let inst = decode_word(0x8B2263E0, 0x1000);
        assert_eq!(inst.kind.group, Some(Group::AddSubExtendedRegister));
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::Add));
        assert!(inst.sources[0].is_sp());
        assert_eq!(inst.extend, Some(ExtendKind::Uxtx));
        assert_eq!(inst.shift, Some(ShiftKind::Lsl));
    }

    #[test]
    fn test_csel() {
        // csel x0, x1, x2, eq
        let inst = decode_word(0x9A820020, 0x1000);
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::Csel));
        assert_eq!(inst.cond, Some(Condition::from_bits(0)));
        assert_eq!(inst.sources.len(), 2);
    }

    #[test]
    fn test_csinc() {
        // csinc x0, x1, x2, ne
        let inst = decode_word(0x9A821420, 0x1000);
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::Csinc));
    }

    #[test]
    fn test_mul_alias() {
        // mul x0, x1, x2
        let inst = decode_word(0x9B027C20, 0x1000);
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::Mul));
        assert_eq!(inst.sources.len(), 2);
    }

    #[test]
    fn test_madd_three_sources() {
        // madd x0, x1, x2, x3
        let inst = decode_word(0x9B020C20, 0x1000);
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::Madd));
        assert_eq!(inst.sources.len(), 3);
    }

    #[test]
    fn test_smull_alias() {
        // smull x0, w1, w2
        let inst = decode_word(0x9B227C20, 0x1000);
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::Smull));
    }

    #[test]
    fn test_umulh() {
        // umulh x0, x1, x2
        let inst = decode_word(0x9BC27C20, 0x1000);
        assert_eq!(inst.kind.mnemonic, Some(Mnemonic::Umulh));
    }
}
