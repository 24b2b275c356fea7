//! Classification labels: the three-level kind path and operand descriptors.

use std::fmt;

/// Top-level A64 encoding family, selected by op0 (bits 28:25).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
    /// Data Processing -- Immediate.
    DpImmediate,
    /// Data Processing -- Register.
    DpRegister,
    /// Branches, Exception Generating and System instructions.
    BranchExcSys,
    /// Loads and Stores.
    LoadStore,
    /// Data Processing -- Scalar Floating-Point and Advanced SIMD.
    SimdFp,
    /// Architecturally unallocated top-level space.
    Reserved,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DpImmediate => "Data Processing -- Immediate",
            Self::DpRegister => "Data Processing -- Register",
            Self::BranchExcSys => "Branches, Exception Generating and System instructions",
            Self::LoadStore => "Loads and Stores",
            Self::SimdFp => "Data Processing -- Scalar Floating-Point and Advanced SIMD",
            Self::Reserved => "Unallocated",
        };
        f.write_str(s)
    }
}

/// Second-level encoding group within a family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Group {
    PcRelAddressing,
    AddSubImmediate,
    AddSubImmediateTags,
    LogicalImmediate,
    MoveWideImmediate,
    Bitfield,
    Extract,
    LogicalShiftedRegister,
    AddSubShiftedRegister,
    AddSubExtendedRegister,
    ConditionalSelect,
    DpThreeSource,
    ConditionalBranch,
    UnconditionalBranchRegister,
    UnconditionalBranchImmediate,
    CompareAndBranch,
    TestAndBranch,
    LdStUnsignedImmediate,
    LdStImmediatePreIndexed,
    LdStImmediatePostIndexed,
    LdStRegisterOffset,
    LdStNoAllocPair,
    LdStPairPostIndexed,
    LdStPairOffset,
    LdStPairPreIndexed,
    Reserved,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PcRelAddressing => "PC-rel. addressing",
            Self::AddSubImmediate => "Add/subtract (immediate)",
            Self::AddSubImmediateTags => "Add/subtract (immediate, with tags)",
            Self::LogicalImmediate => "Logical (immediate)",
            Self::MoveWideImmediate => "Move wide (immediate)",
            Self::Bitfield => "Bitfield",
            Self::Extract => "Extract",
            Self::LogicalShiftedRegister => "Logical (shifted register)",
            Self::AddSubShiftedRegister => "Add/subtract (shifted register)",
            Self::AddSubExtendedRegister => "Add/subtract (extended register)",
            Self::ConditionalSelect => "Conditional select",
            Self::DpThreeSource => "Data-processing (3 source)",
            Self::ConditionalBranch => "Conditional branch (immediate)",
            Self::UnconditionalBranchRegister => "Unconditional branch (register)",
            Self::UnconditionalBranchImmediate => "Unconditional branch (immediate)",
            Self::CompareAndBranch => "Compare and branch (immediate)",
            Self::TestAndBranch => "Test and branch (immediate)",
            Self::LdStUnsignedImmediate => "Load/store register (unsigned immediate)",
            Self::LdStImmediatePreIndexed => "Load/store register (immediate pre-indexed)",
            Self::LdStImmediatePostIndexed => "Load/store register (immediate post-indexed)",
            Self::LdStRegisterOffset => "Load/store register (register offset)",
            Self::LdStNoAllocPair => "Load/store no-allocate pair (offset)",
            Self::LdStPairPostIndexed => "Load/store register pair (post-indexed)",
            Self::LdStPairOffset => "Load/store register pair (offset)",
            Self::LdStPairPreIndexed => "Load/store register pair (pre-indexed)",
            Self::Reserved => "Unallocated",
        };
        f.write_str(s)
    }
}

/// Mnemonic-level classification, using the architecture's preferred alias
/// where one applies (CMP rather than SUBS with a discarded destination,
/// and so on).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mnemonic {
    Adr,
    Adrp,
    Add,
    Adds,
    Sub,
    Subs,
    Cmp,
    Cmn,
    Neg,
    Negs,
    MovSp,
    MovReg,
    Mvn,
    Tst,
    And,
    Orr,
    Eor,
    Ands,
    Bic,
    Orn,
    Eon,
    Bics,
    Movn,
    Movz,
    Movk,
    Csel,
    Csinc,
    Csinv,
    Csneg,
    Madd,
    Msub,
    Mul,
    Mneg,
    Smaddl,
    Smsubl,
    Smull,
    Smnegl,
    Umaddl,
    Umsubl,
    Umull,
    Umnegl,
    Smulh,
    Umulh,
    BCond,
    B,
    Bl,
    Br,
    Blr,
    Ret,
    Cbz,
    Cbnz,
    Tbz,
    Tbnz,
    Str,
    Strb,
    Strh,
    Ldr,
    Ldrb,
    Ldrh,
    Ldrsb,
    Ldrsh,
    Ldrsw,
    Prfm,
    Stp,
    Stgp,
    Ldp,
    Ldpsw,
    Reserved,
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Adr => "ADR",
            Self::Adrp => "ADRP",
            Self::Add => "ADD",
            Self::Adds => "ADDS",
            Self::Sub => "SUB",
            Self::Subs => "SUBS",
            Self::Cmp => "CMP",
            Self::Cmn => "CMN",
            Self::Neg => "NEG",
            Self::Negs => "NEGS",
            Self::MovSp => "MOV (to/from SP)",
            Self::MovReg => "MOV (register)",
            Self::Mvn => "MVN",
            Self::Tst => "TST",
            Self::And => "AND",
            Self::Orr => "ORR",
            Self::Eor => "EOR",
            Self::Ands => "ANDS",
            Self::Bic => "BIC",
            Self::Orn => "ORN",
            Self::Eon => "EON",
            Self::Bics => "BICS",
            Self::Movn => "MOVN",
            Self::Movz => "MOVZ",
            Self::Movk => "MOVK",
            Self::Csel => "CSEL",
            Self::Csinc => "CSINC",
            Self::Csinv => "CSINV",
            Self::Csneg => "CSNEG",
            Self::Madd => "MADD",
            Self::Msub => "MSUB",
            Self::Mul => "MUL",
            Self::Mneg => "MNEG",
            Self::Smaddl => "SMADDL",
            Self::Smsubl => "SMSUBL",
            Self::Smull => "SMULL",
            Self::Smnegl => "SMNEGL",
            Self::Umaddl => "UMADDL",
            Self::Umsubl => "UMSUBL",
            Self::Umull => "UMULL",
            Self::Umnegl => "UMNEGL",
            Self::Smulh => "SMULH",
            Self::Umulh => "UMULH",
            Self::BCond => "B.cond",
            Self::B => "B",
            Self::Bl => "BL",
            Self::Br => "BR",
            Self::Blr => "BLR",
            Self::Ret => "RET",
            Self::Cbz => "CBZ",
            Self::Cbnz => "CBNZ",
            Self::Tbz => "TBZ",
            Self::Tbnz => "TBNZ",
            Self::Str => "STR",
            Self::Strb => "STRB",
            Self::Strh => "STRH",
            Self::Ldr => "LDR",
            Self::Ldrb => "LDRB",
            Self::Ldrh => "LDRH",
            Self::Ldrsb => "LDRSB",
            Self::Ldrsh => "LDRSH",
            Self::Ldrsw => "LDRSW",
            Self::Prfm => "PRFM",
            Self::Stp => "STP",
            Self::Stgp => "STGP",
            Self::Ldp => "LDP",
            Self::Ldpsw => "LDPSW",
            Self::Reserved => "UNALLOCATED",
        };
        f.write_str(s)
    }
}

/// Three-level classification path, coarsest first. A record is fully
/// parsed when all three levels are present.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KindPath {
    pub family: Option<Family>,
    pub group: Option<Group>,
    pub mnemonic: Option<Mnemonic>,
}

impl KindPath {
    /// All three levels populated.
    pub const fn complete(self) -> bool {
        self.family.is_some() && self.group.is_some() && self.mnemonic.is_some()
    }

    /// True if any populated level is the unallocated marker.
    pub fn unallocated(self) -> bool {
        self.family == Some(Family::Reserved)
            || self.group == Some(Group::Reserved)
            || self.mnemonic == Some(Mnemonic::Reserved)
    }

    /// The most specific populated label, if any.
    pub fn deepest(self) -> Option<String> {
        self.mnemonic
            .map(|m| m.to_string())
            .or_else(|| self.group.map(|g| g.to_string()))
            .or_else(|| self.family.map(|f| f.to_string()))
    }
}

/// Control-transfer classification of an instruction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BranchKind {
    /// Not a control transfer.
    #[default]
    None,
    /// Direct branch to a decoded label.
    Direct,
    /// Direct branch that writes the link register.
    DirectCall,
    /// Branch through a register.
    Indirect,
    /// Branch through a register that writes the link register.
    IndirectCall,
    /// Function return.
    Return,
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Direct => "direct",
            Self::DirectCall => "direct call",
            Self::Indirect => "indirect",
            Self::IndirectCall => "indirect call",
            Self::Return => "return",
        };
        f.write_str(s)
    }
}

/// 4-bit condition code carried by conditional branches and selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Condition(u8);

impl Condition {
    /// Build from the decoded 4-bit field.
    pub const fn from_bits(bits: u32) -> Self {
        Self((bits & 0xF) as u8)
    }

    /// The raw 4-bit value.
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [&str; 16] = [
            "EQ", "NE", "CS", "CC", "MI", "PL", "VS", "VC", "HI", "LS", "GE", "LT", "GT", "LE",
            "AL", "NV",
        ];
        f.write_str(NAMES[self.0 as usize & 0xF])
    }
}

/// Shift descriptor on shifted-register and offset forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShiftKind {
    Lsl,
    Lsr,
    Asr,
    Ror,
}

impl ShiftKind {
    /// Build from the decoded 2-bit "shift" field.
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b00 => Self::Lsl,
            0b01 => Self::Lsr,
            0b10 => Self::Asr,
            _ => Self::Ror,
        }
    }
}

impl fmt::Display for ShiftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Lsl => "LSL",
            Self::Lsr => "LSR",
            Self::Asr => "ASR",
            Self::Ror => "ROR",
        };
        f.write_str(s)
    }
}

/// Extend descriptor on extended-register and register-offset forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtendKind {
    Uxtb,
    Uxth,
    Uxtw,
    Uxtx,
    Sxtb,
    Sxth,
    Sxtw,
    Sxtx,
}

impl ExtendKind {
    /// Build from the decoded 3-bit "option" field.
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0b111 {
            0b000 => Self::Uxtb,
            0b001 => Self::Uxth,
            0b010 => Self::Uxtw,
            0b011 => Self::Uxtx,
            0b100 => Self::Sxtb,
            0b101 => Self::Sxth,
            0b110 => Self::Sxtw,
            _ => Self::Sxtx,
        }
    }
}

impl fmt::Display for ExtendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uxtb => "UXTB",
            Self::Uxth => "UXTH",
            Self::Uxtw => "UXTW",
            Self::Uxtx => "UXTX",
            Self::Sxtb => "SXTB",
            Self::Sxth => "SXTH",
            Self::Sxtw => "SXTW",
            Self::Sxtx => "SXTX",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_path_completion() {
        let mut path = KindPath::default();
        assert!(!path.complete());
        path.family = Some(Family::DpImmediate);
        path.group = Some(Group::AddSubImmediate);
        assert!(!path.complete());
        assert_eq!(path.deepest().as_deref(), Some("Add/subtract (immediate)"));
        path.mnemonic = Some(Mnemonic::Add);
        assert!(path.complete());
        assert_eq!(path.deepest().as_deref(), Some("ADD"));
    }

    #[test]
    fn test_unallocated_marker() {
        let path = KindPath {
            family: Some(Family::DpRegister),
            group: Some(Group::AddSubShiftedRegister),
            mnemonic: Some(Mnemonic::Reserved),
        };
        assert!(path.unallocated());
    }

    #[test]
    fn test_condition_names() {
        assert_eq!(Condition::from_bits(0).to_string(), "EQ");
        assert_eq!(Condition::from_bits(1).to_string(), "NE");
        assert_eq!(Condition::from_bits(13).to_string(), "LE");
    }
}
