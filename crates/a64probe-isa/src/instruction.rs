//! The decoded instruction record.

use std::fmt;

use crate::{BranchKind, Condition, ExtendKind, Group, KindPath, Mnemonic, Register, ShiftKind};

/// One decoded A64 code word with all fields extracted.
///
/// The record is immutable once produced by the decoder. Two flags carry
/// the classification outcome: [`Instruction::parsed`] is false when the
/// decoder could not reach the mnemonic level (unknown, but not
/// necessarily invalid), and `valid` is false when the encoding is
/// architecturally unallocated or reserved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// Absolute address of the code word.
    pub address: u64,
    /// The raw code word.
    pub code: u32,
    /// Classification path, coarsest level first.
    pub kind: KindPath,
    /// False for architecturally unallocated or reserved encodings.
    pub valid: bool,
    /// 64-bit operand size (the sf bit, where the encoding carries one).
    pub sf: bool,
    /// Destination register slot. Stores record the address base register
    /// here and the value register(s) as sources: the immediate-offset
    /// pattern predicate depends on this convention.
    pub dest: Option<Register>,
    /// Second destination slot, used only by paired loads.
    pub dest2: Option<Register>,
    /// Source registers in operand order (0–3 entries).
    pub sources: Vec<Register>,
    /// Decoded immediate, fully extended with any implied shift applied.
    pub imm: Option<i64>,
    /// Precomputed absolute result when derivable without external state
    /// (PC-relative address formation, known-constant writes).
    pub result: Option<u64>,
    /// Absolute target of direct branch, compare-and-branch, and
    /// test-and-branch forms.
    pub label: Option<u64>,
    /// Control-transfer classification.
    pub branch: BranchKind,
    /// Condition code for conditional branches and selects.
    pub cond: Option<Condition>,
    /// Shift descriptor where the form carries one.
    pub shift: Option<ShiftKind>,
    /// Extend descriptor where the form carries one.
    pub extend: Option<ExtendKind>,
    /// Base-register writeback (pre/post-indexed addressing).
    pub wback: bool,
    /// Writeback happens after the access.
    pub postindex: bool,
}

impl Instruction {
    /// An empty record for the word at `address`; the decoder fills it in.
    pub(crate) fn empty(address: u64, code: u32) -> Self {
        Self {
            address,
            code,
            kind: KindPath::default(),
            valid: true,
            sf: false,
            dest: None,
            dest2: None,
            sources: Vec::new(),
            imm: None,
            result: None,
            label: None,
            branch: BranchKind::None,
            cond: None,
            shift: None,
            extend: None,
            wback: false,
            postindex: false,
        }
    }

    /// A record for an address whose word could not be read. Never parsed,
    /// so traversal treats it as a terminal node.
    pub fn unreadable(address: u64) -> Self {
        Self::empty(address, 0)
    }

    /// True when classification reached the mnemonic level.
    pub fn parsed(&self) -> bool {
        self.kind.complete()
    }

    /// PC-relative address formation (ADR / ADRP).
    pub fn is_pc_rel_adr(&self) -> bool {
        self.kind.group == Some(Group::PcRelAddressing)
    }

    /// Immediate add/subtract form (including its aliases).
    pub fn is_add_sub_imm(&self) -> bool {
        self.kind.group == Some(Group::AddSubImmediate)
    }

    /// Any load or store family encoding.
    pub fn is_load_or_store(&self) -> bool {
        self.kind.family == Some(crate::Family::LoadStore)
    }

    /// A decoded load mnemonic.
    pub fn is_load(&self) -> bool {
        matches!(
            self.kind.mnemonic,
            Some(
                Mnemonic::Ldr
                    | Mnemonic::Ldrb
                    | Mnemonic::Ldrh
                    | Mnemonic::Ldrsb
                    | Mnemonic::Ldrsh
                    | Mnemonic::Ldrsw
                    | Mnemonic::Ldp
                    | Mnemonic::Ldpsw
            )
        )
    }

    /// A decoded store mnemonic.
    pub fn is_store(&self) -> bool {
        matches!(
            self.kind.mnemonic,
            Some(Mnemonic::Str | Mnemonic::Strb | Mnemonic::Strh | Mnemonic::Stp | Mnemonic::Stgp)
        )
    }

    /// True if this instruction adds its immediate to `reg`: an immediate
    /// add/subtract on `reg`, a load based on `reg`, or a store whose
    /// address base is `reg`.
    pub fn has_imm_offset_on(&self, reg: u8) -> bool {
        if self.imm.is_none() || !(self.is_load_or_store() || self.is_add_sub_imm()) {
            return false;
        }
        if self.is_store() {
            self.dest.is_some_and(|d| d.index() == reg)
                || self.dest2.is_some_and(|d| d.index() == reg)
        } else {
            self.sources.iter().any(|s| s.index() == reg)
        }
    }

    /// Direct or indirect call.
    pub fn is_call(&self) -> bool {
        matches!(self.branch, BranchKind::DirectCall | BranchKind::IndirectCall)
    }

    /// Function return.
    pub fn is_return(&self) -> bool {
        self.branch == BranchKind::Return
    }

    /// Direct branch or direct call (resolved `label`).
    pub fn is_direct_branch(&self) -> bool {
        matches!(self.branch, BranchKind::Direct | BranchKind::DirectCall)
    }

    /// A branch with no fall-through edge: unconditional direct B, or any
    /// non-linking indirect branch.
    pub fn is_unconditional_branch(&self) -> bool {
        self.kind.mnemonic == Some(Mnemonic::B) || self.branch == BranchKind::Indirect
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(label) = self.kind.deepest() else {
            return f.write_str("unparsable");
        };
        write!(f, "\"{label}\"")?;
        if !self.parsed() {
            write!(f, " (partially decoded)")?;
        }
        if !self.valid {
            return write!(f, ", marked invalid");
        }
        if let Some(d) = self.dest {
            write!(f, ", dest: {d}")?;
        }
        if let Some(d2) = self.dest2 {
            write!(f, ", dest2: {d2}")?;
        }
        if let Some(imm) = self.imm {
            write!(f, ", imm: {}", Hex(imm))?;
        }
        if let Some(target) = self.label {
            write!(f, ", label: {target:#x}")?;
        }
        if self.branch != BranchKind::None {
            write!(f, ", branch: {}", self.branch)?;
        }
        if let Some(cond) = self.cond {
            write!(f, ", cond: {cond}")?;
        }
        if self.sources.is_empty() {
            if let Some(result) = self.result {
                write!(f, ", result: {result:#x}")?;
            }
        } else {
            write!(f, ", sources: ")?;
            for (i, s) in self.sources.iter().enumerate() {
                if i != 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{s}")?;
            }
        }
        Ok(())
    }
}

/// Signed hexadecimal rendering (`-0x20` rather than a 16-digit two's
/// complement value).
struct Hex(i64);

impl fmt::Display for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 0 {
            write!(f, "-{:#x}", self.0.unsigned_abs())
        } else {
            write!(f, "{:#x}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode_word;

    #[test]
    fn test_unreadable_is_terminal() {
        let inst = Instruction::unreadable(0x1000);
        assert!(!inst.parsed());
        assert!(inst.valid);
    }

    #[test]
    fn test_imm_offset_predicate_on_load() {
        // ldr x0, [x1, #16]
        let inst = decode_word(0xF9400820, 0x1000);
        assert!(inst.has_imm_offset_on(1));
        assert!(!inst.has_imm_offset_on(0));
    }

    #[test]
    fn test_imm_offset_predicate_on_store() {
        // str x0, [sp, #8]: the base register sits in the dest slot.
        let inst = decode_word(0xF90007E0, 0x1000);
        assert!(inst.has_imm_offset_on(31));
        assert!(!inst.has_imm_offset_on(0));
    }

    #[test]
    fn test_imm_offset_predicate_rejects_non_additive() {
        // mov x0, x1 carries an imm6 of zero but is not an additive form.
        let inst = decode_word(0xAA0103E0, 0x1000);
        assert!(!inst.has_imm_offset_on(1));
    }

    #[test]
    fn test_display_negative_imm() {
        // sub x0, x1, #0x20
        let inst = decode_word(0xD1008020, 0x1000);
        let text = inst.to_string();
        assert!(text.contains("imm: -0x20"), "{text}");
    }
}
