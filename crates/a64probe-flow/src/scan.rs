//! Linear pattern scan over a decoded instruction stream.
//!
//! The scanner is used at patch-authoring time to locate addresses baked
//! into a binary. An unmet expectation means the target binary changed and
//! any returned address would be silently wrong, so every contract
//! violation is a hard, descriptive error rather than a fallback.

use thiserror::Error;

use a64probe_image::CodeImage;
use a64probe_isa::{Instruction, Mnemonic, WORD_BYTES, decode_word};

/// Scan failures. All of these are the fatal tier: callers report them and
/// stop rather than continuing with a guessed address.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error(
        "could not find match {wanted} from {start:#x}: ran out of the return budget of {budget}"
    )]
    ReturnBudgetExhausted { wanted: u32, start: u64, budget: u32 },
    #[error(
        "match {wanted} from {start:#x} was a {kind} at {address:#x}, which carries no usable value"
    )]
    SkippedFinalMatch {
        wanted: u32,
        start: u64,
        kind: String,
        address: u64,
    },
    #[error("could not find match {wanted} from {start:#x} within {budget} bytes")]
    BudgetExhausted { wanted: u32, start: u64, budget: u64 },
}

/// Default byte budget for pattern scans.
pub const DEFAULT_SCAN_BYTES: u64 = 4096;

/// A linear source of decoded instructions.
///
/// The built-in implementation decodes through [`CodeImage`]; an external
/// linear disassembler can stand in behind the same trait.
pub trait InstructionSource {
    /// Decode the instruction at `addr`, or `None` if the word is
    /// unreadable.
    fn instruction_at(&self, addr: u64) -> Option<Instruction>;
}

/// [`InstructionSource`] backed by the crate's own decoder.
pub struct ImageSource<'a> {
    image: &'a CodeImage,
}

impl<'a> ImageSource<'a> {
    pub fn new(image: &'a CodeImage) -> Self {
        Self { image }
    }
}

impl InstructionSource for ImageSource<'_> {
    fn instruction_at(&self, addr: u64) -> Option<Instruction> {
        self.image.read_word(addr).map(|word| decode_word(word, addr))
    }
}

/// Decode forward from `start` and return the value of the `n`th
/// instruction accepted by `matcher`.
///
/// - `matcher` yields the value associated with a match; `skipper` marks
///   instructions that count against the same `n` but carry no usable
///   value — landing on one as the final match is an error.
/// - A return instruction decrements `ret_budget` (`None` = unlimited) and
///   fails once the budget is already zero: the caller asked for more
///   matches than exist before the function ends.
/// - Words that fail to decode, or that only classify coarsely, are
///   advanced over silently at the fixed instruction width.
/// - Exhausting `byte_budget` fails with the requested count and start
///   address.
pub fn find_nth<T>(
    source: &impl InstructionSource,
    start: u64,
    n: u32,
    ret_budget: Option<u32>,
    byte_budget: u64,
    matcher: impl Fn(&Instruction) -> Option<T>,
    skipper: impl Fn(&Instruction) -> bool,
) -> Result<T, ScanError> {
    debug_assert!(n >= 1, "match counts are 1-based");
    let mut remaining = n;
    let mut rets_left = ret_budget;
    let mut addr = start;
    let mut budget = byte_budget;

    while budget >= WORD_BYTES {
        let decoded = source.instruction_at(addr);
        let inst_addr = addr;
        addr += WORD_BYTES;
        budget -= WORD_BYTES;

        let Some(inst) = decoded else { continue };
        if !inst.parsed() || !inst.valid {
            continue;
        }

        if inst.is_return() {
            match &mut rets_left {
                Some(0) => {
                    return Err(ScanError::ReturnBudgetExhausted {
                        wanted: n,
                        start,
                        budget: ret_budget.unwrap_or(0),
                    });
                }
                Some(left) => *left -= 1,
                None => {}
            }
        } else if let Some(value) = matcher(&inst) {
            if remaining == 1 {
                return Ok(value);
            }
            remaining -= 1;
        } else if skipper(&inst) {
            if remaining == 1 {
                return Err(ScanError::SkippedFinalMatch {
                    wanted: n,
                    start,
                    kind: inst.kind.deepest().unwrap_or_else(|| "unknown".into()),
                    address: inst_addr,
                });
            }
            remaining -= 1;
        }
    }

    Err(ScanError::BudgetExhausted {
        wanted: n,
        start,
        budget: byte_budget,
    })
}

/// Resolved target of the `n`th direct call (BL). With `include_indirect`,
/// indirect calls (BLR) count against `n` as skips, since they carry no
/// static destination.
pub fn find_nth_call(
    source: &impl InstructionSource,
    start: u64,
    n: u32,
    ret_budget: Option<u32>,
    byte_budget: u64,
    include_indirect: bool,
) -> Result<u64, ScanError> {
    find_nth(
        source,
        start,
        n,
        ret_budget,
        byte_budget,
        |inst| {
            if inst.kind.mnemonic == Some(Mnemonic::Bl) {
                inst.label
            } else {
                None
            }
        },
        move |inst| include_indirect && inst.kind.mnemonic == Some(Mnemonic::Blr),
    )
}

/// Resolved target of the `n`th direct branch without link (B). With
/// `include_indirect`, BR counts as a skip.
pub fn find_nth_direct_branch(
    source: &impl InstructionSource,
    start: u64,
    n: u32,
    ret_budget: Option<u32>,
    byte_budget: u64,
    include_indirect: bool,
) -> Result<u64, ScanError> {
    find_nth(
        source,
        start,
        n,
        ret_budget,
        byte_budget,
        |inst| {
            if inst.kind.mnemonic == Some(Mnemonic::B) {
                inst.label
            } else {
                None
            }
        },
        move |inst| include_indirect && inst.kind.mnemonic == Some(Mnemonic::Br),
    )
}

/// The `n`th PC-relative address formation (ADR / ADRP), as a full record.
pub fn find_nth_pc_rel_adr(
    source: &impl InstructionSource,
    start: u64,
    n: u32,
    ret_budget: Option<u32>,
    byte_budget: u64,
) -> Result<Instruction, ScanError> {
    find_nth(
        source,
        start,
        n,
        ret_budget,
        byte_budget,
        |inst| {
            if inst.is_pc_rel_adr() {
                Some(inst.clone())
            } else {
                None
            }
        },
        |_| false,
    )
}

/// The `n`th instruction that adds an immediate to `reg` (immediate
/// add/subtract, or a load/store based on `reg`), as a full record.
pub fn find_nth_imm_offset_on_reg(
    source: &impl InstructionSource,
    start: u64,
    n: u32,
    reg: u8,
    ret_budget: Option<u32>,
    byte_budget: u64,
) -> Result<Instruction, ScanError> {
    find_nth(
        source,
        start,
        n,
        ret_budget,
        byte_budget,
        move |inst| {
            if inst.has_imm_offset_on(reg) {
                Some(inst.clone())
            } else {
                None
            }
        },
        |_| false,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use a64probe_image::CodeImage;

    const NOP_LIKE: u32 = 0xAA0103E0; // mov x0, x1
    const BL_PLUS_8: u32 = 0x94000002;
    const BLR_X8: u32 = 0xD63F0100;
    const RET: u32 = 0xD65F03C0;

    fn source_of(words: &[u32], base: u64) -> CodeImage {
        CodeImage::from_words(base, words)
    }

    #[test]
    fn test_second_call_in_window() {
        // A 16-instruction window holding exactly two calls and no returns.
        let mut words = vec![NOP_LIKE; 16];
        words[3] = BL_PLUS_8; // at 0x100c -> target 0x1014
        words[9] = BL_PLUS_8; // at 0x1024 -> target 0x102c
        let image = source_of(&words, 0x1000);
        let source = ImageSource::new(&image);

        let target = find_nth_call(&source, 0x1000, 2, None, 64, false).unwrap();
        assert_eq!(target, 0x102C);
    }

    #[test]
    fn test_third_call_fails_fast() {
        let mut words = vec![NOP_LIKE; 16];
        words[3] = BL_PLUS_8;
        words[9] = BL_PLUS_8;
        let image = source_of(&words, 0x1000);
        let source = ImageSource::new(&image);

        let err = find_nth_call(&source, 0x1000, 3, None, 64, false).unwrap_err();
        assert!(matches!(
            err,
            ScanError::BudgetExhausted {
                wanted: 3,
                start: 0x1000,
                budget: 64
            }
        ));
    }

    #[test]
    fn test_byte_budget_smaller_than_distance() {
        let mut words = vec![NOP_LIKE; 16];
        words[9] = BL_PLUS_8;
        let image = source_of(&words, 0x1000);
        let source = ImageSource::new(&image);

        // The only call sits 36 bytes in; a 16-byte budget must fail.
        let err = find_nth_call(&source, 0x1000, 1, None, 16, false).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("match 1"), "{text}");
        assert!(text.contains("0x1000"), "{text}");
        assert!(text.contains("16 bytes"), "{text}");
    }

    #[test]
    fn test_return_budget() {
        let words = [BL_PLUS_8, RET, BL_PLUS_8, RET];
        let image = source_of(&words, 0x1000);
        let source = ImageSource::new(&image);

        // With one allowed return the second call is reachable.
        assert!(find_nth_call(&source, 0x1000, 2, Some(1), 64, false).is_ok());
        // With none, the scan dies at the first RET.
        let err = find_nth_call(&source, 0x1000, 2, Some(0), 64, false).unwrap_err();
        assert!(matches!(err, ScanError::ReturnBudgetExhausted { .. }));
    }

    #[test]
    fn test_skip_match_in_final_position() {
        let words = [BLR_X8, BL_PLUS_8];
        let image = source_of(&words, 0x1000);
        let source = ImageSource::new(&image);

        // Counting indirect calls, the first "call" is the BLR: no target.
        let err = find_nth_call(&source, 0x1000, 1, None, 64, true).unwrap_err();
        assert!(matches!(
            err,
            ScanError::SkippedFinalMatch { address: 0x1000, .. }
        ));
        // The second is the BL and resolves.
        assert_eq!(
            find_nth_call(&source, 0x1000, 2, None, 64, true).unwrap(),
            0x100C
        );
    }

    #[test]
    fn test_undecodable_words_are_stepped_over() {
        // An unallocated word sits between the start and the call.
        let words = [0x0000_0000, BL_PLUS_8];
        let image = source_of(&words, 0x1000);
        let source = ImageSource::new(&image);
        assert_eq!(
            find_nth_call(&source, 0x1000, 1, None, 64, false).unwrap(),
            0x100C
        );
    }

    #[test]
    fn test_find_pc_rel_and_offset_pair() {
        // 0x4000: adrp x0, #0x1000 ; 0x4004: add x0, x0, #0x20
        let words = [0xB0000000, 0x91008000, RET];
        let image = source_of(&words, 0x4000);
        let source = ImageSource::new(&image);

        let adr = find_nth_pc_rel_adr(&source, 0x4000, 1, None, 64).unwrap();
        assert_eq!(adr.result, Some(0x5000));
        let rd = adr.dest.unwrap().index();
        let off = find_nth_imm_offset_on_reg(&source, adr.address, 1, rd, None, 64).unwrap();
        assert_eq!(off.imm, Some(0x20));
    }
}
