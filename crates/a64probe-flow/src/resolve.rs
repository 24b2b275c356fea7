//! Absolute-address resolution for PC-relative idioms.

use tracing::debug;

use a64probe_image::CodeImage;
use a64probe_isa::Instruction;

use crate::{
    DEFAULT_SCAN_BYTES, FlowError, ImageSource, Result, find_nth_imm_offset_on_reg,
    find_nth_pc_rel_adr,
};

/// Compose a PC-relative address formation (ADR / ADRP) with a following
/// immediate-offset instruction into one absolute address.
///
/// Returns `None` unless `adr` is a PC-rel. form with a computed result
/// and `offset` carries a decoded immediate.
pub fn resolve_pc_relative(adr: &Instruction, offset: &Instruction) -> Option<u64> {
    if !adr.is_pc_rel_adr() {
        return None;
    }
    let base = adr.result?;
    let imm = offset.imm?;
    let resolved = base.wrapping_add_signed(imm);
    debug!(
        base = format_args!("{base:#x}"),
        imm = format_args!("{imm:#x}"),
        resolved = format_args!("{resolved:#x}"),
        "resolved pc-relative address"
    );
    Some(resolved)
}

/// Evaluate a PC-relative switch table: read the signed 32-bit entry for
/// `case_index` and add it to the table's own base address.
///
/// Table entries are byte offsets relative to `table_base`, not to any
/// instruction, and case numbering is 1-based to match the calling
/// convention at the jump site. A `case_index` of 0 or below is caller
/// error and is not validated here.
pub fn evaluate_switch(image: &CodeImage, table_base: u64, case_index: u32) -> Result<u64> {
    let entry_addr = table_base + u64::from(case_index - 1) * 4;
    let entry = image
        .read_i32(entry_addr)
        .ok_or(FlowError::SwitchEntryUnmapped { address: entry_addr })?;
    let target = table_base.wrapping_add_signed(i64::from(entry));
    debug!(
        table = format_args!("{table_base:#x}"),
        case = case_index,
        entry,
        target = format_args!("{target:#x}"),
        "evaluated switch table entry"
    );
    Ok(target)
}

/// Scan from `start` for the `pc_rel_n`th ADR/ADRP, then for the
/// `offset_n`th immediate-offset instruction on its destination register,
/// and resolve the pair to an absolute address.
pub fn extract_address(
    image: &CodeImage,
    start: u64,
    pc_rel_n: u32,
    offset_n: u32,
) -> Result<u64> {
    let source = ImageSource::new(image);
    let adr = find_nth_pc_rel_adr(&source, start, pc_rel_n, None, DEFAULT_SCAN_BYTES)?;
    let Some(dest) = adr.dest else {
        return Err(FlowError::MissingImmediate { address: adr.address });
    };
    let offset = find_nth_imm_offset_on_reg(
        &source,
        adr.address,
        offset_n,
        dest.index(),
        None,
        DEFAULT_SCAN_BYTES,
    )?;
    resolve_pc_relative(&adr, &offset)
        .ok_or(FlowError::MissingImmediate { address: offset.address })
}

/// Locate a switch table through [`extract_address`] and evaluate one case.
pub fn evaluate_switch_at(
    image: &CodeImage,
    start: u64,
    pc_rel_n: u32,
    offset_n: u32,
    case_index: u32,
) -> Result<u64> {
    let table_base = extract_address(image, start, pc_rel_n, offset_n)?;
    evaluate_switch(image, table_base, case_index)
}
