//! `eval-switch`: resolve a switch table and evaluate one case.

use a64probe_flow::evaluate_switch_at;
use a64probe_image::CodeImage;

pub fn run(
    image: &CodeImage,
    start: u64,
    pc_rel_n: u32,
    offset_n: u32,
    case: u32,
) -> Result<(), String> {
    if case == 0 {
        return Err("switch cases are numbered from 1".into());
    }
    let target = evaluate_switch_at(image, start, pc_rel_n, offset_n, case)
        .map_err(|e| e.to_string())?;
    let offset = image.offset_of(target).unwrap_or(target);
    println!("{target:#010x} (+{offset:#x})");
    Ok(())
}
