//! `find-call`: locate the Nth direct call and print its target.

use a64probe_flow::{ImageSource, find_nth_call};
use a64probe_image::CodeImage;

pub fn run(
    image: &CodeImage,
    start: u64,
    nth: u32,
    rets: Option<u32>,
    bytes: u64,
    include_indirect: bool,
) -> Result<(), String> {
    let source = ImageSource::new(image);
    let target = find_nth_call(&source, start, nth, rets, bytes, include_indirect)
        .map_err(|e| e.to_string())?;
    let offset = image.offset_of(target).unwrap_or(target);
    println!("{target:#010x} (+{offset:#x})");
    Ok(())
}
