//! `decode`: print instruction records for a range of words.

use a64probe_image::CodeImage;
use a64probe_isa::{WORD_BYTES, decode_word};

pub fn run(image: &CodeImage, addr: u64, count: u32) -> Result<(), String> {
    for i in 0..u64::from(count) {
        let at = addr + i * WORD_BYTES;
        let Some(word) = image.read_word(at) else {
            return Err(format!("address {at:#x} is not mapped (or unaligned)"));
        };
        let inst = decode_word(word, at);
        let offset = image.offset_of(at).unwrap_or(at);
        print!("{at:#010x} (+{offset:#x}): {word:#010x}  {inst}");
        match inst.label.and_then(|l| image.offset_of(l)) {
            Some(label_offset) => println!(" [label +{label_offset:#x}]"),
            None => println!(),
        }
    }
    Ok(())
}
