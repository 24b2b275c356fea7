//! End-to-end analysis over a small hand-assembled function.

use a64probe_flow::{
    AnalyzerConfig, MergePolicy, analyze_function, evaluate_switch_at, extract_address,
};
use a64probe_image::CodeImage;

/// A function that saves its frame, conditions on x0, calls two helpers,
/// and loops once:
///
/// ```text
/// 0x10000: stp x29, x30, [sp, #-16]!
/// 0x10004: mov x19, x0
/// 0x10008: cbz x19, 0x1001c
/// 0x1000c: bl 0x10030            ; helper_a(x19 path)
/// 0x10010: subs x19, x19, #1
/// 0x10014: b.ne 0x1000c
/// 0x10018: b 0x10020
/// 0x1001c: bl 0x10038            ; helper_b
/// 0x10020: ldp x29, x30, [sp], #16
/// 0x10024: ret
/// 0x10030: ret                   ; helper_a
/// 0x10038: ret                   ; helper_b
/// ```
fn sample_function() -> CodeImage {
    let mut image = CodeImage::from_words(
        0x10000,
        &[
            0xA9BF7BFD, // stp x29, x30, [sp, #-16]!
            0xAA0003F3, // mov x19, x0
            0xB40000B3, // cbz x19, 0x1001c
            0x94000009, // bl 0x10030
            0xF1000673, // subs x19, x19, #1
            0x54FFFFC1, // b.ne 0x1000c
            0x14000002, // b 0x10020
            0x94000007, // bl 0x10038
            0xA8C17BFD, // ldp x29, x30, [sp], #16
            0xD65F03C0, // ret
        ],
    );
    image.add_segment(0x10030, 0xD65F03C0u32.to_le_bytes().to_vec()).unwrap();
    image.add_segment(0x10038, 0xD65F03C0u32.to_le_bytes().to_vec()).unwrap();
    image
}

#[test]
fn test_discovers_both_helpers() {
    let image = sample_function();
    let analysis = analyze_function(&image, 0x10000, AnalyzerConfig::default()).unwrap();

    let mut targets: Vec<u64> = analysis.candidates.iter().map(|c| c.address).collect();
    targets.sort_unstable();
    targets.dedup();
    assert_eq!(targets, vec![0x10030, 0x10038]);
}

#[test]
fn test_call_site_dependencies_flow_from_entry() {
    let image = sample_function();
    let analysis = analyze_function(&image, 0x10000, AnalyzerConfig::default()).unwrap();

    // At the first helper's call site, x19 was loaded from x0.
    let first = analysis
        .candidates
        .iter()
        .find(|c| c.address == 0x10030)
        .unwrap();
    assert!(first.deps.get(19).contains(0));
    assert!(!first.deps.only_self(19));
}

#[test]
fn test_every_address_expanded_once() {
    let image = sample_function();
    let analysis = analyze_function(&image, 0x10000, AnalyzerConfig::default()).unwrap();

    // 10 reachable words in the body plus the two helper entries; nothing
    // is decoded or expanded twice despite the loop and the join.
    assert_eq!(analysis.nodes.len(), analysis.expansions);
    assert_eq!(analysis.expansions, 12);
}

#[test]
fn test_union_policy_terminates_on_loops() {
    let image = sample_function();
    let config = AnalyzerConfig {
        merge_policy: MergePolicy::Union,
    };
    let analysis = analyze_function(&image, 0x10000, config).unwrap();
    let mut targets: Vec<u64> = analysis.candidates.iter().map(|c| c.address).collect();
    targets.sort_unstable();
    targets.dedup();
    assert_eq!(targets, vec![0x10030, 0x10038]);
}

#[test]
fn test_switch_table_resolution_end_to_end() {
    // A jump-table dispatcher: form the table address, then index it.
    //
    // 0x20000: adrp x8, #0        ; page of 0x20000
    // 0x20004: add x8, x8, #0x800 ; table at 0x20800
    // 0x20008: ret
    let mut image = CodeImage::from_words(0x20000, &[0x90000008, 0x91200108, 0xD65F03C0]);
    let mut table = Vec::new();
    table.extend_from_slice(&(-0x7F8i32).to_le_bytes()); // case 1 -> 0x20008
    table.extend_from_slice(&(-0x800i32).to_le_bytes()); // case 2 -> 0x20000
    image.add_segment(0x20800, table).unwrap();

    assert_eq!(extract_address(&image, 0x20000, 1, 1).unwrap(), 0x20800);
    assert_eq!(evaluate_switch_at(&image, 0x20000, 1, 1, 1).unwrap(), 0x20008);
    assert_eq!(evaluate_switch_at(&image, 0x20000, 1, 1, 2).unwrap(), 0x20000);
}
