//! `analyze`: walk a function and report call targets with their
//! dependency snapshots.

use tracing::info;

use a64probe_flow::{AnalyzerConfig, MergePolicy, analyze_function};
use a64probe_image::CodeImage;

pub fn run(image: &CodeImage, entry: u64, merge_policy: MergePolicy) -> Result<(), String> {
    let config = AnalyzerConfig { merge_policy };
    let analysis = analyze_function(image, entry, config).map_err(|e| e.to_string())?;

    info!(
        "expanded {} nodes from {entry:#x}, {} call candidates",
        analysis.expansions,
        analysis.candidates.len()
    );
    for candidate in &analysis.candidates {
        let offset = image.offset_of(candidate.address).unwrap_or(candidate.address);
        println!(
            "{:#010x} (+{offset:#x}): {}",
            candidate.address, candidate.deps
        );
    }
    Ok(())
}
