//! Worklist traversal with per-path dependency snapshots.

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use a64probe_image::CodeImage;
use a64probe_isa::{Instruction, WORD_BYTES, decode_word};

use crate::{DependencyMap, FlowError, Result};

/// Index of a node inside one traversal's arena.
pub type NodeId = usize;

/// One decoded instruction plus its successor links.
///
/// `taken` is populated only for direct branch forms; `fall_through` is
/// populated unless the instruction is an unconditional direct or indirect
/// branch (or a return, which has no successors at all).
#[derive(Clone, Debug)]
pub struct InstructionNode {
    pub instr: Instruction,
    pub taken: Option<NodeId>,
    pub fall_through: Option<NodeId>,
    /// Dependency snapshot at first arrival (unioned across arrivals under
    /// [`MergePolicy::Union`]).
    pub entry_deps: DependencyMap,
}

/// What to do with the incoming dependency snapshot when a path re-arrives
/// at an already-visited address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MergePolicy {
    /// Keep the first arrival's snapshot and drop the new one. This loses
    /// precision at control-flow merges and is the documented historical
    /// behavior.
    #[default]
    Discard,
    /// Union the incoming snapshot into the node's stored snapshot and
    /// re-expand while the union keeps growing. Terminates: the dependency
    /// lattice is finite.
    Union,
}

/// Traversal configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnalyzerConfig {
    pub merge_policy: MergePolicy,
}

/// A call target discovered during traversal, with the dependency state
/// observed at the call site.
#[derive(Clone, Debug)]
pub struct FunctionCandidate {
    pub address: u64,
    pub deps: DependencyMap,
}

/// Result of one traversal run.
#[derive(Clone, Debug)]
pub struct FunctionAnalysis {
    /// Discovered call targets in discovery order.
    pub candidates: Vec<FunctionCandidate>,
    /// Arena of every node the traversal created, rooted at the entry.
    pub nodes: Vec<InstructionNode>,
    /// Number of node expansions performed.
    pub expansions: usize,
}

/// Per-run traversal state: the node arena, the address memo, the LIFO
/// worklist of (node, snapshot) pairs, and the discovered candidates. One
/// `Traversal` is created per analyzed entry point and owns everything it
/// allocates; nothing survives into other runs.
struct Traversal<'a> {
    image: &'a CodeImage,
    config: AnalyzerConfig,
    nodes: Vec<InstructionNode>,
    memo: FxHashMap<u64, NodeId>,
    worklist: Vec<(NodeId, DependencyMap)>,
    candidates: Vec<FunctionCandidate>,
    expansions: usize,
}

impl<'a> Traversal<'a> {
    fn new(image: &'a CodeImage, config: AnalyzerConfig) -> Self {
        Self {
            image,
            config,
            nodes: Vec::new(),
            memo: FxHashMap::default(),
            worklist: Vec::new(),
            candidates: Vec::new(),
            expansions: 0,
        }
    }

    /// Return the memoized node for `addr`, decoding and enqueueing it
    /// (with a copy of `deps`) only on first encounter.
    fn find_or_create(&mut self, addr: u64, deps: &DependencyMap) -> NodeId {
        if let Some(&id) = self.memo.get(&addr) {
            match self.config.merge_policy {
                MergePolicy::Discard => {
                    trace!(addr = format_args!("{addr:#x}"), "revisit: snapshot discarded");
                }
                MergePolicy::Union => {
                    if self.nodes[id].entry_deps.merge(deps) {
                        let merged = self.nodes[id].entry_deps.clone();
                        trace!(addr = format_args!("{addr:#x}"), "revisit: snapshot grew, re-expanding");
                        self.worklist.push((id, merged));
                    }
                }
            }
            return id;
        }

        let instr = self.image.read_word(addr).map_or_else(
            || {
                debug!(addr = format_args!("{addr:#x}"), "address not mapped, terminal node");
                Instruction::unreadable(addr)
            },
            |word| decode_word(word, addr),
        );
        let id = self.nodes.len();
        self.nodes.push(InstructionNode {
            instr,
            taken: None,
            fall_through: None,
            entry_deps: deps.clone(),
        });
        self.memo.insert(addr, id);
        self.worklist.push((id, deps.clone()));
        id
    }

    /// Expand one node under the given snapshot: apply the dependency
    /// transfer and link/enqueue its successors.
    fn expand(&mut self, id: NodeId, deps: &mut DependencyMap) -> Result<()> {
        self.expansions += 1;
        let instr = self.nodes[id].instr.clone();
        trace!(
            addr = format_args!("{:#x}", instr.address),
            instr = %instr,
            "expand"
        );

        // Unknown or unallocated encodings end the path.
        if !instr.parsed() || !instr.valid {
            return Ok(());
        }
        if instr.is_return() {
            return Ok(());
        }

        deps.apply(&instr);

        if instr.is_direct_branch() {
            let target = instr
                .label
                .ok_or(FlowError::MissingBranchTarget { address: instr.address })?;
            let taken = self.find_or_create(target, deps);
            self.nodes[id].taken = Some(taken);
            if instr.is_call() {
                self.record_candidate(target, deps);
            }
        }
        if !instr.is_unconditional_branch() {
            let next = self.find_or_create(instr.address + WORD_BYTES, deps);
            self.nodes[id].fall_through = Some(next);
        }
        Ok(())
    }

    fn record_candidate(&mut self, address: u64, deps: &DependencyMap) {
        let exists = self
            .candidates
            .iter()
            .any(|c| c.address == address && c.deps == *deps);
        if !exists {
            debug!(
                addr = format_args!("{address:#x}"),
                "function candidate discovered"
            );
            self.candidates.push(FunctionCandidate {
                address,
                deps: deps.clone(),
            });
        }
    }

    fn run(mut self, entry: u64) -> Result<FunctionAnalysis> {
        let initial = DependencyMap::identity();
        debug!(entry = format_args!("{entry:#x}"), "seeding traversal");
        self.find_or_create(entry, &initial);

        while let Some((id, mut deps)) = self.worklist.pop() {
            self.expand(id, &mut deps)?;
        }

        debug!(
            expansions = self.expansions,
            nodes = self.nodes.len(),
            candidates = self.candidates.len(),
            "traversal complete"
        );
        Ok(FunctionAnalysis {
            candidates: self.candidates,
            nodes: self.nodes,
            expansions: self.expansions,
        })
    }
}

/// Explore the instruction graph from `entry`, tracking register
/// dependencies along each path, and collect every direct call target
/// together with the dependency snapshot observed at its call site.
///
/// Every distinct reachable address is decoded once; under the default
/// [`MergePolicy::Discard`] it is also expanded exactly once.
pub fn analyze_function(
    image: &CodeImage,
    entry: u64,
    config: AnalyzerConfig,
) -> Result<FunctionAnalysis> {
    Traversal::new(image, config).run(entry)
}
