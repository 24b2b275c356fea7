//! Per-path register dependency tracking.

use std::fmt;
use std::fmt::Write as _;

use a64probe_isa::{Instruction, NUM_REGS, Register, reg_name};

/// A set of register indices as a 32-bit mask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegSet(u32);

impl RegSet {
    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// A set holding only `reg`.
    pub const fn single(reg: u8) -> Self {
        Self(1 << (reg & 0x1F))
    }

    /// Membership test.
    pub const fn contains(self, reg: u8) -> bool {
        self.0 & (1 << (reg & 0x1F)) != 0
    }

    /// Set union.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// True if no register is in the set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of registers in the set.
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Iterate the members in ascending index order.
    pub fn iter(self) -> impl Iterator<Item = u8> {
        (0..NUM_REGS as u8).filter(move |&r| self.contains(r))
    }
}

/// Maps every register to the set of entry-time registers that
/// transitively feed its current value along one execution path.
///
/// The map is path-local state: each worklist entry carries its own
/// snapshot, copied on every control-flow split.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DependencyMap {
    deps: [RegSet; NUM_REGS],
}

impl Default for DependencyMap {
    fn default() -> Self {
        Self::identity()
    }
}

impl DependencyMap {
    /// The entry-state map: every register depends only on itself.
    pub fn identity() -> Self {
        let mut deps = [RegSet::empty(); NUM_REGS];
        for (i, slot) in deps.iter_mut().enumerate() {
            *slot = RegSet::single(i as u8);
        }
        Self { deps }
    }

    /// The dependency set currently recorded for `reg`.
    pub fn get(&self, reg: u8) -> RegSet {
        self.deps[(reg & 0x1F) as usize]
    }

    /// Apply one instruction's transfer: each destination's new set is the
    /// union of its sources' sets, and a destination written with no
    /// tracked sources (a constant producer) depends only on itself.
    pub fn apply(&mut self, inst: &Instruction) {
        if let Some(dest) = inst.dest {
            self.write(dest, &inst.sources);
        }
        if let Some(dest2) = inst.dest2 {
            self.write(dest2, &inst.sources);
        }
    }

    fn write(&mut self, dest: Register, sources: &[Register]) {
        let new = if sources.is_empty() {
            RegSet::single(dest.index())
        } else {
            sources
                .iter()
                .fold(RegSet::empty(), |acc, s| acc.union(self.get(s.index())))
        };
        self.deps[dest.index() as usize] = new;
    }

    /// Union `other` into `self` register by register. Returns true if any
    /// set grew, which drives re-enqueueing under the union merge policy.
    pub fn merge(&mut self, other: &Self) -> bool {
        let mut changed = false;
        for (mine, theirs) in self.deps.iter_mut().zip(&other.deps) {
            let merged = mine.union(*theirs);
            if merged != *mine {
                *mine = merged;
                changed = true;
            }
        }
        changed
    }

    /// True if `reg` depends on exactly itself.
    pub fn only_self(&self, reg: u8) -> bool {
        let deps = self.get(reg);
        deps.len() == 1 && deps.contains(reg)
    }
}

impl fmt::Display for DependencyMap {
    /// One-line summary: a 32-cell grid (blank = no dependencies, `O` =
    /// self only, `>` = listed on the right), then the non-trivial sets.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{self deps: [")?;
        for reg in 0..NUM_REGS as u8 {
            if reg != 0 && reg % 8 == 0 {
                f.write_char('|')?;
            }
            let cell = if self.get(reg).is_empty() {
                ' '
            } else if self.only_self(reg) {
                'O'
            } else {
                '>'
            };
            f.write_char(cell)?;
        }
        f.write_str("]")?;
        for reg in 0..NUM_REGS as u8 {
            if self.only_self(reg) || self.get(reg).is_empty() {
                continue;
            }
            write!(f, "; {} deps: ", reg_name(reg))?;
            for (i, dep) in self.get(reg).iter().enumerate() {
                if i != 0 {
                    f.write_str(", ")?;
                }
                f.write_str(&reg_name(dep))?;
            }
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a64probe_isa::decode_word;

    #[test]
    fn test_identity() {
        let map = DependencyMap::identity();
        for reg in 0..32 {
            assert!(map.only_self(reg));
        }
    }

    #[test]
    fn test_transfer_unions_sources() {
        // add x0, x1, x2: x0's new set is deps(x1) ∪ deps(x2).
        let mut map = DependencyMap::identity();
        map.apply(&decode_word(0x8B020020, 0x1000));
        let deps = map.get(0);
        assert_eq!(deps.len(), 2);
        assert!(deps.contains(1) && deps.contains(2));
    }

    #[test]
    fn test_transfer_chains() {
        let mut map = DependencyMap::identity();
        map.apply(&decode_word(0xAA0103E0, 0x1000)); // mov x0, x1
        map.apply(&decode_word(0x8B000040, 0x1004)); // add x0, x2, x0
        let deps = map.get(0);
        assert!(deps.contains(1) && deps.contains(2));
        assert!(!deps.contains(0));
    }

    #[test]
    fn test_constant_write_is_self_dependency() {
        // mov x2, #5: no sources, so x2 depends only on itself.
        let mut map = DependencyMap::identity();
        map.apply(&decode_word(0xAA0103E2, 0x1000)); // mov x2, x1 first
        assert!(!map.only_self(2));
        map.apply(&decode_word(0xD28000A2, 0x1004)); // mov x2, #5
        assert!(map.only_self(2));
    }

    #[test]
    fn test_paired_load_writes_both_destinations() {
        // ldp x29, x30, [sp], #16: both destinations take deps(sp).
        let mut map = DependencyMap::identity();
        map.apply(&decode_word(0xA8C17BFD, 0x1000));
        assert!(map.get(29).contains(31));
        assert!(map.get(30).contains(31));
    }

    #[test]
    fn test_merge_reports_growth() {
        let mut a = DependencyMap::identity();
        let mut b = DependencyMap::identity();
        b.apply(&decode_word(0xAA0103E0, 0x1000)); // mov x0, x1
        assert!(a.merge(&b));
        assert!(a.get(0).contains(0) && a.get(0).contains(1));
        assert!(!a.merge(&b));
    }

    #[test]
    fn test_summary_rendering() {
        let mut map = DependencyMap::identity();
        map.apply(&decode_word(0xAA0103E0, 0x1000)); // mov x0, x1
        let text = map.to_string();
        assert!(text.starts_with("{self deps: [>OOOOOOO|"), "{text}");
        assert!(text.contains("x0 deps: x1"), "{text}");
    }
}
