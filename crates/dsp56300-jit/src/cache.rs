//! Dense, PC-indexed block cache with invalidation.

use std::collections::HashSet;
use std::rc::Rc;

use log::{debug, trace};

use crate::block::Block;
use crate::types::TWord;

/// Maps guest PC to the block that covers it. A single compiled block
/// covers a contiguous PC range, so every PC in that range holds a
/// reference to the same block (invariant 4 in the data model); only the
/// slot at `pc_first` is "canonical" in the sense that `BlockCache::insert`
/// derives the range from it, but all slots are otherwise equivalent.
pub struct BlockCache {
    slots: Vec<Option<Rc<Block>>>,
    /// PCs the embedder has declared never cacheable (e.g. I/O-mapped
    /// P-memory overlays). Any block covering one of these is invalidated
    /// whenever it is read as an instruction fetch, so such PCs are in
    /// practice never resident in `slots`.
    volatile: HashSet<TWord>,
}

impl BlockCache {
    #[must_use]
    pub fn new(p_mem_size: usize) -> Self {
        Self { slots: vec![None; p_mem_size], volatile: HashSet::new() }
    }

    #[must_use]
    pub fn volatile_pcs(&self) -> &HashSet<TWord> {
        &self.volatile
    }

    pub fn set_volatile(&mut self, pcs: impl IntoIterator<Item = TWord>) {
        self.volatile = pcs.into_iter().collect();
    }

    /// O(1) lookup: a fetch at `pc` either hits a cached block or misses.
    /// Volatile PCs always miss, forcing retranslation (and, per the
    /// invalidation protocol, a subsequent invalidation of any block that
    /// was, against policy, ever cached over them).
    #[must_use]
    pub fn lookup(&self, pc: TWord) -> Option<&Rc<Block>> {
        if self.volatile.contains(&pc) {
            return None;
        }
        self.slots.get(pc as usize).and_then(Option::as_ref)
    }

    /// Install `block` at every PC in its covered range.
    pub fn insert(&mut self, block: Rc<Block>) {
        let first = block.pc_first as usize;
        let len = block.p_mem_size as usize;
        debug!(
            "cache: installing block pc_first=0x{:06x} len={} insn_count={}",
            block.pc_first, len, block.encoded_instruction_count
        );
        for pc in first..first + len {
            if let Some(slot) = self.slots.get_mut(pc) {
                *slot = Some(Rc::clone(&block));
            }
        }
    }

    /// Invalidate whatever block (if any) covers `pc`, clearing every slot
    /// in that block's range. Conservative by design (Open Question 3):
    /// a multi-cell opcode whose extension word is overwritten invalidates
    /// the entire block, not just the written cell.
    pub fn invalidate(&mut self, pc: TWord) {
        let Some(block) = self.lookup(pc).cloned() else { return };
        trace!("cache: invalidating block pc_first=0x{:06x} (write at 0x{:06x})", block.pc_first, pc);
        let first = block.pc_first as usize;
        let len = block.p_mem_size as usize;
        for slot_pc in first..first + len {
            if let Some(slot) = self.slots.get_mut(slot_pc) {
                *slot = None;
            }
        }
    }

    /// Invalidate every cached block. Used on arena exhaustion and explicit
    /// `clear_opcode_cache()` calls.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }
}
