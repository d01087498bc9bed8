//! External interfaces the JIT consumes, and the per-execution runtime
//! record threaded through the block entry ABI.

use crate::types::{MemArea, TWord};

/// Per-execution reentry record. Every emitted block receives `&mut
/// Runtime` as its first ABI argument and writes these fields before
/// returning; the trampoline (owned by the embedder, not this crate) reads
/// them to decide whether to continue, service an interrupt, or invalidate
/// the cache.
#[derive(Debug, Default, Clone, Copy)]
pub struct Runtime {
    /// PC at which execution resumes after this block returns.
    pub next_pc: TWord,
    /// Instructions retired so far across the lifetime of this `Runtime`.
    pub executed_instruction_count: u64,
    /// Set together whenever a P-memory write occurred during the block.
    pub p_mem_write_address: Option<TWord>,
    pub p_mem_write_value: TWord,
}

impl Runtime {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called by the embedder's trampoline after a block with
    /// `BlockFlags::WRITE_PMEM` returns, before the next fetch.
    pub fn take_pmem_write(&mut self) -> Option<(TWord, TWord)> {
        self.p_mem_write_address.take().map(|addr| (addr, self.p_mem_write_value))
    }
}

/// Bulk guest-memory access, consumed by the memory-access emitter and the
/// runtime helpers it calls into for X/Y/P reads and writes.
///
/// Generalizes `emu_core::Bus`'s byte-oriented interface to the DSP's
/// 24-bit-word-oriented, three-area memory map.
pub trait DspMemory {
    fn get(&mut self, area: MemArea, addr: TWord) -> TWord;
    fn set(&mut self, area: MemArea, addr: TWord, value: TWord);

    /// Base pointer of the area's backing array, for baking a direct
    /// addressing mode into emitted code rather than calling through this
    /// trait on every access (the common case; I/O-mapped ranges still
    /// route through `get`/`set`).
    fn bridged_memory_address(&mut self, area: MemArea) -> *mut TWord;
}

/// The DSP core interface consumed by the JIT (spec.md §6). Implemented by
/// the embedder; the JIT core only ever sees it through this trait.
pub trait DspCore {
    type Memory: DspMemory;

    fn regs(&self) -> &crate::regfile::DspRegs;
    fn regs_mut(&mut self) -> &mut crate::regfile::DspRegs;

    fn memory(&self) -> &Self::Memory;
    fn memory_mut(&mut self) -> &mut Self::Memory;

    /// Hardware reset: registers and PC to power-on state.
    fn reset_hw(&mut self);

    /// Notify the core that AGU `M[i]` changed, so it can re-derive modulo
    /// addressing mode lookup tables for AGU index `i`.
    fn set_m(&mut self, i: usize, value: TWord);

    fn set_pc(&mut self, pc: TWord);

    /// Drop every cached block. Called after self-modifying writes that the
    /// cache's PC-ranged invalidation can't precisely target (e.g. a cold
    /// start or an explicit program reload).
    fn clear_opcode_cache(&mut self);
}
