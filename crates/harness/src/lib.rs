//! A minimal `DspCore`/`DspMemory` implementation, existing only to give
//! `dsp56300-jit`'s integration tests a concrete guest to translate and
//! execute code against. Not part of the JIT itself — an embedder in
//! production would plug in its own register file and a memory model
//! backed by whatever peripheral/bus wiring it needs (see
//! `dsp56300_jit::runtime` for the traits this crate implements).

pub mod omf;

use dsp56300_jit::runtime::{DspCore, DspMemory};
use dsp56300_jit::types::{MemArea, TWord};
use dsp56300_jit::{Block, Runtime};

/// Three flat, fixed-size word arrays standing in for the DSP's X/Y/P
/// memory spaces. Sized generously enough for the small translated-block
/// tests this crate supports; real embedders back these with however much
/// memory their target part actually has.
pub struct FlatMemory {
    x: Vec<TWord>,
    y: Vec<TWord>,
    p: Vec<TWord>,
}

impl FlatMemory {
    #[must_use]
    pub fn new(size_words: usize) -> Self {
        Self { x: vec![0; size_words], y: vec![0; size_words], p: vec![0; size_words] }
    }

    fn area_mut(&mut self, area: MemArea) -> &mut Vec<TWord> {
        match area {
            MemArea::X => &mut self.x,
            MemArea::Y => &mut self.y,
            MemArea::P => &mut self.p,
        }
    }
}

impl DspMemory for FlatMemory {
    fn get(&mut self, area: MemArea, addr: TWord) -> TWord {
        self.area_mut(area).get(addr as usize).copied().unwrap_or(0)
    }

    fn set(&mut self, area: MemArea, addr: TWord, value: TWord) {
        if let Some(slot) = self.area_mut(area).get_mut(addr as usize) {
            *slot = value & 0x00FF_FFFF;
        }
    }

    fn bridged_memory_address(&mut self, area: MemArea) -> *mut TWord {
        self.area_mut(area).as_mut_ptr()
    }
}

/// The smallest `DspCore` that can drive a translated block end to end: a
/// register file, backing memory, and the current PC (not part of the
/// `DspCore` trait itself — each embedder tracks it however its own
/// fetch/dispatch loop wants to).
pub struct TestCore {
    regs: dsp56300_jit::regfile::DspRegs,
    memory: FlatMemory,
    pc: TWord,
    /// `AGU M[i]` change notifications the core has observed via `set_m`.
    /// Exposed for tests asserting the writeback replay in
    /// `BlockTranslator::translate`'s epilogue actually ran.
    pub m_write_log: Vec<(usize, TWord)>,
}

impl TestCore {
    #[must_use]
    pub fn new(p_mem_size: usize) -> Self {
        Self {
            regs: dsp56300_jit::regfile::DspRegs::default(),
            memory: FlatMemory::new(p_mem_size),
            pc: 0,
            m_write_log: Vec::new(),
        }
    }

    #[must_use]
    pub const fn pc(&self) -> TWord {
        self.pc
    }

    /// Run one translated block's entry point to completion, returning the
    /// `Runtime` record it left behind (read `next_pc` off it to continue
    /// stepping, or inspect `p_mem_write_address` for self-modification).
    pub fn run(&mut self, block: &Block) -> Runtime {
        let mut rt = Runtime::new();
        unsafe {
            (block.entry)(&mut rt, self.pc, block as *const Block);
        }
        self.pc = rt.next_pc;
        rt
    }
}

impl DspCore for TestCore {
    type Memory = FlatMemory;

    fn regs(&self) -> &dsp56300_jit::regfile::DspRegs {
        &self.regs
    }

    fn regs_mut(&mut self) -> &mut dsp56300_jit::regfile::DspRegs {
        &mut self.regs
    }

    fn memory(&self) -> &Self::Memory {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut Self::Memory {
        &mut self.memory
    }

    fn reset_hw(&mut self) {
        self.regs = dsp56300_jit::regfile::DspRegs::default();
        self.pc = 0;
    }

    fn set_m(&mut self, i: usize, value: TWord) {
        // A real core would re-derive a modulo-addressing lookup table for
        // AGU `i` here; this harness has no modulo addressing model (see
        // move_ops's documented linear-only simplification), so it only
        // records the notification for tests to assert against.
        self.m_write_log.push((i, value));
    }

    fn set_pc(&mut self, pc: TWord) {
        self.pc = pc;
    }

    fn clear_opcode_cache(&mut self) {
        // No cache reference is held here; the embedder's cache lives
        // alongside, not inside, `DspCore` (see BlockTranslator::translate's
        // `cache: &BlockCache` parameter).
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_memory_round_trips_within_bounds() {
        let mut mem = FlatMemory::new(16);
        mem.set(MemArea::X, 3, 0x00AB_CDEF);
        assert_eq!(mem.get(MemArea::X, 3), 0x00AB_CDEF);
        assert_eq!(mem.get(MemArea::Y, 3), 0);
    }

    #[test]
    fn flat_memory_ignores_out_of_bounds_writes() {
        let mut mem = FlatMemory::new(4);
        mem.set(MemArea::P, 100, 1);
        assert_eq!(mem.get(MemArea::P, 100), 0);
    }

    #[test]
    fn reset_hw_clears_registers_and_pc() {
        let mut core = TestCore::new(64);
        core.set_pc(10);
        core.regs_mut().la.0 = 5;
        core.reset_hw();
        assert_eq!(core.pc(), 0);
        assert_eq!(core.regs().la.0, 0);
    }
}
