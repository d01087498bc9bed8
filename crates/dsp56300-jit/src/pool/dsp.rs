//! The DSP register pool: lazy load/writeback of architectural registers
//! into host registers, layered on the generic LRU `PhysPool`, plus the
//! `Awrite`/`Bwrite` shadow-slot protocol for parallel-move ALU results.
//!
//! Grounded in `JitDspRegPool`/`JitDspRegs` from the reference JIT: the raw
//! pool (`get`/`read`/`write`/`lock`) mirrors `JitDspRegPool`, and the
//! higher-level accessors (`get_alu`, `get_r`, `get_xy`, ...) mirror
//! `JitDspRegs`'s thin wrappers over it. Both layers live in this module
//! rather than split across two files, since neither is useful without the
//! other and the split bought the original nothing but an extra header.

use std::collections::{HashMap, HashSet};

use crate::emitter::{Emitter, HostReg};
use crate::mem::MemEmitter;
use crate::pool::gp::{Evictor, PhysPool};
use crate::regfile::DspReg;
use crate::types::TWord;

/// Emission context threaded through pool operations: the two halves an
/// encoder needs to actually move a value in or out of the register file.
/// `PhysPool`'s generic `Ctx` parameter exists so this type never has to be
/// named outside this crate's op encoders.
pub struct EmitCtx<'a> {
    pub e: &'a mut Emitter,
    pub mem: &'a MemEmitter,
}

/// Lazy, write-back DSP register pool.
pub struct DspRegPool {
    gp: PhysPool<HostReg>,
    resident: HashMap<DspReg, HostReg>,
    occupant: HashMap<HostReg, DspReg>,
    dirty: HashSet<DspReg>,
    locked: HashSet<DspReg>,
    /// Set for the duration of encoding an instruction whose move field
    /// pairs an ALU op with a parallel data move; gates the Awrite/Bwrite
    /// redirection in `get_alu`/`set_alu`.
    parallel_op: bool,
    /// AGU `M[i]` writes recorded this block, drained by the block
    /// epilogue via `DspCore::set_m`.
    m_writes: Vec<(usize, TWord)>,
}

impl DspRegPool {
    #[must_use]
    pub fn new(gp: PhysPool<HostReg>) -> Self {
        Self {
            gp,
            resident: HashMap::new(),
            occupant: HashMap::new(),
            dirty: HashSet::new(),
            locked: HashSet::new(),
            parallel_op: false,
            m_writes: Vec::new(),
        }
    }

    #[must_use]
    pub const fn is_parallel_op(&self) -> bool {
        self.parallel_op
    }

    pub fn set_parallel_op(&mut self, value: bool) {
        self.parallel_op = value;
    }

    pub fn lock(&mut self, reg: DspReg) {
        self.locked.insert(reg);
    }

    pub fn unlock(&mut self, reg: DspReg) {
        self.locked.remove(&reg);
    }

    #[must_use]
    pub fn is_locked(&self, reg: DspReg) -> bool {
        self.locked.contains(&reg)
    }

    /// Acquire (loading if needed) the host register backing `reg`.
    /// `read`/`write` mirror the access-type flags from the reference JIT:
    /// `read` causes a load on first acquisition, `write` marks the slot
    /// dirty for eventual writeback.
    pub fn get(&mut self, ctx: &mut EmitCtx<'_>, reg: DspReg, read: bool, write: bool) -> HostReg {
        if let Some(&host) = self.resident.get(&reg) {
            self.gp.touch(host);
            if write {
                self.dirty.insert(reg);
            }
            return host;
        }

        // Extract the pool so `self` (minus `gp`) can serve as its own
        // evictor without aliasing `self.gp` mutably twice.
        let mut gp = std::mem::take(&mut self.gp);
        let host = gp.acquire(self, ctx);
        self.gp = gp;

        if read {
            ctx.mem.load_dsp_reg(ctx.e, host, reg);
        }

        self.resident.insert(reg, host);
        self.occupant.insert(host, reg);
        if write {
            self.dirty.insert(reg);
        } else {
            self.dirty.remove(&reg);
        }
        host
    }

    /// Copy a DSP register's value into an arbitrary scratch register,
    /// without granting `dst` pool residency (mirrors `JitDspRegs::getR`
    /// and friends, which read into a caller-owned temporary).
    pub fn read(&mut self, ctx: &mut EmitCtx<'_>, dst: HostReg, reg: DspReg) {
        let host = self.get(ctx, reg, true, false);
        if host.0 != dst.0 {
            ctx.e.mov_rr(dst, host);
        }
    }

    /// Store a value into a DSP register's pool slot (mirrors
    /// `JitDspRegs::setR`/`setXY`/raw `JitDspRegPool::write`).
    pub fn write(&mut self, ctx: &mut EmitCtx<'_>, reg: DspReg, src: HostReg) {
        let host = self.get(ctx, reg, false, true);
        if host.0 != src.0 {
            ctx.e.mov_rr(host, src);
        }
        self.dirty.insert(reg);
    }

    fn release(&mut self, reg: DspReg) {
        if let Some(host) = self.resident.remove(&reg) {
            self.occupant.remove(&host);
            self.dirty.remove(&reg);
            self.gp.release(host);
        }
    }

    // -- ALU accumulators (Awrite/Bwrite shadow-slot protocol) --

    #[must_use]
    const fn alu_reg(alu: usize) -> DspReg {
        if alu == 0 {
            DspReg::A
        } else {
            DspReg::B
        }
    }

    #[must_use]
    const fn alu_write_reg(alu: usize) -> DspReg {
        if alu == 0 {
            DspReg::Awrite
        } else {
            DspReg::Bwrite
        }
    }

    /// Read-only access to accumulator `alu` (0 = A, 1 = B).
    pub fn read_alu(&mut self, ctx: &mut EmitCtx<'_>, dst: HostReg, alu: usize) {
        self.read(ctx, dst, Self::alu_reg(alu));
    }

    /// `get`-style access to accumulator `alu`, redirecting to the
    /// `Awrite`/`Bwrite` shadow slot when `write` is requested — the
    /// parallel-move protocol: an ALU op's result and a data move's
    /// destination must never alias the same host register before the
    /// move's source operand has been read.
    pub fn get_alu(&mut self, ctx: &mut EmitCtx<'_>, alu: usize, read: bool, write: bool) -> HostReg {
        let reg = if write { Self::alu_write_reg(alu) } else { Self::alu_reg(alu) };
        self.get(ctx, reg, read, write)
    }

    /// Write `src` into accumulator `alu`, masking to 56 bits if
    /// `needs_masking`, and locking the shadow slot against eviction for
    /// the remainder of a parallel-move instruction.
    pub fn set_alu(&mut self, ctx: &mut EmitCtx<'_>, alu: usize, src: HostReg, needs_masking: bool) {
        let r = if self.parallel_op { Self::alu_write_reg(alu) } else { Self::alu_reg(alu) };
        self.write(ctx, r, src);
        if needs_masking {
            let host = self.get(ctx, r, true, true);
            mask56(ctx.e, host);
        }
        if self.parallel_op && !self.is_locked(r) {
            self.lock(r);
        }
    }

    pub fn clr_alu(&mut self, ctx: &mut EmitCtx<'_>, alu: usize) {
        let r = if self.parallel_op { Self::alu_write_reg(alu) } else { Self::alu_reg(alu) };
        let host = self.get(ctx, r, false, true);
        ctx.e.xor_rr(host, host);
        if self.parallel_op && !self.is_locked(r) {
            self.lock(r);
        }
    }

    /// Reconcile a locked `Awrite`/`Bwrite` shadow slot back onto the real
    /// accumulator at the end of a parallel-move instruction, and release
    /// the lock. No-op if the shadow slot was never written this
    /// instruction.
    pub fn commit_parallel_move(&mut self, ctx: &mut EmitCtx<'_>) {
        for alu in 0..2 {
            let shadow = Self::alu_write_reg(alu);
            if !self.is_locked(shadow) {
                continue;
            }
            let real = Self::alu_reg(alu);
            let value = self.get(ctx, shadow, true, false);
            self.write(ctx, real, value);
            self.unlock(shadow);
            self.release(shadow);
        }
    }

    // -- AGU registers (R/N/M) --

    pub fn get_r(&mut self, ctx: &mut EmitCtx<'_>, dst: HostReg, agu: u8) {
        self.read(ctx, dst, DspReg::R(agu));
    }
    pub fn set_r(&mut self, ctx: &mut EmitCtx<'_>, agu: u8, src: HostReg) {
        self.write(ctx, DspReg::R(agu), src);
    }

    pub fn get_n(&mut self, ctx: &mut EmitCtx<'_>, dst: HostReg, agu: u8) {
        self.read(ctx, dst, DspReg::N(agu));
    }
    pub fn set_n(&mut self, ctx: &mut EmitCtx<'_>, agu: u8, src: HostReg) {
        self.write(ctx, DspReg::N(agu), src);
    }

    pub fn get_m(&mut self, ctx: &mut EmitCtx<'_>, dst: HostReg, agu: u8) {
        self.read(ctx, dst, DspReg::M(agu));
    }

    /// Write `M[agu]` and record the change for the block epilogue to
    /// replay through `DspCore::set_m`, so the embedder can recompute any
    /// modulo-addressing lookup tables that depend on it.
    pub fn set_m(&mut self, ctx: &mut EmitCtx<'_>, agu: u8, src: HostReg, value: TWord) {
        self.write(ctx, DspReg::M(agu), src);
        self.m_writes.push((agu as usize, value));
    }

    #[must_use]
    pub fn drain_m_writes(&mut self) -> Vec<(usize, TWord)> {
        std::mem::take(&mut self.m_writes)
    }

    // -- X/Y data registers --

    pub fn get_xy(&mut self, ctx: &mut EmitCtx<'_>, dst: HostReg, xy: usize) {
        let reg = if xy == 0 { DspReg::X } else { DspReg::Y };
        self.read(ctx, dst, reg);
    }

    pub fn set_xy(&mut self, ctx: &mut EmitCtx<'_>, xy: usize, src: HostReg) {
        mask48(ctx.e, src);
        let reg = if xy == 0 { DspReg::X } else { DspReg::Y };
        self.write(ctx, reg, src);
    }

    // -- Loop registers (pool-managed) --

    pub fn get_la(&mut self, ctx: &mut EmitCtx<'_>, dst: HostReg) {
        self.read(ctx, dst, DspReg::La);
    }
    pub fn set_la(&mut self, ctx: &mut EmitCtx<'_>, src: HostReg) {
        self.write(ctx, DspReg::La, src);
    }

    pub fn get_lc(&mut self, ctx: &mut EmitCtx<'_>, dst: HostReg) {
        self.read(ctx, dst, DspReg::Lc);
    }
    pub fn set_lc(&mut self, ctx: &mut EmitCtx<'_>, src: HostReg) {
        self.write(ctx, DspReg::Lc, src);
    }

    // -- SR (pool-managed, used heavily by the CCR machinery) --

    pub fn get_sr(&mut self, ctx: &mut EmitCtx<'_>, read: bool, write: bool) -> HostReg {
        self.get(ctx, DspReg::Sr, read, write)
    }

    // -- Scalar registers that bypass the pool (direct memory cells) --

    pub fn get_ep(&self, e: &mut Emitter, mem: &MemEmitter, dst: HostReg) {
        mem.load_dsp_reg(e, dst, DspReg::Ep);
    }
    pub fn set_ep(&self, e: &mut Emitter, mem: &MemEmitter, src: HostReg) {
        mem.store_dsp_reg(e, DspReg::Ep, src);
    }

    pub fn get_vba(&self, e: &mut Emitter, mem: &MemEmitter, dst: HostReg) {
        mem.load_dsp_reg(e, dst, DspReg::Vba);
    }
    pub fn set_vba(&self, e: &mut Emitter, mem: &MemEmitter, src: HostReg) {
        mem.store_dsp_reg(e, DspReg::Vba, src);
    }

    pub fn get_sc(&self, e: &mut Emitter, mem: &MemEmitter, dst: HostReg) {
        mem.load_dsp_reg(e, dst, DspReg::Sc);
    }
    pub fn set_sc(&self, e: &mut Emitter, mem: &MemEmitter, src: HostReg) {
        mem.store_dsp_reg(e, DspReg::Sc, src);
    }

    pub fn get_sz(&self, e: &mut Emitter, mem: &MemEmitter, dst: HostReg) {
        mem.load_dsp_reg(e, dst, DspReg::Sz);
    }
    pub fn set_sz(&self, e: &mut Emitter, mem: &MemEmitter, src: HostReg) {
        mem.store_dsp_reg(e, DspReg::Sz, src);
    }

    pub fn get_omr(&self, e: &mut Emitter, mem: &MemEmitter, dst: HostReg) {
        mem.load_dsp_reg(e, dst, DspReg::Omr);
    }
    pub fn set_omr(&self, e: &mut Emitter, mem: &MemEmitter, src: HostReg) {
        mem.store_dsp_reg(e, DspReg::Omr, src);
    }

    pub fn get_sp(&self, e: &mut Emitter, mem: &MemEmitter, dst: HostReg) {
        mem.load_dsp_reg(e, dst, DspReg::Sp);
    }
    pub fn set_sp(&self, e: &mut Emitter, mem: &MemEmitter, src: HostReg) {
        mem.store_dsp_reg(e, DspReg::Sp, src);
    }

    // -- Hardware stack (indexed by SP & 0xf) --

    pub fn get_ss(&self, e: &mut Emitter, mem: &MemEmitter, dst: HostReg, index_scratch: HostReg) {
        self.get_sp(e, mem, index_scratch);
        e.and_ri(index_scratch, 0xf);
        mem.load_ss(e, dst, index_scratch);
    }

    pub fn set_ss(&self, e: &mut Emitter, mem: &MemEmitter, src: HostReg, index_scratch: HostReg) {
        self.get_sp(e, mem, index_scratch);
        e.and_ri(index_scratch, 0xf);
        mem.store_ss(e, index_scratch, src);
    }

    /// Flush every resident, dirty register to its memory cell (the block
    /// epilogue's writeback pass) without releasing pool residency — the
    /// block is ending either way, so residency bookkeeping is moot, but
    /// this keeps `writeback_all` reusable as a barrier inside a block too
    /// (e.g. before a call through `DspMemory` that might alias).
    pub fn writeback_all(&mut self, ctx: &mut EmitCtx<'_>) {
        let dirty: Vec<DspReg> = self.dirty.iter().copied().collect();
        for reg in dirty {
            if let Some(&host) = self.resident.get(&reg) {
                ctx.mem.store_dsp_reg(ctx.e, reg, host);
            }
        }
        self.dirty.clear();
    }

    #[must_use]
    pub fn touched_callee_save(&self) -> &[HostReg] {
        self.gp.touched_callee_save()
    }

    /// Acquire a pool register for a short-lived value that doesn't
    /// correspond to any architectural register — `MOVE L:` needs two live
    /// value halves plus an address register, one more than the two fixed
    /// scratch registers in `abi` provide. Must be paired with
    /// `release_scratch` once the caller is done with it. Uses the same
    /// self-as-evictor aliasing trick as `get`.
    pub fn acquire_scratch(&mut self, ctx: &mut EmitCtx<'_>) -> HostReg {
        let mut gp = std::mem::take(&mut self.gp);
        let host = gp.acquire(self, ctx);
        self.gp = gp;
        host
    }

    pub fn release_scratch(&mut self, reg: HostReg) {
        self.gp.release(reg);
    }
}

impl<'a> Evictor<HostReg, EmitCtx<'a>> for DspRegPool {
    fn spill(&mut self, ctx: &mut EmitCtx<'a>, victim: HostReg) {
        if let Some(reg) = self.occupant.remove(&victim) {
            if self.dirty.remove(&reg) {
                ctx.mem.store_dsp_reg(ctx.e, reg, victim);
            }
            self.resident.remove(&reg);
        }
    }
}

/// `shl 8; shr 8` / `shl 16; shr 16` masking trick for the 56/48-bit widths
/// that have no single AND-immediate encoding on either host architecture.
fn mask56(e: &mut Emitter, r: HostReg) {
    e.shl_ri(r, 8);
    e.shr_ri(r, 8);
}

fn mask48(e: &mut Emitter, r: HostReg) {
    e.shl_ri(r, 16);
    e.shr_ri(r, 16);
}
