//! Physical register pools: LRU allocators over the host's general-purpose
//! and vector register files, with caller-save/callee-save tracking.

/// Which ABI class a host register belongs to. The stack helper only ever
/// needs to save callee-save registers; caller-save registers are assumed
/// clobbered across any call the emitted code makes, and the op encoders
/// that call runtime helpers are responsible for not holding caller-save
/// values live across such a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveClass {
    CallerSave,
    CalleeSave,
}

/// Callback invoked when the pool needs to evict its least-recently-used
/// occupant to satisfy an `acquire()`. Implemented by `DspRegPool::spill`.
///
/// `Ctx` carries whatever the evictor needs to actually emit the writeback
/// (the `Emitter` and the memory-access emitter); `PhysPool` stays ignorant
/// of both, so this crate's one generic LRU allocator serves the GP pool and
/// the vector pool without depending on emission types.
pub trait Evictor<R, Ctx: ?Sized> {
    /// Spill whatever DSP register currently occupies `victim`, freeing it.
    fn spill(&mut self, ctx: &mut Ctx, victim: R);
}

/// Generic LRU pool over a fixed set of host registers of type `R`.
///
/// `R` is `HostReg` for the GP pool and `HostVec` for the vector pool; the
/// allocation policy is identical for both, so it lives here once.
pub struct PhysPool<R> {
    /// Registers available for allocation.
    free: Vec<R>,
    /// Registers currently on loan, oldest-acquired first (LRU order: the
    /// front of this vec is the next eviction candidate).
    used: Vec<R>,
    save_class: Vec<(R, SaveClass)>,
    /// Callee-save registers acquired at least once this block; the stack
    /// helper reads this at finalize to know what to save/restore.
    touched_callee_save: Vec<R>,
}

impl<R: Copy + PartialEq> PhysPool<R> {
    #[must_use]
    pub fn new(registers: Vec<(R, SaveClass)>) -> Self {
        let free = registers.iter().map(|(r, _)| *r).collect();
        Self { free, used: Vec::new(), save_class: registers, touched_callee_save: Vec::new() }
    }

    fn save_class_of(&self, r: R) -> SaveClass {
        self.save_class
            .iter()
            .find(|(reg, _)| *reg == r)
            .map_or(SaveClass::CallerSave, |(_, c)| *c)
    }

    /// Acquire a free register, evicting the LRU occupant via `evictor` if
    /// the pool is exhausted.
    pub fn acquire<Ctx: ?Sized, E: Evictor<R, Ctx>>(&mut self, evictor: &mut E, ctx: &mut Ctx) -> R {
        let reg = if let Some(r) = self.free.pop() {
            r
        } else {
            let victim = self.used.remove(0);
            evictor.spill(ctx, victim);
            victim
        };
        self.used.push(reg);
        if self.save_class_of(reg) == SaveClass::CalleeSave
            && !self.touched_callee_save.contains(&reg)
        {
            self.touched_callee_save.push(reg);
        }
        reg
    }

    /// Return a register to the free list.
    pub fn release(&mut self, reg: R) {
        if let Some(pos) = self.used.iter().position(|r| *r == reg) {
            self.used.remove(pos);
        }
        self.free.push(reg);
    }

    /// Mark a register as freshly used (moves it to the back of the LRU
    /// order without changing residency), called whenever an already-loaded
    /// register is touched so it isn't immediately re-evicted.
    pub fn touch(&mut self, reg: R) {
        if let Some(pos) = self.used.iter().position(|r| *r == reg) {
            let r = self.used.remove(pos);
            self.used.push(r);
        }
    }

    #[must_use]
    pub fn is_free(&self, reg: R) -> bool {
        self.free.contains(&reg)
    }

    /// Callee-save registers that were acquired at least once; consumed by
    /// the stack helper at block finalize.
    #[must_use]
    pub fn touched_callee_save(&self) -> &[R] {
        &self.touched_callee_save
    }
}

impl<R> Default for PhysPool<R> {
    /// An empty, registerless pool. Only useful as a placeholder for
    /// `std::mem::take` while a pool that owns `self` borrows out of one of
    /// its own fields (see `DspRegPool::acquire_host`); never constructed
    /// directly by callers.
    fn default() -> Self {
        Self { free: Vec::new(), used: Vec::new(), save_class: Vec::new(), touched_callee_save: Vec::new() }
    }
}
