//! Stack helper: tracks which callee-saved host registers a block clobbered
//! and emits a matched prologue/epilogue around the block body.
//!
//! The body is emitted first into a temporary buffer conceptually, but since
//! `dynasmrt` assembles sequentially, the translator instead emits a
//! placeholder prologue, emits the body, asks the register pools which
//! callee-save registers were touched, and emits the epilogue — the
//! prologue/epilogue registers themselves don't depend on code layout, only
//! on which registers got acquired, so no backpatching is needed as long as
//! the prologue is emitted from the final touched set before the body.
//!
//! To keep that invariant simple, `JitBlock::emit` runs op encoding against
//! scratch pools first (a "dry" pass) purely to learn the touched-register
//! set, then emits prologue + body + epilogue in one real pass. See
//! `translator::BlockTranslator`.

use crate::emitter::{Emitter, HostReg};

/// Emits matched push/pop (x86-64) or str/ldr pair (AArch64) sequences for
/// exactly the callee-save registers a block used.
#[derive(Debug, Default, Clone)]
pub struct StackHelper {
    callee_saved: Vec<HostReg>,
}

impl StackHelper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `reg` was acquired at least once and must be preserved.
    pub fn notify_acquired(&mut self, reg: HostReg) {
        if !self.callee_saved.contains(&reg) {
            self.callee_saved.push(reg);
        }
    }

    pub fn emit_prologue(&self, emitter: &mut Emitter) {
        for &reg in &self.callee_saved {
            emitter.push(reg);
        }
    }

    /// Pops in reverse acquisition order so push/pop nest correctly.
    pub fn emit_epilogue(&self, emitter: &mut Emitter) {
        for &reg in self.callee_saved.iter().rev() {
            emitter.pop(reg);
        }
    }

    #[must_use]
    pub fn used_registers(&self) -> &[HostReg] {
        &self.callee_saved
    }
}
