//! Per-instruction-class op encoders. Each function takes the decoded
//! opcode fields (see `decode`) and emits the native code for one DSP
//! instruction, reading/writing DSP registers exclusively through
//! `pool::DspRegPool` and deferring CCR bits through `ccr::DeferredCcr` —
//! no encoder touches a register-file cell directly.

pub mod alu;
pub mod bitfield;
pub mod control;
pub mod div;
pub mod loop_ops;
pub mod move_ops;

use crate::ccr::DeferredCcr;
use crate::emitter::Emitter;
use crate::mem::MemEmitter;
use crate::pool::{DspRegPool, EmitCtx};

/// Everything an op encoder needs, bundled so encoder signatures stay
/// short. Borrowed fresh for each instruction by the translator's main
/// loop.
pub struct OpCtx<'a> {
    pub pool: &'a mut DspRegPool,
    pub e: &'a mut Emitter,
    pub mem: &'a MemEmitter,
    pub ccr: &'a mut DeferredCcr,
}

impl<'a> OpCtx<'a> {
    /// Build a short-lived `EmitCtx` for calling into `DspRegPool`'s
    /// pool-facing methods, which only need the emitter and the
    /// memory-access emitter, never the pool or CCR state themselves.
    ///
    /// Deliberately an associated function taking `e`/`mem` by value
    /// (implicitly reborrowed at call sites, e.g. `OpCtx::pool_ctx(ctx.e,
    /// ctx.mem)`) rather than a `&mut self` method: a method would tie the
    /// returned `EmitCtx`'s lifetime to the *whole* `OpCtx` borrow, making
    /// `ctx.pool.get(...)` — which needs its own independent borrow of
    /// `ctx.pool` while the `EmitCtx` argument borrows `ctx.e`/`ctx.mem` —
    /// unborrowable in the same expression. As a free function over the
    /// two fields it actually needs, the borrow checker sees the two
    /// borrows as disjoint.
    pub fn pool_ctx(e: &mut Emitter, mem: &MemEmitter) -> EmitCtx<'_> {
        EmitCtx { e, mem }
    }
}
