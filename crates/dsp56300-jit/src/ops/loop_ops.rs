//! DO/DOR/ENDDO: hardware loop setup and early exit.
//!
//! Grounded in the reference JIT's `op_Do`/`op_Dor`/`op_Enddo`, which push
//! the caller's `(LA, LC, SR)` onto the hardware stack, load `LA` with the
//! loop's end address and `LC` with the iteration count, set the LF (loop
//! flag) bit, then pop the frame back (restoring `SR`, and with it LF) on
//! `ENDDO` or natural loop exit. Per spec.md §4.7, loop-end itself isn't a
//! dedicated opcode — the translator recognizes it by the block's PC
//! reaching `LA` — so the decrement-and-branch-back code lives in
//! `translator`, not here; this module only emits the setup (`DO`/`DOR`) and
//! the early-exit teardown (`ENDDO`).

use crate::abi;
use crate::decode;
use crate::ops::OpCtx;
use crate::regfile::sr_bit;
use crate::types::TWord;

/// Push the caller's current `(LA, LC)` onto the hardware stack, packed
/// into one 64-bit `SS` slot (`LA` in the low 24 bits, `LC` in the next
/// 24) — the same whole-slot packing `ops::control`'s `push_ss` takes for
/// `(PC, SR)` return frames — then push `SR` alone onto a second slot, so
/// the existing `(LA, LC)` packing doesn't need to grow to fit a third
/// 24-bit value.
fn push_loop_frame(ctx: &mut OpCtx<'_>) {
    let packed = abi::SCRATCH;
    let tmp = abi::SHIFT_COUNT;
    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    ctx.pool.get_la(&mut pc, packed);
    ctx.pool.get_lc(&mut pc, tmp);
    ctx.e.shl_ri(tmp, 24);
    ctx.e.or_rr(packed, tmp);

    ctx.pool.get_sp(ctx.e, ctx.mem, tmp);
    ctx.e.add_ri(tmp, 1);
    ctx.pool.set_sp(ctx.e, ctx.mem, tmp);
    ctx.pool.set_ss(ctx.e, ctx.mem, packed, tmp);

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    let sr = ctx.pool.get_sr(&mut pc, true, false);
    ctx.e.mov_rr(packed, sr);
    ctx.pool.get_sp(ctx.e, ctx.mem, tmp);
    ctx.e.add_ri(tmp, 1);
    ctx.pool.set_sp(ctx.e, ctx.mem, tmp);
    ctx.pool.set_ss(ctx.e, ctx.mem, packed, tmp);
}

/// Pop the two hardware-stack frames `push_loop_frame` pushed, in reverse
/// order: `SR` first (restoring it wholesale, LF included, and discarding
/// any deferred CCR derivation since an explicit SR writer takes
/// precedence), then `(LA, LC)`, restoring the enclosing loop — or leaving
/// both zeroed if there was none.
fn pop_loop_frame(ctx: &mut OpCtx<'_>) {
    let packed = abi::SCRATCH;
    let tmp = abi::SHIFT_COUNT;

    ctx.pool.get_ss(ctx.e, ctx.mem, packed, tmp);
    ctx.pool.get_sp(ctx.e, ctx.mem, tmp);
    ctx.e.sub_ri(tmp, 1);
    ctx.pool.set_sp(ctx.e, ctx.mem, tmp);
    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    let sr = ctx.pool.get_sr(&mut pc, false, true);
    ctx.e.mov_rr(sr, packed);
    ctx.ccr.discard();

    ctx.pool.get_ss(ctx.e, ctx.mem, packed, tmp);
    ctx.pool.get_sp(ctx.e, ctx.mem, tmp);
    ctx.e.sub_ri(tmp, 1);
    ctx.pool.set_sp(ctx.e, ctx.mem, tmp);

    ctx.e.mov_rr(tmp, packed);
    ctx.e.shl_ri(tmp, 40);
    ctx.e.shr_ri(tmp, 40);
    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    ctx.pool.set_la(&mut pc, tmp);

    let lc = abi::SCRATCH;
    ctx.e.mov_rr(lc, packed);
    ctx.e.shr_ri(lc, 24);
    ctx.e.shl_ri(lc, 40);
    ctx.e.shr_ri(lc, 40);
    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    ctx.pool.set_lc(&mut pc, lc);
}

/// Set SR's LF (loop flag) bit, marking a hardware loop active.
fn set_loop_flag(ctx: &mut OpCtx<'_>) {
    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    let sr = ctx.pool.get_sr(&mut pc, true, true);
    ctx.e.bts_ri(sr, sr_bit::LF as u8);
}

/// `DO #count,loop_end_pc`: push the current loop frame, then load `LC`
/// from the opcode's 16-bit immediate count and `LA` from `loop_end_pc`
/// (the extension word the translator has already fetched for this
/// instruction).
pub fn do_op(ctx: &mut OpCtx<'_>, opcode: TWord, loop_end_pc: TWord) {
    push_loop_frame(ctx);

    let count = abi::SCRATCH;
    ctx.e.mov_ri(count, i64::from(decode::do_count_imm(opcode)));
    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    ctx.pool.set_lc(&mut pc, count);

    let la = abi::SCRATCH;
    ctx.e.mov_ri(la, i64::from(loop_end_pc));
    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    ctx.pool.set_la(&mut pc, la);

    set_loop_flag(ctx);
}

/// `DOR #loop_end_pc,Rn`: register-counted form — `LC` comes from the AGU
/// register `decode::agu_index` selects instead of an immediate.
pub fn dor(ctx: &mut OpCtx<'_>, opcode: TWord, loop_end_pc: TWord) {
    push_loop_frame(ctx);

    let agu = decode::agu_index(opcode);
    let count = abi::SCRATCH;
    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    ctx.pool.get_r(&mut pc, count, agu);
    ctx.pool.set_lc(&mut pc, count);

    let la = abi::SCRATCH;
    ctx.e.mov_ri(la, i64::from(loop_end_pc));
    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    ctx.pool.set_la(&mut pc, la);

    set_loop_flag(ctx);
}

/// `ENDDO`: exit a loop before its natural completion, restoring the
/// enclosing loop's `(LA, LC)` from the hardware stack.
pub fn enddo(ctx: &mut OpCtx<'_>) {
    pop_loop_frame(ctx);
}

/// Called by the translator at a loop's natural end (PC reaching `LA`):
/// decrement `LC`, and if it's not yet exhausted, restore `LC` and leave
/// `LA` in place for another pass; the translator itself emits the
/// branch-back to the loop body based on this function's return value.
/// Returns the host condition-free boolean outcome isn't available at
/// translation time (`LC` is a runtime value), so this only emits the
/// decrement — the translator wires the conditional branch around it.
pub fn decrement_lc(ctx: &mut OpCtx<'_>, dst: crate::emitter::HostReg) {
    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    ctx.pool.get_lc(&mut pc, dst);
    ctx.e.sub_ri(dst, 1);
    ctx.pool.set_lc(&mut pc, dst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn do_count_imm_matches_decode() {
        let opcode: TWord = 0b10_0110 << 18 | 0x1234;
        assert_eq!(decode::do_count_imm(opcode), 0x1234);
    }
}
