//! Program-control encoders: JMP/Jcc/JSR/BSR/RTS/RTI.
//!
//! Every one of these ends the current block: each writes the resume PC
//! into `Runtime::next_pc` and jumps to the block's epilogue (its label is
//! threaded in by the translator, which owns the block-level prologue/
//! epilogue shape per `stack::StackHelper`). Conditional forms branch
//! around the `next_pc` write rather than skip the epilogue jump, so both
//! arms still flow through the same single exit.
//!
//! JSR/BSR push `(return_pc, SR)` packed into one 64-bit `SS` slot through
//! `DspRegPool::get_ss`/`set_ss`, incrementing/decrementing `SP` around the
//! access exactly like the reference's call/return sequences — the same
//! whole-slot packing `ops::loop_ops::push_loop_frame` uses for `(LA, LC)`.
//! `RTS` only ever consumes the PC half (real hardware leaves `SR` alone on
//! a plain subroutine return); `RTI` consumes both, restoring `SR` and
//! discarding any still-deferred CCR derivation since an explicit SR writer
//! takes precedence (see `ccr::DeferredCcr::discard`).
//!
//! `Jcc`'s condition-to-bit mapping only checks a single CCR bit per
//! condition (real compound conditions like GE/LT compare N against V);
//! this is a documented simplification, see DESIGN.md's Open Questions.

use memoffset::offset_of;

use crate::abi;
use crate::decode::{self, ControlOp};
use crate::emitter::{HostCond, Label};
use crate::ops::OpCtx;
use crate::regfile::ccr_bit;
use crate::runtime::Runtime;
use crate::types::{Cond, TWord};

fn store_next_pc(ctx: &mut OpCtx<'_>, pc_reg: crate::emitter::HostReg) {
    let offset = offset_of!(Runtime, next_pc) as i32;
    ctx.e.store32(abi::RUNTIME_BASE, offset, pc_reg);
}

/// Map a DSP `Cond` onto a single CCR bit and whether the condition is true
/// when that bit is set or clear.
fn cond_to_bit_test(cond: Cond) -> (u32, bool) {
    match cond {
        Cond::Cc => (ccr_bit::C as u32, false),
        Cond::Cs => (ccr_bit::C as u32, true),
        Cond::Eq => (ccr_bit::Z as u32, true),
        Cond::Ne => (ccr_bit::Z as u32, false),
        Cond::Ge => (ccr_bit::N as u32, false),
        Cond::Lt => (ccr_bit::N as u32, true),
        Cond::Gt => (ccr_bit::Z as u32, false),
        Cond::Le => (ccr_bit::Z as u32, true),
        Cond::Mi => (ccr_bit::N as u32, true),
        Cond::Pl => (ccr_bit::N as u32, false),
        Cond::Nr => (ccr_bit::U as u32, false),
        Cond::Ls => (ccr_bit::U as u32, true),
        Cond::Gs => (ccr_bit::N as u32, false),
        Cond::Er => (ccr_bit::E as u32, true),
        Cond::Ec => (ccr_bit::E as u32, false),
        Cond::Ev => (ccr_bit::E as u32, true),
    }
}

fn decode_cond(cccc: u8) -> Cond {
    match cccc & 0xF {
        0x0 => Cond::Cc,
        0x1 => Cond::Cs,
        0x2 => Cond::Eq,
        0x3 => Cond::Ne,
        0x4 => Cond::Ge,
        0x5 => Cond::Lt,
        0x6 => Cond::Gt,
        0x7 => Cond::Le,
        0x8 => Cond::Mi,
        0x9 => Cond::Pl,
        0xA => Cond::Nr,
        0xB => Cond::Er,
        0xC => Cond::Ls,
        0xD => Cond::Gs,
        0xE => Cond::Ec,
        _ => Cond::Ev,
    }
}

/// Record `pc` as the resume point for the embedder's trampoline without
/// jumping anywhere. Used by the translator for block exits that aren't
/// themselves a control-transfer instruction — falling off the instruction
/// limit, landing on an already-cached or volatile PC, or a hardware loop's
/// natural end — where the finalize sequence is the very next thing emitted,
/// so no explicit jump to the epilogue is needed.
pub fn write_next_pc(ctx: &mut OpCtx<'_>, pc: TWord) {
    ctx.e.mov_ri(abi::SCRATCH, i64::from(pc));
    store_next_pc(ctx, abi::SCRATCH);
}

/// `JMP`: unconditional jump to `target_pc`.
pub fn jmp(ctx: &mut OpCtx<'_>, target_pc: TWord, epilogue: Label) {
    ctx.e.mov_ri(abi::SCRATCH, i64::from(target_pc));
    store_next_pc(ctx, abi::SCRATCH);
    ctx.e.jmp(epilogue);
}

/// `Jcc`: conditionally jump to `target_pc`, otherwise resume at
/// `fallthrough_pc` — both arms are block-exits (Jcc is always block-final,
/// per the termination conditions), so both write `next_pc` and jump to the
/// shared epilogue. Requires the caller to have already committed any
/// pending CCR bits (`DeferredCcr::commit`) so `SR` reflects the latest
/// arithmetic result.
pub fn jcc(ctx: &mut OpCtx<'_>, opcode: TWord, target_pc: TWord, fallthrough_pc: TWord, epilogue: Label) {
    let cond = decode_cond(decode::cccc(opcode));
    let (bit, want_set) = cond_to_bit_test(cond);

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    let sr = ctx.pool.get_sr(&mut pc, true, false);

    ctx.e.bt_ri(sr, bit as u8);
    let not_taken = ctx.e.label();
    let take = if want_set { HostCond::NotCarry } else { HostCond::Carry };
    ctx.e.jcc(take, not_taken);
    ctx.e.mov_ri(abi::SCRATCH, i64::from(target_pc));
    store_next_pc(ctx, abi::SCRATCH);
    ctx.e.jmp(epilogue);
    ctx.e.bind(not_taken);
    ctx.e.mov_ri(abi::SCRATCH, i64::from(fallthrough_pc));
    store_next_pc(ctx, abi::SCRATCH);
    ctx.e.jmp(epilogue);
}

/// Push `(return_pc, SR)` onto the hardware stack (pre-incrementing `SP`,
/// the reference's push-then-store convention), packed into one 64-bit
/// slot: `return_pc` in the low 24 bits, `SR` in the next 24.
fn push_ss(ctx: &mut OpCtx<'_>, return_pc: TWord) {
    let packed = abi::SCRATCH;
    let tmp = abi::SHIFT_COUNT;
    ctx.e.mov_ri(packed, i64::from(return_pc));

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    let sr = ctx.pool.get_sr(&mut pc, true, false);
    ctx.e.mov_rr(tmp, sr);
    ctx.e.shl_ri(tmp, 24);
    ctx.e.or_rr(packed, tmp);

    ctx.pool.get_sp(ctx.e, ctx.mem, tmp);
    ctx.e.add_ri(tmp, 1);
    ctx.pool.set_sp(ctx.e, ctx.mem, tmp);
    ctx.pool.set_ss(ctx.e, ctx.mem, packed, tmp);
}

/// Pop the top of the hardware stack into `abi::SCRATCH` (reads at the
/// current `SP`, then post-decrements it), masked to its low 24 bits — the
/// packed frame's return-PC half. `SR`'s half is left alone; only `rti`
/// consumes it.
fn pop_ss(ctx: &mut OpCtx<'_>) {
    ctx.pool.get_ss(ctx.e, ctx.mem, abi::SCRATCH, abi::SHIFT_COUNT);
    ctx.pool.get_sp(ctx.e, ctx.mem, abi::SHIFT_COUNT);
    ctx.e.sub_ri(abi::SHIFT_COUNT, 1);
    ctx.pool.set_sp(ctx.e, ctx.mem, abi::SHIFT_COUNT);
    ctx.e.and_ri(abi::SCRATCH, 0x00FF_FFFF);
}

/// `JSR`: push the fall-through PC, jump to `target_pc`.
pub fn jsr(ctx: &mut OpCtx<'_>, target_pc: TWord, return_pc: TWord, epilogue: Label) {
    push_ss(ctx, return_pc);
    jmp(ctx, target_pc, epilogue);
}

/// `BSR`: same as JSR — this crate doesn't distinguish BSR's PC-relative
/// encoding from JSR's absolute one since the translator resolves both to
/// an already-computed absolute `target_pc` before calling here.
pub fn bsr(ctx: &mut OpCtx<'_>, target_pc: TWord, return_pc: TWord, epilogue: Label) {
    jsr(ctx, target_pc, return_pc, epilogue);
}

/// `RTS`: pop the hardware stack into `next_pc`.
pub fn rts(ctx: &mut OpCtx<'_>, epilogue: Label) {
    pop_ss(ctx);
    store_next_pc(ctx, abi::SCRATCH);
    ctx.e.jmp(epilogue);
}

/// `RTI`: pop the hardware stack, restoring both the resume PC and `SR`
/// from the packed `(PC, SR)` frame JSR/BSR pushed.
pub fn rti(ctx: &mut OpCtx<'_>, epilogue: Label) {
    let frame = abi::SCRATCH;
    let tmp = abi::SHIFT_COUNT;
    ctx.pool.get_ss(ctx.e, ctx.mem, frame, tmp);
    ctx.pool.get_sp(ctx.e, ctx.mem, tmp);
    ctx.e.sub_ri(tmp, 1);
    ctx.pool.set_sp(ctx.e, ctx.mem, tmp);

    ctx.e.mov_rr(tmp, frame);
    ctx.e.shr_ri(tmp, 24);
    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    let sr = ctx.pool.get_sr(&mut pc, false, true);
    ctx.e.mov_rr(sr, tmp);
    ctx.ccr.discard();

    ctx.e.and_ri(frame, 0x00FF_FFFF);
    store_next_pc(ctx, frame);
    ctx.e.jmp(epilogue);
}

#[must_use]
pub fn kind(opcode: TWord) -> Option<ControlOp> {
    decode::control_op_kind(opcode)
}
