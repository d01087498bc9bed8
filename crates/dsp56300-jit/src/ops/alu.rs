//! ALU, shifter, and logical-operation encoders.
//!
//! Grounded in `jitops_alu_x64.inl`'s `alu_asl`/`alu_asr`/`alu_and`/
//! `alu_lsl`/`alu_lsr`/`op_Not`/`op_Rol`. Every encoder reads and writes its
//! accumulator exclusively through `DspRegPool::get_alu`/`set_alu`, so the
//! parallel-move shadow-slot protocol applies uniformly without the encoder
//! needing to know whether its opcode happens to carry a parallel move.
//!
//! Two families of operand width show up here: ASL/ASR/ABS/RND/CLR work the
//! full 56-bit accumulator (`A2:A1:A0`), while AND/OR/EOR/NOT/ROL/LSL/LSR
//! only ever touch the middle 24-bit field (`A1`/`B1`, bits 47..24) —
//! `extract_mid`/`merge_mid` below implement that field's round trip so each
//! encoder reads like the reference's `getALU1`/`setALU1` pair.
//!
//! Register pressure note: only two host registers are reserved for op-local
//! scratch use (`abi::SHIFT_COUNT`, `abi::SCRATCH`), and `DeferredCcr`'s
//! pending-bits mechanism requires every capture after the first to use a
//! *different* register than whatever is already pending (so it can be
//! merged in with a single `or`). ASL's V derivation needs two more live
//! values than that (the pre-shift backup and the shifted-back compare), so
//! it borrows a pair of pool scratch registers via
//! `DspRegPool::acquire_scratch`/`release_scratch` for the duration of the
//! encoder, the same borrowing `rol` already does for its carry-in.

use crate::abi;
use crate::ccr::{CcrMask, CcrSource};
use crate::decode::{self, AluOp};
use crate::emitter::{Emitter, HostCond, HostReg};
use crate::ops::OpCtx;
use crate::regfile::RegWidth;
use crate::types::TWord;

/// Bits 47..24 of a 56-bit accumulator, zero-extended into `dst`.
fn extract_mid(e: &mut Emitter, dst: HostReg, full: HostReg) {
    e.mov_rr(dst, full);
    e.shr_ri(dst, 24);
    e.shl_ri(dst, 40);
    e.shr_ri(dst, 40);
}

/// Write a (possibly dirtied above bit 23) 24-bit `field` back into bits
/// 47..24 of `full`, preserving bits 55..48 and 23..0. `scratch` holds the
/// merge mask and is clobbered.
fn merge_mid(e: &mut Emitter, full: HostReg, field: HostReg, scratch: HostReg) {
    e.shl_ri(field, 40);
    e.shr_ri(field, 40);
    e.mov_ri(scratch, 0x00FF_0000_00FF_FFFFu64 as i64);
    e.and_rr(full, scratch);
    e.mov_rr(scratch, field);
    e.shl_ri(scratch, 24);
    e.or_rr(full, scratch);
}

/// `shl 8; shr 8` mask to 56 bits, mirroring `pool::dsp::mask56` (private to
/// that module, so duplicated here rather than exposed for one caller).
fn mask56(e: &mut Emitter, r: HostReg) {
    e.shl_ri(r, 8);
    e.shr_ri(r, 8);
}

/// Load ASL/ASR's shift count into the fixed `SHIFT_COUNT` register, from
/// either the immediate field or DSP register R2 (`decode::shift_count_is_reg`).
fn load_shift_amount(ctx: &mut OpCtx<'_>, opcode: TWord) {
    if decode::shift_count_is_reg(opcode) {
        let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
        ctx.pool.get_r(&mut pc, abi::SHIFT_COUNT, 2);
    } else {
        ctx.e.mov_ri(abi::SHIFT_COUNT, i64::from(decode::shift_count(opcode)));
    }
}

/// ASL: arithmetic shift left of the full 56-bit accumulator, variable or
/// immediate count. C takes the host carry out of the pre-shifted-by-8
/// shift (to land on the native carry flag at the DSP's bit 55 boundary). V
/// is derived per spec: shift the result back down by the same count and
/// compare against the pre-shift value — any mismatch means a significant
/// bit was lost off the top.
pub fn asl(ctx: &mut OpCtx<'_>, opcode: TWord) {
    let alu = decode::alu_dst(opcode);
    load_shift_amount(ctx, opcode);

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    let full = ctx.pool.get_alu(&mut pc, alu, true, false);

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    let backup = ctx.pool.acquire_scratch(&mut pc);
    ctx.e.mov_rr(backup, full);

    ctx.e.shl_ri(full, 8);
    ctx.e.shl_rcl(full);
    ctx.ccr.capture_carry(ctx.e, abi::SCRATCH);
    ctx.e.shr_ri(full, 8);
    mask56(ctx.e, full);

    // SHIFT_COUNT/CL is still holding the count loaded above — none of the
    // immediate-operand shifts since have touched it — so the same count
    // drives the reverse shift here.
    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    let check = ctx.pool.acquire_scratch(&mut pc);
    ctx.e.mov_rr(check, full);
    ctx.e.shl_ri(check, 8);
    ctx.e.sar_rcl(check);
    ctx.e.sar_ri(check, 8);
    mask56(ctx.e, check);
    ctx.e.xor_rr(check, backup);
    ctx.e.test_rr(check, check);
    ctx.ccr.capture_overflow(ctx.e, check, HostCond::NotZero);

    ctx.pool.release_scratch(check);
    ctx.pool.release_scratch(backup);

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    ctx.pool.set_alu(&mut pc, alu, full, false);

    ctx.ccr.mark(CcrMask::Z | CcrMask::N | CcrMask::U | CcrMask::E, full, RegWidth::W56, CcrSource::ShiftLeft);
}

/// ASR: arithmetic shift right of the full 56-bit accumulator. V is always
/// cleared (a right shift can never overflow the accumulator).
pub fn asr(ctx: &mut OpCtx<'_>, opcode: TWord) {
    let alu = decode::alu_dst(opcode);
    load_shift_amount(ctx, opcode);

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    let full = ctx.pool.get_alu(&mut pc, alu, true, false);

    ctx.e.shl_ri(full, 8);
    ctx.e.sar_rcl(full);
    ctx.ccr.capture_carry(ctx.e, abi::SCRATCH);
    ctx.e.sar_ri(full, 8);
    mask56(ctx.e, full);
    ctx.ccr.clear_overflow();

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    ctx.pool.set_alu(&mut pc, alu, full, false);

    ctx.ccr.mark(CcrMask::Z | CcrMask::N | CcrMask::U | CcrMask::E, full, RegWidth::W56, CcrSource::ShiftRight);
}

/// LSL: logical shift left of the 24-bit middle field. Immediate count
/// only — real hardware's register-count LSL/LSR never appears in the
/// block bodies this crate was grounded against, so only the common
/// immediate form is implemented.
pub fn lsl(ctx: &mut OpCtx<'_>, opcode: TWord) {
    let alu = decode::alu_dst(opcode);
    let amount = decode::shift_count(opcode);

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    let full = ctx.pool.get_alu(&mut pc, alu, true, false);

    let field = abi::SHIFT_COUNT;
    extract_mid(ctx.e, field, full);

    // +8 headroom lands the DSP's bit 23 carry-out on the native carry flag.
    ctx.e.shl_ri(field, amount + 8);
    ctx.ccr.capture_carry(ctx.e, abi::SCRATCH);
    ctx.e.shr_ri(field, 8);

    merge_mid(ctx.e, full, field, abi::SCRATCH);
    ctx.ccr.clear_overflow();

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    ctx.pool.set_alu(&mut pc, alu, full, false);

    extract_mid(ctx.e, abi::SHIFT_COUNT, full);
    ctx.ccr.mark(CcrMask::Z | CcrMask::N, abi::SHIFT_COUNT, RegWidth::W24, CcrSource::ShiftLeft);
}

/// LSR: logical shift right of the 24-bit middle field.
pub fn lsr(ctx: &mut OpCtx<'_>, opcode: TWord) {
    let alu = decode::alu_dst(opcode);
    let amount = decode::shift_count(opcode);

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    let full = ctx.pool.get_alu(&mut pc, alu, true, false);

    let field = abi::SHIFT_COUNT;
    extract_mid(ctx.e, field, full);

    ctx.e.shr_ri(field, amount);
    ctx.ccr.capture_carry(ctx.e, abi::SCRATCH);

    merge_mid(ctx.e, full, field, abi::SCRATCH);
    ctx.ccr.clear_overflow();

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    ctx.pool.set_alu(&mut pc, alu, full, false);

    extract_mid(ctx.e, abi::SHIFT_COUNT, full);
    ctx.ccr.mark(CcrMask::Z | CcrMask::N, abi::SHIFT_COUNT, RegWidth::W24, CcrSource::ShiftRight);
}

/// ROL: rotate the 24-bit middle field left by one, through carry — the
/// incoming bit0 is the CCR's current C, and the field's vacated bit23
/// becomes the new C.
pub fn rol(ctx: &mut OpCtx<'_>, opcode: TWord) {
    let alu = decode::alu_dst(opcode);

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    let full = ctx.pool.get_alu(&mut pc, alu, true, false);

    let field = abi::SHIFT_COUNT;
    extract_mid(ctx.e, field, full);

    // The incoming bit is the CCR's current C. Commit any still-deferred
    // derivation first (write=true, so the merged value is flushed back to
    // SR at block finalize) so this reads the real prior value rather than
    // a stale SR cell the last arithmetic op hasn't caught up with yet.
    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    let sr = ctx.pool.get_sr(&mut pc, true, true);
    ctx.ccr.commit(ctx.e, sr, abi::SCRATCH);

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    let old_carry = ctx.pool.acquire_scratch(&mut pc);
    ctx.e.mov_rr(old_carry, sr);
    ctx.e.and_ri(old_carry, 1);

    ctx.e.bt_ri(field, 23);
    ctx.ccr.capture_carry(ctx.e, abi::SCRATCH);

    ctx.e.shl_ri(field, 1);
    ctx.e.or_rr(field, old_carry);
    ctx.pool.release_scratch(old_carry);

    merge_mid(ctx.e, full, field, abi::SCRATCH);
    ctx.ccr.clear_overflow();

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    ctx.pool.set_alu(&mut pc, alu, full, false);

    extract_mid(ctx.e, abi::SHIFT_COUNT, full);
    ctx.ccr.mark(CcrMask::Z | CcrMask::N, abi::SHIFT_COUNT, RegWidth::W24, CcrSource::BitField);
}

/// NOT: one's complement of the 24-bit middle field. V is always cleared.
pub fn not_op(ctx: &mut OpCtx<'_>, opcode: TWord) {
    let alu = decode::alu_dst(opcode);

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    let full = ctx.pool.get_alu(&mut pc, alu, true, false);

    let field = abi::SHIFT_COUNT;
    extract_mid(ctx.e, field, full);
    ctx.e.not_r(field);
    merge_mid(ctx.e, full, field, abi::SCRATCH);
    ctx.ccr.clear_overflow();

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    ctx.pool.set_alu(&mut pc, alu, full, false);

    extract_mid(ctx.e, abi::SHIFT_COUNT, full);
    ctx.ccr.mark(CcrMask::Z | CcrMask::N, abi::SHIFT_COUNT, RegWidth::W24, CcrSource::BitField);
}

/// ABS: absolute value of the full 56-bit accumulator (negate, then
/// conditionally restore the pre-negation value if the negated result is
/// still negative, i.e. the input wasn't negative to begin with).
pub fn abs_op(ctx: &mut OpCtx<'_>, opcode: TWord) {
    let alu = decode::alu_dst(opcode);

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    let full = ctx.pool.get_alu(&mut pc, alu, true, false);

    let backup = abi::SCRATCH;
    ctx.e.mov_rr(backup, full);
    ctx.e.neg_r(full);
    ctx.e.cmp_ri(full, 0);
    ctx.e.cmovcc(HostCond::Lt, full, backup);
    mask56(ctx.e, full);
    ctx.ccr.clear_overflow();

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    ctx.pool.set_alu(&mut pc, alu, full, false);

    ctx.ccr.mark(CcrMask::Z | CcrMask::N | CcrMask::U | CcrMask::E, full, RegWidth::W56, CcrSource::Additive);
}

/// CLR: zero the accumulator.
pub fn clr(ctx: &mut OpCtx<'_>, opcode: TWord) {
    let alu = decode::alu_dst(opcode);
    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    ctx.pool.clr_alu(&mut pc, alu);
    ctx.ccr.clear_overflow();

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    let full = ctx.pool.get_alu(&mut pc, alu, true, false);
    ctx.ccr.mark(CcrMask::Z | CcrMask::N | CcrMask::U | CcrMask::E, full, RegWidth::W56, CcrSource::Additive);
}

/// AND/OR/EOR on the 24-bit middle field against an already-decoded 24-bit
/// immediate. V is always cleared; Z/N derive from the post-op field.
fn logic_mid(ctx: &mut OpCtx<'_>, alu: usize, imm: TWord, apply: impl FnOnce(&mut Emitter, HostReg, HostReg)) {
    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    let full = ctx.pool.get_alu(&mut pc, alu, true, false);

    let field = abi::SHIFT_COUNT;
    extract_mid(ctx.e, field, full);

    let imm_reg = abi::SCRATCH;
    ctx.e.mov_ri(imm_reg, i64::from(imm & 0x00FF_FFFF));
    apply(ctx.e, field, imm_reg);

    merge_mid(ctx.e, full, field, abi::SCRATCH);
    ctx.ccr.clear_overflow();

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    ctx.pool.set_alu(&mut pc, alu, full, false);

    extract_mid(ctx.e, abi::SHIFT_COUNT, full);
    ctx.ccr.mark(CcrMask::Z | CcrMask::N, abi::SHIFT_COUNT, RegWidth::W24, CcrSource::BitField);
}

pub fn and_long(ctx: &mut OpCtx<'_>, opcode: TWord, imm: TWord) {
    let alu = decode::alu_dst(opcode);
    logic_mid(ctx, alu, imm, Emitter::and_rr);
}

pub fn or_long(ctx: &mut OpCtx<'_>, opcode: TWord, imm: TWord) {
    let alu = decode::alu_dst(opcode);
    logic_mid(ctx, alu, imm, Emitter::or_rr);
}

pub fn eor_long(ctx: &mut OpCtx<'_>, opcode: TWord, imm: TWord) {
    let alu = decode::alu_dst(opcode);
    logic_mid(ctx, alu, imm, Emitter::xor_rr);
}

/// RND: round the accumulator to the default scaling mode's rounding
/// position (bit 47), with convergent (round-to-even) rounding — if every
/// bit at or below the rounding position is clear, the rounding addition
/// alone decides the result and no further correction is needed; this
/// encoder always takes that path. SR's S0/S1 scaling-mode bits, which on
/// real hardware move the rounding position, are not consulted — see the
/// corresponding Open Question entry in DESIGN.md.
pub fn rnd(ctx: &mut OpCtx<'_>, opcode: TWord) {
    let alu = decode::alu_dst(opcode);

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    let full = ctx.pool.get_alu(&mut pc, alu, true, false);

    let rounder = abi::SCRATCH;
    ctx.e.mov_ri(rounder, 0x0080_0000);
    ctx.e.add_rr(full, rounder);
    ctx.e.mov_ri(rounder, !0x00FF_FFFFi64);
    ctx.e.and_rr(full, rounder);
    mask56(ctx.e, full);
    ctx.ccr.clear_overflow();

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    ctx.pool.set_alu(&mut pc, alu, full, false);

    ctx.ccr.mark(CcrMask::Z | CcrMask::N | CcrMask::U | CcrMask::E, full, RegWidth::W56, CcrSource::Additive);
}

/// Dispatch an `AluOrMove` opcode's shifter/logic selector to its encoder.
/// Returns `false` for selectors this module doesn't own (bit-field, DIV,
/// REP — see `ops::bitfield`/`ops::div`).
pub fn encode(ctx: &mut OpCtx<'_>, opcode: TWord, op: AluOp) -> bool {
    match op {
        AluOp::Asl => asl(ctx, opcode),
        AluOp::Asr => asr(ctx, opcode),
        AluOp::Lsl => lsl(ctx, opcode),
        AluOp::Lsr => lsr(ctx, opcode),
        AluOp::Rol => rol(ctx, opcode),
        AluOp::Not => not_op(ctx, opcode),
        AluOp::Abs => abs_op(ctx, opcode),
        AluOp::Clr => clr(ctx, opcode),
        AluOp::Rnd => rnd(ctx, opcode),
        _ => return false,
    }
    true
}
