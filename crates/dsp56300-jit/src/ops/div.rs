//! DIV: one non-restoring-division step per invocation, plus REP-chained
//! unrolled iteration.
//!
//! Grounded in `jitops_alu_x64.inl`'s `op_Div`/`op_Rep_Div`. Each iteration:
//! sign-compares the accumulator against the shifted source operand, shifts
//! the accumulator left by one bit, then adds or subtracts the source
//! depending on that sign comparison; C takes the inverted top bit of the
//! result. V/L only update on the *first* iteration of a REP-chained run —
//! a bare `DIV` is its own first (and only) iteration.
//!
//! The reference's REP-DIV carries an explicitly commented-out
//! power-of-two fast path the reference itself marks broken; per the Open
//! Question resolution in DESIGN.md, this crate never implements it —
//! `rep_div` always takes the general unrolled path since `decode::rep_count`
//! is a compile-time-known immediate.

use crate::abi;
use crate::ccr::{CcrMask, CcrSource};
use crate::decode;
use crate::emitter::{Emitter, HostCond, HostReg};
use crate::ops::OpCtx;
use crate::regfile::RegWidth;
use crate::types::TWord;

fn mask56(e: &mut Emitter, r: HostReg) {
    e.shl_ri(r, 8);
    e.shr_ri(r, 8);
}

/// Load DIV's `JJ`-selected source operand (X0/X1/Y0/Y1) into `dst`,
/// shifted so its sign lines up with the accumulator's bit 55.
fn load_source(ctx: &mut OpCtx<'_>, opcode: TWord, dst: HostReg) {
    let jj = decode::jj_field(opcode);
    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    ctx.pool.get_xy(&mut pc, dst, usize::from(jj >= 2));
    if jj % 2 == 1 {
        ctx.e.shr_ri(dst, 24);
    }
    ctx.e.shl_ri(dst, 40);
    ctx.e.shr_ri(dst, 16);
}

/// One full division iteration: reload the JJ operand, sign-compare it
/// against the pre-shift accumulator, shift the accumulator left one bit,
/// add or subtract the operand depending on the sign comparison, then
/// capture C (and, on the first iteration of a run, V) from the result.
fn step(ctx: &mut OpCtx<'_>, opcode: TWord, alu: usize, first: bool) {
    let operand = abi::SHIFT_COUNT;
    load_source(ctx, opcode, operand);

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    let full = ctx.pool.get_alu(&mut pc, alu, true, false);

    ctx.e.mov_rr(abi::SCRATCH, full);
    ctx.e.xor_rr(abi::SCRATCH, operand);
    ctx.e.bt_ri(abi::SCRATCH, 55);

    ctx.e.shl_ri(full, 1);

    let add_label = ctx.e.label();
    let done_label = ctx.e.label();
    ctx.e.jcc(HostCond::Carry, add_label);
    ctx.e.sub_rr(full, operand);
    ctx.e.jmp(done_label);
    ctx.e.bind(add_label);
    ctx.e.add_rr(full, operand);
    ctx.e.bind(done_label);

    mask56(ctx.e, full);

    if first {
        let check = abi::SCRATCH;
        ctx.e.mov_rr(check, full);
        ctx.e.shr_ri(check, 54);
        ctx.e.and_ri(check, 0x3);
        ctx.e.cmp_ri(check, 0x1);
        ctx.ccr.capture_overflow(ctx.e, check, HostCond::Eq);
    }

    ctx.e.bt_ri(full, 55);
    ctx.ccr.capture_carry(ctx.e, abi::SCRATCH);

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    ctx.pool.set_alu(&mut pc, alu, full, false);
}

/// `DIV`: a single division step.
pub fn div(ctx: &mut OpCtx<'_>, opcode: TWord) {
    let alu = decode::alu_dst(opcode);
    step(ctx, opcode, alu, true);

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    let full = ctx.pool.get_alu(&mut pc, alu, true, false);
    ctx.ccr.mark(CcrMask::Z | CcrMask::N, full, RegWidth::W56, CcrSource::Additive);
}

/// `REP #n / DIV`: `count` division steps unrolled at translation time.
/// Only the first step touches V/L.
pub fn rep_div(ctx: &mut OpCtx<'_>, opcode: TWord, count: TWord) {
    let alu = decode::alu_dst(opcode);
    for i in 0..count {
        step(ctx, opcode, alu, i == 0);
    }

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    let full = ctx.pool.get_alu(&mut pc, alu, true, false);
    ctx.ccr.mark(CcrMask::Z | CcrMask::N, full, RegWidth::W56, CcrSource::Additive);
}
