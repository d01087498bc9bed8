//! Parallel-move encoders: the data move that rides alongside a data-ALU
//! opcode in the same 24-bit word, plus `MOVE L:` (the long-form memory move
//! that writes X and Y simultaneously from the same 48-bit accumulator
//! value).
//!
//! Grounded in `jitdspregs.cpp`'s `getALU0`/`getALU1`/Awrite/Bwrite dispatch
//! (the `pool().isParallelOp()` branch quoted in `pool::dsp`) for the
//! aliasing protocol, and in spec.md §4.3's example pair `OP src,dst | move
//! src2,dst2`. This crate's decoder (see `decode::move_field`) does not
//! resolve the full effective-address mode table the reference's `ea`
//! decode does, so the memory-addressed move classes here use the AGU
//! register's value directly (`R[agu]`), post-modified by `N[agu]` with no
//! modulo wraparound — the same flattened, linear-only simplification
//! `ops::bitfield` already takes for its single-addressing-mode bit-field
//! ops (see DESIGN.md's Open Questions).

use crate::abi;
use crate::decode;
use crate::emitter::HostReg;
use crate::ops::OpCtx;
use crate::regfile::DspReg;
use crate::types::{MemArea, TWord};

/// The parallel move's class, keyed off `decode::move_field`'s 4-bit
/// selector. Classes 1-4 are memory-addressed (read or write X/Y at an
/// AGU-selected, post-incremented address); 5-8 move an accumulator's full
/// value into X1/Y1, covering the accumulator-as-source case the
/// parallel-move aliasing property requires; 9-12 move the other direction,
/// X1/Y1 into an accumulator's middle field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MoveClass {
    ReadX,
    WriteX,
    ReadY,
    WriteY,
    MoveAToX1,
    MoveBToX1,
    MoveAToY1,
    MoveBToY1,
    MoveX1ToA,
    MoveX1ToB,
    MoveY1ToA,
    MoveY1ToB,
}

fn classify(field: u8) -> Option<MoveClass> {
    match field {
        1 => Some(MoveClass::ReadX),
        2 => Some(MoveClass::WriteX),
        3 => Some(MoveClass::ReadY),
        4 => Some(MoveClass::WriteY),
        5 => Some(MoveClass::MoveAToX1),
        6 => Some(MoveClass::MoveBToX1),
        7 => Some(MoveClass::MoveAToY1),
        8 => Some(MoveClass::MoveBToY1),
        9 => Some(MoveClass::MoveX1ToA),
        10 => Some(MoveClass::MoveX1ToB),
        11 => Some(MoveClass::MoveY1ToA),
        12 => Some(MoveClass::MoveY1ToB),
        _ => None,
    }
}

/// Compute the AGU-addressed effective address into `dst`, then post-modify
/// `R[agu]` by `N[agu]` (linear addressing; see module docs). `dst` receives
/// the address as it stood *before* the post-modify, matching the DSP's
/// post-increment semantics; `R[agu]`'s pool slot is left resident and
/// dirty with the updated value, written back at block finalize like any
/// other DSP register.
fn agu_post_modify(ctx: &mut OpCtx<'_>, agu: u8, dst: HostReg) {
    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    let r_host = ctx.pool.get(&mut pc, DspReg::R(agu), true, true);
    ctx.e.mov_rr(dst, r_host);

    let n = abi::SHIFT_COUNT;
    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    ctx.pool.get_n(&mut pc, n, agu);
    ctx.e.add_rr(r_host, n);
}

/// Read a 24-bit half (`hi = true` selects X1/Y1, `false` selects X0/Y0) out
/// of the 48-bit `X`/`Y` register named by `xy` (0 = X, 1 = Y).
fn read_half(ctx: &mut OpCtx<'_>, dst: HostReg, xy: usize, hi: bool) {
    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    ctx.pool.get_xy(&mut pc, dst, xy);
    if hi {
        ctx.e.shr_ri(dst, 24);
    } else {
        ctx.e.shl_ri(dst, 40);
        ctx.e.shr_ri(dst, 40);
    }
}

/// Write a 24-bit `value` into one half of the 48-bit `X`/`Y` register,
/// preserving the other half (read-modify-write, the same shape as
/// `ops::alu`'s `merge_mid`). Clobbers `value`; callers must not read it
/// afterwards. `value` must not be `abi::SHIFT_COUNT`, which this helper
/// uses to hold the 48-bit register being rebuilt.
fn write_half(ctx: &mut OpCtx<'_>, xy: usize, hi: bool, value: HostReg) {
    let full = abi::SHIFT_COUNT;
    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    ctx.pool.get_xy(&mut pc, full, xy);

    if hi {
        ctx.e.shl_ri(full, 40);
        ctx.e.shr_ri(full, 40);
        ctx.e.shl_ri(value, 24);
        ctx.e.or_rr(full, value);
    } else {
        ctx.e.shr_ri(full, 24);
        ctx.e.shl_ri(full, 24);
        ctx.e.or_rr(full, value);
    }

    let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
    ctx.pool.set_xy(&mut pc, xy, full);
}

/// Encode the parallel move half of an ALU-class opcode. Must run after the
/// ALU half has written its shadow slot (`DspRegPool::set_alu` with
/// `parallel_op` set) but before `DspRegPool::commit_parallel_move`, so a
/// move whose source is `A`/`B` observes the pre-op value (the primary
/// slot, not the shadow) exactly as spec.md §4.3's protocol requires.
///
/// Returns `false` for a move-field value this crate doesn't decode (the
/// translator treats that as `JitError::Unimplemented` for the whole
/// instruction, per the error-handling design's block-granularity policy).
pub fn encode(ctx: &mut OpCtx<'_>, opcode: TWord) -> bool {
    let Some(class) = classify(decode::move_field(opcode)) else { return false };
    let agu = decode::move_reg(opcode);

    match class {
        MoveClass::ReadX | MoveClass::ReadY => {
            let area = if class == MoveClass::ReadX { MemArea::X } else { MemArea::Y };
            let xy = usize::from(area == MemArea::Y);
            let addr = abi::SCRATCH;
            agu_post_modify(ctx, agu, addr);
            let value = abi::SHIFT_COUNT;
            ctx.mem.load_guest(ctx.e, value, area, addr);
            let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
            ctx.pool.set_xy(&mut pc, xy, value);
        }
        MoveClass::WriteX | MoveClass::WriteY => {
            let area = if class == MoveClass::WriteX { MemArea::X } else { MemArea::Y };
            let xy = usize::from(area == MemArea::Y);
            let addr = abi::SCRATCH;
            agu_post_modify(ctx, agu, addr);
            let value = abi::SHIFT_COUNT;
            let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
            ctx.pool.get_xy(&mut pc, value, xy);
            ctx.mem.store_guest(ctx.e, area, addr, value);
        }
        MoveClass::MoveAToX1 | MoveClass::MoveBToX1 | MoveClass::MoveAToY1 | MoveClass::MoveBToY1 => {
            let alu = usize::from(matches!(class, MoveClass::MoveBToX1 | MoveClass::MoveBToY1));
            let xy = usize::from(matches!(class, MoveClass::MoveAToY1 | MoveClass::MoveBToY1));
            let src = abi::SCRATCH;
            // Reads the primary A/B slot (pre-op value), never the
            // Awrite/Bwrite shadow the ALU half just wrote — the aliasing
            // guarantee spec.md §4.3 describes.
            let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
            ctx.pool.read_alu(&mut pc, src, alu);
            write_half(ctx, xy, true, src);
        }
        MoveClass::MoveX1ToA | MoveClass::MoveX1ToB | MoveClass::MoveY1ToA | MoveClass::MoveY1ToB => {
            let alu = usize::from(matches!(class, MoveClass::MoveX1ToB | MoveClass::MoveY1ToB));
            let xy = usize::from(matches!(class, MoveClass::MoveY1ToA | MoveClass::MoveY1ToB));
            let value = abi::SHIFT_COUNT;
            read_half(ctx, value, xy, true);

            // Merge `value` into bits 47..24 of the accumulator, preserving
            // bits 55..48 and 23..0 — the same mid-field round trip
            // `ops::bitfield::extractu` uses.
            let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
            let full = ctx.pool.get_alu(&mut pc, alu, true, false);
            let mask = abi::SCRATCH;
            ctx.e.mov_ri(mask, 0x00FF_0000_00FF_FFFFu64 as i64);
            ctx.e.and_rr(full, mask);
            ctx.e.mov_rr(mask, value);
            ctx.e.shl_ri(mask, 24);
            ctx.e.or_rr(full, mask);
            let mut pc = OpCtx::pool_ctx(ctx.e, ctx.mem);
            ctx.pool.set_alu(&mut pc, alu, full, false);
        }
    }
    true
}

/// `MOVE L:`: a long memory move that writes both `X` and `Y` cells at the
/// same AGU-addressed location from a 48-bit value split across two 24-bit
/// halves, per spec.md §4.7.
pub fn move_long(ctx: &mut OpCtx<'_>, agu: u8, hi: HostReg, lo: HostReg) {
    let addr = abi::SCRATCH;
    agu_post_modify(ctx, agu, addr);
    ctx.mem.store_guest(ctx.e, MemArea::X, addr, hi);
    ctx.mem.store_guest(ctx.e, MemArea::Y, addr, lo);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_every_supported_field() {
        assert_eq!(classify(1), Some(MoveClass::ReadX));
        assert_eq!(classify(4), Some(MoveClass::WriteY));
        assert_eq!(classify(8), Some(MoveClass::MoveBToY1));
        assert_eq!(classify(9), Some(MoveClass::MoveX1ToA));
        assert_eq!(classify(12), Some(MoveClass::MoveY1ToB));
        assert_eq!(classify(13), None);
        assert_eq!(classify(0), None);
    }
}
