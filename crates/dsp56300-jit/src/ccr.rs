//! Deferred CCR/SR machinery.
//!
//! The DSP's eight CCR bits are expensive to compute eagerly on every
//! arithmetic op, so their *commit to the SR memory cell* is deferred until
//! a reader needs them (a conditional branch, conditional execution, or an
//! explicit CCR read) or an explicit SR writer takes precedence and
//! discards them.
//!
//! Two of the eight bits — C and V — depend on host condition flags that
//! don't survive past the next host instruction, so those are captured
//! *immediately* after the producing op (via `setcc`) into a side-channel
//! host register holding already-CCR-bit-positioned contributions. The
//! remaining six — Z, N, U, E, L, S — are pure functions of the arithmetic
//! result's value and width, so they are recomputed lazily at commit time
//! straight from `result_reg`, per the "deferred CCR as state machine"
//! design note.

use bitflags::bitflags;

use crate::emitter::{Emitter, HostCond, HostReg};
use crate::regfile::{ccr_bit, RegWidth};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CcrMask: u8 {
        const C = 1 << ccr_bit::C;
        const V = 1 << ccr_bit::V;
        const Z = 1 << ccr_bit::Z;
        const N = 1 << ccr_bit::N;
        const U = 1 << ccr_bit::U;
        const E = 1 << ccr_bit::E;
        const L = 1 << ccr_bit::L;
        const S = 1 << ccr_bit::S;
    }
}

/// Which family of derivation rule V follows. Bit-field ops always clear V;
/// shifts derive it by shifting back and comparing; additive ops take the
/// host overflow flag directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CcrSource {
    Additive,
    ShiftLeft,
    ShiftRight,
    BitField,
}

/// State of the not-yet-committed CCR bits for one block-local arithmetic
/// result.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeferredCcr {
    dirty: CcrMaskOpt,
    /// Host register holding already-computed, already-positioned C/V
    /// contributions (0 in all other bit positions). `None` if neither C
    /// nor V is currently dirty.
    pending: Option<HostReg>,
    result_reg: Option<HostReg>,
    width: Option<RegWidth>,
    source: Option<CcrSource>,
}

/// `CcrMask` isn't `Default` (bitflags types require an explicit `empty()`),
/// so this thin wrapper gives `DeferredCcr` a `#[derive(Default)]`.
#[derive(Debug, Clone, Copy)]
struct CcrMaskOpt(CcrMask);
impl Default for CcrMaskOpt {
    fn default() -> Self {
        Self(CcrMask::empty())
    }
}

impl DeferredCcr {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_dirty(&self, bits: CcrMask) -> bool {
        self.dirty.0.intersects(bits)
    }

    /// True if any bit is still deferred. The translator consults this
    /// before emitting an instruction that reuses the fixed scratch
    /// registers a pending derivation's `pending`/`result_reg` might still
    /// be sitting in (`abi::SHIFT_COUNT`/`abi::SCRATCH`), to force a commit
    /// first rather than let that instruction silently clobber them.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.dirty.0.is_empty()
    }

    /// Record that `bits` now depend on `result_reg`'s value (width/source
    /// needed for the lazy Z/N/U/E derivation), clearing whatever was
    /// previously dirty for those bits. Called once per arithmetic encoder.
    pub fn mark(&mut self, bits: CcrMask, result_reg: HostReg, width: RegWidth, source: CcrSource) {
        self.dirty.0.insert(bits);
        self.result_reg = Some(result_reg);
        self.width = Some(width);
        self.source = Some(source);
    }

    /// Capture the host carry flag into the pending C contribution.
    /// Must be emitted immediately after the instruction that set it.
    pub fn capture_carry(&mut self, e: &mut Emitter, scratch: HostReg) {
        self.capture_flag(e, scratch, HostCond::Carry, CcrMask::C.bits());
        self.dirty.0.insert(CcrMask::C);
    }

    /// Capture the host overflow condition into the pending V contribution,
    /// also landing copies of it in the L and S sticky-bit positions (both
    /// are defined as "set whenever V is set").
    pub fn capture_overflow(&mut self, e: &mut Emitter, scratch: HostReg, cond: HostCond) {
        self.capture_flag(e, scratch, cond, (CcrMask::V | CcrMask::L | CcrMask::S).bits());
        self.dirty.0.insert(CcrMask::V | CcrMask::L | CcrMask::S);
    }

    /// Unconditionally clear V (used by bit-field ops and AND/OR/EOR,
    /// which per spec always clear V rather than deriving it).
    pub fn clear_overflow(&mut self) {
        self.dirty.0.remove(CcrMask::V);
        // V itself is clear; L/S stay sticky (unaffected) by definition.
    }

    /// Capture a host condition into every bit position set in `mask`.
    /// `setcc` only ever produces a 0/1 value in `scratch`'s low byte;
    /// negating a 0/1 value turns 1 into all-ones and leaves 0 as 0, so
    /// ANDing with `mask` spreads that single bit into every requested
    /// position in one pass, without needing a register per position.
    fn capture_flag(&mut self, e: &mut Emitter, scratch: HostReg, cond: HostCond, mask: u8) {
        e.setcc(cond, scratch);
        e.neg_r(scratch);
        e.and_ri(scratch, i64::from(mask));
        match self.pending {
            Some(p) if p.0 == scratch.0 => {}
            Some(p) => e.or_rr(p, scratch),
            None => self.pending = Some(scratch),
        }
    }

    /// Emit the deferred derivation for every dirty bit and OR it into
    /// `sr`. Clears `dirty`. No-op if nothing is dirty.
    pub fn commit(&mut self, e: &mut Emitter, sr: HostReg, scratch: HostReg) {
        if self.dirty.0.is_empty() {
            return;
        }

        if let Some(pending) = self.pending.filter(|_| self.dirty.0.intersects(CcrMask::C | CcrMask::V)) {
            e.or_rr(sr, pending);
        }

        if self.dirty.0.intersects(CcrMask::L | CcrMask::S) {
            // Sticky: L/S are only ever set, never cleared, by this path.
            // `capture_overflow` already spread the captured condition into
            // their bit positions in `pending` alongside V, so the OR above
            // has already applied them — nothing further to derive here.
        }

        if let (Some(result), Some(width)) = (self.result_reg, self.width) {
            if self.dirty.0.contains(CcrMask::Z) {
                derive_z(e, result, scratch, width);
                e.or_rr(sr, scratch);
            }
            if self.dirty.0.contains(CcrMask::N) {
                derive_n(e, result, scratch, width);
                e.or_rr(sr, scratch);
            }
            if self.dirty.0.contains(CcrMask::U) {
                derive_u(e, result, scratch);
                e.or_rr(sr, scratch);
            }
            if self.dirty.0.contains(CcrMask::E) {
                derive_e(e, result, scratch);
                e.or_rr(sr, scratch);
            }
        }

        self.dirty.0 = CcrMask::empty();
        self.pending = None;
    }

    /// An explicit writer of the full CCR/SR takes precedence: discard
    /// every pending derivation without committing it.
    pub fn discard(&mut self) {
        self.dirty.0 = CcrMask::empty();
        self.pending = None;
        self.result_reg = None;
    }
}

/// Z = zero flag over the value's width (bits 47..0 for 24/48-bit reads,
/// bits 55..0 for 56-bit). Leaves the Z-positioned bit in `scratch`.
fn derive_z(e: &mut Emitter, result: HostReg, scratch: HostReg, width: RegWidth) {
    let _ = width; // the result register is already masked to its width by the producing op
    e.cmp_ri(result, 0);
    e.setcc(HostCond::Zero, scratch);
    e.shl_ri(scratch, ccr_bit::Z as u8);
}

/// N = sign bit: bit 55 of a 56-bit accumulator, bit 23 of a 24-bit value.
fn derive_n(e: &mut Emitter, result: HostReg, scratch: HostReg, width: RegWidth) {
    let bit = match width {
        RegWidth::W56 => 55,
        RegWidth::W48 => 47,
        RegWidth::W24 => 23,
    };
    e.mov_rr(scratch, result);
    e.bt_ri(scratch, bit);
    e.setcc(HostCond::Carry, scratch);
    e.shl_ri(scratch, ccr_bit::N as u8);
}

/// U = ~(bit47 ^ bit46), computed as the host parity flag over the
/// extracted two-bit field: equal bits (00 or 11) set an even popcount,
/// which is exactly `U`.
fn derive_u(e: &mut Emitter, result: HostReg, scratch: HostReg) {
    e.mov_rr(scratch, result);
    e.shr_ri(scratch, 46);
    e.and_ri(scratch, 0x3);
    e.test_rr(scratch, scratch);
    e.setcc(HostCond::ParityEven, scratch);
    e.shl_ri(scratch, ccr_bit::U as u8);
}

/// E = extension: set when bits 55..47 are neither all-0 nor all-1.
fn derive_e(e: &mut Emitter, result: HostReg, scratch: HostReg) {
    e.mov_rr(scratch, result);
    e.shr_ri(scratch, 47);
    e.and_ri(scratch, 0x1FF);
    // scratch == 0 or scratch == 0x1FF both mean "no extension" (E clear).
    // (scratch + 1) & 0x1FE is zero at exactly those two extremes (0 -> 1,
    // 0x1FF -> 0x200) and non-zero everywhere else.
    e.add_ri(scratch, 1);
    e.and_ri(scratch, 0x1FE);
    e.cmp_ri(scratch, 0);
    e.setcc(HostCond::NotZero, scratch);
    e.shl_ri(scratch, ccr_bit::E as u8);
}
