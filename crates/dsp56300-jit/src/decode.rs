//! Opcode field extraction.
//!
//! The DSP56300 encodes every instruction as one or two 24-bit words. This
//! module pulls the fixed-position sub-fields (opcode class, operand
//! registers, ALU/shifter selector, immediate/displacement) out of the
//! first word; the handful of instruction classes that consume a second
//! word (long absolute moves, long immediates) read it from the block's
//! fetch cursor directly in their op encoder, since the extension word
//! carries no sub-fields of its own.

use crate::types::TWord;

/// Top-level instruction class, selected by the two most significant bits
/// of the opcode word, mirroring the reference decoder's first dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass {
    /// Bit patterns `00` — ALU, bit-field, and loop instructions that carry
    /// a parallel data move in the low bits.
    AluOrMove,
    /// Bit pattern `01` — long absolute/immediate moves (MOVE L:, two-word
    /// immediate loads).
    LongMove,
    /// Bit pattern `10` — program control: Jcc/JMP/JSR/BSR/RTS, DO/DOR/ENDDO.
    Control,
    /// Bit pattern `11` — reserved / unimplemented in this crate.
    Reserved,
}

#[must_use]
pub const fn op_class(opcode: TWord) -> OpClass {
    match (opcode >> 22) & 0b11 {
        0b00 => OpClass::AluOrMove,
        0b01 => OpClass::LongMove,
        0b10 => OpClass::Control,
        _ => OpClass::Reserved,
    }
}

/// The 8-bit ALU/shifter operation selector, bits 21..14.
#[must_use]
pub const fn alu_op(opcode: TWord) -> u8 {
    ((opcode >> 14) & 0xFF) as u8
}

/// Destination accumulator selector for single-operand ALU ops (bit 3:
/// 0 = A, 1 = B), the position the reference ALU instruction template
/// (`jitops_alu_x64.inl`) consistently uses for `d`.
#[must_use]
pub const fn alu_dst(opcode: TWord) -> usize {
    usize::from((opcode >> 3) & 1)
}

/// Shift/rotate count field for ASL/ASR/LSL/LSR/ROL/ROR's immediate form,
/// bits 8..4 (5 bits, 0-31) — deliberately one bit narrower than a 24-bit
/// register width's full range so it never overlaps bit 9, the
/// register-vs-immediate flag `shift_count_is_reg` reads.
#[must_use]
pub const fn shift_count(opcode: TWord) -> u8 {
    ((opcode >> 4) & 0x1F) as u8
}

/// True when the shift/rotate count is register-held (R2) rather than an
/// immediate — bit 9.
#[must_use]
pub const fn shift_count_is_reg(opcode: TWord) -> bool {
    (opcode >> 9) & 1 != 0
}

/// Bit-field instructions (BTST/BSET/BCLR/BCHG) encode the target bit
/// number in bits 4..0 and the addressing-mode selector in bits 13..10.
#[must_use]
pub const fn bitfield_bit(opcode: TWord) -> u8 {
    (opcode & 0x1F) as u8
}

#[must_use]
pub const fn bitfield_mode(opcode: TWord) -> u8 {
    ((opcode >> 10) & 0xF) as u8
}

/// EXTRACTU/EXTRACTU_CO's width field, bits 10..6 (5 bits, max 31 — still
/// well above the 24-bit accumulator field this ever extracts). One bit
/// narrower than the control word's full width/offset split would otherwise
/// give it, so bit 11 stays free for `extract_src_alt`.
#[must_use]
pub const fn extract_width(opcode: TWord) -> u8 {
    ((opcode >> 6) & 0x1F) as u8
}

#[must_use]
pub const fn extract_offset(opcode: TWord) -> u8 {
    (opcode & 0x3F) as u8
}

/// True when EXTRACTU takes its control word from an immediate (bit 12,
/// the `_CO` — "control word" — variant) rather than from a register.
#[must_use]
pub const fn extract_co(opcode: TWord) -> bool {
    (opcode >> 12) & 1 != 0
}

/// True when EXTRACTU's source operand is `X1`/`Y1` rather than an
/// accumulator (bit 13 — otherwise unused by this opcode class, since
/// EXTRACTU never carries a parallel move and so never consults the move
/// field's bit range). See `extract_src_alt` for which register within
/// that choice.
#[must_use]
pub const fn extract_src_is_xy(opcode: TWord) -> bool {
    (opcode >> 13) & 1 != 0
}

/// Selects within EXTRACTU's source-operand choice (bit 11, freed up by
/// `extract_width`'s 5-bit field): `Y1` vs `X1` when the source is
/// `X1`/`Y1`, or accumulator `B` vs `A` when the source is an accumulator.
#[must_use]
pub const fn extract_src_alt(opcode: TWord) -> bool {
    (opcode >> 11) & 1 != 0
}

/// AGU index (R/N/M triple) referenced by an effective-address field,
/// bits 2..0.
#[must_use]
pub const fn agu_index(opcode: TWord) -> u8 {
    (opcode & 0x7) as u8
}

/// `CCCC` condition field for conditional branches/moves, bits 11..8 (the
/// position the reference `decode_CCCC` helper and `unittests.cpp`'s Jcc
/// vectors consistently use).
#[must_use]
pub const fn cccc(opcode: TWord) -> u8 {
    ((opcode >> 8) & 0xF) as u8
}

/// Parallel-move field for ALU instructions that also carry a data move:
/// bits 13..10 select the move's class, bits 2..0 its register operand.
#[must_use]
pub const fn move_field(opcode: TWord) -> u8 {
    ((opcode >> 10) & 0xF) as u8
}

#[must_use]
pub const fn move_reg(opcode: TWord) -> u8 {
    (opcode & 0x7) as u8
}

/// True for an ALU opcode that carries a parallel move (the move field is
/// non-zero), gating `DspRegPool`'s Awrite/Bwrite shadow-slot protocol.
#[must_use]
pub const fn has_parallel_move(opcode: TWord) -> bool {
    move_field(opcode) != 0
}

/// The specific ALU/shifter/bit-field/loop operation an `AluOrMove` opcode
/// selects, keyed off `alu_op`'s 8-bit field. Each op encoder module (see
/// `ops`) owns one or more variants of this enum's dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Asl,
    Asr,
    Lsl,
    Lsr,
    Rol,
    Not,
    Abs,
    Clr,
    And,
    Or,
    Eor,
    Rnd,
    Div,
    Rep,
    ExtractU,
    Btst,
    Bset,
    Bclr,
    Bchg,
}

#[must_use]
pub const fn alu_op_kind(opcode: TWord) -> Option<AluOp> {
    match alu_op(opcode) {
        0x01 => Some(AluOp::Asl),
        0x02 => Some(AluOp::Asr),
        0x03 => Some(AluOp::Lsl),
        0x04 => Some(AluOp::Lsr),
        0x05 => Some(AluOp::Rol),
        0x06 => Some(AluOp::Not),
        0x07 => Some(AluOp::Abs),
        0x08 => Some(AluOp::Clr),
        0x09 => Some(AluOp::And),
        0x0A => Some(AluOp::Or),
        0x0B => Some(AluOp::Eor),
        0x0C => Some(AluOp::Rnd),
        0x0D => Some(AluOp::Div),
        0x0E => Some(AluOp::Rep),
        0x0F => Some(AluOp::ExtractU),
        0x10 => Some(AluOp::Btst),
        0x11 => Some(AluOp::Bset),
        0x12 => Some(AluOp::Bclr),
        0x13 => Some(AluOp::Bchg),
        _ => None,
    }
}

/// DIV's `JJ` source-operand selector, bits 13..12 (0=X0, 1=X1, 2=Y0,
/// 3=Y1). Safe to overlap the parallel-move field's bit range: DIV never
/// carries a parallel move on real hardware, so the two interpretations
/// never apply to the same opcode.
#[must_use]
pub const fn jj_field(opcode: TWord) -> u8 {
    ((opcode >> 12) & 0x3) as u8
}

/// REP's iteration count, bits 13..0 (the repeated opcode follows as the
/// next P-memory word). Deliberately narrower than `do_count_imm`'s 16 bits:
/// `alu_op` occupies bits 21..14, and the `Rep` selector value (0x0E) has
/// bit 15 set, so a 16-bit mask here would fold that selector bit into the
/// count of every REP opcode. 14 bits keeps the two fields disjoint and
/// still covers any realistic loop count.
#[must_use]
pub const fn rep_count(opcode: TWord) -> TWord {
    opcode & 0x3FFF
}

/// Program-control sub-opcode selector, bits 21..18 of a `Control`-class
/// word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOp {
    Jmp,
    Jcc,
    Jsr,
    Bsr,
    Rts,
    Rti,
    Do,
    Dor,
    Enddo,
}

#[must_use]
pub const fn control_op_kind(opcode: TWord) -> Option<ControlOp> {
    match (opcode >> 18) & 0xF {
        0 => Some(ControlOp::Jmp),
        1 => Some(ControlOp::Jcc),
        2 => Some(ControlOp::Jsr),
        3 => Some(ControlOp::Bsr),
        4 => Some(ControlOp::Rts),
        5 => Some(ControlOp::Rti),
        6 => Some(ControlOp::Do),
        7 => Some(ControlOp::Dor),
        8 => Some(ControlOp::Enddo),
        _ => None,
    }
}

/// DO's immediate loop count, bits 15..0 (immediate form only; DOR reads
/// its count from the AGU register selected by `agu_index`).
#[must_use]
pub const fn do_count_imm(opcode: TWord) -> TWord {
    opcode & 0xFFFF
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_selector_covers_all_four_quadrants() {
        assert_eq!(op_class(0b00 << 22), OpClass::AluOrMove);
        assert_eq!(op_class(0b01 << 22), OpClass::LongMove);
        assert_eq!(op_class(0b10 << 22), OpClass::Control);
        assert_eq!(op_class(0b11 << 22), OpClass::Reserved);
    }

    #[test]
    fn alu_dst_selects_a_or_b() {
        assert_eq!(alu_dst(0), 0);
        assert_eq!(alu_dst(0b1000), 1);
    }

    #[test]
    fn shift_count_is_independent_of_reg_flag() {
        let opcode = (1 << 9) | (5 << 4);
        assert!(shift_count_is_reg(opcode));
        assert_eq!(shift_count(opcode), 5);
    }
}
