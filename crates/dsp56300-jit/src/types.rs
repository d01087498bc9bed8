//! Shared scalar types.

/// A 24-bit DSP word, stored in the low 24 bits of a `u32`.
pub type TWord = u32;

/// One of the DSP's three 24-bit-cell memory arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemArea {
    X,
    Y,
    P,
}

/// A DSP condition code, as encoded in the `CCCC` field of `Jcc`/`Scc`-style
/// opcodes. Mirrors the six comparison predicates from the testable
/// properties section: exactly one of LT/EQ/GT holds; LE = LT∨EQ;
/// GE = GT∨EQ; NE = ¬EQ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Cc,
    Cs,
    Eq,
    Ne,
    Ge,
    Lt,
    Gt,
    Le,
    Mi,
    Pl,
    Nr,
    Er,
    Ls,
    Gs,
    Ec,
    Ev,
}
