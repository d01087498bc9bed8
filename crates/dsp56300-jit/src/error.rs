//! Error taxonomy for translation-time and emission-time failures.
//!
//! Guest bus faults are deliberately absent from this enum: they are
//! delivered to the DSP as a hardware exception through the peripheral
//! callback and never surface to the host as a `Result::Err` (see the
//! error handling design notes).

use crate::types::TWord;

/// Translation- and emission-time failures.
///
/// All variants are block-granularity: a failure here never corrupts
/// already-installed blocks, and the interpreter is always a correct
/// fallback for the single instruction that failed to translate.
#[derive(Debug, thiserror::Error)]
pub enum JitError {
    /// The opcode at `pc` did not match any known instruction class.
    #[error("unknown opcode 0x{opcode:06x} at pc=0x{pc:06x}")]
    UnknownOpcode { pc: TWord, opcode: TWord },

    /// The opcode was recognized but this encoder does not yet implement it.
    #[error("unimplemented opcode 0x{opcode:06x} at pc=0x{pc:06x}")]
    Unimplemented { pc: TWord, opcode: TWord },

    /// The code arena ran out of space mid-emission.
    #[error("code arena exhausted while translating block at pc=0x{pc_first:06x}")]
    ArenaExhausted { pc_first: TWord },

    /// The host emitter rejected an encoding. This is a programmer error in
    /// an op encoder, not a guest condition, and is reported as a hard
    /// failure to the embedder.
    #[error("host emitter error: {0}")]
    Emit(String),
}

impl JitError {
    /// True for failures that are confined to block granularity and where
    /// the caller should fall back to the interpreter and retry translation.
    /// False for failures that should terminate emulation.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::UnknownOpcode { .. } | Self::Unimplemented { .. } | Self::ArenaExhausted { .. }
        )
    }
}

pub type JitResult<T> = Result<T, JitError>;
