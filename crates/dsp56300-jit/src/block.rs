//! The immutable, callable result of translation: a `Block`.

use bitflags::bitflags;

use crate::runtime::Runtime;
use crate::types::TWord;

bitflags! {
    /// Outcome flags recorded for a translated block, per the data model.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BlockFlags: u32 {
        const SUCCESS            = 0x0001;
        const WRITE_PMEM         = 0x0002;
        const LOOP_END           = 0x0004;
        const INSTRUCTION_LIMIT  = 0x0008;
    }
}

/// Signature of an emitted block's entry point: `(runtime, entry_pc, block)`.
pub type JitEntry = unsafe extern "C" fn(*mut Runtime, TWord, *const Block);

/// A contiguous run of translated DSP instructions, emitted as one callable
/// native routine. Immutable once `BlockTranslator::translate` returns it.
pub struct Block {
    /// Guest PC of the first instruction covered by this block.
    pub pc_first: TWord,
    /// Number of P-memory cells covered, i.e. `[pc_first, pc_first + p_mem_size)`.
    pub p_mem_size: TWord,
    /// Number of DSP instructions translated into this block.
    pub encoded_instruction_count: TWord,
    /// Size in words of the last encoded opcode (REP bookkeeping).
    pub last_op_size: TWord,
    /// The opcode word if this block encodes exactly one instruction
    /// (used for targeted invalidation of single-opcode blocks).
    pub single_op_word: Option<TWord>,
    pub flags: BlockFlags,
    /// Backing executable memory. Kept alive for as long as the block is
    /// reachable from the cache; dropping it would invalidate `entry`.
    pub(crate) code: dynasmrt::ExecutableBuffer,
    pub entry: JitEntry,
    /// Disassembly text, one line per encoded instruction. Only populated
    /// when the crate is built with the `diagnostics` feature.
    #[cfg(feature = "diagnostics")]
    pub disasm: String,
}

impl Block {
    #[must_use]
    pub const fn covers(&self, pc: TWord) -> bool {
        pc >= self.pc_first && pc < self.pc_first + self.p_mem_size
    }

    #[must_use]
    pub const fn is_single_op(&self) -> bool {
        self.single_op_word.is_some()
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block")
            .field("pc_first", &self.pc_first)
            .field("p_mem_size", &self.p_mem_size)
            .field("encoded_instruction_count", &self.encoded_instruction_count)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}
