//! Block-at-a-time translation: decode a contiguous run of guest
//! instructions starting at a PC and emit one callable native routine.
//!
//! `BlockTranslator::translate` runs the instruction loop twice. The first
//! ("dry") pass assembles the whole body against throwaway pools purely to
//! learn which callee-save host registers get touched; the second ("real")
//! pass then knows the final prologue shape before it emits the first byte
//! of the body, per `stack::StackHelper`'s documented design. Both passes
//! walk the identical decode path over the identical PCs, so they always
//! agree on where the block ends.
//!
//! Every control-transfer encoder in `ops::control`/`ops::loop_ops` writes
//! `Runtime::next_pc` and jumps to a shared epilogue label the translator
//! binds once, after the body: that's where the deferred CCR commit,
//! register writeback, and AGU `M[i]` write replay happen, regardless of
//! which of the six termination conditions ended the block.

use crate::abi;
use crate::block::{Block, BlockFlags};
use crate::cache::BlockCache;
use crate::ccr::DeferredCcr;
use crate::decode::{self, AluOp, ControlOp, OpClass};
use crate::emitter::{Emitter, HostCond, Label};
use crate::error::{JitError, JitResult};
use crate::mem::MemEmitter;
use crate::ops::{alu, bitfield, control, div, loop_ops, move_ops, OpCtx};
use crate::pool::{DspRegPool, PhysPool};
use crate::runtime::DspCore;
use crate::stack::StackHelper;
use crate::types::{MemArea, TWord};

/// Instruction count a block may encode before translation stops
/// unconditionally, per the `INSTRUCTION_LIMIT` termination condition.
const DEFAULT_INSTRUCTION_LIMIT: TWord = 0x80;

/// Emitted-bytes budget a block may consume before translation aborts with
/// `JitError::ArenaExhausted` — generous enough that `DEFAULT_INSTRUCTION_LIMIT`
/// ordinary instructions always finish well under it; exists to bound a
/// single block's native-code footprint, not to be hit in normal operation.
const DEFAULT_MAX_ARENA_BYTES: usize = 1 << 20;

/// Translates one block at a time from guest program memory into native
/// code, per `DspCore`/`DspMemory`.
pub struct BlockTranslator {
    instruction_limit: TWord,
    max_arena_bytes: usize,
}

impl Default for BlockTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockTranslator {
    #[must_use]
    pub const fn new() -> Self {
        Self { instruction_limit: DEFAULT_INSTRUCTION_LIMIT, max_arena_bytes: DEFAULT_MAX_ARENA_BYTES }
    }

    #[must_use]
    pub const fn with_instruction_limit(instruction_limit: TWord) -> Self {
        Self { instruction_limit, ..Self::new() }
    }

    /// Cap a single block's emitted-code size. On exceeding it, `translate`
    /// fails with `JitError::ArenaExhausted` rather than emitting an
    /// unbounded amount of native code; per spec, flushing the code arena,
    /// clearing the cache, and retrying translation from `pc_first` is the
    /// embedder's responsibility, not this crate's — `translate` itself
    /// never touches `cache` beyond reading it.
    #[must_use]
    pub const fn with_max_arena_bytes(max_arena_bytes: usize) -> Self {
        Self { max_arena_bytes, ..Self::new() }
    }

    /// Translate the block starting at `pc_first`. Does not touch `cache`
    /// beyond reading it for the cache-straddle and volatile-region
    /// termination checks — installing the result is the caller's job.
    pub fn translate<C: DspCore>(&self, core: &mut C, cache: &BlockCache, pc_first: TWord) -> JitResult<Block> {
        let mut dry_e = Emitter::new()?;
        let dry_epilogue = dry_e.label();
        let mut dry_pool = DspRegPool::new(PhysPool::new(abi::allocatable_gp()));
        let mut dry_ccr = DeferredCcr::new();
        let dry_mem = MemEmitter::new(abi::REGS_BASE, [abi::MEM_BASE_X, abi::MEM_BASE_Y, abi::MEM_BASE_P]);
        self.emit_body(core, cache, pc_first, &mut dry_e, &mut dry_pool, &mut dry_ccr, &dry_mem, dry_epilogue, false)?;
        let touched: Vec<_> = dry_pool.touched_callee_save().to_vec();

        let mut e = Emitter::new()?;
        let body_start = e.offset();
        let epilogue = e.label();

        let mut stack = StackHelper::new();
        for reg in touched {
            stack.notify_acquired(reg);
        }
        stack.emit_prologue(&mut e);

        e.mov_rr(abi::RUNTIME_BASE, abi::ABI_ARG0);
        let regs_ptr = core.regs_mut() as *mut _ as i64;
        e.mov_ri(abi::REGS_BASE, regs_ptr);
        let x_ptr = core.memory_mut().bridged_memory_address(MemArea::X) as i64;
        e.mov_ri(abi::MEM_BASE_X, x_ptr);
        let y_ptr = core.memory_mut().bridged_memory_address(MemArea::Y) as i64;
        e.mov_ri(abi::MEM_BASE_Y, y_ptr);
        let p_ptr = core.memory_mut().bridged_memory_address(MemArea::P) as i64;
        e.mov_ri(abi::MEM_BASE_P, p_ptr);

        let mut pool = DspRegPool::new(PhysPool::new(abi::allocatable_gp()));
        let mut ccr = DeferredCcr::new();
        let mem = MemEmitter::new(abi::REGS_BASE, [abi::MEM_BASE_X, abi::MEM_BASE_Y, abi::MEM_BASE_P]);

        let info = self.emit_body(
            core,
            cache,
            pc_first,
            &mut e,
            &mut pool,
            &mut ccr,
            &mem,
            epilogue,
            cfg!(feature = "diagnostics"),
        )?;

        e.bind(epilogue);
        {
            let mut pc_ctx = OpCtx::pool_ctx(&mut e, &mem);
            let sr = pool.get_sr(&mut pc_ctx, true, true);
            ccr.commit(&mut e, sr, abi::SCRATCH);
        }
        {
            let mut pc_ctx = OpCtx::pool_ctx(&mut e, &mem);
            pool.writeback_all(&mut pc_ctx);
        }
        for (agu, value) in pool.drain_m_writes() {
            core.set_m(agu, value);
        }

        stack.emit_epilogue(&mut e);
        e.ret();

        let code = e.finalize()?;
        let entry_ptr = code.ptr(body_start);
        let entry = unsafe { std::mem::transmute::<*const u8, crate::block::JitEntry>(entry_ptr) };

        Ok(Block {
            pc_first,
            p_mem_size: info.p_mem_size,
            encoded_instruction_count: info.encoded_instruction_count,
            last_op_size: info.last_op_size,
            single_op_word: info.single_op_word,
            flags: info.flags,
            code,
            entry,
            #[cfg(feature = "diagnostics")]
            disasm: info.disasm,
        })
    }

    /// Emit one block body, starting at `pc_first`. Every control-transfer
    /// op jumps to `epilogue` itself; this only writes `Runtime::next_pc`
    /// without jumping for the termination conditions that aren't
    /// themselves a control-transfer instruction (cache straddle, volatile
    /// region, instruction limit) — those fall straight through into the
    /// `epilogue` binding the caller emits right after this returns.
    #[allow(clippy::too_many_arguments)]
    fn emit_body<C: DspCore>(
        &self,
        core: &mut C,
        cache: &BlockCache,
        pc_first: TWord,
        e: &mut Emitter,
        pool: &mut DspRegPool,
        ccr: &mut DeferredCcr,
        mem: &MemEmitter,
        epilogue: Label,
        collect_disasm: bool,
    ) -> JitResult<BodyInfo> {
        let mut pc = pc_first;
        let mut count: TWord = 0;
        let mut last_op_size: TWord = 1;
        let mut first_opcode: Option<TWord> = None;
        let mut flags = BlockFlags::SUCCESS;
        let mut pending_loops: Vec<(TWord, TWord)> = Vec::new();
        let mut disasm = String::new();
        let mut needs_write_next_pc = true;

        'body: loop {
            if cache.lookup(pc).is_some() || cache.volatile_pcs().contains(&pc) {
                break 'body;
            }

            // Every instruction below reuses the fixed `SHIFT_COUNT`/
            // `SCRATCH` registers a still-pending CCR derivation's `pending`
            // or `result_reg` may be sitting in (control-transfer ops for
            // their target-PC/hardware-stack arithmetic, DO/DOR/ENDDO for
            // their loop-frame packing, ordinary ALU ops for their own
            // operands). Commit first so nothing downstream silently
            // overwrites a bit this block still owes `SR`.
            if ccr.has_pending() {
                let mut pc_ctx = OpCtx::pool_ctx(e, mem);
                let sr = pool.get_sr(&mut pc_ctx, true, true);
                ccr.commit(e, sr, abi::SCRATCH);
            }

            if let Some(&(end_pc, body_pc)) = pending_loops.iter().rev().find(|&&(end, _)| end == pc) {
                let dst = abi::SHIFT_COUNT;
                {
                    let mut ctx = OpCtx { pool: &mut *pool, e: &mut *e, mem, ccr: &mut *ccr };
                    loop_ops::decrement_lc(&mut ctx, dst);
                }
                e.cmp_ri(dst, 0);
                let keep_looping = e.label();
                e.jcc(HostCond::NotZero, keep_looping);
                {
                    let mut ctx = OpCtx { pool: &mut *pool, e: &mut *e, mem, ccr: &mut *ccr };
                    loop_ops::enddo(&mut ctx);
                    control::write_next_pc(&mut ctx, pc);
                }
                e.jmp(epilogue);
                e.bind(keep_looping);
                {
                    let mut ctx = OpCtx { pool: &mut *pool, e: &mut *e, mem, ccr: &mut *ccr };
                    control::write_next_pc(&mut ctx, body_pc);
                }
                e.jmp(epilogue);
                flags |= BlockFlags::LOOP_END;
                needs_write_next_pc = false;
                break 'body;
            }

            if count >= self.instruction_limit {
                flags |= BlockFlags::INSTRUCTION_LIMIT;
                break 'body;
            }

            if e.offset().0 >= self.max_arena_bytes {
                return Err(JitError::ArenaExhausted { pc_first });
            }

            let opcode = fetch(core, pc);
            if first_opcode.is_none() {
                first_opcode = Some(opcode);
            }
            if collect_disasm {
                disasm.push_str(&format!("{pc:06x}: {opcode:06x}\n"));
            }

            let mut op_size: TWord = 1;
            let mut is_control_exit = false;

            match decode::op_class(opcode) {
                OpClass::AluOrMove => {
                    let Some(op) = decode::alu_op_kind(opcode) else {
                        return Err(JitError::UnknownOpcode { pc, opcode });
                    };
                    encode_alu_or_move(core, pool, e, mem, ccr, pc, opcode, op, &mut op_size)?;
                }
                OpClass::LongMove => {
                    encode_long_move(pool, e, mem, ccr, opcode);
                }
                OpClass::Control => {
                    let Some(kind) = control::kind(opcode) else {
                        return Err(JitError::UnknownOpcode { pc, opcode });
                    };
                    is_control_exit = encode_control(
                        core,
                        pool,
                        e,
                        mem,
                        ccr,
                        epilogue,
                        pc,
                        opcode,
                        kind,
                        &mut op_size,
                        &mut pending_loops,
                    );
                }
                OpClass::Reserved => return Err(JitError::UnknownOpcode { pc, opcode }),
            }

            count += 1;
            pc = pc.wrapping_add(op_size);
            last_op_size = op_size;

            if is_control_exit {
                needs_write_next_pc = false;
                break 'body;
            }
        }

        if needs_write_next_pc {
            let mut ctx = OpCtx { pool: &mut *pool, e: &mut *e, mem, ccr: &mut *ccr };
            control::write_next_pc(&mut ctx, pc);
        }

        Ok(BodyInfo {
            p_mem_size: pc.wrapping_sub(pc_first),
            encoded_instruction_count: count,
            last_op_size,
            single_op_word: if count == 1 { first_opcode } else { None },
            flags,
            disasm,
        })
    }
}

struct BodyInfo {
    p_mem_size: TWord,
    encoded_instruction_count: TWord,
    last_op_size: TWord,
    single_op_word: Option<TWord>,
    flags: BlockFlags,
    disasm: String,
}

fn fetch<C: DspCore>(core: &mut C, pc: TWord) -> TWord {
    core.memory_mut().get(MemArea::P, pc)
}

/// Dispatch the `AluOrMove` class: the data-ALU/shifter/bit-field/DIV/REP
/// selector, plus the parallel move that may ride alongside it.
#[allow(clippy::too_many_arguments)]
fn encode_alu_or_move<C: DspCore>(
    core: &mut C,
    pool: &mut DspRegPool,
    e: &mut Emitter,
    mem: &MemEmitter,
    ccr: &mut DeferredCcr,
    pc: TWord,
    opcode: TWord,
    op: AluOp,
    op_size: &mut TWord,
) -> JitResult<()> {
    match op {
        AluOp::And | AluOp::Or | AluOp::Eor => {
            let has_move = decode::has_parallel_move(opcode);
            if has_move {
                pool.set_parallel_op(true);
            }
            let imm = fetch(core, pc.wrapping_add(1));
            *op_size = 2;
            {
                let mut ctx = OpCtx { pool: &mut *pool, e: &mut *e, mem, ccr: &mut *ccr };
                match op {
                    AluOp::And => alu::and_long(&mut ctx, opcode, imm),
                    AluOp::Or => alu::or_long(&mut ctx, opcode, imm),
                    _ => alu::eor_long(&mut ctx, opcode, imm),
                }
            }
            finish_parallel_move(pool, e, mem, ccr, pc, opcode, has_move)?;
        }
        AluOp::Div => {
            let mut ctx = OpCtx { pool: &mut *pool, e: &mut *e, mem, ccr: &mut *ccr };
            div::div(&mut ctx, opcode);
        }
        AluOp::Rep => {
            let count = decode::rep_count(opcode);
            let next = fetch(core, pc.wrapping_add(1));
            *op_size = 2;
            if decode::alu_op_kind(next) != Some(AluOp::Div) {
                return Err(JitError::Unimplemented { pc, opcode });
            }
            let mut ctx = OpCtx { pool: &mut *pool, e: &mut *e, mem, ccr: &mut *ccr };
            div::rep_div(&mut ctx, next, count);
        }
        AluOp::ExtractU => {
            let mut ctx = OpCtx { pool: &mut *pool, e: &mut *e, mem, ccr: &mut *ccr };
            bitfield::extractu(&mut ctx, opcode);
        }
        AluOp::Btst | AluOp::Bset | AluOp::Bclr | AluOp::Bchg => {
            let mut ctx = OpCtx { pool: &mut *pool, e: &mut *e, mem, ccr: &mut *ccr };
            match op {
                AluOp::Btst => bitfield::btst(&mut ctx, opcode),
                AluOp::Bset => bitfield::bset(&mut ctx, opcode),
                AluOp::Bclr => bitfield::bclr(&mut ctx, opcode),
                _ => bitfield::bchg(&mut ctx, opcode),
            }
        }
        // Asl, Asr, Lsl, Lsr, Rol, Not, Abs, Clr, Rnd: the shift/logic
        // family that can carry a real parallel move (the other arms above
        // reuse the move field's bit range for JJ/mode/control-word
        // selectors, so they never accept one).
        _ => {
            let has_move = decode::has_parallel_move(opcode);
            if has_move {
                pool.set_parallel_op(true);
            }
            {
                let mut ctx = OpCtx { pool: &mut *pool, e: &mut *e, mem, ccr: &mut *ccr };
                if !alu::encode(&mut ctx, opcode, op) {
                    return Err(JitError::Unimplemented { pc, opcode });
                }
            }
            finish_parallel_move(pool, e, mem, ccr, pc, opcode, has_move)?;
        }
    }
    Ok(())
}

/// Encode the parallel move half (if any) and reconcile the Awrite/Bwrite
/// shadow slot back onto the real accumulator.
fn finish_parallel_move(
    pool: &mut DspRegPool,
    e: &mut Emitter,
    mem: &MemEmitter,
    ccr: &mut DeferredCcr,
    pc: TWord,
    opcode: TWord,
    has_move: bool,
) -> JitResult<()> {
    if !has_move {
        return Ok(());
    }
    {
        let mut ctx = OpCtx { pool: &mut *pool, e: &mut *e, mem, ccr: &mut *ccr };
        if !move_ops::encode(&mut ctx, opcode) {
            return Err(JitError::Unimplemented { pc, opcode });
        }
    }
    let mut pc_ctx = OpCtx::pool_ctx(e, mem);
    pool.commit_parallel_move(&mut pc_ctx);
    pool.set_parallel_op(false);
    Ok(())
}

/// `MOVE L:`: split the source accumulator's 48-bit value (bits 47..0) into
/// two 24-bit halves and hand them to `move_ops::move_long`. Needs a third
/// live register beyond the two fixed scratch registers (one for each
/// value half plus the address `move_long` computes internally), so the
/// low half is a pool-borrowed scratch register rather than `abi::SCRATCH`.
fn encode_long_move(pool: &mut DspRegPool, e: &mut Emitter, mem: &MemEmitter, ccr: &mut DeferredCcr, opcode: TWord) {
    let agu = decode::agu_index(opcode);
    let alu = decode::alu_dst(opcode);

    let full = {
        let mut pc_ctx = OpCtx::pool_ctx(e, mem);
        pool.get_alu(&mut pc_ctx, alu, true, false)
    };

    let hi = abi::SHIFT_COUNT;
    e.mov_rr(hi, full);
    e.shr_ri(hi, 24);
    e.shl_ri(hi, 40);
    e.shr_ri(hi, 40);

    let lo = {
        let mut pc_ctx = OpCtx::pool_ctx(e, mem);
        pool.acquire_scratch(&mut pc_ctx)
    };
    e.mov_rr(lo, full);
    e.shl_ri(lo, 40);
    e.shr_ri(lo, 40);

    {
        let mut ctx = OpCtx { pool: &mut *pool, e: &mut *e, mem, ccr: &mut *ccr };
        move_ops::move_long(&mut ctx, agu, hi, lo);
    }

    pool.release_scratch(lo);
}

/// Dispatch the `Control` class: JMP/Jcc/JSR/BSR/RTS/RTI/DO/DOR/ENDDO.
/// Returns `true` if this instruction ends the block (every variant except
/// DO/DOR/ENDDO, which only set up or tear down loop bookkeeping).
#[allow(clippy::too_many_arguments)]
fn encode_control<C: DspCore>(
    core: &mut C,
    pool: &mut DspRegPool,
    e: &mut Emitter,
    mem: &MemEmitter,
    ccr: &mut DeferredCcr,
    epilogue: Label,
    pc: TWord,
    opcode: TWord,
    kind: ControlOp,
    op_size: &mut TWord,
    pending_loops: &mut Vec<(TWord, TWord)>,
) -> bool {
    match kind {
        ControlOp::Jmp => {
            let target = fetch(core, pc.wrapping_add(1));
            *op_size = 2;
            let mut ctx = OpCtx { pool: &mut *pool, e: &mut *e, mem, ccr: &mut *ccr };
            control::jmp(&mut ctx, target, epilogue);
            true
        }
        ControlOp::Jcc => {
            let target = fetch(core, pc.wrapping_add(1));
            *op_size = 2;
            let fallthrough = pc.wrapping_add(2);
            // Jcc only ever tests a single already-resident SR bit, so any
            // CCR bits still deferred from the preceding arithmetic op must
            // be committed first.
            let sr = {
                let mut pc_ctx = OpCtx::pool_ctx(e, mem);
                pool.get_sr(&mut pc_ctx, true, true)
            };
            ccr.commit(e, sr, abi::SCRATCH);
            let mut ctx = OpCtx { pool: &mut *pool, e: &mut *e, mem, ccr: &mut *ccr };
            control::jcc(&mut ctx, opcode, target, fallthrough, epilogue);
            true
        }
        ControlOp::Jsr => {
            let target = fetch(core, pc.wrapping_add(1));
            *op_size = 2;
            let return_pc = pc.wrapping_add(2);
            let mut ctx = OpCtx { pool: &mut *pool, e: &mut *e, mem, ccr: &mut *ccr };
            control::jsr(&mut ctx, target, return_pc, epilogue);
            true
        }
        ControlOp::Bsr => {
            let target = fetch(core, pc.wrapping_add(1));
            *op_size = 2;
            let return_pc = pc.wrapping_add(2);
            let mut ctx = OpCtx { pool: &mut *pool, e: &mut *e, mem, ccr: &mut *ccr };
            control::bsr(&mut ctx, target, return_pc, epilogue);
            true
        }
        ControlOp::Rts => {
            let mut ctx = OpCtx { pool: &mut *pool, e: &mut *e, mem, ccr: &mut *ccr };
            control::rts(&mut ctx, epilogue);
            true
        }
        ControlOp::Rti => {
            let mut ctx = OpCtx { pool: &mut *pool, e: &mut *e, mem, ccr: &mut *ccr };
            control::rti(&mut ctx, epilogue);
            true
        }
        ControlOp::Do => {
            let loop_end_pc = fetch(core, pc.wrapping_add(1));
            *op_size = 2;
            let body_pc = pc.wrapping_add(2);
            let mut ctx = OpCtx { pool: &mut *pool, e: &mut *e, mem, ccr: &mut *ccr };
            loop_ops::do_op(&mut ctx, opcode, loop_end_pc);
            pending_loops.push((loop_end_pc, body_pc));
            false
        }
        ControlOp::Dor => {
            let loop_end_pc = fetch(core, pc.wrapping_add(1));
            *op_size = 2;
            let body_pc = pc.wrapping_add(2);
            let mut ctx = OpCtx { pool: &mut *pool, e: &mut *e, mem, ccr: &mut *ccr };
            loop_ops::dor(&mut ctx, opcode, loop_end_pc);
            pending_loops.push((loop_end_pc, body_pc));
            false
        }
        ControlOp::Enddo => {
            let mut ctx = OpCtx { pool: &mut *pool, e: &mut *e, mem, ccr: &mut *ccr };
            loop_ops::enddo(&mut ctx);
            pending_loops.pop();
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_instruction_limit_matches_documented_value() {
        let t = BlockTranslator::new();
        assert_eq!(t.instruction_limit, DEFAULT_INSTRUCTION_LIMIT);
    }

    #[test]
    fn with_max_arena_bytes_overrides_only_the_arena_cap() {
        let t = BlockTranslator::with_max_arena_bytes(4096);
        assert_eq!(t.max_arena_bytes, 4096);
        assert_eq!(t.instruction_limit, DEFAULT_INSTRUCTION_LIMIT);
    }

    #[test]
    fn with_instruction_limit_overrides_only_the_instruction_limit() {
        let t = BlockTranslator::with_instruction_limit(4);
        assert_eq!(t.instruction_limit, 4);
        assert_eq!(t.max_arena_bytes, DEFAULT_MAX_ARENA_BYTES);
    }
}
