//! Fixed host-register roles, reserved for the lifetime of a block and
//! excluded from the general-purpose pool's free list.
//!
//! The reference JIT bakes the DSP register file's address in as an
//! absolute immediate at each access site (`ptrToReg`); we instead load it
//! once per block into a reserved register and address off that, since
//! `dynasmrt` has no direct moffs-style absolute addressing mode on
//! x86-64. Either way the pointer is a per-translation compile-time
//! constant, never a runtime parameter — the JIT entry ABI (`JitEntry`)
//! only carries `Runtime`, the entry PC, and the `Block` itself.

use crate::emitter::HostReg;

/// `&mut DspRegs` for the embedder this block was translated against.
pub const REGS_BASE: HostReg = HostReg(15);
/// Bridged `X`/`Y`/`P` guest memory array base pointers.
pub const MEM_BASE_X: HostReg = HostReg(14);
pub const MEM_BASE_Y: HostReg = HostReg(13);
pub const MEM_BASE_P: HostReg = HostReg(12);
/// `&mut Runtime`, the block entry's first ABI argument.
pub const RUNTIME_BASE: HostReg = HostReg(11);
/// Variable shift/rotate count scratch register (x86-64 `cl`, AArch64
/// `x1` — the registers `Emitter::shl_rcl`/`sar_rcl` hardcode). Dedicated
/// rather than pool-allocated: a count loaded here immediately precedes
/// the shift it feeds, and if the pool could still hand this register out
/// to a resident DSP register, loading the count would silently clobber
/// it.
pub const SHIFT_COUNT: HostReg = HostReg(1);
/// Fixed scratch register for CCR bit capture and other short-lived
/// intermediates an op encoder needs outside the DSP register pool —
/// mirrors the reference JIT's `regReturnVal` convention (a single
/// dedicated temporary reused by `alu_abs`, `op_Div`, and friends rather
/// than pool-allocated on every use).
pub const SCRATCH: HostReg = HostReg(2);

/// The block entry ABI's first incoming argument (`&mut Runtime`), in
/// whatever register the host calling convention places it before the
/// translator copies it into `RUNTIME_BASE` — SysV x86-64 passes it in
/// `rdi`, AArch64 in `x0`.
#[cfg(target_arch = "x86_64")]
pub const ABI_ARG0: HostReg = HostReg(7);
#[cfg(target_arch = "aarch64")]
pub const ABI_ARG0: HostReg = HostReg(0);

/// Every reserved register, for the pool constructor to exclude.
#[must_use]
pub const fn reserved() -> [HostReg; 7] {
    [REGS_BASE, MEM_BASE_X, MEM_BASE_Y, MEM_BASE_P, RUNTIME_BASE, SHIFT_COUNT, SCRATCH]
}

/// The general-purpose registers left over for the block-local pool, on a
/// 16-register host file (x86-64 `rax..r15`, AArch64 `x0..x15` of the
/// caller-saved/callee-saved range this crate targets). `rsp`(4)/`rbp`(5)
/// are never handed out; callers address the host stack through `Emitter`'s
/// `push`/`pop` only.
#[must_use]
pub fn allocatable_gp() -> Vec<(HostReg, crate::pool::SaveClass)> {
    use crate::pool::SaveClass::{CalleeSave, CallerSave};
    let reserved = reserved();
    let mut out = Vec::new();
    for i in 0..16u8 {
        if i == 4 || i == 5 {
            continue; // rsp, rbp
        }
        let reg = HostReg(i);
        if reserved.contains(&reg) {
            continue;
        }
        // x86-64 SysV: rbx, r12-r15 are callee-save; the rest caller-save.
        // r12-r15 here are reserved above, so only rbx remains callee-save.
        let class = if i == 3 { CalleeSave } else { CallerSave };
        out.push((reg, class));
    }
    out
}
