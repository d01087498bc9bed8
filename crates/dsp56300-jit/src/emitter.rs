//! Host emitter adapter: one portable mnemonic vocabulary over `dynasmrt`'s
//! x86-64 and AArch64 assemblers.
//!
//! Every mnemonic exposed here is guaranteed to preserve the host carry flag
//! semantics the CCR machinery depends on (see `ccr`). Differences between
//! the two host architectures are isolated inside this module: AArch64
//! encoders emit 3-operand forms, x86-64 encoders emit 2-operand forms, but
//! callers never see the difference.

use std::sync::OnceLock;

use dynasmrt::{dynasm, DynasmApi, DynasmLabelApi};

/// A host general-purpose register, identified by its architecture-neutral
/// index (0-15 on both x86-64 and AArch64, though the physical pool never
/// hands out every index — some are reserved, see `pool::gp`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostReg(pub u8);

/// A host vector register (XMM on x86-64, V on AArch64).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostVec(pub u8);

/// A forward/backward branch target.
pub type Label = dynasmrt::DynamicLabel;

/// CPU features queried once per process, per spec.md §9 ("Global process
/// state"). Neither field currently gates any encoder — AVX and NEON
/// dot-product widening are possible future uses — but querying once avoids
/// the cost of re-probing CPUID/`ID_AA64ISAR0_EL1` on every op encoder call.
#[derive(Debug, Clone, Copy)]
pub struct HostFeatures {
    pub has_avx: bool,
    pub has_sse41: bool,
}

static HOST_FEATURES: OnceLock<HostFeatures> = OnceLock::new();

#[must_use]
pub fn host_features() -> HostFeatures {
    *HOST_FEATURES.get_or_init(detect_features)
}

#[cfg(target_arch = "x86_64")]
fn detect_features() -> HostFeatures {
    HostFeatures {
        has_avx: std::is_x86_feature_detected!("avx"),
        has_sse41: std::is_x86_feature_detected!("sse4.1"),
    }
}

#[cfg(not(target_arch = "x86_64"))]
fn detect_features() -> HostFeatures {
    HostFeatures { has_avx: false, has_sse41: false }
}

/// A condition for `jcc`/`setcc`/`cmovcc`, expressed in host terms (derived
/// from the DSP's CCR state by the caller, see `ccr`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCond {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Carry,
    NotCarry,
    Zero,
    NotZero,
    Sign,
    NotSign,
    Overflow,
    NotOverflow,
    ParityEven,
    ParityOdd,
}

#[cfg(target_arch = "x86_64")]
type Assembler = dynasmrt::x64::Assembler;
#[cfg(target_arch = "aarch64")]
type Assembler = dynasmrt::aarch64::Assembler;

/// Portable assembler handle. Wraps the architecture-selected `dynasmrt`
/// assembler and exposes the mnemonic vocabulary from spec.md §4.1.
pub struct Emitter {
    asm: Assembler,
}

impl Emitter {
    pub fn new() -> Result<Self, crate::error::JitError> {
        let asm = Assembler::new().map_err(|e| crate::error::JitError::Emit(e.to_string()))?;
        Ok(Self { asm })
    }

    #[must_use]
    pub fn new_dynamic_label(&mut self) -> Label {
        self.asm.new_dynamic_label()
    }

    pub fn bind_label(&mut self, label: Label) {
        self.asm.dynamic_label(label);
    }

    #[must_use]
    pub fn offset(&self) -> dynasmrt::AssemblyOffset {
        self.asm.offset()
    }

    /// Finalize the emission buffer into executable memory.
    pub fn finalize(self) -> Result<dynasmrt::ExecutableBuffer, crate::error::JitError> {
        self.asm
            .finalize()
            .map_err(|_| crate::error::JitError::Emit("relocation failed".into()))
    }

    // -- Data movement --

    #[cfg(target_arch = "x86_64")]
    pub fn mov_rr(&mut self, dst: HostReg, src: HostReg) {
        dynasm!(self.asm
            ; .arch x64
            ; mov Rq(dst.0), Rq(src.0)
        );
    }

    #[cfg(target_arch = "aarch64")]
    pub fn mov_rr(&mut self, dst: HostReg, src: HostReg) {
        dynasm!(self.asm
            ; .arch aarch64
            ; mov X(dst.0), X(src.0)
        );
    }

    #[cfg(target_arch = "x86_64")]
    pub fn mov_ri(&mut self, dst: HostReg, imm: i64) {
        dynasm!(self.asm
            ; .arch x64
            ; mov Rq(dst.0), QWORD imm
        );
    }

    #[cfg(target_arch = "aarch64")]
    pub fn mov_ri(&mut self, dst: HostReg, imm: i64) {
        dynasm!(self.asm
            ; .arch aarch64
            ; movz X(dst.0), ((imm as u64) & 0xffff) as u32
            ; movk X(dst.0), (((imm as u64) >> 16) & 0xffff) as u32, LSL 16
            ; movk X(dst.0), (((imm as u64) >> 32) & 0xffff) as u32, LSL 32
            ; movk X(dst.0), (((imm as u64) >> 48) & 0xffff) as u32, LSL 48
        );
    }

    // -- Arithmetic / logic (2-operand on x86-64, 3-operand on AArch64) --

    #[cfg(target_arch = "x86_64")]
    pub fn add_rr(&mut self, dst: HostReg, src: HostReg) {
        dynasm!(self.asm; .arch x64; add Rq(dst.0), Rq(src.0));
    }
    #[cfg(target_arch = "aarch64")]
    pub fn add_rr(&mut self, dst: HostReg, src: HostReg) {
        dynasm!(self.asm; .arch aarch64; add X(dst.0), X(dst.0), X(src.0));
    }

    #[cfg(target_arch = "x86_64")]
    pub fn sub_rr(&mut self, dst: HostReg, src: HostReg) {
        dynasm!(self.asm; .arch x64; sub Rq(dst.0), Rq(src.0));
    }
    #[cfg(target_arch = "aarch64")]
    pub fn sub_rr(&mut self, dst: HostReg, src: HostReg) {
        dynasm!(self.asm; .arch aarch64; sub X(dst.0), X(dst.0), X(src.0));
    }

    #[cfg(target_arch = "x86_64")]
    pub fn and_rr(&mut self, dst: HostReg, src: HostReg) {
        dynasm!(self.asm; .arch x64; and Rq(dst.0), Rq(src.0));
    }
    #[cfg(target_arch = "aarch64")]
    pub fn and_rr(&mut self, dst: HostReg, src: HostReg) {
        dynasm!(self.asm; .arch aarch64; and X(dst.0), X(dst.0), X(src.0));
    }

    #[cfg(target_arch = "x86_64")]
    pub fn or_rr(&mut self, dst: HostReg, src: HostReg) {
        dynasm!(self.asm; .arch x64; or Rq(dst.0), Rq(src.0));
    }
    #[cfg(target_arch = "aarch64")]
    pub fn or_rr(&mut self, dst: HostReg, src: HostReg) {
        dynasm!(self.asm; .arch aarch64; orr X(dst.0), X(dst.0), X(src.0));
    }

    #[cfg(target_arch = "x86_64")]
    pub fn xor_rr(&mut self, dst: HostReg, src: HostReg) {
        dynasm!(self.asm; .arch x64; xor Rq(dst.0), Rq(src.0));
    }
    #[cfg(target_arch = "aarch64")]
    pub fn xor_rr(&mut self, dst: HostReg, src: HostReg) {
        dynasm!(self.asm; .arch aarch64; eor X(dst.0), X(dst.0), X(src.0));
    }

    /// AArch64 has no general AND-immediate (only specific repeating bit
    /// patterns are encodable), so this stages the constant through a
    /// register, saving and restoring whatever that register held across
    /// the sequence — transparent to the caller regardless of what the
    /// register pool currently has resident there.
    pub fn and_ri(&mut self, dst: HostReg, imm: i64) {
        #[cfg(target_arch = "x86_64")]
        dynasm!(self.asm; .arch x64; and Rq(dst.0), DWORD imm as i32);
        #[cfg(target_arch = "aarch64")]
        {
            let scratch = if dst.0 == 9 { HostReg(10) } else { HostReg(9) };
            self.push(scratch);
            self.mov_ri(scratch, imm);
            self.and_rr(dst, scratch);
            self.pop(scratch);
        }
    }

    // -- Shifts (shift amount always in CL on x86-64, a GPR on AArch64) --

    #[cfg(target_arch = "x86_64")]
    pub fn shl_ri(&mut self, dst: HostReg, amount: u8) {
        dynasm!(self.asm; .arch x64; shl Rq(dst.0), BYTE amount as i8);
    }
    #[cfg(target_arch = "aarch64")]
    pub fn shl_ri(&mut self, dst: HostReg, amount: u8) {
        dynasm!(self.asm; .arch aarch64; lsl X(dst.0), X(dst.0), amount as u32);
    }

    #[cfg(target_arch = "x86_64")]
    pub fn shr_ri(&mut self, dst: HostReg, amount: u8) {
        dynasm!(self.asm; .arch x64; shr Rq(dst.0), BYTE amount as i8);
    }
    #[cfg(target_arch = "aarch64")]
    pub fn shr_ri(&mut self, dst: HostReg, amount: u8) {
        dynasm!(self.asm; .arch aarch64; lsr X(dst.0), X(dst.0), amount as u32);
    }

    #[cfg(target_arch = "x86_64")]
    pub fn sar_ri(&mut self, dst: HostReg, amount: u8) {
        dynasm!(self.asm; .arch x64; sar Rq(dst.0), BYTE amount as i8);
    }
    #[cfg(target_arch = "aarch64")]
    pub fn sar_ri(&mut self, dst: HostReg, amount: u8) {
        dynasm!(self.asm; .arch aarch64; asr X(dst.0), X(dst.0), amount as u32);
    }

    /// Shift left by a register-held amount (DIV/ASL variable-count forms).
    /// `amount_rcx` must be the CL-aliased register on x86-64; on AArch64
    /// any GPR works.
    #[cfg(target_arch = "x86_64")]
    pub fn shl_rcl(&mut self, dst: HostReg) {
        dynasm!(self.asm; .arch x64; shl Rq(dst.0), cl);
    }
    #[cfg(target_arch = "aarch64")]
    pub fn shl_rcl(&mut self, dst: HostReg) {
        dynasm!(self.asm; .arch aarch64; lsl X(dst.0), X(dst.0), X(1));
    }

    #[cfg(target_arch = "x86_64")]
    pub fn sar_rcl(&mut self, dst: HostReg) {
        dynasm!(self.asm; .arch x64; sar Rq(dst.0), cl);
    }
    #[cfg(target_arch = "aarch64")]
    pub fn sar_rcl(&mut self, dst: HostReg) {
        dynasm!(self.asm; .arch aarch64; asr X(dst.0), X(dst.0), X(1));
    }

    #[cfg(target_arch = "x86_64")]
    pub fn ror_ri(&mut self, dst: HostReg, amount: u8) {
        dynasm!(self.asm; .arch x64; ror Rq(dst.0), BYTE amount as i8);
    }
    #[cfg(target_arch = "aarch64")]
    pub fn ror_ri(&mut self, dst: HostReg, amount: u8) {
        dynasm!(self.asm; .arch aarch64; ror X(dst.0), X(dst.0), amount as u32);
    }

    // -- Comparisons / bit tests (flags consumed by the CCR machinery) --

    #[cfg(target_arch = "x86_64")]
    pub fn cmp_ri(&mut self, a: HostReg, imm: i32) {
        dynasm!(self.asm; .arch x64; cmp Rq(a.0), DWORD imm);
    }
    #[cfg(target_arch = "aarch64")]
    pub fn cmp_ri(&mut self, a: HostReg, imm: i32) {
        dynasm!(self.asm; .arch aarch64; cmp X(a.0), imm as u32);
    }

    #[cfg(target_arch = "x86_64")]
    pub fn test_rr(&mut self, a: HostReg, b: HostReg) {
        dynasm!(self.asm; .arch x64; test Rq(a.0), Rq(b.0));
    }
    #[cfg(target_arch = "aarch64")]
    pub fn test_rr(&mut self, a: HostReg, b: HostReg) {
        dynasm!(self.asm; .arch aarch64; tst X(a.0), X(b.0));
    }

    #[cfg(target_arch = "x86_64")]
    pub fn bt_ri(&mut self, a: HostReg, bit: u8) {
        dynasm!(self.asm; .arch x64; bt Rq(a.0), BYTE bit as i8);
    }
    #[cfg(target_arch = "aarch64")]
    pub fn bt_ri(&mut self, a: HostReg, bit: u8) {
        // AArch64 has no flag-setting bit-test; synthesize via TST against
        // a single-bit mask loaded into the scratch register.
        dynasm!(self.asm
            ; .arch aarch64
            ; tst X(a.0), (1u64 << bit) as u32
        );
    }

    #[cfg(target_arch = "x86_64")]
    pub fn bts_ri(&mut self, a: HostReg, bit: u8) {
        dynasm!(self.asm; .arch x64; bts Rq(a.0), BYTE bit as i8);
    }
    #[cfg(target_arch = "aarch64")]
    pub fn bts_ri(&mut self, a: HostReg, bit: u8) {
        dynasm!(self.asm; .arch aarch64; orr X(a.0), X(a.0), (1u64 << bit) as u32);
    }

    #[cfg(target_arch = "x86_64")]
    pub fn btr_ri(&mut self, a: HostReg, bit: u8) {
        dynasm!(self.asm; .arch x64; btr Rq(a.0), BYTE bit as i8);
    }
    #[cfg(target_arch = "aarch64")]
    pub fn btr_ri(&mut self, a: HostReg, bit: u8) {
        dynasm!(self.asm; .arch aarch64; and X(a.0), X(a.0), !(1u64 << bit) as u32);
    }

    #[cfg(target_arch = "x86_64")]
    pub fn btc_ri(&mut self, a: HostReg, bit: u8) {
        dynasm!(self.asm; .arch x64; btc Rq(a.0), BYTE bit as i8);
    }
    #[cfg(target_arch = "aarch64")]
    pub fn btc_ri(&mut self, a: HostReg, bit: u8) {
        dynasm!(self.asm; .arch aarch64; eor X(a.0), X(a.0), (1u64 << bit) as u32);
    }

    // -- Branches / labels --

    pub fn label(&mut self) -> Label {
        self.new_dynamic_label()
    }

    pub fn bind(&mut self, label: Label) {
        self.bind_label(label);
    }

    #[cfg(target_arch = "x86_64")]
    pub fn jmp(&mut self, label: Label) {
        dynasm!(self.asm; .arch x64; jmp =>label);
    }
    #[cfg(target_arch = "aarch64")]
    pub fn jmp(&mut self, label: Label) {
        dynasm!(self.asm; .arch aarch64; b =>label);
    }

    #[cfg(target_arch = "x86_64")]
    pub fn jcc(&mut self, cond: HostCond, label: Label) {
        match cond {
            HostCond::Carry => dynasm!(self.asm; .arch x64; jc =>label),
            HostCond::NotCarry => dynasm!(self.asm; .arch x64; jnc =>label),
            HostCond::Zero | HostCond::Eq => dynasm!(self.asm; .arch x64; jz =>label),
            HostCond::NotZero | HostCond::Ne => dynasm!(self.asm; .arch x64; jnz =>label),
            HostCond::Sign => dynasm!(self.asm; .arch x64; js =>label),
            HostCond::NotSign => dynasm!(self.asm; .arch x64; jns =>label),
            HostCond::Overflow => dynasm!(self.asm; .arch x64; jo =>label),
            HostCond::NotOverflow => dynasm!(self.asm; .arch x64; jno =>label),
            HostCond::Lt => dynasm!(self.asm; .arch x64; jl =>label),
            HostCond::Le => dynasm!(self.asm; .arch x64; jle =>label),
            HostCond::Gt => dynasm!(self.asm; .arch x64; jg =>label),
            HostCond::Ge => dynasm!(self.asm; .arch x64; jge =>label),
            HostCond::ParityEven => dynasm!(self.asm; .arch x64; jp =>label),
            HostCond::ParityOdd => dynasm!(self.asm; .arch x64; jnp =>label),
        }
    }
    #[cfg(target_arch = "aarch64")]
    pub fn jcc(&mut self, cond: HostCond, label: Label) {
        let cc = match cond {
            HostCond::Carry => dynasmrt::aarch64::Condition::Cs,
            HostCond::NotCarry => dynasmrt::aarch64::Condition::Cc,
            HostCond::Zero | HostCond::Eq => dynasmrt::aarch64::Condition::Eq,
            HostCond::NotZero | HostCond::Ne => dynasmrt::aarch64::Condition::Ne,
            HostCond::Sign => dynasmrt::aarch64::Condition::Mi,
            HostCond::NotSign => dynasmrt::aarch64::Condition::Pl,
            HostCond::Overflow => dynasmrt::aarch64::Condition::Vs,
            HostCond::NotOverflow => dynasmrt::aarch64::Condition::Vc,
            HostCond::Lt => dynasmrt::aarch64::Condition::Lt,
            HostCond::Le => dynasmrt::aarch64::Condition::Le,
            HostCond::Gt => dynasmrt::aarch64::Condition::Gt,
            HostCond::Ge => dynasmrt::aarch64::Condition::Ge,
            HostCond::ParityEven | HostCond::ParityOdd => {
                unreachable!("parity is synthesized from setnp on x86-64 only")
            }
        };
        dynasm!(self.asm; .arch aarch64; b.COND cc =>label);
    }

    #[cfg(target_arch = "x86_64")]
    pub fn setcc(&mut self, cond: HostCond, dst: HostReg) {
        match cond {
            HostCond::Carry => dynasm!(self.asm; .arch x64; setc Rb(dst.0)),
            HostCond::NotCarry => dynasm!(self.asm; .arch x64; setnc Rb(dst.0)),
            HostCond::Zero | HostCond::Eq => dynasm!(self.asm; .arch x64; setz Rb(dst.0)),
            HostCond::NotZero | HostCond::Ne => dynasm!(self.asm; .arch x64; setnz Rb(dst.0)),
            HostCond::ParityEven => dynasm!(self.asm; .arch x64; setnp Rb(dst.0)),
            HostCond::ParityOdd => dynasm!(self.asm; .arch x64; setp Rb(dst.0)),
            HostCond::Lt => dynasm!(self.asm; .arch x64; setl Rb(dst.0)),
            HostCond::Le => dynasm!(self.asm; .arch x64; setle Rb(dst.0)),
            HostCond::Gt => dynasm!(self.asm; .arch x64; setg Rb(dst.0)),
            HostCond::Ge => dynasm!(self.asm; .arch x64; setge Rb(dst.0)),
            HostCond::Sign => dynasm!(self.asm; .arch x64; sets Rb(dst.0)),
            HostCond::NotSign => dynasm!(self.asm; .arch x64; setns Rb(dst.0)),
            HostCond::Overflow => dynasm!(self.asm; .arch x64; seto Rb(dst.0)),
            HostCond::NotOverflow => dynasm!(self.asm; .arch x64; setno Rb(dst.0)),
        }
    }
    #[cfg(target_arch = "aarch64")]
    pub fn setcc(&mut self, cond: HostCond, dst: HostReg) {
        let cc = match cond {
            HostCond::Carry => dynasmrt::aarch64::Condition::Cs,
            HostCond::NotCarry => dynasmrt::aarch64::Condition::Cc,
            HostCond::Zero | HostCond::Eq => dynasmrt::aarch64::Condition::Eq,
            HostCond::NotZero | HostCond::Ne => dynasmrt::aarch64::Condition::Ne,
            HostCond::Sign => dynasmrt::aarch64::Condition::Mi,
            HostCond::NotSign => dynasmrt::aarch64::Condition::Pl,
            HostCond::Overflow => dynasmrt::aarch64::Condition::Vs,
            HostCond::NotOverflow => dynasmrt::aarch64::Condition::Vc,
            HostCond::Lt => dynasmrt::aarch64::Condition::Lt,
            HostCond::Le => dynasmrt::aarch64::Condition::Le,
            HostCond::Gt => dynasmrt::aarch64::Condition::Gt,
            HostCond::Ge => dynasmrt::aarch64::Condition::Ge,
            HostCond::ParityEven | HostCond::ParityOdd => {
                unreachable!("parity has no AArch64 condition code")
            }
        };
        dynasm!(self.asm; .arch aarch64; cset X(dst.0), cc);
    }

    // -- Stack --

    #[cfg(target_arch = "x86_64")]
    pub fn push(&mut self, r: HostReg) {
        dynasm!(self.asm; .arch x64; push Rq(r.0));
    }
    #[cfg(target_arch = "aarch64")]
    pub fn push(&mut self, r: HostReg) {
        dynasm!(self.asm; .arch aarch64; str X(r.0), [sp, -16]!);
    }

    #[cfg(target_arch = "x86_64")]
    pub fn pop(&mut self, r: HostReg) {
        dynasm!(self.asm; .arch x64; pop Rq(r.0));
    }
    #[cfg(target_arch = "aarch64")]
    pub fn pop(&mut self, r: HostReg) {
        dynasm!(self.asm; .arch aarch64; ldr X(r.0), [sp], 16);
    }

    #[cfg(target_arch = "x86_64")]
    pub fn ret(&mut self) {
        dynasm!(self.asm; .arch x64; ret);
    }
    #[cfg(target_arch = "aarch64")]
    pub fn ret(&mut self) {
        dynasm!(self.asm; .arch aarch64; ret);
    }

    // -- Sign-preserving unary ops --

    #[cfg(target_arch = "x86_64")]
    pub fn neg_r(&mut self, dst: HostReg) {
        dynasm!(self.asm; .arch x64; neg Rq(dst.0));
    }
    #[cfg(target_arch = "aarch64")]
    pub fn neg_r(&mut self, dst: HostReg) {
        dynasm!(self.asm; .arch aarch64; neg X(dst.0), X(dst.0));
    }

    #[cfg(target_arch = "x86_64")]
    pub fn not_r(&mut self, dst: HostReg) {
        dynasm!(self.asm; .arch x64; not Rq(dst.0));
    }
    #[cfg(target_arch = "aarch64")]
    pub fn not_r(&mut self, dst: HostReg) {
        dynasm!(self.asm; .arch aarch64; mvn X(dst.0), X(dst.0));
    }

    /// Conditional move, used by `alu_abs` (restore the pre-negation value
    /// when the operand was already non-negative).
    #[cfg(target_arch = "x86_64")]
    pub fn cmovcc(&mut self, cond: HostCond, dst: HostReg, src: HostReg) {
        match cond {
            HostCond::Lt => dynasm!(self.asm; .arch x64; cmovl Rq(dst.0), Rq(src.0)),
            HostCond::Le => dynasm!(self.asm; .arch x64; cmovle Rq(dst.0), Rq(src.0)),
            HostCond::Gt => dynasm!(self.asm; .arch x64; cmovg Rq(dst.0), Rq(src.0)),
            HostCond::Ge => dynasm!(self.asm; .arch x64; cmovge Rq(dst.0), Rq(src.0)),
            HostCond::Zero | HostCond::Eq => dynasm!(self.asm; .arch x64; cmovz Rq(dst.0), Rq(src.0)),
            HostCond::NotZero | HostCond::Ne => dynasm!(self.asm; .arch x64; cmovnz Rq(dst.0), Rq(src.0)),
            HostCond::Carry => dynasm!(self.asm; .arch x64; cmovc Rq(dst.0), Rq(src.0)),
            HostCond::NotCarry => dynasm!(self.asm; .arch x64; cmovnc Rq(dst.0), Rq(src.0)),
            HostCond::Sign => dynasm!(self.asm; .arch x64; cmovs Rq(dst.0), Rq(src.0)),
            HostCond::NotSign => dynasm!(self.asm; .arch x64; cmovns Rq(dst.0), Rq(src.0)),
            HostCond::Overflow => dynasm!(self.asm; .arch x64; cmovo Rq(dst.0), Rq(src.0)),
            HostCond::NotOverflow => dynasm!(self.asm; .arch x64; cmovno Rq(dst.0), Rq(src.0)),
            HostCond::ParityEven => dynasm!(self.asm; .arch x64; cmovnp Rq(dst.0), Rq(src.0)),
            HostCond::ParityOdd => dynasm!(self.asm; .arch x64; cmovp Rq(dst.0), Rq(src.0)),
        }
    }
    #[cfg(target_arch = "aarch64")]
    pub fn cmovcc(&mut self, cond: HostCond, dst: HostReg, src: HostReg) {
        let cc = match cond {
            HostCond::Carry => dynasmrt::aarch64::Condition::Cs,
            HostCond::NotCarry => dynasmrt::aarch64::Condition::Cc,
            HostCond::Zero | HostCond::Eq => dynasmrt::aarch64::Condition::Eq,
            HostCond::NotZero | HostCond::Ne => dynasmrt::aarch64::Condition::Ne,
            HostCond::Sign => dynasmrt::aarch64::Condition::Mi,
            HostCond::NotSign => dynasmrt::aarch64::Condition::Pl,
            HostCond::Overflow => dynasmrt::aarch64::Condition::Vs,
            HostCond::NotOverflow => dynasmrt::aarch64::Condition::Vc,
            HostCond::Lt => dynasmrt::aarch64::Condition::Lt,
            HostCond::Le => dynasmrt::aarch64::Condition::Le,
            HostCond::Gt => dynasmrt::aarch64::Condition::Gt,
            HostCond::Ge => dynasmrt::aarch64::Condition::Ge,
            HostCond::ParityEven | HostCond::ParityOdd => {
                unreachable!("parity has no AArch64 condition code")
            }
        };
        dynasm!(self.asm; .arch aarch64; csel X(dst.0), X(src.0), X(dst.0), cc);
    }

    // -- Immediate add/sub (block prologue/epilogue stack adjustment, DIV) --

    #[cfg(target_arch = "x86_64")]
    pub fn add_ri(&mut self, dst: HostReg, imm: i32) {
        dynasm!(self.asm; .arch x64; add Rq(dst.0), DWORD imm);
    }
    #[cfg(target_arch = "aarch64")]
    pub fn add_ri(&mut self, dst: HostReg, imm: i32) {
        dynasm!(self.asm; .arch aarch64; add X(dst.0), X(dst.0), imm as u32);
    }

    #[cfg(target_arch = "x86_64")]
    pub fn sub_ri(&mut self, dst: HostReg, imm: i32) {
        dynasm!(self.asm; .arch x64; sub Rq(dst.0), DWORD imm);
    }
    #[cfg(target_arch = "aarch64")]
    pub fn sub_ri(&mut self, dst: HostReg, imm: i32) {
        dynasm!(self.asm; .arch aarch64; sub X(dst.0), X(dst.0), imm as u32);
    }

    // -- Base+offset memory access (register-file cells, DSP memory arrays) --

    #[cfg(target_arch = "x86_64")]
    pub fn load64(&mut self, dst: HostReg, base: HostReg, offset: i32) {
        dynasm!(self.asm; .arch x64; mov Rq(dst.0), [Rq(base.0) + offset]);
    }
    #[cfg(target_arch = "aarch64")]
    pub fn load64(&mut self, dst: HostReg, base: HostReg, offset: i32) {
        dynasm!(self.asm; .arch aarch64; ldr X(dst.0), [X(base.0), offset]);
    }

    #[cfg(target_arch = "x86_64")]
    pub fn store64(&mut self, base: HostReg, offset: i32, src: HostReg) {
        dynasm!(self.asm; .arch x64; mov [Rq(base.0) + offset], Rq(src.0));
    }
    #[cfg(target_arch = "aarch64")]
    pub fn store64(&mut self, base: HostReg, offset: i32, src: HostReg) {
        dynasm!(self.asm; .arch aarch64; str X(src.0), [X(base.0), offset]);
    }

    #[cfg(target_arch = "x86_64")]
    pub fn load32(&mut self, dst: HostReg, base: HostReg, offset: i32) {
        dynasm!(self.asm; .arch x64; mov Rd(dst.0), [Rq(base.0) + offset]);
    }
    #[cfg(target_arch = "aarch64")]
    pub fn load32(&mut self, dst: HostReg, base: HostReg, offset: i32) {
        dynasm!(self.asm; .arch aarch64; ldr W(dst.0), [X(base.0), offset]);
    }

    #[cfg(target_arch = "x86_64")]
    pub fn store32(&mut self, base: HostReg, offset: i32, src: HostReg) {
        dynasm!(self.asm; .arch x64; mov [Rq(base.0) + offset], Rd(src.0));
    }
    #[cfg(target_arch = "aarch64")]
    pub fn store32(&mut self, base: HostReg, offset: i32, src: HostReg) {
        dynasm!(self.asm; .arch aarch64; str W(src.0), [X(base.0), offset]);
    }

    /// Indexed 64-bit load, scale 8 (the SS hardware-stack access pattern:
    /// `base + (index & 0xf) * 8`). `index` must already be masked by the
    /// caller.
    #[cfg(target_arch = "x86_64")]
    pub fn load64_indexed(&mut self, dst: HostReg, base: HostReg, index: HostReg) {
        dynasm!(self.asm; .arch x64; mov Rq(dst.0), [Rq(base.0) + Rq(index.0) * 8]);
    }
    #[cfg(target_arch = "aarch64")]
    pub fn load64_indexed(&mut self, dst: HostReg, base: HostReg, index: HostReg) {
        dynasm!(self.asm; .arch aarch64; ldr X(dst.0), [X(base.0), X(index.0), LSL 3]);
    }

    #[cfg(target_arch = "x86_64")]
    pub fn store64_indexed(&mut self, base: HostReg, index: HostReg, src: HostReg) {
        dynasm!(self.asm; .arch x64; mov [Rq(base.0) + Rq(index.0) * 8], Rq(src.0));
    }
    #[cfg(target_arch = "aarch64")]
    pub fn store64_indexed(&mut self, base: HostReg, index: HostReg, src: HostReg) {
        dynasm!(self.asm; .arch aarch64; str X(src.0), [X(base.0), X(index.0), LSL 3]);
    }

    /// Indexed 32-bit load, scale 4 (guest X/Y/P memory arrays of `TWord`).
    #[cfg(target_arch = "x86_64")]
    pub fn load32_indexed(&mut self, dst: HostReg, base: HostReg, index: HostReg) {
        dynasm!(self.asm; .arch x64; mov Rd(dst.0), [Rq(base.0) + Rq(index.0) * 4]);
    }
    #[cfg(target_arch = "aarch64")]
    pub fn load32_indexed(&mut self, dst: HostReg, base: HostReg, index: HostReg) {
        dynasm!(self.asm; .arch aarch64; ldr W(dst.0), [X(base.0), X(index.0), LSL 2]);
    }

    #[cfg(target_arch = "x86_64")]
    pub fn store32_indexed(&mut self, base: HostReg, index: HostReg, src: HostReg) {
        dynasm!(self.asm; .arch x64; mov [Rq(base.0) + Rq(index.0) * 4], Rd(src.0));
    }
    #[cfg(target_arch = "aarch64")]
    pub fn store32_indexed(&mut self, base: HostReg, index: HostReg, src: HostReg) {
        dynasm!(self.asm; .arch aarch64; str W(src.0), [X(base.0), X(index.0), LSL 2]);
    }
}
