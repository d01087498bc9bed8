//! Memory-access emitter: typed loads/stores for register-file cells and
//! guest X/Y/P memory, addressed through base pointers baked into the block
//! ABI rather than host-architecture-specific immediate addressing.
//!
//! A block receives two base pointers at entry: `regs_base` (`&mut DspRegs`)
//! and `mem_base[3]` (the bridged `X`/`Y`/`P` array pointers, queried once
//! from `DspMemory::bridged_memory_address` at translation start). Baking
//! both in up front means every cell access, architectural or guest, is a
//! single base+offset or base+index instruction — no trait calls mid-block.

use memoffset::offset_of;

use crate::emitter::{Emitter, HostReg};
use crate::regfile::{descriptor, DspReg, DspRegs, RegWidth};
use crate::types::{MemArea, TWord};

/// Byte size of one `TWord` cell in a bridged guest memory array.
const WORD_SIZE: i32 = size_of::<TWord>() as i32;

pub struct MemEmitter {
    /// Host register holding `&mut DspRegs` for the current block.
    regs_base: HostReg,
    /// Host registers holding the bridged X/Y/P array base pointers,
    /// indexed by `MemArea as usize`.
    mem_base: [HostReg; 3],
}

impl MemEmitter {
    #[must_use]
    pub fn new(regs_base: HostReg, mem_base: [HostReg; 3]) -> Self {
        Self { regs_base, mem_base }
    }

    #[must_use]
    pub const fn regs_base(&self) -> HostReg {
        self.regs_base
    }

    fn mem_base_for(&self, area: MemArea) -> HostReg {
        self.mem_base[area as usize]
    }

    // -- Register-file cells (width-aware) --

    /// Load a DSP register into `dst`, widened to 32 or 64 bits as the
    /// register's width demands.
    pub fn load_dsp_reg(&self, e: &mut Emitter, dst: HostReg, reg: DspReg) {
        let (offset, width) = descriptor(reg);
        match width {
            RegWidth::W24 => e.load32(dst, self.regs_base, offset as i32),
            RegWidth::W48 | RegWidth::W56 => e.load64(dst, self.regs_base, offset as i32),
        }
    }

    /// Store `src` into a DSP register's backing cell. Callers are
    /// responsible for masking `src` to the register's width beforehand
    /// (see `regfile::Reg24::masked` and friends) — this just picks the
    /// right store width.
    pub fn store_dsp_reg(&self, e: &mut Emitter, reg: DspReg, src: HostReg) {
        let (offset, width) = descriptor(reg);
        match width {
            RegWidth::W24 => e.store32(self.regs_base, offset as i32, src),
            RegWidth::W48 | RegWidth::W56 => e.store64(self.regs_base, offset as i32, src),
        }
    }

    /// Load an arbitrary 24-bit register-file cell by byte offset (used for
    /// the small scalar registers — EP, VBA, SC, SZ, OMR, SP — that bypass
    /// the DSP register pool entirely).
    pub fn load24_at(&self, e: &mut Emitter, dst: HostReg, field_offset: usize) {
        e.load32(dst, self.regs_base, field_offset as i32);
    }

    pub fn store24_at(&self, e: &mut Emitter, field_offset: usize, src: HostReg) {
        e.store32(self.regs_base, field_offset as i32, src);
    }

    // -- Hardware stack (SS[0..15], indexed by SP & 0xf) --

    /// `index` must already be masked to `0..15` by the caller (`SP & 0xf`).
    /// Each `HwStackFrame` packs SSH|SSL into one 64-bit slot, so this is a
    /// scale-8 indexed access from the `ss` array's base offset.
    pub fn load_ss(&self, e: &mut Emitter, dst: HostReg, index: HostReg) {
        let ss_offset = offset_of!(DspRegs, ss);
        e.add_ri(self.regs_base, ss_offset as i32);
        e.load64_indexed(dst, self.regs_base, index);
        e.sub_ri(self.regs_base, ss_offset as i32);
    }

    pub fn store_ss(&self, e: &mut Emitter, index: HostReg, src: HostReg) {
        let ss_offset = offset_of!(DspRegs, ss);
        e.add_ri(self.regs_base, ss_offset as i32);
        e.store64_indexed(self.regs_base, index, src);
        e.sub_ri(self.regs_base, ss_offset as i32);
    }

    // -- Guest X/Y/P memory (bridged array access) --

    /// Read one cell from a guest memory area at a host-register-held
    /// address. The bridged pointer covers the whole linear array; callers
    /// are responsible for routing genuinely peripheral-mapped addresses
    /// through `DspMemory::get` instead (outside this emitter's scope).
    pub fn load_guest(&self, e: &mut Emitter, dst: HostReg, area: MemArea, addr: HostReg) {
        e.load32_indexed(dst, self.mem_base_for(area), addr);
    }

    pub fn store_guest(&self, e: &mut Emitter, area: MemArea, addr: HostReg, src: HostReg) {
        e.store32_indexed(self.mem_base_for(area), addr, src);
    }

    /// Read a cell at a compile-time-constant address, used for immediate
    /// absolute addressing modes.
    pub fn load_guest_imm(&self, e: &mut Emitter, dst: HostReg, area: MemArea, addr: TWord) {
        e.load32(dst, self.mem_base_for(area), addr as i32 * WORD_SIZE);
    }

    pub fn store_guest_imm(&self, e: &mut Emitter, area: MemArea, addr: TWord, src: HostReg) {
        e.store32(self.mem_base_for(area), addr as i32 * WORD_SIZE, src);
    }
}
