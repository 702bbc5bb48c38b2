//! CPU register file.
//!
//! The processor status byte is kept as a plain `u8` with named bit-mask
//! accessors rather than a struct of booleans: the 65816 instruction set
//! (external to this crate) manipulates the whole byte directly via
//! `REP`/`SEP`/`PHP`/`PLP`, and splitting it into fields would force every
//! one of those operations to reassemble it on every access.

use crate::num::GetBit;
use bincode::{Decode, Encode};

/// Bit positions within the processor status (`PS`) byte. Names follow the
/// 65816 datasheet; `M`/`X` only apply in native mode, where emulation mode
/// aliases them to variable-width accumulator/index size flags instead of
/// the 6502's break/unused bits.
pub mod ps_flag {
    pub const CARRY: u8 = 0;
    pub const ZERO: u8 = 1;
    pub const IRQ_DISABLE: u8 = 2;
    pub const DECIMAL: u8 = 3;
    pub const INDEX_SIZE: u8 = 4;
    pub const ACCUMULATOR_SIZE: u8 = 5;
    pub const OVERFLOW: u8 = 6;
    pub const NEGATIVE: u8 = 7;

    /// In emulation mode, bit 4 is read as the (always 1) break flag
    /// instead of the native-mode `X` (index register width) flag.
    pub const BREAK_EMULATION: u8 = 4;
}

/// A flag identifier for [`super::cpu::CpuCore::get_cpu_proc_flag`] /
/// `set_cpu_proc_flag`, mirroring the source's `ProcFlags` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcFlag {
    Carry,
    Zero,
    IrqDisable,
    Decimal,
    IndexSize,
    AccumulatorSize,
    Overflow,
    Negative,
}

impl ProcFlag {
    #[must_use]
    pub fn bit(self) -> u8 {
        match self {
            Self::Carry => ps_flag::CARRY,
            Self::Zero => ps_flag::ZERO,
            Self::IrqDisable => ps_flag::IRQ_DISABLE,
            Self::Decimal => ps_flag::DECIMAL,
            Self::IndexSize => ps_flag::INDEX_SIZE,
            Self::AccumulatorSize => ps_flag::ACCUMULATOR_SIZE,
            Self::Overflow => ps_flag::OVERFLOW,
            Self::Negative => ps_flag::NEGATIVE,
        }
    }
}

/// A debugger/test hook identifying which register [`super::cpu::CpuCore::set_reg`]
/// should write. 8/16-bit registers are distinguished by the payload shape,
/// not by variants, matching the source's single `SetReg(reg, u16 value)`
/// entry point truncated per-register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterId {
    A,
    X,
    Y,
    Sp,
    D,
    Pc,
    /// Program bank (8-bit; high byte of the value is ignored).
    K,
    /// Data bank (8-bit; high byte of the value is ignored).
    Dbr,
    /// Processor status (8-bit; high byte of the value is ignored).
    Ps,
    /// The internal NMI edge-detect latch, for test/debugger use only.
    NmiFlag,
}

/// The 65816 register file. Widths are always stored as 16 bits; callers
/// (the external instruction set) are responsible for masking `a`/`x`/`y` to
/// 8 bits when the relevant size flag is set, exactly as the hardware does
/// not clear the unused half of a register when narrowed.
#[derive(Debug, Clone, Copy, Encode, Decode)]
pub struct Registers {
    pub a: u16,
    pub x: u16,
    pub y: u16,
    pub sp: u16,
    pub d: u16,
    pub pc: u16,
    pub k: u8,
    pub dbr: u8,
    pub ps: u8,
}

impl Registers {
    #[must_use]
    pub fn proc_flag(&self, flag: ProcFlag) -> bool {
        self.ps.bit(flag.bit())
    }

    pub fn set_proc_flag(&mut self, flag: ProcFlag, value: bool) {
        let mask = 1 << flag.bit();
        self.ps = if value { self.ps | mask } else { self.ps & !mask };
    }
}

impl Default for Registers {
    /// Power-on / reset register snapshot. The 65816 always resets into
    /// emulation mode: `M`/`X` are forced to 8-bit widths (bits 4 and 5 of
    /// `PS` set), IRQs are disabled, decimal mode is cleared, and the stack
    /// is forced to page 1.
    fn default() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0x01FF,
            d: 0,
            pc: 0,
            k: 0,
            dbr: 0,
            ps: (1 << ps_flag::IRQ_DISABLE) | (1 << ps_flag::INDEX_SIZE) | (1 << ps_flag::ACCUMULATOR_SIZE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_power_on_snapshot() {
        let regs = Registers::default();
        assert_eq!(regs.sp, 0x01FF);
        assert!(regs.proc_flag(ProcFlag::IrqDisable));
        assert!(regs.proc_flag(ProcFlag::IndexSize));
        assert!(regs.proc_flag(ProcFlag::AccumulatorSize));
        assert!(!regs.proc_flag(ProcFlag::Carry));
        assert!(!regs.proc_flag(ProcFlag::Decimal));
    }

    #[test]
    fn proc_flag_round_trips() {
        let mut regs = Registers::default();
        regs.set_proc_flag(ProcFlag::Carry, true);
        assert!(regs.proc_flag(ProcFlag::Carry));
        regs.set_proc_flag(ProcFlag::Carry, false);
        assert!(!regs.proc_flag(ProcFlag::Carry));

        // Setting one flag must not disturb the others.
        regs.set_proc_flag(ProcFlag::Negative, true);
        assert!(regs.proc_flag(ProcFlag::IrqDisable));
        assert!(regs.proc_flag(ProcFlag::Negative));
    }
}
