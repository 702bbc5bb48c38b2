//! Interrupt servicing: the sequence that runs when a latched NMI or IRQ
//! request is found pending at the top of [`super::CpuCore::exec`].

use super::{CpuContext, CpuCore, CpuHooks};
use crate::bus::MemoryBus;
use crate::num::U16Ext;
use crate::registers::ProcFlag;
use bincode::{Decode, Encode};
use log::trace;

/// Notification emitted when [`super::CpuCore::exec`] services an
/// interrupt, carrying enough information for a debugger/tracer to log the
/// redirection without needing to inspect CPU internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct InterruptEvent {
    /// 24-bit program address (`K:PC`) at the moment the interrupt was
    /// recognized.
    pub original_pc: u32,
    /// 24-bit program address after the vector was loaded (bank is always
    /// 0, since every vector lives at `$00:FFxx`).
    pub new_pc: u32,
    pub is_nmi: bool,
}

impl CpuCore {
    /// Pushes `PC` high, `PC` low, then `PS` (clearing the break flag to
    /// mark this as a hardware interrupt rather than a software `BRK`),
    /// clears decimal mode, sets the IRQ-disable flag, then loads `PC` from
    /// `vector` via `H::read_vector`. Two internal idle cycles precede the
    /// three pushes, for the fixed seven-cycle total real hardware spends
    /// servicing an interrupt. `K` (and on real hardware, `PBR`) always ends
    /// up 0: every vector lives in bank 0, and execution resumes there.
    pub(super) fn service_interrupt<B, H>(
        &mut self,
        ctx: &mut CpuContext<'_, B>,
        vector: u16,
        is_nmi: bool,
        software: bool,
    ) -> InterruptEvent
    where
        B: MemoryBus,
        H: CpuHooks<B>,
    {
        let original_pc = self.program_address();

        self.idle(ctx);
        self.idle(ctx);

        let pc = self.registers().pc;
        self.push_stack_byte(ctx, pc.msb());
        self.push_stack_byte(ctx, pc.lsb());

        let mut ps = self.registers().ps;
        if self.emulation_mode() {
            let mask = 1 << crate::registers::ps_flag::BREAK_EMULATION;
            ps = if software { ps | mask } else { ps & !mask };
        }
        self.push_stack_byte(ctx, ps);

        self.set_cpu_proc_flag(ProcFlag::Decimal, false);
        self.set_cpu_proc_flag(ProcFlag::IrqDisable, true);

        let target = H::read_vector(self, ctx, vector);
        self.registers_mut().pc = target;
        self.registers_mut().k = 0;

        let event = InterruptEvent { original_pc, new_pc: self.program_address(), is_nmi };
        trace!("interrupt serviced: {event:?} via vector {vector:#06x}");
        event
    }
}
