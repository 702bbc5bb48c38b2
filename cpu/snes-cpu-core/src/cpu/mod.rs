//! The CPU execution shell: fetch-execute cycle driver, interrupt edge
//! detection/servicing, stop/wait states, and the per-cycle coupling
//! between the CPU, the DMA engine and the master clock.
//!
//! Opcode decoding itself is deliberately not this module's job — see
//! [`crate::instructions`] — but every bus access an instruction performs
//! must route through [`CpuCore::read`]/[`CpuCore::write`]/[`CpuCore::idle`]
//! so that cycle accounting, DMA arbitration and interrupt latching stay
//! correct regardless of which instruction is running.

mod interrupt;

use crate::bus::{AccessKind, CpuSpeed, MemoryBus};
use crate::dma::DmaEngine;
use crate::interrupts::InterruptSignals;
use crate::num::u24_address;
use crate::registers::{ProcFlag, RegisterId, Registers};
use bincode::{Decode, Encode};

pub use interrupt::InterruptEvent;

/// 16-bit CPU vectors, fetched via [`CpuHooks::read_vector`]. Emulation mode
/// uses the legacy (6502-compatible) NMI/IRQ vectors; native mode uses the
/// 65816-specific ones. Reset is always fetched in emulation-mode addressing
/// since reset always lands the CPU in emulation mode.
pub mod vectors {
    pub const RESET: u16 = 0xFFFC;
    pub const NMI_NATIVE: u16 = 0xFFEA;
    pub const NMI_EMULATION: u16 = 0xFFFA;
    pub const IRQ_NATIVE: u16 = 0xFFEE;
    pub const IRQ_EMULATION: u16 = 0xFFFE;
    /// `BRK`/`COP` in native mode; emulation mode `BRK` shares the IRQ
    /// vector (see [`IRQ_EMULATION`]).
    pub const BRK_NATIVE: u16 = 0xFFE6;
}

/// The CPU's run state. While [`StopState::Stopped`], only the master clock
/// advances. While [`StopState::WaitingForIrq`], only `Idle` cycles occur
/// until an interrupt source asserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum StopState {
    Running,
    /// STP was executed; the CPU no longer executes any code.
    Stopped,
    /// WAI was executed; the CPU idles until IRQ or NMI asserts.
    WaitingForIrq,
}

/// Bundles the three collaborators a CPU bus cycle needs: the memory map,
/// the DMA engine (which may steal cycles on every access), and the raw
/// interrupt input lines. Borrowed for the duration of a single
/// [`CpuCore::exec`] call; nothing here is owned by the CPU, matching the
/// non-owning-reference design (the `Console` aggregate that would own all
/// three is out of this crate's scope).
pub struct CpuContext<'a, B: MemoryBus> {
    pub bus: &'a mut B,
    pub dma: &'a mut DmaEngine,
    pub interrupts: &'a InterruptSignals,
}

/// Capability points a coprocessor variant (e.g. SA-1) can override by
/// supplying its own zero-sized type implementing this trait, rather than by
/// subclassing. The default implementations are exactly what stock hardware
/// does.
pub trait CpuHooks<B: MemoryBus> {
    /// Reads the 16-bit vector at `vector`/`vector + 1` as two ordinary CPU
    /// bus reads. SA-1 overrides this to return an internally latched value
    /// without touching ROM.
    fn read_vector(cpu: &mut CpuCore, ctx: &mut CpuContext<'_, B>, vector: u16) -> u16 {
        let lo = cpu.read(ctx, u32::from(vector), AccessKind::DataRead);
        let hi = cpu.read(ctx, u32::from(vector.wrapping_add(1)), AccessKind::DataRead);
        u16::from_le_bytes([lo, hi])
    }

    /// Called by the external instruction set at the end of an indexed jump
    /// addressing mode. No-op on stock hardware.
    fn idle_end_jump(_cpu: &mut CpuCore, _ctx: &mut CpuContext<'_, B>) {}

    /// Called by the external instruction set when a branch is taken.
    /// No-op on stock hardware.
    fn idle_take_branch(_cpu: &mut CpuCore, _ctx: &mut CpuContext<'_, B>) {}
}

/// Stock 65816 vector/idle behavior; the default `CpuHooks` implementation
/// for consoles without a coprocessor override.
pub struct StandardVectors;

impl<B: MemoryBus> CpuHooks<B> for StandardVectors {}

/// CPU register/execution state. Owns nothing external: the memory map, the
/// DMA engine and the interrupt lines are all borrowed per call via
/// [`CpuContext`].
#[derive(Debug, Clone, Encode, Decode)]
pub struct CpuCore {
    registers: Registers,
    emulation_mode: bool,
    cycle_count: u64,
    stop_state: StopState,

    /// Current-cycle interrupt inputs, sampled every bus cycle.
    irq_source: bool,
    need_nmi: bool,
    /// Latched copies from the *previous* bus cycle; interrupt servicing
    /// reads these, not the live values above (mandatory one-cycle delay).
    prev_irq_source: bool,
    prev_need_nmi: bool,
    /// True while DMA is stealing cycles; suppresses latching of
    /// `prev_irq_source`/`prev_need_nmi` for the duration.
    irq_lock: bool,
    /// Edge-detect latch for the NMI line (previous sampled level).
    nmi_flag: bool,
    /// Instruction-scoped "immediate addressing mode" hint, cleared at the
    /// start of every `exec` call and set by the external instruction set.
    immediate_mode: bool,
}

impl Default for CpuCore {
    fn default() -> Self {
        Self {
            registers: Registers::default(),
            emulation_mode: true,
            cycle_count: 0,
            stop_state: StopState::Running,
            irq_source: false,
            need_nmi: false,
            prev_irq_source: false,
            prev_need_nmi: false,
            irq_lock: false,
            nmi_flag: false,
            immediate_mode: false,
        }
    }
}

impl CpuCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches the 16-bit reset vector via [`MemoryBus::peek_word`] (a
    /// side-effect-free read, since DMA/interrupt machinery is not yet live
    /// at power-on) and initializes every register to its documented
    /// power-on state.
    pub fn reset<B: MemoryBus>(&mut self, bus: &B) {
        *self = Self::default();
        self.registers.pc = bus.peek_word(u32::from(vectors::RESET));
    }

    /// Advances the CPU by one instruction, one stalled (Stopped) cycle, or
    /// one Idle cycle (`WaitingForIrq`), then services any interrupt whose
    /// *latched* request was pending as of the previous bus cycle. Returns
    /// the interrupt notification if one was serviced this call, matching
    /// the `Console::ProcessInterrupt(originalPc, newPc, isNmi)` signature
    /// external tooling expects.
    pub fn exec<B, H, I>(&mut self, ctx: &mut CpuContext<'_, B>, instructions: &mut I) -> Option<InterruptEvent>
    where
        B: MemoryBus,
        H: CpuHooks<B>,
        I: InstructionSet<B>,
    {
        self.immediate_mode = false;

        match self.stop_state {
            StopState::Running => {
                instructions.execute(self, ctx);
            }
            StopState::Stopped => {
                ctx.bus.inc_master_clock_4();
                return None;
            }
            StopState::WaitingForIrq => {
                self.idle(ctx);
                if self.irq_source || self.need_nmi {
                    self.idle(ctx);
                    self.idle(ctx);
                    self.stop_state = StopState::Running;
                }
            }
        }

        if self.prev_need_nmi {
            self.need_nmi = false;
            let vector = if self.emulation_mode { vectors::NMI_EMULATION } else { vectors::NMI_NATIVE };
            Some(self.service_interrupt::<B, H>(ctx, vector, true, false))
        } else if self.prev_irq_source {
            let vector = if self.emulation_mode { vectors::IRQ_EMULATION } else { vectors::IRQ_NATIVE };
            Some(self.service_interrupt::<B, H>(ctx, vector, false, false))
        } else {
            None
        }
    }

    /// One CPU bus read cycle: sets the region's access speed, runs
    /// [`CpuCore::process_cpu_cycle`] (cycle count, NMI edge detection, DMA
    /// arbitration), performs the read, advances the master clock by the
    /// selected speed, then latches interrupt inputs if DMA did not lock
    /// them this cycle.
    pub fn read<B: MemoryBus>(&mut self, ctx: &mut CpuContext<'_, B>, address: u32, kind: AccessKind) -> u8 {
        let speed = ctx.bus.cpu_speed_for(address);
        ctx.bus.set_cpu_speed(speed);
        self.process_cpu_cycle(ctx);
        let value = ctx.bus.read(address, kind);
        ctx.bus.increment_master_clock(speed.master_cycles());
        self.update_irq_nmi_flags();
        value
    }

    /// Symmetric to [`CpuCore::read`].
    pub fn write<B: MemoryBus>(&mut self, ctx: &mut CpuContext<'_, B>, address: u32, value: u8, kind: AccessKind) {
        let speed = ctx.bus.cpu_speed_for(address);
        ctx.bus.set_cpu_speed(speed);
        self.process_cpu_cycle(ctx);
        ctx.bus.write(address, value, kind);
        ctx.bus.increment_master_clock(speed.master_cycles());
        self.update_irq_nmi_flags();
    }

    /// One CPU idle (internal) cycle. Always charges the fixed 6-cycle
    /// "fast" speed, regardless of what region the CPU last accessed.
    pub fn idle<B: MemoryBus>(&mut self, ctx: &mut CpuContext<'_, B>) {
        ctx.bus.set_cpu_speed(CpuSpeed::Fast);
        self.process_cpu_cycle(ctx);
        ctx.bus.inc_master_clock_6();
        self.update_irq_nmi_flags();
    }

    /// Capability point for SA-1-style coprocessors that need to hook the
    /// end of an indexed-jump addressing mode; a no-op by default, exposed
    /// so [`CpuHooks::idle_end_jump`] has somewhere to delegate from the
    /// instruction set.
    pub fn idle_end_jump<B: MemoryBus, H: CpuHooks<B>>(&mut self, ctx: &mut CpuContext<'_, B>) {
        H::idle_end_jump(self, ctx);
    }

    /// As [`CpuCore::idle_end_jump`], for a taken branch.
    pub fn idle_take_branch<B: MemoryBus, H: CpuHooks<B>>(&mut self, ctx: &mut CpuContext<'_, B>) {
        H::idle_take_branch(self, ctx);
    }

    fn process_cpu_cycle<B: MemoryBus>(&mut self, ctx: &mut CpuContext<'_, B>) {
        self.cycle_count += 1;

        let nmi_line = ctx.interrupts.nmi_line();
        if !self.nmi_flag && nmi_line {
            self.need_nmi = true;
        }
        self.nmi_flag = nmi_line;
        self.irq_source = ctx.interrupts.irq_asserted();

        self.irq_lock = ctx.dma.process_pending_transfers(ctx.bus);
    }

    fn update_irq_nmi_flags(&mut self) {
        if !self.irq_lock {
            self.prev_irq_source = self.irq_source;
            self.prev_need_nmi = self.need_nmi;
        }
    }

    /// Program address (24-bit) for the current `K`/`PC`.
    #[must_use]
    pub fn program_address(&self) -> u32 {
        u24_address(self.registers.k, self.registers.pc)
    }

    fn push_stack_byte<B: MemoryBus>(&mut self, ctx: &mut CpuContext<'_, B>, value: u8) {
        self.write(ctx, u32::from(self.registers.sp), value, AccessKind::DataWrite);
        self.registers.sp = self.registers.sp.wrapping_sub(1);
        if self.emulation_mode {
            self.registers.sp = 0x0100 | (self.registers.sp & 0x00FF);
        }
    }

    /// Public stack push, for the external instruction set's own PHA/PHX/...
    /// family.
    pub fn push_byte<B: MemoryBus>(&mut self, ctx: &mut CpuContext<'_, B>, value: u8) {
        self.push_stack_byte(ctx, value);
    }

    /// Public stack pull, for the external instruction set's own PLA/PLX/...
    /// family.
    pub fn pull_byte<B: MemoryBus>(&mut self, ctx: &mut CpuContext<'_, B>) -> u8 {
        self.registers.sp = self.registers.sp.wrapping_add(1);
        if self.emulation_mode {
            self.registers.sp = 0x0100 | (self.registers.sp & 0x00FF);
        }
        self.read(ctx, u32::from(self.registers.sp), AccessKind::DataRead)
    }

    /// Services a software `BRK`/`COP` interrupt: identical push/vector
    /// sequence to a hardware interrupt, except the break flag is set
    /// (rather than cleared) in the pushed `PS` when in emulation mode, so
    /// an interrupt handler can tell the two apart.
    pub fn service_software_break<B: MemoryBus>(&mut self, ctx: &mut CpuContext<'_, B>, vector: u16) -> InterruptEvent {
        self.service_interrupt::<B, StandardVectors>(ctx, vector, false, true)
    }

    /// Debugger/test register write hook. 8-bit registers silently truncate
    /// the high byte of `value`, matching hardware accepting any bit
    /// pattern.
    pub fn set_reg(&mut self, id: RegisterId, value: u16) {
        match id {
            RegisterId::A => self.registers.a = value,
            RegisterId::X => self.registers.x = value,
            RegisterId::Y => self.registers.y = value,
            RegisterId::Sp => self.registers.sp = value,
            RegisterId::D => self.registers.d = value,
            RegisterId::Pc => self.registers.pc = value,
            RegisterId::K => self.registers.k = value as u8,
            RegisterId::Dbr => self.registers.dbr = value as u8,
            RegisterId::Ps => self.registers.ps = value as u8,
            RegisterId::NmiFlag => self.nmi_flag = value != 0,
        }
    }

    #[must_use]
    pub fn get_cpu_proc_flag(&self, flag: ProcFlag) -> bool {
        self.registers.proc_flag(flag)
    }

    pub fn set_cpu_proc_flag(&mut self, flag: ProcFlag, value: bool) {
        self.registers.set_proc_flag(flag, value);
    }

    #[must_use]
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// True while DMA is stealing cycles. Exposed for tracers/tests that
    /// need to observe the IRQ/NMI latch-suppression invariant directly.
    #[must_use]
    pub fn irq_lock(&self) -> bool {
        self.irq_lock
    }

    #[must_use]
    pub fn prev_irq_source(&self) -> bool {
        self.prev_irq_source
    }

    #[must_use]
    pub fn prev_need_nmi(&self) -> bool {
        self.prev_need_nmi
    }

    #[must_use]
    pub fn state(&self) -> StopState {
        self.stop_state
    }

    pub fn set_state(&mut self, state: StopState) {
        self.stop_state = state;
    }

    #[must_use]
    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    #[must_use]
    pub fn emulation_mode(&self) -> bool {
        self.emulation_mode
    }

    pub fn set_emulation_mode(&mut self, value: bool) {
        self.emulation_mode = value;
    }

    #[must_use]
    pub fn immediate_mode(&self) -> bool {
        self.immediate_mode
    }

    pub fn set_immediate_mode(&mut self, value: bool) {
        self.immediate_mode = value;
    }
}

/// The external collaborator responsible for opcode decode/dispatch.
/// Exhaustive 65816 instruction coverage is out of this crate's scope (see
/// `spec.md` §1); implementations call back into [`CpuCore::read`] /
/// [`CpuCore::write`] / [`CpuCore::idle`] for every bus access the
/// instruction performs, and [`CpuCore::exec`] invokes `execute` exactly
/// once per call while `StopState::Running`.
pub trait InstructionSet<B: MemoryBus> {
    fn execute(&mut self, cpu: &mut CpuCore, ctx: &mut CpuContext<'_, B>);
}
