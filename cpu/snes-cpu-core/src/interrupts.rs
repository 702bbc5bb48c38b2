//! Interrupt input lines.
//!
//! IRQ is level-sensitive and aggregated by OR across every external source
//! that can assert it (PPU H/V-IRQ, APU, coprocessors). NMI is a pulse line;
//! this struct only tracks its current level. The actual edge detection
//! (latching a low-to-high transition into a pending request) is done by
//! [`crate::cpu::CpuCore`] once per bus cycle, since the one-cycle-latched
//! `NeedNmi`/`IrqSource` state that drives interrupt servicing belongs to
//! the CPU's own data model, not to this external-signal collaborator.

use bincode::{Decode, Encode};

/// Up to 8 independent level-sensitive IRQ sources (PPU H/V timer,
/// coprocessor IRQ lines, etc.), aggregated by OR.
const MAX_IRQ_SOURCES: usize = 8;

#[derive(Debug, Clone, Copy, Encode, Decode)]
pub struct InterruptSignals {
    irq_sources: u8,
    nmi_line: bool,
}

impl Default for InterruptSignals {
    fn default() -> Self {
        Self { irq_sources: 0, nmi_line: false }
    }
}

impl InterruptSignals {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Asserts or deasserts IRQ source `source` (0..8). The aggregate
    /// [`InterruptSignals::irq_asserted`] is the OR of every source
    /// currently asserted.
    pub fn set_irq(&mut self, source: usize, asserted: bool) {
        debug_assert!(source < MAX_IRQ_SOURCES);
        let mask = 1 << source;
        self.irq_sources = if asserted { self.irq_sources | mask } else { self.irq_sources & !mask };
    }

    #[must_use]
    pub fn irq_asserted(&self) -> bool {
        self.irq_sources != 0
    }

    /// Sets the live NMI input line level. A pulse that arrives and departs
    /// between two CPU samples is invisible, matching hardware: only the
    /// level at sample time is observable.
    pub fn set_nmi_line(&mut self, level: bool) {
        self.nmi_line = level;
    }

    #[must_use]
    pub fn nmi_line(&self) -> bool {
        self.nmi_line
    }
}
