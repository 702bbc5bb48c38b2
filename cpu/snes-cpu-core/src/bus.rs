//! The external collaborator this crate is built against: the memory map,
//! bus arbitration, work RAM, cartridge mappers and PPU/APU registers all
//! live behind [`MemoryBus`]. Nothing in `cpu` or `dma` reaches past this
//! trait.

use bincode::{Decode, Encode};

/// Tags a bus access with its origin, mirroring the `MemoryOperationType`
/// distinctions the original hardware-accurate core makes (opcode fetch vs.
/// operand read vs. plain data access vs. DMA). `MemoryBus` implementations
/// may use this to drive debuggers/tracers; it has no effect on timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum AccessKind {
    /// Fetching the opcode byte of an instruction.
    OpcodeFetch,
    /// Fetching an operand byte following an opcode.
    OperandRead,
    /// An ordinary data read (not part of opcode/operand fetch).
    DataRead,
    /// An ordinary data write.
    DataWrite,
    /// A read whose result is discarded (e.g. dummy cycles during indexed
    /// addressing that crosses a page boundary).
    Dummy,
    /// A DMA/HDMA access to bus A (the 24-bit CPU address space).
    DmaBusA,
    /// A DMA/HDMA access to bus B (the $2100-$21FF I/O page).
    DmaBusB,
}

/// Per-region CPU access speed, expressed in master cycles. The SNES only
/// ever uses three speeds; `SyncEndDma` relies on exactly this set (see
/// Design Notes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum CpuSpeed {
    /// 6 master cycles: fast-ROM, PPU/APU ports, CPU I/O registers.
    Fast,
    /// 8 master cycles: WRAM, slow-ROM.
    Slow,
    /// 12 master cycles: the manual joypad read ports ($4016/$4017).
    ExtraSlow,
}

impl CpuSpeed {
    #[must_use]
    pub fn master_cycles(self) -> u64 {
        match self {
            Self::Fast => 6,
            Self::Slow => 8,
            Self::ExtraSlow => 12,
        }
    }
}

/// The abstract system bus that the CPU execution shell and the DMA engine
/// both operate through. A concrete implementation owns work RAM, the
/// cartridge, and the PPU/APU register windows; none of that is this
/// crate's concern.
///
/// All of the `Read`/`Write`/speed-tracking methods mutate `self` because
/// real implementations need to record side effects (open-bus value, PPU
/// latches) on every access, matching the source's non-`const` memory
/// manager methods.
pub trait MemoryBus {
    /// Reads one byte from the given 24-bit address, tagged with its
    /// access kind. Implementations may have side effects (PPU register
    /// reads, open-bus latch updates) but must not advance the master
    /// clock themselves beyond whatever side-channel bookkeeping the
    /// region does; cycle accounting is the caller's responsibility.
    fn read(&mut self, address: u32, kind: AccessKind) -> u8;

    /// Symmetric to [`MemoryBus::read`].
    fn write(&mut self, address: u32, value: u8, kind: AccessKind);

    /// A side-effect-free 16-bit little-endian read, used for the CPU reset
    /// vector fetch at power-on (before the DMA/interrupt machinery is live).
    fn peek_word(&self, address: u32) -> u16;

    /// A DMA-tagged read. `is_bus_a` distinguishes the 24-bit A-bus from the
    /// $2100-$21FF B-bus so implementations can route PPU/APU port reads
    /// correctly; both still go through the ordinary read path with an
    /// appropriate [`AccessKind`].
    fn read_dma(&mut self, address: u32, is_bus_a: bool) -> u8 {
        let kind = if is_bus_a { AccessKind::DmaBusA } else { AccessKind::DmaBusB };
        self.read(address, kind)
    }

    /// Symmetric to [`MemoryBus::read_dma`].
    fn write_dma(&mut self, address: u32, value: u8, is_bus_a: bool) {
        let kind = if is_bus_a { AccessKind::DmaBusA } else { AccessKind::DmaBusB };
        self.write(address, value, kind);
    }

    /// True iff `address` maps to the console's 128 KiB work RAM. Used to
    /// gate the `$2180` work-RAM DMA quirk (see [`crate::dma`]).
    fn is_work_ram(&self, address: u32) -> bool;

    /// The per-region access time for `address`, in master cycles.
    fn cpu_speed_for(&self, address: u32) -> CpuSpeed;

    /// The access time that will be charged for the *next* clock increment;
    /// set by [`MemoryBus::set_cpu_speed`] and consumed by `SyncEndDma`-style
    /// master clock alignment.
    fn cpu_speed(&self) -> CpuSpeed;

    /// Records the speed to charge for the next clock increment.
    fn set_cpu_speed(&mut self, speed: CpuSpeed);

    /// Advances the master clock by exactly 4 cycles.
    fn inc_master_clock_4(&mut self) {
        self.increment_master_clock(4);
    }

    /// Advances the master clock by exactly 6 cycles.
    fn inc_master_clock_6(&mut self) {
        self.increment_master_clock(6);
    }

    /// Advances the master clock by exactly 8 cycles.
    fn inc_master_clock_8(&mut self) {
        self.increment_master_clock(8);
    }

    /// Advances the master clock by an arbitrary number of cycles; used by
    /// `SyncStartDma`/`SyncEndDma` to realign to clock boundaries.
    fn increment_master_clock(&mut self, cycles: u64);

    /// The monotonic master clock value.
    fn master_clock(&self) -> u64;

    /// The floating-bus value returned for unreadable addresses.
    fn open_bus(&self) -> u8;
}
