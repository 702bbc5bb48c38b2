//! Cycle-accurate CPU execution shell and DMA/HDMA controller for a
//! 65816-family console. Opcode decode, the memory map, and all host I/O
//! live outside this crate; see [`bus::MemoryBus`] and [`cpu::InstructionSet`]
//! for the boundary.

pub mod bus;
pub mod cpu;
pub mod dma;
pub mod instructions;
pub mod interrupts;
mod num;
pub mod registers;

pub use bus::{AccessKind, CpuSpeed, MemoryBus};
pub use cpu::{CpuContext, CpuCore, CpuHooks, InstructionSet, InterruptEvent, StandardVectors, StopState};
pub use dma::{ActiveChannel, DmaChannel, DmaEngine};
pub use interrupts::InterruptSignals;
pub use registers::{ProcFlag, RegisterId, Registers};
