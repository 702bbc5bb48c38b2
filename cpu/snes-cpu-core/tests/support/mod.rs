//! A small in-memory bus for exercising [`snes_cpu_core::MemoryBus`] end to
//! end, in the spirit of the source's `RecordingBus` test fixture: sparse
//! backing storage, a recorded history of every write (for assertions about
//! ordering), and a deliberately simplified but deterministic speed/region
//! model.

use snes_cpu_core::{AccessKind, CpuSpeed, MemoryBus};
use std::collections::HashMap;

pub struct TestBus {
    memory: HashMap<u32, u8>,
    pub writes: Vec<(u32, u8)>,
    cpu_speed: CpuSpeed,
    master_clock: u64,
    open_bus: u8,
}

impl Default for TestBus {
    fn default() -> Self {
        Self { memory: HashMap::new(), writes: Vec::new(), cpu_speed: CpuSpeed::Fast, master_clock: 0, open_bus: 0 }
    }
}

impl TestBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, address: u32, bytes: &[u8]) {
        for (i, &b) in bytes.iter().enumerate() {
            self.memory.insert(address + i as u32, b);
        }
    }

    pub fn peek(&self, address: u32) -> u8 {
        *self.memory.get(&address).unwrap_or(&self.open_bus)
    }
}

impl MemoryBus for TestBus {
    fn read(&mut self, address: u32, _kind: AccessKind) -> u8 {
        let value = *self.memory.get(&address).unwrap_or(&self.open_bus);
        self.open_bus = value;
        value
    }

    fn write(&mut self, address: u32, value: u8, _kind: AccessKind) {
        self.memory.insert(address, value);
        self.writes.push((address, value));
        self.open_bus = value;
    }

    fn peek_word(&self, address: u32) -> u16 {
        u16::from_le_bytes([self.peek(address), self.peek(address.wrapping_add(1))])
    }

    /// Banks `$7E`/`$7F` are the console's 128 KiB work RAM.
    fn is_work_ram(&self, address: u32) -> bool {
        matches!((address >> 16) & 0xFF, 0x7E | 0x7F)
    }

    fn cpu_speed_for(&self, address: u32) -> CpuSpeed {
        let bank = (address >> 16) & 0xFF;
        let offset = address & 0xFFFF;
        if self.is_work_ram(address) {
            CpuSpeed::Slow
        } else if bank == 0x00 && (0x4000..0x4200).contains(&offset) {
            CpuSpeed::ExtraSlow
        } else {
            CpuSpeed::Fast
        }
    }

    fn cpu_speed(&self) -> CpuSpeed {
        self.cpu_speed
    }

    fn set_cpu_speed(&mut self, speed: CpuSpeed) {
        self.cpu_speed = speed;
    }

    fn increment_master_clock(&mut self, cycles: u64) {
        self.master_clock += cycles;
    }

    fn master_clock(&self) -> u64 {
        self.master_clock
    }

    fn open_bus(&self) -> u8 {
        self.open_bus
    }
}
