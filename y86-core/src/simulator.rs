//! The façade that binds memory, registers, and the interpreter together.
//!
//! Grounded on the teacher's top-level `NesCore` struct
//! (`nes-core/src/nes_core.rs`), which plays the same role for the 6502
//! core: owns the bus and the CPU,
//! exposes `load`/`step`/`run`, and is the one type a CLI or GUI actually
//! drives. Register/memory accessors by human-readable name follow
//! `original_source/simulator.py`'s `Simulator.get_register`/`read_memory`,
//! including its "unknown name is a programmer error, not a fault" stance.

use crate::assembler::{Assembler, AssemblerError};
use crate::interpreter::Cpu;
use crate::isa;
use crate::memory::Memory;
use crate::registers::Status;
use crate::snapshot::Snapshot;

/// Register holding the stack pointer, per the canonical index table.
const RSP: u8 = 4;

/// Owns one memory and one register file; never shared across instances.
pub struct Simulator {
    cpu: Cpu,
    memory: Memory,
    labels: std::collections::HashMap<String, u64>,
}

impl Simulator {
    /// A fresh simulator with `mem_size` bytes of memory and `%rsp`
    /// initialized to `mem_size` (see the spec's design note on why the
    /// stack pointer defaults to one past the last valid byte).
    pub fn new(mem_size: usize) -> Simulator {
        Simulator::with_stack(mem_size, mem_size as u64)
    }

    pub fn with_stack(mem_size: usize, stack: u64) -> Simulator {
        let mut cpu = Cpu::new();
        cpu.registers.set(RSP, stack as i64);
        Simulator {
            cpu,
            memory: Memory::new(mem_size),
            labels: std::collections::HashMap::new(),
        }
    }

    /// Assembles `source`, loads the resulting image at address 0, and
    /// resets architectural state (registers, flags, status, PC) back to
    /// their initial values before re-arming `%rsp`. No partial state is
    /// left behind if assembly fails.
    pub fn load_source(&mut self, source: &str, stack: u64) -> Result<(), AssemblerError> {
        let mut assembler = Assembler::new();
        let program = assembler.assemble(source)?;
        self.labels = assembler.labels().clone();
        self.load_bytes(&program, stack);
        Ok(())
    }

    /// Loads a pre-assembled byte image directly, bypassing the assembler.
    pub fn load_bytes(&mut self, program: &[u8], stack: u64) {
        self.memory.reset();
        self.cpu.reset();
        self.memory
            .load(program, 0)
            .expect("program image must fit the configured memory size");
        self.cpu.registers.set(RSP, stack as i64);
    }

    pub fn step(&mut self) {
        self.cpu.step(&mut self.memory);
    }

    /// Steps until status leaves `AOK` or `instruction_cap` retirements
    /// have happened, whichever comes first. Returns the per-step
    /// snapshots when `trace` is set (the external visualizer's wire
    /// format, §6), otherwise an empty vector.
    pub fn run(&mut self, trace: bool, instruction_cap: u64) -> Vec<Snapshot> {
        let mut trace_log = Vec::new();
        if trace {
            trace_log.push(self.snapshot());
        }
        let mut steps = 0;
        while self.cpu.status == Status::Aok && steps < instruction_cap {
            self.step();
            steps += 1;
            if trace {
                trace_log.push(self.snapshot());
            }
        }
        trace_log
    }

    pub fn status(&self) -> Status {
        self.cpu.status
    }

    pub fn pc(&self) -> u64 {
        self.cpu.pc
    }

    pub fn instruction_count(&self) -> u64 {
        self.cpu.instruction_count
    }

    pub fn labels(&self) -> &std::collections::HashMap<String, u64> {
        &self.labels
    }

    /// Reads register `name` (no `%` prefix, case-insensitive). Unknown
    /// names are a programmer mistake, not a modeled fault: this panics.
    pub fn get_register(&self, name: &str) -> i64 {
        let index = self.register_index_or_panic(name);
        self.cpu.registers.get(index)
    }

    pub fn set_register(&mut self, name: &str, value: i64) {
        let index = self.register_index_or_panic(name);
        self.cpu.registers.set(index, value);
    }

    fn register_index_or_panic(&self, name: &str) -> u8 {
        isa::register_index(&name.to_lowercase())
            .unwrap_or_else(|| panic!("unknown register name: {name}"))
    }

    /// Reads `size` bytes (must be 1 or 8) at `address` as a signed
    /// integer. Any other size is a programmer mistake and panics.
    pub fn read_memory(&self, address: u64, size: u8) -> i64 {
        match size {
            1 => self
                .memory
                .read_byte(address)
                .unwrap_or_else(|e| panic!("out-of-range memory read at {}", e.address))
                as i64,
            8 => self
                .memory
                .read_quad(address)
                .unwrap_or_else(|e| panic!("out-of-range memory read at {}", e.address)),
            other => panic!("unsupported memory access size: {other} (must be 1 or 8)"),
        }
    }

    pub fn write_memory(&mut self, address: u64, size: u8, value: i64) {
        match size {
            1 => self
                .memory
                .write_byte(address, value as u8)
                .unwrap_or_else(|e| panic!("out-of-range memory write at {}", e.address)),
            8 => self
                .memory
                .write_quad(address, value)
                .unwrap_or_else(|e| panic!("out-of-range memory write at {}", e.address)),
            other => panic!("unsupported memory access size: {other} (must be 1 or 8)"),
        }
    }

    pub fn dump_memory(&self, start: u64, length: u64) -> String {
        self.memory.dump(start, length)
    }

    /// Captures the current architectural state as a wire-format record.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.cpu, &self.memory)
    }
}
