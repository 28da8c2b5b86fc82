//! The state-snapshot wire format consumed by an external visualizer.
//!
//! The core itself has no GUI collaborator — that's explicitly out of
//! scope — but it owns the contract that one would consume: a JSON record
//! per retired instruction, written as a single array to stdout. Grounded
//! on `original_source/simulator.py`'s `Simulator.to_json`, re-expressed
//! with `serde` the way `amoljassal-sis-kernel-showcase` serializes its
//! kernel-state records.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::interpreter::Cpu;
use crate::isa::REGISTER_NAMES;
use crate::memory::Memory;

#[derive(Debug, Clone, Serialize)]
pub struct ConditionCodeFields {
    pub zf: u8,
    pub sf: u8,
    pub of: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct Snapshot {
    pub pc: u64,
    pub cc: ConditionCodeFields,
    pub stat: u8,
    pub reg: BTreeMap<String, i64>,
    pub mem: BTreeMap<String, i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
}

impl Snapshot {
    /// Captures `cpu`/`memory`'s current state. `mem` only carries
    /// 8-byte-aligned quads that are non-zero, per the sparse wire format;
    /// `cache` is left unset since this core models no cache.
    pub fn capture(cpu: &Cpu, memory: &Memory) -> Snapshot {
        let mut reg = BTreeMap::new();
        for (index, name) in REGISTER_NAMES.iter().enumerate() {
            reg.insert(name.to_string(), cpu.registers.get(index as u8));
        }

        let mut mem = BTreeMap::new();
        let mut address = 0u64;
        while memory.is_valid_range(address, 8) {
            let value = memory
                .read_quad(address)
                .expect("address already range-checked");
            if value != 0 {
                mem.insert(address.to_string(), value);
            }
            address += 8;
        }

        Snapshot {
            pc: cpu.pc,
            cc: ConditionCodeFields {
                zf: cpu.flags.zf as u8,
                sf: cpu.flags.sf as u8,
                of: cpu.flags.of as u8,
            },
            stat: cpu.status as u8,
            reg,
            mem,
            cache: None,
        }
    }
}
