//! Fetch stage: reads the opcode byte at `pc`, determines the instruction's
//! length from its icode, and pulls out the register byte / 8-byte value
//! the rest of that length implies.

use crate::isa::{self, RNONE};
use crate::memory::Memory;
use crate::registers::Status;

use super::Cpu;

pub struct DecodedInstruction {
    pub icode: u8,
    pub ifun: u8,
    pub ra: u8,
    pub rb: u8,
    pub valc: i64,
    pub length: u64,
}

pub fn fetch(cpu: &Cpu, memory: &Memory) -> Result<DecodedInstruction, Status> {
    let opcode_byte = memory.read_byte(cpu.pc).map_err(|_| Status::Adr)?;
    let icode = opcode_byte >> 4;
    let ifun = opcode_byte & 0xF;

    let length = isa::instruction_length(icode).ok_or(Status::Ins)?;
    if !memory.is_valid_range(cpu.pc, length) {
        return Err(Status::Adr);
    }

    let (ra, rb, valc) = match length {
        1 => (RNONE, RNONE, 0),
        2 => {
            let regbyte = memory.read_byte(cpu.pc + 1).map_err(|_| Status::Adr)?;
            (regbyte >> 4, regbyte & 0xF, 0)
        }
        9 => {
            let valc = memory.read_quad(cpu.pc + 1).map_err(|_| Status::Adr)?;
            (RNONE, RNONE, valc)
        }
        10 => {
            let regbyte = memory.read_byte(cpu.pc + 1).map_err(|_| Status::Adr)?;
            let valc = memory.read_quad(cpu.pc + 2).map_err(|_| Status::Adr)?;
            (regbyte >> 4, regbyte & 0xF, valc)
        }
        other => unreachable!("instruction_length returned unexpected length {other}"),
    };

    Ok(DecodedInstruction {
        icode,
        ifun,
        ra,
        rb,
        valc,
        length,
    })
}
