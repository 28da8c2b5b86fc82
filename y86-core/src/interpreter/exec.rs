//! Execute stage: the per-icode semantics. Each arm updates registers,
//! memory, and/or `next_pc`; `Err` means the instruction faulted and
//! `Cpu::step` should record it without advancing state further.
//!
//! Ported from `original_source/cpu.py`'s `execute_instruction`, instruction
//! by instruction, in the teacher's `opcodes_move.rs`/`opcodes_jump.rs`
//! ordering (moves, then ALU, then control flow, then stack).

use crate::isa::{alu, icode};
use crate::memory::Memory;
use crate::registers::Status;

use super::decode::DecodedInstruction;
use super::Cpu;

const RSP: u8 = 4;

pub fn execute(
    cpu: &mut Cpu,
    memory: &mut Memory,
    d: &DecodedInstruction,
    next_pc: &mut u64,
) -> Result<(), Status> {
    match d.icode {
        icode::HALT => Err(Status::Hlt),

        icode::NOP => Ok(()),

        icode::RRMOVQ => {
            if cpu.flags.holds(d.ifun) {
                let value = cpu.registers.get(d.ra);
                cpu.registers.set(d.rb, value);
            }
            Ok(())
        }

        icode::IRMOVQ => {
            cpu.registers.set(d.rb, d.valc);
            Ok(())
        }

        icode::RMMOVQ => {
            let address = effective_address(cpu, d);
            let value = cpu.registers.get(d.ra);
            memory.write_quad(address, value).map_err(|_| Status::Adr)
        }

        icode::MRMOVQ => {
            let address = effective_address(cpu, d);
            let value = memory.read_quad(address).map_err(|_| Status::Adr)?;
            cpu.registers.set(d.ra, value);
            Ok(())
        }

        icode::OPQ => {
            let a = cpu.registers.get(d.ra);
            let b = cpu.registers.get(d.rb);
            let result = match d.ifun {
                alu::ADD => b.wrapping_add(a),
                alu::SUB => b.wrapping_sub(a),
                alu::AND => b & a,
                alu::XOR => b ^ a,
                _ => return Err(Status::Ins),
            };
            cpu.flags.update_for_alu(result, a, b, d.ifun);
            cpu.registers.set(d.rb, result);
            Ok(())
        }

        icode::JXX => {
            if cpu.flags.holds(d.ifun) {
                *next_pc = d.valc as u64;
            }
            Ok(())
        }

        icode::CALL => {
            let sp = cpu.registers.get(RSP).wrapping_sub(8);
            memory
                .write_quad(sp as u64, *next_pc as i64)
                .map_err(|_| Status::Adr)?;
            cpu.registers.set(RSP, sp);
            *next_pc = d.valc as u64;
            Ok(())
        }

        icode::RET => {
            let sp = cpu.registers.get(RSP);
            let return_address = memory.read_quad(sp as u64).map_err(|_| Status::Adr)?;
            cpu.registers.set(RSP, sp.wrapping_add(8));
            *next_pc = return_address as u64;
            Ok(())
        }

        icode::PUSHQ => {
            let value = cpu.registers.get(d.ra);
            let sp = cpu.registers.get(RSP).wrapping_sub(8);
            memory.write_quad(sp as u64, value).map_err(|_| Status::Adr)?;
            cpu.registers.set(RSP, sp);
            Ok(())
        }

        icode::POPQ => {
            let sp = cpu.registers.get(RSP);
            let value = memory.read_quad(sp as u64).map_err(|_| Status::Adr)?;
            cpu.registers.set(RSP, sp.wrapping_add(8));
            cpu.registers.set(d.ra, value);
            Ok(())
        }

        _ => Err(Status::Ins),
    }
}

/// `D(rB)`: the displacement `valC` already carries the sign, `rB` carries
/// the base. A negative sum reinterprets as a huge `u64` and fails the
/// memory layer's range check, which is exactly the ADR fault we want.
fn effective_address(cpu: &Cpu, d: &DecodedInstruction) -> u64 {
    cpu.registers.get(d.rb).wrapping_add(d.valc) as u64
}

#[cfg(test)]
mod test {
    use super::*;

    fn decoded(icode: u8, ifun: u8, ra: u8, rb: u8, valc: i64, length: u64) -> DecodedInstruction {
        DecodedInstruction {
            icode,
            ifun,
            ra,
            rb,
            valc,
            length,
        }
    }

    #[test]
    fn rrmovq_is_conditional_on_ifun() {
        let mut cpu = Cpu::new();
        let mut memory = Memory::new(16);
        cpu.registers.set(0, 77);
        cpu.flags.zf = false;
        let mut next_pc = 0;
        let d = decoded(icode::RRMOVQ, crate::isa::cond::E, 0, 1, 0, 2);
        execute(&mut cpu, &mut memory, &d, &mut next_pc).unwrap();
        assert_eq!(cpu.registers.get(1), 0, "cmove should not move when ZF is clear");
    }

    #[test]
    fn opq_and_never_overflows() {
        let mut cpu = Cpu::new();
        let mut memory = Memory::new(16);
        cpu.registers.set(0, -1);
        cpu.registers.set(1, 5);
        let mut next_pc = 0;
        let d = decoded(icode::OPQ, alu::AND, 0, 1, 0, 2);
        execute(&mut cpu, &mut memory, &d, &mut next_pc).unwrap();
        assert_eq!(cpu.registers.get(1), 5);
        assert!(!cpu.flags.of);
    }

    #[test]
    fn push_then_pop_round_trips() {
        let mut cpu = Cpu::new();
        let mut memory = Memory::new(64);
        cpu.registers.set(RSP, 64);
        cpu.registers.set(0, 123);
        let mut next_pc = 0;
        let push = decoded(icode::PUSHQ, 0, 0, 15, 0, 2);
        execute(&mut cpu, &mut memory, &push, &mut next_pc).unwrap();
        assert_eq!(cpu.registers.get(RSP), 56);
        let pop = decoded(icode::POPQ, 0, 1, 15, 0, 2);
        execute(&mut cpu, &mut memory, &pop, &mut next_pc).unwrap();
        assert_eq!(cpu.registers.get(1), 123);
        assert_eq!(cpu.registers.get(RSP), 64);
    }

    #[test]
    fn negative_effective_address_faults_adr() {
        let mut cpu = Cpu::new();
        let mut memory = Memory::new(16);
        cpu.registers.set(1, 0);
        let mut next_pc = 0;
        let d = decoded(icode::MRMOVQ, 0, 0, 1, -8, 10);
        let err = execute(&mut cpu, &mut memory, &d, &mut next_pc).unwrap_err();
        assert_eq!(err, Status::Adr);
    }

    #[test]
    fn unknown_alu_ifun_faults_ins() {
        let mut cpu = Cpu::new();
        let mut memory = Memory::new(16);
        let mut next_pc = 0;
        let d = decoded(icode::OPQ, 0xF, 0, 1, 0, 2);
        let err = execute(&mut cpu, &mut memory, &d, &mut next_pc).unwrap_err();
        assert_eq!(err, Status::Ins);
    }
}
