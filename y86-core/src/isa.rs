//! Instruction encoding constants shared by the assembler and the interpreter.
//!
//! Mirrors the layout of the teacher's `opcodes.rs` / `constants.rs`: plain
//! `u8` codes plus small lookup tables, rather than an enum-per-instruction,
//! so that adding an instruction is a one-line table edit.

/// High nibble of the opcode byte: selects the instruction class.
#[rustfmt::skip]
pub mod icode {
    pub const HALT:   u8 = 0x0;
    pub const NOP:    u8 = 0x1;
    pub const RRMOVQ: u8 = 0x2; // also cmovXX
    pub const IRMOVQ: u8 = 0x3;
    pub const RMMOVQ: u8 = 0x4;
    pub const MRMOVQ: u8 = 0x5;
    pub const OPQ:    u8 = 0x6;
    pub const JXX:    u8 = 0x7;
    pub const CALL:   u8 = 0x8;
    pub const RET:    u8 = 0x9;
    pub const PUSHQ:  u8 = 0xA;
    pub const POPQ:   u8 = 0xB;
}

/// Low nibble for `OPq` instructions.
#[rustfmt::skip]
pub mod alu {
    pub const ADD: u8 = 0x0;
    pub const SUB: u8 = 0x1;
    pub const AND: u8 = 0x2;
    pub const XOR: u8 = 0x3;
}

/// Low nibble shared by `cmovXX` and `jXX`.
#[rustfmt::skip]
pub mod cond {
    pub const YES: u8 = 0x0;
    pub const LE:  u8 = 0x1;
    pub const L:   u8 = 0x2;
    pub const E:   u8 = 0x3;
    pub const NE:  u8 = 0x4;
    pub const GE:  u8 = 0x5;
    pub const G:   u8 = 0x6;
}

/// No-register sentinel; both reads and writes through this index are no-ops.
pub const RNONE: u8 = 15;

/// Canonical register indices, in the order the spec lists them.
pub const REGISTER_NAMES: [&str; 15] = [
    "rax", "rcx", "rdx", "rbx", "rsp", "rbp", "rsi", "rdi", "r8", "r9", "r10", "r11", "r12",
    "r13", "r14",
];

/// Looks up a register index by its bare (no `%`) lowercase name.
pub fn register_index(name: &str) -> Option<u8> {
    REGISTER_NAMES
        .iter()
        .position(|n| *n == name)
        .map(|i| i as u8)
}

/// Returns the byte length of an instruction given its icode, or `None` if
/// the icode does not name a valid instruction class.
pub fn instruction_length(icode: u8) -> Option<u64> {
    match icode {
        icode::HALT | icode::NOP | icode::RET => Some(1),
        icode::RRMOVQ | icode::OPQ | icode::PUSHQ | icode::POPQ => Some(2),
        icode::JXX | icode::CALL => Some(9),
        icode::IRMOVQ | icode::RMMOVQ | icode::MRMOVQ => Some(10),
        _ => None,
    }
}

/// A table of `(mnemonic, icode, ifun)`, the static mapping the assembler
/// dispatches on instead of chained string conditionals.
#[rustfmt::skip]
pub const MNEMONICS: &[(&str, u8, u8)] = &[
    ("halt",   icode::HALT,   0),
    ("nop",    icode::NOP,    0),
    ("rrmovq", icode::RRMOVQ, cond::YES),
    ("cmovle", icode::RRMOVQ, cond::LE),
    ("cmovl",  icode::RRMOVQ, cond::L),
    ("cmove",  icode::RRMOVQ, cond::E),
    ("cmovne", icode::RRMOVQ, cond::NE),
    ("cmovge", icode::RRMOVQ, cond::GE),
    ("cmovg",  icode::RRMOVQ, cond::G),
    ("irmovq", icode::IRMOVQ, 0),
    ("rmmovq", icode::RMMOVQ, 0),
    ("mrmovq", icode::MRMOVQ, 0),
    ("addq",   icode::OPQ,    alu::ADD),
    ("subq",   icode::OPQ,    alu::SUB),
    ("andq",   icode::OPQ,    alu::AND),
    ("xorq",   icode::OPQ,    alu::XOR),
    ("jmp",    icode::JXX,    cond::YES),
    ("jle",    icode::JXX,    cond::LE),
    ("jl",     icode::JXX,    cond::L),
    ("je",     icode::JXX,    cond::E),
    ("jne",    icode::JXX,    cond::NE),
    ("jge",    icode::JXX,    cond::GE),
    ("jg",     icode::JXX,    cond::G),
    ("call",   icode::CALL,   0),
    ("ret",    icode::RET,    0),
    ("pushq",  icode::PUSHQ,  0),
    ("popq",   icode::POPQ,   0),
];

/// Shape of an instruction's operand list, used by the assembler to decide
/// how to parse the rest of the line once a mnemonic has been matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandShape {
    /// `halt`, `nop`, `ret` — nothing follows.
    None,
    /// `rrmovq rA, rB` / `cmovXX rA, rB` / `addq rA, rB` (etc).
    RegReg,
    /// `irmovq V, rB`
    ValueReg,
    /// `rmmovq rA, D(rB)`
    RegMem,
    /// `mrmovq D(rB), rA`
    MemReg,
    /// `jXX Dest` / `call Dest`
    Dest,
    /// `pushq rA` / `popq rA`
    Reg,
}

pub fn operand_shape(icode: u8) -> OperandShape {
    match icode {
        icode::HALT | icode::NOP | icode::RET => OperandShape::None,
        icode::RRMOVQ | icode::OPQ => OperandShape::RegReg,
        icode::IRMOVQ => OperandShape::ValueReg,
        icode::RMMOVQ => OperandShape::RegMem,
        icode::MRMOVQ => OperandShape::MemReg,
        icode::JXX | icode::CALL => OperandShape::Dest,
        icode::PUSHQ | icode::POPQ => OperandShape::Reg,
        _ => OperandShape::None,
    }
}
