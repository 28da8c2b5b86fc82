//! Two-pass Y86-64 assembler.
//!
//! Grounded on the teacher's `AsmLexer` (`cpu-6502/src/asm.rs`) for the overall
//! shape — a line-oriented scan building an output buffer plus a label
//! table, errors carrying row/column context rendered with `colored` — and
//! on `original_source/assembler.py` for the exact directive, operand, and
//! two-pass-fixup semantics (the teacher's 6502 assembler has no forward
//! label references to resolve; this one follows the Python original's
//! `pending_labels` list instead). Unlike the teacher's `LabelTable`,
//! which interns strings behind indices for its token-stream encoder,
//! labels here are tracked directly as a `HashMap<String, u64>`: this
//! assembler emits bytes line-by-line rather than building a token stream
//! first, so there is no string stream to intern against.

use std::collections::HashMap;

pub use crate::error::{AssemblerError, AssemblerErrorKind};
use crate::isa::{self, OperandShape};

enum ValueOrLabel {
    Value(i64),
    Label(String),
}

struct PendingFixup {
    offset: usize,
    label: String,
    line_num: usize,
}

pub struct Assembler {
    labels: HashMap<String, u64>,
    output: Vec<u8>,
    address: u64,
    pending: Vec<PendingFixup>,
}

impl Assembler {
    pub fn new() -> Assembler {
        Assembler {
            labels: HashMap::new(),
            output: Vec::new(),
            address: 0,
            pending: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.labels.clear();
        self.output.clear();
        self.address = 0;
        self.pending.clear();
    }

    pub fn labels(&self) -> &HashMap<String, u64> {
        &self.labels
    }

    /// Runs both passes over `source` and returns the positioned byte
    /// image. No partial image is returned on error: on the first error
    /// from either pass, `self.output` is left exactly as it stood (never
    /// handed back to the caller).
    pub fn assemble(&mut self, source: &str) -> Result<Vec<u8>, AssemblerError> {
        self.reset();
        for (index, raw_line) in source.lines().enumerate() {
            self.assemble_line(raw_line, index + 1)?;
        }
        self.resolve_labels()?;
        Ok(self.output.clone())
    }

    fn assemble_line(&mut self, raw_line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let mut line = strip_comment(raw_line).trim();
        if line.is_empty() {
            return Ok(());
        }

        if let Some(colon) = line.find(':') {
            let label_name = line[..colon].trim();
            if !is_identifier(label_name) {
                return Err(AssemblerError::new(
                    AssemblerErrorKind::BadImmediate,
                    line_num,
                    raw_line,
                    format!("'{label_name}' is not a valid label name"),
                ));
            }
            if self.labels.contains_key(label_name) {
                return Err(AssemblerError::new(
                    AssemblerErrorKind::DuplicateLabel,
                    line_num,
                    raw_line,
                    format!("label '{label_name}' is already defined"),
                ));
            }
            self.labels.insert(label_name.to_string(), self.address);
            line = line[colon + 1..].trim();
            if line.is_empty() {
                return Ok(());
            }
        }

        let (mnemonic, operand_str) = match line.find(char::is_whitespace) {
            Some(idx) => (&line[..idx], line[idx..].trim()),
            None => (line, ""),
        };
        let mnemonic_lower = mnemonic.to_lowercase();

        match mnemonic_lower.as_str() {
            ".pos" => {
                let addr = self.parse_number_token(operand_str, line_num, raw_line)?;
                self.set_pos(addr as u64);
                Ok(())
            }
            ".align" => {
                let n = self.parse_number_token(operand_str, line_num, raw_line)? as u64;
                while self.address % n != 0 {
                    self.emit_byte(0);
                }
                Ok(())
            }
            ".quad" => match self.parse_value_or_label(operand_str, line_num, raw_line)? {
                ValueOrLabel::Value(v) => {
                    self.emit_quad(v);
                    Ok(())
                }
                ValueOrLabel::Label(name) => {
                    self.emit_label_ref(name, line_num);
                    Ok(())
                }
            },
            _ => self.assemble_instruction(&mnemonic_lower, operand_str, line_num, raw_line),
        }
    }

    fn assemble_instruction(
        &mut self,
        mnemonic: &str,
        operand_str: &str,
        line_num: usize,
        raw_line: &str,
    ) -> Result<(), AssemblerError> {
        let (icode, ifun) = isa::MNEMONICS
            .iter()
            .find(|(name, _, _)| *name == mnemonic)
            .map(|(_, icode, ifun)| (*icode, *ifun))
            .ok_or_else(|| {
                AssemblerError::new(
                    AssemblerErrorKind::UnknownInstruction,
                    line_num,
                    raw_line,
                    format!("unknown instruction '{mnemonic}'"),
                )
            })?;

        match isa::operand_shape(icode) {
            OperandShape::None => {
                if !operand_str.is_empty() {
                    return Err(self.wrong_arity(mnemonic, line_num, raw_line));
                }
                self.emit_byte((icode << 4) | ifun);
            }
            OperandShape::RegReg => {
                let parts = split_operands(operand_str);
                if parts.len() != 2 {
                    return Err(self.wrong_arity(mnemonic, line_num, raw_line));
                }
                let ra = self.parse_register(parts[0], line_num, raw_line)?;
                let rb = self.parse_register(parts[1], line_num, raw_line)?;
                self.emit_byte((icode << 4) | ifun);
                self.emit_byte((ra << 4) | rb);
            }
            OperandShape::ValueReg => {
                let parts = split_operands(operand_str);
                if parts.len() != 2 {
                    return Err(self.wrong_arity(mnemonic, line_num, raw_line));
                }
                let rb = self.parse_register(parts[1], line_num, raw_line)?;
                self.emit_byte((icode << 4) | ifun);
                self.emit_byte((isa::RNONE << 4) | rb);
                match self.parse_value_or_label(parts[0], line_num, raw_line)? {
                    ValueOrLabel::Value(v) => self.emit_quad(v),
                    ValueOrLabel::Label(name) => self.emit_label_ref(name, line_num),
                }
            }
            OperandShape::RegMem => {
                let parts = split_operands(operand_str);
                if parts.len() != 2 {
                    return Err(self.wrong_arity(mnemonic, line_num, raw_line));
                }
                let ra = self.parse_register(parts[0], line_num, raw_line)?;
                let (disp, rb) = self.parse_memory_operand(parts[1], line_num, raw_line)?;
                self.emit_byte((icode << 4) | ifun);
                self.emit_byte((ra << 4) | rb);
                self.emit_quad(disp);
            }
            OperandShape::MemReg => {
                let parts = split_operands(operand_str);
                if parts.len() != 2 {
                    return Err(self.wrong_arity(mnemonic, line_num, raw_line));
                }
                let (disp, rb) = self.parse_memory_operand(parts[0], line_num, raw_line)?;
                let ra = self.parse_register(parts[1], line_num, raw_line)?;
                self.emit_byte((icode << 4) | ifun);
                self.emit_byte((ra << 4) | rb);
                self.emit_quad(disp);
            }
            OperandShape::Dest => {
                let tok = operand_str.trim();
                if tok.is_empty() {
                    return Err(self.wrong_arity(mnemonic, line_num, raw_line));
                }
                self.emit_byte((icode << 4) | ifun);
                match self.parse_value_or_label(tok, line_num, raw_line)? {
                    ValueOrLabel::Value(v) => self.emit_quad(v),
                    ValueOrLabel::Label(name) => self.emit_label_ref(name, line_num),
                }
            }
            OperandShape::Reg => {
                let tok = operand_str.trim();
                if tok.is_empty() {
                    return Err(self.wrong_arity(mnemonic, line_num, raw_line));
                }
                let ra = self.parse_register(tok, line_num, raw_line)?;
                self.emit_byte((icode << 4) | ifun);
                self.emit_byte((ra << 4) | isa::RNONE);
            }
        }
        Ok(())
    }

    fn wrong_arity(&self, mnemonic: &str, line_num: usize, raw_line: &str) -> AssemblerError {
        AssemblerError::new(
            AssemblerErrorKind::WrongArity,
            line_num,
            raw_line,
            format!("wrong number of operands for '{mnemonic}'"),
        )
    }

    fn parse_register(
        &self,
        tok: &str,
        line_num: usize,
        raw_line: &str,
    ) -> Result<u8, AssemblerError> {
        let tok = tok.trim();
        let name = tok.strip_prefix('%').ok_or_else(|| {
            AssemblerError::new(
                AssemblerErrorKind::InvalidRegister,
                line_num,
                raw_line,
                format!("expected a register, found '{tok}'"),
            )
        })?;
        isa::register_index(&name.to_lowercase()).ok_or_else(|| {
            AssemblerError::new(
                AssemblerErrorKind::InvalidRegister,
                line_num,
                raw_line,
                format!("unknown register '{tok}'"),
            )
        })
    }

    fn parse_memory_operand(
        &self,
        tok: &str,
        line_num: usize,
        raw_line: &str,
    ) -> Result<(i64, u8), AssemblerError> {
        let tok = tok.trim();
        let bad = || {
            AssemblerError::new(
                AssemblerErrorKind::InvalidMemoryOperand,
                line_num,
                raw_line,
                format!("invalid memory operand '{tok}'"),
            )
        };
        let open = tok.find('(').ok_or_else(bad)?;
        if !tok.ends_with(')') {
            return Err(bad());
        }
        let disp_str = tok[..open].trim();
        let reg_str = &tok[open + 1..tok.len() - 1];
        let disp = if disp_str.is_empty() {
            0
        } else {
            self.parse_number_token(disp_str, line_num, raw_line)?
        };
        let reg = self.parse_register(reg_str, line_num, raw_line)?;
        Ok((disp, reg))
    }

    fn parse_number_token(
        &self,
        tok: &str,
        line_num: usize,
        raw_line: &str,
    ) -> Result<i64, AssemblerError> {
        let trimmed = tok.trim();
        let core = trimmed.strip_prefix('$').unwrap_or(trimmed);
        parse_number(core).ok_or_else(|| {
            AssemblerError::new(
                AssemblerErrorKind::BadImmediate,
                line_num,
                raw_line,
                format!("invalid immediate '{tok}'"),
            )
        })
    }

    /// `irmovq`'s value operand, and `.quad`/`jXX`/`call`'s destination,
    /// all accept either a literal or a label reference (with or without
    /// a leading `$`): the Open Question this resolves in favor of
    /// accepting both forms.
    fn parse_value_or_label(
        &self,
        tok: &str,
        line_num: usize,
        raw_line: &str,
    ) -> Result<ValueOrLabel, AssemblerError> {
        let trimmed = tok.trim();
        if trimmed.is_empty() {
            return Err(AssemblerError::new(
                AssemblerErrorKind::BadImmediate,
                line_num,
                raw_line,
                "expected a value or label, found nothing".to_string(),
            ));
        }
        let core = trimmed.strip_prefix('$').unwrap_or(trimmed);
        if let Some(n) = parse_number(core) {
            return Ok(ValueOrLabel::Value(n));
        }
        if is_identifier(core) {
            return Ok(ValueOrLabel::Label(core.to_string()));
        }
        Err(AssemblerError::new(
            AssemblerErrorKind::BadImmediate,
            line_num,
            raw_line,
            format!("'{tok}' is neither a valid immediate nor a label"),
        ))
    }

    fn emit_label_ref(&mut self, name: String, line_num: usize) {
        if let Some(&addr) = self.labels.get(&name) {
            self.emit_quad(addr as i64);
        } else {
            self.pending.push(PendingFixup {
                offset: self.address as usize,
                label: name,
                line_num,
            });
            self.emit_quad(0);
        }
    }

    fn set_pos(&mut self, address: u64) {
        if address as usize > self.output.len() {
            self.output.resize(address as usize, 0);
        }
        self.address = address;
    }

    fn emit_byte(&mut self, byte: u8) {
        let idx = self.address as usize;
        if idx < self.output.len() {
            self.output[idx] = byte;
        } else {
            if idx > self.output.len() {
                self.output.resize(idx, 0);
            }
            self.output.push(byte);
        }
        self.address += 1;
    }

    fn emit_quad(&mut self, value: i64) {
        for byte in value.to_le_bytes() {
            self.emit_byte(byte);
        }
    }

    fn resolve_labels(&mut self) -> Result<(), AssemblerError> {
        for fixup in &self.pending {
            let address = *self.labels.get(&fixup.label).ok_or_else(|| {
                AssemblerError::new(
                    AssemblerErrorKind::UndefinedLabel,
                    fixup.line_num,
                    "",
                    format!("undefined label '{}'", fixup.label),
                )
            })?;
            let encoded = (address as i64).to_le_bytes();
            self.output[fixup.offset..fixup.offset + 8].copy_from_slice(&encoded);
        }
        Ok(())
    }
}

fn strip_comment(line: &str) -> &str {
    let hash = line.find('#');
    let slashes = line.find("//");
    match (hash, slashes) {
        (Some(h), Some(s)) => &line[..h.min(s)],
        (Some(h), None) => &line[..h],
        (None, Some(s)) => &line[..s],
        (None, None) => line,
    }
}

fn split_operands(s: &str) -> Vec<&str> {
    if s.is_empty() {
        return Vec::new();
    }
    s.split(',').map(str::trim).collect()
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_number(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let (neg, rest) = match s.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, s),
    };
    let value = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else {
        rest.parse::<i64>().ok()?
    };
    Some(if neg { -value } else { value })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn assembles_halt() {
        let mut asm = Assembler::new();
        let bytes = asm.assemble("halt").unwrap();
        assert_eq!(bytes, vec![0x00]);
    }

    #[test]
    fn assembles_irmovq_and_rrmovq() {
        let mut asm = Assembler::new();
        let bytes = asm
            .assemble("irmovq $100, %rax\nrrmovq %rax, %rbx\nhalt")
            .unwrap();
        let mut expected = vec![0x30, 0xF0];
        expected.extend_from_slice(&100i64.to_le_bytes());
        expected.push(0x20);
        expected.push(0x03);
        expected.push(0x00);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn resolves_forward_labels() {
        let mut asm = Assembler::new();
        let bytes = asm
            .assemble("    call f\n    halt\nf:  irmovq $42, %rax\n    ret")
            .unwrap();
        // call opcode + 8-byte dest pointing at address 9 (after call+halt).
        assert_eq!(bytes[0], 0x80);
        assert_eq!(i64::from_le_bytes(bytes[1..9].try_into().unwrap()), 9);
    }

    #[test]
    fn undefined_label_fails_assembly() {
        let mut asm = Assembler::new();
        let err = asm.assemble("jmp nowhere\nhalt").unwrap_err();
        assert_eq!(err.kind, AssemblerErrorKind::UndefinedLabel);
    }

    #[test]
    fn duplicate_label_is_an_error() {
        let mut asm = Assembler::new();
        let err = asm.assemble("a: halt\na: nop").unwrap_err();
        assert_eq!(err.kind, AssemblerErrorKind::DuplicateLabel);
    }

    #[test]
    fn pos_zero_extends_gaps() {
        let mut asm = Assembler::new();
        let bytes = asm.assemble(".pos 4\n.quad 1").unwrap();
        assert_eq!(&bytes[0..4], &[0, 0, 0, 0]);
        assert_eq!(i64::from_le_bytes(bytes[4..12].try_into().unwrap()), 1);
    }

    #[test]
    fn align_pads_to_boundary() {
        let mut asm = Assembler::new();
        let bytes = asm.assemble("halt\n.align 8\n.quad 7").unwrap();
        assert_eq!(bytes.len(), 16);
    }

    #[test]
    fn quad_accepts_hex_and_negative_literals() {
        let mut asm = Assembler::new();
        let bytes = asm.assemble(".quad 0x10\n.quad -1").unwrap();
        assert_eq!(i64::from_le_bytes(bytes[0..8].try_into().unwrap()), 0x10);
        assert_eq!(i64::from_le_bytes(bytes[8..16].try_into().unwrap()), -1);
    }

    #[test]
    fn unknown_instruction_is_reported() {
        let mut asm = Assembler::new();
        let err = asm.assemble("frobnicate %rax").unwrap_err();
        assert_eq!(err.kind, AssemblerErrorKind::UnknownInstruction);
    }

    #[test]
    fn invalid_register_is_reported() {
        let mut asm = Assembler::new();
        let err = asm.assemble("irmovq $1, %notareg").unwrap_err();
        assert_eq!(err.kind, AssemblerErrorKind::InvalidRegister);
    }

    #[test]
    fn memory_operand_with_default_displacement() {
        let mut asm = Assembler::new();
        let bytes = asm.assemble("mrmovq (%rsp), %rax").unwrap();
        assert_eq!(bytes[0], 0x50);
        assert_eq!(i64::from_le_bytes(bytes[2..10].try_into().unwrap()), 0);
    }

    #[test]
    fn mnemonics_and_registers_are_case_insensitive() {
        let mut asm = Assembler::new();
        let bytes = asm.assemble("IRMOVQ $1, %RAX").unwrap();
        assert_eq!(bytes[0], 0x30);
    }

    #[test]
    fn irmovq_accepts_a_bare_label_value() {
        let mut asm = Assembler::new();
        let bytes = asm.assemble("irmovq start, %rax\nstart: halt").unwrap();
        assert_eq!(
            i64::from_le_bytes(bytes[2..10].try_into().unwrap()),
            10 // address right after the 10-byte irmovq
        );
    }
}
