//! Assembly-time error type.
//!
//! Grounded on the teacher's `ParseError` (`src/asm.rs`): both carry the
//! offending line number and a few lines of surrounding source for
//! context. The teacher's version panics (`panic_nicely`); this one stays
//! a plain `Result` all the way out to the caller, per the spec's
//! requirement that assembly errors never abort via panic — only
//! `render` (used by the CLI) reaches for `colored` to highlight it.

use colored::*;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerErrorKind {
    UnknownInstruction,
    InvalidRegister,
    InvalidMemoryOperand,
    WrongArity,
    UndefinedLabel,
    BadImmediate,
    DuplicateLabel,
}

impl AssemblerErrorKind {
    fn tag(self) -> &'static str {
        match self {
            AssemblerErrorKind::UnknownInstruction => "UNKNOWN_INSTRUCTION",
            AssemblerErrorKind::InvalidRegister => "INVALID_REGISTER",
            AssemblerErrorKind::InvalidMemoryOperand => "INVALID_MEMORY_OPERAND",
            AssemblerErrorKind::WrongArity => "WRONG_ARITY",
            AssemblerErrorKind::UndefinedLabel => "UNDEFINED_LABEL",
            AssemblerErrorKind::BadImmediate => "BAD_IMMEDIATE",
            AssemblerErrorKind::DuplicateLabel => "DUPLICATE_LABEL",
        }
    }
}

#[derive(Debug, Error, Clone)]
#[error("{kind_tag} at line {line_num}: {message}")]
pub struct AssemblerError {
    pub kind: AssemblerErrorKind,
    pub line_num: usize,
    pub line_text: String,
    pub message: String,
    kind_tag: &'static str,
}

impl AssemblerError {
    pub fn new(
        kind: AssemblerErrorKind,
        line_num: usize,
        line_text: impl Into<String>,
        message: impl Into<String>,
    ) -> AssemblerError {
        AssemblerError {
            kind,
            line_num,
            line_text: line_text.into(),
            message: message.into(),
            kind_tag: kind.tag(),
        }
    }

    /// Renders a few lines of context around the error, in the teacher's
    /// cyan-line-number / bright-red-arrow style.
    pub fn render(&self, source: &str) -> String {
        let range = 2i64;
        let error_row = self.line_num.saturating_sub(1) as i64;
        let min = (error_row - range).max(0) as usize;
        let max = (error_row + range) as usize;

        let mut out = String::from("\n");
        for (row_index, row_text) in source.lines().enumerate() {
            if row_index > max {
                break;
            }
            if row_index < min {
                continue;
            }
            out.push_str(&format!("{}", format!("{:>4}: ", row_index + 1).cyan()));
            out.push_str(&format!("{}\n", row_text.bright_white()));
            if row_index == error_row as usize {
                out.push_str(&format!(
                    "      {}\n",
                    format!("^ {} — {}", self.kind_tag, self.message).bright_red()
                ));
            }
        }
        out
    }
}
