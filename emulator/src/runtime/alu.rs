//! Arithmetic and logic unit.
//!
//! Every operation is a pure function of two register values. Results are
//! bytes, so overflowing arithmetic wraps around modulo 256.

use std::cmp::Ordering;

use parse_display::Display;
use thiserror::Error;
use tracing::trace;

use super::registers::Flags;
use crate::constants::Word;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display(style = "UPPERCASE")]
pub enum AluOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    /// Bitwise complement of the first operand
    Not,
    /// Only updates the flags
    Cmp,
    Shl,
    Shr,
    /// Add one to the first operand
    Inc,
    /// Subtract one from the first operand
    Dec,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AluError {
    #[error("division by zero")]
    DivisionByZero,
}

/// What the caller has to write back
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AluOutput {
    /// New value of the first operand register, if any
    pub result: Option<Word>,

    /// New comparison flags, if any
    pub flags: Option<Flags>,
}

impl AluOutput {
    const fn value(result: Word) -> Self {
        Self {
            result: Some(result),
            flags: None,
        }
    }

    const fn flags(flags: Flags) -> Self {
        Self {
            result: None,
            flags: Some(flags),
        }
    }
}

fn compare(a: Word, b: Word) -> Flags {
    match a.cmp(&b) {
        Ordering::Equal => Flags::EQUAL,
        Ordering::Less => Flags::LESS,
        Ordering::Greater => Flags::GREATER,
    }
}

/// Apply an operation on two operand values
///
/// Unary operations ignore `b`.
///
/// # Errors
///
/// `DIV` and `MOD` fail when `b` is zero.
pub fn apply(op: AluOp, a: Word, b: Word) -> Result<AluOutput, AluError> {
    let output = match op {
        AluOp::Add => AluOutput::value(a.wrapping_add(b)),
        AluOp::Sub => AluOutput::value(a.wrapping_sub(b)),
        AluOp::Mul => AluOutput::value(a.wrapping_mul(b)),
        AluOp::Div => AluOutput::value(a.checked_div(b).ok_or(AluError::DivisionByZero)?),
        AluOp::Mod => AluOutput::value(a.checked_rem(b).ok_or(AluError::DivisionByZero)?),
        AluOp::And => AluOutput::value(a & b),
        AluOp::Or => AluOutput::value(a | b),
        AluOp::Xor => AluOutput::value(a ^ b),
        AluOp::Not => AluOutput::value(!a),
        AluOp::Cmp => AluOutput::flags(compare(a, b)),
        // Shifting a byte by 8 or more clears it
        AluOp::Shl => AluOutput::value(a.checked_shl(u32::from(b)).unwrap_or(0)),
        AluOp::Shr => AluOutput::value(a.checked_shr(u32::from(b)).unwrap_or(0)),
        AluOp::Inc => AluOutput::value(a.wrapping_add(1)),
        AluOp::Dec => AluOutput::value(a.wrapping_sub(1)),
    };

    trace!(%op, a, b, ?output, "ALU");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn result(op: AluOp, a: Word, b: Word) -> Word {
        apply(op, a, b).unwrap().result.unwrap()
    }

    #[test]
    fn add_sub_wrap_test() {
        for a in 0..=Word::MAX {
            for b in 0..=Word::MAX {
                let expected_add = ((u16::from(a) + u16::from(b)) % 256) as Word;
                let expected_sub = ((i16::from(a) - i16::from(b)).rem_euclid(256)) as Word;
                assert_eq!(result(AluOp::Add, a, b), expected_add);
                assert_eq!(result(AluOp::Sub, a, b), expected_sub);
            }
        }
    }

    #[test]
    fn mul_test() {
        assert_eq!(result(AluOp::Mul, 8, 9), 72);
        assert_eq!(result(AluOp::Mul, 16, 16), 0);
        assert_eq!(result(AluOp::Mul, 200, 2), 144);
    }

    #[test]
    fn div_mod_test() {
        assert_eq!(result(AluOp::Div, 10, 3), 3);
        assert_eq!(result(AluOp::Mod, 10, 3), 1);
        assert_eq!(apply(AluOp::Div, 10, 0), Err(AluError::DivisionByZero));
        assert_eq!(apply(AluOp::Mod, 10, 0), Err(AluError::DivisionByZero));
    }

    #[test]
    fn bitwise_test() {
        assert_eq!(result(AluOp::And, 0b1100, 0b1010), 0b1000);
        assert_eq!(result(AluOp::Or, 0b1100, 0b1010), 0b1110);
        assert_eq!(result(AluOp::Xor, 0b1100, 0b1010), 0b0110);
        assert_eq!(result(AluOp::Not, 0b0000_1111, 0xAA), 0b1111_0000);
    }

    #[test]
    fn shift_test() {
        assert_eq!(result(AluOp::Shl, 0b0000_0011, 2), 0b0000_1100);
        assert_eq!(result(AluOp::Shl, 0b1000_0001, 1), 0b0000_0010);
        assert_eq!(result(AluOp::Shr, 0b1000_0000, 7), 1);
        assert_eq!(result(AluOp::Shl, 0xFF, 8), 0);
        assert_eq!(result(AluOp::Shr, 0xFF, 200), 0);
    }

    #[test]
    fn inc_dec_test() {
        assert_eq!(result(AluOp::Inc, 41, 0), 42);
        assert_eq!(result(AluOp::Inc, 0xFF, 0), 0);
        assert_eq!(result(AluOp::Dec, 43, 0), 42);
        assert_eq!(result(AluOp::Dec, 0, 0), 0xFF);
    }

    #[test]
    fn cmp_test() {
        let flags = |a, b| apply(AluOp::Cmp, a, b).unwrap();
        assert_eq!(flags(5, 5), AluOutput::flags(Flags::EQUAL));
        assert_eq!(flags(3, 5), AluOutput::flags(Flags::LESS));
        assert_eq!(flags(7, 5), AluOutput::flags(Flags::GREATER));
    }

    #[test]
    fn display_test() {
        assert_eq!(AluOp::Mul.to_string(), "MUL");
        assert_eq!(AluOp::Shr.to_string(), "SHR");
    }
}
