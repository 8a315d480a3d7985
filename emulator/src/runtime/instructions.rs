use std::io::Write;

use parse_display::Display;
use thiserror::Error;
use tracing::debug;

use super::{
    alu::{self, AluError, AluOp},
    config::IncDecMode,
    memory::MemoryError,
    registers::{Flags, Reg, RegisterError},
    Computer, HaltReason, ProcessorError,
};
use crate::constants::{Address, Word};

/// Class of an opcode, as listed in the opcode table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpClass {
    Halt,
    DataMove,
    Output,
    Stack,
    Subroutine,
    Branch,
    Alu,
}

/// Every opcode understood by the machine
///
/// The encoding is `AABCDDDD`: `AA` is the number of operands, `B` is set for
/// ALU operations and `C` for instructions that set the program counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display(style = "UPPERCASE")]
#[repr(u8)]
pub enum Opcode {
    Hlt = 0x01,
    Ret = 0x11,
    Push = 0x45,
    Pop = 0x46,
    Prn = 0x47,
    Pra = 0x48,
    Call = 0x50,
    Jmp = 0x54,
    Jeq = 0x55,
    Jne = 0x56,
    Dec = 0x65,
    Inc = 0x66,
    Not = 0x69,
    Ldi = 0x82,
    Ld = 0x83,
    Add = 0xA0,
    Sub = 0xA1,
    Mul = 0xA2,
    Div = 0xA3,
    Mod = 0xA4,
    Cmp = 0xA7,
    And = 0xA8,
    Or = 0xAA,
    Xor = 0xAB,
    Shl = 0xAC,
    Shr = 0xAD,
}

impl Opcode {
    pub const ALL: [Opcode; 26] = [
        Opcode::Hlt,
        Opcode::Ret,
        Opcode::Push,
        Opcode::Pop,
        Opcode::Prn,
        Opcode::Pra,
        Opcode::Call,
        Opcode::Jmp,
        Opcode::Jeq,
        Opcode::Jne,
        Opcode::Dec,
        Opcode::Inc,
        Opcode::Not,
        Opcode::Ldi,
        Opcode::Ld,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Mod,
        Opcode::Cmp,
        Opcode::And,
        Opcode::Or,
        Opcode::Xor,
        Opcode::Shl,
        Opcode::Shr,
    ];

    #[must_use]
    pub const fn class(self) -> OpClass {
        use Opcode::*;

        match self {
            Hlt => OpClass::Halt,
            Ldi | Ld => OpClass::DataMove,
            Prn | Pra => OpClass::Output,
            Push | Pop => OpClass::Stack,
            Call | Ret => OpClass::Subroutine,
            Jmp | Jeq | Jne => OpClass::Branch,
            Dec | Inc | Not | Add | Sub | Mul | Div | Mod | Cmp | And | Or | Xor | Shl | Shr => {
                OpClass::Alu
            }
        }
    }

    /// Number of operand bytes following the opcode
    #[must_use]
    pub const fn operands(self) -> u8 {
        use Opcode::*;

        match self {
            Hlt | Ret => 0,
            Push | Pop | Prn | Pra | Call | Jmp | Jeq | Jne | Dec | Inc | Not => 1,
            Ldi | Ld | Add | Sub | Mul | Div | Mod | Cmp | And | Or | Xor | Shl | Shr => 2,
        }
    }

    /// Total size of the instruction in bytes
    #[must_use]
    pub const fn width(self) -> u8 {
        self.operands() + 1
    }

    /// ALU operation computed by this opcode
    ///
    /// In [`IncDecMode::Observed`], `INC` decrements and `DEC` increments.
    #[must_use]
    pub const fn alu_op(self, inc_dec: IncDecMode) -> Option<AluOp> {
        let op = match (self, inc_dec) {
            (Opcode::Inc, IncDecMode::Observed) | (Opcode::Dec, IncDecMode::Named) => AluOp::Dec,
            (Opcode::Dec, IncDecMode::Observed) | (Opcode::Inc, IncDecMode::Named) => AluOp::Inc,
            (Opcode::Not, _) => AluOp::Not,
            (Opcode::Add, _) => AluOp::Add,
            (Opcode::Sub, _) => AluOp::Sub,
            (Opcode::Mul, _) => AluOp::Mul,
            (Opcode::Div, _) => AluOp::Div,
            (Opcode::Mod, _) => AluOp::Mod,
            (Opcode::Cmp, _) => AluOp::Cmp,
            (Opcode::And, _) => AluOp::And,
            (Opcode::Or, _) => AluOp::Or,
            (Opcode::Xor, _) => AluOp::Xor,
            (Opcode::Shl, _) => AluOp::Shl,
            (Opcode::Shr, _) => AluOp::Shr,
            _ => return None,
        };
        Some(op)
    }
}

impl TryFrom<Word> for Opcode {
    type Error = DecodeError;

    fn try_from(byte: Word) -> Result<Self, Self::Error> {
        Opcode::ALL
            .into_iter()
            .find(|&opcode| opcode as Word == byte)
            .ok_or(DecodeError::UnknownOpcode(byte))
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(Word),

    #[error(transparent)]
    Register(#[from] RegisterError),

    #[error("instruction truncated by the end of the image")]
    Truncated,
}

/// A decoded instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Instruction {
    /// Stop the machine
    #[display("HLT")]
    Hlt,

    /// Load a literal in a register
    #[display("LDI {0}, {1}")]
    Ldi(Reg, Word),

    /// Load a register with the memory cell addressed by another register
    #[display("LD {0}, {1}")]
    Ld(Reg, Reg),

    /// Print a register as a decimal number
    #[display("PRN {0}")]
    Prn(Reg),

    /// Print a register as a character
    #[display("PRA {0}")]
    Pra(Reg),

    #[display("PUSH {0}")]
    Push(Reg),

    #[display("POP {0}")]
    Pop(Reg),

    /// Push the return address and jump to the address in the register
    #[display("CALL {0}")]
    Call(Reg),

    /// Pop the return address and jump to it
    #[display("RET")]
    Ret,

    #[display("JMP {0}")]
    Jmp(Reg),

    #[display("JEQ {0}")]
    Jeq(Reg),

    #[display("JNE {0}")]
    Jne(Reg),

    /// ALU operation on a single register
    #[display("{0} {1}")]
    Unary(Opcode, Reg),

    /// ALU operation writing back to the first register
    #[display("{0} {1}, {2}")]
    Binary(Opcode, Reg, Reg),
}

/// What the engine does with the program counter after an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Next,
    Jump(Address),
    Halt(HaltReason),
}

impl Instruction {
    /// Decode an instruction from its opcode and operand bytes
    ///
    /// Unused operand bytes are ignored.
    ///
    /// # Errors
    ///
    /// Fails if a register operand is out of range.
    pub fn decode(opcode: Opcode, operands: [Word; 2]) -> Result<Self, RegisterError> {
        let [a, b] = operands;

        let instruction = match opcode {
            Opcode::Hlt => Self::Hlt,
            Opcode::Ret => Self::Ret,
            Opcode::Ldi => Self::Ldi(Reg::try_from(a)?, b),
            Opcode::Ld => Self::Ld(Reg::try_from(a)?, Reg::try_from(b)?),
            Opcode::Prn => Self::Prn(Reg::try_from(a)?),
            Opcode::Pra => Self::Pra(Reg::try_from(a)?),
            Opcode::Push => Self::Push(Reg::try_from(a)?),
            Opcode::Pop => Self::Pop(Reg::try_from(a)?),
            Opcode::Call => Self::Call(Reg::try_from(a)?),
            Opcode::Jmp => Self::Jmp(Reg::try_from(a)?),
            Opcode::Jeq => Self::Jeq(Reg::try_from(a)?),
            Opcode::Jne => Self::Jne(Reg::try_from(a)?),
            Opcode::Dec | Opcode::Inc | Opcode::Not => Self::Unary(opcode, Reg::try_from(a)?),
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::Cmp
            | Opcode::And
            | Opcode::Or
            | Opcode::Xor
            | Opcode::Shl
            | Opcode::Shr => Self::Binary(opcode, Reg::try_from(a)?, Reg::try_from(b)?),
        };

        Ok(instruction)
    }

    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::Hlt => Opcode::Hlt,
            Self::Ldi(..) => Opcode::Ldi,
            Self::Ld(..) => Opcode::Ld,
            Self::Prn(_) => Opcode::Prn,
            Self::Pra(_) => Opcode::Pra,
            Self::Push(_) => Opcode::Push,
            Self::Pop(_) => Opcode::Pop,
            Self::Call(_) => Opcode::Call,
            Self::Ret => Opcode::Ret,
            Self::Jmp(_) => Opcode::Jmp,
            Self::Jeq(_) => Opcode::Jeq,
            Self::Jne(_) => Opcode::Jne,
            Self::Unary(opcode, _) | Self::Binary(opcode, _, _) => *opcode,
        }
    }

    /// Execute the instruction
    ///
    /// The program counter is left untouched, the returned [`Flow`] tells
    /// the engine where to go next.
    #[tracing::instrument(skip(computer, out), level = "trace")]
    pub(crate) fn execute<W: Write + ?Sized>(
        &self,
        computer: &mut Computer,
        out: &mut W,
    ) -> Result<Flow, ProcessorError> {
        use Instruction::*;

        let pc = computer.pc;
        let out_of_range = |source: MemoryError| ProcessorError::AddressOutOfRange { pc, source };

        match *self {
            Hlt => return Ok(Flow::Halt(HaltReason::Halt)),

            Ldi(reg, value) => computer.registers.set_reg(reg, value),

            Ld(dst, src) => {
                let address = Address::from(computer.registers.reg(src));
                let value = computer.memory.get(address).map_err(out_of_range)?;
                debug!("[{:#04x}] => {:#04x}", address, value);
                computer.registers.set_reg(dst, value);
            }

            Prn(reg) => writeln!(out, "{}", computer.registers.reg(reg))?,

            Pra(reg) => write!(out, "{}", char::from(computer.registers.reg(reg)))?,

            Push(reg) => {
                let value = computer.registers.reg(reg);
                computer.push(value).map_err(out_of_range)?;
            }

            Pop(reg) => {
                let value = computer.pop().map_err(out_of_range)?;
                computer.registers.set_reg(reg, value);
            }

            Call(reg) => {
                let ret = pc + Address::from(Opcode::Call.width());
                let ret = Word::try_from(ret)
                    .map_err(|_| out_of_range(MemoryError::InvalidAddress(ret)))?;
                computer.push(ret).map_err(out_of_range)?;

                let target = computer.registers.reg(reg);
                debug!("Calling {:#04x}, returning to {:#04x}", target, ret);
                return Ok(Flow::Jump(target.into()));
            }

            Ret => {
                let target = computer.pop().map_err(out_of_range)?;
                debug!("Returning to {:#04x}", target);
                return Ok(Flow::Jump(target.into()));
            }

            Jmp(reg) => return Ok(Flow::Jump(computer.registers.reg(reg).into())),

            Jeq(reg) => {
                if computer.registers.flags.contains(Flags::EQUAL) {
                    return Ok(Flow::Jump(computer.registers.reg(reg).into()));
                }
            }

            Jne(reg) => {
                if !computer.registers.flags.contains(Flags::EQUAL) {
                    return Ok(Flow::Jump(computer.registers.reg(reg).into()));
                }
            }

            // The second operand of unary operations is never read
            Unary(opcode, reg) => return alu_step(computer, opcode, reg, reg),

            Binary(opcode, a, b) => return alu_step(computer, opcode, a, b),
        };

        Ok(Flow::Next)
    }
}

fn alu_step(
    computer: &mut Computer,
    opcode: Opcode,
    a: Reg,
    b: Reg,
) -> Result<Flow, ProcessorError> {
    let pc = computer.pc;
    let op = opcode
        .alu_op(computer.config.inc_dec)
        .ok_or(ProcessorError::Internal { opcode, pc })?;

    let (x, y) = (computer.registers.reg(a), computer.registers.reg(b));
    let output = match alu::apply(op, x, y) {
        Ok(output) => output,
        Err(AluError::DivisionByZero) => {
            return Ok(Flow::Halt(HaltReason::DivisionByZero { pc }));
        }
    };

    if let Some(result) = output.result {
        debug!("{} {}, {} = {}", op, x, y, result);
        computer.registers.set_reg(a, result);
    }

    if let Some(flags) = output.flags {
        debug!("cmp({}, {}) => {:?}", x, y, flags);
        computer.registers.flags = flags;
    }

    Ok(Flow::Next)
}

/// One entry of a disassembly listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disassembled {
    Instruction(Instruction),

    /// A byte that does not start a valid instruction
    Data(Word),
}

impl std::fmt::Display for Disassembled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Instruction(instruction) => write!(f, "{instruction}"),
            Self::Data(byte) => write!(f, "DB {byte:#04x}"),
        }
    }
}

fn decode_at(image: &[Word], offset: usize) -> Result<Instruction, DecodeError> {
    let opcode = Opcode::try_from(image[offset])?;
    let count = usize::from(opcode.operands());
    let bytes = image
        .get(offset + 1..=offset + count)
        .ok_or(DecodeError::Truncated)?;

    let mut operands = [0; 2];
    operands[..count].copy_from_slice(bytes);
    Ok(Instruction::decode(opcode, operands)?)
}

/// Walk a memory image and decode it linearly
///
/// Bytes that do not decode are listed as data and skipped one at a time.
#[must_use]
pub fn disassemble(image: &[Word]) -> Vec<(usize, Disassembled)> {
    let mut listing = Vec::new();
    let mut offset = 0;

    while offset < image.len() {
        match decode_at(image, offset) {
            Ok(instruction) => {
                listing.push((offset, Disassembled::Instruction(instruction)));
                offset += usize::from(instruction.opcode().width());
            }
            Err(_) => {
                listing.push((offset, Disassembled::Data(image[offset])));
                offset += 1;
            }
        }
    }

    listing
}

#[cfg(test)]
mod tests {
    use std::fmt::Write as _;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn opcode_table_test() {
        for opcode in Opcode::ALL {
            let byte = opcode as Word;
            // The operand count is also encoded in the two high bits
            assert_eq!(byte >> 6, opcode.operands(), "{opcode}");
            assert_eq!(Opcode::try_from(byte), Ok(opcode));
            assert_eq!(
                opcode.class() == OpClass::Alu,
                byte & 0b0010_0000 != 0,
                "{opcode}"
            );
        }

        assert_eq!(Opcode::try_from(0x00_u8), Err(DecodeError::UnknownOpcode(0)));
        assert_eq!(Opcode::try_from(0xFF_u8), Err(DecodeError::UnknownOpcode(0xFF)));
    }

    #[test]
    fn every_alu_opcode_has_an_operation_test() {
        for opcode in Opcode::ALL {
            for mode in [IncDecMode::Observed, IncDecMode::Named] {
                assert_eq!(
                    opcode.alu_op(mode).is_some(),
                    opcode.class() == OpClass::Alu,
                    "{opcode} ({mode})"
                );
            }
        }
    }

    #[test]
    fn inc_dec_mapping_test() {
        assert_eq!(Opcode::Inc.alu_op(IncDecMode::Observed), Some(AluOp::Dec));
        assert_eq!(Opcode::Dec.alu_op(IncDecMode::Observed), Some(AluOp::Inc));
        assert_eq!(Opcode::Inc.alu_op(IncDecMode::Named), Some(AluOp::Inc));
        assert_eq!(Opcode::Dec.alu_op(IncDecMode::Named), Some(AluOp::Dec));
    }

    #[test]
    fn decode_test() {
        let r = |i: u8| Reg::try_from(i).unwrap();
        assert_eq!(
            Instruction::decode(Opcode::Ldi, [0, 8]),
            Ok(Instruction::Ldi(r(0), 8))
        );
        assert_eq!(
            Instruction::decode(Opcode::Add, [1, 2]),
            Ok(Instruction::Binary(Opcode::Add, r(1), r(2)))
        );
        // The trailing byte of a unary operation is not a register
        assert_eq!(
            Instruction::decode(Opcode::Not, [3, 0xFF]),
            Ok(Instruction::Unary(Opcode::Not, r(3)))
        );
        assert_eq!(
            Instruction::decode(Opcode::Prn, [8, 0]),
            Err(RegisterError::InvalidRegister(8))
        );
        assert_eq!(
            Instruction::decode(Opcode::Ld, [0, 9]),
            Err(RegisterError::InvalidRegister(9))
        );
    }

    #[test]
    fn disassemble_test() {
        let image = [
            0x82, 0x00, 0x08, // LDI R0, 8
            0x47, 0x00, // PRN R0
            0xA7, 0x00, 0x01, // CMP R0, R1
            0x66, 0x02, // INC R2
            0xFF, // garbage
            0x01, // HLT
            0x82, 0x00, // truncated LDI
        ];

        let mut listing = String::new();
        for (offset, entry) in disassemble(&image) {
            writeln!(listing, "{offset:02X}: {entry}").unwrap();
        }

        insta::assert_snapshot!(listing, @r"
        00: LDI R0, 8
        03: PRN R0
        05: CMP R0, R1
        08: INC R2
        0A: DB 0xff
        0B: HLT
        0C: DB 0x82
        0D: DB 0x00
        ");
    }
}
