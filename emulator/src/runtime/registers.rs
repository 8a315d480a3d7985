use bitflags::bitflags;
use parse_display::Display;
use thiserror::Error;

use crate::constants::{self as C, Word};

bitflags! {
    /// Comparison flags, only written by `CMP`
    ///
    /// The layout follows the `FL` register of the LS-8: `00000LGE`.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags: Word {
        const EQUAL   = 0b0000_0001;
        const GREATER = 0b0000_0010;
        const LESS    = 0b0000_0100;
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RegisterError {
    #[error("invalid register index {0}")]
    InvalidRegister(u8),
}

/// A validated register index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("R{0}")]
pub struct Reg(u8);

impl Reg {
    /// The stack pointer
    pub const SP: Reg = Reg(C::SP_REGISTER);
}

impl TryFrom<u8> for Reg {
    type Error = RegisterError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        if usize::from(index) < C::REGISTER_COUNT {
            Ok(Reg(index))
        } else {
            Err(RegisterError::InvalidRegister(index))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    /// General purpose registers, `R7` doubling as the stack pointer
    gpr: [Word; C::REGISTER_COUNT],

    /// Comparison flags
    pub flags: Flags,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new(C::STACK_START)
    }
}

impl Registers {
    /// Every register is zeroed, except the stack pointer
    #[must_use]
    pub fn new(stack_start: Word) -> Self {
        let mut gpr = [0; C::REGISTER_COUNT];
        gpr[usize::from(C::SP_REGISTER)] = stack_start;
        Self {
            gpr,
            flags: Flags::empty(),
        }
    }

    /// Read a register from a raw index
    ///
    /// # Errors
    ///
    /// Fails if the index does not name one of the 8 registers.
    pub fn get(&self, index: u8) -> Result<Word, RegisterError> {
        Reg::try_from(index).map(|reg| self.reg(reg))
    }

    /// Write a register from a raw index
    ///
    /// # Errors
    ///
    /// Fails if the index does not name one of the 8 registers.
    pub fn set(&mut self, index: u8, value: Word) -> Result<(), RegisterError> {
        let reg = Reg::try_from(index)?;
        self.set_reg(reg, value);
        Ok(())
    }

    #[must_use]
    pub fn reg(&self, reg: Reg) -> Word {
        self.gpr[usize::from(reg.0)]
    }

    pub fn set_reg(&mut self, reg: Reg, value: Word) {
        self.gpr[usize::from(reg.0)] = value;
    }

    #[must_use]
    pub fn sp(&self) -> Word {
        self.reg(Reg::SP)
    }

    pub fn set_sp(&mut self, value: Word) {
        self.set_reg(Reg::SP, value);
    }

    /// All register values, `R0` first
    #[must_use]
    pub fn as_array(&self) -> [Word; C::REGISTER_COUNT] {
        self.gpr
    }
}

impl std::fmt::Display for Registers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, value) in self.gpr.iter().enumerate() {
            write!(f, "R{index} = {value:#04x} | ")?;
        }
        write!(f, "FL = {:#010b}", self.flags.bits())
    }
}
