use std::io::Write;

use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::constants::{self as C, Address, Word};

pub mod alu;
mod config;
mod instructions;
mod memory;
mod registers;
mod trace;

pub use self::alu::{AluError, AluOp, AluOutput};
pub use self::config::{IncDecMode, MachineConfig};
pub use self::instructions::{
    disassemble, DecodeError, Disassembled, Instruction, OpClass, Opcode,
};
pub use self::memory::{Memory, MemoryError};
pub use self::registers::{Flags, Reg, RegisterError, Registers};
pub use self::trace::Trace;

use self::instructions::Flow;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("address out of range at pc {pc:#04x}")]
    AddressOutOfRange { pc: Address, source: MemoryError },

    #[error("invalid register operand at pc {pc:#04x}")]
    InvalidRegister { pc: Address, source: RegisterError },

    /// The opcode table and the ALU disagree. This is a bug in the emulator,
    /// not in the program.
    #[error("internal error: opcode {opcode} at pc {pc:#04x} has no ALU operation")]
    Internal { opcode: Opcode, pc: Address },

    #[error("could not write program output")]
    Output(#[from] std::io::Error),

    #[error("step limit of {0} instructions reached")]
    StepLimit(u64),

    #[error("the computer has faulted and cannot run anymore")]
    Faulted,
}

impl ProcessorError {
    /// Whether the error comes from a bug in the emulator itself
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

type Result<T> = std::result::Result<T, ProcessorError>;

/// Why the computer stopped without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// A `HLT` instruction was executed
    Halt,

    /// `DIV` or `MOD` by zero; the destination register is left untouched
    DivisionByZero { pc: Address },

    /// The byte at `pc` is not a known opcode
    UnknownOpcode { opcode: Word, pc: Address },
}

impl std::fmt::Display for HaltReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Halt => write!(f, "halted"),
            Self::DivisionByZero { pc } => write!(f, "division by zero at {pc:#04x}"),
            Self::UnknownOpcode { opcode, pc } => {
                write!(f, "unknown opcode {opcode:#04x} at {pc:#04x}")
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Ready to execute the next instruction
    #[default]
    Running,

    /// Stopped, no further instruction will be executed
    Halted(HaltReason),

    /// Stopped by a [`ProcessorError`]
    Faulted,
}

impl RunState {
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

/// The whole machine: memory, registers, program counter
pub struct Computer {
    pub registers: Registers,
    pub memory: Memory,

    /// Address of the next instruction
    pub pc: Address,

    /// Number of executed instructions
    pub cycles: u64,

    state: RunState,
    config: MachineConfig,
}

impl Default for Computer {
    fn default() -> Self {
        Self::new(MachineConfig::default())
    }
}

impl std::fmt::Debug for Computer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Computer {{ pc: {:#04x}, registers: {:?}, state: {:?}, memory: [...] }}",
            self.pc, self.registers, self.state
        )
    }
}

impl Computer {
    #[must_use]
    pub fn new(config: MachineConfig) -> Self {
        Self {
            registers: Registers::new(config.stack_start),
            memory: Memory::default(),
            pc: C::PROGRAM_START,
            cycles: 0,
            state: RunState::Running,
            config,
        }
    }

    /// Build a computer with a program loaded at the start of memory
    ///
    /// # Errors
    ///
    /// Fails if the program does not fit in memory.
    pub fn with_program(config: MachineConfig, program: &[Word]) -> Result<Self> {
        let mut computer = Self::new(config);
        computer
            .memory
            .load(C::PROGRAM_START, program)
            .map_err(|source| ProcessorError::AddressOutOfRange {
                pc: C::PROGRAM_START,
                source,
            })?;
        debug!(size = program.len(), "Program loaded");
        Ok(computer)
    }

    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    #[must_use]
    pub const fn trace(&self) -> Trace<'_> {
        Trace { computer: self }
    }

    fn push(&mut self, value: Word) -> std::result::Result<(), MemoryError> {
        let sp = self
            .registers
            .sp()
            .checked_sub(1)
            .ok_or(MemoryError::StackOverflow)?;
        self.memory.set(sp.into(), value)?;
        self.registers.set_sp(sp);
        trace!(sp, value, "push");
        Ok(())
    }

    fn pop(&mut self) -> std::result::Result<Word, MemoryError> {
        let sp = self.registers.sp();
        let value = self.memory.get(sp.into())?;
        let next = sp
            .checked_add(1)
            .ok_or(MemoryError::InvalidAddress(Address::from(sp) + 1))?;
        self.registers.set_sp(next);
        trace!(sp, value, "pop");
        Ok(value)
    }

    /// Fetch and decode the instruction at `pc`.
    ///
    /// Returns `None` if the opcode is unknown.
    fn fetch(&self) -> Result<Option<Instruction>> {
        let pc = self.pc;
        let out_of_range = |source| ProcessorError::AddressOutOfRange { pc, source };

        let byte = self.memory.get(pc).map_err(out_of_range)?;
        let Ok(opcode) = Opcode::try_from(byte) else {
            return Ok(None);
        };

        let mut operands = [0; 2];
        for (slot, offset) in operands
            .iter_mut()
            .zip(1..)
            .take(opcode.operands().into())
        {
            *slot = self.memory.get(pc + offset).map_err(out_of_range)?;
        }

        Instruction::decode(opcode, operands)
            .map(Some)
            .map_err(|source| ProcessorError::InvalidRegister { pc, source })
    }

    fn cycle<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<RunState> {
        if let Some(limit) = self.config.max_steps {
            if self.cycles >= limit {
                return Err(ProcessorError::StepLimit(limit));
            }
        }

        let Some(instruction) = self.fetch()? else {
            let pc = self.pc;
            let opcode = self.memory.get(pc).unwrap_or_default();
            warn!(pc, opcode, "Unknown opcode, halting");
            return Ok(RunState::Halted(HaltReason::UnknownOpcode { opcode, pc }));
        };

        debug!(pc = self.pc, "Executing instruction \"{}\"", instruction);
        let flow = instruction.execute(self, out)?;
        self.cycles += 1;

        match flow {
            Flow::Next => self.pc += Address::from(instruction.opcode().width()),
            Flow::Jump(address) => self.pc = address,
            Flow::Halt(reason) => return Ok(RunState::Halted(reason)),
        }

        trace!(registers = %self.registers, "Register state");
        Ok(RunState::Running)
    }

    /// Execute a single instruction
    ///
    /// Once the computer is halted or faulted, this does nothing and returns
    /// the current state.
    ///
    /// # Errors
    ///
    /// Any error moves the computer to [`RunState::Faulted`].
    #[tracing::instrument(skip(self, out), level = "debug")]
    pub fn step<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<RunState> {
        if !self.state.is_running() {
            return Ok(self.state);
        }

        match self.cycle(out) {
            Ok(state) => {
                self.state = state;
                Ok(state)
            }
            Err(e) => {
                self.state = RunState::Faulted;
                Err(e)
            }
        }
    }

    /// Run until the computer halts
    ///
    /// # Errors
    ///
    /// Fails on the first [`ProcessorError`], or straight away if the
    /// computer already faulted.
    #[tracing::instrument(skip(self, out))]
    pub fn run<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<HaltReason> {
        loop {
            match self.step(out)? {
                RunState::Running => {}
                RunState::Halted(reason) => {
                    info!(%reason, cycles = self.cycles, "Computer stopped");
                    return Ok(reason);
                }
                RunState::Faulted => return Err(ProcessorError::Faulted),
            }
        }
    }
}
