/// Memory addresses and the program counter.
///
/// Wider than a byte so that `PC + 2` or `SP + 1` past the end of memory can be
/// represented and rejected instead of silently wrapping.
pub type Address = u16;

/// Content of a memory cell or a register
pub type Word = u8;

/// Total size of the computer memory
pub const MEMORY_SIZE: usize = 256;

/// Number of general purpose registers
pub const REGISTER_COUNT: usize = 8;

/// Index of the register used as the stack pointer
pub const SP_REGISTER: u8 = 7;

/// Default start of the stack pointer
pub const STACK_START: Word = 0xF4;

/// Address where programs are loaded and execution starts
pub const PROGRAM_START: Address = 0;
