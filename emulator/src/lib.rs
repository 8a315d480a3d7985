pub mod constants;
pub mod loader;
pub mod runtime;

pub use self::loader::{load_file, parse_program, LoadError};
pub use self::runtime::{Computer, HaltReason, MachineConfig, ProcessorError, RunState};
