use parse_display::{Display, FromStr};

use crate::constants as C;

/// Meaning of the `INC` and `DEC` opcodes.
///
/// The reference LS-8 programs were written against a machine where `INC`
/// decrements and `DEC` increments. `Observed` keeps that behaviour, `Named`
/// makes the opcodes do what their name says.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Display, FromStr)]
#[display(style = "lowercase")]
pub enum IncDecMode {
    #[default]
    Observed,
    Named,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineConfig {
    /// Initial value of the stack pointer (`R7`)
    pub stack_start: C::Word,

    pub inc_dec: IncDecMode,

    /// Stop with an error after this many instructions
    pub max_steps: Option<u64>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            stack_start: C::STACK_START,
            inc_dec: IncDecMode::default(),
            max_steps: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inc_dec_mode_parse_test() {
        assert_eq!(
            "observed".parse::<IncDecMode>().ok(),
            Some(IncDecMode::Observed)
        );
        assert_eq!("named".parse::<IncDecMode>().ok(), Some(IncDecMode::Named));
        assert!("swapped".parse::<IncDecMode>().is_err());
        assert_eq!(IncDecMode::Named.to_string(), "named");
    }
}
