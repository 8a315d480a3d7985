use super::Computer;
use crate::constants::Address;

/// Diagnostic line showing the program counter, the next three memory cells
/// and every register, in hexadecimal.
///
/// Cells past the end of memory are shown as `00`.
pub struct Trace<'a> {
    pub(super) computer: &'a Computer,
}

impl std::fmt::Display for Trace<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pc = self.computer.pc;
        let cell = |offset: Address| {
            self.computer
                .memory
                .get(pc.saturating_add(offset))
                .unwrap_or(0)
        };

        write!(
            f,
            "TRACE: {pc:02X} | {:02X} {:02X} {:02X} |",
            cell(0),
            cell(1),
            cell(2)
        )?;

        for value in self.computer.registers.as_array() {
            write!(f, " {value:02X}")?;
        }

        Ok(())
    }
}
