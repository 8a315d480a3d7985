use std::io::Write;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{ArgAction, Parser, ValueHint};
use ls8_emulator::runtime::IncDecMode;
use ls8_emulator::{load_file, Computer, MachineConfig, RunState};
use tracing::{debug, info};

#[derive(Parser, Debug)]
pub struct RunOpt {
    /// Input file
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    input: Utf8PathBuf,

    /// Print the machine state before every instruction
    #[clap(short, long, action = ArgAction::SetTrue)]
    trace: bool,

    /// Stop with an error after this many instructions
    #[clap(long)]
    max_steps: Option<u64>,

    /// Initial value of the stack pointer
    #[clap(long, default_value_t = ls8_emulator::constants::STACK_START)]
    stack_start: u8,

    /// Meaning of the INC and DEC opcodes: `observed` (INC decrements, DEC
    /// increments) or `named`
    #[clap(long, default_value_t = IncDecMode::Observed)]
    inc_dec: IncDecMode,
}

impl RunOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        let program = load_file(&self.input)?;

        let config = MachineConfig {
            stack_start: self.stack_start,
            inc_dec: self.inc_dec,
            max_steps: self.max_steps,
        };
        debug!(?config, "Building computer");
        let mut computer = Computer::with_program(config, &program)
            .with_context(|| format!("could not load {}", self.input))?;

        info!("Running program");
        let stdout = std::io::stdout();
        let mut out = stdout.lock();

        let reason = if self.trace {
            loop {
                eprintln!("{}", computer.trace());
                match computer.step(&mut out)? {
                    RunState::Running => {}
                    RunState::Halted(reason) => break reason,
                    RunState::Faulted => anyhow::bail!("the computer faulted"),
                }
            }
        } else {
            computer.run(&mut out)?
        };
        out.flush()?;

        info!(%reason, cycles = computer.cycles, registers = %computer.registers, "End of program");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inc_dec_flag_test() {
        let opt = RunOpt::try_parse_from(["run", "prog.ls8"]).unwrap();
        assert_eq!(opt.inc_dec, IncDecMode::Observed);

        let opt = RunOpt::try_parse_from(["run", "prog.ls8", "--inc-dec", "named"]).unwrap();
        assert_eq!(opt.inc_dec, IncDecMode::Named);

        assert!(RunOpt::try_parse_from(["run", "prog.ls8", "--inc-dec", "swapped"]).is_err());
    }
}
