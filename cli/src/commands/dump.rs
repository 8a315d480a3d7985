use camino::Utf8PathBuf;
use clap::{Parser, ValueHint};
use ls8_emulator::load_file;
use ls8_emulator::runtime::disassemble;
use tracing::debug;

#[derive(Parser, Debug)]
pub struct DumpOpt {
    /// Input file
    #[clap(value_parser, value_hint = ValueHint::FilePath)]
    input: Utf8PathBuf,
}

impl DumpOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        let program = load_file(&self.input)?;

        debug!(size = program.len(), "Disassembling program");
        for (offset, entry) in disassemble(&program) {
            println!("{offset:02X}: {entry}");
        }

        Ok(())
    }
}
