use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};

use crate::Opt;

/// Print a shell completion script for `ls8` on stdout
#[derive(Parser, Debug)]
pub struct CompletionOpt {
    /// Shell to generate the script for
    #[clap(value_enum)]
    shell: Shell,
}

impl CompletionOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        let mut command = Opt::command();
        let bin_name = command.get_name().to_owned();
        generate(self.shell, &mut command, bin_name, &mut std::io::stdout().lock());
        Ok(())
    }
}
