//! `downtraffic completions <SHELL>` and `downtraffic man`.

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::cli::Cli;

pub fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let mut stdout = std::io::stdout();
    generate(shell, &mut cmd, "downtraffic", &mut stdout);
}

pub fn run_man() -> Result<()> {
    let man = clap_mangen::Man::new(Cli::command());
    man.render(&mut std::io::stdout())
        .context("writing man page")?;
    Ok(())
}
