use std::io::{self, Write};

use clap::CommandFactory;
use clap_complete::{Shell, generate};

fn write_completion(shell: Shell, out: &mut dyn Write) {
    generate(shell, &mut crate::Cli::command(), "beacon", out);
}

/// Prints the completion script for `shell`.
pub fn generate_completion(shell: Shell) {
    write_completion(shell, &mut io::stdout().lock());
}
