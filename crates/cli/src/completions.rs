// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shell completion generation for the lg CLI.
//!
//! ```bash
//! # Bash
//! lg completions bash > ~/.local/share/bash-completion/completions/lg
//!
//! # Zsh
//! lg completions zsh > ~/.zfunc/_lg
//!
//! # Fish
//! lg completions fish > ~/.config/fish/completions/lg.fish
//! ```

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use std::io;

/// Generate shell completions and write to stdout.
pub fn generate_completions<C: CommandFactory>(shell: Shell) {
    let mut cmd = C::command();
    generate(shell, &mut cmd, "lg", &mut io::stdout());
}

/// Arguments for the completions command.
#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
