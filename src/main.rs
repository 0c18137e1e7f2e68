mod cli;
mod commands;
mod model;
mod storage;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let command = args.command.unwrap_or(cli::Command::Tui);
    match command {
        cli::Command::Init => commands::init(),
        cli::Command::List { day } => commands::list(day),
        cli::Command::Add { text, day } => commands::add(text, day),
        cli::Command::Tui => commands::tui(),
    }
}
