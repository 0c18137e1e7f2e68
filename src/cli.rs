use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "daylist", version, about = "Terminal calendar with a checklist per day")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a local data store in the current directory
    Init,
    /// Print a day's checklist
    List {
        /// Day to print (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        day: Option<String>,
    },
    /// Append a task to a day's checklist
    Add {
        /// Task text
        text: String,
        /// Day to add to (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        day: Option<String>,
    },
    /// Launch the interactive TUI
    Tui,
}
