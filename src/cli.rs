use clap::{ArgAction, Parser};

#[derive(Parser, Debug)]
#[clap(
    name = "juan",
    version,
    about = "Terminal reader for plain-text Chinese novels.",
    long_about = None
)]
pub struct Cli {
    /// Print reading history and exit
    #[clap(short = 'r', long)]
    pub history: bool,

    /// Parse FILE and dump its chapter table as JSON instead of reading
    #[clap(short, long)]
    pub dump: bool,

    /// Increase verbosity (-v, -vv)
    #[clap(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Novel file to open or add to the library
    #[clap(name = "FILE")]
    pub file: Option<String>,
}
