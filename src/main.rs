use clap::Parser;
use slotwalk::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
