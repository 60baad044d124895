use clap::Parser;
use indexcast::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
