//! Entrypoint for the transcript replay tool.
//!
//! Delegates to [`probewire_replay::run`], which loads configuration, starts
//! telemetry, and replays the transcript named on the command line.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    probewire_replay::run(std::env::args_os(), &mut stdout, &mut stderr)
}
