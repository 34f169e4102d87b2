//! CLI entrypoint for the `shank` warden client.
//!
//! The binary delegates to [`shank_cli::run`], which builds the command set,
//! resolves connection settings and drives one exchange with the server.

use std::io::{self, StderrLock, StdinLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdin: StdinLock<'_> = io::stdin().lock();
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    shank_cli::run(std::env::args_os(), &mut stdin, &mut stdout, &mut stderr)
}
