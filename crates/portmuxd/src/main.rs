use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match portmuxd::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(io::stderr(), "portmuxd: {error}");
            ExitCode::FAILURE
        }
    }
}
