#![forbid(unsafe_code)]

use std::process::ExitCode;

fn main() -> ExitCode {
    valeapp_cli::main_entry()
}
