//! `gitnexus` binary entry point: parses argv and dispatches into the
//! library's CLI module (§6, `[AMBIENT-4]`).

use std::process::ExitCode as ProcessExitCode;

fn main() -> ProcessExitCode {
    gitnexus::cli::run().into()
}
