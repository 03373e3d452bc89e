//! shelter - adoption and foster lifecycle CLI

use std::process::ExitCode;

fn main() -> ExitCode {
    shelter_lifecycle::cli::run()
}
