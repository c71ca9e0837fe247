//! `DietDraft` server binary.
//! Run with: cargo run --bin dietdraft-server

use std::process::ExitCode;

use dietdraft::start_dietdraft;

fn main() -> ExitCode {
    start_dietdraft::run()
}
