//! Travel guide server binary.
//! Run with: cargo run --bin travel-guide-server

use std::process::ExitCode;

use travel_guide::start_travel_guide;

fn main() -> ExitCode {
    start_travel_guide::run()
}
