//! # photobooth CLI
//!
//! Command-line entry point for the photobooth.
//!
//! ## Usage
//! ```bash
//! photobooth run --config booth.json
//! photobooth transitions --output json
//! ```
//!
//! The process exits with 0 after a regular shutdown and with 123 when
//! a restart was requested, so a supervisor can start it again.

mod cli;

use photobooth::Result;

fn main() -> Result<()> {
    let code = cli::run()?;
    std::process::exit(code)
}
