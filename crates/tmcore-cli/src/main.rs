//! # tmcore CLI
//!
//! A thin client over the `tmcore` library. It reads a model document,
//! calls into the library and prints the results. Everything that knows about
//! stdout, stderr and exit codes lives here; the library never does I/O on
//! the terminal.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (src/cli/)                                       │
//! │  - clap argument parsing (setup.rs)                         │
//! │  - Command handlers (commands.rs)                           │
//! │  - Plain text and JSON output (render.rs)                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  tmcore library                                             │
//! │  - ModelDocument, rules, search, generation                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
