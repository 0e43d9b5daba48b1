//! # CLI Behavior
//!
//! Every command takes the path of a model document written by
//! `tmcore::store::ModelDocument`.
//!
//! - `tmcore rules <model>`: one line per threat type with its rendered
//!   generation rule, or `(no rule)`.
//! - `tmcore search <model> <filter>`: identities whose name, description or
//!   property values contain the filter, ignoring case.
//! - `tmcore generate <model> [--write]`: runs threat generation. Without
//!   `--write` the document on disk is left untouched.
//!
//! `--json` switches any command to JSON output. `--config` points at a TOML
//! file layered over `TMCORE_*` environment variables.
//!
//! Logs go to stderr so stdout stays parseable.
//!
//! ## Module Structure
//!
//! - `commands`: Loads configuration and the document, dispatches, prints
//! - `render`: Text and JSON output
//! - `setup`: Argument parsing via clap

mod commands;
mod render;
pub mod setup;

pub use commands::run;
