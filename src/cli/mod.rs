//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Book | Book lifecycle and overview | `new-book`, `tree`, `books`, `status` |
//! | Chapter | Tree editing | `add`, `rename`, `rm`, `up`, `down`, `mv` |
//! | Inspect | Lookups | `path`, `orphans` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! The default can be changed with `default_format` in the config file.
//!
//! ## Logging
//!
//! Use `--verbose` (or `-v`) for debug logs on stderr, or set `RUST_LOG`:
//! ```bash
//! gtbook --verbose mv abc --to def
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod book;
mod chapter;

pub use app::{Cli, Commands, run};
pub use output::{Output, OutputFormat};
