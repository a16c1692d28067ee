//! # Command-Line Interface
//!
//! User-facing commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Commands |
//! |-------|---------|----------|
//! | Posts | Local files | `new`, `edit`, `rm`, `list`, `open` |
//! | Sync | Local vs database | `status`, `push`, `pull` |
//! | Config | Connection settings | `setup`, `config` |
//! | Media | Image hosting | `img` |
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` (default) - Human-readable, level-tagged lines
//! - `json` - One JSON document per command
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output on stderr:
//! ```bash
//! blog --verbose push --dry-run
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod img;
mod output;
mod post;
mod setup;
mod shell;
mod sync_cmd;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
pub use setup::{apply_answers, Answers};
