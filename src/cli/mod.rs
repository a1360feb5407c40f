//! # CLI Module
//!
//! Command-line surface of the `crudgen` binary.
//!
//! ```bash
//! crudgen --spec specs/shop.json
//! crudgen --spec specs/shop.json --config crudgen.json --root backend --clean
//! crudgen --spec specs/shop.json --dry-run
//! ```
//!
//! Options:
//! - `--spec <FILE>` - Entity spec (required)
//! - `--config <FILE>` - Config overlay; also read from `CRUDGEN_CONFIG`
//! - `--root <DIR>` - Project root (default: current directory)
//! - `--clean` - Remove this spec's previous output first
//! - `--dry-run` - Report what would be written, write nothing
//!
//! On success the import line that mounts the aggregate router is printed.

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{execute, run_cli, Cli};
