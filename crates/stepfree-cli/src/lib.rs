//! stepfree CLI library.
//!
//! Terminal styling and output rendering shared by the `stepfree-cli`
//! subcommands.

pub mod output;
pub mod terminal;
