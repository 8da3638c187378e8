// Handlers for CLI subcommands.
//
// main.rs parses arguments and dispatches here; each handler resolves its
// inputs, calls into stepfree-lib and renders through `stepfree_cli::output`.

pub mod amenities;
pub mod route;
pub mod stairs;
