//! Workspace root package. It carries workspace-level tooling such as the
//! rusty-hook pre-commit configuration and exports nothing.
