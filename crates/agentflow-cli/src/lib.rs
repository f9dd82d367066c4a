//! agentflow CLI library: command implementations, console reporting and
//! text renderers, shared by the `agentflow` binary and its tests.

pub mod commands;
pub mod render;
pub mod reporter;
