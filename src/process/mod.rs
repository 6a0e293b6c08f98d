//! Command execution port
//!
//! Everything that spawns an external program (toolchain probes, package
//! manager installs) goes through [`CommandRunner`], so tests can script
//! results without a Node toolchain on the machine.

#[cfg(test)]
pub(crate) mod fake;
mod runner;

pub use runner::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
