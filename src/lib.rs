//! depstash - dependency cache for application builds
//!
//! Restores package manager directories from a durable cache root before
//! install and saves them back afterwards. The cache is only reused under
//! the exact toolchain versions that produced it.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod install;
pub mod process;
pub mod ui;

pub use error::{DepstashError, DepstashResult};
