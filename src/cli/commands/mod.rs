//! CLI command implementations

pub mod clear;
pub mod config;
pub mod finalize;
pub mod restore;
pub mod save;
pub mod status;

pub use clear::execute as clear;
pub use config::execute as config;
pub use finalize::execute as finalize;
pub use restore::execute as restore;
pub use save::execute as save;
pub use status::execute as status;
