//! Terminal output helpers
//!
//! Styled step lines and spinners in an interactive terminal, plain
//! bracketed prefixes in CI logs.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{
    key_value, remark, section, step_info, step_ok, step_ok_detail, step_warn, step_warn_hint,
};
pub use progress::TaskSpinner;
