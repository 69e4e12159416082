//! `$VAR` expansion for command lines.

mod grammar;
pub mod expand;

pub use expand::{expand_all, expand_env, expand_with};
