//! Utility functions and helpers.
//!
//! Environment variable handling and time arithmetic.

pub mod env;
pub(crate) mod time;

pub use env::get_env_with_prefix;
