//! CLI argument parsing and validation.

mod args;

pub use args::{Args, ArgsError, CloneOptions, DEFAULT_MODEL_ID};
