//! Command-line surface: argument parsing and report rendering

pub mod args;
pub mod output;
