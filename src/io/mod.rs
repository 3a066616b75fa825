//! Configuration file input

pub mod config;
