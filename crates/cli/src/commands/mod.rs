//! Subcommand implementations.
//!
//! Every command writes its report to the `out` it is given so the same
//! code serves the binary and the tests.

pub mod cart;
pub mod catalog;
pub mod config;
pub mod ship;
