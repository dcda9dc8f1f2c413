//! Subcommand implementations.

pub mod convert;
pub mod init;
pub mod output;
