//! logsift command-line front end: configuration, logging, output files and
//! the printed run summary around the `engine` crate.

pub mod boot;
pub mod cli;
pub mod commands;
pub mod conf;
pub mod naming;
pub mod present;
pub mod sink;
