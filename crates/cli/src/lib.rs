//! Paramgate CLI Library
//!
//! The `pgate` binary loads a YAML command configuration, follows the command
//! line down the configured sub-command tree, validates the remaining
//! arguments and flags with the core engine, and runs the command's start
//! script with the parameters interpolated and exported to its environment.
//!
//! # Examples
//!
//! ```bash
//! # Validate and run
//! pgate deploy prod --replicas 3
//!
//! # Print the interpolated script instead of running it
//! pgate --dry-run deploy prod
//!
//! # Print the environment the script would receive
//! pgate -d -o env deploy prod
//! ```

pub mod cli_args;
pub mod runner;
