//! Paramgate Core Library
//!
//! A parameter constraint and state engine for command-line tools. Raw
//! positional and flag inputs are converted to typed values, stored in a
//! queryable state model, and validated against a declarative, recursive
//! constraint language.
//!
//! # Key Features
//!
//! - **Type Registry**: named conversions from raw strings to typed [`value::Value`]s
//! - **State Stores**: thread-safe argument and flag stores, addressable by name or `list[N]`
//! - **Constraints**: comparisons, membership, length, patterns, filesystem predicates and `and`/`or`/`nand`/`not`
//! - **Resolver**: cross-parameter dependencies and conflicts
//! - **Interpolation**: `${args.name}` substitution and `ARGS_`/`FLAGS_` environment projection
//!
//! # Examples
//!
//! ```no_run
//! use paramgate_core::engine::Engine;
//! use paramgate_core::file_handling::load_app_config;
//!
//! let engine = Engine::new();
//! let config = load_app_config("commands.yml", engine.registry())?;
//! let params = engine
//!     .process_command(&config.root, &["input.txt", "--force"])?
//!     .into_result()?;
//! println!("{}", params.interpolate("cp ${args.source} /tmp"));
//! # Ok::<(), paramgate_core::error::Error>(())
//! ```

pub mod command_definitions;
pub mod config;
pub mod constraints;
pub mod engine;
pub mod error;
pub mod execution;
pub mod file_handling;
pub mod input;
pub mod interpolation;
pub mod params;
pub mod rules;
pub mod store;
pub mod types;
pub mod validation;
pub mod value;
