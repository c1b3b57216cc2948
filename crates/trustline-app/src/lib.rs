//! Application layer for Trustline
//!
//! User command parsing and a generic runtime that serializes transport
//! input, user commands and collaborator completions onto one processing
//! turn, so the same orchestration code runs in the terminal client and in
//! scripted tests.
//!
//! # Components
//!
//! - [`Command`]: User intents, parsed from a line of input
//! - [`Driver`]: Trait for platform-specific I/O abstraction
//! - [`Runtime`]: Generic orchestration loop using Driver
//! - [`Notice`]: What the runtime tells the driver after each step

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod command;
mod driver;
mod notice;
mod runtime;

pub use command::{Command, CommandError, Input};
pub use driver::{Delivery, Driver};
pub use notice::Notice;
pub use runtime::{Collaborators, Exit, Runtime};
