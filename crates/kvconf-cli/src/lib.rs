#![doc = include_str!("../README.md")]

mod error;
pub use error::CliError;

mod token;
pub use token::{Token, tokens};

mod lines;
pub use lines::{conf_lines, conf_pairs, configure};

mod usage;
pub use usage::usage;
