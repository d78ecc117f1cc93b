//! Command parsing for `digger` comments.
//!
//! Users drive the orchestrator by commenting on a pull request. This module
//! recognises the command vocabulary and extracts the optional project and
//! workspace modifiers from a comment body.
//!
//! # Supported Commands
//!
//! - `digger plan` - Plans every targeted project
//! - `digger apply` - Applies every targeted project
//! - `digger unlock` - Releases the project locks held by this pull request
//! - `digger lock` - Acquires project locks for this pull request
//! - `digger help` - Replies with usage text
//!
//! # Modifiers
//!
//! - `-p <project>` restricts the command to one impacted project
//! - `-w <workspace>` overrides the project's configured workspace
//!
//! # Example
//!
//! ```
//! use orchestrator::commands::{
//!     matching_commands, parse_project_name, parse_workspace, DiggerCommand,
//! };
//!
//! let body = "  Digger Apply -p prod -w staging ";
//! assert_eq!(matching_commands(body), vec![DiggerCommand::Apply]);
//! assert_eq!(parse_project_name(body).as_deref(), Some("prod"));
//! assert_eq!(parse_workspace(body).unwrap().as_deref(), Some("staging"));
//! ```

mod parser;
mod types;

pub use parser::{
    is_help_comment, matching_commands, normalize, parse_project_name, parse_workspace,
    CommandParseError, HELP_TEXT,
};
pub use types::DiggerCommand;
