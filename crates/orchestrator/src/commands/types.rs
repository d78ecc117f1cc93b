//! The `digger` command vocabulary.

use serde::{Deserialize, Serialize};

/// A recognised `digger` command.
///
/// The wire form of each command is its literal comment prefix, which is also
/// the string placed in a job's command list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiggerCommand {
    /// `digger plan`
    Plan,
    /// `digger apply`
    Apply,
    /// `digger unlock`
    Unlock,
    /// `digger lock`
    Lock,
}

impl DiggerCommand {
    /// Every command, in the order comments are tested against them.
    pub const ALL: [DiggerCommand; 4] = [
        DiggerCommand::Plan,
        DiggerCommand::Apply,
        DiggerCommand::Unlock,
        DiggerCommand::Lock,
    ];

    /// Returns the literal comment prefix for this command.
    pub fn as_str(self) -> &'static str {
        match self {
            DiggerCommand::Plan => "digger plan",
            DiggerCommand::Apply => "digger apply",
            DiggerCommand::Unlock => "digger unlock",
            DiggerCommand::Lock => "digger lock",
        }
    }
}

impl std::fmt::Display for DiggerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
