//! Parser for `digger` commands in comment text.
//!
//! All functions here are pure and operate on the raw comment body. Command
//! recognition is prefix-based on the normalised body; the `-p` and `-w`
//! modifiers are located by whitespace-delimited token anywhere in the body.

use thiserror::Error;

use super::types::DiggerCommand;

/// Token that introduces a project selector.
const PROJECT_FLAG: &str = "-p";

/// Token that introduces a workspace override.
const WORKSPACE_FLAG: &str = "-w";

/// Substring that marks a help request.
const HELP_TRIGGER: &str = "digger help";

/// Usage text posted in reply to a help request.
pub const HELP_TEXT: &str = "\
Digger commands (comment on the pull request):

- `digger plan` - run plan for every impacted project
- `digger apply` - run apply for every impacted project
- `digger lock` - lock every impacted project for this pull request
- `digger unlock` - release the locks held by this pull request
- `digger help` - show this message

Modifiers:

- `-p <project>` - target a single impacted project
- `-w <workspace>` - use a different workspace than the configured one
";

/// Malformed modifier syntax in a comment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    /// `-w` appeared more than once, so the intended workspace is ambiguous.
    #[error("more than one -w flag found")]
    DuplicateWorkspaceFlag,

    /// `-w` was the last token or was followed by another flag.
    #[error("no workspace specified after -w flag")]
    MissingWorkspace,
}

/// Lower-cases and trims a comment body for command matching.
pub fn normalize(body: &str) -> String {
    body.trim().to_lowercase()
}

/// Returns every command whose prefix the normalised body starts with.
///
/// Results follow [`DiggerCommand::ALL`] order. Matching is prefix-based, so
/// trailing flags and arguments are permitted after the command token.
///
/// # Examples
///
/// ```
/// use orchestrator::commands::{matching_commands, DiggerCommand};
///
/// assert_eq!(matching_commands("DIGGER PLAN -p prod"), vec![DiggerCommand::Plan]);
/// assert!(matching_commands("please run digger plan").is_empty());
/// ```
pub fn matching_commands(body: &str) -> Vec<DiggerCommand> {
    let normalized = normalize(body);
    DiggerCommand::ALL
        .into_iter()
        .filter(|command| normalized.starts_with(command.as_str()))
        .collect()
}

/// Extracts the project named with `-p <project>`, if any.
///
/// Never fails: a missing flag, or a flag with nothing usable after it,
/// yields `None`.
pub fn parse_project_name(body: &str) -> Option<String> {
    let mut tokens = body.split_whitespace();
    while let Some(token) = tokens.next() {
        if token != PROJECT_FLAG {
            continue;
        }
        return match tokens.next() {
            Some(value) if !is_flag(value) => Some(value.to_string()),
            _ => None,
        };
    }
    None
}

/// Extracts the workspace named with `-w <workspace>`, if any.
///
/// # Errors
///
/// - [`CommandParseError::DuplicateWorkspaceFlag`] when `-w` appears twice.
/// - [`CommandParseError::MissingWorkspace`] when `-w` has no value.
pub fn parse_workspace(body: &str) -> Result<Option<String>, CommandParseError> {
    let mut tokens = body.split_whitespace().peekable();
    let mut workspace = None;
    let mut seen_flag = false;

    while let Some(token) = tokens.next() {
        if token != WORKSPACE_FLAG {
            continue;
        }
        if seen_flag {
            return Err(CommandParseError::DuplicateWorkspaceFlag);
        }
        seen_flag = true;

        match tokens.peek() {
            Some(value) if !is_flag(value) => {
                workspace = Some(value.to_string());
                tokens.next();
            }
            _ => return Err(CommandParseError::MissingWorkspace),
        }
    }

    Ok(workspace)
}

/// Returns `true` if the body asks for help.
///
/// Matching is a case-sensitive substring test, unlike command matching.
pub fn is_help_comment(body: &str) -> bool {
    body.contains(HELP_TRIGGER)
}

fn is_flag(token: &str) -> bool {
    token.starts_with('-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // ==================== Command recognition ====================

    #[test]
    fn each_command_is_recognised() {
        for command in DiggerCommand::ALL {
            assert_eq!(matching_commands(command.as_str()), vec![command]);
        }
    }

    #[test]
    fn recognition_ignores_case_and_surrounding_whitespace() {
        assert_eq!(
            matching_commands("\n\t  Digger Apply  \n"),
            vec![DiggerCommand::Apply]
        );
    }

    #[test]
    fn command_must_lead_the_comment() {
        assert!(matching_commands("looks good, digger apply").is_empty());
        assert!(matching_commands("").is_empty());
    }

    #[test]
    fn lock_does_not_match_unlock() {
        assert_eq!(
            matching_commands("digger unlock"),
            vec![DiggerCommand::Unlock]
        );
    }

    #[test]
    fn prefix_matching_accepts_glued_suffixes() {
        assert_eq!(
            matching_commands("digger planned"),
            vec![DiggerCommand::Plan]
        );
    }

    // ==================== Project selector ====================

    #[test]
    fn project_flag_anywhere_in_the_comment() {
        assert_eq!(
            parse_project_name("digger plan -p prod").as_deref(),
            Some("prod")
        );
        assert_eq!(
            parse_project_name("digger plan -w staging -p core-network").as_deref(),
            Some("core-network")
        );
    }

    #[test]
    fn project_flag_absent_or_empty_is_none() {
        assert_eq!(parse_project_name("digger plan"), None);
        assert_eq!(parse_project_name("digger plan -p"), None);
        assert_eq!(parse_project_name("digger plan -p -w staging"), None);
    }

    #[test]
    fn project_flag_must_be_its_own_token() {
        assert_eq!(parse_project_name("digger plan -pprod"), None);
        assert_eq!(parse_project_name("digger plan x-p prod"), None);
    }

    // ==================== Workspace override ====================

    #[test]
    fn workspace_override_is_parsed() {
        assert_eq!(
            parse_workspace("digger apply -w staging"),
            Ok(Some("staging".to_string()))
        );
    }

    #[test]
    fn workspace_absent_is_none() {
        assert_eq!(parse_workspace("digger apply -p prod"), Ok(None));
    }

    #[test]
    fn hyphenated_project_names_are_not_workspace_flags() {
        assert_eq!(parse_workspace("digger plan -p my-web"), Ok(None));
    }

    #[test]
    fn workspace_without_value_is_an_error() {
        assert_eq!(
            parse_workspace("digger apply -w"),
            Err(CommandParseError::MissingWorkspace)
        );
        assert_eq!(
            parse_workspace("digger apply -w -p prod"),
            Err(CommandParseError::MissingWorkspace)
        );
    }

    #[test]
    fn repeated_workspace_flag_is_an_error() {
        assert_eq!(
            parse_workspace("digger apply -w a -w b"),
            Err(CommandParseError::DuplicateWorkspaceFlag)
        );
    }

    // ==================== Help ====================

    #[test]
    fn help_is_a_case_sensitive_substring() {
        assert!(is_help_comment("could someone run digger help please"));
        assert!(!is_help_comment("Digger Help"));
    }

    // ==================== Robustness ====================

    proptest! {
        #[test]
        fn arbitrary_text_never_panics(text: String) {
            let _ = matching_commands(&text);
            let _ = parse_project_name(&text);
            let _ = parse_workspace(&text);
            let _ = is_help_comment(&text);
        }

        #[test]
        fn workspace_round_trips(
            ws in "[a-z][a-z0-9_]{0,15}",
            pad in "[ \t]{1,4}",
        ) {
            let body = format!("digger plan{pad}-w{pad}{ws}");
            prop_assert_eq!(parse_workspace(&body), Ok(Some(ws)));
        }

        #[test]
        fn trailing_arguments_do_not_change_recognition(
            idx in 0usize..4,
            args in "( [a-z0-9-]{1,8}){0,4}",
        ) {
            let command = DiggerCommand::ALL[idx];
            let body = format!("{}{}", command.as_str().to_uppercase(), args);
            prop_assert!(matching_commands(&body).contains(&command));
        }

        #[test]
        fn parsing_is_idempotent(text: String) {
            prop_assert_eq!(parse_workspace(&text), parse_workspace(&text));
            prop_assert_eq!(parse_project_name(&text), parse_project_name(&text));
        }
    }
}
