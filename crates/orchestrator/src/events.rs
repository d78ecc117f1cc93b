//! Inbound event classification.
//!
//! GitHub delivers events as an event name plus a JSON payload. This module
//! turns them into the [`Event`] sum type, so everything downstream handles
//! the two supported kinds exhaustively and never sees raw JSON.
//!
//! # Event Types
//!
//! - `pull_request` / `pull_request_target` - pull-request lifecycle
//! - `issue_comment` - comments carrying `digger` commands
//!
//! Anything else is rejected with [`OrchestratorError::UnsupportedEvent`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Actor, CommentId, Namespace, OrchestratorError, PrNumber};

/// A classified inbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// A pull request was opened, reopened, pushed to, or closed.
    PullRequest(PullRequestEvent),

    /// A comment was posted on a pull request's conversation.
    IssueComment(IssueCommentEvent),
}

/// Which of the two supported event kinds an [`Event`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Pull-request lifecycle event.
    PullRequest,
    /// Issue/PR comment event.
    IssueComment,
}

impl EventKind {
    /// Returns the tag recorded on jobs synthesized from this kind of event.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::PullRequest => "pull_request",
            EventKind::IssueComment => "issue_comment",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Event {
    /// Returns the event kind.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::PullRequest(_) => EventKind::PullRequest,
            Event::IssueComment(_) => EventKind::IssueComment,
        }
    }

    /// Returns the pull request the event targets.
    pub fn pr_number(&self) -> PrNumber {
        match self {
            Event::PullRequest(e) => e.number,
            Event::IssueComment(e) => e.issue_number,
        }
    }

    /// Returns the comment body for comment events.
    pub fn comment_body(&self) -> Option<&str> {
        match self {
            Event::PullRequest(_) => None,
            Event::IssueComment(e) => Some(&e.body),
        }
    }
}

/// Action performed on a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestAction {
    /// PR was opened.
    Opened,
    /// PR was reopened.
    Reopened,
    /// New commits were pushed to the PR head.
    Synchronize,
    /// PR was closed (merged or not).
    Closed,
    /// Any other action (`edited`, `labeled`, ...). Produces no jobs.
    #[serde(untagged)]
    Other(String),
}

impl PullRequestAction {
    fn parse(action: &str) -> Self {
        match action {
            "opened" => PullRequestAction::Opened,
            "reopened" => PullRequestAction::Reopened,
            "synchronize" => PullRequestAction::Synchronize,
            "closed" => PullRequestAction::Closed,
            other => PullRequestAction::Other(other.to_string()),
        }
    }
}

/// A pull-request lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestEvent {
    /// The pull request number.
    pub number: PrNumber,

    /// The action that triggered this event.
    pub action: PullRequestAction,

    /// Whether the pull request was merged (only meaningful for `closed`).
    pub merged: bool,

    /// Branch the pull request targets.
    pub base_ref: String,

    /// Branch the pull request comes from.
    pub head_ref: String,

    /// The repository's default branch.
    pub default_branch: String,
}

impl PullRequestEvent {
    /// Returns `true` for a merge into the repository's default branch.
    pub fn is_merge_to_default_branch(&self) -> bool {
        self.action == PullRequestAction::Closed
            && self.merged
            && self.base_ref == self.default_branch
    }
}

/// A comment on a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCommentEvent {
    /// The pull request (issue) number the comment was posted on.
    pub issue_number: PrNumber,

    /// The comment ID, when the payload carries one.
    pub comment_id: Option<CommentId>,

    /// The raw comment body.
    pub body: String,
}

/// A classified event together with the context it arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPackage {
    /// The classified event.
    pub event: Event,

    /// The event name as delivered (`pull_request`, `issue_comment`, ...).
    pub event_name: String,

    /// The user whose action triggered the event.
    pub actor: Actor,

    /// The repository the event belongs to.
    pub repository: Namespace,
}

// ============================================================================
// Raw payload structures for deserialization
//
// These match GitHub's webhook JSON structure and carry only the fields the
// orchestrator reads. Unknown fields are ignored.
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawPullRequestPayload {
    action: String,
    pull_request: RawPullRequest,
    repository: RawRepository,
}

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    number: u64,
    #[serde(default)]
    merged: Option<bool>,
    base: RawRef,
    head: RawRef,
}

#[derive(Debug, Deserialize)]
struct RawRef {
    #[serde(rename = "ref")]
    ref_field: String,
}

#[derive(Debug, Deserialize)]
struct RawRepository {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct RawIssueCommentPayload {
    comment: RawComment,
    issue: RawIssue,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    number: u64,
}

/// The GitHub Actions `github` context, as exported in `GITHUB_CONTEXT`.
#[derive(Debug, Deserialize)]
struct RawGithubContext {
    event_name: String,
    event: Value,
    #[serde(default)]
    actor: Option<String>,
    #[serde(default)]
    repository: Option<String>,
}

// ============================================================================
// Classification
// ============================================================================

/// Classifies a payload into an [`Event`].
///
/// The event name decides the shape for `pull_request`, `pull_request_target`
/// and `issue_comment`. When the name is empty the payload shape is inspected,
/// so payloads relayed without their header still classify.
///
/// # Errors
///
/// - [`OrchestratorError::UnsupportedEvent`] for any other name, or for an
///   empty name whose shape matches no supported kind.
/// - [`OrchestratorError::MalformedEvent`] when a supported name carries a
///   payload missing required fields.
pub fn classify(event_name: &str, payload: &Value) -> Result<Event, OrchestratorError> {
    match event_name {
        "pull_request" | "pull_request_target" => parse_pull_request(event_name, payload),
        "issue_comment" => parse_issue_comment(event_name, payload),
        "" if has_object(payload, "pull_request") && payload.get("action").is_some() => {
            parse_pull_request(event_name, payload)
        }
        "" if has_object(payload, "comment") && has_object(payload, "issue") => {
            parse_issue_comment(event_name, payload)
        }
        "" => Err(OrchestratorError::UnsupportedEvent {
            event_type: "unknown".to_string(),
        }),
        _ => Err(OrchestratorError::UnsupportedEvent {
            event_type: event_name.to_string(),
        }),
    }
}

fn has_object(payload: &Value, key: &str) -> bool {
    payload.get(key).is_some_and(Value::is_object)
}

fn malformed(event_name: &str, e: serde_json::Error) -> OrchestratorError {
    OrchestratorError::MalformedEvent {
        event_type: event_name.to_string(),
        message: e.to_string(),
    }
}

fn parse_pull_request(event_name: &str, payload: &Value) -> Result<Event, OrchestratorError> {
    let raw = RawPullRequestPayload::deserialize(payload).map_err(|e| malformed(event_name, e))?;
    Ok(Event::PullRequest(PullRequestEvent {
        number: PrNumber::new(raw.pull_request.number),
        action: PullRequestAction::parse(&raw.action),
        merged: raw.pull_request.merged.unwrap_or(false),
        base_ref: raw.pull_request.base.ref_field,
        head_ref: raw.pull_request.head.ref_field,
        default_branch: raw.repository.default_branch,
    }))
}

fn parse_issue_comment(event_name: &str, payload: &Value) -> Result<Event, OrchestratorError> {
    let raw = RawIssueCommentPayload::deserialize(payload).map_err(|e| malformed(event_name, e))?;
    Ok(Event::IssueComment(IssueCommentEvent {
        issue_number: PrNumber::new(raw.issue.number),
        comment_id: raw.comment.id.map(CommentId::new),
        body: raw.comment.body.unwrap_or_default(),
    }))
}

impl EventPackage {
    /// Classifies a payload and attaches its actor and repository.
    ///
    /// `actor` and `repository` fall back to `sender.login` and
    /// `repository.full_name` from the payload when not supplied.
    pub fn from_payload(
        event_name: &str,
        payload: &Value,
        actor: Option<&str>,
        repository: Option<&str>,
    ) -> Result<Self, OrchestratorError> {
        let event = classify(event_name, payload)?;

        let actor = actor
            .and_then(Actor::new)
            .or_else(|| pointer_str(payload, "/sender/login").and_then(Actor::new))
            .ok_or_else(|| OrchestratorError::MalformedEvent {
                event_type: event_name.to_string(),
                message: "no actor in context or payload".to_string(),
            })?;

        let repository = repository
            .and_then(Namespace::new)
            .or_else(|| pointer_str(payload, "/repository/full_name").and_then(Namespace::new))
            .ok_or_else(|| OrchestratorError::MalformedEvent {
                event_type: event_name.to_string(),
                message: "no repository in context or payload".to_string(),
            })?;

        Ok(Self {
            event,
            event_name: event_name.to_string(),
            actor,
            repository,
        })
    }

    /// Parses a GitHub Actions `github` context document (`GITHUB_CONTEXT`).
    pub fn from_github_context(json: &str) -> Result<Self, OrchestratorError> {
        let context: RawGithubContext =
            serde_json::from_str(json).map_err(|e| malformed("github context", e))?;
        Self::from_payload(
            &context.event_name,
            &context.event,
            context.actor.as_deref(),
            context.repository.as_deref(),
        )
    }
}

fn pointer_str<'a>(payload: &'a Value, pointer: &str) -> Option<&'a str> {
    payload.pointer(pointer).and_then(Value::as_str)
}
