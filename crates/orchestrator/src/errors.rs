//! Top-level error types for the orchestrator domain.
//!
//! [`OrchestratorError`] covers every condition that aborts resolution or
//! synthesis for one event. Its `Display` output is the literal message the
//! caller posts back to the pull request, so wording is part of the contract.
//!
//! Component-level errors ([`crate::commands::CommandParseError`],
//! [`crate::config::ConfigError`], [`crate::PullRequestServiceError`]) are
//! defined in their respective modules.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commands::CommandParseError;
use crate::{ProjectName, PullRequestServiceError, WorkflowName};

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Coarse classification of an [`OrchestratorError`].
///
/// Callers use this to decide how to surface a failure (for instance, only
/// [`ErrorCategory::Collaborator`] failures are worth an operator alert; the
/// rest are user or configuration mistakes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// A project references a workflow that is not configured.
    Configuration,
    /// A comment names a project that cannot be targeted.
    AmbiguousTarget,
    /// The inbound event is not one the orchestrator handles.
    UnsupportedEvent,
    /// A comment contains malformed command syntax.
    Parse,
    /// The hosting service failed.
    Collaborator,
}

// ---------------------------------------------------------------------------
// Orchestration errors
// ---------------------------------------------------------------------------

/// Errors that abort resolution or job synthesis for one event.
///
/// No partial job list is ever returned alongside one of these.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A project's workflow reference does not resolve.
    #[error("failed to find workflow config '{workflow}' for project '{project}'")]
    WorkflowNotFound {
        /// The unresolved workflow name.
        workflow: WorkflowName,
        /// The project that references it.
        project: ProjectName,
    },

    /// A comment named a project other than the single impacted one.
    #[error("requested project {project} is not impacted by this PR")]
    ProjectNotImpacted {
        /// The project named in the comment.
        project: ProjectName,
    },

    /// A comment named a project absent from the impacted set.
    #[error("requested project not found in modified projects")]
    RequestedProjectNotFound {
        /// The project name parsed from the comment.
        project: String,
    },

    /// The event is neither a pull-request nor an issue-comment event.
    #[error("unsupported event type: {event_type}")]
    UnsupportedEvent {
        /// Event name (or `unknown`) for diagnostics.
        event_type: String,
    },

    /// The event name was recognised but its payload does not have the
    /// expected shape.
    #[error("malformed {event_type} event: {message}")]
    MalformedEvent {
        /// Event name that selected the payload shape.
        event_type: String,
        /// Deserialisation failure detail.
        message: String,
    },

    /// A comment's command flags could not be parsed.
    #[error(transparent)]
    Parse(#[from] CommandParseError),

    /// The changed-files fetch failed.
    #[error("could not get changed files")]
    ChangedFiles {
        /// Underlying service failure.
        #[source]
        source: PullRequestServiceError,
    },
}

impl OrchestratorError {
    /// Maps this error onto the coarse taxonomy.
    pub fn category(&self) -> ErrorCategory {
        match self {
            OrchestratorError::WorkflowNotFound { .. } => ErrorCategory::Configuration,
            OrchestratorError::ProjectNotImpacted { .. }
            | OrchestratorError::RequestedProjectNotFound { .. } => ErrorCategory::AmbiguousTarget,
            OrchestratorError::UnsupportedEvent { .. }
            | OrchestratorError::MalformedEvent { .. } => ErrorCategory::UnsupportedEvent,
            OrchestratorError::Parse(_) => ErrorCategory::Parse,
            OrchestratorError::ChangedFiles { .. } => ErrorCategory::Collaborator,
        }
    }
}
