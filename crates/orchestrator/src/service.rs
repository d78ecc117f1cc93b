//! Pull-request service port.
//!
//! [`PullRequestService`] is the only way the orchestrator reaches the hosting
//! service. Every method is a direct network call in the production adapter
//! (`github::GithubService`); the domain logic in this crate only ever calls
//! [`PullRequestService::get_changed_files`], and hands its outputs (jobs,
//! comments) to the remaining operations through the caller.
//!
//! Implementations must return errors rather than abort the process so that a
//! host handling many events can recover per event.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CommentId, PrNumber};

/// Failure reported by a [`PullRequestService`] implementation.
///
/// The orchestrator never retries these; retry policy, if any, belongs to the
/// adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PullRequestServiceError {
    /// The request could not be completed (network failure, 5xx, unexpected
    /// 4xx).
    #[error("{operation} failed: {message}")]
    Transport {
        /// Name of the service operation that failed.
        operation: &'static str,
        /// Human-readable description from the transport layer.
        message: String,
    },

    /// The hosting service rejected the credentials or the caller lacks
    /// permission for the operation.
    #[error("{operation} was not authorized: {message}")]
    Unauthorized {
        /// Name of the service operation that failed.
        operation: &'static str,
        /// Human-readable description from the transport layer.
        message: String,
    },

    /// The hosting service answered, but the response lacked a field the
    /// operation needs.
    #[error("{operation} returned an unexpected response: {message}")]
    InvalidResponse {
        /// Name of the service operation that failed.
        operation: &'static str,
        /// What was missing or malformed.
        message: String,
    },
}

/// A comment on a pull request, as returned by [`PullRequestService::get_comments`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Identifier used to edit the comment later.
    pub id: CommentId,
    /// Comment body; GitHub omits it for some minimized comments.
    pub body: Option<String>,
}

/// Commit status state, as accepted and reported by the hosting service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitState {
    /// A check could not run.
    Error,
    /// A check ran and failed.
    Failure,
    /// A check is running or has not reported.
    Pending,
    /// A check ran and passed.
    Success,
}

impl CommitState {
    /// Returns the wire representation used by the hosting service.
    pub fn as_str(self) -> &'static str {
        match self {
            CommitState::Error => "error",
            CommitState::Failure => "failure",
            CommitState::Pending => "pending",
            CommitState::Success => "success",
        }
    }
}

impl std::fmt::Display for CommitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hosting-service operations needed around job synthesis.
///
/// All operations are scoped to the repository the implementation was built
/// for.
#[async_trait]
pub trait PullRequestService: Send + Sync {
    /// Lists the paths of every file changed by the pull request.
    async fn get_changed_files(&self, pr: PrNumber)
        -> Result<Vec<String>, PullRequestServiceError>;

    /// Posts a new comment on the pull request.
    async fn publish_comment(&self, pr: PrNumber, body: &str)
        -> Result<(), PullRequestServiceError>;

    /// Replaces the body of an existing comment.
    async fn edit_comment(&self, id: CommentId, body: &str)
        -> Result<(), PullRequestServiceError>;

    /// Lists the comments on the pull request.
    async fn get_comments(&self, pr: PrNumber) -> Result<Vec<Comment>, PullRequestServiceError>;

    /// Sets a commit status on the pull request's head commit.
    async fn set_status(
        &self,
        pr: PrNumber,
        state: CommitState,
        context: &str,
    ) -> Result<(), PullRequestServiceError>;

    /// Returns the combined status of the pull request's head commit.
    async fn get_combined_status(&self, pr: PrNumber)
        -> Result<CommitState, PullRequestServiceError>;

    /// Squash-merges the pull request.
    async fn merge_pull_request(&self, pr: PrNumber) -> Result<(), PullRequestServiceError>;

    /// Returns `true` when the pull request can be merged right now.
    async fn is_mergeable(&self, pr: PrNumber) -> Result<bool, PullRequestServiceError>;

    /// Returns `true` when the pull request has been merged.
    async fn is_merged(&self, pr: PrNumber) -> Result<bool, PullRequestServiceError>;

    /// Returns `true` when the pull request is closed (merged or not).
    async fn is_closed(&self, pr: PrNumber) -> Result<bool, PullRequestServiceError>;

    /// Lists the names of the teams in `organisation` that `user` belongs to.
    async fn get_user_teams(
        &self,
        organisation: &str,
        user: &str,
    ) -> Result<Vec<String>, PullRequestServiceError>;
}
