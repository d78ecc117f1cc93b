//! In-memory fake for the pull-request service port (testing only).
//!
//! [`MemoryPullRequestService`] satisfies the [`PullRequestService`] contract
//! without any network access, so resolution and the surrounding flow can be
//! exercised end to end.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::service::{Comment, CommitState, PullRequestService, PullRequestServiceError};
use crate::{CommentId, PrNumber};

#[derive(Debug, Default)]
struct State {
    changed_files: HashMap<PrNumber, Vec<String>>,
    comments: BTreeMap<CommentId, (PrNumber, String)>,
    statuses: HashMap<PrNumber, BTreeMap<String, CommitState>>,
    mergeable: HashSet<PrNumber>,
    merged: HashSet<PrNumber>,
    closed: HashSet<PrNumber>,
    teams: HashMap<(String, String), Vec<String>>,
    failing: HashSet<&'static str>,
    next_comment_id: u64,
}

/// In-memory [`PullRequestService`].
#[derive(Debug, Default)]
pub struct MemoryPullRequestService {
    state: Mutex<State>,
}

impl MemoryPullRequestService {
    /// Creates an empty fake.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the changed files reported for `pr`.
    pub fn with_changed_files<I, P>(self, pr: PrNumber, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.lock()
            .changed_files
            .insert(pr, files.into_iter().map(Into::into).collect());
        self
    }

    /// Marks `pr` as mergeable.
    pub fn with_mergeable(self, pr: PrNumber) -> Self {
        self.lock().mergeable.insert(pr);
        self
    }

    /// Records `user` as a member of `teams` in `organisation`.
    pub fn with_user_teams(self, organisation: &str, user: &str, teams: &[&str]) -> Self {
        self.lock().teams.insert(
            (organisation.to_string(), user.to_string()),
            teams.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    /// Makes every call to `operation` fail with a transport error.
    pub fn failing(self, operation: &'static str) -> Self {
        self.lock().failing.insert(operation);
        self
    }

    /// Returns the bodies of comments posted on `pr`, oldest first.
    pub fn comments_on(&self, pr: PrNumber) -> Vec<String> {
        self.lock()
            .comments
            .values()
            .filter(|(on, _)| *on == pr)
            .map(|(_, body)| body.clone())
            .collect()
    }

    /// Returns the status recorded for `pr` under `context`.
    pub fn status_of(&self, pr: PrNumber, context: &str) -> Option<CommitState> {
        self.lock()
            .statuses
            .get(&pr)
            .and_then(|s| s.get(context))
            .copied()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A poisoned lock only means another test thread panicked; the data is
        // still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self, operation: &'static str) -> Result<(), PullRequestServiceError> {
        if self.lock().failing.contains(operation) {
            return Err(PullRequestServiceError::Transport {
                operation,
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PullRequestService for MemoryPullRequestService {
    async fn get_changed_files(
        &self,
        pr: PrNumber,
    ) -> Result<Vec<String>, PullRequestServiceError> {
        self.check("get_changed_files")?;
        Ok(self.lock().changed_files.get(&pr).cloned().unwrap_or_default())
    }

    async fn publish_comment(
        &self,
        pr: PrNumber,
        body: &str,
    ) -> Result<(), PullRequestServiceError> {
        self.check("publish_comment")?;
        let mut state = self.lock();
        state.next_comment_id += 1;
        let id = CommentId::new(state.next_comment_id);
        state.comments.insert(id, (pr, body.to_string()));
        Ok(())
    }

    async fn edit_comment(&self, id: CommentId, body: &str) -> Result<(), PullRequestServiceError> {
        self.check("edit_comment")?;
        match self.lock().comments.get_mut(&id) {
            Some((_, existing)) => {
                *existing = body.to_string();
                Ok(())
            }
            None => Err(PullRequestServiceError::InvalidResponse {
                operation: "edit_comment",
                message: format!("comment {id} does not exist"),
            }),
        }
    }

    async fn get_comments(&self, pr: PrNumber) -> Result<Vec<Comment>, PullRequestServiceError> {
        self.check("get_comments")?;
        Ok(self
            .lock()
            .comments
            .iter()
            .filter(|(_, (on, _))| *on == pr)
            .map(|(id, (_, body))| Comment {
                id: *id,
                body: Some(body.clone()),
            })
            .collect())
    }

    async fn set_status(
        &self,
        pr: PrNumber,
        state: CommitState,
        context: &str,
    ) -> Result<(), PullRequestServiceError> {
        self.check("set_status")?;
        self.lock()
            .statuses
            .entry(pr)
            .or_default()
            .insert(context.to_string(), state);
        Ok(())
    }

    async fn get_combined_status(
        &self,
        pr: PrNumber,
    ) -> Result<CommitState, PullRequestServiceError> {
        self.check("get_combined_status")?;
        let state = self.lock();
        let Some(statuses) = state.statuses.get(&pr).filter(|s| !s.is_empty()) else {
            return Ok(CommitState::Pending);
        };
        let combined = if statuses
            .values()
            .any(|s| matches!(s, CommitState::Error | CommitState::Failure))
        {
            CommitState::Failure
        } else if statuses.values().any(|s| *s == CommitState::Pending) {
            CommitState::Pending
        } else {
            CommitState::Success
        };
        Ok(combined)
    }

    async fn merge_pull_request(&self, pr: PrNumber) -> Result<(), PullRequestServiceError> {
        self.check("merge_pull_request")?;
        let mut state = self.lock();
        state.merged.insert(pr);
        state.closed.insert(pr);
        Ok(())
    }

    async fn is_mergeable(&self, pr: PrNumber) -> Result<bool, PullRequestServiceError> {
        self.check("is_mergeable")?;
        let state = self.lock();
        Ok(state.mergeable.contains(&pr) && !state.closed.contains(&pr))
    }

    async fn is_merged(&self, pr: PrNumber) -> Result<bool, PullRequestServiceError> {
        self.check("is_merged")?;
        Ok(self.lock().merged.contains(&pr))
    }

    async fn is_closed(&self, pr: PrNumber) -> Result<bool, PullRequestServiceError> {
        self.check("is_closed")?;
        Ok(self.lock().closed.contains(&pr))
    }

    async fn get_user_teams(
        &self,
        organisation: &str,
        user: &str,
    ) -> Result<Vec<String>, PullRequestServiceError> {
        self.check("get_user_teams")?;
        Ok(self
            .lock()
            .teams
            .get(&(organisation.to_string(), user.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}
