//! Repository-scoped GitHub REST client.
//!
//! [`GithubService`] wraps an [`Octocrab`] instance and scopes every call to
//! one repository. Requests go through octocrab's generic `get`/`post`/`put`/
//! `patch` with small serde request and response structs, so only the fields
//! the orchestrator needs are decoded.

use async_trait::async_trait;
use octocrab::Octocrab;
use orchestrator::{
    Comment, CommentId, CommitState, Namespace, PrNumber, PullRequestService,
    PullRequestServiceError,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::GithubError;
use crate::mergeable::is_mergeable_state;

/// Page size for list endpoints; GitHub's maximum.
const PER_PAGE: usize = 100;

/// Commit title used for merges performed by the orchestrator.
const MERGE_COMMIT_TITLE: &str = "auto-merge";

/// GitHub implementation of [`PullRequestService`], scoped to one repository.
#[derive(Clone)]
pub struct GithubService {
    client: Octocrab,
    owner: String,
    repo: String,
}

impl GithubService {
    /// Creates a service authenticated with a personal or Actions token.
    ///
    /// # Errors
    ///
    /// - [`GithubError::InvalidNamespace`] when `namespace` is not `owner/repo`.
    /// - [`GithubError::Api`] when the octocrab client cannot be built.
    pub fn from_token(
        token: impl Into<String>,
        namespace: &Namespace,
    ) -> Result<Self, GithubError> {
        let client = Octocrab::builder()
            .personal_token(token.into())
            .build()
            .map_err(GithubError::api("connect"))?;
        Self::from_octocrab(client, namespace)
    }

    /// Creates a service from a pre-configured [`Octocrab`] instance.
    ///
    /// Use this for GitHub App installation tokens or a custom base URL.
    pub fn from_octocrab(client: Octocrab, namespace: &Namespace) -> Result<Self, GithubError> {
        let (owner, repo) = namespace
            .split()
            .ok_or_else(|| GithubError::InvalidNamespace(namespace.to_string()))?;
        Ok(Self {
            client,
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    fn repo_route(&self, path: &str) -> String {
        format!("/repos/{}/{}/{}", self.owner, self.repo, path)
    }

    async fn pull_request(
        &self,
        pr: PrNumber,
        operation: &'static str,
    ) -> Result<PullRequestResponse, GithubError> {
        let route = self.repo_route(&format!("pulls/{pr}"));
        self.client
            .get(&route, None::<&()>)
            .await
            .map_err(GithubError::api(operation))
    }

    async fn head_sha(&self, pr: PrNumber, operation: &'static str) -> Result<String, GithubError> {
        let pull_request = self.pull_request(pr, operation).await?;
        if pull_request.head.sha.is_empty() {
            return Err(GithubError::UnexpectedResponse {
                operation,
                message: format!("pull request {pr} has no head sha"),
            });
        }
        Ok(pull_request.head.sha)
    }

    /// Fetches every page of a list endpoint.
    async fn paginate<T: DeserializeOwned + Send>(
        &self,
        route: &str,
        operation: &'static str,
    ) -> Result<Vec<T>, GithubError> {
        let mut page = 1u32;
        let mut all = Vec::new();

        loop {
            let params = PageParams {
                per_page: PER_PAGE,
                page,
            };
            let items: Vec<T> = self
                .client
                .get(route, Some(&params))
                .await
                .map_err(GithubError::api(operation))?;

            let is_last_page = items.len() < PER_PAGE;
            all.extend(items);
            if is_last_page {
                break;
            }
            page += 1;
        }

        Ok(all)
    }

    async fn user_teams(&self, organisation: &str, user: &str) -> Result<Vec<String>, GithubError> {
        let teams: Vec<TeamResponse> = self
            .paginate(&format!("/orgs/{organisation}/teams"), "get_user_teams")
            .await?;

        let mut member_of = Vec::new();
        for team in teams {
            let members: Vec<MemberResponse> = self
                .paginate(
                    &format!("/orgs/{organisation}/teams/{}/members", team.slug),
                    "get_user_teams",
                )
                .await?;
            if members.iter().any(|m| m.login == user) {
                member_of.push(team.name);
            }
        }
        Ok(member_of)
    }
}

impl std::fmt::Debug for GithubService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubService")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PullRequestService for GithubService {
    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn get_changed_files(
        &self,
        pr: PrNumber,
    ) -> Result<Vec<String>, PullRequestServiceError> {
        let route = self.repo_route(&format!("pulls/{pr}/files"));
        let files: Vec<FileResponse> = self.paginate(&route, "get_changed_files").await?;
        debug!(count = files.len(), "fetched changed files");
        Ok(files.into_iter().map(|f| f.filename).collect())
    }

    #[instrument(skip(self, body), fields(repo = %self.repo))]
    async fn publish_comment(
        &self,
        pr: PrNumber,
        body: &str,
    ) -> Result<(), PullRequestServiceError> {
        let route = self.repo_route(&format!("issues/{pr}/comments"));
        let _: serde_json::Value = self
            .client
            .post(&route, Some(&CommentRequest { body }))
            .await
            .map_err(GithubError::api("publish_comment"))?;
        Ok(())
    }

    #[instrument(skip(self, body), fields(repo = %self.repo))]
    async fn edit_comment(&self, id: CommentId, body: &str) -> Result<(), PullRequestServiceError> {
        let route = self.repo_route(&format!("issues/comments/{id}"));
        let _: serde_json::Value = self
            .client
            .patch(&route, Some(&CommentRequest { body }))
            .await
            .map_err(GithubError::api("edit_comment"))?;
        Ok(())
    }

    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn get_comments(&self, pr: PrNumber) -> Result<Vec<Comment>, PullRequestServiceError> {
        let route = self.repo_route(&format!("issues/{pr}/comments"));
        let comments: Vec<CommentResponse> = self.paginate(&route, "get_comments").await?;
        Ok(comments
            .into_iter()
            .map(|c| Comment {
                id: CommentId::new(c.id),
                body: c.body,
            })
            .collect())
    }

    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn set_status(
        &self,
        pr: PrNumber,
        state: CommitState,
        context: &str,
    ) -> Result<(), PullRequestServiceError> {
        let sha = self.head_sha(pr, "set_status").await?;
        let route = self.repo_route(&format!("statuses/{sha}"));
        let request = StatusRequest {
            state,
            context,
            description: context,
        };
        let _: serde_json::Value = self
            .client
            .post(&route, Some(&request))
            .await
            .map_err(GithubError::api("set_status"))?;
        Ok(())
    }

    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn get_combined_status(
        &self,
        pr: PrNumber,
    ) -> Result<CommitState, PullRequestServiceError> {
        let sha = self.head_sha(pr, "get_combined_status").await?;
        let route = self.repo_route(&format!("commits/{sha}/status"));
        let status: CombinedStatusResponse = self
            .client
            .get(&route, None::<&()>)
            .await
            .map_err(GithubError::api("get_combined_status"))?;
        Ok(status.state)
    }

    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn merge_pull_request(&self, pr: PrNumber) -> Result<(), PullRequestServiceError> {
        let sha = self.head_sha(pr, "merge_pull_request").await?;
        let route = self.repo_route(&format!("pulls/{pr}/merge"));
        let request = MergeRequest {
            commit_title: MERGE_COMMIT_TITLE,
            merge_method: "squash",
            sha: &sha,
        };
        let response: MergeResponse = self
            .client
            .put(&route, Some(&request))
            .await
            .map_err(GithubError::api("merge_pull_request"))?;

        if !response.merged {
            return Err(GithubError::UnexpectedResponse {
                operation: "merge_pull_request",
                message: response
                    .message
                    .unwrap_or_else(|| "merge returned merged=false".to_string()),
            }
            .into());
        }
        debug!(sha = %sha, "merged pull request");
        Ok(())
    }

    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn is_mergeable(&self, pr: PrNumber) -> Result<bool, PullRequestServiceError> {
        let pull_request = self.pull_request(pr, "is_mergeable").await?;
        let state = pull_request.mergeable_state.unwrap_or_default();
        Ok(pull_request.mergeable == Some(true) && is_mergeable_state(&state))
    }

    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn is_merged(&self, pr: PrNumber) -> Result<bool, PullRequestServiceError> {
        let pull_request = self.pull_request(pr, "is_merged").await?;
        Ok(pull_request.merged.unwrap_or(false))
    }

    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn is_closed(&self, pr: PrNumber) -> Result<bool, PullRequestServiceError> {
        let pull_request = self.pull_request(pr, "is_closed").await?;
        Ok(pull_request.state == "closed")
    }

    #[instrument(skip(self))]
    async fn get_user_teams(
        &self,
        organisation: &str,
        user: &str,
    ) -> Result<Vec<String>, PullRequestServiceError> {
        Ok(self.user_teams(organisation, user).await?)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct PageParams {
    per_page: usize,
    page: u32,
}

#[derive(Serialize)]
struct CommentRequest<'a> {
    body: &'a str,
}

#[derive(Serialize)]
struct StatusRequest<'a> {
    state: CommitState,
    context: &'a str,
    description: &'a str,
}

#[derive(Serialize)]
struct MergeRequest<'a> {
    commit_title: &'static str,
    merge_method: &'static str,
    sha: &'a str,
}

#[derive(Debug, Deserialize)]
struct MergeResponse {
    merged: bool,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PullRequestResponse {
    head: HeadResponse,
    #[serde(default)]
    mergeable: Option<bool>,
    #[serde(default)]
    mergeable_state: Option<String>,
    #[serde(default)]
    merged: Option<bool>,
    state: String,
}

#[derive(Debug, Deserialize)]
struct HeadResponse {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct FileResponse {
    filename: String,
}

#[derive(Debug, Deserialize)]
struct CommentResponse {
    id: u64,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CombinedStatusResponse {
    state: CommitState,
}

#[derive(Debug, Deserialize)]
struct TeamResponse {
    name: String,
    slug: String,
}

#[derive(Debug, Deserialize)]
struct MemberResponse {
    login: String,
}
