//! Digger GitHub infrastructure adapter.
//!
//! Implements the [`orchestrator::PullRequestService`] port against the GitHub
//! REST API using [`octocrab`].
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules.
//! All GitHub API details (routes, pagination, authentication, error shapes)
//! are handled here; the [`orchestrator`] crate never sees them.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`client`] | [`GithubService`], the repository-scoped REST client |
//! | [`error`] | [`GithubError`] and its mapping onto `PullRequestServiceError` |
//! | [`mergeable`] | The [`is_mergeable_state`] predicate |

pub mod client;
pub mod error;
pub mod mergeable;

pub use client::GithubService;
pub use error::GithubError;
pub use mergeable::is_mergeable_state;
