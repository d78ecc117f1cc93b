//! Core orchestration domain for Digger.
//!
//! Translates source-control webhook events into the jobs a multi-project
//! infrastructure-as-code pipeline should run: which projects are affected,
//! which `digger` commands run for them, and with what workspace, stages and
//! environment.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! The hosting service is reached only through [`PullRequestService`];
//! infrastructure crates (`github`) implement it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype domain identifiers (`PrNumber`, `ProjectName`, etc.) |
//! | [`errors`] | [`OrchestratorError`] and its [`ErrorCategory`] taxonomy |
//! | [`config`] | `digger.yml` model and the [`ImpactResolver`] |
//! | [`commands`] | `digger` comment command parsing |
//! | [`events`] | Event classification into the [`Event`] sum type |
//! | [`jobs`] | Job synthesis |
//! | [`resolve`] | Changed-files to impacted-projects resolution |
//! | [`service`] | The [`PullRequestService`] port |
//! | [`fakes`] | In-memory [`PullRequestService`] for tests |
//!
//! ## Flow
//!
//! ```text
//! payload ──classify──▶ EventPackage ──resolve_event──▶ Resolution ──synthesize_jobs──▶ Vec<Job>
//!                                         │
//!                                 PullRequestService::get_changed_files
//! ```

pub mod commands;
pub mod config;
pub mod errors;
pub mod events;
pub mod fakes;
pub mod identifiers;
pub mod jobs;
pub mod resolve;
pub mod service;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::{ConfigError, DiggerConfig, ImpactResolver, Project, Workflow};
pub use errors::{ErrorCategory, OrchestratorError};
pub use events::{classify, Event, EventKind, EventPackage};
pub use identifiers::{Actor, CommentId, Namespace, PrNumber, ProjectName, RunId, WorkflowName};
pub use jobs::{synthesize_jobs, synthesize_jobs_with_env, Job, Synthesis};
pub use resolve::{resolve_event, Resolution};
pub use service::{Comment, CommitState, PullRequestService, PullRequestServiceError};
