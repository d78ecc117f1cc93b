//! Event-to-project resolution.
//!
//! Works out which projects an event concerns before any job is synthesized:
//! fetches the pull request's changed files through the [`PullRequestService`]
//! port, maps them to impacted projects with an [`ImpactResolver`], and, for
//! comments, finds the project named with `-p`.
//!
//! The changed-files fetch is the only await point. Timeouts and cancellation
//! belong to the caller, which can wrap [`resolve_event`] as a whole.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::commands;
use crate::config::{ImpactResolver, Project};
use crate::events::Event;
use crate::{OrchestratorError, PrNumber, PullRequestService};

/// Projects an event concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Projects impacted by the pull request's changes.
    pub impacted_projects: Vec<Project>,

    /// The project a comment named with `-p`, taken from `impacted_projects`.
    pub requested_project: Option<Project>,

    /// The pull request the event targets.
    pub pr_number: PrNumber,
}

/// Resolves the projects an event concerns.
///
/// # Errors
///
/// - [`OrchestratorError::ChangedFiles`] when the changed-files fetch fails.
/// - [`OrchestratorError::RequestedProjectNotFound`] when a comment names a
///   project that is not among the impacted projects.
#[instrument(skip_all, fields(event = %event.kind(), pr = %event.pr_number()))]
pub async fn resolve_event<R, S>(
    event: &Event,
    resolver: &R,
    service: &S,
) -> Result<Resolution, OrchestratorError>
where
    R: ImpactResolver + ?Sized,
    S: PullRequestService + ?Sized,
{
    let pr_number = event.pr_number();
    let impacted_projects = impacted_projects(pr_number, resolver, service).await?;

    let Event::IssueComment(comment) = event else {
        return Ok(Resolution {
            impacted_projects,
            requested_project: None,
            pr_number,
        });
    };

    let Some(requested) = commands::parse_project_name(&comment.body) else {
        return Ok(Resolution {
            impacted_projects,
            requested_project: None,
            pr_number,
        });
    };

    let requested_project = impacted_projects
        .iter()
        .find(|project| project.name.as_str() == requested)
        .cloned();

    match requested_project {
        Some(project) => {
            debug!(project = %project.name, "comment targets a single project");
            Ok(Resolution {
                impacted_projects,
                requested_project: Some(project),
                pr_number,
            })
        }
        None => {
            warn!(project = %requested, "requested project is not impacted");
            Err(OrchestratorError::RequestedProjectNotFound { project: requested })
        }
    }
}

async fn impacted_projects<R, S>(
    pr_number: PrNumber,
    resolver: &R,
    service: &S,
) -> Result<Vec<Project>, OrchestratorError>
where
    R: ImpactResolver + ?Sized,
    S: PullRequestService + ?Sized,
{
    let changed_files = service
        .get_changed_files(pr_number)
        .await
        .map_err(|source| OrchestratorError::ChangedFiles { source })?;

    let impacted = resolver.modified_projects(&changed_files);
    info!(
        changed_files = changed_files.len(),
        impacted = impacted.len(),
        "resolved impacted projects"
    );
    Ok(impacted)
}
