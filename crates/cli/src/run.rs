//! One orchestrator run: event in, job document out.

use anyhow::{Context, Result};
use orchestrator::commands::{is_help_comment, HELP_TEXT};
use orchestrator::{
    resolve_event, synthesize_jobs, DiggerConfig, Event, EventPackage, Job, OrchestratorError,
    PullRequestService, RunId,
};
use serde::Serialize;
use tracing::{info, warn};

/// The document written for the job runner.
#[derive(Debug, Serialize)]
pub struct JobDocument {
    pub run_id: RunId,
    pub covers_all_impacted_projects: bool,
    pub jobs: Vec<Job>,
}

/// Result of handling one event.
#[derive(Debug)]
pub enum Outcome {
    /// The comment asked for help; the help text was posted.
    Help,
    /// Jobs to run (possibly none).
    Jobs(JobDocument),
}

/// Handles one event.
///
/// For comment events, a resolution or synthesis failure is posted back to
/// the pull request before it is returned.
pub async fn run_event<S>(
    run_id: RunId,
    config: &DiggerConfig,
    package: &EventPackage,
    service: &S,
) -> Result<Outcome>
where
    S: PullRequestService + ?Sized,
{
    let pr = package.event.pr_number();

    if package.event.comment_body().is_some_and(is_help_comment) {
        info!(pr = %pr, "posting help text");
        service
            .publish_comment(pr, HELP_TEXT)
            .await
            .context("failed to publish help text")?;
        return Ok(Outcome::Help);
    }

    match plan_jobs(run_id, config, package, service).await {
        Ok(document) => {
            info!(
                jobs = document.jobs.len(),
                covers_all = document.covers_all_impacted_projects,
                "jobs ready"
            );
            Ok(Outcome::Jobs(document))
        }
        Err(err) => {
            if matches!(package.event, Event::IssueComment(_)) {
                if let Err(publish_err) = service.publish_comment(pr, &err.to_string()).await {
                    warn!(error = %publish_err, "failed to report error on pull request");
                }
            }
            Err(err.into())
        }
    }
}

async fn plan_jobs<S>(
    run_id: RunId,
    config: &DiggerConfig,
    package: &EventPackage,
    service: &S,
) -> Result<JobDocument, OrchestratorError>
where
    S: PullRequestService + ?Sized,
{
    let resolution = resolve_event(&package.event, config, service).await?;
    let synthesis = synthesize_jobs(
        package,
        &resolution.impacted_projects,
        resolution.requested_project.as_ref(),
        &config.workflows,
    )?;
    Ok(JobDocument {
        run_id,
        covers_all_impacted_projects: synthesis.covers_all_impacted_projects,
        jobs: synthesis.jobs,
    })
}
