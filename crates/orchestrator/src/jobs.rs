//! Job synthesis.
//!
//! Turns a classified event, the projects it impacts, and the configured
//! workflows into the [`Job`]s an executor should run. Synthesis is a pure
//! function of its inputs: it performs no I/O and holds no state between
//! calls, so identical inputs always produce identical job lists.
//!
//! ## Rules
//!
//! | Event | Condition | Commands |
//! |-------|-----------|----------|
//! | pull request | closed, merged, base is default branch | `on_commit_to_default` |
//! | pull request | opened / reopened / synchronize | `on_pull_request_pushed` |
//! | pull request | closed otherwise | `on_pull_request_closed` |
//! | pull request | any other action | none |
//! | comment | body starts with a `digger` command | that command, one job per project |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::commands::{self, DiggerCommand};
use crate::config::{Project, StageConfig, StepConfig, Workflow};
use crate::events::{
    Event, EventKind, EventPackage, IssueCommentEvent, PullRequestAction, PullRequestEvent,
};
use crate::{Actor, Namespace, OrchestratorError, PrNumber, ProjectName, WorkflowName};

// ---------------------------------------------------------------------------
// Job model
// ---------------------------------------------------------------------------

/// One step of a job stage, copied from its [`StepConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Action name (`init`, `plan`, `apply`, `run`, ...).
    pub action: String,
    /// Command line for `run` steps.
    pub value: Option<String>,
    /// Additional arguments for the action.
    pub extra_args: Vec<String>,
    /// Shell for `run` steps.
    pub shell: Option<String>,
}

/// Ordered steps for one phase of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Steps in execution order.
    pub steps: Vec<Step>,
}

impl From<&StepConfig> for Step {
    fn from(step: &StepConfig) -> Self {
        Self {
            action: step.action.clone(),
            value: step.value.clone(),
            extra_args: step.extra_args.clone(),
            shell: step.shell.clone(),
        }
    }
}

impl From<&StageConfig> for Stage {
    fn from(stage: &StageConfig) -> Self {
        Self {
            steps: stage.steps.iter().map(Step::from).collect(),
        }
    }
}

/// A fully resolved unit of work for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Project the job runs against.
    pub project_name: ProjectName,
    /// Project directory, relative to the repository root.
    pub project_dir: String,
    /// Workspace, after any comment override.
    pub project_workspace: String,
    /// Run through Terragrunt.
    pub terragrunt: bool,
    /// `digger` commands to run, in order.
    pub commands: Vec<String>,
    /// Steps for `digger plan`.
    pub plan_stage: Option<Stage>,
    /// Steps for `digger apply`.
    pub apply_stage: Option<Stage>,
    /// Environment for plan/apply commands.
    pub command_env_vars: BTreeMap<String, String>,
    /// Environment for the state backend.
    pub state_env_vars: BTreeMap<String, String>,
    /// Pull request that triggered the job.
    pub pull_request_number: PrNumber,
    /// `pull_request` or `issue_comment`.
    pub event_name: EventKind,
    /// User who triggered the job.
    pub requested_by: Actor,
    /// Repository the job belongs to.
    pub namespace: Namespace,
}

/// Result of a successful synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synthesis {
    /// Jobs to execute, in order.
    pub jobs: Vec<Job>,

    /// `false` when a comment narrowed the run to one of several impacted
    /// projects, so other impacted projects still need attention.
    pub covers_all_impacted_projects: bool,
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

/// Synthesizes jobs for an event, reading `value_from` environment variables
/// from the process environment.
///
/// See [`synthesize_jobs_with_env`].
pub fn synthesize_jobs(
    package: &EventPackage,
    impacted_projects: &[Project],
    requested_project: Option<&Project>,
    workflows: &BTreeMap<WorkflowName, Workflow>,
) -> Result<Synthesis, OrchestratorError> {
    synthesize_jobs_with_env(
        package,
        impacted_projects,
        requested_project,
        workflows,
        &|name: &str| std::env::var(name).ok(),
    )
}

/// Synthesizes jobs for an event.
///
/// `env` resolves `value_from` declarations in workflow environment
/// variables.
///
/// # Errors
///
/// - [`OrchestratorError::WorkflowNotFound`] when an involved project's
///   workflow is not in `workflows`.
/// - [`OrchestratorError::ProjectNotImpacted`] when a comment names a project
///   other than the single impacted one.
/// - [`OrchestratorError::Parse`] when a comment's `-w` modifier is malformed.
///
/// No partial job list is returned on error.
#[instrument(
    skip_all,
    fields(
        event = %package.event.kind(),
        pr = %package.event.pr_number(),
        impacted = impacted_projects.len(),
    )
)]
pub fn synthesize_jobs_with_env(
    package: &EventPackage,
    impacted_projects: &[Project],
    requested_project: Option<&Project>,
    workflows: &BTreeMap<WorkflowName, Workflow>,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<Synthesis, OrchestratorError> {
    let synthesizer = Synthesizer {
        package,
        workflows,
        env,
    };
    let synthesis = match &package.event {
        Event::PullRequest(event) => synthesizer.pull_request(event, impacted_projects)?,
        Event::IssueComment(event) => {
            synthesizer.issue_comment(event, impacted_projects, requested_project)?
        }
    };
    debug!(
        jobs = synthesis.jobs.len(),
        covers_all = synthesis.covers_all_impacted_projects,
        "synthesized jobs"
    );
    Ok(synthesis)
}

struct Synthesizer<'a> {
    package: &'a EventPackage,
    workflows: &'a BTreeMap<WorkflowName, Workflow>,
    env: &'a dyn Fn(&str) -> Option<String>,
}

impl<'a> Synthesizer<'a> {
    fn workflow_for(&self, project: &Project) -> Result<&'a Workflow, OrchestratorError> {
        self.workflows
            .get(project.workflow.as_str())
            .ok_or_else(|| OrchestratorError::WorkflowNotFound {
                workflow: project.workflow.clone(),
                project: project.name.clone(),
            })
    }

    fn pull_request(
        &self,
        event: &PullRequestEvent,
        impacted_projects: &[Project],
    ) -> Result<Synthesis, OrchestratorError> {
        let mut jobs = Vec::with_capacity(impacted_projects.len());

        for project in impacted_projects {
            let workflow = self.workflow_for(project)?;
            let configuration = &workflow.configuration;

            let commands = if event.is_merge_to_default_branch() {
                &configuration.on_commit_to_default
            } else {
                match event.action {
                    PullRequestAction::Opened
                    | PullRequestAction::Reopened
                    | PullRequestAction::Synchronize => &configuration.on_pull_request_pushed,
                    PullRequestAction::Closed => &configuration.on_pull_request_closed,
                    PullRequestAction::Other(ref action) => {
                        debug!(project = %project.name, action = %action, "no commands for action");
                        continue;
                    }
                }
            };

            jobs.push(self.job(
                project,
                workflow,
                project.workspace.clone(),
                commands.clone(),
                event.number,
                EventKind::PullRequest,
            ));
        }

        Ok(Synthesis {
            jobs,
            covers_all_impacted_projects: true,
        })
    }

    fn issue_comment(
        &self,
        event: &IssueCommentEvent,
        impacted_projects: &[Project],
        requested_project: Option<&Project>,
    ) -> Result<Synthesis, OrchestratorError> {
        let mut covers_all_impacted_projects = true;
        let mut run_for_projects = impacted_projects;

        if let Some(requested) = requested_project {
            if impacted_projects.len() > 1 {
                covers_all_impacted_projects = false;
                run_for_projects = std::slice::from_ref(requested);
            } else if let [only] = impacted_projects {
                if only.name != requested.name {
                    return Err(OrchestratorError::ProjectNotImpacted {
                        project: requested.name.clone(),
                    });
                }
            }
        }

        let matched: Vec<DiggerCommand> = commands::matching_commands(&event.body);
        if matched.is_empty() {
            debug!("comment carries no digger command");
            return Ok(Synthesis {
                jobs: Vec::new(),
                covers_all_impacted_projects,
            });
        }

        let workspace_override = commands::parse_workspace(&event.body)?;

        let mut jobs = Vec::with_capacity(matched.len() * run_for_projects.len());
        for command in matched {
            for project in run_for_projects {
                let workflow = self.workflow_for(project)?;
                let workspace = workspace_override
                    .clone()
                    .unwrap_or_else(|| project.workspace.clone());
                jobs.push(self.job(
                    project,
                    workflow,
                    workspace,
                    vec![command.as_str().to_string()],
                    event.issue_number,
                    EventKind::IssueComment,
                ));
            }
        }

        Ok(Synthesis {
            jobs,
            covers_all_impacted_projects,
        })
    }

    fn job(
        &self,
        project: &Project,
        workflow: &Workflow,
        workspace: String,
        commands: Vec<String>,
        pull_request_number: PrNumber,
        event_name: EventKind,
    ) -> Job {
        let (state_env_vars, command_env_vars) = workflow.env_vars.collect(self.env);
        Job {
            project_name: project.name.clone(),
            project_dir: project.dir.clone(),
            project_workspace: workspace,
            terragrunt: project.terragrunt,
            commands,
            plan_stage: workflow.plan.as_ref().map(Stage::from),
            apply_stage: workflow.apply.as_ref().map(Stage::from),
            command_env_vars,
            state_env_vars,
            pull_request_number,
            event_name,
            requested_by: self.package.actor.clone(),
            namespace: self.package.repository.clone(),
        }
    }
}
