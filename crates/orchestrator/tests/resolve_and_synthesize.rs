//! End-to-end tests: payload classification, project resolution against an
//! in-memory pull-request service, and job synthesis.

use orchestrator::fakes::MemoryPullRequestService;
use orchestrator::{
    resolve_event, synthesize_jobs_with_env, CommitState, DiggerConfig, ErrorCategory,
    EventPackage, OrchestratorError, PrNumber, PullRequestService,
};
use serde_json::{json, Value};

const CONFIG: &str = r#"
projects:
  - name: dev
    dir: dev
  - name: prod
    dir: prod
    workspace: production
    workflow: guarded
  - name: modules
    dir: modules
    exclude_patterns:
      - "modules/**/*.md"
workflows:
  guarded:
    env_vars:
      commands:
        - name: TF_VAR_region
          value: eu-west-1
        - name: TF_VAR_token
          value_from: DEPLOY_TOKEN
    plan:
      steps:
        - init
        - run: "tflint"
        - plan
    workflow_configuration:
      on_pull_request_pushed: ["digger plan"]
      on_pull_request_closed: ["digger unlock"]
      on_commit_to_default: ["digger apply", "digger unlock"]
"#;

fn config() -> DiggerConfig {
    DiggerConfig::from_yaml_str(CONFIG).expect("test config is valid")
}

fn no_env(_: &str) -> Option<String> {
    None
}

fn pull_request(action: &str, merged: bool, base: &str) -> EventPackage {
    let payload = json!({
        "action": action,
        "pull_request": {
            "number": 12,
            "merged": merged,
            "base": { "ref": base },
            "head": { "ref": "feature/network" }
        },
        "repository": { "full_name": "acme/infra", "default_branch": "main" },
        "sender": { "login": "octocat" }
    });
    EventPackage::from_payload("pull_request", &payload, None, None).expect("valid payload")
}

fn comment(body: &str) -> EventPackage {
    let payload: Value = json!({
        "action": "created",
        "issue": { "number": 12 },
        "comment": { "id": 900, "body": body },
        "repository": { "full_name": "acme/infra" },
        "sender": { "login": "reviewer" }
    });
    EventPackage::from_payload("issue_comment", &payload, None, None).expect("valid payload")
}

fn service() -> MemoryPullRequestService {
    MemoryPullRequestService::new().with_changed_files(
        PrNumber::new(12),
        ["dev/main.tf", "prod/variables.tf", "modules/vpc/README.md"],
    )
}

// ---------------------------------------------------------------------------
// resolve_event
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pull_request_resolves_every_impacted_project() {
    let package = pull_request("opened", false, "main");
    let resolution = resolve_event(&package.event, &config(), &service())
        .await
        .unwrap();

    let names: Vec<&str> = resolution
        .impacted_projects
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(names, vec!["dev", "prod"]);
    assert!(resolution.requested_project.is_none());
    assert_eq!(resolution.pr_number, PrNumber::new(12));
}

#[tokio::test]
async fn comment_without_project_flag_has_no_requested_project() {
    let package = comment("digger plan");
    let resolution = resolve_event(&package.event, &config(), &service())
        .await
        .unwrap();

    assert_eq!(resolution.impacted_projects.len(), 2);
    assert!(resolution.requested_project.is_none());
}

#[tokio::test]
async fn comment_with_project_flag_selects_impacted_project() {
    let package = comment("digger plan -p prod");
    let resolution = resolve_event(&package.event, &config(), &service())
        .await
        .unwrap();

    let requested = resolution.requested_project.expect("prod is impacted");
    assert_eq!(requested.name.as_str(), "prod");
}

#[tokio::test]
async fn comment_naming_unimpacted_project_fails() {
    let package = comment("digger apply -p modules");
    let err = resolve_event(&package.event, &config(), &service())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        OrchestratorError::RequestedProjectNotFound { ref project } if project == "modules"
    ));
    assert_eq!(
        err.to_string(),
        "requested project not found in modified projects"
    );
}

#[tokio::test]
async fn changed_files_failure_is_reported_as_collaborator_error() {
    let package = pull_request("synchronize", false, "main");
    let failing = service().failing("get_changed_files");

    let err = resolve_event(&package.event, &config(), &failing)
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::ChangedFiles { .. }));
    assert_eq!(err.category(), ErrorCategory::Collaborator);
    assert_eq!(err.to_string(), "could not get changed files");
}

#[tokio::test]
async fn resolution_accepts_trait_objects() {
    let package = pull_request("opened", false, "main");
    let service: Box<dyn PullRequestService> = Box::new(service());
    let resolution = resolve_event(&package.event, &config(), service.as_ref())
        .await
        .unwrap();
    assert_eq!(resolution.impacted_projects.len(), 2);
}

// ---------------------------------------------------------------------------
// classify -> resolve -> synthesize
// ---------------------------------------------------------------------------

#[tokio::test]
async fn opened_pull_request_plans_each_project_with_its_workflow() {
    let config = config();
    let package = pull_request("opened", false, "main");
    let resolution = resolve_event(&package.event, &config, &service())
        .await
        .unwrap();

    let env = |name: &str| (name == "DEPLOY_TOKEN").then(|| "s3cret".to_string());
    let synthesis = synthesize_jobs_with_env(
        &package,
        &resolution.impacted_projects,
        resolution.requested_project.as_ref(),
        &config.workflows,
        &env,
    )
    .unwrap();

    assert!(synthesis.covers_all_impacted_projects);
    assert_eq!(synthesis.jobs.len(), 2);

    let dev = &synthesis.jobs[0];
    assert_eq!(dev.project_name.as_str(), "dev");
    assert_eq!(dev.project_workspace, "default");
    assert_eq!(dev.commands, vec!["digger plan"]);
    assert!(dev.command_env_vars.is_empty());

    let prod = &synthesis.jobs[1];
    assert_eq!(prod.project_name.as_str(), "prod");
    assert_eq!(prod.project_workspace, "production");
    assert_eq!(prod.commands, vec!["digger plan"]);
    assert_eq!(prod.command_env_vars["TF_VAR_region"], "eu-west-1");
    assert_eq!(prod.command_env_vars["TF_VAR_token"], "s3cret");
    let plan = prod.plan_stage.as_ref().expect("guarded declares a plan stage");
    let actions: Vec<&str> = plan.steps.iter().map(|s| s.action.as_str()).collect();
    assert_eq!(actions, vec!["init", "run", "plan"]);
    assert!(prod.apply_stage.is_none());

    for job in &synthesis.jobs {
        assert_eq!(job.pull_request_number, PrNumber::new(12));
        assert_eq!(job.requested_by.as_str(), "octocat");
        assert_eq!(job.namespace.as_str(), "acme/infra");
    }
}

#[tokio::test]
async fn merge_to_default_branch_applies() {
    let config = config();
    let package = pull_request("closed", true, "main");
    let resolution = resolve_event(&package.event, &config, &service())
        .await
        .unwrap();

    let synthesis = synthesize_jobs_with_env(
        &package,
        &resolution.impacted_projects,
        None,
        &config.workflows,
        &no_env,
    )
    .unwrap();

    assert_eq!(synthesis.jobs[0].commands, vec!["digger apply"]);
    assert_eq!(
        synthesis.jobs[1].commands,
        vec!["digger apply", "digger unlock"]
    );
}

#[tokio::test]
async fn targeted_comment_runs_only_requested_project() {
    let config = config();
    let package = comment("digger apply -p prod -w staging");
    let resolution = resolve_event(&package.event, &config, &service())
        .await
        .unwrap();

    let synthesis = synthesize_jobs_with_env(
        &package,
        &resolution.impacted_projects,
        resolution.requested_project.as_ref(),
        &config.workflows,
        &no_env,
    )
    .unwrap();

    assert!(!synthesis.covers_all_impacted_projects);
    assert_eq!(synthesis.jobs.len(), 1);
    let job = &synthesis.jobs[0];
    assert_eq!(job.project_name.as_str(), "prod");
    assert_eq!(job.project_workspace, "staging");
    assert_eq!(job.commands, vec!["digger apply"]);
    assert_eq!(job.requested_by.as_str(), "reviewer");
    assert_eq!(job.command_env_vars["TF_VAR_token"], "");
}

#[tokio::test]
async fn malformed_workspace_flag_yields_no_jobs() {
    let config = config();
    let package = comment("digger plan -w");
    let resolution = resolve_event(&package.event, &config, &service())
        .await
        .unwrap();

    let err = synthesize_jobs_with_env(
        &package,
        &resolution.impacted_projects,
        None,
        &config.workflows,
        &no_env,
    )
    .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Parse);
    assert_eq!(err.to_string(), "no workspace specified after -w flag");
}

// ---------------------------------------------------------------------------
// Fake service behaviour used by the binary
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fake_service_records_comments_and_statuses() {
    let pr = PrNumber::new(12);
    let service = service().with_mergeable(pr);

    service.publish_comment(pr, "first").await.unwrap();
    let comments = service.get_comments(pr).await.unwrap();
    assert_eq!(comments.len(), 1);
    service.edit_comment(comments[0].id, "edited").await.unwrap();
    assert_eq!(service.comments_on(pr), vec!["edited"]);

    assert_eq!(
        service.get_combined_status(pr).await.unwrap(),
        CommitState::Pending
    );
    service
        .set_status(pr, CommitState::Success, "digger/plan")
        .await
        .unwrap();
    assert_eq!(service.status_of(pr, "digger/plan"), Some(CommitState::Success));
    assert_eq!(
        service.get_combined_status(pr).await.unwrap(),
        CommitState::Success
    );

    assert!(service.is_mergeable(pr).await.unwrap());
    service.merge_pull_request(pr).await.unwrap();
    assert!(service.is_merged(pr).await.unwrap());
    assert!(service.is_closed(pr).await.unwrap());
    assert!(!service.is_mergeable(pr).await.unwrap());
}

#[tokio::test]
async fn fake_service_reports_team_membership() {
    let service = service().with_user_teams("acme", "reviewer", &["platform", "sre"]);

    assert_eq!(
        service.get_user_teams("acme", "reviewer").await.unwrap(),
        vec!["platform", "sre"]
    );
    assert!(service
        .get_user_teams("acme", "octocat")
        .await
        .unwrap()
        .is_empty());
    assert!(service
        .get_user_teams("other-org", "reviewer")
        .await
        .unwrap()
        .is_empty());

    let failing = service.failing("get_user_teams");
    let err = failing.get_user_teams("acme", "reviewer").await.unwrap_err();
    assert_eq!(err.to_string(), "get_user_teams failed: injected failure");
}
