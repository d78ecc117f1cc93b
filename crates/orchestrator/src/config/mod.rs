//! `digger.yml` configuration model.
//!
//! A configuration declares the projects in a repository and the workflows
//! that drive them. It is loaded once per event and never mutated.
//!
//! ```yaml
//! projects:
//!   - name: prod
//!     dir: environments/prod
//!     workflow: careful
//! workflows:
//!   careful:
//!     env_vars:
//!       state:
//!         - name: TF_VAR_region
//!           value: eu-west-1
//!     plan:
//!       steps: [init, plan]
//!     workflow_configuration:
//!       on_pull_request_pushed: ["digger plan"]
//! ```
//!
//! Reading the file is the caller's job; this module only parses text so the
//! crate stays free of I/O.

mod impact;
mod steps;

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{ProjectName, WorkflowName};

pub use impact::ImpactResolver;
pub use steps::{StageConfig, StepConfig};

/// Workspace used by projects that do not name one.
pub const DEFAULT_WORKSPACE: &str = "default";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid YAML or does not match the schema.
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The document parsed but violates a configuration rule.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// A unit of infrastructure code that jobs run against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Unique project name.
    pub name: ProjectName,

    /// Project directory, relative to the repository root.
    pub dir: String,

    /// Workspace jobs run in unless a comment overrides it.
    #[serde(default = "default_workspace")]
    pub workspace: String,

    /// Run through Terragrunt instead of plain Terraform.
    #[serde(default)]
    pub terragrunt: bool,

    /// Workflow that decides which commands run for this project.
    #[serde(default = "WorkflowName::default_name")]
    pub workflow: WorkflowName,

    /// Extra globs (relative to the repository root) whose changes impact
    /// this project.
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Globs (relative to the repository root) whose changes never impact
    /// this project, even inside its directory.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

impl Project {
    /// Creates a project with the default workspace and workflow.
    pub fn new(name: ProjectName, dir: impl Into<String>) -> Self {
        Self {
            name,
            dir: dir.into(),
            workspace: default_workspace(),
            terragrunt: false,
            workflow: WorkflowName::default_name(),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

fn default_workspace() -> String {
    DEFAULT_WORKSPACE.to_string()
}

// ---------------------------------------------------------------------------
// Workflows
// ---------------------------------------------------------------------------

/// A named bundle of environment, stages and per-trigger command lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    /// Environment variable declarations.
    #[serde(default)]
    pub env_vars: EnvVars,

    /// Steps executed for `digger plan`.
    #[serde(default)]
    pub plan: Option<StageConfig>,

    /// Steps executed for `digger apply`.
    #[serde(default)]
    pub apply: Option<StageConfig>,

    /// Command lists keyed by trigger.
    #[serde(default, rename = "workflow_configuration")]
    pub configuration: WorkflowConfiguration,
}

impl Workflow {
    /// The workflow inserted under [`WorkflowName::DEFAULT`] when a
    /// configuration does not declare one.
    pub fn default_workflow() -> Self {
        Self {
            env_vars: EnvVars::default(),
            plan: Some(StageConfig::from_actions(["init", "plan"])),
            apply: Some(StageConfig::from_actions(["init", "apply"])),
            configuration: WorkflowConfiguration::default(),
        }
    }
}

/// Command lists run automatically for pull-request lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfiguration {
    /// Run when a pull request is opened, reopened or pushed to.
    #[serde(default = "default_on_pull_request_pushed")]
    pub on_pull_request_pushed: Vec<String>,

    /// Run when a pull request is closed without merging into the default
    /// branch.
    #[serde(default = "default_on_pull_request_closed")]
    pub on_pull_request_closed: Vec<String>,

    /// Run when a pull request is merged into the default branch.
    #[serde(default = "default_on_commit_to_default")]
    pub on_commit_to_default: Vec<String>,
}

impl Default for WorkflowConfiguration {
    fn default() -> Self {
        Self {
            on_pull_request_pushed: default_on_pull_request_pushed(),
            on_pull_request_closed: default_on_pull_request_closed(),
            on_commit_to_default: default_on_commit_to_default(),
        }
    }
}

fn default_on_pull_request_pushed() -> Vec<String> {
    vec!["digger plan".to_string()]
}

fn default_on_pull_request_closed() -> Vec<String> {
    vec!["digger unlock".to_string()]
}

fn default_on_commit_to_default() -> Vec<String> {
    vec!["digger apply".to_string()]
}

// ---------------------------------------------------------------------------
// Environment variables
// ---------------------------------------------------------------------------

/// Environment variable declarations, split by who consumes them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVars {
    /// Variables for the state backend (init, lock handling).
    #[serde(default)]
    pub state: Vec<EnvVarConfig>,

    /// Variables for plan/apply commands.
    #[serde(default)]
    pub commands: Vec<EnvVarConfig>,
}

/// One environment variable declaration.
///
/// A non-empty `value` is used literally. Otherwise `value_from` names a
/// variable of the orchestrator's own environment to copy. An entry with
/// neither is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVarConfig {
    /// Variable name as seen by the job.
    pub name: String,

    /// Literal value.
    #[serde(default)]
    pub value: Option<String>,

    /// Name of the orchestrator environment variable to copy.
    #[serde(default)]
    pub value_from: Option<String>,
}

impl EnvVarConfig {
    fn resolve(&self, lookup: &dyn Fn(&str) -> Option<String>) -> Option<String> {
        match (&self.value, &self.value_from) {
            (Some(value), _) if !value.is_empty() => Some(value.clone()),
            (_, Some(source)) => Some(lookup(source).unwrap_or_default()),
            _ => None,
        }
    }
}

impl EnvVars {
    /// Resolves the declarations into `(state_env_vars, command_env_vars)`.
    ///
    /// `lookup` reads the orchestrator's environment; a `value_from` naming
    /// an unset variable resolves to the empty string.
    pub fn collect(
        &self,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> (BTreeMap<String, String>, BTreeMap<String, String>) {
        let resolve_all = |vars: &[EnvVarConfig]| {
            vars.iter()
                .filter_map(|var| Some((var.name.clone(), var.resolve(lookup)?)))
                .collect::<BTreeMap<_, _>>()
        };
        (resolve_all(&self.state), resolve_all(&self.commands))
    }
}

// ---------------------------------------------------------------------------
// Root document
// ---------------------------------------------------------------------------

/// A parsed and validated `digger.yml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiggerConfig {
    /// Declared projects, in file order.
    pub projects: Vec<Project>,

    /// Declared workflows, always including [`WorkflowName::DEFAULT`].
    #[serde(default)]
    pub workflows: BTreeMap<WorkflowName, Workflow>,
}

impl DiggerConfig {
    /// Parses and validates a `digger.yml` document.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Parse`] for malformed YAML or schema mismatches.
    /// - [`ConfigError::Invalid`] when no project is declared, a project name
    ///   is empty or repeated, or an include/exclude pattern is not a valid glob.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: DiggerConfig = serde_yaml::from_str(yaml)?;
        if !config.workflows.contains_key(WorkflowName::DEFAULT) {
            debug!("no default workflow declared; using the built-in one");
            config
                .workflows
                .insert(WorkflowName::default_name(), Workflow::default_workflow());
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.projects.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one project must be declared".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for project in &self.projects {
            if project.name.as_str().trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "project name must not be empty".to_string(),
                ));
            }
            if !seen.insert(project.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate project name '{}'",
                    project.name
                )));
            }
            for pattern in project
                .include_patterns
                .iter()
                .chain(&project.exclude_patterns)
            {
                glob::Pattern::new(pattern).map_err(|e| {
                    ConfigError::Invalid(format!(
                        "project '{}' has invalid pattern '{}': {}",
                        project.name, pattern, e
                    ))
                })?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
projects:
  - name: prod
    dir: prod
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = DiggerConfig::from_yaml_str(MINIMAL).unwrap();
        let project = &config.projects[0];
        assert_eq!(project.workspace, "default");
        assert_eq!(project.workflow.as_str(), "default");
        assert!(!project.terragrunt);

        let workflow = &config.workflows["default"];
        assert_eq!(workflow, &Workflow::default_workflow());
        assert_eq!(
            workflow.configuration.on_pull_request_pushed,
            vec!["digger plan"]
        );
    }

    #[test]
    fn declared_workflows_are_parsed() {
        let yaml = r#"
projects:
  - name: prod
    dir: prod
    workspace: production
    terragrunt: true
    workflow: careful
workflows:
  careful:
    env_vars:
      state:
        - name: AWS_PROFILE
          value: state-admin
      commands:
        - name: TF_TOKEN
          value_from: CI_TF_TOKEN
    plan:
      steps:
        - init
        - plan:
            extra_args: ["-lock=false"]
        - run: "infracost breakdown"
          shell: bash
    workflow_configuration:
      on_pull_request_pushed: ["digger plan"]
      on_pull_request_closed: []
      on_commit_to_default: ["digger apply", "digger unlock"]
"#;
        let config = DiggerConfig::from_yaml_str(yaml).unwrap();
        assert!(config.workflows.contains_key("default"));

        let workflow = &config.workflows["careful"];
        assert!(workflow.apply.is_none());
        assert_eq!(workflow.configuration.on_pull_request_closed, Vec::<String>::new());
        assert_eq!(
            workflow.configuration.on_commit_to_default,
            vec!["digger apply", "digger unlock"]
        );

        let steps = &workflow.plan.as_ref().unwrap().steps;
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[1].extra_args, vec!["-lock=false"]);
        assert_eq!(steps[2].action, "run");
        assert_eq!(steps[2].value.as_deref(), Some("infracost breakdown"));
        assert_eq!(steps[2].shell.as_deref(), Some("bash"));
    }

    #[test]
    fn partial_workflow_configuration_keeps_other_defaults() {
        let yaml = r#"
projects:
  - name: prod
    dir: prod
workflows:
  default:
    workflow_configuration:
      on_commit_to_default: ["digger unlock"]
"#;
        let config = DiggerConfig::from_yaml_str(yaml).unwrap();
        let configuration = &config.workflows["default"].configuration;
        assert_eq!(configuration.on_commit_to_default, vec!["digger unlock"]);
        assert_eq!(configuration.on_pull_request_pushed, vec!["digger plan"]);
    }

    #[test]
    fn env_vars_resolve_literals_and_lookups() {
        let env = EnvVars {
            state: vec![EnvVarConfig {
                name: "BACKEND".to_string(),
                value: Some("s3".to_string()),
                value_from: None,
            }],
            commands: vec![
                EnvVarConfig {
                    name: "TOKEN".to_string(),
                    value: None,
                    value_from: Some("CI_TOKEN".to_string()),
                },
                EnvVarConfig {
                    name: "MISSING".to_string(),
                    value: None,
                    value_from: Some("NOT_SET".to_string()),
                },
                EnvVarConfig {
                    name: "REGION".to_string(),
                    value: Some("eu-west-1".to_string()),
                    value_from: Some("CI_TOKEN".to_string()),
                },
                EnvVarConfig {
                    name: "EMPTY".to_string(),
                    value: Some(String::new()),
                    value_from: Some("CI_TOKEN".to_string()),
                },
                EnvVarConfig {
                    name: "UNSET".to_string(),
                    value: None,
                    value_from: None,
                },
            ],
        };
        let lookup = |name: &str| (name == "CI_TOKEN").then(|| "secret".to_string());
        let (state, commands) = env.collect(&lookup);
        assert_eq!(state["BACKEND"], "s3");
        assert_eq!(commands["TOKEN"], "secret");
        assert_eq!(commands["MISSING"], "");
        assert_eq!(commands["REGION"], "eu-west-1");
        assert_eq!(commands["EMPTY"], "secret");
        assert!(!commands.contains_key("UNSET"));
    }

    #[test]
    fn written_config_reads_back_unchanged() {
        let yaml = r#"
projects:
  - name: prod
    dir: prod
    workflow: careful
    include_patterns: ["modules/**"]
workflows:
  careful:
    env_vars:
      commands:
        - name: TF_TOKEN
          value_from: CI_TF_TOKEN
    plan:
      steps:
        - init
        - plan:
            extra_args: ["-lock=false"]
        - run: "infracost breakdown"
"#;
        for source in [MINIMAL, yaml] {
            let config = DiggerConfig::from_yaml_str(source).unwrap();
            let written = serde_yaml::to_string(&config).unwrap();
            let reread = DiggerConfig::from_yaml_str(&written).unwrap();
            assert_eq!(reread, config);
        }
    }

    #[test]
    fn duplicate_project_names_are_rejected() {
        let yaml = r#"
projects:
  - name: prod
    dir: a
  - name: prod
    dir: b
"#;
        let err = DiggerConfig::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate project name 'prod'"));
    }

    #[test]
    fn empty_project_list_is_rejected() {
        let err = DiggerConfig::from_yaml_str("projects: []").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn invalid_glob_is_rejected() {
        let yaml = r#"
projects:
  - name: prod
    dir: prod
    include_patterns: ["modules/[*.tf"]
"#;
        let err = DiggerConfig::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("invalid pattern"));
    }

    #[test]
    fn unknown_workflow_reference_is_left_for_synthesis() {
        let yaml = r#"
projects:
  - name: prod
    dir: prod
    workflow: missing
"#;
        let config = DiggerConfig::from_yaml_str(yaml).unwrap();
        assert!(!config.workflows.contains_key("missing"));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = DiggerConfig::from_yaml_str("projects: [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
