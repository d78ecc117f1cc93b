//! Stage and step configuration.
//!
//! A step can be written three ways in YAML:
//!
//! ```yaml
//! steps:
//!   - init                      # bare action
//!   - plan:                     # action with arguments
//!       extra_args: ["-lock=false"]
//!   - run: "tflint"             # shell command
//!     shell: bash
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Ordered steps for one phase (plan or apply).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Steps in execution order.
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

impl StageConfig {
    /// Builds a stage of bare actions with no arguments.
    pub fn from_actions<'a>(actions: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            steps: actions.into_iter().map(StepConfig::action).collect(),
        }
    }
}

/// One step in a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStep", into = "RawStep")]
pub struct StepConfig {
    /// Action name (`init`, `plan`, `apply`, `run`, ...).
    pub action: String,

    /// Command line for `run` steps.
    pub value: Option<String>,

    /// Additional arguments appended to the action's command line.
    pub extra_args: Vec<String>,

    /// Shell for `run` steps.
    pub shell: Option<String>,
}

impl StepConfig {
    /// Builds a bare action step.
    pub fn action(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            value: None,
            extra_args: Vec::new(),
            shell: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum RawStep {
    Action(String),
    Run {
        run: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        shell: Option<String>,
    },
    Configured(BTreeMap<String, Option<RawStepArgs>>),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawStepArgs {
    #[serde(default)]
    extra_args: Vec<String>,
}

impl From<StepConfig> for RawStep {
    fn from(step: StepConfig) -> Self {
        match step.value {
            Some(run) if step.action == "run" => RawStep::Run {
                run,
                shell: step.shell,
            },
            _ if step.extra_args.is_empty() => RawStep::Action(step.action),
            _ => RawStep::Configured(BTreeMap::from([(
                step.action,
                Some(RawStepArgs {
                    extra_args: step.extra_args,
                }),
            )])),
        }
    }
}

impl TryFrom<RawStep> for StepConfig {
    type Error = String;

    fn try_from(raw: RawStep) -> Result<Self, Self::Error> {
        match raw {
            RawStep::Action(action) => Ok(StepConfig::action(action)),
            RawStep::Run { run, shell } => Ok(StepConfig {
                action: "run".to_string(),
                value: Some(run),
                extra_args: Vec::new(),
                shell,
            }),
            RawStep::Configured(map) => {
                if map.len() != 1 {
                    return Err(format!(
                        "a step must name exactly one action, found {}",
                        map.len()
                    ));
                }
                let Some((action, args)) = map.into_iter().next() else {
                    return Err("a step must name exactly one action".to_string());
                };
                Ok(StepConfig {
                    action,
                    value: None,
                    extra_args: args.unwrap_or_default().extra_args,
                    shell: None,
                })
            }
        }
    }
}
