//! Project impact resolution.
//!
//! Decides which configured projects a change set touches. The orchestrator
//! trusts the result of [`ImpactResolver::modified_projects`] unconditionally.

use glob::{MatchOptions, Pattern};
use tracing::{debug, warn};

use super::{DiggerConfig, Project};

/// Separators are literal so that `*` stays within one path component and
/// `**` is needed to cross directories.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Computes the projects impacted by a change set.
pub trait ImpactResolver {
    /// Returns the projects whose scope intersects `changed_files`, in
    /// configuration order.
    fn modified_projects(&self, changed_files: &[String]) -> Vec<Project>;
}

impl ImpactResolver for DiggerConfig {
    fn modified_projects(&self, changed_files: &[String]) -> Vec<Project> {
        let impacted: Vec<Project> = self
            .projects
            .iter()
            .filter(|project| changed_files.iter().any(|file| project.is_impacted_by(file)))
            .cloned()
            .collect();
        debug!(
            changed_files = changed_files.len(),
            impacted = impacted.len(),
            "resolved impacted projects"
        );
        impacted
    }
}

impl Project {
    /// Returns `true` if a change to `file` (relative to the repository
    /// root) impacts this project.
    ///
    /// A file impacts the project when it lies inside the project directory
    /// or matches an include pattern, and matches no exclude pattern.
    pub fn is_impacted_by(&self, file: &str) -> bool {
        let file = strip_dot_slash(file);
        let included = is_within_dir(&self.dir, file)
            || compile(&self.include_patterns)
                .iter()
                .any(|p| p.matches_with(file, MATCH_OPTIONS));
        included
            && !compile(&self.exclude_patterns)
                .iter()
                .any(|p| p.matches_with(file, MATCH_OPTIONS))
    }
}

fn is_within_dir(dir: &str, file: &str) -> bool {
    let dir = strip_dot_slash(dir).trim_end_matches('/');
    if dir.is_empty() || dir == "." {
        return true;
    }
    file.strip_prefix(dir)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

fn strip_dot_slash(path: &str) -> &str {
    let mut path = path;
    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }
    path
}

fn compile(patterns: &[String]) -> Vec<Pattern> {
    patterns
        .iter()
        .filter_map(|raw| match Pattern::new(strip_dot_slash(raw)) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                warn!(pattern = %raw, error = %e, "ignoring invalid project pattern");
                None
            }
        })
        .collect()
}
