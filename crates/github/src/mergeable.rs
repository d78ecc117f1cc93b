//! Mergeable-state evaluation.

use tracing::info;

/// `mergeable_state` values that allow a merge.
///
/// See GitHub's `MergeStateStatus` enum.
const MERGEABLE_STATES: [&str; 3] = ["clean", "unstable", "has_hooks"];

/// Returns `true` if GitHub's `mergeable_state` for a pull request permits a
/// merge. Comparison is case-insensitive.
pub fn is_mergeable_state(mergeable_state: &str) -> bool {
    let lower = mergeable_state.to_lowercase();
    let accepted = MERGEABLE_STATES.contains(&lower.as_str());
    if !accepted {
        info!(mergeable_state, "pull request is not in a mergeable state");
    }
    accepted
}
