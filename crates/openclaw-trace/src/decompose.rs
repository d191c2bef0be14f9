//! Conservative task decomposition heuristics.
//!
//! Two stages, tried in order: numbered lists, then sequential marker
//! words. Anything else is left whole — a wrong split costs more than no
//! split.

use regex::Regex;
use std::sync::LazyLock;

static NUMBERED_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*\d+[.)]\s+").expect("numbered item pattern must compile")
});

static SEQUENTIAL_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:and\s+then|then|after\s+that|next,?|finally)\b")
        .expect("sequential marker pattern must compile")
});

static SEQUENTIAL_SPLIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[.;,]\s+(?:and\s+then|then|after\s+that|next,?|finally)[,\s]+")
        .expect("sequential split pattern must compile")
});

static INTERNAL_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*\n\s*").expect("whitespace pattern must compile")
});

/// Result of attempting to decompose a task description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decomposition {
    /// Whether the text split into subtasks.
    pub decomposed: bool,
    /// The subtasks, empty when not decomposed.
    pub subtasks: Vec<String>,
}

impl Decomposition {
    fn none() -> Self {
        Self {
            decomposed: false,
            subtasks: Vec::new(),
        }
    }
}

/// Collapse internal newlines so each subtask is a single line.
fn collapse(text: &str) -> String {
    INTERNAL_WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Split a task description into subtasks, conservatively.
#[must_use]
pub fn decompose_task(text: &str) -> Decomposition {
    if text.trim().is_empty() {
        return Decomposition::none();
    }

    // Stage 1: numbered lists ("1. …", "2) …") with at least two items.
    let anchors: Vec<_> = NUMBERED_ITEM.find_iter(text).collect();
    if anchors.len() >= 2 {
        let mut subtasks = Vec::with_capacity(anchors.len());
        for (i, anchor) in anchors.iter().enumerate() {
            let end = anchors
                .get(i + 1)
                .map_or(text.len(), |next| next.start());
            let item = collapse(&text[anchor.end()..end]);
            if !item.is_empty() {
                subtasks.push(item);
            }
        }
        if subtasks.len() >= 2 {
            return Decomposition {
                decomposed: true,
                subtasks,
            };
        }
    }

    // Stage 2: sequential markers ("then", "after that", "finally" …).
    if SEQUENTIAL_MARKER.is_match(text) {
        let parts: Vec<String> = SEQUENTIAL_SPLIT
            .split(text)
            .map(collapse)
            .filter(|part| !part.is_empty())
            .collect();
        if parts.len() >= 2 {
            return Decomposition {
                decomposed: true,
                subtasks: parts,
            };
        }
    }

    Decomposition::none()
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Numbered lists
    // -----------------------------------------------------------------------

    #[test]
    fn test_numbered_list_splits() {
        let result = decompose_task("Do the following:\n1. clone the repo\n2. run the tests\n3) file a report");
        assert!(result.decomposed);
        assert_eq!(
            result.subtasks,
            vec!["clone the repo", "run the tests", "file a report"]
        );
    }

    #[test]
    fn test_single_numbered_item_is_not_a_list() {
        let result = decompose_task("1. just one thing to do");
        assert!(!result.decomposed);
        assert!(result.subtasks.is_empty());
    }

    #[test]
    fn test_numbered_items_collapse_internal_newlines() {
        let result = decompose_task("1. first part\ncontinues here\n2. second item");
        assert!(result.decomposed);
        assert_eq!(result.subtasks[0], "first part continues here");
    }

    #[test]
    fn test_preamble_before_first_item_is_dropped() {
        let result = decompose_task("Here is the plan.\n1. alpha\n2. beta");
        assert_eq!(result.subtasks, vec!["alpha", "beta"]);
    }

    // -----------------------------------------------------------------------
    // Sequential markers
    // -----------------------------------------------------------------------

    #[test]
    fn test_sequential_markers_split() {
        let result =
            decompose_task("Fetch the data. Then summarise it. Finally email the summary.");
        assert!(result.decomposed);
        assert_eq!(result.subtasks.len(), 3);
        assert_eq!(result.subtasks[0], "Fetch the data");
        assert_eq!(result.subtasks[1], "summarise it");
        assert_eq!(result.subtasks[2], "email the summary.");
    }

    #[test]
    fn test_and_then_marker() {
        let result = decompose_task("Build the image, and then push it to the registry.");
        assert!(result.decomposed);
        assert_eq!(result.subtasks.len(), 2);
    }

    #[test]
    fn test_marker_without_split_boundary_stays_whole() {
        // "then" appears but never after a [.;,] boundary, so splitting
        // would produce one part.
        let result = decompose_task("If it fails then retry with backoff");
        assert!(!result.decomposed);
    }

    // -----------------------------------------------------------------------
    // Conservative fallback
    // -----------------------------------------------------------------------

    #[test]
    fn test_plain_text_is_not_decomposed() {
        let result = decompose_task("Summarise the latest build log for me");
        assert!(!result.decomposed);
        assert!(result.subtasks.is_empty());
    }

    #[test]
    fn test_empty_text_is_not_decomposed() {
        assert!(!decompose_task("").decomposed);
        assert!(!decompose_task("   \n  ").decomposed);
    }

    #[test]
    fn test_numbered_stage_wins_over_sequential() {
        let result = decompose_task("1. do this, then that\n2. and finally this");
        assert!(result.decomposed);
        assert_eq!(result.subtasks.len(), 2);
        assert_eq!(result.subtasks[0], "do this, then that");
    }
}
