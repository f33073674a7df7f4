use regex::Regex;

use crate::model::{Task, TaskMatch};

use super::deps::derive_state_id;

/// Compile a case-insensitive search pattern. Invalid regex falls back to a
/// literal match of the escaped input; an empty query matches everything.
pub fn search_regex(query: &str) -> Option<Regex> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }
    Regex::new(&format!("(?i){}", query))
        .or_else(|_| Regex::new(&format!("(?i){}", regex::escape(query))))
        .ok()
}

/// Whether a task matches the pattern in its id, title, description or labels.
pub fn task_matches(task: &Task, re: Option<&Regex>) -> bool {
    let re = match re {
        Some(re) => re,
        None => return true,
    };
    re.is_match(&task.title)
        || re.is_match(&task.id)
        || re.is_match(&task.description)
        || task.labels.iter().any(|l| re.is_match(l))
}

/// Order search hits: title hits before body hits, then by state bucket and title.
pub fn rank_matches(matches: &mut [TaskMatch], re: Option<&Regex>) {
    matches.sort_by(|a, b| {
        let a_title = re.is_none_or(|r| r.is_match(&a.task.title));
        let b_title = re.is_none_or(|r| r.is_match(&b.task.title));
        b_title
            .cmp(&a_title)
            .then_with(|| derive_state_id(&a.task).cmp(&derive_state_id(&b.task)))
            .then_with(|| {
                a.task
                    .title
                    .to_lowercase()
                    .cmp(&b.task.title.to_lowercase())
            })
            .then_with(|| a.task.id.cmp(&b.task.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::test_support::task;

    #[test]
    fn empty_query_matches_all() {
        assert!(search_regex("  ").is_none());
        assert!(task_matches(&task("t1", "Anything"), None));
    }

    #[test]
    fn matches_title_labels_and_id() {
        let mut t = task("t-42", "Wire the parser");
        t.labels = vec!["Backend".into()];
        let re = search_regex("backend").unwrap();
        assert!(task_matches(&t, Some(&re)));
        let re = search_regex("PARSER").unwrap();
        assert!(task_matches(&t, Some(&re)));
        let re = search_regex("t-42").unwrap();
        assert!(task_matches(&t, Some(&re)));
        let re = search_regex("frontend").unwrap();
        assert!(!task_matches(&t, Some(&re)));
    }

    #[test]
    fn invalid_regex_falls_back_to_literal() {
        let re = search_regex("fix (parser").unwrap();
        assert!(task_matches(&task("a", "fix (parser bug"), Some(&re)));
    }

    #[test]
    fn title_hits_rank_first() {
        let mut body_hit = task("a", "Alpha");
        body_hit.description = "mentions cache".into();
        let title_hit = task("b", "Cache eviction");
        let mut matches = vec![
            TaskMatch {
                project_id: "p".into(),
                project_name: "P".into(),
                task: body_hit,
            },
            TaskMatch {
                project_id: "p".into(),
                project_name: "P".into(),
                task: title_hit,
            },
        ];
        let re = search_regex("cache");
        rank_matches(&mut matches, re.as_ref());
        assert_eq!(matches[0].task.id, "b");
    }
}
