use crate::store::truncate_utf8;

/// Marker appended when the diff excerpt was cut
const DIFF_TRUNCATED_MARKER: &str = "\n[... diff truncated ...]";

/// Marker appended when the whole ingest content was cut
const CONTENT_TRUNCATED_MARKER: &str = "\n[... content truncated ...]";

/// Raw pieces of a commit before they are flattened into ingest content
#[derive(Debug, Clone, Default)]
pub struct CommitDetails {
    /// Message text after the subject line
    pub body: String,
    /// Paths touched by the commit
    pub files_changed: Vec<String>,
    /// Unified diff against the first parent
    pub diff: String,
}

/// Builds the searchable text stored under a commit header
#[derive(Debug, Clone)]
pub struct IngestContentBuilder {
    include_diff: bool,
    max_diff_bytes: usize,
    max_content_bytes: usize,
}

impl IngestContentBuilder {
    pub fn new(include_diff: bool, max_diff_bytes: usize, max_content_bytes: usize) -> Self {
        Self {
            include_diff,
            max_diff_bytes,
            max_content_bytes,
        }
    }

    /// Body, changed files, then a diff excerpt; each section only if present
    pub fn build(&self, details: &CommitDetails) -> String {
        let mut content = String::new();

        let body = details.body.trim();
        if !body.is_empty() {
            content.push_str(body);
            content.push_str("\n\n");
        }

        if !details.files_changed.is_empty() {
            content.push_str("Files Changed:\n");
            for file in &details.files_changed {
                content.push_str("- ");
                content.push_str(file);
                content.push('\n');
            }
            content.push('\n');
        }

        if self.include_diff && !details.diff.is_empty() {
            content.push_str("Diff:\n");
            let excerpt = truncate_utf8(&details.diff, self.max_diff_bytes);
            content.push_str(excerpt);
            if excerpt.len() < details.diff.len() {
                content.push_str(DIFF_TRUNCATED_MARKER);
            }
        }

        if content.len() > self.max_content_bytes {
            let cut = truncate_utf8(&content, self.max_content_bytes).len();
            content.truncate(cut);
            content.push_str(CONTENT_TRUNCATED_MARKER);
        }

        content.truncate(content.trim_end().len());
        content
    }
}

impl Default for IngestContentBuilder {
    fn default() -> Self {
        Self::new(true, 8_000, 12_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> CommitDetails {
        CommitDetails {
            body: "This commit fixes a critical bug in the auth module.\n".to_string(),
            files_changed: vec!["src/auth.rs".to_string(), "tests/auth_tests.rs".to_string()],
            diff: "@@ -10,7 +10,7 @@\n-    old_line\n+    new_line\n".to_string(),
        }
    }

    #[test]
    fn test_build_includes_all_sections() {
        let content = IngestContentBuilder::default().build(&details());

        assert!(content.starts_with("This commit fixes a critical bug"));
        assert!(content.contains("Files Changed:\n- src/auth.rs\n- tests/auth_tests.rs"));
        assert!(content.contains("Diff:\n@@ -10,7 +10,7 @@"));
        assert!(content.ends_with("+    new_line"));
    }

    #[test]
    fn test_build_without_diff() {
        let content = IngestContentBuilder::new(false, 8_000, 12_000).build(&details());
        assert!(!content.contains("Diff:"));
        assert!(content.contains("src/auth.rs"));
    }

    #[test]
    fn test_empty_details_give_empty_content() {
        let content = IngestContentBuilder::default().build(&CommitDetails::default());
        assert_eq!(content, "");
    }

    #[test]
    fn test_diff_truncation() {
        let mut commit = details();
        commit.diff = "x".repeat(500);
        let content = IngestContentBuilder::new(true, 100, 12_000).build(&commit);

        assert!(content.contains(&"x".repeat(100)));
        assert!(!content.contains(&"x".repeat(101)));
        assert!(content.ends_with("[... diff truncated ...]"));
    }

    #[test]
    fn test_content_truncation_is_char_safe() {
        let commit = CommitDetails {
            body: "é".repeat(100),
            ..CommitDetails::default()
        };
        let content = IngestContentBuilder::new(true, 100, 51).build(&commit);
        assert!(content.starts_with(&"é".repeat(25)));
        assert!(content.ends_with("[... content truncated ...]"));
    }
}
