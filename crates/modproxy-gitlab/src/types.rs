//! GitLab API payloads, trimmed to the fields the proxy consumes.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
    pub id: String,
    pub short_id: String,
    /// RFC 3339, as reported by the API.
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub name: String,
    pub commit: Commit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: u64,
    #[serde(default)]
    pub path_with_namespace: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_payload() {
        let json = r#"[{"name":"v0.1.0","commit":{"id":"abc123def456","short_id":"abc123de","created_at":"2023-01-02T03:04:05Z","title":"release"}}]"#;
        let tags: Vec<Tag> = serde_json::from_str(json).unwrap();
        assert_eq!(tags[0].name, "v0.1.0");
        assert_eq!(tags[0].commit.short_id, "abc123de");
    }

    #[test]
    fn test_project_payload_ignores_extras() {
        let json = r#"{"id":42,"path_with_namespace":"user/m","star_count":7}"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert_eq!(project.id, 42);
        assert_eq!(project.path_with_namespace, "user/m");
    }
}
