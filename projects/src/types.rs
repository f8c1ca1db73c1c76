use serde::{Deserialize, Serialize};
use std::fmt;

/// Credentials for one headless site.
///
/// Serialized in the project list file as `{siteId, projectName, apiKey}`.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub site_id: String,
    #[serde(default)]
    pub project_name: String,
    pub api_key: String,
}

impl Project {
    pub fn new<S, N, K>(site_id: S, project_name: N, api_key: K) -> Self
    where
        S: Into<String>,
        N: Into<String>,
        K: Into<String>,
    {
        Project {
            site_id: site_id.into(),
            project_name: project_name.into(),
            api_key: api_key.into(),
        }
    }
}

// The api key must never end up in logs.
impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("site_id", &self.site_id)
            .field("project_name", &self.project_name)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_json_shape() {
        let project = Project::new("site-1", "Demo", "key-1");
        let json = serde_json::to_value(&project).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"siteId": "site-1", "projectName": "Demo", "apiKey": "key-1"})
        );

        let parsed: Project =
            serde_json::from_str(r#"{"siteId": "s", "apiKey": "k"}"#).unwrap();
        assert_eq!(parsed.project_name, "");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let project = Project::new("site-1", "Demo", "super-secret");
        let debug = format!("{project:?}");
        assert!(debug.contains("site-1"));
        assert!(!debug.contains("super-secret"));
    }
}
