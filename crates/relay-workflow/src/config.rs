//! Immutable workflow settings shared by every listener.

#[derive(Debug, Clone, PartialEq, Eq)]
/// Emoji names that trigger or mark workflow steps.
pub struct ReactionEmojis {
    pub assign_trigger: String,
    pub sanitize_trigger: String,
    pub closed: String,
    pub assigned: String,
    pub sanitized: String,
}

impl Default for ReactionEmojis {
    fn default() -> Self {
        Self {
            assign_trigger: "sparkles".to_string(),
            sanitize_trigger: "soap".to_string(),
            closed: "cat2".to_string(),
            assigned: "robot_face".to_string(),
            sanitized: "white_check_mark".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Settings consumed by the classifier, lookup and step handlers.
///
/// Built once at start-up and handed out behind an `Arc`; nothing mutates it
/// afterwards.
pub struct WorkflowConfig {
    pub github_org: String,
    pub working_dir: String,
    pub agent_working_dir: String,
    pub agent_model: String,
    pub status_channel_id: String,
    pub history_search_limit: usize,
    pub status_ttl_seconds: u64,
    pub closed_cleanup_ttl_seconds: u64,
    pub project_id: String,
    pub project_owner: String,
    /// Login the automation account reports in `assigned` webhooks.
    pub automation_login: String,
    /// Assignee handle passed to `gh` when assigning to the automation.
    pub automation_assignee: String,
    pub emojis: ReactionEmojis,
}

impl WorkflowConfig {
    pub fn new(github_org: impl Into<String>) -> Self {
        Self {
            github_org: github_org.into(),
            working_dir: "/tmp".to_string(),
            agent_working_dir: "/tmp/agent".to_string(),
            agent_model: "gpt-4.1".to_string(),
            status_channel_id: String::new(),
            history_search_limit: 100,
            status_ttl_seconds: 48 * 60 * 60,
            closed_cleanup_ttl_seconds: 24 * 60 * 60,
            project_id: "1".to_string(),
            project_owner: "its-the-vibe".to_string(),
            automation_login: "Copilot".to_string(),
            automation_assignee: "@copilot".to_string(),
            emojis: ReactionEmojis::default(),
        }
    }

    pub fn is_automation_login(&self, login: &str) -> bool {
        login.trim().eq_ignore_ascii_case(self.automation_login.trim())
    }
}
